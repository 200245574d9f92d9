#![cfg(feature = "metrics")]
//! Counters recorded while a connection dispatches frames.
//!
//! A `DebuggingRecorder` is installed as the thread-local recorder; the
//! single-threaded test runtime keeps every update on this thread.

use agentlink::{
    AgentConnection,
    Command,
    byte_order::ByteOrder,
    command::CommandCode,
    metrics::{DECODE_FAILURES, FRAMES_PROCESSED, UNKNOWN_COMMANDS},
    payload::{Empty, Heartbeat, Identity},
};
use agentlink_testing::{ChunkedStream, encode_command, raw_frame};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter(snapshotter: &Snapshotter, name: &str, labels: &[(&str, &str)]) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| {
            key.key().name() == name
                && labels.iter().all(|(k, v)| {
                    key.key()
                        .labels()
                        .any(|label| label.key() == *k && label.value() == *v)
                })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(c) => c,
            _ => 0,
        })
        .sum()
}

fn traffic() -> Vec<u8> {
    let order = ByteOrder::Big;
    let mut bytes = encode_command(order, 1, Command::Init.request_code(), &Identity::new("a"));
    bytes.extend(encode_command(
        order,
        0,
        Command::Heartbeat.request_code(),
        &Heartbeat::default(),
    ));
    bytes.extend(encode_command(order, 0, CommandCode::new(500), &Empty));
    let mut truncated = Vec::from(Command::SetParent.request_code().get().to_be_bytes());
    truncated.push(0);
    bytes.extend(raw_frame(0, b'c', 0, &truncated));
    bytes
}

#[tokio::test]
async fn dispatch_updates_counters() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let mut conn = AgentConnection::builder("frontend")
        .protocol(std::sync::Arc::new(agentlink_testing::RecordingProtocol::new()))
        .build(ChunkedStream::new(traffic(), 5));
    conn.run().await.expect("run");

    // init, heartbeat and the truncated setparent
    let inbound = [("direction", "inbound")];
    assert_eq!(counter(&snapshotter, FRAMES_PROCESSED, &inbound), 3);
    assert_eq!(
        counter(
            &snapshotter,
            FRAMES_PROCESSED,
            &[("direction", "outbound"), ("command", "INIT")]
        ),
        1
    );
    assert_eq!(counter(&snapshotter, UNKNOWN_COMMANDS, &[]), 1);
    assert_eq!(counter(&snapshotter, DECODE_FAILURES, &[]), 1);
}

#[rstest]
#[case(1)]
#[case(3)]
fn connection_panics_are_counted(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| agentlink::metrics::inc_connection_panics());
    });
    assert_eq!(
        counter(&snapshotter, agentlink::metrics::CONNECTION_PANICS, &[]),
        expected
    );
}
