//! Unit tests for connection dispatch, verbs and teardown.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use rstest::{fixture, rstest};
use tokio::io::{DuplexStream, duplex};
use tracing_test::traced_test;

use super::*;
use crate::{
    byte_order::ByteOrder,
    codec::{DecodeError, Encode},
    command::{Command, CommandCode, Direction},
    frame::{CommandFrameCodec, Frame, FramingError},
    handler::{HandlerState, encode_body},
    hooks::{AgentProtocol, Outcome},
    payload::{Empty, Heartbeat, Identity, TaggedAck},
};

#[derive(Default)]
struct Agent {
    closed: AtomicUsize,
}

impl AgentProtocol for Agent {
    fn on_connection_closed(&self, _ctx: &SessionContext, _reason: &CloseReason) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

type Peer = FrameTransport<DuplexStream>;

struct Link {
    conn: AgentConnection<DuplexStream>,
    peer: Peer,
    agent: Arc<Agent>,
}

fn link_with(config: ConnectionConfig) -> Link {
    let (local, remote) = duplex(64 * 1024);
    let agent = Arc::new(Agent::default());
    let conn = AgentConnection::builder("frontend")
        .config(config)
        .protocol(Arc::clone(&agent))
        .build(local);
    let peer = FrameTransport::new(remote, CommandFrameCodec::default(), ByteOrder::Big)
        .with_read_timeout(Some(Duration::from_millis(200)));
    Link { conn, peer, agent }
}

#[fixture]
fn link() -> Link { link_with(ConnectionConfig::default()) }

fn body<P: Encode>(code: CommandCode, payload: &P) -> Bytes {
    encode_body(code, payload, ByteOrder::Big)
}

async fn send(peer: &mut Peer, tag: u8, payload: Bytes) {
    peer.send(Frame::command(ByteOrder::Big, tag, payload))
        .await
        .expect("peer send should succeed");
}

async fn expect_silence(peer: &mut Peer) {
    assert!(matches!(
        peer.receive_frame().await,
        Err(TransportError::Timeout(_))
    ));
}

#[rstest]
#[tokio::test]
async fn heartbeat_request_is_handled_without_reply(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let beat = Heartbeat {
        hostname: "node01".into(),
        tag: "phase1".into(),
        port: 5000,
        kind: 0,
        num_procs: 4,
    };
    send(&mut peer, 1, body(Command::Heartbeat.request_code(), &beat)).await;

    let dispatch = conn.handle_one_message().await.expect("dispatch");
    assert_eq!(
        dispatch,
        Dispatch::Handled {
            command: Command::Heartbeat,
            direction: Direction::Request,
        }
    );
    assert_eq!(conn.handlers().heartbeat.last_request(), Some(&beat));
    assert_eq!(conn.last_command(), Some(Command::Heartbeat.request_code()));
    expect_silence(&mut peer).await;
}

#[rstest]
#[tokio::test]
async fn init_request_gets_one_reply_with_request_tag(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    send(
        &mut peer,
        42,
        body(Command::Init.request_code(), &Identity::new("agent-7")),
    )
    .await;

    conn.handle_one_message().await.expect("dispatch");
    assert_eq!(conn.peer_ident(), Some("agent-7"));

    let reply = peer.receive_frame().await.expect("reply frame");
    assert_eq!(reply.tag(), 42);
    let mut expected = Vec::from(Command::Init.reply_code().get().to_be_bytes());
    expected.extend_from_slice(&8u32.to_be_bytes());
    expected.extend_from_slice(b"frontend");
    assert_eq!(reply.payload().as_ref(), expected.as_slice());
    expect_silence(&mut peer).await;
}

#[tokio::test]
async fn request_without_callback_sends_nothing() {
    let (local, remote) = duplex(1024);
    let mut conn = AgentConnection::builder("bare").build(local);
    let mut peer = FrameTransport::new(remote, CommandFrameCodec::default(), ByteOrder::Big)
        .with_read_timeout(Some(Duration::from_millis(100)));
    send(&mut peer, 1, body(Command::Init.request_code(), &Identity::new("x"))).await;

    let dispatch = conn.handle_one_message().await.expect("dispatch");
    assert!(matches!(dispatch, Dispatch::Handled { .. }));
    expect_silence(&mut peer).await;
}

#[rstest]
#[tokio::test]
#[traced_test]
async fn unknown_code_is_skipped(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    send(&mut peer, 0, body(CommandCode::new(999), &Empty)).await;
    send(&mut peer, 0, body(Command::Check.request_code(), &Empty)).await;

    assert_eq!(
        conn.handle_one_message().await.expect("dispatch"),
        Dispatch::NotHandled(NotHandled::UnknownCommand(CommandCode::new(999)))
    );
    assert_eq!(conn.last_command(), None);
    assert!(logs_contain("unknown command code, frame dropped"));
    assert!(matches!(
        conn.handle_one_message().await.expect("dispatch"),
        Dispatch::Handled {
            command: Command::Check,
            ..
        }
    ));
}

#[rstest]
#[tokio::test]
async fn other_message_types_are_not_handled(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    peer.send(Frame::new(ByteOrder::Big, b'x', 0, Bytes::from_static(b"data")))
        .await
        .expect("peer send");

    assert_eq!(
        conn.handle_one_message().await.expect("dispatch"),
        Dispatch::NotHandled(NotHandled::MessageType(b'x'))
    );
    assert_eq!(conn.state(), ConnectionState::Connected);
}

#[rstest]
#[tokio::test]
#[traced_test]
async fn truncated_payload_is_dropped_and_next_frame_handled(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let ack = TaggedAck::new("abc");
    let mut truncated = body(Command::SearchFinished.request_code(), &ack).to_vec();
    truncated.truncate(truncated.len() - 1);
    send(&mut peer, 0, Bytes::from(truncated)).await;
    send(&mut peer, 0, body(Command::Check.request_code(), &Empty)).await;

    let dropped = conn.handle_one_message().await.expect("dispatch");
    assert!(matches!(
        dropped,
        Dispatch::Dropped(DecodeError::Truncated { .. })
    ));
    assert!(logs_contain("malformed command frame dropped"));
    assert!(matches!(
        conn.handle_one_message().await.expect("dispatch"),
        Dispatch::Handled { .. }
    ));
}

#[tokio::test]
async fn repeated_decode_failures_close_the_connection() {
    let Link {
        mut conn,
        mut peer,
        agent,
    } = link_with(ConnectionConfig::default().max_decode_failures(2));
    let bad = body(Command::SetParent.request_code(), &Empty);
    for _ in 0..3 {
        send(&mut peer, 0, bad.clone()).await;
    }

    assert!(matches!(conn.handle_one_message().await, Ok(Dispatch::Dropped(_))));
    assert!(matches!(conn.handle_one_message().await, Ok(Dispatch::Dropped(_))));
    assert!(matches!(
        conn.handle_one_message().await,
        Err(ConnectionError::TooManyDecodeFailures(3))
    ));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(matches!(conn.close_reason(), Some(CloseReason::Failed(_))));
    assert_eq!(agent.closed.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn init_verb_returns_peer_identity(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let responder = async move {
        let request = peer.receive_frame().await.expect("init request");
        assert_ne!(request.tag(), 0);
        let reply = body(Command::Init.reply_code(), &Identity::new("agent-1"));
        send(&mut peer, request.tag(), reply).await;
        peer
    };

    let (identity, _peer) = tokio::join!(conn.init(), responder);
    assert_eq!(identity.expect("init").name, "agent-1");
    assert_eq!(conn.peer_ident(), Some("agent-1"));
}

#[rstest]
#[tokio::test]
async fn init_dispatches_interleaved_requests(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let responder = async move {
        let request = peer.receive_frame().await.expect("init request");
        send(&mut peer, 0, body(Command::Check.request_code(), &Empty)).await;
        let reply = body(Command::Init.reply_code(), &Identity::new("agent-2"));
        send(&mut peer, request.tag(), reply).await;
        peer
    };

    let (identity, _peer) = tokio::join!(conn.init(), responder);
    assert_eq!(identity.expect("init").name, "agent-2");
    assert_eq!(conn.handlers().check.last_request(), Some(&Empty));
}

#[rstest]
#[tokio::test]
async fn uncorrelated_init_reply_matches_on_code(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let responder = async move {
        peer.receive_frame().await.expect("init request");
        let reply = body(Command::Init.reply_code(), &Identity::new("legacy"));
        send(&mut peer, 0, reply).await;
        peer
    };

    let (identity, _peer) = tokio::join!(conn.init(), responder);
    assert_eq!(identity.expect("init").name, "legacy");
}

#[rstest]
#[tokio::test]
async fn correlated_reply_with_other_code_is_unexpected(link: Link) {
    let Link {
        mut conn, mut peer, ..
    } = link;
    let responder = async move {
        let request = peer.receive_frame().await.expect("init request");
        send(&mut peer, request.tag(), body(Command::Check.reply_code(), &Empty)).await;
        peer
    };

    let (result, _peer) = tokio::join!(conn.init(), responder);
    let err = result.expect_err("mismatched reply");
    assert!(matches!(
        err,
        ConnectionError::UnexpectedReply { expected, received }
            if expected == Command::Init.reply_code()
                && received == Command::Check.reply_code()
    ));
    assert!(err.is_recoverable());
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(conn.handlers().init.state(), HandlerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn init_times_out_without_reply() {
    let Link {
        mut conn, peer: _peer, ..
    } = link_with(ConnectionConfig::default().reply_timeout(Duration::from_secs(5)));

    let err = conn.init().await.expect_err("no reply");
    assert!(matches!(err, ConnectionError::Timeout(limit) if limit == Duration::from_secs(5)));
    assert_eq!(conn.handlers().init.state(), HandlerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn reply_deadline_outlasts_read_timeout() {
    let Link {
        mut conn, mut peer, ..
    } = link_with(
        ConnectionConfig::default()
            .read_timeout(Some(Duration::from_secs(1)))
            .reply_timeout(Duration::from_secs(5)),
    );
    let responder = async move {
        let request = peer.receive_frame().await.expect("init request");
        tokio::time::sleep(Duration::from_secs(3)).await;
        let reply = body(Command::Init.reply_code(), &Identity::new("slow"));
        send(&mut peer, request.tag(), reply).await;
        peer
    };

    let (identity, _peer) = tokio::join!(conn.init(), responder);
    assert_eq!(identity.expect("init").name, "slow");
}

#[tokio::test]
#[traced_test]
async fn oversized_reply_is_rejected_and_run_continues() {
    let (local, remote) = duplex(64 * 1024);
    let agent = Arc::new(Agent::default());
    let mut conn = AgentConnection::builder("a".repeat(100))
        .config(ConnectionConfig::default().max_frame_length(64))
        .protocol(Arc::clone(&agent))
        .build(local);
    let mut peer = FrameTransport::new(remote, CommandFrameCodec::default(), ByteOrder::Big);
    let init = body(Command::Init.request_code(), &Identity::new("frontend"));
    send(&mut peer, 1, init).await;
    send(&mut peer, 0, body(Command::Check.request_code(), &Empty)).await;
    drop(peer);

    assert_eq!(conn.run().await.expect("run"), CloseReason::PeerClosed);
    assert!(logs_contain("outgoing frame rejected"));
    assert_eq!(conn.handlers().init.state(), HandlerState::Idle);
    assert_eq!(conn.handlers().check.last_request(), Some(&Empty));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.close_reason(), Some(CloseReason::PeerClosed));
    assert_eq!(agent.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversized_request_leaves_connection_open() {
    let Link {
        mut conn,
        mut peer,
        agent,
    } = link_with(ConnectionConfig::default().max_frame_length(64));

    let err = conn
        .foundprop("x".repeat(200))
        .await
        .expect_err("request exceeds the frame limit");
    assert!(matches!(
        err,
        ConnectionError::FrameRejected(FramingError::OversizedFrame { max: 64, .. })
    ));
    assert!(err.is_recoverable());
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(agent.closed.load(Ordering::SeqCst), 0);

    conn.check().await.expect("check after rejection");
    let frame = peer.receive_frame().await.expect("check request");
    assert_eq!(
        frame.payload().as_ref(),
        Command::Check.request_code().get().to_be_bytes()
    );
}

#[rstest]
#[tokio::test]
async fn quit_writes_request_and_closes(link: Link) {
    let Link {
        mut conn,
        mut peer,
        agent,
    } = link;
    let mut observer = conn.lifecycle();

    conn.quit().await.expect("quit");
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(observer.closed().await, CloseReason::Quit);
    assert_eq!(agent.closed.load(Ordering::SeqCst), 1);

    let request = peer.receive_frame().await.expect("quit request");
    assert_eq!(
        request.payload().as_ref(),
        Command::Quit.request_code().get().to_be_bytes()
    );
    assert!(matches!(peer.receive_frame().await, Err(TransportError::Closed)));
    assert!(matches!(conn.check().await, Err(ConnectionError::Closed)));
}

#[rstest]
#[tokio::test]
async fn quit_request_closes_receiving_side(link: Link) {
    let Link {
        mut conn,
        mut peer,
        agent,
    } = link;
    send(&mut peer, 3, body(Command::Quit.request_code(), &Empty)).await;

    let reason = conn.run().await.expect("orderly close");
    assert_eq!(reason, CloseReason::Requested);
    assert_eq!(agent.closed.load(Ordering::SeqCst), 1);
}

#[rstest]
#[tokio::test]
async fn peer_close_ends_run(link: Link) {
    let Link { mut conn, peer, .. } = link;
    drop(peer);

    assert_eq!(conn.run().await.expect("orderly close"), CloseReason::PeerClosed);
    assert!(matches!(
        conn.handle_one_message().await,
        Err(ConnectionError::Closed)
    ));
}

#[tokio::test]
async fn reply_override_enables_check_reply() {
    let (local, remote) = duplex(1024);
    let mut conn = AgentConnection::builder("frontend")
        .protocol(Arc::new(Agent::default()))
        .reply_to(Command::Check, true)
        .build(local);
    let mut peer = FrameTransport::new(remote, CommandFrameCodec::default(), ByteOrder::Big);
    send(&mut peer, 9, body(Command::Check.request_code(), &Empty)).await;

    conn.handle_one_message().await.expect("dispatch");
    let reply = peer.receive_frame().await.expect("check reply");
    assert_eq!(reply.tag(), 9);
    assert_eq!(
        reply.payload().as_ref(),
        Command::Check.reply_code().get().to_be_bytes()
    );
}

#[tokio::test]
async fn outgoing_byte_order_follows_config() {
    let Link {
        mut conn, mut peer, ..
    } = link_with(ConnectionConfig::default().byte_order(ByteOrder::Little));

    conn.calltreesent("t").await.expect("send");
    let frame = peer.receive_frame().await.expect("request");
    assert_eq!(frame.byte_order(), ByteOrder::Little);
    assert_eq!(
        &frame.payload()[..4],
        Command::CallTreeSent.request_code().get().to_le_bytes()
    );
}

#[tokio::test]
async fn callback_close_outcome_tears_down() {
    let (local, remote) = duplex(1024);
    let mut conn = AgentConnection::builder("agent").build(local);
    conn.handlers_mut()
        .terminate
        .set_request_callback(|_, _, _| Outcome::Close);
    let mut peer = FrameTransport::new(remote, CommandFrameCodec::default(), ByteOrder::Big);
    send(&mut peer, 0, body(Command::Terminate.request_code(), &Empty)).await;

    conn.handle_one_message().await.expect("dispatch");
    assert_eq!(conn.close_reason(), Some(CloseReason::Requested));
}

#[rstest]
fn live_connection_is_tallied(link: Link) {
    assert!(active_connection_count() >= 1);
    assert_eq!(link.conn.state(), ConnectionState::Connected);
}
