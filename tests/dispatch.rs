//! Every command pair routes to its own callback.

use std::sync::Arc;

use agentlink::{
    Command,
    ConnectionConfig,
    ConnectionError,
    Dispatch,
    DispatchTable,
    NotHandled,
    byte_order::ByteOrder,
    command::{CommandCode, Direction},
    connection::AgentConnection,
    payload::{
        Empty,
        Heartbeat,
        IdMapping,
        OpaqueBlob,
        ParentAddress,
        PayloadKind,
        ReinitMap,
    },
};
use agentlink_testing::{Recorded, RecordingProtocol, command_body, connected_pair, raw_peer};
use bytes::Bytes;
use rstest::rstest;
use tokio::io::DuplexStream;

type Conn = AgentConnection<DuplexStream>;

/// Smallest valid body for each payload family: every length and integer
/// field zero.
fn zeroed(kind: PayloadKind) -> Vec<u8> {
    let len = match kind {
        PayloadKind::Empty => 0,
        PayloadKind::Identity
        | PayloadKind::ReinitMap
        | PayloadKind::TaggedAck
        | PayloadKind::OpaqueBlob
        | PayloadKind::Xml => 4,
        PayloadKind::ParentAddress => 8,
        PayloadKind::Heartbeat => 20,
    };
    vec![0; len]
}

#[test]
fn every_code_resolves_to_one_pair() {
    let entries = DispatchTable::entries();
    assert_eq!(entries.len(), 18);
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.command, Command::ALL[index]);
        assert_eq!(
            DispatchTable::lookup(entry.request_code.get()),
            Some((entry.command, Direction::Request))
        );
        assert_eq!(
            DispatchTable::lookup(entry.reply_code.get()),
            Some((entry.command, Direction::Reply))
        );
    }
    assert_eq!(DispatchTable::lookup(36), None);
    assert_eq!(DispatchTable::lookup(-1), None);
}

#[tokio::test]
async fn every_request_and_reply_is_handled() {
    let (mut conn, mut peer) = raw_peer(
        "frontend",
        Arc::new(RecordingProtocol::new()),
        ConnectionConfig::default(),
    );
    for entry in DispatchTable::entries() {
        for (direction, code, kind) in [
            (Direction::Request, entry.request_code, entry.request_payload),
            (Direction::Reply, entry.reply_code, entry.reply_payload),
        ] {
            if entry.command == Command::Quit && direction == Direction::Request {
                continue;
            }
            let mut body = Vec::from(code.get().to_be_bytes());
            body.extend(zeroed(kind));
            peer.send(agentlink::Frame::command(ByteOrder::Big, 0, Bytes::from(body)))
                .await
                .expect("peer send");

            let dispatch = conn.handle_one_message().await.expect("dispatch");
            assert_eq!(
                dispatch,
                Dispatch::Handled {
                    command: entry.command,
                    direction,
                },
                "code {code}"
            );
            if entry.reply_by_default && direction == Direction::Request {
                peer.receive_frame().await.expect("default reply");
            }
        }
    }
}

#[tokio::test]
async fn codes_outside_the_table_are_not_handled() {
    let (mut conn, mut peer) = raw_peer(
        "frontend",
        Arc::new(RecordingProtocol::new()),
        ConnectionConfig::default(),
    );
    let body = command_body(ByteOrder::Big, CommandCode::new(99), &Empty);
    peer.send(agentlink::Frame::command(ByteOrder::Big, 0, body))
        .await
        .expect("peer send");

    let dispatch = conn.handle_one_message().await.expect("dispatch");
    assert_eq!(
        dispatch,
        Dispatch::NotHandled(NotHandled::UnknownCommand(CommandCode::new(99)))
    );
}

/// Send `command` through its verb and return what the receiver should record.
async fn send_verb(conn: &mut Conn, command: Command) -> Result<Recorded, ConnectionError> {
    let expected = match command {
        Command::Reinit => {
            conn.reinit([IdMapping::new(3, 4)]).await?;
            Recorded::Reinit(ReinitMap::new(vec![IdMapping::new(3, 4)]))
        }
        Command::Start => {
            conn.start(Bytes::from_static(b"\x00cfg")).await?;
            Recorded::Start(OpaqueBlob::new(Bytes::from_static(b"\x00cfg")))
        }
        Command::Heartbeat => {
            conn.heartbeat("node01", 5000, "phase1", 0, 4).await?;
            Recorded::Heartbeat(Heartbeat {
                hostname: "node01".into(),
                tag: "phase1".into(),
                port: 5000,
                kind: 0,
                num_procs: 4,
            })
        }
        Command::Check => {
            conn.check().await?;
            Recorded::Request(Command::Check)
        }
        Command::FoundProp => {
            conn.foundprop("<property/>").await?;
            Recorded::Xml(Command::FoundProp, "<property/>".into())
        }
        Command::SearchFinished => {
            conn.searchfinished("t1").await?;
            Recorded::Tagged(command, "t1".into())
        }
        Command::NeedRestart => {
            conn.needrestart("t2").await?;
            Recorded::Tagged(command, "t2".into())
        }
        Command::Terminate => {
            conn.terminate().await?;
            Recorded::Request(command)
        }
        Command::Terminated => {
            conn.terminated("t3").await?;
            Recorded::Tagged(command, "t3".into())
        }
        Command::PropertiesSent => {
            conn.propertiessent("t4").await?;
            Recorded::Tagged(command, "t4".into())
        }
        Command::ReqExperiment => {
            conn.reqexperiment("t5").await?;
            Recorded::Tagged(command, "t5".into())
        }
        Command::StartExperiment => {
            conn.startexperiment().await?;
            Recorded::Request(command)
        }
        Command::SetParent => {
            conn.setparent("parent", 7001).await?;
            Recorded::SetParent(ParentAddress {
                hostname: "parent".into(),
                port: 7001,
            })
        }
        Command::CallTreeSerial => {
            conn.serializecalltree().await?;
            Recorded::Request(command)
        }
        Command::CallTree => {
            conn.sendcalltree("<tree/>").await?;
            Recorded::Xml(command, "<tree/>".into())
        }
        Command::CallTreeSent => {
            conn.calltreesent("t6").await?;
            Recorded::Tagged(command, "t6".into())
        }
        Command::Init | Command::Quit => unreachable!("covered by the connection tests"),
    };
    Ok(expected)
}

#[rstest]
#[tokio::test]
async fn verb_reaches_matching_callback(
    #[values(
        Command::Reinit,
        Command::Start,
        Command::Heartbeat,
        Command::Check,
        Command::FoundProp,
        Command::SearchFinished,
        Command::NeedRestart,
        Command::Terminate,
        Command::Terminated,
        Command::PropertiesSent,
        Command::ReqExperiment,
        Command::StartExperiment,
        Command::SetParent,
        Command::CallTreeSerial,
        Command::CallTree,
        Command::CallTreeSent
    )]
    command: Command,
) {
    let receiver = Arc::new(RecordingProtocol::new());
    let (mut left, mut right) = connected_pair(
        "sender",
        Arc::new(RecordingProtocol::new()),
        "receiver",
        Arc::clone(&receiver),
    );

    let expected = send_verb(&mut left, command).await.expect("verb should send");
    let dispatch = right.handle_one_message().await.expect("dispatch");

    assert_eq!(
        dispatch,
        Dispatch::Handled {
            command,
            direction: Direction::Request,
        }
    );
    assert_eq!(receiver.events(), vec![expected]);
}
