//! Agents talking to an [`AgentServer`] over TCP.

use std::{sync::Arc, time::Duration};

use agentlink::{AgentConnection, AgentServer, CloseReason, payload::heartbeat_kind};
use agentlink_testing::{RecordingProtocol, recorder, unused_listener};
use rstest::rstest;
use tokio::{sync::oneshot, time::timeout};

const PATIENCE: Duration = Duration::from_secs(2);

async fn eventually(mut check: impl FnMut() -> bool, what: &str) {
    timeout(PATIENCE, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[rstest]
#[tokio::test]
async fn frontend_collects_heartbeats_from_agents(recorder: Arc<RecordingProtocol>) {
    let protocol = Arc::clone(&recorder);
    let factory = move || AgentConnection::builder("frontend").protocol(Arc::clone(&protocol));
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = AgentServer::new(factory)
        .ready_signal(ready_tx)
        .bind_existing_listener(unused_listener().expect("listener"))
        .expect("bind");
    let addr = server.local_addr().expect("local addr");
    let registry = server.registry();
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));
    ready_rx.await.expect("server ready");

    let mut agents = Vec::new();
    let mut ports = Vec::new();
    for name in ["agent-1", "agent-2"] {
        let mut agent = AgentConnection::builder(name)
            .connect(addr)
            .await
            .expect("connect");
        assert_eq!(agent.init().await.expect("init").name, "frontend");
        let port = agent.get_ref().local_addr().expect("local addr").port();
        assert_ne!(port, addr.port());
        agent
            .heartbeat(name, i32::from(port), "phase1", heartbeat_kind::OWN, 2)
            .await
            .expect("heartbeat");
        ports.push(i32::from(port));
        agents.push(agent);
    }

    eventually(|| recorder.heartbeats().len() == 2, "heartbeats").await;
    eventually(|| registry.len() == 2, "both peers registered").await;
    eventually(
        || {
            registry.find_by_ident("agent-1").is_some()
                && registry.find_by_ident("agent-2").is_some()
        },
        "peer identities",
    )
    .await;
    let mut hosts: Vec<_> = recorder
        .heartbeats()
        .into_iter()
        .map(|beat| beat.hostname)
        .collect();
    hosts.sort();
    assert_eq!(hosts, ["agent-1", "agent-2"]);
    let mut seen: Vec<_> = recorder.heartbeats().into_iter().map(|beat| beat.port).collect();
    seen.sort_unstable();
    ports.sort_unstable();
    assert_eq!(seen, ports);

    for agent in &mut agents {
        agent.quit().await.expect("quit");
    }
    eventually(|| registry.is_empty(), "registry to drain").await;
    assert_eq!(
        recorder.close_reasons(),
        vec![CloseReason::Requested, CloseReason::Requested]
    );

    let _ = stop_tx.send(());
    timeout(PATIENCE, handle)
        .await
        .expect("server stops")
        .expect("join server")
        .expect("server run");
}

#[rstest]
#[tokio::test]
async fn shutdown_disconnects_idle_agents(recorder: Arc<RecordingProtocol>) {
    let protocol = Arc::clone(&recorder);
    let factory = move || AgentConnection::builder("frontend").protocol(Arc::clone(&protocol));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = AgentServer::new(factory)
        .bind_existing_listener(unused_listener().expect("listener"))
        .expect("bind");
    let addr = server.local_addr().expect("local addr");
    let registry = server.registry();
    let handle = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let mut agent = AgentConnection::builder("idle")
        .connect(addr)
        .await
        .expect("connect");
    agent.check().await.expect("check");
    eventually(|| registry.len() == 1, "peer registered").await;

    let _ = stop_tx.send(());
    let reason = timeout(PATIENCE, agent.run())
        .await
        .expect("agent sees the close")
        .expect("run");
    assert_eq!(reason, CloseReason::PeerClosed);
    timeout(PATIENCE, handle)
        .await
        .expect("server stops")
        .expect("join server")
        .expect("server run");
    assert_eq!(recorder.close_reasons(), vec![CloseReason::Requested]);
}
