//! Demo binary for `agentlink`.
//!
//! `listen` serves agents until Ctrl+C; `probe` runs one agent session.

mod cli;

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use agentlink::{
    AgentConnection,
    AgentProtocol,
    AgentServer,
    CloseReason,
    Outcome,
    SessionContext,
    payload::{Heartbeat, heartbeat_kind},
};
use clap::Parser;
use cli::{Cli, Mode};

struct Logger;

impl AgentProtocol for Logger {
    fn on_heartbeat(
        &self,
        ctx: &mut SessionContext,
        request: &Heartbeat,
        _reply: &mut Heartbeat,
    ) -> Outcome {
        tracing::info!(
            peer = ctx.peer_ident().unwrap_or("<unknown>"),
            host = %request.hostname,
            port = request.port,
            tag = %request.tag,
            procs = request.num_procs,
            "heartbeat"
        );
        Outcome::Continue
    }

    fn on_connection_closed(&self, ctx: &SessionContext, reason: &CloseReason) {
        tracing::info!(peer = ?ctx.peer_ident(), ?reason, "agent left");
    }
}

async fn listen(bind: SocketAddr, ident: String) -> Result<(), Box<dyn std::error::Error>> {
    let protocol = Arc::new(Logger);
    let server = AgentServer::new(move || {
        AgentConnection::builder(ident.clone()).protocol(Arc::clone(&protocol))
    })
    .bind(bind)?;
    tracing::info!(addr = ?server.local_addr(), "listening");
    server.run().await?;
    Ok(())
}

async fn probe(
    connect: SocketAddr,
    ident: String,
    heartbeats: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = AgentConnection::builder(ident.clone())
        .connect(connect)
        .await?;
    let peer = conn.init().await?;
    tracing::info!(peer = %peer.name, "connected");
    let port = i32::from(conn.get_ref().local_addr()?.port());
    for n in 0..heartbeats {
        conn.heartbeat(ident.as_str(), port, format!("probe-{n}"), heartbeat_kind::OWN, 1)
            .await?;
    }
    conn.quit().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Mode::Listen { bind, ident } => listen(bind, ident).await,
        Mode::Probe {
            connect,
            ident,
            heartbeats,
        } => probe(connect, ident, heartbeats).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "agentlink failed");
            ExitCode::FAILURE
        }
    }
}
