//! Command line interface for the `agentlink` binary.
//!
//! `listen` runs a frontend that logs every command it receives; `probe`
//! connects as an agent, announces itself and sends heartbeats.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

/// Command line arguments for the `agentlink` binary.
#[derive(Debug, Parser)]
#[command(name = "agentlink", version, about = "Agent command link demo")]
pub struct Cli {
    /// Mode to run.
    #[command(subcommand)]
    pub command: Mode,
}

/// Demo modes.
#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Accept agent connections and log every command.
    Listen {
        /// Address to bind.
        #[arg(short, long, default_value = "127.0.0.1:7777")]
        bind: SocketAddr,
        /// Identity announced to agents.
        #[arg(short, long, default_value = "frontend")]
        ident: String,
    },
    /// Connect to a listener, send heartbeats and quit.
    Probe {
        /// Address to connect to.
        #[arg(short, long, default_value = "127.0.0.1:7777")]
        connect: SocketAddr,
        /// Identity announced to the listener.
        #[arg(short, long, default_value = "probe")]
        ident: String,
        /// Number of heartbeats to send.
        #[arg(long, default_value_t = 1)]
        heartbeats: u32,
    },
}
