//! Accept loop and per-connection tasks.

use std::{any::Any, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use log::{error, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    time::sleep,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{BackoffConfig, ConnectionFactory, ConnectionId, PeerRegistry};
use crate::{
    command::Command,
    connection::{ConnectionState, Dispatch},
    error::ConnectionError,
};

/// Shared state handed to the accept loop.
pub(super) struct AcceptContext {
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
    pub registry: Arc<PeerRegistry>,
}

/// Accept connections until `shutdown` is cancelled.
///
/// Accept failures are logged and retried after an exponentially growing
/// delay that resets on the next success.
pub(super) async fn accept_loop<F>(listener: Arc<TcpListener>, factory: F, ctx: AcceptContext)
where
    F: ConnectionFactory,
{
    let backoff = ctx.backoff.normalized();
    let mut delay = backoff.initial_delay;
    while let Some(next) = accept_iteration(&listener, &factory, &ctx, &backoff, delay).await {
        delay = next;
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn accept_iteration<F>(
    listener: &TcpListener,
    factory: &F,
    ctx: &AcceptContext,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    F: ConnectionFactory,
{
    select! {
        biased;

        () = ctx.shutdown.cancelled() => None,
        res = listener.accept() => Some(match res {
            Ok((stream, peer_addr)) => {
                spawn_connection_task(stream, peer_addr, factory.clone(), ctx);
                backoff.initial_delay
            }
            Err(e) => {
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                sleep(delay).await;
                backoff.next_delay(delay)
            }
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

/// Spawn a task serving one TCP peer, logging and discarding any panic.
fn spawn_connection_task<F>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    factory: F,
    ctx: &AcceptContext,
) where
    F: ConnectionFactory,
{
    if let Err(e) = stream.set_nodelay(true) {
        warn!("failed to disable Nagle: error={e}, peer_addr={peer_addr}");
    }
    let registry = Arc::clone(&ctx.registry);
    let shutdown = ctx.shutdown.clone();
    let id = registry.register(peer_addr);
    ctx.tracker.spawn(async move {
        let served = AssertUnwindSafe(serve_connection(
            stream,
            peer_addr,
            id,
            factory,
            &registry,
            shutdown,
        ))
        .catch_unwind()
        .await;
        registry.remove(id);

        if let Err(panic) = served {
            crate::metrics::inc_connection_panics();
            let panic_msg = panic_message(panic.as_ref());
            // Emit via both `log` and `tracing` for tests that capture either.
            error!("connection task panicked: panic={panic_msg}, peer_addr={peer_addr}");
            tracing::error!(panic = %panic_msg, %peer_addr, "connection task panicked");
        }
    });
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn serve_connection<F>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: ConnectionId,
    factory: F,
    registry: &PeerRegistry,
    shutdown: CancellationToken,
) where
    F: ConnectionFactory,
{
    let mut conn = factory().build_with_peer(stream, Some(peer_addr));
    tracing::info!(%id, %peer_addr, "agent connected");
    loop {
        let handled = select! {
            biased;

            () = shutdown.cancelled() => {
                conn.shutdown().await;
                break;
            }
            handled = conn.handle_one_message() => handled,
        };
        match handled {
            Ok(Dispatch::Handled {
                command: Command::Init,
                ..
            }) => {
                if let Some(ident) = conn.peer_ident() {
                    registry.set_ident(id, ident);
                }
            }
            Ok(_) => {}
            Err(ConnectionError::Closed) => break,
            Err(err) if err.is_recoverable() => {
                tracing::debug!(%id, error = %err, "continuing after recoverable error");
            }
            Err(err) => {
                warn!("agent connection failed: error={err}, peer_addr={peer_addr}");
                break;
            }
        }
        if conn.state() == ConnectionState::Closed {
            break;
        }
    }
    tracing::info!(
        %id,
        %peer_addr,
        peer = ?conn.peer_ident(),
        reason = ?conn.close_reason(),
        "agent disconnected"
    );
}
