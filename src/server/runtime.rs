//! Running a bound [`AgentServer`].

use std::future::Future;

use log::warn;
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    AgentServer,
    Bound,
    ConnectionFactory,
    ServerError,
    accept::{AcceptContext, accept_loop},
};

impl<F> AgentServer<F, Bound>
where
    F: ConnectionFactory,
{
    /// Serve connections until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Accept failures are retried and never surface; the `Result` is kept
    /// for future setup failures.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Serve connections until `shutdown` resolves.
    ///
    /// On shutdown the accept loop stops, every open connection is closed
    /// locally and the call returns once all connection tasks ended.
    ///
    /// ```
    /// use tokio::sync::oneshot;
    /// use agentlink::{connection::AgentConnection, server::AgentServer};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), agentlink::server::ServerError> {
    /// let server = AgentServer::new(|| AgentConnection::builder("frontend"))
    ///     .bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(server.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    /// let _ = tx.send(());
    /// handle.await.expect("join server task")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let AgentServer {
            factory,
            backoff_config,
            ready_tx,
            registry,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        tracker.spawn(accept_loop(
            listener,
            factory,
            AcceptContext {
                shutdown: shutdown_token.clone(),
                tracker: tracker.clone(),
                backoff: backoff_config,
                registry,
            },
        ));

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        Ok(())
    }
}
