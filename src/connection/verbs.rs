//! One high-level operation per command pair.
//!
//! Every verb encodes its request through the pair's handler and writes it
//! with a fresh correlation tag. Only [`AgentConnection::init`] waits for a
//! reply; the other pairs do not reply by default.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use super::AgentConnection;
use crate::{
    command::Command,
    error::ConnectionError,
    handler::{CommandHandler, Handlers},
    lifecycle::CloseReason,
    metrics,
    payload::{
        Empty,
        Heartbeat,
        IdMapping,
        Identity,
        OpaqueBlob,
        ParentAddress,
        Payload,
        ReinitMap,
        TaggedAck,
        XmlPayload,
    },
};

type Select<Req, Rep> = fn(&mut Handlers) -> &mut CommandHandler<Req, Rep>;

impl<T> AgentConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Send one request and return the correlation tag it carried.
    async fn request<Req, Rep>(
        &mut self,
        select: Select<Req, Rep>,
        request: &Req,
    ) -> Result<u8, ConnectionError>
    where
        Req: Payload,
        Rep: Payload,
    {
        self.ensure_connected()?;
        let tag = self.correlation.next_id();
        let handler = select(&mut self.hooks.handlers);
        let command = handler.command();
        match handler.send_request(&mut self.transport, tag, request).await {
            Ok(()) => {
                metrics::inc_frames(metrics::Direction::Outbound, command.name());
                tracing::debug!(command = %command.request_code(), tag, "request sent");
                Ok(tag)
            }
            Err(err) => Err(self.send_error(err).await),
        }
    }

    /// Announce this side and wait for the peer's identity.
    ///
    /// Requests the peer sends meanwhile are handled as usual. The peer
    /// identity is available from [`peer_ident`](Self::peer_ident)
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Timeout`] if no INIT reply arrives within
    /// the reply timeout, which outlasts any shorter read timeout, and
    /// [`ConnectionError::UnexpectedReply`] if a different reply carries our
    /// correlation tag. The INIT handler returns to idle on failure.
    pub async fn init(&mut self) -> Result<Identity, ConnectionError> {
        let request = Identity::new(self.ctx.my_ident());
        let tag = self.request(|h| &mut h.init, &request).await?;
        if let Err(err) = self.await_reply(Command::Init, tag).await {
            self.hooks.handlers.init.abandon_request();
            return Err(err);
        }
        Ok(self
            .hooks
            .handlers
            .init
            .last_reply()
            .cloned()
            .unwrap_or_default())
    }

    /// Tell the peer to shut down, then close this side without waiting.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request; the connection
    /// is closed in every case.
    pub async fn quit(&mut self) -> Result<(), ConnectionError> {
        let sent = self.request(|h| &mut h.quit, &Empty).await;
        self.close(CloseReason::Quit).await;
        sent.map(|_| ())
    }

    /// Ask the peer to renumber the listed identifiers.
    ///
    /// More than [`crate::payload::REINIT_MAP_CAPACITY`] mappings are
    /// truncated.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn reinit(
        &mut self,
        mappings: impl IntoIterator<Item = IdMapping>,
    ) -> Result<(), ConnectionError> {
        let map: ReinitMap = mappings.into_iter().collect();
        self.request(|h| &mut h.reinit, &map).await.map(|_| ())
    }

    /// Start the peer with an opaque startup blob.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn start(&mut self, blob: impl Into<Bytes>) -> Result<(), ConnectionError> {
        let request = OpaqueBlob::new(blob);
        self.request(|h| &mut h.start, &request).await.map(|_| ())
    }

    /// Report liveness of `hostname`.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn heartbeat(
        &mut self,
        hostname: impl Into<String>,
        port: i32,
        tag: impl Into<String>,
        kind: i32,
        num_procs: i32,
    ) -> Result<(), ConnectionError> {
        let request = Heartbeat {
            hostname: hostname.into(),
            tag: tag.into(),
            port,
            kind,
            num_procs,
        };
        self.request(|h| &mut h.heartbeat, &request).await.map(|_| ())
    }

    /// Probe the peer.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn check(&mut self) -> Result<(), ConnectionError> {
        self.request(|h| &mut h.check, &Empty).await.map(|_| ())
    }

    /// Tell the peer where its new parent listens.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn setparent(
        &mut self,
        hostname: impl Into<String>,
        port: i32,
    ) -> Result<(), ConnectionError> {
        let request = ParentAddress {
            hostname: hostname.into(),
            port,
        };
        self.request(|h| &mut h.setparent, &request).await.map(|_| ())
    }

    /// Report that the search tagged `tag` finished.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn searchfinished(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.searchfinished, &request)
            .await
            .map(|_| ())
    }

    /// Ask for a restart of the application run tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn needrestart(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.needrestart, &request).await.map(|_| ())
    }

    /// Ask the peer to terminate.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn terminate(&mut self) -> Result<(), ConnectionError> {
        self.request(|h| &mut h.terminate, &Empty).await.map(|_| ())
    }

    /// Report that the subtree tagged `tag` terminated.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn terminated(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.terminated, &request).await.map(|_| ())
    }

    /// Report that all properties for `tag` were sent.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn propertiessent(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.propertiessent, &request)
            .await
            .map(|_| ())
    }

    /// Request an experiment for `tag`.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn reqexperiment(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.reqexperiment, &request)
            .await
            .map(|_| ())
    }

    /// Start the requested experiment.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn startexperiment(&mut self) -> Result<(), ConnectionError> {
        self.request(|h| &mut h.startexperiment, &Empty)
            .await
            .map(|_| ())
    }

    /// Report a found property as an XML document.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn foundprop(&mut self, xml: impl Into<String>) -> Result<(), ConnectionError> {
        let request = XmlPayload::new(xml);
        self.request(|h| &mut h.foundprop, &request).await.map(|_| ())
    }

    /// Ask the peer to serialise its call tree.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn serializecalltree(&mut self) -> Result<(), ConnectionError> {
        self.request(|h| &mut h.calltreeserial, &Empty)
            .await
            .map(|_| ())
    }

    /// Send a serialised call tree.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn sendcalltree(&mut self, xml: impl Into<String>) -> Result<(), ConnectionError> {
        let request = XmlPayload::new(xml);
        self.request(|h| &mut h.calltree, &request).await.map(|_| ())
    }

    /// Report that the call tree for `tag` was sent.
    ///
    /// # Errors
    ///
    /// Returns the error raised while writing the request.
    pub async fn calltreesent(&mut self, tag: impl Into<String>) -> Result<(), ConnectionError> {
        let request = TaggedAck::new(tag);
        self.request(|h| &mut h.calltreesent, &request)
            .await
            .map(|_| ())
    }
}
