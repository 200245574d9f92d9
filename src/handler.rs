//! Per-command request/reply handlers.
//!
//! A connection owns one [`CommandHandler`] per command pair. The handler
//! decodes incoming payloads, runs the registered callback, remembers the
//! last request and reply it saw, and encodes outgoing bodies. It tracks a
//! small state machine:
//!
//! ```text
//! initiator:  Idle --send_request--> RequestSent --on_reply--> Idle
//! responder:  Idle --on_request--> RequestReceived --reply sent/skipped--> Idle
//! ```
//!
//! [`CommandSlot`] erases the payload types so the connection can route a
//! decoded command code to the right handler.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    byte_order::ByteOrder,
    codec::{DecodeError, Encode, INT_SIZE, WireReader, WireWriter},
    command::{Command, CommandCode},
    frame::{FrameTransport, MESSAGE_TYPE_COMMAND, TransportError},
    hooks::{Outcome, ReplyHook, RequestHook, SessionContext},
    payload::Payload,
};

mod table;

pub use table::Handlers;

/// Position of a handler in its request/reply exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandlerState {
    /// No exchange in progress.
    #[default]
    Idle,
    /// A request was sent and its reply is awaited.
    RequestSent,
    /// A request was received and its reply is being sent.
    RequestReceived,
}

/// Result of handling an incoming request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestResult {
    /// What the callback asked the connection to do.
    pub outcome: Outcome,
    /// Encoded reply body to send back, if replies are enabled.
    pub reply: Option<Bytes>,
}

/// Encode `code` followed by `payload` as a command body.
pub(crate) fn encode_body<P: Encode + ?Sized>(
    code: CommandCode,
    payload: &P,
    order: ByteOrder,
) -> Bytes {
    let mut out = WireWriter::with_capacity(INT_SIZE + payload.wire_size(), order);
    out.put_i32(code.get());
    payload.encode(&mut out);
    out.freeze()
}

fn note_trailing(command: Command, input: &WireReader) {
    if input.remaining() > 0 {
        tracing::debug!(
            command = command.name(),
            trailing = input.remaining(),
            "ignoring trailing bytes after payload"
        );
    }
}

/// Request/reply handler for one command pair.
pub struct CommandHandler<Req, Rep> {
    command: Command,
    state: HandlerState,
    reply_enabled: bool,
    last_request: Option<Req>,
    last_reply: Option<Rep>,
    on_request: Option<RequestHook<Req, Rep>>,
    on_reply: Option<ReplyHook<Rep>>,
}

impl<Req, Rep> CommandHandler<Req, Rep>
where
    Req: Payload,
    Rep: Payload,
{
    /// Create an idle handler without callbacks.
    ///
    /// Replies are enabled according to the dispatch table.
    #[must_use]
    pub fn new(command: Command) -> Self {
        debug_assert_eq!(command.entry().request_payload, Req::KIND);
        debug_assert_eq!(command.entry().reply_payload, Rep::KIND);
        Self {
            command,
            state: HandlerState::Idle,
            reply_enabled: command.entry().reply_by_default,
            last_request: None,
            last_reply: None,
            on_request: None,
            on_reply: None,
        }
    }

    /// Command pair served by this handler.
    #[must_use]
    pub fn command(&self) -> Command { self.command }

    /// Current exchange state.
    #[must_use]
    pub fn state(&self) -> HandlerState { self.state }

    /// Last request decoded by this handler.
    #[must_use]
    pub fn last_request(&self) -> Option<&Req> { self.last_request.as_ref() }

    /// Last reply decoded by this handler.
    #[must_use]
    pub fn last_reply(&self) -> Option<&Rep> { self.last_reply.as_ref() }

    /// Whether a reply is sent after the request callback runs.
    #[must_use]
    pub fn reply_enabled(&self) -> bool { self.reply_enabled }

    /// Enable or disable the reply.
    pub fn set_reply_enabled(&mut self, enabled: bool) { self.reply_enabled = enabled; }

    /// Register the callback run for each incoming request.
    ///
    /// The callback fills in the reply, which starts out as `Rep::default()`.
    pub fn set_request_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut SessionContext, &Req, &mut Rep) -> Outcome + Send + 'static,
    {
        self.on_request = Some(Box::new(callback));
    }

    /// Register the callback run for each incoming reply.
    pub fn set_reply_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut SessionContext, &Rep) -> Outcome + Send + 'static,
    {
        self.on_reply = Some(Box::new(callback));
    }

    /// Encode a request body: request code, then payload.
    #[must_use]
    pub fn encode_request(&self, request: &Req, order: ByteOrder) -> Bytes {
        encode_body(self.command.request_code(), request, order)
    }

    /// Encode a reply body: reply code, then payload.
    #[must_use]
    pub fn encode_reply(&self, reply: &Rep, order: ByteOrder) -> Bytes {
        encode_body(self.command.reply_code(), reply, order)
    }

    /// Decode a request payload and run the request callback.
    ///
    /// Without a callback the request is recorded and nothing else happens.
    /// The reply body, if any, is encoded in `reply_order`.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] of a malformed payload. The handler state
    /// is left unchanged in that case.
    pub fn on_request(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
        reply_order: ByteOrder,
    ) -> Result<RequestResult, DecodeError> {
        let request = Req::decode(input)?;
        note_trailing(self.command, input);
        self.state = HandlerState::RequestReceived;

        let result = if let Some(callback) = self.on_request.as_mut() {
            let mut reply = Rep::default();
            let outcome = callback(ctx, &request, &mut reply);
            let reply = self
                .reply_enabled
                .then(|| encode_body(self.command.reply_code(), &reply, reply_order));
            RequestResult { outcome, reply }
        } else {
            tracing::debug!(command = self.command.name(), "no request callback registered");
            RequestResult {
                outcome: Outcome::Continue,
                reply: None,
            }
        };

        self.last_request = Some(request);
        if result.reply.is_none() {
            self.state = HandlerState::Idle;
        }
        Ok(result)
    }

    /// Decode a reply payload and run the reply callback.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] of a malformed payload.
    pub fn on_reply(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
    ) -> Result<Outcome, DecodeError> {
        let reply = Rep::decode(input)?;
        note_trailing(self.command, input);
        let outcome = match self.on_reply.as_mut() {
            Some(callback) => callback(ctx, &reply),
            None => Outcome::Continue,
        };
        self.last_reply = Some(reply);
        self.state = HandlerState::Idle;
        Ok(outcome)
    }

    /// Encode and send a request carrying correlation `tag`.
    ///
    /// The handler moves to [`HandlerState::RequestSent`] when the pair
    /// replies by default.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised while writing the frame.
    pub async fn send_request<T>(
        &mut self,
        transport: &mut FrameTransport<T>,
        tag: u8,
        request: &Req,
    ) -> Result<(), TransportError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let body = self.encode_request(request, transport.byte_order());
        transport
            .send_frame(MESSAGE_TYPE_COMMAND, tag, body)
            .await?;
        if self.command.entry().reply_by_default {
            self.state = HandlerState::RequestSent;
        }
        Ok(())
    }

    /// Give up on an outstanding request; the handler returns to
    /// [`HandlerState::Idle`] without a reply.
    pub fn abandon_request(&mut self) {
        if self.state == HandlerState::RequestSent {
            tracing::debug!(command = self.command.name(), "request abandoned");
            self.state = HandlerState::Idle;
        }
    }

    /// Encode and send a reply carrying correlation `tag`.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] raised while writing the frame.
    pub async fn send_reply<T>(
        &mut self,
        transport: &mut FrameTransport<T>,
        tag: u8,
        reply: &Rep,
    ) -> Result<(), TransportError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let body = self.encode_reply(reply, transport.byte_order());
        let sent = transport.send_frame(MESSAGE_TYPE_COMMAND, tag, body).await;
        self.state = HandlerState::Idle;
        sent
    }
}

/// Type-erased view of a [`CommandHandler`] used for routing.
pub trait CommandSlot: Send {
    /// Command pair served by the handler.
    fn command(&self) -> Command;

    /// Current exchange state.
    fn state(&self) -> HandlerState;

    /// Whether replies are sent.
    fn reply_enabled(&self) -> bool;

    /// Enable or disable replies.
    fn set_reply_enabled(&mut self, enabled: bool);

    /// See [`CommandHandler::on_request`].
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] of a malformed payload.
    fn handle_request(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
        reply_order: ByteOrder,
    ) -> Result<RequestResult, DecodeError>;

    /// See [`CommandHandler::on_reply`].
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] of a malformed payload.
    fn handle_reply(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
    ) -> Result<Outcome, DecodeError>;

    /// Record that the reply to a received request went out.
    fn reply_sent(&mut self);
}

impl<Req, Rep> CommandSlot for CommandHandler<Req, Rep>
where
    Req: Payload,
    Rep: Payload,
{
    fn command(&self) -> Command { self.command }

    fn state(&self) -> HandlerState { self.state }

    fn reply_enabled(&self) -> bool { self.reply_enabled }

    fn set_reply_enabled(&mut self, enabled: bool) { self.reply_enabled = enabled; }

    fn handle_request(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
        reply_order: ByteOrder,
    ) -> Result<RequestResult, DecodeError> {
        self.on_request(input, ctx, reply_order)
    }

    fn handle_reply(
        &mut self,
        input: &mut WireReader,
        ctx: &mut SessionContext,
    ) -> Result<Outcome, DecodeError> {
        self.on_reply(input, ctx)
    }

    fn reply_sent(&mut self) { self.state = HandlerState::Idle; }
}
