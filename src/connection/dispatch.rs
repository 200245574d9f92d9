//! Routing of incoming frames to per-command handlers.

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::Instant,
};

use super::AgentConnection;
use crate::{
    codec::{DecodeError, WireReader},
    command::{Command, CommandCode, Direction},
    correlation::reply_matches,
    error::ConnectionError,
    frame::{Frame, MESSAGE_TYPE_COMMAND, TransportError},
    hooks::Outcome,
    lifecycle::CloseReason,
    metrics,
};

/// Why a frame was consumed without reaching a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotHandled {
    /// The frame belongs to another subsystem.
    MessageType(u8),
    /// The command code is not in the dispatch table.
    UnknownCommand(CommandCode),
}

/// Result of processing one incoming frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler processed the frame.
    Handled {
        /// Command pair of the frame.
        command: Command,
        /// Whether it was the request or the reply.
        direction: Direction,
    },
    /// The frame was consumed and ignored.
    NotHandled(NotHandled),
    /// The body was malformed; the frame was dropped.
    Dropped(DecodeError),
}

fn peek_code(frame: &Frame) -> Option<CommandCode> {
    frame
        .payload()
        .get(..4)
        .and_then(|word| <[u8; 4]>::try_from(word).ok())
        .map(|word| CommandCode::new(frame.byte_order().read_i32(word)))
}

impl<T> AgentConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Read one frame and route it to its handler.
    ///
    /// Replies enabled for the command are sent before this returns. The
    /// connection closes if a callback returns [`Outcome::Close`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] when the peer closes the stream
    /// or the connection is already closed, [`ConnectionError::Timeout`]
    /// when the read timeout elapses, and other variants for fatal stream
    /// failures.
    pub async fn handle_one_message(&mut self) -> Result<Dispatch, ConnectionError> {
        self.ensure_connected()?;
        let frame = match self.transport.receive_frame().await {
            Ok(frame) => frame,
            Err(err) => return Err(self.receive_error(err).await),
        };
        self.dispatch_frame(frame).await
    }

    pub(super) async fn dispatch_frame(
        &mut self,
        frame: Frame,
    ) -> Result<Dispatch, ConnectionError> {
        if !frame.is_command() {
            tracing::debug!(
                message_type = frame.message_type(),
                len = frame.payload().len(),
                "ignoring frame for another subsystem"
            );
            return Ok(Dispatch::NotHandled(NotHandled::MessageType(
                frame.message_type(),
            )));
        }

        let tag = frame.tag();
        let order = frame.byte_order();
        let mut input = WireReader::new(frame.into_payload(), order);
        let code = match input.get_i32() {
            Ok(raw) => CommandCode::new(raw),
            Err(err) => return self.drop_frame(None, err).await,
        };
        let Some((command, direction)) = code.resolve() else {
            tracing::warn!(code = code.get(), tag, "unknown command code, frame dropped");
            metrics::inc_unknown_commands();
            return Ok(Dispatch::NotHandled(NotHandled::UnknownCommand(code)));
        };

        self.last_command = Some(code);
        metrics::inc_frames(metrics::Direction::Inbound, command.name());
        tracing::debug!(command = %code, tag, "command received");

        let outcome = match direction {
            Direction::Request => {
                let reply_order = self.config.get_byte_order();
                let handled = self.hooks.handlers.slot_mut(command).handle_request(
                    &mut input,
                    &mut self.ctx,
                    reply_order,
                );
                let result = match handled {
                    Ok(result) => result,
                    Err(err) => return self.drop_frame(Some(code), err).await,
                };
                if let Some(body) = result.reply {
                    self.send_reply_body(command, tag, body).await?;
                }
                result.outcome
            }
            Direction::Reply => {
                let handled = self
                    .hooks
                    .handlers
                    .slot_mut(command)
                    .handle_reply(&mut input, &mut self.ctx);
                match handled {
                    Ok(outcome) => outcome,
                    Err(err) => return self.drop_frame(Some(code), err).await,
                }
            }
        };

        self.decode_failures = 0;
        if command == Command::Init {
            self.record_peer_ident(direction);
        }
        if outcome == Outcome::Close {
            self.close(CloseReason::Requested).await;
        }
        Ok(Dispatch::Handled { command, direction })
    }

    fn record_peer_ident(&mut self, direction: Direction) {
        let init = &self.hooks.handlers.init;
        let identity = match direction {
            Direction::Request => init.last_request(),
            Direction::Reply => init.last_reply(),
        };
        if let Some(identity) = identity {
            let name = identity.name.clone();
            self.ctx.set_peer_ident(name);
        }
    }

    async fn send_reply_body(
        &mut self,
        command: Command,
        tag: u8,
        body: Bytes,
    ) -> Result<(), ConnectionError> {
        let sent = self
            .transport
            .send_frame(MESSAGE_TYPE_COMMAND, tag, body)
            .await;
        self.hooks.handlers.slot_mut(command).reply_sent();
        match sent {
            Ok(()) => {
                metrics::inc_frames(metrics::Direction::Outbound, command.name());
                tracing::debug!(command = %command.reply_code(), tag, "reply sent");
                Ok(())
            }
            Err(err) => Err(self.send_error(err).await),
        }
    }

    async fn drop_frame(
        &mut self,
        code: Option<CommandCode>,
        err: DecodeError,
    ) -> Result<Dispatch, ConnectionError> {
        self.decode_failures += 1;
        metrics::inc_decode_failures();
        tracing::warn!(
            command = ?code.map(|code| code.to_string()),
            error = %err,
            failures = self.decode_failures,
            "malformed command frame dropped"
        );
        if self.decode_failures > self.config.get_max_decode_failures() {
            let failures = self.decode_failures;
            return Err(self
                .fail(ConnectionError::TooManyDecodeFailures(failures))
                .await);
        }
        Ok(Dispatch::Dropped(err))
    }

    /// Dispatch frames until the reply to `command` tagged `tag` arrives.
    ///
    /// Unrelated frames, including requests from the peer, are handled
    /// normally while waiting. Read timeouts do not end the wait; only the
    /// reply deadline does.
    pub(super) async fn await_reply(
        &mut self,
        command: Command,
        tag: u8,
    ) -> Result<(), ConnectionError> {
        let expected = command.reply_code();
        let limit = self.config.get_reply_timeout();
        let deadline = Instant::now() + limit;
        loop {
            self.ensure_connected()?;
            let received =
                tokio::time::timeout_at(deadline, self.transport.receive_frame()).await;
            let frame = match received {
                Ok(Ok(frame)) => frame,
                Ok(Err(TransportError::Timeout(idle))) => {
                    tracing::debug!(?idle, command = %expected, "still awaiting reply");
                    continue;
                }
                Ok(Err(err)) => return Err(self.receive_error(err).await),
                Err(_) => return Err(ConnectionError::Timeout(limit)),
            };

            let reply_code = peek_code(&frame)
                .filter(|_| frame.is_command() && reply_matches(tag, frame.tag()))
                .filter(|code| matches!(code.resolve(), Some((_, Direction::Reply))));
            match reply_code {
                Some(code) if code == expected => {
                    if let Dispatch::Handled { .. } = self.dispatch_frame(frame).await? {
                        return Ok(());
                    }
                }
                Some(code) if frame.tag() == tag => {
                    self.dispatch_frame(frame).await?;
                    tracing::warn!(
                        expected = %expected,
                        received = %code,
                        tag,
                        "correlated reply has unexpected command"
                    );
                    return Err(ConnectionError::UnexpectedReply {
                        expected,
                        received: code,
                    });
                }
                _ => {
                    self.dispatch_frame(frame).await?;
                }
            }
        }
    }
}
