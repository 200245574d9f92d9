//! Protocol callbacks invoked by agent connections.
//!
//! [`AgentProtocol`] is the interface collaborators implement: one method per
//! command request plus a few connection-level events. Every method has a
//! default, so implementations override only what they care about.
//! [`ProtocolHooks`] turns a protocol into the closure table the connection
//! actually calls.

use std::{net::SocketAddr, sync::Arc};

use crate::{
    command::Command,
    handler::{CommandSlot, Handlers},
    lifecycle::CloseReason,
    payload::{
        Empty,
        Heartbeat,
        Identity,
        OpaqueBlob,
        ParentAddress,
        ReinitMap,
        TaggedAck,
        XmlPayload,
    },
};

/// What the connection does after a callback returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Outcome {
    /// Keep the connection open.
    #[default]
    Continue,
    /// Close the connection once any reply has been sent.
    Close,
}

/// Per-connection data passed to every callback.
#[derive(Clone, Debug)]
pub struct SessionContext {
    my_ident: String,
    peer_ident: Option<String>,
    peer_addr: Option<SocketAddr>,
}

impl SessionContext {
    /// Create a context for a connection identifying itself as `my_ident`.
    #[must_use]
    pub fn new(my_ident: impl Into<String>, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            my_ident: my_ident.into(),
            peer_ident: None,
            peer_addr,
        }
    }

    /// Identity announced by this side.
    #[must_use]
    pub fn my_ident(&self) -> &str { &self.my_ident }

    /// Identity announced by the peer during INIT, if known.
    #[must_use]
    pub fn peer_ident(&self) -> Option<&str> { self.peer_ident.as_deref() }

    /// Remote socket address, when the stream has one.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.peer_addr }

    pub(crate) fn set_peer_ident(&mut self, ident: impl Into<String>) {
        self.peer_ident = Some(ident.into());
    }
}

/// Callback run for an incoming request; fills in the reply.
pub type RequestHook<Req, Rep> =
    Box<dyn FnMut(&mut SessionContext, &Req, &mut Rep) -> Outcome + Send + 'static>;

/// Callback run for an incoming reply.
pub type ReplyHook<Rep> = Box<dyn FnMut(&mut SessionContext, &Rep) -> Outcome + Send + 'static>;

/// Callback run once when the connection closes.
pub type ClosedHook = Box<dyn FnMut(&SessionContext, &CloseReason) + Send + 'static>;

fn log_request(ctx: &SessionContext, command: Command) -> Outcome {
    tracing::debug!(
        command = command.name(),
        peer = ctx.peer_ident().unwrap_or("<unknown>"),
        "request received"
    );
    Outcome::Continue
}

/// Application logic driven by an agent connection.
///
/// Request methods receive the decoded request and a reply pre-set to its
/// default value. The reply is sent only for pairs whose reply is enabled
/// (by default only INIT, see [`crate::command::CommandEntry::reply_by_default`]).
///
/// ```
/// use agentlink::{
///     hooks::{AgentProtocol, Outcome, SessionContext},
///     payload::Heartbeat,
/// };
///
/// struct Monitor;
///
/// impl AgentProtocol for Monitor {
///     fn on_heartbeat(
///         &self,
///         _ctx: &mut SessionContext,
///         request: &Heartbeat,
///         _reply: &mut Heartbeat,
///     ) -> Outcome {
///         tracing::info!(host = %request.hostname, "agent alive");
///         Outcome::Continue
///     }
/// }
/// ```
pub trait AgentProtocol: Send + Sync + 'static {
    /// INIT request. The default answers with this side's identity.
    ///
    /// Overrides must fill `reply` themselves if the peer expects an
    /// identity back.
    fn on_init(
        &self,
        ctx: &mut SessionContext,
        request: &Identity,
        reply: &mut Identity,
    ) -> Outcome {
        tracing::debug!(peer = %request.name, "init request received");
        reply.name = ctx.my_ident().to_owned();
        Outcome::Continue
    }

    /// INIT reply carrying the peer identity.
    fn on_init_reply(&self, _ctx: &mut SessionContext, reply: &Identity) -> Outcome {
        tracing::debug!(peer = %reply.name, "init reply received");
        Outcome::Continue
    }

    /// QUIT request. The default closes the connection.
    fn on_quit(&self, ctx: &mut SessionContext, _request: &Empty, _reply: &mut Empty) -> Outcome {
        log_request(ctx, Command::Quit);
        Outcome::Close
    }

    /// REINIT request.
    fn on_reinit(
        &self,
        ctx: &mut SessionContext,
        request: &ReinitMap,
        _reply: &mut ReinitMap,
    ) -> Outcome {
        tracing::debug!(mappings = request.len(), "reinit request received");
        log_request(ctx, Command::Reinit)
    }

    /// START request.
    fn on_start(
        &self,
        ctx: &mut SessionContext,
        _request: &OpaqueBlob,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::Start)
    }

    /// HEARTBEAT request.
    fn on_heartbeat(
        &self,
        ctx: &mut SessionContext,
        _request: &Heartbeat,
        _reply: &mut Heartbeat,
    ) -> Outcome {
        log_request(ctx, Command::Heartbeat)
    }

    /// CHECK request.
    fn on_check(&self, ctx: &mut SessionContext, _request: &Empty, _reply: &mut Empty) -> Outcome {
        log_request(ctx, Command::Check)
    }

    /// FOUNDPROP request.
    fn on_foundprop(
        &self,
        ctx: &mut SessionContext,
        _request: &XmlPayload,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::FoundProp)
    }

    /// SEARCHFINISHED request.
    fn on_searchfinished(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::SearchFinished)
    }

    /// NEEDRESTART request.
    fn on_needrestart(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::NeedRestart)
    }

    /// TERMINATE request.
    fn on_terminate(
        &self,
        ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::Terminate)
    }

    /// TERMINATED request.
    fn on_terminated(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::Terminated)
    }

    /// PROPERTIESSENT request.
    fn on_propertiessent(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::PropertiesSent)
    }

    /// REQEXPERIMENT request.
    fn on_reqexperiment(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::ReqExperiment)
    }

    /// STARTEXPERIMENT request.
    fn on_startexperiment(
        &self,
        ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::StartExperiment)
    }

    /// SETPARENT request.
    fn on_setparent(
        &self,
        ctx: &mut SessionContext,
        _request: &ParentAddress,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::SetParent)
    }

    /// CALLTREESERIAL request.
    fn on_serializecalltree(
        &self,
        ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::CallTreeSerial)
    }

    /// CALLTREE request.
    fn on_calltree(
        &self,
        ctx: &mut SessionContext,
        _request: &XmlPayload,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::CallTree)
    }

    /// CALLTREESENT request.
    fn on_calltreesent(
        &self,
        ctx: &mut SessionContext,
        _request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        log_request(ctx, Command::CallTreeSent)
    }

    /// Called exactly once when the connection reaches the closed state.
    fn on_connection_closed(&self, _ctx: &SessionContext, _reason: &CloseReason) {}
}

/// Callbacks used by an agent connection.
#[derive(Default)]
pub struct ProtocolHooks {
    /// Per-command handlers holding the request and reply callbacks.
    pub handlers: Handlers,
    /// Invoked when the connection closes.
    pub on_connection_closed: Option<ClosedHook>,
}

impl ProtocolHooks {
    /// Construct hooks from an [`AgentProtocol`] implementation.
    pub fn from_protocol<P>(protocol: &Arc<P>) -> Self
    where
        P: AgentProtocol + ?Sized,
    {
        let mut handlers = Handlers::new();
        handlers.register_requests(protocol);

        let protocol_init = Arc::clone(protocol);
        handlers
            .init
            .set_reply_callback(move |ctx, reply| protocol_init.on_init_reply(ctx, reply));

        let protocol_closed = Arc::clone(protocol);
        let on_closed = Box::new(move |ctx: &SessionContext, reason: &CloseReason| {
            protocol_closed.on_connection_closed(ctx, reason);
        }) as ClosedHook;

        Self {
            handlers,
            on_connection_closed: Some(on_closed),
        }
    }

    /// Whether `command` answers incoming requests with a reply.
    #[must_use]
    pub fn reply_enabled(&self, command: Command) -> bool {
        self.handlers.slot(command).reply_enabled()
    }

    /// Enable or disable the reply for `command`.
    pub fn set_reply_enabled(&mut self, command: Command, enabled: bool) {
        self.handlers.slot_mut(command).set_reply_enabled(enabled);
    }

    /// Run the `on_connection_closed` hook if registered.
    pub fn on_connection_closed(&mut self, ctx: &SessionContext, reason: &CloseReason) {
        if let Some(hook) = &mut self.on_connection_closed {
            hook(ctx, reason);
        }
    }
}
