//! An [`AgentProtocol`] that records every callback.

use std::sync::{Arc, Mutex, MutexGuard};

use agentlink::{
    command::Command,
    hooks::{AgentProtocol, Outcome, SessionContext},
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
use rstest::fixture;

/// One callback observed by [`RecordingProtocol`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// A request without a payload worth keeping.
    Request(Command),
    /// INIT request.
    Init(Identity),
    /// INIT reply.
    InitReply(Identity),
    /// REINIT request.
    Reinit(ReinitMap),
    /// START request.
    Start(OpaqueBlob),
    /// HEARTBEAT request.
    Heartbeat(Heartbeat),
    /// SETPARENT request.
    SetParent(ParentAddress),
    /// Request carrying a tag.
    Tagged(Command, String),
    /// Request carrying an XML document.
    Xml(Command, String),
    /// The connection closed.
    Closed(CloseReason),
}

/// Protocol recording every callback in order.
///
/// INIT requests are answered with the local identity like the default
/// protocol; QUIT requests close the connection.
#[derive(Debug, Default)]
pub struct RecordingProtocol {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingProtocol {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    fn push(&self, event: Recorded) -> Outcome {
        self.lock().push(event);
        Outcome::Continue
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Recorded>> {
        self.events.lock().expect("recording lock poisoned")
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Recorded> { self.lock().clone() }

    /// Recorded heartbeats, in arrival order.
    #[must_use]
    pub fn heartbeats(&self) -> Vec<Heartbeat> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                Recorded::Heartbeat(beat) => Some(beat.clone()),
                _ => None,
            })
            .collect()
    }

    /// Close reasons seen, normally at most one.
    #[must_use]
    pub fn close_reasons(&self) -> Vec<CloseReason> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                Recorded::Closed(reason) => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Fresh shared recorder.
#[fixture]
pub fn recorder() -> Arc<RecordingProtocol> { Arc::new(RecordingProtocol::new()) }

impl AgentProtocol for RecordingProtocol {
    fn on_init(
        &self,
        ctx: &mut SessionContext,
        request: &Identity,
        reply: &mut Identity,
    ) -> Outcome {
        reply.name = ctx.my_ident().to_owned();
        self.push(Recorded::Init(request.clone()))
    }

    fn on_init_reply(&self, _ctx: &mut SessionContext, reply: &Identity) -> Outcome {
        self.push(Recorded::InitReply(reply.clone()))
    }

    fn on_quit(&self, _ctx: &mut SessionContext, _request: &Empty, _reply: &mut Empty) -> Outcome {
        self.push(Recorded::Request(Command::Quit));
        Outcome::Close
    }

    fn on_reinit(
        &self,
        _ctx: &mut SessionContext,
        request: &ReinitMap,
        _reply: &mut ReinitMap,
    ) -> Outcome {
        self.push(Recorded::Reinit(request.clone()))
    }

    fn on_start(
        &self,
        _ctx: &mut SessionContext,
        request: &OpaqueBlob,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Start(request.clone()))
    }

    fn on_heartbeat(
        &self,
        _ctx: &mut SessionContext,
        request: &Heartbeat,
        _reply: &mut Heartbeat,
    ) -> Outcome {
        self.push(Recorded::Heartbeat(request.clone()))
    }

    fn on_check(&self, _ctx: &mut SessionContext, _request: &Empty, _reply: &mut Empty) -> Outcome {
        self.push(Recorded::Request(Command::Check))
    }

    fn on_foundprop(
        &self,
        _ctx: &mut SessionContext,
        request: &XmlPayload,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Xml(Command::FoundProp, request.xml.clone()))
    }

    fn on_searchfinished(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::SearchFinished, request.tag.clone()))
    }

    fn on_needrestart(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::NeedRestart, request.tag.clone()))
    }

    fn on_terminate(
        &self,
        _ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Request(Command::Terminate))
    }

    fn on_terminated(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::Terminated, request.tag.clone()))
    }

    fn on_propertiessent(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::PropertiesSent, request.tag.clone()))
    }

    fn on_reqexperiment(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::ReqExperiment, request.tag.clone()))
    }

    fn on_startexperiment(
        &self,
        _ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Request(Command::StartExperiment))
    }

    fn on_setparent(
        &self,
        _ctx: &mut SessionContext,
        request: &ParentAddress,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::SetParent(request.clone()))
    }

    fn on_serializecalltree(
        &self,
        _ctx: &mut SessionContext,
        _request: &Empty,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Request(Command::CallTreeSerial))
    }

    fn on_calltree(
        &self,
        _ctx: &mut SessionContext,
        request: &XmlPayload,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Xml(Command::CallTree, request.xml.clone()))
    }

    fn on_calltreesent(
        &self,
        _ctx: &mut SessionContext,
        request: &TaggedAck,
        _reply: &mut Empty,
    ) -> Outcome {
        self.push(Recorded::Tagged(Command::CallTreeSent, request.tag.clone()))
    }

    fn on_connection_closed(&self, _ctx: &SessionContext, reason: &CloseReason) {
        self.lock().push(Recorded::Closed(reason.clone()));
    }
}
