//! The full set of handlers owned by one connection.

use std::sync::Arc;

use super::{CommandHandler, CommandSlot};
use crate::{
    command::Command,
    hooks::AgentProtocol,
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

macro_rules! handler_table {
    ($($field:ident: $command:ident => $req:ty, $rep:ty, $hook:ident;)*) => {
        /// One handler per command pair, with typed access to each.
        pub struct Handlers {
            $(
                #[doc = concat!("Handler for ", stringify!($command), ".")]
                pub $field: CommandHandler<$req, $rep>,
            )*
        }

        impl Handlers {
            /// Create idle handlers without callbacks.
            #[must_use]
            pub fn new() -> Self {
                Self {
                    $($field: CommandHandler::new(Command::$command),)*
                }
            }

            /// Handler for `command` as a routing slot.
            #[must_use]
            pub fn slot(&self, command: Command) -> &dyn CommandSlot {
                match command {
                    $(Command::$command => &self.$field,)*
                }
            }

            /// Mutable handler for `command` as a routing slot.
            pub fn slot_mut(&mut self, command: Command) -> &mut dyn CommandSlot {
                match command {
                    $(Command::$command => &mut self.$field,)*
                }
            }

            /// Route every request callback to the matching method of
            /// `protocol`.
            pub(crate) fn register_requests<P>(&mut self, protocol: &Arc<P>)
            where
                P: AgentProtocol + ?Sized,
            {
                $(
                    let target = Arc::clone(protocol);
                    self.$field.set_request_callback(move |ctx, request, reply| {
                        target.$hook(ctx, request, reply)
                    });
                )*
            }
        }
    };
}

handler_table! {
    init: Init => Identity, Identity, on_init;
    quit: Quit => Empty, Empty, on_quit;
    reinit: Reinit => ReinitMap, ReinitMap, on_reinit;
    start: Start => OpaqueBlob, Empty, on_start;
    heartbeat: Heartbeat => Heartbeat, Heartbeat, on_heartbeat;
    check: Check => Empty, Empty, on_check;
    foundprop: FoundProp => XmlPayload, Empty, on_foundprop;
    searchfinished: SearchFinished => TaggedAck, Empty, on_searchfinished;
    needrestart: NeedRestart => TaggedAck, Empty, on_needrestart;
    terminate: Terminate => Empty, Empty, on_terminate;
    terminated: Terminated => TaggedAck, Empty, on_terminated;
    propertiessent: PropertiesSent => TaggedAck, Empty, on_propertiessent;
    reqexperiment: ReqExperiment => TaggedAck, Empty, on_reqexperiment;
    startexperiment: StartExperiment => Empty, Empty, on_startexperiment;
    setparent: SetParent => ParentAddress, Empty, on_setparent;
    calltreeserial: CallTreeSerial => Empty, Empty, on_serializecalltree;
    calltree: CallTree => XmlPayload, Empty, on_calltree;
    calltreesent: CallTreeSent => TaggedAck, Empty, on_calltreesent;
}

impl Default for Handlers {
    fn default() -> Self { Self::new() }
}
