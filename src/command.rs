//! Command codes and the static dispatch table.
//!
//! Commands come in adjacent request/reply pairs: the request of the pair at
//! index `i` has code `2 * i`, its reply `2 * i + 1`. [`DISPATCH_TABLE`] holds
//! one [`CommandEntry`] per pair and is shared by every connection. Adding a
//! pair means adding one [`Command`] variant and one table row.

use std::fmt;

use crate::payload::PayloadKind;

/// Every command pair understood by an agent link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Identity handshake.
    Init,
    /// Orderly shutdown of the link.
    Quit,
    /// Agent id remapping after a restart.
    Reinit,
    /// Start the analysis with an opaque configuration blob.
    Start,
    /// Liveness report.
    Heartbeat,
    /// Status probe.
    Check,
    /// A property was found.
    FoundProp,
    /// The search finished.
    SearchFinished,
    /// The application must be restarted.
    NeedRestart,
    /// Ask an agent to terminate.
    Terminate,
    /// An agent terminated.
    Terminated,
    /// All properties were sent.
    PropertiesSent,
    /// Request a new experiment.
    ReqExperiment,
    /// Start the next experiment.
    StartExperiment,
    /// Re-parent an agent.
    SetParent,
    /// Ask for the call tree to be serialised.
    CallTreeSerial,
    /// A serialised call tree.
    CallTree,
    /// The call tree was sent.
    CallTreeSent,
}

/// Whether a command code is the request or the reply of its pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Initiator to responder.
    Request,
    /// Responder back to initiator.
    Reply,
}

impl Direction {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Reply => "reply",
        }
    }
}

impl Command {
    /// All commands in code order.
    pub const ALL: [Self; 18] = [
        Self::Init,
        Self::Quit,
        Self::Reinit,
        Self::Start,
        Self::Heartbeat,
        Self::Check,
        Self::FoundProp,
        Self::SearchFinished,
        Self::NeedRestart,
        Self::Terminate,
        Self::Terminated,
        Self::PropertiesSent,
        Self::ReqExperiment,
        Self::StartExperiment,
        Self::SetParent,
        Self::CallTreeSerial,
        Self::CallTree,
        Self::CallTreeSent,
    ];

    /// Position of the pair in [`Command::ALL`].
    #[must_use]
    pub const fn index(self) -> usize { self as usize }

    /// Code of the request.
    ///
    /// ```
    /// use agentlink::command::Command;
    ///
    /// assert_eq!(Command::Heartbeat.request_code().get(), 8);
    /// assert_eq!(Command::Heartbeat.reply_code().get(), 9);
    /// ```
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        reason = "there are fewer than 2^30 commands"
    )]
    pub const fn request_code(self) -> CommandCode { CommandCode(2 * self.index() as i32) }

    /// Code of the reply.
    #[must_use]
    pub const fn reply_code(self) -> CommandCode { CommandCode(self.request_code().0 + 1) }

    /// Code for `direction`.
    #[must_use]
    pub const fn code(self, direction: Direction) -> CommandCode {
        match direction {
            Direction::Request => self.request_code(),
            Direction::Reply => self.reply_code(),
        }
    }

    /// Upper-case command name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Quit => "QUIT",
            Self::Reinit => "REINIT",
            Self::Start => "START",
            Self::Heartbeat => "HEARTBEAT",
            Self::Check => "CHECK",
            Self::FoundProp => "FOUNDPROP",
            Self::SearchFinished => "SEARCHFINISHED",
            Self::NeedRestart => "NEEDRESTART",
            Self::Terminate => "TERMINATE",
            Self::Terminated => "TERMINATED",
            Self::PropertiesSent => "PROPERTIESSENT",
            Self::ReqExperiment => "REQEXPERIMENT",
            Self::StartExperiment => "STARTEXPERIMENT",
            Self::SetParent => "SETPARENT",
            Self::CallTreeSerial => "CALLTREESERIAL",
            Self::CallTree => "CALLTREE",
            Self::CallTreeSent => "CALLTREESENT",
        }
    }

    /// Dispatch table row for this command.
    #[must_use]
    pub fn entry(self) -> &'static CommandEntry { &DISPATCH_TABLE[self.index()] }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Command code as carried at the start of a command body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandCode(i32);

impl CommandCode {
    /// Wrap a raw code.
    #[must_use]
    pub const fn new(code: i32) -> Self { Self(code) }

    /// Raw code value.
    #[must_use]
    pub const fn get(self) -> i32 { self.0 }

    /// Resolve the code through the dispatch table.
    #[must_use]
    pub fn resolve(self) -> Option<(Command, Direction)> { DispatchTable::lookup(self.0) }
}

impl From<i32> for CommandCode {
    fn from(code: i32) -> Self { Self(code) }
}

impl fmt::Display for CommandCode {
    /// Formats known codes as `NAME_REQ` / `NAME_REPLY`.
    ///
    /// ```
    /// use agentlink::command::CommandCode;
    ///
    /// assert_eq!(CommandCode::new(0).to_string(), "INIT_REQ");
    /// assert_eq!(CommandCode::new(35).to_string(), "CALLTREESENT_REPLY");
    /// assert_eq!(CommandCode::new(99).to_string(), "UNKNOWN(99)");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve() {
            Some((command, Direction::Request)) => write!(f, "{}_REQ", command.name()),
            Some((command, Direction::Reply)) => write!(f, "{}_REPLY", command.name()),
            None => write!(f, "UNKNOWN({})", self.0),
        }
    }
}

/// One row of the dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandEntry {
    /// Command pair.
    pub command: Command,
    /// Code of the request.
    pub request_code: CommandCode,
    /// Code of the reply.
    pub reply_code: CommandCode,
    /// Payload carried by the request.
    pub request_payload: PayloadKind,
    /// Payload carried by the reply.
    pub reply_payload: PayloadKind,
    /// Whether responders send the reply unless configured otherwise.
    pub reply_by_default: bool,
}

const fn row(
    command: Command,
    request_payload: PayloadKind,
    reply_payload: PayloadKind,
    reply_by_default: bool,
) -> CommandEntry {
    CommandEntry {
        command,
        request_code: command.request_code(),
        reply_code: command.reply_code(),
        request_payload,
        reply_payload,
        reply_by_default,
    }
}

/// Static routing table, indexed by [`Command::index`].
pub static DISPATCH_TABLE: [CommandEntry; 18] = {
    use PayloadKind::{
        Empty,
        Heartbeat,
        Identity,
        OpaqueBlob,
        ParentAddress,
        ReinitMap,
        TaggedAck,
        Xml,
    };
    [
        row(Command::Init, Identity, Identity, true),
        row(Command::Quit, Empty, Empty, false),
        row(Command::Reinit, ReinitMap, ReinitMap, false),
        row(Command::Start, OpaqueBlob, Empty, false),
        row(Command::Heartbeat, Heartbeat, Heartbeat, false),
        row(Command::Check, Empty, Empty, false),
        row(Command::FoundProp, Xml, Empty, false),
        row(Command::SearchFinished, TaggedAck, Empty, false),
        row(Command::NeedRestart, TaggedAck, Empty, false),
        row(Command::Terminate, Empty, Empty, false),
        row(Command::Terminated, TaggedAck, Empty, false),
        row(Command::PropertiesSent, TaggedAck, Empty, false),
        row(Command::ReqExperiment, TaggedAck, Empty, false),
        row(Command::StartExperiment, Empty, Empty, false),
        row(Command::SetParent, ParentAddress, Empty, false),
        row(Command::CallTreeSerial, Empty, Empty, false),
        row(Command::CallTree, Xml, Empty, false),
        row(Command::CallTreeSent, TaggedAck, Empty, false),
    ]
};

/// Lookup over [`DISPATCH_TABLE`].
pub struct DispatchTable;

impl DispatchTable {
    /// All rows in code order.
    #[must_use]
    pub fn entries() -> &'static [CommandEntry] { &DISPATCH_TABLE }

    /// Map a raw code to its command and direction.
    ///
    /// Returns `None` for codes outside the table.
    #[must_use]
    pub fn lookup(code: i32) -> Option<(Command, Direction)> {
        DISPATCH_TABLE.iter().find_map(|entry| {
            if entry.request_code.0 == code {
                Some((entry.command, Direction::Request))
            } else if entry.reply_code.0 == code {
                Some((entry.command, Direction::Reply))
            } else {
                None
            }
        })
    }
}
