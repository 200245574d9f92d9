//! Typed command payloads.
//!
//! Each command pair carries one payload type per direction; the pairing is
//! recorded in [`crate::command::DISPATCH_TABLE`]. All payloads encode their
//! fields in declaration order and decode them in the same order.

use std::fmt::Debug;

use bytes::Bytes;

use crate::codec::{Decode, DecodeError, Encode, INT_SIZE, WireReader, WireWriter, string_size};

mod reinit;

pub use reinit::{IdMapping, REINIT_MAP_CAPACITY, ReinitMap};

/// Payload families referenced by the dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// No fields.
    Empty,
    /// Agent identity string.
    Identity,
    /// Heartbeat record.
    Heartbeat,
    /// Parent host and port.
    ParentAddress,
    /// Agent id remapping.
    ReinitMap,
    /// Single tag string.
    TaggedAck,
    /// Opaque length-prefixed octets.
    OpaqueBlob,
    /// XML document carried as a string.
    Xml,
}

/// A value that can travel as the payload of a command.
pub trait Payload: Encode + Decode + Default + Clone + Debug + Send + 'static {
    /// Family this payload belongs to.
    const KIND: PayloadKind;
}

/// Payload with no fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Empty;

impl Encode for Empty {
    fn encode(&self, _out: &mut WireWriter) {}

    fn wire_size(&self) -> usize { 0 }
}

impl Decode for Empty {
    fn decode(_input: &mut WireReader) -> Result<Self, DecodeError> { Ok(Self) }
}

impl Payload for Empty {
    const KIND: PayloadKind = PayloadKind::Empty;
}

/// Identity exchanged by INIT.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// Self-chosen agent name.
    pub name: String,
}

impl Identity {
    /// Create an identity from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }
}

impl Encode for Identity {
    fn encode(&self, out: &mut WireWriter) { out.put_string(&self.name); }

    fn wire_size(&self) -> usize { string_size(self.name.len()) }
}

impl Decode for Identity {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            name: input.get_string()?,
        })
    }
}

impl Payload for Identity {
    const KIND: PayloadKind = PayloadKind::Identity;
}

/// Heartbeat kinds carried in [`Heartbeat::kind`].
pub mod heartbeat_kind {
    /// Heartbeat generated by the sending agent itself.
    pub const OWN: i32 = 0;
    /// Heartbeat relayed on behalf of a child agent.
    pub const FORWARDED: i32 = 1;
    /// Final heartbeat announcing the agent is leaving.
    pub const DISMISS: i32 = 2;
}

/// Liveness report sent up the agent tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Heartbeat {
    /// Host the agent runs on.
    pub hostname: String,
    /// Agent tag.
    pub tag: String,
    /// Port the agent listens on.
    pub port: i32,
    /// One of the [`heartbeat_kind`] constants.
    pub kind: i32,
    /// Number of processes the agent controls.
    pub num_procs: i32,
}

impl Encode for Heartbeat {
    fn encode(&self, out: &mut WireWriter) {
        out.put_string(&self.hostname);
        out.put_string(&self.tag);
        out.put_i32(self.port);
        out.put_i32(self.kind);
        out.put_i32(self.num_procs);
    }

    fn wire_size(&self) -> usize {
        string_size(self.hostname.len()) + string_size(self.tag.len()) + 3 * INT_SIZE
    }
}

impl Decode for Heartbeat {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            hostname: input.get_string()?,
            tag: input.get_string()?,
            port: input.get_i32()?,
            kind: input.get_i32()?,
            num_procs: input.get_i32()?,
        })
    }
}

impl Payload for Heartbeat {
    const KIND: PayloadKind = PayloadKind::Heartbeat;
}

/// Address of a new parent agent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParentAddress {
    /// Parent host name.
    pub hostname: String,
    /// Parent port.
    pub port: i32,
}

impl Encode for ParentAddress {
    fn encode(&self, out: &mut WireWriter) {
        out.put_string(&self.hostname);
        out.put_i32(self.port);
    }

    fn wire_size(&self) -> usize { string_size(self.hostname.len()) + INT_SIZE }
}

impl Decode for ParentAddress {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            hostname: input.get_string()?,
            port: input.get_i32()?,
        })
    }
}

impl Payload for ParentAddress {
    const KIND: PayloadKind = PayloadKind::ParentAddress;
}

/// Acknowledgement carrying a single tag string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaggedAck {
    /// Tag of the sender.
    pub tag: String,
}

impl TaggedAck {
    /// Create an acknowledgement for `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self { Self { tag: tag.into() } }
}

impl Encode for TaggedAck {
    fn encode(&self, out: &mut WireWriter) { out.put_string(&self.tag); }

    fn wire_size(&self) -> usize { string_size(self.tag.len()) }
}

impl Decode for TaggedAck {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            tag: input.get_string()?,
        })
    }
}

impl Payload for TaggedAck {
    const KIND: PayloadKind = PayloadKind::TaggedAck;
}

/// Octets passed through without interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpaqueBlob {
    /// Raw contents.
    pub bytes: Bytes,
}

impl OpaqueBlob {
    /// Wrap `bytes`.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl Encode for OpaqueBlob {
    fn encode(&self, out: &mut WireWriter) { out.put_blob(&self.bytes); }

    fn wire_size(&self) -> usize { INT_SIZE + self.bytes.len() }
}

impl Decode for OpaqueBlob {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            bytes: input.get_blob()?,
        })
    }
}

impl Payload for OpaqueBlob {
    const KIND: PayloadKind = PayloadKind::OpaqueBlob;
}

/// XML document, such as a found property or a serialised call tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlPayload {
    /// Document text.
    pub xml: String,
}

impl XmlPayload {
    /// Wrap a document.
    #[must_use]
    pub fn new(xml: impl Into<String>) -> Self { Self { xml: xml.into() } }
}

impl Encode for XmlPayload {
    fn encode(&self, out: &mut WireWriter) { out.put_string(&self.xml); }

    fn wire_size(&self) -> usize { string_size(self.xml.len()) }
}

impl Decode for XmlPayload {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        Ok(Self {
            xml: input.get_string()?,
        })
    }
}

impl Payload for XmlPayload {
    const KIND: PayloadKind = PayloadKind::Xml;
}
