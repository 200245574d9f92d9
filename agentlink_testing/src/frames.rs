//! Builders for command frames and their wire bytes.

use agentlink::{
    byte_order::ByteOrder,
    codec::{Encode, INT_SIZE, WireWriter},
    command::CommandCode,
    frame::{CommandFrameCodec, Frame},
};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// Command body: `code` followed by `payload`.
#[must_use]
pub fn command_body<P: Encode + ?Sized>(
    order: ByteOrder,
    code: CommandCode,
    payload: &P,
) -> Bytes {
    let mut out = WireWriter::with_capacity(INT_SIZE + payload.wire_size(), order);
    out.put_i32(code.get());
    payload.encode(&mut out);
    out.freeze()
}

/// Command frame carrying `code` and `payload`.
#[must_use]
pub fn command_frame<P: Encode + ?Sized>(
    order: ByteOrder,
    tag: u8,
    code: CommandCode,
    payload: &P,
) -> Frame {
    Frame::command(order, tag, command_body(order, code, payload))
}

/// Wire bytes of `frame`, header included.
///
/// # Panics
///
/// Panics if the default codec rejects the frame.
#[must_use]
pub fn encode_frame(frame: Frame) -> Vec<u8> {
    let mut buf = BytesMut::new();
    CommandFrameCodec::default()
        .encode(frame, &mut buf)
        .expect("frame should encode");
    buf.to_vec()
}

/// Wire bytes of a command frame carrying `code` and `payload`.
#[must_use]
pub fn encode_command<P: Encode + ?Sized>(
    order: ByteOrder,
    tag: u8,
    code: CommandCode,
    payload: &P,
) -> Vec<u8> {
    encode_frame(command_frame(order, tag, code, payload))
}

/// Hand-assembled frame bytes with an arbitrary byte-order `marker`.
///
/// The length is written big-endian unless `marker` is `1`.
#[must_use]
pub fn raw_frame(marker: u8, message_type: u8, tag: u8, body: &[u8]) -> Vec<u8> {
    let len = u32::try_from(body.len()).expect("body fits in u32");
    let len = if marker == 1 {
        len.to_le_bytes()
    } else {
        len.to_be_bytes()
    };
    let mut out = vec![marker, message_type, tag, 0];
    out.extend_from_slice(&len);
    out.extend_from_slice(body);
    out
}
