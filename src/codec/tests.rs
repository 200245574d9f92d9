//! Unit tests for the primitive wire codec.
//!
//! Covers string and blob layouts, truncation detection and byte-order
//! handling of the reader and writer.

use bytes::Bytes;
use rstest::rstest;

use super::*;

fn reader(bytes: &[u8]) -> WireReader {
    WireReader::new(Bytes::copy_from_slice(bytes), ByteOrder::Big)
}

#[test]
fn string_is_length_prefixed_without_terminator() {
    let mut out = WireWriter::new(ByteOrder::Big);
    out.put_string("node01");
    assert_eq!(
        &out.freeze()[..],
        &[0, 0, 0, 6, b'n', b'o', b'd', b'e', b'0', b'1']
    );
}

#[test]
fn empty_string_is_a_bare_length() {
    let mut out = WireWriter::new(ByteOrder::Little);
    out.put_string("");
    assert_eq!(&out.freeze()[..], &[0, 0, 0, 0]);
}

#[rstest]
#[case::big(ByteOrder::Big, [0, 0, 0, 3])]
#[case::little(ByteOrder::Little, [3, 0, 0, 0])]
fn blob_length_follows_byte_order(#[case] order: ByteOrder, #[case] prefix: [u8; 4]) {
    let mut out = WireWriter::new(order);
    out.put_blob(&[7, 8, 9]);
    let bytes = out.freeze();
    assert_eq!(&bytes[..4], &prefix);
    assert_eq!(&bytes[4..], &[7, 8, 9]);

    let mut input = WireReader::new(bytes, order);
    assert_eq!(
        input.get_blob().expect("blob should decode"),
        Bytes::from_static(&[7, 8, 9])
    );
    assert_eq!(input.remaining(), 0);
}

#[test]
fn reads_advance_the_cursor() {
    let mut input = reader(&[0, 0, 0, 1, 0xff, 0xff, 0xff, 0xfe, 0xaa]);
    assert_eq!(input.get_i32().expect("first int"), 1);
    assert_eq!(input.get_i32().expect("second int"), -2);
    assert_eq!(input.remaining(), 1);
    assert_eq!(
        input.get_octets(1).expect("trailing octet"),
        Bytes::from_static(&[0xaa])
    );
}

#[rstest]
#[case::empty(&[], 0)]
#[case::three_bytes(&[0, 0, 1], 3)]
fn short_integer_is_truncated(#[case] bytes: &[u8], #[case] remaining: usize) {
    let err = reader(bytes).get_i32().expect_err("read must fail");
    assert_eq!(
        err,
        DecodeError::Truncated {
            field: "i32",
            needed: 4,
            remaining,
        }
    );
}

#[test]
fn string_longer_than_body_is_truncated() {
    let err = reader(&[0, 0, 0, 10, b'a', b'b'])
        .get_string()
        .expect_err("string must fail");
    assert_eq!(
        err,
        DecodeError::Truncated {
            field: "string",
            needed: 10,
            remaining: 2,
        }
    );
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = reader(&[0, 0, 0, 2, 0xc3, 0x28])
        .get_string()
        .expect_err("string must fail");
    assert_eq!(err, DecodeError::InvalidUtf8);
}

#[test]
fn writer_reports_length() {
    let mut out = WireWriter::with_capacity(16, ByteOrder::Big);
    assert!(out.is_empty());
    out.put_u32(1);
    out.put_string("ab");
    assert_eq!(out.len(), INT_SIZE + string_size(2));
}

#[test]
fn decode_from_bytes_ignores_trailing_bytes() {
    struct Word(i32);

    impl Decode for Word {
        fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
            input.get_i32().map(Word)
        }
    }

    let word: Word = decode_from_bytes(Bytes::from_static(&[0, 0, 0, 9, 1, 2]), ByteOrder::Big)
        .expect("word should decode");
    assert_eq!(word.0, 9);
}
