use kmip_logger::log_init;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    kmip_types::{CryptographicAlgorithm, State, Tag},
    ttlv::{
        DecodeMode, DecodeOptions, KmipBigInt, MAX_DEPTH, TTLV, TTLVBytesDeserializer,
        TTLVBytesSerializer, TTLValue, TtlvError,
    },
};

fn decode_hex(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap()
}

fn assert_malformed<T: std::fmt::Debug>(result: Result<T, TtlvError>) {
    match result {
        Err(TtlvError::MalformedMessage(msg)) => info!("rejected: {msg}"),
        other => panic!("expected a malformed message, got {other:?}"),
    }
}

fn nested(depth: usize) -> TTLV {
    let mut ttlv = TTLV::integer(Tag::AttributeIndex, 1);
    for _ in 0..depth {
        ttlv = TTLV::structure(Tag::Attribute, vec![ttlv]);
    }
    ttlv
}

#[test]
fn test_round_trip_every_type() {
    log_init(option_env!("RUST_LOG"));
    let ttlv = TTLV::structure(
        Tag::TemplateAttribute,
        vec![
            TTLV::integer(Tag::CryptographicLength, -128),
            TTLV::long_integer(Tag::LeaseTime, 123_456_789_000_000),
            TTLV::new(
                Tag::KeyMaterial,
                TTLValue::BigInteger(KmipBigInt::from(-1_234_567_890_123_i64)),
            ),
            TTLV::new(Tag::KeyMaterial, TTLValue::BigInteger(KmipBigInt::from(0_i64))),
            TTLV::enumeration(Tag::CryptographicAlgorithm, CryptographicAlgorithm::AES),
            TTLV::enumeration(Tag::State, State::Destroyed_Compromised),
            TTLV::boolean(Tag::Fresh, true),
            TTLV::boolean(Tag::KeyValuePresent, false),
            TTLV::text_string(Tag::NameValue, "Hello World"),
            TTLV::text_string(Tag::ContactInformation, ""),
            TTLV::text_string(Tag::ObjectGroup, "eight ch"),
            TTLV::byte_string(Tag::IVCounterNonce, &[1, 2, 3]),
            TTLV::byte_string(Tag::Data, &[]),
            TTLV::date_time(
                Tag::ActivationDate,
                OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            ),
            TTLV::interval(Tag::LeaseTime, 864_000),
            TTLV::new(Tag::LastChangeDate, TTLValue::DateTimeExtended(1_700_000_000_123_456)),
            TTLV::structure(
                Tag::Attribute,
                vec![
                    TTLV::text_string(Tag::AttributeName, "Cryptographic Length"),
                    TTLV::integer(Tag::AttributeValue, 128),
                ],
            ),
            TTLV::structure(Tag::CryptographicParameters, vec![]),
        ],
    );

    let bytes = ttlv.to_bytes().unwrap();
    assert_eq!(bytes.len() % 8, 0);
    let (decoded, remaining) = TTLV::from_bytes(&bytes).unwrap();
    assert!(remaining.is_empty());
    assert_eq!(decoded, ttlv);

    // the declared structure length is the sum of the framed children
    let declared = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    assert_eq!(declared, bytes.len() - 8);
}

#[test]
fn test_read_reports_consumed_length() {
    let first = TTLV::text_string(Tag::NameValue, "abc").to_bytes().unwrap();
    let second = TTLV::integer(Tag::BatchCount, 2).to_bytes().unwrap();
    let mut bytes = first.clone();
    bytes.extend_from_slice(&second);

    let mut de = TTLVBytesDeserializer::new(&bytes);
    let (ttlv, length) = de.read_ttlv().unwrap();
    assert_eq!(length, first.len());
    assert_eq!(ttlv, TTLV::text_string(Tag::NameValue, "abc"));
    let (ttlv, length) = de.read_ttlv().unwrap();
    assert_eq!(length, second.len());
    assert_eq!(ttlv.value, TTLValue::Integer(2));

    let (_ttlv, remaining) = TTLV::from_bytes(&bytes).unwrap();
    assert_eq!(remaining, second.as_slice());
}

#[test]
fn test_non_zero_padding_is_rejected() {
    // Integer 8 with a stray bit in its padding
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "42002002000000040000000800000001",
    )));
    // "abc" followed by non-zero padding
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "4200550700000003616263000000FF00",
    )));
}

#[test]
fn test_overlong_length_is_rejected() {
    // a text string declaring 256 bytes with only 8 available
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "42005507000001004142434400000000",
    )));
    // a structure declaring more than the bytes that follow
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "420008010000002042000902000000040000000100000000",
    )));
    // truncated header
    assert_malformed(TTLV::from_bytes(&decode_hex("420020")));
}

#[test]
fn test_wrong_fixed_lengths_are_rejected() {
    // Integer declared with 8 bytes
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "42002002000000080000000000000008",
    )));
    // Boolean declared with 4 bytes
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "42002006000000040000000100000000",
    )));
    // BigInteger not a multiple of 8
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "4200200400000004FFFFFFFF00000000",
    )));
    // Boolean that is neither 0 nor 1
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "42002006000000080000000000000002",
    )));
}

#[test]
fn test_children_must_fit_their_structure() {
    // the structure declares 8 bytes but its child needs 16
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "4200080100000008420009020000000400000001000000004200090200000004",
    )));
}

#[test]
fn test_invalid_utf8_is_rejected() {
    assert_malformed(TTLV::from_bytes(&decode_hex(
        "4200550700000002C328000000000000",
    )));
}

#[test]
fn test_depth_is_bounded() {
    let within = nested(MAX_DEPTH);
    let bytes = within.to_bytes().unwrap();
    assert_eq!(TTLV::from_bytes(&bytes).unwrap().0, within);

    let beyond = nested(MAX_DEPTH + 1);
    let bytes = beyond.to_bytes().unwrap();
    assert_malformed(TTLV::from_bytes(&bytes));

    let options = DecodeOptions {
        mode: DecodeMode::Strict,
        max_depth: MAX_DEPTH + 8,
    };
    assert_eq!(TTLV::from_bytes_with(&bytes, options).unwrap().0, beyond);

    let shallow = DecodeOptions {
        mode: DecodeMode::Strict,
        max_depth: 2,
    };
    assert_malformed(TTLV::from_bytes_with(&nested(3).to_bytes().unwrap(), shallow));
}

#[test]
fn test_unknown_tag_strict_and_lenient() {
    let bytes = decode_hex("54000102000000040000000800000000");
    assert_malformed(TTLV::from_bytes(&bytes));

    let (ttlv, _) = TTLV::from_bytes_with(&bytes, DecodeOptions::lenient()).unwrap();
    assert_eq!(ttlv.tag, "0x540001");
    assert_eq!(ttlv.value, TTLValue::Integer(8));
    assert!(ttlv.kmip_tag().is_err());
    // the hexadecimal name encodes back to the same tag
    assert_eq!(ttlv.to_bytes().unwrap(), bytes);
}

#[test]
fn test_unknown_type_strict_and_lenient() {
    let bytes = decode_hex("4200200C00000003AABBCC0000000000");
    assert_malformed(TTLV::from_bytes(&bytes));

    let (ttlv, _) = TTLV::from_bytes_with(&bytes, DecodeOptions::lenient()).unwrap();
    assert_eq!(
        ttlv.value,
        TTLValue::Opaque {
            item_type: 0x0C,
            bytes: vec![0xAA, 0xBB, 0xCC]
        }
    );
    assert_eq!(ttlv.to_bytes().unwrap(), bytes);

    // an opaque item inside a structure survives a full round trip
    let mut framed = decode_hex("4200080100000010");
    framed.extend_from_slice(&bytes);
    let (ttlv, _) = TTLV::from_bytes_with(&framed, DecodeOptions::lenient()).unwrap();
    let mut out = Vec::new();
    TTLVBytesSerializer::new(&mut out).write_ttlv(&ttlv).unwrap();
    assert_eq!(out, framed);
}

#[test]
fn test_find_version() {
    let header = TTLV::structure(
        Tag::RequestHeader,
        vec![
            TTLV::structure(
                Tag::ProtocolVersion,
                vec![
                    TTLV::integer(Tag::ProtocolVersionMajor, 1),
                    TTLV::integer(Tag::ProtocolVersionMinor, 2),
                ],
            ),
            TTLV::integer(Tag::BatchCount, 1),
        ],
    );
    let bytes = header.to_bytes().unwrap();
    assert_eq!(TTLV::find_version(&bytes).unwrap(), (1, 2));
    assert_malformed(TTLV::find_version(&bytes[..16]));
}
