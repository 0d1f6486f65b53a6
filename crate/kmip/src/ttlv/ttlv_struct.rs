use std::fmt::Debug;

use time::OffsetDateTime;

use super::{
    DecodeOptions, TTLVBytesDeserializer, TTLVBytesSerializer, error::TtlvError,
    kmip_big_int::KmipBigInt,
};
use crate::kmip_types::{KmipEnumeration, Tag};

/// A KMIP Tag-Type-Length-Value item.
///
/// The tag is carried by name (`"BatchCount"`). Tags that are not in the
/// registry, which only survive lenient decoding, use the KMIP JSON
/// hexadecimal form (`"0x540001"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TTLV {
    pub tag: String,
    pub value: TTLValue,
}

impl TTLV {
    /// Scan raw bytes for the protocol version major and minor items
    /// without decoding the whole message.
    pub fn find_version(bytes: &[u8]) -> Result<(i32, i32), TtlvError> {
        const MAJOR: [u8; 8] = [0x42, 0x00, 0x6a, 0x02, 0x00, 0x00, 0x00, 0x04];
        const MINOR: [u8; 8] = [0x42, 0x00, 0x6b, 0x02, 0x00, 0x00, 0x00, 0x04];

        fn read_i32(bytes: &[u8], at: usize) -> Result<i32, TtlvError> {
            let be = bytes
                .get(at..at + 4)
                .ok_or_else(|| TtlvError::malformed("truncated protocol version"))?;
            let mut buf = [0_u8; 4];
            buf.copy_from_slice(be);
            Ok(i32::from_be_bytes(buf))
        }

        let mut major = None;
        let mut minor = None;
        // items are 8-byte aligned so the scan can step by 8
        let mut i = 0;
        while i + 8 <= bytes.len() {
            match bytes.get(i..i + 8) {
                Some(window) if window == MAJOR => {
                    major = Some(read_i32(bytes, i + 8)?);
                    i += 16;
                }
                Some(window) if window == MINOR => {
                    minor = Some(read_i32(bytes, i + 8)?);
                    i += 16;
                }
                _ => i += 8,
            }
            if let (Some(major), Some(minor)) = (major, minor) {
                return Ok((major, minor))
            }
        }
        Err(TtlvError::malformed("no protocol version found"))
    }

    /// Encode this item to its binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TtlvError> {
        let mut writer = Vec::new();
        TTLVBytesSerializer::new(&mut writer).write_ttlv(self)?;
        Ok(writer)
    }

    /// Decode one item in strict mode and return it with the bytes that follow it.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8]), TtlvError> {
        Self::from_bytes_with(bytes, DecodeOptions::default())
    }

    /// Decode one item with explicit options and return it with the bytes that follow it.
    pub fn from_bytes_with(
        bytes: &[u8],
        options: DecodeOptions,
    ) -> Result<(Self, &[u8]), TtlvError> {
        let (ttlv, consumed) = TTLVBytesDeserializer::new(bytes)
            .with_options(options)
            .read_ttlv()?;
        let remaining = bytes
            .get(consumed..)
            .ok_or_else(|| TtlvError::malformed("consumed more bytes than available"))?;
        Ok((ttlv, remaining))
    }

    #[must_use]
    pub fn new(tag: Tag, value: TTLValue) -> Self {
        Self {
            tag: tag.to_string(),
            value,
        }
    }

    #[must_use]
    pub fn structure(tag: Tag, items: Vec<Self>) -> Self {
        Self::new(tag, TTLValue::Structure(items))
    }

    #[must_use]
    pub fn integer(tag: Tag, value: i32) -> Self {
        Self::new(tag, TTLValue::Integer(value))
    }

    #[must_use]
    pub fn long_integer(tag: Tag, value: i64) -> Self {
        Self::new(tag, TTLValue::LongInteger(value))
    }

    #[must_use]
    pub fn boolean(tag: Tag, value: bool) -> Self {
        Self::new(tag, TTLValue::Boolean(value))
    }

    #[must_use]
    pub fn text_string(tag: Tag, value: &str) -> Self {
        Self::new(tag, TTLValue::TextString(value.to_owned()))
    }

    #[must_use]
    pub fn byte_string(tag: Tag, value: &[u8]) -> Self {
        Self::new(tag, TTLValue::ByteString(value.to_vec()))
    }

    #[must_use]
    pub fn date_time(tag: Tag, value: OffsetDateTime) -> Self {
        Self::new(tag, TTLValue::DateTime(value))
    }

    #[must_use]
    pub fn interval(tag: Tag, value: u32) -> Self {
        Self::new(tag, TTLValue::Interval(value))
    }

    #[must_use]
    pub fn enumeration<E: KmipEnumeration>(tag: Tag, value: E) -> Self {
        Self::new(
            tag,
            TTLValue::Enumeration(KmipEnumerationVariant {
                value: value.to_u32(),
                name: value.to_string(),
            }),
        )
    }

    /// Resolve the tag name against the registry.
    pub fn kmip_tag(&self) -> Result<Tag, TtlvError> {
        self.tag
            .parse::<Tag>()
            .map_err(|_e| TtlvError::MalformedMessage(format!("unknown tag: {}", self.tag)))
    }

    /// Return the children of a structure, failing if this item is not the expected structure.
    pub fn children(&self, expected: Tag) -> Result<&[Self], TtlvError> {
        if self.tag != expected.to_string() {
            return Err(TtlvError::MalformedMessage(format!(
                "expected structure {expected}, found {}",
                self.tag
            )))
        }
        match &self.value {
            TTLValue::Structure(items) => Ok(items),
            other => Err(TtlvError::MalformedMessage(format!(
                "{expected} must be a Structure, found {}",
                other.type_name()
            ))),
        }
    }
}

#[derive(Debug, Clone, Eq)]
pub enum TTLValue {
    Structure(Vec<TTLV>),
    Integer(i32),
    LongInteger(i64),
    BigInteger(KmipBigInt),
    Enumeration(KmipEnumerationVariant),
    Boolean(bool),
    TextString(String),
    ByteString(Vec<u8>),
    DateTime(OffsetDateTime),
    Interval(u32),
    DateTimeExtended(i128),
    /// An item passed through undecoded in lenient mode.
    /// `bytes` holds the value without its padding.
    Opaque { item_type: u8, bytes: Vec<u8> },
}

impl Default for TTLValue {
    fn default() -> Self {
        Self::TextString(String::default())
    }
}

impl PartialEq for TTLValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Structure(l0), Self::Structure(r0)) => l0 == r0,
            (Self::Integer(l0), Self::Integer(r0)) => l0 == r0,
            (Self::LongInteger(l0), Self::LongInteger(r0)) => l0 == r0,
            (Self::BigInteger(l0), Self::BigInteger(r0)) => l0 == r0,
            (Self::Enumeration(l0), Self::Enumeration(r0)) => l0 == r0,
            (Self::Boolean(l0), Self::Boolean(r0)) => l0 == r0,
            (Self::TextString(l0), Self::TextString(r0)) => l0 == r0,
            (Self::ByteString(l0), Self::ByteString(r0)) => l0 == r0,
            (Self::DateTime(l0), Self::DateTime(r0)) => l0.unix_timestamp() == r0.unix_timestamp(),
            (Self::Interval(l0), Self::Interval(r0)) => l0 == r0,
            (Self::DateTimeExtended(l0), Self::DateTimeExtended(r0)) => l0 == r0,
            (
                Self::Opaque {
                    item_type: lt,
                    bytes: lb,
                },
                Self::Opaque {
                    item_type: rt,
                    bytes: rb,
                },
            ) => lt == rt && lb == rb,
            (_, _) => false,
        }
    }
}

impl TTLValue {
    /// The KMIP type name of this value, as used in the KMIP JSON profile
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Structure(_) => "Structure",
            Self::Integer(_) => "Integer",
            Self::LongInteger(_) => "LongInteger",
            Self::BigInteger(_) => "BigInteger",
            Self::Enumeration(_) => "Enumeration",
            Self::Boolean(_) => "Boolean",
            Self::TextString(_) => "TextString",
            Self::ByteString(_) => "ByteString",
            Self::DateTime(_) => "DateTime",
            Self::Interval(_) => "Interval",
            Self::DateTimeExtended(_) => "DateTimeExtended",
            Self::Opaque { .. } => "Opaque",
        }
    }

    /// The TTLV type of this value, `None` for opaque items
    #[must_use]
    pub const fn ttlv_type(&self) -> Option<TtlvType> {
        Some(match self {
            Self::Structure(_) => TtlvType::Structure,
            Self::Integer(_) => TtlvType::Integer,
            Self::LongInteger(_) => TtlvType::LongInteger,
            Self::BigInteger(_) => TtlvType::BigInteger,
            Self::Enumeration(_) => TtlvType::Enumeration,
            Self::Boolean(_) => TtlvType::Boolean,
            Self::TextString(_) => TtlvType::TextString,
            Self::ByteString(_) => TtlvType::ByteString,
            Self::DateTime(_) => TtlvType::DateTime,
            Self::Interval(_) => TtlvType::Interval,
            Self::DateTimeExtended(_) => TtlvType::DateTimeExtended,
            Self::Opaque { .. } => return None,
        })
    }
}

/// This holds the KMIP enumeration variant value and name
/// JSON uses the name, the byte serializer uses the value
#[derive(Clone)]
pub struct KmipEnumerationVariant {
    pub value: u32,
    pub name: String,
}

impl Debug for KmipEnumerationVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmipEnumerationVariant")
            .field("value", &format!("0x{:08x}", self.value))
            .field("name", &self.name)
            .finish()
    }
}

/// Two KMIP enumeration variants are equal if their names are equal
/// or if their values are equal
///
/// # Explanation
/// The byte decoder only sees the value; the name is filled in later,
/// when the enclosing tag tells which enumeration the value belongs to.
/// A freshly decoded variant therefore compares by value.
impl PartialEq for KmipEnumerationVariant {
    fn eq(&self, other: &Self) -> bool {
        if self.name.is_empty() || other.name.is_empty() {
            return self.value == other.value;
        }
        self.name == other.name
    }
}
impl Eq for KmipEnumerationVariant {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TtlvType {
    Structure = 0x01,
    Integer = 0x02,
    LongInteger = 0x03,
    BigInteger = 0x04,
    Enumeration = 0x05,
    Boolean = 0x06,
    TextString = 0x07,
    ByteString = 0x08,
    DateTime = 0x09,
    Interval = 0x0A,
    DateTimeExtended = 0x0B,
}

impl TtlvType {
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Structure => 0x01,
            Self::Integer => 0x02,
            Self::LongInteger => 0x03,
            Self::BigInteger => 0x04,
            Self::Enumeration => 0x05,
            Self::Boolean => 0x06,
            Self::TextString => 0x07,
            Self::ByteString => 0x08,
            Self::DateTime => 0x09,
            Self::Interval => 0x0A,
            Self::DateTimeExtended => 0x0B,
        }
    }

    /// The exact value length mandated for fixed-width types
    #[must_use]
    pub const fn fixed_length(self) -> Option<usize> {
        match self {
            Self::Integer | Self::Enumeration | Self::Interval => Some(4),
            Self::LongInteger | Self::Boolean | Self::DateTime | Self::DateTimeExtended => Some(8),
            Self::Structure | Self::BigInteger | Self::TextString | Self::ByteString => None,
        }
    }
}

impl std::fmt::Display for TtlvType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl TryFrom<u8> for TtlvType {
    type Error = TtlvError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Structure),
            0x02 => Ok(Self::Integer),
            0x03 => Ok(Self::LongInteger),
            0x04 => Ok(Self::BigInteger),
            0x05 => Ok(Self::Enumeration),
            0x06 => Ok(Self::Boolean),
            0x07 => Ok(Self::TextString),
            0x08 => Ok(Self::ByteString),
            0x09 => Ok(Self::DateTime),
            0x0A => Ok(Self::Interval),
            0x0B => Ok(Self::DateTimeExtended),
            _ => Err(TtlvError::MalformedMessage(format!(
                "Invalid type byte: 0x{value:02x}"
            ))),
        }
    }
}
