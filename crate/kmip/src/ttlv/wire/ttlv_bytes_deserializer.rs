use time::OffsetDateTime;

use super::{kmip_tag::tag_name, padding_len};
use crate::ttlv::{
    KmipEnumerationVariant, TTLV, TTLValue, TtlvType, error::TtlvError, kmip_big_int::KmipBigInt,
};

/// Default bound on structure nesting
pub const MAX_DEPTH: usize = 32;

/// How the decoder treats tags and types it does not know
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Unknown tags and unknown type bytes are a `MalformedMessage`
    #[default]
    Strict,
    /// Unknown tags are kept in hexadecimal form and items with unknown
    /// type bytes are kept as opaque blobs
    Lenient,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mode: DecodeMode::Strict,
            max_depth: MAX_DEPTH,
        }
    }
}

impl DecodeOptions {
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            mode: DecodeMode::Lenient,
            ..Self::default()
        }
    }
}

/// Decodes TTLV items from a byte slice.
///
/// Every length is checked against the bytes actually available before
/// anything is allocated, so a corrupted length cannot trigger a large
/// allocation.
pub struct TTLVBytesDeserializer<'a> {
    bytes: &'a [u8],
    position: usize,
    options: DecodeOptions,
}

impl<'a> TTLVBytesDeserializer<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            options: DecodeOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Read one item and return it with the number of bytes it occupied
    pub fn read_ttlv(&mut self) -> Result<(TTLV, usize), TtlvError> {
        let start = self.position;
        let ttlv = self.read_item(0)?;
        Ok((ttlv, self.position - start))
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], TtlvError> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                TtlvError::MalformedMessage(format!(
                    "{what}: declared {n} bytes at offset {}, only {} available",
                    self.position,
                    self.bytes.len().saturating_sub(self.position)
                ))
            })?;
        let slice = self
            .bytes
            .get(self.position..end)
            .ok_or_else(|| TtlvError::malformed("slice out of bounds"))?;
        self.position = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], TtlvError> {
        let mut buf = [0_u8; N];
        buf.copy_from_slice(self.take(N, what)?);
        Ok(buf)
    }

    fn skip_padding(&mut self, length: usize, tag: &str) -> Result<(), TtlvError> {
        let padding = self.take(padding_len(length), "padding")?;
        if padding.iter().any(|b| *b != 0) {
            return Err(TtlvError::MalformedMessage(format!(
                "non-zero padding bytes after {tag}"
            )))
        }
        Ok(())
    }

    fn read_item(&mut self, depth: usize) -> Result<TTLV, TtlvError> {
        let strict = self.options.mode == DecodeMode::Strict;

        // Read Tag (3 bytes)
        let tag_bytes = self.take_array::<3>("tag")?;
        let tag_value = u32::from_be_bytes([0, tag_bytes[0], tag_bytes[1], tag_bytes[2]]);
        let tag = tag_name(tag_value, strict)?;

        // Read Type (1 byte)
        let [type_byte] = self.take_array::<1>("type")?;

        // Read Length (4 bytes)
        let length = u32::from_be_bytes(self.take_array::<4>("length")?);
        let length = usize::try_from(length)
            .map_err(|_e| TtlvError::MalformedMessage(format!("Length too large: {length}")))?;

        let item_type = match TtlvType::try_from(type_byte) {
            Ok(item_type) => item_type,
            Err(e) if strict => return Err(e),
            Err(_) => {
                let bytes = self.take(length, &tag)?.to_vec();
                self.skip_padding(length, &tag)?;
                return Ok(TTLV {
                    tag,
                    value: TTLValue::Opaque {
                        item_type: type_byte,
                        bytes,
                    },
                })
            }
        };

        if let Some(expected) = item_type.fixed_length() {
            if length != expected {
                return Err(TtlvError::MalformedMessage(format!(
                    "{tag}: {item_type} must have length {expected}, found {length}"
                )))
            }
        }

        let value = match item_type {
            TtlvType::Structure => {
                if depth >= self.options.max_depth {
                    return Err(TtlvError::MalformedMessage(format!(
                        "{tag}: structure nesting exceeds {} levels",
                        self.options.max_depth
                    )))
                }
                let end = self
                    .position
                    .checked_add(length)
                    .filter(|end| *end <= self.bytes.len())
                    .ok_or_else(|| {
                        TtlvError::MalformedMessage(format!(
                            "{tag}: structure length {length} exceeds available bytes"
                        ))
                    })?;
                let mut items = Vec::new();
                while self.position < end {
                    items.push(self.read_item(depth + 1)?);
                }
                if self.position != end {
                    return Err(TtlvError::MalformedMessage(format!(
                        "{tag}: children overrun the structure length {length}"
                    )))
                }
                TTLValue::Structure(items)
            }
            TtlvType::Integer => {
                let value = i32::from_be_bytes(self.take_array::<4>(&tag)?);
                self.skip_padding(4, &tag)?;
                TTLValue::Integer(value)
            }
            TtlvType::LongInteger => {
                TTLValue::LongInteger(i64::from_be_bytes(self.take_array::<8>(&tag)?))
            }
            TtlvType::BigInteger => {
                if length % 8 != 0 {
                    return Err(TtlvError::MalformedMessage(format!(
                        "{tag}: BigInteger length {length} is not a multiple of 8"
                    )))
                }
                TTLValue::BigInteger(KmipBigInt::from_bytes_be(self.take(length, &tag)?))
            }
            TtlvType::Enumeration => {
                let value = u32::from_be_bytes(self.take_array::<4>(&tag)?);
                self.skip_padding(4, &tag)?;
                TTLValue::Enumeration(KmipEnumerationVariant {
                    value,
                    name: String::new(),
                })
            }
            TtlvType::Boolean => match u64::from_be_bytes(self.take_array::<8>(&tag)?) {
                0 => TTLValue::Boolean(false),
                1 => TTLValue::Boolean(true),
                other => {
                    return Err(TtlvError::MalformedMessage(format!(
                        "{tag}: invalid Boolean value {other}"
                    )))
                }
            },
            TtlvType::TextString => {
                let bytes = self.take(length, &tag)?.to_vec();
                self.skip_padding(length, &tag)?;
                TTLValue::TextString(String::from_utf8(bytes)?)
            }
            TtlvType::ByteString => {
                let bytes = self.take(length, &tag)?.to_vec();
                self.skip_padding(length, &tag)?;
                TTLValue::ByteString(bytes)
            }
            TtlvType::DateTime => {
                let timestamp = i64::from_be_bytes(self.take_array::<8>(&tag)?);
                TTLValue::DateTime(OffsetDateTime::from_unix_timestamp(timestamp)?)
            }
            TtlvType::Interval => {
                let value = u32::from_be_bytes(self.take_array::<4>(&tag)?);
                self.skip_padding(4, &tag)?;
                TTLValue::Interval(value)
            }
            TtlvType::DateTimeExtended => {
                let micros = i64::from_be_bytes(self.take_array::<8>(&tag)?);
                TTLValue::DateTimeExtended(i128::from(micros))
            }
        };

        Ok(TTLV { tag, value })
    }
}
