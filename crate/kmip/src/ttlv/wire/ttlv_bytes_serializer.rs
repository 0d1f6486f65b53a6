use std::io::Write;

use super::{kmip_tag::tag_value, padding_len};
use crate::ttlv::{TTLV, TTLValue, TtlvType, error::TtlvError};

const ZEROS: [u8; 8] = [0_u8; 8];

/// Write a tag as a 3-byte big-endian integer
fn write_tag<W: Write>(writer: &mut W, tag_str: &str) -> Result<(), TtlvError> {
    let tag_bytes = tag_value(tag_str)?.to_be_bytes();
    // Write only the lowest 3 bytes in big-endian
    writer.write_all(&tag_bytes[1..])?;
    Ok(())
}

/// Write a type as a 1-byte integer
fn write_type<W: Write>(writer: &mut W, item_type: u8) -> Result<(), TtlvError> {
    writer.write_all(&[item_type])?;
    Ok(())
}

/// Write a length as a 4-byte big-endian integer
fn write_length<W: Write>(writer: &mut W, length: usize) -> Result<(), TtlvError> {
    let l = u32::try_from(length)
        .map_err(|_e| TtlvError::Encoding(format!("Length too large: {length}")))?;
    writer.write_all(&l.to_be_bytes())?;
    Ok(())
}

/// Write a value followed by the zero padding up to the next 8-byte boundary
fn write_padded<W: Write>(writer: &mut W, value: &[u8]) -> Result<(), TtlvError> {
    writer.write_all(value)?;
    writer.write_all(&ZEROS[..padding_len(value.len())])?;
    Ok(())
}

pub struct TTLVBytesSerializer<W> {
    writer: W,
}

impl<W> TTLVBytesSerializer<W>
where
    W: Write,
{
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_ttlv(&mut self, ttlv: &TTLV) -> Result<(), TtlvError> {
        // Write Tag (3 bytes)
        write_tag(&mut self.writer, &ttlv.tag)?;

        match &ttlv.value {
            TTLValue::Structure(items) => {
                write_type(&mut self.writer, TtlvType::Structure.to_byte())?;
                // children are framed first so that the structure length is known
                let mut temp_buffer = Vec::new();
                let mut temp_serializer = TTLVBytesSerializer::new(&mut temp_buffer);
                for item in items {
                    temp_serializer.write_ttlv(item)?;
                }
                write_length(&mut self.writer, temp_buffer.len())?;
                self.writer.write_all(&temp_buffer)?;
            }
            TTLValue::Integer(value) => {
                write_type(&mut self.writer, TtlvType::Integer.to_byte())?;
                write_length(&mut self.writer, 4)?;
                write_padded(&mut self.writer, &value.to_be_bytes())?;
            }
            TTLValue::LongInteger(value) => {
                write_type(&mut self.writer, TtlvType::LongInteger.to_byte())?;
                write_length(&mut self.writer, 8)?;
                self.writer.write_all(&value.to_be_bytes())?;
            }
            TTLValue::BigInteger(value) => {
                // sign extension already makes the length a multiple of 8
                let bytes = value.to_bytes_be();
                write_type(&mut self.writer, TtlvType::BigInteger.to_byte())?;
                write_length(&mut self.writer, bytes.len())?;
                self.writer.write_all(&bytes)?;
            }
            TTLValue::Enumeration(variant) => {
                write_type(&mut self.writer, TtlvType::Enumeration.to_byte())?;
                write_length(&mut self.writer, 4)?;
                write_padded(&mut self.writer, &variant.value.to_be_bytes())?;
            }
            TTLValue::Boolean(value) => {
                write_type(&mut self.writer, TtlvType::Boolean.to_byte())?;
                write_length(&mut self.writer, 8)?;
                let mut buf = [0_u8; 8];
                buf[7] = u8::from(*value);
                self.writer.write_all(&buf)?;
            }
            TTLValue::TextString(value) => {
                write_type(&mut self.writer, TtlvType::TextString.to_byte())?;
                write_length(&mut self.writer, value.len())?;
                write_padded(&mut self.writer, value.as_bytes())?;
            }
            TTLValue::ByteString(value) => {
                write_type(&mut self.writer, TtlvType::ByteString.to_byte())?;
                write_length(&mut self.writer, value.len())?;
                write_padded(&mut self.writer, value)?;
            }
            TTLValue::DateTime(value) => {
                write_type(&mut self.writer, TtlvType::DateTime.to_byte())?;
                write_length(&mut self.writer, 8)?;
                self.writer
                    .write_all(&value.unix_timestamp().to_be_bytes())?;
            }
            TTLValue::Interval(value) => {
                write_type(&mut self.writer, TtlvType::Interval.to_byte())?;
                write_length(&mut self.writer, 4)?;
                write_padded(&mut self.writer, &value.to_be_bytes())?;
            }
            TTLValue::DateTimeExtended(value) => {
                write_type(&mut self.writer, TtlvType::DateTimeExtended.to_byte())?;
                write_length(&mut self.writer, 8)?;
                let micros = i64::try_from(*value).map_err(|_e| {
                    TtlvError::Encoding(format!("DateTimeExtended out of range: {value}"))
                })?;
                self.writer.write_all(&micros.to_be_bytes())?;
            }
            TTLValue::Opaque { item_type, bytes } => {
                write_type(&mut self.writer, *item_type)?;
                write_length(&mut self.writer, bytes.len())?;
                write_padded(&mut self.writer, bytes)?;
            }
        }
        Ok(())
    }
}
