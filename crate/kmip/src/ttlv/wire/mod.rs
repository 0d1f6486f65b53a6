mod kmip_tag;
mod ttlv_bytes_deserializer;
mod ttlv_bytes_serializer;

pub use ttlv_bytes_deserializer::{DecodeMode, DecodeOptions, MAX_DEPTH, TTLVBytesDeserializer};
pub use ttlv_bytes_serializer::TTLVBytesSerializer;

/// Number of zero bytes needed to pad `length` to an 8-byte boundary
pub(crate) const fn padding_len(length: usize) -> usize {
    (8 - length % 8) % 8
}
