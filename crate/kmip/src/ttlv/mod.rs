mod error;
mod kmip_big_int;
mod serialize;
pub(crate) mod ttlv_mapping;
mod ttlv_struct;
mod wire;

pub use error::TtlvError;
pub use kmip_big_int::KmipBigInt;
pub use ttlv_mapping::{FromTtlv, ToTtlv, TtlvFields, from_ttlv, to_ttlv};
pub use ttlv_struct::{KmipEnumerationVariant, TTLV, TTLValue, TtlvType};
pub use wire::{DecodeMode, DecodeOptions, MAX_DEPTH, TTLVBytesDeserializer, TTLVBytesSerializer};

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::as_conversions,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
#[cfg(test)]
mod tests;
