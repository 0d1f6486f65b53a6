#![allow(clippy::upper_case_acronyms)]

pub use error::{
    KmipError,
    result::{KmipResult, KmipResultHelper},
};

mod error;
pub mod kmip_attributes;
pub mod kmip_data_structures;
pub mod kmip_messages;
pub mod kmip_operations;
pub mod kmip_types;
pub mod ttlv;
