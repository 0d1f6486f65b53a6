use std::num::TryFromIntError;

use thiserror::Error;

use crate::{kmip_types::ResultReason, ttlv::TtlvError};

pub(crate) mod result;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmipError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Attribute {name}: expected a {expected} value, found {actual}")]
    AttributeTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Batch size mismatch: {actual} response items for {expected} request items")]
    BatchSizeMismatch { expected: usize, actual: usize },

    #[error("Conversion Error: {0}")]
    ConversionError(String),

    #[error("{0}")]
    Default(String),

    #[error("Invalid KMIP value: {0}: {1}")]
    InvalidKmipValue(ResultReason, String),

    #[error("Invalid KMIP Object: {0}: {1}")]
    InvalidKmipObject(ResultReason, String),

    #[error("{0}: {1}")]
    Kmip(ResultReason, String),
}

impl KmipError {
    /// The result reason to report on the wire for this error
    #[must_use]
    pub const fn result_reason(&self) -> ResultReason {
        match self {
            Self::Kmip(reason, _)
            | Self::InvalidKmipValue(reason, _)
            | Self::InvalidKmipObject(reason, _) => *reason,
            Self::MalformedMessage(_) | Self::BatchSizeMismatch { .. } => {
                ResultReason::Invalid_Message
            }
            _ => ResultReason::General_Failure,
        }
    }

    #[must_use]
    pub fn reason(&self, reason: ResultReason) -> Self {
        match self {
            Self::Kmip(_r, e) => Self::Kmip(reason, e.clone()),
            e => Self::Kmip(reason, e.to_string()),
        }
    }
}

impl From<TtlvError> for KmipError {
    fn from(e: TtlvError) -> Self {
        match e {
            TtlvError::MalformedMessage(m) => Self::MalformedMessage(m),
            TtlvError::Encoding(m) => Self::Kmip(ResultReason::Codec_Error, m),
        }
    }
}

impl From<TryFromIntError> for KmipError {
    fn from(e: TryFromIntError) -> Self {
        Self::ConversionError(e.to_string())
    }
}

/// Return early with an error if a condition is not satisfied.
///
/// This macro is equivalent to `if !$cond { return Err(From::from($err)); }`.
#[macro_export]
macro_rules! kmip_ensure {
    ($cond:expr, $msg:literal $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::kmip_error!($msg));
        }
    };
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return ::core::result::Result::Err($crate::kmip_error!($fmt, $($arg)*));
        }
    };
}

/// Construct a KMIP error from a string.
#[macro_export]
macro_rules! kmip_error {
    ($msg:literal) => {
        $crate::KmipError::Kmip($crate::kmip_types::ResultReason::General_Failure, ::core::format_args!($msg).to_string())
    };
    ($err:expr $(,)?) => ({
        $crate::KmipError::Kmip($crate::kmip_types::ResultReason::General_Failure, $err.to_string())
    });
    ($fmt:expr, $($arg:tt)*) => {
        $crate::KmipError::Kmip($crate::kmip_types::ResultReason::General_Failure, ::core::format_args!($fmt, $($arg)*).to_string())
    };
}

/// Return early with an error if a condition is not satisfied.
#[macro_export]
macro_rules! kmip_bail {
    ($msg:literal) => {
        return ::core::result::Result::Err($crate::kmip_error!($msg))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($err)
    };
    ($fmt:expr, $($arg:tt)*) => {
        return ::core::result::Result::Err($crate::kmip_error!($fmt, $($arg)*))
    };
}
