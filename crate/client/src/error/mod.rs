use kmip_proto::{
    KmipError,
    kmip_types::{OperationEnumeration, ResultReason, State},
    ttlv::TtlvError,
};
use thiserror::Error;

use crate::transport::TransportError;

pub(crate) mod result;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
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

    #[error("{event} is not allowed on object {unique_identifier} in state {state}")]
    InvalidStateTransition {
        unique_identifier: String,
        state: State,
        event: String,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{operation} failed: {reason}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    OperationFailed {
        operation: OperationEnumeration,
        reason: ResultReason,
        message: Option<String>,
    },

    #[error("{operation} is pending, correlation value {}", hex::encode(.correlation))]
    OperationPending {
        operation: OperationEnumeration,
        correlation: Vec<u8>,
    },

    #[error("{operation} was undone{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    OperationUndone {
        operation: OperationEnumeration,
        reason: Option<ResultReason>,
        message: Option<String>,
    },

    #[error("Outcome of {operation} is unknown: {cause}")]
    OperationIndeterminate {
        operation: OperationEnumeration,
        cause: TransportError,
    },

    #[error("Idempotency check required: {0}")]
    IdempotencyCheckRequired(String),

    #[error("Invalid cryptographic parameters: {0}")]
    InvalidCryptographicParameters(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}: {1}")]
    Kmip(ResultReason, String),

    #[error("{0}")]
    Default(String),
}

impl From<KmipError> for ClientError {
    fn from(e: KmipError) -> Self {
        match e {
            KmipError::MalformedMessage(s) => Self::MalformedMessage(s),
            KmipError::AttributeTypeMismatch {
                name,
                expected,
                actual,
            } => Self::AttributeTypeMismatch {
                name,
                expected,
                actual,
            },
            KmipError::UnknownAttribute(s) => Self::UnknownAttribute(s),
            KmipError::BatchSizeMismatch { expected, actual } => {
                Self::BatchSizeMismatch { expected, actual }
            }
            KmipError::InvalidKmipValue(
                ResultReason::Bad_Cryptographic_Parameters
                | ResultReason::Missing_Initialization_Vector,
                s,
            ) => Self::InvalidCryptographicParameters(s),
            KmipError::InvalidKmipValue(r, s)
            | KmipError::InvalidKmipObject(r, s)
            | KmipError::Kmip(r, s) => Self::Kmip(r, s),
            KmipError::ConversionError(s) | KmipError::Default(s) => Self::Default(s),
        }
    }
}

impl From<TtlvError> for ClientError {
    fn from(e: TtlvError) -> Self {
        KmipError::from(e).into()
    }
}

/// Construct a client error from a string.
#[macro_export]
macro_rules! client_error {
    ($msg:literal) => {
        $crate::ClientError::Default(::core::format_args!($msg).to_string())
    };
    ($err:expr $(,)?) => ({
        $crate::ClientError::Default($err.to_string())
    });
    ($fmt:expr, $($arg:tt)*) => {
        $crate::ClientError::Default(::core::format_args!($fmt, $($arg)*).to_string())
    };
}

/// Return early with an error if a condition is not satisfied.
#[macro_export]
macro_rules! client_bail {
    ($msg:literal) => {
        return ::core::result::Result::Err($crate::client_error!($msg))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($err)
    };
    ($fmt:expr, $($arg:tt)*) => {
        return ::core::result::Result::Err($crate::client_error!($fmt, $($arg)*))
    };
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use kmip_proto::{
        KmipError,
        kmip_types::{OperationEnumeration, ResultReason},
    };

    use super::ClientError;

    #[test]
    fn test_client_error_interpolation() {
        let var = 42;
        let err = client_error!("interpolate {var}");
        assert_eq!("interpolate 42", err.to_string());

        let err = bail();
        assert_eq!("interpolate 43", err.unwrap_err().to_string());
    }

    #[test]
    fn test_kmip_errors_keep_their_kind() {
        let err: ClientError = KmipError::BatchSizeMismatch {
            expected: 2,
            actual: 1,
        }
        .into();
        assert_eq!(
            err,
            ClientError::BatchSizeMismatch {
                expected: 2,
                actual: 1
            }
        );
        let err: ClientError = KmipError::InvalidKmipValue(
            ResultReason::Missing_Initialization_Vector,
            "no IV".to_owned(),
        )
        .into();
        assert!(matches!(err, ClientError::InvalidCryptographicParameters(_)));
    }

    #[test]
    fn test_operation_failed_display() {
        let err = ClientError::OperationFailed {
            operation: OperationEnumeration::Activate,
            reason: ResultReason::Wrong_Key_Lifecycle_State,
            message: Some("not pre-active".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "Activate failed: Wrong_Key_Lifecycle_State: not pre-active"
        );
    }

    fn bail() -> Result<(), ClientError> {
        let var = 43;
        client_bail!("interpolate {var}");
    }
}
