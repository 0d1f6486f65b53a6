use thiserror::Error;

/// Errors raised by the TTLV byte codec.
///
/// Any framing violation found while decoding is a `MalformedMessage`:
/// the message is lost but the session it came from is not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TtlvError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("TTLV encoding error: {0}")]
    Encoding(String),
}

impl TtlvError {
    #[must_use]
    pub fn malformed(s: &str) -> Self {
        Self::MalformedMessage(s.to_owned())
    }
}

impl From<std::io::Error> for TtlvError {
    fn from(err: std::io::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for TtlvError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::MalformedMessage(format!("text string is not valid UTF-8: {err}"))
    }
}

impl From<time::error::ComponentRange> for TtlvError {
    fn from(err: time::error::ComponentRange) -> Self {
        Self::MalformedMessage(format!("invalid date time: {err}"))
    }
}
