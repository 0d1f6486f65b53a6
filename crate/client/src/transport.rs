//! Byte transport between the client and a KMIP server.
//!
//! A transport moves whole TTLV messages: `send` writes one encoded request,
//! `receive` returns one encoded response. Framing of the response relies on
//! the 8-byte TTLV header.
use std::io;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("transport closed")]
    Closed,
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

pub trait KmipTransport {
    /// Write one encoded request message.
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError>;

    /// Read one encoded response message.
    fn receive(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Close the session. Closing twice is a no-op.
    fn close(&mut self);
}

impl<T: KmipTransport + ?Sized> KmipTransport for Box<T> {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        (**self).send(request)
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).receive()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::TransportError;

    #[test]
    fn test_io_error_kinds() {
        let e: TransportError = io::Error::new(io::ErrorKind::TimedOut, "read").into();
        assert!(matches!(e, TransportError::Timeout(_)));
        let e: TransportError = io::Error::new(io::ErrorKind::WouldBlock, "read").into();
        assert!(matches!(e, TransportError::Timeout(_)));
        let e: TransportError = io::Error::new(io::ErrorKind::ConnectionReset, "read").into();
        assert!(matches!(e, TransportError::Io(_)));
    }
}
