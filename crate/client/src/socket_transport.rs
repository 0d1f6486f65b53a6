//! TLS socket transport to a KMIP server.
//!
//! The client authenticates with either a PKCS#12 bundle or a PEM certificate
//! and key pair, and verifies the server against a CA certificate.
use std::{
    fs,
    io::{Read, Write},
    net::TcpStream,
    time::Duration,
};

use native_tls::{Certificate, Identity, TlsConnector, TlsStream};
use tracing::{debug, trace};

use crate::{
    ClientError,
    config::KmipClientConfig,
    error::result::{ClientResult, ClientResultHelper},
    transport::{KmipTransport, TransportError},
};

/// Size of the TTLV tag, type and length prefix.
const TTLV_HEADER_LENGTH: usize = 8;

/// Upper bound on a response body when no maximum response size is configured.
const DEFAULT_MAXIMUM_FRAME_SIZE: usize = 16 * 1024 * 1024;

pub struct SocketTransport {
    stream: Option<TlsStream<TcpStream>>,
    maximum_frame_size: usize,
}

impl SocketTransport {
    /// Open a TLS session to the server described by `config`.
    pub fn connect(config: &KmipClientConfig) -> ClientResult<Self> {
        let connector = build_connector(config)?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        debug!("connecting to KMIP server at {}:{}", config.host, config.port);
        let stream = TcpStream::connect((config.host.as_str(), config.port))
            .map_err(TransportError::from)?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(TransportError::from)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(TransportError::from)?;
        let stream = connector
            .connect(&config.host, stream)
            .map_err(|e| TransportError::Io(format!("TLS handshake failed: {e}")))?;

        let maximum_frame_size = config
            .maximum_response_size
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or(DEFAULT_MAXIMUM_FRAME_SIZE);
        Ok(Self {
            stream: Some(stream),
            maximum_frame_size,
        })
    }

    fn stream(&mut self) -> Result<&mut TlsStream<TcpStream>, TransportError> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

fn build_connector(config: &KmipClientConfig) -> ClientResult<TlsConnector> {
    let mut builder = TlsConnector::builder();
    builder
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .danger_accept_invalid_certs(config.accept_invalid_certs);

    if let Some(p12_path) = &config.ssl_client_pkcs12_path {
        let p12 = fs::read(p12_path)
            .with_context(|| format!("unable to read the client PKCS#12 file {p12_path}"))?;
        let identity = Identity::from_pkcs12(
            &p12,
            config.ssl_client_pkcs12_password.as_deref().unwrap_or(""),
        )
        .context("failed to create identity from client PKCS#12")?;
        builder.identity(identity);
    } else if let (Some(cert_path), Some(key_path)) =
        (&config.ssl_client_cert_path, &config.ssl_client_key_path)
    {
        let cert = fs::read(cert_path)
            .with_context(|| format!("unable to read the client certificate {cert_path}"))?;
        let key = fs::read(key_path)
            .with_context(|| format!("unable to read the client key {key_path}"))?;
        let identity = Identity::from_pkcs8(&cert, &key)
            .context("failed to create identity from client certificate and key")?;
        builder.identity(identity);
    }

    if let Some(ca_path) = &config.server_ca_cert_path {
        let pem = fs::read(ca_path)
            .with_context(|| format!("unable to read the server CA certificate {ca_path}"))?;
        builder.add_root_certificate(
            Certificate::from_pem(&pem).context("invalid server CA certificate")?,
        );
    }

    builder
        .build()
        .map_err(|e| ClientError::Configuration(format!("failed to build TLS connector: {e}")))
}

impl KmipTransport for SocketTransport {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        trace!("sending request: {}", hex::encode(request));
        let stream = self.stream()?;
        stream.write_all(request)?;
        stream.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let maximum_frame_size = self.maximum_frame_size;
        let stream = self.stream()?;

        let mut header = [0_u8; TTLV_HEADER_LENGTH];
        stream.read_exact(&mut header)?;
        let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let length = usize::try_from(length)
            .map_err(|e| TransportError::Io(format!("invalid response length: {e}")))?;
        if length > maximum_frame_size {
            return Err(TransportError::Io(format!(
                "response of {length} bytes exceeds the maximum of {maximum_frame_size} bytes"
            )))
        }

        let mut response = vec![0_u8; TTLV_HEADER_LENGTH + length];
        response[..TTLV_HEADER_LENGTH].copy_from_slice(&header);
        stream.read_exact(&mut response[TTLV_HEADER_LENGTH..])?;
        trace!("received response: {}", hex::encode(&response));
        Ok(response)
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown() {
                debug!("TLS shutdown failed: {e}");
            }
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
