#![allow(dead_code, clippy::unwrap_used)]

use std::{cell::Cell, collections::VecDeque, rc::Rc};

use kmip_client::{
    KmipClient, KmipClientOptions, KmipTransport, TransportError,
    kmip_proto::{
        kmip_attributes::AttributePolicy,
        kmip_messages::{RequestMessage, ResponseMessage},
        ttlv::{TTLV, ToTtlv},
    },
};
use kmip_test_server::KmipTestServer;

/// Failures of the link between the client and the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkFault {
    /// The request never reaches the server
    TimeoutBeforeDelivery,
    /// The server executes the request but the response is lost
    TimeoutAfterExecution,
}

/// A transport delivering requests to an in-memory server.
pub(crate) struct InMemoryTransport {
    pub server: KmipTestServer,
    /// Number of requests the client tried to send
    pub contacts: usize,
    pub faults: VecDeque<LinkFault>,
    response: Option<Vec<u8>>,
    lost: bool,
    closed: Rc<Cell<bool>>,
}

impl InMemoryTransport {
    pub(crate) fn new(server: KmipTestServer) -> Self {
        Self {
            server,
            contacts: 0,
            faults: VecDeque::new(),
            response: None,
            lost: false,
            closed: Rc::new(Cell::new(false)),
        }
    }

    pub(crate) fn closed_flag(&self) -> Rc<Cell<bool>> {
        self.closed.clone()
    }
}

impl KmipTransport for InMemoryTransport {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        if self.closed.get() {
            return Err(TransportError::Closed)
        }
        self.contacts += 1;
        match self.faults.pop_front() {
            Some(LinkFault::TimeoutBeforeDelivery) => {
                return Err(TransportError::Timeout("write timed out".to_owned()))
            }
            Some(LinkFault::TimeoutAfterExecution) => self.lost = true,
            None => {}
        }
        let response = self
            .server
            .handle(request)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        self.response = Some(response);
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed.get() {
            return Err(TransportError::Closed)
        }
        let response = self.response.take();
        if std::mem::take(&mut self.lost) {
            return Err(TransportError::Timeout("read timed out".to_owned()))
        }
        response.ok_or_else(|| TransportError::Io("no pending response".to_owned()))
    }

    fn close(&mut self) {
        self.closed.set(true);
    }
}

/// A transport answering with responses built by a closure, for replies a
/// real server would not send.
pub(crate) struct ScriptedTransport<F: FnMut(&RequestMessage) -> ResponseMessage> {
    script: F,
    response: Option<Vec<u8>>,
    pub contacts: usize,
}

impl<F: FnMut(&RequestMessage) -> ResponseMessage> ScriptedTransport<F> {
    pub(crate) const fn new(script: F) -> Self {
        Self {
            script,
            response: None,
            contacts: 0,
        }
    }
}

impl<F: FnMut(&RequestMessage) -> ResponseMessage> KmipTransport for ScriptedTransport<F> {
    fn send(&mut self, request: &[u8]) -> Result<(), TransportError> {
        self.contacts += 1;
        let (ttlv, _) = TTLV::from_bytes(request).unwrap();
        let request = RequestMessage::from_ttlv_with(&ttlv, AttributePolicy::Passthrough).unwrap();
        let response = (self.script)(&request);
        self.response = Some(response.to_ttlv().unwrap().to_bytes().unwrap());
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        self.response.take().ok_or(TransportError::Closed)
    }

    fn close(&mut self) {}
}

pub(crate) fn client() -> KmipClient<InMemoryTransport> {
    client_with_server(KmipTestServer::new())
}

pub(crate) fn client_with_server(server: KmipTestServer) -> KmipClient<InMemoryTransport> {
    kmip_logger::log_init(option_env!("RUST_LOG"));
    KmipClient::new(InMemoryTransport::new(server), KmipClientOptions::default())
}
