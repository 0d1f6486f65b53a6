use std::collections::VecDeque;

use kmip_proto::{
    KmipError, KmipResult,
    kmip_attributes::AttributePolicy,
    kmip_data_structures::Credential,
    kmip_messages::{
        RequestMessage, RequestMessageBatchItem, ResponseMessage, ResponseMessageBatchItem,
        ResponseMessageHeader,
    },
    kmip_types::{
        OperationEnumeration, ProtocolVersion, ResultReason, ResultStatusEnumeration, State,
    },
    ttlv::{TTLV, ToTtlv},
};
use tracing::{debug, trace, warn};

use crate::{
    operations::dispatch,
    store::{ObjectStore, now},
};

/// Misbehavior the server applies to the next request or batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFault {
    /// Execute the next request but leave its last batch item out of the response
    DropLastBatchItem,
    /// Fail the next batch item with this reason, without executing it
    Fail(ResultReason),
    /// Answer the next batch item as pending, without executing it
    Pending(Vec<u8>),
}

impl ServerFault {
    const fn is_request_level(&self) -> bool {
        matches!(self, Self::DropLastBatchItem)
    }
}

/// In-memory KMIP server answering encoded request messages.
///
/// Objects live as long as the server. Only AES symmetric keys are supported.
#[derive(Default)]
pub struct KmipTestServer {
    store: ObjectStore,
    faults: VecDeque<ServerFault>,
    credential: Option<Credential>,
    request_count: usize,
}

impl KmipTestServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A server rejecting requests that do not carry `credential`
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..Self::default()
        }
    }

    /// Queue a fault; faults apply in order.
    pub fn inject(&mut self, fault: ServerFault) {
        self.faults.push_back(fault);
    }

    /// Number of request messages received
    #[must_use]
    pub const fn request_count(&self) -> usize {
        self.request_count
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn object_state(&self, unique_identifier: &str) -> Option<State> {
        self.store.get(unique_identifier).ok().map(|o| o.state())
    }

    /// Move an object to `state` behind the back of the clients.
    pub fn force_state(&mut self, unique_identifier: &str, state: State) -> KmipResult<()> {
        let object = self.store.get_mut(unique_identifier)?;
        warn!("forcing {unique_identifier} from {} to {state}", object.state());
        object.set_state(state);
        Ok(())
    }

    /// Answer one encoded request message.
    ///
    /// A request that cannot be decoded gets a single failed batch item.
    pub fn handle(&mut self, request: &[u8]) -> KmipResult<Vec<u8>> {
        self.request_count += 1;
        let response = match decode_request(request) {
            Ok(request) => self.process(request)?,
            Err(e) => {
                debug!("rejecting undecodable request: {e}");
                ResponseMessage {
                    response_header: ResponseMessageHeader {
                        protocol_version: ProtocolVersion::default(),
                        time_stamp: now(),
                        batch_count: 1,
                    },
                    batch_item: vec![failed_item(
                        None,
                        None,
                        e.result_reason(),
                        &e.to_string(),
                    )],
                }
            }
        };
        trace!("response: {response:?}");
        Ok(response.to_ttlv()?.to_bytes()?)
    }

    fn take_fault(&mut self, request_level: bool) -> Option<ServerFault> {
        if self.faults.front()?.is_request_level() == request_level {
            return self.faults.pop_front()
        }
        None
    }

    fn process(&mut self, request: RequestMessage) -> KmipResult<ResponseMessage> {
        let drop_last = self.take_fault(true).is_some();
        let protocol_version = request.request_header.protocol_version;
        let rejection = if protocol_version.protocol_version_major != 1 {
            Some((
                ResultReason::Unsupported_Protocol_Version,
                format!("protocol version {protocol_version} is not supported"),
            ))
        } else if self.credential.is_some()
            && self.credential != request.request_header.authentication
        {
            Some((
                ResultReason::Authentication_Not_Successful,
                "invalid credential".to_owned(),
            ))
        } else {
            None
        };

        let mut batch_item = Vec::with_capacity(request.batch_item.len());
        for item in request.batch_item {
            let response_item = match &rejection {
                Some((reason, message)) => failed_item(
                    Some(item.operation),
                    item.unique_batch_item_id,
                    *reason,
                    message,
                ),
                None => self.process_item(item)?,
            };
            batch_item.push(response_item);
        }
        if drop_last {
            warn!("dropping the last batch item of the response");
            batch_item.pop();
        }

        Ok(ResponseMessage {
            response_header: ResponseMessageHeader {
                protocol_version,
                time_stamp: now(),
                batch_count: i32::try_from(batch_item.len())?,
            },
            batch_item,
        })
    }

    fn process_item(
        &mut self,
        item: RequestMessageBatchItem,
    ) -> KmipResult<ResponseMessageBatchItem> {
        let operation = item.operation;
        let id = item.unique_batch_item_id;
        match self.take_fault(false) {
            Some(ServerFault::Fail(reason)) => {
                return Ok(ResponseMessageBatchItem::failure(
                    operation,
                    id,
                    reason,
                    "injected failure",
                ))
            }
            Some(ServerFault::Pending(correlation)) => {
                return Ok(ResponseMessageBatchItem {
                    operation: Some(operation),
                    unique_batch_item_id: id,
                    result_status: ResultStatusEnumeration::OperationPending,
                    result_reason: None,
                    result_message: None,
                    asynchronous_correlation_value: Some(correlation),
                    response_payload: None,
                })
            }
            _ => {}
        }
        match dispatch(&mut self.store, item.request_payload) {
            Ok(payload) => ResponseMessageBatchItem::success(
                operation,
                id,
                &payload,
                AttributePolicy::Passthrough,
            ),
            Err(e) => {
                debug!("{operation} failed: {e}");
                Ok(ResponseMessageBatchItem::failure(
                    operation,
                    id,
                    e.result_reason(),
                    &e.to_string(),
                ))
            }
        }
    }
}

fn decode_request(bytes: &[u8]) -> KmipResult<RequestMessage> {
    let (ttlv, remaining) = TTLV::from_bytes(bytes)?;
    if !remaining.is_empty() {
        return Err(KmipError::MalformedMessage(format!(
            "{} trailing bytes after the request message",
            remaining.len()
        )))
    }
    RequestMessage::from_ttlv_with(&ttlv, AttributePolicy::Passthrough)
}

fn failed_item(
    operation: Option<OperationEnumeration>,
    unique_batch_item_id: Option<Vec<u8>>,
    reason: ResultReason,
    message: &str,
) -> ResponseMessageBatchItem {
    ResponseMessageBatchItem {
        operation,
        unique_batch_item_id,
        result_status: ResultStatusEnumeration::OperationFailed,
        result_reason: Some(reason),
        result_message: Some(message.to_owned()),
        asynchronous_correlation_value: None,
        response_payload: None,
    }
}
