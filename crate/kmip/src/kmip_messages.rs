//! KMIP 1.x request and response messages.
//!
//! A message is a header followed by one or more batch items. Every request
//! batch item gets exactly one response batch item; when the request carries
//! Unique Batch Item IDs the server echoes them and the responses may come
//! back in any order.

use std::fmt::{self, Display, Formatter};

use time::OffsetDateTime;
use tracing::{debug, trace};

use crate::{
    error::{KmipError, result::KmipResult},
    kmip_attributes::AttributePolicy,
    kmip_data_structures::Credential,
    kmip_operations::{RequestPayload, ResponsePayload},
    kmip_types::{
        BatchErrorContinuationOption, OperationEnumeration, ProtocolVersion, ResultReason,
        ResultStatusEnumeration, Tag,
    },
    ttlv::{DecodeOptions, FromTtlv, TTLV, ToTtlv, TtlvFields},
};

fn protocol_version_to_ttlv(version: ProtocolVersion) -> TTLV {
    TTLV::structure(
        Tag::ProtocolVersion,
        vec![
            TTLV::integer(Tag::ProtocolVersionMajor, version.protocol_version_major),
            TTLV::integer(Tag::ProtocolVersionMinor, version.protocol_version_minor),
        ],
    )
}

fn protocol_version_from_ttlv(ttlv: &TTLV) -> KmipResult<ProtocolVersion> {
    let fields = TtlvFields::of(ttlv, Tag::ProtocolVersion)?;
    Ok(ProtocolVersion::new(
        fields.integer(Tag::ProtocolVersionMajor)?,
        fields.integer(Tag::ProtocolVersionMinor)?,
    ))
}

/// The header of a request message.
/// Fields appear on the wire in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestMessageHeader {
    pub protocol_version: ProtocolVersion,
    /// The largest response, in bytes, the client accepts
    pub maximum_response_size: Option<i32>,
    pub authentication: Option<Credential>,
    /// What the server does with the remaining items when one fails
    pub batch_error_continuation_option: Option<BatchErrorContinuationOption>,
    /// `true` when items must be processed in order
    pub batch_order_option: Option<bool>,
    pub time_stamp: Option<OffsetDateTime>,
    pub batch_count: i32,
}

impl ToTtlv for RequestMessageHeader {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut items = vec![protocol_version_to_ttlv(self.protocol_version)];
        if let Some(size) = self.maximum_response_size {
            items.push(TTLV::integer(Tag::MaximumResponseSize, size));
        }
        if let Some(credential) = &self.authentication {
            items.push(TTLV::structure(
                Tag::Authentication,
                vec![credential.to_ttlv()?],
            ));
        }
        if let Some(option) = self.batch_error_continuation_option {
            items.push(TTLV::enumeration(Tag::BatchErrorContinuationOption, option));
        }
        if let Some(option) = self.batch_order_option {
            items.push(TTLV::boolean(Tag::BatchOrderOption, option));
        }
        if let Some(time_stamp) = self.time_stamp {
            items.push(TTLV::date_time(Tag::TimeStamp, time_stamp));
        }
        items.push(TTLV::integer(Tag::BatchCount, self.batch_count));
        Ok(TTLV::structure(Tag::RequestHeader, items))
    }
}

impl FromTtlv for RequestMessageHeader {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::RequestHeader)?;
        let authentication = fields
            .find(Tag::Authentication)
            .map(|auth| {
                TtlvFields::of(auth, Tag::Authentication)?
                    .required(Tag::Credential)
                    .and_then(Credential::from_ttlv)
            })
            .transpose()?;
        Ok(Self {
            protocol_version: protocol_version_from_ttlv(fields.required(Tag::ProtocolVersion)?)?,
            maximum_response_size: fields.opt_integer(Tag::MaximumResponseSize)?,
            authentication,
            batch_error_continuation_option: fields
                .opt_enumeration(Tag::BatchErrorContinuationOption)?,
            batch_order_option: fields.opt_boolean(Tag::BatchOrderOption)?,
            time_stamp: fields.opt_date_time(Tag::TimeStamp)?,
            batch_count: fields.integer(Tag::BatchCount)?,
        })
    }
}

/// Batch item for a message request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessageBatchItem {
    pub operation: OperationEnumeration,
    /// Required when the batch holds more than one item
    pub unique_batch_item_id: Option<Vec<u8>>,
    pub request_payload: RequestPayload,
}

impl RequestMessageBatchItem {
    #[must_use]
    pub const fn new(request_payload: RequestPayload) -> Self {
        Self {
            operation: request_payload.operation(),
            unique_batch_item_id: None,
            request_payload,
        }
    }

    fn to_ttlv_with(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        let mut items = vec![TTLV::enumeration(Tag::Operation, self.operation)];
        if let Some(id) = &self.unique_batch_item_id {
            items.push(TTLV::byte_string(Tag::UniqueBatchItemID, id));
        }
        items.push(self.request_payload.to_ttlv_with(policy)?);
        Ok(TTLV::structure(Tag::BatchItem, items))
    }

    fn from_ttlv_with(ttlv: &TTLV, policy: AttributePolicy) -> KmipResult<Self> {
        let fields = TtlvFields::of(ttlv, Tag::BatchItem)?;
        let operation = fields.enumeration(Tag::Operation)?;
        Ok(Self {
            operation,
            unique_batch_item_id: fields.opt_bytes(Tag::UniqueBatchItemID)?,
            request_payload: RequestPayload::from_ttlv_with(
                operation,
                fields.required(Tag::RequestPayload)?,
                policy,
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    pub request_header: RequestMessageHeader,
    pub batch_item: Vec<RequestMessageBatchItem>,
}

impl RequestMessage {
    pub fn to_ttlv_with(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        let mut items = vec![self.request_header.to_ttlv()?];
        for item in &self.batch_item {
            items.push(item.to_ttlv_with(policy)?);
        }
        Ok(TTLV::structure(Tag::RequestMessage, items))
    }

    pub fn from_ttlv_with(ttlv: &TTLV, policy: AttributePolicy) -> KmipResult<Self> {
        let fields = TtlvFields::of(ttlv, Tag::RequestMessage)?;
        let request_header = RequestMessageHeader::from_ttlv(fields.required(Tag::RequestHeader)?)?;
        let batch_item = fields
            .find_all(Tag::BatchItem)
            .map(|item| RequestMessageBatchItem::from_ttlv_with(item, policy))
            .collect::<KmipResult<Vec<_>>>()?;
        if usize::try_from(request_header.batch_count)? != batch_item.len() {
            return Err(KmipError::MalformedMessage(format!(
                "request header announces {} batch items, found {}",
                request_header.batch_count,
                batch_item.len()
            )))
        }
        Ok(Self {
            request_header,
            batch_item,
        })
    }

    /// Encode the message to its TTLV bytes
    pub fn to_bytes(&self, policy: AttributePolicy) -> KmipResult<Vec<u8>> {
        Ok(self.to_ttlv_with(policy)?.to_bytes()?)
    }
}

impl Display for RequestMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let operations: Vec<String> = self
            .batch_item
            .iter()
            .map(|item| item.operation.to_string())
            .collect();
        write!(
            f,
            "RequestMessage(KMIP {}, [{}])",
            self.request_header.protocol_version,
            operations.join(", ")
        )
    }
}

/// Build a request message carrying `batch`, one batch item per payload.
///
/// Items of a multi-item batch are numbered with Unique Batch Item IDs so
/// that their responses can be matched whatever order the server uses.
pub fn build_request(
    protocol_version: ProtocolVersion,
    batch: Vec<RequestPayload>,
) -> KmipResult<RequestMessage> {
    if batch.is_empty() {
        return Err(KmipError::InvalidKmipValue(
            ResultReason::Invalid_Message,
            "a request needs at least one batch item".to_owned(),
        ))
    }
    let batch_count = i32::try_from(batch.len())?;
    let numbered = batch.len() > 1;
    let batch_item = batch
        .into_iter()
        .zip(1_u32..)
        .map(|(payload, id)| {
            let mut item = RequestMessageBatchItem::new(payload);
            if numbered {
                item.unique_batch_item_id = Some(id.to_be_bytes().to_vec());
            }
            item
        })
        .collect();
    Ok(RequestMessage {
        request_header: RequestMessageHeader {
            protocol_version,
            batch_count,
            ..Default::default()
        },
        batch_item,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessageHeader {
    pub protocol_version: ProtocolVersion,
    pub time_stamp: OffsetDateTime,
    pub batch_count: i32,
}

impl ToTtlv for ResponseMessageHeader {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        Ok(TTLV::structure(
            Tag::ResponseHeader,
            vec![
                protocol_version_to_ttlv(self.protocol_version),
                TTLV::date_time(Tag::TimeStamp, self.time_stamp),
                TTLV::integer(Tag::BatchCount, self.batch_count),
            ],
        ))
    }
}

impl FromTtlv for ResponseMessageHeader {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::ResponseHeader)?;
        Ok(Self {
            protocol_version: protocol_version_from_ttlv(fields.required(Tag::ProtocolVersion)?)?,
            time_stamp: fields.opt_date_time(Tag::TimeStamp)?.ok_or_else(|| {
                KmipError::MalformedMessage("ResponseHeader: missing field TimeStamp".to_owned())
            })?,
            batch_count: fields.integer(Tag::BatchCount)?,
        })
    }
}

/// Batch item of a response message.
///
/// The payload is kept as a TTLV tree: its layout depends on the operation
/// of the request item it answers, known only once the two are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessageBatchItem {
    /// Required if present in request Batch Item
    pub operation: Option<OperationEnumeration>,
    /// Required if present in request Batch Item
    pub unique_batch_item_id: Option<Vec<u8>>,
    pub result_status: ResultStatusEnumeration,
    /// Required if `result_status` is `OperationFailed`
    pub result_reason: Option<ResultReason>,
    pub result_message: Option<String>,
    /// Required if `result_status` is `OperationPending`
    pub asynchronous_correlation_value: Option<Vec<u8>>,
    pub response_payload: Option<TTLV>,
}

impl ResponseMessageBatchItem {
    pub fn success(
        operation: OperationEnumeration,
        unique_batch_item_id: Option<Vec<u8>>,
        payload: &ResponsePayload,
        policy: AttributePolicy,
    ) -> KmipResult<Self> {
        Ok(Self {
            operation: Some(operation),
            unique_batch_item_id,
            result_status: ResultStatusEnumeration::Success,
            result_reason: None,
            result_message: None,
            asynchronous_correlation_value: None,
            response_payload: Some(payload.to_ttlv_with(policy)?),
        })
    }

    #[must_use]
    pub fn failure(
        operation: OperationEnumeration,
        unique_batch_item_id: Option<Vec<u8>>,
        reason: ResultReason,
        message: &str,
    ) -> Self {
        Self {
            operation: Some(operation),
            unique_batch_item_id,
            result_status: ResultStatusEnumeration::OperationFailed,
            result_reason: Some(reason),
            result_message: Some(message.to_owned()),
            asynchronous_correlation_value: None,
            response_payload: None,
        }
    }
}

impl ToTtlv for ResponseMessageBatchItem {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut items = Vec::new();
        if let Some(operation) = self.operation {
            items.push(TTLV::enumeration(Tag::Operation, operation));
        }
        if let Some(id) = &self.unique_batch_item_id {
            items.push(TTLV::byte_string(Tag::UniqueBatchItemID, id));
        }
        items.push(TTLV::enumeration(Tag::ResultStatus, self.result_status));
        if let Some(reason) = self.result_reason {
            items.push(TTLV::enumeration(Tag::ResultReason, reason));
        }
        if let Some(message) = &self.result_message {
            items.push(TTLV::text_string(Tag::ResultMessage, message));
        }
        if let Some(correlation) = &self.asynchronous_correlation_value {
            items.push(TTLV::byte_string(
                Tag::AsynchronousCorrelationValue,
                correlation,
            ));
        }
        if let Some(payload) = &self.response_payload {
            items.push(payload.clone());
        }
        Ok(TTLV::structure(Tag::BatchItem, items))
    }
}

impl FromTtlv for ResponseMessageBatchItem {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::BatchItem)?;
        Ok(Self {
            operation: fields.opt_enumeration(Tag::Operation)?,
            unique_batch_item_id: fields.opt_bytes(Tag::UniqueBatchItemID)?,
            result_status: fields.enumeration(Tag::ResultStatus)?,
            result_reason: fields.opt_enumeration(Tag::ResultReason)?,
            result_message: fields.opt_text(Tag::ResultMessage)?,
            asynchronous_correlation_value: fields.opt_bytes(Tag::AsynchronousCorrelationValue)?,
            response_payload: fields.find(Tag::ResponsePayload).cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub response_header: ResponseMessageHeader,
    pub batch_item: Vec<ResponseMessageBatchItem>,
}

impl ToTtlv for ResponseMessage {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut items = vec![self.response_header.to_ttlv()?];
        for item in &self.batch_item {
            items.push(item.to_ttlv()?);
        }
        Ok(TTLV::structure(Tag::ResponseMessage, items))
    }
}

impl FromTtlv for ResponseMessage {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::ResponseMessage)?;
        Ok(Self {
            response_header: ResponseMessageHeader::from_ttlv(
                fields.required(Tag::ResponseHeader)?,
            )?,
            batch_item: fields
                .find_all(Tag::BatchItem)
                .map(ResponseMessageBatchItem::from_ttlv)
                .collect::<KmipResult<Vec<_>>>()?,
        })
    }
}

/// The result of one request batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchItemOutcome {
    /// Some operations return no payload
    Success(Option<ResponsePayload>),
    Failed {
        reason: ResultReason,
        message: Option<String>,
    },
    /// The server will complete the operation asynchronously
    Pending { correlation: Vec<u8> },
    /// The operation was rolled back after a later item of the batch failed
    Undone {
        reason: Option<ResultReason>,
        message: Option<String>,
    },
}

impl BatchItemOutcome {
    #[must_use]
    pub const fn status(&self) -> ResultStatusEnumeration {
        match self {
            Self::Success(_) => ResultStatusEnumeration::Success,
            Self::Failed { .. } => ResultStatusEnumeration::OperationFailed,
            Self::Pending { .. } => ResultStatusEnumeration::OperationPending,
            Self::Undone { .. } => ResultStatusEnumeration::OperationUndone,
        }
    }
}

/// How a response message is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub decode: DecodeOptions,
    pub attribute_policy: AttributePolicy,
}

/// Decode the response to `request` and return one outcome per request
/// batch item, in request order.
pub fn parse_response(bytes: &[u8], request: &RequestMessage) -> KmipResult<Vec<BatchItemOutcome>> {
    parse_response_with(bytes, request, ParseOptions::default())
}

pub fn parse_response_with(
    bytes: &[u8],
    request: &RequestMessage,
    options: ParseOptions,
) -> KmipResult<Vec<BatchItemOutcome>> {
    let (ttlv, remaining) = TTLV::from_bytes_with(bytes, options.decode)?;
    if !remaining.is_empty() {
        return Err(KmipError::MalformedMessage(format!(
            "{} trailing bytes after the response message",
            remaining.len()
        )))
    }
    trace!("response TTLV: {ttlv:?}");
    let response = ResponseMessage::from_ttlv(&ttlv)?;
    correlate(response, request, options.attribute_policy)
}

fn correlate(
    response: ResponseMessage,
    request: &RequestMessage,
    policy: AttributePolicy,
) -> KmipResult<Vec<BatchItemOutcome>> {
    let expected = request.batch_item.len();
    let announced = usize::try_from(response.response_header.batch_count).map_err(|_e| {
        KmipError::MalformedMessage(format!(
            "negative batch count {} in the response header",
            response.response_header.batch_count
        ))
    })?;
    let actual = response.batch_item.len();
    if actual != expected || announced != expected {
        return Err(KmipError::BatchSizeMismatch {
            expected,
            actual: if actual == expected { announced } else { actual },
        })
    }

    let mut outcomes: Vec<Option<BatchItemOutcome>> = vec![None; expected];
    for (position, item) in response.batch_item.into_iter().enumerate() {
        let index = match &item.unique_batch_item_id {
            Some(id) => request
                .batch_item
                .iter()
                .position(|r| r.unique_batch_item_id.as_ref() == Some(id))
                .ok_or_else(|| {
                    KmipError::MalformedMessage(format!(
                        "unknown unique batch item id {}",
                        hex::encode(id)
                    ))
                })?,
            None => position,
        };
        let request_item = request.batch_item.get(index).ok_or_else(|| {
            KmipError::MalformedMessage(format!("no request batch item at {index}"))
        })?;
        if let Some(operation) = item.operation {
            if operation != request_item.operation {
                return Err(KmipError::MalformedMessage(format!(
                    "response item {position} answers {operation}, the request was {}",
                    request_item.operation
                )))
            }
        }
        let outcome = outcome(item, request_item.operation, policy)?;
        debug!(
            "batch item {index}: {} -> {}",
            request_item.operation,
            outcome.status()
        );
        let slot = outcomes.get_mut(index).ok_or_else(|| {
            KmipError::MalformedMessage(format!("no request batch item at {index}"))
        })?;
        if slot.is_some() {
            return Err(KmipError::MalformedMessage(format!(
                "request batch item {index} answered twice"
            )))
        }
        *slot = Some(outcome);
    }
    outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            outcome.ok_or_else(|| {
                KmipError::MalformedMessage(format!("request batch item {index} not answered"))
            })
        })
        .collect()
}

fn outcome(
    item: ResponseMessageBatchItem,
    operation: OperationEnumeration,
    policy: AttributePolicy,
) -> KmipResult<BatchItemOutcome> {
    Ok(match item.result_status {
        ResultStatusEnumeration::Success => BatchItemOutcome::Success(
            item.response_payload
                .as_ref()
                .map(|payload| ResponsePayload::from_ttlv_with(operation, payload, policy))
                .transpose()?,
        ),
        ResultStatusEnumeration::OperationFailed => BatchItemOutcome::Failed {
            reason: item.result_reason.ok_or_else(|| {
                KmipError::MalformedMessage(format!("failed {operation} without a result reason"))
            })?,
            message: item.result_message,
        },
        ResultStatusEnumeration::OperationPending => BatchItemOutcome::Pending {
            correlation: item.asynchronous_correlation_value.ok_or_else(|| {
                KmipError::MalformedMessage(format!(
                    "pending {operation} without an asynchronous correlation value"
                ))
            })?,
        },
        ResultStatusEnumeration::OperationUndone => BatchItemOutcome::Undone {
            reason: item.result_reason,
            message: item.result_message,
        },
    })
}
