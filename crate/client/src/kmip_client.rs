//! Synchronous KMIP client over a [`KmipTransport`].
//!
//! Every operation takes `&mut self`: a client handle owns one transport
//! session, one in-flight batch at a time, and the lifecycle cache of the
//! objects it touched.
use std::fmt;

use kmip_proto::{
    kmip_attributes::{
        AttributePolicy, AttributeValue, Attributes, CRYPTOGRAPHIC_ALGORITHM, CRYPTOGRAPHIC_LENGTH,
        CRYPTOGRAPHIC_USAGE_MASK, OBJECT_TYPE, STATE,
    },
    kmip_data_structures::{CryptographicParameters, Credential, KeyBlock, RevocationReason},
    kmip_messages::{BatchItemOutcome, ParseOptions, build_request, parse_response_with},
    kmip_operations::{
        CreateRequest, CryptoRequest, GetAttributesRequest, GetRequest, LocateRequest,
        RequestPayload, ResponsePayload, RevokeRequest, UniqueIdentifierRequest,
    },
    kmip_types::{
        BlockCipherMode, CryptographicAlgorithm, CryptographicUsageMask, ObjectType,
        OperationEnumeration, ProtocolVersion, RevocationReasonCode,
    },
    ttlv::DecodeOptions,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    ClientError,
    config::KmipClientConfig,
    error::result::ClientResult,
    lifecycle::{KeyUse, LifecycleEvent, ObjectStateTable},
    socket_transport::SocketTransport,
    transport::{KmipTransport, TransportError},
};

/// Settings applied to every request message
#[derive(Debug, Clone, Default)]
pub struct KmipClientOptions {
    pub protocol_version: ProtocolVersion,
    pub credential: Option<Credential>,
    pub maximum_response_size: Option<i32>,
    pub attribute_policy: AttributePolicy,
    pub decode: DecodeOptions,
}

impl KmipClientOptions {
    pub fn from_config(config: &KmipClientConfig) -> ClientResult<Self> {
        let credential = match (&config.username, &config.password) {
            (Some(username), password) => Some(Credential {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, Some(_)) => {
                return Err(ClientError::Configuration(
                    "a password is configured without a username".to_owned(),
                ))
            }
            (None, None) => None,
        };
        Ok(Self {
            protocol_version: config.protocol_version()?,
            credential,
            maximum_response_size: config.maximum_response_size,
            attribute_policy: config.attribute_policy(),
            decode: DecodeOptions::default(),
        })
    }
}

/// A mutating operation whose outcome the client could not learn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndeterminateOperation {
    Create {
        name: Option<String>,
    },
    Mutation {
        operation: OperationEnumeration,
        unique_identifier: String,
    },
}

impl IndeterminateOperation {
    fn of(payload: &RequestPayload) -> Option<Self> {
        match payload {
            RequestPayload::Create(request) => Some(Self::Create {
                name: request.template_attribute.name().map(|n| n.name_value),
            }),
            RequestPayload::Activate(_) | RequestPayload::Revoke(_) | RequestPayload::Destroy(_) => {
                payload
                    .unique_identifier()
                    .map(|unique_identifier| Self::Mutation {
                        operation: payload.operation(),
                        unique_identifier: unique_identifier.to_owned(),
                    })
            }
            _ => None,
        }
    }

    /// Whether sending `payload` could repeat this operation.
    fn blocks(&self, payload: &RequestPayload) -> bool {
        match (self, payload) {
            (Self::Create { .. }, RequestPayload::Create(_)) => true,
            (
                Self::Mutation {
                    unique_identifier, ..
                },
                RequestPayload::Activate(_) | RequestPayload::Revoke(_) | RequestPayload::Destroy(_),
            ) => payload.unique_identifier() == Some(unique_identifier.as_str()),
            _ => false,
        }
    }
}

impl fmt::Display for IndeterminateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { name: Some(name) } => write!(f, "Create of {name}"),
            Self::Create { name: None } => write!(f, "Create"),
            Self::Mutation {
                operation,
                unique_identifier,
            } => write!(f, "{operation} of {unique_identifier}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptResult {
    pub ciphertext: Vec<u8>,
    /// The IV the server generated, `None` when the caller supplied one
    pub generated_iv: Option<Vec<u8>>,
    pub authenticated_encryption_tag: Option<Vec<u8>>,
}

pub struct KmipClient<T: KmipTransport> {
    transport: T,
    options: KmipClientOptions,
    objects: ObjectStateTable,
    indeterminate: Vec<IndeterminateOperation>,
}

impl KmipClient<SocketTransport> {
    /// Connect to the server described by `config`.
    pub fn from_config(config: &KmipClientConfig) -> ClientResult<Self> {
        let options = KmipClientOptions::from_config(config)?;
        let transport = SocketTransport::connect(config)?;
        Ok(Self::new(transport, options))
    }
}

impl<T: KmipTransport> KmipClient<T> {
    pub fn new(transport: T, options: KmipClientOptions) -> Self {
        Self {
            transport,
            options,
            objects: ObjectStateTable::new(),
            indeterminate: Vec::new(),
        }
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The cached lifecycle view of the objects of this session
    pub const fn objects(&self) -> &ObjectStateTable {
        &self.objects
    }

    /// Mutating operations sent without a known outcome
    pub fn indeterminate_operations(&self) -> &[IndeterminateOperation] {
        &self.indeterminate
    }

    /// Forget the indeterminate operations once the caller checked the
    /// server state by other means.
    pub fn resolve_indeterminate(&mut self) -> Vec<IndeterminateOperation> {
        std::mem::take(&mut self.indeterminate)
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Create a symmetric key. The key starts `PreActive`.
    pub fn create(
        &mut self,
        algorithm: CryptographicAlgorithm,
        length: i32,
        usage_mask: CryptographicUsageMask,
    ) -> ClientResult<String> {
        self.create_with_attributes(algorithm, length, usage_mask, &Attributes::new())
    }

    /// Create a symmetric key with additional template attributes.
    ///
    /// A `Name` attribute lets the caller find the key with `locate` if the
    /// outcome of the Create is lost.
    pub fn create_with_attributes(
        &mut self,
        algorithm: CryptographicAlgorithm,
        length: i32,
        usage_mask: CryptographicUsageMask,
        attributes: &Attributes,
    ) -> ClientResult<String> {
        if let Some(lengths) = algorithm.valid_key_lengths() {
            if !lengths.contains(&length) {
                return Err(ClientError::InvalidCryptographicParameters(format!(
                    "{length} is not a valid key length for {algorithm}, expected one of \
                     {lengths:?}"
                )))
            }
        }
        let mut template = Attributes::new();
        template
            .set(CRYPTOGRAPHIC_ALGORITHM, AttributeValue::enumeration(algorithm))
            .set(CRYPTOGRAPHIC_LENGTH, length)
            .set(CRYPTOGRAPHIC_USAGE_MASK, usage_mask);
        template.merge(attributes);

        let payload = RequestPayload::Create(CreateRequest {
            object_type: ObjectType::SymmetricKey,
            template_attribute: template.clone(),
        });
        let ResponsePayload::Create(response) = self.execute(payload)? else {
            return Err(unexpected_payload(OperationEnumeration::Create))
        };
        if let Some(server_attributes) = &response.template_attribute {
            template.merge(server_attributes);
        }
        self.objects
            .insert_created(&response.unique_identifier, response.object_type, &template);
        info!(
            "created {} {} ({algorithm} {length})",
            response.object_type, response.unique_identifier
        );
        Ok(response.unique_identifier)
    }

    pub fn activate(&mut self, unique_identifier: &str) -> ClientResult<()> {
        let payload = RequestPayload::Activate(UniqueIdentifierRequest {
            unique_identifier: unique_identifier.to_owned(),
        });
        self.transition(unique_identifier, LifecycleEvent::Activate, payload)
    }

    /// Revoke a key. Compromise reasons move it to `Compromised`, others
    /// deactivate it.
    pub fn revoke(
        &mut self,
        unique_identifier: &str,
        reason: RevocationReasonCode,
        message: Option<&str>,
    ) -> ClientResult<()> {
        let compromise = reason.is_compromise();
        let payload = RequestPayload::Revoke(RevokeRequest {
            unique_identifier: unique_identifier.to_owned(),
            revocation_reason: RevocationReason {
                revocation_reason_code: reason,
                revocation_message: message.map(ToOwned::to_owned),
            },
            compromise_occurrence_date: compromise.then(OffsetDateTime::now_utc),
        });
        self.transition(
            unique_identifier,
            LifecycleEvent::Revoke { compromise },
            payload,
        )
    }

    pub fn destroy(&mut self, unique_identifier: &str) -> ClientResult<()> {
        let payload = RequestPayload::Destroy(UniqueIdentifierRequest {
            unique_identifier: unique_identifier.to_owned(),
        });
        self.transition(unique_identifier, LifecycleEvent::Destroy, payload)
    }

    /// Encrypt `plaintext` with the key `unique_identifier`.
    ///
    /// Without an IV, a mode that needs one gets `Random IV` set and the
    /// server generates it; the IV is returned in `generated_iv`.
    pub fn encrypt(
        &mut self,
        unique_identifier: &str,
        plaintext: &[u8],
        parameters: &CryptographicParameters,
        iv: Option<&[u8]>,
    ) -> ClientResult<EncryptResult> {
        self.ensure_cached(unique_identifier)?;
        self.objects.check_use(unique_identifier, KeyUse::Encrypt)?;

        let mut parameters = parameters.clone();
        let server_iv = iv.is_none()
            && parameters
                .block_cipher_mode
                .is_some_and(BlockCipherMode::requires_iv);
        if server_iv && parameters.random_iv.is_none() {
            parameters.random_iv = Some(true);
        }
        parameters.validate(self.key_algorithm(unique_identifier), iv)?;

        let payload = RequestPayload::Encrypt(CryptoRequest {
            unique_identifier: Some(unique_identifier.to_owned()),
            cryptographic_parameters: Some(parameters),
            data: Zeroizing::new(plaintext.to_vec()),
            iv_counter_nonce: iv.map(<[u8]>::to_vec),
            ..CryptoRequest::default()
        });
        let response = self.execute_with_refresh(unique_identifier, payload, |objects| {
            objects.check_use(unique_identifier, KeyUse::Encrypt)
        })?;
        let ResponsePayload::Encrypt(response) = response else {
            return Err(unexpected_payload(OperationEnumeration::Encrypt))
        };
        let ciphertext = response.data.ok_or_else(|| {
            ClientError::MalformedMessage("Encrypt response without data".to_owned())
        })?;
        let generated_iv = if iv.is_some() {
            None
        } else {
            response.iv_counter_nonce
        };
        if server_iv && generated_iv.is_none() {
            return Err(ClientError::MalformedMessage(
                "the server did not return the IV it generated".to_owned(),
            ))
        }
        debug!(
            "encrypted {} bytes with {unique_identifier} into {} bytes",
            plaintext.len(),
            ciphertext.len()
        );
        Ok(EncryptResult {
            ciphertext,
            generated_iv,
            authenticated_encryption_tag: response.authenticated_encryption_tag,
        })
    }

    pub fn decrypt(
        &mut self,
        unique_identifier: &str,
        ciphertext: &[u8],
        parameters: &CryptographicParameters,
        iv: Option<&[u8]>,
    ) -> ClientResult<Zeroizing<Vec<u8>>> {
        self.ensure_cached(unique_identifier)?;
        self.objects.check_use(unique_identifier, KeyUse::Decrypt)?;
        parameters.validate(self.key_algorithm(unique_identifier), iv)?;

        let payload = RequestPayload::Decrypt(CryptoRequest {
            unique_identifier: Some(unique_identifier.to_owned()),
            cryptographic_parameters: Some(parameters.clone()),
            data: Zeroizing::new(ciphertext.to_vec()),
            iv_counter_nonce: iv.map(<[u8]>::to_vec),
            ..CryptoRequest::default()
        });
        let response = self.execute_with_refresh(unique_identifier, payload, |objects| {
            objects.check_use(unique_identifier, KeyUse::Decrypt)
        })?;
        let ResponsePayload::Decrypt(response) = response else {
            return Err(unexpected_payload(OperationEnumeration::Decrypt))
        };
        response.data.ok_or_else(|| {
            ClientError::MalformedMessage("Decrypt response without data".to_owned())
        })
    }

    /// Retrieve the key material. Every call is logged.
    pub fn get(&mut self, unique_identifier: &str) -> ClientResult<KeyBlock> {
        let payload = RequestPayload::Get(GetRequest {
            unique_identifier: unique_identifier.to_owned(),
            key_format_type: None,
        });
        let ResponsePayload::Get(response) = self.execute(payload)? else {
            return Err(unexpected_payload(OperationEnumeration::Get))
        };
        warn!(
            "key material of {} {unique_identifier} retrieved",
            response.object_type
        );
        Ok(response.object.key_block)
    }

    /// Fetch attributes of an object; all of them when `names` is empty.
    ///
    /// The lifecycle cache is refreshed from the reply and indeterminate
    /// operations on this object are considered resolved.
    pub fn get_attributes(
        &mut self,
        unique_identifier: &str,
        names: &[&str],
    ) -> ClientResult<Attributes> {
        let payload = RequestPayload::GetAttributes(GetAttributesRequest {
            unique_identifier: unique_identifier.to_owned(),
            attribute_names: names.iter().map(ToString::to_string).collect(),
        });
        let ResponsePayload::GetAttributes(response) = self.execute(payload)? else {
            return Err(unexpected_payload(OperationEnumeration::GetAttributes))
        };
        self.objects.observe(unique_identifier, &response.attributes);
        self.indeterminate.retain(|record| {
            !matches!(record, IndeterminateOperation::Mutation { unique_identifier: uid, .. } if uid == unique_identifier)
        });
        Ok(response.attributes)
    }

    /// Unique identifiers of the objects matching all `attributes`.
    ///
    /// A successful Locate resolves indeterminate Creates.
    pub fn locate(&mut self, attributes: &Attributes) -> ClientResult<Vec<String>> {
        let payload = RequestPayload::Locate(LocateRequest {
            maximum_items: None,
            attributes: attributes.clone(),
        });
        let ResponsePayload::Locate(response) = self.execute(payload)? else {
            return Err(unexpected_payload(OperationEnumeration::Locate))
        };
        self.indeterminate
            .retain(|record| !matches!(record, IndeterminateOperation::Create { .. }));
        Ok(response.unique_identifiers)
    }

    /// Send several operations in one request message.
    ///
    /// Items that use a key or move it between states are checked against
    /// the cached lifecycle view first, in request order. Outcomes come back
    /// in request order. The lifecycle cache of every object a mutating item
    /// names is invalidated.
    pub fn batch(&mut self, payloads: Vec<RequestPayload>) -> ClientResult<Vec<BatchItemOutcome>> {
        let mut checked: Vec<&str> = Vec::new();
        for payload in &payloads {
            if KeyUse::of(payload).is_none() && LifecycleEvent::of(payload).is_none() {
                continue
            }
            if let Some(unique_identifier) = payload.unique_identifier() {
                if !checked.contains(&unique_identifier) {
                    self.ensure_cached(unique_identifier)?;
                    checked.push(unique_identifier);
                }
            }
        }
        self.objects.check_batch(&payloads)?;

        let touched: Vec<String> = payloads
            .iter()
            .filter(|p| p.operation().is_mutating())
            .filter_map(|p| p.unique_identifier().map(ToOwned::to_owned))
            .collect();
        let outcomes = self.exchange(payloads)?;
        for unique_identifier in &touched {
            self.objects.invalidate(unique_identifier);
        }
        Ok(outcomes)
    }

    fn transition(
        &mut self,
        unique_identifier: &str,
        event: LifecycleEvent,
        payload: RequestPayload,
    ) -> ClientResult<()> {
        self.check_idempotency(&payload)?;
        self.execute_checked(unique_identifier, payload, |objects| {
            objects.check_transition(unique_identifier, event).map(|_| ())
        })?;
        self.objects.apply(unique_identifier, event);
        info!("{event} {unique_identifier}");
        Ok(())
    }

    fn key_algorithm(&self, unique_identifier: &str) -> Option<CryptographicAlgorithm> {
        self.objects
            .get(unique_identifier)
            .and_then(|o| o.cryptographic_algorithm)
    }

    /// Read the lifecycle view of an object through to the server when it is
    /// not cached. An object the server does not describe stays uncached.
    fn ensure_cached(&mut self, unique_identifier: &str) -> ClientResult<()> {
        if self.objects.contains(unique_identifier) {
            return Ok(())
        }
        match self.refresh(unique_identifier) {
            Err(ClientError::OperationFailed { reason, .. }) => {
                debug!("no lifecycle view of {unique_identifier}: {reason}");
                Ok(())
            }
            result => result,
        }
    }

    fn refresh(&mut self, unique_identifier: &str) -> ClientResult<()> {
        let attributes = self.get_attributes(
            unique_identifier,
            &[
                STATE,
                CRYPTOGRAPHIC_USAGE_MASK,
                CRYPTOGRAPHIC_ALGORITHM,
                CRYPTOGRAPHIC_LENGTH,
                OBJECT_TYPE,
            ],
        )?;
        if attributes.state().is_none() {
            return Err(ClientError::MalformedMessage(format!(
                "the server did not return the state of {unique_identifier}"
            )))
        }
        Ok(())
    }

    /// Send `payload` once `precondition` holds on the cached view.
    fn execute_checked<F>(
        &mut self,
        unique_identifier: &str,
        payload: RequestPayload,
        precondition: F,
    ) -> ClientResult<ResponsePayload>
    where
        F: Fn(&ObjectStateTable) -> ClientResult<()>,
    {
        self.ensure_cached(unique_identifier)?;
        precondition(&self.objects)?;
        self.execute_with_refresh(unique_identifier, payload, precondition)
    }

    /// Send `payload`, whose precondition already holds.
    ///
    /// A lifecycle or permission failure from the server while the cache
    /// allowed the call means the cache is stale: it is refreshed, the
    /// precondition checked again and the request sent one more time.
    fn execute_with_refresh<F>(
        &mut self,
        unique_identifier: &str,
        payload: RequestPayload,
        precondition: F,
    ) -> ClientResult<ResponsePayload>
    where
        F: Fn(&ObjectStateTable) -> ClientResult<()>,
    {
        match self.execute(payload.clone()) {
            Err(ClientError::OperationFailed {
                operation, reason, ..
            }) if reason.is_stale_state() && self.objects.contains(unique_identifier) => {
                warn!(
                    "{operation} on {unique_identifier} rejected with {reason} while the cached \
                     state allowed it: refreshing"
                );
                self.objects.invalidate(unique_identifier);
                self.refresh(unique_identifier)?;
                precondition(&self.objects)?;
                self.execute(payload)
            }
            result => result,
        }
    }

    fn execute(&mut self, payload: RequestPayload) -> ClientResult<ResponsePayload> {
        let operation = payload.operation();
        let outcome = self
            .exchange(vec![payload])?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MalformedMessage("empty response batch".to_owned()))?;
        into_payload(operation, outcome)
    }

    fn check_idempotency(&self, payload: &RequestPayload) -> ClientResult<()> {
        match self.indeterminate.iter().find(|record| record.blocks(payload)) {
            Some(record @ IndeterminateOperation::Create { .. }) => {
                Err(ClientError::IdempotencyCheckRequired(format!(
                    "the outcome of a previous {record} is unknown: locate the object or resolve \
                     the indeterminate operation before creating again"
                )))
            }
            Some(record) => Err(ClientError::IdempotencyCheckRequired(format!(
                "the outcome of a previous {record} is unknown: get its attributes before \
                 sending {} again",
                payload.operation()
            ))),
            None => Ok(()),
        }
    }

    /// One request/response round trip. Local failures happen before any
    /// byte is sent.
    fn exchange(&mut self, batch: Vec<RequestPayload>) -> ClientResult<Vec<BatchItemOutcome>> {
        for payload in &batch {
            self.check_idempotency(payload)?;
        }
        let mut request = build_request(self.options.protocol_version, batch)?;
        request.request_header.authentication = self.options.credential.clone();
        request.request_header.maximum_response_size = self.options.maximum_response_size;
        request.request_header.time_stamp = Some(OffsetDateTime::now_utc());
        let bytes = request.to_bytes(self.options.attribute_policy)?;

        let operation = request
            .batch_item
            .first()
            .map_or(OperationEnumeration::Query, |item| item.operation);
        let mutations: Vec<IndeterminateOperation> = request
            .batch_item
            .iter()
            .filter_map(|item| IndeterminateOperation::of(&item.request_payload))
            .collect();

        debug!("sending {request}");
        let response = match self.transport.send(&bytes) {
            Err(TransportError::Closed) => return Err(TransportError::Closed.into()),
            Err(cause) => return Err(self.indeterminate(operation, mutations, cause)),
            Ok(()) => match self.transport.receive() {
                Ok(response) => response,
                Err(cause) => return Err(self.indeterminate(operation, mutations, cause)),
            },
        };

        let options = ParseOptions {
            decode: self.options.decode,
            attribute_policy: self.options.attribute_policy,
        };
        parse_response_with(&response, &request, options).map_err(|e| {
            // the server may have executed the request
            for record in mutations {
                self.record_indeterminate(record);
            }
            e.into()
        })
    }

    fn indeterminate(
        &mut self,
        operation: OperationEnumeration,
        mutations: Vec<IndeterminateOperation>,
        cause: TransportError,
    ) -> ClientError {
        for record in mutations {
            self.record_indeterminate(record);
        }
        ClientError::OperationIndeterminate { operation, cause }
    }

    fn record_indeterminate(&mut self, record: IndeterminateOperation) {
        warn!("the outcome of {record} is unknown");
        if let IndeterminateOperation::Mutation {
            unique_identifier, ..
        } = &record
        {
            self.objects.invalidate(unique_identifier);
        }
        self.indeterminate.push(record);
    }
}

impl<T: KmipTransport> Drop for KmipClient<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// The payload of a successful item, or the typed failure of the others.
pub fn into_payload(
    operation: OperationEnumeration,
    outcome: BatchItemOutcome,
) -> ClientResult<ResponsePayload> {
    match outcome {
        BatchItemOutcome::Success(Some(payload)) => Ok(payload),
        BatchItemOutcome::Success(None) => Err(ClientError::MalformedMessage(format!(
            "{operation} succeeded without a response payload"
        ))),
        BatchItemOutcome::Failed { reason, message } => Err(ClientError::OperationFailed {
            operation,
            reason,
            message,
        }),
        BatchItemOutcome::Pending { correlation } => Err(ClientError::OperationPending {
            operation,
            correlation,
        }),
        BatchItemOutcome::Undone { reason, message } => Err(ClientError::OperationUndone {
            operation,
            reason,
            message,
        }),
    }
}

fn unexpected_payload(operation: OperationEnumeration) -> ClientError {
    ClientError::MalformedMessage(format!("unexpected response payload for {operation}"))
}
