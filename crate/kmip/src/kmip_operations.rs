//! Request and response payloads of the operations the engine speaks.
//!
//! Fields are written in the order KMIP 1.x mandates for each payload.

use time::OffsetDateTime;
use zeroize::Zeroizing;

use crate::{
    error::{KmipError, result::KmipResult},
    kmip_attributes::{AttributePolicy, Attributes},
    kmip_data_structures::{CryptographicParameters, ManagedObject, RevocationReason},
    kmip_types::{KeyFormatType, ObjectType, OperationEnumeration, ResultReason, Tag},
    ttlv::{FromTtlv, TTLV, ToTtlv, TtlvFields, ttlv_mapping::as_text},
};

fn request_payload(items: Vec<TTLV>) -> TTLV {
    TTLV::structure(Tag::RequestPayload, items)
}

fn response_payload(items: Vec<TTLV>) -> TTLV {
    TTLV::structure(Tag::ResponsePayload, items)
}

fn push_opt_bytes(items: &mut Vec<TTLV>, tag: Tag, value: Option<&[u8]>) {
    if let Some(v) = value {
        items.push(TTLV::byte_string(tag, v));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub object_type: ObjectType,
    pub template_attribute: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResponse {
    pub object_type: ObjectType,
    pub unique_identifier: String,
    /// Attributes the server set implicitly
    pub template_attribute: Option<Attributes>,
}

/// Requests naming a single object: Activate, Destroy, Get Attributes...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIdentifierRequest {
    pub unique_identifier: String,
}

/// Responses echoing the object identifier: Activate, Revoke, Destroy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIdentifierResponse {
    pub unique_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeRequest {
    pub unique_identifier: String,
    pub revocation_reason: RevocationReason,
    pub compromise_occurrence_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub unique_identifier: String,
    pub key_format_type: Option<KeyFormatType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponse {
    pub object_type: ObjectType,
    pub unique_identifier: String,
    pub object: ManagedObject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAttributesRequest {
    pub unique_identifier: String,
    /// Empty to request every attribute
    pub attribute_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAttributesResponse {
    pub unique_identifier: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocateRequest {
    pub maximum_items: Option<i32>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocateResponse {
    pub located_items: Option<i32>,
    pub unique_identifiers: Vec<String>,
}

/// Encrypt or Decrypt request.
/// `authenticated_encryption_tag` is only sent on Decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptoRequest {
    pub unique_identifier: Option<String>,
    pub cryptographic_parameters: Option<CryptographicParameters>,
    pub data: Zeroizing<Vec<u8>>,
    pub iv_counter_nonce: Option<Vec<u8>>,
    pub correlation_value: Option<Vec<u8>>,
    pub init_indicator: Option<bool>,
    pub final_indicator: Option<bool>,
    pub authenticated_encryption_additional_data: Option<Vec<u8>>,
    pub authenticated_encryption_tag: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptResponse {
    pub unique_identifier: String,
    pub data: Option<Vec<u8>>,
    /// Present when the server generated the IV
    pub iv_counter_nonce: Option<Vec<u8>>,
    pub correlation_value: Option<Vec<u8>>,
    pub authenticated_encryption_tag: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptResponse {
    pub unique_identifier: String,
    pub data: Option<Zeroizing<Vec<u8>>>,
    pub correlation_value: Option<Vec<u8>>,
}

/// The payload of a request batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    Create(CreateRequest),
    Activate(UniqueIdentifierRequest),
    Revoke(RevokeRequest),
    Destroy(UniqueIdentifierRequest),
    Get(GetRequest),
    GetAttributes(GetAttributesRequest),
    Locate(LocateRequest),
    Encrypt(CryptoRequest),
    Decrypt(CryptoRequest),
}

impl RequestPayload {
    #[must_use]
    pub const fn operation(&self) -> OperationEnumeration {
        match self {
            Self::Create(_) => OperationEnumeration::Create,
            Self::Activate(_) => OperationEnumeration::Activate,
            Self::Revoke(_) => OperationEnumeration::Revoke,
            Self::Destroy(_) => OperationEnumeration::Destroy,
            Self::Get(_) => OperationEnumeration::Get,
            Self::GetAttributes(_) => OperationEnumeration::GetAttributes,
            Self::Locate(_) => OperationEnumeration::Locate,
            Self::Encrypt(_) => OperationEnumeration::Encrypt,
            Self::Decrypt(_) => OperationEnumeration::Decrypt,
        }
    }

    /// The object the request is about, if it names one
    #[must_use]
    pub fn unique_identifier(&self) -> Option<&str> {
        match self {
            Self::Activate(r) | Self::Destroy(r) => Some(&r.unique_identifier),
            Self::Revoke(r) => Some(&r.unique_identifier),
            Self::Get(r) => Some(&r.unique_identifier),
            Self::GetAttributes(r) => Some(&r.unique_identifier),
            Self::Encrypt(r) | Self::Decrypt(r) => r.unique_identifier.as_deref(),
            Self::Create(_) | Self::Locate(_) => None,
        }
    }

    /// Encode the payload, checking attributes against the registry with `policy`
    pub fn to_ttlv_with(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        Ok(match self {
            Self::Create(r) => request_payload(vec![
                TTLV::enumeration(Tag::ObjectType, r.object_type),
                r.template_attribute.to_template_attribute(policy)?,
            ]),
            Self::Activate(r) | Self::Destroy(r) => request_payload(vec![TTLV::text_string(
                Tag::UniqueIdentifier,
                &r.unique_identifier,
            )]),
            Self::Revoke(r) => {
                let mut items = vec![
                    TTLV::text_string(Tag::UniqueIdentifier, &r.unique_identifier),
                    r.revocation_reason.to_ttlv()?,
                ];
                if let Some(date) = r.compromise_occurrence_date {
                    items.push(TTLV::date_time(Tag::CompromiseOccurrenceDate, date));
                }
                request_payload(items)
            }
            Self::Get(r) => {
                let mut items = vec![TTLV::text_string(
                    Tag::UniqueIdentifier,
                    &r.unique_identifier,
                )];
                if let Some(key_format_type) = r.key_format_type {
                    items.push(TTLV::enumeration(Tag::KeyFormatType, key_format_type));
                }
                request_payload(items)
            }
            Self::GetAttributes(r) => {
                let mut items = vec![TTLV::text_string(
                    Tag::UniqueIdentifier,
                    &r.unique_identifier,
                )];
                items.extend(
                    r.attribute_names
                        .iter()
                        .map(|name| TTLV::text_string(Tag::AttributeName, name)),
                );
                request_payload(items)
            }
            Self::Locate(r) => {
                let mut items = Vec::new();
                if let Some(maximum_items) = r.maximum_items {
                    items.push(TTLV::integer(Tag::MaximumItems, maximum_items));
                }
                items.extend(r.attributes.to_ttlv_items(policy)?);
                request_payload(items)
            }
            Self::Encrypt(r) | Self::Decrypt(r) => {
                let mut items = Vec::new();
                if let Some(uid) = &r.unique_identifier {
                    items.push(TTLV::text_string(Tag::UniqueIdentifier, uid));
                }
                if let Some(params) = &r.cryptographic_parameters {
                    items.push(params.to_ttlv()?);
                }
                items.push(TTLV::byte_string(Tag::Data, &r.data));
                push_opt_bytes(&mut items, Tag::IVCounterNonce, r.iv_counter_nonce.as_deref());
                push_opt_bytes(
                    &mut items,
                    Tag::CorrelationValue,
                    r.correlation_value.as_deref(),
                );
                if let Some(v) = r.init_indicator {
                    items.push(TTLV::boolean(Tag::InitIndicator, v));
                }
                if let Some(v) = r.final_indicator {
                    items.push(TTLV::boolean(Tag::FinalIndicator, v));
                }
                push_opt_bytes(
                    &mut items,
                    Tag::AuthenticatedEncryptionAdditionalData,
                    r.authenticated_encryption_additional_data.as_deref(),
                );
                if matches!(self, Self::Decrypt(_)) {
                    push_opt_bytes(
                        &mut items,
                        Tag::AuthenticatedEncryptionTag,
                        r.authenticated_encryption_tag.as_deref(),
                    );
                }
                request_payload(items)
            }
        })
    }

    /// Decode the payload of a request for `operation`
    pub fn from_ttlv_with(
        operation: OperationEnumeration,
        ttlv: &TTLV,
        policy: AttributePolicy,
    ) -> KmipResult<Self> {
        let fields = TtlvFields::of(ttlv, Tag::RequestPayload)?;
        let uid_request = || -> KmipResult<UniqueIdentifierRequest> {
            Ok(UniqueIdentifierRequest {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
            })
        };
        Ok(match operation {
            OperationEnumeration::Create => Self::Create(CreateRequest {
                object_type: fields.enumeration(Tag::ObjectType)?,
                template_attribute: Attributes::from_template_attribute(
                    fields.required(Tag::TemplateAttribute)?,
                    policy,
                )?,
            }),
            OperationEnumeration::Activate => Self::Activate(uid_request()?),
            OperationEnumeration::Destroy => Self::Destroy(uid_request()?),
            OperationEnumeration::Revoke => Self::Revoke(RevokeRequest {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                revocation_reason: RevocationReason::from_ttlv(
                    fields.required(Tag::RevocationReason)?,
                )?,
                compromise_occurrence_date: fields.opt_date_time(Tag::CompromiseOccurrenceDate)?,
            }),
            OperationEnumeration::Get => Self::Get(GetRequest {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                key_format_type: fields.opt_enumeration(Tag::KeyFormatType)?,
            }),
            OperationEnumeration::GetAttributes => Self::GetAttributes(GetAttributesRequest {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                attribute_names: fields
                    .find_all(Tag::AttributeName)
                    .map(as_text)
                    .collect::<Result<_, _>>()?,
            }),
            OperationEnumeration::Locate => Self::Locate(LocateRequest {
                maximum_items: fields.opt_integer(Tag::MaximumItems)?,
                attributes: Attributes::from_ttlv_items(fields.items(), policy)?,
            }),
            OperationEnumeration::Encrypt | OperationEnumeration::Decrypt => {
                let request = CryptoRequest {
                    unique_identifier: fields.opt_text(Tag::UniqueIdentifier)?,
                    cryptographic_parameters: fields.opt_object(Tag::CryptographicParameters)?,
                    data: Zeroizing::new(fields.bytes(Tag::Data)?),
                    iv_counter_nonce: fields.opt_bytes(Tag::IVCounterNonce)?,
                    correlation_value: fields.opt_bytes(Tag::CorrelationValue)?,
                    init_indicator: fields.opt_boolean(Tag::InitIndicator)?,
                    final_indicator: fields.opt_boolean(Tag::FinalIndicator)?,
                    authenticated_encryption_additional_data: fields
                        .opt_bytes(Tag::AuthenticatedEncryptionAdditionalData)?,
                    authenticated_encryption_tag: fields
                        .opt_bytes(Tag::AuthenticatedEncryptionTag)?,
                };
                if operation == OperationEnumeration::Encrypt {
                    Self::Encrypt(request)
                } else {
                    Self::Decrypt(request)
                }
            }
            other => {
                return Err(KmipError::Kmip(
                    ResultReason::Operation_Not_Supported,
                    format!("unsupported operation {other}"),
                ))
            }
        })
    }
}

impl ToTtlv for RequestPayload {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        self.to_ttlv_with(AttributePolicy::Strict)
    }
}

/// The payload of a successful response batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Create(CreateResponse),
    Activate(UniqueIdentifierResponse),
    Revoke(UniqueIdentifierResponse),
    Destroy(UniqueIdentifierResponse),
    Get(GetResponse),
    GetAttributes(GetAttributesResponse),
    Locate(LocateResponse),
    Encrypt(EncryptResponse),
    Decrypt(DecryptResponse),
}

impl ResponsePayload {
    #[must_use]
    pub const fn operation(&self) -> OperationEnumeration {
        match self {
            Self::Create(_) => OperationEnumeration::Create,
            Self::Activate(_) => OperationEnumeration::Activate,
            Self::Revoke(_) => OperationEnumeration::Revoke,
            Self::Destroy(_) => OperationEnumeration::Destroy,
            Self::Get(_) => OperationEnumeration::Get,
            Self::GetAttributes(_) => OperationEnumeration::GetAttributes,
            Self::Locate(_) => OperationEnumeration::Locate,
            Self::Encrypt(_) => OperationEnumeration::Encrypt,
            Self::Decrypt(_) => OperationEnumeration::Decrypt,
        }
    }

    pub fn to_ttlv_with(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        Ok(match self {
            Self::Create(r) => {
                let mut items = vec![
                    TTLV::enumeration(Tag::ObjectType, r.object_type),
                    TTLV::text_string(Tag::UniqueIdentifier, &r.unique_identifier),
                ];
                if let Some(attributes) = &r.template_attribute {
                    items.push(attributes.to_template_attribute(policy)?);
                }
                response_payload(items)
            }
            Self::Activate(r) | Self::Revoke(r) | Self::Destroy(r) => response_payload(vec![
                TTLV::text_string(Tag::UniqueIdentifier, &r.unique_identifier),
            ]),
            Self::Get(r) => response_payload(vec![
                TTLV::enumeration(Tag::ObjectType, r.object_type),
                TTLV::text_string(Tag::UniqueIdentifier, &r.unique_identifier),
                r.object.to_ttlv()?,
            ]),
            Self::GetAttributes(r) => {
                let mut items = vec![TTLV::text_string(
                    Tag::UniqueIdentifier,
                    &r.unique_identifier,
                )];
                items.extend(r.attributes.to_ttlv_items(policy)?);
                response_payload(items)
            }
            Self::Locate(r) => {
                let mut items = Vec::new();
                if let Some(located_items) = r.located_items {
                    items.push(TTLV::integer(Tag::LocatedItems, located_items));
                }
                items.extend(
                    r.unique_identifiers
                        .iter()
                        .map(|uid| TTLV::text_string(Tag::UniqueIdentifier, uid)),
                );
                response_payload(items)
            }
            Self::Encrypt(r) => {
                let mut items = vec![TTLV::text_string(
                    Tag::UniqueIdentifier,
                    &r.unique_identifier,
                )];
                push_opt_bytes(&mut items, Tag::Data, r.data.as_deref());
                push_opt_bytes(&mut items, Tag::IVCounterNonce, r.iv_counter_nonce.as_deref());
                push_opt_bytes(
                    &mut items,
                    Tag::CorrelationValue,
                    r.correlation_value.as_deref(),
                );
                push_opt_bytes(
                    &mut items,
                    Tag::AuthenticatedEncryptionTag,
                    r.authenticated_encryption_tag.as_deref(),
                );
                response_payload(items)
            }
            Self::Decrypt(r) => {
                let mut items = vec![TTLV::text_string(
                    Tag::UniqueIdentifier,
                    &r.unique_identifier,
                )];
                push_opt_bytes(&mut items, Tag::Data, r.data.as_ref().map(|d| d.as_slice()));
                push_opt_bytes(
                    &mut items,
                    Tag::CorrelationValue,
                    r.correlation_value.as_deref(),
                );
                response_payload(items)
            }
        })
    }

    /// Decode the payload of a response to `operation`
    pub fn from_ttlv_with(
        operation: OperationEnumeration,
        ttlv: &TTLV,
        policy: AttributePolicy,
    ) -> KmipResult<Self> {
        let fields = TtlvFields::of(ttlv, Tag::ResponsePayload)?;
        let uid_response = || -> KmipResult<UniqueIdentifierResponse> {
            Ok(UniqueIdentifierResponse {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
            })
        };
        Ok(match operation {
            OperationEnumeration::Create => Self::Create(CreateResponse {
                object_type: fields.enumeration(Tag::ObjectType)?,
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                template_attribute: fields
                    .find(Tag::TemplateAttribute)
                    .map(|t| Attributes::from_template_attribute(t, policy))
                    .transpose()?,
            }),
            OperationEnumeration::Activate => Self::Activate(uid_response()?),
            OperationEnumeration::Revoke => Self::Revoke(uid_response()?),
            OperationEnumeration::Destroy => Self::Destroy(uid_response()?),
            OperationEnumeration::Get => {
                let object_type = fields.enumeration(Tag::ObjectType)?;
                let unique_identifier = fields.text(Tag::UniqueIdentifier)?;
                // the object structure follows the identifier, its tag depends on the object type
                let object = fields.items().get(2).ok_or_else(|| {
                    KmipError::MalformedMessage("Get response without an object".to_owned())
                })?;
                Self::Get(GetResponse {
                    object_type,
                    unique_identifier,
                    object: ManagedObject::from_ttlv(object)?,
                })
            }
            OperationEnumeration::GetAttributes => Self::GetAttributes(GetAttributesResponse {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                attributes: Attributes::from_ttlv_items(fields.items(), policy)?,
            }),
            OperationEnumeration::Locate => Self::Locate(LocateResponse {
                located_items: fields.opt_integer(Tag::LocatedItems)?,
                unique_identifiers: fields
                    .find_all(Tag::UniqueIdentifier)
                    .map(as_text)
                    .collect::<Result<_, _>>()?,
            }),
            OperationEnumeration::Encrypt => Self::Encrypt(EncryptResponse {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                data: fields.opt_bytes(Tag::Data)?,
                iv_counter_nonce: fields.opt_bytes(Tag::IVCounterNonce)?,
                correlation_value: fields.opt_bytes(Tag::CorrelationValue)?,
                authenticated_encryption_tag: fields.opt_bytes(Tag::AuthenticatedEncryptionTag)?,
            }),
            OperationEnumeration::Decrypt => Self::Decrypt(DecryptResponse {
                unique_identifier: fields.text(Tag::UniqueIdentifier)?,
                data: fields.opt_bytes(Tag::Data)?.map(Zeroizing::new),
                correlation_value: fields.opt_bytes(Tag::CorrelationValue)?,
            }),
            other => {
                return Err(KmipError::Kmip(
                    ResultReason::Operation_Not_Supported,
                    format!("unsupported operation {other}"),
                ))
            }
        })
    }
}

impl ToTtlv for ResponsePayload {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        self.to_ttlv_with(AttributePolicy::Strict)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::{
        CreateRequest, CryptoRequest, EncryptResponse, GetAttributesRequest, LocateResponse,
        RequestPayload, ResponsePayload,
    };
    use crate::{
        KmipError,
        kmip_attributes::{AttributePolicy, AttributeValue, Attributes, CRYPTOGRAPHIC_ALGORITHM},
        kmip_data_structures::CryptographicParameters,
        kmip_types::{
            BlockCipherMode, CryptographicAlgorithm, ObjectType, OperationEnumeration,
            PaddingMethod,
        },
        ttlv::{TTLV, ToTtlv},
    };

    fn round_trip_request(payload: &RequestPayload) -> RequestPayload {
        let bytes = payload.to_ttlv().unwrap().to_bytes().unwrap();
        let (ttlv, _) = TTLV::from_bytes(&bytes).unwrap();
        RequestPayload::from_ttlv_with(payload.operation(), &ttlv, AttributePolicy::Strict)
            .unwrap()
    }

    #[test]
    fn test_request_payloads() {
        let mut template_attribute = Attributes::new();
        template_attribute.set(
            CRYPTOGRAPHIC_ALGORITHM,
            AttributeValue::enumeration(CryptographicAlgorithm::AES),
        );
        let payloads = [
            RequestPayload::Create(CreateRequest {
                object_type: ObjectType::SymmetricKey,
                template_attribute,
            }),
            RequestPayload::GetAttributes(GetAttributesRequest {
                unique_identifier: "1".to_owned(),
                attribute_names: vec!["State".to_owned(), "Cryptographic Usage Mask".to_owned()],
            }),
            RequestPayload::Decrypt(CryptoRequest {
                unique_identifier: Some("1".to_owned()),
                cryptographic_parameters: Some(CryptographicParameters {
                    block_cipher_mode: Some(BlockCipherMode::GCM),
                    padding_method: Some(PaddingMethod::None),
                    ..Default::default()
                }),
                data: Zeroizing::new(b"ciphertext".to_vec()),
                iv_counter_nonce: Some(vec![0; 12]),
                authenticated_encryption_tag: Some(vec![1; 16]),
                ..Default::default()
            }),
        ];
        for payload in &payloads {
            assert_eq!(&round_trip_request(payload), payload);
        }
    }

    #[test]
    fn test_response_payloads() {
        let payloads = [
            ResponsePayload::Encrypt(EncryptResponse {
                unique_identifier: "1".to_owned(),
                data: Some(vec![1, 2, 3]),
                iv_counter_nonce: Some(vec![9; 16]),
                correlation_value: None,
                authenticated_encryption_tag: None,
            }),
            ResponsePayload::Locate(LocateResponse {
                located_items: Some(2),
                unique_identifiers: vec!["a".to_owned(), "b".to_owned()],
            }),
        ];
        for payload in &payloads {
            let ttlv = payload.to_ttlv().unwrap();
            let decoded = ResponsePayload::from_ttlv_with(
                payload.operation(),
                &ttlv,
                AttributePolicy::Strict,
            )
            .unwrap();
            assert_eq!(&decoded, payload);
        }
    }

    #[test]
    fn test_unsupported_operation() {
        let ttlv = TTLV::structure(crate::kmip_types::Tag::RequestPayload, vec![]);
        assert!(matches!(
            RequestPayload::from_ttlv_with(
                OperationEnumeration::Query,
                &ttlv,
                AttributePolicy::Strict
            ),
            Err(KmipError::Kmip(..))
        ));
    }
}
