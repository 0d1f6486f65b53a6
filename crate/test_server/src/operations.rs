//! Server side of each supported operation.
use kmip_proto::{
    KmipError, KmipResult,
    kmip_attributes::{
        AttributeValue, Attributes, COMPROMISE_OCCURRENCE_DATE, INITIAL_DATE, LAST_CHANGE_DATE,
        OBJECT_TYPE, REVOCATION_REASON, UNIQUE_IDENTIFIER,
    },
    kmip_data_structures::{KeyBlock, ManagedObject},
    kmip_operations::{
        CreateRequest, CreateResponse, CryptoRequest, DecryptResponse, EncryptResponse,
        GetAttributesRequest, GetAttributesResponse, GetRequest, GetResponse, LocateRequest,
        LocateResponse, RequestPayload, ResponsePayload, RevokeRequest, UniqueIdentifierRequest,
        UniqueIdentifierResponse,
    },
    kmip_types::{
        BlockCipherMode, CryptographicAlgorithm, CryptographicUsageMask, KeyFormatType,
        ObjectType, PaddingMethod, ResultReason, State,
    },
};
use tracing::{debug, trace};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{
    store::{ObjectStore, StoredObject, now},
    symmetric,
};

pub(crate) fn dispatch(
    store: &mut ObjectStore,
    payload: RequestPayload,
) -> KmipResult<ResponsePayload> {
    trace!("dispatching {}", payload.operation());
    Ok(match payload {
        RequestPayload::Create(request) => ResponsePayload::Create(create(store, request)?),
        RequestPayload::Activate(request) => ResponsePayload::Activate(activate(store, &request)?),
        RequestPayload::Revoke(request) => ResponsePayload::Revoke(revoke(store, &request)?),
        RequestPayload::Destroy(request) => ResponsePayload::Destroy(destroy(store, &request)?),
        RequestPayload::Get(request) => ResponsePayload::Get(get(store, &request)?),
        RequestPayload::GetAttributes(request) => {
            ResponsePayload::GetAttributes(get_attributes(store, &request)?)
        }
        RequestPayload::Locate(request) => ResponsePayload::Locate(locate(store, &request)),
        RequestPayload::Encrypt(request) => ResponsePayload::Encrypt(encrypt(store, request)?),
        RequestPayload::Decrypt(request) => ResponsePayload::Decrypt(decrypt(store, request)?),
    })
}

fn create(store: &mut ObjectStore, request: CreateRequest) -> KmipResult<CreateResponse> {
    if request.object_type != ObjectType::SymmetricKey {
        return Err(KmipError::Kmip(
            ResultReason::Operation_Not_Supported,
            format!("Create of a {} is not supported", request.object_type),
        ))
    }
    let mut attributes = request.template_attribute;
    let algorithm = attributes.cryptographic_algorithm().ok_or_else(|| {
        KmipError::Kmip(
            ResultReason::Missing_Data,
            "Create: the Cryptographic Algorithm is required".to_owned(),
        )
    })?;
    if algorithm != CryptographicAlgorithm::AES {
        return Err(KmipError::Kmip(
            ResultReason::Feature_Not_Supported,
            format!("Create: {algorithm} keys are not supported"),
        ))
    }
    let length = attributes.cryptographic_length().ok_or_else(|| {
        KmipError::Kmip(
            ResultReason::Missing_Data,
            "Create: the Cryptographic Length is required".to_owned(),
        )
    })?;
    if !algorithm
        .valid_key_lengths()
        .is_some_and(|lengths| lengths.contains(&length))
    {
        return Err(KmipError::Kmip(
            ResultReason::Invalid_Attribute_Value,
            format!("Create: invalid {algorithm} key length {length}"),
        ))
    }

    let key_material = Zeroizing::new(symmetric::random_bytes(usize::try_from(length / 8)?)?);
    let unique_identifier = Uuid::new_v4().to_string();
    let now = now();
    attributes
        .set(UNIQUE_IDENTIFIER, unique_identifier.as_str())
        .set(OBJECT_TYPE, AttributeValue::enumeration(ObjectType::SymmetricKey))
        .set(INITIAL_DATE, now)
        .set(LAST_CHANGE_DATE, now);
    store.insert(StoredObject::new(
        unique_identifier.clone(),
        ObjectType::SymmetricKey,
        attributes,
        key_material,
    ));
    debug!("created {algorithm} {length} key {unique_identifier}");
    Ok(CreateResponse {
        object_type: ObjectType::SymmetricKey,
        unique_identifier,
        template_attribute: None,
    })
}

fn wrong_state(operation: &str, object: &StoredObject) -> KmipError {
    KmipError::Kmip(
        ResultReason::Wrong_Key_Lifecycle_State,
        format!(
            "{operation}: object {} is {}",
            object.unique_identifier,
            object.state()
        ),
    )
}

fn activate(
    store: &mut ObjectStore,
    request: &UniqueIdentifierRequest,
) -> KmipResult<UniqueIdentifierResponse> {
    let object = store.get_mut(&request.unique_identifier)?;
    if object.state() != State::PreActive {
        return Err(wrong_state("Activate", object))
    }
    object.set_state(State::Active);
    Ok(UniqueIdentifierResponse {
        unique_identifier: request.unique_identifier.clone(),
    })
}

fn revoke(store: &mut ObjectStore, request: &RevokeRequest) -> KmipResult<UniqueIdentifierResponse> {
    let object = store.get_mut(&request.unique_identifier)?;
    let compromise = request.revocation_reason.revocation_reason_code.is_compromise();
    let state = match (compromise, object.state()) {
        (true, State::PreActive | State::Active | State::Deactivated) => State::Compromised,
        (false, State::Active) => State::Deactivated,
        _ => return Err(wrong_state("Revoke", object)),
    };
    object.attributes.set(
        REVOCATION_REASON,
        AttributeValue::structure(&request.revocation_reason)?,
    );
    if let Some(date) = request.compromise_occurrence_date {
        object.attributes.set(COMPROMISE_OCCURRENCE_DATE, date);
    }
    object.set_state(state);
    Ok(UniqueIdentifierResponse {
        unique_identifier: request.unique_identifier.clone(),
    })
}

fn destroy(
    store: &mut ObjectStore,
    request: &UniqueIdentifierRequest,
) -> KmipResult<UniqueIdentifierResponse> {
    let object = store.get_mut(&request.unique_identifier)?;
    let state = match object.state() {
        State::PreActive | State::Deactivated => State::Destroyed,
        State::Compromised => State::Destroyed_Compromised,
        State::Active | State::Destroyed | State::Destroyed_Compromised => {
            return Err(wrong_state("Destroy", object))
        }
    };
    object.key_material = None;
    object.set_state(state);
    Ok(UniqueIdentifierResponse {
        unique_identifier: request.unique_identifier.clone(),
    })
}

fn get(store: &ObjectStore, request: &GetRequest) -> KmipResult<GetResponse> {
    let object = store.get(&request.unique_identifier)?;
    if let Some(format) = request.key_format_type {
        if format != KeyFormatType::Raw {
            return Err(KmipError::Kmip(
                ResultReason::Key_Format_Type_Not_Supported,
                format!("Get: key format {format} is not supported"),
            ))
        }
    }
    let key_material = object.key_material.clone().ok_or_else(|| {
        KmipError::Kmip(
            ResultReason::Object_Destroyed,
            format!("Get: object {} was destroyed", object.unique_identifier),
        )
    })?;
    Ok(GetResponse {
        object_type: object.object_type,
        unique_identifier: object.unique_identifier.clone(),
        object: ManagedObject::symmetric_key(KeyBlock {
            key_format_type: KeyFormatType::Raw,
            key_material,
            cryptographic_algorithm: object.attributes.cryptographic_algorithm(),
            cryptographic_length: object.attributes.cryptographic_length(),
        }),
    })
}

fn get_attributes(
    store: &ObjectStore,
    request: &GetAttributesRequest,
) -> KmipResult<GetAttributesResponse> {
    let object = store.get(&request.unique_identifier)?;
    let attributes = if request.attribute_names.is_empty() {
        object.attributes.clone()
    } else {
        object
            .attributes
            .iter()
            .filter(|a| request.attribute_names.contains(&a.name))
            .cloned()
            .collect()
    };
    Ok(GetAttributesResponse {
        unique_identifier: object.unique_identifier.clone(),
        attributes,
    })
}

fn locate(store: &ObjectStore, request: &LocateRequest) -> LocateResponse {
    let matches = |attributes: &Attributes| {
        request.attributes.iter().all(|wanted| {
            attributes
                .get_all(&wanted.name)
                .any(|value| value == &wanted.value)
        })
    };
    let limit = request
        .maximum_items
        .and_then(|m| usize::try_from(m).ok())
        .unwrap_or(usize::MAX);
    let unique_identifiers: Vec<String> = store
        .iter()
        .filter(|o| matches(&o.attributes))
        .map(|o| o.unique_identifier.clone())
        .take(limit)
        .collect();
    debug!("located {} objects", unique_identifiers.len());
    LocateResponse {
        located_items: None,
        unique_identifiers,
    }
}

/// Mode, padding and IV of a crypto request, with the IV generated when
/// the request asks for it.
struct CipherSetup {
    mode: BlockCipherMode,
    padding: PaddingMethod,
    iv: Option<Vec<u8>>,
    generated: bool,
}

fn cipher_setup(
    object: &StoredObject,
    request: &CryptoRequest,
    encrypting: bool,
) -> KmipResult<CipherSetup> {
    let parameters = request.cryptographic_parameters.clone().unwrap_or_default();
    parameters.validate(
        object.attributes.cryptographic_algorithm(),
        request.iv_counter_nonce.as_deref(),
    )?;
    let mode = parameters.block_cipher_mode.unwrap_or(BlockCipherMode::CBC);
    let padding = parameters
        .padding_method
        .unwrap_or_else(|| symmetric::default_padding(mode));
    let (iv, generated) = match &request.iv_counter_nonce {
        Some(iv) => (Some(iv.clone()), false),
        None if mode.requires_iv() => {
            if !encrypting || parameters.random_iv != Some(true) {
                return Err(KmipError::Kmip(
                    ResultReason::Missing_Initialization_Vector,
                    format!("{mode} needs an IV"),
                ))
            }
            (Some(symmetric::random_bytes(symmetric::iv_length(mode))?), true)
        }
        None => (None, false),
    };
    Ok(CipherSetup {
        mode,
        padding,
        iv,
        generated,
    })
}

fn encrypt(store: &ObjectStore, request: CryptoRequest) -> KmipResult<EncryptResponse> {
    let unique_identifier = request.unique_identifier.clone().ok_or_else(|| {
        KmipError::Kmip(
            ResultReason::Missing_Data,
            "Encrypt: the unique identifier is required".to_owned(),
        )
    })?;
    let object = store.get(&unique_identifier)?;
    let key = object.check_use(CryptographicUsageMask::Encrypt)?;
    let setup = cipher_setup(object, &request, true)?;
    let (ciphertext, tag) = symmetric::encrypt(
        key,
        setup.mode,
        setup.padding,
        setup.iv.as_deref(),
        request.authenticated_encryption_additional_data.as_deref(),
        &request.data,
    )?;
    Ok(EncryptResponse {
        unique_identifier,
        data: Some(ciphertext),
        iv_counter_nonce: if setup.generated { setup.iv } else { None },
        correlation_value: None,
        authenticated_encryption_tag: tag,
    })
}

fn decrypt(store: &ObjectStore, request: CryptoRequest) -> KmipResult<DecryptResponse> {
    let unique_identifier = request.unique_identifier.clone().ok_or_else(|| {
        KmipError::Kmip(
            ResultReason::Missing_Data,
            "Decrypt: the unique identifier is required".to_owned(),
        )
    })?;
    let object = store.get(&unique_identifier)?;
    let key = object.check_use(CryptographicUsageMask::Decrypt)?;
    let setup = cipher_setup(object, &request, false)?;
    let plaintext = symmetric::decrypt(
        key,
        setup.mode,
        setup.padding,
        setup.iv.as_deref(),
        request.authenticated_encryption_additional_data.as_deref(),
        request.authenticated_encryption_tag.as_deref(),
        &request.data,
    )?;
    Ok(DecryptResponse {
        unique_identifier,
        data: Some(plaintext),
        correlation_value: None,
    })
}
