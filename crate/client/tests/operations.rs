#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::client;
use kmip_client::{
    ClientError,
    kmip_proto::{
        kmip_attributes::{AttributeValue, Attributes, NAME, STATE},
        kmip_data_structures::{CryptographicParameters, Name, RevocationReason},
        kmip_messages::BatchItemOutcome,
        kmip_operations::{
            CryptoRequest, GetAttributesRequest, RequestPayload, RevokeRequest,
            UniqueIdentifierRequest,
        },
        kmip_types::{
            BlockCipherMode, CryptographicAlgorithm, CryptographicUsageMask, PaddingMethod,
            ResultReason, RevocationReasonCode, State,
        },
    },
};

fn encrypt_decrypt() -> CryptographicUsageMask {
    CryptographicUsageMask::Encrypt | CryptographicUsageMask::Decrypt
}

fn cbc_x923() -> CryptographicParameters {
    CryptographicParameters {
        block_cipher_mode: Some(BlockCipherMode::CBC),
        padding_method: Some(PaddingMethod::ANSI_X923),
        cryptographic_algorithm: Some(CryptographicAlgorithm::AES),
        ..CryptographicParameters::default()
    }
}

const MESSAGE: &[u8] = b"The quick brown fox jumps over the lazy dog";

#[test]
fn test_encrypt_with_caller_iv() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    assert_eq!(client.objects().get(&uid).unwrap().state, State::PreActive);
    client.activate(&uid).unwrap();
    assert_eq!(client.objects().get(&uid).unwrap().state, State::Active);

    let iv = [0x0f_u8; 16];
    let result = client.encrypt(&uid, MESSAGE, &cbc_x923(), Some(&iv)).unwrap();
    assert_eq!(result.ciphertext.len() % 16, 0);
    assert!(result.ciphertext.len() > MESSAGE.len());
    assert_eq!(result.generated_iv, None);

    let plaintext = client
        .decrypt(&uid, &result.ciphertext, &cbc_x923(), Some(&iv))
        .unwrap();
    assert_eq!(plaintext.as_slice(), MESSAGE);
}

#[test]
fn test_encrypt_with_server_generated_iv() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    client.activate(&uid).unwrap();

    let result = client.encrypt(&uid, MESSAGE, &cbc_x923(), None).unwrap();
    let iv = result.generated_iv.unwrap();
    assert_eq!(iv.len(), 16);
    assert_eq!(result.ciphertext.len() % 16, 0);

    // two encryptions never share an IV
    let again = client.encrypt(&uid, MESSAGE, &cbc_x923(), None).unwrap();
    assert_ne!(again.generated_iv.unwrap(), iv);

    let plaintext = client
        .decrypt(&uid, &result.ciphertext, &cbc_x923(), Some(&iv))
        .unwrap();
    assert_eq!(plaintext.as_slice(), MESSAGE);
}

#[test]
fn test_gcm_round_trip() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 256, encrypt_decrypt())
        .unwrap();
    client.activate(&uid).unwrap();
    let parameters = CryptographicParameters {
        block_cipher_mode: Some(BlockCipherMode::GCM),
        ..CryptographicParameters::default()
    };
    let result = client.encrypt(&uid, MESSAGE, &parameters, None).unwrap();
    assert_eq!(result.ciphertext.len(), MESSAGE.len());
    assert_eq!(result.generated_iv.as_ref().unwrap().len(), 12);
    assert_eq!(result.authenticated_encryption_tag.as_ref().unwrap().len(), 16);
}

#[test]
fn test_encrypt_pre_active_key_is_denied_locally() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    let contacts = client.transport().contacts;

    let err = client
        .encrypt(&uid, MESSAGE, &cbc_x923(), Some(&[0_u8; 16]))
        .unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)), "{err}");
    assert_eq!(client.transport().contacts, contacts);
}

#[test]
fn test_usage_mask_is_enforced_locally() {
    let mut client = client();
    let uid = client
        .create(
            CryptographicAlgorithm::AES,
            128,
            CryptographicUsageMask::Encrypt,
        )
        .unwrap();
    client.activate(&uid).unwrap();
    let result = client.encrypt(&uid, MESSAGE, &cbc_x923(), None).unwrap();

    let contacts = client.transport().contacts;
    let err = client
        .decrypt(
            &uid,
            &result.ciphertext,
            &cbc_x923(),
            result.generated_iv.as_deref(),
        )
        .unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)), "{err}");
    assert_eq!(client.transport().contacts, contacts);
}

#[test]
fn test_invalid_parameters_never_reach_the_server() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    client.activate(&uid).unwrap();
    let contacts = client.transport().contacts;

    // ECB takes no IV
    let ecb = CryptographicParameters {
        block_cipher_mode: Some(BlockCipherMode::ECB),
        ..CryptographicParameters::default()
    };
    let err = client
        .encrypt(&uid, MESSAGE, &ecb, Some(&[0_u8; 16]))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCryptographicParameters(_)), "{err}");

    // a short IV
    let err = client
        .encrypt(&uid, MESSAGE, &cbc_x923(), Some(&[0_u8; 8]))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCryptographicParameters(_)), "{err}");

    // decryption cannot ask for a random IV
    let err = client
        .decrypt(&uid, &[0_u8; 32], &cbc_x923(), None)
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCryptographicParameters(_)), "{err}");

    // not an AES key length
    let err = client
        .create(CryptographicAlgorithm::AES, 100, encrypt_decrypt())
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidCryptographicParameters(_)), "{err}");

    assert_eq!(client.transport().contacts, contacts);
}

#[test]
fn test_revoke_and_destroy() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    client.activate(&uid).unwrap();

    let contacts = client.transport().contacts;
    let err = client.destroy(&uid).unwrap_err();
    assert_eq!(
        err,
        ClientError::InvalidStateTransition {
            unique_identifier: uid.clone(),
            state: State::Active,
            event: "Destroy".to_owned(),
        }
    );
    let err = client.activate(&uid).unwrap_err();
    assert!(matches!(err, ClientError::InvalidStateTransition { .. }), "{err}");
    assert_eq!(client.transport().contacts, contacts);

    client
        .revoke(&uid, RevocationReasonCode::CessationOfOperation, Some("rotated"))
        .unwrap();
    assert_eq!(client.objects().get(&uid).unwrap().state, State::Deactivated);
    assert_eq!(
        client.transport().server.object_state(&uid),
        Some(State::Deactivated)
    );

    client.destroy(&uid).unwrap();
    assert_eq!(client.objects().get(&uid).unwrap().state, State::Destroyed);
    assert_eq!(
        client.transport().server.object_state(&uid),
        Some(State::Destroyed)
    );

    let err = client.get(&uid).unwrap_err();
    assert!(
        matches!(
            err,
            ClientError::OperationFailed {
                reason: ResultReason::Object_Destroyed,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn test_compromise_from_pre_active() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 192, encrypt_decrypt())
        .unwrap();
    client
        .revoke(&uid, RevocationReasonCode::KeyCompromise, None)
        .unwrap();
    assert_eq!(client.objects().get(&uid).unwrap().state, State::Compromised);
    client.destroy(&uid).unwrap();
    assert_eq!(
        client.transport().server.object_state(&uid),
        Some(State::Destroyed_Compromised)
    );
}

#[test]
fn test_get_key_material() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 256, encrypt_decrypt())
        .unwrap();
    let key_block = client.get(&uid).unwrap();
    assert_eq!(key_block.key_material.len(), 32);
    assert_eq!(key_block.cryptographic_algorithm, Some(CryptographicAlgorithm::AES));
    assert_eq!(key_block.cryptographic_length, Some(256));
    // key bytes never show in debug output
    assert!(format!("{key_block:?}").contains("<32 bytes>"));
}

#[test]
fn test_get_attributes_and_locate_by_name() {
    let mut client = client();
    let mut attributes = Attributes::new();
    attributes.set(
        NAME,
        AttributeValue::structure(&Name::text("payroll-key")).unwrap(),
    );
    let uid = client
        .create_with_attributes(
            CryptographicAlgorithm::AES,
            128,
            encrypt_decrypt(),
            &attributes,
        )
        .unwrap();
    client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();

    let fetched = client.get_attributes(&uid, &[]).unwrap();
    assert_eq!(fetched.state(), Some(State::PreActive));
    assert_eq!(fetched.name().unwrap().name_value, "payroll-key");
    assert_eq!(fetched.cryptographic_usage_mask(), Some(encrypt_decrypt()));
    assert_eq!(fetched.unique_identifier(), Some(uid.as_str()));

    let fetched = client.get_attributes(&uid, &[STATE]).unwrap();
    assert_eq!(fetched.len(), 1);

    let located = client.locate(&attributes).unwrap();
    assert_eq!(located, vec![uid]);
}

#[test]
fn test_batch_invalidates_the_cache() {
    let mut client = client();
    let first = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    let second = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();

    let outcomes = client
        .batch(vec![
            RequestPayload::Activate(UniqueIdentifierRequest {
                unique_identifier: first.clone(),
            }),
            RequestPayload::Activate(UniqueIdentifierRequest {
                unique_identifier: "missing".to_owned(),
            }),
            RequestPayload::GetAttributes(GetAttributesRequest {
                unique_identifier: second.clone(),
                attribute_names: vec![STATE.to_owned()],
            }),
        ])
        .unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], BatchItemOutcome::Success(_)));
    assert!(matches!(
        outcomes[1],
        BatchItemOutcome::Failed {
            reason: ResultReason::Item_Not_Found,
            ..
        }
    ));
    assert!(matches!(outcomes[2], BatchItemOutcome::Success(_)));

    // the activated key is read through on next use
    assert!(client.objects().get(&first).is_none());
    let contacts = client.transport().contacts;
    client.encrypt(&first, MESSAGE, &cbc_x923(), None).unwrap();
    assert_eq!(client.transport().contacts, contacts + 2);
    assert_eq!(client.objects().get(&first).unwrap().state, State::Active);
}

#[test]
fn test_batch_is_checked_locally() {
    let mut client = client();
    let uid = client
        .create(CryptographicAlgorithm::AES, 128, encrypt_decrypt())
        .unwrap();
    let encrypt = RequestPayload::Encrypt(CryptoRequest {
        unique_identifier: Some(uid.clone()),
        cryptographic_parameters: Some(cbc_x923()),
        data: MESSAGE.to_vec().into(),
        iv_counter_nonce: Some(vec![0x0f; 16]),
        ..CryptoRequest::default()
    });

    let contacts = client.transport().contacts;
    let err = client.batch(vec![encrypt.clone()]).unwrap_err();
    assert!(matches!(err, ClientError::PermissionDenied(_)));
    assert_eq!(client.transport().contacts, contacts);

    // activating first makes the encryption valid within the same batch
    let outcomes = client
        .batch(vec![
            RequestPayload::Activate(UniqueIdentifierRequest {
                unique_identifier: uid.clone(),
            }),
            encrypt,
        ])
        .unwrap();
    assert!(
        outcomes
            .iter()
            .all(|outcome| matches!(outcome, BatchItemOutcome::Success(_)))
    );

    // the batch invalidated the key: one read-through, then a local refusal
    let contacts = client.transport().contacts;
    let err = client
        .batch(vec![RequestPayload::Destroy(UniqueIdentifierRequest {
            unique_identifier: uid.clone(),
        })])
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::InvalidStateTransition {
            state: State::Active,
            ..
        }
    ));
    assert_eq!(client.transport().contacts, contacts + 1);

    let outcomes = client
        .batch(vec![
            RequestPayload::Revoke(RevokeRequest {
                unique_identifier: uid.clone(),
                revocation_reason: RevocationReason {
                    revocation_reason_code: RevocationReasonCode::CessationOfOperation,
                    revocation_message: None,
                },
                compromise_occurrence_date: None,
            }),
            RequestPayload::Destroy(UniqueIdentifierRequest {
                unique_identifier: uid.clone(),
            }),
        ])
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[1], BatchItemOutcome::Success(_)));
}

#[test]
fn test_drop_closes_the_transport() {
    let client = client();
    let closed = client.transport().closed_flag();
    assert!(!closed.get());
    drop(client);
    assert!(closed.get());
}
