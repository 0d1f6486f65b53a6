use kmip_proto::{
    kmip_attributes::{AttributeValue, Attributes, CRYPTOGRAPHIC_USAGE_MASK, NAME},
    kmip_data_structures::{CryptographicParameters, Credential, Name},
    kmip_messages::{
        BatchItemOutcome, RequestMessage, ResponseMessage, build_request, parse_response,
    },
    kmip_operations::{
        CreateRequest, CryptoRequest, GetAttributesRequest, LocateRequest, RequestPayload,
        ResponsePayload, UniqueIdentifierRequest,
    },
    kmip_types::{
        BlockCipherMode, CryptographicAlgorithm, CryptographicUsageMask, ObjectType,
        PaddingMethod, ProtocolVersion, ResultReason, State,
    },
    ttlv::{TTLV, from_ttlv},
};
use zeroize::Zeroizing;

use crate::{KmipTestServer, ServerFault};

fn send(server: &mut KmipTestServer, request: &RequestMessage) -> Vec<BatchItemOutcome> {
    let bytes = request
        .to_bytes(kmip_proto::kmip_attributes::AttributePolicy::Strict)
        .unwrap();
    let response = server.handle(&bytes).unwrap();
    parse_response(&response, request).unwrap()
}

fn single(server: &mut KmipTestServer, payload: RequestPayload) -> BatchItemOutcome {
    let request = build_request(ProtocolVersion::KMIP_1_4, vec![payload]).unwrap();
    send(server, &request).remove(0)
}

fn create_request(name: Option<&str>) -> RequestPayload {
    let mut attributes = Attributes::new();
    attributes
        .set(
            "Cryptographic Algorithm",
            AttributeValue::enumeration(CryptographicAlgorithm::AES),
        )
        .set("Cryptographic Length", 128)
        .set(
            CRYPTOGRAPHIC_USAGE_MASK,
            CryptographicUsageMask::Encrypt | CryptographicUsageMask::Decrypt,
        );
    if let Some(name) = name {
        attributes.set(NAME, AttributeValue::structure(&Name::text(name)).unwrap());
    }
    RequestPayload::Create(CreateRequest {
        object_type: ObjectType::SymmetricKey,
        template_attribute: attributes,
    })
}

fn create_key(server: &mut KmipTestServer, name: Option<&str>) -> String {
    match single(server, create_request(name)) {
        BatchItemOutcome::Success(Some(ResponsePayload::Create(response))) => {
            response.unique_identifier
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

fn uid_request(unique_identifier: &str) -> UniqueIdentifierRequest {
    UniqueIdentifierRequest {
        unique_identifier: unique_identifier.to_owned(),
    }
}

fn failure_reason(outcome: BatchItemOutcome) -> ResultReason {
    match outcome {
        BatchItemOutcome::Failed { reason, .. } => reason,
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[test]
fn test_lifecycle_is_enforced() {
    kmip_logger::log_init(option_env!("RUST_LOG"));
    let mut server = KmipTestServer::new();
    let uid = create_key(&mut server, None);
    assert_eq!(server.object_state(&uid), Some(State::PreActive));

    let encrypt = RequestPayload::Encrypt(CryptoRequest {
        unique_identifier: Some(uid.clone()),
        cryptographic_parameters: Some(CryptographicParameters {
            block_cipher_mode: Some(BlockCipherMode::CBC),
            random_iv: Some(true),
            ..CryptographicParameters::default()
        }),
        data: Zeroizing::new(b"secret".to_vec()),
        ..CryptoRequest::default()
    });
    assert_eq!(
        failure_reason(single(&mut server, encrypt.clone())),
        ResultReason::Wrong_Key_Lifecycle_State
    );

    assert!(matches!(
        single(&mut server, RequestPayload::Activate(uid_request(&uid))),
        BatchItemOutcome::Success(Some(ResponsePayload::Activate(_)))
    ));
    assert_eq!(
        failure_reason(single(&mut server, RequestPayload::Activate(uid_request(&uid)))),
        ResultReason::Wrong_Key_Lifecycle_State
    );
    assert_eq!(
        failure_reason(single(&mut server, RequestPayload::Destroy(uid_request(&uid)))),
        ResultReason::Wrong_Key_Lifecycle_State
    );

    match single(&mut server, encrypt) {
        BatchItemOutcome::Success(Some(ResponsePayload::Encrypt(response))) => {
            assert_eq!(response.data.unwrap().len(), 16);
            assert_eq!(response.iv_counter_nonce.unwrap().len(), 16);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    server.force_state(&uid, State::Deactivated).unwrap();
    assert!(matches!(
        single(&mut server, RequestPayload::Destroy(uid_request(&uid))),
        BatchItemOutcome::Success(_)
    ));
    assert_eq!(server.object_state(&uid), Some(State::Destroyed));
    assert_eq!(server.request_count(), 7);
}

#[test]
fn test_batch_and_faults() {
    let mut server = KmipTestServer::new();
    let uid = create_key(&mut server, Some("batch-key"));

    // a two item batch is answered by id
    let request = build_request(
        ProtocolVersion::KMIP_1_4,
        vec![
            RequestPayload::Activate(uid_request(&uid)),
            RequestPayload::GetAttributes(GetAttributesRequest {
                unique_identifier: uid.clone(),
                attribute_names: vec!["State".to_owned()],
            }),
        ],
    )
    .unwrap();
    let outcomes = send(&mut server, &request);
    match &outcomes[1] {
        BatchItemOutcome::Success(Some(ResponsePayload::GetAttributes(response))) => {
            assert_eq!(response.attributes.state(), Some(State::Active));
            assert_eq!(response.attributes.len(), 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    server.inject(ServerFault::Fail(ResultReason::Permission_Denied));
    assert_eq!(
        failure_reason(single(
            &mut server,
            RequestPayload::GetAttributes(GetAttributesRequest {
                unique_identifier: uid.clone(),
                attribute_names: vec![],
            })
        )),
        ResultReason::Permission_Denied
    );

    server.inject(ServerFault::Pending(vec![1, 2, 3]));
    assert_eq!(
        single(&mut server, create_request(None)),
        BatchItemOutcome::Pending {
            correlation: vec![1, 2, 3]
        }
    );

    // the dropped item was still executed
    server.inject(ServerFault::DropLastBatchItem);
    let request = build_request(ProtocolVersion::KMIP_1_4, vec![create_request(None)]).unwrap();
    let bytes = request
        .to_bytes(kmip_proto::kmip_attributes::AttributePolicy::Strict)
        .unwrap();
    let response = server.handle(&bytes).unwrap();
    parse_response(&response, &request).unwrap_err();
    assert_eq!(server.object_count(), 2);

    let located = single(
        &mut server,
        RequestPayload::Locate(LocateRequest {
            maximum_items: None,
            attributes: [kmip_proto::kmip_attributes::Attribute::new(
                NAME,
                AttributeValue::structure(&Name::text("batch-key")).unwrap(),
            )]
            .into_iter()
            .collect(),
        }),
    );
    match located {
        BatchItemOutcome::Success(Some(ResponsePayload::Locate(response))) => {
            assert_eq!(response.unique_identifiers, vec![uid]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_authentication() {
    let credential = Credential {
        username: "alice".to_owned(),
        password: Some("wonderland".to_owned()),
    };
    let mut server = KmipTestServer::with_credential(credential.clone());
    assert_eq!(
        failure_reason(single(&mut server, create_request(None))),
        ResultReason::Authentication_Not_Successful
    );

    let mut request = build_request(ProtocolVersion::KMIP_1_4, vec![create_request(None)]).unwrap();
    request.request_header.authentication = Some(credential);
    assert!(matches!(
        send(&mut server, &request).remove(0),
        BatchItemOutcome::Success(_)
    ));
}

#[test]
fn test_padding_method_is_honored() {
    let mut server = KmipTestServer::new();
    let uid = create_key(&mut server, None);
    single(&mut server, RequestPayload::Activate(uid_request(&uid)));
    let parameters = CryptographicParameters {
        block_cipher_mode: Some(BlockCipherMode::CBC),
        padding_method: Some(PaddingMethod::ANSI_X923),
        ..CryptographicParameters::default()
    };
    let iv = vec![0x42_u8; 16];
    let ciphertext = match single(
        &mut server,
        RequestPayload::Encrypt(CryptoRequest {
            unique_identifier: Some(uid.clone()),
            cryptographic_parameters: Some(parameters.clone()),
            data: Zeroizing::new(b"exactly sixteen!".to_vec()),
            iv_counter_nonce: Some(iv.clone()),
            ..CryptoRequest::default()
        }),
    ) {
        BatchItemOutcome::Success(Some(ResponsePayload::Encrypt(response))) => {
            // a caller supplied IV is not echoed
            assert!(response.iv_counter_nonce.is_none());
            response.data.unwrap()
        }
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(ciphertext.len(), 32);

    match single(
        &mut server,
        RequestPayload::Decrypt(CryptoRequest {
            unique_identifier: Some(uid),
            cryptographic_parameters: Some(parameters),
            data: Zeroizing::new(ciphertext),
            iv_counter_nonce: Some(iv),
            ..CryptoRequest::default()
        }),
    ) {
        BatchItemOutcome::Success(Some(ResponsePayload::Decrypt(response))) => {
            assert_eq!(response.data.unwrap().as_slice(), b"exactly sixteen!");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_garbage_is_rejected() {
    let mut server = KmipTestServer::new();
    let response = server.handle(&[0x42, 0x00, 0x78, 0x01, 0, 0, 0, 8, 1, 2]).unwrap();
    assert_eq!(server.request_count(), 1);

    let (ttlv, _) = TTLV::from_bytes(&response).unwrap();
    let response: ResponseMessage = from_ttlv(&ttlv).unwrap();
    assert_eq!(response.batch_item.len(), 1);
    assert_eq!(
        response.batch_item[0].result_reason,
        Some(ResultReason::Invalid_Message)
    );
}
