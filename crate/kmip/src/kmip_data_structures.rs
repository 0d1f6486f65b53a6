use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    error::{KmipError, result::KmipResult},
    kmip_types::{
        BlockCipherMode, CredentialType, CryptographicAlgorithm, HashingAlgorithm,
        KeyFormatType, KeyRoleType, NameType, PaddingMethod, ResultReason, RevocationReasonCode,
        Tag,
    },
    ttlv::{FromTtlv, TTLV, TTLValue, ToTtlv, TtlvFields},
};

/// The Cryptographic Parameters of an encryption or decryption request.
///
/// Every field is optional: the server falls back on the parameters
/// registered with the key for those that are missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CryptographicParameters {
    pub block_cipher_mode: Option<BlockCipherMode>,
    pub padding_method: Option<PaddingMethod>,
    pub hashing_algorithm: Option<HashingAlgorithm>,
    pub key_role_type: Option<KeyRoleType>,
    pub cryptographic_algorithm: Option<CryptographicAlgorithm>,
    /// Ask the server to generate the IV
    pub random_iv: Option<bool>,
    pub iv_length: Option<i32>,
    pub tag_length: Option<i32>,
    pub fixed_field_length: Option<i32>,
    pub invocation_field_length: Option<i32>,
    pub counter_length: Option<i32>,
    pub initial_counter_value: Option<i32>,
}

impl CryptographicParameters {
    /// Block size in bytes of the algorithm, when it is a block cipher
    #[must_use]
    pub fn block_size(&self) -> Option<usize> {
        self.cryptographic_algorithm
            .and_then(CryptographicAlgorithm::block_size)
    }

    /// Check the parameters are coherent for an encryption or decryption
    /// with the given IV (or none).
    ///
    /// `algorithm` is the algorithm of the key, used when the parameters do not name one.
    pub fn validate(
        &self,
        algorithm: Option<CryptographicAlgorithm>,
        iv: Option<&[u8]>,
    ) -> KmipResult<()> {
        let algorithm = self.cryptographic_algorithm.or(algorithm);
        if let (Some(declared), Some(key)) = (self.cryptographic_algorithm, algorithm) {
            if declared != key {
                return Err(bad_parameters(format!(
                    "algorithm {declared} does not match the key algorithm {key}"
                )))
            }
        }
        let block_size = algorithm.and_then(CryptographicAlgorithm::block_size);

        if let Some(padding) = self.padding_method {
            if !padding.is_block_padding() {
                return Err(bad_parameters(format!(
                    "padding {padding} cannot be used for symmetric encryption"
                )))
            }
            if let Some(mode) = self.block_cipher_mode {
                if !mode.is_block_aligned() && padding != PaddingMethod::None {
                    return Err(bad_parameters(format!(
                        "mode {mode} does not take padding, found {padding}"
                    )))
                }
            }
            if block_size.is_none() && padding != PaddingMethod::None {
                return Err(bad_parameters(format!(
                    "padding {padding} requires a block cipher"
                )))
            }
        }

        let Some(mode) = self.block_cipher_mode else {
            return Ok(())
        };
        if mode.requires_iv() {
            match iv {
                Some(iv) => {
                    if iv.is_empty() {
                        return Err(bad_parameters("the IV must not be empty".to_owned()))
                    }
                    let needs_block = matches!(
                        mode,
                        BlockCipherMode::CBC
                            | BlockCipherMode::PCBC
                            | BlockCipherMode::CFB
                            | BlockCipherMode::OFB
                            | BlockCipherMode::CTR
                    );
                    if let (true, Some(block_size)) = (needs_block, block_size) {
                        if iv.len() != block_size {
                            return Err(bad_parameters(format!(
                                "{mode} requires an IV of {block_size} bytes, found {}",
                                iv.len()
                            )))
                        }
                    }
                }
                None => {
                    if self.random_iv != Some(true) {
                        return Err(KmipError::InvalidKmipValue(
                            ResultReason::Missing_Initialization_Vector,
                            format!("{mode} requires an IV or a server generated one"),
                        ))
                    }
                }
            }
        } else if iv.is_some() {
            return Err(bad_parameters(format!("{mode} does not take an IV")))
        }
        Ok(())
    }
}

fn bad_parameters(message: String) -> KmipError {
    KmipError::InvalidKmipValue(ResultReason::Bad_Cryptographic_Parameters, message)
}

impl ToTtlv for CryptographicParameters {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut items = Vec::new();
        if let Some(v) = self.block_cipher_mode {
            items.push(TTLV::enumeration(Tag::BlockCipherMode, v));
        }
        if let Some(v) = self.padding_method {
            items.push(TTLV::enumeration(Tag::PaddingMethod, v));
        }
        if let Some(v) = self.hashing_algorithm {
            items.push(TTLV::enumeration(Tag::HashingAlgorithm, v));
        }
        if let Some(v) = self.key_role_type {
            items.push(TTLV::enumeration(Tag::KeyRoleType, v));
        }
        if let Some(v) = self.cryptographic_algorithm {
            items.push(TTLV::enumeration(Tag::CryptographicAlgorithm, v));
        }
        if let Some(v) = self.random_iv {
            items.push(TTLV::boolean(Tag::RandomIV, v));
        }
        for (tag, value) in [
            (Tag::IVLength, self.iv_length),
            (Tag::TagLength, self.tag_length),
            (Tag::FixedFieldLength, self.fixed_field_length),
            (Tag::InvocationFieldLength, self.invocation_field_length),
            (Tag::CounterLength, self.counter_length),
            (Tag::InitialCounterValue, self.initial_counter_value),
        ] {
            if let Some(v) = value {
                items.push(TTLV::integer(tag, v));
            }
        }
        Ok(TTLV::structure(Tag::CryptographicParameters, items))
    }
}

impl FromTtlv for CryptographicParameters {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::CryptographicParameters)?;
        Ok(Self {
            block_cipher_mode: fields.opt_enumeration(Tag::BlockCipherMode)?,
            padding_method: fields.opt_enumeration(Tag::PaddingMethod)?,
            hashing_algorithm: fields.opt_enumeration(Tag::HashingAlgorithm)?,
            key_role_type: fields.opt_enumeration(Tag::KeyRoleType)?,
            cryptographic_algorithm: fields.opt_enumeration(Tag::CryptographicAlgorithm)?,
            random_iv: fields.opt_boolean(Tag::RandomIV)?,
            iv_length: fields.opt_integer(Tag::IVLength)?,
            tag_length: fields.opt_integer(Tag::TagLength)?,
            fixed_field_length: fields.opt_integer(Tag::FixedFieldLength)?,
            invocation_field_length: fields.opt_integer(Tag::InvocationFieldLength)?,
            counter_length: fields.opt_integer(Tag::CounterLength)?,
            initial_counter_value: fields.opt_integer(Tag::InitialCounterValue)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub name_value: String,
    pub name_type: NameType,
}

impl Name {
    #[must_use]
    pub fn text(name_value: &str) -> Self {
        Self {
            name_value: name_value.to_owned(),
            name_type: NameType::UninterpretedTextString,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name_value)
    }
}

impl ToTtlv for Name {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        Ok(TTLV::structure(
            Tag::Name,
            vec![
                TTLV::text_string(Tag::NameValue, &self.name_value),
                TTLV::enumeration(Tag::NameType, self.name_type),
            ],
        ))
    }
}

impl FromTtlv for Name {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::Name)?;
        Ok(Self {
            name_value: fields.text(Tag::NameValue)?,
            name_type: fields.enumeration(Tag::NameType)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationReason {
    pub revocation_reason_code: RevocationReasonCode,
    pub revocation_message: Option<String>,
}

impl ToTtlv for RevocationReason {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut items = vec![TTLV::enumeration(
            Tag::RevocationReasonCode,
            self.revocation_reason_code,
        )];
        if let Some(message) = &self.revocation_message {
            items.push(TTLV::text_string(Tag::RevocationMessage, message));
        }
        Ok(TTLV::structure(Tag::RevocationReason, items))
    }
}

impl FromTtlv for RevocationReason {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::RevocationReason)?;
        Ok(Self {
            revocation_reason_code: fields.enumeration(Tag::RevocationReasonCode)?,
            revocation_message: fields.opt_text(Tag::RevocationMessage)?,
        })
    }
}

/// A username and password credential, sent in the request header.
/// The password is wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl ToTtlv for Credential {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let mut value = vec![TTLV::text_string(Tag::Username, &self.username)];
        if let Some(password) = &self.password {
            value.push(TTLV::text_string(Tag::Password, password));
        }
        Ok(TTLV::structure(
            Tag::Credential,
            vec![
                TTLV::enumeration(Tag::CredentialType, CredentialType::UsernameAndPassword),
                TTLV::structure(Tag::CredentialValue, value),
            ],
        ))
    }
}

impl FromTtlv for Credential {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::Credential)?;
        let credential_type: CredentialType = fields.enumeration(Tag::CredentialType)?;
        if credential_type != CredentialType::UsernameAndPassword {
            return Err(KmipError::InvalidKmipObject(
                ResultReason::Feature_Not_Supported,
                format!("unsupported credential type {credential_type}"),
            ))
        }
        let value = TtlvFields::of(fields.required(Tag::CredentialValue)?, Tag::CredentialValue)?;
        Ok(Self {
            username: value.text(Tag::Username)?,
            password: value.opt_text(Tag::Password)?,
        })
    }
}

/// Key Block of a managed cryptographic object.
///
/// Only plain key values are supported: `Raw`/`Opaque` key material as a byte
/// string, and `TransparentSymmetricKey` material as a structure holding the key.
/// The key bytes are zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyBlock {
    pub key_format_type: KeyFormatType,
    pub key_material: Zeroizing<Vec<u8>>,
    pub cryptographic_algorithm: Option<CryptographicAlgorithm>,
    pub cryptographic_length: Option<i32>,
}

impl fmt::Debug for KeyBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlock")
            .field("key_format_type", &self.key_format_type)
            .field("key_material", &format!("<{} bytes>", self.key_material.len()))
            .field("cryptographic_algorithm", &self.cryptographic_algorithm)
            .field("cryptographic_length", &self.cryptographic_length)
            .finish()
    }
}

impl ToTtlv for KeyBlock {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        let key_material = match self.key_format_type {
            KeyFormatType::TransparentSymmetricKey => TTLV::structure(
                Tag::KeyMaterial,
                vec![TTLV::byte_string(Tag::Key, &self.key_material)],
            ),
            _ => TTLV::byte_string(Tag::KeyMaterial, &self.key_material),
        };
        let mut items = vec![
            TTLV::enumeration(Tag::KeyFormatType, self.key_format_type),
            TTLV::structure(Tag::KeyValue, vec![key_material]),
        ];
        if let Some(v) = self.cryptographic_algorithm {
            items.push(TTLV::enumeration(Tag::CryptographicAlgorithm, v));
        }
        if let Some(v) = self.cryptographic_length {
            items.push(TTLV::integer(Tag::CryptographicLength, v));
        }
        Ok(TTLV::structure(Tag::KeyBlock, items))
    }
}

impl FromTtlv for KeyBlock {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let fields = TtlvFields::of(ttlv, Tag::KeyBlock)?;
        let key_format_type = fields.enumeration(Tag::KeyFormatType)?;
        let key_value = fields.required(Tag::KeyValue)?;
        let key_value = match &key_value.value {
            // KMIP also allows a byte string key value for wrapped keys
            TTLValue::ByteString(_) => {
                return Err(KmipError::InvalidKmipObject(
                    ResultReason::Key_Format_Type_Not_Supported,
                    "wrapped key values are not supported".to_owned(),
                ))
            }
            _ => TtlvFields::of(key_value, Tag::KeyValue)?,
        };
        let material = key_value.required(Tag::KeyMaterial)?;
        let key_material = match &material.value {
            TTLValue::ByteString(bytes) => bytes.clone(),
            TTLValue::Structure(_) => TtlvFields::of(material, Tag::KeyMaterial)?.bytes(Tag::Key)?,
            other => {
                return Err(KmipError::MalformedMessage(format!(
                    "KeyMaterial must be a ByteString or a Structure, found {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self {
            key_format_type,
            key_material: Zeroizing::new(key_material),
            cryptographic_algorithm: fields.opt_enumeration(Tag::CryptographicAlgorithm)?,
            cryptographic_length: fields.opt_integer(Tag::CryptographicLength)?,
        })
    }
}

/// A managed object as returned by Get: the object structure
/// (Symmetric Key, Secret Data...) wrapping a key block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObject {
    /// Tag of the object structure
    pub tag: String,
    pub key_block: KeyBlock,
}

impl ManagedObject {
    #[must_use]
    pub fn symmetric_key(key_block: KeyBlock) -> Self {
        Self {
            tag: Tag::SymmetricKey.to_string(),
            key_block,
        }
    }
}

impl ToTtlv for ManagedObject {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        Ok(TTLV {
            tag: self.tag.clone(),
            value: TTLValue::Structure(vec![self.key_block.to_ttlv()?]),
        })
    }
}

impl FromTtlv for ManagedObject {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        let TTLValue::Structure(items) = &ttlv.value else {
            return Err(KmipError::MalformedMessage(format!(
                "{} must be a Structure, found {}",
                ttlv.tag,
                ttlv.value.type_name()
            )))
        };
        let key_block_tag = Tag::KeyBlock.to_string();
        let key_block = items
            .iter()
            .find(|item| item.tag == key_block_tag)
            .ok_or_else(|| {
                KmipError::InvalidKmipObject(
                    ResultReason::Key_Value_Not_Present,
                    format!("{} has no key block", ttlv.tag),
                )
            })?;
        Ok(Self {
            tag: ttlv.tag.clone(),
            key_block: KeyBlock::from_ttlv(key_block)?,
        })
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::{CryptographicParameters, Credential, KeyBlock, ManagedObject, RevocationReason};
    use crate::{
        KmipError,
        kmip_types::{
            BlockCipherMode, CryptographicAlgorithm, KeyFormatType, PaddingMethod, ResultReason,
            RevocationReasonCode,
        },
        ttlv::{FromTtlv, TTLV, ToTtlv},
    };

    fn cbc(padding: PaddingMethod) -> CryptographicParameters {
        CryptographicParameters {
            block_cipher_mode: Some(BlockCipherMode::CBC),
            padding_method: Some(padding),
            cryptographic_algorithm: Some(CryptographicAlgorithm::AES),
            ..Default::default()
        }
    }

    #[test]
    fn test_parameters_encoding() {
        let params = CryptographicParameters {
            random_iv: Some(true),
            iv_length: Some(128),
            ..cbc(PaddingMethod::ANSI_X923)
        };
        let ttlv = params.to_ttlv().unwrap();
        let (decoded, _) = TTLV::from_bytes(&ttlv.to_bytes().unwrap()).unwrap();
        assert_eq!(CryptographicParameters::from_ttlv(&decoded).unwrap(), params);
    }

    #[test]
    fn test_parameters_validation() {
        let params = cbc(PaddingMethod::ANSI_X923);
        assert_eq!(params.block_size(), Some(16));
        params.validate(None, Some(&[0_u8; 16])).unwrap();

        // wrong IV length for the block size
        assert!(matches!(
            params.validate(None, Some(&[0_u8; 12])),
            Err(KmipError::InvalidKmipValue(
                ResultReason::Bad_Cryptographic_Parameters,
                _
            ))
        ));
        // no IV and no server generation
        assert!(matches!(
            params.validate(None, None),
            Err(KmipError::InvalidKmipValue(
                ResultReason::Missing_Initialization_Vector,
                _
            ))
        ));
        let generated = CryptographicParameters {
            random_iv: Some(true),
            ..params.clone()
        };
        generated.validate(None, None).unwrap();

        // asymmetric padding with a block cipher
        assert!(cbc(PaddingMethod::OAEP).validate(None, Some(&[0_u8; 16])).is_err());
        // stream modes take no padding
        let ctr = CryptographicParameters {
            block_cipher_mode: Some(BlockCipherMode::CTR),
            ..cbc(PaddingMethod::PKCS5)
        };
        assert!(ctr.validate(None, Some(&[0_u8; 16])).is_err());
        // ECB takes no IV
        let ecb = CryptographicParameters {
            block_cipher_mode: Some(BlockCipherMode::ECB),
            ..cbc(PaddingMethod::PKCS5)
        };
        ecb.validate(None, None).unwrap();
        assert!(ecb.validate(None, Some(&[0_u8; 16])).is_err());
        // the algorithm of the key is used when the parameters do not name one
        let keyless = CryptographicParameters {
            cryptographic_algorithm: None,
            ..params
        };
        assert!(keyless
            .validate(Some(CryptographicAlgorithm::ThreeDES), Some(&[0_u8; 16]))
            .is_err());
        keyless
            .validate(Some(CryptographicAlgorithm::ThreeDES), Some(&[0_u8; 8]))
            .unwrap();
    }

    #[test]
    fn test_credential_and_revocation_reason() {
        let credential = Credential {
            username: "alice".to_owned(),
            password: Some("secret".to_owned()),
        };
        let decoded = Credential::from_ttlv(&credential.to_ttlv().unwrap()).unwrap();
        assert_eq!(decoded, credential);
        assert!(!format!("{credential:?}").contains("secret"));

        let reason = RevocationReason {
            revocation_reason_code: RevocationReasonCode::KeyCompromise,
            revocation_message: Some("lost laptop".to_owned()),
        };
        assert_eq!(
            RevocationReason::from_ttlv(&reason.to_ttlv().unwrap()).unwrap(),
            reason
        );
    }

    #[test]
    fn test_key_block_formats() {
        for key_format_type in [KeyFormatType::Raw, KeyFormatType::TransparentSymmetricKey] {
            let object = ManagedObject::symmetric_key(KeyBlock {
                key_format_type,
                key_material: Zeroizing::new(vec![7_u8; 16]),
                cryptographic_algorithm: Some(CryptographicAlgorithm::AES),
                cryptographic_length: Some(128),
            });
            let ttlv = object.to_ttlv().unwrap();
            let (decoded, _) = TTLV::from_bytes(&ttlv.to_bytes().unwrap()).unwrap();
            assert_eq!(ManagedObject::from_ttlv(&decoded).unwrap(), object);
        }
    }
}
