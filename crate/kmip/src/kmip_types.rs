#![allow(non_camel_case_types)]

use std::fmt;

use strum::{Display, EnumIter, EnumString, FromRepr};

use crate::ttlv::TtlvType;

/// A KMIP enumeration: a named `u32` value.
pub trait KmipEnumeration: Copy + fmt::Display {
    fn to_u32(self) -> u32;

    fn from_u32(value: u32) -> Option<Self>;
}

/// Declares a KMIP enumeration with its wire values and the
/// derives every enumeration of this crate shares.
macro_rules! kmip_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, EnumString, EnumIter, FromRepr)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl KmipEnumeration for $name {
            #[allow(clippy::as_conversions)]
            // This conversion is idomatic for items marked with #[repr(u32)]
            fn to_u32(self) -> u32 {
                self as u32
            }

            fn from_u32(value: u32) -> Option<Self> {
                Self::from_repr(value)
            }
        }
    };
}

kmip_enum! {
    /// KMIP tags of the 1.x message layout, plus the few 2.x tags the
    /// engine may meet when talking to newer servers.
    pub enum Tag {
        ActivationDate = 0x42_0001,
        ApplicationData = 0x42_0002,
        ApplicationNamespace = 0x42_0003,
        ApplicationSpecificInformation = 0x42_0004,
        ArchiveDate = 0x42_0005,
        AsynchronousCorrelationValue = 0x42_0006,
        AsynchronousIndicator = 0x42_0007,
        Attribute = 0x42_0008,
        AttributeIndex = 0x42_0009,
        AttributeName = 0x42_000A,
        AttributeValue = 0x42_000B,
        Authentication = 0x42_000C,
        BatchCount = 0x42_000D,
        BatchErrorContinuationOption = 0x42_000E,
        BatchItem = 0x42_000F,
        BatchOrderOption = 0x42_0010,
        BlockCipherMode = 0x42_0011,
        CompromiseDate = 0x42_0020,
        CompromiseOccurrenceDate = 0x42_0021,
        ContactInformation = 0x42_0022,
        Credential = 0x42_0023,
        CredentialType = 0x42_0024,
        CredentialValue = 0x42_0025,
        CryptographicAlgorithm = 0x42_0028,
        CryptographicLength = 0x42_002A,
        CryptographicParameters = 0x42_002B,
        CryptographicUsageMask = 0x42_002C,
        DeactivationDate = 0x42_002F,
        DestroyDate = 0x42_0033,
        Digest = 0x42_0034,
        DigestValue = 0x42_0035,
        HashingAlgorithm = 0x42_0038,
        InitialDate = 0x42_0039,
        IVCounterNonce = 0x42_003D,
        Key = 0x42_003F,
        KeyBlock = 0x42_0040,
        KeyCompressionType = 0x42_0041,
        KeyFormatType = 0x42_0042,
        KeyMaterial = 0x42_0043,
        KeyValue = 0x42_0045,
        KeyWrappingData = 0x42_0046,
        LastChangeDate = 0x42_0048,
        LeaseTime = 0x42_0049,
        Link = 0x42_004A,
        LinkType = 0x42_004B,
        LinkedObjectIdentifier = 0x42_004C,
        MaximumItems = 0x42_004F,
        MaximumResponseSize = 0x42_0050,
        MessageExtension = 0x42_0051,
        Name = 0x42_0053,
        NameType = 0x42_0054,
        NameValue = 0x42_0055,
        ObjectGroup = 0x42_0056,
        ObjectType = 0x42_0057,
        Operation = 0x42_005C,
        OperationPolicyName = 0x42_005D,
        PaddingMethod = 0x42_005F,
        ProcessStartDate = 0x42_0067,
        ProtectStopDate = 0x42_0068,
        ProtocolVersion = 0x42_0069,
        ProtocolVersionMajor = 0x42_006A,
        ProtocolVersionMinor = 0x42_006B,
        RequestHeader = 0x42_0077,
        RequestMessage = 0x42_0078,
        RequestPayload = 0x42_0079,
        ResponseHeader = 0x42_007A,
        ResponseMessage = 0x42_007B,
        ResponsePayload = 0x42_007C,
        ResultMessage = 0x42_007D,
        ResultReason = 0x42_007E,
        ResultStatus = 0x42_007F,
        RevocationMessage = 0x42_0080,
        RevocationReason = 0x42_0081,
        RevocationReasonCode = 0x42_0082,
        KeyRoleType = 0x42_0083,
        SecretData = 0x42_0085,
        SecretDataType = 0x42_0086,
        State = 0x42_008D,
        SymmetricKey = 0x42_008F,
        TemplateAttribute = 0x42_0091,
        TimeStamp = 0x42_0092,
        UniqueBatchItemID = 0x42_0093,
        UniqueIdentifier = 0x42_0094,
        Username = 0x42_0099,
        VendorIdentification = 0x42_009D,
        Password = 0x42_00A1,
        Fresh = 0x42_00A8,
        KeyValuePresent = 0x42_00BB,
        Data = 0x42_00C2,
        RandomIV = 0x42_00C5,
        IVLength = 0x42_00CD,
        TagLength = 0x42_00CE,
        FixedFieldLength = 0x42_00CF,
        CounterLength = 0x42_00D0,
        InitialCounterValue = 0x42_00D1,
        InvocationFieldLength = 0x42_00D2,
        LocatedItems = 0x42_00D5,
        CorrelationValue = 0x42_00D6,
        InitIndicator = 0x42_00D7,
        FinalIndicator = 0x42_00D8,
        AuthenticatedEncryptionAdditionalData = 0x42_00FE,
        AuthenticatedEncryptionTag = 0x42_00FF,
    }
}

kmip_enum! {
    pub enum OperationEnumeration {
        Create = 0x1,
        CreateKeyPair = 0x2,
        Register = 0x3,
        ReKey = 0x4,
        DeriveKey = 0x5,
        Certify = 0x6,
        ReCertify = 0x7,
        Locate = 0x8,
        Check = 0x9,
        Get = 0xA,
        GetAttributes = 0xB,
        GetAttributeList = 0xC,
        AddAttribute = 0xD,
        ModifyAttribute = 0xE,
        DeleteAttribute = 0xF,
        ObtainLease = 0x10,
        GetUsageAllocation = 0x11,
        Activate = 0x12,
        Revoke = 0x13,
        Destroy = 0x14,
        Archive = 0x15,
        Recover = 0x16,
        Validate = 0x17,
        Query = 0x18,
        Cancel = 0x19,
        Poll = 0x1A,
        Notify = 0x1B,
        Put = 0x1C,
        ReKeyKeyPair = 0x1D,
        DiscoverVersions = 0x1E,
        Encrypt = 0x1F,
        Decrypt = 0x20,
        Sign = 0x21,
        SignatureVerify = 0x22,
        MAC = 0x23,
        MACVerify = 0x24,
        RNGRetrieve = 0x25,
        RNGSeed = 0x26,
        Hash = 0x27,
        CreateSplitKey = 0x28,
        JoinSplitKey = 0x29,
    }
}

impl OperationEnumeration {
    /// Operations that change server-side state.
    /// Their outcome must be known before they can safely be sent again.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::CreateKeyPair
                | Self::Register
                | Self::ReKey
                | Self::DeriveKey
                | Self::Activate
                | Self::Revoke
                | Self::Destroy
                | Self::Archive
                | Self::Recover
                | Self::AddAttribute
                | Self::ModifyAttribute
                | Self::DeleteAttribute
        )
    }
}

kmip_enum! {
    pub enum ResultStatusEnumeration {
        Success = 0x0000_0000,
        OperationFailed = 0x0000_0001,
        OperationPending = 0x0000_0002,
        OperationUndone = 0x0000_0003,
    }
}

kmip_enum! {
    /// Result reasons of KMIP 1.4, extended with the KMIP 2.x values
    /// servers commonly return to 1.x clients.
    #[derive(Default)]
    pub enum ResultReason {
        Item_Not_Found = 0x0000_0001,
        Response_Too_Large = 0x0000_0002,
        Authentication_Not_Successful = 0x0000_0003,
        Invalid_Message = 0x0000_0004,
        Operation_Not_Supported = 0x0000_0005,
        Missing_Data = 0x0000_0006,
        Invalid_Field = 0x0000_0007,
        Feature_Not_Supported = 0x0000_0008,
        Operation_Canceled_By_Requester = 0x0000_0009,
        Cryptographic_Failure = 0x0000_000A,
        Illegal_Operation = 0x0000_000B,
        Permission_Denied = 0x0000_000C,
        Object_Archived = 0x0000_000D,
        Index_Out_Of_Bounds = 0x0000_000E,
        Application_Namespace_Not_Supported = 0x0000_000F,
        Key_Format_Type_Not_Supported = 0x0000_0010,
        Key_Compression_Type_Not_Supported = 0x0000_0011,
        Encoding_Option_Error = 0x0000_0012,
        Key_Value_Not_Present = 0x0000_0013,
        Attestation_Required = 0x0000_0014,
        Attestation_Failed = 0x0000_0015,
        Sensitive = 0x0000_0016,
        Not_Extractable = 0x0000_0017,
        Object_Already_Exists = 0x0000_0018,
        Bad_Cryptographic_Parameters = 0x0000_0024,
        Codec_Error = 0x0000_0026,
        Incompatible_Cryptographic_Usage_Mask = 0x0000_0029,
        Invalid_Attribute_Value = 0x0000_002D,
        Missing_Initialization_Vector = 0x0000_0034,
        Object_Destroyed = 0x0000_0036,
        Object_Not_Found = 0x0000_0037,
        Unsupported_Protocol_Version = 0x0000_003F,
        Wrong_Key_Lifecycle_State = 0x0000_0043,
        #[default]
        General_Failure = 0x0000_0100,
    }
}

impl ResultReason {
    /// Reasons a server gives when its view of an object's lifecycle
    /// disagrees with the request
    #[must_use]
    pub const fn is_stale_state(self) -> bool {
        matches!(
            self,
            Self::Wrong_Key_Lifecycle_State | Self::Permission_Denied | Self::Illegal_Operation
        )
    }
}

kmip_enum! {
    pub enum BatchErrorContinuationOption {
        Continue = 0x01,
        Stop = 0x02,
        Undo = 0x03,
    }
}

kmip_enum! {
    pub enum CredentialType {
        UsernameAndPassword = 0x1,
        Device = 0x2,
        Attestation = 0x3,
    }
}

kmip_enum! {
    pub enum ObjectType {
        Certificate = 0x1,
        SymmetricKey = 0x2,
        PublicKey = 0x3,
        PrivateKey = 0x4,
        SplitKey = 0x5,
        Template = 0x6,
        SecretData = 0x7,
        OpaqueObject = 0x8,
        PGPKey = 0x9,
    }
}

kmip_enum! {
    pub enum CryptographicAlgorithm {
        DES = 0x1,
        ThreeDES = 0x2,
        AES = 0x3,
        RSA = 0x4,
        DSA = 0x5,
        ECDSA = 0x6,
        HMACSHA1 = 0x7,
        HMACSHA224 = 0x8,
        HMACSHA256 = 0x9,
        HMACSHA384 = 0xA,
        HMACSHA512 = 0xB,
        HMACMD5 = 0xC,
        DH = 0xD,
        ECDH = 0xE,
        ECMQV = 0xF,
        Blowfish = 0x10,
        Camellia = 0x11,
        CAST5 = 0x12,
        IDEA = 0x13,
        MARS = 0x14,
        RC2 = 0x15,
        RC4 = 0x16,
        RC5 = 0x17,
        SKIPJACK = 0x18,
        Twofish = 0x19,
        EC = 0x1A,
        OneTimePad = 0x1B,
        ChaCha20 = 0x1C,
        Poly1305 = 0x1D,
        ChaCha20Poly1305 = 0x1E,
    }
}

impl CryptographicAlgorithm {
    /// Block size in bytes of the block ciphers, `None` for anything else
    #[must_use]
    pub const fn block_size(self) -> Option<usize> {
        match self {
            Self::AES | Self::Camellia | Self::MARS | Self::Twofish | Self::RC5 => Some(16),
            Self::DES
            | Self::ThreeDES
            | Self::Blowfish
            | Self::CAST5
            | Self::IDEA
            | Self::RC2
            | Self::SKIPJACK => Some(8),
            _ => None,
        }
    }

    /// Key lengths in bits a server accepts for this algorithm, `None` when unconstrained here
    #[must_use]
    pub const fn valid_key_lengths(self) -> Option<&'static [i32]> {
        match self {
            Self::AES | Self::Camellia => Some(&[128, 192, 256]),
            Self::ThreeDES => Some(&[112, 168, 192]),
            Self::DES => Some(&[56, 64]),
            Self::ChaCha20 | Self::ChaCha20Poly1305 => Some(&[256]),
            _ => None,
        }
    }
}

kmip_enum! {
    pub enum BlockCipherMode {
        CBC = 0x0000_0001,
        ECB = 0x0000_0002,
        PCBC = 0x0000_0003,
        CFB = 0x0000_0004,
        OFB = 0x0000_0005,
        CTR = 0x0000_0006,
        CMAC = 0x0000_0007,
        CCM = 0x0000_0008,
        GCM = 0x0000_0009,
        CBCMAC = 0x0000_000A,
        XTS = 0x0000_000B,
        AESKeyWrapPadding = 0x0000_000C,
        NISTKeyWrap = 0x0000_000D,
        X9102AESKW = 0x0000_000E,
        X9102TDKW = 0x0000_000F,
        X9102AKW1 = 0x0000_0010,
        X9102AKW2 = 0x0000_0011,
        AEAD = 0x0000_0012,
    }
}

impl BlockCipherMode {
    /// Modes that consume an IV, counter or nonce
    #[must_use]
    pub const fn requires_iv(self) -> bool {
        matches!(
            self,
            Self::CBC
                | Self::PCBC
                | Self::CFB
                | Self::OFB
                | Self::CTR
                | Self::CCM
                | Self::GCM
                | Self::XTS
                | Self::AEAD
        )
    }

    /// Modes that only process whole blocks and therefore need a padding method
    #[must_use]
    pub const fn is_block_aligned(self) -> bool {
        matches!(self, Self::CBC | Self::ECB | Self::PCBC)
    }
}

kmip_enum! {
    pub enum PaddingMethod {
        None = 0x1,
        OAEP = 0x2,
        PKCS5 = 0x3,
        SSL3 = 0x4,
        Zeros = 0x5,
        ANSI_X923 = 0x6,
        ISO10126 = 0x7,
        PKCS1v15 = 0x8,
        X931 = 0x9,
        PSS = 0xA,
    }
}

impl PaddingMethod {
    /// Paddings that apply to symmetric block ciphers
    #[must_use]
    pub const fn is_block_padding(self) -> bool {
        matches!(
            self,
            Self::None | Self::PKCS5 | Self::SSL3 | Self::Zeros | Self::ANSI_X923 | Self::ISO10126
        )
    }
}

kmip_enum! {
    pub enum HashingAlgorithm {
        MD2 = 0x0000_0001,
        MD4 = 0x0000_0002,
        MD5 = 0x0000_0003,
        SHA1 = 0x0000_0004,
        SHA224 = 0x0000_0005,
        SHA256 = 0x0000_0006,
        SHA384 = 0x0000_0007,
        SHA512 = 0x0000_0008,
        RIPEMD160 = 0x0000_0009,
        Tiger = 0x0000_000A,
        Whirlpool = 0x0000_000B,
        SHA512224 = 0x0000_000C,
        SHA512256 = 0x0000_000D,
        SHA3224 = 0x0000_000E,
        SHA3256 = 0x0000_000F,
        SHA3384 = 0x0000_0010,
        SHA3512 = 0x0000_0011,
    }
}

kmip_enum! {
    pub enum KeyRoleType {
        BDK = 0x1,
        CVK = 0x2,
        DEK = 0x3,
        MKAC = 0x4,
        MKSMC = 0x5,
        MKSMI = 0x6,
        MKDAC = 0x7,
        MKDN = 0x8,
        MKCP = 0x9,
        MKOTH = 0xA,
        KEK = 0xB,
        MAC16609 = 0xC,
        MAC97971 = 0xD,
        MAC97972 = 0xE,
        MAC97973 = 0xF,
        MAC97974 = 0x10,
        MAC97975 = 0x11,
        ZPK = 0x12,
        PVKIBM = 0x13,
        PVKPVV = 0x14,
        PVKOTH = 0x15,
        DUKPT = 0x16,
        IV = 0x17,
        TRKBK = 0x18,
    }
}

kmip_enum! {
    pub enum KeyFormatType {
        Raw = 0x1,
        Opaque = 0x2,
        PKCS1 = 0x3,
        PKCS8 = 0x4,
        X509 = 0x5,
        ECPrivateKey = 0x6,
        TransparentSymmetricKey = 0x7,
    }
}

kmip_enum! {
    pub enum NameType {
        UninterpretedTextString = 0x1,
        URI = 0x2,
    }
}

kmip_enum! {
    pub enum LinkType {
        Certificate_Link = 0x101,
        Public_Key_Link = 0x102,
        Private_Key_Link = 0x103,
        Derivation_Base_Object_Link = 0x104,
        Derived_Key_Link = 0x105,
        Replacement_Object_Link = 0x106,
        Replaced_Object_Link = 0x107,
        Parent_Link = 0x108,
        Child_Link = 0x109,
        Previous_Link = 0x10A,
        Next_Link = 0x10B,
    }
}

kmip_enum! {
    pub enum RevocationReasonCode {
        Unspecified = 0x1,
        KeyCompromise = 0x2,
        CACompromise = 0x3,
        AffiliationChanged = 0x4,
        Superseded = 0x5,
        CessationOfOperation = 0x6,
        PrivilegeWithdrawn = 0x7,
    }
}

impl RevocationReasonCode {
    #[must_use]
    pub const fn is_compromise(self) -> bool {
        matches!(self, Self::KeyCompromise | Self::CACompromise)
    }
}

kmip_enum! {
    /// This attribute is an indication of the State of an object as known to the
    /// key management server. The State SHALL NOT be changed by using the Modify
    /// Attribute operation on this attribute. The State SHALL only be changed by
    /// the server as a part of other operations or other server processes.
    ///
    /// Note: The states correspond to those described in [SP800-57-1].
    pub enum State {
        /// Pre-Active: The object exists and SHALL NOT be used for any cryptographic purpose.
        PreActive = 0x0000_0001,
        /// Active: The object SHALL only be used for the cryptographic purposes
        /// allowed by its Cryptographic Usage Mask attribute.
        Active = 0x0000_0002,
        /// Deactivated: The object SHALL NOT be used for applying cryptographic protection.
        Deactivated = 0x0000_0003,
        /// Compromised: The object SHALL NOT be used for applying cryptographic protection.
        Compromised = 0x0000_0004,
        /// Destroyed: The object SHALL NOT be used for any cryptographic purpose.
        Destroyed = 0x0000_0005,
        /// Destroyed Compromised: The object SHALL NOT be used for any cryptographic purpose;
        /// its compromised status SHOULD be retained for audit or security purposes.
        Destroyed_Compromised = 0x0000_0006,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CryptographicUsageMask(u32);

bitflags::bitflags! {
    impl CryptographicUsageMask: u32 {
        /// Allow for signing. Applies to Sign operation.
        const Sign=0x0000_0001;
        /// Allow for signature verification. Applies to Signature Verify and Validate operations.
        const Verify=0x0000_0002;
        /// Allow for encryption. Applies to Encrypt operation.
        const Encrypt=0x0000_0004;
        /// Allow for decryption. Applies to Decrypt operation.
        const Decrypt=0x0000_0008;
        const WrapKey=0x0000_0010;
        const UnwrapKey=0x0000_0020;
        const Export=0x0000_0040;
        const MACGenerate=0x0000_0080;
        const MACVerify=0x0000_0100;
        const DeriveKey=0x0000_0200;
        const ContentCommitment=0x0000_0400;
        const KeyAgreement=0x0000_0800;
        const CertificateSign=0x0000_1000;
        const CRLSign=0x0000_2000;
        const GenerateCryptogram=0x0000_4000;
        const ValidateCryptogram=0x0000_8000;
        const TranslateEncrypt=0x0001_0000;
        const TranslateDecrypt=0x0002_0000;
        const TranslateWrap=0x0004_0000;
        const TranslateUnwrap=0x0008_0000;
    }
}

impl fmt::Display for CryptographicUsageMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, _flag) in self.iter_names() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{name}")?;
            first = false;
        }
        Ok(())
    }
}

/// This field contains the version number of the protocol, ensuring that
/// the protocol is fully understood by both communicating parties.
///
/// Servers and clients SHALL support backward compatibility with versions
/// of the protocol with the same major version.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub protocol_version_major: i32,
    pub protocol_version_minor: i32,
}

impl ProtocolVersion {
    pub const KMIP_1_0: Self = Self::new(1, 0);
    pub const KMIP_1_2: Self = Self::new(1, 2);
    pub const KMIP_1_4: Self = Self::new(1, 4);

    #[must_use]
    pub const fn new(major: i32, minor: i32) -> Self {
        Self {
            protocol_version_major: major,
            protocol_version_minor: minor,
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::KMIP_1_4
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.protocol_version_major, self.protocol_version_minor
        )
    }
}

/// Name of an enumeration value, when the tag carrying it is an enumeration
/// this crate knows. Used to label decoded enumerations in diagnostics.
#[must_use]
pub fn enumeration_name(tag: Tag, value: u32) -> Option<String> {
    fn name<E: KmipEnumeration>(value: u32) -> Option<String> {
        E::from_u32(value).map(|e| e.to_string())
    }
    match tag {
        Tag::Operation => name::<OperationEnumeration>(value),
        Tag::ResultStatus => name::<ResultStatusEnumeration>(value),
        Tag::ResultReason => name::<ResultReason>(value),
        Tag::BatchErrorContinuationOption => name::<BatchErrorContinuationOption>(value),
        Tag::CredentialType => name::<CredentialType>(value),
        Tag::ObjectType => name::<ObjectType>(value),
        Tag::CryptographicAlgorithm => name::<CryptographicAlgorithm>(value),
        Tag::BlockCipherMode => name::<BlockCipherMode>(value),
        Tag::PaddingMethod => name::<PaddingMethod>(value),
        Tag::HashingAlgorithm => name::<HashingAlgorithm>(value),
        Tag::KeyRoleType => name::<KeyRoleType>(value),
        Tag::KeyFormatType => name::<KeyFormatType>(value),
        Tag::NameType => name::<NameType>(value),
        Tag::LinkType => name::<LinkType>(value),
        Tag::RevocationReasonCode => name::<RevocationReasonCode>(value),
        Tag::State => name::<State>(value),
        _ => None,
    }
}

/// The TTLV type KMIP mandates for the value of a tag, when the tag alone determines it
#[must_use]
pub const fn tag_value_type(tag: Tag) -> Option<TtlvType> {
    match tag {
        Tag::Operation
        | Tag::ResultStatus
        | Tag::ResultReason
        | Tag::ObjectType
        | Tag::CryptographicAlgorithm
        | Tag::BlockCipherMode
        | Tag::PaddingMethod
        | Tag::State
        | Tag::NameType
        | Tag::RevocationReasonCode => Some(TtlvType::Enumeration),
        Tag::UniqueIdentifier | Tag::AttributeName | Tag::NameValue | Tag::ResultMessage => {
            Some(TtlvType::TextString)
        }
        Tag::BatchCount
        | Tag::ProtocolVersionMajor
        | Tag::ProtocolVersionMinor
        | Tag::AttributeIndex
        | Tag::CryptographicLength => Some(TtlvType::Integer),
        Tag::IVCounterNonce | Tag::Data | Tag::UniqueBatchItemID | Tag::KeyMaterial => {
            Some(TtlvType::ByteString)
        }
        Tag::RequestMessage
        | Tag::ResponseMessage
        | Tag::RequestHeader
        | Tag::ResponseHeader
        | Tag::BatchItem
        | Tag::ProtocolVersion
        | Tag::TemplateAttribute
        | Tag::Attribute
        | Tag::CryptographicParameters => Some(TtlvType::Structure),
        _ => None,
    }
}
