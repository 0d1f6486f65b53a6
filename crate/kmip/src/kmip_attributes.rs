//! KMIP 1.x attributes.
//!
//! An attribute travels as `Attribute { AttributeName, AttributeIndex?, AttributeValue }`
//! where the type of `AttributeValue` depends on the name. The names the engine
//! understands, and the type each one carries, are listed in a static registry;
//! values are checked against it whenever they are encoded or decoded.

use std::fmt;

use time::OffsetDateTime;
use tracing::trace;

use crate::{
    error::{KmipError, result::KmipResult},
    kmip_data_structures::Name,
    kmip_types::{
        CryptographicAlgorithm, CryptographicUsageMask, KmipEnumeration, ObjectType, ResultReason,
        State, Tag, enumeration_name,
    },
    ttlv::{
        FromTtlv, KmipBigInt, KmipEnumerationVariant, TTLV, TTLValue, ToTtlv, TtlvFields, TtlvType,
    },
};

/// Registry entry: the TTLV type an attribute value must have.
/// Enumerated attributes also name the enumeration their value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: &'static str,
    pub ttlv_type: TtlvType,
    pub enumeration: Option<Tag>,
}

const fn def(name: &'static str, ttlv_type: TtlvType) -> AttributeDefinition {
    AttributeDefinition {
        name,
        ttlv_type,
        enumeration: None,
    }
}

const fn def_enum(name: &'static str, enumeration: Tag) -> AttributeDefinition {
    AttributeDefinition {
        name,
        ttlv_type: TtlvType::Enumeration,
        enumeration: Some(enumeration),
    }
}

pub const UNIQUE_IDENTIFIER: &str = "Unique Identifier";
pub const NAME: &str = "Name";
pub const OBJECT_TYPE: &str = "Object Type";
pub const CRYPTOGRAPHIC_ALGORITHM: &str = "Cryptographic Algorithm";
pub const CRYPTOGRAPHIC_LENGTH: &str = "Cryptographic Length";
pub const CRYPTOGRAPHIC_PARAMETERS: &str = "Cryptographic Parameters";
pub const CRYPTOGRAPHIC_USAGE_MASK: &str = "Cryptographic Usage Mask";
pub const STATE: &str = "State";
pub const INITIAL_DATE: &str = "Initial Date";
pub const ACTIVATION_DATE: &str = "Activation Date";
pub const DEACTIVATION_DATE: &str = "Deactivation Date";
pub const DESTROY_DATE: &str = "Destroy Date";
pub const COMPROMISE_DATE: &str = "Compromise Date";
pub const COMPROMISE_OCCURRENCE_DATE: &str = "Compromise Occurrence Date";
pub const REVOCATION_REASON: &str = "Revocation Reason";
pub const LAST_CHANGE_DATE: &str = "Last Change Date";

/// The standard attributes known to the engine
pub static ATTRIBUTE_REGISTRY: &[AttributeDefinition] = &[
    def(UNIQUE_IDENTIFIER, TtlvType::TextString),
    def(NAME, TtlvType::Structure),
    def_enum(OBJECT_TYPE, Tag::ObjectType),
    def_enum(CRYPTOGRAPHIC_ALGORITHM, Tag::CryptographicAlgorithm),
    def(CRYPTOGRAPHIC_LENGTH, TtlvType::Integer),
    def(CRYPTOGRAPHIC_PARAMETERS, TtlvType::Structure),
    def(CRYPTOGRAPHIC_USAGE_MASK, TtlvType::Integer),
    def_enum(STATE, Tag::State),
    def(INITIAL_DATE, TtlvType::DateTime),
    def(ACTIVATION_DATE, TtlvType::DateTime),
    def(DEACTIVATION_DATE, TtlvType::DateTime),
    def(DESTROY_DATE, TtlvType::DateTime),
    def(COMPROMISE_DATE, TtlvType::DateTime),
    def(COMPROMISE_OCCURRENCE_DATE, TtlvType::DateTime),
    def(REVOCATION_REASON, TtlvType::Structure),
    def(LAST_CHANGE_DATE, TtlvType::DateTime),
    def("Process Start Date", TtlvType::DateTime),
    def("Protect Stop Date", TtlvType::DateTime),
    def("Archive Date", TtlvType::DateTime),
    def("Object Group", TtlvType::TextString),
    def("Contact Information", TtlvType::TextString),
    def("Operation Policy Name", TtlvType::TextString),
    def("Digest", TtlvType::Structure),
    def("Lease Time", TtlvType::Interval),
    def("Link", TtlvType::Structure),
    def("Application Specific Information", TtlvType::Structure),
    def("Fresh", TtlvType::Boolean),
    def("Key Value Present", TtlvType::Boolean),
];

/// Look up the registry entry of an attribute name
#[must_use]
pub fn attribute_definition(name: &str) -> Option<&'static AttributeDefinition> {
    ATTRIBUTE_REGISTRY.iter().find(|d| d.name == name)
}

/// What to do with attribute names that are not in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributePolicy {
    /// Unknown names are an `UnknownAttribute` error
    #[default]
    Strict,
    /// Unknown names, custom `x-`/`y-` attributes included, are carried untyped
    Passthrough,
}

/// The value of an attribute, one variant per TTLV type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    TextString(String),
    Integer(i32),
    LongInteger(i64),
    BigInteger(KmipBigInt),
    /// Raw enumeration value; the registry supplies the enumeration
    Enumeration(u32),
    Boolean(bool),
    ByteString(Vec<u8>),
    DateTime(OffsetDateTime),
    Interval(u32),
    /// The children of a structured value
    Structure(Vec<TTLV>),
}

impl AttributeValue {
    pub fn enumeration<E: KmipEnumeration>(value: E) -> Self {
        Self::Enumeration(value.to_u32())
    }

    /// Build a structured value from the children of a KMIP object
    pub fn structure<T: ToTtlv>(value: &T) -> KmipResult<Self> {
        match value.to_ttlv()?.value {
            TTLValue::Structure(items) => Ok(Self::Structure(items)),
            other => Err(KmipError::ConversionError(format!(
                "expected a structure, found {}",
                other.type_name()
            ))),
        }
    }

    /// Decode a structured value as the KMIP object `T` rooted at `tag`
    pub fn to_object<T: FromTtlv>(&self, tag: Tag) -> KmipResult<T> {
        match self {
            Self::Structure(items) => T::from_ttlv(&TTLV::structure(tag, items.clone())),
            other => Err(KmipError::ConversionError(format!(
                "{tag}: expected a structure, found {}",
                other.ttlv_type()
            ))),
        }
    }

    #[must_use]
    pub const fn ttlv_type(&self) -> TtlvType {
        match self {
            Self::TextString(_) => TtlvType::TextString,
            Self::Integer(_) => TtlvType::Integer,
            Self::LongInteger(_) => TtlvType::LongInteger,
            Self::BigInteger(_) => TtlvType::BigInteger,
            Self::Enumeration(_) => TtlvType::Enumeration,
            Self::Boolean(_) => TtlvType::Boolean,
            Self::ByteString(_) => TtlvType::ByteString,
            Self::DateTime(_) => TtlvType::DateTime,
            Self::Interval(_) => TtlvType::Interval,
            Self::Structure(_) => TtlvType::Structure,
        }
    }

    fn to_ttlv_value(&self, enumeration: Option<Tag>) -> TTLValue {
        match self {
            Self::TextString(v) => TTLValue::TextString(v.clone()),
            Self::Integer(v) => TTLValue::Integer(*v),
            Self::LongInteger(v) => TTLValue::LongInteger(*v),
            Self::BigInteger(v) => TTLValue::BigInteger(v.clone()),
            Self::Enumeration(v) => TTLValue::Enumeration(KmipEnumerationVariant {
                value: *v,
                name: enumeration
                    .and_then(|tag| enumeration_name(tag, *v))
                    .unwrap_or_default(),
            }),
            Self::Boolean(v) => TTLValue::Boolean(*v),
            Self::ByteString(v) => TTLValue::ByteString(v.clone()),
            Self::DateTime(v) => TTLValue::DateTime(*v),
            Self::Interval(v) => TTLValue::Interval(*v),
            Self::Structure(v) => TTLValue::Structure(v.clone()),
        }
    }

    fn from_ttlv_value(name: &str, value: &TTLValue) -> KmipResult<Self> {
        Ok(match value {
            TTLValue::TextString(v) => Self::TextString(v.clone()),
            TTLValue::Integer(v) => Self::Integer(*v),
            TTLValue::LongInteger(v) => Self::LongInteger(*v),
            TTLValue::BigInteger(v) => Self::BigInteger(v.clone()),
            TTLValue::Enumeration(v) => Self::Enumeration(v.value),
            TTLValue::Boolean(v) => Self::Boolean(*v),
            TTLValue::ByteString(v) => Self::ByteString(v.clone()),
            TTLValue::DateTime(v) => Self::DateTime(*v),
            TTLValue::Interval(v) => Self::Interval(*v),
            TTLValue::Structure(v) => Self::Structure(v.clone()),
            TTLValue::DateTimeExtended(_) | TTLValue::Opaque { .. } => {
                return Err(KmipError::MalformedMessage(format!(
                    "attribute {name}: unsupported value type {}",
                    value.type_name()
                )))
            }
        })
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::TextString(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::TextString(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<OffsetDateTime> for AttributeValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<CryptographicUsageMask> for AttributeValue {
    fn from(value: CryptographicUsageMask) -> Self {
        // the mask travels as a signed Integer holding the same bits
        Self::Integer(i32::from_be_bytes(value.bits().to_be_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub index: Option<i32>,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(name: &str, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.to_owned(),
            index: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn with_index(mut self, index: i32) -> Self {
        self.index = Some(index);
        self
    }

    /// Check the value type against the registry.
    /// Returns the registry entry, `None` for an accepted unknown name.
    pub fn validate(
        &self,
        policy: AttributePolicy,
    ) -> KmipResult<Option<&'static AttributeDefinition>> {
        validate_value(&self.name, self.value.ttlv_type(), policy)
    }

    pub fn to_ttlv_with(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        let definition = self.validate(policy)?;
        let mut items = vec![TTLV::text_string(Tag::AttributeName, &self.name)];
        if let Some(index) = self.index {
            items.push(TTLV::integer(Tag::AttributeIndex, index));
        }
        items.push(TTLV::new(
            Tag::AttributeValue,
            self.value
                .to_ttlv_value(definition.and_then(|d| d.enumeration)),
        ));
        Ok(TTLV::structure(Tag::Attribute, items))
    }

    pub fn from_ttlv_with(ttlv: &TTLV, policy: AttributePolicy) -> KmipResult<Self> {
        let fields = TtlvFields::of(ttlv, Tag::Attribute)?;
        let name = fields.text(Tag::AttributeName)?;
        let index = fields.opt_integer(Tag::AttributeIndex)?;
        let raw = fields.required(Tag::AttributeValue)?;
        match raw.value.ttlv_type() {
            Some(ttlv_type) => {
                validate_value(&name, ttlv_type, policy)?;
            }
            None => {
                return Err(KmipError::AttributeTypeMismatch {
                    name,
                    expected: "a known TTLV type".to_owned(),
                    actual: raw.value.type_name().to_owned(),
                })
            }
        }
        let value = AttributeValue::from_ttlv_value(&name, &raw.value)?;
        Ok(Self { name, index, value })
    }
}

fn validate_value(
    name: &str,
    actual: TtlvType,
    policy: AttributePolicy,
) -> KmipResult<Option<&'static AttributeDefinition>> {
    match attribute_definition(name) {
        Some(definition) => {
            if definition.ttlv_type != actual {
                return Err(KmipError::AttributeTypeMismatch {
                    name: name.to_owned(),
                    expected: definition.ttlv_type.to_string(),
                    actual: actual.to_string(),
                })
            }
            Ok(Some(definition))
        }
        None => match policy {
            AttributePolicy::Strict => Err(KmipError::UnknownAttribute(name.to_owned())),
            AttributePolicy::Passthrough => {
                trace!("passing through unregistered attribute {name}");
                Ok(None)
            }
        },
    }
}

impl ToTtlv for Attribute {
    fn to_ttlv(&self) -> Result<TTLV, KmipError> {
        self.to_ttlv_with(AttributePolicy::Strict)
    }
}

impl FromTtlv for Attribute {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError> {
        Self::from_ttlv_with(ttlv, AttributePolicy::Strict)
    }
}

/// An ordered set of attributes, unique per `(name, index)`.
/// A missing index counts as index 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes(Vec<Attribute>);

fn same_slot(attribute: &Attribute, name: &str, index: i32) -> bool {
    attribute.name == name && attribute.index.unwrap_or(0) == index
}

impl Attributes {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert an attribute, replacing the one holding the same `(name, index)`
    pub fn set_attribute(&mut self, attribute: Attribute) -> &mut Self {
        let index = attribute.index.unwrap_or(0);
        if let Some(existing) = self
            .0
            .iter_mut()
            .find(|a| same_slot(a, &attribute.name, index))
        {
            *existing = attribute;
        } else {
            self.0.push(attribute);
        }
        self
    }

    /// Set the value at index 0 of `name`
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) -> &mut Self {
        self.set_attribute(Attribute::new(name, value))
    }

    /// Append a value of `name` at the next free index
    pub fn add(&mut self, name: &str, value: impl Into<AttributeValue>) -> KmipResult<&mut Self> {
        let last = self
            .0
            .iter()
            .filter(|a| a.name == name)
            .map(|a| a.index.unwrap_or(0))
            .max();
        let attribute = Attribute::new(name, value);
        match last {
            None => self.0.push(attribute),
            Some(last) => {
                let next = last.checked_add(1).ok_or_else(|| {
                    KmipError::Kmip(
                        ResultReason::Index_Out_Of_Bounds,
                        format!("no free index left for attribute {name}"),
                    )
                })?;
                self.0.push(attribute.with_index(next));
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.get_indexed(name, 0)
    }

    #[must_use]
    pub fn get_indexed(&self, name: &str, index: i32) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|a| same_slot(a, name, index))
            .map(|a| &a.value)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AttributeValue> {
        self.0.iter().filter(move |a| a.name == name).map(|a| &a.value)
    }

    /// Remove every value of `name`
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|a| a.name != name);
    }

    /// Overwrite the attributes of `self` with those of `other`
    pub fn merge(&mut self, other: &Self) {
        for attribute in other.iter() {
            self.set_attribute(attribute.clone());
        }
    }

    fn enumeration<E: KmipEnumeration>(&self, name: &str) -> Option<E> {
        match self.get(name)? {
            AttributeValue::Enumeration(v) => E::from_u32(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn unique_identifier(&self) -> Option<&str> {
        match self.get(UNIQUE_IDENTIFIER)? {
            AttributeValue::TextString(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn object_type(&self) -> Option<ObjectType> {
        self.enumeration(OBJECT_TYPE)
    }

    #[must_use]
    pub fn cryptographic_algorithm(&self) -> Option<CryptographicAlgorithm> {
        self.enumeration(CRYPTOGRAPHIC_ALGORITHM)
    }

    #[must_use]
    pub fn cryptographic_length(&self) -> Option<i32> {
        match self.get(CRYPTOGRAPHIC_LENGTH)? {
            AttributeValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn cryptographic_usage_mask(&self) -> Option<CryptographicUsageMask> {
        match self.get(CRYPTOGRAPHIC_USAGE_MASK)? {
            AttributeValue::Integer(v) => Some(CryptographicUsageMask::from_bits_retain(
                u32::from_be_bytes(v.to_be_bytes()),
            )),
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> Option<State> {
        self.enumeration(STATE)
    }

    /// The first name of the object
    #[must_use]
    pub fn name(&self) -> Option<Name> {
        self.get(NAME)?.to_object::<Name>(Tag::Name).ok()
    }

    /// Encode the attributes as children of a `TemplateAttribute` structure
    pub fn to_template_attribute(&self, policy: AttributePolicy) -> KmipResult<TTLV> {
        Ok(TTLV::structure(
            Tag::TemplateAttribute,
            self.to_ttlv_items(policy)?,
        ))
    }

    /// Encode each attribute as an `Attribute` structure
    pub fn to_ttlv_items(&self, policy: AttributePolicy) -> KmipResult<Vec<TTLV>> {
        self.0.iter().map(|a| a.to_ttlv_with(policy)).collect()
    }

    /// Collect the `Attribute` structures among `items`, ignoring the other tags
    pub fn from_ttlv_items(items: &[TTLV], policy: AttributePolicy) -> KmipResult<Self> {
        let name = Tag::Attribute.to_string();
        let mut attributes = Self::new();
        for item in items.iter().filter(|item| item.tag == name) {
            attributes.set_attribute(Attribute::from_ttlv_with(item, policy)?);
        }
        Ok(attributes)
    }

    pub fn from_template_attribute(ttlv: &TTLV, policy: AttributePolicy) -> KmipResult<Self> {
        Self::from_ttlv_items(ttlv.children(Tag::TemplateAttribute)?, policy)
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for attribute in iter {
            attributes.set_attribute(attribute);
        }
        attributes
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|a| a.name.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{
        Attribute, AttributePolicy, AttributeValue, Attributes, CRYPTOGRAPHIC_ALGORITHM,
        CRYPTOGRAPHIC_LENGTH, CRYPTOGRAPHIC_USAGE_MASK, NAME, STATE,
    };
    use crate::{
        KmipError,
        kmip_data_structures::Name,
        kmip_types::{
            CryptographicAlgorithm, CryptographicUsageMask, NameType, ResultReason, State, Tag,
        },
        ttlv::{FromTtlv, TTLV, TTLValue, ToTtlv},
    };

    #[test]
    fn test_attribute_encoding() {
        let attribute = Attribute::new(
            CRYPTOGRAPHIC_ALGORITHM,
            AttributeValue::enumeration(CryptographicAlgorithm::AES),
        );
        let ttlv = attribute.to_ttlv().unwrap();
        assert_eq!(
            ttlv,
            TTLV::structure(
                Tag::Attribute,
                vec![
                    TTLV::text_string(Tag::AttributeName, "Cryptographic Algorithm"),
                    TTLV::enumeration(Tag::AttributeValue, CryptographicAlgorithm::AES),
                ]
            )
        );
        let bytes = ttlv.to_bytes().unwrap();
        let (decoded, _) = TTLV::from_bytes(&bytes).unwrap();
        assert_eq!(Attribute::from_ttlv(&decoded).unwrap(), attribute);
    }

    #[test]
    fn test_index_is_encoded_when_present() {
        let attribute = Attribute::new("Object Group", "group").with_index(2);
        let ttlv = attribute.to_ttlv().unwrap();
        let TTLValue::Structure(items) = &ttlv.value else {
            panic!("not a structure")
        };
        assert_eq!(items[1], TTLV::integer(Tag::AttributeIndex, 2));
        assert_eq!(Attribute::from_ttlv(&ttlv).unwrap(), attribute);
    }

    #[test]
    fn test_type_mismatch_on_encode_and_decode() {
        let attribute = Attribute::new(CRYPTOGRAPHIC_LENGTH, "128");
        assert_eq!(
            attribute.to_ttlv().unwrap_err(),
            KmipError::AttributeTypeMismatch {
                name: "Cryptographic Length".to_owned(),
                expected: "Integer".to_owned(),
                actual: "TextString".to_owned(),
            }
        );

        let ttlv = TTLV::structure(
            Tag::Attribute,
            vec![
                TTLV::text_string(Tag::AttributeName, "State"),
                TTLV::integer(Tag::AttributeValue, 1),
            ],
        );
        assert!(matches!(
            Attribute::from_ttlv(&ttlv),
            Err(KmipError::AttributeTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_attributes_need_passthrough() {
        let custom = Attribute::new("x-purpose", "backup");
        assert_eq!(
            custom.to_ttlv().unwrap_err(),
            KmipError::UnknownAttribute("x-purpose".to_owned())
        );
        let ttlv = custom.to_ttlv_with(AttributePolicy::Passthrough).unwrap();
        assert!(Attribute::from_ttlv(&ttlv).is_err());
        assert_eq!(
            Attribute::from_ttlv_with(&ttlv, AttributePolicy::Passthrough).unwrap(),
            custom
        );
    }

    #[test]
    fn test_attributes_set_and_add() {
        let mut attributes = Attributes::new();
        attributes
            .set(CRYPTOGRAPHIC_LENGTH, 128)
            .set(CRYPTOGRAPHIC_LENGTH, 256)
            .set(
                CRYPTOGRAPHIC_USAGE_MASK,
                CryptographicUsageMask::Encrypt | CryptographicUsageMask::Decrypt,
            )
            .set(STATE, AttributeValue::enumeration(State::PreActive))
            .add("Object Group", "a")
            .unwrap()
            .add("Object Group", "b")
            .unwrap();
        assert_eq!(attributes.len(), 5);
        assert_eq!(attributes.cryptographic_length(), Some(256));
        assert_eq!(
            attributes.cryptographic_usage_mask(),
            Some(CryptographicUsageMask::Encrypt | CryptographicUsageMask::Decrypt)
        );
        assert_eq!(attributes.state(), Some(State::PreActive));
        assert_eq!(
            attributes.get_indexed("Object Group", 1),
            Some(&AttributeValue::from("b"))
        );
        assert_eq!(attributes.get_all("Object Group").count(), 2);

        let template = attributes
            .to_template_attribute(AttributePolicy::Strict)
            .unwrap();
        let decoded =
            Attributes::from_template_attribute(&template, AttributePolicy::Strict).unwrap();
        assert_eq!(decoded, attributes);

        attributes.remove("Object Group");
        assert_eq!(attributes.len(), 3);
    }

    #[test]
    fn test_add_past_the_last_index_fails() {
        let mut attributes: Attributes =
            std::iter::once(Attribute::new("Object Group", "last").with_index(i32::MAX)).collect();
        let err = attributes.add("Object Group", "one more").unwrap_err();
        assert_eq!(err.result_reason(), ResultReason::Index_Out_Of_Bounds);
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn test_structured_name() {
        let name = Name {
            name_value: "demo-key".to_owned(),
            name_type: NameType::UninterpretedTextString,
        };
        let mut attributes = Attributes::new();
        attributes.set(NAME, AttributeValue::structure(&name).unwrap());
        assert_eq!(attributes.name(), Some(name));
    }
}
