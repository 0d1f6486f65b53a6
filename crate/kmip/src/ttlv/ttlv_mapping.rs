use time::OffsetDateTime;

use super::{TTLV, TTLValue};
use crate::{
    error::KmipError,
    kmip_types::{KmipEnumeration, Tag},
};

/// Conversion of a KMIP object to its TTLV tree
pub trait ToTtlv {
    fn to_ttlv(&self) -> Result<TTLV, KmipError>;
}

/// Conversion of a TTLV tree to a KMIP object
pub trait FromTtlv: Sized {
    fn from_ttlv(ttlv: &TTLV) -> Result<Self, KmipError>;
}

pub fn to_ttlv<T: ToTtlv>(value: &T) -> Result<TTLV, KmipError> {
    value.to_ttlv()
}

pub fn from_ttlv<T: FromTtlv>(ttlv: &TTLV) -> Result<T, KmipError> {
    T::from_ttlv(ttlv)
}

fn wrong_type(ttlv: &TTLV, expected: &str) -> KmipError {
    KmipError::MalformedMessage(format!(
        "{} must be a {expected}, found {}",
        ttlv.tag,
        ttlv.value.type_name()
    ))
}

/// Typed read access to the children of a TTLV structure.
///
/// Lookups are by tag; KMIP field order is enforced by the writers,
/// not by the readers.
pub struct TtlvFields<'a> {
    parent: &'a str,
    items: &'a [TTLV],
}

impl<'a> TtlvFields<'a> {
    pub fn of(ttlv: &'a TTLV, expected: Tag) -> Result<Self, KmipError> {
        Ok(Self {
            parent: &ttlv.tag,
            items: ttlv.children(expected)?,
        })
    }

    #[must_use]
    pub fn items(&self) -> &'a [TTLV] {
        self.items
    }

    #[must_use]
    pub fn find(&self, tag: Tag) -> Option<&'a TTLV> {
        let name = tag.to_string();
        self.items.iter().find(|item| item.tag == name)
    }

    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &'a TTLV> + use<'a> {
        let name = tag.to_string();
        self.items.iter().filter(move |item| item.tag == name)
    }

    pub fn required(&self, tag: Tag) -> Result<&'a TTLV, KmipError> {
        self.find(tag).ok_or_else(|| {
            KmipError::MalformedMessage(format!("{}: missing field {tag}", self.parent))
        })
    }

    pub fn text(&self, tag: Tag) -> Result<String, KmipError> {
        as_text(self.required(tag)?)
    }

    pub fn opt_text(&self, tag: Tag) -> Result<Option<String>, KmipError> {
        self.find(tag).map(as_text).transpose()
    }

    pub fn bytes(&self, tag: Tag) -> Result<Vec<u8>, KmipError> {
        as_bytes(self.required(tag)?)
    }

    pub fn opt_bytes(&self, tag: Tag) -> Result<Option<Vec<u8>>, KmipError> {
        self.find(tag).map(as_bytes).transpose()
    }

    pub fn integer(&self, tag: Tag) -> Result<i32, KmipError> {
        as_integer(self.required(tag)?)
    }

    pub fn opt_integer(&self, tag: Tag) -> Result<Option<i32>, KmipError> {
        self.find(tag).map(as_integer).transpose()
    }

    pub fn opt_long_integer(&self, tag: Tag) -> Result<Option<i64>, KmipError> {
        self.find(tag)
            .map(|ttlv| match &ttlv.value {
                TTLValue::LongInteger(v) => Ok(*v),
                _ => Err(wrong_type(ttlv, "LongInteger")),
            })
            .transpose()
    }

    pub fn opt_boolean(&self, tag: Tag) -> Result<Option<bool>, KmipError> {
        self.find(tag)
            .map(|ttlv| match &ttlv.value {
                TTLValue::Boolean(v) => Ok(*v),
                _ => Err(wrong_type(ttlv, "Boolean")),
            })
            .transpose()
    }

    pub fn opt_date_time(&self, tag: Tag) -> Result<Option<OffsetDateTime>, KmipError> {
        self.find(tag)
            .map(|ttlv| match &ttlv.value {
                TTLValue::DateTime(v) => Ok(*v),
                _ => Err(wrong_type(ttlv, "DateTime")),
            })
            .transpose()
    }

    pub fn enumeration<E: KmipEnumeration>(&self, tag: Tag) -> Result<E, KmipError> {
        as_enumeration(self.required(tag)?)
    }

    pub fn opt_enumeration<E: KmipEnumeration>(&self, tag: Tag) -> Result<Option<E>, KmipError> {
        self.find(tag).map(as_enumeration).transpose()
    }

    pub fn opt_object<T: FromTtlv>(&self, tag: Tag) -> Result<Option<T>, KmipError> {
        self.find(tag).map(T::from_ttlv).transpose()
    }
}

pub(crate) fn as_text(ttlv: &TTLV) -> Result<String, KmipError> {
    match &ttlv.value {
        TTLValue::TextString(v) => Ok(v.clone()),
        _ => Err(wrong_type(ttlv, "TextString")),
    }
}

pub(crate) fn as_bytes(ttlv: &TTLV) -> Result<Vec<u8>, KmipError> {
    match &ttlv.value {
        TTLValue::ByteString(v) => Ok(v.clone()),
        _ => Err(wrong_type(ttlv, "ByteString")),
    }
}

pub(crate) fn as_integer(ttlv: &TTLV) -> Result<i32, KmipError> {
    match &ttlv.value {
        TTLValue::Integer(v) => Ok(*v),
        _ => Err(wrong_type(ttlv, "Integer")),
    }
}

pub(crate) fn as_enumeration<E: KmipEnumeration>(ttlv: &TTLV) -> Result<E, KmipError> {
    match &ttlv.value {
        TTLValue::Enumeration(variant) => E::from_u32(variant.value).ok_or_else(|| {
            KmipError::MalformedMessage(format!(
                "{}: unknown enumeration value 0x{:08x}",
                ttlv.tag, variant.value
            ))
        }),
        _ => Err(wrong_type(ttlv, "Enumeration")),
    }
}
