//! JSON rendering of TTLV trees following the KMIP JSON profile
//! (`{"tag": ..., "type": ..., "value": ...}`), used for diagnostics.

use serde::{
    Serialize,
    ser::{self, SerializeStruct, Serializer},
};
use time::format_description::well_known::Iso8601;

use super::ttlv_struct::{KmipEnumerationVariant, TTLV, TTLValue};

impl Serialize for TTLV {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        fn _serialize<S, T>(
            serializer: S,
            tag: &str,
            typ: &str,
            value: &T,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            T: Serialize + ?Sized,
        {
            let mut ttlv = serializer.serialize_struct("TTLV", 3)?;
            ttlv.serialize_field("tag", tag)?;
            ttlv.serialize_field("type", typ)?;
            ttlv.serialize_field("value", value)?;
            ttlv.end()
        }

        let typ = self.value.type_name();
        match &self.value {
            TTLValue::Structure(v) => _serialize(serializer, &self.tag, typ, v),
            TTLValue::Integer(v) => _serialize(serializer, &self.tag, typ, v),
            // JS numbers cannot hold every 64-bit value
            TTLValue::LongInteger(v) => _serialize(
                serializer,
                &self.tag,
                typ,
                &format!("0x{}", hex::encode_upper(v.to_be_bytes())),
            ),
            TTLValue::BigInteger(v) => _serialize(
                serializer,
                &self.tag,
                typ,
                &format!("0x{}", hex::encode_upper(v.to_bytes_be())),
            ),
            TTLValue::Enumeration(v) => _serialize(serializer, &self.tag, typ, v),
            TTLValue::Boolean(v) => _serialize(serializer, &self.tag, typ, v),
            TTLValue::TextString(v) => _serialize(serializer, &self.tag, typ, v),
            TTLValue::ByteString(v) => {
                _serialize(serializer, &self.tag, typ, &hex::encode_upper(v))
            }
            TTLValue::DateTime(v) => _serialize(
                serializer,
                &self.tag,
                typ,
                &v.format(&Iso8601::DEFAULT).map_err(|err| {
                    ser::Error::custom(format!("Cannot format DateTime {v} into ISO8601: {err}"))
                })?,
            ),
            TTLValue::Interval(v) => _serialize(serializer, &self.tag, typ, v),
            TTLValue::DateTimeExtended(v) => _serialize(
                serializer,
                &self.tag,
                typ,
                &format!("0x{}", hex::encode_upper(v.to_be_bytes())),
            ),
            TTLValue::Opaque { item_type, bytes } => _serialize(
                serializer,
                &self.tag,
                &format!("0x{item_type:02x}"),
                &hex::encode_upper(bytes),
            ),
        }
    }
}

/// Enumerations render by name when it is known, by hexadecimal value otherwise
impl Serialize for KmipEnumerationVariant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.name.is_empty() {
            serializer.serialize_str(&format!("0x{:08X}", self.value))
        } else {
            serializer.serialize_str(&self.name)
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        kmip_types::{CryptographicAlgorithm, Tag},
        ttlv::TTLV,
    };

    #[test]
    fn test_json_rendering() {
        let ttlv = TTLV::structure(
            Tag::Attribute,
            vec![
                TTLV::text_string(Tag::AttributeName, "Cryptographic Algorithm"),
                TTLV::enumeration(Tag::AttributeValue, CryptographicAlgorithm::AES),
                TTLV::byte_string(Tag::IVCounterNonce, &[0xde, 0xad]),
            ],
        );
        let value = serde_json::to_value(&ttlv).unwrap();
        assert_eq!(
            value,
            json!({
                "tag": "Attribute",
                "type": "Structure",
                "value": [
                    {"tag": "AttributeName", "type": "TextString", "value": "Cryptographic Algorithm"},
                    {"tag": "AttributeValue", "type": "Enumeration", "value": "AES"},
                    {"tag": "IVCounterNonce", "type": "ByteString", "value": "DEAD"},
                ]
            })
        );
    }
}
