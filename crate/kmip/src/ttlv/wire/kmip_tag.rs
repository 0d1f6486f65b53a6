use crate::{
    kmip_types::{KmipEnumeration, Tag},
    ttlv::TtlvError,
};

/// Largest value a 3-byte tag can hold
const MAX_TAG: u32 = 0x00FF_FFFF;

/// Resolve a tag name, or its `0x`-prefixed hexadecimal form, to its 3-byte value
pub(crate) fn tag_value(tag_str: &str) -> Result<u32, TtlvError> {
    if let Some(hex) = tag_str
        .strip_prefix("0x")
        .or_else(|| tag_str.strip_prefix("0X"))
    {
        let value = u32::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|_e| TtlvError::Encoding(format!("invalid hexadecimal tag: {tag_str}")))?;
        if value > MAX_TAG {
            return Err(TtlvError::Encoding(format!(
                "tag does not fit in 3 bytes: {tag_str}"
            )))
        }
        return Ok(value)
    }
    tag_str
        .parse::<Tag>()
        .map(KmipEnumeration::to_u32)
        .map_err(|_e| TtlvError::Encoding(format!("Unknown tag: {tag_str}")))
}

/// Resolve a 3-byte tag value to its name.
///
/// Unknown values are rejected in strict mode and rendered
/// in hexadecimal otherwise.
pub(crate) fn tag_name(tag_value: u32, strict: bool) -> Result<String, TtlvError> {
    match Tag::from_u32(tag_value) {
        Some(tag) => Ok(tag.to_string()),
        None if strict => Err(TtlvError::MalformedMessage(format!(
            "Unknown tag value: 0x{tag_value:06x}"
        ))),
        None => Ok(format!("0x{tag_value:06x}")),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::{tag_name, tag_value};

    #[test]
    fn test_tag_names_and_values() {
        assert_eq!(tag_value("BatchCount").unwrap(), 0x42_000D);
        assert_eq!(tag_name(0x42_000D, true).unwrap(), "BatchCount");
        assert_eq!(tag_value("0x540001").unwrap(), 0x54_0001);
        assert_eq!(tag_name(0x54_0001, false).unwrap(), "0x540001");
        tag_name(0x54_0001, true).unwrap_err();
        tag_value("NoSuchTag").unwrap_err();
        tag_value("0x1000000").unwrap_err();
    }
}
