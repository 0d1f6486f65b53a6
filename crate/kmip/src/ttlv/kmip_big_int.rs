/// A wrapper struct for `num_bigint_dig::BigInt` that provides KMIP-specific encoding and decoding.
///
/// # KMIP Specification
/// Big Integers in KMIP are encoded as a sequence of eight-bit bytes, in two's complement notation,
/// transmitted big-endian. The length of the sequence must be a multiple of eight bytes, with padding
/// applied if necessary.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KmipBigInt(num_bigint_dig::BigInt);

impl From<num_bigint_dig::BigInt> for KmipBigInt {
    fn from(big_int: num_bigint_dig::BigInt) -> Self {
        Self(big_int)
    }
}

impl From<KmipBigInt> for num_bigint_dig::BigInt {
    fn from(val: KmipBigInt) -> Self {
        val.0
    }
}

impl From<i64> for KmipBigInt {
    fn from(value: i64) -> Self {
        Self(num_bigint_dig::BigInt::from(value))
    }
}

impl KmipBigInt {
    /// Encoded as a sequence of eight-bit bytes, in two's complement notation,
    /// transmitted big-endian. If the length of the sequence is not a multiple of eight bytes,
    /// then Big Integers SHALL be padded with the minimal number of leading sign-extended bytes
    /// to make the length a multiple of eight bytes.
    /// These padding bytes are part of the Item Value and SHALL be counted in the Item Length.
    #[must_use]
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let mut bytes = self.0.to_signed_bytes_be();
        let len = bytes.len();
        if len % 8 == 0 {
            return bytes
        }
        let padding = 8 - len % 8;
        let mut padded_bytes = match self.0.sign() {
            num_bigint_dig::Sign::Minus => vec![0xff_u8; padding],
            num_bigint_dig::Sign::NoSign | num_bigint_dig::Sign::Plus => vec![0_u8; padding],
        };
        padded_bytes.append(&mut bytes);
        padded_bytes
    }

    #[must_use]
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(num_bigint_dig::BigInt::from_signed_bytes_be(bytes))
    }

    #[must_use]
    pub const fn as_big_int(&self) -> &num_bigint_dig::BigInt {
        &self.0
    }
}

impl std::fmt::Display for KmipBigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
