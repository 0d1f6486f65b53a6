//! AES encryption for the test server, on top of `openssl::symm`.
//!
//! Block padding is applied here rather than by OpenSSL so that every KMIP
//! padding method behaves the same way.
use kmip_proto::{
    KmipError, KmipResult,
    kmip_types::{BlockCipherMode, PaddingMethod, ResultReason},
};
use openssl::{
    error::ErrorStack,
    rand::rand_bytes,
    symm::{Cipher, Crypter, Mode},
};
use zeroize::Zeroizing;

pub(crate) const AES_BLOCK_SIZE: usize = 16;
const GCM_IV_LENGTH: usize = 12;
const GCM_TAG_LENGTH: usize = 16;

fn crypto_error(e: ErrorStack) -> KmipError {
    KmipError::Kmip(ResultReason::Cryptographic_Failure, e.to_string())
}

fn unsupported(what: String) -> KmipError {
    KmipError::Kmip(ResultReason::Bad_Cryptographic_Parameters, what)
}

pub(crate) fn random_bytes(length: usize) -> KmipResult<Vec<u8>> {
    let mut bytes = vec![0_u8; length];
    rand_bytes(&mut bytes).map_err(crypto_error)?;
    Ok(bytes)
}

/// Length of the IV the server generates for `mode`
pub(crate) const fn iv_length(mode: BlockCipherMode) -> usize {
    match mode {
        BlockCipherMode::GCM => GCM_IV_LENGTH,
        _ => AES_BLOCK_SIZE,
    }
}

/// Padding used when the request names none
pub(crate) const fn default_padding(mode: BlockCipherMode) -> PaddingMethod {
    if mode.is_block_aligned() {
        PaddingMethod::PKCS5
    } else {
        PaddingMethod::None
    }
}

fn aes_cipher(mode: BlockCipherMode, key_length: usize) -> KmipResult<Cipher> {
    Ok(match (mode, key_length) {
        (BlockCipherMode::CBC, 16) => Cipher::aes_128_cbc(),
        (BlockCipherMode::CBC, 24) => Cipher::aes_192_cbc(),
        (BlockCipherMode::CBC, 32) => Cipher::aes_256_cbc(),
        (BlockCipherMode::ECB, 16) => Cipher::aes_128_ecb(),
        (BlockCipherMode::ECB, 24) => Cipher::aes_192_ecb(),
        (BlockCipherMode::ECB, 32) => Cipher::aes_256_ecb(),
        (BlockCipherMode::CTR, 16) => Cipher::aes_128_ctr(),
        (BlockCipherMode::CTR, 24) => Cipher::aes_192_ctr(),
        (BlockCipherMode::CTR, 32) => Cipher::aes_256_ctr(),
        (BlockCipherMode::GCM, 16) => Cipher::aes_128_gcm(),
        (BlockCipherMode::GCM, 24) => Cipher::aes_192_gcm(),
        (BlockCipherMode::GCM, 32) => Cipher::aes_256_gcm(),
        _ => {
            return Err(unsupported(format!(
                "AES {mode} with a {} bits key is not supported",
                key_length * 8
            )))
        }
    })
}

fn pad(data: &[u8], padding: PaddingMethod) -> KmipResult<Zeroizing<Vec<u8>>> {
    let mut padded = Zeroizing::new(data.to_vec());
    let count = AES_BLOCK_SIZE - data.len() % AES_BLOCK_SIZE;
    let count_byte = u8::try_from(count)?;
    match padding {
        PaddingMethod::None => {
            if data.len() % AES_BLOCK_SIZE != 0 {
                return Err(unsupported(
                    "data must be a multiple of the block size when no padding is used".to_owned(),
                ))
            }
        }
        PaddingMethod::PKCS5 => padded.extend(std::iter::repeat_n(count_byte, count)),
        PaddingMethod::ANSI_X923 => {
            padded.extend(std::iter::repeat_n(0, count - 1));
            padded.push(count_byte);
        }
        PaddingMethod::ISO10126 => {
            padded.extend(random_bytes(count - 1)?);
            padded.push(count_byte);
        }
        other => return Err(unsupported(format!("padding method {other} is not supported"))),
    }
    Ok(padded)
}

fn unpad(mut data: Zeroizing<Vec<u8>>, padding: PaddingMethod) -> KmipResult<Zeroizing<Vec<u8>>> {
    if padding == PaddingMethod::None {
        return Ok(data)
    }
    let bad_padding =
        || KmipError::Kmip(ResultReason::Cryptographic_Failure, "invalid padding".to_owned());
    let count = usize::from(*data.last().ok_or_else(bad_padding)?);
    if count == 0 || count > AES_BLOCK_SIZE || count > data.len() {
        return Err(bad_padding())
    }
    let start = data.len() - count;
    let filler = data.get(start..data.len() - 1).ok_or_else(bad_padding)?;
    let valid = match padding {
        PaddingMethod::PKCS5 => filler.iter().all(|b| usize::from(*b) == count),
        PaddingMethod::ANSI_X923 => filler.iter().all(|b| *b == 0),
        PaddingMethod::ISO10126 => true,
        other => return Err(unsupported(format!("padding method {other} is not supported"))),
    };
    if !valid {
        return Err(bad_padding())
    }
    data.truncate(start);
    Ok(data)
}

fn run(crypter: &mut Crypter, cipher: Cipher, input: &[u8]) -> KmipResult<Vec<u8>> {
    let mut output = vec![0_u8; input.len() + cipher.block_size()];
    let count = crypter.update(input, &mut output).map_err(crypto_error)?;
    let rest = crypter
        .finalize(output.get_mut(count..).ok_or_else(|| {
            KmipError::Kmip(
                ResultReason::Cryptographic_Failure,
                "finalize: output buffer too short".to_owned(),
            )
        })?)
        .map_err(crypto_error)?;
    output.truncate(count + rest);
    Ok(output)
}

/// Encrypt and return the ciphertext with the authentication tag of AEAD modes.
pub(crate) fn encrypt(
    key: &[u8],
    mode: BlockCipherMode,
    padding: PaddingMethod,
    iv: Option<&[u8]>,
    aad: Option<&[u8]>,
    plaintext: &[u8],
) -> KmipResult<(Vec<u8>, Option<Vec<u8>>)> {
    let cipher = aes_cipher(mode, key.len())?;
    let input = if mode.is_block_aligned() {
        pad(plaintext, padding)?
    } else {
        Zeroizing::new(plaintext.to_vec())
    };
    let mut crypter = Crypter::new(cipher, Mode::Encrypt, key, iv).map_err(crypto_error)?;
    crypter.pad(false);
    if let Some(aad) = aad {
        crypter.aad_update(aad).map_err(crypto_error)?;
    }
    let ciphertext = run(&mut crypter, cipher, &input)?;
    if mode == BlockCipherMode::GCM {
        let mut tag = vec![0_u8; GCM_TAG_LENGTH];
        crypter.get_tag(&mut tag).map_err(crypto_error)?;
        return Ok((ciphertext, Some(tag)))
    }
    Ok((ciphertext, None))
}

pub(crate) fn decrypt(
    key: &[u8],
    mode: BlockCipherMode,
    padding: PaddingMethod,
    iv: Option<&[u8]>,
    aad: Option<&[u8]>,
    tag: Option<&[u8]>,
    ciphertext: &[u8],
) -> KmipResult<Zeroizing<Vec<u8>>> {
    let cipher = aes_cipher(mode, key.len())?;
    if mode.is_block_aligned() && ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(unsupported(
            "ciphertext must be a multiple of the block size".to_owned(),
        ))
    }
    let mut crypter = Crypter::new(cipher, Mode::Decrypt, key, iv).map_err(crypto_error)?;
    crypter.pad(false);
    if mode == BlockCipherMode::GCM {
        let tag = tag.ok_or_else(|| {
            KmipError::Kmip(
                ResultReason::Missing_Data,
                "GCM decryption needs the authenticated encryption tag".to_owned(),
            )
        })?;
        crypter.set_tag(tag).map_err(crypto_error)?;
    }
    if let Some(aad) = aad {
        crypter.aad_update(aad).map_err(crypto_error)?;
    }
    let plaintext = Zeroizing::new(run(&mut crypter, cipher, ciphertext)?);
    if mode.is_block_aligned() {
        return unpad(plaintext, padding)
    }
    Ok(plaintext)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use kmip_proto::kmip_types::{BlockCipherMode, PaddingMethod};

    use super::{decrypt, encrypt, random_bytes};

    #[test]
    fn test_ansi_x923_padding() {
        let key = random_bytes(16).unwrap();
        let iv = random_bytes(16).unwrap();
        let message = b"A message padded with ANSI X9.23";
        for length in [0, 1, 15, 16, 17, message.len()] {
            let plaintext = &message[..length];
            let (ciphertext, tag) = encrypt(
                &key,
                BlockCipherMode::CBC,
                PaddingMethod::ANSI_X923,
                Some(&iv),
                None,
                plaintext,
            )
            .unwrap();
            assert!(tag.is_none());
            assert_eq!(ciphertext.len(), (length / 16 + 1) * 16);
            let decrypted = decrypt(
                &key,
                BlockCipherMode::CBC,
                PaddingMethod::ANSI_X923,
                Some(&iv),
                None,
                None,
                &ciphertext,
            )
            .unwrap();
            assert_eq!(decrypted.as_slice(), plaintext);
        }
    }

    #[test]
    fn test_padding_mismatch_is_detected() {
        let key = random_bytes(32).unwrap();
        let iv = random_bytes(16).unwrap();
        let (ciphertext, _) = encrypt(
            &key,
            BlockCipherMode::CBC,
            PaddingMethod::PKCS5,
            Some(&iv),
            None,
            b"0123456789",
        )
        .unwrap();
        // PKCS#5 filler bytes are not zeros
        decrypt(
            &key,
            BlockCipherMode::CBC,
            PaddingMethod::ANSI_X923,
            Some(&iv),
            None,
            None,
            &ciphertext,
        )
        .unwrap_err();
    }

    #[test]
    fn test_no_padding_needs_whole_blocks() {
        let key = random_bytes(16).unwrap();
        encrypt(&key, BlockCipherMode::ECB, PaddingMethod::None, None, None, b"short")
            .unwrap_err();
        let (ciphertext, _) =
            encrypt(&key, BlockCipherMode::ECB, PaddingMethod::None, None, None, &[7_u8; 32])
                .unwrap();
        assert_eq!(ciphertext.len(), 32);
    }

    #[test]
    fn test_gcm_tag() {
        let key = random_bytes(16).unwrap();
        let iv = random_bytes(12).unwrap();
        let (ciphertext, tag) = encrypt(
            &key,
            BlockCipherMode::GCM,
            PaddingMethod::None,
            Some(&iv),
            Some(b"header"),
            b"authenticated",
        )
        .unwrap();
        let tag = tag.unwrap();
        assert_eq!(tag.len(), 16);
        let plaintext = decrypt(
            &key,
            BlockCipherMode::GCM,
            PaddingMethod::None,
            Some(&iv),
            Some(b"header"),
            Some(&tag),
            &ciphertext,
        )
        .unwrap();
        assert_eq!(plaintext.as_slice(), b"authenticated");

        let mut bad_tag = tag;
        bad_tag[0] ^= 1;
        decrypt(
            &key,
            BlockCipherMode::GCM,
            PaddingMethod::None,
            Some(&iv),
            Some(b"header"),
            Some(&bad_tag),
            &ciphertext,
        )
        .unwrap_err();
    }
}
