//! Phone-number crypto: encryption at rest and the one-way lookup hash.
//!
//! Phone numbers are only ever persisted as secretbox ciphertext plus a
//! deterministic SHA-256 lookup hash. The hash supports equality lookups
//! (inbound sender resolution, conflict detection) without decrypting any
//! stored value.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use xsalsa20poly1305::aead::{Aead, KeyInit};
use xsalsa20poly1305::{Key, Nonce, XSalsa20Poly1305};

const SECRETBOX_KEY_LEN: usize = 32;
const SECRETBOX_NONCE_LEN: usize = 24;

/// Crypto failures. Decrypt failures on read are treated by callers as
/// corrupted state (connection effectively absent), never as a crash.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("missing phone cipher key")]
    MissingKey,
    #[error("invalid phone cipher key length: {0}")]
    InvalidKeyLength(usize),
    #[error("invalid ciphertext length: {0}")]
    InvalidCiphertextLength(usize),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("ciphertext is not valid UTF-8")]
    Utf8,
    #[error("crypto failure")]
    Aead,
}

/// Symmetric authenticated encryption for phone numbers at rest.
#[derive(Clone)]
pub struct PhoneCipher {
    key: [u8; SECRETBOX_KEY_LEN],
}

impl PhoneCipher {
    /// Load the key from an environment variable (hex or base64 encoded).
    pub fn from_env(var: &str) -> Result<Self, CryptoError> {
        let value = std::env::var(var).map_err(|_| CryptoError::MissingKey)?;
        Self::from_key_str(&value)
    }

    /// Build from a hex- or base64-encoded 32-byte key string.
    pub fn from_key_str(value: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            key: decode_key(value)?,
        })
    }

    /// Encrypt a phone number for storage. Output is base64(nonce ‖ box).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce_bytes = [0u8; SECRETBOX_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Aead)?;
        let mut out = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a stored phone number.
    pub fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let input = BASE64.decode(stored.trim())?;
        if input.len() < SECRETBOX_NONCE_LEN {
            return Err(CryptoError::InvalidCiphertextLength(input.len()));
        }
        let (nonce_bytes, ciphertext) = input.split_at(SECRETBOX_NONCE_LEN);
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Aead)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }
}

impl std::fmt::Debug for PhoneCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("PhoneCipher").finish_non_exhaustive()
    }
}

/// Deterministic one-way lookup hash of a phone number (hex SHA-256 of the
/// normalized form). Not reversible; used for equality lookups only.
pub fn lookup_hash(phone: &str) -> String {
    let normalized = normalize_number(phone);
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

/// Normalize a phone number for hashing and comparison: strip separators,
/// keep a single leading `+`.
pub fn normalize_number(phone: &str) -> String {
    let mut out = String::with_capacity(phone.len());
    for c in phone.trim().chars() {
        match c {
            '+' if out.is_empty() => out.push('+'),
            '0'..='9' => out.push(c),
            _ => {}
        }
    }
    out
}

/// Mask a phone number for display: country prefix and last two digits kept.
///
/// `+15550001234` → `+1••••••••34`. Short or malformed values mask fully.
pub fn mask_number(phone: &str) -> String {
    let normalized = normalize_number(phone);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < 6 {
        return "••••".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    let masked = "•".repeat(chars.len() - 4);
    format!("{}{}{}", head, masked, tail)
}

fn decode_key(value: &str) -> Result<[u8; SECRETBOX_KEY_LEN], CryptoError> {
    let trimmed = value.trim();
    let bytes = if let Some(hex_value) = trimmed.strip_prefix("hex:") {
        hex::decode(hex_value)?
    } else if is_probably_hex(trimmed) {
        hex::decode(trimmed)?
    } else {
        BASE64.decode(trimmed)?
    };

    if bytes.len() != SECRETBOX_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength(bytes.len()));
    }

    let mut key = [0u8; SECRETBOX_KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn is_probably_hex(value: &str) -> bool {
    value.len() == SECRETBOX_KEY_LEN * 2 && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> PhoneCipher {
        PhoneCipher::from_key_str(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = test_cipher();
        let stored = cipher.encrypt("+15550001234").unwrap();
        assert_ne!(stored, "+15550001234");
        assert_eq!(cipher.decrypt(&stored).unwrap(), "+15550001234");
    }

    #[test]
    fn encrypt_is_nondeterministic() {
        let cipher = test_cipher();
        let a = cipher.encrypt("+15550001234").unwrap();
        let b = cipher.encrypt("+15550001234").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_garbage() {
        let cipher = test_cipher();
        assert!(cipher.decrypt("not base64 at all!").is_err());
        assert!(cipher.decrypt(&BASE64.encode(b"short")).is_err());
    }

    #[test]
    fn lookup_hash_is_deterministic_and_normalized() {
        assert_eq!(lookup_hash("+1 (555) 000-1234"), lookup_hash("+15550001234"));
        assert_ne!(lookup_hash("+15550001234"), lookup_hash("+15550001235"));
        // hex SHA-256
        assert_eq!(lookup_hash("+15550001234").len(), 64);
    }

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize_number(" +1 (555) 000-1234 "), "+15550001234");
        assert_eq!(normalize_number("555.000.1234"), "5550001234");
    }

    #[test]
    fn mask_keeps_prefix_and_tail() {
        assert_eq!(mask_number("+15550001234"), "+1••••••••34");
        assert_eq!(mask_number("+12"), "••••");
    }

    #[test]
    fn key_decoding_accepts_hex_and_base64() {
        assert!(PhoneCipher::from_key_str(&"ab".repeat(32)).is_ok());
        assert!(PhoneCipher::from_key_str(&format!("hex:{}", "cd".repeat(32))).is_ok());
        assert!(PhoneCipher::from_key_str(&BASE64.encode([7u8; 32])).is_ok());
        assert!(matches!(
            PhoneCipher::from_key_str("deadbeef"),
            Err(CryptoError::InvalidKeyLength(_) | CryptoError::Base64(_))
        ));
    }
}
