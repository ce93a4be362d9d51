use std::num::NonZeroU32;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::pbkdf2;
use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))
}

/// `len` random bytes, base64url encoded. 24 bytes give a 32 character key.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(base64url_encode(&bytes))
}

const PASSWORD_HASH_SCHEME: &str = "pbkdf2-sha256";
const PASSWORD_SALT_LEN: usize = 16;
const PASSWORD_HASH_LEN: usize = 32;

#[cfg(not(test))]
const PBKDF2_ITERATIONS: u32 = 100_000;
#[cfg(test)]
const PBKDF2_ITERATIONS: u32 = 1_000;

/// Hash `password` as `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut salt = [0u8; PASSWORD_SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| UtilError::Crypto("Failed to generate salt".to_string()))?;

    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| UtilError::Crypto("Iteration count must be positive".to_string()))?;
    let mut hash = [0u8; PASSWORD_HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{PASSWORD_HASH_SCHEME}${iterations}${}${}",
        base64url_encode(&salt),
        base64url_encode(&hash)
    ))
}

/// Constant-time check of `password` against a hash from [`hash_password`].
/// Malformed hashes never match.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        tracing::warn!("Malformed password hash");
        return false;
    };

    if scheme != PASSWORD_HASH_SCHEME {
        tracing::warn!("Unsupported password hash scheme: {}", scheme);
        return false;
    }

    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (base64url_decode(salt), base64url_decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_random_string_length_and_uniqueness() {
        let a = gen_random_string(24).unwrap();
        let b = gen_random_string(24).unwrap();

        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("secret").unwrap();

        assert!(hash.starts_with("pbkdf2-sha256$"));
        assert!(verify_password(&hash, "secret"));
        assert!(!verify_password(&hash, "Secret"));
        assert!(!verify_password(&hash, ""));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("secret").unwrap();
        let b = hash_password("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        assert!(!verify_password("", "secret"));
        assert!(!verify_password("sha1$abc$def", "secret"));
        assert!(!verify_password("pbkdf2-sha256$0$AAAA$AAAA", "secret"));
        assert!(!verify_password("pbkdf2-sha256$1000$!!!$AAAA", "secret"));
        assert!(!verify_password("pbkdf2-sha256$1000$AAAA$AAAA$extra", "secret"));
    }

    #[test]
    fn test_base64url_round_trip() {
        let encoded = base64url_encode(b"ilog");
        assert_eq!(base64url_decode(&encoded).unwrap(), b"ilog");
        assert!(base64url_decode("not base64!").is_err());
    }
}
