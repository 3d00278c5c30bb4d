// Password and secret-token hashing for the identity store.
// Decision: login passwords use argon2id (memory-hard, tunable); refresh tokens and API
// keys are high-entropy random strings, so a fast SHA-256 digest is sufficient and lets
// lookup-by-hash stay a plain indexed equality query.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use sha2::{Digest, Sha256};

/// API keys are prefixed for at-a-glance identification in logs and the dashboard.
pub const API_KEY_PREFIX: &str = "mtc_";
const API_KEY_RANDOM_BYTES: usize = 32;
const REFRESH_TOKEN_RANDOM_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("password hash is malformed")]
    MalformedHash,
}

/// Hash a plaintext password for storage. Never log or persist the plaintext.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a plaintext password against a stored argon2 hash.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

/// A freshly-generated refresh token: the plaintext is returned to the caller exactly
/// once, the hash is what gets persisted.
pub struct GeneratedToken {
    pub plaintext: String,
    pub hash: String,
}

/// Generate a new opaque refresh token.
pub fn generate_refresh_token() -> GeneratedToken {
    let bytes: Vec<u8> = (0..REFRESH_TOKEN_RANDOM_BYTES)
        .map(|_| rand::thread_rng().gen())
        .collect();
    let plaintext = hex::encode(&bytes);
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// A freshly-generated API key. The full key (`mtc_<hex>`) is returned once; only the
/// hash and a display-safe prefix are persisted.
pub struct GeneratedApiKey {
    pub plaintext: String,
    pub hash: String,
    pub display_prefix: String,
}

pub fn generate_api_key() -> GeneratedApiKey {
    let bytes: Vec<u8> = (0..API_KEY_RANDOM_BYTES).map(|_| rand::thread_rng().gen()).collect();
    let random_hex = hex::encode(&bytes);
    let plaintext = format!("{API_KEY_PREFIX}{random_hex}");
    let hash = hash_token(&plaintext);
    let display_prefix = format!("{API_KEY_PREFIX}{}...", &random_hex[..8]);
    GeneratedApiKey {
        plaintext,
        hash,
        display_prefix,
    }
}

/// Hash an opaque token (refresh token or API key) for database storage/lookup. Tokens
/// are high-entropy and single-use-to-verify, so a plain digest (no per-token salt) is
/// enough to make the stored value useless to an attacker without brute-forcing 256 bits.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn refresh_token_hash_is_deterministic_from_plaintext() {
        let token = generate_refresh_token();
        assert_eq!(hash_token(&token.plaintext), token.hash);
    }

    #[test]
    fn api_key_has_expected_prefix_and_hash() {
        let key = generate_api_key();
        assert!(key.plaintext.starts_with(API_KEY_PREFIX));
        assert_eq!(hash_token(&key.plaintext), key.hash);
        assert!(key.display_prefix.starts_with(API_KEY_PREFIX));
        assert!(key.display_prefix.len() < key.plaintext.len());
    }
}
