use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sha2::{Digest, Sha256};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Verifies against either an argon2 hash or a legacy SHA-256 hex digest.
/// Legacy rows are rotated to argon2 by the caller on successful login.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    if is_legacy_hash(stored) {
        return Ok(legacy_digest(password) == stored);
    }
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow!("invalid password hash format: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("password verification failed: {e}")),
    }
}

/// Legacy rows are unsalted SHA-256 hex digests: 64 lowercase hex chars.
pub fn is_legacy_hash(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

pub fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("orientation2024").expect("hash failed");
        assert!(verify_password("orientation2024", &hash).expect("verify failed"));
        assert!(!verify_password("wrong", &hash).expect("verify failed"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_legacy_hash_detection() {
        let legacy = legacy_digest("hunter2");
        assert!(is_legacy_hash(&legacy));
        assert!(!is_legacy_hash(&hash_password("hunter2").unwrap()));
        assert!(!is_legacy_hash("short"));
    }

    #[test]
    fn test_legacy_verify() {
        let legacy = legacy_digest("hunter2");
        assert!(verify_password("hunter2", &legacy).unwrap());
        assert!(!verify_password("hunter3", &legacy).unwrap());
    }
}
