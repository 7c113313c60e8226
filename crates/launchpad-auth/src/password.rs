use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Returns `Ok(false)` on a mismatch. Errors only when the stored hash
/// cannot be parsed.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs a verification against a throwaway hash so that a login for an
/// unknown email costs the same as one with a wrong password.
pub fn burn_verification(plain: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();

    if let Some(hash) = DUMMY.get_or_init(|| hash_password("launchpad-dummy-password").ok()) {
        let _ = verify_password(plain, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("password123", &hash).unwrap());
        assert!(!verify_password("password124", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(PasswordError::MalformedHash(_))
        ));
    }
}
