//! Password hashing and one-time tokens.

use bcrypt::BcryptError;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;

/// Shortest password accepted at registration and reset.
pub const MIN_PASSWORD_LEN: usize = 8;

/// bcrypt work factor for new hashes.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

const RESET_TOKEN_LEN: usize = 48;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Failed to hash password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Password is below the minimum length.
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
}

/// Rejects passwords that do not meet the length policy.
pub fn check_password_policy(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

/// Hashes a password with bcrypt, returning a `$2b$` modular-crypt string.
///
/// # Example
///
/// ```
/// use grocer_core::auth::hash_password;
///
/// let hash = hash_password("basket-of-plums").unwrap();
/// assert!(hash.starts_with("$2b$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored bcrypt hash (`$2a$`, `$2b$`, `$2x$`, `$2y$`).
///
/// # Example
///
/// ```
/// use grocer_core::auth::{hash_password, verify_password};
///
/// let hash = hash_password("basket-of-plums").unwrap();
/// assert!(verify_password("basket-of-plums", &hash).unwrap());
/// assert!(!verify_password("basket-of-pears", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    match bcrypt::verify(password, hash) {
        Ok(matches) => Ok(matches),
        Err(BcryptError::InvalidHash(_) | BcryptError::InvalidPrefix(_)) => {
            Err(PasswordError::InvalidHash)
        }
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Random token mailed in password-reset links. Only its hash is stored.
#[must_use]
pub fn generate_reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_bcrypt() {
        let hash = hash_password("fresh-produce-42").unwrap();
        assert!(hash.starts_with("$2b$12$"));
        assert_eq!(hash.len(), 60);
    }

    #[test]
    fn test_verifies_other_bcrypt_prefixes() {
        let hash = bcrypt::hash("password", 4).unwrap();
        for prefix in ["$2a$", "$2y$"] {
            let legacy = hash.replacen("$2b$", prefix, 1);
            assert!(verify_password("password", &legacy).unwrap());
            assert!(!verify_password("passw0rd", &legacy).unwrap());
        }
    }

    #[test]
    fn test_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        assert_ne!(
            hash_password("same-password").unwrap(),
            hash_password("same-password").unwrap()
        );
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid_hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }

    #[test]
    fn test_policy_counts_characters() {
        assert!(matches!(check_password_policy("short"), Err(PasswordError::TooShort)));
        assert!(check_password_policy("ëëëëëëëë").is_ok());
        assert!(check_password_policy("long enough").is_ok());
    }

    #[test]
    fn test_reset_tokens_are_long_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), RESET_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
