//! Credential handling.
//!
//! Roles and token claims live in `grocer_shared`; this module owns the
//! secrets side: bcrypt password hashes and password-reset tokens.

mod password;

pub use password::{
    BCRYPT_COST, MIN_PASSWORD_LEN, PasswordError, check_password_policy, generate_reset_token, hash_password,
    verify_password,
};
