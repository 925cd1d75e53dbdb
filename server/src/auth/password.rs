//! Argon2 password hashing for locally stored credentials

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;

use crate::utils::crypto::constant_time_eq;

/// Well-formed hash with default parameters that no password matches.
/// Verified against for unknown logins so they cost the same as known ones.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Compare against a stored secret that may be a PHC hash or a plain value
pub fn matches_stored_secret(password: &str, stored: &str) -> bool {
    if stored.starts_with('$') && PasswordHash::new(stored).is_ok() {
        verify_password(password, stored)
    } else {
        constant_time_eq(password.as_bytes(), stored.as_bytes())
    }
}

/// Run `matches_stored_secret` (or a dummy verification when `stored` is
/// absent) on the blocking pool
pub async fn verify_blocking(password: &str, stored: Option<&str>) -> bool {
    let password = password.to_string();
    let stored = stored.map(String::from);
    let result = tokio::task::spawn_blocking(move || match stored {
        Some(stored) => matches_stored_secret(&password, &stored),
        None => {
            let _ = verify_password(&password, DUMMY_HASH);
            false
        }
    })
    .await;

    match result {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}
