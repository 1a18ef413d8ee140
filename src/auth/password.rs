use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Salted one-way hash of a raw password. Each call generates a fresh salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Compare a login attempt against the stored hash. A wrong password is
/// `Ok(false)`; only an unparseable hash is an error.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_the_registered_password() {
        let password = "tr1age-Unit-9!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_a_wrong_login_attempt() {
        let hash = hash_password("patients-first").expect("hashing should succeed");
        assert!(!verify_password("patients-1st", &hash).expect("verify should not error"));
    }

    #[test]
    fn repeated_hashing_salts_differently() {
        let a = hash_password("same-password").expect("hash a");
        let b = hash_password("same-password").expect("hash b");
        assert_ne!(a, b);
        assert!(verify_password("same-password", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_stored_hash() {
        assert!(verify_password("anything", "$argon2-but-not-really").is_err());
    }
}
