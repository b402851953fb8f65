use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::error;

/// How new password hashes are produced.
///
/// `Sha256Hex` is an unsalted fast digest. It stays the default because every
/// stored hash in the `users` table was written that way; `Argon2` is opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PasswordScheme {
    #[default]
    #[serde(rename = "sha256")]
    Sha256Hex,
    #[serde(rename = "argon2")]
    Argon2,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha256hex" => Ok(PasswordScheme::Sha256Hex),
            "argon2" => Ok(PasswordScheme::Argon2),
            other => anyhow::bail!("unsupported password scheme: {other}"),
        }
    }
}

/// Lowercase hex SHA-256 of the UTF-8 password.
pub fn sha256_hex(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

pub fn hash_password(scheme: PasswordScheme, plain: &str) -> anyhow::Result<String> {
    match scheme {
        PasswordScheme::Sha256Hex => Ok(sha256_hex(plain)),
        PasswordScheme::Argon2 => {
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(plain.as_bytes(), &salt)
                .map_err(|e| {
                    error!(error = %e, "argon2 hash_password error");
                    anyhow::anyhow!(e.to_string())
                })?
                .to_string();
            Ok(hash)
        }
    }
}

/// Checks `plain` against a stored hash of either scheme.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    if stored.starts_with("$argon2") {
        let parsed = PasswordHash::new(stored).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        return Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok());
    }
    Ok(constant_time_eq(sha256_hex(plain).as_bytes(), stored.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(sha256_hex("secret1"), sha256_hex("secret1"));
        assert_ne!(sha256_hex("secret1"), sha256_hex("secret2"));
    }

    #[test]
    fn legacy_scheme_stores_hex_digest() {
        let hash = hash_password(PasswordScheme::Sha256Hex, "abc").unwrap();
        assert_eq!(hash, sha256_hex("abc"));
        assert!(verify_password("abc", &hash).unwrap());
        assert!(!verify_password("abd", &hash).unwrap());
    }

    #[test]
    fn argon2_hash_and_verify_roundtrip() {
        let hash = hash_password(PasswordScheme::Argon2, "Secur3P@ssw0rd!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secur3P@ssw0rd!", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_argon2_hash() {
        let err = verify_password("anything", "$argon2id$!!!").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn scheme_parses_from_env_values() {
        assert_eq!("argon2".parse::<PasswordScheme>().unwrap(), PasswordScheme::Argon2);
        assert_eq!("SHA256".parse::<PasswordScheme>().unwrap(), PasswordScheme::Sha256Hex);
        assert!("md5".parse::<PasswordScheme>().is_err());
    }
}
