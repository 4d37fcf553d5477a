// src/auth.rs

use async_trait::async_trait;

use crate::{
    config::Config,
    error::AppError,
    utils::hash::{hash_password, verify_password},
};

/// Decides whether a username/password pair may administer the question bank.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AppError>;
}

/// Single admin account checked against an Argon2 hash held in memory.
pub struct Argon2CredentialVerifier {
    username: String,
    password_hash: String,
}

impl Argon2CredentialVerifier {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    /// Hashes `password` once so the plaintext is not kept around.
    pub fn from_plaintext(username: &str, password: &str) -> Result<Self, AppError> {
        Ok(Self::new(username, hash_password(password)?))
    }
}

#[async_trait]
impl CredentialVerifier for Argon2CredentialVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        if username != self.username {
            return Ok(false);
        }
        verify_password(password, &self.password_hash)
    }
}

/// Used when no admin account is configured.
pub struct DenyAllVerifier;

#[async_trait]
impl CredentialVerifier for DenyAllVerifier {
    async fn verify(&self, _username: &str, _password: &str) -> Result<bool, AppError> {
        Ok(false)
    }
}

/// Builds the verifier described by the configuration.
pub fn verifier_from_config(config: &Config) -> Result<Box<dyn CredentialVerifier>, AppError> {
    match (&config.admin_username, &config.admin_password) {
        (Some(username), Some(password)) => {
            tracing::info!("Admin login enabled for: {}", username);
            Ok(Box::new(Argon2CredentialVerifier::from_plaintext(username, password)?))
        }
        _ => {
            tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, admin login disabled");
            Ok(Box::new(DenyAllVerifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn argon2_verifier_checks_both_fields() {
        let verifier = Argon2CredentialVerifier::from_plaintext("admin", "hunter2").unwrap();
        assert!(verifier.verify("admin", "hunter2").await.unwrap());
        assert!(!verifier.verify("admin", "hunter3").await.unwrap());
        assert!(!verifier.verify("root", "hunter2").await.unwrap());
    }

    #[tokio::test]
    async fn deny_all_rejects_everything() {
        assert!(!DenyAllVerifier.verify("admin", "admin123").await.unwrap());
    }
}
