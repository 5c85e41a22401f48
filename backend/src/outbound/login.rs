//! Configured administrator login.
//!
//! A single administrator is configured with an e-mail and the SHA-256 digest
//! of their password (lower-case hex). Plain passwords never sit in
//! configuration and the submitted one is digested before comparison.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::domain::ports::LoginService;
use crate::domain::{AdminId, Error, LoginCredentials};

/// Rejected administrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminConfigError {
    /// The e-mail is blank.
    #[error("admin e-mail must not be empty")]
    EmptyEmail,
    /// The digest is not 64 hex characters.
    #[error("admin password digest must be 64 hex characters")]
    MalformedDigest,
}

/// [`LoginService`] checking credentials against one configured admin.
pub struct ConfiguredLoginService {
    admin_id: AdminId,
    email: String,
    password_digest: Zeroizing<Vec<u8>>,
}

impl ConfiguredLoginService {
    /// Build the service from the configured e-mail and hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`AdminConfigError`] when the e-mail is blank or the digest is
    /// not a SHA-256 hex string.
    pub fn new(
        admin_id: AdminId,
        email: &str,
        password_sha256_hex: &str,
    ) -> Result<Self, AdminConfigError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AdminConfigError::EmptyEmail);
        }
        let password_digest = hex::decode(password_sha256_hex.trim())
            .map_err(|_| AdminConfigError::MalformedDigest)?;
        if password_digest.len() != 32 {
            return Err(AdminConfigError::MalformedDigest);
        }
        Ok(Self {
            admin_id,
            email,
            password_digest: Zeroizing::new(password_digest),
        })
    }

    /// Lower-case hex SHA-256 of `password`, as expected in configuration.
    pub fn digest_hex(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    fn digest_matches(&self, password: &str) -> bool {
        let submitted = Zeroizing::new(Sha256::digest(password.as_bytes()).to_vec());
        submitted
            .iter()
            .zip(self.password_digest.iter())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[async_trait]
impl LoginService for ConfiguredLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AdminId, Error> {
        let email_matches = credentials.email() == self.email;
        let password_matches = self.digest_matches(credentials.password());
        if email_matches && password_matches {
            debug!(admin_id = %self.admin_id, "admin authenticated");
            return Ok(self.admin_id);
        }
        warn!(email = credentials.email(), "admin login rejected");
        Err(Error::unauthorized("invalid credentials"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ErrorCode;

    #[fixture]
    fn service() -> ConfiguredLoginService {
        ConfiguredLoginService::new(
            AdminId::random(),
            " Coordinacion@Example.com ",
            &ConfiguredLoginService::digest_hex("s3creto"),
        )
        .expect("valid config")
    }

    const PASSWORD_DIGEST: &str =
        "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

    #[rstest]
    fn digest_is_lower_hex_sha256() {
        assert_eq!(ConfiguredLoginService::digest_hex("password"), PASSWORD_DIGEST);
    }

    #[rstest]
    #[case("  ", PASSWORD_DIGEST, AdminConfigError::EmptyEmail)]
    #[case("admin@example.com", "not-hex", AdminConfigError::MalformedDigest)]
    #[case("admin@example.com", "abcd", AdminConfigError::MalformedDigest)]
    fn bad_configuration_is_rejected(
        #[case] email: &str,
        #[case] digest: &str,
        #[case] expected: AdminConfigError,
    ) {
        let error = ConfiguredLoginService::new(AdminId::random(), email, digest)
            .err()
            .expect("rejected");
        assert_eq!(error, expected);
    }

    #[rstest]
    #[case("coordinacion@example.com", "s3creto", true)]
    #[case("COORDINACION@example.com", "s3creto", true)]
    #[case("coordinacion@example.com", "S3creto", false)]
    #[case("otra@example.com", "s3creto", false)]
    #[tokio::test]
    async fn only_the_configured_pair_is_accepted(
        service: ConfiguredLoginService,
        #[case] email: &str,
        #[case] password: &str,
        #[case] accepted: bool,
    ) {
        let credentials = LoginCredentials::try_from_parts(email, password).expect("shape");

        let result = service.authenticate(&credentials).await;
        match (accepted, result) {
            (true, Ok(id)) => assert_eq!(id, service.admin_id),
            (false, Err(err)) => assert_eq!(err.code(), ErrorCode::Unauthorized),
            (true, Err(err)) => panic!("expected success, got {err:?}"),
            (false, Ok(id)) => panic!("expected rejection, got {id}"),
        }
    }
}
