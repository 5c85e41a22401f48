//! Server settings loaded via OrthoConfig from CLI flags and `TRAINING_*`
//! environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{AdminId, IdValidationError};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RETRY_LIMIT: u32 = 3;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_ADMIN_ID: &str = "00000000-0000-4000-8000-000000000001";

/// Invalid combination or value in [`ServerSettings`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// `bind_addr` is not `host:port`.
    #[error("bind address {value} is not a socket address")]
    InvalidBindAddr {
        /// Offending value.
        value: String,
    },
    /// Only some of the per-collection database URLs were set.
    #[error("database URLs must be set for all three collections; missing {missing}")]
    PartialDatabaseUrls {
        /// First unset setting.
        missing: &'static str,
    },
    /// Only one of the admin e-mail and password digest was set.
    #[error("admin e-mail and password digest must be set together")]
    PartialAdminCredentials,
    /// `admin_id` is not a UUID.
    #[error("admin id is invalid: {0}")]
    InvalidAdminId(#[from] IdValidationError),
}

/// PostgreSQL connection strings, one per collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrls {
    pub courses: String,
    pub participants: String,
    pub companies: String,
}

/// The single administrator allowed to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub admin_id: AdminId,
    pub email: String,
    pub password_sha256: String,
}

/// Settings for the HTTP server and its stores.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRAINING")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// File holding the session cookie key material.
    pub session_key_file: Option<PathBuf>,
    /// Mark the session cookie `Secure`; on unless explicitly disabled.
    pub cookie_secure: Option<bool>,
    /// Generate a throwaway session key when the key file is unreadable.
    pub allow_ephemeral_key: Option<bool>,
    /// Upper bound on a single store call, in milliseconds.
    pub io_timeout_ms: Option<u64>,
    /// Whole-operation retries on a revision conflict.
    pub retry_limit: Option<u32>,
    /// PostgreSQL URL of the course collection.
    pub course_database_url: Option<String>,
    /// PostgreSQL URL of the participant collection.
    pub participant_database_url: Option<String>,
    /// PostgreSQL URL of the company collection.
    pub company_database_url: Option<String>,
    /// Connections per collection pool.
    pub pool_max_size: Option<u32>,
    /// Administrator id reported after login.
    pub admin_id: Option<String>,
    /// Administrator login e-mail.
    pub admin_email: Option<String>,
    /// Lower-case hex SHA-256 of the administrator password.
    pub admin_password_sha256: Option<String>,
}

impl ServerSettings {
    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    pub fn allow_ephemeral_key(&self) -> bool {
        self.allow_ephemeral_key.unwrap_or(false)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms.unwrap_or(DEFAULT_IO_TIMEOUT_MS))
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT)
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// All three database URLs, or `None` for in-memory stores.
    pub fn database_urls(&self) -> Result<Option<DatabaseUrls>, SettingsError> {
        match (
            &self.course_database_url,
            &self.participant_database_url,
            &self.company_database_url,
        ) {
            (None, None, None) => Ok(None),
            (Some(courses), Some(participants), Some(companies)) => Ok(Some(DatabaseUrls {
                courses: courses.clone(),
                participants: participants.clone(),
                companies: companies.clone(),
            })),
            (None, _, _) => Err(SettingsError::PartialDatabaseUrls {
                missing: "course_database_url",
            }),
            (_, None, _) => Err(SettingsError::PartialDatabaseUrls {
                missing: "participant_database_url",
            }),
            (_, _, None) => Err(SettingsError::PartialDatabaseUrls {
                missing: "company_database_url",
            }),
        }
    }

    /// Configured administrator, or `None` to fall back to the fixture login.
    pub fn admin_credentials(&self) -> Result<Option<AdminCredentials>, SettingsError> {
        let (email, password_sha256) = match (&self.admin_email, &self.admin_password_sha256) {
            (None, None) => return Ok(None),
            (Some(email), Some(digest)) => (email.clone(), digest.clone()),
            _ => return Err(SettingsError::PartialAdminCredentials),
        };
        let admin_id = AdminId::parse(self.admin_id.as_deref().unwrap_or(DEFAULT_ADMIN_ID))?;
        Ok(Some(AdminCredentials {
            admin_id,
            email,
            password_sha256,
        }))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    const VARS: [&str; 13] = [
        "TRAINING_BIND_ADDR",
        "TRAINING_SESSION_KEY_FILE",
        "TRAINING_COOKIE_SECURE",
        "TRAINING_ALLOW_EPHEMERAL_KEY",
        "TRAINING_IO_TIMEOUT_MS",
        "TRAINING_RETRY_LIMIT",
        "TRAINING_COURSE_DATABASE_URL",
        "TRAINING_PARTICIPANT_DATABASE_URL",
        "TRAINING_COMPANY_DATABASE_URL",
        "TRAINING_POOL_MAX_SIZE",
        "TRAINING_ADMIN_ID",
        "TRAINING_ADMIN_EMAIL",
        "TRAINING_ADMIN_PASSWORD_SHA256",
    ];

    fn env_with(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("training-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket")
        );
        assert!(settings.cookie_secure(), "cookies are Secure unless disabled");
        assert!(!settings.allow_ephemeral_key());
        assert_eq!(settings.io_timeout(), Duration::from_secs(5));
        assert_eq!(settings.retry_limit(), 3);
        assert_eq!(settings.pool_max_size(), 10);
        assert_eq!(settings.database_urls(), Ok(None));
        assert_eq!(settings.admin_credentials(), Ok(None));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("TRAINING_BIND_ADDR", "127.0.0.1:9090"),
            ("TRAINING_COOKIE_SECURE", "false"),
            ("TRAINING_IO_TIMEOUT_MS", "250"),
            ("TRAINING_RETRY_LIMIT", "5"),
            ("TRAINING_COURSE_DATABASE_URL", "postgres://db/courses"),
            ("TRAINING_PARTICIPANT_DATABASE_URL", "postgres://db/participants"),
            ("TRAINING_COMPANY_DATABASE_URL", "postgres://db/companies"),
            ("TRAINING_ADMIN_EMAIL", "coordinacion@example.com"),
            (
                "TRAINING_ADMIN_PASSWORD_SHA256",
                "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8",
            ),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind"),
            "127.0.0.1:9090".parse::<SocketAddr>().expect("socket")
        );
        assert!(!settings.cookie_secure());
        assert_eq!(settings.io_timeout(), Duration::from_millis(250));
        assert_eq!(settings.retry_limit(), 5);
        let urls = settings.database_urls().expect("urls").expect("configured");
        assert_eq!(urls.participants, "postgres://db/participants");
        let admin = settings.admin_credentials().expect("admin").expect("configured");
        assert_eq!(admin.email, "coordinacion@example.com");
        assert_eq!(admin.admin_id.to_string(), DEFAULT_ADMIN_ID);
    }

    #[rstest]
    #[case(&[("TRAINING_COURSE_DATABASE_URL", "postgres://db/courses")], "participant_database_url")]
    #[case(
        &[
            ("TRAINING_PARTICIPANT_DATABASE_URL", "postgres://db/p"),
            ("TRAINING_COMPANY_DATABASE_URL", "postgres://db/c"),
        ],
        "course_database_url"
    )]
    fn partial_database_urls_are_rejected(
        #[case] overrides: &[(&'static str, &str)],
        #[case] missing: &'static str,
    ) {
        let _guard = lock_env(env_with(overrides));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.database_urls(),
            Err(SettingsError::PartialDatabaseUrls { missing })
        );
    }

    #[rstest]
    #[case("true", true)]
    #[case("false", false)]
    fn cookie_secure_follows_an_explicit_setting(#[case] raw: &str, #[case] expected: bool) {
        let _guard = lock_env(env_with(&[("TRAINING_COOKIE_SECURE", raw)]));

        let settings = load_from_empty_args();
        assert_eq!(settings.cookie_secure(), expected);
    }

    #[rstest]
    fn half_configured_admin_is_rejected() {
        let _guard = lock_env(env_with(&[("TRAINING_ADMIN_EMAIL", "a@example.com")]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.admin_credentials(),
            Err(SettingsError::PartialAdminCredentials)
        );
    }

    #[rstest]
    fn malformed_bind_address_is_rejected() {
        let _guard = lock_env(env_with(&[("TRAINING_BIND_ADDR", "localhost")]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
    }
}
