//! Administrator login credentials.
//!
//! Handlers build [`LoginCredentials`] from the raw payload before talking to
//! the login port, so authentication adapters only ever see validated input.

use std::fmt;

use zeroize::Zeroizing;

/// Raised when a login payload is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated administrator credentials.
///
/// The email is trimmed and lower-cased; the password keeps caller-provided
/// whitespace and is wiped from memory on drop.
///
/// # Examples
/// ```
/// use training_backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" Admin@Example.com ", "secret").unwrap();
/// assert_eq!(creds.email(), "admin@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Validate raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(LoginValidationError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Raw password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}
