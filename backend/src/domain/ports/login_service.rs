//! Driving port for administrator authentication.
//!
//! Handlers depend on this trait only, so HTTP tests can swap in
//! [`FixtureLoginService`] instead of configuring real credentials.

use async_trait::async_trait;

use crate::domain::{AdminId, Error, LoginCredentials};

/// Authentication use-case.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the administrator id.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AdminId, Error>;
}

/// Fixed-credential authenticator for tests and local development:
/// `admin@example.com` / `password`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoginService;

/// Administrator id returned by [`FixtureLoginService`].
pub const FIXTURE_ADMIN_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AdminId, Error> {
        if credentials.email() == "admin@example.com" && credentials.password() == "password" {
            AdminId::parse(FIXTURE_ADMIN_ID)
                .map_err(|err| Error::internal(format!("invalid fixture admin id: {err}")))
        } else {
            Err(Error::unauthorized("invalid credentials"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case("admin@example.com", "password", true)]
    #[case("ADMIN@example.com", "password", true)]
    #[case("admin@example.com", "wrong", false)]
    #[case("other@example.com", "password", false)]
    #[tokio::test]
    async fn fixture_accepts_only_the_known_pair(
        #[case] email: &str,
        #[case] password: &str,
        #[case] should_succeed: bool,
    ) {
        let creds = LoginCredentials::try_from_parts(email, password).expect("credentials shape");
        let result = FixtureLoginService.authenticate(&creds).await;
        match (should_succeed, result) {
            (true, Ok(id)) => assert_eq!(id.to_string(), FIXTURE_ADMIN_ID),
            (false, Err(err)) => assert_eq!(err.code(), ErrorCode::Unauthorized),
            (true, Err(err)) => panic!("expected success, got error: {err:?}"),
            (false, Ok(id)) => panic!("expected failure, got success: {id}"),
        }
    }
}
