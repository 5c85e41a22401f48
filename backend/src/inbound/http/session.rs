//! Session helpers keeping handlers free of framework details.
//!
//! The encrypted session cookie carries only the administrator id.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{AdminId, Error};

pub(crate) const ADMIN_ID_KEY: &str = "admin_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store the authenticated administrator in the session cookie.
    pub fn persist_admin(&self, admin_id: &AdminId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(ADMIN_ID_KEY, admin_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Current administrator, if logged in.
    pub fn admin_id(&self) -> Result<Option<AdminId>, Error> {
        let raw = self
            .0
            .get::<String>(ADMIN_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|raw| match AdminId::parse(&raw) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "invalid admin id in session cookie");
                None
            }
        }))
    }

    /// Require a logged-in administrator or fail with `401 Unauthorized`.
    pub fn require_admin(&self) -> Result<AdminId, Error> {
        self.admin_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Drop the session and expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
