//! Training management backend.
//!
//! Courses, participants and companies live in separate document stores;
//! the domain services keep the relationships mirrored between them
//! consistent. See [`domain`] for the model and [`inbound::http`] for the
//! REST surface.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
