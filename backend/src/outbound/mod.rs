//! Outbound adapters implementing the driven ports.
//!
//! - **memory**: in-process document stores, used when no database is
//!   configured and as fakes in tests
//! - **persistence**: PostgreSQL JSONB document stores using Diesel
//! - **login**: configured administrator credentials
//!
//! Adapters translate between aggregates and storage. They hold no business
//! rules.

pub mod login;
pub mod memory;
pub mod persistence;
