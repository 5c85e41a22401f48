//! Errors shared by the course, participant and company store ports.

use super::define_port_error;

define_port_error! {
    /// Failure of a single document store call.
    pub enum StoreError {
        /// The store could not be reached.
        Connection { message: String } => "store connection failed: {message}",
        /// The store rejected or failed the query.
        Query { message: String } => "store query failed: {message}",
        /// The call did not finish within the configured bound.
        Timeout { message: String } => "store call timed out: {message}",
        /// Compare-and-set failed because another writer got there first.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "revision mismatch: expected {expected}, found {actual}",
        /// A uniqueness constraint was violated.
        Duplicate { message: String } => "duplicate document: {message}",
        /// A stored document could not be decoded.
        Corrupt { message: String } => "stored document is unreadable: {message}",
    }
}
