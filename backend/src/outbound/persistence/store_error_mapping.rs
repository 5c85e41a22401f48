//! Diesel and pool error mapping shared by the document repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::StoreError;

use super::pool::PoolError;

/// Map pool errors to store connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> StoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            StoreError::connection(message)
        }
    }
}

/// Map Diesel errors to store errors.
///
/// Unique violations become [`StoreError::Duplicate`] naming the violated
/// constraint so callers can tell an e-mail clash from a tax id clash.
pub(crate) fn map_diesel_error(error: DieselError) -> StoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => StoreError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::duplicate(info.constraint_name().unwrap_or("unique constraint"))
        }
        DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
            _,
        ) => StoreError::connection("database connection error"),
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            StoreError::query("serialization failure")
        }
        DieselError::DeserializationError(_) => StoreError::corrupt("column could not be read"),
        _ => StoreError::query("database error"),
    }
}
