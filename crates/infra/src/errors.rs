//! Conversions from external infrastructure errors into domain errors.

use rusqlite::Error as SqlError;
use termical_domain::TermicalError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TermicalError);

impl From<InfraError> for TermicalError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TermicalError> for InfraError {
    fn from(value: TermicalError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;

        let err = match value {
            SqlError::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => TermicalError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        TermicalError::Storage("database is locked".into())
                    }
                    _ => TermicalError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            SqlError::QueryReturnedNoRows => {
                TermicalError::Storage("no rows returned by query".into())
            }
            other => TermicalError::Storage(other.to_string()),
        };

        InfraError(err)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(TermicalError::Storage(format!("connection pool error: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(TermicalError::Storage(format!("column serialization error: {value}")))
    }
}
