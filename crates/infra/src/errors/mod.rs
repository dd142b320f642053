//! Conversions from external infrastructure errors into domain errors.

use slotwise_domain::SchedulingError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SchedulingError);

impl From<InfraError> for SchedulingError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SchedulingError> for InfraError {
    fn from(value: SchedulingError) -> Self {
        Self(value)
    }
}

/* ------------------------------------------------------------------------ */
/* rusqlite::Error -> SchedulingError */
/* ------------------------------------------------------------------------ */

impl From<rusqlite::Error> for InfraError {
    fn from(value: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let domain = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        SchedulingError::Database("database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        SchedulingError::Database("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => SchedulingError::Database(format!(
                        "constraint violation (code {}): {message}",
                        err.extended_code
                    )),
                    _ => SchedulingError::Database(format!(
                        "sqlite failure {:?} (code {}): {message}",
                        err.code, err.extended_code
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                SchedulingError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                SchedulingError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SchedulingError::Database(format!("invalid column type: {ty}"))
            }
            other => SchedulingError::Database(other.to_string()),
        };
        Self(domain)
    }
}

/* ------------------------------------------------------------------------ */
/* r2d2::Error -> SchedulingError */
/* ------------------------------------------------------------------------ */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        Self(SchedulingError::Database(format!("connection pool error: {value}")))
    }
}

/* ------------------------------------------------------------------------ */
/* reqwest::Error -> SchedulingError */
/* ------------------------------------------------------------------------ */

impl From<reqwest::Error> for InfraError {
    fn from(value: reqwest::Error) -> Self {
        let domain = if value.is_timeout() || value.is_connect() {
            SchedulingError::CalendarUnavailable(value.to_string())
        } else {
            SchedulingError::Network(value.to_string())
        };
        Self(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rows_maps_to_not_found() {
        let err: InfraError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err.0, SchedulingError::NotFound(_)));
    }
}
