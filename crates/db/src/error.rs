//! Translation of `SeaORM` failures into [`BooksError`].

use sea_orm::{DbErr, RuntimeErr};

use bookwell_core::BooksError;
use bookwell_core::numbering::Series;

/// `lock_not_available`: `lock_timeout` expired.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";
/// `check_violation`: a money constraint on the table rejected the row.
const CHECK_VIOLATION: &str = "23514";

/// Extracts the SQLSTATE code from a database error, if there is one.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e))
        | DbErr::Conn(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

/// Maps a database error onto the bookkeeping taxonomy.
#[must_use]
pub fn map_db_err(err: DbErr) -> BooksError {
    match sqlstate(&err).as_deref() {
        Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
            BooksError::ConcurrentModification
        }
        Some(CHECK_VIOLATION) => BooksError::RoundingInvariantViolation(err.to_string()),
        _ => BooksError::Database(err.to_string()),
    }
}

/// Like [`map_db_err`], but contention on a counter is reported against the series.
#[must_use]
pub fn map_sequence_err(err: DbErr, series: Series) -> BooksError {
    match map_db_err(err) {
        BooksError::ConcurrentModification => BooksError::SequenceContention {
            series: series.as_str().to_string(),
        },
        other => other,
    }
}

/// `?`-friendly conversion for `SeaORM` results.
pub trait DbResultExt<T> {
    /// Maps the error with [`map_db_err`].
    fn books(self) -> Result<T, BooksError>;
}

impl<T> DbResultExt<T> for Result<T, DbErr> {
    fn books(self) -> Result<T, BooksError> {
        self.map_err(map_db_err)
    }
}
