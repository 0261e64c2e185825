//! Error types for rangelease.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The store could not be reached, or the round trip failed in flight.
    #[error("transport error: {0}")]
    Transport(#[source] sqlx::Error),

    /// Rejected before any store call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store executed the request and refused it.
    #[error("procedure failed: {0}")]
    Procedure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the failure happened on the wire rather than in the store.
    ///
    /// `enqueue`, `release` and `requeue` are safe to repeat after a transport
    /// error. An `acquire_due` that failed this way may or may not have run;
    /// prefer rescanning later over retrying immediately.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// SQLSTATEs reported by the server when a statement was cut off rather
/// than rejected: connection exceptions (class 08), cancellation and
/// statement timeout, shutdowns, and deadlock victims. The statement's
/// transaction rolled back, but the caller cannot tell from the error alone
/// whether a retry would succeed, so these count as transport failures.
fn interrupted_in_flight(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57014" | "57P01" | "57P02" | "57P03" | "40P01")
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db)
                if db.code().is_some_and(|code| interrupted_in_flight(&code)) =>
            {
                Error::Transport(sqlx::Error::Database(db))
            }
            sqlx::Error::Database(db) => Error::Procedure(db.to_string()),
            sqlx::Error::RowNotFound
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Encode(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Error::Procedure(err.to_string()),
            sqlx::Error::Migrate(e) => Error::Other(format!("migration failed: {e}")),
            other => Error::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
