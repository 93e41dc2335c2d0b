use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open database \"{database}\": {source}")]
    Open {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to apply \"{directive}\": {source}")]
    Configuration {
        directive: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to start transaction: {0}")]
    TransactionStart(#[source] sqlx::Error),

    #[error("Transaction already finalized")]
    AlreadyFinalized,

    #[error("Failed to refresh sequence for table '{table}': {source}")]
    SequenceRefresh {
        table: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Sequence for table '{0}' not found")]
    SequenceNotFound(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl Error {
    /// Name of the pragma statement that failed during `Connection::open`, if any.
    pub fn directive(&self) -> Option<&str> {
        match self {
            Error::Configuration { directive, .. } => Some(directive),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_directive() {
        let err = Error::Configuration {
            directive: "PRAGMA journal_mode=WAL".into(),
            source: sqlx::Error::PoolClosed,
        };

        assert_eq!(err.directive(), Some("PRAGMA journal_mode=WAL"));
        assert!(err.to_string().contains("PRAGMA journal_mode=WAL"));
    }

    #[test]
    fn test_sequence_refresh_keeps_source() {
        let err = Error::SequenceRefresh {
            table: "users".into(),
            source: Box::new(Error::Database(sqlx::Error::RowNotFound)),
        };

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("no rows returned"));
        assert_eq!(err.directive(), None);
    }

    #[test]
    fn test_poison_error_becomes_lock_error() {
        let lock = std::sync::Mutex::new(());
        let _ = std::panic::catch_unwind(|| {
            let _guard = lock.lock().unwrap();
            panic!("poison");
        });

        let err: Error = lock.lock().unwrap_err().into();
        assert!(matches!(err, Error::LockError(_)));
    }
}
