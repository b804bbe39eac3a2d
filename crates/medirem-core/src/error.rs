//! Error types for MediRem.

use thiserror::Error;

/// Unified error type across the workspace.
#[derive(Debug, Error)]
pub enum MediremError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Alarm error: {0}")]
    Alarm(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Haptics unavailable: {0}")]
    Haptics(String),

    #[error("Reminder {0} not found")]
    NotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MediremError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        MediremError::Validation(msg.into())
    }

    pub fn store<S: Into<String>>(msg: S) -> Self {
        MediremError::Store(msg.into())
    }
}

/// Result alias used by every crate in the workspace.
pub type Result<T> = std::result::Result<T, MediremError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MediremError::store("disk full");
        assert_eq!(err.to_string(), "Store error: disk full");
        assert_eq!(MediremError::NotFound(5).to_string(), "Reminder 5 not found");
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(MediremError::Io(_))));
    }
}
