use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
///
/// Only session setup and terminal handling can fail with these. Everything the
/// browsing engine does after startup degrades to stale or unknown data instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem or terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid root path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The log subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("denied"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("event channel closed".into());
        assert_eq!(err.to_string(), "Terminal error: event channel closed");
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("/nonexistent is not a directory".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent is not a directory");
    }

    #[test]
    fn logging_error_display() {
        let err = AppError::Logging("subscriber already set".into());
        assert_eq!(err.to_string(), "Logging error: subscriber already set");
    }
}
