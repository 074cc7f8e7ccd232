//! Error types for lazymat readers, views and file backends

pub use lazymat_core::ErrorKind;
use lazymat_core::CoreError;

/// Errors that can occur while reading, subsetting or writing datasets
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("label not found: {label}")]
    LabelNotFound { label: String },

    #[error("invalid storage path '{path}'")]
    InvalidPath { path: String },

    #[error("refusing to materialize {count} labels, limit is {limit}")]
    MaterializeLimit { count: usize, limit: usize },

    #[error("{0}")]
    Inconsistent(String),

    #[error("{0}")]
    Unsupported(String),
}

impl Error {
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Core(err) => err.kind(),
            Error::Io(_) => ErrorKind::Format,
            Error::Shape(_) => ErrorKind::Shape,
            Error::ThreadPool(_) => ErrorKind::Unsupported,
            Error::LabelNotFound { .. } => ErrorKind::Index,
            Error::InvalidPath { .. } => ErrorKind::Index,
            Error::MaterializeLimit { .. } => ErrorKind::Unsupported,
            Error::Inconsistent(_) => ErrorKind::Consistency,
            Error::Unsupported(_) => ErrorKind::Unsupported,
        }
    }
}

/// Result type for lazymat operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: Error = CoreError::ZeroStep.into();
        assert_eq!(err.kind(), ErrorKind::Index);
        assert_eq!(err.to_string(), "Slice step cannot be zero");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            Error::inconsistent("rows differ").kind(),
            ErrorKind::Consistency
        );
        assert_eq!(Error::unsupported("nope").to_string(), "nope");
    }
}
