use std::fmt;
use thiserror::Error;

/// Failure reading a raw payload from the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no object at key {0}")]
    NotFound(String),
    #[error("failed to read {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse error categories surfaced to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MalformedData,
    InvalidArgument,
    IoFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::IoFailure => "io_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the data loader
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Key absent in the store; `key` is the logical store key
    #[error("no data: {key} not found")]
    NotFound { key: String },

    /// Payload present but does not match the schema
    #[error("malformed data in {key} at {path}: {message}")]
    MalformedData {
        key: String,
        path: String,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O failure reading {key}: {source}")]
    IoFailure {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl LoaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoaderError::NotFound { .. } => ErrorKind::NotFound,
            LoaderError::MalformedData { .. } => ErrorKind::MalformedData,
            LoaderError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LoaderError::IoFailure { .. } => ErrorKind::IoFailure,
        }
    }

    /// True when the run index itself is missing, i.e. nothing has been generated yet
    pub fn is_empty_store(&self) -> bool {
        matches!(self, LoaderError::NotFound { key } if key == crate::store::INDEX_KEY)
    }

    /// Field path of a schema violation, if this is one
    pub fn field_path(&self) -> Option<&str> {
        match self {
            LoaderError::MalformedData { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<StoreError> for LoaderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => LoaderError::NotFound { key },
            StoreError::Io { key, source } => LoaderError::IoFailure { key, source },
        }
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;
