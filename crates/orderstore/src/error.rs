//! Error types for orderstore

use std::fmt;
use std::io;

/// Result type alias for orderstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for record store operations
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// Corrupt or unreadable data file
    Parse(String),

    /// Key is empty or contains a tab or newline
    InvalidKey(String),

    /// Value too large (max 1 MB)
    ValueTooLarge(usize),

    /// Value contains a newline
    InvalidValue,

    /// Database full (max 1 GB)
    DatabaseFull(u64),

    /// A record with this key already exists
    DuplicateKey(String),

    /// Key not found
    NotFound,

    /// Database is closed
    Closed,
}

impl Error {
    /// True when the error means "no record with that key"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidKey(key) => write!(f, "Invalid key: {:?}", key),
            Error::ValueTooLarge(size) => write!(f, "Value too large: {} bytes (max 1 MB)", size),
            Error::InvalidValue => write!(f, "Invalid value: payload contains a newline"),
            Error::DatabaseFull(size) => write!(f, "Database full: {} bytes (max 1 GB)", size),
            Error::DuplicateKey(key) => write!(f, "Duplicate key: {}", key),
            Error::NotFound => write!(f, "Key not found"),
            Error::Closed => write!(f, "Database is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
