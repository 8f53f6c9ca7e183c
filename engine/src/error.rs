use std::{
    collections::TryReserveError,
    error::Error,
    fmt::{self, Display},
    io,
    path::Path,
};

use messages::CodecErr;

/// The engine's result type.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// The category of an `EngineErr`, stable across the engine's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    AlreadyExists,
    BufferSizeMismatch,
    NoPendingResult,
    RegularizationFailed,
    Timeout,
    InternalError,
    OutOfMemory,
}

/// Every failure an engine operation can report.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineErr {
    /// A malformed or out of range configuration or argument payload.
    InvalidConfig(String),
    NotFound {
        what: &'static str,
        name: String,
    },
    AlreadyExists {
        what: &'static str,
        name: String,
    },
    BufferSizeMismatch {
        expected: usize,
        got: usize,
    },
    NoPendingResult,
    RegularizationFailed {
        regularizer: String,
        reason: String,
    },
    /// The awaited operation is still running.
    Timeout {
        operation: u64,
    },
    Internal(String),
    OutOfMemory(String),
}

impl EngineErr {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn already_exists(what: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            what,
            name: name.into(),
        }
    }

    /// Maps a disk failure on `path` into the engine's error categories.
    pub fn disk(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found("file", path.display().to_string()),
            io::ErrorKind::OutOfMemory => Self::OutOfMemory(format!("{}: {err}", path.display())),
            _ => Self::Internal(format!("disk error on {}: {err}", path.display())),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::BufferSizeMismatch { .. } => ErrorKind::BufferSizeMismatch,
            Self::NoPendingResult => ErrorKind::NoPendingResult,
            Self::RegularizationFailed { .. } => ErrorKind::RegularizationFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::InternalError,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
        }
    }
}

impl Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::NotFound { what, name } => write!(f, "{what} not found: {name}"),
            Self::AlreadyExists { what, name } => write!(f, "{what} already exists: {name}"),
            Self::BufferSizeMismatch { expected, got } => write!(
                f,
                "buffer size mismatch: expected {expected} bytes, got a {got} bytes buffer"
            ),
            Self::NoPendingResult => f.write_str("there is no pending result to copy"),
            Self::RegularizationFailed {
                regularizer,
                reason,
            } => write!(f, "regularizer {regularizer} failed: {reason}"),
            Self::Timeout { operation } => {
                write!(f, "operation {operation} is still running after the timeout")
            }
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::OutOfMemory(msg) => write!(f, "out of memory: {msg}"),
        }
    }
}

impl Error for EngineErr {}

impl From<CodecErr> for EngineErr {
    fn from(value: CodecErr) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}

impl From<TryReserveError> for EngineErr {
    fn from(value: TryReserveError) -> Self {
        Self::OutOfMemory(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_errors_keep_not_found() {
        let err = EngineErr::disk(
            Path::new("/missing/model.bin"),
            io::Error::from(io::ErrorKind::NotFound),
        );

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/missing/model.bin"));
    }

    #[test]
    fn codec_errors_are_invalid_configs() {
        let err: EngineErr = messages::Format::Json
            .decode::<messages::specs::MasterModelConfig>(b"{")
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
}
