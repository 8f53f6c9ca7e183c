use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type of every encode and decode operation.
pub type Result<T> = std::result::Result<T, CodecErr>;

/// Error returned whenever a payload can't be encoded or decoded in the selected format.
#[derive(Debug)]
pub enum CodecErr {
    Json(serde_json::Error),
    Binary(bincode::Error),
}

impl Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed json payload: {e}"),
            Self::Binary(e) => write!(f, "malformed binary payload: {e}"),
        }
    }
}

impl Error for CodecErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Binary(e) => Some(e.as_ref()),
        }
    }
}

impl From<serde_json::Error> for CodecErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<bincode::Error> for CodecErr {
    fn from(value: bincode::Error) -> Self {
        Self::Binary(value)
    }
}
