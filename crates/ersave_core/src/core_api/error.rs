use std::error::Error as StdError;
use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    Rejected,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl StdError for CoreError {}

impl Error {
    pub fn code(&self) -> CoreErrorCode {
        match self {
            Self::Io(_) => CoreErrorCode::Io,
            _ if self.is_fatal() => CoreErrorCode::Parse,
            Self::NoFacePool => CoreErrorCode::Unsupported,
            _ => CoreErrorCode::Rejected,
        }
    }
}

impl From<Error> for CoreError {
    fn from(err: Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
