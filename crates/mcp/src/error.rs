use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;

use crate::proto::RpcError;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reading, writing or spawning failed.
    Io,
    /// The peer sent something that is not valid JSON-RPC or MCP.
    Protocol,
    /// The peer answered a request with an error object.
    Rpc,
    /// The peer closed the connection.
    Closed,
}

/// Error type of this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    code: Option<i64>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub(crate) fn io(context: &str, err: io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{context}: {err}"))
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub(crate) fn closed() -> Self {
        Self::new(ErrorKind::Closed, "the connection was closed")
    }

    pub(crate) fn rpc(method: &str, err: RpcError) -> Self {
        Self {
            kind: ErrorKind::Rpc,
            message: format!("{method} failed: {}", err.message),
            code: Some(err.code),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the JSON-RPC error code of an [`ErrorKind::Rpc`] error.
    #[inline]
    pub fn code(&self) -> Option<i64> {
        self.code
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for Error {}
