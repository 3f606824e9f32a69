//! Uniform error model and transport failure codes
//!
//! Normalizes transport faults and error payloads returned by servers into a
//! single `{status, message}` record that can travel as JSON bytes.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Normalized failure record delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorModel {
    /// HTTP status code, or a negative transport code
    pub status: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorModel {
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Serialize to the JSON payload used when errors travel as values
    pub fn to_bytes(&self) -> crate::Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<&TransportError> for ErrorModel {
    fn from(error: &TransportError) -> Self {
        ErrorModel::new(error.code.code(), error.message.clone())
    }
}

/// Error body shape servers return alongside a failing status
///
/// `status` is a string on the wire; only `message` is carried forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseModel {
    pub status: String,
    pub message: String,
}

/// Transport-level failure codes
///
/// Values follow the negative code space of Foundation's `URLError`, which
/// is what server and client teams usually already log against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportCode {
    Unknown,
    TimedOut,
    CannotConnectToHost,
    NetworkConnectionLost,
    NotConnectedToInternet,
}

impl TransportCode {
    pub fn code(&self) -> i32 {
        match self {
            TransportCode::Unknown => -1,
            TransportCode::TimedOut => -1001,
            TransportCode::CannotConnectToHost => -1004,
            TransportCode::NetworkConnectionLost => -1005,
            TransportCode::NotConnectedToInternet => -1009,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(TransportCode::Unknown),
            -1001 => Some(TransportCode::TimedOut),
            -1004 => Some(TransportCode::CannotConnectToHost),
            -1005 => Some(TransportCode::NetworkConnectionLost),
            -1009 => Some(TransportCode::NotConnectedToInternet),
            _ => None,
        }
    }

    /// Soft failures are classified before any HTTP status is inspected
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            TransportCode::NetworkConnectionLost
                | TransportCode::NotConnectedToInternet
                | TransportCode::TimedOut
                | TransportCode::CannotConnectToHost
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransportCode::Unknown => "An unknown transport error occurred.",
            TransportCode::TimedOut => "The request timed out.",
            TransportCode::CannotConnectToHost => "Could not connect to the server.",
            TransportCode::NetworkConnectionLost => "The network connection was lost.",
            TransportCode::NotConnectedToInternet => {
                "The Internet connection appears to be offline."
            }
        }
    }
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Failure reported by a transport instead of (or before) an HTTP status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: TransportCode,
    pub message: String,
}

impl TransportError {
    pub fn new(code: TransportCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error carrying the code's stock description as its message
    pub fn from_code(code: TransportCode) -> Self {
        Self::new(code, code.description())
    }

    /// Create from a network/request error
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let code = if error.is_timeout() {
            TransportCode::TimedOut
        } else if error.is_connect() {
            match io_error_kind(error) {
                Some(io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted) => {
                    TransportCode::NetworkConnectionLost
                }
                _ => TransportCode::CannotConnectToHost,
            }
        } else {
            match io_error_kind(error) {
                Some(
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof,
                ) => TransportCode::NetworkConnectionLost,
                Some(io::ErrorKind::TimedOut) => TransportCode::TimedOut,
                _ => TransportCode::Unknown,
            }
        };

        Self::new(code, error.to_string())
    }
}

/// Walk the source chain looking for the io::Error that caused a failure
fn io_error_kind(error: &(dyn StdError + 'static)) -> Option<io::ErrorKind> {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport error [{}]: {}", self.code.code(), self.message)
    }
}

impl StdError for TransportError {}
