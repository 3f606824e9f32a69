//! Response classification
//!
//! Maps a completed transport response to either a success payload or a
//! normalized [`ErrorModel`]. Status classification and body decoding are
//! separate steps: a malformed error body degrades to a generic message.

use bytes::Bytes;

use crate::http::error::{ErrorModel, ResponseModel};
use crate::http::transport::TransportResponse;

/// HTTP statuses treated as hard failures
pub const HARD_FAILURE_STATUSES: [u16; 8] = [400, 401, 403, 404, 500, 502, 503, 504];

/// Result of classifying one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Raw response body, passed through undecoded
    Success(Bytes),
    Failure(ErrorModel),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

pub fn is_hard_failure(status: u16) -> bool {
    HARD_FAILURE_STATUSES.contains(&status)
}

/// Message used when a hard-failure body is not a `{status, message}` record
pub fn generic_description(status: u16) -> String {
    format!("Response status code was unacceptable: {}.", status)
}

/// Classify a completed transport response
///
/// Soft transport failures win over any status the transport may also have
/// reported. Other transport failures without a status still produce a
/// failure carrying the transport code.
pub fn classify(response: &TransportResponse) -> Outcome {
    if let Some(error) = &response.error {
        if error.code.is_soft() {
            return Outcome::Failure(ErrorModel::from(error));
        }
    }

    match (response.status, &response.error) {
        (Some(status), _) if is_hard_failure(status) => {
            classify_status(status, response.body.as_deref().unwrap_or_default())
        }
        (_, Some(error)) => Outcome::Failure(ErrorModel::from(error)),
        (Some(status), None) => {
            classify_status(status, response.body.as_deref().unwrap_or_default())
        }
        (None, None) => Outcome::Success(response.body.clone().unwrap_or_default()),
    }
}

/// Classify a raw status and body, ignoring transport errors
pub fn classify_status(status: u16, body: &[u8]) -> Outcome {
    if !is_hard_failure(status) {
        return Outcome::Success(Bytes::copy_from_slice(body));
    }

    let message = match serde_json::from_slice::<ResponseModel>(body) {
        Ok(decoded) => decoded.message,
        Err(_) => generic_description(status),
    };
    Outcome::Failure(ErrorModel::new(i32::from(status), message))
}
