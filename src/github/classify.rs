//! Classification of failed release-service attempts.

use reqwest::StatusCode;

/// Whether a failed attempt is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The attempt may succeed if repeated
    Retryable,
    /// The request itself is malformed; repeating it cannot help
    Fatal,
}

/// Classify the status of a failed attempt.
///
/// Only statuses that say the request itself is malformed are fatal. Anything
/// else, including statuses we know nothing about, is treated as temporary:
/// one extra attempt is much cheaper than abandoning a release upload.
pub fn classify_status(status: StatusCode) -> FailureClass {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => FailureClass::Fatal,
        _ => FailureClass::Retryable,
    }
}

/// Shorthand for [`classify_status`] on a raw status code
pub fn is_temporary_status(status: u16) -> bool {
    match StatusCode::from_u16(status) {
        Ok(status) => classify_status(status) == FailureClass::Retryable,
        Err(_) => true,
    }
}
