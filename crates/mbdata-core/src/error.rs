//! Common error types for vehicle telemetry providers

use thiserror::Error;

/// Result type for provider operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Classification of a provider HTTP status code.
///
/// Derived purely from the status code; every downstream branch in a
/// provider session is driven by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 200 - the body carries JSON to decode
    Success,
    /// 204 - success, nothing to decode
    NoContent,
    /// 400 / 401 - the access token was rejected
    ReauthRequired,
    /// 429 - too many requests
    RateLimited,
    /// 500 / 503 - provider side outage
    ServiceUnavailable,
    /// Anything else, including transport and decode failures
    Fatal,
}

impl DispatchOutcome {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => Self::Success,
            204 => Self::NoContent,
            400 | 401 => Self::ReauthRequired,
            429 => Self::RateLimited,
            500 | 503 => Self::ServiceUnavailable,
            _ => Self::Fatal,
        }
    }

    /// Whether the outcome counts as a successful call
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::NoContent)
    }
}

/// Errors that can occur while talking to a vehicle provider
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// No access token (or no refresh token) to authenticate with
    #[error("No credentials available")]
    NoCredentials,

    /// Connect/send/receive failed, including timeouts
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider rejected the token (HTTP 400/401)
    #[error("Authorization rejected (HTTP {status}), reauthenticated: {reauthenticated}")]
    AuthRejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Whether a token refresh succeeded before this error was returned.
        /// The original request is not retried; the caller decides.
        reauthenticated: bool,
    },

    /// Provider returned 429
    #[error("Rate limited by provider")]
    RateLimited,

    /// Provider returned 500/503
    #[error("Service unavailable (HTTP {0})")]
    ServiceUnavailable(u16),

    /// Empty or undecodable response body
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Resource discovery succeeded but yielded no usable fields
    #[error("Resource catalog is empty")]
    EmptyCatalog,

    /// OAuth error member in a token response
    #[error("Provider error: {0}")]
    Provider(String),

    /// Any status code without a dedicated policy
    #[error("Unhandled HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Invalid client configuration (e.g. an unusable base URL)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// The dispatch outcome class this error belongs to
    pub fn outcome(&self) -> DispatchOutcome {
        match self {
            ApiError::AuthRejected { .. } => DispatchOutcome::ReauthRequired,
            ApiError::RateLimited => DispatchOutcome::RateLimited,
            ApiError::ServiceUnavailable(_) => DispatchOutcome::ServiceUnavailable,
            ApiError::NoCredentials
            | ApiError::Transport(_)
            | ApiError::MalformedResponse(_)
            | ApiError::EmptyCatalog
            | ApiError::Provider(_)
            | ApiError::UnexpectedStatus(_)
            | ApiError::Config(_) => DispatchOutcome::Fatal,
        }
    }

    /// Whether retrying later can reasonably succeed without operator action
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_)
            | ApiError::RateLimited
            | ApiError::ServiceUnavailable(_) => true,
            ApiError::AuthRejected {
                reauthenticated, ..
            } => *reauthenticated,
            _ => false,
        }
    }
}
