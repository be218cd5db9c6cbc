//! Session error types.

use thiserror::Error;

const NETWORK_MESSAGE: &str = "Unable to reach the server. Please check your connection.";
const EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
const NOT_LOGGED_IN_MESSAGE: &str = "Please log in to continue.";
const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Rejected on the client before any network call
    #[error("{0}")]
    Validation(String),

    /// Bad login or registration input, as reported by the server
    #[error("{0}")]
    Credential(String),

    /// Access token rejected and refresh failed; the session has been ended
    #[error("Session expired")]
    AuthExpired,

    /// Request never reached the server
    #[error("Network unavailable: {0}")]
    Network(String),

    /// Non-success response from the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Operation needs a session and there is none
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Token storage error
    #[error("Storage error: {0}")]
    Storage(#[from] devconnect_storage::StorageError),

    /// HTTP error (client construction, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<devconnect_config::CoreError> for SessionError {
    fn from(err: devconnect_config::CoreError) -> Self {
        match err {
            devconnect_config::CoreError::InvalidUrl(e) => SessionError::InvalidUrl(e),
            other => SessionError::Config(other.to_string()),
        }
    }
}

impl SessionError {
    /// Classify an error returned by `RequestBuilder::send`.
    ///
    /// Connection, timeout and request failures mean the server was never
    /// reached; anything else is kept as an HTTP error.
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            SessionError::Network(err.to_string())
        } else {
            SessionError::Http(err)
        }
    }

    /// Text a view layer shows to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(message)
            | SessionError::Credential(message)
            | SessionError::Api { message, .. } => message.clone(),
            SessionError::AuthExpired => EXPIRED_MESSAGE.to_string(),
            SessionError::Network(_) => NETWORK_MESSAGE.to_string(),
            SessionError::NotLoggedIn => NOT_LOGGED_IN_MESSAGE.to_string(),
            SessionError::Http(e) if e.is_connect() || e.is_timeout() => {
                NETWORK_MESSAGE.to_string()
            }
            _ => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable
    /// - API responses with 5xx status codes
    /// - Connection timeouts
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Network(_) => true,
            SessionError::Api { status, .. } => *status >= 500,
            SessionError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
