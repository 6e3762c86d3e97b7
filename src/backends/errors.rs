use thiserror::Error;

/// Typed failure of a backend call.
///
/// Every variant is final: callers degrade (empty favorites, `has_more =
/// false`, rolled back toggle) rather than retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Credentials or token rejected (401, 403), or login response unusable.
    #[error("Authentication failed: {message} (status: {status:?})")]
    Authentication {
        status: Option<u16>,
        message: String,
    },

    /// Timeout, refused connection and other transport failures.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-2xx response.
    #[error("Request failed: {message} (status: {status})")]
    Status { status: u16, message: String },

    /// The body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// The profile cannot be used with this client.
    #[error("Invalid server profile: {0}")]
    InvalidProfile(String),
}

impl BackendError {
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            BackendError::Network(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            BackendError::Network(format!("Connection failed: {}", error))
        } else if error.is_decode() {
            BackendError::Decode(error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => BackendError::Authentication {
                status: Some(status),
                message: body,
            },
            _ => BackendError::Status {
                status,
                message: body,
            },
        }
    }

    /// Re-labels a failure of the login call. Malformed payloads and
    /// unexpected statuses both reject the login.
    pub fn into_auth(self) -> Self {
        match self {
            BackendError::Authentication { .. } | BackendError::Network(_) => self,
            BackendError::Status { status, message } => BackendError::Authentication {
                status: Some(status),
                message,
            },
            BackendError::Decode(message) | BackendError::InvalidProfile(message) => {
                BackendError::Authentication {
                    status: None,
                    message,
                }
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, BackendError::Authentication { .. })
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
