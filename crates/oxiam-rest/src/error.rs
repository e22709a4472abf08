use http::{Method, StatusCode};
use serde::Serialize;

/// Field-level validation failure reported by a bound form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormError {
    pub field: String,
    pub message: String,
}

fn format_method_list(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors produced by REST method processing.
///
/// Each variant maps to one HTTP status via [`RestError::status`]; the
/// `Http` variant carries an already-decided status through
/// `handle_rest_method_exception` unchanged.
///
/// # Examples
///
/// ```rust
/// use oxiam_rest::error::RestError;
///
/// let err = RestError::NotFound("Not found".to_string());
/// assert_eq!(err.status().as_u16(), 404);
/// assert!(err.to_string().starts_with("Rest:"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The helper or its collaborators are wired incorrectly.
    #[error("Rest: {0}")]
    Configuration(String),

    /// The request method is outside the route's allow list.
    #[error("Rest: method {method} is not allowed (allowed: {})", format_method_list(.allowed))]
    MethodNotAllowed {
        method: Method,
        allowed: Vec<Method>,
    },

    /// The addressed entity does not exist.
    #[error("Rest: {0}")]
    NotFound(String),

    /// The submitted payload failed form validation.
    #[error("Rest: validation failed with {} field error(s)", .errors.len())]
    Validation { errors: Vec<FormError> },

    /// An error already mapped to an HTTP status.
    #[error("Rest: {message}")]
    Http {
        status: StatusCode,
        message: String,
    },
}

impl RestError {
    /// HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::Validation { .. } => StatusCode::BAD_REQUEST,
            RestError::Http { status, .. } => *status,
        }
    }

    /// Client-facing message, without the `Rest:` log prefix.
    pub fn public_message(&self) -> String {
        match self {
            RestError::Configuration(msg) => msg.clone(),
            RestError::MethodNotAllowed { method, allowed } => format!(
                "Method '{}' is not allowed (allowed: {})",
                method,
                format_method_list(allowed)
            ),
            RestError::NotFound(msg) => msg.clone(),
            RestError::Validation { errors } => {
                format!("Validation failed with {} field error(s)", errors.len())
            }
            RestError::Http { message, .. } => message.clone(),
        }
    }
}

/// An error carrying an explicit HTTP status through layers that would
/// otherwise lose it.
///
/// `handle_rest_method_exception` preserves the status when no more specific
/// classification applies, instead of collapsing the error to 400.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct StatusError {
    pub status: StatusCode,
    pub message: String,
}

impl StatusError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Convenience `Result` alias for REST operations.
pub type Result<T> = std::result::Result<T, RestError>;
