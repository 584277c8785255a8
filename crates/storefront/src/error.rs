//! Unified cart error handling with Sentry integration.
//!
//! Every cart operation returns `Result<T, CartError>`. Errors are caught at
//! the user action that triggered them, shown to the user through
//! [`CartError::user_message`], and reported here before being dropped.

use thiserror::Error;

use crate::cart::NormalizeError;

/// Message shown when the server gave no usable error message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Message shown for transport failures.
pub const NETWORK_FAILURE_MESSAGE: &str = "Could not reach the store. Please try again.";

/// Message shown when a 2xx body could not be read as a cart.
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected cart response";

/// Cart operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Malformed or missing input. The request was never sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure: offline, timeout, connection refused, body read.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status, or a success body that is not a cart.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl CartError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a server error, falling back to [`GENERIC_FAILURE_MESSAGE`]
    /// when the server sent no message.
    #[must_use]
    pub fn server(status: u16, message: Option<String>) -> Self {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        Self::Server { status, message }
    }

    /// Error for a success response whose body is not a cart.
    #[must_use]
    pub fn unexpected_body(status: u16, err: &NormalizeError) -> Self {
        tracing::warn!(status, error = %err, "Cart response could not be normalized");
        Self::Server {
            status,
            message: UNEXPECTED_RESPONSE_MESSAGE.to_string(),
        }
    }

    /// Text shown to the user at the control or panel that triggered the
    /// failed action.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(message) | Self::Server { message, .. } => message,
            Self::Network(_) => NETWORK_FAILURE_MESSAGE,
        }
    }
}

impl From<reqwest::Error> for CartError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Log a caught cart error and forward it to Sentry.
///
/// Server-side failures (5xx) are captured as Sentry events; everything else
/// becomes a breadcrumb so it shows up in the trail of a later report.
pub fn report(action: &str, err: &CartError) {
    match err {
        CartError::Server { status, .. } if *status >= 500 => {
            let event_id = sentry::capture_error(err);
            tracing::error!(
                action,
                error = %err,
                sentry_event_id = %event_id,
                "Cart action failed"
            );
        }
        CartError::Validation(_) => {
            tracing::debug!(action, error = %err, "Cart action rejected");
            add_breadcrumb("cart", &format!("{action} rejected"), None);
        }
        CartError::Network(_) | CartError::Server { .. } => {
            tracing::warn!(action, error = %err, "Cart action failed");
            let detail = err.to_string();
            add_breadcrumb(
                "cart",
                &format!("{action} failed"),
                Some(&[("error", detail.as_str())]),
            );
        }
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::validation("productId is required");
        assert_eq!(err.to_string(), "Validation error: productId is required");

        let err = CartError::server(404, Some("Product not found".to_string()));
        assert_eq!(err.to_string(), "Server error (404): Product not found");
    }

    #[test]
    fn test_server_message_falls_back_to_generic() {
        assert_eq!(CartError::server(500, None).user_message(), "Request failed");
        assert_eq!(
            CartError::server(500, Some("   ".to_string())).user_message(),
            "Request failed"
        );
    }

    #[test]
    fn test_network_user_message_is_generic() {
        let err = CartError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), NETWORK_FAILURE_MESSAGE);
    }

    #[test]
    fn test_unexpected_body_keeps_status() {
        let err = CartError::unexpected_body(200, &NormalizeError::MissingTotal);
        assert_eq!(
            err,
            CartError::Server {
                status: 200,
                message: UNEXPECTED_RESPONSE_MESSAGE.to_string()
            }
        );
    }
}
