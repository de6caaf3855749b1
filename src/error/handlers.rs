//! Standardized mapping from registry HTTP responses to login errors

use crate::error::RegistryError;
use reqwest::StatusCode;

/// Standard error handler for registry ping responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Classify a non-success ping status into the login error taxonomy
    pub fn classify(status: u16, error_text: &str) -> RegistryError {
        match status {
            400..=499 => Self::handle_auth_error(status, error_text),
            500..=599 => Self::handle_server_error(status, error_text),
            _ => RegistryError::UnexpectedStatus {
                status,
                message: Self::describe(status, error_text),
            },
        }
    }

    /// Handle authentication-related HTTP errors
    pub fn handle_auth_error(status: u16, error_text: &str) -> RegistryError {
        let message = match status {
            400 => "Invalid token request parameters".to_string(),
            401 => "Invalid username or password".to_string(),
            403 => "Access denied - insufficient permissions".to_string(),
            404 => "Registry API v2 endpoint not found".to_string(),
            429 => "Rate limited by registry - try again later".to_string(),
            _ => Self::describe(status, error_text),
        };

        RegistryError::Auth { status, message }
    }

    /// Handle server-side failures that may resolve on their own
    pub fn handle_server_error(status: u16, error_text: &str) -> RegistryError {
        let message = match status {
            500 => format!("Registry internal server error: {}", error_text),
            502 | 503 => format!("Registry temporarily unavailable: {}", error_text),
            504 => "Registry gateway timeout".to_string(),
            507 => "Registry out of storage".to_string(),
            _ => Self::describe(status, error_text),
        };

        RegistryError::Transient { status, message }
    }

    fn describe(status: u16, error_text: &str) -> String {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown status");
        if error_text.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, error_text)
        }
    }
}
