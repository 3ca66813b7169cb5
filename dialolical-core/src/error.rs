//! Error types for the Dialolical client.
//!
//! Every failure the bot can hit while talking to the service maps onto one
//! variant of [`DialolicalError`], each carrying a stable code.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Network | Transport failures and request timeouts |
//! | E2001-E2099 | Auth | Rejected or missing credentials |
//! | E3001-E3099 | API | Non-2xx responses and undecodable bodies |
//! | E4001-E4099 | Session | Turn polling timeouts and cancellation |
//! | E5001-E5099 | Config | Configuration loading and validation |
//! | E9001-E9099 | General | Internal errors |

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum DialolicalError {
    // ========================================================================
    // Network Errors (E1001-E1099)
    // ========================================================================
    /// The service could not be reached
    #[error("[E1001] Network error: {0}")]
    Network(String),

    /// The HTTP request did not complete in time
    #[error("[E1002] Request timed out: {0}")]
    RequestTimeout(String),

    // ========================================================================
    // Auth Errors (E2001-E2099)
    // ========================================================================
    /// The service rejected the bearer credential
    #[error("[E2001] Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// An authenticated call was attempted without an API key
    #[error("[E2002] No API key available for participant '{participant_id}'")]
    MissingCredential { participant_id: String },

    // ========================================================================
    // API Errors (E3001-E3099)
    // ========================================================================
    #[error("[E3001] Not found: {0}")]
    NotFound(String),

    /// The service refused the request payload or the current dialogue state
    #[error("[E3002] Request rejected: {0}")]
    Validation(String),

    #[error("[E3003] Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("[E3004] Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body was not the JSON we expected
    #[error("[E3005] Failed to decode response: {0}")]
    Decode(String),

    // ========================================================================
    // Session Errors (E4001-E4099)
    // ========================================================================
    #[error("[E4001] Gave up waiting for turn in dialogue '{dialogue_id}' after {waited_secs} seconds")]
    PollTimeout { dialogue_id: String, waited_secs: u64 },

    #[error("[E4002] Session cancelled")]
    Cancelled,

    // ========================================================================
    // Configuration Errors (E5001-E5099)
    // ========================================================================
    #[error("[E5001] Configuration error: {0}")]
    Config(String),

    #[error("[E5002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9001] Internal error: {0}")]
    Internal(String),
}

pub type DialolicalResult<T> = Result<T, DialolicalError>;

/// Error body returned by the service, e.g. `{"error": "not your turn"}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

impl DialolicalError {
    /// Build an error from a non-success HTTP response.
    ///
    /// `body` is the raw response text; when it carries the service's
    /// `{"error": ...}` shape only the message is kept.
    pub fn from_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });

        match status.as_u16() {
            401 | 403 => DialolicalError::Auth {
                status: status.as_u16(),
                message,
            },
            404 => DialolicalError::NotFound(message),
            400 | 409 | 422 => DialolicalError::Validation(message),
            429 => DialolicalError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(60),
            },
            code => DialolicalError::Server {
                status: code,
                message,
            },
        }
    }

    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            DialolicalError::Network(_) | DialolicalError::RequestTimeout(_)
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            DialolicalError::Auth { .. } | DialolicalError::MissingCredential { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DialolicalError::Config(_) | DialolicalError::InvalidConfigValue { .. }
        )
    }

    /// Returns true if the same request might succeed later. The client never
    /// retries on its own; this only drives log severity and CLI hints.
    pub fn is_transient(&self) -> bool {
        match self {
            DialolicalError::Network(_)
            | DialolicalError::RequestTimeout(_)
            | DialolicalError::RateLimited { .. } => true,
            DialolicalError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            DialolicalError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            DialolicalError::Network(_) => Some(Duration::from_secs(5)),
            DialolicalError::RequestTimeout(_) => Some(Duration::from_secs(10)),
            DialolicalError::Server { status, .. } if *status >= 500 => {
                Some(Duration::from_secs(5))
            }
            _ => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DialolicalError::Network(_) => "E1001",
            DialolicalError::RequestTimeout(_) => "E1002",
            DialolicalError::Auth { .. } => "E2001",
            DialolicalError::MissingCredential { .. } => "E2002",
            DialolicalError::NotFound(_) => "E3001",
            DialolicalError::Validation(_) => "E3002",
            DialolicalError::RateLimited { .. } => "E3003",
            DialolicalError::Server { .. } => "E3004",
            DialolicalError::Decode(_) => "E3005",
            DialolicalError::PollTimeout { .. } => "E4001",
            DialolicalError::Cancelled => "E4002",
            DialolicalError::Config(_) => "E5001",
            DialolicalError::InvalidConfigValue { .. } => "E5002",
            DialolicalError::Internal(_) => "E9001",
        }
    }

    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            DialolicalError::Network(_) => {
                Some("Check that the Dialolical server is running and DIALOLICAL_URL is correct")
            }
            DialolicalError::Auth { .. } => {
                Some("The API key was rejected. Register a new participant and try again")
            }
            DialolicalError::MissingCredential { .. } => {
                Some("The server did not issue an API key at registration; check the server version")
            }
            DialolicalError::RateLimited { .. } => {
                Some("Too many requests. Wait for the rate limit window to reset")
            }
            DialolicalError::PollTimeout { .. } => Some(
                "The opponent did not take their turn. Raise DIALOLICAL_POLLING__TIMEOUT_SECS or set it to 0 to wait forever",
            ),
            DialolicalError::Config(_) | DialolicalError::InvalidConfigValue { .. } => {
                Some("Check dialolical.toml and DIALOLICAL_* environment variables")
            }
            _ => None,
        }
    }

    /// Log this error with appropriate severity level.
    pub fn log(&self) {
        let code = self.error_code();
        let suggestion = self.user_suggestion();

        if self.is_transient() {
            warn!(
                error_code = %code,
                suggestion = suggestion,
                "Transient error occurred: {}",
                self
            );
        } else {
            error!(
                error_code = %code,
                suggestion = suggestion,
                "Error occurred: {}",
                self
            );
        }
    }
}

impl From<reqwest::Error> for DialolicalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DialolicalError::RequestTimeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            DialolicalError::Network(err.to_string())
        } else if err.is_decode() {
            DialolicalError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DialolicalError::from_status(status, None, "")
        } else {
            DialolicalError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DialolicalError {
    fn from(err: serde_json::Error) -> Self {
        DialolicalError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for DialolicalError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => DialolicalError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            config::ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            } => DialolicalError::InvalidConfigValue {
                key: key.unwrap_or_else(|| origin.map(|o| o.to_string()).unwrap_or_default()),
                message: format!("Expected {}, got {}", expected, unexpected),
            },
            _ => DialolicalError::Config(err.to_string()),
        }
    }
}

/// Format an error for CLI display with its suggestion and retry hint.
pub struct CliErrorDisplay<'a> {
    error: &'a DialolicalError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a DialolicalError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl fmt::Display for CliErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                writeln!(f)?;
                writeln!(f, "  Suggestion: {}", suggestion)?;
            }
        }

        if let Some(delay) = self.error.suggested_retry_delay() {
            writeln!(f)?;
            writeln!(
                f,
                "  This error may be temporary. Try again in {} seconds.",
                delay.as_secs()
            )?;
        }

        Ok(())
    }
}
