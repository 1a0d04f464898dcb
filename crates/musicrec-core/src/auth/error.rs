use thiserror::Error;

use crate::api::ApiError;

use super::flow::FailureReason;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Corrupted session: {0}")]
    CorruptedSession(String),

    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization denied by provider: {0}")]
    ExchangeDenied(String),

    #[error("No authorization code received")]
    ExchangeMissingCode,

    #[error("Code exchange failed: {0}")]
    ExchangeFailed(#[source] ApiError),

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Login is not configured: {0}")]
    Misconfigured(String),

    #[error("Timed out waiting for the provider redirect")]
    CallbackTimeout,

    #[error("Callback listener error: {0}")]
    Listener(#[from] std::io::Error),
}

impl AuthError {
    /// Why the callback landing ended in `ExchangeFailed`.
    pub fn reason(&self) -> FailureReason {
        match self {
            AuthError::ExchangeDenied(_) => FailureReason::ProviderDenied,
            AuthError::ExchangeMissingCode => FailureReason::MissingCode,
            other => FailureReason::ExchangeError(other.to_string()),
        }
    }

    /// Short message for the callback view.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::ExchangeDenied(_) => "Authorization cancelled or failed".to_string(),
            AuthError::ExchangeMissingCode => "No authorization code received".to_string(),
            AuthError::ExchangeFailed(_) => "Authentication failed. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
