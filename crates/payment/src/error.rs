use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One structured validation error returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayValidationError {
    pub name: String,
    pub error: String,
}

/// Business-level rejection: the gateway understood the request and said no.
///
/// Safe to act on. The caller may retry the payment step with corrected
/// input or abort.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct GatewayBusinessError {
    pub message: String,
    pub errors: Vec<GatewayValidationError>,
}

impl GatewayBusinessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_error(mut self, name: impl Into<String>, error: impl Into<String>) -> Self {
        self.errors.push(GatewayValidationError {
            name: name.into(),
            error: error.into(),
        });
        self
    }

    /// Returns the validation errors, or a single entry carrying the message
    /// when the gateway sent none.
    pub fn error_list(&self) -> Vec<GatewayValidationError> {
        if self.errors.is_empty() {
            vec![GatewayValidationError {
                name: "Gateway".to_string(),
                error: self.message.clone(),
            }]
        } else {
            self.errors.clone()
        }
    }
}

/// Errors that can occur when calling the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or answered with a server error.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The gateway did not answer in time.
    #[error("Gateway timed out after {0:?}")]
    Timeout(Duration),

    /// The gateway rejected the request.
    #[error("Gateway rejected request: {0}")]
    Rejected(GatewayBusinessError),

    /// The gateway answered with a body we could not read.
    #[error("Malformed gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Returns true when the outcome of the call is unknown.
    ///
    /// Only a rejection proves nothing happened at the gateway; every other
    /// failure may have raced a successful operation.
    pub fn is_indeterminate(&self) -> bool {
        !matches!(self, GatewayError::Rejected(_))
    }

    /// Returns the business error if this is a rejection.
    pub fn into_business(self) -> Option<GatewayBusinessError> {
        match self {
            GatewayError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
