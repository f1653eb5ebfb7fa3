//! Error types for simulated trader sessions
//!
//! Comprehensive error taxonomy using thiserror. Only `Connect` ends a
//! session early; the other variants are recorded and the session carries on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level session error
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionError {
    #[error("Connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Send failed: {reason}")]
    Send { reason: String },

    #[error("Drain failed: {reason}")]
    Drain { reason: String },

    #[error("Worker fault: {reason}")]
    WorkerFault { reason: String },
}

impl SessionError {
    /// Whether the error ends the session on its own
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Connect { .. } | SessionError::WorkerFault { .. })
    }
}

/// Registration acknowledgement problems. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistrationError {
    #[error("No acknowledgement before deadline")]
    Timeout,

    #[error("Unrecognized acknowledgement: {response}")]
    Unrecognized { response: String },

    #[error("Connection closed before acknowledgement")]
    Closed,

    #[error("I/O error: {reason}")]
    Io { reason: String },
}
