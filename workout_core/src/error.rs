//! Error types for the workout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Transport-level HTTP failure talking to the platform
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session, appointment or template missing or not visible to the client
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client holds no registration for the appointment
    #[error("Not registered for appointment {0}")]
    NotRegistered(uuid::Uuid),

    /// Platform answered with a non-success status
    #[error("Platform returned {status}: {body}")]
    Platform { status: u16, body: String },

    /// Write to the platform could not be applied
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// User intent not valid in the current runner state
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}
