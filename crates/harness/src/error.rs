//! Error types for the invocation harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Driver provisioning failed for {method}: {reason}")]
    Provisioning { method: String, reason: String },

    #[error("No driver is attached to invocation '{0}'")]
    DriverNotAvailable(String),

    #[error("No initial page was opened for invocation '{0}'")]
    InitialPageNotSpecified(String),

    #[error("Page address {component} '{actual}' does not match pattern '{pattern}'")]
    AddressValidation {
        component: String,
        actual: String,
        pattern: String,
    },

    #[error("Invalid page address: {0}")]
    InvalidAddress(String),

    #[error("Landing page mismatch for {page}: {component} is '{actual}', expected '{expected}'")]
    LandingPageMismatch {
        page: String,
        component: String,
        actual: String,
        expected: String,
    },

    #[error("No variant of {container} matches: {reason}")]
    ResolutionAmbiguity { container: String, reason: String },

    #[error("No container resolver is bound to {0}")]
    NoResolverBound(String),

    #[error("Unknown {kind}: {name}")]
    NotRegistered { kind: &'static str, name: String },

    #[error("Artifact capture failed: {0}")]
    Capture(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Failures reported by a driver session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Driver session is disconnected")]
    Disconnected,

    #[error("Unsupported driver command: {0}")]
    UnsupportedCommand(String),

    #[error("Driver command failed: {0}")]
    Command(String),
}
