//! Registry error types
//!
//! Admission outcomes for stream registration. These are ordinary rejections
//! reported back to the ingest server, not failures of the process.

/// Reason a registration was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No capacity left for another active stream
    CapacityReached,
    /// The key is held by a stream with a different password
    PasswordMismatch(String),
    /// The key is not configured and free choice is disabled
    NotPreconfigured(String),
    /// A reserved slot was seeded for a key that already has an entry
    AlreadyRegistered(String),
}

impl RegistryError {
    /// Short machine-readable reason, used in logs and HTTP bodies
    pub fn reason(&self) -> &'static str {
        match self {
            RegistryError::CapacityReached => "capacity_reached",
            RegistryError::PasswordMismatch(_) => "password_mismatch",
            RegistryError::NotPreconfigured(_) => "not_preconfigured",
            RegistryError::AlreadyRegistered(_) => "already_registered",
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::CapacityReached => write!(f, "Stream capacity reached"),
            RegistryError::PasswordMismatch(key) => {
                write!(f, "Stream key is reserved by another publisher: {}", key)
            }
            RegistryError::NotPreconfigured(key) => {
                write!(f, "Stream key is not configured: {}", key)
            }
            RegistryError::AlreadyRegistered(key) => {
                write!(f, "Stream key already has an entry: {}", key)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
