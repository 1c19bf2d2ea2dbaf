//! Error types for the mock-location registry.

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A remote call failed (process, device, or permission problem).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Expected remote file is absent.
    #[error("remote file not found: {path}")]
    NotFound { path: String },

    /// Remote file exists but is not a JSON array of strings.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// Identifier is empty or otherwise unusable.
    #[error("invalid identifier: {id:?}")]
    InvalidIdentifier { id: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Operation not supported on this device.
    #[error("unsupported operation: {operation} - {reason}")]
    Unsupported { operation: String, reason: String },
}

impl RegistryError {
    /// Exit code for CLI consumers.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 1,
            Self::Config { .. } => 1,
            Self::InvalidIdentifier { .. } => 1,

            Self::Unsupported { .. } => 2,

            // Device/transient
            Self::Transport { .. } => 5,

            Self::Parse { .. } => 6,
        }
    }

    /// Whether persisted state in this condition should be read as empty.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Parse { .. })
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
