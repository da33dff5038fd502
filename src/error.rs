use std::fmt;

/// Result type for duelq operations
pub type Result<T> = std::result::Result<T, DuelqError>;

/// Main error type for the duelq library
#[derive(Debug, Clone)]
pub enum DuelqError {
    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Replay memory holds fewer transitions than a sample requires
    InsufficientData {
        available: usize,
        requested: usize,
    },

    /// A transition was fed with no legal action in its next state
    EmptyLegalActions,

    /// Action id outside the action space
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Checkpoint produced by an incompatible configuration
    CheckpointMismatch {
        field: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Numerical computation errors
    NumericalError(String),
}

impl fmt::Display for DuelqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuelqError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            DuelqError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            DuelqError::InsufficientData { available, requested } => {
                write!(
                    f,
                    "Insufficient data: {} transitions stored, {} requested",
                    available, requested
                )
            }
            DuelqError::EmptyLegalActions => {
                write!(f, "Transition carries an empty legal-action set")
            }
            DuelqError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            DuelqError::CheckpointMismatch { field, reason } => {
                write!(f, "Checkpoint mismatch in '{}': {}", field, reason)
            }
            DuelqError::IoError(msg) => write!(f, "IO error: {}", msg),
            DuelqError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            DuelqError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for DuelqError {}

// Conversion from std::io::Error
impl From<std::io::Error> for DuelqError {
    fn from(err: std::io::Error) -> Self {
        DuelqError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for DuelqError {
    fn from(err: bincode::Error) -> Self {
        DuelqError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl DuelqError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DuelqError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DuelqError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
