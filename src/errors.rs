//! Error handling for the LTR training pipeline
//!
//! Every fallible operation in the crate returns [`LtrResult`]. Per-record
//! extraction problems never reach this type; they are logged and skipped
//! inside the feature extractor.

use thiserror::Error;

/// Main error type for the training pipeline
#[derive(Error, Debug)]
pub enum LtrError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Malformed judgment on line {line}: {message}")]
    Judgment { line: usize, message: String },

    /// The engine answered, but with a status the caller does not accept.
    #[error("Unexpected response to {operation}: Status: {status} {reason}\nResponse: {body}")]
    Transport {
        operation: String,
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Network operation failed: {operation}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Training set error: {message}")]
    TrainingSet { message: String },

    #[error("Trainer failed: {message}")]
    Trainer { message: String },

    #[error("Model conversion failed: {message}")]
    Model { message: String },

    #[error("Pipeline stage {stage} failed")]
    Stage {
        stage: String,
        #[source]
        source: Box<LtrError>,
    },
}

/// Type alias for Result with LtrError
pub type LtrResult<T> = Result<T, LtrError>;

impl LtrError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a judgment parse error for a 1-based line number
    pub fn judgment(line: usize, message: impl Into<String>) -> Self {
        Self::Judgment {
            line,
            message: message.into(),
        }
    }

    /// Create a transport error from a non-accepted engine response
    pub fn transport(
        operation: impl Into<String>,
        status: u16,
        reason: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    pub fn training_set(message: impl Into<String>) -> Self {
        Self::TrainingSet {
            message: message.into(),
        }
    }

    pub fn trainer(message: impl Into<String>) -> Self {
        Self::Trainer {
            message: message.into(),
        }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the pipeline stage it aborted
    pub fn stage(stage: impl Into<String>, source: LtrError) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status carried by a transport error, looking through stage wrappers
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Stage { source, .. } => source.status(),
            _ => None,
        }
    }

    /// The innermost error, with any stage wrappers removed
    pub fn root(&self) -> &LtrError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convert from figment errors
impl From<figment::Error> for LtrError {
    fn from(err: figment::Error) -> Self {
        LtrError::config(err.to_string())
    }
}
