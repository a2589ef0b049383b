//! Error types for transformations and macros.

use wr_parser::ParseError;
use wr_xdom::Syntax;

use crate::source::SourceError;

/// No macro is registered under the requested id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown macro: {id}")]
pub struct MacroLookupError {
    /// Requested macro id.
    pub id: String,
    /// Syntax the lookup was made for.
    pub syntax: Option<Syntax>,
}

impl MacroLookupError {
    pub(crate) fn new(id: &str, syntax: Option<&Syntax>) -> Self {
        Self {
            id: id.to_owned(),
            syntax: syntax.cloned(),
        }
    }
}

/// Failure while binding parameters or running a macro.
#[derive(Debug, thiserror::Error)]
pub enum MacroExecutionError {
    #[error("Missing mandatory parameter [{name}]")]
    MissingParameter { name: String },
    #[error("Invalid value [{value}] for parameter [{name}]: expected {expected}")]
    InvalidParameter {
        name: String,
        value: String,
        expected: String,
    },
    #[error("Unknown parameter [{name}]")]
    UnknownParameter { name: String },
    #[error("This macro requires content")]
    MissingContent,
    #[error("The [{id}] macro is a standalone macro and it cannot be used inline")]
    InlineNotSupported { id: String },
    #[error("No document source is available")]
    NoSource,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transformation(Box<TransformationError>),
    #[error("{0}")]
    Failed(String),
}

impl MacroExecutionError {
    /// Whether the failure comes from broken infrastructure rather than from
    /// the macro call itself.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Source(err) => err.is_fatal(),
            Self::Transformation(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl From<TransformationError> for MacroExecutionError {
    fn from(err: TransformationError) -> Self {
        Self::Transformation(Box::new(err))
    }
}

/// Failure of a transformation pass.
#[derive(Debug, thiserror::Error)]
pub enum TransformationError {
    /// The pass failed; the document is still usable.
    #[error("Transformation [{transformation}] failed: {message}")]
    Failed {
        transformation: String,
        message: String,
    },
    /// Infrastructure failure that must reach the caller.
    #[error("Transformation [{transformation}] aborted: {message}")]
    Fatal {
        transformation: String,
        message: String,
    },
}

impl TransformationError {
    /// Recoverable failure of `transformation`.
    pub fn failed(transformation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            transformation: transformation.into(),
            message: message.into(),
        }
    }

    /// Fatal failure of `transformation`.
    pub fn fatal(transformation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fatal {
            transformation: transformation.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Name of the failing transformation.
    #[must_use]
    pub fn transformation(&self) -> &str {
        match self {
            Self::Failed { transformation, .. } | Self::Fatal { transformation, .. } => {
                transformation
            }
        }
    }
}
