use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use reflexion_model::{ErrorKind as ModelErrorKind, ModelProviderError};

/// The tag of an [`Error`], for callers that handle kinds differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The generation capability was unreachable or failed.
    ExternalCallFailure,
    /// A returned payload did not decode into the expected record.
    SchemaMismatch,
    /// The final message is not a recognizable answer record.
    ClassificationFailure,
    /// A tool-calling agent ran out of steps.
    StepLimitExceeded,
}

/// Errors that abort an agent invocation.
///
/// None of them are retried by the agents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model provider failed.
    #[error("external call failed: {source}")]
    ExternalCallFailure {
        /// The provider's own error.
        #[from]
        source: ProviderError,
    },
    /// A payload did not decode into `expected`.
    #[error("payload does not match `{expected}`: {reason}")]
    SchemaMismatch {
        /// Name of the expected record.
        expected: &'static str,
        /// What went wrong.
        reason: String,
    },
    /// The last AI message could not be classified as a final answer.
    #[error("cannot classify the final answer: {reason}")]
    ClassificationFailure {
        /// What went wrong.
        reason: String,
    },
    /// The agent did not produce a final answer within `steps` steps.
    #[error("no final answer after {steps} steps")]
    StepLimitExceeded {
        /// The configured step limit.
        steps: usize,
    },
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ExternalCallFailure { .. } => ErrorKind::ExternalCallFailure,
            Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Error::ClassificationFailure { .. } => {
                ErrorKind::ClassificationFailure
            }
            Error::StepLimitExceeded { .. } => ErrorKind::StepLimitExceeded,
        }
    }

    #[inline]
    pub(crate) fn schema_mismatch(
        expected: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Error::SchemaMismatch {
            expected,
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn classification(reason: impl Into<String>) -> Self {
        Error::ClassificationFailure {
            reason: reason.into(),
        }
    }
}

impl From<Box<dyn ModelProviderError>> for Error {
    #[inline]
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        ProviderError(err).into()
    }
}

/// A type-erased error from a model provider.
#[derive(Debug)]
pub struct ProviderError(Box<dyn ModelProviderError>);

impl ProviderError {
    /// Returns the provider's classification of the failure.
    #[inline]
    pub fn kind(&self) -> ModelErrorKind {
        self.0.kind()
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for ProviderError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}
