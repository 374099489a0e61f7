// Error types for xdotoolify
//
// Every failure surfaces through the terminal `execute` call of a chain. The
// messages of the chain-shape variants are matched verbatim by existing test
// suites, so their wording (including the odd `.do()` spacing) is fixed.

use crate::check_until::CheckTimeout;
use thiserror::Error;

/// Result type alias for xdotoolify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or executing an interaction chain
#[derive(Debug, Error)]
pub enum Error {
    /// A page callback was used without going through `Xdotoolify::setup_with_page`
    ///
    /// Callbacks that receive the page must be wrapped so the chain-builder
    /// accessor is attached before they run.
    #[error(
        "you must call Xdotoolify.setupWithPage(...) on '{0}' before using it as a chain callback"
    )]
    Setup(String),

    /// A chain was obtained from a page that never had an accessor attached
    #[error("Page has no Xdotoolify accessor. Call Xdotoolify::attach(&page) first.")]
    NotAttached,

    /// A deprecated `check` action was reached inside a safe chain
    #[error("'check' actions are now deprecated. Please rewrite as 'checkUntil'.")]
    DeprecatedCheck,

    /// An unsafe chain was executed while a safe chain is still running
    #[error("Unsafe do() calls are not allowed within safe ones.")]
    UnsafeWithinSafe,

    /// A safe chain ended with an interaction that was never verified
    #[error("Missing checkUntil after interaction.")]
    MissingCheckAfterInteraction,

    /// A safe chain ended while a require-check marker was still pending
    #[error("Missing checkUntil after running 'requireCheckImmediatelyAfter'.")]
    MissingCheckAfterMarker,

    /// A nested run built a chain but never executed it
    #[error("You forgot to add \".do() \"at the end of a subcommand.")]
    MissingSubcommandDo,

    /// A validator or predicate explicitly rejected a value
    #[error("{0}")]
    CheckFailed(String),

    /// A check failure annotated with the serialized value that was checked
    #[error("{source}\nValue being checked: {value}\n")]
    Check {
        #[source]
        source: Box<Error>,
        value: String,
    },

    /// checkUntil exceeded its deadline
    ///
    /// Carries the most recent producer value and check result, both already
    /// serialized with the cycle-safe fallback.
    #[error("{0}")]
    CheckUntilTimeout(Box<CheckTimeout>),

    /// The page driver failed to deliver an interaction
    #[error("Driver error: {0}")]
    Driver(String),

    /// Invalid argument or configuration value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Callback or page used without the required setup
    Setup,
    /// Structural misuse of a chain; never retried
    ChainShape,
    /// A validator or predicate rejected a value
    CheckFailure,
    /// checkUntil ran out of time
    Timeout,
    /// Anything raised by the driver or by configuration
    Other,
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// Creates a check failure with the given message.
    ///
    /// This is what validators and predicates return to reject a value.
    pub fn check_failed(msg: impl Into<String>) -> Self {
        Error::CheckFailed(msg.into())
    }

    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Setup(_) | Error::NotAttached => ErrorKind::Setup,
            Error::DeprecatedCheck
            | Error::UnsafeWithinSafe
            | Error::MissingCheckAfterInteraction
            | Error::MissingCheckAfterMarker
            | Error::MissingSubcommandDo => ErrorKind::ChainShape,
            Error::CheckFailed(_) => ErrorKind::CheckFailure,
            Error::Check { source, .. } => source.kind(),
            Error::CheckUntilTimeout(_) => ErrorKind::Timeout,
            Error::Context(_, inner) => inner.kind(),
            Error::Driver(_) | Error::InvalidArgument(_) | Error::Json(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn with_checked_value(self, value: String) -> Self {
        Error::Check {
            source: Box::new(self),
            value,
        }
    }
}
