//! Error taxonomy shared by the compiler, the attachment step and the class
//! model.

use thiserror::Error;

/// A candidate value failed a field validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{field}' must be {expected} (got {got} that is a {actual}).")]
    Type {
        field: String,
        expected: String,
        actual: String,
        got: String,
    },

    #[error("'{field}' must be a tuple of length {expected} (got {got} of length {actual}).")]
    TupleLength {
        field: String,
        expected: usize,
        actual: usize,
        got: String,
    },

    /// Every alternative of a disjunction rejected the value.
    #[error("'{field}' matched none of {} alternatives: {}", .failures.len(), render_failures(.failures))]
    NoAlternativeMatched {
        field: String,
        failures: Vec<ValidationError>,
    },

    #[error("'{field}' has a disjunction with no alternatives")]
    EmptyDisjunction { field: String },

    #[error("'{field}' must be in {options} (got {got}).")]
    NotIn {
        field: String,
        options: String,
        got: String,
    },

    #[error("'{field}' must match regex {pattern:?} ({got} doesn't).")]
    PatternMismatch {
        field: String,
        pattern: String,
        got: String,
    },

    #[error("Length of '{field}' must be {relation} {bound}: {actual}")]
    Length {
        field: String,
        relation: &'static str,
        bound: usize,
        actual: usize,
    },

    #[error("'{field}' rejected by {validator}: {message}")]
    Custom {
        field: String,
        validator: String,
        message: String,
    },
}

impl ValidationError {
    /// Path of the field (or element) that failed.
    pub fn field(&self) -> &str {
        match self {
            Self::Type { field, .. }
            | Self::TupleLength { field, .. }
            | Self::NoAlternativeMatched { field, .. }
            | Self::EmptyDisjunction { field }
            | Self::NotIn { field, .. }
            | Self::PatternMismatch { field, .. }
            | Self::Length { field, .. }
            | Self::Custom { field, .. } => field,
        }
    }
}

fn render_failures(failures: &[ValidationError]) -> String {
    failures
        .iter()
        .map(|failure| format!("[{failure}]"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The attachment step was called on the wrong kind of target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("type_validate can only be called on a class definition, not a {got}")]
    NotAClass { got: String },

    #[error("type_validate must run before class '{class}' is finalized, not after")]
    AlreadyFinalized { class: String },
}

/// The field placeholder mechanism does not behave the way attachment expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("field placeholders are not behaving as expected: {0}")]
    PlaceholderCheck(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

/// Constructing or mutating an instance failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstanceError {
    #[error("{class}() missing required argument '{field}'")]
    MissingField { class: String, field: String },

    #[error("{class}() got an unexpected argument '{field}'")]
    UnknownField { class: String, field: String },

    #[error("{class}() takes {expected} positional arguments but {got} were given")]
    TooManyArguments {
        class: String,
        expected: usize,
        got: usize,
    },

    #[error("cannot assign to field '{field}' of frozen class {class}")]
    Frozen { class: String, field: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
