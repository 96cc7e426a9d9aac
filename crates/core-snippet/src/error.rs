//! Error types for snippet definitions.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Problems found while parsing a template or compiling its transformations.
///
/// Offsets are character offsets into the template body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at offset {offset}")]
    UnterminatedPlaceholder { offset: usize },

    #[error("unterminated code fragment starting at offset {offset}")]
    UnterminatedCode { offset: usize },

    #[error("unterminated transformation starting at offset {offset}")]
    UnterminatedTransformation { offset: usize },

    #[error("unknown transformation flag '{0}'")]
    UnknownFlag(char),

    #[error("tabstop {0} is used by a transformation but never defined")]
    UnknownTabstop(u32),

    #[error("unbalanced conditional in replacement '{0}'")]
    UnbalancedConditional(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("replacement references group {group} but the pattern has {available}")]
    MissingGroup { group: usize, available: usize },

    #[error("invalid trigger pattern '{pattern}': {reason}")]
    InvalidTrigger { pattern: String, reason: String },

    #[error("placeholders or conditionals nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}
