use core_snippet::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpandError {
    /// The definition cannot be expanded; the trigger text is left in place.
    #[error("snippet '{trigger}' cannot expand: {source}")]
    Definition {
        trigger: String,
        #[source]
        source: TemplateError,
    },
    #[error("host edit failed: {0}")]
    Host(#[from] anyhow::Error),
}
