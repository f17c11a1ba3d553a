use thiserror::Error;

/// Failures reported by symbol collaborators.
///
/// None of these are fatal to a session: they are surfaced to the presentation
/// sink as advisories and the previous index stays in place.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("No symbol provider attached to {0}")]
    Unavailable(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Workspace scan failed: {0}")]
    Workspace(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
