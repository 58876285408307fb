#[derive(Debug, thiserror::Error)]
pub enum NluError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("NLU service unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, NluError>;
