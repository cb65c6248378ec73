use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurnError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid keep list: {0}")]
    InvalidKeep(String),

    #[error("Invalid overlay image for page {page}: {message}")]
    ImageError { page: u32, message: String },

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),
}
