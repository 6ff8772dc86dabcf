use thiserror::Error;

#[derive(Error, Debug)]
pub enum TellerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Unknown row: {0}")]
    UnknownRow(u64),
}

pub type Result<T> = std::result::Result<T, TellerError>;
