use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Missing required column '{0}' in CSV")]
    MissingColumn(String),
    #[error("Could not read header row from CSV")]
    Header,
    #[error("Unexpected JSON structure in {path}: {detail}")]
    PriceDocument { path: String, detail: String },
    #[error("Rate export references unknown token '{0}'")]
    UnknownToken(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Config(value)
    }
}
