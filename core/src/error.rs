use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Engine failed computing '{variable}': {message}")]
    Engine { variable: String, message: String },

    #[error("Engine bridge error: {0}")]
    Bridge(String),

    #[error("Invalid household data: {0}")]
    InvalidData(String),

    #[error("Chart '{chart}' could not be rendered: {message}")]
    Render { chart: String, message: String },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
