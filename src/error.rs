use thiserror::Error;

/// Errors raised while building or querying a slicer.
#[derive(Debug, Error)]
pub enum SlicerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("slicer has not been set up; call setup_slicer first")]
    NotReady,

    #[error("slice index {index} out of range for {nslice} slice points")]
    IndexOutOfRange { index: usize, nslice: usize },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("missing column '{0}' in observation table")]
    MissingColumn(String),

    #[error("column '{name}' is not a {expected} column")]
    ColumnType { name: String, expected: &'static str },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SlicerError>;
