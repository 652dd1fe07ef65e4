use std::fmt;

#[derive(Debug)]
pub enum RecordError {
    /// Malformed outer record, or the script envelope could not be decoded.
    Envelope { message: String },
    /// Script decoded but a required sub-field is missing or malformed.
    Parse {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Envelope { message } => {
                write!(f, "Envelope error: {}", message)
            }
            RecordError::Parse { field, message } => {
                write!(f, "Parse error on field '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for RecordError {}

pub type RecordResult<T> = Result<T, RecordError>;
