use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Record is missing field '{field}'")]
    MissingFieldError { field: String },

    #[error("Header column '{column}' was never set on the record")]
    MissingColumnError { column: String },

    #[error("Publish to channel '{channel}' failed: {reason}")]
    PublishError { channel: String, reason: String },

    #[error("No message received from channel '{channel}' within {waited_ms} ms")]
    ConsumeTimeoutError { channel: String, waited_ms: u64 },

    #[error("Broker connection failed: {0}")]
    ConnectionError(String),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::Critical,
            EtlError::IoError(_) | EtlError::ConnectionError(_) => ErrorSeverity::Critical,
            EtlError::MissingFieldError { .. }
            | EtlError::MissingColumnError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::SerializationError(_)
            | EtlError::CsvError(_) => ErrorSeverity::High,
            EtlError::PublishError { .. } | EtlError::ConsumeTimeoutError { .. } => {
                ErrorSeverity::Medium
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ConfigValidationError { field, .. }
            | EtlError::InvalidConfigValueError { field, .. }
            | EtlError::MissingConfigError { field } => {
                format!("Check the '{}' setting in the configuration file", field)
            }
            EtlError::MissingFieldError { field } => format!(
                "Verify that every input record carries the '{}' field, or adjust the rename/split rules",
                field
            ),
            EtlError::MissingColumnError { column } => format!(
                "Header column '{}' must be produced by a rename, split, or stamp rule",
                column
            ),
            EtlError::PublishError { channel, .. } => {
                format!("Check that the broker is reachable and channel '{}' is writable", channel)
            }
            EtlError::ConsumeTimeoutError { channel, .. } => format!(
                "No message arrived on '{}'; check the broker and consider a longer consume_timeout_ms",
                channel
            ),
            EtlError::ConnectionError(_) => {
                "Check the broker URL and that the server is running".to_string()
            }
            EtlError::IoError(_) => "Check file paths and permissions".to_string(),
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Inspect the input document for malformed records".to_string()
            }
            EtlError::CsvError(_) => "Inspect the output path and row contents".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.severity() {
            ErrorSeverity::Critical => format!("Fatal: {}", self),
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
