use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Archive operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Service returned {status}: {detail}")]
    Service { status: u16, detail: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Service,
    Configuration,
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExtractError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExtractError::ApiError(_) => ErrorCategory::Network,
            ExtractError::Service { .. } => ErrorCategory::Service,
            ExtractError::ConfigValidationError { .. }
            | ExtractError::InvalidConfigValueError { .. }
            | ExtractError::MissingConfigError { .. }
            | ExtractError::UrlError(_) => ErrorCategory::Configuration,
            ExtractError::ValidationError { .. } | ExtractError::SerializationError(_) => {
                ErrorCategory::Input
            }
            ExtractError::ZipError(_) | ExtractError::CsvError(_) | ExtractError::IoError(_) => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 404 on a lookup is an answer, not a failure
            ExtractError::Service { status: 404, .. } => ErrorSeverity::Low,
            ExtractError::ApiError(_) => ErrorSeverity::Medium,
            ExtractError::Service { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            ExtractError::Service { .. } => ErrorSeverity::High,
            ExtractError::ValidationError { .. } | ExtractError::SerializationError(_) => {
                ErrorSeverity::High
            }
            ExtractError::ConfigValidationError { .. }
            | ExtractError::InvalidConfigValueError { .. }
            | ExtractError::MissingConfigError { .. }
            | ExtractError::UrlError(_) => ErrorSeverity::High,
            ExtractError::ZipError(_) | ExtractError::CsvError(_) | ExtractError::IoError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ExtractError::ApiError(_) => {
                "Check that the extractor service is running and reachable at the configured base_url".to_string()
            }
            ExtractError::Service { status: 404, .. } => {
                "Check the extractor id; shared extractors need the share token, not the extractor uuid".to_string()
            }
            ExtractError::Service { status: 422, .. } => {
                "The service rejected the request; check the fields named in the error detail".to_string()
            }
            ExtractError::Service { status, .. } if *status >= 500 => {
                "The service failed internally; retry later".to_string()
            }
            ExtractError::Service { .. } => "Inspect the request arguments".to_string(),
            ExtractError::ConfigValidationError { field, .. }
            | ExtractError::InvalidConfigValueError { field, .. }
            | ExtractError::MissingConfigError { field } => {
                format!("Fix the '{}' setting in the configuration file or CLI flags", field)
            }
            ExtractError::UrlError(_) => "Use an absolute http(s) URL for base_url".to_string(),
            ExtractError::ValidationError { .. } => "Correct the input and try again".to_string(),
            ExtractError::SerializationError(_) => {
                "The input or response is not valid JSON".to_string()
            }
            ExtractError::ZipError(_) | ExtractError::CsvError(_) | ExtractError::IoError(_) => {
                "Check permissions and free space in the output directory".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExtractError::ApiError(e) if e.is_timeout() => {
                "The extractor service did not answer in time".to_string()
            }
            ExtractError::ApiError(e) if e.is_connect() => {
                "Could not connect to the extractor service".to_string()
            }
            ExtractError::Service { status: 404, .. } => "Extractor not found".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_severity() {
        let not_found = ExtractError::Service {
            status: 404,
            detail: "Extractor not found for owner.".to_string(),
        };
        assert_eq!(not_found.severity(), ErrorSeverity::Low);
        assert_eq!(not_found.category(), ErrorCategory::Service);
        assert_eq!(not_found.user_friendly_message(), "Extractor not found");

        let unavailable = ExtractError::Service {
            status: 503,
            detail: "down".to_string(),
        };
        assert_eq!(unavailable.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_unprocessable_suggestion_is_not_extraction_specific() {
        let rejected = ExtractError::Service {
            status: 422,
            detail: r#"[{"loc":["body","schema"],"msg":"field required"}]"#.to_string(),
        };
        assert_eq!(rejected.severity(), ErrorSeverity::High);
        let suggestion = rejected.recovery_suggestion();
        assert!(suggestion.contains("error detail"));
        assert!(!suggestion.contains("--text"));
    }

    #[test]
    fn test_config_error_suggestion_names_field() {
        let err = ExtractError::MissingConfigError {
            field: "service.base_url".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_suggestion().contains("service.base_url"));
    }
}
