use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Request to {endpoint} failed (HTTP {status}): {message}")]
    Fetch {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Rate limit retries exhausted for {endpoint} after {attempts} attempts")]
    RateLimitExhausted { endpoint: String, attempts: u32 },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::Auth { .. } => ErrorCategory::Authentication,
            AuditError::Fetch { .. }
            | AuditError::RateLimitExhausted { .. }
            | AuditError::Api(_) => ErrorCategory::Network,
            AuditError::ConfigError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AuditError::SerializationError(_)
            | AuditError::CsvError(_)
            | AuditError::ProcessingError { .. } => ErrorCategory::Data,
            AuditError::ZipError(_) | AuditError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Authentication | ErrorCategory::Configuration => {
                ErrorSeverity::Critical
            }
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Storage => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AuditError::Auth { .. } => {
                "Check DNAC_USERNAME / DNAC_PASSWORD and that the controller address is reachable"
            }
            AuditError::RateLimitExhausted { .. } => {
                "The controller kept rate limiting; rerun later or raise --max-retries"
            }
            AuditError::Fetch { .. } | AuditError::Api(_) => {
                "Check connectivity to the controller; use --on-device-failure skip to continue past broken devices"
            }
            AuditError::MissingConfigError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::ConfigValidationError { .. }
            | AuditError::ConfigError { .. } => "Fix the configuration value and run again",
            AuditError::IoError(_) | AuditError::ZipError(_) => {
                "Make sure the output directory exists and is writable"
            }
            AuditError::SerializationError(_)
            | AuditError::CsvError(_)
            | AuditError::ProcessingError { .. } => {
                "The controller returned data in an unexpected shape; rerun with --verbose"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => format!("Could not log in to the controller: {}", self),
            ErrorCategory::Network => format!("Controller request failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not process controller data: {}", self),
            ErrorCategory::Storage => format!("Could not write the report: {}", self),
        }
    }

    /// Exit code used by the binaries for a failed run.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_is_critical() {
        let err = AuditError::Auth {
            status: 401,
            message: "bad credentials".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
        assert!(err.user_friendly_message().contains("log in"));
    }

    #[test]
    fn test_user_facing_text_is_english() {
        let errors = [
            AuditError::Auth {
                status: 401,
                message: String::new(),
            },
            AuditError::RateLimitExhausted {
                endpoint: "/x".to_string(),
                attempts: 5,
            },
            AuditError::MissingConfigError {
                field: "username".to_string(),
            },
            AuditError::ProcessingError {
                message: String::new(),
            },
            AuditError::IoError(std::io::Error::other("disk full")),
        ];

        for err in errors {
            assert!(err.recovery_suggestion().is_ascii());
            assert!(err.user_friendly_message().is_ascii());
        }
    }

    #[test]
    fn test_fetch_error_is_network() {
        let err = AuditError::Fetch {
            endpoint: "/intent/api/v1/network-device".to_string(),
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("HTTP 500"));
    }
}
