use crate::domain::model::FAULT_EXIT_CODE;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlasherError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Preflight validation failed: {}", .errors.join("; "))]
    ValidationError { errors: Vec<String> },

    #[error("A flash operation is already in progress")]
    FlashInProgress,

    #[error("Flashing failed with error code {exit_code}")]
    ToolFailed { exit_code: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    ExternalTool,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FlasherError {
    /// Error for a flash that did not succeed. A fault exit code means
    /// avrdude never ran to completion, which is reported as an I/O failure.
    pub fn flash_failed(exit_code: i32) -> Self {
        if exit_code == FAULT_EXIT_CODE {
            FlasherError::IoError(std::io::Error::other(
                "avrdude could not be started or did not run to completion",
            ))
        } else {
            FlasherError::ToolFailed { exit_code }
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FlasherError::ConfigParseError { .. } | FlasherError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            FlasherError::ValidationError { .. } | FlasherError::FlashInProgress => {
                ErrorCategory::Validation
            }
            FlasherError::ToolFailed { .. } => ErrorCategory::ExternalTool,
            FlasherError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FlasherError::FlashInProgress => ErrorSeverity::Low,
            FlasherError::ConfigParseError { .. }
            | FlasherError::InvalidConfigValueError { .. }
            | FlasherError::ValidationError { .. } => ErrorSeverity::Medium,
            FlasherError::ToolFailed { .. } => ErrorSeverity::High,
            FlasherError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FlasherError::ConfigParseError { .. } => {
                "Check that the configuration file is valid TOML"
            }
            FlasherError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration value and try again"
            }
            FlasherError::ValidationError { .. } => {
                "Install the Arduino IDE or avrdude, place ATtiny85.hex next to the program and select a serial port"
            }
            FlasherError::FlashInProgress => "Wait for the running flash to finish",
            FlasherError::ToolFailed { .. } => {
                "Check the serial port, the ArduinoISP sketch, the wiring and your permissions, then retry"
            }
            FlasherError::IoError(_) => "Re-run with --verbose and inspect the log output",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FlasherError::ValidationError { errors } => {
                let mut message = String::from("Cannot start flashing:");
                for error in errors {
                    message.push_str("\n  - ");
                    message.push_str(error);
                }
                message
            }
            FlasherError::ToolFailed { exit_code } => {
                format!("avrdude exited with error code {}", exit_code)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlasherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_error() {
        let err = FlasherError::ValidationError {
            errors: vec!["first".to_string(), "second".to_string()],
        };
        let message = err.user_friendly_message();
        assert!(message.contains("  - first"));
        assert!(message.contains("  - second"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_flash_failed_separates_tool_errors_from_faults() {
        let tool = FlasherError::flash_failed(1);
        assert!(matches!(tool, FlasherError::ToolFailed { exit_code: 1 }));
        assert_eq!(tool.severity(), ErrorSeverity::High);

        let fault = FlasherError::flash_failed(FAULT_EXIT_CODE);
        assert!(matches!(fault, FlasherError::IoError(_)));
        assert_eq!(fault.severity(), ErrorSeverity::Critical);
        assert!(!fault.user_friendly_message().contains("-1"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(FlasherError::ToolFailed { exit_code: 1 }.severity() > ErrorSeverity::Medium);
        assert_eq!(
            FlasherError::IoError(std::io::Error::other("pipe closed")).severity(),
            ErrorSeverity::Critical
        );
    }
}
