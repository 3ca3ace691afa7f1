use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Upstream error: {upstream} - {message}")]
    Upstream { upstream: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn upstream(upstream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            upstream: upstream.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Batch 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Batch 'abc' not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Only CSV files are accepted");
        assert_eq!(
            error.to_string(),
            "Validation error: Only CSV files are accepted"
        );
    }

    #[test]
    fn test_upstream_error() {
        let error = DomainError::upstream("hospital_directory", "connection refused");
        assert_eq!(
            error.to_string(),
            "Upstream error: hospital_directory - connection refused"
        );
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("Batch already processing");
        assert_eq!(error.to_string(), "Conflict: Batch already processing");
    }
}
