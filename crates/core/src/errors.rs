use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable class label used by the CLI for machine-readable output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_invariant",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config_validation",
        }
    }
}

impl From<crate::config::ConfigError> for ApplicationError {
    fn from(value: crate::config::ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError};

    #[test]
    fn domain_error_maps_to_domain_class() {
        let error = ApplicationError::from(DomainError::InvariantViolation(
            "revenue on a non-purchase event".to_owned(),
        ));
        assert_eq!(error.error_class(), "domain_invariant");
    }

    #[test]
    fn configuration_error_maps_to_config_class() {
        let error = ApplicationError::Configuration("start date after end date".to_owned());
        assert_eq!(error.error_class(), "config_validation");
    }
}
