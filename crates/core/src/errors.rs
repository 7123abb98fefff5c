use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Raised before valuation when no economic figure exists anywhere.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("valuation requires at least one economic figure; missing: {}", .missing_fields.join(", "))]
pub struct ValidationError {
    pub missing_fields: Vec<&'static str>,
}

/// Failure of the remote valuation path. Never blocking: callers fall back to
/// the local formula.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteServiceError {
    #[error("remote valuation transport failure: {0}")]
    Transport(String),
    #[error("remote valuation service returned status {0}")]
    Status(u16),
    #[error("remote valuation rejected: {0}")]
    Rejected(String),
    #[error("remote valuation payload invalid: {0}")]
    InvalidPayload(String),
    #[error("remote valuation timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote valuation cancelled by case switch")]
    Cancelled,
    #[error("remote valuation service disabled")]
    Disabled,
}

impl RemoteServiceError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Rejected(_) => "rejected",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("no case is selected")]
    NoActiveCase,
    #[error("case `{0}` is no longer the active case")]
    StaleCase(String),
    #[error("case `{0}` was not found")]
    CaseNotFound(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) | Self::Validation(_) => "validation",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config_validation",
            Self::NoActiveCase | Self::StaleCase(_) | Self::CaseNotFound(_) => "case_scope",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => format!(
                "Enter at least one of the following before calculating: {}.",
                error.missing_fields.join(", ")
            ),
            Self::Domain(_) => {
                "The request could not be processed. Check inputs and try again.".to_string()
            }
            Self::Persistence(_) | Self::Integration(_) => {
                "The service is temporarily unavailable. Please retry shortly.".to_string()
            }
            Self::Configuration(_) => "An unexpected internal error occurred.".to_string(),
            Self::NoActiveCase | Self::CaseNotFound(_) => {
                "Select a case before running a valuation.".to_string()
            }
            Self::StaleCase(_) => "The selected case changed while calculating.".to_string(),
        }
    }
}
