use crate::condition::{describe_conditions, Condition};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// A condition key no backend lookup understands. Never retried.
    #[error("Unsupported search criteria: {0}")]
    SearchCriteria(String),

    /// `find_first` ran out of attempts.
    #[error(
        "Failed search first element with criteria: {} ({attempts} attempts, {elapsed_ms} ms)",
        describe_conditions(.conditions)
    )]
    Navigation {
        conditions: Vec<Condition>,
        attempts: u32,
        elapsed_ms: u128,
    },

    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Couldn't create element of kind {0}")]
    FactoryResolution(String),

    #[error("Key is not mapped for this backend: {0}")]
    KeyNotMapped(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote end replied with {status} {error}: {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Programming errors in a condition set; the search engine never retries these.
    pub fn is_search_criteria(&self) -> bool {
        matches!(self, AutomationError::SearchCriteria(_))
    }
}

impl From<reqwest::Error> for AutomationError {
    fn from(error: reqwest::Error) -> Self {
        AutomationError::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(error: serde_json::Error) -> Self {
        AutomationError::Transport(format!("malformed payload: {error}"))
    }
}

impl From<image::ImageError> for AutomationError {
    fn from(error: image::ImageError) -> Self {
        AutomationError::PlatformError(format!("image encoding failed: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_error_names_the_conditions() {
        let err = AutomationError::Navigation {
            conditions: vec![
                Condition::automation_id("12298"),
                Condition::name("Open"),
            ],
            attempts: 3,
            elapsed_ms: 42,
        };
        let message = err.to_string();
        assert!(message.contains("AutomationId=12298"), "{message}");
        assert!(message.contains("Name=Open"), "{message}");
        assert!(message.contains("3 attempts"), "{message}");
    }

    #[test]
    fn only_criteria_errors_are_flagged() {
        assert!(AutomationError::SearchCriteria("Foo".into()).is_search_criteria());
        assert!(!AutomationError::Transport("reset".into()).is_search_criteria());
    }
}
