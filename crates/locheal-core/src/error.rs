use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to parse page source: {0}")]
    Parse(String),

    #[error("Invalid XPath '{expr}': {reason}")]
    XPath { expr: String, reason: String },

    #[error("Invalid CSS selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Unknown automation type: {0}")]
    UnknownAutomationType(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
