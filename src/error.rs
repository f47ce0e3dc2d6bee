use thiserror::Error;

pub type BbCodeResult<T> = Result<T, BbCodeError>;

#[derive(Error, Debug, Clone)]
pub enum BbCodeError {
    #[error("Duplicate custom tag '{name}': tag names must be unique within a catalog")]
    DuplicateTag { name: String },

    #[error("Invalid tag name '{name}': must be lowercase alphanumeric")]
    InvalidTagName { name: String },

    #[error("Invalid pattern for tag '{name}': {reason}")]
    InvalidTagPattern { name: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_yaml::Error> for BbCodeError {
    fn from(err: serde_yaml::Error) -> Self {
        BbCodeError::ConfigError(err.to_string())
    }
}
