use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BeaconError {
    /// Short error code string, used in log fields and JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BeaconError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, BeaconError>;
