use thiserror::Error;

/// Unified error type for exporter configuration and start-up.
#[derive(Error, Debug)]
pub enum AwairError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: &'static str },

    #[error("Config source error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for AwairError {
    fn from(err: figment::Error) -> Self {
        AwairError::Figment(Box::new(err))
    }
}
