use thiserror::Error;

pub type Result<T> = std::result::Result<T, PresenceError>;

#[derive(Debug, Error)]
pub enum PresenceError {
    /// A non-positive awake time, or any other value the tracker cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
