//! Simple daemon error types

#[derive(Debug)]
pub enum DaemonError {
    ServerError(String),
    ConfigError(String),
    IoError(std::io::Error),
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonError::ServerError(msg) => write!(f, "Server error: {}", msg),
            DaemonError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            DaemonError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DaemonError {}

impl From<std::io::Error> for DaemonError {
    fn from(err: std::io::Error) -> Self {
        DaemonError::IoError(err)
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
