// src/error.rs
//! Error types for the mission list

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MissionError>;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Manager error: {0}")]
    Manager(String),
    #[error("Terminal error: {0}")]
    Terminal(String),
    #[error("Error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for MissionError {
    fn from(error: anyhow::Error) -> Self {
        MissionError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = MissionError::Manager("unsupported file version 9".to_string());
        assert_eq!(err.to_string(), "Manager error: unsupported file version 9");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MissionError = io.into();
        assert!(err.to_string().starts_with("IO error:"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: MissionError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, MissionError::Other(ref msg) if msg == "boom"));
    }
}
