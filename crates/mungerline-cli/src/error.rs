use mungerline_core::{ConfigError, FetchError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetch failures that abort before anything can be rendered.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Fetch(FetchError::InvalidFormat { .. }) => 2,
            Self::Fetch(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Fetch(error) => Some(error.user_hint()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_ticker_is_a_usage_error() {
        let error = CliError::from(FetchError::invalid_format("BRK.B"));
        assert_eq!(error.exit_code(), 2);
        assert!(error.hint().is_some());
    }

    #[test]
    fn upstream_failures_exit_with_three() {
        assert_eq!(CliError::from(FetchError::timeout()).exit_code(), 3);
    }
}
