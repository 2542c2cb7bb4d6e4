//! Environment lookup helpers used by configuration loaders

use std::str::FromStr;
use thiserror::Error;

/// Error raised when an environment variable is present but malformed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {name}: {value:?}")]
pub struct EnvError {
    /// Variable name
    pub name: String,
    /// Raw value that failed to parse
    pub value: String,
}

/// Read a non-empty environment variable
pub fn env_or(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
///
/// Returns `Ok(None)` when the variable is unset or empty, and an [`EnvError`]
/// when it is set to something that does not parse as `T`.
pub fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, EnvError> {
    match env_or(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| EnvError {
            name: name.to_string(),
            value: raw,
        }),
    }
}

/// Read a boolean flag (`1`, `true`, `yes`, `on` are truthy)
pub fn env_flag(name: &str) -> bool {
    env_or(name).is_some_and(|v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_is_none() {
        assert_eq!(env_or("INSIGHT_UTILS_TEST_DEFINITELY_UNSET"), None);
        assert_eq!(
            env_parse::<f64>("INSIGHT_UTILS_TEST_DEFINITELY_UNSET"),
            Ok(None)
        );
        assert!(!env_flag("INSIGHT_UTILS_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_env_error_display() {
        let err = EnvError {
            name: "MAX_CANDIDATES".to_string(),
            value: "six".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for MAX_CANDIDATES: \"six\"");
    }
}
