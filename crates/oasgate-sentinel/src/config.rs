//! Configuration for response validation.

use serde::{Deserialize, Serialize};

/// Configuration for validation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether responses are checked at all.
    pub enabled: bool,
    /// Replace non-conforming responses (400) instead of logging a warning.
    pub strict: bool,
    /// Accept `format` values the validator does not know.
    pub ignore_unknown_formats: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
            ignore_unknown_formats: true,
        }
    }
}

impl ValidationConfig {
    /// Reject non-conforming responses.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Log non-conforming responses and send them unchanged.
    #[must_use]
    pub fn lenient() -> Self {
        Self::default()
    }

    /// No response checking.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validation_config() {
        let config = ValidationConfig::default();
        assert!(config.enabled);
        assert!(!config.strict);
        assert!(config.ignore_unknown_formats);
    }

    #[test]
    fn test_presets() {
        assert!(ValidationConfig::strict().strict);
        assert!(!ValidationConfig::lenient().strict);
        assert!(!ValidationConfig::disabled().enabled);
    }
}
