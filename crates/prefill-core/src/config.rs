//! Engine configuration
//!
//! Loadable from JSON or YAML; every field has a default so an empty
//! document is a valid config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Keys the surrounding route/query layer uses for its own purposes
pub const RESERVED_KEYS: [&str; 4] = ["bookmark", "version", "all", "archived"];

/// Separator between field name and lookup field in relational keys
pub const DEFAULT_SEPARATOR: char = '.';

/// Who wins when a direct and a relational hint target the same field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Direct value is kept and the relational lookup is never issued
    #[default]
    DirectWins,
    /// A successful relational lookup replaces the direct value
    RelationalWins,
}

/// Prefill engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillConfig {
    /// Extra reserved keys; the built-in set is always enforced
    pub reserved_keys: BTreeSet<String>,
    /// Separator for relational keys
    pub separator: char,
    /// Direct vs relational precedence for the same field
    pub precedence: Precedence,
    /// Upper bound on in-flight relational lookups (`None` = unbounded)
    pub max_concurrent_lookups: Option<usize>,
}

impl PrefillConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid or the result fails validation
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Returns error if YAML is invalid or the result fails validation
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    /// Check constraints
    ///
    /// # Errors
    /// - zero `max_concurrent_lookups`
    /// - whitespace separator
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_lookups == Some(0) {
            return Err(ConfigError::Invalid(
                "max_concurrent_lookups must be at least 1".to_string(),
            ));
        }
        if self.separator.is_whitespace() {
            return Err(ConfigError::Invalid(
                "separator must not be whitespace".to_string(),
            ));
        }
        Ok(())
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.reserved_keys
            .extend(RESERVED_KEYS.iter().map(|k| (*k).to_string()));
        Ok(self)
    }

    /// Check if a key is reserved
    #[inline]
    #[must_use]
    pub fn is_reserved(&self, key: &str) -> bool {
        RESERVED_KEYS.contains(&key) || self.reserved_keys.contains(key)
    }

    /// With an additional reserved key
    #[inline]
    #[must_use]
    pub fn with_reserved_key(mut self, key: impl Into<String>) -> Self {
        self.reserved_keys.insert(key.into());
        self
    }

    /// With precedence rule
    #[inline]
    #[must_use]
    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// With bounded lookup concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_lookups(mut self, max: usize) -> Self {
        self.max_concurrent_lookups = Some(max);
        self
    }

    /// With separator
    #[inline]
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self {
            reserved_keys: RESERVED_KEYS.iter().map(|k| (*k).to_string()).collect(),
            separator: DEFAULT_SEPARATOR,
            precedence: Precedence::default(),
            max_concurrent_lookups: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PrefillConfig::default();

        assert_eq!(config.separator, '.');
        assert_eq!(config.precedence, Precedence::DirectWins);
        assert_eq!(config.max_concurrent_lookups, None);
        for key in RESERVED_KEYS {
            assert!(config.is_reserved(key));
        }
        assert!(!config.is_reserved("title"));
    }

    #[test]
    fn from_json_keeps_builtin_reserved_keys() {
        let config =
            PrefillConfig::from_json(r#"{ "reserved_keys": ["page"], "precedence": "relational_wins" }"#)
                .unwrap();

        assert!(config.is_reserved("page"));
        assert!(config.is_reserved("bookmark"));
        assert!(config.reserved_keys.contains("archived"));
        assert_eq!(config.precedence, Precedence::RelationalWins);
    }

    #[test]
    fn from_yaml() {
        let yaml = "separator: ':'\nmax_concurrent_lookups: 4\n";
        let config = PrefillConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.separator, ':');
        assert_eq!(config.max_concurrent_lookups, Some(4));
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PrefillConfig::from_json("{}").unwrap(), PrefillConfig::default());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = PrefillConfig::from_json(r#"{ "max_concurrent_lookups": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_whitespace_separator() {
        let config = PrefillConfig::new().with_separator(' ');
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = PrefillConfig::from_yaml("precedence: [").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml(_)));
    }
}
