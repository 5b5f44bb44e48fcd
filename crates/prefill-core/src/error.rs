//! Error types for the prefill engine
//!
//! Three families, none of which ever escapes [`crate::PrefillEngine::aggregate`]:
//! - Classification rejections (reserved keys, malformed dotted keys)
//! - External item-query failures (transport, timeout, bad payloads)
//! - Configuration parse/validation failures

/// Reason a raw hint was dropped by the classifier
///
/// Rejection is an expected outcome for most junk in a query string, so it is
/// returned as a value rather than logged as a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Key is the empty string
    #[error("empty key")]
    EmptyKey,

    /// Key is owned by the surrounding route/query infrastructure
    #[error("reserved key: '{0}'")]
    ReservedKey(String),

    /// Dotted key with an empty field or lookup segment
    #[error("empty segment in dotted key: '{0}'")]
    EmptySegment(String),

    /// Dotted key on a field that has no relation
    #[error("field '{field}' on '{collection}' is not a relation")]
    NotRelational {
        /// Collection the hint targeted
        collection: String,
        /// Field named by the first segment
        field: String,
    },

    /// Relation exists but does not name a related collection
    #[error("relation '{field}' on '{collection}' has no related collection")]
    MissingRelatedCollection {
        /// Collection the hint targeted
        collection: String,
        /// Field named by the first segment
        field: String,
    },
}

impl Rejection {
    /// Short machine-friendly label, used as a tracing field
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyKey => "empty_key",
            Self::ReservedKey(_) => "reserved_key",
            Self::EmptySegment(_) => "empty_segment",
            Self::NotRelational { .. } => "not_relational",
            Self::MissingRelatedCollection { .. } => "missing_related_collection",
        }
    }
}

/// Failure reported by an [`crate::ItemQueryService`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Network or connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The store did not answer in time
    #[error("query timed out after {duration_ms}ms")]
    Timeout {
        /// How long the caller waited
        duration_ms: u64,
    },

    /// The store answered with something that is not a list of items
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The store does not know the collection
    #[error("unknown collection: '{0}'")]
    UnknownCollection(String),
}

impl QueryError {
    /// Check if the failure is likely transient
    ///
    /// Only affects log level; the resolver never retries.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON config could not be parsed
    #[error("invalid JSON config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// YAML config could not be parsed
    #[error("invalid YAML config: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Config parsed but violates a constraint
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display() {
        let err = Rejection::NotRelational {
            collection: "cases".to_string(),
            field: "status".to_string(),
        };
        assert_eq!(err.to_string(), "field 'status' on 'cases' is not a relation");
        assert_eq!(err.kind(), "not_relational");
    }

    #[test]
    fn rejection_kinds_are_distinct() {
        let kinds = [
            Rejection::EmptyKey.kind(),
            Rejection::ReservedKey("all".into()).kind(),
            Rejection::EmptySegment(".x".into()).kind(),
            Rejection::NotRelational {
                collection: "c".into(),
                field: "f".into(),
            }
            .kind(),
            Rejection::MissingRelatedCollection {
                collection: "c".into(),
                field: "f".into(),
            }
            .kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn query_error_is_transient() {
        assert!(QueryError::Transport("reset".into()).is_transient());
        assert!(QueryError::Timeout { duration_ms: 500 }.is_transient());
        assert!(!QueryError::MalformedResponse("not a list".into()).is_transient());
        assert!(!QueryError::UnknownCollection("ghosts".into()).is_transient());
    }

    #[test]
    fn config_error_from_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::from(parse);
        assert!(err.to_string().contains("invalid JSON config"));
    }
}
