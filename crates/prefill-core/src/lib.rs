//! Prefill Core - new-record prefill resolution
//!
//! Turns caller-supplied hints (usually a URL query string) into the initial
//! field values of a new record:
//! - `status=draft` writes `"draft"` to `status`
//! - `program.abbreviation=ABC` looks up the `programs` item whose
//!   `abbreviation` is `ABC` and writes its primary key to `program`
//!
//! Resolution is best-effort. Reserved keys, malformed keys, unknown
//! relations, empty lookups and store failures all just leave the field out;
//! fields the user is already editing are never touched.
//!
//! # Example
//!
//! ```rust,ignore
//! use prefill_core::{NoEdits, PrefillEngine, PrefillHints, SchemaDirectory};
//! use std::sync::Arc;
//!
//! # async fn example(store: Arc<impl prefill_core::ItemQueryService>) {
//! let schema = SchemaDirectory::new()
//!     .with_relation("cases", "program", "programs")
//!     .with_primary_key("programs", "id");
//! let engine = PrefillEngine::from_schema(schema, store);
//!
//! let hints = PrefillHints::from_query("status=draft&program.abbreviation=ABC");
//! let prefill = engine.aggregate(&hints, "cases", &NoEdits).await;
//! // { "status": "draft", "program": 42 }
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod directory;
pub mod error;
pub mod query;
pub mod resolve;
pub mod types;

// Re-exports for convenience
pub use aggregate::PrefillEngine;
pub use classify::{classify, owning_field};
pub use config::{Precedence, PrefillConfig, DEFAULT_SEPARATOR, RESERVED_KEYS};
pub use directory::{FieldDirectory, PrimaryKeyInfo, RelationDirectory, RelationInfo, SchemaDirectory};
pub use error::{ConfigError, QueryError, Rejection};
pub use query::{Filter, FilterOp, Item, ItemQuery, ItemQueryService};
pub use resolve::RelationResolver;
pub use types::{
    EditedFields, NoEdits, ParsedParam, PrefillHints, PrefillResult, RelationalParam,
    ResolvedEntry,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a prefill
    pub use crate::{
        EditedFields, FieldDirectory, ItemQueryService, NoEdits, PrefillConfig, PrefillEngine,
        PrefillHints, PrefillResult, RelationDirectory, SchemaDirectory,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
