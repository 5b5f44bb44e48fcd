//! Parameter classification
//!
//! Turns one raw hint into a [`ParsedParam`] or a [`Rejection`]. Pure: the
//! only collaborator is the relation directory, and it is read-only.
//!
//! Grammar:
//! - `field=value` is a direct hint
//! - `field.lookup=value` is a relational hint, valid only when `field` is a
//!   relation; segments past the second are ignored

use crate::config::PrefillConfig;
use crate::directory::RelationDirectory;
use crate::error::Rejection;
use crate::types::{ParsedParam, RelationalParam};
use serde_json::Value;

/// Field a hint key writes to: the first segment of a dotted key, otherwise
/// the key itself
#[inline]
#[must_use]
pub fn owning_field(key: &str, separator: char) -> &str {
    match key.split_once(separator) {
        Some((field, _)) => field,
        None => key,
    }
}

/// Classify a single hint against `collection`
///
/// # Errors
/// Returns a [`Rejection`] for reserved keys, empty keys or segments, and
/// dotted keys on fields without a usable relation.
pub fn classify<R>(
    key: &str,
    value: &Value,
    collection: &str,
    relations: &R,
    config: &PrefillConfig,
) -> Result<ParsedParam, Rejection>
where
    R: RelationDirectory + ?Sized,
{
    if config.is_reserved(key) {
        return Err(Rejection::ReservedKey(key.to_string()));
    }
    if key.is_empty() {
        return Err(Rejection::EmptyKey);
    }

    let mut segments = key.split(config.separator);
    let field = segments.next().unwrap_or_default();
    let Some(lookup_field) = segments.next() else {
        return Ok(ParsedParam::Direct {
            field: key.to_string(),
            value: value.clone(),
        });
    };

    if field.is_empty() || lookup_field.is_empty() {
        return Err(Rejection::EmptySegment(key.to_string()));
    }

    let relation = relations
        .relation_for_field(collection, field)
        .ok_or_else(|| Rejection::NotRelational {
            collection: collection.to_string(),
            field: field.to_string(),
        })?;

    let related_collection =
        relation
            .related_collection
            .ok_or_else(|| Rejection::MissingRelatedCollection {
                collection: collection.to_string(),
                field: field.to_string(),
            })?;

    Ok(ParsedParam::Relational(RelationalParam::new(
        field,
        lookup_field,
        value.clone(),
        related_collection,
    )))
}
