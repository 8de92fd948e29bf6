//! Node id validation.
//!
//! Valid node ids:
//! - Must be non-empty and not entirely whitespace
//! - Must not contain `/` (the path separator)
//! - Must not contain `.` (reserved for the `..` parent segment)

use uuid::Uuid;

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a node id.
const FORBIDDEN_CHARS: &[char] = &['/', '.'];

/// Validate a node id, returning `Ok(())` if it may be used.
///
/// # Examples
///
/// ```
/// use arbor_types::names::validate_node_id;
///
/// assert!(validate_node_id("menu").is_ok());
/// assert!(validate_node_id("").is_err());
/// assert!(validate_node_id("a/b").is_err());
/// assert!(validate_node_id("v1.0").is_err());
/// ```
pub fn validate_node_id(id: &str) -> Result<(), TypeError> {
    if id.trim().is_empty() {
        return Err(TypeError::InvalidNodeId {
            id: id.to_string(),
            reason: "node id must not be empty or whitespace".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if id.contains(*ch) {
            return Err(TypeError::InvalidNodeId {
                id: id.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    Ok(())
}

/// Returns `true` if `id` passes [`validate_node_id`].
pub fn is_valid_node_id(id: &str) -> bool {
    validate_node_id(id).is_ok()
}

/// Generate a fresh node id for nodes whose requested id was rejected.
///
/// Generated ids are hyphenated UUIDv7 strings and always valid.
pub fn generate_node_id() -> String {
    Uuid::now_v7().to_string()
}
