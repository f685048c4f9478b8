//! Entity identifier generation.
//!
//! Every uid carries its category in the prefix: `func-` for functions,
//! `obj-` for everything else (objects and externals). The suffix is the
//! first 8 hex digits of a v4 uuid. uids are immutable once created.

use uuid::Uuid;

/// Prefix used for function-category uids.
pub const FUNC_PREFIX: &str = "func-";
/// Prefix used for object-category uids (objects and externals).
pub const OBJ_PREFIX: &str = "obj-";

/// Generate a fresh uid for the given entity kind.
pub fn generate_uid(kind: &str) -> String {
    let prefix = if kind == "function" { "func" } else { "obj" };
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &hex[..8])
}

/// Whether a directory name is a recognized entity uid.
pub fn is_entity_uid(name: &str) -> bool {
    name.starts_with(OBJ_PREFIX) || name.starts_with(FUNC_PREFIX)
}
