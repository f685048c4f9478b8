//! The Engine: graph operations layered on the Store.
//!
//! This file holds the `Engine` struct, store initialization, and the
//! create operations. Link/update/remove operations live in
//! `mutation.rs`; queries, traversals and analyses in `query.rs`.

use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::Result;
use crate::ident::generate_uid;
use crate::record::{Description, ImportEdge};
use crate::store::{Store, DESC_FILE};

/// Reason text written for the owner edge of a newly created function.
pub(crate) const OWNER_REASON: &str = "owner: method/member of this object";

/// The graph engine. Every operation is a pure function of current store
/// state plus explicit arguments; mutations validate existence before
/// writing anything.
pub struct Engine {
    pub(crate) store: Store,
}

impl Engine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Create the root marker directory. Idempotent.
    pub fn init(&self) -> Result<PathBuf> {
        self.store.init()?;
        info!(base = %self.store.base().display(), "store initialized");
        Ok(self.store.base().to_path_buf())
    }

    /// Create an object-category entity and register it in the addressed
    /// TOC. Returns the new uid.
    pub fn create_object(
        &self,
        source: &str,
        purpose: &str,
        kind: &str,
        toc_root: Option<&str>,
    ) -> Result<String> {
        self.store.ensure_init()?;
        // Always an object-category uid, whatever kind says.
        let uid = generate_uid("object");
        self.store.create_entity_dir(&uid)?;

        let mut desc = Description::new();
        desc.set("source", source);
        desc.set("kind", kind);
        desc.set("purpose", purpose);
        self.store.write_description(&uid, &desc)?;
        self.store.write_imports(&uid, &[])?;
        self.store.write_lines(&self.store.shared_path(&uid), &[])?;

        self.store
            .append_line_unique(&self.store.toc_path(toc_root), &uid)?;
        debug!(uid, kind, source, "object created");
        Ok(uid)
    }

    /// Create a function-category entity. When `owner` is given, the new
    /// function is appended to the owner's import list as a direct edge
    /// and a reverse record is written under the function keyed by the
    /// owner. Appended to the addressed TOC regardless of owner. The
    /// owner is checked before anything is written, so a failed call
    /// leaves no half-created entity.
    pub fn create_function(
        &self,
        source: &str,
        purpose: &str,
        owner: Option<&str>,
        toc_root: Option<&str>,
    ) -> Result<String> {
        self.store.ensure_init()?;
        if let Some(owner) = owner {
            self.store.require_entity(owner)?;
        }
        let uid = generate_uid("function");
        self.store.create_entity_dir(&uid)?;

        let mut desc = Description::new();
        desc.set("source", source);
        desc.set("kind", "function");
        desc.set("purpose", purpose);
        self.store.write_description(&uid, &desc)?;
        self.store.write_imports(&uid, &[])?;

        if let Some(owner) = owner {
            self.store.append_line_unique(
                &self.store.imports_path(owner),
                &ImportEdge::direct(&uid).to_line(),
            )?;
            self.store
                .write_text(&self.store.exports_dir(&uid).join(owner), OWNER_REASON)?;
        }

        self.store
            .append_line_unique(&self.store.toc_path(toc_root), &uid)?;
        debug!(uid, ?owner, source, "function created");
        Ok(uid)
    }

    /// Declare that `exporter` re-exports each of `shared_uids`: appends
    /// to the exporter's shared list (set semantics) and ensures an export
    /// sub-collection exists with a description. The description defaults
    /// to the shared entity's own purpose, or its uid if it does not exist
    /// or has no purpose; the first write wins.
    pub fn create_shared(&self, exporter: &str, shared_uids: &[String]) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(exporter)?;

        for shared_uid in shared_uids {
            self.store
                .append_line_unique(&self.store.shared_path(exporter), shared_uid)?;

            let desc_path = self
                .store
                .exports_dir(exporter)
                .join(shared_uid)
                .join(DESC_FILE);
            if !desc_path.exists() {
                let purpose = if self.store.entity_exists(shared_uid) {
                    self.store
                        .read_description(shared_uid)?
                        .get("purpose")
                        .unwrap_or_default()
                        .to_string()
                } else {
                    String::new()
                };
                let text = if purpose.is_empty() {
                    shared_uid.clone()
                } else {
                    purpose
                };
                self.store.write_text(&desc_path, &text)?;
            }
        }
        debug!(exporter, count = shared_uids.len(), "shared declared");
        Ok(())
    }
}
