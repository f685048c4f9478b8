//! Engine mutation operations: linking, updating, and removing.
//!
//! Every mutation validates the entities it references before writing.
//! Forward edges live in the importer's imports list; the mirrored
//! reverse record lives under the referenced entity's export area (the
//! exporter when `via` is set, the imported entity otherwise).

use tracing::{debug, info};

use super::engine::Engine;
use crate::error::{DspError, Result};
use crate::record::{Description, ImportEdge};

impl Engine {
    /// Record that `importer` imports `imported`, optionally through
    /// `exporter`'s re-export. Appends the forward edge (set semantics)
    /// and writes the reverse record keyed by the importer. All entity
    /// checks happen before the first write, so a failed call leaves no
    /// stray edge behind.
    pub fn add_import(
        &self,
        importer: &str,
        imported: &str,
        why: &str,
        exporter: Option<&str>,
    ) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(importer)?;
        let record = match exporter {
            Some(exporter) => {
                self.store.require_entity(exporter)?;
                self.store
                    .exports_dir(exporter)
                    .join(imported)
                    .join(importer)
            }
            None => {
                self.store.require_entity(imported)?;
                self.store.exports_dir(imported).join(importer)
            }
        };

        let edge = match exporter {
            Some(e) => ImportEdge::via(imported, e),
            None => ImportEdge::direct(imported),
        };
        self.store
            .append_line_unique(&self.store.imports_path(importer), &edge.to_line())?;
        self.store.write_text(&record, why)?;
        debug!(importer, imported, ?exporter, "import added");
        Ok(())
    }

    /// Merge the given fields into the entity's description, overwriting
    /// by key and leaving unspecified fields untouched.
    pub fn update_description(&self, uid: &str, fields: &Description) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        let mut desc = self.store.read_description(uid)?;
        desc.merge(fields);
        self.store.write_description(uid, &desc)?;
        debug!(uid, "description updated");
        Ok(())
    }

    /// Overwrite the reason text of an existing reverse record. Fails
    /// with `ReverseRecordNotFound` if the record was never written;
    /// this operation does not create one.
    pub fn update_import_why(
        &self,
        importer: &str,
        imported: &str,
        new_why: &str,
        exporter: Option<&str>,
    ) -> Result<()> {
        self.store.ensure_init()?;
        let record = match exporter {
            Some(e) => self.store.exports_dir(e).join(imported).join(importer),
            None => self.store.exports_dir(imported).join(importer),
        };
        if !record.exists() {
            return Err(DspError::ReverseRecordNotFound {
                imported: imported.to_string(),
                importer: importer.to_string(),
                exporter: exporter.map(String::from),
            });
        }
        self.store.write_text(&record, new_why)?;
        debug!(importer, imported, ?exporter, "import reason updated");
        Ok(())
    }

    /// Update only the `source` field after a file rename or move.
    pub fn move_entity(&self, uid: &str, new_source: &str) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;
        let mut desc = self.store.read_description(uid)?;
        desc.set("source", new_source);
        self.store.write_description(uid, &desc)?;
        debug!(uid, new_source, "entity moved");
        Ok(())
    }

    /// Remove at most the first edge matching `(imported, exporter)` from
    /// the importer's list (with no exporter given, the first edge for
    /// that imported uid regardless of its `via`), then delete the
    /// matching reverse record. A no-op when no edge matches.
    pub fn remove_import(
        &self,
        importer: &str,
        imported: &str,
        exporter: Option<&str>,
    ) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(importer)?;

        let imports = self.store.read_imports(importer)?;
        let mut kept: Vec<ImportEdge> = Vec::with_capacity(imports.len());
        let mut removed = false;
        for edge in imports {
            if !removed
                && edge.uid == imported
                && (exporter.is_none() || edge.via.as_deref() == exporter)
            {
                removed = true;
                continue;
            }
            kept.push(edge);
        }
        self.store.write_imports(importer, &kept)?;

        let record = match exporter {
            Some(e) => self.store.exports_dir(e).join(imported).join(importer),
            None => self.store.exports_dir(imported).join(importer),
        };
        self.store.unlink_file(&record)?;
        debug!(importer, imported, ?exporter, removed, "import removed");
        Ok(())
    }

    /// Withdraw a shared declaration: removes `shared_uid` from the
    /// exporter's shared list, strips the matching `(shared_uid, exporter)`
    /// edge from every recorded recipient's import list, then deletes the
    /// sub-collection.
    pub fn remove_shared(&self, exporter: &str, shared_uid: &str) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(exporter)?;

        self.store
            .remove_line_value(&self.store.shared_path(exporter), shared_uid)?;

        let shared_dir = self.store.exports_dir(exporter).join(shared_uid);
        if shared_dir.is_dir() {
            for (recipient, _) in self
                .store
                .read_shared_entry_recipients(exporter, shared_uid)?
            {
                if !self.store.entity_exists(&recipient) {
                    continue;
                }
                let kept: Vec<ImportEdge> = self
                    .store
                    .read_imports(&recipient)?
                    .into_iter()
                    .filter(|e| !(e.uid == shared_uid && e.via.as_deref() == Some(exporter)))
                    .collect();
                self.store.write_imports(&recipient, &kept)?;
            }
            self.store.remove_subtree(&shared_dir)?;
        }
        debug!(exporter, shared_uid, "shared declaration removed");
        Ok(())
    }

    /// Delete an entity and every reference to it across the whole graph:
    /// edges naming it as imported or via, reverse records of its own
    /// edges, shared declarations of it, TOC lines, and its own storage.
    /// Its own edges are read before its directory is deleted.
    pub fn remove_entity(&self, uid: &str) -> Result<()> {
        self.store.ensure_init()?;
        self.store.require_entity(uid)?;

        let all_uids = self.store.all_uids()?;

        // Strip any edge in other entities that mentions uid as imported
        // or as via.
        for other in &all_uids {
            if other == uid {
                continue;
            }
            let imports = self.store.read_imports(other)?;
            if imports
                .iter()
                .any(|e| e.uid == uid || e.via.as_deref() == Some(uid))
            {
                let kept: Vec<ImportEdge> = imports
                    .into_iter()
                    .filter(|e| e.uid != uid && e.via.as_deref() != Some(uid))
                    .collect();
                self.store.write_imports(other, &kept)?;
            }
        }

        // Delete the reverse records of uid's own edges.
        for edge in self.store.read_imports(uid)? {
            let record = match &edge.via {
                Some(exporter) => self.store.exports_dir(exporter).join(&edge.uid).join(uid),
                None => self.store.exports_dir(&edge.uid).join(uid),
            };
            self.store.unlink_file(&record)?;
        }

        // Withdraw every shared declaration of uid.
        for other in &all_uids {
            if other == uid {
                continue;
            }
            if self.store.read_shared(other)?.iter().any(|s| s == uid) {
                self.store
                    .remove_line_value(&self.store.shared_path(other), uid)?;
                self.store
                    .remove_subtree(&self.store.exports_dir(other).join(uid))?;
            }
        }

        // Drop uid from every TOC.
        for toc in self.store.all_toc_paths()? {
            self.store.remove_line_value(&toc, uid)?;
        }

        self.store.remove_subtree(&self.store.entity_dir(uid))?;
        info!(uid, "entity removed");
        Ok(())
    }
}
