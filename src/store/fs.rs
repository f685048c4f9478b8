//! File system operations for the dsp store.
//!
//! On-disk layout, one directory per entity:
//!
//! ```text
//! .dsp/
//! ├── TOC                  # default table of contents (uid per line)
//! ├── TOC-<rootUid>        # additional root-named TOCs
//! └── <uid>/
//!     ├── description      # key: value record
//!     ├── imports          # one edge per line: uid [via=exporterUid]
//!     ├── shared           # one uid per line
//!     └── exports/
//!         ├── <recipient>          # reason text for a direct import
//!         └── <sharedUid>/
//!             ├── description      # what the shared entity is
//!             └── <recipient>      # reason text per recipient
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DspError, Result};
use crate::ident::is_entity_uid;
use crate::record::{Description, ImportEdge};

/// Root marker directory under the project root.
pub const DSP_DIR: &str = ".dsp";
/// Description record file name (entity level and shared-export level).
pub const DESC_FILE: &str = "description";
/// Imports list file name.
pub const IMPORTS_FILE: &str = "imports";
/// Shared list file name.
pub const SHARED_FILE: &str = "shared";
/// Exports subdirectory name.
pub const EXPORTS_DIR: &str = "exports";
/// Table of contents file prefix.
pub const TOC_BASE: &str = "TOC";

/// Storage layer handling all file system operations.
///
/// Pure mapping between the abstract graph and the directory tree: dumb
/// I/O plus enumeration. Write primitives create intermediate containers
/// as needed; delete primitives are no-ops when the target is absent.
pub struct Store {
    /// Project root directory.
    root: PathBuf,
    /// Root marker directory (`<root>/.dsp`).
    base: PathBuf,
}

impl Store {
    /// Address a store under the given project root. Does not touch disk.
    pub fn new(root: &Path) -> Self {
        let base = root.join(DSP_DIR);
        Self {
            root: root.to_path_buf(),
            base,
        }
    }

    /// Create the root marker directory. Idempotent.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn is_initialized(&self) -> bool {
        self.base.is_dir()
    }

    /// Fail with `StoreUninitialized` unless `init` has been run.
    pub fn ensure_init(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(DspError::StoreUninitialized(self.base.clone()));
        }
        Ok(())
    }

    // ─── Entities ───────────────────────────────────────────────

    pub fn entity_dir(&self, uid: &str) -> PathBuf {
        self.base.join(uid)
    }

    pub fn entity_exists(&self, uid: &str) -> bool {
        self.entity_dir(uid).is_dir()
    }

    /// Fail with `EntityNotFound` unless the uid has a directory.
    pub fn require_entity(&self, uid: &str) -> Result<()> {
        if !self.entity_exists(uid) {
            return Err(DspError::EntityNotFound(uid.to_string()));
        }
        Ok(())
    }

    pub fn create_entity_dir(&self, uid: &str) -> Result<()> {
        fs::create_dir_all(self.entity_dir(uid))?;
        Ok(())
    }

    /// Every existing entity uid, filtered by recognized category prefixes
    /// and sorted lexicographically for deterministic iteration.
    pub fn all_uids(&self) -> Result<Vec<String>> {
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }
        let mut uids: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.base)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && is_entity_uid(&name) {
                uids.push(name);
            }
        }
        uids.sort();
        Ok(uids)
    }

    // ─── TOC ────────────────────────────────────────────────────

    /// Path of the addressed TOC: the default one, or a root-named one.
    pub fn toc_path(&self, root_uid: Option<&str>) -> PathBuf {
        match root_uid {
            Some(uid) => self.base.join(format!("{}-{}", TOC_BASE, uid)),
            None => self.base.join(TOC_BASE),
        }
    }

    /// All existing TOC files, sorted by name.
    pub fn all_toc_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&self.base)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_file() && name.starts_with(TOC_BASE) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    // ─── Description ────────────────────────────────────────────

    pub fn desc_path(&self, uid: &str) -> PathBuf {
        self.entity_dir(uid).join(DESC_FILE)
    }

    /// Missing file yields an empty mapping.
    pub fn read_description(&self, uid: &str) -> Result<Description> {
        Ok(Description::parse(&self.read_text(&self.desc_path(uid))?))
    }

    pub fn write_description(&self, uid: &str, desc: &Description) -> Result<()> {
        self.write_text(&self.desc_path(uid), &desc.serialize())
    }

    // ─── Imports ────────────────────────────────────────────────

    pub fn imports_path(&self, uid: &str) -> PathBuf {
        self.entity_dir(uid).join(IMPORTS_FILE)
    }

    /// Parse the imports list into edges, order preserved, blanks skipped.
    pub fn read_imports(&self, uid: &str) -> Result<Vec<ImportEdge>> {
        Ok(self
            .read_lines(&self.imports_path(uid))?
            .iter()
            .filter_map(|line| ImportEdge::parse_line(line))
            .collect())
    }

    pub fn read_import_uids(&self, uid: &str) -> Result<Vec<String>> {
        Ok(self.read_imports(uid)?.into_iter().map(|e| e.uid).collect())
    }

    pub fn write_imports(&self, uid: &str, edges: &[ImportEdge]) -> Result<()> {
        let lines: Vec<String> = edges.iter().map(ImportEdge::to_line).collect();
        self.write_lines(&self.imports_path(uid), &lines)
    }

    // ─── Shared ─────────────────────────────────────────────────

    pub fn shared_path(&self, uid: &str) -> PathBuf {
        self.entity_dir(uid).join(SHARED_FILE)
    }

    pub fn read_shared(&self, uid: &str) -> Result<Vec<String>> {
        self.read_lines(&self.shared_path(uid))
    }

    // ─── Exports ────────────────────────────────────────────────

    pub fn exports_dir(&self, uid: &str) -> PathBuf {
        self.entity_dir(uid).join(EXPORTS_DIR)
    }

    /// Flat recipient files under an entity's export area, sorted:
    /// `(recipient uid, reason text)`.
    pub fn read_direct_recipients(&self, uid: &str) -> Result<Vec<(String, String)>> {
        let dir = self.exports_dir(uid);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut recipients: Vec<(String, String)> = Vec::new();
        for path in sorted_entries(&dir)? {
            if path.is_file() {
                let name = file_name(&path);
                let why = self.read_text(&path)?;
                recipients.push((name, why));
            }
        }
        Ok(recipients)
    }

    /// Recipient entries under one shared sub-collection, sorted,
    /// excluding the description file.
    pub fn read_shared_entry_recipients(
        &self,
        uid: &str,
        shared_uid: &str,
    ) -> Result<Vec<(String, String)>> {
        let sub = self.exports_dir(uid).join(shared_uid);
        if !sub.is_dir() {
            return Ok(Vec::new());
        }
        let mut recipients: Vec<(String, String)> = Vec::new();
        for path in sorted_entries(&sub)? {
            if path.is_file() && file_name(&path) != DESC_FILE {
                let name = file_name(&path);
                let why = self.read_text(&path)?;
                recipients.push((name, why));
            }
        }
        Ok(recipients)
    }

    /// Description text of a shared sub-collection ("" when absent).
    pub fn read_shared_export_desc(&self, uid: &str, shared_uid: &str) -> Result<String> {
        self.read_text(&self.exports_dir(uid).join(shared_uid).join(DESC_FILE))
    }

    /// Names of everything directly under an entity's export area, sorted.
    /// Used by search fallback matching.
    pub fn export_entry_names(&self, uid: &str) -> Result<Vec<String>> {
        let dir = self.exports_dir(uid);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(sorted_entries(&dir)?.iter().map(|p| file_name(p)).collect())
    }

    /// Whether an entity's export area contains anything at all.
    pub fn has_exports(&self, uid: &str) -> Result<bool> {
        let dir = self.exports_dir(uid);
        if !dir.is_dir() {
            return Ok(false);
        }
        Ok(fs::read_dir(&dir)?.next().is_some())
    }

    // ─── Line-oriented primitives ───────────────────────────────

    /// Non-blank trimmed lines of a list file; missing file yields none.
    pub fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self
            .read_text_raw(path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Write a list file: newline-joined with a trailing newline, or an
    /// empty file for an empty list. Creates parent directories.
    pub fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()> {
        let content = if lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", lines.join("\n"))
        };
        self.write_raw(path, &content)
    }

    /// Set-append: a no-op if the value already exists verbatim.
    pub fn append_line_unique(&self, path: &Path, line: &str) -> Result<()> {
        let mut lines = self.read_lines(path)?;
        if !lines.iter().any(|l| l == line) {
            lines.push(line.to_string());
            self.write_lines(path, &lines)?;
        }
        Ok(())
    }

    /// Remove every line equal to `value`. Returns whether anything changed;
    /// a no-op (not an error) when the value is absent.
    pub fn remove_line_value(&self, path: &Path, value: &str) -> Result<bool> {
        let lines = self.read_lines(path)?;
        let kept: Vec<String> = lines.iter().filter(|l| *l != value).cloned().collect();
        let changed = kept.len() != lines.len();
        self.write_lines(path, &kept)?;
        Ok(changed)
    }

    // ─── Text primitives ────────────────────────────────────────

    /// Trimmed file content; missing file yields the empty string.
    pub fn read_text(&self, path: &Path) -> Result<String> {
        Ok(self.read_text_raw(path)?.trim().to_string())
    }

    /// Write text with a single trailing newline, creating parents.
    pub fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        self.write_raw(path, &format!("{}\n", text.trim_end()))
    }

    /// Delete a file; no-op when already absent.
    pub fn unlink_file(&self, path: &Path) -> Result<()> {
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Delete a directory tree; no-op when already absent.
    pub fn remove_subtree(&self, path: &Path) -> Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn read_text_raw(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    fn write_raw(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

/// Directory entries sorted by path for deterministic iteration.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
