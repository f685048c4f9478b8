//! CLI module for dsp.
//!
//! Commands:
//! - Create: create-object, create-function, create-shared
//! - Link: add-import, remove-import, remove-shared
//! - Update: update-description, update-import-why, move-entity, remove-entity
//! - Query: get-entity, get-shared, get-recipients, read-toc, search, find-by-source
//! - Traverse/analyze: get-children, get-parents, get-path, detect-cycles,
//!   get-orphans, get-stats
//!
//! The Engine returns structured data; text rendering lives in [`render`].

pub mod render;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Depth values accepted by get-children/get-parents: a non-negative
/// integer, or `inf`/`infinity`/`all` for unbounded. The global visited
/// set in the traversal guarantees termination either way.
pub fn parse_depth(value: &str) -> Result<usize, String> {
    match value.to_ascii_lowercase().as_str() {
        "inf" | "infinity" | "all" => Ok(usize::MAX),
        _ => value
            .parse::<usize>()
            .map_err(|_| format!("invalid depth '{value}': expected a number or 'inf'")),
    }
}

#[derive(Parser)]
#[command(name = "dsp")]
#[command(about = "File-backed entity-relationship graph for codebase structure", long_about = None)]
pub struct Cli {
    /// Project root directory containing (or to contain) .dsp
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Emit results as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging (also configurable via DSP_LOG)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the .dsp store
    Init,

    /// Create an object entity
    CreateObject {
        /// Repo-relative source path
        source: String,

        /// 1-3 sentences: what this is and why it exists
        purpose: String,

        /// Entity kind
        #[arg(long, default_value = "object", value_parser = ["object", "external"])]
        kind: String,

        /// TOC root uid (for multi-root stores)
        #[arg(long, value_name = "ROOT_UID")]
        toc: Option<String>,
    },

    /// Create a function entity
    CreateFunction {
        /// Repo-relative source path (path#symbol form if needed)
        source: String,

        /// 1-3 sentences: what this does and why
        purpose: String,

        /// Owning object uid
        #[arg(long, value_name = "UID")]
        owner: Option<String>,

        /// TOC root uid (for multi-root stores)
        #[arg(long, value_name = "ROOT_UID")]
        toc: Option<String>,
    },

    /// Declare entities as shared/re-exported through an exporter
    CreateShared {
        /// Exporter entity uid
        exporter: String,

        /// uid(s) of the shared entities
        #[arg(required = true)]
        shared: Vec<String>,
    },

    /// Record an import relationship
    AddImport {
        /// Importer entity uid
        importer: String,

        /// Imported entity uid
        imported: String,

        /// 1-3 sentences: why this import exists
        why: String,

        /// Exporter uid, when the import goes through a re-export
        #[arg(long, value_name = "UID")]
        exporter: Option<String>,
    },

    /// Remove an import relationship
    RemoveImport {
        /// Importer entity uid
        importer: String,

        /// Imported entity uid
        imported: String,

        /// Exporter uid the import was recorded through
        #[arg(long, value_name = "UID")]
        exporter: Option<String>,
    },

    /// Withdraw a shared declaration (cleans up recipient imports too)
    RemoveShared {
        /// Exporter entity uid
        exporter: String,

        /// Shared entity uid
        shared: String,
    },

    /// Merge new values into an entity's description
    UpdateDescription {
        /// Entity uid
        uid: String,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        purpose: Option<String>,

        #[arg(long)]
        kind: Option<String>,
    },

    /// Replace the reason text of an existing import
    UpdateImportWhy {
        /// Importer entity uid
        importer: String,

        /// Imported entity uid
        imported: String,

        /// New reason text
        why: String,

        /// Exporter uid the import was recorded through
        #[arg(long, value_name = "UID")]
        exporter: Option<String>,
    },

    /// Update an entity's source path after a rename or move
    MoveEntity {
        /// Entity uid
        uid: String,

        /// New repo-relative source path
        new_source: String,
    },

    /// Delete an entity and every reference to it
    RemoveEntity {
        /// Entity uid
        uid: String,
    },

    /// Full snapshot: description, imports, shared, importers
    GetEntity {
        /// Entity uid
        uid: String,
    },

    /// Shared declarations of an entity, with recipients
    GetShared {
        /// Entity uid
        uid: String,
    },

    /// Everyone importing an entity, with reasons
    GetRecipients {
        /// Entity uid
        uid: String,
    },

    /// Import tree downward from an entity
    GetChildren {
        /// Entity uid
        uid: String,

        /// Traversal depth: a number, or 'inf' for unbounded
        #[arg(long, default_value = "1", value_parser = parse_depth)]
        depth: usize,
    },

    /// Importer tree upward from an entity
    GetParents {
        /// Entity uid
        uid: String,

        /// Traversal depth: a number, or 'inf' for unbounded
        #[arg(long, default_value = "1", value_parser = parse_depth)]
        depth: usize,
    },

    /// Shortest connection between two entities, either edge direction
    GetPath {
        /// Start entity uid
        from: String,

        /// End entity uid
        to: String,
    },

    /// Case-insensitive substring search across descriptions
    Search {
        /// Query text
        query: String,
    },

    /// Find entities recorded at a source path
    FindBySource {
        /// Repo-relative source path
        source_path: String,
    },

    /// Read a table of contents (first entry is the root)
    ReadToc {
        /// TOC root uid (for multi-root stores)
        #[arg(long, value_name = "ROOT_UID")]
        toc: Option<String>,
    },

    /// Find circular import chains
    DetectCycles,

    /// Find entities nothing points at
    GetOrphans,

    /// Graph-wide statistics
    GetStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_accepts_numbers_and_inf() {
        assert_eq!(parse_depth("0"), Ok(0));
        assert_eq!(parse_depth("12"), Ok(12));
        assert_eq!(parse_depth("inf"), Ok(usize::MAX));
        assert_eq!(parse_depth("ALL"), Ok(usize::MAX));
        assert!(parse_depth("-1").is_err());
        assert!(parse_depth("deep").is_err());
    }

    #[test]
    fn parses_add_import_with_exporter() {
        let cli = Cli::parse_from([
            "dsp",
            "--root",
            "/tmp/project",
            "add-import",
            "obj-11111111",
            "obj-22222222",
            "needs the token stream",
            "--exporter",
            "obj-33333333",
        ]);
        match cli.command {
            Commands::AddImport { exporter, .. } => {
                assert_eq!(exporter.as_deref(), Some("obj-33333333"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn parses_unbounded_depth() {
        let cli = Cli::parse_from(["dsp", "get-children", "obj-11111111", "--depth", "inf"]);
        match cli.command {
            Commands::GetChildren { depth, .. } => assert_eq!(depth, usize::MAX),
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn create_object_rejects_unknown_kind() {
        let res = Cli::try_parse_from([
            "dsp",
            "create-object",
            "src/a.rs",
            "a thing",
            "--kind",
            "module",
        ]);
        assert!(res.is_err());
    }
}
