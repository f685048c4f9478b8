//! # dsp
//!
//! A persisted, file-backed entity-relationship graph recording the
//! structure of a codebase: objects, functions, their import/export
//! relationships, and re-export chains. Consumers can ask "what depends
//! on what" and "why."
//!
//! ## Key properties
//!
//! - **Filesystem-as-database**: one directory per entity under `.dsp/`,
//!   all values short text records, human-inspectable and diff-friendly
//! - **Derived reverse index**: every import edge has a mirrored,
//!   recipient-keyed record on the exported side; reads reconcile both
//!   directions so a partially written index still answers correctly
//! - **Deterministic**: enumeration is sorted, traversal tie-breaks are
//!   lexicographic, so the same query always returns the same result
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use dsp::{Engine, Store};
//! use std::path::Path;
//!
//! let engine = Engine::new(Store::new(Path::new(".")));
//! engine.init().unwrap();
//!
//! let parser = engine
//!     .create_object("src/parser.rs", "Parses the input format", "object", None)
//!     .unwrap();
//! let lexer = engine
//!     .create_object("src/lexer.rs", "Tokenizes raw input", "object", None)
//!     .unwrap();
//! engine
//!     .add_import(&parser, &lexer, "needs the token stream", None)
//!     .unwrap();
//!
//! let info = engine.get_entity(&lexer).unwrap();
//! assert_eq!(info.exported_to[0].uid, parser);
//! ```

pub mod cli;
pub mod error;
pub mod graph;
pub mod ident;
pub mod record;
pub mod store;

// Re-exports for convenience
pub use error::{DspError, Result};
pub use graph::{Engine, EntityInfo, GraphStats, Recipient, SearchHit, SharedEntry, TreeNode};
pub use record::{Description, ImportEdge};
pub use store::Store;
