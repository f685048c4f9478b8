//! Storage layer for dsp.
//!
//! Maps the abstract graph onto a directory-per-entity layout under
//! `.dsp/` and owns all raw read/write/delete primitives. The store has
//! no graph semantics of its own; invariants are the Engine's job.

mod fs;

pub use fs::{Store, DESC_FILE, DSP_DIR, EXPORTS_DIR, IMPORTS_FILE, SHARED_FILE, TOC_BASE};
