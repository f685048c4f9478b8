//! Error types for dsp operations.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while operating on a dsp store.
#[derive(Debug, Error)]
pub enum DspError {
    /// The store root marker does not exist; `init` was never run.
    #[error("directory {} not found, run 'init' first", .0.display())]
    StoreUninitialized(PathBuf),

    /// A referenced entity uid has no directory in the store.
    #[error("entity {0} does not exist")]
    EntityNotFound(String),

    /// An update targeted a reverse export record that was never written.
    #[error("reverse entry not found: {imported} <- {importer}{}", via_suffix(.exporter))]
    ReverseRecordNotFound {
        imported: String,
        importer: String,
        exporter: Option<String>,
    },

    /// The addressed TOC file was never created.
    #[error("TOC file not found: {0}")]
    TocNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn via_suffix(exporter: &Option<String>) -> String {
    match exporter {
        Some(e) => format!(" via {}", e),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DspError>;
