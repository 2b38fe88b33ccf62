//! Error types for the md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the conversion request cannot proceed
//!   (nothing selected, converter missing, converter failed, template
//!   resource absent). Returned as `Err(Md2PdfError)` from the top-level
//!   `convert*` functions.
//!
//! * [`OrderError`] — **Rejected edit**: an ordering operation referred to an
//!   entry that does not exist. The ordering store is left untouched, so the
//!   caller can report the problem and keep going.
//!
//! Every fatal error maps onto a [`FailureKind`] so that callers which only
//! care about the broad category (show an install hint, show stderr, …) can
//! match on a small closed set.

use std::path::PathBuf;
use thiserror::Error;

/// Installation guidance shown when the converter executable is missing.
pub const INSTALL_HINT: &str = "Install Pandoc and a XeLaTeX distribution:\n  \
• Ubuntu/Debian: sudo apt-get install pandoc texlive-xetex texlive-fonts-recommended\n  \
• macOS:         brew install pandoc  (plus MacTeX)\n  \
• Windows:       download Pandoc from https://pandoc.org (plus MiKTeX)";

/// Broad category of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The conversion engine executable could not be located.
    ToolMissing,
    /// The engine ran but failed (non-zero exit or timeout).
    ToolFailed,
    /// A bundled resource required by the chosen options is absent.
    ResourceMissing,
    /// A file's bytes are not valid UTF-8.
    DecodeError,
    /// No file was selected for inclusion.
    InputEmpty,
    /// The request itself is malformed (duplicate names, bad option values).
    InvalidInput,
    /// Anything else.
    InternalError,
}

/// All fatal errors returned by the md2pdf library.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Every file is excluded, or no file was supplied at all.
    #[error("No files selected for conversion.\nSelect at least one Markdown file.")]
    InputEmpty,

    /// Two uploaded files share the same name.
    #[error("Duplicate file name '{name}': file names must be unique within a request")]
    DuplicateFile { name: String },

    /// An input file could not be read from disk.
    #[error("Failed to read input file '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid UTF-8 text.
    #[error("File '{name}' is not valid UTF-8 text: {source}")]
    Decode {
        name: String,
        #[source]
        source: std::str::Utf8Error,
    },

    // ── Resource errors ───────────────────────────────────────────────────
    /// A required bundled resource could not be found.
    #[error("Required resource '{resource}' not found.\nSearched: {}", format_searched(.searched))]
    ResourceMissing {
        resource: String,
        searched: Vec<PathBuf>,
    },

    // ── External tool errors ──────────────────────────────────────────────
    /// The conversion engine executable is not installed or not on PATH.
    #[error("'{tool}' not found.\n{hint}", hint = INSTALL_HINT)]
    ToolMissing { tool: String },

    /// The conversion engine exited with a non-zero status.
    #[error("'{tool}' failed ({}):\n{stderr}", describe_code(.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The conversion engine did not finish within the configured timeout.
    #[error("'{tool}' timed out after {secs}s and was stopped.\nIncrease --timeout for very large documents.")]
    ToolTimeout { tool: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2PdfError {
    /// The broad category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Md2PdfError::InputEmpty => FailureKind::InputEmpty,
            Md2PdfError::DuplicateFile { .. }
            | Md2PdfError::InputReadFailed { .. }
            | Md2PdfError::InvalidConfig(_) => FailureKind::InvalidInput,
            Md2PdfError::Decode { .. } => FailureKind::DecodeError,
            Md2PdfError::ResourceMissing { .. } => FailureKind::ResourceMissing,
            Md2PdfError::ToolMissing { .. } => FailureKind::ToolMissing,
            Md2PdfError::ToolFailed { .. } | Md2PdfError::ToolTimeout { .. } => {
                FailureKind::ToolFailed
            }
            Md2PdfError::OutputWriteFailed { .. } | Md2PdfError::Internal(_) => {
                FailureKind::InternalError
            }
        }
    }

    /// Raw diagnostic text from the external tool, when there is one.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Md2PdfError::ToolFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn format_searched(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no candidate locations)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

/// A rejected edit of the ordering store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The index does not refer to an entry.
    #[error("Index {index} is out of range (list has {len} entries)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// No entry carries the given name.
    #[error("No file named '{name}' in the current list")]
    UnknownFile { name: String },
}
