//! Result types returned by a successful conversion.

use crate::pipeline::fonts::FontPair;
use serde::{Deserialize, Serialize};

/// The rendered PDF plus what the caller needs to save or report it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Raw PDF bytes.
    pub pdf: Vec<u8>,
    /// Download name derived from the title (see [`suggested_filename`]).
    pub filename: String,
    pub stats: ConversionStats,
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Files that ended up in the merged document.
    pub files_merged: usize,
    pub markdown_bytes: usize,
    pub pdf_bytes: usize,
    /// Font pair handed to the engine; `None` means engine defaults.
    pub fonts: Option<FontPair>,
    pub engine_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Build the suggested output filename.
///
/// Keeps alphanumerics, spaces, `-` and `_` from the trimmed title, drops
/// trailing whitespace, turns spaces into underscores and appends `.pdf`.
/// An empty result falls back to `merged_markdown_<N>_files.pdf`.
pub fn suggested_filename(title: &str, file_count: usize) -> String {
    let kept: String = title
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = kept.trim_end().replace(' ', "_");
    if stem.is_empty() {
        format!("merged_markdown_{file_count}_files.pdf")
    } else {
        format!("{stem}.pdf")
    }
}
