//! Input handling: uploaded files and request validation.
//!
//! Files arrive as `(name, bytes)` pairs. The name is the file's identity for
//! the whole request: the ordering store, the merge step and the generated
//! headings all refer to files by name, so names must be unique.

use crate::error::Md2PdfError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// One uploaded Markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Identifier, normally the original file name (e.g. `notes.md`).
    pub name: String,
    /// Raw content; decoded as UTF-8 only when merged.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, using its file name as identifier.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Md2PdfError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Md2PdfError::InputReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} ({} bytes)", name, bytes.len());
        Ok(Self { name, bytes })
    }
}

/// Reject requests that cannot produce a document.
///
/// Runs before any scratch directory is created or any tool is looked up:
/// a selection with no name matching an uploaded file is
/// [`Md2PdfError::InputEmpty`], a repeated file name is
/// [`Md2PdfError::DuplicateFile`].
pub fn validate_request(files: &[UploadedFile], selected: &[&str]) -> Result<(), Md2PdfError> {
    if selected.is_empty() {
        return Err(Md2PdfError::InputEmpty);
    }
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        if !seen.insert(file.name.as_str()) {
            return Err(Md2PdfError::DuplicateFile {
                name: file.name.clone(),
            });
        }
    }
    if !selected.iter().any(|name| seen.contains(name)) {
        warn!("None of the {} selected names match an uploaded file", selected.len());
        return Err(Md2PdfError::InputEmpty);
    }
    Ok(())
}
