//! Merge: concatenate the selected files into one Markdown buffer.
//!
//! Each file contributes a level-1 heading derived from its name, its raw
//! content, and a trailing blank line. The configured separator goes between
//! consecutive files. Content is passed through untouched, including any raw
//! HTML or LaTeX a user embedded.
//!
//! Policy for bad input, applied the same way everywhere:
//! * a name with no matching file is skipped with a warning;
//! * a file that is not valid UTF-8 aborts the merge.

use crate::config::FileSeparator;
use crate::error::Md2PdfError;
use crate::pipeline::input::UploadedFile;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The merged document for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    pub markdown: String,
    /// Names of the files actually merged, in order.
    pub files: Vec<String>,
}

/// Heading text for a file: its name without a trailing Markdown extension.
pub fn heading_for(name: &str) -> &str {
    for ext in [".markdown", ".md"] {
        if name.len() <= ext.len() {
            continue;
        }
        let cut = name.len() - ext.len();
        if let (Some(stem), Some(tail)) = (name.get(..cut), name.get(cut..)) {
            if tail.eq_ignore_ascii_case(ext) {
                return stem;
            }
        }
    }
    name
}

/// Concatenate `ordered` files from `files`.
///
/// With `heading_for_single_file == false` the heading is left out when
/// exactly one file ends up in the document.
pub fn assemble(
    ordered: &[&str],
    files: &[UploadedFile],
    separator: &FileSeparator,
    heading_for_single_file: bool,
) -> Result<MergedDocument, Md2PdfError> {
    let by_name: HashMap<&str, &UploadedFile> =
        files.iter().map(|f| (f.name.as_str(), f)).collect();

    let mut selected = Vec::with_capacity(ordered.len());
    for name in ordered {
        match by_name.get(name) {
            Some(file) => {
                let text = std::str::from_utf8(&file.bytes).map_err(|e| Md2PdfError::Decode {
                    name: file.name.clone(),
                    source: e,
                })?;
                selected.push((file.name.as_str(), text));
            }
            None => warn!("No uploaded file named '{}'; skipping it", name),
        }
    }

    let emit_headings = heading_for_single_file || selected.len() != 1;
    let sep = separator.render();
    let mut markdown = String::with_capacity(
        selected.iter().map(|(n, t)| n.len() + t.len() + 8).sum::<usize>(),
    );

    for (i, (name, text)) in selected.iter().enumerate() {
        if i > 0 {
            markdown.push_str(&sep);
        }
        if emit_headings {
            markdown.push_str("# ");
            markdown.push_str(heading_for(name));
            markdown.push_str("\n\n");
        }
        markdown.push_str(text);
        markdown.push_str("\n\n");
    }

    debug!(
        "Merged {} files into {} bytes of Markdown",
        selected.len(),
        markdown.len()
    );

    Ok(MergedDocument {
        markdown,
        files: selected.iter().map(|(n, _)| n.to_string()).collect(),
    })
}
