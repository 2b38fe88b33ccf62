//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! when each pipeline stage begins. Callers can forward the events to a
//! terminal spinner, a channel or a web socket; the library does not care.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("[{:>3}%] {}", stage.percent(), stage.label());
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline stages in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Concatenating the selected files.
    Merging,
    /// Fonts, template and argument list.
    Preparing,
    /// The external converter is running.
    Converting,
    Done,
}

impl Stage {
    /// Rough completion percentage at the start of this stage.
    pub fn percent(self) -> u8 {
        match self {
            Stage::Merging => 25,
            Stage::Preparing => 50,
            Stage::Converting => 75,
            Stage::Done => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Merging => "Merging files",
            Stage::Preparing => "Preparing conversion",
            Stage::Converting => "Converting to PDF",
            Stage::Done => "Done",
        }
    }
}

/// Called by the pipeline as a conversion progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after validation, with the number of selected files.
    fn on_conversion_start(&self, file_count: usize) {
        let _ = file_count;
    }

    /// Called when a stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the PDF has been read back.
    fn on_conversion_complete(&self, pdf_bytes: usize) {
        let _ = pdf_bytes;
    }

    /// Called when the conversion fails after it has started.
    fn on_conversion_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
