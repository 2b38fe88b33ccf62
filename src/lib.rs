//! # md2pdf
//!
//! Merge several Markdown files into one PDF through pandoc and a LaTeX
//! engine.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploaded files + FileOrder
//!  │
//!  ├─ 1. Validate  something selected, names unique
//!  ├─ 2. Merge     `# <name>` heading + content per file, separators between
//!  ├─ 3. Prepare   fonts (named / fc-list auto-detect), report template
//!  ├─ 4. Convert   pandoc --pdf-engine=xelatex, with a timeout
//!  └─ 5. Output    PDF bytes + suggested filename + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, ConversionConfig, FileOrder, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![
//!         UploadedFile::from_path("intro.md").await?,
//!         UploadedFile::from_path("usage.md").await?,
//!     ];
//!     let mut order = FileOrder::new();
//!     let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
//!     order.reconcile(&names);
//!     order.move_up(1)?; // usage.md first
//!
//!     let output = convert(&files, &order, &ConversionConfig::default()).await?;
//!     std::fs::write(&output.filename, &output.pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! `pandoc` and a XeLaTeX (or LuaLaTeX) distribution must be installed.
//! `fc-list` is optional; without it font auto-detection falls back to the
//! generic `serif` / `monospace` pair.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CodeFontSize, ConversionConfig, ConversionConfigBuilder, ConversionOptions,
    ConversionOptionsBuilder, FileSeparator, FontSelection, FontSize, HighlightStyle, PdfEngine,
    ReportTemplateOptions, TemplateMode,
};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::{FailureKind, Md2PdfError, OrderError};
pub use order::{FileOrder, OrderEntry};
pub use output::{suggested_filename, ConversionOutput, ConversionStats};
pub use pipeline::fonts::{FcListProbe, FontPair, FontProbe, ProbeOutcome};
pub use pipeline::input::UploadedFile;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
