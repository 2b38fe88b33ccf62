//! Pipeline stages for Markdown-merge-to-PDF conversion.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ merge ──▶ command ──▶ engine
//!                       │
//!              fonts ◀──┴──▶ template ──▶ resources
//! ```
//!
//! 1. [`input`]   — uploaded files and request validation
//! 2. [`merge`]   — concatenate the selected files with headings
//! 3. [`command`] — translate options into converter arguments
//! 4. [`fonts`]   — named lookup or `fc-list` auto-detection
//! 5. [`template`] — customise the report template in a scratch dir
//! 6. [`resources`] — find the bundled template and background image
//! 7. [`engine`]  — run pandoc with a timeout

pub mod command;
pub mod engine;
pub mod fonts;
pub mod input;
pub mod merge;
pub mod resources;
pub mod template;
