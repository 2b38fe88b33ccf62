//! Configuration types for Markdown-to-PDF conversion.
//!
//! Two records control a conversion:
//!
//! * [`ConversionOptions`] — the cosmetic choices a user makes for one
//!   document (title, fonts, margins, table of contents, template). Plain
//!   data, serialisable, passed by value.
//! * [`ConversionConfig`] — the runtime environment: where the converter and
//!   the font tool live, where resources are found, timeouts and the
//!   progress callback. Built via [`ConversionConfigBuilder`].
//!
//! Keeping every knob in these two structs makes it easy to log a run, or to
//! diff two runs to understand why their outputs differ.

use crate::error::Md2PdfError;
use crate::pipeline::fonts::FontProbe;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Title used when the caller does not supply one.
pub const DEFAULT_TITLE: &str = "Merged Markdown Document";

/// Cosmetic options for one conversion request.
///
/// # Example
/// ```rust
/// use md2pdf::{ConversionOptions, FontSelection, FontSize};
///
/// let options = ConversionOptions::builder()
///     .title("Research notes")
///     .author("A. Writer")
///     .font(FontSelection::named("DejaVu Serif"))
///     .font_size(FontSize::Pt11)
///     .margin("2cm")
///     .build()
///     .unwrap();
/// assert!(options.include_toc);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Document title. Empty (after trimming) means no title metadata.
    pub title: String,

    /// Document author. Empty (after trimming) means no author metadata.
    pub author: String,

    /// Date shown in the title block. `None` means today.
    pub date: Option<NaiveDate>,

    /// Main/monospace font choice.
    pub font: FontSelection,

    /// Body font size.
    pub font_size: FontSize,

    /// Page margin as a LaTeX length, e.g. `2.5cm`.
    pub margin: String,

    /// Syntax highlighting style for fenced code blocks.
    pub highlight_style: HighlightStyle,

    /// Emit a table of contents (depth 3).
    pub include_toc: bool,

    /// LaTeX engine used by the converter.
    pub pdf_engine: PdfEngine,

    /// What goes between two merged files.
    pub separator: FileSeparator,

    /// Emit the per-file heading even when exactly one file is selected.
    pub heading_for_single_file: bool,

    /// Stock converter template or the customised report template.
    pub template: TemplateMode,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            author: String::new(),
            date: None,
            font: FontSelection::default(),
            font_size: FontSize::default(),
            margin: "2.5cm".to_string(),
            highlight_style: HighlightStyle::default(),
            include_toc: true,
            pdf_engine: PdfEngine::default(),
            separator: FileSeparator::default(),
            heading_for_single_file: true,
            template: TemplateMode::default(),
        }
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }

    /// The date for the title block, falling back to today.
    pub fn effective_date(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Check option values that the type system cannot express.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        static LENGTH: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^\d+(\.\d+)?(cm|mm|in|pt)$").unwrap());

        if !LENGTH.is_match(self.margin.trim()) {
            return Err(Md2PdfError::InvalidConfig(format!(
                "margin must be a length like 2.5cm, 20mm, 1in or 72pt, got '{}'",
                self.margin
            )));
        }
        if let FontSelection::Named(ref name) = self.font {
            if name.trim().is_empty() {
                return Err(Md2PdfError::InvalidConfig(
                    "font name must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.options.title = title.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.options.author = author.into();
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.options.date = Some(date);
        self
    }

    pub fn font(mut self, font: FontSelection) -> Self {
        self.options.font = font;
        self
    }

    pub fn font_size(mut self, size: FontSize) -> Self {
        self.options.font_size = size;
        self
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.options.margin = margin.into();
        self
    }

    pub fn highlight_style(mut self, style: HighlightStyle) -> Self {
        self.options.highlight_style = style;
        self
    }

    pub fn include_toc(mut self, v: bool) -> Self {
        self.options.include_toc = v;
        self
    }

    pub fn pdf_engine(mut self, engine: PdfEngine) -> Self {
        self.options.pdf_engine = engine;
        self
    }

    pub fn separator(mut self, sep: FileSeparator) -> Self {
        self.options.separator = sep;
        self
    }

    pub fn heading_for_single_file(mut self, v: bool) -> Self {
        self.options.heading_for_single_file = v;
        self
    }

    pub fn template(mut self, mode: TemplateMode) -> Self {
        self.options.template = mode;
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<ConversionOptions, Md2PdfError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the main and monospace fonts are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontSelection {
    /// Probe the font inventory for the first installed candidate pair. (default)
    #[default]
    AutoDetect,
    /// A family from the built-in table, by display label (e.g. "Open Sans").
    /// Labels missing from the table leave the engine defaults in place.
    Named(String),
    /// Do not override the engine's fonts.
    EngineDefault,
}

impl FontSelection {
    pub fn named(label: impl Into<String>) -> Self {
        FontSelection::Named(label.into())
    }

    /// Parse a user-facing label: `auto`/`auto-detect`, `default`, or a family name.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "auto" | "auto-detect" | "autodetect" => FontSelection::AutoDetect,
            "default" | "none" => FontSelection::EngineDefault,
            _ => FontSelection::Named(label.trim().to_string()),
        }
    }
}

/// Body font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontSize {
    Pt10,
    Pt11,
    #[default]
    Pt12,
    Pt14,
}

impl FontSize {
    pub fn points(self) -> u8 {
        match self {
            FontSize::Pt10 => 10,
            FontSize::Pt11 => 11,
            FontSize::Pt12 => 12,
            FontSize::Pt14 => 14,
        }
    }

    pub fn from_points(pt: u8) -> Option<Self> {
        match pt {
            10 => Some(FontSize::Pt10),
            11 => Some(FontSize::Pt11),
            12 => Some(FontSize::Pt12),
            14 => Some(FontSize::Pt14),
            _ => None,
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt", self.points())
    }
}

/// Pandoc's built-in highlight styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HighlightStyle {
    #[default]
    Monochrome,
    Kate,
    Pygments,
    Tango,
    Zenburn,
    Espresso,
    Haddock,
    Breezedark,
}

impl HighlightStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightStyle::Monochrome => "monochrome",
            HighlightStyle::Kate => "kate",
            HighlightStyle::Pygments => "pygments",
            HighlightStyle::Tango => "tango",
            HighlightStyle::Zenburn => "zenburn",
            HighlightStyle::Espresso => "espresso",
            HighlightStyle::Haddock => "haddock",
            HighlightStyle::Breezedark => "breezedark",
        }
    }
}

/// LaTeX engine selected with `--pdf-engine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfEngine {
    #[default]
    Xelatex,
    Lualatex,
}

impl PdfEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            PdfEngine::Xelatex => "xelatex",
            PdfEngine::Lualatex => "lualatex",
        }
    }
}

/// How to separate files in the merged Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileSeparator {
    /// Nothing beyond the blank line that ends every file.
    None,
    /// Horizontal rule: "\n\n---\n\n". (default)
    #[default]
    HorizontalRule,
    /// Custom string inserted between files.
    Custom(String),
}

impl FileSeparator {
    /// The text inserted before every file except the first.
    pub fn render(&self) -> String {
        match self {
            FileSeparator::None => String::new(),
            FileSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            FileSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

/// Which converter template to use.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemplateMode {
    /// The converter's stock LaTeX template. (default)
    #[default]
    Default,
    /// The bundled report template, customised per request.
    Report(ReportTemplateOptions),
}

/// Options that only apply to [`TemplateMode::Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTemplateOptions {
    /// Number the lines of code listings.
    pub line_numbers: bool,
    /// Shade code listings with a light gray background.
    pub gray_code_background: bool,
    /// Font size of code listings.
    pub code_font_size: CodeFontSize,
    /// Render a coloured title page.
    pub title_page: bool,
    /// Put the bundled background image behind the title page.
    pub title_page_background: bool,
}

impl Default for ReportTemplateOptions {
    fn default() -> Self {
        Self {
            line_numbers: false,
            gray_code_background: true,
            code_font_size: CodeFontSize::default(),
            title_page: false,
            title_page_background: false,
        }
    }
}

/// Code listing font size. The template's own default is 9pt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeFontSize {
    Pt8,
    #[default]
    Pt9,
    Pt10,
    Pt11,
}

impl CodeFontSize {
    /// The LaTeX size command for this size.
    pub fn latex_token(self) -> &'static str {
        match self {
            CodeFontSize::Pt8 => "\\scriptsize",
            CodeFontSize::Pt9 => "\\footnotesize",
            CodeFontSize::Pt10 => "\\small",
            CodeFontSize::Pt11 => "\\normalsize",
        }
    }

    pub fn from_points(pt: u8) -> Option<Self> {
        match pt {
            8 => Some(CodeFontSize::Pt8),
            9 => Some(CodeFontSize::Pt9),
            10 => Some(CodeFontSize::Pt10),
            11 => Some(CodeFontSize::Pt11),
            _ => None,
        }
    }
}

// ── Runtime configuration ────────────────────────────────────────────────

/// Runtime configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2pdf::{ConversionConfig, ConversionOptions};
///
/// let config = ConversionConfig::builder()
///     .options(ConversionOptions::default())
///     .engine_program("/usr/local/bin/pandoc")
///     .engine_timeout_secs(600)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Cosmetic options for the document.
    pub options: ConversionOptions,

    /// Converter executable. Default: `pandoc` (resolved through `PATH`).
    pub engine_program: PathBuf,

    /// Font inventory executable used for auto-detection. Default: `fc-list`.
    pub probe_program: PathBuf,

    /// Pre-constructed font probe. Takes precedence over `probe_program`.
    pub font_probe: Option<Arc<dyn FontProbe>>,

    /// Explicit path of the report template. If None, searched for.
    pub template_path: Option<PathBuf>,

    /// Explicit path of the title-page background image. If None, searched for.
    pub background_path: Option<PathBuf>,

    /// Directory in which the per-request scratch directory is created.
    /// If None, the system temporary directory.
    pub scratch_root: Option<PathBuf>,

    /// Maximum run time of the converter in seconds. Default: 300.
    ///
    /// LaTeX runs on large documents are slow, but a converter that has not
    /// finished after five minutes is almost always waiting on input.
    pub engine_timeout_secs: u64,

    /// Maximum run time of one font probe in seconds. Default: 10.
    pub probe_timeout_secs: u64,

    /// Progress events receiver.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            options: ConversionOptions::default(),
            engine_program: PathBuf::from("pandoc"),
            probe_program: PathBuf::from("fc-list"),
            font_probe: None,
            template_path: None,
            background_path: None,
            scratch_root: None,
            engine_timeout_secs: 300,
            probe_timeout_secs: 10,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("options", &self.options)
            .field("engine_program", &self.engine_program)
            .field("probe_program", &self.probe_program)
            .field("font_probe", &self.font_probe.as_ref().map(|_| "<dyn FontProbe>"))
            .field("template_path", &self.template_path)
            .field("background_path", &self.background_path)
            .field("scratch_root", &self.scratch_root)
            .field("engine_timeout_secs", &self.engine_timeout_secs)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the runtime knobs and the document options.
    pub fn validate(&self) -> Result<(), Md2PdfError> {
        if self.engine_program.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "engine program must not be empty".into(),
            ));
        }
        if self.engine_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "engine timeout must be ≥ 1 second".into(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "probe timeout must be ≥ 1 second".into(),
            ));
        }
        self.options.validate()
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn engine_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.engine_program = program.into();
        self
    }

    pub fn probe_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.probe_program = program.into();
        self
    }

    pub fn font_probe(mut self, probe: Arc<dyn FontProbe>) -> Self {
        self.config.font_probe = Some(probe);
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = Some(path.into());
        self
    }

    pub fn background_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.background_path = Some(path.into());
        self
    }

    pub fn scratch_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(path.into());
        self
    }

    pub fn engine_timeout_secs(mut self, secs: u64) -> Self {
        self.config.engine_timeout_secs = secs;
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
