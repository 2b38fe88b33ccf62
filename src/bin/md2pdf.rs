//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to the ordering
//! store and `ConversionConfig`, then writes the PDF.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{
    convert_to_file, suggested_filename, CodeFontSize, ConversionConfig, ConversionOptions,
    ConversionProgressCallback, FileOrder, FileSeparator, FontSelection, FontSize, HighlightStyle,
    PdfEngine, ProgressCallback, ReportTemplateOptions, Stage, TemplateMode, UploadedFile,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that shows the current pipeline stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("md2pdf");
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, file_count: usize) {
        self.bar
            .println(format!("{} Merging {file_count} file(s)…", bold("◆")));
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_position(stage.percent() as u64);
        self.bar.set_message(stage.label());
    }

    fn on_conversion_complete(&self, _pdf_bytes: usize) {
        self.bar.finish_and_clear();
    }

    fn on_conversion_failed(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge in the given order; output named after the title
  md2pdf intro.md usage.md faq.md --title "User Guide"

  # Put faq.md first, leave usage.md out
  md2pdf intro.md usage.md faq.md --order faq.md --exclude usage.md -o guide.pdf

  # Show the effective order without converting
  md2pdf *.md --order b.md,a.md --list

  # Report template with a title page and line-numbered listings
  md2pdf notes/*.md --report --title-page --line-numbers -o notes.pdf

ENVIRONMENT VARIABLES:
  MD2PDF_PANDOC                 Converter executable (default: pandoc)
  MD2PDF_FC_LIST                Font inventory tool (default: fc-list)
  MD2PDF_TEMPLATE               Report template (default: templates/report.latex)
  MD2PDF_TITLEPAGE_BACKGROUND   Title-page background image
  RUST_LOG                      Overrides --verbose / --quiet log filtering

REQUIREMENTS:
  pandoc and a XeLaTeX distribution (TeX Live, MacTeX or MiKTeX).
  fc-list (fontconfig) is optional and only used for font auto-detection.
"#;

/// Merge Markdown files into a single PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Merge Markdown files into a single PDF",
    long_about = "Merge several Markdown files, in a chosen order, into one PDF document \
through pandoc and XeLaTeX. Each file gets a heading derived from its name.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown files, in upload order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write the PDF here instead of a name derived from the title.
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Comma-separated file names to move to the front, in this order.
    #[arg(long, value_delimiter = ',')]
    order: Vec<String>,

    /// Leave this file out of the document (repeatable).
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    /// Print the effective order and exit.
    #[arg(long)]
    list: bool,

    /// Print machine-readable JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    // ── Document options ─────────────────────────────────────────────────
    /// Document title; empty for none.
    #[arg(long, env = "MD2PDF_TITLE", default_value = md2pdf::config::DEFAULT_TITLE)]
    title: String,

    /// Document author.
    #[arg(long, env = "MD2PDF_AUTHOR", default_value = "")]
    author: String,

    /// Document date (YYYY-MM-DD). Default: today.
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Font family: auto, default, "Open Sans", "Liberation Serif", "DejaVu Serif" or "Times".
    #[arg(long, env = "MD2PDF_FONT", default_value = "auto")]
    font: String,

    /// Body font size in points (10, 11, 12, 14).
    #[arg(long, default_value_t = 12)]
    font_size: u8,

    /// Page margin, e.g. 2.5cm, 20mm, 1in.
    #[arg(long, default_value = "2.5cm")]
    margin: String,

    /// Syntax highlighting style.
    #[arg(long, value_enum, default_value = "monochrome")]
    highlight_style: HighlightArg,

    /// LaTeX engine used by pandoc.
    #[arg(long, value_enum, default_value = "xelatex")]
    pdf_engine: EngineArg,

    /// Leave out the table of contents.
    #[arg(long)]
    no_toc: bool,

    /// Separator between files: none, hr, or a custom Markdown string.
    #[arg(long, default_value = "hr")]
    separator: String,

    /// Skip the file-name heading when only one file is merged.
    #[arg(long)]
    no_single_heading: bool,

    // ── Report template ──────────────────────────────────────────────────
    /// Use the report template (listings, optional title page).
    #[arg(long)]
    report: bool,

    /// Path of the report template. Default: searched for report.latex.
    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// Number code listing lines.
    #[arg(long, requires = "report")]
    line_numbers: bool,

    /// White instead of gray code listing background.
    #[arg(long, requires = "report")]
    no_gray_code: bool,

    /// Code listing font size in points (8–11).
    #[arg(long, default_value_t = 9)]
    code_font_size: u8,

    /// Add a title page.
    #[arg(long, requires = "report")]
    title_page: bool,

    /// Put the background image on the title page.
    #[arg(long, requires = "title_page")]
    title_page_background: bool,

    /// Path of the title-page background image.
    #[arg(long, value_name = "PATH")]
    background: Option<PathBuf>,

    // ── Runtime ──────────────────────────────────────────────────────────
    /// Converter executable.
    #[arg(long, env = "MD2PDF_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Font inventory executable for auto-detection.
    #[arg(long, env = "MD2PDF_FC_LIST", default_value = "fc-list")]
    fc_list: PathBuf,

    /// Converter timeout in seconds.
    #[arg(long, env = "MD2PDF_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum HighlightArg {
    Monochrome,
    Kate,
    Pygments,
    Tango,
    Zenburn,
    Espresso,
    Haddock,
    Breezedark,
}

impl From<HighlightArg> for HighlightStyle {
    fn from(v: HighlightArg) -> Self {
        match v {
            HighlightArg::Monochrome => HighlightStyle::Monochrome,
            HighlightArg::Kate => HighlightStyle::Kate,
            HighlightArg::Pygments => HighlightStyle::Pygments,
            HighlightArg::Tango => HighlightStyle::Tango,
            HighlightArg::Zenburn => HighlightStyle::Zenburn,
            HighlightArg::Espresso => HighlightStyle::Espresso,
            HighlightArg::Haddock => HighlightStyle::Haddock,
            HighlightArg::Breezedark => HighlightStyle::Breezedark,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum EngineArg {
    Xelatex,
    Lualatex,
}

impl From<EngineArg> for PdfEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Xelatex => PdfEngine::Xelatex,
            EngineArg::Lualatex => PdfEngine::Lualatex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the spinner, so only errors show
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read inputs and build the order ──────────────────────────────────
    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        files.push(
            UploadedFile::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
    }
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    let order = build_order(&names, &cli.order, &cli.exclude)?;

    if cli.list {
        print_order(&order, cli.json)?;
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output_path = cli.output.clone().unwrap_or_else(|| {
        PathBuf::from(suggested_filename(
            &config.options.title,
            order.included_count(),
        ))
    });

    // ── Run conversion ───────────────────────────────────────────────────
    let stats = convert_to_file(&files, &order, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let report = serde_json::json!({
            "output": output_path,
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} files  {}  {}ms  →  {}",
            green("✔"),
            stats.files_merged,
            dim(&format!("{} KiB", stats.pdf_bytes.div_ceil(1024))),
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if let Some(ref fonts) = stats.fonts {
            eprintln!("   {}", dim(&format!("fonts: {} / {}", fonts.main, fonts.mono)));
        }
    }

    Ok(())
}

/// Apply `--order` and `--exclude` to the upload order.
fn build_order(names: &[&str], front: &[String], exclude: &[String]) -> Result<FileOrder> {
    let mut order = FileOrder::new();
    order.reconcile(names);

    for (target, name) in front.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).enumerate() {
        let mut idx = order.require(name).context("Invalid --order")?;
        if idx < target {
            anyhow::bail!("'{name}' is listed twice in --order");
        }
        while idx > target {
            order.move_up(idx)?;
            idx -= 1;
        }
    }

    for name in exclude {
        let idx = order.require(name.trim()).context("Invalid --exclude")?;
        order.set_included(idx, false)?;
    }
    Ok(order)
}

fn print_order(order: &FileOrder, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(order).context("Failed to serialise order")?
        );
        return Ok(());
    }
    for (i, entry) in order.entries().iter().enumerate() {
        let mark = if entry.included { green("✓") } else { red("✗") };
        println!("{:>3}. {} {}", i + 1, mark, entry.name);
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let font_size = FontSize::from_points(cli.font_size).with_context(|| {
        format!(
            "Unsupported font size {}pt (use 10, 11, 12 or 14)",
            cli.font_size
        )
    })?;

    let template = if cli.report {
        let code_font_size = CodeFontSize::from_points(cli.code_font_size).with_context(|| {
            format!("Unsupported code font size {}pt (use 8–11)", cli.code_font_size)
        })?;
        TemplateMode::Report(ReportTemplateOptions {
            line_numbers: cli.line_numbers,
            gray_code_background: !cli.no_gray_code,
            code_font_size,
            title_page: cli.title_page,
            title_page_background: cli.title_page_background,
        })
    } else {
        TemplateMode::Default
    };

    let mut options = ConversionOptions::builder()
        .title(cli.title.clone())
        .author(cli.author.clone())
        .font(FontSelection::from_label(&cli.font))
        .font_size(font_size)
        .margin(cli.margin.clone())
        .highlight_style(cli.highlight_style.clone().into())
        .pdf_engine(cli.pdf_engine.clone().into())
        .include_toc(!cli.no_toc)
        .separator(parse_separator(&cli.separator))
        .heading_for_single_file(!cli.no_single_heading)
        .template(template);
    if let Some(date) = cli.date {
        options = options.date(date);
    }
    let options = options.build().context("Invalid document options")?;

    let mut builder = ConversionConfig::builder()
        .options(options)
        .engine_program(cli.pandoc.clone())
        .probe_program(cli.fc_list.clone())
        .engine_timeout_secs(cli.timeout);
    if let Some(ref path) = cli.template {
        builder = builder.template_path(path.clone());
    }
    if let Some(ref path) = cli.background {
        builder = builder.background_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--separator` string into `FileSeparator`.
fn parse_separator(s: &str) -> FileSeparator {
    match s.trim().to_lowercase().as_str() {
        "none" | "" => FileSeparator::None,
        "hr" | "---" => FileSeparator::HorizontalRule,
        _ => FileSeparator::Custom(s.to_string()),
    }
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
