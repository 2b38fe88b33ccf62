//! Command assembly: map [`ConversionOptions`] to a pandoc invocation.
//!
//! The builder never runs the converter; it only decides the argument list
//! and which scratch files must be removed afterwards. It does run the font
//! probe (auto-detection) and materialise the report template, in that
//! order reversed: the template is located first so that a missing resource
//! aborts before any external process is started.
//!
//! ## Argument layout
//!
//! ```text
//! <merged.md> -o <output.pdf> --pdf-engine=… -V fontsize=… -V geometry:margin=…
//! -V linkcolor=blue -V urlcolor=blue [--highlight-style=…] --standalone
//! [-M title=…] [-M author=…] -M date=…
//! [--toc --toc-depth=3]
//! [-V mainfont=… -V monofont=…]
//! [--template=… --listings [-V listings-disable-line-numbers=true]
//!  [-V code-block-font-size=…] [-V titlepage=true -V titlepage-*-color=… …]]
//! ```

use crate::config::{CodeFontSize, ConversionOptions, ReportTemplateOptions, TemplateMode};
use crate::error::Md2PdfError;
use crate::pipeline::fonts::{resolve_fonts, FontPair, FontProbe};
use crate::pipeline::template::{self, PreparedTemplate};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Depth of the table of contents.
pub const TOC_DEPTH: u8 = 3;

/// Title-page background colour (HTML hex).
pub const TITLE_PAGE_COLOR: &str = "1E3A5F";
/// Title-page text colour (HTML hex).
pub const TITLE_PAGE_TEXT_COLOR: &str = "FFFFFF";
/// Title-page rule colour (HTML hex).
pub const TITLE_PAGE_RULE_COLOR: &str = "F0A500";

/// A fully assembled converter command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Scratch files to delete once the converter has exited.
    pub cleanup: Vec<PathBuf>,
    /// Font pair passed to the engine, if any.
    pub fonts: Option<FontPair>,
}

/// Everything the builder needs besides the options.
pub struct BuildContext<'a> {
    pub program: &'a Path,
    pub probe: &'a dyn FontProbe,
    pub template_path: Option<&'a Path>,
    pub background_path: Option<&'a Path>,
    pub scratch_dir: &'a Path,
}

/// Build the converter invocation for one request.
pub async fn build_invocation(
    merged_path: &Path,
    output_path: &Path,
    options: &ConversionOptions,
    ctx: &BuildContext<'_>,
) -> Result<Invocation, Md2PdfError> {
    let prepared = match options.template {
        TemplateMode::Default => None,
        TemplateMode::Report(ref report) => Some((
            report,
            template::prepare(
                report,
                ctx.template_path,
                ctx.background_path,
                ctx.scratch_dir,
            )
            .await?,
        )),
    };

    // ── Baseline ─────────────────────────────────────────────────────────
    let mut args = vec![
        merged_path.to_string_lossy().into_owned(),
        "-o".to_string(),
        output_path.to_string_lossy().into_owned(),
        format!("--pdf-engine={}", options.pdf_engine.as_str()),
    ];
    push_var(&mut args, "fontsize", &options.font_size.to_string());
    push_var(&mut args, "geometry:margin", options.margin.trim());
    push_var(&mut args, "linkcolor", "blue");
    push_var(&mut args, "urlcolor", "blue");
    // Listings replace pandoc's highlighter, so the style would be ignored.
    if prepared.is_none() {
        args.push(format!(
            "--highlight-style={}",
            options.highlight_style.as_str()
        ));
    }
    args.push("--standalone".to_string());

    // ── Metadata ─────────────────────────────────────────────────────────
    let title = options.title.trim();
    if !title.is_empty() {
        push_meta(&mut args, "title", title);
    }
    let author = options.author.trim();
    if !author.is_empty() {
        push_meta(&mut args, "author", author);
    }
    push_meta(
        &mut args,
        "date",
        &options.effective_date().format("%B %d, %Y").to_string(),
    );

    // ── Table of contents ────────────────────────────────────────────────
    if options.include_toc {
        args.push("--toc".to_string());
        args.push(format!("--toc-depth={TOC_DEPTH}"));
    }

    // ── Fonts ────────────────────────────────────────────────────────────
    let fonts = resolve_fonts(&options.font, ctx.probe).await;
    if let Some(ref pair) = fonts {
        push_var(&mut args, "mainfont", &pair.main);
        push_var(&mut args, "monofont", &pair.mono);
    }

    // ── Report template ──────────────────────────────────────────────────
    let mut cleanup = Vec::new();
    if let Some((report, prepared)) = prepared {
        push_template_args(&mut args, report, &prepared);
        cleanup = prepared.cleanup;
    }

    debug!("Converter arguments: {:?}", args);

    Ok(Invocation {
        program: ctx.program.to_path_buf(),
        args,
        cleanup,
        fonts,
    })
}

fn push_template_args(
    args: &mut Vec<String>,
    report: &ReportTemplateOptions,
    prepared: &PreparedTemplate,
) {
    args.push(format!("--template={}", prepared.path.to_string_lossy()));
    args.push("--listings".to_string());
    if !report.line_numbers {
        push_var(args, "listings-disable-line-numbers", "true");
    }
    if report.code_font_size != CodeFontSize::default() {
        push_var(args, "code-block-font-size", report.code_font_size.latex_token());
    }
    if report.title_page {
        push_var(args, "titlepage", "true");
        push_var(args, "titlepage-color", TITLE_PAGE_COLOR);
        push_var(args, "titlepage-text-color", TITLE_PAGE_TEXT_COLOR);
        push_var(args, "titlepage-rule-color", TITLE_PAGE_RULE_COLOR);
        if let Some(ref image) = prepared.background {
            push_var(args, "titlepage-background", &template::latex_path(image));
        }
    }
}

fn push_var(args: &mut Vec<String>, key: &str, value: &str) {
    args.push("-V".to_string());
    args.push(format!("{key}={value}"));
}

fn push_meta(args: &mut Vec<String>, key: &str, value: &str) {
    args.push("-M".to_string());
    args.push(format!("{key}={value}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontSelection, FontSize, HighlightStyle, PdfEngine};
    use crate::pipeline::fonts::ProbeOutcome;
    use chrono::NaiveDate;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe(AtomicUsize);

    impl FontProbe for CountingProbe {
        fn probe<'a>(&'a self, _family: &'a str) -> BoxFuture<'a, ProbeOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(ProbeOutcome::Unavailable).boxed()
        }
    }

    fn probe() -> CountingProbe {
        CountingProbe(AtomicUsize::new(0))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    async fn build(
        options: &ConversionOptions,
        scratch: &Path,
        template: Option<&Path>,
    ) -> Result<Invocation, Md2PdfError> {
        let probe = probe();
        let ctx = BuildContext {
            program: Path::new("pandoc"),
            probe: &probe,
            template_path: template,
            background_path: None,
            scratch_dir: scratch,
        };
        build_invocation(Path::new("/s/merged.md"), Path::new("/s/output.pdf"), options, &ctx).await
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[tokio::test]
    async fn baseline_arguments() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .title("")
            .date(date())
            .include_toc(false)
            .font(FontSelection::EngineDefault)
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), None).await.unwrap();

        assert_eq!(inv.program, PathBuf::from("pandoc"));
        assert_eq!(
            inv.args,
            vec![
                "/s/merged.md",
                "-o",
                "/s/output.pdf",
                "--pdf-engine=xelatex",
                "-V",
                "fontsize=12pt",
                "-V",
                "geometry:margin=2.5cm",
                "-V",
                "linkcolor=blue",
                "-V",
                "urlcolor=blue",
                "--highlight-style=monochrome",
                "--standalone",
                "-M",
                "date=March 05, 2024",
            ]
        );
        assert!(inv.cleanup.is_empty());
        assert_eq!(inv.fonts, None);
    }

    #[tokio::test]
    async fn metadata_trimmed_and_skipped_when_blank() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .title("  My Notes  ")
            .author("   ")
            .date(date())
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), None).await.unwrap();
        assert!(has_pair(&inv.args, "-M", "title=My Notes"));
        assert!(!inv.args.iter().any(|a| a.starts_with("author=")));
        assert!(has_pair(&inv.args, "-M", "date=March 05, 2024"));
    }

    #[tokio::test]
    async fn toc_and_cosmetics() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .font_size(FontSize::Pt10)
            .margin("2cm")
            .highlight_style(HighlightStyle::Zenburn)
            .pdf_engine(PdfEngine::Lualatex)
            .include_toc(true)
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), None).await.unwrap();
        let args = &inv.args;
        assert!(args.contains(&"--pdf-engine=lualatex".to_string()));
        assert!(has_pair(args, "-V", "fontsize=10pt"));
        assert!(has_pair(args, "-V", "geometry:margin=2cm"));
        assert!(args.contains(&"--highlight-style=zenburn".to_string()));
        assert!(has_pair(args, "--toc", "--toc-depth=3"));
    }

    #[tokio::test]
    async fn auto_detect_injects_fallback_fonts() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::default();
        let inv = build(&options, scratch.path(), None).await.unwrap();
        assert!(has_pair(&inv.args, "-V", "mainfont=serif"));
        assert!(has_pair(&inv.args, "-V", "monofont=monospace"));
        assert_eq!(inv.fonts, Some(FontPair::new("serif", "monospace")));
    }

    #[tokio::test]
    async fn named_font_injected() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .font(FontSelection::named("Times"))
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), None).await.unwrap();
        assert!(has_pair(&inv.args, "-V", "mainfont=Times"));
        assert!(has_pair(&inv.args, "-V", "monofont=Courier"));
    }

    #[tokio::test]
    async fn missing_template_aborts_before_probing() {
        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .template(TemplateMode::Report(ReportTemplateOptions::default()))
            .build()
            .unwrap();
        let probe = probe();
        let ctx = BuildContext {
            program: Path::new("pandoc"),
            probe: &probe,
            template_path: Some(Path::new("/definitely/not/report.latex")),
            background_path: None,
            scratch_dir: scratch.path(),
        };
        let err = build_invocation(Path::new("m.md"), Path::new("o.pdf"), &options, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::ResourceMissing { .. }));
        assert_eq!(probe.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn report_template_arguments() {
        let res = tempfile::tempdir().unwrap();
        let template = res.path().join("report.latex");
        std::fs::write(&template, "\\begin{titlepage}\n\\end{titlepage}\n").unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .template(TemplateMode::Report(ReportTemplateOptions {
                line_numbers: false,
                code_font_size: CodeFontSize::Pt10,
                title_page: true,
                ..Default::default()
            }))
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), Some(&template)).await.unwrap();
        let args = &inv.args;

        let written = scratch.path().join("template.latex");
        assert!(args.contains(&format!("--template={}", written.display())));
        assert!(args.contains(&"--listings".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--highlight-style")));
        assert!(has_pair(args, "-V", "listings-disable-line-numbers=true"));
        assert!(has_pair(args, "-V", "code-block-font-size=\\small"));
        assert!(has_pair(args, "-V", "titlepage=true"));
        assert!(has_pair(args, "-V", "titlepage-color=1E3A5F"));
        assert!(has_pair(args, "-V", "titlepage-text-color=FFFFFF"));
        assert!(has_pair(args, "-V", "titlepage-rule-color=F0A500"));
        assert!(!args.iter().any(|a| a.starts_with("titlepage-background=")));
        assert_eq!(inv.cleanup, vec![written]);
    }

    #[tokio::test]
    async fn default_code_size_and_line_numbers_add_nothing() {
        let res = tempfile::tempdir().unwrap();
        let template = res.path().join("report.latex");
        std::fs::write(&template, "x").unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let options = ConversionOptions::builder()
            .template(TemplateMode::Report(ReportTemplateOptions {
                line_numbers: true,
                ..Default::default()
            }))
            .build()
            .unwrap();
        let inv = build(&options, scratch.path(), Some(&template)).await.unwrap();
        assert!(!inv.args.iter().any(|a| a.starts_with("code-block-font-size")));
        assert!(!inv.args.iter().any(|a| a.starts_with("listings-disable-line-numbers")));
        assert!(!inv.args.iter().any(|a| a.starts_with("titlepage")));
    }
}
