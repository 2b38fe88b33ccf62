//! Template customisation for the report layout.
//!
//! The bundled report template is rewritten per request before pandoc sees
//! it. All rewrites are plain text substitutions, listed in [`FONT_RULES`]
//! and applied in a single pass over the list.
//!
//! ## Rule Order
//!
//! The package rules must run before the family-name rule: they match the
//! `\usepackage` lines literally and comment them out, and the family-name
//! rule assumes none of those packages is still loaded when it swaps the
//! family for one that exists under XeLaTeX and LuaLaTeX.
//!
//! 1. Comment out `\usepackage[...]{sourcesanspro}`
//! 2. Comment out `\usepackage[...]{sourcecodepro}`
//! 3. Replace every `Source Sans Pro` with `DejaVu Sans`
//! 4. *(gray background off only)* Turn the listing background white
//!
//! Afterwards, independent of the rule list:
//! * the branding fragment goes in front of `\end{titlepage}` when a title
//!   page is wanted (skipped silently if the marker is missing);
//! * the background placeholder either becomes the copied image path or its
//!   whole line is removed, so the template never references a missing file.

use crate::config::ReportTemplateOptions;
use crate::error::Md2PdfError;
use crate::pipeline::resources::{
    self, BACKGROUND_ENV, BACKGROUND_FILE, TEMPLATE_ENV, TEMPLATE_FILE,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker closing the title page; the branding fragment goes right before it.
pub const TITLE_PAGE_MARKER: &str = "\\end{titlepage}";

/// Fixed fragment added to custom title pages.
pub const BRANDING_FRAGMENT: &str = "\\vfill\n{\\small Typeset with md2pdf\\par}\n";

/// Placeholder the template uses for the background image path.
pub const BACKGROUND_PLACEHOLDER: &str = "$titlepage-background$";

/// One ordered text substitution.
pub struct Rule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        }
    }
}

// ── Rules 1–3: font packages and family name ─────────────────────────────────

pub static FONT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "disable-sourcesanspro",
            r"(?m)^([ \t]*)(\\usepackage(?:\[[^\]]*\])?\{sourcesanspro\})",
            "${1}% ${2}",
        ),
        Rule::new(
            "disable-sourcecodepro",
            r"(?m)^([ \t]*)(\\usepackage(?:\[[^\]]*\])?\{sourcecodepro\})",
            "${1}% ${2}",
        ),
        Rule::new("replace-source-sans-pro", r"Source Sans Pro", "DejaVu Sans"),
    ]
});

// ── Rule 4: listing background ───────────────────────────────────────────────

static WHITE_LISTING_BACKGROUND: Lazy<Rule> = Lazy::new(|| {
    Rule::new(
        "white-listing-background",
        r"\\definecolor\{listing-background\}\{HTML\}\{[0-9A-Fa-f]{6}\}",
        r"\definecolor{listing-background}{HTML}{FFFFFF}",
    )
});

static BACKGROUND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[^\n]*\$titlepage-background\$[^\n]*\n?").unwrap());

/// Apply `rules` in order.
pub fn apply_rules<'r>(input: &str, rules: impl IntoIterator<Item = &'r Rule>) -> String {
    let mut text = input.to_string();
    for rule in rules {
        let replaced = rule.pattern.replace_all(&text, rule.replacement).into_owned();
        if replaced != text {
            debug!("Template rule '{}' applied", rule.name);
            text = replaced;
        }
    }
    text
}

/// Insert the branding fragment before the title-page marker, if present.
fn inject_branding(input: &str) -> String {
    match input.find(TITLE_PAGE_MARKER) {
        Some(at) => {
            let mut out = String::with_capacity(input.len() + BRANDING_FRAGMENT.len());
            out.push_str(&input[..at]);
            out.push_str(BRANDING_FRAGMENT);
            out.push_str(&input[at..]);
            out
        }
        None => {
            debug!("No title-page marker in template; branding skipped");
            input.to_string()
        }
    }
}

/// Point the background directive at `image`, or drop it entirely.
fn set_background(input: &str, image: Option<&Path>) -> String {
    match image {
        Some(path) => input.replace(BACKGROUND_PLACEHOLDER, &latex_path(path)),
        None => BACKGROUND_LINE.replace_all(input, "").into_owned(),
    }
}

/// Path spelled the way LaTeX accepts it on every platform.
pub fn latex_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Rewrite the template text for one request.
pub fn customize(
    template: &str,
    opts: &ReportTemplateOptions,
    background: Option<&Path>,
) -> String {
    let mut rules: Vec<&Rule> = FONT_RULES.iter().collect();
    if !opts.gray_code_background {
        rules.push(&WHITE_LISTING_BACKGROUND);
    }
    let mut text = apply_rules(template, rules);
    if opts.title_page {
        text = inject_branding(&text);
    }
    set_background(&text, background)
}

/// A customised template written to the scratch directory.
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    pub path: PathBuf,
    /// Copied background image, when one is in use.
    pub background: Option<PathBuf>,
    /// Files to delete once the converter has finished.
    pub cleanup: Vec<PathBuf>,
}

/// Locate, customise and materialise the report template.
///
/// A missing template is fatal; a missing background image only means the
/// title page has no background.
pub async fn prepare(
    opts: &ReportTemplateOptions,
    template_path: Option<&Path>,
    background_path: Option<&Path>,
    scratch_dir: &Path,
) -> Result<PreparedTemplate, Md2PdfError> {
    let source = resources::locate(template_path, TEMPLATE_ENV, TEMPLATE_FILE).map_err(
        |searched| Md2PdfError::ResourceMissing {
            resource: TEMPLATE_FILE.to_string(),
            searched,
        },
    )?;
    let text = tokio::fs::read_to_string(&source).await.map_err(|e| {
        Md2PdfError::Internal(format!(
            "Failed to read template {}: {}",
            source.display(),
            e
        ))
    })?;
    info!("Using template {}", source.display());

    let mut cleanup = Vec::new();

    let background = if opts.title_page && opts.title_page_background {
        match resources::locate(background_path, BACKGROUND_ENV, BACKGROUND_FILE) {
            Ok(image) => {
                let ext = image
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "png".to_string());
                let copied = scratch_dir.join(format!("background.{ext}"));
                tokio::fs::copy(&image, &copied).await.map_err(|e| {
                    Md2PdfError::Internal(format!("Failed to copy background image: {e}"))
                })?;
                cleanup.push(copied.clone());
                Some(copied)
            }
            Err(_) => {
                warn!("Title-page background image not found; continuing without it");
                None
            }
        }
    } else {
        None
    };

    let customised = customize(&text, opts, background.as_deref());
    let path = scratch_dir.join("template.latex");
    tokio::fs::write(&path, customised)
        .await
        .map_err(|e| Md2PdfError::Internal(format!("Failed to write template: {e}")))?;
    cleanup.push(path.clone());

    Ok(PreparedTemplate {
        path,
        background,
        cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        "\\documentclass{article}\n",
        "\\usepackage[default]{sourcesanspro}\n",
        "  \\usepackage{sourcecodepro}\n",
        "\\setmainfont{Source Sans Pro}\n",
        "\\setsansfont{Source Sans Pro}\n",
        "\\definecolor{listing-background}{HTML}{F7F7F7}\n",
        "$if(titlepage)$\n",
        "\\begin{titlepage}\n",
        "$if(titlepage-background)$\\includegraphics{$titlepage-background$}$endif$\n",
        "Title\n",
        "\\end{titlepage}\n",
        "$endif$\n",
    );

    fn active_package_lines(text: &str, package: &str) -> usize {
        text.lines()
            .filter(|l| !l.trim_start().starts_with('%'))
            .filter(|l| l.contains(&format!("{{{package}}}")))
            .count()
    }

    #[test]
    fn font_rules_leave_no_active_package_and_no_family_token() {
        let out = apply_rules(SAMPLE, FONT_RULES.iter());
        assert_eq!(active_package_lines(&out, "sourcesanspro"), 0);
        assert_eq!(active_package_lines(&out, "sourcecodepro"), 0);
        assert_eq!(out.matches("Source Sans Pro").count(), 0);
        assert_eq!(out.matches("DejaVu Sans").count(), 2);
        // Indentation is preserved on the commented line.
        assert!(out.contains("  % \\usepackage{sourcecodepro}"));
    }

    #[test]
    fn rules_run_in_documented_order() {
        let names: Vec<&str> = FONT_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "disable-sourcesanspro",
                "disable-sourcecodepro",
                "replace-source-sans-pro"
            ]
        );
    }

    #[test]
    fn rules_are_stable_when_reapplied() {
        let once = apply_rules(SAMPLE, FONT_RULES.iter());
        let twice = apply_rules(&once, FONT_RULES.iter());
        // The commented line is not re-matched because it no longer starts
        // with \usepackage.
        assert_eq!(once, twice);
    }

    #[test]
    fn gray_background_is_kept_by_default() {
        let out = customize(SAMPLE, &ReportTemplateOptions::default(), None);
        assert!(out.contains("{HTML}{F7F7F7}"));

        let white = customize(
            SAMPLE,
            &ReportTemplateOptions {
                gray_code_background: false,
                ..Default::default()
            },
            None,
        );
        assert!(white.contains("\\definecolor{listing-background}{HTML}{FFFFFF}"));
        assert!(!white.contains("F7F7F7"));
    }

    #[test]
    fn branding_goes_right_before_marker() {
        let opts = ReportTemplateOptions {
            title_page: true,
            ..Default::default()
        };
        let out = customize(SAMPLE, &opts, None);
        assert!(out.contains(&format!("{BRANDING_FRAGMENT}{TITLE_PAGE_MARKER}")));
        assert_eq!(out.matches(BRANDING_FRAGMENT).count(), 1);
    }

    #[test]
    fn branding_skipped_without_marker() {
        let opts = ReportTemplateOptions {
            title_page: true,
            ..Default::default()
        };
        let template = "\\documentclass{article}\n\\begin{document}\n";
        let out = customize(template, &opts, None);
        assert_eq!(out, template);
    }

    #[test]
    fn branding_only_with_title_page() {
        let out = customize(SAMPLE, &ReportTemplateOptions::default(), None);
        assert!(!out.contains(BRANDING_FRAGMENT));
    }

    #[test]
    fn background_line_removed_when_no_image() {
        let out = customize(SAMPLE, &ReportTemplateOptions::default(), None);
        assert!(!out.contains(BACKGROUND_PLACEHOLDER));
        assert!(!out.contains("includegraphics"));
        assert!(out.contains("\\begin{titlepage}\nTitle\n"));
    }

    #[test]
    fn background_path_substituted() {
        let out = customize(
            SAMPLE,
            &ReportTemplateOptions::default(),
            Some(Path::new("/tmp/scratch/background.png")),
        );
        assert!(out.contains("\\includegraphics{/tmp/scratch/background.png}"));
        assert!(!out.contains(BACKGROUND_PLACEHOLDER));
    }

    #[test]
    fn latex_path_uses_forward_slashes() {
        assert_eq!(latex_path(Path::new("C:\\tmp\\bg.png")), "C:/tmp/bg.png");
    }

    #[tokio::test]
    async fn prepare_fails_without_template() {
        let scratch = tempfile::tempdir().unwrap();
        let err = prepare(
            &ReportTemplateOptions::default(),
            Some(Path::new("/definitely/not/report.latex")),
            None,
            scratch.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Md2PdfError::ResourceMissing { .. }));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn prepare_writes_template_and_copies_background() {
        let res = tempfile::tempdir().unwrap();
        let template = res.path().join("report.latex");
        let image = res.path().join("cover.png");
        std::fs::write(&template, SAMPLE).unwrap();
        std::fs::write(&image, b"\x89PNG").unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let opts = ReportTemplateOptions {
            title_page: true,
            title_page_background: true,
            ..Default::default()
        };
        let prepared = prepare(&opts, Some(&template), Some(&image), scratch.path())
            .await
            .unwrap();

        let copied = scratch.path().join("background.png");
        assert_eq!(prepared.background.as_deref(), Some(copied.as_path()));
        assert_eq!(prepared.cleanup, vec![copied.clone(), prepared.path.clone()]);

        let written = std::fs::read_to_string(&prepared.path).unwrap();
        assert!(written.contains(&latex_path(&copied)));
        assert!(written.contains(BRANDING_FRAGMENT));
    }

    #[tokio::test]
    async fn prepare_degrades_without_background_image() {
        let res = tempfile::tempdir().unwrap();
        let template = res.path().join("report.latex");
        std::fs::write(&template, SAMPLE).unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let opts = ReportTemplateOptions {
            title_page: true,
            title_page_background: true,
            ..Default::default()
        };
        let prepared = prepare(
            &opts,
            Some(&template),
            Some(Path::new("/definitely/not/cover.png")),
            scratch.path(),
        )
        .await
        .unwrap();

        assert!(prepared.background.is_none());
        assert_eq!(prepared.cleanup, vec![prepared.path.clone()]);
        let written = std::fs::read_to_string(&prepared.path).unwrap();
        assert!(!written.contains(BACKGROUND_PLACEHOLDER));
    }
}
