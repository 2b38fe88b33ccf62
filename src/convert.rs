//! Conversion entry points.
//!
//! A request is a set of uploaded files plus the ordering store that says
//! which of them to merge and in what order. Every request gets its own
//! scratch directory; it is removed on every exit path, including panics
//! inside the pipeline.

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::order::FileOrder;
use crate::output::{suggested_filename, ConversionOutput, ConversionStats};
use crate::pipeline::command::{self, BuildContext};
use crate::pipeline::fonts::{FcListProbe, FontProbe};
use crate::pipeline::input::{self, UploadedFile};
use crate::pipeline::{engine, merge};
use crate::progress::Stage;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const MERGED_FILE: &str = "merged.md";
const OUTPUT_FILE: &str = "output.pdf";

/// Merge the included files of `order` and convert them to PDF.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// * [`Md2PdfError::InputEmpty`] when nothing included matches an uploaded
///   file; checked before any directory is created or tool is looked up.
/// * [`Md2PdfError::DuplicateFile`] when two files share a name.
/// * [`Md2PdfError::InvalidConfig`] when `config` fails validation.
/// * [`Md2PdfError::ResourceMissing`] when the report template is requested
///   but cannot be found.
/// * [`Md2PdfError::ToolMissing`] / [`Md2PdfError::ToolFailed`] /
///   [`Md2PdfError::ToolTimeout`] for converter problems.
pub async fn convert(
    files: &[UploadedFile],
    order: &FileOrder,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let selected = order.effective_order();
    input::validate_request(files, &selected)?;
    // Struct literals and deserialised configs bypass the builders.
    config.validate()?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected.len());
    }

    let result = match AssertUnwindSafe(run_pipeline(files, &selected, config))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(Md2PdfError::Internal(format!(
            "conversion panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    if let Some(ref cb) = config.progress_callback {
        match result {
            Ok(ref output) => {
                cb.on_stage(Stage::Done);
                cb.on_conversion_complete(output.pdf.len());
            }
            Err(ref e) => cb.on_conversion_failed(&e.to_string()),
        }
    }
    result
}

/// Convert and write the PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    files: &[UploadedFile],
    order: &FileOrder,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Md2PdfError> {
    let output = convert(files, order, config).await?;
    let path = output_path.as_ref();
    let write_err = |e| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), output.pdf.len());
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    files: &[UploadedFile],
    order: &FileOrder,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(files, order, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(
    files: &[UploadedFile],
    selected: &[&str],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    let options = &config.options;
    let stage = |s: Stage| {
        debug!("Stage: {} ({}%)", s.label(), s.percent());
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };

    // ── Step 1: Scratch directory ────────────────────────────────────────
    let mut builder = tempfile::Builder::new();
    builder.prefix("md2pdf-");
    let scratch = match config.scratch_root {
        Some(ref root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|e| Md2PdfError::Internal(format!("Failed to create scratch directory: {e}")))?;
    debug!("Scratch directory: {}", scratch.path().display());

    // ── Step 2: Merge ────────────────────────────────────────────────────
    stage(Stage::Merging);
    let merged = merge::assemble(
        selected,
        files,
        &options.separator,
        options.heading_for_single_file,
    )?;
    if merged.files.is_empty() {
        return Err(Md2PdfError::InputEmpty);
    }
    let merged_path = scratch.path().join(MERGED_FILE);
    tokio::fs::write(&merged_path, &merged.markdown)
        .await
        .map_err(|e| Md2PdfError::Internal(format!("Failed to write merged Markdown: {e}")))?;

    // ── Step 3: Build the command ────────────────────────────────────────
    stage(Stage::Preparing);
    let probe: Arc<dyn FontProbe> = match config.font_probe {
        Some(ref probe) => Arc::clone(probe),
        None => Arc::new(FcListProbe::new(
            config.probe_program.clone(),
            Duration::from_secs(config.probe_timeout_secs),
        )),
    };
    let output_path = scratch.path().join(OUTPUT_FILE);
    let ctx = BuildContext {
        program: &config.engine_program,
        probe: probe.as_ref(),
        template_path: config.template_path.as_deref(),
        background_path: config.background_path.as_deref(),
        scratch_dir: scratch.path(),
    };
    let invocation = command::build_invocation(&merged_path, &output_path, options, &ctx).await?;

    // ── Step 4: Run the converter ────────────────────────────────────────
    stage(Stage::Converting);
    let ran = engine::run(
        &invocation,
        Duration::from_secs(config.engine_timeout_secs),
    )
    .await;
    remove_files(&invocation.cleanup).await;
    let ran = ran.inspect_err(|e| error!("Conversion failed: {}", e))?;

    let pdf = tokio::fs::read(&output_path).await.map_err(|e| {
        Md2PdfError::Internal(format!("Converter reported success but produced no PDF: {e}"))
    })?;

    let stats = ConversionStats {
        files_merged: merged.files.len(),
        markdown_bytes: merged.markdown.len(),
        pdf_bytes: pdf.len(),
        fonts: invocation.fonts.clone(),
        engine_duration_ms: ran.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} files, {} bytes of PDF, {}ms total",
        stats.files_merged, stats.pdf_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf,
        filename: suggested_filename(&options.title, merged.files.len()),
        stats,
    })
}

async fn remove_files(paths: &[std::path::PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::pipeline::fonts::ProbeOutcome;
    use futures::future::BoxFuture;

    struct PanickingProbe;

    impl FontProbe for PanickingProbe {
        fn probe<'a>(&'a self, _family: &'a str) -> BoxFuture<'a, ProbeOutcome> {
            panic!("probe exploded")
        }
    }

    fn files() -> Vec<UploadedFile> {
        vec![UploadedFile::new("a.md", "A"), UploadedFile::new("b.md", "B")]
    }

    #[tokio::test]
    async fn nothing_included_fails_before_engine_lookup() {
        let files = files();
        let mut order = FileOrder::from_names(&["a.md", "b.md"]);
        order.set_included(0, false).unwrap();
        order.set_included(1, false).unwrap();

        let config = ConversionConfig::builder()
            .engine_program("/definitely/not/pandoc")
            .build()
            .unwrap();
        let err = convert(&files, &order, &config).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InputEmpty);
    }

    #[tokio::test]
    async fn stale_order_with_only_unknown_names_is_input_empty() {
        let root = tempfile::tempdir().unwrap();
        let config = ConversionConfig::builder()
            .engine_program("/definitely/not/pandoc")
            .scratch_root(root.path())
            .build()
            .unwrap();
        let order = FileOrder::from_names(&["ghost.md"]);
        let err = convert(&files(), &order, &config).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::InputEmpty), "got {err:?}");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn options_built_without_builder_are_still_validated() {
        let mut config = ConversionConfig::default();
        config.options.margin = "2cm; \\evil".to_string();
        let order = FileOrder::from_names(&["a.md"]);
        let err = convert(&files(), &order, &config).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);

        let mut config = ConversionConfig::default();
        config.engine_timeout_secs = 0;
        let err = convert(&files(), &order, &config).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidConfig(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn duplicate_names_are_invalid_input() {
        let files = vec![UploadedFile::new("a.md", "1"), UploadedFile::new("a.md", "2")];
        let order = FileOrder::from_names(&["a.md"]);
        let err = convert(&files, &order, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
    }

    #[tokio::test]
    async fn missing_engine_is_tool_missing_and_scratch_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let config = ConversionConfig::builder()
            .engine_program("/definitely/not/pandoc")
            .options(
                crate::ConversionOptions::builder()
                    .font(crate::FontSelection::EngineDefault)
                    .build()
                    .unwrap(),
            )
            .scratch_root(root.path())
            .build()
            .unwrap();
        let order = FileOrder::from_names(&["a.md", "b.md"]);
        let err = convert(&files(), &order, &config).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::ToolMissing);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let root = tempfile::tempdir().unwrap();
        let config = ConversionConfig::builder()
            .font_probe(Arc::new(PanickingProbe))
            .scratch_root(root.path())
            .build()
            .unwrap();
        let order = FileOrder::from_names(&["a.md"]);
        let err = convert(&files(), &order, &config).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InternalError);
        assert!(err.to_string().contains("probe exploded"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn panic_message_handles_both_payload_types() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
    }
}
