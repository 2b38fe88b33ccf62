//! Font resolution: pick the main/monospace pair passed to the LaTeX engine.
//!
//! Three tiers:
//!
//! 1. **Named** — look the label up in [`NAMED_FONTS`]. Labels missing from
//!    the table leave the engine defaults alone.
//! 2. **Auto-detect** — ask a [`FontProbe`] about each pair of
//!    [`AUTO_CANDIDATES`] in order and take the first installed one. Probing
//!    stops at the first hit, and stops altogether if the probe tool cannot
//!    be run. Without a hit the generic [`FALLBACK`] pair is used.
//! 3. **Engine default** — no override.
//!
//! The probe is a trait so tests (and embedders with their own font
//! inventory) can replace `fc-list`.

use crate::config::FontSelection;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A main font and the monospace font that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontPair {
    pub main: String,
    pub mono: String,
}

impl FontPair {
    pub fn new(main: impl Into<String>, mono: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            mono: mono.into(),
        }
    }
}

/// Families a user can pick by name.
pub const NAMED_FONTS: &[(&str, &str, &str)] = &[
    ("Open Sans", "Open Sans", "DejaVu Sans Mono"),
    ("Liberation Serif", "Liberation Serif", "Liberation Mono"),
    ("DejaVu Serif", "DejaVu Serif", "DejaVu Sans Mono"),
    ("Times", "Times", "Courier"),
];

/// Pairs tried by auto-detection, most preferred first.
pub const AUTO_CANDIDATES: &[(&str, &str)] = &[
    ("Liberation Serif", "Liberation Mono"),
    ("DejaVu Serif", "DejaVu Sans Mono"),
    ("Times", "Courier"),
    ("serif", "monospace"),
];

/// Used when auto-detection finds nothing.
pub const FALLBACK: (&str, &str) = ("serif", "monospace");

/// Answer from a font inventory query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The family is installed.
    Available,
    /// The query ran but the family is not installed.
    Unavailable,
    /// The query tool could not be run at all.
    ToolMissing,
}

/// A font inventory that can be asked whether a family is installed.
pub trait FontProbe: Send + Sync {
    fn probe<'a>(&'a self, family: &'a str) -> BoxFuture<'a, ProbeOutcome>;
}

/// [`FontProbe`] backed by fontconfig's `fc-list :family=<name>`.
///
/// A family counts as installed when the command exits 0 and prints
/// something.
#[derive(Debug, Clone)]
pub struct FcListProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FcListProbe {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for FcListProbe {
    fn default() -> Self {
        Self::new("fc-list", Duration::from_secs(10))
    }
}

impl FontProbe for FcListProbe {
    fn probe<'a>(&'a self, family: &'a str) -> BoxFuture<'a, ProbeOutcome> {
        async move {
            let mut cmd = tokio::process::Command::new(&self.program);
            cmd.arg(format!(":family={family}"))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true);

            let child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    debug!("Font probe '{}' unavailable: {}", self.program.display(), e);
                    return ProbeOutcome::ToolMissing;
                }
            };

            match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(Ok(out)) if out.status.success() && !out.stdout.trim_ascii().is_empty() => {
                    ProbeOutcome::Available
                }
                Ok(Ok(_)) => ProbeOutcome::Unavailable,
                Ok(Err(e)) => {
                    warn!("Font probe for '{}' failed: {}", family, e);
                    ProbeOutcome::Unavailable
                }
                Err(_) => {
                    warn!(
                        "Font probe for '{}' timed out after {:?}",
                        family, self.timeout
                    );
                    ProbeOutcome::Unavailable
                }
            }
        }
        .boxed()
    }
}

/// Look a label up in [`NAMED_FONTS`].
pub fn named_pair(label: &str) -> Option<FontPair> {
    NAMED_FONTS
        .iter()
        .find(|(l, _, _)| *l == label)
        .map(|(_, main, mono)| FontPair::new(*main, *mono))
}

/// Resolve the font pair for `selection`. `None` means "engine defaults".
pub async fn resolve_fonts(selection: &FontSelection, probe: &dyn FontProbe) -> Option<FontPair> {
    match selection {
        FontSelection::EngineDefault => None,
        FontSelection::Named(label) => {
            let pair = named_pair(label);
            if pair.is_none() {
                warn!("Unknown font family '{}'; using engine defaults", label);
            }
            pair
        }
        FontSelection::AutoDetect => Some(auto_detect(probe).await),
    }
}

async fn auto_detect(probe: &dyn FontProbe) -> FontPair {
    for (main, mono) in AUTO_CANDIDATES {
        match probe.probe(main).await {
            ProbeOutcome::Available => {
                info!("Detected font pair: {} / {}", main, mono);
                return FontPair::new(*main, *mono);
            }
            ProbeOutcome::Unavailable => debug!("Font '{}' not installed", main),
            ProbeOutcome::ToolMissing => {
                debug!("Font inventory tool unavailable; skipping detection");
                break;
            }
        }
    }
    FontPair::new(FALLBACK.0, FALLBACK.1)
}
