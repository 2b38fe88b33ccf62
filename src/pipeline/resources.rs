//! Locate files bundled alongside the application (template, background).
//!
//! Search order:
//! 1. an explicit path from the configuration
//! 2. an environment variable (`MD2PDF_TEMPLATE`, `MD2PDF_TITLEPAGE_BACKGROUND`)
//! 3. `templates/<file>` relative to the working directory
//! 4. `templates/<file>` next to the executable, then `../share/md2pdf/<file>`

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the report template location.
pub const TEMPLATE_ENV: &str = "MD2PDF_TEMPLATE";
/// Environment variable overriding the title-page background location.
pub const BACKGROUND_ENV: &str = "MD2PDF_TITLEPAGE_BACKGROUND";

pub const TEMPLATE_FILE: &str = "report.latex";
pub const BACKGROUND_FILE: &str = "background.png";

/// Find a resource, or return every location that was tried.
pub fn locate(
    explicit: Option<&Path>,
    env_var: &str,
    file_name: &str,
) -> Result<PathBuf, Vec<PathBuf>> {
    // An explicit path is authoritative: no silent fallback to another copy.
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(vec![path.to_path_buf()])
        };
    }

    let mut searched = Vec::new();

    if let Ok(value) = std::env::var(env_var) {
        let p = PathBuf::from(&value);
        if p.is_file() {
            debug!("Using {} from {}", file_name, env_var);
            return Ok(p);
        }
        warn!(path = %value, "{} set but file not found", env_var);
        searched.push(p);
    }

    let mut candidates = vec![PathBuf::from("templates").join(file_name)];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("templates").join(file_name));
        candidates.push(dir.join("../share/md2pdf").join(file_name));
    }

    for candidate in candidates {
        if candidate.is_file() {
            debug!("Found {} at {}", file_name, candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(searched)
}
