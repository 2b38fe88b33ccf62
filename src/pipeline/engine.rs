//! Run the external converter and wait for it.
//!
//! On unix the converter gets its own process group. A timeout kills the
//! whole group, which includes the LaTeX runs pandoc starts; otherwise they
//! would keep writing into a scratch directory that is being removed.
//! Cancelling the future (dropping it) only kills pandoc itself through
//! `kill_on_drop`.

use crate::error::Md2PdfError;
use crate::pipeline::command::Invocation;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a successful run leaves behind besides the PDF itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// Warnings the converter printed (LaTeX is chatty even on success).
    pub stderr: String,
    pub duration_ms: u64,
}

/// Execute `invocation`, failing if it runs longer than `timeout`.
pub async fn run(invocation: &Invocation, timeout: Duration) -> Result<EngineOutput, Md2PdfError> {
    let tool = invocation.program.display().to_string();
    info!("Running {} ({} args)", tool, invocation.args.len());

    let mut cmd = tokio::process::Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let start = Instant::now();
    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Md2PdfError::ToolMissing { tool: tool.clone() }
        } else {
            Md2PdfError::Internal(format!("Failed to start '{tool}': {e}"))
        }
    })?;
    let pid = child.id();

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result
            .map_err(|e| Md2PdfError::Internal(format!("Failed to wait for '{tool}': {e}")))?,
        Err(_) => {
            warn!("{} exceeded {:?}; killing it", tool, timeout);
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            return Err(Md2PdfError::ToolTimeout {
                tool,
                secs: timeout.as_secs(),
            });
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(Md2PdfError::ToolFailed {
            tool,
            code: output.status.code(),
            stderr,
        });
    }

    if !stderr.trim().is_empty() {
        debug!("{} stderr:\n{}", tool, stderr);
    }
    info!("{} finished in {}ms", tool, duration_ms);

    Ok(EngineOutput {
        stderr,
        duration_ms,
    })
}

/// Send SIGKILL to every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        debug!(
            "Process group {} already gone: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn stub(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("stub-engine");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn invocation(program: PathBuf, args: &[&str]) -> Invocation {
        Invocation {
            program,
            args: args.iter().map(|s| s.to_string()).collect(),
            cleanup: Vec::new(),
            fonts: None,
        }
    }

    #[tokio::test]
    async fn missing_program_is_tool_missing() {
        let inv = invocation(PathBuf::from("/definitely/not/pandoc"), &[]);
        let err = run(&inv, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Md2PdfError::ToolMissing { .. }), "got {err:?}");
    }

    #[tokio::test]
    #[serial]
    async fn nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = stub(dir.path(), "echo 'font not found' >&2\nexit 2");
        let err = run(&invocation(program, &[]), Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            Md2PdfError::ToolFailed { code, stderr, .. } => {
                assert_eq!(code, Some(2));
                assert!(stderr.contains("font not found"));
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn success_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let program = stub(dir.path(), "echo \"$@\" > \"$1\"\necho warning >&2");
        let arg = out.to_string_lossy().into_owned();
        let result = run(&invocation(program, &[&arg, "--standalone"]), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(result.stderr.contains("warning"));
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.trim_end().ends_with("--standalone"));
    }

    /// True once `pid` has exited (gone, or a zombie waiting to be reaped).
    #[cfg(target_os = "linux")]
    fn exited(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => true,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    #[serial]
    async fn timeout_kills_the_converters_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("child.pid");
        let program = stub(
            dir.path(),
            &format!("sleep 30 &\necho $! > '{}'\nwait", pid_file.display()),
        );
        let err = run(&invocation(program, &[]), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::ToolTimeout { .. }), "got {err:?}");

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        let mut gone = false;
        for _ in 0..40 {
            if exited(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(gone, "background child {pid} survived the timeout");
    }

    #[tokio::test]
    #[serial]
    async fn hung_engine_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let program = stub(dir.path(), "sleep 30");
        let err = run(&invocation(program, &[]), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::ToolTimeout { .. }), "got {err:?}");
    }
}
