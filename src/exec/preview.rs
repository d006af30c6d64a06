// src/exec/preview.rs

//! Preview server process handling.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// How to launch a renderer's preview server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the renderer's build directory.
    pub cwd: PathBuf,
    /// Where the preview is reachable once started.
    pub url: String,
}

/// A running preview server.
///
/// Production code uses [`ChildPreview`]; tests provide fakes that record
/// termination requests.
pub trait PreviewProcess: Send {
    /// False once the process has exited.
    fn is_running(&mut self) -> bool;

    /// Ask the process to stop and wait up to `grace` for it to exit.
    fn terminate(
        &mut self,
        grace: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Preview server backed by a child process.
#[derive(Debug)]
pub struct ChildPreview {
    program: String,
    child: Child,
}

/// Spawn the preview command, forwarding its output to the log at debug
/// level.
pub fn spawn_preview(command: &PreviewCommand) -> Result<ChildPreview> {
    info!(
        program = %command.program,
        args = ?command.args,
        cwd = ?command.cwd,
        "spawning preview server"
    );

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning preview server '{}'", command.program))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(command.program.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(command.program.clone(), "stderr", stderr);
    }

    Ok(ChildPreview {
        program: command.program.clone(),
        child,
    })
}

// Always drain the pipes so the server never blocks on a full buffer.
fn forward_lines<R>(program: String, stream: &'static str, reader: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(server = %program, stream, "{}", line);
        }
    });
}

impl PreviewProcess for ChildPreview {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(
        &mut self,
        grace: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.is_running() {
                debug!(server = %self.program, "preview server already exited");
                return Ok(());
            }

            info!(server = %self.program, pid = ?self.child.id(), "terminating preview server");
            self.child
                .start_kill()
                .with_context(|| format!("killing preview server '{}'", self.program))?;

            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(status) => {
                    let status = status.with_context(|| {
                        format!("waiting for preview server '{}'", self.program)
                    })?;
                    debug!(server = %self.program, ?status, "preview server exited");
                }
                Err(_) => {
                    warn!(
                        server = %self.program,
                        grace_ms = grace.as_millis() as u64,
                        "preview server did not exit in time"
                    );
                }
            }
            Ok(())
        })
    }
}

/// Open `url` with the platform's default handler.
pub fn open_browser(url: &str) -> Result<()> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(url);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };
    cmd.stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("opening browser for {url}"))?;
    Ok(())
}
