//! Session handle — owns the GHCi child process and the prompt-matching
//! protocol.
//!
//! GHCi has no framing: a command goes in as one line, and everything
//! printed until the prompt reappears is the response. At startup the
//! prompt is rebound to a sentinel marker that is improbable in real
//! compiler output, which turns the stream into a sequence of
//! marker-delimited blocks.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Sentinel the GHCi prompt is rebound to. Private-use characters keep
/// it out of any plausible compiler output.
pub(crate) const PROMPT_MARKER: &str = "\u{e000}kak-ghci\u{e001}";

/// Continuation prompt for incomplete multi-line input.
const CONT_MARKER: &str = "\u{e000}kak-ghci+\u{e001}";

/// Bound on a single command round trip. `:load` of a large project is
/// slow, so this is generous; it exists so a wedged GHCi surfaces as
/// [`SessionError::PromptTimeout`] instead of hanging the dispatch loop.
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Session configuration issued once after the prompt handshake:
/// no codegen, type errors and holes deferred to warnings, all warnings
/// on except missing signatures, missing-home-modules demoted, and
/// `:set +c` so `:type-at`/`:loc-at`/`:uses` have type info to query.
const INIT_COMMANDS: &[&str] = &[
    ":set -fno-code",
    ":set -fdefer-typed-holes",
    ":set -fdefer-type-errors",
    ":set -Wall",
    ":set -Wno-missing-signatures",
    ":set -Wwarn=missing-home-modules",
    ":set +c",
];

/// The session's failure mode: the child died, stopped answering, or
/// its pipes broke. There is no retry and no auto-restart — the caller
/// logs it, abandons the current command, and keeps serving.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("ghci exited before the prompt returned")]
    Exited,
    #[error("timed out waiting for the ghci prompt")]
    PromptTimeout,
    #[error("ghci i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct ReplSession {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    /// Bytes received but not yet consumed up to a prompt marker.
    buf: Vec<u8>,
    /// Replies still owed by commands that timed out; each is skipped
    /// before the next reply is accepted.
    stale_replies: u32,
}

impl ReplSession {
    /// Spawn GHCi from a whitespace-separated launch command (e.g.
    /// `"ghci"` or `"stack ghci"`) and perform the prompt handshake and
    /// init sequence.
    pub async fn start(launch_cmd: &str) -> Result<Self> {
        let mut words = launch_cmd.split_whitespace();
        let program = words.next().context("empty ghci launch command")?;
        let resolved =
            which::which(program).with_context(|| format!("{program} not found in PATH"))?;

        let mut cmd = Command::new(&resolved);
        cmd.args(words)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // GHC reports diagnostics on stderr; fold them into the stdout
        // pipe in the child so prompt matching sees a single stream.
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {program}"))?;
        let stdin = child.stdin.take().context("no stdin from ghci")?;
        let stdout = child.stdout.take().context("no stdout from ghci")?;

        let mut session = Self {
            child,
            stdin,
            stdout,
            buf: Vec::new(),
            stale_replies: 0,
        };

        // Rebinding the prompt also swallows the startup banner: the
        // first marker can only appear once the rebind has executed.
        session
            .run(&format!(":set prompt \"{PROMPT_MARKER}\""))
            .await
            .context("rebinding ghci prompt")?;
        session
            .run(&format!(":set prompt-cont \"{CONT_MARKER}\""))
            .await
            .context("rebinding ghci continuation prompt")?;
        for init in INIT_COMMANDS {
            session
                .run(init)
                .await
                .with_context(|| format!("initializing ghci session ({init})"))?;
        }

        Ok(session)
    }

    /// Send one command line and return everything GHCi printed before
    /// the prompt marker reappeared, carriage returns stripped.
    ///
    /// A timed-out command still owes a reply; it is skipped when it
    /// eventually arrives so a slow answer is never attributed to the
    /// command that came after it.
    pub async fn run(&mut self, cmd: &str) -> Result<String, SessionError> {
        tracing::debug!(cmd, "ghci send");
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        let reply = match tokio::time::timeout(REPLY_TIMEOUT, self.read_until_marker()).await {
            Ok(read) => read?,
            Err(_) => {
                self.stale_replies += 1;
                return Err(SessionError::PromptTimeout);
            }
        };
        tracing::debug!(bytes = reply.len(), "ghci recv");
        Ok(reply)
    }

    async fn read_until_marker(&mut self) -> Result<String, SessionError> {
        let marker = PROMPT_MARKER.as_bytes();
        loop {
            if let Some(pos) = find_subsequence(&self.buf, marker) {
                let consumed: Vec<u8> = self.buf.drain(..pos + marker.len()).collect();
                if self.stale_replies > 0 {
                    self.stale_replies -= 1;
                    tracing::debug!(bytes = pos, "discarding reply of a timed-out command");
                    continue;
                }
                let text = String::from_utf8_lossy(&consumed[..pos]).replace('\r', "");
                return Ok(text);
            }

            let mut chunk = [0u8; 4096];
            let n = self.stdout.read(&mut chunk).await?;
            if n == 0 {
                return Err(SessionError::Exited);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Ask GHCi to quit, killing it if it doesn't comply in time.
    /// Consumes self.
    pub async fn shutdown(mut self) {
        let _ = self.stdin.write_all(b":quit\n").await;
        let _ = self.stdin.flush().await;

        let waited = tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await;
        if waited.is_err() {
            tracing::debug!("ghci didn't exit in time, killing");
            let _ = self.child.kill().await;
        }
    }
}

/// First index of `needle` in `haystack`, if any.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
