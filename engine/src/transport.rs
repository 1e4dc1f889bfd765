//! FIFO command transport.
//!
//! The editor side writes one record per line to a named pipe; this
//! side reads lines, dispatches them, and pipes the resulting
//! directives back. A FIFO reaches EOF whenever the last writer
//! closes, so the read loop reopens it after every drained batch.

use std::path::Path;

use anyhow::{Context, Result};
use kak_ghci_repl::GhciOps;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::decode_record;
use crate::control;
use crate::router::Router;

/// Create the command FIFO, readable and writable by the owner only.
#[cfg(unix)]
pub fn make_fifo(path: &Path) -> Result<()> {
    let c_path = std::ffi::CString::new(path.as_os_str().as_encoded_bytes())
        .context("fifo path contains a NUL byte")?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration
    // of the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("mkfifo {}", path.display()));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn make_fifo(path: &Path) -> Result<()> {
    anyhow::bail!("named pipes are only supported on unix (wanted {})", path.display());
}

/// Decode and dispatch one FIFO line, returning the directives to send
/// along with the record's session/client routing.
pub async fn process_line<G: GhciOps>(
    router: &mut Router,
    ghci: &mut G,
    line: &str,
) -> Result<(String, Option<String>, Vec<String>)> {
    let record = decode_record(line)?;
    let directives = router.dispatch(ghci, &record).await?;
    Ok((record.session, record.client, directives))
}

/// Serve commands from the FIFO until the task is cancelled. Bad
/// records, REPL failures, and editor-side failures are all logged
/// and skipped; only an unreadable FIFO ends the loop.
pub async fn run<G: GhciOps>(fifo: &Path, ghci: &mut G, router: &mut Router) -> Result<()> {
    loop {
        // open blocks until the editor side connects a writer
        let file = tokio::fs::File::open(fifo)
            .await
            .with_context(|| format!("opening fifo {}", fifo.display()))?;
        let mut lines = BufReader::new(file).lines();

        while let Some(line) = lines.next_line().await.context("reading fifo")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tracing::info!(%line, "command received");

            match process_line(router, ghci, line).await {
                Ok((session, client, directives)) => {
                    for directive in directives {
                        if let Err(err) = control::pipe(&session, &directive, client.as_deref()).await
                        {
                            tracing::warn!(%err, "failed to pipe directives to editor");
                        }
                    }
                }
                Err(err) => {
                    // includes a dead REPL: the command is abandoned,
                    // not retried, and there is no auto-restart
                    tracing::warn!(%err, "dropping command");
                }
            }
        }
        // EOF: every writer closed; reopen and wait for the next one
        tracing::debug!("fifo drained, reopening");
    }
}
