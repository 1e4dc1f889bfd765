//! Editor control channel.
//!
//! Directives reach a running Kakoune session through `kak -p`, which
//! reads a command block on stdin. Client-targeted messages go through
//! a payload file so arbitrary content survives the extra quoting
//! layer that `eval -client` adds.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Send one directive block to a Kakoune session, optionally scoped to
/// a client. Blank messages are dropped.
pub async fn pipe(session: &str, msg: &str, client: Option<&str>) -> Result<()> {
    if msg.trim().is_empty() {
        return Ok(());
    }

    let payload = match client {
        Some(client) => {
            let file = tempfile::NamedTempFile::new().context("creating directive payload")?;
            tokio::fs::write(file.path(), msg)
                .await
                .context("writing directive payload")?;
            let path = file
                .into_temp_path()
                .keep()
                .context("persisting directive payload")?;
            // the shell block reads and deletes the payload inside the
            // client's context
            format!(
                "eval -client {client} \"%sh`cat {path}; rm {path}`\"",
                path = path.display()
            )
        }
        None => msg.to_string(),
    };

    tracing::debug!(session, ?client, bytes = payload.len(), "piping directives");

    let mut child = Command::new("kak")
        .arg("-p")
        .arg(session)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawning kak -p")?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(payload.as_bytes())
            .await
            .context("writing to kak -p")?;
    }
    drop(child.stdin.take());

    let status = child.wait().await.context("waiting for kak -p")?;
    if !status.success() {
        bail!("kak -p {session} exited with {status}");
    }
    Ok(())
}
