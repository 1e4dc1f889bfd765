//! kak-ghci: a GHCi bridge for the Kakoune editor.
//!
//! Invoked from a kakrc as `kak-ghci SESSION DIR GHCI_CMD`. It starts
//! a prompt-managed GHCi, creates a command FIFO in a private runtime
//! directory, registers the `ghci-*` commands in the session, and then
//! serves editor commands until the editor goes away or the process is
//! signalled.

use std::path::Path;

use anyhow::{Context, Result};
use kak_ghci_engine::{Router, control, kak, transport};
use kak_ghci_repl::ReplSession;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log to a file in the runtime directory: stdout is unusable (the
/// editor consumes it at registration time) and stderr may be a
/// detached terminal. `RUST_LOG` still controls the filter.
fn init_tracing(runtime_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match std::fs::File::create(runtime_dir.join("kak-ghci.log")) {
        Ok(file) => tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
            .with(filter)
            .init(),
        Err(_) => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r.context("waiting for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let [_, session, dir, ghci_cmd] = args.as_slice() else {
        // the editor sources our stdout, so report there
        println!("echo -debug 'kak-ghci: need SESSION DIR GHCI_CMD'");
        anyhow::bail!("expected SESSION DIR GHCI_CMD");
    };

    std::env::set_current_dir(dir).with_context(|| format!("changing directory to {dir}"))?;

    // fifo and log live here; dropped (and removed) on exit
    let runtime = tempfile::Builder::new()
        .prefix("kak-ghci")
        .tempdir()
        .context("creating runtime directory")?;
    init_tracing(runtime.path());
    tracing::info!(session, dir, ghci_cmd, "starting");

    let mut ghci = ReplSession::start(ghci_cmd).await.context("starting ghci")?;

    let fifo = runtime.path().join("commands");
    transport::make_fifo(&fifo)?;

    control::pipe(session, &kak::register_commands_script(&fifo), None)
        .await
        .context("registering editor commands")?;
    control::pipe(session, kak::bindings_script(), None)
        .await
        .context("registering key bindings")?;

    let mut router = Router::new();
    let served = tokio::select! {
        r = transport::run(&fifo, &mut ghci, &mut router) => r,
        r = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            r
        }
    };

    ghci.shutdown().await;
    served
}
