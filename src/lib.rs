// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod watch;

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{bootstrap, load_and_validate, resolve_source, LoadedConfig};
use crate::engine::{BuildPipeline, LoopEvent, RenderSession, ServeLoop, ServeOptions};
use crate::pipeline::PipelineRunner;
use crate::watch::NotifyWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - bootstrap (exclusive with everything else)
/// - config discovery / loading and command-line overrides
/// - a single render, or the watch–rebuild–serve loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if let Some(template) = args.bootstrap_template().map_err(anyhow::Error::msg)? {
        if args.has_pipeline_options() {
            bail!("bootstrap options cannot be combined with other options");
        }
        let path = bootstrap(&cwd, template)?;
        println!("created {}", path.display());
        return Ok(());
    }

    if args.open && !args.watch_and_serve {
        bail!("--open requires --watch-and-serve");
    }

    let overrides = args.overrides();

    // Loader overrides on the command line replace the implicit config file.
    let discover = !overrides.touches_loader();
    let source = resolve_source(args.config.as_deref(), discover, &cwd)?;
    debug!(?source, "configuration source resolved");

    let loaded = load_and_validate(&source)?;
    let mut session = RenderSession::new(loaded, &overrides, PipelineRunner::default())?;

    if args.dry_run {
        print_dry_run(session.config())?;
        return Ok(());
    }

    if !args.watch_and_serve {
        let watch_set = session.render()?;
        info!(inputs = watch_set.len(), "documentation rendered");
        return Ok(());
    }

    let options = ServeOptions {
        open_browser: args.open,
        ..ServeOptions::default()
    };
    let serve_loop = ServeLoop::new(session, NotifyWatcher, options)?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = serve_loop.sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(LoopEvent::ShutdownRequested).await;
        });
    }

    serve_loop.run().await?;
    Ok(())
}

/// Print the effective configuration (after overrides) as TOML.
fn print_dry_run(config: &LoadedConfig) -> Result<()> {
    println!("# docpipe dry-run");
    if let Some(origin) = &config.origin {
        println!("# config: {}", origin.display());
    }
    println!("{}", toml::to_string(&config.pipeline)?);
    debug!("dry-run complete (nothing rendered)");
    Ok(())
}
