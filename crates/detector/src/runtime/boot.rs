//! Boot — logging init, config load, session start, monitor dispatch.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::analyzer::{ClaudeAnalyzer, SecondaryAnalyzer};
use crate::cli::Target;
use crate::conf::DetectorConfig;
use crate::error::DetectorResult;
use crate::handler::EventHandler;
use crate::monitor::{process, tail};
use crate::render::Renderer;
use crate::runtime::session::Session;

/// Initialise the tracing / logging subsystem.
///
/// Diagnostics go to stderr so they never mix with the echoed stdout of the
/// monitored process.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "detector=info,engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config and build the analyzer for a run.
pub fn boot() -> DetectorResult<(DetectorConfig, Arc<dyn SecondaryAnalyzer>)> {
    let config = DetectorConfig::load()?;
    info!(
        "Engine: app_packages={:?}, app_frame_limit={}, dedup_window={}ms",
        config.engine.app_packages, config.engine.app_frame_limit, config.engine.dedup_window_ms
    );

    let analyzer: Arc<dyn SecondaryAnalyzer> = Arc::new(ClaudeAnalyzer::new(&config.analyzer));
    info!("Secondary analyzer enabled: {}", analyzer.is_enabled());

    Ok((config, analyzer))
}

/// Run one monitoring session to completion and return the exit code.
pub async fn run(target: Target) -> DetectorResult<i32> {
    let (config, analyzer) = boot()?;
    let renderer = Renderer::new();

    renderer.print_banner();
    renderer.print_status(&target, analyzer.is_enabled());

    let handler = EventHandler::new(analyzer, renderer);
    let mut session = Session::start(&config.engine, handler);

    let outcome = match target {
        Target::Command(ref command) => {
            process::run_command(command, session.engine(), shutdown_signal()).await
        }
        Target::Watch(ref path) => {
            tail::tail_file(path, &config.watch, session.engine(), &renderer, shutdown_signal())
                .await
                .map(|()| 0)
        }
    };

    let count = session.finish().await;
    let code = outcome?;

    renderer.print_summary(count);
    if code != 0 {
        renderer.print_exit_code(code);
    }
    Ok(code)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Interrupted, shutting down");
}
