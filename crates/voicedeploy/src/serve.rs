use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;

use voicedeploy_connect::RemoteLookup;

use crate::form::{self, AppState};
use crate::pipeline::Pipeline;

pub async fn handle_serve(
    pipeline: Pipeline,
    lookup: RemoteLookup,
    port: u16,
    no_open: bool,
) -> Result<()> {
    let state = AppState::new(Arc::new(pipeline), Arc::new(lookup));
    let router = form::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind the form server to {}", addr))?;

    let url = format!("http://localhost:{}", port);
    eprintln!();
    eprintln!("  {} {}", "->".bright_green(), format!("Open {}", url).bold());
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    if !no_open {
        if let Err(e) = open::that(&url) {
            eprintln!("Failed to open browser: {} (open {} manually)", e, url);
        }
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Form server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
