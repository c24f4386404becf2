//! repolens CLI and REST API entry point.
//!
//! Parses CLI arguments, resolves configuration and secrets, builds the
//! orchestrator, then dispatches to the command handler or starts the
//! REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use repolens_observe::tracing_setup::filter_for_verbosity;
use repolens_observe::{TracingOptions, init_tracing, shutdown_tracing};
use state::{AppState, Bootstrap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        json: cli.log_json,
        otel: cli.otel,
        default_filter: filter_for_verbosity(cli.verbose, cli.quiet).to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "repolens", &mut std::io::stdout());
        return Ok(());
    }

    let mut bootstrap = Bootstrap::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Doctor => cli::doctor::doctor(bootstrap, cli.json).await?,

        Commands::Ask { query, session } => {
            let state = AppState::init(bootstrap).await?;
            cli::ask::ask(&state, &query, session, cli.json).await?;
        }

        Commands::Chat { session } => {
            let state = AppState::init(bootstrap).await?;
            cli::chat::run_chat(&state, session).await?;
        }

        Commands::Serve { port, host } => {
            if let Some(port) = port {
                bootstrap.config.server.port = port;
            }
            if let Some(host) = host {
                bootstrap.config.server.host = host;
            }
            if bootstrap.secrets.api_bearer_token.is_none() {
                tracing::warn!("API_BEARER_TOKEN is not set; /api/agent will reject every request");
            }

            let state = AppState::init(bootstrap).await?;
            let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} repolens API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(%addr, "server started");

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
