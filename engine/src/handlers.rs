//! Command handlers for CLI operations
//!
//! - serve: run the WebSocket server until Ctrl-C
//! - ask: run one turn headless, printing outbound messages as JSON lines
//! - config show / config path

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::agent::{Orchestrator, OrchestratorSettings, TurnOutcome};
use crate::cli::ConfigAction;
use crate::config::Config;
use crate::connections::ConnectionManager;
use crate::geocoding::ArcGisGeocoder;
use crate::llm::openai::OpenAIProvider;
use crate::map_state::MapStateStore;
use crate::server::{self, AppState};
use crate::tools::{ToolExecutor, ToolRegistry};

/// Wire the production collaborators together from configuration
pub fn build_orchestrator(config: &Config) -> Arc<Orchestrator> {
    let provider = OpenAIProvider::new(config.llm.clone());
    let deadline = provider.deadline();
    let geocoder = ArcGisGeocoder::new(config.geocoding.clone());

    let store = Arc::new(MapStateStore::new(config.map.initial_state()));
    let executor = ToolExecutor::new(store, Arc::new(geocoder), config.map, &config.geocoding);

    Arc::new(Orchestrator::new(
        Arc::new(provider),
        Arc::new(ToolRegistry::with_defaults()),
        Arc::new(executor),
        Arc::new(ConnectionManager::new(config.server.client_queue_capacity)),
        OrchestratorSettings::from_config(config, deadline),
    ))
}

/// Run the server until Ctrl-C
pub async fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    if config.llm.api_key().is_none() {
        tracing::debug!(
            "No API key in ${}; sending requests without Authorization",
            config.llm.api_key_env
        );
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let state = AppState::new(build_orchestrator(config));
    server::serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down gracefully");
    })
    .await
    .context("Server error")?;

    Ok(())
}

/// Run a single turn, printing every message clients would receive
pub async fn handle_ask(message: String, config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let outcome = run_turn_printing(&orchestrator, &message, |line| println!("{}", line)).await?;

    match outcome {
        TurnOutcome::Answered { .. } => Ok(()),
        TurnOutcome::Failed { reason, .. } => bail!("Turn failed: {}", reason),
        TurnOutcome::Aborted { rounds } => bail!("Turn aborted after {} rounds", rounds),
    }
}

/// Run one turn with a local listener attached, feeding each message as JSON to `emit`.
///
/// The listener is drained while the turn runs, so a long turn never
/// overflows its queue.
pub async fn run_turn_printing<F>(
    orchestrator: &Orchestrator,
    message: &str,
    mut emit: F,
) -> Result<TurnOutcome>
where
    F: FnMut(&str),
{
    let connections = orchestrator.connections();
    let (id, mut outbound) = connections.register();

    let turn = async {
        let outcome = orchestrator.run_turn(message).await;
        // Dropping the sender ends the stream once the queue is drained
        connections.remove(id);
        outcome
    };

    let print = async {
        while let Some(msg) = outbound.recv().await {
            let line = msg.to_json().context("Failed to encode message")?;
            emit(&line);
        }
        Ok::<_, anyhow::Error>(())
    };

    let (outcome, printed) = tokio::join!(turn, print);
    printed?;
    Ok(outcome)
}

/// Show configuration or its location
pub fn handle_config(action: ConfigAction, config: &Config, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            println!("# {}", path.display());
            println!("{}", rendered);
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
