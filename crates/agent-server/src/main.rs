//! nested-agents node
//!
//! Loads the node configuration, connects to downstream providers, and then
//! runs in one or both roles:
//!
//! - **server**: serves the service bridge over HTTP so other agents can
//!   use this one as a tool provider
//! - **client**: interactive sessions on stdin; Ctrl-C cancels the request
//!   in flight

mod handlers;
mod state;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::{get, post}};
use tokio::io::{AsyncBufReadExt, BufReader};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentComposer, AgentError, LlmProvider, NodeConfig, tool};
use agent_runtime::{HttpProviderConnection, OllamaProvider};

use crate::handlers::{call_tool, chat_handler, health_check, list_tools};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = NodeConfig::load().context("loading node configuration")?;
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("Config: {}", problem);
        }
        anyhow::bail!("invalid configuration ({} problems)", problems.len());
    }

    // Initialize reasoning model
    let model = Arc::new(OllamaProvider::from_env().require_model(config.model.model.as_str()));
    match model.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Ollama at {} ({})", model.config().endpoint(), config.model.model),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama or model '{}' not available - sessions will fail", config.model.model);
            tracing::warn!("  Make sure Ollama is running: ollama serve && ollama pull {}", config.model.model);
        }
    }

    let composer = Arc::new(compose(&config, model).await?);

    let server = if config.role.serves() {
        let app = router(AppState::new(composer.clone()));
        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("binding {}", config.bind_addr))?;

        tracing::info!("══════════════════════════════════════════════════");
        tracing::info!("🚀 {} serving on http://{}", config.name, config.bind_addr);
        tracing::info!("══════════════════════════════════════════════════");
        tracing::info!("Endpoints:");
        tracing::info!("  GET  /health      - Health check");
        tracing::info!("  GET  /tools       - Discover offered tools");
        tracing::info!("  POST /tools/call  - Invoke a tool or capability");
        tracing::info!("  POST /api/chat    - Ask this agent directly");

        let shutdown = composer.shutdown_token();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }))
    } else {
        None
    };

    if config.role.interactive() {
        interactive(&composer).await?;
    } else {
        tokio::signal::ctrl_c().await?;
    }

    composer.shutdown().await;
    if let Some(server) = server {
        server.await??;
    }

    Ok(())
}

/// Wire the composer from configuration; providers register in configured
/// order
async fn compose(config: &NodeConfig, model: Arc<dyn LlmProvider>) -> anyhow::Result<AgentComposer> {
    let mut builder = AgentComposer::builder()
        .name(config.name.as_str())
        .model(model)
        .engine_config(config.engine_config())
        .capabilities(config.capabilities.iter().cloned())
        .max_depth(config.max_depth);

    for name in &config.local_tools {
        match tool::builtin(name) {
            Some(tool) => builder = builder.local_tool(tool),
            None => tracing::warn!("Unknown local tool '{}'", name),
        }
    }

    for target in &config.providers {
        let connection = HttpProviderConnection::from_target(target)
            .with_context(|| format!("provider '{}'", target.name))?;
        builder = builder.connection(Arc::new(connection));
    }

    let composer = builder.build().await?;

    let catalogs = composer.catalogs();
    tracing::info!("Offering {} tools:", catalogs.descriptors().len());
    for descriptor in catalogs.descriptors() {
        tracing::info!("  • {} ({})", descriptor.name, descriptor.origin);
    }

    Ok(composer)
}

pub(crate) fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Read requests from stdin until EOF, `exit`, or Ctrl-C at the prompt
async fn interactive(composer: &AgentComposer) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let request = line.trim();
        match request {
            "" => continue,
            "exit" | "quit" => break,
            "tools" => {
                for descriptor in composer.catalogs().descriptors() {
                    println!("  {} [{}] - {}", descriptor.name, descriptor.origin, descriptor.description);
                }
                continue;
            }
            _ => {}
        }

        let cancel = composer.shutdown_token().child_token();
        let result = tokio::select! {
            result = composer.ask_with_cancel(request, &cancel) => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                Err(AgentError::Cancelled)
            }
        };

        match result {
            Ok(answer) => println!("{}", answer),
            Err(e) => {
                tracing::error!("Session failed: {}", e);
                println!("{}", e.user_message());
            }
        }
    }

    Ok(())
}
