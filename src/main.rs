use anyhow::Context;
use clap::Parser;
use docs_knowledge_server::{
    config::{Config, ObservabilityConfig, StorageBackend, Transport},
    engine::KnowledgeBase,
    ingestion::IngestionService,
    mcp::{build_router, serve_stdio, McpHandler},
    state::create_store,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "docs-knowledge-server")]
#[command(about = "Documentation knowledge base over JSON-RPC", version, long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "DOCS_KB_CONFIG")]
    config: Option<PathBuf>,

    /// Transport to serve, overriding server.transport
    #[arg(short, long, value_enum)]
    transport: Option<Transport>,

    /// Storage backend, overriding storage.backend
    #[arg(long, value_enum)]
    backend: Option<StorageBackend>,

    /// Database path, overriding storage.path
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// HTTP port, overriding server.http_port
    #[arg(short, long)]
    port: Option<u16>,
}

/// Logs go to stderr so the stdio transport owns stdout
fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "docs_knowledge_server={},tower_http=info",
            observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(transport) = cli.transport {
        config.server.transport = transport;
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.path = Some(data_dir);
    }
    if let Some(port) = cli.port {
        config.server.http_port = port;
    }

    init_tracing(&config.observability);

    tracing::info!(
        service = %config.observability.service_name,
        "Starting docs knowledge server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize storage backend
    tracing::info!(backend = ?config.storage.backend, "Storage backend");
    let store = create_store(&config.storage).await?;

    let knowledge_base = Arc::new(KnowledgeBase::new(
        store.clone(),
        &config.storage.collection,
        config.search.clone(),
    ));
    let ingestion = Arc::new(IngestionService::new(
        store.clone(),
        config.storage.collection.clone(),
        &config.ingestion,
    )?);
    let handler = McpHandler::new(
        knowledge_base,
        ingestion,
        config.observability.service_name.clone(),
    );

    match config.server.transport {
        Transport::Stdio => {
            tokio::select! {
                result = serve_stdio(&handler) => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "stdio transport failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
            }
        }

        Transport::Http => {
            let app = build_router(handler);
            let http_addr = config.server.bind_address();
            let listener = tokio::net::TcpListener::bind(&http_addr)
                .await
                .with_context(|| format!("Failed to bind {}", http_addr))?;

            tracing::info!("HTTP JSON-RPC endpoint: http://{}/mcp", http_addr);
            tracing::info!("Health check: http://{}/health", http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Shutdown signal received");
                    }
                })
                .await?;
        }
    }

    tracing::info!("Shutting down gracefully...");
    store.close().await?;
    Ok(())
}
