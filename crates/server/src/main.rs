use anyhow::{Context, Result};
use clap::Parser;
use embeddings::create_embedding_provider;
use log::{error, info};
use server::cli::{Cli, Command};
use server::inference::index_settings;
use server::{create_app, repl, SqlGenerator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vector_store::IndexBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    match cli.command() {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            info!("Starting sqlsmith server");

            let generator = Arc::new(
                SqlGenerator::new(&config)
                    .await
                    .context("Failed to initialize SQL generator")?,
            );
            info!("SQL generator initialized: {:?}", generator);

            let app = create_app(generator);
            let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
                .await
                .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

            info!("Server running on http://{}", config.server.bind_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server stopped");
        }
        Command::Repl => {
            let generator = SqlGenerator::new(&config)
                .await
                .context("Failed to initialize SQL generator")?;

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            repl::run(&generator, stdin, tokio::io::stdout()).await?;
        }
        Command::BuildIndex => {
            let embeddings_client = create_embedding_provider(&config.embedding)
                .await
                .context("Failed to create embedding provider")?;
            let settings = index_settings(&config);

            let store = IndexBuilder::new(&settings, embeddings_client.as_ref())
                .load_or_build()
                .await
                .map_err(|e| {
                    error!("Failed to build vector index: {:#}", e);
                    e
                })?;
            let count = store.get_document_count().await?;
            store.close().await;

            info!(
                "Vector index ready at {} with {} chunks",
                settings.persist_dir.display(),
                count
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
