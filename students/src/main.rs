//! `studentctl`: serves student requests read as JSON lines from stdin.
//!
//! Each input line is one request; each output line is its response.

use std::sync::Arc;

use anyhow::Result;
use itemlayer::{backend::DynStoreBackend, error::ItemStoreResult, memory::InMemoryStore, store::ItemStore};
use students::{Executor, Request, Resolver, Response, config::ServiceConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    setup_logging();

    let config = ServiceConfig::from_env();
    let store = Arc::new(ItemStore::new(connect(&config).await?));
    store.open().await?;

    let executor = Executor::new(Resolver::new(Arc::clone(&store)));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => executor.execute(request).await,
            Err(err) => Response::request_error(format!("Malformed request: {err}")),
        };

        let mut output = serde_json::to_string(&response)?;
        output.push('\n');
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    drop(executor);
    match Arc::try_unwrap(store) {
        Ok(store) => store.shutdown().await?,
        Err(_) => warn!("store still shared at exit, skipping shutdown"),
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only responses.
fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn connect(config: &ServiceConfig) -> ItemStoreResult<Box<dyn DynStoreBackend>> {
    #[cfg(feature = "mongodb")]
    if let Some(uri) = &config.store_uri {
        use itemlayer::{backend::StoreBackendBuilder, mongodb::MongoDbStore};

        info!(database = %config.database, "using mongodb store");
        let store = MongoDbStore::builder(uri, &config.database)
            .lookup_field(students::model::COLLECTION, "sid")
            .build()
            .await?;
        return Ok(Box::new(store));
    }

    #[cfg(not(feature = "mongodb"))]
    if config.store_uri.is_some() {
        warn!("STUDENTS_STORE_URI is set but mongodb support is not compiled in");
    }

    info!("using in-memory store");
    Ok(Box::new(InMemoryStore::new()))
}
