use std::error::Error;

use database::{DatabaseConnectionInfo, PgDatabase};
use dispatch::{database::Database, memory::MemoryDatabase};
use tracing_subscriber::EnvFilter;
use web::{config::WebConfig, start_web_server, WebState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // request tracing
    let filter = EnvFilter::try_from_env("DISPATCH_TRACE")
        .unwrap_or_else(|_| EnvFilter::new("tower_http=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if let Err(why) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Could not install the request tracer: {}", why);
    }

    let config = WebConfig::from_env();

    // database
    match DatabaseConnectionInfo::from_env() {
        Some(database_connection_info) => {
            let database = PgDatabase::connect(database_connection_info).await?;
            serve(config, database).await
        }
        None => {
            log::warn!("No database configured, serving an empty in-memory store.");
            serve(config, MemoryDatabase::new()).await
        }
    }
}

async fn serve<D: Database>(config: WebConfig, database: D) -> Result<(), Box<dyn Error>> {
    let state = WebState::start(config.client_id.clone(), database).await?;
    start_web_server(config, state).await?;
    Ok(())
}
