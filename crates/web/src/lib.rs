pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::{routing::on, Router};
use config::WebConfig;
use dispatch::{
    client::Client, database::Database, feed::TripFeed, monitor::ViolationMonitor,
    RequestResult,
};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;
pub mod config;

/// Shared by all handlers. The monitor is shared too, so every dispatcher
/// sees the same open review.
pub struct WebState<D: Database> {
    pub client: Client<D>,
    pub feed: TripFeed,
    pub monitor: Arc<Mutex<ViolationMonitor>>,
}

impl<D: Database> Clone for WebState<D> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            feed: self.feed.clone(),
            monitor: self.monitor.clone(),
        }
    }
}

impl<D: Database> WebState<D> {
    /// Starts the trip feed on `database` and wires a client to it.
    pub async fn start<S: Into<String>>(client_id: S, database: D) -> RequestResult<Self> {
        let feed = TripFeed::start(database.clone()).await?;
        Ok(Self {
            client: Client::new(client_id, database).with_feed(feed.clone()),
            feed,
            monitor: Arc::new(Mutex::new(ViolationMonitor::new())),
        })
    }
}

/// Everything outside `/api` is answered with the JSON not-found response.
pub fn app<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(common::METHOD_FILTER_ALL, common::route_not_found))
}

pub async fn start_web_server<D: Database>(
    config: WebConfig,
    state: WebState<D>,
) -> std::io::Result<()> {
    let routes = app(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.bind_address).await?;
    log::info!("Listening on {}", config.bind_address);
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
