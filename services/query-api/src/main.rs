// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use clap::Parser;
use dotenvy::dotenv;
use query_api::models::AppState;
use query_api::routes;
use query_bridge_bus_amqp::{BusConfig, LapinBusClient};
use query_bridge_engine::Coordinator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Startup configuration for the query adapter (spec §6 "Configuration
/// (startup)"), readable from the CLI or the matching environment variable.
#[derive(Debug, Parser)]
#[command(name = "query-api", about = "Query-adapter service for a simple-json dashboard client")]
struct Cli {
    /// AMQP connection URL for the metric bus.
    #[arg(long, env = "QUERY_BRIDGE_MANAGEMENT_URL", default_value = "amqp://localhost/")]
    management_url: String,

    /// Bearer token authorizing calls against the management exchange.
    #[arg(long, env = "QUERY_BRIDGE_BUS_TOKEN", default_value = "metricq-grafana")]
    bus_token: String,

    /// Exchange the bus client publishes RPC requests to.
    #[arg(long, env = "QUERY_BRIDGE_MANAGEMENT_EXCHANGE", default_value = "metricq.management")]
    management_exchange: String,

    /// Address to bind the HTTP listener to.
    #[arg(long, env = "QUERY_BRIDGE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind the HTTP listener to.
    #[arg(long, env = "QUERY_BRIDGE_PORT", default_value_t = 4000)]
    port: u16,

    /// Allowed CORS origin.
    #[arg(long, env = "QUERY_BRIDGE_CORS_ORIGIN", default_value = "*")]
    cors_origin: String,

    /// Enable verbose debug logging.
    #[arg(long, env = "QUERY_BRIDGE_DEBUG", default_value_t = false)]
    debug: bool,

    /// Use a plain, non-ANSI log layer suitable for systemd-journal capture.
    #[arg(long, env = "QUERY_BRIDGE_JOURNAL_LOGGING", default_value_t = false)]
    journal_logging: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.journal_logging);

    info!(exchange = %cli.management_exchange, "starting query adapter");

    let bus_config = BusConfig {
        url: cli.management_url.clone(),
        token: cli.bus_token.clone(),
        management_exchange: cli.management_exchange.clone(),
    };
    let bus = LapinBusClient::connect(&bus_config).await?;
    let coordinator = Arc::new(Coordinator::new(Arc::new(bus)));

    let state = Arc::new(AppState { coordinator });
    let app = build_router(state, &cli.cors_origin);

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!(%addr, "query adapter listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    let cors = if cors_origin == "*" {
        CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods([Method::GET, Method::POST])
    } else {
        let origin: HeaderValue = cors_origin.parse().unwrap_or(HeaderValue::from_static("*"));
        CorsLayer::new().allow_origin(origin).allow_methods([Method::GET, Method::POST])
    };

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::query::routes())
        .merge(routes::discover::routes())
        .merge(routes::legacy::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn init_tracing(debug: bool, journal_logging: bool) {
    let default_filter = if debug { "query_api=debug,query_bridge_engine=debug,tower_http=debug" } else { "query_api=info,query_bridge_engine=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if journal_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(false).without_time())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
    }
}
