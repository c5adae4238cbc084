//! MedCast Campaign Dispatch Server
//!
//! Production server for the campaign REST API:
//! - `POST /api/campaigns` submit a template campaign
//! - `GET /api/campaigns/{id}` campaign detail with the delivery ledger
//! - `GET /api/campaigns/{id}/stats` aggregate delivery counters
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MEDCAST_CONFIG` | - | Path to config.toml |
//! | `MEDCAST_HTTP_PORT` | `8080` | HTTP API port |
//! | `MEDCAST_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `MEDCAST_MONGODB_DATABASE` | `medcast` | MongoDB database name |
//! | `MEDCAST_WHATSAPP_BASE_URL` | Graph API v19.0 | WhatsApp Cloud API base URL |
//! | `MEDCAST_WHATSAPP_PHONE_NUMBER_ID` | - | Sending phone number id |
//! | `MEDCAST_WHATSAPP_ACCESS_TOKEN` | - | Bearer token |
//! | `MEDCAST_DISPATCH_SENDS_PER_MINUTE` | `600` | Send pacing quota (`none` disables) |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use medcast_config::ConfigLoader;
use medcast_engine::{CampaignAggregator, DispatchEngine, EngineConfig, Pacer};
use medcast_platform::adapters::{
    MongoCampaignStore, MongoDeliveryLedger, MongoRecipientResolver, MongoTemplateStore,
};
use medcast_platform::campaign::api::{router as campaigns_router, CampaignApiState};
use medcast_platform::provider::whatsapp::{WhatsAppConfig, WhatsAppSender};
use medcast_platform::{
    CampaignRepository, DeliveryRepository, MedicalRepRepository, RecipientListRepository,
    TemplateRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    medcast_common::logging::init_logging("medcast-server");

    info!("Starting MedCast Campaign Dispatch Server");

    let config = ConfigLoader::new().load()?;

    // Connect to MongoDB
    info!(
        "Connecting to MongoDB: {}/{}",
        config.mongodb.uri, config.mongodb.database
    );
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    // Initialize repositories
    let campaign_repo = Arc::new(CampaignRepository::new(&db));
    let delivery_repo = Arc::new(DeliveryRepository::new(&db));
    let template_repo = Arc::new(TemplateRepository::new(&db));
    let list_repo = Arc::new(RecipientListRepository::new(&db));
    let rep_repo = Arc::new(MedicalRepRepository::new(&db));
    delivery_repo.ensure_indexes().await?;
    info!("Repositories initialized");

    // WhatsApp sender
    let sender = Arc::new(WhatsAppSender::new(WhatsAppConfig {
        api_base_url: config.whatsapp.api_base_url.clone(),
        phone_number_id: config.whatsapp.phone_number_id.clone(),
        access_token: config.whatsapp.access_token.clone(),
        connect_timeout: Duration::from_secs(config.whatsapp.connect_timeout_seconds),
        request_timeout: Duration::from_secs(config.whatsapp.request_timeout_seconds),
    })?);

    // Engine wiring
    let ledger = Arc::new(MongoDeliveryLedger::new(delivery_repo.clone()));
    let engine = Arc::new(DispatchEngine::new(
        Arc::new(MongoTemplateStore::new(template_repo)),
        Arc::new(MongoRecipientResolver::new(list_repo, rep_repo)),
        sender,
        ledger.clone(),
        Arc::new(MongoCampaignStore::new(campaign_repo.clone())),
        Pacer::per_minute(config.dispatch.sends_per_minute),
        EngineConfig {
            send_timeout: Duration::from_secs(config.dispatch.send_timeout_seconds),
            ledger_write_retries: config.dispatch.ledger_write_retries,
            default_locale: config.whatsapp.default_locale.clone(),
        },
    ));
    let aggregator = Arc::new(CampaignAggregator::new(ledger));
    info!("Dispatch engine initialized");

    let api_state = CampaignApiState {
        engine,
        aggregator,
        campaigns: campaign_repo,
        deliveries: delivery_repo,
    };

    let app = Router::new()
        .merge(campaigns_router(api_state))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("MedCast Campaign Dispatch Server shutdown complete");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<axum::http::HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
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
