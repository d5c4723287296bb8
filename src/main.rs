mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{DBClient, LogisticsStore};
use dotenv::dotenv;
use routes::create_router;
use service::{
    admin_service::AdminService, delivery_service::DeliveryService, job_service::JobService,
    mpesa::MpesaGateway, payment_service::PaymentService, pricing_service::PricingEngine,
    storage::HttpObjectStorage, tracking_service::TrackingService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

pub struct AppState {
    pub env: Config,
    pub store: Arc<dyn LogisticsStore>,
    pub job_service: JobService,
    pub tracking_service: TrackingService,
    pub delivery_service: DeliveryService,
    pub payment_service: PaymentService,
    pub admin_service: AdminService,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = Config::init();

    tracing_subscriber::fmt()
        .with_max_level(
            config
                .log_level
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::DEBUG),
        )
        .init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to the database");
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!(error = %err, "Failed to run database migrations");
        std::process::exit(1);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH]);

    let store: Arc<dyn LogisticsStore> = Arc::new(DBClient::new(pool));
    let pricing = Arc::new(PricingEngine::new(config.pricing.clone()));
    let gateway = Arc::new(MpesaGateway::new(
        config.mpesa.clone(),
        config.gateway_timeout_secs,
    ));
    let storage = Arc::new(HttpObjectStorage::new(
        config.storage.clone(),
        config.gateway_timeout_secs,
    ));

    let app_state = AppState {
        env: config.clone(),
        store: store.clone(),
        job_service: JobService::new(store.clone(), pricing),
        tracking_service: TrackingService::new(store.clone()),
        delivery_service: DeliveryService::new(store.clone(), storage),
        payment_service: PaymentService::new(store.clone(), gateway),
        admin_service: AdminService::new(store),
    };

    let app = create_router(Arc::new(app_state)).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(port = config.port, error = %err, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "Server error");
    }
}
