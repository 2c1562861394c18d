mod auth;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod ws;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use std::panic;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use routes::api::create_api_routes;
use ws::handler::websocket_handler;
use ws::registry::SharedRegistry;
use ws::rooms::RoomResolver;

/// State injected into the websocket router and the API handlers: the one
/// session registry of this process and the room resolver in front of
/// storage.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub rooms: Arc<RoomResolver>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "sketchrelay=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    // Load configuration
    let cfg = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::set_config(cfg.clone());

    info!("Starting {} ({})...", cfg.service_name, cfg.environment);

    if cfg.auth_jwt_secret.is_none() {
        warn!("No auth_jwt_secret configured - all websocket connections will be rejected");
    }

    // Initialize database connection if URL is provided
    if let Some(db_url) = &cfg.db_url {
        match db::dbdraw::init_db(db_url).await {
            Ok(_) => info!("Database initialized successfully"),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Room resolution and event persistence will not be available");
            }
        }
    } else {
        warn!("No database URL configured - room resolution and event persistence will not be available");
    }

    // One session registry per process, injected into router and broadcaster
    let state = AppState {
        registry: SharedRegistry::new(),
        rooms: Arc::new(RoomResolver::new()),
    };

    let cors = match &cfg.cors_origins {
        Some(origins) => {
            let list: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(list))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None if cfg.is_development() => CorsLayer::permissive(),
        None => CorsLayer::new(),
    };

    // Create API routes
    let api_routes = create_api_routes(state.clone());

    // Combine all routes
    let app_routes = Router::new()
        // Realtime endpoint
        .route("/ws", get(websocket_handler))
        .with_state(state)
        // Mount API routes
        .nest("/api", api_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(cfg.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", cfg.server_address()));

    info!("🚀 Server running on http://{}", cfg.server_address());
    info!("📡 WebSocket available at ws://{}/ws", cfg.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", cfg.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
