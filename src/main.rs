use std::sync::Arc;

use tower_http::cors::CorsLayer;

use matchday_backend::api::{self, AppState};
use matchday_backend::cards::CardPool;
use matchday_backend::config::Config;
use matchday_backend::db::Database;
use matchday_backend::lobby::MatchService;
use matchday_backend::metrics;
use matchday_backend::queue::MatchQueue;
use matchday_backend::rating::RatingService;
use matchday_backend::squad::SquadAssembler;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let db = Database::connect(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    let catalog = CardPool::load(&config.cards_path).expect("Failed to load card catalog");
    tracing::info!(
        cards = catalog.len(),
        path = %config.cards_path.display(),
        "Card catalog loaded"
    );

    let matches = MatchService::new(
        SquadAssembler::new(db.clone(), Arc::new(catalog)),
        RatingService::new(db),
        MatchQueue::with_timeout(config.queue_timeout),
    );

    let app = api::router(AppState {
        matches,
        reveal_interval: config.reveal_interval,
    })
    .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Matchday backend listening on {addr}");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
