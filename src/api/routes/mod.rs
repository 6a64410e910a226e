pub mod history;
pub mod leaderboards;
pub mod leagues;
pub mod movers;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::state::AppState;
use crate::config::ServerConfig;

pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(&server.cors_origin))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/leagues", get(leagues::list))
        .route("/api/leaderboard/teams", get(leaderboards::teams))
        .route("/api/leaderboard/players", get(leaderboards::players))
        .route("/api/movers", get(movers::overview))
        .route("/api/movers/grinders", get(movers::grinders))
        .route("/api/movers/gainers", get(movers::gainers))
        .route("/api/movers/losers", get(movers::losers))
        .route("/api/history/teams", get(history::teams))
        .route("/api/history/players", get(history::players))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allow_origin(origin: &str) -> AllowOrigin {
    if origin == "*" {
        return AllowOrigin::any();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            warn!(origin, "invalid CORS origin, allowing none");
            AllowOrigin::list(std::iter::empty::<HeaderValue>())
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
