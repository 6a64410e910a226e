//! Dashboard read-path assemblers.
//!
//! Every public method follows the same pipeline: build a deterministic
//! cache key from the request parameters, consult the cache, and on a miss
//! run the SQL under the query guard. All response shapes serialize in
//! camelCase for the HTTP layer.

pub mod history;
pub mod leaderboard;
pub mod leagues;
pub mod movers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::cache::{build_cache_key, TtlCache};
use crate::config::AppConfig;
use crate::models::Role;
use crate::query::{QueryError, QueryGuard};

pub use history::{HistoryPoint, HistoryQuery, HistorySeries};
pub use leaderboard::{LeaderboardQuery, PlayerLeaderboardEntry, TeamLeaderboardEntry};
pub use movers::{
    MoversQuery, PlayerGrinderEntry, PlayerLpMoverEntry, PlayerMoversOverview, TeamGrinderEntry,
    TeamLpMoverEntry, TeamMoversOverview, ViewMode,
};

// ── Shared request/response shapes ──────────────────────────────────────────

/// Pagination block attached to every leaderboard response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub last_page: i64,
}

impl PageMeta {
    pub fn new(total: i64, per_page: i64, current_page: i64) -> Self {
        let last_page = if total <= 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            total,
            per_page,
            current_page,
            last_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Filters shared by the leaderboard and top-mover assemblers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommonFilters {
    pub leagues: Vec<i64>,
    pub roles: Vec<Role>,
    pub min_games: Option<i64>,
}

// ── Service ─────────────────────────────────────────────────────────────────

pub struct DashboardService {
    pool: PgPool,
    cache: Arc<TtlCache>,
    guard: QueryGuard,
    cache_ttl: Duration,
}

impl DashboardService {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            pool,
            cache: Arc::new(TtlCache::new()),
            guard: QueryGuard::new(&config.query),
            cache_ttl: Duration::from_secs(config.cache.ttl_seconds),
        }
    }

    /// Cache-aside wrapper shared by every assembler.
    async fn cached<T, P, F, Fut>(&self, prefix: &str, params: &P, producer: F) -> Result<T, QueryError>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let key = build_cache_key(prefix, params);
        self.cache.get_or_set(&key, self.cache_ttl, producer).await
    }
}
