//! Team and player leaderboard endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{parse_id_list, parse_role_list, parse_window, ApiError};
use crate::dashboard::{
    CommonFilters, LeaderboardQuery, Paginated, PlayerLeaderboardEntry, TeamLeaderboardEntry,
};
use crate::query::filters::LeaderboardSort;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub start_date: String,
    pub end_date: String,
    pub leagues: Option<String>,
    pub roles: Option<String>,
    pub min_games: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub include_unranked: Option<bool>,
}

fn leaderboard_query(params: &LeaderboardParams) -> Result<LeaderboardQuery, ApiError> {
    let window = parse_window(&params.start_date, &params.end_date)?;
    let leagues = params
        .leagues
        .as_deref()
        .map(|raw| parse_id_list(raw, "leagues"))
        .transpose()?
        .unwrap_or_default();
    let roles = params
        .roles
        .as_deref()
        .map(parse_role_list)
        .transpose()?
        .unwrap_or_default();
    if let Some(min_games) = params.min_games {
        if min_games < 0 {
            return Err(ApiError::BadRequest(
                "minGames must not be negative".to_string(),
            ));
        }
    }
    let sort = match params.sort.as_deref() {
        None => LeaderboardSort::Lp,
        Some(raw) => LeaderboardSort::parse(raw)
            .map_err(|_| ApiError::BadRequest(format!("unknown sort: {raw}")))?,
    };

    Ok(LeaderboardQuery {
        window,
        filters: CommonFilters {
            leagues,
            roles,
            min_games: params.min_games,
        },
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        sort,
        page: params.page.unwrap_or(1).max(1),
        per_page: params
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE),
        include_unranked: params.include_unranked.unwrap_or(false),
    })
}

pub async fn teams(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Paginated<TeamLeaderboardEntry>>, ApiError> {
    let query = leaderboard_query(&params)?;
    Ok(Json(state.service.team_leaderboard(&query).await?))
}

pub async fn players(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Paginated<PlayerLeaderboardEntry>>, ApiError> {
    let query = leaderboard_query(&params)?;
    Ok(Json(state.service.player_leaderboard(&query).await?))
}
