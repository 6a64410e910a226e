//! Top-mover endpoints: grinders, LP gainers, LP losers, and the combined
//! overview that fetches all three concurrently.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{parse_id_list, parse_role_list, parse_window, ApiError};
use crate::dashboard::{CommonFilters, MoversQuery, ViewMode};
use crate::query::filters::SortDirection;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoversParams {
    pub start_date: String,
    pub end_date: String,
    pub leagues: Option<String>,
    pub roles: Option<String>,
    pub min_games: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub view_mode: Option<String>,
}

fn movers_query(params: &MoversParams) -> Result<MoversQuery, ApiError> {
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
        None => SortDirection::Desc,
        Some(raw) => SortDirection::parse(raw)
            .map_err(|_| ApiError::BadRequest(format!("sort must be asc or desc, got: {raw}")))?,
    };
    let view_mode = match params.view_mode.as_deref() {
        None => ViewMode::Players,
        Some(raw) => ViewMode::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("viewMode must be players or teams, got: {raw}"))
        })?,
    };

    Ok(MoversQuery {
        window,
        filters: CommonFilters {
            leagues,
            roles,
            min_games: params.min_games,
        },
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        sort,
        view_mode,
    })
}

pub async fn grinders(
    State(state): State<AppState>,
    Query(params): Query<MoversParams>,
) -> Result<Response, ApiError> {
    let query = movers_query(&params)?;
    Ok(match query.view_mode {
        ViewMode::Players => Json(state.service.player_grinders(&query).await?).into_response(),
        ViewMode::Teams => Json(state.service.team_grinders(&query).await?).into_response(),
    })
}

pub async fn gainers(
    State(state): State<AppState>,
    Query(params): Query<MoversParams>,
) -> Result<Response, ApiError> {
    let query = movers_query(&params)?;
    Ok(match query.view_mode {
        ViewMode::Players => Json(state.service.player_lp_gainers(&query).await?).into_response(),
        ViewMode::Teams => Json(state.service.team_lp_gainers(&query).await?).into_response(),
    })
}

pub async fn losers(
    State(state): State<AppState>,
    Query(params): Query<MoversParams>,
) -> Result<Response, ApiError> {
    let query = movers_query(&params)?;
    Ok(match query.view_mode {
        ViewMode::Players => Json(state.service.player_lp_losers(&query).await?).into_response(),
        ViewMode::Teams => Json(state.service.team_lp_losers(&query).await?).into_response(),
    })
}

pub async fn overview(
    State(state): State<AppState>,
    Query(params): Query<MoversParams>,
) -> Result<Response, ApiError> {
    let query = movers_query(&params)?;
    Ok(match query.view_mode {
        ViewMode::Players => {
            Json(state.service.player_movers_overview(&query).await?).into_response()
        }
        ViewMode::Teams => Json(state.service.team_movers_overview(&query).await?).into_response(),
    })
}
