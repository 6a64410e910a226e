//! Batch history endpoints: one dense per-day series per requested entity.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::{parse_id_list, parse_window, ApiError};
use crate::dashboard::{HistoryQuery, HistorySeries};

const MAX_ENTITIES: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub start_date: String,
    pub end_date: String,
    /// Label-formatting hint only.
    pub period: Option<String>,
    pub ids: String,
}

fn history_query(params: &HistoryParams) -> Result<HistoryQuery, ApiError> {
    let window = parse_window(&params.start_date, &params.end_date)?;
    let entity_ids = parse_id_list(&params.ids, "ids")?;
    if entity_ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }
    if entity_ids.len() > MAX_ENTITIES {
        return Err(ApiError::BadRequest(format!(
            "ids must contain at most {} entries",
            MAX_ENTITIES
        )));
    }
    Ok(HistoryQuery {
        window,
        period: params.period.clone().unwrap_or_else(|| "week".to_string()),
        entity_ids,
    })
}

pub async fn teams(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistorySeries>>, ApiError> {
    let query = history_query(&params)?;
    Ok(Json(state.service.team_history(&query).await?))
}

pub async fn players(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistorySeries>>, ApiError> {
    let query = history_query(&params)?;
    Ok(Json(state.service.player_history(&query).await?))
}
