//! Batch per-day history series for teams and players.
//!
//! The database returns only the days that have snapshots; the dense
//! zero-filled series the callers expect is assembled in Rust, one point
//! per calendar day in the window.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::filters::{build_in_clause, FilterError};
use crate::query::sql::{tier_priority_case, zeroed_lp, ParamSlots, TOP_N_PER_TEAM};
use crate::query::window::{winrate_pct, PeriodWindow};
use crate::query::QueryError;

use super::DashboardService;

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HistoryQuery {
    pub window: PeriodWindow,
    /// Label-formatting hint only: `"year"` switches to month labels.
    pub period: String,
    pub entity_ids: Vec<i64>,
}

// ── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub label: String,
    pub games: i64,
    pub wins: i64,
    pub winrate: f64,
    pub total_lp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySeries {
    pub entity_id: i64,
    pub points: Vec<HistoryPoint>,
}

#[derive(sqlx::FromRow)]
struct DayRow {
    entity_id: i64,
    day: NaiveDate,
    games: i64,
    wins: i64,
    lp: i64,
}

// ── SQL assembly ────────────────────────────────────────────────────────────

/// Per-player per-day best account: Master+ first via tier priority, any
/// tier as fallback so a day with only unranked games still reports play.
fn day_best_cte(start_param: usize, end_param: usize) -> String {
    format!(
        r#"day_best AS (
    SELECT DISTINCT ON (a.player_id, s.snapshot_date)
        a.player_id,
        s.snapshot_date AS day,
        COALESCE(s.games_played, 0)::BIGINT AS games,
        COALESCE(s.wins, 0)::BIGINT AS wins,
        ({lp})::BIGINT AS lp
    FROM daily_snapshots s
    JOIN accounts a ON a.id = s.account_id
    WHERE s.snapshot_date BETWEEN ${start} AND ${end}
    ORDER BY a.player_id, s.snapshot_date, {rank} ASC, s.league_points DESC NULLS LAST, s.account_id ASC
)"#,
        lp = zeroed_lp("s.tier", "s.league_points"),
        rank = tier_priority_case("s.tier"),
        start = start_param,
        end = end_param,
    )
}

/// Bind order: window start/end, then the player ids.
fn player_history_sql(id_count: usize) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let start = slots.next();
    let end = slots.next();
    let ids = build_in_clause("a.player_id", id_count, slots.reserve(id_count))?;

    Ok(format!(
        r#"WITH {day_best}
SELECT
    d.player_id AS entity_id,
    d.day,
    d.games,
    d.wins,
    d.lp
FROM day_best d
ORDER BY d.player_id, d.day"#,
        day_best = with_id_filter(&day_best_cte(start, end), &ids),
    ))
}

/// Bind order: window start/end, then the team ids.
///
/// The top-5 roster restriction is applied per day independently: the five
/// contributing players of a team may differ from one day to the next.
fn team_history_sql(id_count: usize) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let start = slots.next();
    let end = slots.next();
    let ids = build_in_clause("c.team_id", id_count, slots.reserve(id_count))?;

    Ok(format!(
        r#"WITH {day_best},
day_roster AS (
    SELECT
        c.team_id,
        d.day,
        d.games,
        d.wins,
        d.lp,
        ROW_NUMBER() OVER (
            PARTITION BY c.team_id, d.day
            ORDER BY d.lp DESC, d.games DESC, d.player_id ASC
        ) AS day_rank
    FROM day_best d
    JOIN contracts c ON c.player_id = d.player_id AND c.end_date IS NULL
    WHERE {ids}
)
SELECT
    r.team_id AS entity_id,
    r.day,
    SUM(r.games)::BIGINT AS games,
    SUM(r.wins)::BIGINT AS wins,
    SUM(r.lp)::BIGINT AS lp
FROM day_roster r
WHERE r.day_rank <= {top_n}
GROUP BY r.team_id, r.day
ORDER BY r.team_id, r.day"#,
        day_best = day_best_cte(start, end),
        top_n = TOP_N_PER_TEAM,
    ))
}

/// Push the entity-id predicate into the day_best scan.
fn with_id_filter(cte: &str, ids: &str) -> String {
    cte.replacen(
        "JOIN accounts a ON a.id = s.account_id",
        &format!("JOIN accounts a ON a.id = s.account_id AND {ids}"),
        1,
    )
}

// ── Series assembly ─────────────────────────────────────────────────────────

fn day_label(date: NaiveDate, period: &str) -> String {
    if period == "year" {
        date.format("%b %Y").to_string()
    } else {
        date.format("%d %b").to_string()
    }
}

/// One dense series per requested id, zero-filling days with no data.
fn build_series(query: &HistoryQuery, rows: Vec<DayRow>) -> Vec<HistorySeries> {
    let mut by_entity_day: HashMap<(i64, NaiveDate), DayRow> = HashMap::new();
    for row in rows {
        by_entity_day.insert((row.entity_id, row.day), row);
    }

    query
        .entity_ids
        .iter()
        .map(|&entity_id| {
            let points = query
                .window
                .iter_days()
                .map(|date| match by_entity_day.get(&(entity_id, date)) {
                    Some(row) => HistoryPoint {
                        date,
                        label: day_label(date, &query.period),
                        games: row.games,
                        wins: row.wins,
                        winrate: winrate_pct(row.games, row.wins),
                        total_lp: row.lp,
                    },
                    None => HistoryPoint {
                        date,
                        label: day_label(date, &query.period),
                        games: 0,
                        wins: 0,
                        winrate: 0.0,
                        total_lp: 0,
                    },
                })
                .collect();
            HistorySeries { entity_id, points }
        })
        .collect()
}

// ── Assemblers ──────────────────────────────────────────────────────────────

impl DashboardService {
    pub async fn player_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistorySeries>, QueryError> {
        self.history("history:players", query, player_history_sql)
            .await
    }

    pub async fn team_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<HistorySeries>, QueryError> {
        self.history("history:teams", query, team_history_sql).await
    }

    async fn history(
        &self,
        operation: &str,
        query: &HistoryQuery,
        sql_for: fn(usize) -> Result<String, FilterError>,
    ) -> Result<Vec<HistorySeries>, QueryError> {
        self.cached(operation, query, || async {
            if query.entity_ids.is_empty() {
                return Ok(Vec::new());
            }
            let sql = sql_for(query.entity_ids.len())?;
            debug!(
                operation,
                entities = query.entity_ids.len(),
                days = query.window.days(),
                "assembling history series"
            );

            let rows = self
                .guard
                .run_batch(operation, async {
                    let mut q = sqlx::query_as::<_, DayRow>(&sql)
                        .bind(query.window.start)
                        .bind(query.window.end);
                    for id in &query.entity_ids {
                        q = q.bind(*id);
                    }
                    Ok(q.fetch_all(&self.pool).await?)
                })
                .await?;

            Ok(build_series(query, rows))
        })
        .await
    }
}
