//! Top-mover assemblers: grinders (games played) and LP gainers/losers.
//!
//! Gainers resolve account identity at the END of the window, losers at the
//! START. The asymmetry is deliberate: a player who fell out of Master+
//! entirely still shows as a loser (end-of-window LP reads 0), and a player
//! who entered mid-window is credited with their full climb.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::filters::{
    build_in_clause, build_min_games_clause, FilterError, SortDirection,
};
use crate::query::sql::{
    account_totals_cte, best_account_ctes, team_agg_cte, team_roster_cte, zeroed_lp,
    BestAccountScope, ParamSlots, ReferencePoint, RosterRank, TierFilter,
};
use crate::query::window::{winrate_pct, PeriodWindow};
use crate::query::QueryError;

use super::{CommonFilters, DashboardService};

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Players,
    Teams,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "players" => Some(ViewMode::Players),
            "teams" => Some(ViewMode::Teams),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoversQuery {
    pub window: PeriodWindow,
    pub filters: CommonFilters,
    pub limit: i64,
    pub sort: SortDirection,
    pub view_mode: ViewMode,
}

// ── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGrinderEntry {
    pub player_id: i64,
    pub slug: String,
    pub display_name: String,
    pub role: Option<String>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub total_games: i64,
    pub total_wins: i64,
    pub winrate: f64,
    pub total_lp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamGrinderEntry {
    pub team_id: i64,
    pub team_name: String,
    pub team_short_name: Option<String>,
    pub logo_url: Option<String>,
    pub total_games: i64,
    pub total_wins: i64,
    pub winrate: f64,
    pub total_lp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLpMoverEntry {
    pub player_id: i64,
    pub slug: String,
    pub display_name: String,
    pub role: Option<String>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub total_games: i64,
    pub current_lp: i64,
    pub lp_change: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLpMoverEntry {
    pub team_id: i64,
    pub team_name: String,
    pub team_short_name: Option<String>,
    pub logo_url: Option<String>,
    pub total_games: i64,
    pub lp_change: i64,
}

/// All three player-mode mover lists, fetched concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoversOverview {
    pub grinders: Vec<PlayerGrinderEntry>,
    pub gainers: Vec<PlayerLpMoverEntry>,
    pub losers: Vec<PlayerLpMoverEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMoversOverview {
    pub grinders: Vec<TeamGrinderEntry>,
    pub gainers: Vec<TeamLpMoverEntry>,
    pub losers: Vec<TeamLpMoverEntry>,
}

// ── Rows ────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct PlayerGrinderRow {
    player_id: i64,
    slug: String,
    display_name: String,
    role: Option<String>,
    team_id: Option<i64>,
    team_name: Option<String>,
    total_games: i64,
    total_wins: i64,
    total_lp: i64,
}

#[derive(sqlx::FromRow)]
struct TeamGrinderRow {
    team_id: i64,
    team_name: String,
    team_short_name: Option<String>,
    logo_url: Option<String>,
    total_games: i64,
    total_wins: i64,
    total_lp: i64,
}

#[derive(sqlx::FromRow)]
struct PlayerLpMoverRow {
    player_id: i64,
    slug: String,
    display_name: String,
    role: Option<String>,
    team_id: Option<i64>,
    team_name: Option<String>,
    total_games: i64,
    current_lp: i64,
    lp_change: i64,
}

#[derive(sqlx::FromRow)]
struct TeamLpMoverRow {
    team_id: i64,
    team_name: String,
    team_short_name: Option<String>,
    logo_url: Option<String>,
    total_games: i64,
    lp_change: i64,
}

// ── SQL assembly ────────────────────────────────────────────────────────────

/// Shared outer-query filters. Bind order after the window params: roles,
/// leagues, min games, limit.
struct MoverFilters {
    role_clause: Option<String>,
    league_clause: Option<String>,
    min_games_clause: Option<String>,
    limit_param: usize,
}

impl MoverFilters {
    /// Both clauses combined into an inner-query `WHERE`, or nothing.
    fn inner_where(&self) -> String {
        let conditions: Vec<&str> = self
            .role_clause
            .iter()
            .chain(self.league_clause.iter())
            .map(String::as_str)
            .collect();
        if conditions.is_empty() {
            String::new()
        } else {
            format!("\n    WHERE {}", conditions.join(" AND "))
        }
    }
}

fn mover_filters(
    filters: &CommonFilters,
    slots: &mut ParamSlots,
) -> Result<MoverFilters, FilterError> {
    let role_clause = if filters.roles.is_empty() {
        None
    } else {
        let first = slots.reserve(filters.roles.len());
        Some(build_in_clause("c.role", filters.roles.len(), first)?)
    };
    let league_clause = if filters.leagues.is_empty() {
        None
    } else {
        let first = slots.reserve(filters.leagues.len());
        Some(build_in_clause("t.league_id", filters.leagues.len(), first)?)
    };
    let min_games_clause = filters
        .min_games
        .map(|_| build_min_games_clause("cur.total_games", slots.next()))
        .transpose()?;
    Ok(MoverFilters {
        role_clause,
        league_clause,
        min_games_clause,
        limit_param: slots.next(),
    })
}

/// Bind order: window start/end, roles, leagues, min games, limit.
fn grinders_sql(query: &MoversQuery) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let cur = BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        tier_filter: TierFilter::Any,
        reference: ReferencePoint::LatestInWindow,
    };
    let f = mover_filters(&query.filters, &mut slots)?;
    let direction = query.sort.as_sql();

    let sql = match query.view_mode {
        ViewMode::Players => {
            let outer_min = f
                .min_games_clause
                .as_deref()
                .map(|c| format!("\nWHERE {c}"))
                .unwrap_or_default();
            format!(
                r#"WITH {best},
{totals}
SELECT * FROM (
    SELECT
        p.id AS player_id,
        p.slug,
        p.display_name,
        c.role,
        t.id AS team_id,
        t.name AS team_name,
        tt.games::BIGINT AS total_games,
        tt.wins::BIGINT AS total_wins,
        tt.lp::BIGINT AS total_lp
    FROM cur_totals tt
    JOIN players p ON p.id = tt.player_id
    LEFT JOIN contracts c ON c.player_id = p.id AND c.end_date IS NULL
    LEFT JOIN teams t ON t.id = c.team_id{filters}
) cur{outer_min}
ORDER BY cur.total_games {direction}, cur.display_name ASC
LIMIT ${limit}"#,
                best = best_account_ctes("cur", &cur),
                totals = account_totals_cte("cur", cur.start_param, cur.end_param),
                filters = f.inner_where(),
                limit = f.limit_param,
            )
        }
        ViewMode::Teams => {
            let outer_min = f
                .min_games_clause
                .as_deref()
                .map(|c| format!("\nWHERE {c}"))
                .unwrap_or_default();
            // The roster is ranked by games here, not LP: a team's five most
            // active players define its grind.
            let league_where = f
                .league_clause
                .as_deref()
                .map(|clause| format!("\n    WHERE {clause}"))
                .unwrap_or_default();
            format!(
                r#"WITH {best},
{totals},
{roster},
{teams}
SELECT * FROM (
    SELECT
        t.id AS team_id,
        t.name AS team_name,
        t.short_name AS team_short_name,
        t.logo_url,
        g.total_games,
        g.total_wins,
        g.total_lp
    FROM cur_teams g
    JOIN teams t ON t.id = g.team_id{league_where}
) cur{outer_min}
ORDER BY cur.total_games {direction}, cur.team_name ASC
LIMIT ${limit}"#,
                best = best_account_ctes("cur", &cur),
                totals = account_totals_cte("cur", cur.start_param, cur.end_param),
                roster = team_roster_cte("cur", RosterRank::Games, f.role_clause.as_deref()),
                teams = team_agg_cte("cur", true),
                limit = f.limit_param,
            )
        }
    };
    Ok(sql)
}

/// Which end of the window anchors account identity for an LP-delta query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LpDirection {
    Gainers,
    Losers,
}

impl LpDirection {
    fn identity(self) -> ReferencePoint {
        match self {
            LpDirection::Gainers => ReferencePoint::End,
            LpDirection::Losers => ReferencePoint::Start,
        }
    }

    /// The snapshot compared against, per account of the identity selection.
    fn opposite_order(self) -> ReferencePoint {
        match self {
            LpDirection::Gainers => ReferencePoint::Start,
            LpDirection::Losers => ReferencePoint::End,
        }
    }

    fn qualifier(self) -> &'static str {
        match self {
            LpDirection::Gainers => "cur.lp_change > 0",
            LpDirection::Losers => "cur.lp_change < 0",
        }
    }

    /// For losers "desc" means most severe loss first, so the SQL direction
    /// is inverted.
    fn order(self, sort: SortDirection) -> SortDirection {
        match self {
            LpDirection::Gainers => sort,
            LpDirection::Losers => sort.invert(),
        }
    }
}

/// Bind order: window start/end, roles, leagues, min games, limit.
///
/// `anchor_best` picks the identity account; `other_latest` provides the
/// comparison snapshot for that same account at the opposite window edge.
/// The delta is always end-LP minus start-LP, with both sides tier-zeroed.
fn lp_movers_sql(query: &MoversQuery, direction: LpDirection) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let anchor = BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        tier_filter: TierFilter::Any,
        reference: direction.identity(),
    };
    let other = BestAccountScope {
        reference: direction.opposite_order(),
        ..anchor
    };
    let f = mover_filters(&query.filters, &mut slots)?;

    let other_lp = zeroed_lp("ol.tier", "ol.league_points");
    let delta_expr = match direction {
        LpDirection::Gainers => format!("b.lp - COALESCE(({other_lp})::BIGINT, 0)"),
        LpDirection::Losers => format!("COALESCE(({other_lp})::BIGINT, 0) - b.lp"),
    };
    let deltas = format!(
        r#"deltas AS (
    SELECT
        b.player_id,
        b.account_id,
        b.lp AS anchor_lp,
        ({delta_expr})::BIGINT AS lp_change
    FROM anchor_best b
    LEFT JOIN other_latest ol ON ol.account_id = b.account_id
)"#
    );
    // Current LP for display is always the end-of-window value: the anchor
    // LP for gainers, the comparison snapshot for losers.
    let current_lp = match direction {
        LpDirection::Gainers => "d.anchor_lp",
        LpDirection::Losers => "COALESCE(et.lp, 0)",
    };
    let end_lp_join = match direction {
        LpDirection::Gainers => String::new(),
        LpDirection::Losers => {
            let end_lp = zeroed_lp("ol.tier", "ol.league_points");
            format!(
                "\n    LEFT JOIN (SELECT account_id, ({end_lp})::BIGINT AS lp FROM other_latest ol) et ON et.account_id = d.account_id"
            )
        }
    };

    let outer_min = f
        .min_games_clause
        .as_deref()
        .map(|c| format!(" AND {c}"))
        .unwrap_or_default();
    let order = direction.order(query.sort).as_sql();
    let qualifier = direction.qualifier();

    let sql = match query.view_mode {
        ViewMode::Players => format!(
            r#"WITH {anchor_ctes},
{other_latest},
{totals},
{deltas}
SELECT * FROM (
    SELECT
        p.id AS player_id,
        p.slug,
        p.display_name,
        c.role,
        t.id AS team_id,
        t.name AS team_name,
        tt.games::BIGINT AS total_games,
        ({current_lp})::BIGINT AS current_lp,
        d.lp_change
    FROM deltas d
    JOIN players p ON p.id = d.player_id
    JOIN anchor_totals tt ON tt.player_id = d.player_id
    LEFT JOIN contracts c ON c.player_id = p.id AND c.end_date IS NULL
    LEFT JOIN teams t ON t.id = c.team_id{end_lp_join}{filters}
) cur
WHERE {qualifier}{outer_min}
ORDER BY cur.lp_change {order}, cur.display_name ASC
LIMIT ${limit}"#,
            anchor_ctes = best_account_ctes("anchor", &anchor),
            other_latest = other_latest_cte(&other),
            totals = account_totals_cte("anchor", anchor.start_param, anchor.end_param),
            filters = f.inner_where(),
            limit = f.limit_param,
        ),
        // Team mode sums per-player deltas across the whole active roster;
        // unlike leaderboard team LP there is no top-5 cap here.
        ViewMode::Teams => format!(
            r#"WITH {anchor_ctes},
{other_latest},
{totals},
{deltas}
SELECT * FROM (
    SELECT
        t.id AS team_id,
        t.name AS team_name,
        t.short_name AS team_short_name,
        t.logo_url,
        SUM(tt.games)::BIGINT AS total_games,
        SUM(d.lp_change)::BIGINT AS lp_change
    FROM deltas d
    JOIN anchor_totals tt ON tt.player_id = d.player_id
    JOIN contracts c ON c.player_id = d.player_id AND c.end_date IS NULL
    JOIN teams t ON t.id = c.team_id{filters}
    GROUP BY t.id, t.name, t.short_name, t.logo_url
) cur
WHERE {qualifier}{outer_min}
ORDER BY cur.lp_change {order}, cur.team_name ASC
LIMIT ${limit}"#,
            anchor_ctes = best_account_ctes("anchor", &anchor),
            other_latest = other_latest_cte(&other),
            totals = account_totals_cte("anchor", anchor.start_param, anchor.end_param),
            filters = f.inner_where(),
            limit = f.limit_param,
        ),
    };
    Ok(sql)
}

/// One snapshot per account at the comparison edge of the window.
fn other_latest_cte(scope: &BestAccountScope) -> String {
    let order = match scope.reference {
        ReferencePoint::Start => "s.snapshot_date ASC, s.created_at ASC",
        ReferencePoint::End | ReferencePoint::LatestInWindow => {
            "s.snapshot_date DESC, s.created_at DESC"
        }
    };
    format!(
        r#"other_latest AS (
    SELECT DISTINCT ON (s.account_id)
        s.account_id,
        s.tier,
        s.league_points
    FROM daily_snapshots s
    WHERE s.snapshot_date BETWEEN ${start} AND ${end}
    ORDER BY s.account_id, {order}
)"#,
        start = scope.start_param,
        end = scope.end_param,
    )
}

// ── Assemblers ──────────────────────────────────────────────────────────────

macro_rules! bind_mover_params {
    ($q:expr, $query:expr) => {{
        let mut bound = $q.bind($query.window.start).bind($query.window.end);
        for role in &$query.filters.roles {
            bound = bound.bind(role.as_str());
        }
        for league in &$query.filters.leagues {
            bound = bound.bind(*league);
        }
        if let Some(min_games) = $query.filters.min_games {
            bound = bound.bind(min_games);
        }
        bound.bind($query.limit)
    }};
}

impl DashboardService {
    pub async fn player_grinders(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<PlayerGrinderEntry>, QueryError> {
        self.cached("movers:grinders:players", query, || async {
            let sql = grinders_sql(query)?;
            debug!(limit = query.limit, "assembling player grinders");
            let rows = self
                .guard
                .run_single("movers:grinders:players", async {
                    let q = bind_mover_params!(
                        sqlx::query_as::<_, PlayerGrinderRow>(&sql),
                        query
                    );
                    Ok(q.fetch_all(&self.pool).await?)
                })
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| PlayerGrinderEntry {
                    winrate: winrate_pct(r.total_games, r.total_wins),
                    player_id: r.player_id,
                    slug: r.slug,
                    display_name: r.display_name,
                    role: r.role,
                    team_id: r.team_id,
                    team_name: r.team_name,
                    total_games: r.total_games,
                    total_wins: r.total_wins,
                    total_lp: r.total_lp,
                })
                .collect())
        })
        .await
    }

    pub async fn team_grinders(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<TeamGrinderEntry>, QueryError> {
        self.cached("movers:grinders:teams", query, || async {
            let sql = grinders_sql(query)?;
            debug!(limit = query.limit, "assembling team grinders");
            let rows = self
                .guard
                .run_single("movers:grinders:teams", async {
                    let q = bind_mover_params!(sqlx::query_as::<_, TeamGrinderRow>(&sql), query);
                    Ok(q.fetch_all(&self.pool).await?)
                })
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| TeamGrinderEntry {
                    winrate: winrate_pct(r.total_games, r.total_wins),
                    team_id: r.team_id,
                    team_name: r.team_name,
                    team_short_name: r.team_short_name,
                    logo_url: r.logo_url,
                    total_games: r.total_games,
                    total_wins: r.total_wins,
                    total_lp: r.total_lp,
                })
                .collect())
        })
        .await
    }

    pub async fn player_lp_gainers(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<PlayerLpMoverEntry>, QueryError> {
        self.player_lp_movers("movers:gainers:players", query, LpDirection::Gainers)
            .await
    }

    pub async fn player_lp_losers(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<PlayerLpMoverEntry>, QueryError> {
        self.player_lp_movers("movers:losers:players", query, LpDirection::Losers)
            .await
    }

    pub async fn team_lp_gainers(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<TeamLpMoverEntry>, QueryError> {
        self.team_lp_movers("movers:gainers:teams", query, LpDirection::Gainers)
            .await
    }

    pub async fn team_lp_losers(
        &self,
        query: &MoversQuery,
    ) -> Result<Vec<TeamLpMoverEntry>, QueryError> {
        self.team_lp_movers("movers:losers:teams", query, LpDirection::Losers)
            .await
    }

    async fn player_lp_movers(
        &self,
        operation: &str,
        query: &MoversQuery,
        direction: LpDirection,
    ) -> Result<Vec<PlayerLpMoverEntry>, QueryError> {
        self.cached(operation, query, || async {
            let sql = lp_movers_sql(query, direction)?;
            debug!(limit = query.limit, operation, "assembling LP movers");
            let rows = self
                .guard
                .run_single(operation, async {
                    let q = bind_mover_params!(
                        sqlx::query_as::<_, PlayerLpMoverRow>(&sql),
                        query
                    );
                    Ok(q.fetch_all(&self.pool).await?)
                })
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| PlayerLpMoverEntry {
                    player_id: r.player_id,
                    slug: r.slug,
                    display_name: r.display_name,
                    role: r.role,
                    team_id: r.team_id,
                    team_name: r.team_name,
                    total_games: r.total_games,
                    current_lp: r.current_lp,
                    lp_change: r.lp_change,
                })
                .collect())
        })
        .await
    }

    async fn team_lp_movers(
        &self,
        operation: &str,
        query: &MoversQuery,
        direction: LpDirection,
    ) -> Result<Vec<TeamLpMoverEntry>, QueryError> {
        self.cached(operation, query, || async {
            let sql = lp_movers_sql(query, direction)?;
            debug!(limit = query.limit, operation, "assembling LP movers");
            let rows = self
                .guard
                .run_single(operation, async {
                    let q = bind_mover_params!(sqlx::query_as::<_, TeamLpMoverRow>(&sql), query);
                    Ok(q.fetch_all(&self.pool).await?)
                })
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| TeamLpMoverEntry {
                    team_id: r.team_id,
                    team_name: r.team_name,
                    team_short_name: r.team_short_name,
                    logo_url: r.logo_url,
                    total_games: r.total_games,
                    lp_change: r.lp_change,
                })
                .collect())
        })
        .await
    }

    /// All three player-mode lists in one call; the sub-queries run
    /// concurrently and a failure in any one fails the whole call.
    pub async fn player_movers_overview(
        &self,
        query: &MoversQuery,
    ) -> Result<PlayerMoversOverview, QueryError> {
        let (grinders, gainers, losers) = tokio::try_join!(
            self.player_grinders(query),
            self.player_lp_gainers(query),
            self.player_lp_losers(query),
        )?;
        Ok(PlayerMoversOverview {
            grinders,
            gainers,
            losers,
        })
    }

    pub async fn team_movers_overview(
        &self,
        query: &MoversQuery,
    ) -> Result<TeamMoversOverview, QueryError> {
        let (grinders, gainers, losers) = tokio::try_join!(
            self.team_grinders(query),
            self.team_lp_gainers(query),
            self.team_lp_losers(query),
        )?;
        Ok(TeamMoversOverview {
            grinders,
            gainers,
            losers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;

    fn query(view_mode: ViewMode, sort: SortDirection) -> MoversQuery {
        MoversQuery {
            window: PeriodWindow::new(
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            ),
            filters: CommonFilters::default(),
            limit: 10,
            sort,
            view_mode,
        }
    }

    #[test]
    fn test_player_grinders_orders_by_games() {
        let sql = grinders_sql(&query(ViewMode::Players, SortDirection::Desc)).unwrap();
        assert!(sql.contains("ORDER BY cur.total_games DESC"));
        assert!(sql.contains("LIMIT $3"));
    }

    #[test]
    fn test_team_grinders_ranks_roster_by_games() {
        let sql = grinders_sql(&query(ViewMode::Teams, SortDirection::Desc)).unwrap();
        assert!(sql.contains("ORDER BY tt.games DESC, tt.player_id ASC"));
        assert!(sql.contains("WHERE r.team_rank <= 5"));
    }

    #[test]
    fn test_gainers_anchor_at_window_end() {
        let sql =
            lp_movers_sql(&query(ViewMode::Players, SortDirection::Desc), LpDirection::Gainers)
                .unwrap();
        let anchor = sql.find("anchor_latest AS").unwrap();
        let end_order = sql[anchor..]
            .find("s.snapshot_date DESC, s.created_at DESC")
            .unwrap();
        let other = sql.find("other_latest AS").unwrap();
        assert!(anchor + end_order < other);
        assert!(sql[other..].contains("s.snapshot_date ASC, s.created_at ASC"));
        assert!(sql.contains("WHERE cur.lp_change > 0"));
        assert!(sql.contains("ORDER BY cur.lp_change DESC"));
    }

    #[test]
    fn test_losers_anchor_at_window_start() {
        let sql =
            lp_movers_sql(&query(ViewMode::Players, SortDirection::Desc), LpDirection::Losers)
                .unwrap();
        let anchor = sql.find("anchor_latest AS").unwrap();
        let other = sql.find("other_latest AS").unwrap();
        assert!(sql[anchor..other].contains("s.snapshot_date ASC, s.created_at ASC"));
        assert!(sql.contains("WHERE cur.lp_change < 0"));
    }

    #[test]
    fn test_losers_desc_means_most_negative_first() {
        let sql =
            lp_movers_sql(&query(ViewMode::Players, SortDirection::Desc), LpDirection::Losers)
                .unwrap();
        assert!(sql.contains("ORDER BY cur.lp_change ASC"));
    }

    #[test]
    fn test_team_lp_movers_skip_top_five_cap() {
        let sql =
            lp_movers_sql(&query(ViewMode::Teams, SortDirection::Desc), LpDirection::Gainers)
                .unwrap();
        assert!(!sql.contains("team_rank"));
        assert!(sql.contains("SUM(d.lp_change)::BIGINT AS lp_change"));
    }

    #[test]
    fn test_mover_filters_follow_window_params() {
        let mut q = query(ViewMode::Players, SortDirection::Desc);
        q.filters.roles = vec![Role::Adc];
        q.filters.leagues = vec![7];
        q.filters.min_games = Some(20);
        let sql = grinders_sql(&q).unwrap();
        assert!(sql.contains("c.role IN ($3)"));
        assert!(sql.contains("t.league_id IN ($4)"));
        assert!(sql.contains("COALESCE(cur.total_games, 0) >= $5"));
        assert!(sql.contains("LIMIT $6"));
    }

    #[test]
    fn test_team_grinders_league_only_filter_stays_out_of_roster() {
        // With roles absent, the league clause must land in the outer WHERE
        // and the roster CTE must stay unfiltered.
        let mut q = query(ViewMode::Teams, SortDirection::Desc);
        q.filters.leagues = vec![7];
        let sql = grinders_sql(&q).unwrap();
        let roster_end = sql.find("cur_teams AS").unwrap();
        let league_idx = sql.find("t.league_id IN ($3)").unwrap();
        assert!(!sql.contains("c.role IN"));
        assert!(league_idx > roster_end);
    }

    #[test]
    fn test_team_grinders_role_only_filter_scopes_to_roster() {
        let mut q = query(ViewMode::Teams, SortDirection::Desc);
        q.filters.roles = vec![Role::Mid];
        let sql = grinders_sql(&q).unwrap();
        let roster_idx = sql.find("cur_roster AS").unwrap();
        let role_idx = sql.find("c.role IN ($3)").unwrap();
        let agg_idx = sql.find("cur_teams AS").unwrap();
        assert!(role_idx > roster_idx && role_idx < agg_idx);
        assert!(!sql.contains("t.league_id IN"));
    }
}
