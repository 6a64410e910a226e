//! Team and player leaderboards with period-over-period deltas.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::filters::{
    build_in_clause, build_min_games_clause, build_search_clause, FilterError, LeaderboardSort,
};
use crate::query::sql::{
    account_totals_cte, best_account_ctes, team_agg_cte, team_roster_cte, BestAccountScope,
    ParamSlots, ReferencePoint, RosterRank, TierFilter,
};
use crate::query::window::{winrate_change_pp, winrate_pct, PeriodWindow};
use crate::query::QueryError;

use super::{CommonFilters, DashboardService, PageMeta, Paginated};

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardQuery {
    pub window: PeriodWindow,
    pub filters: CommonFilters,
    pub search: Option<String>,
    pub sort: LeaderboardSort,
    pub page: i64,
    pub per_page: i64,
    /// Player leaderboard only: also list players with no ranked data in the
    /// window, sorted after every ranked player.
    pub include_unranked: bool,
}

impl LeaderboardQuery {
    fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

// ── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLeaderboardEntry {
    pub team_id: i64,
    pub team_name: String,
    pub team_short_name: Option<String>,
    pub logo_url: Option<String>,
    pub league_id: i64,
    pub league_name: String,
    pub total_games: i64,
    pub total_wins: i64,
    pub total_duration: i64,
    pub winrate: f64,
    pub total_lp: i64,
    pub games_change: i64,
    pub winrate_change: f64,
    pub lp_change: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeaderboardEntry {
    pub player_id: i64,
    pub slug: String,
    pub display_name: String,
    /// `None` for free agents, same as the team fields.
    pub role: Option<String>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub tier: Option<String>,
    pub total_games: i64,
    pub total_wins: i64,
    pub total_duration: i64,
    pub winrate: f64,
    pub total_lp: i64,
    pub games_change: i64,
    pub winrate_change: f64,
    pub lp_change: i64,
}

// ── Rows ────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct TeamRow {
    team_id: i64,
    team_name: String,
    team_short_name: Option<String>,
    logo_url: Option<String>,
    league_id: i64,
    league_name: String,
    total_games: i64,
    total_wins: i64,
    total_duration: i64,
    total_lp: i64,
    prev_games: i64,
    prev_wins: i64,
    prev_lp: i64,
}

#[derive(sqlx::FromRow)]
struct PlayerRow {
    player_id: i64,
    slug: String,
    display_name: String,
    role: Option<String>,
    team_id: Option<i64>,
    team_name: Option<String>,
    tier: Option<String>,
    total_games: i64,
    total_wins: i64,
    total_duration: i64,
    total_lp: i64,
    prev_games: i64,
    prev_wins: i64,
    prev_lp: i64,
}

// ── SQL assembly ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlKind {
    /// Full row set with previous-window CTEs, ordering and pagination.
    Data,
    /// `COUNT(*)` over the filtered set; no previous-window work.
    Count,
}

/// Bind order for both team statements: current window start/end, previous
/// window start/end (data only), roles, leagues, search pattern, min games,
/// then limit and offset (data only).
fn team_sql(query: &LeaderboardQuery, kind: SqlKind) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let cur = BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        tier_filter: TierFilter::Any,
        reference: ReferencePoint::LatestInWindow,
    };
    let prev = (kind == SqlKind::Data).then(|| BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        ..cur
    });

    let role_clause = if query.filters.roles.is_empty() {
        None
    } else {
        let first = slots.reserve(query.filters.roles.len());
        Some(build_in_clause("c.role", query.filters.roles.len(), first)?)
    };

    let mut conditions = Vec::new();
    if !query.filters.leagues.is_empty() {
        let first = slots.reserve(query.filters.leagues.len());
        conditions.push(build_in_clause(
            "t.league_id",
            query.filters.leagues.len(),
            first,
        )?);
    }
    if query.search.is_some() {
        conditions.push(build_search_clause("t.name", "t.short_name", slots.next())?);
    }
    if query.filters.min_games.is_some() {
        conditions.push(build_min_games_clause("cur.total_games", slots.next())?);
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("\nWHERE {}", conditions.join("\n    AND "))
    };

    let mut ctes = vec![
        best_account_ctes("cur", &cur),
        account_totals_cte("cur", cur.start_param, cur.end_param),
        team_roster_cte("cur", RosterRank::Lp, role_clause.as_deref()),
        team_agg_cte("cur", true),
    ];
    if let Some(prev) = prev {
        ctes.push(best_account_ctes("prev", &prev));
        ctes.push(account_totals_cte("prev", prev.start_param, prev.end_param));
        ctes.push(team_roster_cte("prev", RosterRank::Lp, role_clause.as_deref()));
        ctes.push(team_agg_cte("prev", true));
    }
    let ctes = ctes.join(",\n");

    let sql = match kind {
        SqlKind::Data => format!(
            r#"WITH {ctes}
SELECT
    t.id AS team_id,
    t.name AS team_name,
    t.short_name AS team_short_name,
    t.logo_url,
    lg.id AS league_id,
    lg.name AS league_name,
    COALESCE(cur.total_games, 0)::BIGINT AS total_games,
    COALESCE(cur.total_wins, 0)::BIGINT AS total_wins,
    COALESCE(cur.total_duration, 0)::BIGINT AS total_duration,
    COALESCE(cur.total_lp, 0)::BIGINT AS total_lp,
    CASE WHEN COALESCE(cur.total_games, 0) > 0
         THEN cur.total_wins::DOUBLE PRECISION / cur.total_games
         ELSE 0 END AS winrate,
    COALESCE(prev.total_games, 0)::BIGINT AS prev_games,
    COALESCE(prev.total_wins, 0)::BIGINT AS prev_wins,
    COALESCE(prev.total_lp, 0)::BIGINT AS prev_lp
FROM teams t
JOIN leagues lg ON lg.id = t.league_id
LEFT JOIN cur_teams cur ON cur.team_id = t.id
LEFT JOIN prev_teams prev ON prev.team_id = t.id{where_clause}
ORDER BY {order}, t.name ASC
LIMIT ${limit} OFFSET ${offset}"#,
            order = query.sort.order_clause(),
            limit = slots.next(),
            offset = slots.next(),
        ),
        SqlKind::Count => format!(
            r#"WITH {ctes}
SELECT COUNT(*)
FROM teams t
JOIN leagues lg ON lg.id = t.league_id
LEFT JOIN cur_teams cur ON cur.team_id = t.id{where_clause}"#
        ),
    };
    Ok(sql)
}

/// Bind order for both player statements: current window start/end, previous
/// window start/end (data only), roles, leagues, search pattern, min games,
/// then limit and offset (data only).
///
/// Candidacy is open to all tiers for every sort: the best-account ranking
/// already prefers a Master+ account when the player has one, and sub-Master
/// LP is zeroed, so under the LP sort a Diamond-only player appears with
/// LP = 0 at the bottom rather than dropping out of the page and the count.
fn player_sql(query: &LeaderboardQuery, kind: SqlKind) -> Result<String, FilterError> {
    let mut slots = ParamSlots::new();
    let cur = BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        tier_filter: TierFilter::Any,
        reference: ReferencePoint::LatestInWindow,
    };
    let prev = (kind == SqlKind::Data).then(|| BestAccountScope {
        start_param: slots.next(),
        end_param: slots.next(),
        ..cur
    });

    let mut conditions = Vec::new();
    if !query.filters.roles.is_empty() {
        let first = slots.reserve(query.filters.roles.len());
        conditions.push(build_in_clause("c.role", query.filters.roles.len(), first)?);
    }
    if !query.filters.leagues.is_empty() {
        let first = slots.reserve(query.filters.leagues.len());
        conditions.push(build_in_clause(
            "t.league_id",
            query.filters.leagues.len(),
            first,
        )?);
    }
    if query.search.is_some() {
        conditions.push(build_search_clause(
            "p.display_name",
            "p.slug",
            slots.next(),
        )?);
    }
    if query.filters.min_games.is_some() {
        conditions.push(build_min_games_clause("cur.games", slots.next())?);
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("\nWHERE {}", conditions.join("\n    AND "))
    };

    let mut ctes = vec![
        best_account_ctes("cur", &cur),
        account_totals_cte("cur", cur.start_param, cur.end_param),
    ];
    if let Some(prev) = prev {
        ctes.push(best_account_ctes("prev", &prev));
        ctes.push(account_totals_cte("prev", prev.start_param, prev.end_param));
    }
    let ctes = ctes.join(",\n");

    // A player absent from cur_totals only appears in the unranked mode.
    let base = if query.include_unranked {
        "FROM players p\nLEFT JOIN cur_totals cur ON cur.player_id = p.id"
    } else {
        "FROM cur_totals cur\nJOIN players p ON p.id = cur.player_id"
    };
    let contract_joins = "LEFT JOIN contracts c ON c.player_id = p.id AND c.end_date IS NULL\n\
                          LEFT JOIN teams t ON t.id = c.team_id";

    let sql = match kind {
        SqlKind::Data => {
            let order = if query.include_unranked {
                format!(
                    "(cur.player_id IS NULL) ASC, {}, p.display_name ASC",
                    query.sort.order_clause()
                )
            } else {
                format!("{}, p.display_name ASC", query.sort.order_clause())
            };
            format!(
                r#"WITH {ctes}
SELECT
    p.id AS player_id,
    p.slug,
    p.display_name,
    c.role,
    t.id AS team_id,
    t.name AS team_name,
    cb.tier,
    COALESCE(cur.games, 0)::BIGINT AS total_games,
    COALESCE(cur.wins, 0)::BIGINT AS total_wins,
    COALESCE(cur.duration, 0)::BIGINT AS total_duration,
    COALESCE(cur.lp, 0)::BIGINT AS total_lp,
    CASE WHEN COALESCE(cur.games, 0) > 0
         THEN cur.wins::DOUBLE PRECISION / cur.games
         ELSE 0 END AS winrate,
    COALESCE(prev.games, 0)::BIGINT AS prev_games,
    COALESCE(prev.wins, 0)::BIGINT AS prev_wins,
    COALESCE(prev.lp, 0)::BIGINT AS prev_lp
{base}
LEFT JOIN cur_best cb ON cb.player_id = p.id
LEFT JOIN prev_totals prev ON prev.player_id = p.id
{contract_joins}{where_clause}
ORDER BY {order}
LIMIT ${limit} OFFSET ${offset}"#,
                limit = slots.next(),
                offset = slots.next(),
            )
        }
        SqlKind::Count => format!(
            r#"WITH {ctes}
SELECT COUNT(*)
{base}
{contract_joins}{where_clause}"#
        ),
    };
    Ok(sql)
}

// ── Assemblers ──────────────────────────────────────────────────────────────

impl DashboardService {
    pub async fn team_leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Paginated<TeamLeaderboardEntry>, QueryError> {
        self.cached("leaderboard:teams", query, || async {
            let data_sql = team_sql(query, SqlKind::Data)?;
            let count_sql = team_sql(query, SqlKind::Count)?;
            let prev = query.window.previous();
            debug!(page = query.page, "assembling team leaderboard");

            let mut rows_q = sqlx::query_as::<_, TeamRow>(&data_sql)
                .bind(query.window.start)
                .bind(query.window.end)
                .bind(prev.start)
                .bind(prev.end);
            let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(query.window.start)
                .bind(query.window.end);
            for role in &query.filters.roles {
                rows_q = rows_q.bind(role.as_str());
                count_q = count_q.bind(role.as_str());
            }
            for league in &query.filters.leagues {
                rows_q = rows_q.bind(*league);
                count_q = count_q.bind(*league);
            }
            if let Some(search) = &query.search {
                let pattern = format!("%{}%", search);
                rows_q = rows_q.bind(pattern.clone());
                count_q = count_q.bind(pattern);
            }
            if let Some(min_games) = query.filters.min_games {
                rows_q = rows_q.bind(min_games);
                count_q = count_q.bind(min_games);
            }
            rows_q = rows_q.bind(query.per_page).bind(query.offset());

            let (rows, total) = self
                .guard
                .run_single("leaderboard:teams", async {
                    let joined = tokio::try_join!(
                        rows_q.fetch_all(&self.pool),
                        count_q.fetch_one(&self.pool)
                    )?;
                    Ok(joined)
                })
                .await?;

            let data = rows.into_iter().map(team_entry).collect();
            Ok(Paginated {
                data,
                meta: PageMeta::new(total, query.per_page, query.page),
            })
        })
        .await
    }

    pub async fn player_leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Result<Paginated<PlayerLeaderboardEntry>, QueryError> {
        self.cached("leaderboard:players", query, || async {
            let data_sql = player_sql(query, SqlKind::Data)?;
            let count_sql = player_sql(query, SqlKind::Count)?;
            let prev = query.window.previous();
            debug!(page = query.page, "assembling player leaderboard");

            let mut rows_q = sqlx::query_as::<_, PlayerRow>(&data_sql)
                .bind(query.window.start)
                .bind(query.window.end)
                .bind(prev.start)
                .bind(prev.end);
            let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(query.window.start)
                .bind(query.window.end);
            for role in &query.filters.roles {
                rows_q = rows_q.bind(role.as_str());
                count_q = count_q.bind(role.as_str());
            }
            for league in &query.filters.leagues {
                rows_q = rows_q.bind(*league);
                count_q = count_q.bind(*league);
            }
            if let Some(search) = &query.search {
                let pattern = format!("%{}%", search);
                rows_q = rows_q.bind(pattern.clone());
                count_q = count_q.bind(pattern);
            }
            if let Some(min_games) = query.filters.min_games {
                rows_q = rows_q.bind(min_games);
                count_q = count_q.bind(min_games);
            }
            rows_q = rows_q.bind(query.per_page).bind(query.offset());

            let (rows, total) = self
                .guard
                .run_single("leaderboard:players", async {
                    let joined = tokio::try_join!(
                        rows_q.fetch_all(&self.pool),
                        count_q.fetch_one(&self.pool)
                    )?;
                    Ok(joined)
                })
                .await?;

            let data = rows.into_iter().map(player_entry).collect();
            Ok(Paginated {
                data,
                meta: PageMeta::new(total, query.per_page, query.page),
            })
        })
        .await
    }
}

fn team_entry(row: TeamRow) -> TeamLeaderboardEntry {
    TeamLeaderboardEntry {
        team_id: row.team_id,
        team_name: row.team_name,
        team_short_name: row.team_short_name,
        logo_url: row.logo_url,
        league_id: row.league_id,
        league_name: row.league_name,
        total_games: row.total_games,
        total_wins: row.total_wins,
        total_duration: row.total_duration,
        winrate: winrate_pct(row.total_games, row.total_wins),
        total_lp: row.total_lp,
        games_change: row.total_games - row.prev_games,
        winrate_change: winrate_change_pp(
            row.total_games,
            row.total_wins,
            row.prev_games,
            row.prev_wins,
        ),
        lp_change: row.total_lp - row.prev_lp,
    }
}

fn player_entry(row: PlayerRow) -> PlayerLeaderboardEntry {
    PlayerLeaderboardEntry {
        player_id: row.player_id,
        slug: row.slug,
        display_name: row.display_name,
        role: row.role,
        team_id: row.team_id,
        team_name: row.team_name,
        tier: row.tier,
        total_games: row.total_games,
        total_wins: row.total_wins,
        total_duration: row.total_duration,
        winrate: winrate_pct(row.total_games, row.total_wins),
        total_lp: row.total_lp,
        games_change: row.total_games - row.prev_games,
        winrate_change: winrate_change_pp(
            row.total_games,
            row.total_wins,
            row.prev_games,
            row.prev_wins,
        ),
        lp_change: row.total_lp - row.prev_lp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;

    fn query() -> LeaderboardQuery {
        LeaderboardQuery {
            window: PeriodWindow::new(
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            ),
            filters: CommonFilters::default(),
            search: None,
            sort: LeaderboardSort::Lp,
            page: 1,
            per_page: 20,
            include_unranked: false,
        }
    }

    #[test]
    fn test_team_data_sql_param_layout() {
        let sql = team_sql(&query(), SqlKind::Data).unwrap();
        assert!(sql.contains("BETWEEN $1 AND $2"));
        assert!(sql.contains("BETWEEN $3 AND $4"));
        assert!(sql.contains("LIMIT $5 OFFSET $6"));
        assert!(sql.contains("ORDER BY total_lp DESC, t.name ASC"));
    }

    #[test]
    fn test_team_count_sql_skips_previous_window() {
        let sql = team_sql(&query(), SqlKind::Count).unwrap();
        assert!(sql.contains("SELECT COUNT(*)"));
        assert!(!sql.contains("prev_teams"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_team_sql_filter_params_follow_windows() {
        let mut q = query();
        q.filters.roles = vec![Role::Top, Role::Jungle];
        q.filters.leagues = vec![1, 2, 3];
        q.search = Some("fna".to_string());
        q.filters.min_games = Some(10);

        let sql = team_sql(&q, SqlKind::Data).unwrap();
        assert!(sql.contains("c.role IN ($5, $6)"));
        assert!(sql.contains("t.league_id IN ($7, $8, $9)"));
        assert!(sql.contains("(t.name ILIKE $10 OR t.short_name ILIKE $10)"));
        assert!(sql.contains("COALESCE(cur.total_games, 0) >= $11"));
        assert!(sql.contains("LIMIT $12 OFFSET $13"));
    }

    #[test]
    fn test_role_filter_scoped_to_roster_not_team() {
        let mut q = query();
        q.filters.roles = vec![Role::Mid];
        let sql = team_sql(&q, SqlKind::Data).unwrap();
        let roster_idx = sql.find("cur_roster AS").unwrap();
        let where_idx = sql.find("FROM teams t").unwrap();
        let role_idx = sql.find("c.role IN").unwrap();
        assert!(role_idx > roster_idx && role_idx < where_idx);
    }

    #[test]
    fn test_player_lp_sort_keeps_sub_master_players_with_zeroed_lp() {
        // A Diamond-only player must stay on the LP leaderboard (and in the
        // total) with LP = 0; only the CASE zeroes LP, no candidacy gate.
        for kind in [SqlKind::Data, SqlKind::Count] {
            let sql = player_sql(&query(), kind).unwrap();
            assert!(!sql.contains("WHERE l.tier IN"));
            assert!(sql.contains("CASE WHEN l.tier IN ('CHALLENGER', 'GRANDMASTER', 'MASTER')"));
        }
    }

    #[test]
    fn test_player_games_sort_keeps_all_tiers() {
        let mut q = query();
        q.sort = LeaderboardSort::Games;
        let sql = player_sql(&q, SqlKind::Data).unwrap();
        assert!(!sql.contains("WHERE l.tier IN"));
        assert!(sql.contains("ORDER BY total_games DESC, p.display_name ASC"));
    }

    #[test]
    fn test_player_unranked_mode_left_joins_and_sorts_last() {
        let mut q = query();
        q.include_unranked = true;
        let sql = player_sql(&q, SqlKind::Data).unwrap();
        assert!(sql.contains("FROM players p\nLEFT JOIN cur_totals cur"));
        assert!(sql.contains("ORDER BY (cur.player_id IS NULL) ASC"));
    }

    #[test]
    fn test_player_ranked_mode_inner_joins() {
        let sql = player_sql(&query(), SqlKind::Data).unwrap();
        assert!(sql.contains("FROM cur_totals cur\nJOIN players p"));
    }

    #[test]
    fn test_team_entry_delta_math() {
        let entry = team_entry(TeamRow {
            team_id: 1,
            team_name: "G2".into(),
            team_short_name: Some("G2".into()),
            logo_url: None,
            league_id: 1,
            league_name: "LEC".into(),
            total_games: 60,
            total_wins: 33,
            total_duration: 0,
            total_lp: 2100,
            prev_games: 40,
            prev_wins: 20,
            prev_lp: 1800,
        });
        assert_eq!(entry.winrate, 55.0);
        assert_eq!(entry.games_change, 20);
        assert_eq!(entry.winrate_change, 5.0);
        assert_eq!(entry.lp_change, 300);
    }

    #[test]
    fn test_new_entrant_shows_full_current_value() {
        let entry = team_entry(TeamRow {
            team_id: 2,
            team_name: "BDS".into(),
            team_short_name: None,
            logo_url: None,
            league_id: 1,
            league_name: "LEC".into(),
            total_games: 30,
            total_wins: 15,
            total_duration: 0,
            total_lp: 900,
            prev_games: 0,
            prev_wins: 0,
            prev_lp: 0,
        });
        assert_eq!(entry.games_change, 30);
        assert_eq!(entry.lp_change, 900);
        assert_eq!(entry.winrate_change, 50.0);
    }
}
