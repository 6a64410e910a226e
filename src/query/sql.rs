//! Shared SQL building blocks for the aggregation pipelines.
//!
//! Best-account selection is the one piece every assembler depends on, and
//! the one piece that must never diverge between them: tier ordering, LP
//! zeroing, and tie-breaks all live here and nowhere else. Each generator
//! returns CTE bodies that the assemblers stitch into a single `WITH`
//! statement with numbered binds.

use crate::models::{Tier, UNKNOWN_TIER_PRIORITY};

/// Players per team contributing to team LP totals and capped aggregates.
pub const TOP_N_PER_TEAM: i64 = 5;

/// Running `$n` allocator. Binds must be applied to the query in the same
/// order slots are taken here.
#[derive(Debug, Default)]
pub struct ParamSlots(usize);

impl ParamSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next single slot.
    pub fn next(&mut self) -> usize {
        self.0 += 1;
        self.0
    }

    /// Claim `n` consecutive slots and return the first index.
    pub fn reserve(&mut self, n: usize) -> usize {
        let first = self.0 + 1;
        self.0 += n;
        first
    }
}

/// Which snapshots may become best-account candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierFilter {
    /// Only Master+ accounts qualify; players without one contribute LP = 0.
    MasterPlus,
    /// All tiers qualify; sub-Master LP is still zeroed in the output.
    Any,
}

/// Which snapshot per account anchors the selection.
///
/// `End` and `LatestInWindow` resolve to the same snapshot (the most recent
/// one inside the window); they are kept distinct because callers mean
/// different things by them: gainers pin identity to the window end, the
/// leaderboards simply want the freshest data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePoint {
    Start,
    End,
    LatestInWindow,
}

impl ReferencePoint {
    fn snapshot_order(self) -> &'static str {
        match self {
            ReferencePoint::Start => "s.snapshot_date ASC, s.created_at ASC",
            ReferencePoint::End | ReferencePoint::LatestInWindow => {
                "s.snapshot_date DESC, s.created_at DESC"
            }
        }
    }
}

/// Window parameters and selection mode for one best-account pipeline.
#[derive(Debug, Clone, Copy)]
pub struct BestAccountScope {
    /// `$n` index of the window start date bind.
    pub start_param: usize,
    /// `$n` index of the window end date bind.
    pub end_param: usize,
    pub tier_filter: TierFilter,
    pub reference: ReferencePoint,
}

/// SQL list of the tiers that carry meaningful LP.
pub fn master_plus_list() -> String {
    Tier::ALL
        .iter()
        .filter(|t| t.is_master_plus())
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// CASE expression ranking a tier column: CHALLENGER=1 .. IRON=10, unknown
/// or NULL sorts last. Generated from the same table the Rust side uses.
pub fn tier_priority_case(tier_expr: &str) -> String {
    let mut arms = String::new();
    for tier in Tier::ALL {
        arms.push_str(&format!(
            " WHEN '{}' THEN {}",
            tier.as_str(),
            tier.priority()
        ));
    }
    format!(
        "CASE {tier_expr}{arms} ELSE {unknown} END",
        unknown = UNKNOWN_TIER_PRIORITY
    )
}

/// LP expression with sub-Master zeroing applied.
pub fn zeroed_lp(tier_expr: &str, lp_expr: &str) -> String {
    format!(
        "CASE WHEN {tier_expr} IN ({tiers}) THEN COALESCE({lp_expr}, 0) ELSE 0 END",
        tiers = master_plus_list()
    )
}

/// Emit the `<prefix>_latest` and `<prefix>_best` CTE pair.
///
/// `<prefix>_latest` keeps one snapshot per account (the reference-point
/// snapshot inside the window); `<prefix>_best` keeps exactly one account
/// per player, ranked by tier priority, then LP descending (nulls last),
/// then account id as the deterministic tie-break.
pub fn best_account_ctes(prefix: &str, scope: &BestAccountScope) -> String {
    let tier_gate = match scope.tier_filter {
        TierFilter::MasterPlus => format!("\n    WHERE l.tier IN ({})", master_plus_list()),
        TierFilter::Any => String::new(),
    };

    format!(
        r#"{prefix}_latest AS (
    SELECT DISTINCT ON (s.account_id)
        s.account_id,
        a.player_id,
        s.tier,
        s.league_points
    FROM daily_snapshots s
    JOIN accounts a ON a.id = s.account_id
    WHERE s.snapshot_date BETWEEN ${start} AND ${end}
    ORDER BY s.account_id, {order}
),
{prefix}_best AS (
    SELECT DISTINCT ON (l.player_id)
        l.player_id,
        l.account_id,
        l.tier,
        ({lp})::BIGINT AS lp
    FROM {prefix}_latest l{tier_gate}
    ORDER BY l.player_id, {rank} ASC, l.league_points DESC NULLS LAST, l.account_id ASC
)"#,
        start = scope.start_param,
        end = scope.end_param,
        order = scope.reference.snapshot_order(),
        lp = zeroed_lp("l.tier", "l.league_points"),
        rank = tier_priority_case("l.tier"),
    )
}

/// Emit `<prefix>_totals`: window sums of games/wins/duration for each
/// player's best account, alongside its (already zeroed) LP.
pub fn account_totals_cte(prefix: &str, start_param: usize, end_param: usize) -> String {
    format!(
        r#"{prefix}_totals AS (
    SELECT
        b.player_id,
        b.account_id,
        b.lp,
        COALESCE(SUM(s.games_played), 0)::BIGINT AS games,
        COALESCE(SUM(s.wins), 0)::BIGINT AS wins,
        COALESCE(SUM(s.game_duration), 0)::BIGINT AS duration
    FROM {prefix}_best b
    LEFT JOIN daily_snapshots s
        ON s.account_id = b.account_id
        AND s.snapshot_date BETWEEN ${start} AND ${end}
    GROUP BY b.player_id, b.account_id, b.lp
)"#,
        start = start_param,
        end = end_param,
    )
}

/// Ordering used to rank a team's roster before the top-5 cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterRank {
    /// Leaderboard team LP: highest-LP players contribute.
    Lp,
    /// Grinders team mode: highest-games players contribute.
    Games,
    /// History team mode: LP first, games as the secondary key.
    LpThenGames,
}

impl RosterRank {
    fn order_expr(self) -> &'static str {
        match self {
            RosterRank::Lp => "tt.lp DESC, tt.player_id ASC",
            RosterRank::Games => "tt.games DESC, tt.player_id ASC",
            RosterRank::LpThenGames => "tt.lp DESC, tt.games DESC, tt.player_id ASC",
        }
    }
}

/// Emit `<prefix>_roster`: per-player totals joined to active contracts,
/// ranked within each team. `role_clause` must already be validated.
pub fn team_roster_cte(prefix: &str, rank: RosterRank, role_clause: Option<&str>) -> String {
    let rank_order = rank.order_expr();
    let role_filter = role_clause
        .map(|clause| format!("\n        AND {clause}"))
        .unwrap_or_default();

    format!(
        r#"{prefix}_roster AS (
    SELECT
        c.team_id,
        tt.player_id,
        tt.lp,
        tt.games,
        tt.wins,
        tt.duration,
        ROW_NUMBER() OVER (
            PARTITION BY c.team_id
            ORDER BY {rank_order}
        ) AS team_rank
    FROM {prefix}_totals tt
    JOIN contracts c
        ON c.player_id = tt.player_id
        AND c.end_date IS NULL{role_filter}
)"#
    )
}

/// Emit `<prefix>_teams`: roster sums per team. When `capped`, only the top
/// five ranked players contribute to any of the sums.
pub fn team_agg_cte(prefix: &str, capped: bool) -> String {
    let cap = if capped {
        format!("\n    WHERE r.team_rank <= {TOP_N_PER_TEAM}")
    } else {
        String::new()
    };

    format!(
        r#"{prefix}_teams AS (
    SELECT
        r.team_id,
        SUM(r.games)::BIGINT AS total_games,
        SUM(r.wins)::BIGINT AS total_wins,
        SUM(r.duration)::BIGINT AS total_duration,
        COALESCE(SUM(r.lp), 0)::BIGINT AS total_lp
    FROM {prefix}_roster r{cap}
    GROUP BY r.team_id
)"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(tier_filter: TierFilter, reference: ReferencePoint) -> BestAccountScope {
        BestAccountScope {
            start_param: 1,
            end_param: 2,
            tier_filter,
            reference,
        }
    }

    #[test]
    fn test_param_slots_sequential() {
        let mut slots = ParamSlots::new();
        assert_eq!(slots.next(), 1);
        assert_eq!(slots.reserve(3), 2);
        assert_eq!(slots.next(), 5);
    }

    #[test]
    fn test_tier_case_covers_all_tiers() {
        let case = tier_priority_case("l.tier");
        for tier in Tier::ALL {
            assert!(case.contains(&format!("WHEN '{}' THEN {}", tier.as_str(), tier.priority())));
        }
        assert!(case.ends_with("ELSE 11 END"));
    }

    #[test]
    fn test_zeroed_lp_lists_master_plus_only() {
        let lp = zeroed_lp("l.tier", "l.league_points");
        assert!(lp.contains("'CHALLENGER', 'GRANDMASTER', 'MASTER'"));
        assert!(!lp.contains("'DIAMOND'"));
        assert!(lp.contains("ELSE 0"));
    }

    #[test]
    fn test_master_plus_gate_presence() {
        let restricted = best_account_ctes("cur", &scope(TierFilter::MasterPlus, ReferencePoint::LatestInWindow));
        assert!(restricted.contains("WHERE l.tier IN ('CHALLENGER', 'GRANDMASTER', 'MASTER')"));

        let open = best_account_ctes("cur", &scope(TierFilter::Any, ReferencePoint::LatestInWindow));
        assert!(!open.contains("WHERE l.tier IN"));
        // LP zeroing still applies on the open path.
        assert!(open.contains("ELSE 0 END)::BIGINT AS lp"));
    }

    #[test]
    fn test_reference_point_ordering() {
        let start = best_account_ctes("win", &scope(TierFilter::Any, ReferencePoint::Start));
        assert!(start.contains("s.snapshot_date ASC, s.created_at ASC"));

        let end = best_account_ctes("win", &scope(TierFilter::Any, ReferencePoint::End));
        assert!(end.contains("s.snapshot_date DESC, s.created_at DESC"));
    }

    #[test]
    fn test_deterministic_tie_break() {
        let sql = best_account_ctes("cur", &scope(TierFilter::Any, ReferencePoint::LatestInWindow));
        // Tier priority, then LP descending with nulls last, then account id.
        assert!(sql.contains("ASC, l.league_points DESC NULLS LAST, l.account_id ASC"));
        assert!(sql.contains("DISTINCT ON (l.player_id)"));
    }

    #[test]
    fn test_param_numbering_flows_through() {
        let sql = best_account_ctes(
            "prev",
            &BestAccountScope {
                start_param: 3,
                end_param: 4,
                tier_filter: TierFilter::MasterPlus,
                reference: ReferencePoint::LatestInWindow,
            },
        );
        assert!(sql.contains("BETWEEN $3 AND $4"));
        assert_eq!(account_totals_cte("prev", 3, 4).matches("BETWEEN $3 AND $4").count(), 1);
    }

    #[test]
    fn test_team_agg_top_five_cap() {
        let capped = team_agg_cte("cur", true);
        assert!(capped.contains("WHERE r.team_rank <= 5"));

        let uncapped = team_agg_cte("delta", false);
        assert!(!uncapped.contains("team_rank <= 5"));
    }

    #[test]
    fn test_roster_rank_orders() {
        let by_lp = team_roster_cte("cur", RosterRank::Lp, None);
        assert!(by_lp.contains("ORDER BY tt.lp DESC, tt.player_id ASC"));

        let by_games = team_roster_cte("cur", RosterRank::Games, None);
        assert!(by_games.contains("ORDER BY tt.games DESC, tt.player_id ASC"));

        let by_both = team_roster_cte("day", RosterRank::LpThenGames, None);
        assert!(by_both.contains("ORDER BY tt.lp DESC, tt.games DESC, tt.player_id ASC"));
    }

    #[test]
    fn test_roster_role_clause_spliced() {
        let sql = team_roster_cte("cur", RosterRank::Lp, Some("c.role IN ($5, $6)"));
        assert!(sql.contains("AND c.role IN ($5, $6)"));
    }
}
