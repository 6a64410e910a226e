//! SQL fragment allow-listing.
//!
//! Every dynamically assembled fragment (IN clauses, HAVING predicates,
//! ORDER BY targets, sort directions) passes through this gate before it is
//! spliced into a statement. Values themselves always travel as `$n` binds;
//! the validator exists as defense-in-depth for the fragment *text*.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised while building or validating query fragments.
///
/// `InvalidCondition` is deliberately generic: the offending fragment is
/// logged for audit but never surfaced to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid filter condition")]
    InvalidCondition,

    #[error("cannot build an IN clause from an empty value list")]
    EmptyValueList,

    #[error("unknown sort option")]
    UnknownSortOption,

    #[error("unknown sort direction")]
    UnknownSortDirection,
}

/// Shapes a generated fragment is allowed to take, after whitespace
/// normalization. Anything else is rejected.
static FILTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // column IN ($1, $2, ...)
        r"^[a-z_]+(\.[a-z_]+)? IN \(\$\d+(, \$\d+)*\)$",
        // column <op> $n
        r"^[a-z_]+(\.[a-z_]+)? (=|<>|>=|<=|>|<) \$\d+$",
        // COALESCE(column, 0) >= $n  (post-aggregation min-games predicate)
        r"^COALESCE\([a-z_]+(\.[a-z_]+)?, 0\) >= \$\d+$",
        // SUM(column) >= $n
        r"^SUM\([a-z_]+(\.[a-z_]+)?\) >= \$\d+$",
        // (column ILIKE $n OR column ILIKE $n)  (free-text search)
        r"^\([a-z_]+\.[a-z_]+ ILIKE \$\d+ OR [a-z_]+\.[a-z_]+ ILIKE \$\d+\)$",
        // column BETWEEN $n AND $m
        r"^[a-z_]+(\.[a-z_]+)? BETWEEN \$\d+ AND \$\d+$",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("static filter pattern"))
    .collect()
});

/// Columns the IN-clause builder may reference.
const IN_CLAUSE_COLUMNS: &[&str] = &[
    "t.league_id",
    "t.id",
    "c.role",
    "p.id",
    "a.player_id",
    "c.team_id",
];

/// Columns the min-games predicate may reference.
const MIN_GAMES_COLUMNS: &[&str] = &["cur.total_games", "cur.games", "total_games"];

const LOG_TRUNCATE: usize = 120;

fn normalize(fragment: &str) -> String {
    fragment.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncated(fragment: &str) -> &str {
    let end = fragment
        .char_indices()
        .nth(LOG_TRUNCATE)
        .map(|(i, _)| i)
        .unwrap_or(fragment.len());
    &fragment[..end]
}

/// Validate a generated SQL fragment against the allow-list.
///
/// Rejected fragments are logged (truncated) for audit; the caller only sees
/// the generic error.
pub fn validate_filter_condition(fragment: &str) -> Result<(), FilterError> {
    let normalized = normalize(fragment);
    if FILTER_PATTERNS.iter().any(|p| p.is_match(&normalized)) {
        return Ok(());
    }
    warn!(
        fragment = truncated(&normalized),
        "rejected filter condition"
    );
    Err(FilterError::InvalidCondition)
}

/// Build `column IN ($first, $first+1, ...)` with one placeholder per value.
///
/// The column must be on the fixed allow-list and the value list non-empty.
/// The produced fragment is re-validated before being returned.
pub fn build_in_clause(
    column: &str,
    value_count: usize,
    first_param: usize,
) -> Result<String, FilterError> {
    if value_count == 0 {
        return Err(FilterError::EmptyValueList);
    }
    if !IN_CLAUSE_COLUMNS.contains(&column) {
        warn!(column = truncated(column), "rejected IN-clause column");
        return Err(FilterError::InvalidCondition);
    }

    let placeholders: Vec<String> = (0..value_count)
        .map(|i| format!("${}", first_param + i))
        .collect();
    let fragment = format!("{} IN ({})", column, placeholders.join(", "));
    validate_filter_condition(&fragment)?;
    Ok(fragment)
}

/// Build the post-aggregation minimum-games predicate.
pub fn build_min_games_clause(column: &str, param: usize) -> Result<String, FilterError> {
    if !MIN_GAMES_COLUMNS.contains(&column) {
        warn!(column = truncated(column), "rejected min-games column");
        return Err(FilterError::InvalidCondition);
    }
    let fragment = format!("COALESCE({}, 0) >= ${}", column, param);
    validate_filter_condition(&fragment)?;
    Ok(fragment)
}

/// Build a case-insensitive substring search over two columns, binding the
/// same pattern parameter twice.
pub fn build_search_clause(
    column_a: &str,
    column_b: &str,
    param: usize,
) -> Result<String, FilterError> {
    let fragment = format!(
        "({} ILIKE ${} OR {} ILIKE ${})",
        column_a, param, column_b, param
    );
    validate_filter_condition(&fragment)?;
    Ok(fragment)
}

/// Leaderboard sort keys, mapped through a fixed whitelist, so user input never
/// reaches the ORDER BY clause directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardSort {
    Games,
    Winrate,
    Lp,
}

impl LeaderboardSort {
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        match s {
            "games" => Ok(LeaderboardSort::Games),
            "winrate" => Ok(LeaderboardSort::Winrate),
            "lp" => Ok(LeaderboardSort::Lp),
            _ => Err(FilterError::UnknownSortOption),
        }
    }

    /// The whitelisted ORDER BY target (all leaderboard sorts are descending).
    pub fn order_clause(self) -> &'static str {
        match self {
            LeaderboardSort::Games => "total_games DESC",
            LeaderboardSort::Winrate => "winrate DESC",
            LeaderboardSort::Lp => "total_lp DESC",
        }
    }
}

/// Sort direction for top-mover queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(FilterError::UnknownSortDirection),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn invert(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_clause_round_trip() {
        let fragment = build_in_clause("t.league_id", 3, 5).unwrap();
        assert_eq!(fragment, "t.league_id IN ($5, $6, $7)");
        assert!(validate_filter_condition(&fragment).is_ok());
    }

    #[test]
    fn test_in_clause_empty_values() {
        assert_eq!(
            build_in_clause("t.league_id", 0, 1),
            Err(FilterError::EmptyValueList)
        );
    }

    #[test]
    fn test_in_clause_unlisted_column() {
        assert_eq!(
            build_in_clause("pg_catalog.pg_tables", 1, 1),
            Err(FilterError::InvalidCondition)
        );
    }

    #[test]
    fn test_injection_rejected() {
        assert_eq!(
            validate_filter_condition("t.team_id IN ($1,$2); DROP TABLE teams"),
            Err(FilterError::InvalidCondition)
        );
        assert_eq!(
            validate_filter_condition("1=1 OR TRUE"),
            Err(FilterError::InvalidCondition)
        );
        // Literal values instead of placeholders are not allowed either.
        assert_eq!(
            validate_filter_condition("t.league_id IN (1, 2)"),
            Err(FilterError::InvalidCondition)
        );
    }

    #[test]
    fn test_whitespace_normalization() {
        assert!(validate_filter_condition("t.league_id   IN \n  ($1, $2)").is_ok());
    }

    #[test]
    fn test_min_games_clause() {
        let fragment = build_min_games_clause("cur.total_games", 7).unwrap();
        assert_eq!(fragment, "COALESCE(cur.total_games, 0) >= $7");
        assert_eq!(
            build_min_games_clause("cur.total_games; --", 7),
            Err(FilterError::InvalidCondition)
        );
    }

    #[test]
    fn test_search_clause() {
        let fragment = build_search_clause("t.name", "t.short_name", 4).unwrap();
        assert_eq!(fragment, "(t.name ILIKE $4 OR t.short_name ILIKE $4)");
    }

    #[test]
    fn test_search_clause_bad_column() {
        assert_eq!(
            build_search_clause("t.name; DROP TABLE teams", "t.short_name", 4),
            Err(FilterError::InvalidCondition)
        );
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(
            LeaderboardSort::parse("lp").unwrap().order_clause(),
            "total_lp DESC"
        );
        assert_eq!(
            LeaderboardSort::parse("wins"),
            Err(FilterError::UnknownSortOption)
        );
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::parse("asc").unwrap().as_sql(), "ASC");
        assert_eq!(SortDirection::parse("desc").unwrap().invert(), SortDirection::Asc);
        assert_eq!(
            SortDirection::parse("sideways"),
            Err(FilterError::UnknownSortDirection)
        );
    }
}
