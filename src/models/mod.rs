//! Core domain vocabulary.
//!
//! Ranked-ladder tiers, roster roles, and league metadata. The snapshot,
//! contract, and roster tables themselves live in the external datastore;
//! this engine only reads them.

use serde::{Deserialize, Serialize};

/// Ranked ladder tiers, highest first.
///
/// The numeric priority drives every best-account selection: lower is
/// better, unknown tiers sort last. Only Master and above carry meaningful
/// league points; everything below contributes LP = 0 to aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Challenger,
    Grandmaster,
    Master,
    Diamond,
    Emerald,
    Platinum,
    Gold,
    Silver,
    Bronze,
    Iron,
}

/// Priority assigned to snapshots with a missing or unrecognized tier.
pub const UNKNOWN_TIER_PRIORITY: u8 = 11;

impl Tier {
    pub const ALL: [Tier; 10] = [
        Tier::Challenger,
        Tier::Grandmaster,
        Tier::Master,
        Tier::Diamond,
        Tier::Emerald,
        Tier::Platinum,
        Tier::Gold,
        Tier::Silver,
        Tier::Bronze,
        Tier::Iron,
    ];

    /// Fixed ranking used by every aggregation: CHALLENGER=1 .. IRON=10.
    pub fn priority(self) -> u8 {
        match self {
            Tier::Challenger => 1,
            Tier::Grandmaster => 2,
            Tier::Master => 3,
            Tier::Diamond => 4,
            Tier::Emerald => 5,
            Tier::Platinum => 6,
            Tier::Gold => 7,
            Tier::Silver => 8,
            Tier::Bronze => 9,
            Tier::Iron => 10,
        }
    }

    /// Whether this tier carries meaningful LP.
    pub fn is_master_plus(self) -> bool {
        matches!(self, Tier::Challenger | Tier::Grandmaster | Tier::Master)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Challenger => "CHALLENGER",
            Tier::Grandmaster => "GRANDMASTER",
            Tier::Master => "MASTER",
            Tier::Diamond => "DIAMOND",
            Tier::Emerald => "EMERALD",
            Tier::Platinum => "PLATINUM",
            Tier::Gold => "GOLD",
            Tier::Silver => "SILVER",
            Tier::Bronze => "BRONZE",
            Tier::Iron => "IRON",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        Tier::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

/// Priority for an optional tier string coming back from the datastore.
pub fn tier_priority(tier: Option<&str>) -> u8 {
    tier.and_then(Tier::parse)
        .map(Tier::priority)
        .unwrap_or(UNKNOWN_TIER_PRIORITY)
}

/// Roster roles a contract can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Adc,
    Support,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Adc, Role::Support];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Mid => "MID",
            Role::Adc => "ADC",
            Role::Support => "SUPPORT",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

/// League metadata used to populate filter dropdowns.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct League {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub region: String,
    pub logo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_priority_order() {
        // Priorities are strictly increasing from best to worst.
        let priorities: Vec<u8> = Tier::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_master_plus_boundary() {
        assert!(Tier::Challenger.is_master_plus());
        assert!(Tier::Grandmaster.is_master_plus());
        assert!(Tier::Master.is_master_plus());
        assert!(!Tier::Diamond.is_master_plus());
        assert!(!Tier::Iron.is_master_plus());
    }

    #[test]
    fn test_tier_parse_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("WOOD"), None);
    }

    #[test]
    fn test_unknown_tier_sorts_last() {
        assert_eq!(tier_priority(None), UNKNOWN_TIER_PRIORITY);
        assert_eq!(tier_priority(Some("UNRANKED")), UNKNOWN_TIER_PRIORITY);
        assert!(tier_priority(Some("IRON")) < tier_priority(None));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("JUNGLE"), Some(Role::Jungle));
        assert_eq!(Role::parse("COACH"), None);
    }
}
