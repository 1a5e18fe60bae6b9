use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;

/// Normalized lane assignment for a participant.
///
/// The upstream payload reports `teamPosition` as one of
/// `TOP`, `JUNGLE`, `MIDDLE`, `BOTTOM`, `UTILITY` (or an empty string for
/// malformed games). Everything downstream of ingestion works with this
/// normalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Adc,
    Support
}

impl Role {
    /// Parses the upstream `teamPosition` field. Returns `None` for
    /// unrecognized or missing positions; such participants are excluded
    /// from aggregate updates but keep their player-match link.
    pub fn from_team_position(position: &str) -> Option<Role> {
        match position {
            "TOP" => Some(Role::Top),
            "JUNGLE" => Some(Role::Jungle),
            "MIDDLE" | "MID" => Some(Role::Mid),
            "BOTTOM" | "ADC" => Some(Role::Adc),
            "UTILITY" | "SUPPORT" => Some(Role::Support),
            _ => None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Mid => "MID",
            Role::Adc => "ADC",
            Role::Support => "SUPPORT"
        }
    }

    /// Whether two roles on the same team interact while laning.
    /// Duo aggregates are restricted to these pairings.
    pub fn lanes_with(&self, other: Role) -> bool {
        const PAIRS: [(Role, Role); 3] = [
            (Role::Mid, Role::Jungle),
            (Role::Adc, Role::Support),
            (Role::Top, Role::Jungle),
        ];

        PAIRS
            .iter()
            .any(|(a, b)| (*a == *self && *b == other) || (*b == *self && *a == other))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Role;
    use strum::IntoEnumIterator;

    #[test]
    fn test_parse_upstream_positions() {
        assert_eq!(Role::from_team_position("TOP"), Some(Role::Top));
        assert_eq!(Role::from_team_position("MIDDLE"), Some(Role::Mid));
        assert_eq!(Role::from_team_position("BOTTOM"), Some(Role::Adc));
        assert_eq!(Role::from_team_position("UTILITY"), Some(Role::Support));
        assert_eq!(Role::from_team_position(""), None);
        assert_eq!(Role::from_team_position("Invalid"), None);
    }

    #[test]
    fn test_duo_pairs() {
        assert!(Role::Mid.lanes_with(Role::Jungle));
        assert!(Role::Jungle.lanes_with(Role::Mid));
        assert!(Role::Adc.lanes_with(Role::Support));
        assert!(Role::Top.lanes_with(Role::Jungle));

        assert!(!Role::Top.lanes_with(Role::Mid));
        assert!(!Role::Adc.lanes_with(Role::Jungle));
        assert!(!Role::Support.lanes_with(Role::Support));
    }

    #[test]
    fn test_round_trip() {
        for role in Role::iter() {
            assert_eq!(Role::from_team_position(role.as_str()), Some(role));
        }
    }
}
