use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumIter;

/// Competitive tier, used as a segmentation key for baselines and as the
/// coarse component of the leaderboard sort value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
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
    Iron
}

impl Tier {
    /// Sort weight: lower is better. Unknown tiers sort last (99).
    fn sort_value(&self) -> i64 {
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
            Tier::Iron => 10
        }
    }

    pub fn as_str(&self) -> &'static str {
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
            Tier::Iron => "IRON"
        }
    }

    /// Apex tiers have no divisions and are crawled by the tier scan job.
    pub fn is_apex(&self) -> bool {
        matches!(self, Tier::Challenger | Tier::Grandmaster | Tier::Master)
    }
}

impl FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHALLENGER" => Ok(Tier::Challenger),
            "GRANDMASTER" => Ok(Tier::Grandmaster),
            "MASTER" => Ok(Tier::Master),
            "DIAMOND" => Ok(Tier::Diamond),
            "EMERALD" => Ok(Tier::Emerald),
            "PLATINUM" => Ok(Tier::Platinum),
            "GOLD" => Ok(Tier::Gold),
            "SILVER" => Ok(Tier::Silver),
            "BRONZE" => Ok(Tier::Bronze),
            "IRON" => Ok(Tier::Iron),
            _ => Err(())
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Division within a tier ("I".."IV"). Apex tiers are always division I.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    I,
    II,
    III,
    IV
}

impl Division {
    fn sort_value(&self) -> i64 {
        match self {
            Division::I => 1,
            Division::II => 2,
            Division::III => 3,
            Division::IV => 4
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Division::I => "I",
            Division::II => "II",
            Division::III => "III",
            Division::IV => "IV"
        }
    }
}

impl FromStr for Division {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(Division::I),
            "II" => Ok(Division::II),
            "III" => Ok(Division::III),
            "IV" => Ok(Division::IV),
            _ => Err(())
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes (tier, division, LP) into a single sortable value where a lower
/// value means a higher rank. LP is subtracted so that more points sort
/// first within the same division; the 5000 offset keeps apex LP (which can
/// exceed 1000) from going negative across tier boundaries.
pub fn rank_value(tier: Option<Tier>, division: Option<Division>, league_points: i32) -> i64 {
    let tier_value = tier.map(|t| t.sort_value()).unwrap_or(99);
    let division_value = division.map(|d| d.sort_value()).unwrap_or(5);

    tier_value * 1_000_000 + division_value * 10_000 + (5000 - league_points as i64)
}

#[cfg(test)]
mod tests {
    use super::{rank_value, Division, Tier};
    use std::str::FromStr;

    #[test]
    fn test_parse() {
        assert_eq!(Tier::from_str("CHALLENGER"), Ok(Tier::Challenger));
        assert_eq!(Tier::from_str("IRON"), Ok(Tier::Iron));
        assert!(Tier::from_str("WOOD").is_err());
        assert_eq!(Division::from_str("IV"), Ok(Division::IV));
    }

    #[test]
    fn test_rank_value_orders_tiers() {
        // A Challenger with 900 LP outranks a Grandmaster with 1200 LP.
        let challenger = rank_value(Some(Tier::Challenger), Some(Division::I), 900);
        let grandmaster = rank_value(Some(Tier::Grandmaster), Some(Division::I), 1200);
        assert!(challenger < grandmaster);
    }

    #[test]
    fn test_rank_value_orders_lp_within_division() {
        let high_lp = rank_value(Some(Tier::Gold), Some(Division::II), 75);
        let low_lp = rank_value(Some(Tier::Gold), Some(Division::II), 20);
        assert!(high_lp < low_lp);
    }

    #[test]
    fn test_rank_value_unranked_sorts_last() {
        let iron = rank_value(Some(Tier::Iron), Some(Division::IV), 0);
        let unranked = rank_value(None, None, 0);
        assert!(iron < unranked);
    }
}
