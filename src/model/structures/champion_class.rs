use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Champion class tag from the static champion data, used to skew role
/// weights before scoring (an assassin is graded harder on damage than a
/// tank, a tank harder on utility).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChampionClass {
    Mage,
    Assassin,
    Tank,
    Fighter,
    Marksman,
    Support
}

impl FromStr for ChampionClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mage" => Ok(ChampionClass::Mage),
            "Assassin" => Ok(ChampionClass::Assassin),
            "Tank" => Ok(ChampionClass::Tank),
            "Fighter" => Ok(ChampionClass::Fighter),
            "Marksman" => Ok(ChampionClass::Marksman),
            "Support" => Ok(ChampionClass::Support),
            _ => Err(())
        }
    }
}
