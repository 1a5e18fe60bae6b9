use crate::model::structures::{champion_class::ChampionClass, role::Role};

/// Per-stat weights applied when folding z-scores into one number. One
/// vector per role, element-wise skewed by the champion-class modifiers
/// before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatWeights {
    pub kda: f64,
    pub damage: f64,
    pub gold: f64,
    pub cs: f64,
    pub vision: f64,
    pub objective: f64,
    pub utility: f64
}

impl StatWeights {
    pub fn total(&self) -> f64 {
        self.kda + self.damage + self.gold + self.cs + self.vision + self.objective + self.utility
    }

    pub fn apply_modifiers(&self, modifiers: &StatWeights) -> StatWeights {
        StatWeights {
            kda: self.kda * modifiers.kda,
            damage: self.damage * modifiers.damage,
            gold: self.gold * modifiers.gold,
            cs: self.cs * modifiers.cs,
            vision: self.vision * modifiers.vision,
            objective: self.objective * modifiers.objective,
            utility: self.utility * modifiers.utility
        }
    }
}

pub fn role_weights(role: Option<Role>) -> StatWeights {
    match role {
        Some(Role::Top) => StatWeights {
            damage: 0.20,
            gold: 0.15,
            cs: 0.15,
            kda: 0.15,
            vision: 0.10,
            objective: 0.10,
            utility: 0.15
        },
        Some(Role::Jungle) => StatWeights {
            objective: 0.20,
            kda: 0.15,
            vision: 0.20,
            damage: 0.15,
            gold: 0.10,
            cs: 0.05,
            utility: 0.15
        },
        Some(Role::Mid) => StatWeights {
            damage: 0.25,
            gold: 0.20,
            kda: 0.20,
            cs: 0.15,
            vision: 0.10,
            objective: 0.05,
            utility: 0.05
        },
        Some(Role::Adc) => StatWeights {
            damage: 0.30,
            gold: 0.25,
            cs: 0.20,
            kda: 0.15,
            objective: 0.05,
            vision: 0.05,
            utility: 0.00
        },
        Some(Role::Support) => StatWeights {
            vision: 0.25,
            kda: 0.15,
            objective: 0.15,
            utility: 0.30,
            damage: 0.10,
            gold: 0.05,
            cs: 0.00
        },
        // Unknown role still gets a score, on a generic vector.
        None => StatWeights {
            damage: 0.20,
            gold: 0.20,
            kda: 0.20,
            cs: 0.20,
            vision: 0.10,
            objective: 0.10,
            utility: 0.00
        }
    }
}

const NEUTRAL_MODIFIERS: StatWeights = StatWeights {
    kda: 1.0,
    damage: 1.0,
    gold: 1.0,
    cs: 1.0,
    vision: 1.0,
    objective: 1.0,
    utility: 1.0
};

pub fn class_modifiers(class: Option<ChampionClass>) -> StatWeights {
    match class {
        Some(ChampionClass::Mage) => StatWeights {
            damage: 1.2,
            utility: 0.8,
            ..NEUTRAL_MODIFIERS
        },
        Some(ChampionClass::Assassin) => StatWeights {
            damage: 1.3,
            kda: 1.2,
            utility: 0.5,
            vision: 0.8,
            ..NEUTRAL_MODIFIERS
        },
        Some(ChampionClass::Tank) => StatWeights {
            damage: 0.7,
            utility: 1.5,
            ..NEUTRAL_MODIFIERS
        },
        Some(ChampionClass::Fighter) => StatWeights {
            damage: 1.1,
            utility: 0.9,
            ..NEUTRAL_MODIFIERS
        },
        Some(ChampionClass::Marksman) => StatWeights {
            damage: 1.3,
            gold: 1.2,
            utility: 0.5,
            ..NEUTRAL_MODIFIERS
        },
        Some(ChampionClass::Support) => StatWeights {
            utility: 1.3,
            vision: 1.2,
            damage: 0.7,
            ..NEUTRAL_MODIFIERS
        },
        None => NEUTRAL_MODIFIERS
    }
}

/// Empirical-Bayes shrinkage pseudo-count: a matchup baseline with n samples
/// is weighted n/(n+k) against the champion-wide mean.
pub const SHRINKAGE_K: f64 = 10.0;

/// Every z-score is clamped to this magnitude before aggregation so a single
/// historic stomp cannot dominate the result.
pub const Z_CLAMP: f64 = 3.0;

/// Heuristic stddev when no variance estimate exists: 40% of the baseline,
/// floored. Squared shares are accumulated in the aggregates so real sample
/// variance can replace this later; swapping it shifts score distributions,
/// so it stays explicit.
pub const STDDEV_FACTOR: f64 = 0.4;
pub const STDDEV_FLOOR: f64 = 0.1;

/// Additional weight for the 15-minute lane-differential term.
pub const LANE_WEIGHT: f64 = 0.15;

/// Slope of the logistic normal-CDF approximation.
pub const LOGISTIC_SLOPE: f64 = 1.7;

pub const WIN_BONUS: f64 = 10.0;

/// Matchup-difficulty multiplier bounds.
pub const DIFFICULTY_MIN: f64 = 0.8;
pub const DIFFICULTY_MAX: f64 = 1.2;

/// Bonus granted when the marginal win-probability contribution clears the
/// threshold.
pub const CONTRIBUTION_THRESHOLD: f64 = 0.10;
pub const CONTRIBUTION_BONUS: f64 = 5.0;

// Time-weighted deaths: early deaths are discounted, late deaths punished.
pub const DEATH_WEIGHT_EARLY: f64 = 0.8;
pub const DEATH_WEIGHT_MID: f64 = 1.0;
pub const DEATH_WEIGHT_LATE: f64 = 1.5;
pub const DEATH_EARLY_END_MIN: f64 = 15.0;
pub const DEATH_MID_END_MIN: f64 = 30.0;

// Fallback baselines when no aggregate rows exist at all. A score is always
// produced, just flagged with a zero sample size.
pub const DEFAULT_KDA: f64 = 3.0;
pub const DEFAULT_DAMAGE_PER_MIN: f64 = 600.0;
pub const DEFAULT_GOLD_PER_MIN: f64 = 400.0;
pub const DEFAULT_CS_PER_MIN: f64 = 6.0;
pub const DEFAULT_VISION_PER_MIN: f64 = 1.0;
pub const DEFAULT_OBJECTIVES: f64 = 2.0;

// Fixed spreads for the lane differentials at 15 minutes.
pub const LANE_CS_SPREAD: f64 = 20.0;
pub const LANE_GOLD_SPREAD: f64 = 1000.0;
pub const LANE_XP_SPREAD: f64 = 1000.0;
