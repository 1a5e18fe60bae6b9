use serde::{Deserialize, Serialize};

/// Running counters shared by champion and matchup aggregates. Every field
/// is a pure sum so concurrent folds of different matches commute; means are
/// derived on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTotals {
    pub matches: i64,
    pub wins: i64,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
    pub total_damage: i64,
    pub total_gold: i64,
    pub total_cs: i64,
    pub total_vision: i64,
    /// Summed game duration in seconds, for per-minute rates.
    pub total_duration: i64,
    pub total_damage_share: f64,
    pub total_gold_share: f64,
    pub total_vision_per_min: f64,
    pub total_objective_participation: i64,
    /// Squared shares, kept in lockstep with the shares for a later
    /// sample-variance estimate.
    pub total_damage_share_sq: f64,
    pub total_gold_share_sq: f64
}

impl StatTotals {
    fn minutes(&self) -> f64 {
        (self.total_duration.max(1) as f64) / 60.0
    }

    fn matches_f(&self) -> f64 {
        self.matches.max(1) as f64
    }

    pub fn win_rate(&self) -> Option<f64> {
        if self.matches > 0 {
            Some(self.wins as f64 / self.matches as f64)
        } else {
            None
        }
    }

    /// Mean KDA from per-match averages; a sub-1 average death count is
    /// floored at 1 the same way a single box score's is.
    pub fn kda_mean(&self) -> f64 {
        let kills = self.total_kills as f64 / self.matches_f();
        let deaths = self.total_deaths as f64 / self.matches_f();
        let assists = self.total_assists as f64 / self.matches_f();
        (kills + assists) / deaths.max(1.0)
    }

    pub fn damage_share_mean(&self) -> f64 {
        self.total_damage_share / self.matches_f()
    }

    pub fn gold_share_mean(&self) -> f64 {
        self.total_gold_share / self.matches_f()
    }

    pub fn damage_per_min(&self) -> f64 {
        self.total_damage as f64 / self.minutes()
    }

    pub fn gold_per_min(&self) -> f64 {
        self.total_gold as f64 / self.minutes()
    }

    pub fn cs_per_min(&self) -> f64 {
        self.total_cs as f64 / self.minutes()
    }

    pub fn vision_per_min(&self) -> f64 {
        self.total_vision as f64 / self.minutes()
    }

    pub fn objectives_mean(&self) -> f64 {
        self.total_objective_participation as f64 / self.matches_f()
    }

    /// Counter-wise sum, used when merging a delta into an accumulator.
    pub fn add(&mut self, other: &StatTotals) {
        self.matches += other.matches;
        self.wins += other.wins;
        self.total_kills += other.total_kills;
        self.total_deaths += other.total_deaths;
        self.total_assists += other.total_assists;
        self.total_damage += other.total_damage;
        self.total_gold += other.total_gold;
        self.total_cs += other.total_cs;
        self.total_vision += other.total_vision;
        self.total_duration += other.total_duration;
        self.total_damage_share += other.total_damage_share;
        self.total_gold_share += other.total_gold_share;
        self.total_vision_per_min += other.total_vision_per_min;
        self.total_objective_participation += other.total_objective_participation;
        self.total_damage_share_sq += other.total_damage_share_sq;
        self.total_gold_share_sq += other.total_gold_share_sq;
    }
}

#[cfg(test)]
mod tests {
    use super::StatTotals;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_means() {
        let totals = StatTotals {
            matches: 4,
            wins: 3,
            total_kills: 24,
            total_deaths: 8,
            total_assists: 16,
            total_damage: 80_000,
            total_gold: 48_000,
            total_cs: 800,
            total_vision: 80,
            total_duration: 4 * 1800,
            total_damage_share: 1.0,
            total_gold_share: 0.8,
            ..Default::default()
        };

        assert_abs_diff_eq!(totals.win_rate().unwrap(), 0.75);
        assert_abs_diff_eq!(totals.kda_mean(), (6.0 + 4.0) / 2.0);
        assert_abs_diff_eq!(totals.damage_share_mean(), 0.25);
        assert_abs_diff_eq!(totals.damage_per_min(), 80_000.0 / 120.0);
        assert_abs_diff_eq!(totals.cs_per_min(), 800.0 / 120.0);
    }

    #[test]
    fn test_kda_mean_floors_deaths() {
        let totals = StatTotals {
            matches: 10,
            total_kills: 50,
            total_deaths: 3,
            total_assists: 30,
            ..Default::default()
        };

        // 0.3 average deaths is treated as 1.
        assert_abs_diff_eq!(totals.kda_mean(), 8.0);
    }

    #[test]
    fn test_add_is_counter_wise() {
        let mut a = StatTotals {
            matches: 1,
            wins: 1,
            total_damage_share: 0.3,
            total_damage_share_sq: 0.09,
            ..Default::default()
        };
        let b = StatTotals {
            matches: 1,
            total_damage_share: 0.2,
            total_damage_share_sq: 0.04,
            ..Default::default()
        };

        a.add(&b);
        assert_eq!(a.matches, 2);
        assert_eq!(a.wins, 1);
        assert_abs_diff_eq!(a.total_damage_share, 0.5);
        assert_abs_diff_eq!(a.total_damage_share_sq, 0.13, epsilon = 1e-12);
    }
}
