use crate::model::{
    constants::{
        DEFAULT_CS_PER_MIN, DEFAULT_DAMAGE_PER_MIN, DEFAULT_GOLD_PER_MIN, DEFAULT_KDA, DEFAULT_OBJECTIVES,
        DEFAULT_VISION_PER_MIN, SHRINKAGE_K, STDDEV_FACTOR, STDDEV_FLOOR
    },
    structures::{role::Role, stat_totals::StatTotals}
};

/// Expected value and spread for one stat in one champion/role/tier/patch/
/// duration context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatBaseline {
    pub mean: f64,
    pub stddev: f64
}

impl StatBaseline {
    fn from_mean(mean: f64) -> StatBaseline {
        StatBaseline {
            mean,
            stddev: heuristic_stddev(mean)
        }
    }

    pub fn z_score(&self, observed: f64) -> f64 {
        (observed - self.mean) / self.stddev
    }
}

/// Empirical-Bayes blend of a sparse matchup mean toward the champion-wide
/// mean: `alpha = n / (n + k)`. With n = 0 this is exactly the champion
/// mean; as n grows the matchup mean dominates.
pub fn shrink_mean(sample_mean: f64, global_mean: f64, n: i64, k: f64) -> f64 {
    if n <= 0 {
        return global_mean;
    }
    let alpha = n as f64 / (n as f64 + k);
    alpha * sample_mean + (1.0 - alpha) * global_mean
}

/// Placeholder spread where no variance estimate exists. The squared-share
/// sums accumulated alongside the aggregates can eventually provide sample
/// variance; until then every consumer goes through this one function.
pub fn heuristic_stddev(mean: f64) -> f64 {
    (mean * STDDEV_FACTOR).max(STDDEV_FLOOR)
}

/// Complete baseline set backing one participant's score. Resolution order
/// per stat: shrunk matchup mean when matchup rows exist, champion-wide mean
/// otherwise, hardcoded defaults when there is no data at all.
#[derive(Debug, Clone)]
pub struct BaselineSet {
    pub kda: StatBaseline,
    pub damage_share: StatBaseline,
    pub damage_per_min: StatBaseline,
    pub gold_share: StatBaseline,
    pub gold_per_min: StatBaseline,
    pub cs_per_min: StatBaseline,
    pub vision_per_min: StatBaseline,
    pub objectives: StatBaseline,
    pub utility: StatBaseline,
    /// Historical win rate of this exact matchup, for the difficulty factor.
    pub matchup_win_rate: Option<f64>,
    /// Matchup matches backing the shrinkage, surfaced for confidence
    /// display.
    pub sample_size: i64
}

impl BaselineSet {
    pub fn resolve(champion: Option<&StatTotals>, matchup: Option<&StatTotals>, role: Option<Role>) -> BaselineSet {
        let champion = champion.filter(|c| c.matches > 0);
        let matchup = matchup.filter(|m| m.matches > 0);
        let n = matchup.map(|m| m.matches).unwrap_or(0);

        let blended = |pick: &dyn Fn(&StatTotals) -> f64, default: f64| -> StatBaseline {
            let global = champion.map(pick).unwrap_or(default);
            let sample = matchup.map(pick).unwrap_or(global);
            StatBaseline::from_mean(shrink_mean(sample, global, n, SHRINKAGE_K))
        };

        // Per-minute damage/gold rates deliberately stay champion-wide; the
        // matchup signal goes through the share baselines.
        let damage_per_min = StatBaseline::from_mean(
            champion
                .map(StatTotals::damage_per_min)
                .unwrap_or(DEFAULT_DAMAGE_PER_MIN)
        );
        let gold_per_min = StatBaseline::from_mean(
            champion
                .map(StatTotals::gold_per_min)
                .unwrap_or(DEFAULT_GOLD_PER_MIN)
        );

        let objectives = {
            let mut baseline = blended(&StatTotals::objectives_mean, DEFAULT_OBJECTIVES);
            if baseline.mean == 0.0 {
                baseline = StatBaseline::from_mean(DEFAULT_OBJECTIVES);
            }
            baseline
        };

        // Utility has no aggregate counter; the expectation is role-shaped
        // with a wider spread.
        let utility_mean = match role {
            Some(Role::Support) | Some(Role::Jungle) => 10.0,
            Some(Role::Top) | Some(Role::Mid) => 5.0,
            _ => 2.0
        };
        let utility = StatBaseline {
            mean: utility_mean,
            stddev: utility_mean * 0.5
        };

        BaselineSet {
            kda: blended(&StatTotals::kda_mean, DEFAULT_KDA),
            damage_share: blended(&StatTotals::damage_share_mean, 0.2),
            damage_per_min,
            gold_share: blended(&StatTotals::gold_share_mean, 0.2),
            gold_per_min,
            cs_per_min: blended(&StatTotals::cs_per_min, DEFAULT_CS_PER_MIN),
            vision_per_min: blended(&StatTotals::vision_per_min, DEFAULT_VISION_PER_MIN),
            objectives,
            utility,
            matchup_win_rate: matchup.and_then(StatTotals::win_rate),
            sample_size: n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{heuristic_stddev, shrink_mean, BaselineSet, StatBaseline};
    use crate::model::structures::{role::Role, stat_totals::StatTotals};
    use approx::assert_abs_diff_eq;

    fn champion_totals() -> StatTotals {
        StatTotals {
            matches: 100,
            wins: 50,
            total_kills: 600,
            total_deaths: 400,
            total_assists: 500,
            total_damage: 3_000_000,
            total_gold: 1_800_000,
            total_cs: 30_000,
            total_vision: 4_000,
            total_duration: 100 * 1800,
            total_damage_share: 25.0,
            total_gold_share: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_shrinkage_limits() {
        // No matchup samples: exactly the champion mean.
        assert_abs_diff_eq!(shrink_mean(9.0, 3.0, 0, 10.0), 3.0);

        // Large n converges to the matchup mean.
        let blended = shrink_mean(9.0, 3.0, 1_000_000, 10.0);
        assert_abs_diff_eq!(blended, 9.0, epsilon = 1e-3);

        // n = k sits exactly halfway.
        assert_abs_diff_eq!(shrink_mean(9.0, 3.0, 10, 10.0), 6.0);
    }

    #[test]
    fn test_heuristic_stddev_floor() {
        assert_abs_diff_eq!(heuristic_stddev(10.0), 4.0);
        assert_abs_diff_eq!(heuristic_stddev(0.0), 0.1);
        assert_abs_diff_eq!(heuristic_stddev(0.1), 0.1);
    }

    #[test]
    fn test_resolve_without_any_data_uses_defaults() {
        let set = BaselineSet::resolve(None, None, Some(Role::Mid));

        assert_abs_diff_eq!(set.kda.mean, 3.0);
        assert_abs_diff_eq!(set.damage_per_min.mean, 600.0);
        assert_abs_diff_eq!(set.gold_per_min.mean, 400.0);
        assert_abs_diff_eq!(set.cs_per_min.mean, 6.0);
        assert_abs_diff_eq!(set.objectives.mean, 2.0);
        assert_abs_diff_eq!(set.utility.mean, 5.0);
        assert_eq!(set.sample_size, 0);
        assert!(set.matchup_win_rate.is_none());
    }

    #[test]
    fn test_resolve_prefers_shrunk_matchup_mean() {
        let champion = champion_totals();
        let matchup = StatTotals {
            matches: 10,
            wins: 3,
            total_damage_share: 4.0, // 0.4 per match, well above champion's 0.25
            total_duration: 10 * 1800,
            ..Default::default()
        };

        let set = BaselineSet::resolve(Some(&champion), Some(&matchup), Some(Role::Mid));

        // alpha = 10/20 = 0.5 -> halfway between 0.4 and 0.25.
        assert_abs_diff_eq!(set.damage_share.mean, 0.325, epsilon = 1e-9);
        assert_eq!(set.sample_size, 10);
        assert_abs_diff_eq!(set.matchup_win_rate.unwrap(), 0.3);
    }

    #[test]
    fn test_zero_matchup_rows_equals_champion_mean() {
        let champion = champion_totals();
        let set_with = BaselineSet::resolve(Some(&champion), None, Some(Role::Mid));
        let empty = StatTotals::default();
        let set_empty = BaselineSet::resolve(Some(&champion), Some(&empty), Some(Role::Mid));

        assert_abs_diff_eq!(set_with.damage_share.mean, set_empty.damage_share.mean);
        assert_abs_diff_eq!(set_with.kda.mean, set_empty.kda.mean);
    }

    #[test]
    fn test_z_score() {
        let baseline = StatBaseline {
            mean: 10.0,
            stddev: 2.0
        };
        assert_abs_diff_eq!(baseline.z_score(14.0), 2.0);
        assert_abs_diff_eq!(baseline.z_score(6.0), -2.0);
    }
}
