use crate::model::{
    baselines::BaselineSet,
    constants::{
        class_modifiers, role_weights, CONTRIBUTION_BONUS, CONTRIBUTION_THRESHOLD, DIFFICULTY_MAX, DIFFICULTY_MIN,
        LANE_CS_SPREAD, LANE_GOLD_SPREAD, LANE_WEIGHT, LANE_XP_SPREAD, LOGISTIC_SLOPE, WIN_BONUS, Z_CLAMP
    },
    contribution::{marginal_contribution, WinModelInput},
    structures::{
        champion_class::ChampionClass,
        grade::{Comparison, Grade},
        role::Role
    }
};
use serde::{Deserialize, Serialize};

/// Gold/cs/xp gap versus the direct role opponent at the 15-minute mark.
/// Only available when the match timeline was fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneDiffs {
    pub gd15: f64,
    pub csd15: f64,
    pub xpd15: f64
}

/// One participant's box score plus the context needed to score it.
#[derive(Debug, Clone)]
pub struct ParticipantSnapshot {
    pub role: Option<Role>,
    pub champion_class: Option<ChampionClass>,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    /// Time-weighted death count from the timeline; raw deaths otherwise.
    pub weighted_deaths: Option<f64>,
    pub damage_to_champions: i64,
    pub gold_earned: i64,
    pub total_cs: i32,
    pub vision_score: i32,
    pub cc_seconds: i64,
    pub heals_on_teammates: i64,
    pub shields_on_teammates: i64,
    pub team_damage: i64,
    pub team_gold: i64,
    pub duration_min: f64,
    pub objective_participation: i32,
    pub lane: Option<LaneDiffs>
}

/// Per-stat z-scores backing the final number, kept for UI explainability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub kda: f64,
    pub damage: f64,
    pub gold: f64,
    pub cs: f64,
    pub vision: f64,
    pub objective: f64,
    pub utility: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<f64>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub grade: Grade,
    pub breakdown: ScoreBreakdown,
    pub comparison: Comparison,
    /// Marginal win-probability contribution relative to baseline.
    pub contribution: f64,
    /// Matchup samples backing the baseline, for confidence display.
    pub sample_size: i64
}

fn clamp_z(z: f64) -> f64 {
    z.clamp(-Z_CLAMP, Z_CLAMP)
}

/// Scores one participant against the resolved baselines. Always produces a
/// result; with no aggregate data the baselines are the hardcoded defaults
/// and `sample_size` is zero.
pub fn score_participant(p: &ParticipantSnapshot, baselines: &BaselineSet) -> ScoreResult {
    let duration = p.duration_min.max(1.0);

    // Derived stats.
    let effective_deaths = p.weighted_deaths.unwrap_or(p.deaths as f64);
    let kda = (p.kills + p.assists) as f64 / effective_deaths.max(1.0);
    let damage_share = p.damage_to_champions as f64 / (p.team_damage.max(1) as f64);
    let damage_per_min = p.damage_to_champions as f64 / duration;
    let gold_share = p.gold_earned as f64 / (p.team_gold.max(1) as f64);
    let gold_per_min = p.gold_earned as f64 / duration;
    let cs_per_min = p.total_cs as f64 / duration;
    let vision_per_min = p.vision_score as f64 / duration;
    let utility = p.cc_seconds as f64 / duration
        + (p.heals_on_teammates + p.shields_on_teammates) as f64 / 1000.0;

    // Z-scores. Damage and gold take the better of share and rate so a
    // stomp (short game, low absolute numbers, huge share) is not punished.
    let z_damage = baselines
        .damage_share
        .z_score(damage_share)
        .max(baselines.damage_per_min.z_score(damage_per_min));
    let z_gold = baselines
        .gold_share
        .z_score(gold_share)
        .max(baselines.gold_per_min.z_score(gold_per_min));

    let breakdown = ScoreBreakdown {
        kda: baselines.kda.z_score(kda),
        damage: z_damage,
        gold: z_gold,
        cs: baselines.cs_per_min.z_score(cs_per_min),
        vision: baselines.vision_per_min.z_score(vision_per_min),
        objective: baselines.objectives.z_score(p.objective_participation as f64),
        utility: baselines.utility.z_score(utility),
        lane: p.lane.map(|l| {
            (l.csd15 / LANE_CS_SPREAD + l.gd15 / LANE_GOLD_SPREAD + l.xpd15 / LANE_XP_SPREAD) / 3.0
        })
    };

    // Weighted aggregation.
    let weights = role_weights(p.role).apply_modifiers(&class_modifiers(p.champion_class));
    let mut raw = clamp_z(breakdown.kda) * weights.kda
        + clamp_z(breakdown.damage) * weights.damage
        + clamp_z(breakdown.gold) * weights.gold
        + clamp_z(breakdown.cs) * weights.cs
        + clamp_z(breakdown.vision) * weights.vision
        + clamp_z(breakdown.objective) * weights.objective
        + clamp_z(breakdown.utility) * weights.utility;
    let mut total_weight = weights.total();

    if let Some(lane_z) = breakdown.lane {
        raw += clamp_z(lane_z) * LANE_WEIGHT;
        total_weight += LANE_WEIGHT;
    }

    if total_weight > 0.0 {
        raw /= total_weight;
    }

    // Logistic approximation of the normal CDF, scaled to 0-100.
    let percentile = 1.0 / (1.0 + (-LOGISTIC_SLOPE * raw).exp());
    let mut score = percentile * 100.0;

    if p.win {
        score += WIN_BONUS;
    }

    // Harder matchups inflate the score earned for the same raw stats.
    if let Some(win_rate) = baselines.matchup_win_rate {
        let difficulty = (0.5 / win_rate.max(0.3)).clamp(DIFFICULTY_MIN, DIFFICULTY_MAX);
        score *= difficulty;
    }

    score = score.clamp(0.0, 100.0);

    let contribution = marginal_contribution(
        &WinModelInput {
            gold_share,
            damage_share,
            vision_per_min,
            kda,
            csd15: 0.0,
            gd15: 0.0
        },
        &WinModelInput {
            gold_share: baselines.gold_share.mean,
            damage_share: baselines.damage_share.mean,
            vision_per_min: baselines.vision_per_min.mean,
            kda: baselines.kda.mean,
            csd15: 0.0,
            gd15: 0.0
        }
    );

    if contribution > CONTRIBUTION_THRESHOLD {
        score += CONTRIBUTION_BONUS;
    }

    let score = score.clamp(0.0, 100.0);

    ScoreResult {
        score,
        grade: Grade::from_score(score),
        breakdown,
        comparison: Comparison::from_score(score),
        contribution,
        sample_size: baselines.sample_size
    }
}

/// Canonical best-performer rule: the highest score on the winning team is
/// the MVP, the highest on the losing team is the ACE. Ties break by gold
/// earned.
pub fn label_best_performers<K: Clone>(entries: &[(K, f64, bool, i64)]) -> (Option<K>, Option<K>) {
    let best_of = |won: bool| {
        entries
            .iter()
            .filter(|(_, _, win, _)| *win == won)
            .max_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.3.cmp(&b.3))
            })
            .map(|(key, _, _, _)| key.clone())
    };

    (best_of(true), best_of(false))
}
