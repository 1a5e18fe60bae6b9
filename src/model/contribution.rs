/// Simplified logistic win-probability model. The weights are heuristic
/// estimates over share/vision/KDA features; the model is only ever read as
/// a *difference* between a player and their baseline, so the bias cancels
/// out of everything except the sigmoid curvature.
#[derive(Debug, Clone, Copy)]
pub struct WinModelInput {
    pub gold_share: f64,
    pub damage_share: f64,
    pub vision_per_min: f64,
    pub kda: f64,
    pub csd15: f64,
    pub gd15: f64
}

const W_GOLD_SHARE: f64 = 2.5;
const W_DAMAGE_SHARE: f64 = 2.0;
const W_VISION_PER_MIN: f64 = 0.5;
const W_KDA: f64 = 0.8;
const W_CSD15: f64 = 0.02;
const W_GD15: f64 = 0.0005;
const BIAS: f64 = -2.0;

/// KDA is capped before entering the model so one stomp game cannot skew
/// the linear term.
const KDA_CAP: f64 = 10.0;

pub fn predict_win_probability(input: &WinModelInput) -> f64 {
    let log_odds = BIAS
        + input.gold_share * W_GOLD_SHARE
        + input.damage_share * W_DAMAGE_SHARE
        + input.vision_per_min * W_VISION_PER_MIN
        + input.kda.min(KDA_CAP) * W_KDA
        + input.csd15 * W_CSD15
        + input.gd15 * W_GD15;

    1.0 / (1.0 + (-log_odds).exp())
}

/// Marginal win-probability contribution: how much likelier a win was with
/// this performance than with the baseline performance. Positive means the
/// player pulled their team up.
pub fn marginal_contribution(player: &WinModelInput, baseline: &WinModelInput) -> f64 {
    predict_win_probability(player) - predict_win_probability(baseline)
}
