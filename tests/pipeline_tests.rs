//! Cross-module tests driving generated match data through delta
//! computation, baseline resolution and scoring, without a live store.

use rift_processor::model::baselines::BaselineSet;
use rift_processor::model::processor::MatchDeltas;
use rift_processor::model::scoring::{label_best_performers, score_participant, ParticipantSnapshot};
use rift_processor::model::structures::{role::Role, stat_totals::StatTotals, team_side::TeamSide, tier::Tier};
use rift_processor::utils::test_utils::generate_full_match;
use std::collections::HashMap;

fn snapshot_for(match_index: usize, participant_index: usize) -> (ParticipantSnapshot, i32, Option<Role>) {
    let match_ = generate_full_match(&format!("EUW1_{match_index}"), "15.24.1.1", 1850);
    let info = &match_.info;
    let p = &info.participants[participant_index];

    let mut team_damage: HashMap<TeamSide, i64> = HashMap::new();
    let mut team_gold: HashMap<TeamSide, i64> = HashMap::new();
    for participant in &info.participants {
        *team_damage.entry(participant.team_id).or_insert(0) += participant.total_damage_dealt_to_champions;
        *team_gold.entry(participant.team_id).or_insert(0) += participant.gold_earned;
    }

    let role = Role::from_team_position(&p.team_position);
    let snapshot = ParticipantSnapshot {
        role,
        champion_class: None,
        win: p.win,
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        weighted_deaths: None,
        damage_to_champions: p.total_damage_dealt_to_champions,
        gold_earned: p.gold_earned,
        total_cs: p.total_cs(),
        vision_score: p.vision_score,
        cc_seconds: p.time_c_cing_others,
        heals_on_teammates: p.total_heals_on_teammates,
        shields_on_teammates: p.total_damage_shielded_on_teammates,
        team_damage: team_damage[&p.team_id],
        team_gold: team_gold[&p.team_id],
        duration_min: info.game_duration as f64 / 60.0,
        objective_participation: p
            .challenges
            .as_ref()
            .map(|c| c.objective_participation())
            .unwrap_or(0),
        lane: None
    };

    (snapshot, p.champion_id, role)
}

/// Folding several matches into running totals and scoring against the
/// accumulated baselines produces bounded, explainable results.
#[test]
fn test_accumulated_baselines_feed_scoring() {
    // Accumulate champion totals across a handful of identical-shape games.
    let mut champion_totals: HashMap<(i32, Role), StatTotals> = HashMap::new();

    for i in 0..6 {
        let match_ = generate_full_match(&format!("EUW1_{i}"), "15.24.1.1", 1850);
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        for delta in &deltas.participants {
            champion_totals
                .entry((delta.champion_id, delta.role))
                .or_default()
                .add(&delta.totals);
        }
    }

    let (snapshot, champion_id, role) = snapshot_for(0, 2);
    let totals = &champion_totals[&(champion_id, role.unwrap())];
    assert_eq!(totals.matches, 6);

    let baselines = BaselineSet::resolve(Some(totals), None, role);
    let result = score_participant(&snapshot, &baselines);

    assert!(result.score >= 0.0 && result.score <= 100.0);
    // Champion-only baselines carry no matchup confidence.
    assert_eq!(result.sample_size, 0);

    // The generated player replays their own average game, so no axis
    // should sit at an extreme.
    assert!(result.breakdown.kda.abs() < 3.0);
    assert!(result.breakdown.damage.abs() < 3.0);
}

/// Scoring every participant of a match yields one result per player and a
/// winning-team MVP.
#[test]
fn test_full_match_scores_and_honors() {
    let match_ = generate_full_match("EUW1_0", "15.24.1.1", 1850);
    let defaults_by_role: HashMap<Option<Role>, BaselineSet> = match_
        .info
        .participants
        .iter()
        .map(|p| Role::from_team_position(&p.team_position))
        .map(|role| (role, BaselineSet::resolve(None, None, role)))
        .collect();

    let mut entries = Vec::new();
    for index in 0..10 {
        let (snapshot, _, role) = snapshot_for(0, index);
        let result = score_participant(&snapshot, &defaults_by_role[&role]);
        assert!(result.score >= 0.0 && result.score <= 100.0);

        let p = &match_.info.participants[index];
        entries.push((p.puuid.clone(), result.score, p.win, p.gold_earned));
    }
    assert_eq!(entries.len(), 10);

    let (mvp, ace) = label_best_performers(&entries);
    let winners: Vec<&String> = entries.iter().filter(|e| e.2).map(|e| &e.0).collect();
    let losers: Vec<&String> = entries.iter().filter(|e| !e.2).map(|e| &e.0).collect();

    assert!(winners.contains(&&mvp.unwrap()));
    assert!(losers.contains(&&ace.unwrap()));
}

/// Matchup baselines shrink toward the champion mean and converge with
/// sample size, observed end to end through resolution.
#[test]
fn test_matchup_shrinkage_through_resolution() {
    let mut champion = StatTotals::default();
    let mut matchup_small = StatTotals::default();

    for _ in 0..100 {
        champion.add(&StatTotals {
            matches: 1,
            total_damage_share: 0.20,
            total_damage_share_sq: 0.04,
            total_duration: 1800,
            ..Default::default()
        });
    }
    for _ in 0..10 {
        matchup_small.add(&StatTotals {
            matches: 1,
            total_damage_share: 0.40,
            total_damage_share_sq: 0.16,
            total_duration: 1800,
            ..Default::default()
        });
    }

    let none = BaselineSet::resolve(Some(&champion), None, Some(Role::Mid));
    let small = BaselineSet::resolve(Some(&champion), Some(&matchup_small), Some(Role::Mid));

    // k = 10, n = 10: halfway between champion (0.2) and matchup (0.4).
    assert!((none.damage_share.mean - 0.20).abs() < 1e-9);
    assert!((small.damage_share.mean - 0.30).abs() < 1e-9);

    let mut matchup_large = matchup_small.clone();
    for _ in 0..990 {
        matchup_large.add(&StatTotals {
            matches: 1,
            total_damage_share: 0.40,
            total_damage_share_sq: 0.16,
            total_duration: 1800,
            ..Default::default()
        });
    }
    let large = BaselineSet::resolve(Some(&champion), Some(&matchup_large), Some(Role::Mid));
    assert!((large.damage_share.mean - 0.40).abs() < 0.01);
    assert_eq!(large.sample_size, 1000);
}
