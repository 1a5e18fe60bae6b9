use crate::api::api_structs::{ParticipantDto, TimelineDto};
use crate::model::constants::{
    DEATH_EARLY_END_MIN, DEATH_MID_END_MIN, DEATH_WEIGHT_EARLY, DEATH_WEIGHT_LATE, DEATH_WEIGHT_MID
};
use crate::model::scoring::LaneDiffs;
use std::collections::HashMap;

/// Per-participant features derived from the event timeline. When the
/// timeline was not fetched these maps are simply empty and scoring falls
/// back to raw deaths / no lane term.
#[derive(Debug, Clone, Default)]
pub struct TimelineFeatures {
    pub weighted_deaths: HashMap<i32, f64>,
    pub lane_diffs: HashMap<i32, LaneDiffs>
}

impl TimelineFeatures {
    pub fn extract(timeline: &TimelineDto, participants: &[ParticipantDto]) -> TimelineFeatures {
        let mut features = TimelineFeatures::default();

        for event in timeline.events() {
            if event.event_type != "CHAMPION_KILL" {
                continue;
            }
            let Some(victim) = event.victim_id else { continue };

            let minutes = event.timestamp as f64 / 60_000.0;
            let weight = if minutes < DEATH_EARLY_END_MIN {
                DEATH_WEIGHT_EARLY
            } else if minutes < DEATH_MID_END_MIN {
                DEATH_WEIGHT_MID
            } else {
                DEATH_WEIGHT_LATE
            };

            *features.weighted_deaths.entry(victim).or_insert(0.0) += weight;
        }

        if let Some(frame) = timeline.frame_at_15() {
            for p in participants {
                let Some(opponent) = participants
                    .iter()
                    .find(|o| o.team_position == p.team_position && o.team_id != p.team_id && !p.team_position.is_empty())
                else {
                    continue;
                };

                let mine = frame.participant_frames.get(&p.participant_id.to_string());
                let theirs = frame.participant_frames.get(&opponent.participant_id.to_string());

                if let (Some(mine), Some(theirs)) = (mine, theirs) {
                    features.lane_diffs.insert(
                        p.participant_id,
                        LaneDiffs {
                            gd15: (mine.total_gold - theirs.total_gold) as f64,
                            xpd15: (mine.xp - theirs.xp) as f64,
                            csd15: ((mine.minions_killed + mine.jungle_minions_killed)
                                - (theirs.minions_killed + theirs.jungle_minions_killed))
                                as f64
                        }
                    );
                }
            }
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::TimelineFeatures;
    use crate::api::api_structs::TimelineDto;
    use crate::utils::test_utils::generate_participant;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn test_weighted_deaths_by_game_phase() {
        let timeline = TimelineDto::from_value(&json!({
            "info": { "frames": [
                { "timestamp": 0, "events": [
                    { "type": "CHAMPION_KILL", "timestamp": 300_000, "victimId": 1 },
                    { "type": "CHAMPION_KILL", "timestamp": 1_200_000, "victimId": 1 },
                    { "type": "CHAMPION_KILL", "timestamp": 2_100_000, "victimId": 1 },
                    { "type": "CHAMPION_KILL", "timestamp": 400_000, "victimId": 2 }
                ] }
            ] }
        }))
        .unwrap();

        let features = TimelineFeatures::extract(&timeline, &[]);

        // 0.8 early + 1.0 mid + 1.5 late.
        assert_abs_diff_eq!(features.weighted_deaths[&1], 3.3, epsilon = 1e-9);
        assert_abs_diff_eq!(features.weighted_deaths[&2], 0.8);
    }

    #[test]
    fn test_lane_diffs_versus_mirrored_opponent() {
        let timeline = TimelineDto::from_value(&json!({
            "info": { "frames": [
                { "timestamp": 900_000, "participantFrames": {
                    "1": { "totalGold": 5500, "xp": 7200, "minionsKilled": 120, "jungleMinionsKilled": 4 },
                    "6": { "totalGold": 5000, "xp": 7000, "minionsKilled": 100, "jungleMinionsKilled": 0 }
                } }
            ] }
        }))
        .unwrap();

        let mut blue_mid = generate_participant("p1", 1, 100, "Ahri", "MIDDLE");
        let mut red_mid = generate_participant("p6", 6, 200, "Syndra", "MIDDLE");
        blue_mid.win = true;
        red_mid.win = false;

        let features = TimelineFeatures::extract(&timeline, &[blue_mid, red_mid]);

        let diffs = features.lane_diffs[&1];
        assert_abs_diff_eq!(diffs.gd15, 500.0);
        assert_abs_diff_eq!(diffs.xpd15, 200.0);
        assert_abs_diff_eq!(diffs.csd15, 24.0);

        let mirrored = features.lane_diffs[&6];
        assert_abs_diff_eq!(mirrored.gd15, -500.0);
    }
}
