use crate::api::api_structs::MatchDto;
use crate::database::db::{DbClient, DbError};
use crate::database::db_structs::{LeagueSnapshot, MatchRecord, SummonerMatch};
use crate::model::scoring::ScoreResult;
use chrono::{Days, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const HEATMAP_DAYS: u64 = 120;
const TOP_CHAMPIONS: usize = 5;
const TOP_TEAMMATES: usize = 5;
const TEAMMATE_MATCH_WINDOW: usize = 20;
const MIN_SCORES_FOR_BADGE: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ChampionPoolEntry {
    pub champion_id: i32,
    pub champion_name: String,
    pub games: i64,
    pub wins: i64,
    pub losses: i64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub kda: f64,
    pub total_cs: i64,
    pub total_damage: i64
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub games: i64,
    pub wins: i64,
    pub losses: i64,
    /// 0 (empty day) to 4 (many games, high winrate).
    pub intensity: u8
}

#[derive(Debug, Clone, Serialize)]
pub struct TeammateEntry {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
    pub games: i64,
    pub wins: i64,
    pub losses: i64,
    pub winrate: i64
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingPoint {
    pub date: NaiveDate,
    pub tier: String,
    pub division: String,
    pub league_points: i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyBadge {
    RockSolid,
    Coinflip,
    Average
}

impl ConsistencyBadge {
    /// Standard deviation of the last scores: tight spread reads as
    /// dependable, wide spread as coinflip. Needs at least five samples.
    pub fn from_scores(scores: &[f64]) -> ConsistencyBadge {
        if scores.len() < MIN_SCORES_FOR_BADGE {
            return ConsistencyBadge::Average;
        }

        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        if stddev < 8.0 {
            ConsistencyBadge::RockSolid
        } else if stddev > 18.0 {
            ConsistencyBadge::Coinflip
        } else {
            ConsistencyBadge::Average
        }
    }
}

/// Five-axis performance summary plus the consistency badge. Each axis is
/// the mean of that stat's cached z-scores mapped onto a 0-100 scale.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRadar {
    pub combat: f64,
    pub objectives: f64,
    pub vision: f64,
    pub farming: f64,
    pub survival: f64,
    pub consistency: ConsistencyBadge
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileAggregates {
    pub champions: Vec<ChampionPoolEntry>,
    pub heatmap: Vec<HeatmapDay>,
    pub teammates: Vec<TeammateEntry>,
    pub rating_history: Vec<RatingPoint>,
    pub radar: PerformanceRadar
}

fn z_to_scale(z: f64) -> f64 {
    (50.0 + z * 20.0).clamp(0.0, 100.0)
}

/// Derives the read-side profile summaries from already-stored matches and
/// already-computed scores. `links` and `recent_matches` are expected newest
/// first; `today` is injected so the heatmap window is deterministic.
pub fn build_profile(
    puuid: &str,
    links: &[SummonerMatch],
    scores: &HashMap<String, ScoreResult>,
    recent_matches: &[MatchRecord],
    snapshots: &[LeagueSnapshot],
    today: NaiveDate
) -> ProfileAggregates {
    // Champion pool.
    let mut champions: IndexMap<i32, ChampionPoolEntry> = IndexMap::new();
    for link in links {
        let entry = champions.entry(link.champion_id).or_insert_with(|| ChampionPoolEntry {
            champion_id: link.champion_id,
            champion_name: link.champion_name.clone(),
            games: 0,
            wins: 0,
            losses: 0,
            kills: 0,
            deaths: 0,
            assists: 0,
            kda: 0.0,
            total_cs: 0,
            total_damage: 0
        });

        entry.games += 1;
        if link.win {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
        entry.kills += link.kills as i64;
        entry.deaths += link.deaths as i64;
        entry.assists += link.assists as i64;
        entry.total_cs += link.total_cs as i64;
        entry.total_damage += link.damage_to_champions;
    }

    let mut champion_pool: Vec<ChampionPoolEntry> = champions.into_values().collect();
    for entry in &mut champion_pool {
        entry.kda = (entry.kills + entry.assists) as f64 / (entry.deaths.max(1)) as f64;
    }
    champion_pool.sort_by(|a, b| b.games.cmp(&a.games));
    champion_pool.truncate(TOP_CHAMPIONS);

    // Daily activity, accumulated then front-filled over the window.
    let mut daily: HashMap<NaiveDate, (i64, i64, i64)> = HashMap::new();
    for link in links {
        let date = link.game_creation.date_naive();
        let slot = daily.entry(date).or_insert((0, 0, 0));
        slot.0 += 1;
        if link.win {
            slot.1 += 1;
        } else {
            slot.2 += 1;
        }
    }

    let mut heatmap = Vec::with_capacity(HEATMAP_DAYS as usize);
    for back in (0..HEATMAP_DAYS).rev() {
        let date = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        let (games, wins, losses) = daily.get(&date).copied().unwrap_or((0, 0, 0));

        let intensity = if games == 0 {
            0
        } else {
            let winrate = wins as f64 / games as f64;
            if games < 3 {
                if winrate >= 0.5 {
                    2
                } else {
                    1
                }
            } else if winrate < 0.4 {
                2
            } else if winrate <= 0.6 {
                3
            } else {
                4
            }
        };

        heatmap.push(HeatmapDay {
            date,
            games,
            wins,
            losses,
            intensity
        });
    }

    // Frequent teammates over the most recent matches.
    let mut teammates: IndexMap<String, TeammateEntry> = IndexMap::new();
    for record in recent_matches.iter().take(TEAMMATE_MATCH_WINDOW) {
        let Ok(match_) = MatchDto::from_value(&record.payload) else {
            continue;
        };
        let Some(me) = match_.info.participants.iter().find(|p| p.puuid == puuid) else {
            continue;
        };

        for mate in &match_.info.participants {
            if mate.team_id != me.team_id || mate.puuid == me.puuid {
                continue;
            }

            let entry = teammates.entry(mate.puuid.clone()).or_insert_with(|| TeammateEntry {
                puuid: mate.puuid.clone(),
                game_name: mate.riot_id_game_name.clone().unwrap_or_default(),
                tag_line: mate.riot_id_tagline.clone().unwrap_or_default(),
                games: 0,
                wins: 0,
                losses: 0,
                winrate: 0
            });
            entry.games += 1;
            if me.win {
                entry.wins += 1;
            } else {
                entry.losses += 1;
            }
        }
    }

    let mut teammate_list: Vec<TeammateEntry> = teammates.into_values().collect();
    for entry in &mut teammate_list {
        entry.winrate = (entry.wins as f64 / entry.games.max(1) as f64 * 100.0).round() as i64;
    }
    teammate_list.sort_by(|a, b| b.games.cmp(&a.games));
    teammate_list.truncate(TOP_TEAMMATES);

    // Rating history from solo-queue snapshots.
    let rating_history = snapshots
        .iter()
        .filter(|s| s.queue_type == "RANKED_SOLO_5x5")
        .map(|s| RatingPoint {
            date: s.timestamp.date_naive(),
            tier: s.tier.clone(),
            division: s.division.clone(),
            league_points: s.league_points
        })
        .collect();

    // Radar: average cached z-scores, mapped to 0-100.
    let mut sums = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut score_values = Vec::new();
    for link in links {
        if let Some(result) = scores.get(&link.match_id) {
            sums.0 += result.breakdown.damage;
            sums.1 += result.breakdown.objective;
            sums.2 += result.breakdown.vision;
            sums.3 += result.breakdown.cs;
            sums.4 += result.breakdown.kda;
            score_values.push(result.score);
        }
    }

    let radar = if score_values.is_empty() {
        PerformanceRadar {
            combat: 50.0,
            objectives: 50.0,
            vision: 50.0,
            farming: 50.0,
            survival: 50.0,
            consistency: ConsistencyBadge::Average
        }
    } else {
        let n = score_values.len() as f64;
        PerformanceRadar {
            combat: z_to_scale(sums.0 / n),
            objectives: z_to_scale(sums.1 / n),
            vision: z_to_scale(sums.2 / n),
            farming: z_to_scale(sums.3 / n),
            survival: z_to_scale(sums.4 / n),
            consistency: ConsistencyBadge::from_scores(&score_values)
        }
    };

    ProfileAggregates {
        champions: champion_pool,
        heatmap,
        teammates: teammate_list,
        rating_history,
        radar
    }
}

/// Loads a player's stored rows and cached scores and derives the profile
/// view. `version` selects which score-cache generation counts as a hit.
pub async fn load_profile(
    db: &DbClient,
    puuid: &str,
    version: &str,
    today: NaiveDate
) -> Result<ProfileAggregates, DbError> {
    let links = db.get_player_matches(puuid, 60).await?;
    let recent_matches = db.get_match_records_for_player(puuid, TEAMMATE_MATCH_WINDOW as i64).await?;
    let snapshots = db.get_snapshots(puuid).await?;

    let mut scores = HashMap::new();
    for link in &links {
        if let Some(analysis) = db.get_match_analysis(&link.match_id, version).await? {
            if let Some(own) = analysis.results.get(puuid) {
                scores.insert(link.match_id.clone(), own.clone());
            }
        }
    }

    Ok(build_profile(puuid, &links, &scores, &recent_matches, &snapshots, today))
}

#[cfg(test)]
mod tests {
    use super::{build_profile, z_to_scale, ConsistencyBadge};
    use crate::model::scoring::{ScoreBreakdown, ScoreResult};
    use crate::model::structures::grade::{Comparison, Grade};
    use crate::utils::test_utils::generate_summoner_match;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn score_result(score: f64, kda_z: f64) -> ScoreResult {
        ScoreResult {
            score,
            grade: Grade::from_score(score),
            breakdown: ScoreBreakdown {
                kda: kda_z,
                ..Default::default()
            },
            comparison: Comparison::from_score(score),
            contribution: 0.0,
            sample_size: 0
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, n).unwrap()
    }

    #[test]
    fn test_consistency_badge_thresholds() {
        assert_eq!(
            ConsistencyBadge::from_scores(&[50.0, 50.0, 50.0, 50.0, 50.0]),
            ConsistencyBadge::RockSolid
        );
        assert_eq!(
            ConsistencyBadge::from_scores(&[10.0, 90.0, 10.0, 90.0, 10.0]),
            ConsistencyBadge::Coinflip
        );
        assert_eq!(
            ConsistencyBadge::from_scores(&[50.0, 60.0, 40.0, 55.0, 45.0]),
            ConsistencyBadge::Average
        );
        // Too few samples.
        assert_eq!(ConsistencyBadge::from_scores(&[10.0, 90.0]), ConsistencyBadge::Average);
    }

    #[test]
    fn test_z_to_scale_clamps() {
        assert_abs_diff_eq!(z_to_scale(0.0), 50.0);
        assert_abs_diff_eq!(z_to_scale(1.0), 70.0);
        assert_abs_diff_eq!(z_to_scale(-3.5), 0.0);
        assert_abs_diff_eq!(z_to_scale(4.0), 100.0);
    }

    #[test]
    fn test_champion_pool_is_ordered_by_games() {
        let links = vec![
            generate_summoner_match("p1", "M1", 103, "Ahri", true, day(1)),
            generate_summoner_match("p1", "M2", 103, "Ahri", false, day(2)),
            generate_summoner_match("p1", "M3", 103, "Ahri", true, day(3)),
            generate_summoner_match("p1", "M4", 238, "Zed", true, day(4)),
        ];

        let profile = build_profile("p1", &links, &HashMap::new(), &[], &[], day(30));

        assert_eq!(profile.champions.len(), 2);
        assert_eq!(profile.champions[0].champion_name, "Ahri");
        assert_eq!(profile.champions[0].games, 3);
        assert_eq!(profile.champions[0].wins, 2);
        assert_eq!(profile.champions[1].champion_name, "Zed");
    }

    #[test]
    fn test_heatmap_fills_window_and_buckets_intensity() {
        let links = vec![
            // One winning game: light activity, positive day.
            generate_summoner_match("p1", "M1", 103, "Ahri", true, day(29)),
            // Four games at 75% winrate: full intensity.
            generate_summoner_match("p1", "M2", 103, "Ahri", true, day(30)),
            generate_summoner_match("p1", "M3", 103, "Ahri", true, day(30)),
            generate_summoner_match("p1", "M4", 103, "Ahri", true, day(30)),
            generate_summoner_match("p1", "M5", 103, "Ahri", false, day(30)),
        ];

        let profile = build_profile("p1", &links, &HashMap::new(), &[], &[], day(30));

        assert_eq!(profile.heatmap.len(), 120);
        assert_eq!(profile.heatmap.last().unwrap().date, day(30));

        let last = profile.heatmap.last().unwrap();
        assert_eq!(last.games, 4);
        assert_eq!(last.intensity, 4);

        let prior = &profile.heatmap[118];
        assert_eq!(prior.games, 1);
        assert_eq!(prior.intensity, 2);

        assert!(profile.heatmap[..100].iter().all(|d| d.intensity == 0 && d.games == 0));
    }

    #[test]
    fn test_radar_averages_cached_breakdowns() {
        let links = vec![
            generate_summoner_match("p1", "M1", 103, "Ahri", true, day(1)),
            generate_summoner_match("p1", "M2", 103, "Ahri", true, day(2)),
        ];
        let mut scores = HashMap::new();
        scores.insert("M1".to_string(), score_result(60.0, 1.0));
        scores.insert("M2".to_string(), score_result(60.0, 2.0));

        let profile = build_profile("p1", &links, &scores, &[], &[], day(30));

        // Mean kda z of 1.5 maps to 80.
        assert_abs_diff_eq!(profile.radar.survival, 80.0);
        assert_abs_diff_eq!(profile.radar.combat, 50.0);
    }
}
