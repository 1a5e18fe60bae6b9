use crate::model::build_keys::FreqMap;
use crate::model::scoring::ScoreResult;
use crate::model::structures::{job::JobStatus, stat_totals::StatTotals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_postgres::Row;

/// Tracked player identity. Created on first lookup, updated on every
/// successful refresh, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Summoner {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
    pub platform: String,
    pub summoner_id: Option<String>,
    pub profile_icon_id: i32,
    pub summoner_level: i64,
    /// When we last completed a match sync for this player.
    pub last_match_fetch: Option<DateTime<Utc>>,
    /// Upstream last-activity marker.
    pub revision_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>
}

impl Summoner {
    pub fn from_row(row: &Row) -> Summoner {
        Summoner {
            puuid: row.get("puuid"),
            game_name: row.get("game_name"),
            tag_line: row.get("tag_line"),
            platform: row.get("platform"),
            summoner_id: row.get("summoner_id"),
            profile_icon_id: row.get("profile_icon_id"),
            summoner_level: row.get("summoner_level"),
            last_match_fetch: row.get("last_match_fetch"),
            revision_date: row.get("revision_date"),
            updated_at: row.get("updated_at")
        }
    }
}

/// Current rank per queue, with the precomputed sort value consumed by the
/// externally-implemented leaderboard pagination.
#[derive(Debug, Clone, Serialize)]
pub struct SummonerRank {
    pub puuid: String,
    pub queue_type: String,
    pub tier: String,
    pub division: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
    pub rank_value: i64,
    pub updated_at: DateTime<Utc>
}

impl SummonerRank {
    pub fn from_row(row: &Row) -> SummonerRank {
        SummonerRank {
            puuid: row.get("puuid"),
            queue_type: row.get("queue_type"),
            tier: row.get("tier"),
            division: row.get("division"),
            league_points: row.get("league_points"),
            wins: row.get("wins"),
            losses: row.get("losses"),
            rank_value: row.get("rank_value"),
            updated_at: row.get("updated_at")
        }
    }
}

/// Append-only rank history point; written only when the rank changed.
#[derive(Debug, Clone, Serialize)]
pub struct LeagueSnapshot {
    pub puuid: String,
    pub queue_type: String,
    pub tier: String,
    pub division: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
    pub timestamp: DateTime<Utc>
}

impl LeagueSnapshot {
    pub fn from_row(row: &Row) -> LeagueSnapshot {
        LeagueSnapshot {
            puuid: row.get("puuid"),
            queue_type: row.get("queue_type"),
            tier: row.get("tier"),
            division: row.get("division"),
            league_points: row.get("league_points"),
            wins: row.get("wins"),
            losses: row.get("losses"),
            timestamp: row.get("timestamp")
        }
    }
}

/// Stored match. The raw payload is write-once; `average_rank` is the only
/// later annotation.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: String,
    pub game_creation: DateTime<Utc>,
    pub game_duration: i64,
    pub game_mode: String,
    pub queue_id: i32,
    pub game_version: String,
    pub average_rank: Option<String>,
    pub payload: serde_json::Value
}

impl MatchRecord {
    pub fn from_row(row: &Row) -> MatchRecord {
        MatchRecord {
            match_id: row.get("match_id"),
            game_creation: row.get("game_creation"),
            game_duration: row.get("game_duration"),
            game_mode: row.get("game_mode"),
            queue_id: row.get("queue_id"),
            game_version: row.get("game_version"),
            average_rank: row.get("average_rank"),
            payload: row.get("payload")
        }
    }
}

/// Denormalized (player, match) link for fast history queries.
/// Unique on (puuid, match_id).
#[derive(Debug, Clone, Serialize)]
pub struct SummonerMatch {
    pub puuid: String,
    pub match_id: String,
    pub game_creation: DateTime<Utc>,
    pub champion_id: i32,
    pub champion_name: String,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    /// Raw upstream position string; participants with unrecognized roles
    /// keep their link but are excluded from aggregates.
    pub role: String,
    pub damage_to_champions: i64,
    pub total_cs: i32,
    pub gold_earned: i64,
    pub vision_score: i32,
    pub items: Vec<i32>,
    pub score: Option<f64>
}

impl SummonerMatch {
    pub fn from_row(row: &Row) -> SummonerMatch {
        let items: serde_json::Value = row.get("items");

        SummonerMatch {
            puuid: row.get("puuid"),
            match_id: row.get("match_id"),
            game_creation: row.get("game_creation"),
            champion_id: row.get("champion_id"),
            champion_name: row.get("champion_name"),
            win: row.get("win"),
            kills: row.get("kills"),
            deaths: row.get("deaths"),
            assists: row.get("assists"),
            role: row.get("role"),
            damage_to_champions: row.get("damage_to_champions"),
            total_cs: row.get("total_cs"),
            gold_earned: row.get("gold_earned"),
            vision_score: row.get("vision_score"),
            items: serde_json::from_value(items).unwrap_or_default(),
            score: row.get("score")
        }
    }
}

/// Idempotency marker: present once a match has been folded into the global
/// aggregates.
#[derive(Debug, Clone)]
pub struct ScannedMatch {
    pub match_id: String,
    pub patch: String,
    pub tier: String,
    pub scanned_at: DateTime<Utc>
}

/// Champion aggregate row. Numeric counters live in `totals` and are only
/// ever incremented; frequency maps are JSONB merged on write.
#[derive(Debug, Clone)]
pub struct ChampionStatRow {
    pub champion_id: i32,
    pub role: String,
    pub tier: String,
    pub patch: String,
    pub duration_bucket: String,
    pub bans: i64,
    pub totals: StatTotals,
    pub items: FreqMap,
    pub runes: FreqMap,
    pub spells: FreqMap,
    pub skill_orders: FreqMap
}

fn totals_from_row(row: &Row) -> StatTotals {
    StatTotals {
        matches: row.get("matches"),
        wins: row.get("wins"),
        total_kills: row.get("total_kills"),
        total_deaths: row.get("total_deaths"),
        total_assists: row.get("total_assists"),
        total_damage: row.get("total_damage"),
        total_gold: row.get("total_gold"),
        total_cs: row.get("total_cs"),
        total_vision: row.get("total_vision"),
        total_duration: row.get("total_duration"),
        total_damage_share: row.get("total_damage_share"),
        total_gold_share: row.get("total_gold_share"),
        total_vision_per_min: row.get("total_vision_per_min"),
        total_objective_participation: row.get("total_objective_participation"),
        total_damage_share_sq: row.get("total_damage_share_sq"),
        total_gold_share_sq: row.get("total_gold_share_sq")
    }
}

fn freq_map_from_row(row: &Row, column: &str) -> FreqMap {
    let value: serde_json::Value = row.get(column);
    serde_json::from_value(value).unwrap_or_default()
}

impl ChampionStatRow {
    pub fn from_row(row: &Row) -> ChampionStatRow {
        ChampionStatRow {
            champion_id: row.get("champion_id"),
            role: row.get("role"),
            tier: row.get("tier"),
            patch: row.get("patch"),
            duration_bucket: row.get("duration_bucket"),
            bans: row.get("bans"),
            totals: totals_from_row(row),
            items: freq_map_from_row(row, "items"),
            runes: freq_map_from_row(row, "runes"),
            spells: freq_map_from_row(row, "spells"),
            skill_orders: freq_map_from_row(row, "skill_orders")
        }
    }
}

/// Matchup aggregate: champion stats narrowed to one opposing champion in
/// the mirrored role.
#[derive(Debug, Clone)]
pub struct MatchupStatRow {
    pub champion_id: i32,
    pub opponent_id: i32,
    pub role: String,
    pub tier: String,
    pub patch: String,
    pub duration_bucket: String,
    pub totals: StatTotals
}

impl MatchupStatRow {
    pub fn from_row(row: &Row) -> MatchupStatRow {
        MatchupStatRow {
            champion_id: row.get("champion_id"),
            opponent_id: row.get("opponent_id"),
            role: row.get("role"),
            tier: row.get("tier"),
            patch: row.get("patch"),
            duration_bucket: row.get("duration_bucket"),
            totals: totals_from_row(row)
        }
    }
}

/// Duo aggregate for laning-interaction role pairs.
#[derive(Debug, Clone)]
pub struct DuoStatRow {
    pub champion_id: i32,
    pub partner_id: i32,
    pub role: String,
    pub partner_role: String,
    pub tier: String,
    pub patch: String,
    pub matches: i64,
    pub wins: i64
}

impl DuoStatRow {
    pub fn from_row(row: &Row) -> DuoStatRow {
        DuoStatRow {
            champion_id: row.get("champion_id"),
            partner_id: row.get("partner_id"),
            role: row.get("role"),
            partner_role: row.get("partner_role"),
            tier: row.get("tier"),
            patch: row.get("patch"),
            matches: row.get("matches"),
            wins: row.get("wins")
        }
    }
}

/// Cached score results for every participant of one match, keyed by puuid.
/// The stored version tag must match the current formula version for a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub match_id: String,
    pub version: String,
    pub results: HashMap<String, ScoreResult>,
    /// Best performer on the winning team (by score, gold tie-break).
    pub mvp: Option<String>,
    /// Best performer on the losing team, same rule.
    pub ace: Option<String>
}

impl MatchAnalysis {
    pub fn from_row(row: &Row) -> MatchAnalysis {
        let results: serde_json::Value = row.get("results");

        MatchAnalysis {
            match_id: row.get("match_id"),
            version: row.get("version"),
            results: serde_json::from_value(results).unwrap_or_default(),
            mvp: row.get("mvp"),
            ace: row.get("ace")
        }
    }
}

/// Queued unit of background work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>
}

impl Job {
    pub fn from_row(row: &Row) -> Job {
        let status: String = row.get("status");

        Job {
            id: row.get("id"),
            job_type: row.get("job_type"),
            payload: row.get("payload"),
            priority: row.get("priority"),
            status: status.parse().unwrap_or(JobStatus::Queued),
            error: row.get("error"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            finished_at: row.get("finished_at")
        }
    }
}
