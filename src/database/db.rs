use super::db_structs::{
    ChampionStatRow, Job, LeagueSnapshot, MatchAnalysis, MatchRecord, MatchupStatRow, Summoner, SummonerMatch,
    SummonerRank
};
use crate::model::build_keys::{merge_freq_maps, FreqMap};
use crate::model::processor::{AggregateContext, AggregateStore, DuoDelta, MatchupDelta, ParticipantDelta};
use crate::model::structures::{
    job::{JobPayload, JobStatus},
    role::Role,
    stat_totals::StatTotals
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use postgres_types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("failed to encode stored payload: {0}")]
    Serialization(#[from] serde_json::Error)
}

/// Thin client over the externally-owned schema. The core only relies on
/// point lookups, insert-or-ignore, atomic increments and ordered range
/// queries; everything here is one of those four shapes.
#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, DbError> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    // --- Summoners ---

    pub async fn get_summoner(&self, puuid: &str) -> Result<Option<Summoner>, DbError> {
        let row = self
            .client
            .query_opt("SELECT * FROM summoners WHERE puuid = $1", &[&puuid])
            .await?;

        Ok(row.as_ref().map(Summoner::from_row))
    }

    pub async fn get_summoner_by_riot_id(&self, game_name: &str, tag_line: &str) -> Result<Option<Summoner>, DbError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM summoners WHERE LOWER(game_name) = LOWER($1) AND LOWER(tag_line) = LOWER($2)",
                &[&game_name, &tag_line]
            )
            .await?;

        Ok(row.as_ref().map(Summoner::from_row))
    }

    /// Creates or refreshes the identity row. Sync markers are written
    /// separately at the end of a sync cycle.
    pub async fn upsert_summoner(&self, summoner: &Summoner) -> Result<(), DbError> {
        self.client
            .execute(
                "INSERT INTO summoners
                    (puuid, game_name, tag_line, platform, summoner_id, profile_icon_id, summoner_level,
                     last_match_fetch, revision_date, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $9)
                 ON CONFLICT (puuid) DO UPDATE SET
                    game_name = EXCLUDED.game_name,
                    tag_line = EXCLUDED.tag_line,
                    platform = EXCLUDED.platform,
                    summoner_id = EXCLUDED.summoner_id,
                    profile_icon_id = EXCLUDED.profile_icon_id,
                    summoner_level = EXCLUDED.summoner_level,
                    revision_date = EXCLUDED.revision_date,
                    updated_at = EXCLUDED.updated_at",
                &[
                    &summoner.puuid,
                    &summoner.game_name,
                    &summoner.tag_line,
                    &summoner.platform,
                    &summoner.summoner_id,
                    &summoner.profile_icon_id,
                    &summoner.summoner_level,
                    &summoner.revision_date,
                    &summoner.updated_at
                ]
            )
            .await?;

        Ok(())
    }

    /// Stamps the sync bookkeeping after a cycle, fetched or skipped alike.
    pub async fn update_sync_markers(
        &self,
        puuid: &str,
        last_match_fetch: DateTime<Utc>,
        revision_date: Option<DateTime<Utc>>
    ) -> Result<(), DbError> {
        self.client
            .execute(
                "UPDATE summoners
                 SET last_match_fetch = $2, revision_date = COALESCE($3, revision_date), updated_at = $2
                 WHERE puuid = $1",
                &[&puuid, &last_match_fetch, &revision_date]
            )
            .await?;

        Ok(())
    }

    pub async fn count_player_matches(&self, puuid: &str) -> Result<i64, DbError> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) FROM summoner_matches WHERE puuid = $1", &[&puuid])
            .await?;

        Ok(row.get(0))
    }

    /// Filters a candidate id list down to the ids not stored yet,
    /// preserving the upstream (newest-first) order.
    pub async fn filter_unstored_match_ids(&self, ids: &[String]) -> Result<Vec<String>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .client
            .query("SELECT match_id FROM matches WHERE match_id = ANY($1)", &[&ids])
            .await?;

        let stored: std::collections::HashSet<String> = rows.iter().map(|r| r.get("match_id")).collect();
        Ok(ids.iter().filter(|id| !stored.contains(*id)).cloned().collect())
    }

    pub async fn get_platform_summoners(&self, platform: &str) -> Result<Vec<Summoner>, DbError> {
        let rows = self
            .client
            .query("SELECT * FROM summoners WHERE platform = $1", &[&platform])
            .await?;

        Ok(rows.iter().map(Summoner::from_row).collect())
    }

    // --- Ranks & snapshots ---

    pub async fn upsert_rank(&self, rank: &SummonerRank) -> Result<(), DbError> {
        self.client
            .execute(
                "INSERT INTO summoner_ranks
                    (puuid, queue_type, tier, division, league_points, wins, losses, rank_value, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (puuid, queue_type) DO UPDATE SET
                    tier = EXCLUDED.tier,
                    division = EXCLUDED.division,
                    league_points = EXCLUDED.league_points,
                    wins = EXCLUDED.wins,
                    losses = EXCLUDED.losses,
                    rank_value = EXCLUDED.rank_value,
                    updated_at = EXCLUDED.updated_at",
                &[
                    &rank.puuid,
                    &rank.queue_type,
                    &rank.tier,
                    &rank.division,
                    &rank.league_points,
                    &rank.wins,
                    &rank.losses,
                    &rank.rank_value,
                    &rank.updated_at
                ]
            )
            .await?;

        Ok(())
    }

    pub async fn get_ranks(&self, puuid: &str) -> Result<Vec<SummonerRank>, DbError> {
        let rows = self
            .client
            .query("SELECT * FROM summoner_ranks WHERE puuid = $1", &[&puuid])
            .await?;

        Ok(rows.iter().map(SummonerRank::from_row).collect())
    }

    pub async fn latest_snapshot(&self, puuid: &str, queue_type: &str) -> Result<Option<LeagueSnapshot>, DbError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM league_snapshots
                 WHERE puuid = $1 AND queue_type = $2
                 ORDER BY timestamp DESC LIMIT 1",
                &[&puuid, &queue_type]
            )
            .await?;

        Ok(row.as_ref().map(LeagueSnapshot::from_row))
    }

    pub async fn insert_snapshot(&self, snapshot: &LeagueSnapshot) -> Result<(), DbError> {
        self.client
            .execute(
                "INSERT INTO league_snapshots
                    (puuid, queue_type, tier, division, league_points, wins, losses, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &snapshot.puuid,
                    &snapshot.queue_type,
                    &snapshot.tier,
                    &snapshot.division,
                    &snapshot.league_points,
                    &snapshot.wins,
                    &snapshot.losses,
                    &snapshot.timestamp
                ]
            )
            .await?;

        Ok(())
    }

    pub async fn get_snapshots(&self, puuid: &str) -> Result<Vec<LeagueSnapshot>, DbError> {
        let rows = self
            .client
            .query(
                "SELECT * FROM league_snapshots WHERE puuid = $1 ORDER BY timestamp ASC",
                &[&puuid]
            )
            .await?;

        Ok(rows.iter().map(LeagueSnapshot::from_row).collect())
    }

    // --- Matches ---

    /// Write-once insert; a concurrent sync winning the race is success.
    /// Returns whether this call stored the row.
    pub async fn insert_match(&self, record: &MatchRecord) -> Result<bool, DbError> {
        let inserted = self
            .client
            .execute(
                "INSERT INTO matches
                    (match_id, game_creation, game_duration, game_mode, queue_id, game_version, average_rank, payload)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (match_id) DO NOTHING",
                &[
                    &record.match_id,
                    &record.game_creation,
                    &record.game_duration,
                    &record.game_mode,
                    &record.queue_id,
                    &record.game_version,
                    &record.average_rank,
                    &record.payload
                ]
            )
            .await?;

        Ok(inserted > 0)
    }

    pub async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>, DbError> {
        let row = self
            .client
            .query_opt("SELECT * FROM matches WHERE match_id = $1", &[&match_id])
            .await?;

        Ok(row.as_ref().map(MatchRecord::from_row))
    }

    /// The one post-write annotation a match row receives. Gameplay fields
    /// are never touched.
    pub async fn annotate_average_rank(&self, match_id: &str, average_rank: &str) -> Result<(), DbError> {
        self.client
            .execute(
                "UPDATE matches SET average_rank = $2 WHERE match_id = $1 AND average_rank IS NULL",
                &[&match_id, &average_rank]
            )
            .await?;

        Ok(())
    }

    pub async fn insert_summoner_match(&self, link: &SummonerMatch) -> Result<bool, DbError> {
        let items = serde_json::to_value(&link.items)?;

        let inserted = self
            .client
            .execute(
                "INSERT INTO summoner_matches
                    (puuid, match_id, game_creation, champion_id, champion_name, win, kills, deaths, assists,
                     role, damage_to_champions, total_cs, gold_earned, vision_score, items, score)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                 ON CONFLICT (puuid, match_id) DO NOTHING",
                &[
                    &link.puuid,
                    &link.match_id,
                    &link.game_creation,
                    &link.champion_id,
                    &link.champion_name,
                    &link.win,
                    &link.kills,
                    &link.deaths,
                    &link.assists,
                    &link.role,
                    &link.damage_to_champions,
                    &link.total_cs,
                    &link.gold_earned,
                    &link.vision_score,
                    &items,
                    &link.score
                ]
            )
            .await?;

        Ok(inserted > 0)
    }

    pub async fn set_link_score(&self, puuid: &str, match_id: &str, score: f64) -> Result<(), DbError> {
        self.client
            .execute(
                "UPDATE summoner_matches SET score = $3 WHERE puuid = $1 AND match_id = $2",
                &[&puuid, &match_id, &score]
            )
            .await?;

        Ok(())
    }

    pub async fn get_player_matches(&self, puuid: &str, limit: i64) -> Result<Vec<SummonerMatch>, DbError> {
        let rows = self
            .client
            .query(
                "SELECT * FROM summoner_matches
                 WHERE puuid = $1
                 ORDER BY game_creation DESC
                 LIMIT $2",
                &[&puuid, &limit]
            )
            .await?;

        Ok(rows.iter().map(SummonerMatch::from_row).collect())
    }

    pub async fn get_match_records_for_player(&self, puuid: &str, limit: i64) -> Result<Vec<MatchRecord>, DbError> {
        let rows = self
            .client
            .query(
                "SELECT m.* FROM matches m
                 JOIN summoner_matches sm ON sm.match_id = m.match_id
                 WHERE sm.puuid = $1
                 ORDER BY m.game_creation DESC
                 LIMIT $2",
                &[&puuid, &limit]
            )
            .await?;

        Ok(rows.iter().map(MatchRecord::from_row).collect())
    }

    // --- Aggregate reads ---

    pub async fn get_champion_stat(
        &self,
        champion_id: i32,
        role: Role,
        context: &AggregateContext
    ) -> Result<Option<ChampionStatRow>, DbError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM champion_stats
                 WHERE champion_id = $1 AND role = $2 AND tier = $3 AND patch = $4 AND duration_bucket = $5",
                &[
                    &champion_id,
                    &role.as_str(),
                    &context.tier.as_str(),
                    &context.patch,
                    &context.duration_bucket.as_str()
                ]
            )
            .await?;

        Ok(row.as_ref().map(ChampionStatRow::from_row))
    }

    pub async fn get_matchup_stat(
        &self,
        champion_id: i32,
        opponent_id: i32,
        role: Role,
        context: &AggregateContext
    ) -> Result<Option<MatchupStatRow>, DbError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM matchup_stats
                 WHERE champion_id = $1 AND opponent_id = $2 AND role = $3
                   AND tier = $4 AND patch = $5 AND duration_bucket = $6",
                &[
                    &champion_id,
                    &opponent_id,
                    &role.as_str(),
                    &context.tier.as_str(),
                    &context.patch,
                    &context.duration_bucket.as_str()
                ]
            )
            .await?;

        Ok(row.as_ref().map(MatchupStatRow::from_row))
    }

    // --- Score cache ---

    /// Returns the cached analysis only when its formula version matches.
    pub async fn get_match_analysis(&self, match_id: &str, version: &str) -> Result<Option<MatchAnalysis>, DbError> {
        let row = self
            .client
            .query_opt(
                "SELECT * FROM match_analyses WHERE match_id = $1 AND version = $2",
                &[&match_id, &version]
            )
            .await?;

        Ok(row.as_ref().map(MatchAnalysis::from_row))
    }

    pub async fn upsert_match_analysis(&self, analysis: &MatchAnalysis) -> Result<(), DbError> {
        let results = serde_json::to_value(&analysis.results)?;

        self.client
            .execute(
                "INSERT INTO match_analyses (match_id, version, results, mvp, ace)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (match_id) DO UPDATE SET
                    version = EXCLUDED.version,
                    results = EXCLUDED.results,
                    mvp = EXCLUDED.mvp,
                    ace = EXCLUDED.ace",
                &[&analysis.match_id, &analysis.version, &results, &analysis.mvp, &analysis.ace]
            )
            .await?;

        Ok(())
    }

    // --- Jobs ---

    pub async fn enqueue_job(&self, payload: &JobPayload, priority: i32) -> Result<i64, DbError> {
        let body = serde_json::to_value(payload)?;

        let row = self
            .client
            .query_one(
                "INSERT INTO jobs (job_type, payload, priority, status, created_at)
                 VALUES ($1, $2, $3, 'QUEUED', NOW())
                 RETURNING id",
                &[&payload.job_type(), &body, &priority]
            )
            .await?;

        Ok(row.get(0))
    }

    /// Claims the next queued job, oldest first within priority. The single
    /// worker is the only claimer; SKIP LOCKED keeps a second accidental
    /// worker from double-claiming.
    pub async fn claim_next_job(&self) -> Result<Option<Job>, DbError> {
        let row = self
            .client
            .query_opt(
                "UPDATE jobs SET status = 'RUNNING', started_at = NOW()
                 WHERE id = (
                    SELECT id FROM jobs
                    WHERE status = 'QUEUED'
                    ORDER BY priority ASC, created_at ASC
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                 )
                 RETURNING *",
                &[]
            )
            .await?;

        Ok(row.as_ref().map(Job::from_row))
    }

    pub async fn finish_job(&self, id: i64, status: JobStatus, error: Option<&str>) -> Result<(), DbError> {
        self.client
            .execute(
                "UPDATE jobs SET status = $2, error = $3, finished_at = NOW() WHERE id = $1",
                &[&id, &status.as_str(), &error]
            )
            .await?;

        Ok(())
    }
}

fn totals_params(totals: &StatTotals) -> [&(dyn ToSql + Sync); 16] {
    [
        &totals.matches,
        &totals.wins,
        &totals.total_kills,
        &totals.total_deaths,
        &totals.total_assists,
        &totals.total_damage,
        &totals.total_gold,
        &totals.total_cs,
        &totals.total_vision,
        &totals.total_duration,
        &totals.total_damage_share,
        &totals.total_gold_share,
        &totals.total_vision_per_min,
        &totals.total_objective_participation,
        &totals.total_damage_share_sq,
        &totals.total_gold_share_sq
    ]
}

const TOTALS_COLUMNS: &str = "matches, wins, total_kills, total_deaths, total_assists, total_damage, total_gold, \
     total_cs, total_vision, total_duration, total_damage_share, total_gold_share, total_vision_per_min, \
     total_objective_participation, total_damage_share_sq, total_gold_share_sq";

fn totals_increment_clause(table: &str, offset: usize) -> String {
    TOTALS_COLUMNS
        .split(", ")
        .enumerate()
        .map(|(i, col)| {
            let col = col.trim();
            format!("{col} = {table}.{col} + ${}", offset + i + 1)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl AggregateStore for DbClient {
    async fn is_match_scanned(&self, match_id: &str) -> Result<bool, DbError> {
        let row = self
            .client
            .query_opt("SELECT 1 FROM scanned_matches WHERE match_id = $1", &[&match_id])
            .await?;

        Ok(row.is_some())
    }

    async fn increment_ban(&self, context: &AggregateContext, champion_id: i32) -> Result<(), DbError> {
        // Ban counters live on a role-less champion row.
        self.client
            .execute(
                "INSERT INTO champion_stats (champion_id, role, tier, patch, duration_bucket, bans)
                 VALUES ($1, 'ALL', $2, $3, $4, 1)
                 ON CONFLICT (champion_id, role, tier, patch, duration_bucket)
                 DO UPDATE SET bans = champion_stats.bans + 1",
                &[
                    &champion_id,
                    &context.tier.as_str(),
                    &context.patch,
                    &context.duration_bucket.as_str()
                ]
            )
            .await?;

        Ok(())
    }

    async fn apply_champion_delta(&self, context: &AggregateContext, delta: &ParticipantDelta) -> Result<(), DbError> {
        // Numeric counters go through a single atomic increment upsert.
        let sql = format!(
            "INSERT INTO champion_stats (champion_id, role, tier, patch, duration_bucket, {TOTALS_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
             ON CONFLICT (champion_id, role, tier, patch, duration_bucket)
             DO UPDATE SET {}",
            totals_increment_clause("champion_stats", 5)
        );

        let role = delta.role.as_str();
        let tier = context.tier.as_str();
        let bucket = context.duration_bucket.as_str();

        let mut params: Vec<&(dyn ToSql + Sync)> =
            vec![&delta.champion_id, &role, &tier, &context.patch, &bucket];
        params.extend(totals_params(&delta.totals));
        self.client.execute(&sql, &params).await?;

        // Frequency maps are the one read-merge-write spot; contention on a
        // single aggregate key is low enough that last-writer-wins is
        // acceptable.
        let row = self
            .client
            .query_one(
                "SELECT items, runes, spells, skill_orders FROM champion_stats
                 WHERE champion_id = $1 AND role = $2 AND tier = $3 AND patch = $4 AND duration_bucket = $5",
                &[
                    &delta.champion_id,
                    &delta.role.as_str(),
                    &context.tier.as_str(),
                    &context.patch,
                    &context.duration_bucket.as_str()
                ]
            )
            .await?;

        let merge = |column: &str, delta_map: &FreqMap| -> Result<serde_json::Value, DbError> {
            let mut current: FreqMap =
                serde_json::from_value(row.get::<_, serde_json::Value>(column)).unwrap_or_default();
            merge_freq_maps(&mut current, delta_map);
            Ok(serde_json::to_value(&current)?)
        };

        let items = merge("items", &delta.items)?;
        let runes = merge("runes", &delta.runes)?;
        let spells = merge("spells", &delta.spells)?;
        let skill_orders = merge("skill_orders", &delta.skill_orders)?;

        self.client
            .execute(
                "UPDATE champion_stats
                 SET items = $6, runes = $7, spells = $8, skill_orders = $9
                 WHERE champion_id = $1 AND role = $2 AND tier = $3 AND patch = $4 AND duration_bucket = $5",
                &[
                    &delta.champion_id,
                    &delta.role.as_str(),
                    &context.tier.as_str(),
                    &context.patch,
                    &context.duration_bucket.as_str(),
                    &items,
                    &runes,
                    &spells,
                    &skill_orders
                ]
            )
            .await?;

        Ok(())
    }

    async fn apply_matchup_delta(&self, context: &AggregateContext, delta: &MatchupDelta) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO matchup_stats (champion_id, opponent_id, role, tier, patch, duration_bucket, {TOTALS_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
             ON CONFLICT (champion_id, opponent_id, role, tier, patch, duration_bucket)
             DO UPDATE SET {}",
            totals_increment_clause("matchup_stats", 6)
        );

        let role = delta.role.as_str();
        let tier = context.tier.as_str();
        let bucket = context.duration_bucket.as_str();

        let mut params: Vec<&(dyn ToSql + Sync)> =
            vec![&delta.champion_id, &delta.opponent_id, &role, &tier, &context.patch, &bucket];
        params.extend(totals_params(&delta.totals));
        self.client.execute(&sql, &params).await?;

        Ok(())
    }

    async fn apply_duo_delta(&self, context: &AggregateContext, delta: &DuoDelta) -> Result<(), DbError> {
        let win: i64 = if delta.win { 1 } else { 0 };

        self.client
            .execute(
                "INSERT INTO duo_stats (champion_id, partner_id, role, partner_role, tier, patch, matches, wins)
                 VALUES ($1, $2, $3, $4, $5, $6, 1, $7)
                 ON CONFLICT (champion_id, partner_id, role, partner_role, tier, patch)
                 DO UPDATE SET matches = duo_stats.matches + 1, wins = duo_stats.wins + $7",
                &[
                    &delta.champion_id,
                    &delta.partner_id,
                    &delta.role.as_str(),
                    &delta.partner_role.as_str(),
                    &context.tier.as_str(),
                    &context.patch,
                    &win
                ]
            )
            .await?;

        Ok(())
    }

    async fn mark_match_scanned(&self, match_id: &str, context: &AggregateContext) -> Result<(), DbError> {
        self.client
            .execute(
                "INSERT INTO scanned_matches (match_id, patch, tier, scanned_at)
                 VALUES ($1, $2, $3, NOW())
                 ON CONFLICT (match_id) DO NOTHING",
                &[&match_id, &context.patch, &context.tier.as_str()]
            )
            .await?;

        Ok(())
    }
}
