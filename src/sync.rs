use crate::api::{api_structs::MatchDto, api_structs::TimelineDto, regional_routing, ApiError, RiotApiClient};
use crate::constants::{
    BACKFILL_COUNT, CLOCK_SKEW_BUFFER_SECS, CURRENT_PATCH, FIRST_SYNC_COUNT, MATCH_FETCH_CONCURRENCY,
    MATCH_ID_PAGE_SIZE, NEW_HEAD_COUNT, PROFILE_CACHE_TTL_SECS, PURE_BACKFILL_COUNT, SCORE_FORMULA_VERSION
};
use crate::database::db::{DbClient, DbError};
use crate::database::db_structs::{LeagueSnapshot, MatchAnalysis, MatchRecord, Summoner, SummonerMatch, SummonerRank};
use crate::model::baselines::BaselineSet;
use crate::model::processor::{AggregateContext, AggregateProcessor, ProcessOutcome};
use crate::model::scoring::{label_best_performers, score_participant, ParticipantSnapshot, ScoreResult};
use crate::model::structures::{
    duration_bucket::DurationBucket,
    priority::Priority,
    role::Role,
    team_side::TeamSide,
    tier::{rank_value, Division, Tier}
};
use crate::model::timeline_stats::TimelineFeatures;
use chrono::{TimeZone, Utc};
use futures::{stream, StreamExt};
use itertools::Itertools;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SOLO_QUEUE: &str = "RANKED_SOLO_5x5";
pub const FLEX_QUEUE: &str = "RANKED_FLEX_SR";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Db(#[from] DbError)
}

/// Deeper-history page to pull alongside the new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backfill {
    pub offset: usize,
    pub count: usize
}

/// What one sync cycle will fetch: the chosen new ids plus an optional
/// backfill page extending stored history depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub new_ids: Vec<String>,
    pub backfill: Option<Backfill>
}

/// Decides what to fetch without re-fetching everything. `new_ids` are the
/// most recent upstream ids not stored yet, newest first.
pub fn plan_fetch(existing_count: usize, new_ids: &[String]) -> FetchPlan {
    if existing_count == 0 {
        // First sync: take the newest page, nothing older.
        return FetchPlan {
            new_ids: new_ids.iter().take(FIRST_SYNC_COUNT).cloned().collect(),
            backfill: None
        };
    }

    if new_ids.is_empty() {
        // Already current on the head; extend history instead.
        return FetchPlan {
            new_ids: Vec::new(),
            backfill: Some(Backfill {
                offset: existing_count,
                count: PURE_BACKFILL_COUNT
            })
        };
    }

    let head: Vec<String> = new_ids.iter().take(NEW_HEAD_COUNT).cloned().collect();

    FetchPlan {
        new_ids: head,
        backfill: Some(Backfill {
            offset: existing_count + new_ids.len(),
            count: BACKFILL_COUNT
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub fetched: usize,
    pub skipped_stale_patch: usize,
    pub failed: usize,
    pub already_current: bool
}

enum IngestResult {
    Stored,
    StalePatch,
    Failed
}

/// Brings one player's stored match history up to date: skip fast-path,
/// smart fetch plan, bounded-parallel fetch with per-match persistence,
/// aggregate folding and score caching.
pub struct MatchSynchronizer {
    api: RiotApiClient,
    db: DbClient,
    processor: AggregateProcessor<DbClient>
}

impl MatchSynchronizer {
    pub fn new(api: RiotApiClient, db: DbClient) -> MatchSynchronizer {
        let processor = AggregateProcessor::new(db.clone());
        MatchSynchronizer { api, db, processor }
    }

    /// Looks a player up by riot id, refreshing identity and ranks from the
    /// upstream when the stored profile is missing, stale or forced.
    pub async fn refresh_summoner(
        &self,
        game_name: &str,
        tag_line: &str,
        platform: &str,
        force: bool
    ) -> Result<Summoner, SyncError> {
        let routing = regional_routing(platform);
        let existing = self.db.get_summoner_by_riot_id(game_name, tag_line).await?;

        let fresh_enough = existing
            .as_ref()
            .and_then(|s| s.last_match_fetch)
            .map(|t| (Utc::now() - t).num_seconds() < PROFILE_CACHE_TTL_SECS)
            .unwrap_or(false);

        if let Some(existing) = existing {
            if fresh_enough && !force {
                return Ok(existing);
            }
        }

        let account = self
            .api
            .get_account(game_name, tag_line, routing, Priority::Interactive)
            .await?;
        let summoner_dto = self
            .api
            .get_summoner(&account.puuid, platform, Priority::Interactive)
            .await?;

        let summoner = Summoner {
            puuid: account.puuid.clone(),
            game_name: if account.game_name.is_empty() {
                game_name.to_string()
            } else {
                account.game_name.clone()
            },
            tag_line: if account.tag_line.is_empty() {
                tag_line.to_string()
            } else {
                account.tag_line.clone()
            },
            platform: platform.to_string(),
            summoner_id: Some(summoner_dto.id.clone()),
            profile_icon_id: summoner_dto.profile_icon_id,
            summoner_level: summoner_dto.summoner_level,
            last_match_fetch: None,
            revision_date: Utc.timestamp_millis_opt(summoner_dto.revision_date).single(),
            updated_at: Utc::now()
        };
        self.db.upsert_summoner(&summoner).await?;

        self.refresh_ranks(&account.puuid, platform, Priority::Interactive).await?;

        // Re-read so callers see the merged row (existing markers included).
        Ok(self
            .db
            .get_summoner(&account.puuid)
            .await?
            .unwrap_or(summoner))
    }

    /// Updates current ranks and appends a history snapshot when the rank
    /// actually moved.
    pub async fn refresh_ranks(&self, puuid: &str, platform: &str, priority: Priority) -> Result<(), SyncError> {
        let entries = self.api.get_league_entries(puuid, platform, priority).await?;
        let now = Utc::now();

        for entry in entries {
            if entry.queue_type != SOLO_QUEUE && entry.queue_type != FLEX_QUEUE {
                continue;
            }

            let tier = Tier::from_str(&entry.tier).ok();
            let division = Division::from_str(&entry.rank).ok();

            self.db
                .upsert_rank(&SummonerRank {
                    puuid: puuid.to_string(),
                    queue_type: entry.queue_type.clone(),
                    tier: entry.tier.clone(),
                    division: entry.rank.clone(),
                    league_points: entry.league_points,
                    wins: entry.wins,
                    losses: entry.losses,
                    rank_value: rank_value(tier, division, entry.league_points),
                    updated_at: now
                })
                .await?;

            let last = self.db.latest_snapshot(puuid, &entry.queue_type).await?;
            let changed = last
                .map(|s| s.tier != entry.tier || s.division != entry.rank || s.league_points != entry.league_points)
                .unwrap_or(true);

            if changed {
                self.db
                    .insert_snapshot(&LeagueSnapshot {
                        puuid: puuid.to_string(),
                        queue_type: entry.queue_type.clone(),
                        tier: entry.tier.clone(),
                        division: entry.rank.clone(),
                        league_points: entry.league_points,
                        wins: entry.wins,
                        losses: entry.losses,
                        timestamp: now
                    })
                    .await?;
            }
        }

        Ok(())
    }

    /// One sync cycle for one player. Matches are persisted one at a time
    /// as they arrive, so a polling reader sees progress immediately.
    pub async fn sync_matches(
        &self,
        summoner: &Summoner,
        priority: Priority,
        force: bool
    ) -> Result<SyncOutcome, SyncError> {
        // Fast path: nothing happened upstream since our last cycle.
        if !force && already_current(summoner) {
            debug!(puuid = %summoner.puuid, "sync skipped, player already current");
            return Ok(SyncOutcome {
                already_current: true,
                ..Default::default()
            });
        }

        let routing = regional_routing(&summoner.platform);

        let existing_count = self.db.count_player_matches(&summoner.puuid).await? as usize;

        let head_page = self
            .api
            .get_match_ids(&summoner.puuid, routing, 0, MATCH_ID_PAGE_SIZE, priority)
            .await?;
        let new_ids = self.db.filter_unstored_match_ids(&head_page).await?;

        let plan = plan_fetch(existing_count, &new_ids);

        let mut candidates = plan.new_ids.clone();
        if let Some(backfill) = plan.backfill {
            let older = self
                .api
                .get_match_ids(&summoner.puuid, routing, backfill.offset, backfill.count, priority)
                .await?;
            candidates.extend(older);
        }

        // Dedup, then drop anything a concurrent cycle already stored.
        // Races are tolerated, not prevented; losing one is a no-op insert.
        let candidates: Vec<String> = candidates.into_iter().unique().collect();
        let to_fetch = self.db.filter_unstored_match_ids(&candidates).await?;

        let (tier, tier_label) = self.tier_context(&summoner.puuid).await?;

        let results: Vec<IngestResult> = stream::iter(to_fetch.iter())
            .map(|match_id| {
                let match_id = match_id.clone();
                let tier_label = tier_label.clone();
                async move {
                    match self
                        .ingest_match(&match_id, summoner, routing, tier, &tier_label, priority)
                        .await
                    {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(match_id = %match_id, error = %e, "match ingestion failed, continuing cycle");
                            IngestResult::Failed
                        }
                    }
                }
            })
            .buffer_unordered(MATCH_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut outcome = SyncOutcome::default();
        for result in results {
            match result {
                IngestResult::Stored => outcome.fetched += 1,
                IngestResult::StalePatch => outcome.skipped_stale_patch += 1,
                IngestResult::Failed => outcome.failed += 1
            }
        }

        // Bookkeeping runs whether or not anything was fetched.
        self.db
            .update_sync_markers(&summoner.puuid, Utc::now(), summoner.revision_date)
            .await?;

        info!(
            puuid = %summoner.puuid,
            fetched = outcome.fetched,
            skipped_stale_patch = outcome.skipped_stale_patch,
            failed = outcome.failed,
            "sync cycle complete"
        );

        Ok(outcome)
    }

    /// Fetches, stores and post-processes one match. Failures propagate to
    /// the pool, which logs and moves on.
    async fn ingest_match(
        &self,
        match_id: &str,
        summoner: &Summoner,
        routing: &str,
        tier: Tier,
        tier_label: &str,
        priority: Priority
    ) -> Result<IngestResult, SyncError> {
        let mut payload = self.api.get_match(match_id, routing, priority).await?;
        let match_ = match MatchDto::from_value(&payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(match_id, error = %e, "unparseable match payload");
                return Ok(IngestResult::Failed);
            }
        };

        // Stale-patch games are counted and dropped so baselines stay
        // comparable.
        if match_.patch() != CURRENT_PATCH {
            debug!(match_id, version = %match_.info.game_version, "skipping stale-patch match");
            return Ok(IngestResult::StalePatch);
        }

        // Timeline is best effort: without it lane diffs and build paths
        // are simply absent for this match.
        let timeline_value = match self.api.get_match_timeline(match_id, routing, priority).await {
            Ok(value) => value,
            Err(e) => {
                debug!(match_id, error = %e, "timeline unavailable");
                None
            }
        };
        let timeline = timeline_value.as_ref().and_then(|v| TimelineDto::from_value(v).ok());

        if let (Some(obj), Some(t)) = (payload.as_object_mut(), timeline_value.as_ref()) {
            obj.insert("timeline".to_string(), t.clone());
        }

        let record = MatchRecord {
            match_id: match_id.to_string(),
            game_creation: Utc
                .timestamp_millis_opt(match_.info.game_start_timestamp)
                .single()
                .unwrap_or_else(Utc::now),
            game_duration: match_.info.game_duration,
            game_mode: match_.info.game_mode.clone(),
            queue_id: match_.info.queue_id,
            game_version: match_.info.game_version.clone(),
            average_rank: None,
            payload
        };

        // Insert-or-ignore: losing a race to another cycle is success.
        self.db.insert_match(&record).await?;
        self.db.annotate_average_rank(match_id, tier_label).await?;

        if let Some(me) = match_.info.participants.iter().find(|p| p.puuid == summoner.puuid) {
            self.db
                .insert_summoner_match(&SummonerMatch {
                    puuid: summoner.puuid.clone(),
                    match_id: match_id.to_string(),
                    game_creation: record.game_creation,
                    champion_id: me.champion_id,
                    champion_name: me.champion_name.clone(),
                    win: me.win,
                    kills: me.kills,
                    deaths: me.deaths,
                    assists: me.assists,
                    role: if me.team_position.is_empty() {
                        "UNKNOWN".to_string()
                    } else {
                        me.team_position.clone()
                    },
                    damage_to_champions: me.total_damage_dealt_to_champions,
                    total_cs: me.total_cs(),
                    gold_earned: me.gold_earned,
                    vision_score: me.vision_score,
                    items: me.item_slots(),
                    score: None
                })
                .await?;
        }

        // Fold into the global aggregates; a failure here leaves the match
        // unscanned and it is retried on a later pass.
        match self.processor.process_match(&match_, timeline.as_ref(), tier).await {
            Ok(ProcessOutcome::Processed) => {}
            Ok(ProcessOutcome::AlreadyScanned) => {
                debug!(match_id, "match already folded into aggregates");
            }
            Err(e) => {
                warn!(match_id, error = %e, "aggregate processing failed, match left unscanned");
            }
        }

        // Score every participant against the freshly updated baselines and
        // cache the results.
        if let Err(e) = self.score_match(&match_, timeline.as_ref(), tier, &summoner.puuid).await {
            warn!(match_id, error = %e, "score caching failed");
        }

        Ok(IngestResult::Stored)
    }

    /// Computes (or re-reads from cache) every participant's score for one
    /// match. The cache is keyed by match id and formula version; a version
    /// bump silently invalidates all older entries.
    pub async fn score_match(
        &self,
        match_: &MatchDto,
        timeline: Option<&TimelineDto>,
        tier: Tier,
        focus_puuid: &str
    ) -> Result<MatchAnalysis, SyncError> {
        let match_id = match_.metadata.match_id.as_str();

        if let Some(cached) = self.db.get_match_analysis(match_id, SCORE_FORMULA_VERSION).await? {
            return Ok(cached);
        }

        let info = &match_.info;
        let duration_min = (info.game_duration as f64 / 60.0).max(1.0);
        let context = AggregateContext {
            tier,
            patch: match_.patch(),
            duration_bucket: DurationBucket::from_seconds(info.game_duration)
        };

        let mut team_damage: HashMap<TeamSide, i64> = HashMap::new();
        let mut team_gold: HashMap<TeamSide, i64> = HashMap::new();
        for p in &info.participants {
            *team_damage.entry(p.team_id).or_insert(0) += p.total_damage_dealt_to_champions;
            *team_gold.entry(p.team_id).or_insert(0) += p.gold_earned;
        }

        let features = timeline
            .map(|t| TimelineFeatures::extract(t, &info.participants))
            .unwrap_or_default();

        let mut results: HashMap<String, ScoreResult> = HashMap::new();
        let mut honors_entries: Vec<(String, f64, bool, i64)> = Vec::new();

        for p in &info.participants {
            let role = Role::from_team_position(&p.team_position);

            let champion_stat = match role {
                Some(role) => self.db.get_champion_stat(p.champion_id, role, &context).await?,
                None => None
            };

            // Matchup precision is reserved for the player whose sync paid
            // for the lookups; everyone else scores on champion baselines.
            let matchup_stat = match role {
                Some(role) if p.puuid == focus_puuid => {
                    let opponent = info
                        .participants
                        .iter()
                        .find(|o| o.team_id != p.team_id && Role::from_team_position(&o.team_position) == Some(role));
                    match opponent {
                        Some(opponent) => {
                            self.db
                                .get_matchup_stat(p.champion_id, opponent.champion_id, role, &context)
                                .await?
                        }
                        None => None
                    }
                }
                _ => None
            };

            let baselines = BaselineSet::resolve(
                champion_stat.as_ref().map(|c| &c.totals),
                matchup_stat.as_ref().map(|m| &m.totals),
                role
            );

            let snapshot = ParticipantSnapshot {
                role,
                // Champion class tags live in the static-data service that
                // sits outside this core; neutral modifiers apply.
                champion_class: None,
                win: p.win,
                kills: p.kills,
                deaths: p.deaths,
                assists: p.assists,
                weighted_deaths: features.weighted_deaths.get(&p.participant_id).copied(),
                damage_to_champions: p.total_damage_dealt_to_champions,
                gold_earned: p.gold_earned,
                total_cs: p.total_cs(),
                vision_score: p.vision_score,
                cc_seconds: p.time_c_cing_others,
                heals_on_teammates: p.total_heals_on_teammates,
                shields_on_teammates: p.total_damage_shielded_on_teammates,
                team_damage: *team_damage.get(&p.team_id).unwrap_or(&1),
                team_gold: *team_gold.get(&p.team_id).unwrap_or(&1),
                duration_min,
                objective_participation: p
                    .challenges
                    .as_ref()
                    .map(|c| c.objective_participation())
                    .unwrap_or(0),
                lane: features.lane_diffs.get(&p.participant_id).copied()
            };

            let result = score_participant(&snapshot, &baselines);
            honors_entries.push((p.puuid.clone(), result.score, p.win, p.gold_earned));
            results.insert(p.puuid.clone(), result);
        }

        let (mvp, ace) = label_best_performers(&honors_entries);

        let analysis = MatchAnalysis {
            match_id: match_id.to_string(),
            version: SCORE_FORMULA_VERSION.to_string(),
            results,
            mvp,
            ace
        };
        self.db.upsert_match_analysis(&analysis).await?;

        if let Some(own) = analysis.results.get(focus_puuid) {
            self.db.set_link_score(focus_puuid, match_id, own.score).await?;
        }

        Ok(analysis)
    }

    /// Recomputes scores for an already-stored match, e.g. after a formula
    /// version bump made the cached analysis stale. The tier context is
    /// recovered from the match's average-rank annotation.
    pub async fn rescore_stored_match(
        &self,
        match_id: &str,
        focus_puuid: &str
    ) -> Result<Option<MatchAnalysis>, SyncError> {
        let Some(record) = self.db.get_match(match_id).await? else {
            return Ok(None);
        };

        let match_ = match MatchDto::from_value(&record.payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(match_id, error = %e, "stored match payload is unparseable");
                return Ok(None);
            }
        };
        let timeline = record
            .payload
            .get("timeline")
            .and_then(|t| TimelineDto::from_value(t).ok());

        let tier = record
            .average_rank
            .as_deref()
            .and_then(|label| label.split(' ').next())
            .and_then(|t| Tier::from_str(t).ok())
            .unwrap_or(Tier::Emerald);

        let analysis = self.score_match(&match_, timeline.as_ref(), tier, focus_puuid).await?;
        Ok(Some(analysis))
    }

    /// The tier context used for aggregate keys and the average-rank
    /// annotation: solo queue first, flex as fallback, Emerald by default.
    async fn tier_context(&self, puuid: &str) -> Result<(Tier, String), SyncError> {
        let ranks = self.db.get_ranks(puuid).await?;

        let pick = ranks
            .iter()
            .find(|r| r.queue_type == SOLO_QUEUE)
            .or_else(|| ranks.iter().find(|r| r.queue_type == FLEX_QUEUE));

        match pick {
            Some(rank) => {
                let tier = Tier::from_str(&rank.tier).unwrap_or(Tier::Emerald);
                let label = if rank.division.is_empty() {
                    rank.tier.clone()
                } else {
                    format!("{} {}", rank.tier, rank.division)
                };
                Ok((tier, label))
            }
            None => Ok((Tier::Emerald, Tier::Emerald.as_str().to_string()))
        }
    }
}

fn already_current(summoner: &Summoner) -> bool {
    match (summoner.last_match_fetch, summoner.revision_date) {
        (Some(last_fetch), Some(revision)) => {
            last_fetch > revision + chrono::Duration::seconds(CLOCK_SKEW_BUFFER_SECS)
        }
        _ => false
    }
}

#[cfg(test)]
mod tests {
    use super::{already_current, plan_fetch, Backfill};
    use crate::utils::test_utils::generate_summoner_row;
    use chrono::{Duration, Utc};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("EUW1_{i}")).collect()
    }

    #[test]
    fn test_first_sync_takes_newest_ten() {
        let new_ids = ids(12);
        let plan = plan_fetch(0, &new_ids);

        assert_eq!(plan.new_ids, new_ids[..10].to_vec());
        assert_eq!(plan.backfill, None);
    }

    #[test]
    fn test_many_new_ids_fetch_head_plus_backfill() {
        let new_ids = ids(7);
        let plan = plan_fetch(50, &new_ids);

        assert_eq!(plan.new_ids, new_ids[..5].to_vec());
        assert_eq!(plan.backfill, Some(Backfill { offset: 57, count: 5 }));
    }

    #[test]
    fn test_few_new_ids_fetch_all_plus_backfill() {
        let new_ids = ids(3);
        let plan = plan_fetch(20, &new_ids);

        assert_eq!(plan.new_ids, new_ids);
        assert_eq!(plan.backfill, Some(Backfill { offset: 23, count: 5 }));
    }

    #[test]
    fn test_no_new_ids_is_pure_backfill() {
        let plan = plan_fetch(50, &[]);

        assert!(plan.new_ids.is_empty());
        assert_eq!(plan.backfill, Some(Backfill { offset: 50, count: 10 }));
    }

    #[test]
    fn test_skip_fast_path_needs_both_markers() {
        let now = Utc::now();

        let mut synced = generate_summoner_row("p1");
        synced.last_match_fetch = Some(now);
        synced.revision_date = Some(now - Duration::hours(2));
        assert!(already_current(&synced));

        // Upstream activity after our last fetch.
        let mut active = generate_summoner_row("p1");
        active.last_match_fetch = Some(now - Duration::hours(2));
        active.revision_date = Some(now);
        assert!(!already_current(&active));

        // Inside the clock-skew buffer counts as activity.
        let mut skewed = generate_summoner_row("p1");
        skewed.last_match_fetch = Some(now);
        skewed.revision_date = Some(now - Duration::seconds(30));
        assert!(!already_current(&skewed));

        let mut unsynced = generate_summoner_row("p1");
        unsynced.last_match_fetch = None;
        unsynced.revision_date = Some(now);
        assert!(!already_current(&unsynced));
    }
}
