use crate::api::{ApiError, RiotApiClient};
use crate::constants::{JOB_PRIORITY_BULK, RANK_REFRESH_CONCURRENCY};
use crate::database::db::{DbClient, DbError};
use crate::database::db_structs::{Job, Summoner};
use crate::messaging::{PublisherError, RabbitMqPublisher};
use crate::model::structures::{
    job::{JobPayload, JobStatus},
    priority::Priority,
    tier::Tier
};
use crate::sync::{MatchSynchronizer, SyncError, SOLO_QUEUE};
use crate::utils::progress_utils::progress_bar;
use chrono::{TimeZone, Utc};
use futures::{stream, StreamExt};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("malformed job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Publish(#[from] PublisherError)
}

/// Single-drain background worker. Exactly one job runs at a time so bulk
/// side effects (leaderboard refreshes, tier scans) never double-fire.
pub struct JobWorker {
    db: DbClient,
    api: RiotApiClient,
    synchronizer: MatchSynchronizer,
    publisher: Option<RabbitMqPublisher>,
    poll_interval: Duration
}

impl JobWorker {
    pub fn new(api: RiotApiClient, db: DbClient, publisher: Option<RabbitMqPublisher>) -> JobWorker {
        let synchronizer = MatchSynchronizer::new(api.clone(), db.clone());

        JobWorker {
            db,
            api,
            synchronizer,
            publisher,
            poll_interval: Duration::from_secs(5)
        }
    }

    /// Drains the queue forever, sleeping between polls when idle.
    pub async fn run(&self) {
        info!("job worker started");

        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "worker tick failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Claims and executes at most one job. Returns whether a job ran.
    pub async fn tick(&self) -> Result<bool, WorkerError> {
        let Some(job) = self.db.claim_next_job().await? else {
            return Ok(false);
        };

        info!(job_id = job.id, job_type = %job.job_type, "job claimed");

        match self.execute(&job).await {
            Ok(()) => {
                self.db.finish_job(job.id, JobStatus::Completed, None).await?;
                info!(job_id = job.id, "job completed");
            }
            Err(e) => {
                self.db
                    .finish_job(job.id, JobStatus::Failed, Some(&e.to_string()))
                    .await?;
                warn!(job_id = job.id, error = %e, "job failed");
            }
        }

        Ok(true)
    }

    async fn execute(&self, job: &Job) -> Result<(), WorkerError> {
        let payload: JobPayload = serde_json::from_value(job.payload.clone())?;

        match payload {
            JobPayload::PlayerSync { puuid, platform, force } => self.run_player_sync(&puuid, &platform, force).await,
            JobPayload::LeaderboardRefresh { platform, queue } => {
                self.run_leaderboard_refresh(&platform, &queue).await
            }
            JobPayload::TierScan { platform, tier, limit } => self.run_tier_scan(&platform, &tier, limit).await
        }
    }

    async fn run_player_sync(&self, puuid: &str, platform: &str, force: bool) -> Result<(), WorkerError> {
        let summoner = match self.db.get_summoner(puuid).await? {
            Some(summoner) => summoner,
            None => self.bootstrap_summoner(puuid, platform).await?
        };

        self.synchronizer
            .refresh_ranks(puuid, platform, Priority::Background)
            .await?;

        let outcome = self
            .synchronizer
            .sync_matches(&summoner, Priority::Background, force)
            .await?;

        if let Some(publisher) = &self.publisher {
            if !outcome.already_current {
                publisher.publish_sync_completed(puuid, platform, outcome.fetched).await?;
            }
        }

        Ok(())
    }

    /// First time we see a puuid from a scan: store a minimal identity row.
    /// Display names arrive with the first interactive lookup.
    async fn bootstrap_summoner(&self, puuid: &str, platform: &str) -> Result<Summoner, WorkerError> {
        let dto = self.api.get_summoner(puuid, platform, Priority::Background).await?;

        let summoner = Summoner {
            puuid: puuid.to_string(),
            game_name: String::new(),
            tag_line: String::new(),
            platform: platform.to_string(),
            summoner_id: Some(dto.id.clone()),
            profile_icon_id: dto.profile_icon_id,
            summoner_level: dto.summoner_level,
            last_match_fetch: None,
            revision_date: Utc.timestamp_millis_opt(dto.revision_date).single(),
            updated_at: Utc::now()
        };
        self.db.upsert_summoner(&summoner).await?;

        Ok(summoner)
    }

    /// Refreshes ranks for every tracked player on a platform with bounded
    /// parallelism, recomputing the leaderboard sort values.
    async fn run_leaderboard_refresh(&self, platform: &str, _queue: &str) -> Result<(), WorkerError> {
        let summoners = self.db.get_platform_summoners(platform).await?;
        info!(platform, players = summoners.len(), "refreshing leaderboard ranks");

        let bar = progress_bar(summoners.len() as u64, "Refreshing ranks".to_string());

        let refreshed: usize = stream::iter(summoners.iter())
            .map(|summoner| {
                let bar = bar.clone();
                async move {
                    let result = self
                        .synchronizer
                        .refresh_ranks(&summoner.puuid, platform, Priority::Background)
                        .await;

                    if let Some(bar) = &bar {
                        bar.inc(1);
                    }

                    match result {
                        Ok(()) => 1,
                        Err(e) => {
                            warn!(puuid = %summoner.puuid, error = %e, "rank refresh failed");
                            0
                        }
                    }
                }
            })
            .buffer_unordered(RANK_REFRESH_CONCURRENCY)
            .collect::<Vec<usize>>()
            .await
            .into_iter()
            .sum();

        if let Some(bar) = bar {
            bar.finish();
        }

        info!(platform, refreshed, "leaderboard refresh complete");
        Ok(())
    }

    /// Walks an apex league list and enqueues sync jobs for players we have
    /// not ingested yet, seeding the aggregate baselines from the top of
    /// the ladder.
    async fn run_tier_scan(&self, platform: &str, tier: &str, limit: i32) -> Result<(), WorkerError> {
        let tier = Tier::from_str(tier).unwrap_or(Tier::Challenger);
        if !tier.is_apex() {
            warn!(tier = %tier, "tier scan only covers apex tiers, skipping");
            return Ok(());
        }

        let league = self
            .api
            .get_apex_league(platform, tier, SOLO_QUEUE, Priority::Background)
            .await?;

        let mut enqueued = 0;
        for entry in league.entries.iter().take(limit.max(0) as usize) {
            let Some(puuid) = &entry.puuid else { continue };

            if self.db.get_summoner(puuid).await?.is_some() {
                continue;
            }

            self.db
                .enqueue_job(
                    &JobPayload::PlayerSync {
                        puuid: puuid.clone(),
                        platform: platform.to_string(),
                        force: false
                    },
                    JOB_PRIORITY_BULK
                )
                .await?;
            enqueued += 1;
        }

        info!(platform, tier = %tier, enqueued, "tier scan complete");
        Ok(())
    }
}
