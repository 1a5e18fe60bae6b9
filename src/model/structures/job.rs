use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A queued unit of background work. The payload is stored as JSONB and
/// round-trips through serde; the tag doubles as the `job_type` column so
/// operators can filter jobs without unpacking payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPayload {
    PlayerSync {
        puuid: String,
        platform: String,
        force: bool
    },
    LeaderboardRefresh {
        platform: String,
        queue: String
    },
    TierScan {
        platform: String,
        tier: String,
        /// Cap on how many newly-seen players one scan may enqueue.
        limit: i32
    }
}

impl JobPayload {
    pub fn job_type(&self) -> &'static str {
        match self {
            JobPayload::PlayerSync { .. } => "PLAYER_SYNC",
            JobPayload::LeaderboardRefresh { .. } => "LEADERBOARD_REFRESH",
            JobPayload::TierScan { .. } => "TIER_SCAN"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED"
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(())
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
