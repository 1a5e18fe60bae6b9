// Ingestion constants

/// Current major.minor patch. Matches on another patch are counted and
/// skipped during sync so stale-patch games never pollute the baselines.
pub const CURRENT_PATCH: &str = "15.24";

/// How many recent match ids one sync cycle inspects upstream.
pub const MATCH_ID_PAGE_SIZE: usize = 20;

/// First sync for a player pulls this many of the newest matches.
pub const FIRST_SYNC_COUNT: usize = 10;

/// Cap on new matches pulled per regular sync cycle.
pub const NEW_HEAD_COUNT: usize = 5;

/// Matches pulled from deeper history per regular sync cycle.
pub const BACKFILL_COUNT: usize = 5;

/// Matches pulled when a cycle has nothing new (pure backfill).
pub const PURE_BACKFILL_COUNT: usize = 10;

/// Concurrent match+timeline fetches during one sync.
pub const MATCH_FETCH_CONCURRENCY: usize = 3;

/// Concurrent league lookups during a bulk leaderboard refresh.
pub const RANK_REFRESH_CONCURRENCY: usize = 20;

/// Profile data younger than this is served without touching the upstream.
pub const PROFILE_CACHE_TTL_SECS: i64 = 10 * 60;

/// Allowance for clock drift between our last-sync stamp and the upstream
/// revision marker when deciding the skip fast-path.
pub const CLOCK_SKEW_BUFFER_SECS: i64 = 60;

/// Version tag for cached score results. Bumping it invalidates every
/// previously cached analysis (the old tag no longer matches).
pub const SCORE_FORMULA_VERSION: &str = "6.0";

// Job priorities: lower claims first.
pub const JOB_PRIORITY_INTERACTIVE: i32 = 0;
pub const JOB_PRIORITY_BULK: i32 = 10;

