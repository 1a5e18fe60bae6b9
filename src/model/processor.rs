use crate::api::api_structs::{MatchDto, ParticipantDto, TimelineDto, TimelineEventDto};
use crate::database::db::DbError;
use crate::model::build_keys::{
    bump, core_build_keys, final_build_key, replay_item_events, rune_keys, skill_order_key, starting_items_key,
    tracked_final_items, FreqMap
};
use crate::model::structures::{
    duration_bucket::DurationBucket, role::Role, stat_totals::StatTotals, team_side::TeamSide, tier::Tier
};
use std::collections::HashMap;
use tracing::warn;

/// Shared aggregate key context: every row touched while folding one match
/// carries the same tier/patch/bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateContext {
    pub tier: Tier,
    pub patch: String,
    pub duration_bucket: DurationBucket
}

/// One participant's contribution to their champion aggregate.
#[derive(Debug, Clone)]
pub struct ParticipantDelta {
    pub champion_id: i32,
    pub role: Role,
    pub totals: StatTotals,
    pub items: FreqMap,
    pub runes: FreqMap,
    pub spells: FreqMap,
    pub skill_orders: FreqMap
}

/// Same totals, narrowed to the role-mirrored opposing champion.
#[derive(Debug, Clone)]
pub struct MatchupDelta {
    pub champion_id: i32,
    pub opponent_id: i32,
    pub role: Role,
    pub totals: StatTotals
}

#[derive(Debug, Clone)]
pub struct DuoDelta {
    pub champion_id: i32,
    pub partner_id: i32,
    pub role: Role,
    pub partner_role: Role,
    pub win: bool
}

/// Everything one match adds to the global statistics, computed up front so
/// application is nothing but increments and map merges.
#[derive(Debug, Clone)]
pub struct MatchDeltas {
    pub match_id: String,
    pub context: AggregateContext,
    /// Banned champion ids (skipped bans excluded).
    pub bans: Vec<i32>,
    pub participants: Vec<ParticipantDelta>,
    pub matchups: Vec<MatchupDelta>,
    pub duos: Vec<DuoDelta>
}

impl MatchDeltas {
    pub fn from_match(match_: &MatchDto, timeline: Option<&TimelineDto>, tier: Tier) -> MatchDeltas {
        let info = &match_.info;
        let context = AggregateContext {
            tier,
            patch: match_.patch(),
            duration_bucket: DurationBucket::from_seconds(info.game_duration)
        };

        let bans = info
            .teams
            .iter()
            .flat_map(|t| t.bans.iter())
            .filter(|b| b.champion_id != -1)
            .map(|b| b.champion_id)
            .collect();

        // Team totals for share computation.
        let mut team_damage: HashMap<TeamSide, i64> = HashMap::new();
        let mut team_gold: HashMap<TeamSide, i64> = HashMap::new();
        for p in &info.participants {
            *team_damage.entry(p.team_id).or_insert(0) += p.total_damage_dealt_to_champions;
            *team_gold.entry(p.team_id).or_insert(0) += p.gold_earned;
        }

        let events: Vec<&TimelineEventDto> = timeline.map(|t| t.events().collect()).unwrap_or_default();

        let mut participants = Vec::new();
        let mut matchups = Vec::new();
        let mut duos = Vec::new();

        for p in &info.participants {
            let Some(role) = Role::from_team_position(&p.team_position) else {
                // Unknown role: excluded from aggregates, link kept elsewhere.
                continue;
            };

            let totals = participant_totals(
                p,
                info.game_duration,
                *team_damage.get(&p.team_id).unwrap_or(&0),
                *team_gold.get(&p.team_id).unwrap_or(&0)
            );

            participants.push(ParticipantDelta {
                champion_id: p.champion_id,
                role,
                totals: totals.clone(),
                items: item_freq_map(p, &events),
                runes: rune_freq_map(p),
                spells: spell_freq_map(p),
                skill_orders: skill_order_freq_map(p, &events)
            });

            // Matchup versus the role-mirrored opponent.
            let opponent = info
                .participants
                .iter()
                .find(|o| o.team_id != p.team_id && Role::from_team_position(&o.team_position) == Some(role));
            if let Some(opponent) = opponent {
                matchups.push(MatchupDelta {
                    champion_id: p.champion_id,
                    opponent_id: opponent.champion_id,
                    role,
                    totals
                });
            }

            // Duos for laning-interaction pairs, one row per perspective.
            for mate in &info.participants {
                if mate.team_id != p.team_id || mate.participant_id == p.participant_id {
                    continue;
                }
                let Some(mate_role) = Role::from_team_position(&mate.team_position) else {
                    continue;
                };
                if role.lanes_with(mate_role) {
                    duos.push(DuoDelta {
                        champion_id: p.champion_id,
                        partner_id: mate.champion_id,
                        role,
                        partner_role: mate_role,
                        win: p.win
                    });
                }
            }
        }

        MatchDeltas {
            match_id: match_.metadata.match_id.clone(),
            context,
            bans,
            participants,
            matchups,
            duos
        }
    }
}

fn participant_totals(p: &ParticipantDto, duration: i64, team_damage: i64, team_gold: i64) -> StatTotals {
    let minutes = (duration as f64 / 60.0).max(1.0);
    let damage_share = p.total_damage_dealt_to_champions as f64 / team_damage.max(1) as f64;
    let gold_share = p.gold_earned as f64 / team_gold.max(1) as f64;

    StatTotals {
        matches: 1,
        wins: if p.win { 1 } else { 0 },
        total_kills: p.kills as i64,
        total_deaths: p.deaths as i64,
        total_assists: p.assists as i64,
        total_damage: p.total_damage_dealt_to_champions,
        total_gold: p.gold_earned,
        total_cs: p.total_cs() as i64,
        total_vision: p.vision_score as i64,
        total_duration: duration,
        total_damage_share: damage_share,
        total_gold_share: gold_share,
        total_vision_per_min: p.vision_score as f64 / minutes,
        total_objective_participation: p
            .challenges
            .as_ref()
            .map(|c| c.objective_participation() as i64)
            .unwrap_or(0),
        total_damage_share_sq: damage_share * damage_share,
        total_gold_share_sq: gold_share * gold_share
    }
}

fn item_freq_map(p: &ParticipantDto, events: &[&TimelineEventDto]) -> FreqMap {
    let mut map = FreqMap::new();
    let tracked = tracked_final_items(&p.final_items());

    if let Some(key) = final_build_key(&tracked) {
        bump(&mut map, key, p.win);
    }
    for id in &tracked {
        bump(&mut map, id.to_string(), p.win);
    }

    // Starting items and incremental core build need the timeline.
    let clean = replay_item_events(events, p.participant_id);
    if !clean.is_empty() {
        if let Some(key) = starting_items_key(&clean) {
            bump(&mut map, key, p.win);
        }
        for key in core_build_keys(&clean, &tracked) {
            bump(&mut map, key, p.win);
        }
    }

    map
}

fn rune_freq_map(p: &ParticipantDto) -> FreqMap {
    let mut map = FreqMap::new();
    if let Some(perks) = &p.perks {
        for key in rune_keys(perks) {
            bump(&mut map, key, p.win);
        }
    }
    map
}

fn spell_freq_map(p: &ParticipantDto) -> FreqMap {
    let mut map = FreqMap::new();
    for spell in [p.summoner1_id, p.summoner2_id] {
        if spell != 0 {
            bump(&mut map, spell.to_string(), p.win);
        }
    }
    map
}

fn skill_order_freq_map(p: &ParticipantDto, events: &[&TimelineEventDto]) -> FreqMap {
    let mut map = FreqMap::new();
    if let Some(key) = skill_order_key(events, p.participant_id) {
        bump(&mut map, key, p.win);
    }
    map
}

/// The slice of the persistent store the aggregate processor relies on:
/// a scanned-marker gate, atomic counter increments, and frequency-map
/// merges. Implemented by `DbClient` and by an in-memory double in tests.
#[allow(async_fn_in_trait)]
pub trait AggregateStore {
    async fn is_match_scanned(&self, match_id: &str) -> Result<bool, DbError>;
    async fn increment_ban(&self, context: &AggregateContext, champion_id: i32) -> Result<(), DbError>;
    async fn apply_champion_delta(&self, context: &AggregateContext, delta: &ParticipantDelta) -> Result<(), DbError>;
    async fn apply_matchup_delta(&self, context: &AggregateContext, delta: &MatchupDelta) -> Result<(), DbError>;
    async fn apply_duo_delta(&self, context: &AggregateContext, delta: &DuoDelta) -> Result<(), DbError>;
    async fn mark_match_scanned(&self, match_id: &str, context: &AggregateContext) -> Result<(), DbError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Processed,
    AlreadyScanned
}

/// Folds freshly-ingested matches into the global statistics exactly once.
pub struct AggregateProcessor<S> {
    store: S
}

impl<S: AggregateStore> AggregateProcessor<S> {
    pub fn new(store: S) -> AggregateProcessor<S> {
        AggregateProcessor { store }
    }

    /// Processes one match. The scanned marker is written last, so any
    /// failure leaves the match unmarked and it is retried on a later pass.
    pub async fn process_match(
        &self,
        match_: &MatchDto,
        timeline: Option<&TimelineDto>,
        tier: Tier
    ) -> Result<ProcessOutcome, DbError> {
        let match_id = match_.metadata.match_id.as_str();

        if self.store.is_match_scanned(match_id).await? {
            return Ok(ProcessOutcome::AlreadyScanned);
        }

        let deltas = MatchDeltas::from_match(match_, timeline, tier);

        for champion_id in &deltas.bans {
            self.store.increment_ban(&deltas.context, *champion_id).await?;
        }
        for delta in &deltas.participants {
            self.store.apply_champion_delta(&deltas.context, delta).await?;
        }
        for delta in &deltas.matchups {
            self.store.apply_matchup_delta(&deltas.context, delta).await?;
        }
        for delta in &deltas.duos {
            self.store.apply_duo_delta(&deltas.context, delta).await?;
        }

        self.store.mark_match_scanned(match_id, &deltas.context).await?;
        Ok(ProcessOutcome::Processed)
    }

    /// Batch entry point: per-match failures are logged and skipped so one
    /// bad payload never aborts the rest.
    pub async fn process_batch(&self, matches: &[(MatchDto, Option<TimelineDto>, Tier)]) -> usize {
        let mut processed = 0;

        for (match_, timeline, tier) in matches {
            match self.process_match(match_, timeline.as_ref(), *tier).await {
                Ok(ProcessOutcome::Processed) => processed += 1,
                Ok(ProcessOutcome::AlreadyScanned) => {}
                Err(e) => {
                    warn!(match_id = %match_.metadata.match_id, error = %e, "aggregate processing failed, match left unscanned");
                }
            }
        }

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::{AggregateContext, AggregateProcessor, AggregateStore, DuoDelta, MatchDeltas, MatchupDelta,
                ParticipantDelta, ProcessOutcome};
    use crate::database::db::DbError;
    use crate::model::build_keys::merge_freq_maps;
    use crate::model::structures::{role::Role, stat_totals::StatTotals, tier::Tier};
    use crate::utils::test_utils::generate_full_match;
    use approx::assert_abs_diff_eq;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryAggregates {
        scanned: Mutex<HashSet<String>>,
        bans: Mutex<HashMap<i32, i64>>,
        champions: Mutex<HashMap<(i32, Role), StatTotals>>,
        matchups: Mutex<HashMap<(i32, i32, Role), StatTotals>>,
        duos: Mutex<HashMap<(i32, i32, Role, Role), (i64, i64)>>,
        items: Mutex<HashMap<(i32, Role), crate::model::build_keys::FreqMap>>
    }

    impl AggregateStore for InMemoryAggregates {
        async fn is_match_scanned(&self, match_id: &str) -> Result<bool, DbError> {
            Ok(self.scanned.lock().unwrap().contains(match_id))
        }

        async fn increment_ban(&self, _context: &AggregateContext, champion_id: i32) -> Result<(), DbError> {
            *self.bans.lock().unwrap().entry(champion_id).or_insert(0) += 1;
            Ok(())
        }

        async fn apply_champion_delta(
            &self,
            _context: &AggregateContext,
            delta: &ParticipantDelta
        ) -> Result<(), DbError> {
            self.champions
                .lock()
                .unwrap()
                .entry((delta.champion_id, delta.role))
                .or_default()
                .add(&delta.totals);
            merge_freq_maps(
                self.items
                    .lock()
                    .unwrap()
                    .entry((delta.champion_id, delta.role))
                    .or_default(),
                &delta.items
            );
            Ok(())
        }

        async fn apply_matchup_delta(&self, _context: &AggregateContext, delta: &MatchupDelta) -> Result<(), DbError> {
            self.matchups
                .lock()
                .unwrap()
                .entry((delta.champion_id, delta.opponent_id, delta.role))
                .or_default()
                .add(&delta.totals);
            Ok(())
        }

        async fn apply_duo_delta(&self, _context: &AggregateContext, delta: &DuoDelta) -> Result<(), DbError> {
            let mut duos = self.duos.lock().unwrap();
            let entry = duos
                .entry((delta.champion_id, delta.partner_id, delta.role, delta.partner_role))
                .or_insert((0, 0));
            entry.0 += 1;
            if delta.win {
                entry.1 += 1;
            }
            Ok(())
        }

        async fn mark_match_scanned(&self, match_id: &str, _context: &AggregateContext) -> Result<(), DbError> {
            self.scanned.lock().unwrap().insert(match_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_deltas_cover_all_recognized_participants() {
        let match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        assert_eq!(deltas.participants.len(), 10);
        assert_eq!(deltas.matchups.len(), 10);
        // Per team: mid+jungle, adc+support, top+jungle, both directions.
        assert_eq!(deltas.duos.len(), 12);
        assert!(deltas.participants.iter().all(|p| p.totals.matches == 1));
        assert_eq!(deltas.context.patch, "15.24");
    }

    #[test]
    fn test_team_shares_sum_to_one() {
        let match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        let winners: f64 = deltas
            .participants
            .iter()
            .filter(|p| p.totals.wins == 1)
            .map(|p| p.totals.total_damage_share)
            .sum();
        assert_abs_diff_eq!(winners, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_squared_shares_track_shares() {
        let match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        for p in &deltas.participants {
            assert_abs_diff_eq!(
                p.totals.total_damage_share_sq,
                p.totals.total_damage_share * p.totals.total_damage_share,
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                p.totals.total_gold_share_sq,
                p.totals.total_gold_share * p.totals.total_gold_share,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_unknown_role_is_excluded() {
        let mut match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);
        match_.info.participants[0].team_position = String::new();
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        assert_eq!(deltas.participants.len(), 9);
        // The mirrored opponent also loses their matchup row.
        assert_eq!(deltas.matchups.len(), 8);
    }

    #[test]
    fn test_skipped_bans_are_dropped() {
        let match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);
        let deltas = MatchDeltas::from_match(&match_, None, Tier::Emerald);

        // The generator marks one ban per team as skipped.
        assert_eq!(deltas.bans.len(), 8);
        assert!(deltas.bans.iter().all(|id| *id != -1));
    }

    #[tokio::test]
    async fn test_double_processing_changes_nothing() {
        let store = InMemoryAggregates::default();
        let processor = AggregateProcessor::new(store);
        let match_ = generate_full_match("EUW1_1", "15.24.1.1", 1850);

        let first = processor
            .process_match(&match_, None, Tier::Emerald)
            .await
            .unwrap();
        assert_eq!(first, ProcessOutcome::Processed);

        let counters_after_first = processor.store.champions.lock().unwrap().clone();
        let bans_after_first = processor.store.bans.lock().unwrap().clone();

        let second = processor
            .process_match(&match_, None, Tier::Emerald)
            .await
            .unwrap();
        assert_eq!(second, ProcessOutcome::AlreadyScanned);

        assert_eq!(*processor.store.champions.lock().unwrap(), counters_after_first);
        assert_eq!(*processor.store.bans.lock().unwrap(), bans_after_first);
    }
}
