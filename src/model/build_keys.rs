use crate::api::api_structs::{PerksDto, TimelineEventDto};
use itertools::Itertools;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One cell of a frequency map: how often a distinct build/rune/spell/skill
/// key appeared and how often it won.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreqEntry {
    pub wins: i64,
    pub matches: i64
}

pub type FreqMap = HashMap<String, FreqEntry>;

/// Add-or-initialize merge. This is the one read-merge-write spot in the
/// aggregate pipeline; numeric counters elsewhere are pure increments.
pub fn merge_freq_maps(current: &mut FreqMap, delta: &FreqMap) {
    for (key, entry) in delta {
        let slot = current.entry(key.clone()).or_default();
        slot.wins += entry.wins;
        slot.matches += entry.matches;
    }
}

pub fn bump(map: &mut FreqMap, key: String, win: bool) {
    let entry = map.entry(key).or_default();
    entry.matches += 1;
    if win {
        entry.wins += 1;
    }
}

lazy_static! {
    /// Trinkets, consumables and starter items carry no build signal.
    static ref IGNORED_ITEMS: HashSet<i32> = HashSet::from([
        3340, 3363, 3364, 3330, // trinkets
        2003, 2055, 2140, 2138, 2139, // consumables
        1054, 1055, 1056, 1082, 1083, 1101, 1102, 1103, // starters
    ]);

    /// Wards and sweepers, excluded from the starting-items key.
    static ref VISION_ITEMS: HashSet<i32> = HashSet::from([3340, 3363, 3364, 3330, 2055, 2049, 2045, 2044]);
}

/// Final inventory filtered down to items worth tracking, numerically
/// sorted so the same build always produces the same key.
pub fn tracked_final_items(slots: &[i32]) -> Vec<i32> {
    slots
        .iter()
        .copied()
        .filter(|id| *id != 0 && !IGNORED_ITEMS.contains(id))
        .sorted()
        .collect()
}

pub fn final_build_key(tracked: &[i32]) -> Option<String> {
    if tracked.is_empty() {
        return None;
    }
    Some(tracked.iter().join("-"))
}

/// A purchase or sale that survived undo replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanItemEvent {
    pub purchased: bool,
    pub item_id: i32,
    pub timestamp: i64
}

/// Replays ITEM_PURCHASED / ITEM_SOLD / ITEM_UNDO events for one participant
/// into the list of transactions that actually stood. An undo cancels the
/// most recent matching purchase (`before_id`) or sale (`after_id`).
pub fn replay_item_events(events: &[&TimelineEventDto], participant_id: i32) -> Vec<CleanItemEvent> {
    let mut clean: Vec<CleanItemEvent> = Vec::new();

    let mut owned: Vec<&TimelineEventDto> = events
        .iter()
        .copied()
        .filter(|e| e.participant_id == Some(participant_id))
        .collect();
    owned.sort_by_key(|e| e.timestamp);

    for event in owned {
        match event.event_type.as_str() {
            "ITEM_PURCHASED" => {
                if let Some(item_id) = event.item_id {
                    clean.push(CleanItemEvent {
                        purchased: true,
                        item_id,
                        timestamp: event.timestamp
                    });
                }
            }
            "ITEM_SOLD" => {
                if let Some(item_id) = event.item_id {
                    clean.push(CleanItemEvent {
                        purchased: false,
                        item_id,
                        timestamp: event.timestamp
                    });
                }
            }
            "ITEM_UNDO" => {
                let undoes_last = clean.last().map(|last| {
                    (last.purchased && Some(last.item_id) == event.before_id)
                        || (!last.purchased && Some(last.item_id) == event.after_id)
                });
                if undoes_last == Some(true) {
                    clean.pop();
                }
            }
            _ => {}
        }
    }

    clean
}

/// `start_` key over the non-vision purchases made in the first minute.
pub fn starting_items_key(clean: &[CleanItemEvent]) -> Option<String> {
    let ids: Vec<i32> = clean
        .iter()
        .filter(|e| e.purchased && e.timestamp <= 60_000 && !VISION_ITEMS.contains(&e.item_id))
        .map(|e| e.item_id)
        .sorted()
        .collect();

    if ids.is_empty() {
        return None;
    }
    Some(format!("start_{}", ids.iter().join("-")))
}

/// Incremental core-build keys: the first 3 purchased-and-kept items form
/// the core, items 4..6 extend it slot by slot. Purchase order is
/// preserved; only items still in the final inventory count as kept.
pub fn core_build_keys(clean: &[CleanItemEvent], tracked_final: &[i32]) -> Vec<String> {
    let final_set: HashSet<i32> = tracked_final.iter().copied().collect();

    let mut seen = HashSet::new();
    let build_path: Vec<i32> = clean
        .iter()
        .filter(|e| e.purchased && final_set.contains(&e.item_id))
        .map(|e| e.item_id)
        .filter(|id| seen.insert(*id))
        .collect();

    if build_path.is_empty() {
        return Vec::new();
    }

    let core_len = build_path.len().min(3);
    let core_key = format!("core_{}", build_path[..core_len].iter().join("-"));

    let mut keys = vec![core_key.clone()];
    for (slot, item) in build_path.iter().enumerate().take(6).skip(3) {
        keys.push(format!("{}_slot{}_{}", core_key, slot + 1, item));
    }

    keys
}

/// `page_` key covering the full rune page (styles, selections, stat
/// perks), plus one key per individual perk id.
pub fn rune_keys(perks: &PerksDto) -> Vec<String> {
    let mut keys = Vec::new();

    let primary = perks.styles.iter().find(|s| s.description == "primaryStyle");
    let sub = perks.styles.iter().find(|s| s.description == "subStyle");

    if let (Some(primary), Some(sub)) = (primary, sub) {
        let primary_ids = primary.selections.iter().map(|s| s.perk).join("-");
        let sub_ids = sub.selections.iter().map(|s| s.perk).join("-");
        let stat_ids = [perks.stat_perks.offense, perks.stat_perks.flex, perks.stat_perks.defense]
            .iter()
            .filter(|id| **id != 0)
            .join("-");

        keys.push(format!(
            "page_{}-{}-{}-{}-{}",
            primary.style, sub.style, primary_ids, sub_ids, stat_ids
        ));
    }

    for style in &perks.styles {
        for selection in &style.selections {
            keys.push(selection.perk.to_string());
        }
    }

    for stat in [perks.stat_perks.offense, perks.stat_perks.flex, perks.stat_perks.defense] {
        if stat != 0 {
            keys.push(stat.to_string());
        }
    }

    keys
}

/// The Q/W/E/R level-up sequence for one participant.
pub fn skill_order_key(events: &[&TimelineEventDto], participant_id: i32) -> Option<String> {
    const SKILLS: [&str; 4] = ["Q", "W", "E", "R"];

    let order: Vec<&str> = events
        .iter()
        .filter(|e| {
            e.event_type == "SKILL_LEVEL_UP"
                && e.participant_id == Some(participant_id)
                && matches!(e.skill_slot, Some(1..=4))
        })
        .sorted_by_key(|e| e.timestamp)
        .map(|e| SKILLS[(e.skill_slot.unwrap_or(1) - 1) as usize])
        .collect();

    if order.is_empty() {
        return None;
    }
    Some(order.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_structs::TimelineEventDto;

    fn purchase(participant_id: i32, item_id: i32, timestamp: i64) -> TimelineEventDto {
        TimelineEventDto {
            event_type: "ITEM_PURCHASED".to_string(),
            timestamp,
            participant_id: Some(participant_id),
            item_id: Some(item_id),
            ..Default::default()
        }
    }

    fn undo(participant_id: i32, before_id: i32, timestamp: i64) -> TimelineEventDto {
        TimelineEventDto {
            event_type: "ITEM_UNDO".to_string(),
            timestamp,
            participant_id: Some(participant_id),
            before_id: Some(before_id),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_is_add_or_initialize() {
        let mut current = FreqMap::new();
        bump(&mut current, "3031".to_string(), true);

        let mut delta = FreqMap::new();
        bump(&mut delta, "3031".to_string(), false);
        bump(&mut delta, "6672".to_string(), true);

        merge_freq_maps(&mut current, &delta);

        assert_eq!(current["3031"], FreqEntry { wins: 1, matches: 2 });
        assert_eq!(current["6672"], FreqEntry { wins: 1, matches: 1 });
    }

    #[test]
    fn test_final_build_key_is_sorted_and_filtered() {
        let tracked = tracked_final_items(&[6672, 0, 3031, 3340, 1055, 3036]);
        assert_eq!(tracked, vec![3031, 3036, 6672]);
        assert_eq!(final_build_key(&tracked), Some("3031-3036-6672".to_string()));
        assert_eq!(final_build_key(&[]), None);
    }

    #[test]
    fn test_undo_cancels_matching_purchase() {
        let events = vec![
            purchase(1, 1055, 10_000),
            purchase(1, 3031, 20_000),
            undo(1, 3031, 21_000),
            purchase(1, 3036, 30_000),
        ];
        let refs: Vec<&TimelineEventDto> = events.iter().collect();

        let clean = replay_item_events(&refs, 1);
        let ids: Vec<i32> = clean.iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec![1055, 3036]);
    }

    #[test]
    fn test_undo_ignores_non_matching_tail() {
        let events = vec![purchase(1, 3031, 20_000), undo(1, 9999, 21_000)];
        let refs: Vec<&TimelineEventDto> = events.iter().collect();

        let clean = replay_item_events(&refs, 1);
        assert_eq!(clean.len(), 1);
    }

    #[test]
    fn test_starting_items_exclude_vision() {
        let events = vec![
            purchase(1, 1055, 5_000),
            purchase(1, 2003, 6_000),
            purchase(1, 3340, 7_000), // trinket
            purchase(1, 3031, 120_000), // past the first minute
        ];
        let refs: Vec<&TimelineEventDto> = events.iter().collect();
        let clean = replay_item_events(&refs, 1);

        assert_eq!(starting_items_key(&clean), Some("start_1055-2003".to_string()));
    }

    #[test]
    fn test_core_build_keys_extend_slot_by_slot() {
        let events: Vec<TimelineEventDto> = [3031, 3036, 6672, 3072, 3026]
            .iter()
            .enumerate()
            .map(|(i, id)| purchase(1, *id, (i as i64 + 1) * 60_000))
            .collect();
        let refs: Vec<&TimelineEventDto> = events.iter().collect();
        let clean = replay_item_events(&refs, 1);

        let keys = core_build_keys(&clean, &[3026, 3031, 3036, 3072, 6672]);
        assert_eq!(
            keys,
            vec![
                "core_3031-3036-6672".to_string(),
                "core_3031-3036-6672_slot4_3072".to_string(),
                "core_3031-3036-6672_slot5_3026".to_string(),
            ]
        );
    }

    #[test]
    fn test_core_build_ignores_sold_out_items() {
        // 3031 was purchased but is absent from the final inventory.
        let events = vec![purchase(1, 3031, 60_000), purchase(1, 3036, 120_000)];
        let refs: Vec<&TimelineEventDto> = events.iter().collect();
        let clean = replay_item_events(&refs, 1);

        let keys = core_build_keys(&clean, &[3036]);
        assert_eq!(keys, vec!["core_3036".to_string()]);
    }

    #[test]
    fn test_skill_order() {
        let mut events = Vec::new();
        for (i, slot) in [1, 2, 3, 1, 1, 4].iter().enumerate() {
            events.push(TimelineEventDto {
                event_type: "SKILL_LEVEL_UP".to_string(),
                timestamp: (i as i64 + 1) * 30_000,
                participant_id: Some(1),
                skill_slot: Some(*slot),
                ..Default::default()
            });
        }
        let refs: Vec<&TimelineEventDto> = events.iter().collect();

        assert_eq!(skill_order_key(&refs, 1), Some("Q-W-E-Q-Q-R".to_string()));
        assert_eq!(skill_order_key(&refs, 2), None);
    }
}
