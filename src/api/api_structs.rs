use crate::model::structures::team_side::TeamSide;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account entry from the account-v1 lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub tag_line: String
}

/// Summoner entry from summoner-v4. `revision_date` is the upstream
/// last-activity marker (epoch milliseconds) driving the sync fast-path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerDto {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub puuid: String,
    #[serde(default)]
    pub profile_icon_id: i32,
    #[serde(default)]
    pub revision_date: i64,
    #[serde(default)]
    pub summoner_level: i64
}

/// Ranked queue entry from league-v4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntryDto {
    #[serde(default)]
    pub queue_type: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub league_points: i32,
    #[serde(default)]
    pub wins: i32,
    #[serde(default)]
    pub losses: i32,
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub summoner_id: Option<String>
}

/// Apex league list (challenger / grandmaster / master).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueListDto {
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub queue: String,
    #[serde(default)]
    pub entries: Vec<LeagueItemDto>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueItemDto {
    #[serde(default)]
    pub summoner_id: String,
    #[serde(default)]
    pub puuid: Option<String>,
    #[serde(default)]
    pub league_points: i32,
    #[serde(default)]
    pub wins: i32,
    #[serde(default)]
    pub losses: i32
}

/// Full match payload from match-v5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub metadata: MetadataDto,
    pub info: InfoDto
}

impl MatchDto {
    /// Parses a stored raw payload back into the typed form. Extra keys
    /// (such as the attached timeline) are ignored.
    pub fn from_value(value: &serde_json::Value) -> Result<MatchDto, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Major.minor portion of the game version ("15.24.670.2108" -> "15.24").
    pub fn patch(&self) -> String {
        self.info
            .game_version
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDto {
    pub match_id: String,
    #[serde(default)]
    pub participants: Vec<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDto {
    #[serde(default)]
    pub game_start_timestamp: i64,
    #[serde(default)]
    pub game_duration: i64,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub game_version: String,
    #[serde(default)]
    pub queue_id: i32,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
    #[serde(default)]
    pub teams: Vec<TeamDto>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub puuid: String,
    #[serde(default)]
    pub participant_id: i32,
    pub team_id: TeamSide,
    #[serde(default)]
    pub champion_id: i32,
    #[serde(default)]
    pub champion_name: String,
    #[serde(default)]
    pub team_position: String,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub kills: i32,
    #[serde(default)]
    pub deaths: i32,
    #[serde(default)]
    pub assists: i32,
    #[serde(default)]
    pub gold_earned: i64,
    #[serde(default)]
    pub total_damage_dealt_to_champions: i64,
    #[serde(default)]
    pub total_minions_killed: i32,
    #[serde(default)]
    pub neutral_minions_killed: i32,
    #[serde(default)]
    pub vision_score: i32,
    #[serde(default)]
    pub time_c_cing_others: i64,
    #[serde(default)]
    pub total_heals_on_teammates: i64,
    #[serde(default)]
    pub total_damage_shielded_on_teammates: i64,
    #[serde(default)]
    pub champ_level: i32,
    #[serde(default)]
    pub item0: i32,
    #[serde(default)]
    pub item1: i32,
    #[serde(default)]
    pub item2: i32,
    #[serde(default)]
    pub item3: i32,
    #[serde(default)]
    pub item4: i32,
    #[serde(default)]
    pub item5: i32,
    #[serde(default)]
    pub item6: i32,
    #[serde(default)]
    pub summoner1_id: i32,
    #[serde(default)]
    pub summoner2_id: i32,
    #[serde(default)]
    pub riot_id_game_name: Option<String>,
    #[serde(default)]
    pub riot_id_tagline: Option<String>,
    #[serde(default)]
    pub profile_icon: i32,
    #[serde(default)]
    pub challenges: Option<ChallengesDto>,
    #[serde(default)]
    pub perks: Option<PerksDto>
}

impl ParticipantDto {
    pub fn total_cs(&self) -> i32 {
        self.total_minions_killed + self.neutral_minions_killed
    }

    /// Final inventory excluding the trinket slot.
    pub fn final_items(&self) -> [i32; 6] {
        [self.item0, self.item1, self.item2, self.item3, self.item4, self.item5]
    }

    /// All seven item slots, for the denormalized player-match link.
    pub fn item_slots(&self) -> Vec<i32> {
        vec![self.item0, self.item1, self.item2, self.item3, self.item4, self.item5, self.item6]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengesDto {
    #[serde(default)]
    pub dragon_takedowns: i32,
    #[serde(default)]
    pub baron_takedowns: i32,
    #[serde(default)]
    pub turret_takedowns: i32,
    #[serde(default)]
    pub inhibitor_takedowns: i32
}

impl ChallengesDto {
    pub fn objective_participation(&self) -> i32 {
        self.dragon_takedowns + self.baron_takedowns + self.turret_takedowns + self.inhibitor_takedowns
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerksDto {
    #[serde(default)]
    pub stat_perks: StatPerksDto,
    #[serde(default)]
    pub styles: Vec<PerkStyleDto>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatPerksDto {
    #[serde(default)]
    pub offense: i32,
    #[serde(default)]
    pub flex: i32,
    #[serde(default)]
    pub defense: i32
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerkStyleDto {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub style: i32,
    #[serde(default)]
    pub selections: Vec<PerkSelectionDto>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerkSelectionDto {
    #[serde(default)]
    pub perk: i32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDto {
    pub team_id: TeamSide,
    #[serde(default)]
    pub win: bool,
    #[serde(default)]
    pub bans: Vec<BanDto>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanDto {
    /// -1 when the ban was skipped.
    #[serde(default)]
    pub champion_id: i32,
    #[serde(default)]
    pub pick_turn: i32
}

/// Event timeline from match-v5. Fetched best-effort; absence only degrades
/// lane-diff and build-path features.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDto {
    pub info: TimelineInfoDto
}

impl TimelineDto {
    pub fn from_value(value: &serde_json::Value) -> Result<TimelineDto, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Flattens all frame events (frames are chronological upstream).
    pub fn events(&self) -> impl Iterator<Item = &TimelineEventDto> {
        self.info.frames.iter().flat_map(|f| f.events.iter())
    }

    /// The frame closest to the 15-minute mark, used for lane differentials.
    /// Falls back to the last frame of games that ended earlier.
    pub fn frame_at_15(&self) -> Option<&TimelineFrameDto> {
        self.info
            .frames
            .iter()
            .find(|f| f.timestamp >= 900_000 && f.timestamp < 960_000)
            .or_else(|| self.info.frames.last())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineInfoDto {
    #[serde(default)]
    pub frames: Vec<TimelineFrameDto>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFrameDto {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub participant_frames: HashMap<String, ParticipantFrameDto>,
    #[serde(default)]
    pub events: Vec<TimelineEventDto>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantFrameDto {
    #[serde(default)]
    pub total_gold: i64,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub minions_killed: i32,
    #[serde(default)]
    pub jungle_minions_killed: i32
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventDto {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub participant_id: Option<i32>,
    #[serde(default)]
    pub item_id: Option<i32>,
    #[serde(default)]
    pub before_id: Option<i32>,
    #[serde(default)]
    pub after_id: Option<i32>,
    #[serde(default)]
    pub skill_slot: Option<i32>,
    #[serde(default)]
    pub victim_id: Option<i32>,
    #[serde(default)]
    pub killer_id: Option<i32>
}

#[cfg(test)]
mod tests {
    use super::{MatchDto, TimelineDto};
    use serde_json::json;

    #[test]
    fn test_match_parse_tolerates_missing_fields() {
        let value = json!({
            "metadata": { "matchId": "EUW1_100" },
            "info": {
                "gameVersion": "15.24.670.2108",
                "gameDuration": 1500,
                "participants": [{
                    "puuid": "p1",
                    "teamId": 100,
                    "championName": "Ahri",
                    "teamPosition": "MIDDLE",
                    "kills": 5
                }],
                "teams": [{ "teamId": 100, "win": true, "bans": [{ "championId": -1 }] }]
            }
        });

        let parsed = MatchDto::from_value(&value).unwrap();
        assert_eq!(parsed.metadata.match_id, "EUW1_100");
        assert_eq!(parsed.patch(), "15.24");
        assert_eq!(parsed.info.participants[0].kills, 5);
        assert_eq!(parsed.info.participants[0].deaths, 0);
        assert_eq!(parsed.info.teams[0].bans[0].champion_id, -1);
    }

    #[test]
    fn test_frame_at_15_falls_back_to_last() {
        let value = json!({
            "info": {
                "frames": [
                    { "timestamp": 0 },
                    { "timestamp": 600_000 }
                ]
            }
        });

        let timeline = TimelineDto::from_value(&value).unwrap();
        assert_eq!(timeline.frame_at_15().unwrap().timestamp, 600_000);
    }
}
