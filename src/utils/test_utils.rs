use crate::api::api_structs::{
    BanDto, ChallengesDto, InfoDto, MatchDto, MetadataDto, ParticipantDto, PerkSelectionDto, PerkStyleDto, PerksDto,
    StatPerksDto, TeamDto
};
use crate::database::db_structs::{Summoner, SummonerMatch};
use crate::model::structures::team_side::TeamSide;
use chrono::{NaiveDate, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const POSITIONS: [&str; 5] = ["TOP", "JUNGLE", "MIDDLE", "BOTTOM", "UTILITY"];
const CHAMPIONS: [&str; 10] = [
    "Garen", "LeeSin", "Ahri", "Jinx", "Thresh", "Darius", "Elise", "Syndra", "Caitlyn", "Lulu",
];

/// Builds one participant with plausible stats, deterministic per
/// participant id so tests are reproducible.
pub fn generate_participant(
    puuid: &str,
    participant_id: i32,
    team_id: i32,
    champion_name: &str,
    team_position: &str
) -> ParticipantDto {
    let mut rng = ChaCha8Rng::seed_from_u64(42 + participant_id as u64);

    ParticipantDto {
        puuid: puuid.to_string(),
        participant_id,
        team_id: TeamSide::try_from(team_id).unwrap_or(TeamSide::Blue),
        champion_id: 100 + participant_id,
        champion_name: champion_name.to_string(),
        team_position: team_position.to_string(),
        win: team_id == 100,
        kills: rng.random_range(0..15),
        deaths: rng.random_range(1..10),
        assists: rng.random_range(0..20),
        gold_earned: rng.random_range(8_000..16_000),
        total_damage_dealt_to_champions: rng.random_range(10_000..40_000),
        total_minions_killed: rng.random_range(80..250),
        neutral_minions_killed: rng.random_range(0..60),
        vision_score: rng.random_range(10..80),
        time_c_cing_others: rng.random_range(5..60),
        total_heals_on_teammates: rng.random_range(0..4_000),
        total_damage_shielded_on_teammates: rng.random_range(0..3_000),
        champ_level: rng.random_range(12..19),
        item0: 3031,
        item1: 3036,
        item2: 6672,
        item3: 3072 + participant_id,
        item4: 0,
        item5: 0,
        item6: 3340,
        summoner1_id: 4,
        summoner2_id: if participant_id % 2 == 0 { 7 } else { 14 },
        riot_id_game_name: Some(format!("Player{participant_id}")),
        riot_id_tagline: Some("EUW".to_string()),
        profile_icon: 1000 + participant_id,
        challenges: Some(ChallengesDto {
            dragon_takedowns: rng.random_range(0..3),
            baron_takedowns: rng.random_range(0..2),
            turret_takedowns: rng.random_range(0..5),
            inhibitor_takedowns: rng.random_range(0..2)
        }),
        perks: Some(PerksDto {
            stat_perks: StatPerksDto {
                offense: 5008,
                flex: 5008,
                defense: 5002
            },
            styles: vec![
                PerkStyleDto {
                    description: "primaryStyle".to_string(),
                    style: 8100,
                    selections: vec![
                        PerkSelectionDto { perk: 8112 },
                        PerkSelectionDto { perk: 8143 },
                        PerkSelectionDto { perk: 8138 },
                        PerkSelectionDto { perk: 8135 },
                    ]
                },
                PerkStyleDto {
                    description: "subStyle".to_string(),
                    style: 8300,
                    selections: vec![PerkSelectionDto { perk: 8345 }, PerkSelectionDto { perk: 8347 }]
                },
            ]
        })
    }
}

/// A complete ten-participant ranked match: five roles per side, blue team
/// winning, four real bans and one skipped ban per team.
pub fn generate_full_match(match_id: &str, game_version: &str, duration: i64) -> MatchDto {
    let mut participants = Vec::new();

    for i in 0..10 {
        let participant_id = i as i32 + 1;
        let team_id = if i < 5 { 100 } else { 200 };
        participants.push(generate_participant(
            &format!("puuid-{participant_id}"),
            participant_id,
            team_id,
            CHAMPIONS[i],
            POSITIONS[i % 5]
        ));
    }

    let bans = |base: i32| -> Vec<BanDto> {
        let mut bans: Vec<BanDto> = (0..4)
            .map(|i| BanDto {
                champion_id: base + i,
                pick_turn: i + 1
            })
            .collect();
        bans.push(BanDto {
            champion_id: -1,
            pick_turn: 5
        });
        bans
    };

    MatchDto {
        metadata: MetadataDto {
            match_id: match_id.to_string(),
            participants: participants.iter().map(|p| p.puuid.clone()).collect()
        },
        info: InfoDto {
            game_start_timestamp: 1_750_000_000_000,
            game_duration: duration,
            game_mode: "CLASSIC".to_string(),
            game_version: game_version.to_string(),
            queue_id: 420,
            participants,
            teams: vec![
                TeamDto {
                    team_id: TeamSide::Blue,
                    win: true,
                    bans: bans(200)
                },
                TeamDto {
                    team_id: TeamSide::Red,
                    win: false,
                    bans: bans(300)
                },
            ]
        }
    }
}

/// A stored player-match link on the given day (noon UTC).
pub fn generate_summoner_match(
    puuid: &str,
    match_id: &str,
    champion_id: i32,
    champion_name: &str,
    win: bool,
    date: NaiveDate
) -> SummonerMatch {
    let game_creation = Utc
        .from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"));

    SummonerMatch {
        puuid: puuid.to_string(),
        match_id: match_id.to_string(),
        game_creation,
        champion_id,
        champion_name: champion_name.to_string(),
        win,
        kills: 5,
        deaths: 3,
        assists: 8,
        role: "MIDDLE".to_string(),
        damage_to_champions: 20_000,
        total_cs: 180,
        gold_earned: 12_000,
        vision_score: 25,
        items: vec![3031, 3036, 6672, 0, 0, 0, 3340],
        score: None
    }
}

/// A bare summoner identity row for marker and fast-path tests.
pub fn generate_summoner_row(puuid: &str) -> Summoner {
    Summoner {
        puuid: puuid.to_string(),
        game_name: "Tester".to_string(),
        tag_line: "EUW".to_string(),
        platform: "euw1".to_string(),
        summoner_id: Some("summoner-1".to_string()),
        profile_icon_id: 1234,
        summoner_level: 250,
        last_match_fetch: None,
        revision_date: None,
        updated_at: Utc::now()
    }
}
