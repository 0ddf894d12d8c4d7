// Statistical and determinism checks for the match simulator, driven through
// the public lineup and simulation API.

use std::collections::HashMap;

use matchday_backend::cards::{Card, Rarity, Stats};
use matchday_backend::formation::formation_or_default;
use matchday_backend::sim::{expected_goals_base, simulate, MatchOutcome, Side, TeamRatings};
use matchday_backend::squad::Lineup;

const SLOTS_433: [(&str, &str); 11] = [
    ("GK", "GK"),
    ("LB", "LB"),
    ("LCB", "CB"),
    ("RCB", "CB"),
    ("RB", "RB"),
    ("LCM", "CM"),
    ("CM", "CM"),
    ("RCM", "CDM"),
    ("LW", "LW"),
    ("ST", "ST"),
    ("RW", "RW"),
];

fn lineup(prefix: &str, overall: u8) -> Lineup {
    let assigned: HashMap<String, Card> = SLOTS_433
        .iter()
        .enumerate()
        .map(|(i, (slot, position))| {
            let card = Card {
                id: format!("{prefix}-{i}"),
                name: format!("{prefix} {i}"),
                position: position.to_string(),
                overall,
                rarity: Rarity::Rare,
                stats: Stats {
                    pac: overall,
                    sho: overall,
                    pas: overall,
                    dri: overall,
                    def: overall,
                    phy: overall,
                },
                player_id: None,
            };
            (slot.to_string(), card)
        })
        .collect();
    Lineup::new(formation_or_default("4-3-3"), assigned)
}

#[test]
fn test_stronger_side_expects_more_goals() {
    let home = TeamRatings::from_lineup(&lineup("h", 85));
    let away = TeamRatings::from_lineup(&lineup("a", 70));
    assert!(expected_goals_base(&home, &away) > expected_goals_base(&away, &home));

    let result = simulate(&lineup("h", 85), &lineup("a", 70), 0x5eed_0001);
    assert!(result.expected_goals.home > result.expected_goals.away);
}

#[test]
fn test_stronger_home_side_wins_most_matches() {
    let home = lineup("h", 85);
    let away = lineup("a", 70);

    let mut home_wins = 0;
    let mut away_wins = 0;
    for seed in 0..1000u32 {
        match simulate(&home, &away, seed.wrapping_mul(2_654_435_761)).outcome {
            MatchOutcome::Home => home_wins += 1,
            MatchOutcome::Away => away_wins += 1,
            MatchOutcome::Draw => {}
        }
    }

    assert!(home_wins > away_wins, "home {home_wins} vs away {away_wins}");
    assert!(home_wins > 500, "home won only {home_wins} of 1000");
}

#[test]
fn test_even_sides_are_roughly_balanced() {
    let home = lineup("h", 78);
    let away = lineup("a", 78);
    let home_wins = (0..1000u32)
        .filter(|&seed| simulate(&home, &away, seed).outcome == MatchOutcome::Home)
        .count();
    assert!((250..=550).contains(&home_wins), "home won {home_wins} of 1000");
}

#[test]
fn test_same_seed_same_bytes() {
    let home = lineup("h", 81);
    let away = lineup("a", 77);
    for seed in [0u32, 1, 42, u32::MAX] {
        let a = serde_json::to_vec(&simulate(&home, &away, seed)).unwrap();
        let b = serde_json::to_vec(&simulate(&home, &away, seed)).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_timeline_consistency_over_many_seeds() {
    let home = lineup("h", 90);
    let away = lineup("a", 60);
    for seed in 0..2000u32 {
        let r = simulate(&home, &away, seed);
        let home_goals = r.events.iter().filter(|e| e.side == Side::Home).count() as u32;
        assert_eq!(home_goals, r.final_score.home);
        assert_eq!(r.events.len() as u32, r.final_score.home + r.final_score.away);
        assert!(r.events.windows(2).all(|w| w[0].minute < w[1].minute));
        assert!(r.events.iter().all(|e| (1..=90).contains(&e.minute)));
    }
}
