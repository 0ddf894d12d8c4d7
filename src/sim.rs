// Match simulation: two lineups and a seed in, a final score and goal timeline out.
//
// Everything here is a pure function of its inputs. The only randomness is the
// seeded Mulberry32 stream, and draws happen in a fixed order so a seed always
// replays the same match.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Position};
use crate::elo;
use crate::squad::Lineup;

/// Hard cap on goals per side.
pub const MAX_GOALS: u32 = 8;

/// Minutes at which a progressive reveal emits a snapshot.
pub const CHECKPOINTS: [u8; 7] = [0, 15, 30, 45, 60, 75, 90];

const BASE_LAMBDA: f64 = 1.18;
const LAMBDA_MIN: f64 = 0.25;
const LAMBDA_MAX: f64 = 3.9;
const JITTER_MIN: f64 = 0.88;
const JITTER_SPAN: f64 = 0.30;
const UPSET_GAP: f64 = 6.0;
const UPSET_CHANCE: f64 = 0.28;
const UPSET_BOOST_SPAN: f64 = 0.38;
const FIRST_HALF_CHANCE: f64 = 0.46;
const MINUTE_RETRIES: usize = 30;
const ASSIST_CHANCE: f64 = 0.62;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`.
pub fn fnv1a_32(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Seed for a real match: wall-clock time, scope, both players, and mode.
pub fn derive_seed(now: DateTime<Utc>, scope: &str, home: &str, away: &str, mode: &str) -> u32 {
    fnv1a_32(&format!(
        "{}:{scope}:{home}:{away}:{mode}",
        now.timestamp_millis()
    ))
}

/// Mulberry32 PRNG.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform float in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        (t ^ (t >> 14)) as f64 / 4_294_967_296.0
    }

    /// Uniform float in [min, min + span).
    pub fn uniform(&mut self, min: f64, span: f64) -> f64 {
        min + self.next_f64() * span
    }

    /// Uniform integer in [low, high].
    pub fn int_inclusive(&mut self, low: u8, high: u8) -> u8 {
        let span = (high - low) as f64 + 1.0;
        low + (self.next_f64() * span) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Home,
    Away,
    Draw,
}

impl MatchOutcome {
    /// Result from the home player's perspective.
    pub fn for_home(self) -> elo::Outcome {
        match self {
            MatchOutcome::Home => elo::Outcome::Win,
            MatchOutcome::Away => elo::Outcome::Loss,
            MatchOutcome::Draw => elo::Outcome::Draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEvent {
    pub minute: u8,
    pub side: Side,
    pub scorer: String,
    pub assist: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRatings {
    pub overall: f64,
    pub attack: f64,
    pub midfield: f64,
    pub defense: f64,
}

fn attack_value(c: &Card) -> f64 {
    let s = &c.stats;
    0.42 * s.sho as f64 + 0.18 * s.pac as f64 + 0.22 * s.dri as f64 + 0.18 * s.pas as f64
}

fn defense_value(c: &Card) -> f64 {
    let s = &c.stats;
    0.52 * s.def as f64 + 0.26 * s.phy as f64 + 0.12 * s.pas as f64 + 0.10 * s.pac as f64
}

fn midfield_value(c: &Card) -> f64 {
    let s = &c.stats;
    0.34 * s.pas as f64 + 0.22 * s.dri as f64 + 0.24 * s.def as f64 + 0.20 * s.phy as f64
}

fn scorer_weight(c: &Card) -> f64 {
    let s = &c.stats;
    s.sho as f64 + 0.25 * s.pac as f64 + 0.35 * s.dri as f64
}

fn assist_weight(c: &Card) -> f64 {
    let s = &c.stats;
    s.pas as f64 + 0.25 * s.dri as f64
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Mean of `value` over starters matching `bucket`, or over all starters when none match.
fn bucket_mean(
    starters: &[&Card],
    bucket: fn(&Position) -> bool,
    value: fn(&Card) -> f64,
) -> f64 {
    let in_bucket: Vec<&Card> = starters
        .iter()
        .copied()
        .filter(|c| bucket(&c.canonical_position()))
        .collect();
    let pool = if in_bucket.is_empty() {
        starters
    } else {
        &in_bucket[..]
    };
    mean(pool.iter().map(|c| value(c)))
}

impl TeamRatings {
    pub fn from_starters(starters: &[&Card]) -> Self {
        Self {
            overall: mean(starters.iter().map(|c| c.overall as f64)),
            attack: bucket_mean(starters, Position::is_attacking, attack_value),
            midfield: mean(starters.iter().map(|c| midfield_value(c))),
            defense: bucket_mean(starters, Position::is_defensive, defense_value),
        }
    }

    pub fn from_lineup(lineup: &Lineup) -> Self {
        Self::from_starters(&lineup.starters())
    }
}

fn raw_lambda(mine: &TeamRatings, theirs: &TeamRatings) -> f64 {
    BASE_LAMBDA
        + (mine.attack - theirs.defense) / 32.0
        + (mine.overall - theirs.overall) / 55.0
        + (mine.midfield - theirs.midfield) / 60.0
}

/// Expected goals before the upset boost and match jitter are applied.
pub fn expected_goals_base(mine: &TeamRatings, theirs: &TeamRatings) -> f64 {
    raw_lambda(mine, theirs).clamp(LAMBDA_MIN, LAMBDA_MAX)
}

/// Expected goals for one side. Draws from `rng` only when the upset rule is in play.
fn expected_goals(
    mine: &TeamRatings,
    theirs: &TeamRatings,
    jitter: f64,
    rng: &mut Mulberry32,
) -> f64 {
    let mut lambda = raw_lambda(mine, theirs);
    if theirs.overall - mine.overall >= UPSET_GAP && rng.next_f64() < UPSET_CHANCE {
        lambda *= 1.0 + rng.uniform(0.0, UPSET_BOOST_SPAN);
    }
    lambda.clamp(LAMBDA_MIN, LAMBDA_MAX) * jitter
}

/// Knuth's Poisson sampler. The full sample is drawn before clamping to [`MAX_GOALS`],
/// so the number of draws consumed does not depend on the cap.
fn poisson(lambda: f64, rng: &mut Mulberry32) -> u32 {
    let limit = (-lambda).exp();
    let mut product = rng.next_f64();
    let mut count = 0u32;
    while product >= limit {
        count += 1;
        product *= rng.next_f64();
    }
    count.min(MAX_GOALS)
}

fn sample_minute(rng: &mut Mulberry32) -> u8 {
    if rng.next_f64() < FIRST_HALF_CHANCE {
        rng.int_inclusive(3, 45)
    } else {
        rng.int_inclusive(46, 90)
    }
}

fn unique_minute(used: &HashSet<u8>, rng: &mut Mulberry32) -> u8 {
    for _ in 0..=MINUTE_RETRIES {
        let minute = sample_minute(rng);
        if !used.contains(&minute) {
            return minute;
        }
    }
    // At most 2 * MAX_GOALS minutes are ever taken, so a free one always exists.
    (1..=90).find(|m| !used.contains(m)).unwrap_or(90)
}

/// Roulette-wheel pick over non-negative weights; uniform when every weight is zero.
fn weighted_index(weights: &[f64], rng: &mut Mulberry32) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let roll = rng.next_f64();
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 {
        return Some(((roll * weights.len() as f64) as usize).min(weights.len() - 1));
    }
    let target = roll * total;
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w.max(0.0);
        if target < acc {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

/// Indices of starters in `bucket`, or every starter when none qualify.
fn eligible(starters: &[&Card], bucket: fn(&Position) -> bool, exclude: Option<usize>) -> Vec<usize> {
    let all: Vec<usize> = (0..starters.len()).filter(|&i| Some(i) != exclude).collect();
    let preferred: Vec<usize> = all
        .iter()
        .copied()
        .filter(|&i| bucket(&starters[i].canonical_position()))
        .collect();
    if preferred.is_empty() {
        all
    } else {
        preferred
    }
}

fn goal_event(side: Side, starters: &[&Card], used: &mut HashSet<u8>, rng: &mut Mulberry32) -> GoalEvent {
    let minute = unique_minute(used, rng);
    used.insert(minute);

    let shooters = eligible(starters, Position::is_attacking, None);
    let weights: Vec<f64> = shooters.iter().map(|&i| scorer_weight(starters[i])).collect();
    let scorer_idx = weighted_index(&weights, rng).map(|k| shooters[k]).unwrap_or(0);

    let assist = if rng.next_f64() < ASSIST_CHANCE {
        let passers = eligible(starters, Position::is_playmaking, Some(scorer_idx));
        let weights: Vec<f64> = passers.iter().map(|&i| assist_weight(starters[i])).collect();
        weighted_index(&weights, rng).map(|k| starters[passers[k]].name.clone())
    } else {
        None
    };

    GoalEvent {
        minute,
        side,
        scorer: starters[scorer_idx].name.clone(),
        assist,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

/// Outcome of one simulated match. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub seed: u32,
    pub home_ratings: TeamRatings,
    pub away_ratings: TeamRatings,
    pub expected_goals: ExpectedGoals,
    pub final_score: Score,
    pub outcome: MatchOutcome,
    /// Sorted ascending by minute; no two goals share a minute.
    pub events: Vec<GoalEvent>,
}

/// Partial view of a match at a given minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub minute: u8,
    pub score: Score,
    pub events: Vec<GoalEvent>,
    pub finished: bool,
}

impl MatchResult {
    /// Project the already-simulated timeline up to and including `minute`.
    pub fn snapshot_at(&self, minute: u8) -> Snapshot {
        let events: Vec<GoalEvent> = self
            .events
            .iter()
            .filter(|e| e.minute <= minute)
            .cloned()
            .collect();
        let home = events.iter().filter(|e| e.side == Side::Home).count() as u32;
        Snapshot {
            minute,
            score: Score {
                home,
                away: events.len() as u32 - home,
            },
            events,
            finished: minute >= 90,
        }
    }
}

/// Run a match. Identical inputs and seed produce an identical result.
///
/// A side with no filled slots cannot score; its goal count is still drawn so the
/// stream position stays the same for the other side.
pub fn simulate(home: &Lineup, away: &Lineup, seed: u32) -> MatchResult {
    let mut rng = Mulberry32::new(seed);
    let home_starters = home.starters();
    let away_starters = away.starters();
    let home_ratings = TeamRatings::from_starters(&home_starters);
    let away_ratings = TeamRatings::from_starters(&away_starters);

    let jitter = rng.uniform(JITTER_MIN, JITTER_SPAN);
    let lambda_home = expected_goals(&home_ratings, &away_ratings, jitter, &mut rng);
    let lambda_away = expected_goals(&away_ratings, &home_ratings, jitter, &mut rng);

    let mut home_goals = poisson(lambda_home, &mut rng);
    let mut away_goals = poisson(lambda_away, &mut rng);
    if home_starters.is_empty() {
        home_goals = 0;
    }
    if away_starters.is_empty() {
        away_goals = 0;
    }

    let mut used = HashSet::new();
    let mut events = Vec::with_capacity((home_goals + away_goals) as usize);
    for _ in 0..home_goals {
        events.push(goal_event(Side::Home, &home_starters, &mut used, &mut rng));
    }
    for _ in 0..away_goals {
        events.push(goal_event(Side::Away, &away_starters, &mut used, &mut rng));
    }
    events.sort_by_key(|e| e.minute);

    let outcome = match home_goals.cmp(&away_goals) {
        std::cmp::Ordering::Greater => MatchOutcome::Home,
        std::cmp::Ordering::Less => MatchOutcome::Away,
        std::cmp::Ordering::Equal => MatchOutcome::Draw,
    };

    MatchResult {
        seed,
        home_ratings,
        away_ratings,
        expected_goals: ExpectedGoals {
            home: lambda_home,
            away: lambda_away,
        },
        final_score: Score {
            home: home_goals,
            away: away_goals,
        },
        outcome,
        events,
    }
}

/// Emit a snapshot at every checkpoint, pausing `pace` between them.
///
/// Dropping the returned future stops the reveal; the result itself is untouched.
pub async fn reveal<F>(result: &MatchResult, pace: Duration, mut emit: F)
where
    F: FnMut(Snapshot),
{
    for (i, &checkpoint) in CHECKPOINTS.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(pace).await;
        }
        emit(result.snapshot_at(checkpoint));
    }
}
