// Match orchestration: lineup check, queue, simulate, rate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::metrics;
use crate::queue::{notify, EnqueueOutcome, MatchQueue, QueueEntry, QueueNotice, ReplySink};
use crate::rating::{RatingChange, RatingError, RatingService};
use crate::sim::{self, MatchResult};
use crate::squad::{Lineup, SquadAssembler, SquadError};

pub use crate::queue::MatchMode;

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("{player} has only {filled} of 11 slots filled")]
    IncompleteLineup { player: String, filled: usize },
    #[error(transparent)]
    Squad(#[from] SquadError),
}

/// Everything produced by one played match.
#[derive(Debug)]
pub struct MatchReport {
    pub scope: String,
    pub mode: MatchMode,
    pub home: String,
    pub away: String,
    pub result: MatchResult,
    /// `None` for friendlies. A failed update never discards `result`.
    pub rating: Option<Result<RatingChange, RatingError>>,
}

impl MatchReport {
    pub fn finished_notice(&self) -> QueueNotice {
        let (rating, rating_error) = match &self.rating {
            Some(Ok(change)) => (Some(change.clone()), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, None),
        };
        QueueNotice::Finished {
            result: self.result.clone(),
            rating,
            rating_error,
        }
    }
}

/// What happened when a player asked for a match.
#[derive(Debug)]
pub enum LobbyOutcome {
    AlreadyQueued,
    Waiting(QueueEntry),
    /// Paired and played. `opponent` is the entry that was waiting (the home side).
    Played {
        opponent: QueueEntry,
        report: MatchReport,
    },
}

#[derive(Clone)]
pub struct MatchService {
    squads: SquadAssembler,
    ratings: RatingService,
    queue: MatchQueue,
}

impl MatchService {
    pub fn new(squads: SquadAssembler, ratings: RatingService, queue: MatchQueue) -> Self {
        Self {
            squads,
            ratings,
            queue,
        }
    }

    pub fn squads(&self) -> &SquadAssembler {
        &self.squads
    }

    pub fn ratings(&self) -> &RatingService {
        &self.ratings
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Hydrate a lineup and require every slot to be filled.
    pub async fn ready_lineup(&self, scope: &str, player: &str) -> Result<Lineup, LobbyError> {
        let lineup = self.squads.hydrate(scope, player).await?;
        if !lineup.is_complete() {
            return Err(LobbyError::IncompleteLineup {
                player: player.to_string(),
                filled: lineup.filled_count(),
            });
        }
        Ok(lineup)
    }

    /// Check the lineup, then pair with a waiting player or join the queue.
    ///
    /// When paired, the waiting player plays at home and the match runs
    /// immediately. If the match cannot start the waiting player is told why.
    pub async fn find_match(
        &self,
        scope: &str,
        mode: MatchMode,
        player: &str,
        sink: Arc<dyn ReplySink>,
    ) -> Result<LobbyOutcome, LobbyError> {
        self.ready_lineup(scope, player).await?;

        match self.queue.enqueue_or_match(scope, mode, player, sink) {
            EnqueueOutcome::AlreadyQueued => Ok(LobbyOutcome::AlreadyQueued),
            EnqueueOutcome::Queued(entry) => Ok(LobbyOutcome::Waiting(entry)),
            EnqueueOutcome::Matched(opponent) => {
                match self.play(scope, mode, &opponent.player_id, player).await {
                    Ok(report) => Ok(LobbyOutcome::Played { opponent, report }),
                    Err(e) => {
                        notify(
                            opponent.sink.as_ref(),
                            QueueNotice::Error {
                                message: format!("match could not start: {e}"),
                            },
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    /// Play a match with a freshly derived seed.
    pub async fn play(
        &self,
        scope: &str,
        mode: MatchMode,
        home: &str,
        away: &str,
    ) -> Result<MatchReport, LobbyError> {
        let seed = sim::derive_seed(Utc::now(), scope, home, away, mode.as_str());
        self.play_seeded(scope, mode, home, away, seed).await
    }

    /// Play a match with a fixed seed. Same lineups and seed give the same result.
    pub async fn play_seeded(
        &self,
        scope: &str,
        mode: MatchMode,
        home: &str,
        away: &str,
        seed: u32,
    ) -> Result<MatchReport, LobbyError> {
        let home_lineup = self.ready_lineup(scope, home).await?;
        let away_lineup = self.ready_lineup(scope, away).await?;

        let result = sim::simulate(&home_lineup, &away_lineup, seed);
        metrics::MATCHES_SIMULATED_TOTAL
            .with_label_values(&[mode.as_str()])
            .inc();
        metrics::GOALS_PER_MATCH
            .observe((result.final_score.home + result.final_score.away) as f64);
        tracing::info!(
            scope,
            mode = %mode,
            home,
            away,
            seed,
            score = %format!("{}-{}", result.final_score.home, result.final_score.away),
            "Match simulated"
        );

        let rating = if mode.is_ranked() {
            Some(
                self.ratings
                    .apply_result(home, away, result.outcome.for_home())
                    .await,
            )
        } else {
            None
        };

        Ok(MatchReport {
            scope: scope.to_string(),
            mode,
            home: home.to_string(),
            away: away.to_string(),
            result,
            rating,
        })
    }
}

/// Reveal a played match to every sink checkpoint by checkpoint, then send the final notice.
pub async fn broadcast_reveal(report: &MatchReport, sinks: &[Arc<dyn ReplySink>], pace: Duration) {
    sim::reveal(&report.result, pace, |snapshot| {
        for sink in sinks {
            notify(sink.as_ref(), QueueNotice::Snapshot(snapshot.clone()));
        }
    })
    .await;

    let finished = report.finished_notice();
    for sink in sinks {
        notify(sink.as_ref(), finished.clone());
    }
}
