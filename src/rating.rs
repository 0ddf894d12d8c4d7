// Rating service: global Elo profiles, one-time legacy merge, transactional updates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{Database, RatingProfile, DEFAULT_RATING};
use crate::elo::{self, Outcome};
use crate::metrics;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("a player cannot be rated against themselves: {0}")]
    SamePlayer(String),
    #[error("rating store unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// Before/after view of one ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub home: String,
    pub away: String,
    pub home_before: f64,
    pub away_before: f64,
    pub home_delta: i64,
    pub away_delta: i64,
    pub home_after: f64,
    pub away_after: f64,
}

#[derive(Clone)]
pub struct RatingService {
    db: Arc<Database>,
}

impl RatingService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fold any per-scope legacy profiles into the global profile, once.
    ///
    /// The latch is flipped with a conditional update inside the same transaction
    /// that moves the legacy rows, so a concurrent caller either waits on the
    /// write lock and then sees the latch set, or loses the update and skips.
    pub async fn ensure_merged(&self, player_id: &str) -> Result<RatingProfile, RatingError> {
        let mut uow = self.db.begin().await?;
        let profile = Database::get_or_create_rating(&mut uow, player_id).await?;

        if !Database::claim_legacy_merge(&mut uow, player_id).await? {
            uow.commit().await?;
            return Ok(profile);
        }

        let legacy = Database::legacy_ratings(&mut uow, player_id).await?;
        let merged = legacy
            .iter()
            .map(|l| l.rating)
            .fold(DEFAULT_RATING.max(profile.rating), f64::max);
        let (wins, draws, losses) = legacy.iter().fold((0, 0, 0), |(w, d, l), r| {
            (w + r.wins, d + r.draws, l + r.losses)
        });

        Database::absorb_legacy(&mut uow, player_id, merged, wins, draws, losses).await?;
        let removed = Database::delete_legacy_ratings(&mut uow, player_id).await?;
        let merged_profile = Database::get_or_create_rating(&mut uow, player_id).await?;
        uow.commit().await?;

        if removed > 0 {
            tracing::info!(
                player = player_id,
                scopes = removed,
                rating = merged,
                "Merged legacy ratings"
            );
        }
        Ok(merged_profile)
    }

    /// Current global profile, creating it if needed.
    pub async fn profile(&self, player_id: &str) -> Result<RatingProfile, RatingError> {
        self.ensure_merged(player_id).await
    }

    /// Top profiles by rating.
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<RatingProfile>, RatingError> {
        Ok(self.db.leaderboard(limit.clamp(1, 100)).await?)
    }

    /// Apply a ranked result to both players in one transaction.
    ///
    /// On error nothing is written; the transaction is rolled back when dropped.
    pub async fn apply_result(
        &self,
        home: &str,
        away: &str,
        home_outcome: Outcome,
    ) -> Result<RatingChange, RatingError> {
        if home == away {
            return Err(RatingError::SamePlayer(home.to_string()));
        }

        let result = self.apply_result_inner(home, away, home_outcome).await;
        match &result {
            Ok(change) => {
                metrics::RATING_UPDATES_TOTAL.with_label_values(&["ok"]).inc();
                tracing::info!(
                    home,
                    away,
                    delta = change.home_delta,
                    "Applied rating update"
                );
            }
            Err(e) => {
                metrics::RATING_UPDATES_TOTAL
                    .with_label_values(&["failed"])
                    .inc();
                tracing::error!(home, away, "Rating update rolled back: {e}");
            }
        }
        result
    }

    async fn apply_result_inner(
        &self,
        home: &str,
        away: &str,
        home_outcome: Outcome,
    ) -> Result<RatingChange, RatingError> {
        self.ensure_merged(home).await?;
        self.ensure_merged(away).await?;

        let mut uow = self.db.begin().await?;
        let home_profile = Database::get_or_create_rating(&mut uow, home).await?;
        let away_profile = Database::get_or_create_rating(&mut uow, away).await?;

        let home_delta = elo::rating_delta(home_profile.rating, away_profile.rating, home_outcome);
        let away_delta = -home_delta;

        Database::apply_rating_delta(&mut uow, home, home_delta as f64, home_outcome).await?;
        Database::apply_rating_delta(&mut uow, away, away_delta as f64, home_outcome.flip()).await?;
        uow.commit().await?;

        Ok(RatingChange {
            home: home.to_string(),
            away: away.to_string(),
            home_before: home_profile.rating,
            away_before: away_profile.rating,
            home_delta,
            away_delta,
            home_after: home_profile.rating + home_delta as f64,
            away_after: away_profile.rating + away_delta as f64,
        })
    }
}
