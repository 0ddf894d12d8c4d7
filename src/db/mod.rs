// Database access layer (SQLite via sqlx).

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, Transaction};

use crate::elo::Outcome;
use crate::formation::DEFAULT_FORMATION;

/// Starting rating for a player with no history.
pub const DEFAULT_RATING: f64 = 1000.0;

/// A transaction scope. Rating writes and validated squad mutations take one, so a
/// multi-record update cannot be written against the bare pool.
pub type UnitOfWork = Transaction<'static, Sqlite>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SquadRow {
    pub scope: String,
    pub player_id: String,
    pub formation_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SquadSlotRow {
    pub slot_key: String,
    pub card_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingProfile {
    pub player_id: String,
    pub rating: f64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub legacy_merged: bool,
}

/// A per-scope rating row from before ratings became global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LegacyRating {
    pub scope: String,
    pub player_id: String,
    pub rating: f64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect(database_url, 5).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// A private in-memory database. Pinned to one connection that never idles out,
    /// since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS squads (
                scope TEXT NOT NULL,
                player_id TEXT NOT NULL,
                formation_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope, player_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS squad_slots (
                scope TEXT NOT NULL,
                player_id TEXT NOT NULL,
                slot_key TEXT NOT NULL,
                card_id TEXT NOT NULL,
                PRIMARY KEY (scope, player_id, slot_key)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS card_inventory (
                scope TEXT NOT NULL,
                player_id TEXT NOT NULL,
                card_id TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (scope, player_id, card_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ratings (
                player_id TEXT PRIMARY KEY,
                rating REAL NOT NULL DEFAULT 1000,
                wins INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                legacy_merged INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS legacy_ratings (
                scope TEXT NOT NULL,
                player_id TEXT NOT NULL,
                rating REAL NOT NULL,
                wins INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (scope, player_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Open a transaction for a multi-record mutation.
    pub async fn begin(&self) -> Result<UnitOfWork, sqlx::Error> {
        self.pool.begin().await
    }

    // ── Squads ────────────────────────────────────────────────────────

    /// Fetch the squad row, creating it with the default formation on first access.
    pub async fn ensure_squad(&self, scope: &str, player_id: &str) -> Result<SquadRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO squads (scope, player_id, formation_id) VALUES (?, ?, ?) ON CONFLICT(scope, player_id) DO NOTHING",
        )
        .bind(scope)
        .bind(player_id)
        .bind(DEFAULT_FORMATION)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, SquadRow>(
            "SELECT scope, player_id, formation_id, created_at, updated_at FROM squads WHERE scope = ? AND player_id = ?",
        )
        .bind(scope)
        .bind(player_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn squad_slots(
        &self,
        scope: &str,
        player_id: &str,
    ) -> Result<HashMap<String, String>, sqlx::Error> {
        fetch_squad_slots(&self.pool, scope, player_id).await
    }

    pub async fn set_squad_slot(
        &self,
        scope: &str,
        player_id: &str,
        slot_key: &str,
        card_id: &str,
    ) -> Result<(), sqlx::Error> {
        upsert_squad_slot(&self.pool, scope, player_id, slot_key, card_id).await
    }

    pub async fn remove_squad_slot(
        &self,
        scope: &str,
        player_id: &str,
        slot_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM squad_slots WHERE scope = ? AND player_id = ? AND slot_key = ?",
        )
        .bind(scope)
        .bind(player_id)
        .bind(slot_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_squad_slots(&self, scope: &str, player_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM squad_slots WHERE scope = ? AND player_id = ?")
            .bind(scope)
            .bind(player_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Replace formation and every slot assignment of a squad in one transaction.
    pub async fn replace_squad(
        &self,
        scope: &str,
        player_id: &str,
        formation_id: &str,
        slots: &[(String, String)],
    ) -> Result<(), sqlx::Error> {
        let mut uow = self.begin().await?;
        Self::write_squad(&mut uow, scope, player_id, formation_id, slots).await?;
        uow.commit().await
    }

    /// Start a squad mutation. The squad row is created or touched first, so the
    /// transaction holds SQLite's write lock before any squad state is read and a
    /// concurrent mutation of the same database waits until this one commits.
    pub async fn lock_squad(
        uow: &mut UnitOfWork,
        scope: &str,
        player_id: &str,
    ) -> Result<SquadRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO squads (scope, player_id, formation_id) VALUES (?, ?, ?) ON CONFLICT(scope, player_id) DO UPDATE SET updated_at = datetime('now')",
        )
        .bind(scope)
        .bind(player_id)
        .bind(DEFAULT_FORMATION)
        .execute(&mut **uow)
        .await?;

        sqlx::query_as::<_, SquadRow>(
            "SELECT scope, player_id, formation_id, created_at, updated_at FROM squads WHERE scope = ? AND player_id = ?",
        )
        .bind(scope)
        .bind(player_id)
        .fetch_one(&mut **uow)
        .await
    }

    pub async fn locked_squad_slots(
        uow: &mut UnitOfWork,
        scope: &str,
        player_id: &str,
    ) -> Result<HashMap<String, String>, sqlx::Error> {
        fetch_squad_slots(&mut **uow, scope, player_id).await
    }

    pub async fn locked_owned_counts(
        uow: &mut UnitOfWork,
        scope: &str,
        player_id: &str,
    ) -> Result<HashMap<String, u32>, sqlx::Error> {
        fetch_owned_counts(&mut **uow, scope, player_id).await
    }

    pub async fn locked_set_squad_slot(
        uow: &mut UnitOfWork,
        scope: &str,
        player_id: &str,
        slot_key: &str,
        card_id: &str,
    ) -> Result<(), sqlx::Error> {
        upsert_squad_slot(&mut **uow, scope, player_id, slot_key, card_id).await
    }

    /// Overwrite formation and slots inside an open transaction.
    pub async fn write_squad(
        uow: &mut UnitOfWork,
        scope: &str,
        player_id: &str,
        formation_id: &str,
        slots: &[(String, String)],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO squads (scope, player_id, formation_id) VALUES (?, ?, ?) ON CONFLICT(scope, player_id) DO UPDATE SET formation_id = excluded.formation_id, updated_at = datetime('now')",
        )
        .bind(scope)
        .bind(player_id)
        .bind(formation_id)
        .execute(&mut **uow)
        .await?;

        sqlx::query("DELETE FROM squad_slots WHERE scope = ? AND player_id = ?")
            .bind(scope)
            .bind(player_id)
            .execute(&mut **uow)
            .await?;

        for (slot_key, card_id) in slots {
            sqlx::query(
                "INSERT INTO squad_slots (scope, player_id, slot_key, card_id) VALUES (?, ?, ?, ?)",
            )
            .bind(scope)
            .bind(player_id)
            .bind(slot_key)
            .bind(card_id)
            .execute(&mut **uow)
            .await?;
        }
        Ok(())
    }

    // ── Inventory ─────────────────────────────────────────────────────

    /// Owned card counts. Rows with a count of zero or less are treated as absent.
    pub async fn owned_counts(
        &self,
        scope: &str,
        player_id: &str,
    ) -> Result<HashMap<String, u32>, sqlx::Error> {
        fetch_owned_counts(&self.pool, scope, player_id).await
    }

    pub async fn set_card_count(
        &self,
        scope: &str,
        player_id: &str,
        card_id: &str,
        count: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO card_inventory (scope, player_id, card_id, count) VALUES (?, ?, ?, ?) ON CONFLICT(scope, player_id, card_id) DO UPDATE SET count = excluded.count",
        )
        .bind(scope)
        .bind(player_id)
        .bind(card_id)
        .bind(count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Ratings ───────────────────────────────────────────────────────

    pub async fn get_or_create_rating(
        uow: &mut UnitOfWork,
        player_id: &str,
    ) -> Result<RatingProfile, sqlx::Error> {
        sqlx::query("INSERT INTO ratings (player_id, rating) VALUES (?, ?) ON CONFLICT(player_id) DO NOTHING")
            .bind(player_id)
            .bind(DEFAULT_RATING)
            .execute(&mut **uow)
            .await?;

        sqlx::query_as::<_, RatingProfile>(
            "SELECT player_id, rating, wins, draws, losses, legacy_merged FROM ratings WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_one(&mut **uow)
        .await
    }

    /// Add `delta` to the rating and bump the counter for `outcome`.
    pub async fn apply_rating_delta(
        uow: &mut UnitOfWork,
        player_id: &str,
        delta: f64,
        outcome: Outcome,
    ) -> Result<(), sqlx::Error> {
        let (w, d, l) = outcome.increments();
        let result = sqlx::query(
            "UPDATE ratings SET rating = rating + ?, wins = wins + ?, draws = draws + ?, losses = losses + ?, updated_at = datetime('now') WHERE player_id = ?",
        )
        .bind(delta)
        .bind(w)
        .bind(d)
        .bind(l)
        .bind(player_id)
        .execute(&mut **uow)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Flip the legacy-merge latch. Returns true only for the caller that flipped it.
    pub async fn claim_legacy_merge(
        uow: &mut UnitOfWork,
        player_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ratings SET legacy_merged = 1 WHERE player_id = ? AND legacy_merged = 0",
        )
        .bind(player_id)
        .execute(&mut **uow)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn legacy_ratings(
        uow: &mut UnitOfWork,
        player_id: &str,
    ) -> Result<Vec<LegacyRating>, sqlx::Error> {
        sqlx::query_as::<_, LegacyRating>(
            "SELECT scope, player_id, rating, wins, draws, losses FROM legacy_ratings WHERE player_id = ? ORDER BY scope",
        )
        .bind(player_id)
        .fetch_all(&mut **uow)
        .await
    }

    /// Set the merged rating and add the summed legacy counters to the global profile.
    pub async fn absorb_legacy(
        uow: &mut UnitOfWork,
        player_id: &str,
        rating: f64,
        wins: i64,
        draws: i64,
        losses: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE ratings SET rating = ?, wins = wins + ?, draws = draws + ?, losses = losses + ?, updated_at = datetime('now') WHERE player_id = ?",
        )
        .bind(rating)
        .bind(wins)
        .bind(draws)
        .bind(losses)
        .bind(player_id)
        .execute(&mut **uow)
        .await?;
        Ok(())
    }

    pub async fn delete_legacy_ratings(
        uow: &mut UnitOfWork,
        player_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM legacy_ratings WHERE player_id = ?")
            .bind(player_id)
            .execute(&mut **uow)
            .await?;
        Ok(result.rows_affected())
    }

    /// Import a per-scope rating row (used when loading pre-migration data).
    pub async fn insert_legacy_rating(&self, legacy: &LegacyRating) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO legacy_ratings (scope, player_id, rating, wins, draws, losses) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(scope, player_id) DO UPDATE SET rating = excluded.rating, wins = excluded.wins, draws = excluded.draws, losses = excluded.losses",
        )
        .bind(&legacy.scope)
        .bind(&legacy.player_id)
        .bind(legacy.rating)
        .bind(legacy.wins)
        .bind(legacy.draws)
        .bind(legacy.losses)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_rating(&self, player_id: &str) -> Result<Option<RatingProfile>, sqlx::Error> {
        sqlx::query_as::<_, RatingProfile>(
            "SELECT player_id, rating, wins, draws, losses, legacy_merged FROM ratings WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count_legacy_ratings(&self, player_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM legacy_ratings WHERE player_id = ?")
            .bind(player_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<RatingProfile>, sqlx::Error> {
        sqlx::query_as::<_, RatingProfile>(
            "SELECT player_id, rating, wins, draws, losses, legacy_merged FROM ratings ORDER BY rating DESC, player_id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

// Queries shared by the pool-level and transaction-level squad calls.

async fn fetch_squad_slots<'e, E>(
    executor: E,
    scope: &str,
    player_id: &str,
) -> Result<HashMap<String, String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, SquadSlotRow>(
        "SELECT slot_key, card_id FROM squad_slots WHERE scope = ? AND player_id = ?",
    )
    .bind(scope)
    .bind(player_id)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(|r| (r.slot_key, r.card_id)).collect())
}

async fn upsert_squad_slot<'e, E>(
    executor: E,
    scope: &str,
    player_id: &str,
    slot_key: &str,
    card_id: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO squad_slots (scope, player_id, slot_key, card_id) VALUES (?, ?, ?, ?) ON CONFLICT(scope, player_id, slot_key) DO UPDATE SET card_id = excluded.card_id",
    )
    .bind(scope)
    .bind(player_id)
    .bind(slot_key)
    .bind(card_id)
    .execute(executor)
    .await?;
    Ok(())
}

async fn fetch_owned_counts<'e, E>(
    executor: E,
    scope: &str,
    player_id: &str,
) -> Result<HashMap<String, u32>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT card_id, count FROM card_inventory WHERE scope = ? AND player_id = ? AND count > 0",
    )
    .bind(scope)
    .bind(player_id)
    .fetch_all(executor)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(card_id, count)| (card_id, u32::try_from(count).unwrap_or(u32::MAX)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_squad_is_lazy_and_stable() {
        let db = test_db().await;

        let squad = db.ensure_squad("guild-1", "alice").await.unwrap();
        assert_eq!(squad.formation_id, DEFAULT_FORMATION);
        assert!(db.squad_slots("guild-1", "alice").await.unwrap().is_empty());

        db.replace_squad("guild-1", "alice", "4-4-2", &[]).await.unwrap();
        let again = db.ensure_squad("guild-1", "alice").await.unwrap();
        assert_eq!(again.formation_id, "4-4-2");
    }

    #[tokio::test]
    async fn test_squad_slot_upsert_remove_clear() {
        let db = test_db().await;

        db.set_squad_slot("g", "p", "ST", "card-1").await.unwrap();
        db.set_squad_slot("g", "p", "ST", "card-2").await.unwrap();
        db.set_squad_slot("g", "p", "GK", "card-3").await.unwrap();

        let slots = db.squad_slots("g", "p").await.unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots["ST"], "card-2");

        assert!(db.remove_squad_slot("g", "p", "ST").await.unwrap());
        assert!(!db.remove_squad_slot("g", "p", "ST").await.unwrap());

        assert_eq!(db.clear_squad_slots("g", "p").await.unwrap(), 1);
        assert!(db.squad_slots("g", "p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_squads_are_scoped() {
        let db = test_db().await;
        db.set_squad_slot("g1", "p", "ST", "a").await.unwrap();
        db.set_squad_slot("g2", "p", "ST", "b").await.unwrap();
        assert_eq!(db.squad_slots("g1", "p").await.unwrap()["ST"], "a");
        assert_eq!(db.squad_slots("g2", "p").await.unwrap()["ST"], "b");
    }

    #[tokio::test]
    async fn test_locked_squad_writes_roll_back_together() {
        let db = test_db().await;
        db.set_card_count("g", "p", "a", 1).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        let squad = Database::lock_squad(&mut uow, "g", "p").await.unwrap();
        assert_eq!(squad.formation_id, DEFAULT_FORMATION);
        assert_eq!(Database::locked_owned_counts(&mut uow, "g", "p").await.unwrap()["a"], 1);
        Database::locked_set_squad_slot(&mut uow, "g", "p", "ST", "a").await.unwrap();
        assert_eq!(Database::locked_squad_slots(&mut uow, "g", "p").await.unwrap()["ST"], "a");
        uow.rollback().await.unwrap();

        assert!(db.squad_slots("g", "p").await.unwrap().is_empty());

        let mut uow = db.begin().await.unwrap();
        Database::lock_squad(&mut uow, "g", "p").await.unwrap();
        Database::write_squad(&mut uow, "g", "p", "4-4-2", &[("LST".into(), "a".into())])
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(db.ensure_squad("g", "p").await.unwrap().formation_id, "4-4-2");
        assert_eq!(db.squad_slots("g", "p").await.unwrap()["LST"], "a");
    }

    #[tokio::test]
    async fn test_owned_counts_skip_non_positive() {
        let db = test_db().await;
        db.set_card_count("g", "p", "a", 2).await.unwrap();
        db.set_card_count("g", "p", "b", 0).await.unwrap();
        db.set_card_count("g", "p", "c", -1).await.unwrap();

        let counts = db.owned_counts("g", "p").await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["a"], 2);
    }

    #[tokio::test]
    async fn test_rating_get_or_create_and_delta() {
        let db = test_db().await;

        let mut uow = db.begin().await.unwrap();
        let profile = Database::get_or_create_rating(&mut uow, "alice").await.unwrap();
        assert_eq!(profile.rating, DEFAULT_RATING);
        assert!(!profile.legacy_merged);
        Database::apply_rating_delta(&mut uow, "alice", 17.0, Outcome::Win)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let stored = db.get_rating("alice").await.unwrap().unwrap();
        assert_eq!(stored.rating, 1017.0);
        assert_eq!((stored.wins, stored.draws, stored.losses), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_rollback_discards_rating_writes() {
        let db = test_db().await;

        let mut uow = db.begin().await.unwrap();
        Database::get_or_create_rating(&mut uow, "bob").await.unwrap();
        Database::apply_rating_delta(&mut uow, "bob", -10.0, Outcome::Loss)
            .await
            .unwrap();
        uow.rollback().await.unwrap();

        assert!(db.get_rating("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_delta_to_missing_profile_fails() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        let err = Database::apply_rating_delta(&mut uow, "ghost", 1.0, Outcome::Draw)
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn test_claim_legacy_merge_only_once() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        Database::get_or_create_rating(&mut uow, "carol").await.unwrap();
        assert!(Database::claim_legacy_merge(&mut uow, "carol").await.unwrap());
        assert!(!Database::claim_legacy_merge(&mut uow, "carol").await.unwrap());
        uow.commit().await.unwrap();

        assert!(db.get_rating("carol").await.unwrap().unwrap().legacy_merged);
    }

    #[tokio::test]
    async fn test_leaderboard_order() {
        let db = test_db().await;
        let mut uow = db.begin().await.unwrap();
        for (player, delta) in [("a", 5.0), ("b", 30.0), ("c", -12.0)] {
            Database::get_or_create_rating(&mut uow, player).await.unwrap();
            Database::apply_rating_delta(&mut uow, player, delta, Outcome::Draw)
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        let board = db.leaderboard(2).await.unwrap();
        let ids: Vec<_> = board.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
