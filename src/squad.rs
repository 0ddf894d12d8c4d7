// Squad assembly: turning owned cards into an 11-slot lineup for a formation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use icu_collator::{Collator, CollatorOptions};
use serde::Serialize;

use crate::cards::{Card, CardCatalog, FieldedPlayers, Position};
use crate::db::Database;
use crate::formation::{formation_or_default, Formation};

#[derive(Debug, thiserror::Error)]
pub enum SquadError {
    #[error("slot '{slot}' does not exist in formation {formation}")]
    SlotInvalid { slot: String, formation: String },
    #[error("you do not own card '{card_id}'")]
    CardNotOwned { card_id: String },
    #[error("card '{card_id}' is not in the catalog")]
    CardUnknown { card_id: String },
    #[error("{card_name} plays {position}, but slot {slot} only accepts {}", join_positions(.allowed))]
    PositionMismatch {
        card_name: String,
        position: Position,
        slot: String,
        allowed: Vec<Position>,
    },
    #[error("{card_name} is already fielded in slot {slot}")]
    PlayerAlreadyFielded { card_name: String, slot: String },
    #[error("card '{card_id}' would need {needed} copies but you own {owned}")]
    InsufficientDuplicates {
        card_id: String,
        owned: u32,
        needed: u32,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SquadError {
    /// True for rejections of the request itself; false when storage failed.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SquadError::Database(_))
    }
}

fn join_positions(positions: &[Position]) -> String {
    positions
        .iter()
        .map(Position::as_str)
        .collect::<Vec<_>>()
        .join("/")
}

/// One formation slot resolved against the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct LineupSlot {
    pub key: String,
    pub label: String,
    pub card: Option<Card>,
}

/// Read-only view of a squad against its formation.
#[derive(Debug, Clone, Serialize)]
pub struct Lineup {
    pub formation_id: String,
    pub slots: Vec<LineupSlot>,
    /// Rounded mean overall of filled slots, 0 when empty.
    pub overall: u8,
}

impl Lineup {
    pub fn new(formation: &Formation, mut assigned: HashMap<String, Card>) -> Self {
        let slots: Vec<LineupSlot> = formation
            .slots
            .iter()
            .map(|s| LineupSlot {
                key: s.key.to_string(),
                label: s.label.to_string(),
                card: assigned.remove(s.key),
            })
            .collect();

        let filled: Vec<f64> = slots
            .iter()
            .filter_map(|s| s.card.as_ref())
            .map(|c| c.overall as f64)
            .collect();
        let overall = if filled.is_empty() {
            0
        } else {
            (filled.iter().sum::<f64>() / filled.len() as f64).round() as u8
        };

        Self {
            formation_id: formation.id.to_string(),
            slots,
            overall,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.card.is_some())
    }

    pub fn filled_count(&self) -> usize {
        self.starters().len()
    }

    /// Cards in filled slots, in formation order.
    pub fn starters(&self) -> Vec<&Card> {
        self.slots.iter().filter_map(|s| s.card.as_ref()).collect()
    }
}

/// Root-locale collator for name tie-breaks. `None` only if the bundled data fails to load.
fn name_collator() -> Option<Collator> {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            tracing::warn!("Name collation unavailable, falling back to code-point order: {e:?}");
            None
        }
    }
}

fn compare_names(collator: Option<&Collator>, a: &str, b: &str) -> Ordering {
    match collator {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Total order used to rank auto-fill candidates: overall, then rarity, then name.
fn candidate_order(a: &Card, b: &Card, collator: Option<&Collator>) -> Ordering {
    b.overall
        .cmp(&a.overall)
        .then_with(|| b.rarity.rank().cmp(&a.rarity.rank()))
        .then_with(|| compare_names(collator, &a.name, &b.name))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Greedy slot assignment.
///
/// Slots are visited in formation order and each takes the best remaining card that fits.
/// There is no backtracking, so an early slot can consume a card a later slot needed and
/// leave it empty. A globally optimal assignment would need bipartite matching; the greedy
/// order is kept because players see and rely on its results.
pub fn greedy_assignment<'a>(
    formation: &Formation,
    owned: &HashMap<String, u32>,
    catalog: &'a dyn CardCatalog,
) -> Vec<(String, &'a Card)> {
    let mut candidates: Vec<&Card> = owned
        .iter()
        .filter(|(_, count)| **count > 0)
        .filter_map(|(id, &count)| catalog.by_id(id).map(|card| (card, count)))
        .flat_map(|(card, count)| std::iter::repeat(card).take(count as usize))
        .collect();
    let collator = name_collator();
    candidates.sort_by(|a, b| candidate_order(a, b, collator.as_ref()));

    let mut usage: HashMap<&str, u32> = HashMap::new();
    let mut fielded = FieldedPlayers::default();
    let mut picks = Vec::new();

    for slot in &formation.slots {
        let pick = candidates.iter().copied().find(|card| {
            let used = usage.get(card.id.as_str()).copied().unwrap_or(0);
            let owned_count = owned.get(&card.id).copied().unwrap_or(0);
            slot.allows(&card.canonical_position())
                && used < owned_count
                && !fielded.contains(card)
        });

        if let Some(card) = pick {
            *usage.entry(card.id.as_str()).or_insert(0) += 1;
            fielded.insert(card);
            picks.push((slot.key.to_string(), card));
        }
    }

    picks
}

/// Builds and validates lineups for (scope, player) squads.
#[derive(Clone)]
pub struct SquadAssembler {
    db: Arc<Database>,
    catalog: Arc<dyn CardCatalog>,
}

impl SquadAssembler {
    pub fn new(db: Arc<Database>, catalog: Arc<dyn CardCatalog>) -> Self {
        Self { db, catalog }
    }

    pub fn catalog(&self) -> &dyn CardCatalog {
        self.catalog.as_ref()
    }

    /// Switch formation, keeping assignments whose slot key exists in the new one.
    /// Unknown ids fall back to the default formation. Returns the formation applied.
    pub async fn set_formation(
        &self,
        scope: &str,
        player: &str,
        formation_id: &str,
    ) -> Result<&'static Formation, SquadError> {
        let formation = formation_or_default(formation_id);
        let mut uow = self.db.begin().await?;
        Database::lock_squad(&mut uow, scope, player).await?;
        let current = Database::locked_squad_slots(&mut uow, scope, player).await?;

        let kept: Vec<(String, String)> = current
            .into_iter()
            .filter(|(key, _)| formation.has_slot(key))
            .collect();

        Database::write_squad(&mut uow, scope, player, formation.id, &kept).await?;
        uow.commit().await?;
        tracing::debug!(scope, player, formation = formation.id, kept = kept.len(), "Formation changed");
        Ok(formation)
    }

    /// Place a card in a slot. Validation failures leave the squad untouched.
    ///
    /// The squad is locked before it is read, so two concurrent placements are
    /// validated one after the other and cannot both spend the same copy.
    pub async fn set_slot(
        &self,
        scope: &str,
        player: &str,
        slot_key: &str,
        card_id: &str,
    ) -> Result<(), SquadError> {
        let mut uow = self.db.begin().await?;
        let squad = Database::lock_squad(&mut uow, scope, player).await?;
        let formation = formation_or_default(&squad.formation_id);

        let slot = formation
            .slot(slot_key)
            .ok_or_else(|| SquadError::SlotInvalid {
                slot: slot_key.to_string(),
                formation: formation.id.to_string(),
            })?;

        let owned = Database::locked_owned_counts(&mut uow, scope, player).await?;
        let owned_count = owned.get(card_id).copied().unwrap_or(0);
        if owned_count == 0 {
            return Err(SquadError::CardNotOwned {
                card_id: card_id.to_string(),
            });
        }

        let card = self
            .catalog
            .by_id(card_id)
            .ok_or_else(|| SquadError::CardUnknown {
                card_id: card_id.to_string(),
            })?;

        let position = card.canonical_position();
        if !slot.allows(&position) {
            return Err(SquadError::PositionMismatch {
                card_name: card.name.clone(),
                position,
                slot: slot.key.to_string(),
                allowed: slot.allowed_positions.clone(),
            });
        }

        let current = Database::locked_squad_slots(&mut uow, scope, player).await?;
        let others: Vec<(&String, &String)> = current
            .iter()
            .filter(|(key, _)| key.as_str() != slot_key && formation.has_slot(key))
            .collect();

        let other_usages = others.iter().filter(|(_, id)| id.as_str() == card_id).count() as u32;
        if other_usages + 1 > owned_count {
            return Err(SquadError::InsufficientDuplicates {
                card_id: card_id.to_string(),
                owned: owned_count,
                needed: other_usages + 1,
            });
        }

        for (key, other_id) in &others {
            let Some(other) = self.catalog.by_id(other_id) else {
                continue;
            };
            if other.same_player(card) {
                return Err(SquadError::PlayerAlreadyFielded {
                    card_name: card.name.clone(),
                    slot: key.to_string(),
                });
            }
        }

        Database::locked_set_squad_slot(&mut uow, scope, player, slot_key, card_id).await?;
        uow.commit().await?;
        Ok(())
    }

    pub async fn remove_slot(&self, scope: &str, player: &str, slot_key: &str) -> Result<(), SquadError> {
        self.db.remove_squad_slot(scope, player, slot_key).await?;
        Ok(())
    }

    pub async fn clear_squad(&self, scope: &str, player: &str) -> Result<(), SquadError> {
        self.db.ensure_squad(scope, player).await?;
        self.db.clear_squad_slots(scope, player).await?;
        Ok(())
    }

    /// Rebuild the squad with [`greedy_assignment`] for the given formation.
    pub async fn auto_fill(
        &self,
        scope: &str,
        player: &str,
        formation_id: &str,
    ) -> Result<Lineup, SquadError> {
        let formation = formation_or_default(formation_id);
        let mut uow = self.db.begin().await?;
        Database::lock_squad(&mut uow, scope, player).await?;
        let owned = Database::locked_owned_counts(&mut uow, scope, player).await?;
        let picks = greedy_assignment(formation, &owned, self.catalog.as_ref());

        let rows: Vec<(String, String)> = picks
            .iter()
            .map(|(key, card)| (key.clone(), card.id.clone()))
            .collect();
        Database::write_squad(&mut uow, scope, player, formation.id, &rows).await?;
        uow.commit().await?;

        tracing::info!(
            scope,
            player,
            formation = formation.id,
            filled = rows.len(),
            "Squad auto-filled"
        );

        let assigned = picks
            .into_iter()
            .map(|(key, card)| (key, card.clone()))
            .collect();
        Ok(Lineup::new(formation, assigned))
    }

    /// Resolve the stored squad into a lineup.
    pub async fn hydrate(&self, scope: &str, player: &str) -> Result<Lineup, SquadError> {
        let squad = self.db.ensure_squad(scope, player).await?;
        let formation = formation_or_default(&squad.formation_id);
        let slots = self.db.squad_slots(scope, player).await?;

        let assigned = slots
            .into_iter()
            .filter_map(|(key, card_id)| {
                self.catalog.by_id(&card_id).map(|card| (key, card.clone()))
            })
            .collect();
        Ok(Lineup::new(formation, assigned))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::cards::Rarity;

    async fn setup(cards: Vec<Card>) -> (Arc<Database>, SquadAssembler) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let assembler = SquadAssembler::new(db.clone(), Arc::new(pool(cards)));
        (db, assembler)
    }

    #[tokio::test]
    async fn test_hydrate_new_squad_is_empty_default() {
        let (_db, squads) = setup(vec![]).await;
        let lineup = squads.hydrate("g", "p").await.unwrap();
        assert_eq!(lineup.formation_id, "4-3-3");
        assert_eq!(lineup.slots.len(), 11);
        assert_eq!(lineup.overall, 0);
        assert!(!lineup.is_complete());
    }

    #[tokio::test]
    async fn test_set_slot_validation_errors() {
        let mut cards = vec![card("st", "Striker One", "ST", 80, Rarity::Rare)];
        cards.push(card("cb", "Centre Back", "CB", 75, Rarity::Common));
        let (db, squads) = setup(cards).await;
        db.set_card_count("g", "p", "st", 1).await.unwrap();
        db.set_card_count("g", "p", "ghost", 1).await.unwrap();

        let err = squads.set_slot("g", "p", "XX", "st").await.unwrap_err();
        assert!(matches!(err, SquadError::SlotInvalid { .. }));

        let err = squads.set_slot("g", "p", "LCB", "cb").await.unwrap_err();
        assert!(matches!(err, SquadError::CardNotOwned { .. }));

        let err = squads.set_slot("g", "p", "ST", "ghost").await.unwrap_err();
        assert!(matches!(err, SquadError::CardUnknown { .. }));

        let err = squads.set_slot("g", "p", "GK", "st").await.unwrap_err();
        match &err {
            SquadError::PositionMismatch { position, allowed, .. } => {
                assert_eq!(*position, Position::ST);
                assert_eq!(allowed, &vec![Position::GK]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Striker One plays ST, but slot GK only accepts GK"
        );
        assert!(err.is_validation());

        assert!(db.squad_slots("g", "p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_slot_overwrites_idempotently() {
        let cards = vec![
            card("a", "Alpha", "ST", 80, Rarity::Rare),
            card("b", "Bravo", "CF", 82, Rarity::Rare),
        ];
        let (db, squads) = setup(cards).await;
        db.set_card_count("g", "p", "a", 1).await.unwrap();
        db.set_card_count("g", "p", "b", 1).await.unwrap();

        squads.set_slot("g", "p", "ST", "a").await.unwrap();
        squads.set_slot("g", "p", "ST", "a").await.unwrap();
        squads.set_slot("g", "p", "ST", "b").await.unwrap();

        let slots = db.squad_slots("g", "p").await.unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots["ST"], "b");
    }

    #[tokio::test]
    async fn test_single_copy_cannot_fill_two_slots() {
        let cards = vec![card("cb", "Stopper", "CB", 78, Rarity::Epic)];
        let (db, squads) = setup(cards).await;
        db.set_card_count("g", "p", "cb", 1).await.unwrap();

        squads.set_slot("g", "p", "LCB", "cb").await.unwrap();
        let err = squads.set_slot("g", "p", "RCB", "cb").await.unwrap_err();
        match err {
            SquadError::InsufficientDuplicates { owned, needed, .. } => {
                assert_eq!(owned, 1);
                assert_eq!(needed, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_real_player_rejected_across_cards() {
        let mut base = card("cb-base", "Virgil van Dijk", "CB", 86, Rarity::Rare);
        base.player_id = Some("vvd".into());
        let mut promo = card("cb-promo", "V. van Dijk", "CB", 90, Rarity::Legendary);
        promo.player_id = Some("vvd".into());
        let renamed = card("cb-plain", "VIRGIL VAN-DIJK", "CB", 84, Rarity::Common);
        let (db, squads) = setup(vec![base, promo, renamed]).await;
        for id in ["cb-base", "cb-promo", "cb-plain"] {
            db.set_card_count("g", "p", id, 2).await.unwrap();
        }

        squads.set_slot("g", "p", "LCB", "cb-base").await.unwrap();

        let err = squads.set_slot("g", "p", "RCB", "cb-promo").await.unwrap_err();
        assert!(matches!(err, SquadError::PlayerAlreadyFielded { ref slot, .. } if slot == "LCB"));

        // Two owned copies still cannot field the same player twice.
        let err = squads.set_slot("g", "p", "RCB", "cb-base").await.unwrap_err();
        assert!(matches!(err, SquadError::PlayerAlreadyFielded { .. }));

        // A card without an external id still matches on the normalized name.
        let err = squads.set_slot("g", "p", "RCB", "cb-plain").await.unwrap_err();
        assert!(matches!(err, SquadError::PlayerAlreadyFielded { ref slot, .. } if slot == "LCB"));
        assert_eq!(db.squad_slots("g", "p").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_name_match_blocks_card_with_external_id() {
        let plain = card("cb-plain", "VIRGIL VAN-DIJK", "CB", 84, Rarity::Common);
        let mut keyed = card("cb-keyed", "Virgil van Dijk", "CB", 86, Rarity::Rare);
        keyed.player_id = Some("vvd".into());
        let (db, squads) = setup(vec![plain, keyed]).await;
        db.set_card_count("g", "p", "cb-plain", 1).await.unwrap();
        db.set_card_count("g", "p", "cb-keyed", 1).await.unwrap();

        squads.set_slot("g", "p", "LCB", "cb-plain").await.unwrap();
        let err = squads.set_slot("g", "p", "RCB", "cb-keyed").await.unwrap_err();
        assert!(matches!(err, SquadError::PlayerAlreadyFielded { .. }));
    }

    #[tokio::test]
    async fn test_formation_switch_keeps_shared_keys() {
        let cards = full_433("h", 80);
        let (db, squads) = setup(cards.clone()).await;
        for c in &cards {
            db.set_card_count("g", "p", &c.id, 1).await.unwrap();
        }
        let lineup = squads.auto_fill("g", "p", "4-3-3").await.unwrap();
        assert!(lineup.is_complete());
        let before = db.squad_slots("g", "p").await.unwrap();

        let applied = squads.set_formation("g", "p", "4-4-2").await.unwrap();
        assert_eq!(applied.id, "4-4-2");

        let after = db.squad_slots("g", "p").await.unwrap();
        assert!(!after.contains_key("RW"));
        for (key, card_id) in &before {
            if applied.has_slot(key) {
                assert_eq!(after.get(key), Some(card_id), "slot {key} should be kept");
            } else {
                assert!(!after.contains_key(key));
            }
        }
        assert_eq!(squads.hydrate("g", "p").await.unwrap().formation_id, "4-4-2");
    }

    #[tokio::test]
    async fn test_unknown_formation_falls_back_to_default() {
        let (_db, squads) = setup(vec![]).await;
        let applied = squads.set_formation("g", "p", "2-2-6").await.unwrap();
        assert_eq!(applied.id, "4-3-3");
    }

    #[tokio::test]
    async fn test_auto_fill_prefers_overall_then_rarity_then_name() {
        let cards = vec![
            card("st-1", "Zed", "ST", 85, Rarity::Common),
            card("st-2", "Amy", "ST", 85, Rarity::Epic),
            card("st-3", "Bob", "ST", 85, Rarity::Epic),
            card("st-4", "Cat", "ST", 90, Rarity::Common),
        ];
        let (db, squads) = setup(cards).await;
        for id in ["st-1", "st-2", "st-3", "st-4"] {
            db.set_card_count("g", "p", id, 1).await.unwrap();
        }

        // 4-4-2 has two striker slots: LST then RST.
        let lineup = squads.auto_fill("g", "p", "4-4-2").await.unwrap();
        let picked: HashMap<_, _> = lineup
            .slots
            .iter()
            .filter_map(|s| s.card.as_ref().map(|c| (s.key.as_str(), c.id.as_str())))
            .collect();
        assert_eq!(picked["LST"], "st-4");
        assert_eq!(picked["RST"], "st-2");
        assert_eq!(picked.len(), 2);
    }

    #[tokio::test]
    async fn test_auto_fill_is_greedy_without_backtracking() {
        // Both CMs go to the holding slots first, so the CAM slot stays empty even
        // though putting the CDM in a holding slot would have filled all three.
        let cards = vec![
            card("cm-1", "Maestro", "CM", 90, Rarity::Rare),
            card("cm-2", "Engine", "CM", 88, Rarity::Rare),
            card("cdm", "Anchor", "CDM", 70, Rarity::Rare),
        ];
        let (db, squads) = setup(cards).await;
        for id in ["cm-1", "cm-2", "cdm"] {
            db.set_card_count("g", "p", id, 1).await.unwrap();
        }

        let lineup = squads.auto_fill("g", "p", "4-2-3-1").await.unwrap();
        let by_key = |key: &str| {
            lineup
                .slots
                .iter()
                .find(|s| s.key == key)
                .and_then(|s| s.card.as_ref().map(|c| c.id.clone()))
        };
        assert_eq!(by_key("LDM").as_deref(), Some("cm-1"));
        assert_eq!(by_key("RDM").as_deref(), Some("cm-2"));
        assert_eq!(by_key("CAM"), None);
        assert_eq!(lineup.filled_count(), 2);
    }

    #[tokio::test]
    async fn test_auto_fill_never_repeats_identity() {
        let mut cards = full_433("x", 75);
        let mut dup = card("x-dup", "x Player 9", "ST", 95, Rarity::Legendary);
        dup.player_id = None;
        cards.push(dup);
        let (db, squads) = setup(cards.clone()).await;
        for c in &cards {
            db.set_card_count("g", "p", &c.id, 3).await.unwrap();
        }

        let lineup = squads.auto_fill("g", "p", "4-3-3").await.unwrap();
        let starters = lineup.starters();
        for (i, a) in starters.iter().enumerate() {
            for b in &starters[i + 1..] {
                assert!(!a.same_player(b), "{} and {} are the same player", a.name, b.name);
            }
        }

        // The higher-rated duplicate identity wins the ST slot.
        let st = lineup.slots.iter().find(|s| s.key == "ST").unwrap();
        assert_eq!(st.card.as_ref().unwrap().id, "x-dup");
    }

    #[tokio::test]
    async fn test_auto_fill_mixed_identity_keys() {
        // The id-less card shares a name with the keyed one; only one may start.
        let mut keyed = card("st-keyed", "Erling Haaland", "ST", 91, Rarity::Epic);
        keyed.player_id = Some("eh9".into());
        let plain = card("st-plain", "erling  haaland", "ST", 93, Rarity::Common);
        let other = card("st-other", "Backup Nine", "ST", 70, Rarity::Common);
        let (db, squads) = setup(vec![keyed, plain, other]).await;
        for id in ["st-keyed", "st-plain", "st-other"] {
            db.set_card_count("g", "p", id, 1).await.unwrap();
        }

        let lineup = squads.auto_fill("g", "p", "4-4-2").await.unwrap();
        let picked: HashMap<_, _> = lineup
            .slots
            .iter()
            .filter_map(|s| s.card.as_ref().map(|c| (s.key.as_str(), c.id.as_str())))
            .collect();
        assert_eq!(picked["LST"], "st-plain");
        assert_eq!(picked["RST"], "st-other");
    }

    #[tokio::test]
    async fn test_auto_fill_name_order_is_locale_aware() {
        let cards = vec![
            card("st-z", "Zed", "ST", 85, Rarity::Rare),
            card("st-e", "Émile", "ST", 85, Rarity::Rare),
        ];
        let (db, squads) = setup(cards).await;
        db.set_card_count("g", "p", "st-z", 1).await.unwrap();
        db.set_card_count("g", "p", "st-e", 1).await.unwrap();

        let lineup = squads.auto_fill("g", "p", "4-3-3").await.unwrap();
        let st = lineup.slots.iter().find(|s| s.key == "ST").unwrap();
        assert_eq!(st.card.as_ref().unwrap().id, "st-e");
    }

    #[test]
    fn test_candidate_order_collates_accents() {
        let collator = name_collator();
        assert!(collator.is_some());
        let names = ["Zoë", "émile", "Ángel", "bruno", "Émile", "Zed"];
        let mut cards: Vec<Card> = names
            .iter()
            .enumerate()
            .map(|(i, n)| card(&format!("c{i}"), n, "ST", 80, Rarity::Rare))
            .collect();
        cards.sort_by(|a, b| candidate_order(a, b, collator.as_ref()));
        let sorted: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(sorted, vec!["Ángel", "bruno", "émile", "Émile", "Zed", "Zoë"]);
    }

    #[tokio::test]
    async fn test_auto_fill_is_deterministic() {
        let cards = full_433("d", 77);
        let (db, squads) = setup(cards.clone()).await;
        for c in &cards {
            db.set_card_count("g", "p", &c.id, 1).await.unwrap();
        }
        let first = squads.auto_fill("g", "p", "4-3-3").await.unwrap();
        let second = squads.auto_fill("g", "p", "4-3-3").await.unwrap();
        let ids = |l: &Lineup| -> Vec<Option<String>> {
            l.slots.iter().map(|s| s.card.as_ref().map(|c| c.id.clone())).collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cards = full_433("r", 70);
        let (db, squads) = setup(cards.clone()).await;
        for c in &cards {
            db.set_card_count("g", "p", &c.id, 1).await.unwrap();
        }
        squads.auto_fill("g", "p", "4-3-3").await.unwrap();

        squads.remove_slot("g", "p", "ST").await.unwrap();
        squads.remove_slot("g", "p", "ST").await.unwrap();
        let lineup = squads.hydrate("g", "p").await.unwrap();
        assert_eq!(lineup.filled_count(), 10);

        squads.clear_squad("g", "p").await.unwrap();
        let lineup = squads.hydrate("g", "p").await.unwrap();
        assert_eq!(lineup.filled_count(), 0);
        assert_eq!(lineup.formation_id, "4-3-3");
    }

    #[test]
    fn test_lineup_overall_is_rounded_mean() {
        let formation = formation_or_default("4-3-3");
        let mut assigned = HashMap::new();
        assigned.insert("GK".to_string(), card("a", "A", "GK", 80, Rarity::Rare));
        assigned.insert("ST".to_string(), card("b", "B", "ST", 83, Rarity::Rare));
        let lineup = Lineup::new(formation, assigned);
        // (80 + 83) / 2 = 81.5
        assert_eq!(lineup.overall, 82);
        assert_eq!(lineup.filled_count(), 2);
    }
}
