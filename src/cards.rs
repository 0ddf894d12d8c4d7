// Card catalog: card data, position vocabulary, and the read-only lookup used by squads.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Canonical on-pitch positions.
///
/// Raw upstream tokens go through [`normalize_position`]; anything that does not map
/// lands in `Unknown`, which never satisfies a formation slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    GK,
    CB,
    LB,
    RB,
    CDM,
    CM,
    CAM,
    LM,
    RM,
    LW,
    RW,
    ST,
    Unknown(String),
}

impl Position {
    pub fn as_str(&self) -> &str {
        match self {
            Position::GK => "GK",
            Position::CB => "CB",
            Position::LB => "LB",
            Position::RB => "RB",
            Position::CDM => "CDM",
            Position::CM => "CM",
            Position::CAM => "CAM",
            Position::LM => "LM",
            Position::RM => "RM",
            Position::LW => "LW",
            Position::RW => "RW",
            Position::ST => "ST",
            Position::Unknown(raw) => raw,
        }
    }

    /// Positions whose players drive the attack rating and take shots.
    pub fn is_attacking(&self) -> bool {
        matches!(
            self,
            Position::ST | Position::LW | Position::RW | Position::CAM | Position::CM
        )
    }

    pub fn is_defensive(&self) -> bool {
        matches!(
            self,
            Position::GK | Position::CB | Position::LB | Position::RB | Position::CDM
        )
    }

    /// Positions eligible to be credited with an assist.
    pub fn is_playmaking(&self) -> bool {
        matches!(
            self,
            Position::CAM
                | Position::CM
                | Position::CDM
                | Position::LM
                | Position::RM
                | Position::LW
                | Position::RW
                | Position::ST
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Position {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Map a raw position token (any case, common aliases included) to a canonical position.
pub fn normalize_position(raw: &str) -> Position {
    let token = raw.trim().to_ascii_uppercase();
    match token.as_str() {
        "GK" | "G" | "GOALKEEPER" | "KEEPER" | "POR" => Position::GK,
        "CB" | "LCB" | "RCB" | "CENTER BACK" | "CENTRE BACK" | "DC" => Position::CB,
        "LB" | "LWB" => Position::LB,
        "RB" | "RWB" => Position::RB,
        "CDM" | "DM" | "LDM" | "RDM" => Position::CDM,
        "CM" | "LCM" | "RCM" | "MC" => Position::CM,
        "CAM" | "AM" | "LAM" | "RAM" => Position::CAM,
        "LM" => Position::LM,
        "RM" => Position::RM,
        "LW" | "LF" => Position::LW,
        "RW" | "RF" => Position::RW,
        "ST" | "CF" | "FW" | "LS" | "RS" | "STRIKER" | "FORWARD" => Position::ST,
        _ => Position::Unknown(raw.trim().to_string()),
    }
}

/// Card rarity, ordered from least to most valuable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn rank(self) -> u8 {
        match self {
            Rarity::Common => 0,
            Rarity::Rare => 1,
            Rarity::Epic => 2,
            Rarity::Legendary => 3,
        }
    }
}

/// Face stats, each 0-99.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Stats {
    pub pac: u8,
    pub sho: u8,
    pub pas: u8,
    pub dri: u8,
    pub def: u8,
    pub phy: u8,
}

/// An immutable card definition from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    /// Raw position token as supplied by the catalog.
    pub position: String,
    pub overall: u8,
    pub rarity: Rarity,
    pub stats: Stats,
    /// External id of the real-world player, shared by every card of that player.
    #[serde(default, rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

impl Card {
    pub fn canonical_position(&self) -> Position {
        normalize_position(&self.position)
    }

    /// External player id, ignoring blank values.
    pub fn external_id(&self) -> Option<&str> {
        self.player_id
            .as_deref()
            .map(str::trim)
            .filter(|pid| !pid.is_empty())
    }

    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    /// True when both cards depict the same real-world player: equal external ids,
    /// or equal normalized names.
    pub fn same_player(&self, other: &Card) -> bool {
        match (self.external_id(), other.external_id()) {
            (Some(a), Some(b)) if a == b => true,
            _ => self.name_key() == other.name_key(),
        }
    }
}

/// Real-world players already placed in a lineup, tracked by both identity keys.
#[derive(Debug, Default)]
pub struct FieldedPlayers {
    ids: HashSet<String>,
    names: HashSet<String>,
}

impl FieldedPlayers {
    pub fn contains(&self, card: &Card) -> bool {
        card.external_id().is_some_and(|id| self.ids.contains(id))
            || self.names.contains(&card.name_key())
    }

    pub fn insert(&mut self, card: &Card) {
        if let Some(id) = card.external_id() {
            self.ids.insert(id.to_string());
        }
        self.names.insert(card.name_key());
    }
}

/// Lowercase, strip punctuation, and collapse whitespace so spelling variants compare equal.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read-only card lookup.
pub trait CardCatalog: Send + Sync {
    fn by_id(&self, id: &str) -> Option<&Card>;
    fn all(&self) -> Vec<&Card>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read card catalog '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid card catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory catalog, usually loaded from a JSON array of cards.
#[derive(Debug, Clone, Default)]
pub struct CardPool {
    cards: HashMap<String, Card>,
}

impl CardPool {
    pub fn new(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Ok(Self::new(cards))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for CardPool {
    fn by_id(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    fn all(&self) -> Vec<&Card> {
        let mut all: Vec<&Card> = self.cards.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
