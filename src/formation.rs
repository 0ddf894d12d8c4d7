// Formation registry: the slot layouts a squad can be arranged in.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Serialize;

use crate::cards::Position;

/// Formation used when a squad has none yet or asks for an unknown id.
pub const DEFAULT_FORMATION: &str = "4-3-3";

/// Number of slots in every formation.
pub const SQUAD_SIZE: usize = 11;

/// One position in a formation.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub key: &'static str,
    pub label: &'static str,
    pub allowed_positions: Vec<Position>,
    /// Pitch coordinates in percent (x from left touchline, y from own goal line).
    /// Presentation only.
    pub coords: (u8, u8),
}

impl Slot {
    pub fn allows(&self, position: &Position) -> bool {
        self.allowed_positions.contains(position)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Formation {
    pub id: &'static str,
    pub slots: Vec<Slot>,
}

impl Formation {
    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn has_slot(&self, key: &str) -> bool {
        self.slot(key).is_some()
    }
}

fn slot(key: &'static str, label: &'static str, allowed: &[Position], coords: (u8, u8)) -> Slot {
    Slot {
        key,
        label,
        allowed_positions: allowed.to_vec(),
        coords,
    }
}

fn back_four() -> Vec<Slot> {
    use Position::*;
    vec![
        slot("GK", "Goalkeeper", &[GK], (50, 5)),
        slot("LB", "Left Back", &[LB], (12, 25)),
        slot("LCB", "Left Centre Back", &[CB], (37, 20)),
        slot("RCB", "Right Centre Back", &[CB], (63, 20)),
        slot("RB", "Right Back", &[RB], (88, 25)),
    ]
}

fn build_registry() -> HashMap<&'static str, Formation> {
    use Position::*;

    let mut f433 = back_four();
    f433.extend([
        slot("LCM", "Left Midfield", &[CM, CDM, CAM], (30, 50)),
        slot("CM", "Central Midfield", &[CM, CDM, CAM], (50, 45)),
        slot("RCM", "Right Midfield", &[CM, CDM, CAM], (70, 50)),
        slot("LW", "Left Wing", &[LW, LM], (15, 78)),
        slot("ST", "Striker", &[ST], (50, 85)),
        slot("RW", "Right Wing", &[RW, RM], (85, 78)),
    ]);

    let mut f442 = back_four();
    f442.extend([
        slot("LM", "Left Midfield", &[LM, LW], (12, 55)),
        slot("LCM", "Left Central Midfield", &[CM, CDM], (37, 50)),
        slot("RCM", "Right Central Midfield", &[CM, CDM], (63, 50)),
        slot("RM", "Right Midfield", &[RM, RW], (88, 55)),
        slot("LST", "Left Striker", &[ST], (40, 85)),
        slot("RST", "Right Striker", &[ST], (60, 85)),
    ]);

    let mut f4231 = back_four();
    f4231.extend([
        slot("LDM", "Left Holding Midfield", &[CDM, CM], (38, 40)),
        slot("RDM", "Right Holding Midfield", &[CDM, CM], (62, 40)),
        slot("LW", "Left Wing", &[LW, LM], (15, 68)),
        slot("CAM", "Attacking Midfield", &[CAM, CM], (50, 65)),
        slot("RW", "Right Wing", &[RW, RM], (85, 68)),
        slot("ST", "Striker", &[ST], (50, 87)),
    ]);

    let f352 = vec![
        slot("GK", "Goalkeeper", &[GK], (50, 5)),
        slot("LCB", "Left Centre Back", &[CB], (28, 22)),
        slot("CB", "Centre Back", &[CB], (50, 18)),
        slot("RCB", "Right Centre Back", &[CB], (72, 22)),
        slot("LM", "Left Wing Back", &[LM, LW, LB], (10, 52)),
        slot("LCM", "Left Central Midfield", &[CM, CAM], (33, 55)),
        slot("CDM", "Holding Midfield", &[CDM, CM], (50, 42)),
        slot("RCM", "Right Central Midfield", &[CM, CAM], (67, 55)),
        slot("RM", "Right Wing Back", &[RM, RW, RB], (90, 52)),
        slot("LST", "Left Striker", &[ST], (40, 85)),
        slot("RST", "Right Striker", &[ST], (60, 85)),
    ];

    let f532 = vec![
        slot("GK", "Goalkeeper", &[GK], (50, 5)),
        slot("LB", "Left Wing Back", &[LB, LM], (8, 32)),
        slot("LCB", "Left Centre Back", &[CB], (30, 20)),
        slot("CB", "Centre Back", &[CB], (50, 18)),
        slot("RCB", "Right Centre Back", &[CB], (70, 20)),
        slot("RB", "Right Wing Back", &[RB, RM], (92, 32)),
        slot("LCM", "Left Midfield", &[CM, CDM, CAM], (30, 52)),
        slot("CM", "Central Midfield", &[CM, CDM, CAM], (50, 47)),
        slot("RCM", "Right Midfield", &[CM, CDM, CAM], (70, 52)),
        slot("LST", "Left Striker", &[ST], (40, 85)),
        slot("RST", "Right Striker", &[ST], (60, 85)),
    ];

    [
        ("4-3-3", f433),
        ("4-4-2", f442),
        ("4-2-3-1", f4231),
        ("3-5-2", f352),
        ("5-3-2", f532),
    ]
    .into_iter()
    .map(|(id, slots)| (id, Formation { id, slots }))
    .collect()
}

lazy_static! {
    static ref FORMATIONS: HashMap<&'static str, Formation> = build_registry();
}

/// Look up a formation by id.
pub fn formation(id: &str) -> Option<&'static Formation> {
    FORMATIONS.get(id.trim())
}

/// Look up a formation, falling back to [`DEFAULT_FORMATION`] for unknown ids.
pub fn formation_or_default(id: &str) -> &'static Formation {
    formation(id).unwrap_or_else(|| &FORMATIONS[DEFAULT_FORMATION])
}

/// All formations, sorted by id.
pub fn all_formations() -> Vec<&'static Formation> {
    let mut all: Vec<&'static Formation> = FORMATIONS.values().collect();
    all.sort_by(|a, b| a.id.cmp(b.id));
    all
}
