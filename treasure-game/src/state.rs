//! The persisted game snapshot and the value types it is built from.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::battle::BattleSession;
use crate::constants::{
    RANDOM_EVENT_CAP, START_ATTACK, START_DEFENSE, START_GOLD, START_HEALTH,
};
use crate::data::catalog;
use crate::store::ShopOffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Panorama,
    Library,
    River,
    Store,
    Temple,
}

impl Location {
    pub const ALL: [Self; 5] = [
        Self::Panorama,
        Self::Library,
        Self::River,
        Self::Store,
        Self::Temple,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Panorama => "panorama",
            Self::Library => "library",
            Self::River => "river",
            Self::Store => "store",
            Self::Temple => "temple",
        }
    }

    /// Display name used in game log lines.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Panorama => "全景视图",
            Self::Library => "图书馆",
            Self::River => "河边",
            Self::Store => "商店",
            Self::Temple => "古庙",
        }
    }

    /// Whether this location keeps a random-event counter.
    #[must_use]
    pub const fn has_random_events(self) -> bool {
        !matches!(self, Self::Panorama)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "panorama" => Ok(Self::Panorama),
            "library" => Ok(Self::Library),
            "river" => Ok(Self::River),
            "store" => Ok(Self::Store),
            "temple" => Ok(Self::Temple),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub defense: u32,
    pub gold: u32,
    pub experience: u32,
    pub level: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: START_HEALTH,
            max_health: START_HEALTH,
            attack: START_ATTACK,
            defense: START_DEFENSE,
            gold: START_GOLD,
            experience: 0,
            level: 1,
        }
    }
}

impl PlayerStats {
    /// Restore `0 <= health <= max_health` and `level >= 1`.
    pub fn clamp(&mut self) {
        self.level = self.level.max(1);
        self.health = self.health.min(self.max_health);
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    /// Apply damage, never dropping below `floor`.
    pub fn take_damage(&mut self, amount: u32, floor: u32) {
        self.health = self.health.saturating_sub(amount).max(floor);
    }
}

/// Held items. Names are unique: granting an item already held is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Inventory(Vec<String>);

impl Inventory {
    /// Add an item, returning `false` when it was already held.
    pub fn add(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.0.push(name.to_string());
        true
    }

    /// Remove an item, returning `false` when it was not held.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|held| held != name);
        self.0.len() != before
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|held| held == name)
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop duplicate names that may come from hand-edited saves.
    fn dedup(&mut self) {
        let mut seen = Vec::with_capacity(self.0.len());
        self.0.retain(|name| {
            if seen.contains(name) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
    }
}

/// Per-location random-event usage. Counters only grow and stop at the cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitCounters(BTreeMap<Location, u8>);

impl Default for VisitCounters {
    fn default() -> Self {
        Self(
            Location::ALL
                .into_iter()
                .filter(|location| location.has_random_events())
                .map(|location| (location, 0))
                .collect(),
        )
    }
}

impl VisitCounters {
    #[must_use]
    pub fn used(&self, location: Location) -> u8 {
        self.0.get(&location).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn remaining(&self, location: Location) -> u8 {
        if !location.has_random_events() {
            return 0;
        }
        RANDOM_EVENT_CAP.saturating_sub(self.used(location))
    }

    /// Consume one use, returning the uses left, or `None` when exhausted.
    pub fn consume(&mut self, location: Location) -> Option<u8> {
        if self.remaining(location) == 0 {
            return None;
        }
        let counter = self.0.entry(location).or_insert(0);
        *counter += 1;
        Some(RANDOM_EVENT_CAP - *counter)
    }

    fn clamp(&mut self) {
        for counter in self.0.values_mut() {
            *counter = (*counter).min(RANDOM_EVENT_CAP);
        }
        for location in Location::ALL {
            if location.has_random_events() {
                self.0.entry(location).or_insert(0);
            }
        }
    }
}

/// The active game: everything a save slot holds, plus the live battle.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub current_location: Location,
    pub inventory: Inventory,
    pub logs: Vec<String>,
    pub clue_found: bool,
    pub decoded: bool,
    pub has_boat: bool,
    pub found_box: bool,
    #[serde(alias = "templeGuardDefeated")]
    pub guard_defeated: bool,
    pub treasure_found: bool,
    pub player_stats: PlayerStats,
    /// Empty when a save omits it; the store refills it from its catalog.
    #[serde(default)]
    pub shop_offers: Vec<ShopOffer>,
    #[serde(alias = "randomEventCounts")]
    pub location_visit_counters: VisitCounters,
    #[serde(skip)]
    pub battle: Option<BattleSession>,
    #[serde(skip)]
    pub game_over: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_location: Location::Panorama,
            inventory: Inventory::default(),
            logs: Vec::new(),
            clue_found: false,
            decoded: false,
            has_boat: false,
            found_box: false,
            guard_defeated: false,
            treasure_found: false,
            player_stats: PlayerStats::default(),
            shop_offers: catalog().shop.offers.clone(),
            location_visit_counters: VisitCounters::default(),
            battle: None,
            game_over: false,
        }
    }
}

impl GameState {
    #[must_use]
    pub const fn in_battle(&self) -> bool {
        self.battle.is_some()
    }

    /// Repair invariants after loading a snapshot from storage.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.player_stats.clamp();
        self.inventory.dedup();
        self.location_visit_counters.clamp();
        self.battle = None;
        self.game_over = false;
        self
    }

    /// Score credited when the treasure is found.
    #[must_use]
    pub fn score(&self) -> u32 {
        crate::progression::score(&self.player_stats)
    }
}
