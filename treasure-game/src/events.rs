//! Weighted random events, capped per location.
use serde::{Deserialize, Serialize};

use crate::constants::EVENT_HEALTH_FLOOR;
use crate::rng::RandomSource;
use crate::session::Rejection;
use crate::state::{GameState, Location};

const fn default_weight() -> u32 {
    1
}

/// One row of an event table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub damage: u32,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// The temple table and the table shared by every other location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventTables {
    #[serde(default)]
    pub temple: Vec<EventEntry>,
    #[serde(default)]
    pub common: Vec<EventEntry>,
}

impl EventTables {
    #[must_use]
    pub fn table_for(&self, location: Location) -> &[EventEntry] {
        match location {
            Location::Temple => &self.temple,
            Location::Panorama => &[],
            Location::Library | Location::River | Location::Store => &self.common,
        }
    }
}

/// Pick an entry for a uniform `roll` in `[0, 1)`.
///
/// The roll is scaled to `[0, total_weight)` and entries are walked in order,
/// subtracting each weight; the first entry that brings the remainder to zero
/// or below wins. Returns `None` for an empty or weightless table.
#[must_use]
pub fn select_weighted(entries: &[EventEntry], roll: f64) -> Option<&EventEntry> {
    let total_weight: u64 = entries.iter().map(|entry| u64::from(entry.weight)).sum();
    if total_weight == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let mut remaining = roll.clamp(0.0, 1.0) * total_weight as f64;
    for entry in entries {
        remaining -= f64::from(entry.weight);
        if remaining <= 0.0 {
            return Some(entry);
        }
    }
    entries.first()
}

/// What a triggered event did to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub event_id: String,
    pub gold: u32,
    /// Item newly added to the inventory; `None` when nothing dropped or it was already held.
    pub item_granted: Option<String>,
    pub damage: u32,
    pub remaining_uses: u8,
    /// Game-log lines describing the outcome, in order.
    pub lines: Vec<String>,
}

/// Fire a random event at the player's current location.
///
/// # Errors
///
/// Rejects locations without an event table and locations whose usage cap is
/// reached; counters are untouched in both cases.
pub fn trigger<R: RandomSource + ?Sized>(
    state: &mut GameState,
    tables: &EventTables,
    rng: &mut R,
) -> Result<EventOutcome, Rejection> {
    let location = state.current_location;
    let table = tables.table_for(location);
    if !location.has_random_events() || table.is_empty() {
        return Err(Rejection::NoEventsHere);
    }
    if state.location_visit_counters.remaining(location) == 0 {
        return Err(Rejection::EventsExhausted);
    }

    let roll = rng.unit();
    let Some(event) = select_weighted(table, roll) else {
        return Err(Rejection::NoEventsHere);
    };
    let remaining_uses = state
        .location_visit_counters
        .consume(location)
        .unwrap_or_default();
    log::debug!("random event at {location}: roll {roll:.4} -> {}", event.id);

    let mut lines = vec![event.text.clone()];
    if event.gold > 0 {
        state.player_stats.gold = state.player_stats.gold.saturating_add(event.gold);
        lines.push(format!("获得 {} 金币！", event.gold));
    }
    let item_granted = event.item.as_ref().and_then(|item| {
        state.inventory.add(item).then(|| {
            lines.push(format!("获得物品：{item}"));
            item.clone()
        })
    });
    if event.damage > 0 {
        state
            .player_stats
            .take_damage(event.damage, EVENT_HEALTH_FLOOR);
        lines.push(format!("受到 {} 点伤害！", event.damage));
    }
    lines.push(format!("该区域剩余随机事件次数：{remaining_uses}"));

    Ok(EventOutcome {
        event_id: event.id.clone(),
        gold: event.gold,
        item_granted,
        damage: event.damage,
        remaining_uses,
        lines,
    })
}
