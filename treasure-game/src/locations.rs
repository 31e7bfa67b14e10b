//! Location graph, travel gates and per-location action guards.
//!
//! Every location connects back to the panorama. The temple is the only gated
//! destination: it opens once the script is decoded and a boat is available,
//! whether approached from the panorama or by crossing the river.
use crate::intent::Intent;
use crate::session::Rejection;
use crate::state::{GameState, Location};

/// Whether the player may enter `target` given current progress.
#[must_use]
pub const fn can_enter(target: Location, state: &GameState) -> bool {
    match target {
        Location::Temple => state.decoded && state.has_boat,
        Location::Panorama | Location::Library | Location::River | Location::Store => true,
    }
}

/// Locations directly reachable from `from` by `navigate`, gates ignored.
#[must_use]
pub fn neighbors(from: Location) -> Vec<Location> {
    match from {
        Location::Panorama => Location::ALL
            .into_iter()
            .filter(|location| *location != Location::Panorama)
            .collect(),
        Location::Library | Location::River | Location::Store | Location::Temple => {
            vec![Location::Panorama]
        }
    }
}

/// Validate a `navigate` from the current location to `target`.
///
/// # Errors
///
/// Rejects staying in place, non-adjacent moves, and a locked temple.
pub fn check_move(state: &GameState, target: Location) -> Result<(), Rejection> {
    let from = state.current_location;
    if from == target {
        return Err(Rejection::AlreadyThere(target));
    }
    if !neighbors(from).contains(&target) {
        return Err(Rejection::NotAdjacent { from, to: target });
    }
    if !can_enter(target, state) {
        return Err(Rejection::TempleLocked);
    }
    Ok(())
}

/// The location whose menu hosts `intent`, if it is location-bound to one place.
#[must_use]
pub const fn home_of(intent: &Intent) -> Option<Location> {
    match intent {
        Intent::SearchClue | Intent::DecodeScript => Some(Location::Library),
        Intent::FindBoat | Intent::CrossRiver => Some(Location::River),
        Intent::BuyItem { .. } => Some(Location::Store),
        Intent::SearchTemple | Intent::OpenBox => Some(Location::Temple),
        Intent::Navigate { .. }
        | Intent::TriggerRandomEvent
        | Intent::Attack
        | Intent::UsePotion
        | Intent::Flee
        | Intent::ResetGame => None,
    }
}

/// Evaluate the guard for an exploration intent against current state.
///
/// Battle intents, navigation and reset are validated elsewhere and pass here.
///
/// # Errors
///
/// Returns the [`Rejection`] describing the first guard that fails.
pub fn check_action(state: &GameState, intent: &Intent) -> Result<(), Rejection> {
    if let Some(home) = home_of(intent)
        && home != state.current_location
    {
        return Err(Rejection::WrongLocation {
            action: intent.label(),
            location: home,
        });
    }

    match intent {
        Intent::SearchClue if state.clue_found => Err(Rejection::ClueAlreadyFound),
        Intent::DecodeScript if !state.clue_found => Err(Rejection::NoClue),
        Intent::DecodeScript if state.decoded => Err(Rejection::AlreadyDecoded),
        Intent::FindBoat if state.has_boat => Err(Rejection::AlreadyHasBoat),
        Intent::CrossRiver if !state.has_boat => Err(Rejection::NoBoat),
        Intent::CrossRiver if !can_enter(Location::Temple, state) => {
            Err(Rejection::TempleLocked)
        }
        Intent::SearchTemple if state.found_box && state.guard_defeated => {
            Err(Rejection::TempleExplored)
        }
        Intent::OpenBox if !state.found_box => Err(Rejection::BoxNotFound),
        Intent::OpenBox if !state.guard_defeated => Err(Rejection::GuardAlive),
        Intent::OpenBox if state.treasure_found => Err(Rejection::TreasureClaimed),
        Intent::TriggerRandomEvent if !state.current_location.has_random_events() => {
            Err(Rejection::NoEventsHere)
        }
        Intent::TriggerRandomEvent
            if state
                .location_visit_counters
                .remaining(state.current_location)
                == 0 =>
        {
            Err(Rejection::EventsExhausted)
        }
        _ => Ok(()),
    }
}

/// One button of a location menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub intent: Intent,
    pub label: String,
    pub enabled: bool,
}

impl MenuEntry {
    fn new(intent: Intent, label: String, enabled: bool) -> Self {
        Self {
            intent,
            label,
            enabled,
        }
    }

    fn guarded(state: &GameState, intent: Intent, label: String) -> Self {
        let enabled = check_action(state, &intent).is_ok();
        Self::new(intent, label, enabled)
    }
}

/// The fixed action menu of `location`, each entry flagged with its guard result.
///
/// The menu only describes the location itself; battle actions are listed by
/// the store while a battle is active.
#[must_use]
pub fn menu(location: Location, state: &GameState) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    match location {
        Location::Panorama => {}
        Location::Library => {
            entries.push(MenuEntry::guarded(state, Intent::SearchClue, "🔍 寻找线索".into()));
            entries.push(MenuEntry::guarded(state, Intent::DecodeScript, "📜 解密古文".into()));
        }
        Location::River => {
            entries.push(MenuEntry::guarded(state, Intent::FindBoat, "⛵ 寻找小船".into()));
            entries.push(MenuEntry::guarded(state, Intent::CrossRiver, "🚣 渡河前往古庙".into()));
        }
        Location::Store => {
            for offer in &state.shop_offers {
                let intent = Intent::BuyItem {
                    offer_id: offer.id.clone(),
                };
                let label = format!("{} ({} 金币)", offer.name, offer.price);
                let enabled = check_action(state, &intent).is_ok()
                    && offer.is_available()
                    && state.player_stats.gold >= offer.price;
                entries.push(MenuEntry::new(intent, label, enabled));
            }
        }
        Location::Temple => {
            entries.push(MenuEntry::guarded(state, Intent::SearchTemple, "🔦 搜索神庙".into()));
            entries.push(MenuEntry::guarded(state, Intent::OpenBox, "📦 打开宝箱".into()));
        }
    }

    if location.has_random_events() {
        let remaining = state.location_visit_counters.remaining(location);
        entries.push(MenuEntry::guarded(
            state,
            Intent::TriggerRandomEvent,
            format!("🎲 触发随机事件 (剩余: {remaining})"),
        ));
    }

    for target in neighbors(location) {
        let intent = Intent::Navigate { location: target };
        let label = format!("前往{}", target.display_name());
        let enabled = state.current_location == location && check_move(state, target).is_ok();
        entries.push(MenuEntry::new(intent, label, enabled));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(location: Location) -> GameState {
        GameState {
            current_location: location,
            ..GameState::default()
        }
    }

    #[test]
    fn temple_needs_decoding_and_boat() {
        let mut state = at(Location::Panorama);
        assert!(!can_enter(Location::Temple, &state));
        state.decoded = true;
        assert!(!can_enter(Location::Temple, &state));
        state.has_boat = true;
        assert!(can_enter(Location::Temple, &state));
        assert!(can_enter(Location::Library, &state));
    }

    #[test]
    fn moves_follow_panorama_edges() {
        let state = at(Location::Library);
        assert_eq!(check_move(&state, Location::Panorama), Ok(()));
        assert_eq!(
            check_move(&state, Location::River),
            Err(Rejection::NotAdjacent {
                from: Location::Library,
                to: Location::River
            })
        );
        assert_eq!(
            check_move(&state, Location::Library),
            Err(Rejection::AlreadyThere(Location::Library))
        );
        let panorama = at(Location::Panorama);
        assert_eq!(
            check_move(&panorama, Location::Temple),
            Err(Rejection::TempleLocked)
        );
    }

    #[test]
    fn library_guards() {
        let mut state = at(Location::Library);
        assert_eq!(check_action(&state, &Intent::SearchClue), Ok(()));
        assert_eq!(check_action(&state, &Intent::DecodeScript), Err(Rejection::NoClue));
        state.clue_found = true;
        assert_eq!(
            check_action(&state, &Intent::SearchClue),
            Err(Rejection::ClueAlreadyFound)
        );
        assert_eq!(check_action(&state, &Intent::DecodeScript), Ok(()));
        state.decoded = true;
        assert_eq!(
            check_action(&state, &Intent::DecodeScript),
            Err(Rejection::AlreadyDecoded)
        );
    }

    #[test]
    fn actions_are_bound_to_their_location() {
        let state = at(Location::River);
        assert_eq!(
            check_action(&state, &Intent::SearchClue),
            Err(Rejection::WrongLocation {
                action: "寻找线索",
                location: Location::Library
            })
        );
        assert_eq!(check_action(&state, &Intent::CrossRiver), Err(Rejection::NoBoat));
    }

    #[test]
    fn open_box_requires_box_and_defeated_guard() {
        let mut state = at(Location::Temple);
        assert_eq!(check_action(&state, &Intent::OpenBox), Err(Rejection::BoxNotFound));
        state.found_box = true;
        assert_eq!(check_action(&state, &Intent::OpenBox), Err(Rejection::GuardAlive));
        state.guard_defeated = true;
        assert_eq!(check_action(&state, &Intent::OpenBox), Ok(()));
        assert_eq!(
            check_action(&state, &Intent::SearchTemple),
            Err(Rejection::TempleExplored)
        );
        state.treasure_found = true;
        assert_eq!(
            check_action(&state, &Intent::OpenBox),
            Err(Rejection::TreasureClaimed)
        );
    }

    #[test]
    fn random_events_need_a_counter_with_uses_left() {
        let state = at(Location::Panorama);
        assert_eq!(
            check_action(&state, &Intent::TriggerRandomEvent),
            Err(Rejection::NoEventsHere)
        );
        let mut store = at(Location::Store);
        for _ in 0..5 {
            store.location_visit_counters.consume(Location::Store);
        }
        assert_eq!(
            check_action(&store, &Intent::TriggerRandomEvent),
            Err(Rejection::EventsExhausted)
        );
    }

    #[test]
    fn menus_flag_disabled_entries() {
        let state = at(Location::Library);
        let entries = menu(Location::Library, &state);
        let enabled: Vec<_> = entries
            .iter()
            .map(|entry| (entry.intent.clone(), entry.enabled))
            .collect();
        assert_eq!(
            enabled,
            vec![
                (Intent::SearchClue, true),
                (Intent::DecodeScript, false),
                (Intent::TriggerRandomEvent, true),
                (
                    Intent::Navigate {
                        location: Location::Panorama
                    },
                    true
                ),
            ]
        );

        let store = at(Location::Store);
        let affordable = menu(Location::Store, &store)
            .into_iter()
            .filter(|entry| entry.enabled && matches!(entry.intent, Intent::BuyItem { .. }))
            .count();
        // 50 starting gold only covers the potion.
        assert_eq!(affordable, 1);
    }

    #[test]
    fn panorama_menu_locks_temple() {
        let state = at(Location::Panorama);
        let temple = menu(Location::Panorama, &state)
            .into_iter()
            .find(|entry| {
                entry.intent
                    == Intent::Navigate {
                        location: Location::Temple,
                    }
            })
            .expect("temple entry");
        assert!(!temple.enabled);
    }
}
