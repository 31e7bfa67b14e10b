use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use treasure_game::constants::ITEM_POTION;
use treasure_game::locations::home_of;
use treasure_game::{GameState, Intent, Location, MenuEntry, OfferCategory, can_enter};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub intent: Intent,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(intent: Intent, rationale: impl Into<Option<String>>) -> Self {
        Self {
            intent,
            rationale: rationale.into(),
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select one of the enabled menu entries. `options` is never empty.
    fn pick(&mut self, state: &GameState, options: &[MenuEntry]) -> PolicyDecision;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    /// Walks the shortest route to the treasure.
    Explorer,
    /// Gears up and drains random events before entering the temple.
    Grinder,
    /// Only triggers random events, visiting every location until the caps run out.
    EventHunter,
    /// Presses any enabled button.
    Reckless,
}

impl GameplayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Explorer => "Explorer",
            GameplayStrategy::Grinder => "Grinder",
            GameplayStrategy::EventHunter => "Event Hunter",
            GameplayStrategy::Reckless => "Reckless",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            GameplayStrategy::Explorer => Box::new(ExplorerPolicy),
            GameplayStrategy::Grinder => Box::new(GrinderPolicy),
            GameplayStrategy::EventHunter => Box::new(EventHunterPolicy),
            GameplayStrategy::Reckless => Box::new(RecklessPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct ExplorerPolicy;
struct GrinderPolicy;
struct EventHunterPolicy;

struct RecklessPolicy {
    rng: ChaCha20Rng,
}

impl RecklessPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for ExplorerPolicy {
    fn name(&self) -> &'static str {
        "Explorer"
    }

    fn pick(&mut self, state: &GameState, options: &[MenuEntry]) -> PolicyDecision {
        if state.in_battle() {
            return fight(state, options);
        }
        match objective(state) {
            Some(goal) => head_for(state, options, &goal),
            None => fallback(options, "treasure claimed"),
        }
    }
}

impl PlayerPolicy for GrinderPolicy {
    fn name(&self) -> &'static str {
        "Grinder"
    }

    fn pick(&mut self, state: &GameState, options: &[MenuEntry]) -> PolicyDecision {
        if state.in_battle() {
            return fight(state, options);
        }
        let Some(goal) = objective(state) else {
            return fallback(options, "treasure claimed");
        };

        if let Some(offer) = best_affordable_offer(state) {
            let buy = Intent::BuyItem { offer_id: offer };
            if let Some(decision) = choose(options, &buy, "gear up") {
                return decision;
            }
            if state.current_location != Location::Temple {
                return head_for(state, options, &buy);
            }
        }

        let healthy = state.player_stats.health * 5 >= state.player_stats.max_health * 3;
        if healthy
            && !state.found_box
            && let Some(decision) = choose(options, &Intent::TriggerRandomEvent, "farm events")
        {
            return decision;
        }
        head_for(state, options, &goal)
    }
}

impl PlayerPolicy for EventHunterPolicy {
    fn name(&self) -> &'static str {
        "Event Hunter"
    }

    fn pick(&mut self, state: &GameState, options: &[MenuEntry]) -> PolicyDecision {
        if state.in_battle() {
            return fight(state, options);
        }
        if let Some(decision) = choose(options, &Intent::TriggerRandomEvent, "event available") {
            return decision;
        }
        let unexplored = Location::ALL.into_iter().find(|location| {
            location.has_random_events()
                && can_enter(*location, state)
                && state.location_visit_counters.remaining(*location) > 0
        });
        match unexplored {
            Some(target) => travel(state, options, target),
            None => fallback(options, "every cap exhausted"),
        }
    }
}

impl PlayerPolicy for RecklessPolicy {
    fn name(&self) -> &'static str {
        "Reckless"
    }

    fn pick(&mut self, _state: &GameState, options: &[MenuEntry]) -> PolicyDecision {
        let idx = self.rng.gen_range(0..options.len());
        PolicyDecision::new(options[idx].intent.clone(), format!("roll {idx}"))
    }
}

/// The next story step, `None` once the treasure is claimed.
#[must_use]
pub fn objective(state: &GameState) -> Option<Intent> {
    if state.treasure_found {
        return None;
    }
    let goal = if !state.clue_found {
        Intent::SearchClue
    } else if !state.decoded {
        Intent::DecodeScript
    } else if !state.has_boat {
        Intent::FindBoat
    } else if state.found_box && state.guard_defeated {
        Intent::OpenBox
    } else {
        Intent::SearchTemple
    };
    Some(goal)
}

fn fight(state: &GameState, options: &[MenuEntry]) -> PolicyDecision {
    let stats = &state.player_stats;
    let wounded = stats.health * 100 < stats.max_health * 35;
    if wounded {
        if state.inventory.contains(ITEM_POTION)
            && let Some(decision) = choose(options, &Intent::UsePotion, "low health")
        {
            return decision;
        }
        if let Some(decision) = choose(options, &Intent::Flee, "low health, no potion") {
            return decision;
        }
    }
    choose(options, &Intent::Attack, "press the attack")
        .unwrap_or_else(|| fallback(options, "attack unavailable"))
}

/// Use `goal` here when possible, otherwise walk toward its location.
fn head_for(state: &GameState, options: &[MenuEntry], goal: &Intent) -> PolicyDecision {
    if let Some(decision) = choose(options, goal, "objective") {
        return decision;
    }
    match home_of(goal) {
        Some(target) if target != state.current_location => travel(state, options, target),
        _ => fallback(options, &format!("{} blocked", goal.name())),
    }
}

fn travel(state: &GameState, options: &[MenuEntry], target: Location) -> PolicyDecision {
    if target == Location::Temple
        && let Some(decision) = choose(options, &Intent::CrossRiver, "shortcut to temple")
    {
        return decision;
    }
    let direct = Intent::Navigate { location: target };
    if let Some(decision) = choose(options, &direct, &format!("toward {target}")) {
        return decision;
    }
    if state.current_location != Location::Panorama {
        let hub = Intent::Navigate {
            location: Location::Panorama,
        };
        if let Some(decision) = choose(options, &hub, &format!("via panorama to {target}")) {
            return decision;
        }
    }
    fallback(options, &format!("no route to {target}"))
}

fn choose(options: &[MenuEntry], intent: &Intent, why: &str) -> Option<PolicyDecision> {
    options
        .iter()
        .find(|entry| entry.enabled && entry.intent == *intent)
        .map(|entry| PolicyDecision::new(entry.intent.clone(), why.to_string()))
}

fn fallback(options: &[MenuEntry], why: &str) -> PolicyDecision {
    let entry = options
        .iter()
        .find(|entry| entry.enabled && entry.intent != Intent::ResetGame)
        .unwrap_or(&options[0]);
    PolicyDecision::new(entry.intent.clone(), format!("fallback: {why}"))
}

/// Priciest unbought weapon or armor the player can pay for, then a potion if none is held.
fn best_affordable_offer(state: &GameState) -> Option<String> {
    let gold = state.player_stats.gold;
    let gear = state
        .shop_offers
        .iter()
        .filter(|offer| offer.category != OfferCategory::Consumable)
        .filter(|offer| !offer.bought && offer.price <= gold)
        .max_by_key(|offer| offer.price);
    if let Some(offer) = gear {
        return Some(offer.id.clone());
    }
    state
        .shop_offers
        .iter()
        .find(|offer| offer.category == OfferCategory::Consumable && offer.price <= gold)
        .filter(|_| !state.inventory.contains(ITEM_POTION))
        .map(|offer| offer.id.clone())
}
