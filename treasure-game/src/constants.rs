//! Centralized balance and tuning constants for the treasure hunt engine.
//!
//! These values define the deterministic math for the core rules. Content
//! (shop offers, enemies, event tables) lives in JSON assets; the numbers that
//! decide how that content behaves stay here, reviewed in version control.

use std::time::Duration;

// Storage keys -------------------------------------------------------------
pub(crate) const KEY_SAVE_PREFIX: &str = "save:";
pub(crate) const KEY_SAVE_CURRENT: &str = "save:current";
pub(crate) const KEY_USERS: &str = "users";
pub(crate) const KEY_HISTORY: &str = "history";
pub(crate) const KEY_CURRENT_USER: &str = "currentUser";
pub(crate) const KEY_NEXT_USER_ID: &str = "nextUserId";

// Named items --------------------------------------------------------------
pub const ITEM_CLUE: &str = "古老线索";
pub const ITEM_POTION: &str = "治疗药水";
pub const ITEM_TREASURE: &str = "传说中的宝藏";
pub(crate) const DEFAULT_PLAYER_NAME: &str = "冒险者";

// Starting stats -----------------------------------------------------------
pub(crate) const START_HEALTH: u32 = 100;
pub(crate) const START_ATTACK: u32 = 15;
pub(crate) const START_DEFENSE: u32 = 8;
pub(crate) const START_GOLD: u32 = 50;

// Progression --------------------------------------------------------------
pub(crate) const EXP_PER_LEVEL: u32 = 100;
pub(crate) const LEVEL_BONUS_MAX_HEALTH: u32 = 20;
pub(crate) const LEVEL_BONUS_ATTACK: u32 = 3;
pub(crate) const LEVEL_BONUS_DEFENSE: u32 = 2;
pub(crate) const SCORE_PER_LEVEL: u32 = 50;

// Random events ------------------------------------------------------------
pub const RANDOM_EVENT_CAP: u8 = 5;
pub(crate) const EVENT_HEALTH_FLOOR: u32 = 1;

// Battle -------------------------------------------------------------------
pub(crate) const POTION_HEAL: u32 = 40;
pub(crate) const FLEE_CHANCE: f64 = 0.6;
pub(crate) const MIN_DAMAGE: u32 = 1;

// Exploration --------------------------------------------------------------
pub(crate) const BOAT_FIND_CHANCE: f64 = 0.8;
pub(crate) const BOX_FIND_CHANCE: f64 = 0.6;
pub(crate) const TREASURE_GOLD: u32 = 300;
pub(crate) const GUARD_ENEMY_ID: &str = "temple_guard";
pub(crate) const TRAP_ENEMY_ID: &str = "trap_monster";

// Narrative delays ---------------------------------------------------------
pub(crate) const DELAY_SEARCH_CLUE: Duration = Duration::from_millis(1_000);
pub(crate) const DELAY_DECODE: Duration = Duration::from_millis(1_500);
pub(crate) const DELAY_FIND_BOAT: Duration = Duration::from_millis(1_000);
pub(crate) const DELAY_CROSS_RIVER: Duration = Duration::from_millis(1_200);
pub(crate) const DELAY_SEARCH_TEMPLE: Duration = Duration::from_millis(1_500);
pub(crate) const DELAY_GUARD_APPEARS: Duration = Duration::from_millis(800);
pub(crate) const DELAY_BATTLE_START: Duration = Duration::from_millis(500);
pub(crate) const DELAY_OPEN_BOX: Duration = Duration::from_millis(1_500);
pub(crate) const DELAY_RANDOM_EVENT: Duration = Duration::from_millis(800);
pub(crate) const DELAY_COUNTER_ATTACK: Duration = Duration::from_millis(500);
pub(crate) const DELAY_DEFEAT_RESET: Duration = Duration::from_millis(1_000);

// Log limits ---------------------------------------------------------------
pub(crate) const RECENT_GAMES_LIMIT: usize = 10;
