//! Treasure Hunt Game Engine
//!
//! Platform-agnostic core game logic for the treasure hunt adventure.
//! This crate provides all game rules without UI, audio or platform-specific
//! dependencies: callers construct a [`StateStore`] with a persistence gateway,
//! a random source and a clock, then feed it [`Intent`]s.

pub mod battle;
pub mod clock;
pub mod constants;
pub mod data;
pub mod events;
pub mod intent;
pub mod locations;
pub mod persistence;
pub mod progression;
pub mod rng;
pub mod roster;
pub mod session;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use battle::{BattleOutcome, BattleSession, Enemy, EnemyTemplate, Turn, Victory, damage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use data::{EnemyData, GameCatalog, ShopData, catalog};
pub use events::{EventEntry, EventOutcome, EventTables, select_weighted};
pub use intent::Intent;
pub use locations::{MenuEntry, can_enter, check_action, check_move, menu, neighbors};
pub use persistence::{FileGateway, MemoryGateway, PersistenceError, PersistenceGateway};
pub use progression::{exp_to_next, grant_experience, score};
pub use rng::{CountingRng, RandomSource, ScriptedRolls, SeededRng};
pub use roster::{GameHistoryRecord, Roster, UserProfile};
pub use session::{DispatchOutcome, DispatchState, Rejection, StateStore};
pub use state::{GameState, Inventory, Location, PlayerStats, VisitCounters};
pub use store::{OfferCategory, Receipt, ShopOffer, purchase};
