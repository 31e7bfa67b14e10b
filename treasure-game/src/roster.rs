//! Player profiles and the completed-game history.
//!
//! The roster outlives any single active game: resetting or losing a game never
//! touches it, and it is persisted under its own keys.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PLAYER_NAME, KEY_CURRENT_USER, KEY_HISTORY, KEY_NEXT_USER_ID, KEY_USERS,
    RECENT_GAMES_LIMIT,
};
use crate::persistence::{PersistenceGateway, read_json};
use crate::session::Rejection;
use crate::state::PlayerStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub total_gold: u64,
    #[serde(default)]
    pub games_completed: u32,
    #[serde(default)]
    pub best_score: u32,
    pub created_at: DateTime<Utc>,
}

/// Written once per completed game and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistoryRecord {
    pub id: u64,
    pub player_name: String,
    pub user_id: Option<u64>,
    pub gold: u32,
    pub level: u32,
    pub score: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    users: Vec<UserProfile>,
    history: Vec<GameHistoryRecord>,
    current_user: Option<UserProfile>,
    /// Id handed to the next registration. Only ever grows.
    next_user_id: u64,
}

impl Roster {
    /// Read users, history and the current user; anything missing or corrupt starts empty.
    pub fn load<G: PersistenceGateway + ?Sized>(gateway: &G) -> Self {
        let users: Vec<UserProfile> = read_json(gateway, KEY_USERS).unwrap_or_default();
        let history: Vec<GameHistoryRecord> = read_json(gateway, KEY_HISTORY).unwrap_or_default();
        let current_user = read_json::<Option<UserProfile>, _>(gateway, KEY_CURRENT_USER)
            .flatten()
            .and_then(|current| users.iter().find(|user| user.id == current.id).cloned());
        // Older stores never wrote the counter; ids already seen must stay retired.
        let seen = users
            .iter()
            .map(|user| user.id)
            .chain(history.iter().filter_map(|record| record.user_id))
            .max()
            .unwrap_or(0);
        let stored = read_json::<u64, _>(gateway, KEY_NEXT_USER_ID).unwrap_or(0);
        Self {
            users,
            history,
            current_user,
            next_user_id: stored.max(seen + 1),
        }
    }

    #[must_use]
    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    #[must_use]
    pub fn history(&self) -> &[GameHistoryRecord] {
        &self.history
    }

    #[must_use]
    pub const fn current_user(&self) -> Option<&UserProfile> {
        self.current_user.as_ref()
    }

    #[must_use]
    pub fn current_user_id(&self) -> Option<u64> {
        self.current_user.as_ref().map(|user| user.id)
    }

    /// Id the next registration will receive.
    #[must_use]
    pub const fn next_user_id(&self) -> u64 {
        if self.next_user_id == 0 { 1 } else { self.next_user_id }
    }

    #[must_use]
    pub fn find(&self, id: u64) -> Option<&UserProfile> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Create a profile with a never-before-used id.
    ///
    /// # Errors
    ///
    /// Rejects names that are empty after trimming.
    pub fn register(&mut self, name: &str, now: DateTime<Utc>) -> Result<UserProfile, Rejection> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Rejection::BlankName);
        }
        let id = self.next_user_id();
        self.next_user_id = id + 1;
        let profile = UserProfile {
            id,
            name: name.to_string(),
            total_gold: 0,
            games_completed: 0,
            best_score: 0,
            created_at: now,
        };
        self.users.push(profile.clone());
        log::info!("registered user {id} ({name})");
        Ok(profile)
    }

    /// Make `id` the active user.
    ///
    /// # Errors
    ///
    /// Rejects ids with no profile.
    pub fn select(&mut self, id: u64) -> Result<&UserProfile, Rejection> {
        let profile = self.find(id).cloned().ok_or(Rejection::UnknownUser(id))?;
        Ok(self.current_user.insert(profile))
    }

    /// Delete a profile, returning whether it was the active user.
    ///
    /// # Errors
    ///
    /// Rejects ids with no profile.
    pub fn remove(&mut self, id: u64) -> Result<bool, Rejection> {
        let before = self.users.len();
        self.users.retain(|user| user.id != id);
        if self.users.len() == before {
            return Err(Rejection::UnknownUser(id));
        }
        let was_current = self.current_user_id() == Some(id);
        if was_current {
            self.current_user = None;
        }
        log::info!("removed user {id}");
        Ok(was_current)
    }

    /// Credit a finished game to the active user (if any) and append its history record.
    pub fn record_completion(
        &mut self,
        stats: &PlayerStats,
        score: u32,
        now: DateTime<Utc>,
    ) -> GameHistoryRecord {
        let current_id = self.current_user_id();
        if let Some(user) = current_id.and_then(|id| self.users.iter_mut().find(|user| user.id == id))
        {
            user.total_gold = user.total_gold.saturating_add(u64::from(stats.gold));
            user.games_completed = user.games_completed.saturating_add(1);
            user.best_score = user.best_score.max(score);
            self.current_user = Some(user.clone());
        }

        let record = GameHistoryRecord {
            id: self.history.iter().map(|record| record.id).max().unwrap_or(0) + 1,
            player_name: self
                .current_user
                .as_ref()
                .map_or_else(|| DEFAULT_PLAYER_NAME.to_string(), |user| user.name.clone()),
            user_id: current_id,
            gold: stats.gold,
            level: stats.level,
            score,
            completed_at: now,
        };
        self.history.push(record.clone());
        record
    }

    /// Users ordered by best score, highest first.
    #[must_use]
    pub fn leaderboard(&self) -> Vec<&UserProfile> {
        let mut ranked: Vec<&UserProfile> = self.users.iter().collect();
        ranked.sort_by(|a, b| b.best_score.cmp(&a.best_score));
        ranked
    }

    /// The most recently completed games, newest first.
    #[must_use]
    pub fn recent_games(&self) -> Vec<&GameHistoryRecord> {
        let mut recent: Vec<&GameHistoryRecord> = self.history.iter().collect();
        recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        recent.truncate(RECENT_GAMES_LIMIT);
        recent
    }
}
