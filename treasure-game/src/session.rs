//! The aggregate root: one active game, the roster, and the dispatch state machine.
//!
//! Intents enter through [`StateStore::begin`]. An intent either completes
//! immediately or leaves the store `Busy` with a queue of scheduled
//! continuations that [`StateStore::resume`] runs one at a time. The final step
//! of every accepted intent persists the snapshot and frees the store.
//! [`StateStore::dispatch`] drives the whole sequence against the injected clock.
use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;

use crate::battle::{self, BattleOutcome, Turn};
use crate::clock::Clock;
use crate::constants::{
    BOAT_FIND_CHANCE, BOX_FIND_CHANCE, DELAY_BATTLE_START, DELAY_COUNTER_ATTACK,
    DELAY_CROSS_RIVER, DELAY_DECODE, DELAY_DEFEAT_RESET, DELAY_FIND_BOAT, DELAY_GUARD_APPEARS,
    DELAY_OPEN_BOX, DELAY_RANDOM_EVENT, DELAY_SEARCH_CLUE, DELAY_SEARCH_TEMPLE, GUARD_ENEMY_ID,
    ITEM_CLUE, ITEM_POTION, ITEM_TREASURE, KEY_CURRENT_USER, KEY_HISTORY, KEY_NEXT_USER_ID,
    KEY_SAVE_CURRENT, KEY_SAVE_PREFIX, KEY_USERS, TRAP_ENEMY_ID, TREASURE_GOLD,
};
use crate::data::{GameCatalog, catalog};
use crate::events;
use crate::intent::Intent;
use crate::locations::{self, MenuEntry};
use crate::persistence::{PersistenceGateway, erase, read_json, write_json};
use crate::rng::RandomSource;
use crate::roster::{GameHistoryRecord, Roster, UserProfile};
use crate::state::{GameState, Location};
use crate::store;

/// Why an intent or roster operation was refused. The message is the game-log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("操作进行中，请稍候...")]
    Busy,
    #[error("没有待处理的操作")]
    NothingPending,
    #[error("已经在战斗中！")]
    InBattle,
    #[error("当前不在战斗中！")]
    NotInBattle,
    #[error("你已经在{}了！", .0.display_name())]
    AlreadyThere(Location),
    #[error("无法从{}直接前往{}！", .from.display_name(), .to.display_name())]
    NotAdjacent { from: Location, to: Location },
    #[error("需要解密古文并找到小船才能前往古庙！")]
    TempleLocked,
    #[error("{action}只能在{}进行！", .location.display_name())]
    WrongLocation {
        action: &'static str,
        location: Location,
    },
    #[error("线索已经找到了！")]
    ClueAlreadyFound,
    #[error("需要先找到线索！")]
    NoClue,
    #[error("古文已经解密了！")]
    AlreadyDecoded,
    #[error("你已经有船了！")]
    AlreadyHasBoat,
    #[error("没有船，无法渡河！")]
    NoBoat,
    #[error("神庙已经探索完毕！")]
    TempleExplored,
    #[error("还没有找到宝箱！")]
    BoxNotFound,
    #[error("必须先击败神庙守卫！")]
    GuardAlive,
    #[error("宝藏已经被你拿走了！")]
    TreasureClaimed,
    #[error("这里没有随机事件！")]
    NoEventsHere,
    #[error("该区域的随机事件已用尽！")]
    EventsExhausted,
    #[error("商店没有这件商品：{0}")]
    UnknownOffer(String),
    #[error("该物品已购买！")]
    AlreadyBought,
    #[error("金币不足！")]
    InsufficientGold,
    #[error("你已经有{0}了！")]
    AlreadyHeld(String),
    #[error("❌ 没有治疗药水！")]
    NoPotion,
    #[error("名字不能为空！")]
    BlankName,
    #[error("找不到用户：{0}")]
    UnknownUser(u64),
}

impl Rejection {
    /// Re-entrancy refusals are silent; everything else is reported in the game log.
    #[must_use]
    pub const fn is_logged(&self) -> bool {
        !matches!(self, Self::Busy | Self::NothingPending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The intent fully applied and the snapshot was persisted.
    Completed,
    /// More work is scheduled; call `resume` after `delay`.
    Suspended { delay: Duration },
    Rejected(Rejection),
}

impl DispatchOutcome {
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Deferred effects queued behind an accepted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    FinishClueSearch,
    FinishDecode,
    FinishBoatSearch,
    FinishCrossing,
    FinishTempleSearch,
    GuardAppears,
    StartBattle(&'static str),
    FinishOpenBox,
    FinishRandomEvent,
    CounterAttack,
    DefeatReset,
}

type Step = (Duration, Continuation);

/// Owns the active game and mediates every mutation of it.
pub struct StateStore<G, R, C>
where
    G: PersistenceGateway,
    R: RandomSource,
    C: Clock,
{
    gateway: G,
    rng: R,
    clock: C,
    catalog: GameCatalog,
    state: GameState,
    roster: Roster,
    dispatch: DispatchState,
    pending: VecDeque<Step>,
}

impl<G, R, C> StateStore<G, R, C>
where
    G: PersistenceGateway,
    R: RandomSource,
    C: Clock,
{
    /// Open the store with the bundled content tables.
    pub fn new(gateway: G, rng: R, clock: C) -> Self {
        Self::with_catalog(gateway, rng, clock, catalog().clone())
    }

    /// Open the store, load the roster and restore the active save (or start fresh).
    pub fn with_catalog(gateway: G, rng: R, clock: C, catalog: GameCatalog) -> Self {
        let roster = Roster::load(&gateway);
        let mut store = Self {
            gateway,
            rng,
            clock,
            catalog,
            state: GameState::default(),
            roster,
            dispatch: DispatchState::Idle,
            pending: VecDeque::new(),
        };
        store.restore_active_game();
        store.persist();
        store
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub const fn dispatch_state(&self) -> DispatchState {
        self.dispatch
    }

    /// Delay before the next scheduled continuation, if any.
    #[must_use]
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.front().map(|(delay, _)| *delay)
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Start handling `intent`.
    pub fn begin(&mut self, intent: Intent) -> DispatchOutcome {
        if self.dispatch == DispatchState::Busy {
            log::debug!("rejected {intent}: busy");
            return DispatchOutcome::Rejected(Rejection::Busy);
        }
        log::debug!("dispatch {intent}");
        match self.apply(&intent) {
            Ok(steps) => {
                self.pending.extend(steps);
                self.settle()
            }
            Err(rejection) => {
                log::debug!("rejected {intent}: {rejection:?}");
                if rejection.is_logged() {
                    self.log(rejection.to_string());
                }
                DispatchOutcome::Rejected(rejection)
            }
        }
    }

    /// Run the next scheduled continuation.
    pub fn resume(&mut self) -> DispatchOutcome {
        let Some((_, continuation)) = self.pending.pop_front() else {
            return DispatchOutcome::Rejected(Rejection::NothingPending);
        };
        log::debug!("resume {continuation:?}");
        let follow_ups = self.run(continuation);
        for step in follow_ups.into_iter().rev() {
            self.pending.push_front(step);
        }
        self.settle()
    }

    /// Apply `intent` to completion, sleeping through every narrative delay.
    pub fn dispatch(&mut self, intent: Intent) -> DispatchOutcome {
        let mut outcome = self.begin(intent);
        while let DispatchOutcome::Suspended { delay } = outcome {
            self.clock.sleep(delay);
            outcome = self.resume();
        }
        outcome
    }

    /// The current menu with each entry's guard evaluated. Nothing is enabled while busy.
    #[must_use]
    pub fn available_actions(&self) -> Vec<MenuEntry> {
        let mut entries = if self.state.in_battle() {
            self.battle_menu()
        } else {
            locations::menu(self.state.current_location, &self.state)
        };
        if self.dispatch == DispatchState::Busy {
            for entry in &mut entries {
                entry.enabled = false;
            }
        }
        entries
    }

    /// Create a profile. The active game is untouched.
    ///
    /// # Errors
    ///
    /// Rejects blank names and calls made while an intent is in flight.
    pub fn register_user(&mut self, name: &str) -> Result<UserProfile, Rejection> {
        self.ensure_idle()?;
        let profile = self.roster.register(name, self.clock.now())?;
        write_json(&self.gateway, KEY_USERS, self.roster.users());
        write_json(&self.gateway, KEY_NEXT_USER_ID, &self.roster.next_user_id());
        Ok(profile)
    }

    /// Switch to `id` and load that user's save, resetting when there is none.
    ///
    /// # Errors
    ///
    /// Rejects unknown ids and calls made while an intent is in flight.
    pub fn select_user(&mut self, id: u64) -> Result<(), Rejection> {
        self.ensure_idle()?;
        let profile = self.roster.select(id)?.clone();
        write_json(&self.gateway, KEY_CURRENT_USER, &Some(profile));
        self.restore_active_game();
        self.persist();
        Ok(())
    }

    /// Delete a profile and its save. Removing the active user resets the game.
    ///
    /// # Errors
    ///
    /// Rejects unknown ids and calls made while an intent is in flight.
    pub fn remove_user(&mut self, id: u64) -> Result<(), Rejection> {
        self.ensure_idle()?;
        let was_current = self.roster.remove(id)?;
        erase(&self.gateway, &save_key(id));
        write_json(&self.gateway, KEY_USERS, self.roster.users());
        if was_current {
            erase(&self.gateway, KEY_CURRENT_USER);
            self.reset_game();
            self.persist();
        }
        Ok(())
    }

    #[must_use]
    pub fn leaderboard(&self) -> Vec<&UserProfile> {
        self.roster.leaderboard()
    }

    #[must_use]
    pub fn recent_games(&self) -> Vec<&GameHistoryRecord> {
        self.roster.recent_games()
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        match self.dispatch {
            DispatchState::Idle => Ok(()),
            DispatchState::Busy => Err(Rejection::Busy),
        }
    }

    /// Finish the dispatch when nothing is queued, otherwise stay busy.
    fn settle(&mut self) -> DispatchOutcome {
        if let Some(delay) = self.pending_delay() {
            self.dispatch = DispatchState::Busy;
            return DispatchOutcome::Suspended { delay };
        }
        self.persist();
        self.dispatch = DispatchState::Idle;
        DispatchOutcome::Completed
    }

    /// Validate `intent` and apply its immediate part, returning the scheduled remainder.
    fn apply(&mut self, intent: &Intent) -> Result<Vec<Step>, Rejection> {
        let in_battle = self.state.in_battle();
        if in_battle && !intent.is_battle_action() && *intent != Intent::ResetGame {
            return Err(Rejection::InBattle);
        }
        if !in_battle && intent.is_battle_action() {
            return Err(Rejection::NotInBattle);
        }

        match intent {
            Intent::ResetGame => {
                self.reset_game();
                Ok(Vec::new())
            }
            Intent::Navigate { location } => {
                locations::check_move(&self.state, *location)?;
                self.state.current_location = *location;
                self.log(format!("前往：{}", location.display_name()));
                Ok(Vec::new())
            }
            Intent::BuyItem { offer_id } => {
                locations::check_action(&self.state, intent)?;
                let receipt = store::purchase(&mut self.state, offer_id)?;
                self.log(receipt.log_line());
                Ok(Vec::new())
            }
            Intent::Attack => {
                let turn = battle::attack(&mut self.state)?;
                Ok(self.absorb_turn(turn))
            }
            Intent::UsePotion => {
                let turn = battle::use_potion(&mut self.state)?;
                Ok(self.absorb_turn(turn))
            }
            Intent::Flee => {
                let turn = battle::flee(&mut self.state, &mut self.rng)?;
                Ok(self.absorb_turn(turn))
            }
            Intent::SearchClue
            | Intent::DecodeScript
            | Intent::FindBoat
            | Intent::CrossRiver
            | Intent::SearchTemple
            | Intent::OpenBox
            | Intent::TriggerRandomEvent => {
                locations::check_action(&self.state, intent)?;
                let (prelude, step) = exploration_step(intent);
                self.log(prelude);
                Ok(step.into_iter().collect())
            }
        }
    }

    /// Log a battle turn and schedule the counter-attack it may owe.
    fn absorb_turn(&mut self, turn: Turn) -> Vec<Step> {
        self.log_all(turn.lines);
        match turn.outcome {
            None => vec![(DELAY_COUNTER_ATTACK, Continuation::CounterAttack)],
            Some(BattleOutcome::Lost) => vec![(DELAY_DEFEAT_RESET, Continuation::DefeatReset)],
            Some(BattleOutcome::Won(_) | BattleOutcome::Fled) => Vec::new(),
        }
    }

    fn run(&mut self, continuation: Continuation) -> Vec<Step> {
        match continuation {
            Continuation::FinishClueSearch => {
                self.state.clue_found = true;
                self.log("✅ 找到了一份古老的线索！");
                self.grant_item(ITEM_CLUE);
                Vec::new()
            }
            Continuation::FinishDecode => {
                self.state.decoded = true;
                self.log("✅ 解密成功！宝藏在古庙中！");
                Vec::new()
            }
            Continuation::FinishBoatSearch => {
                if self.rng.chance(BOAT_FIND_CHANCE) {
                    self.state.has_boat = true;
                    self.log("✅ 找到了一艘小船！");
                    if self.state.decoded {
                        self.log("💡 现在可以前往古庙了！");
                    }
                } else {
                    self.log("❌ 没有找到船，再试一次吧...");
                }
                Vec::new()
            }
            Continuation::FinishCrossing => {
                self.state.current_location = Location::Temple;
                self.log("✅ 成功渡河！");
                Vec::new()
            }
            Continuation::FinishTempleSearch => {
                if self.rng.chance(BOX_FIND_CHANCE) {
                    self.state.found_box = true;
                    self.log("✅ 找到了一个神秘的宝箱！");
                    vec![(DELAY_GUARD_APPEARS, Continuation::GuardAppears)]
                } else {
                    self.log("⚠️ 糟糕！触发了陷阱！");
                    vec![(DELAY_BATTLE_START, Continuation::StartBattle(TRAP_ENEMY_ID))]
                }
            }
            Continuation::GuardAppears => {
                self.log("⚠️ 突然，神庙守卫出现了！");
                vec![(DELAY_BATTLE_START, Continuation::StartBattle(GUARD_ENEMY_ID))]
            }
            Continuation::StartBattle(enemy_id) => {
                let Some(template) = self.catalog.enemies.find(enemy_id).cloned() else {
                    log::warn!("enemy template {enemy_id} missing from catalog");
                    return Vec::new();
                };
                match battle::start(&mut self.state, &template) {
                    Ok(lines) => self.log_all(lines),
                    Err(rejection) => self.log(rejection.to_string()),
                }
                Vec::new()
            }
            Continuation::FinishOpenBox => {
                self.complete_game();
                Vec::new()
            }
            Continuation::FinishRandomEvent => {
                match events::trigger(&mut self.state, &self.catalog.events, &mut self.rng) {
                    Ok(outcome) => self.log_all(outcome.lines),
                    Err(rejection) => self.log(rejection.to_string()),
                }
                Vec::new()
            }
            Continuation::CounterAttack => match battle::counter_attack(&mut self.state) {
                Ok(turn) => {
                    let lost = turn.outcome == Some(BattleOutcome::Lost);
                    self.log_all(turn.lines);
                    if lost {
                        vec![(DELAY_DEFEAT_RESET, Continuation::DefeatReset)]
                    } else {
                        Vec::new()
                    }
                }
                Err(rejection) => {
                    log::debug!("counter-attack skipped: {rejection:?}");
                    Vec::new()
                }
            },
            Continuation::DefeatReset => {
                self.reset_game();
                Vec::new()
            }
        }
    }

    fn complete_game(&mut self) {
        let stats = &mut self.state.player_stats;
        stats.gold = stats.gold.saturating_add(TREASURE_GOLD);
        self.state.treasure_found = true;
        self.log(format!("🎉 恭喜！获得了传说中的宝藏！+{TREASURE_GOLD} 金币！"));
        self.grant_item(ITEM_TREASURE);

        let score = self.state.score();
        let record = self
            .roster
            .record_completion(&self.state.player_stats, score, self.clock.now());
        self.log(format!("🏆 冒险完成！最终得分：{score}"));
        log::info!(
            "game completed by {} (score {score}, level {})",
            record.player_name,
            record.level
        );

        write_json(&self.gateway, KEY_USERS, self.roster.users());
        write_json(&self.gateway, KEY_HISTORY, self.roster.history());
        if let Some(current) = self.roster.current_user() {
            write_json(&self.gateway, KEY_CURRENT_USER, &Some(current));
        }
    }

    fn battle_menu(&self) -> Vec<MenuEntry> {
        let has_potion = self.state.inventory.contains(ITEM_POTION);
        [
            (Intent::Attack, "⚔️ 攻击", true),
            (Intent::UsePotion, "🧪 使用药水", has_potion),
            (Intent::Flee, "🏃 逃跑", true),
        ]
        .into_iter()
        .map(|(intent, label, enabled)| MenuEntry {
            intent,
            label: label.to_string(),
            enabled,
        })
        .collect()
    }

    fn grant_item(&mut self, item: &str) {
        if self.state.inventory.add(item) {
            self.log(format!("获得物品：{item}"));
        }
    }

    /// Load the active user's slot, or the shared slot when nobody is selected.
    fn restore_active_game(&mut self) {
        let (key, owner) = match self.roster.current_user() {
            Some(user) => (save_key(user.id), Some(user.name.clone())),
            None => (KEY_SAVE_CURRENT.to_string(), None),
        };
        self.pending.clear();
        self.dispatch = DispatchState::Idle;
        match read_json::<GameState, _>(&self.gateway, &key) {
            Some(saved) => {
                self.state = saved.sanitized();
                if self.state.shop_offers.is_empty() {
                    self.state.shop_offers = self.catalog.shop.offers.clone();
                }
                log::info!("restored {key}");
                match owner {
                    Some(name) => self.log(format!("读取 {name} 的存档成功！")),
                    None => self.log("读取存档成功！"),
                }
            }
            None => {
                log::info!("no usable save under {key}; starting fresh");
                self.reset_game();
            }
        }
    }

    fn reset_game(&mut self) {
        self.state = GameState {
            shop_offers: self.catalog.shop.offers.clone(),
            ..GameState::default()
        };
        self.log("🎮 游戏重新开始！探索世界，寻找宝藏！");
        log::info!("game reset");
    }

    /// Write the snapshot to the user slot (when a user is active) and the shared slot.
    fn persist(&self) {
        if let Some(id) = self.roster.current_user_id() {
            write_json(&self.gateway, &save_key(id), &self.state);
        }
        write_json(&self.gateway, KEY_SAVE_CURRENT, &self.state);
    }

    fn log(&mut self, text: impl AsRef<str>) {
        let line = format!("[{}] {}", self.clock.stamp(), text.as_ref());
        self.state.logs.push(line);
    }

    fn log_all(&mut self, lines: Vec<String>) {
        for line in lines {
            self.log(line);
        }
    }
}

fn save_key(user_id: u64) -> String {
    format!("{KEY_SAVE_PREFIX}{user_id}")
}

/// Prelude line and delayed effect of a location action.
fn exploration_step(intent: &Intent) -> (&'static str, Option<Step>) {
    match intent {
        Intent::SearchClue => (
            "你在书架间翻找...",
            Some((DELAY_SEARCH_CLUE, Continuation::FinishClueSearch)),
        ),
        Intent::DecodeScript => (
            "你开始解密古文...",
            Some((DELAY_DECODE, Continuation::FinishDecode)),
        ),
        Intent::FindBoat => (
            "你在岸边寻找...",
            Some((DELAY_FIND_BOAT, Continuation::FinishBoatSearch)),
        ),
        Intent::CrossRiver => (
            "你乘船渡河...",
            Some((DELAY_CROSS_RIVER, Continuation::FinishCrossing)),
        ),
        Intent::SearchTemple => (
            "你在神庙中搜索...",
            Some((DELAY_SEARCH_TEMPLE, Continuation::FinishTempleSearch)),
        ),
        Intent::OpenBox => (
            "你打开了宝箱...",
            Some((DELAY_OPEN_BOX, Continuation::FinishOpenBox)),
        ),
        Intent::TriggerRandomEvent => (
            "你触发了随机事件...",
            Some((DELAY_RANDOM_EVENT, Continuation::FinishRandomEvent)),
        ),
        Intent::Navigate { .. }
        | Intent::BuyItem { .. }
        | Intent::Attack
        | Intent::UsePotion
        | Intent::Flee
        | Intent::ResetGame => ("", None),
    }
}
