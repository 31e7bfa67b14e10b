//! Turn-based combat: encounter entry, player actions, counter-attacks and rewards.
//!
//! A battle is `Idle` while `GameState::battle` is `None` and `Active` while a
//! [`BattleSession`] is present. Every player action returns a [`Turn`]; a turn
//! without an outcome leaves the enemy alive and owes exactly one
//! [`counter_attack`], which the store runs as a deferred continuation.
use serde::{Deserialize, Serialize};

use crate::constants::{FLEE_CHANCE, ITEM_POTION, MIN_DAMAGE, POTION_HEAL};
use crate::progression::{grant_experience, level_up_lines};
use crate::rng::RandomSource;
use crate::session::Rejection;
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub health: u32,
    pub attack: u32,
    pub defense: u32,
    pub gold_reward: u32,
    pub exp_reward: u32,
    /// The unique guard whose defeat unlocks the treasure box.
    #[serde(default)]
    pub guard: bool,
}

/// Live enemy instantiated from a template for one encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enemy {
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub defense: u32,
    pub gold_reward: u32,
    pub exp_reward: u32,
    pub guard: bool,
}

impl From<&EnemyTemplate> for Enemy {
    fn from(template: &EnemyTemplate) -> Self {
        Self {
            name: template.name.clone(),
            health: template.health,
            max_health: template.health,
            attack: template.attack,
            defense: template.defense,
            gold_reward: template.gold_reward,
            exp_reward: template.exp_reward,
            guard: template.guard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleSession {
    pub enemy: Enemy,
    /// Transcript of this encounter only.
    pub log: Vec<String>,
}

impl BattleSession {
    fn record(&mut self, line: &str) {
        self.log.push(line.to_string());
    }
}

/// Rewards granted for a won battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Victory {
    pub enemy_name: String,
    pub gold: u32,
    pub experience: u32,
    pub levels_reached: Vec<u32>,
    pub guard_defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleOutcome {
    Won(Victory),
    Lost,
    Fled,
}

/// Result of one step of combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Game-log lines produced by the step, in order.
    pub lines: Vec<String>,
    /// `None` while the battle goes on.
    pub outcome: Option<BattleOutcome>,
}

impl Turn {
    const fn ongoing(lines: Vec<String>) -> Self {
        Self {
            lines,
            outcome: None,
        }
    }
}

/// `max(1, attack - defense)`.
#[must_use]
pub const fn damage(attack: u32, defense: u32) -> u32 {
    let raw = attack.saturating_sub(defense);
    if raw < MIN_DAMAGE { MIN_DAMAGE } else { raw }
}

/// Enter a battle against a fresh copy of `template`.
///
/// # Errors
///
/// Rejects when a battle is already active.
pub fn start(state: &mut GameState, template: &EnemyTemplate) -> Result<Vec<String>, Rejection> {
    if state.in_battle() {
        return Err(Rejection::InBattle);
    }
    let line = format!("遭遇 {}！战斗开始！", template.name);
    let mut session = BattleSession {
        enemy: Enemy::from(template),
        log: Vec::new(),
    };
    session.record(&line);
    state.battle = Some(session);
    log::debug!("battle started against {}", template.id);
    Ok(vec![line])
}

/// The player strikes the enemy.
///
/// # Errors
///
/// Rejects outside a battle.
pub fn attack(state: &mut GameState) -> Result<Turn, Rejection> {
    let player_attack = state.player_stats.attack;
    let session = state.battle.as_mut().ok_or(Rejection::NotInBattle)?;
    let dealt = damage(player_attack, session.enemy.defense);
    session.enemy.health = session.enemy.health.saturating_sub(dealt);
    let line = format!("⚔️ 你对 {} 造成了 {dealt} 点伤害！", session.enemy.name);
    session.record(&line);

    if session.enemy.health > 0 {
        return Ok(Turn::ongoing(vec![line]));
    }
    let mut lines = vec![line];
    let victory = claim_victory(state, &mut lines);
    Ok(Turn {
        lines,
        outcome: Some(BattleOutcome::Won(victory)),
    })
}

/// Drink a healing potion; the enemy still gets its counter-attack.
///
/// # Errors
///
/// Rejects outside a battle and when no potion is held.
pub fn use_potion(state: &mut GameState) -> Result<Turn, Rejection> {
    if !state.in_battle() {
        return Err(Rejection::NotInBattle);
    }
    if !state.inventory.remove(ITEM_POTION) {
        return Err(Rejection::NoPotion);
    }
    state.player_stats.heal(POTION_HEAL);
    let line = format!("🧪 使用了治疗药水，恢复了 {POTION_HEAL} 点生命！");
    if let Some(session) = state.battle.as_mut() {
        session.record(&line);
    }
    Ok(Turn::ongoing(vec![line]))
}

/// Try to run away. Success discards the session and leaves every progress flag alone.
///
/// # Errors
///
/// Rejects outside a battle.
pub fn flee<R: RandomSource + ?Sized>(state: &mut GameState, rng: &mut R) -> Result<Turn, Rejection> {
    let session = state.battle.as_mut().ok_or(Rejection::NotInBattle)?;
    if rng.chance(FLEE_CHANCE) {
        session.record("🏃 你成功逃跑了！");
        state.battle = None;
        log::info!("player fled the battle");
        return Ok(Turn {
            lines: vec!["🏃 你逃离了战斗".to_string()],
            outcome: Some(BattleOutcome::Fled),
        });
    }
    let line = "❌ 逃跑失败！".to_string();
    session.record(&line);
    Ok(Turn::ongoing(vec![line]))
}

/// The enemy hits back. Health stops at zero, which loses the battle.
///
/// A loss marks the game over; the session stays until the store resets the game.
///
/// # Errors
///
/// Rejects outside a battle.
pub fn counter_attack(state: &mut GameState) -> Result<Turn, Rejection> {
    let session = state.battle.as_mut().ok_or(Rejection::NotInBattle)?;
    let dealt = damage(session.enemy.attack, state.player_stats.defense);
    state.player_stats.take_damage(dealt, 0);
    let line = format!("💥 {} 对你造成了 {dealt} 点伤害！", session.enemy.name);
    session.record(&line);

    if state.player_stats.health > 0 {
        return Ok(Turn::ongoing(vec![line]));
    }
    session.record("💀 你被击败了...");
    state.game_over = true;
    log::info!("player defeated by {}", session.enemy.name);
    Ok(Turn {
        lines: vec![line, "💀 战斗失败！你的冒险到此结束...".to_string()],
        outcome: Some(BattleOutcome::Lost),
    })
}

fn claim_victory(state: &mut GameState, lines: &mut Vec<String>) -> Victory {
    let Some(session) = state.battle.take() else {
        return Victory {
            enemy_name: String::new(),
            gold: 0,
            experience: 0,
            levels_reached: Vec::new(),
            guard_defeated: false,
        };
    };
    let enemy = &session.enemy;

    let stats = &mut state.player_stats;
    stats.gold = stats.gold.saturating_add(enemy.gold_reward);
    lines.push(format!("✅ 战斗胜利！击败了 {}", enemy.name));
    lines.push(format!("💰 获得 {} 金币", enemy.gold_reward));
    lines.push(format!("⭐ 获得 {} 经验", enemy.exp_reward));

    let levels_reached = grant_experience(stats, enemy.exp_reward);
    for level in &levels_reached {
        lines.extend(level_up_lines(*level));
    }
    if enemy.guard {
        state.guard_defeated = true;
        lines.push("🎉 击败了神庙守卫！现在可以打开宝箱了！".to_string());
    }
    log::info!(
        "defeated {} (+{} gold, +{} exp)",
        enemy.name,
        enemy.gold_reward,
        enemy.exp_reward
    );

    Victory {
        enemy_name: enemy.name.clone(),
        gold: enemy.gold_reward,
        experience: enemy.exp_reward,
        levels_reached,
        guard_defeated: enemy.guard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog;
    use crate::rng::ScriptedRolls;

    fn guard() -> EnemyTemplate {
        catalog().enemies.find("temple_guard").cloned().unwrap()
    }

    fn in_battle_with(template: &EnemyTemplate) -> GameState {
        let mut state = GameState::default();
        start(&mut state, template).unwrap();
        state
    }

    #[test]
    fn damage_has_a_floor_of_one() {
        assert_eq!(damage(15, 12), 3);
        assert_eq!(damage(20, 8), 12);
        assert_eq!(damage(5, 30), 1);
        assert_eq!(damage(0, 0), 1);
    }

    #[test]
    fn entering_twice_is_rejected() {
        let mut state = in_battle_with(&guard());
        assert_eq!(start(&mut state, &guard()), Err(Rejection::InBattle));
        let session = state.battle.as_ref().unwrap();
        assert_eq!(session.enemy.health, 70);
        assert_eq!(session.log, vec!["遭遇 神庙守卫！战斗开始！".to_string()]);
    }

    #[test]
    fn guard_exchange_matches_the_formula() {
        let mut state = in_battle_with(&guard());
        let turn = attack(&mut state).unwrap();
        assert_eq!(turn.outcome, None);
        assert_eq!(turn.lines, vec!["⚔️ 你对 神庙守卫 造成了 3 点伤害！".to_string()]);
        assert_eq!(state.battle.as_ref().unwrap().enemy.health, 67);

        let counter = counter_attack(&mut state).unwrap();
        assert_eq!(counter.outcome, None);
        assert_eq!(state.player_stats.health, 88);
    }

    #[test]
    fn killing_blow_pays_out_and_clears_session() {
        let mut state = in_battle_with(&guard());
        state.battle.as_mut().unwrap().enemy.health = 2;
        let turn = attack(&mut state).unwrap();
        let Some(BattleOutcome::Won(victory)) = turn.outcome else {
            panic!("expected a win, got {:?}", turn.outcome);
        };
        assert!(victory.guard_defeated);
        assert_eq!(victory.levels_reached, vec![2]);
        assert!(state.guard_defeated);
        assert!(!state.in_battle());
        assert_eq!(state.player_stats.gold, 170);
        assert_eq!(state.player_stats.experience, 80);
        assert!(turn.lines.iter().any(|line| line == "💰 获得 120 金币"));
        assert!(turn.lines.iter().any(|line| line.contains("现在可以打开宝箱")));
    }

    #[test]
    fn trap_monster_does_not_unlock_the_box() {
        let trap = catalog().enemies.find("trap_monster").cloned().unwrap();
        let mut state = in_battle_with(&trap);
        state.battle.as_mut().unwrap().enemy.health = 1;
        attack(&mut state).unwrap();
        assert!(!state.guard_defeated);
        assert_eq!(state.player_stats.experience, 70);
    }

    #[test]
    fn potion_heals_up_to_max() {
        let mut state = in_battle_with(&guard());
        assert_eq!(use_potion(&mut state), Err(Rejection::NoPotion));
        state.inventory.add(ITEM_POTION);
        state.player_stats.health = 80;
        let turn = use_potion(&mut state).unwrap();
        assert_eq!(turn.outcome, None);
        assert_eq!(state.player_stats.health, 100);
        assert!(!state.inventory.contains(ITEM_POTION));
    }

    #[test]
    fn flee_keeps_progress_flags() {
        let mut state = in_battle_with(&guard());
        state.found_box = true;
        let mut rolls = ScriptedRolls::new([0.7, 0.2]);
        let failed = flee(&mut state, &mut rolls).unwrap();
        assert_eq!(failed.outcome, None);
        assert!(state.in_battle());

        let fled = flee(&mut state, &mut rolls).unwrap();
        assert_eq!(fled.outcome, Some(BattleOutcome::Fled));
        assert!(!state.in_battle());
        assert!(state.found_box);
        assert!(!state.guard_defeated);
    }

    #[test]
    fn counter_attack_can_lose_the_battle() {
        let mut state = in_battle_with(&guard());
        state.player_stats.health = 5;
        let turn = counter_attack(&mut state).unwrap();
        assert_eq!(turn.outcome, Some(BattleOutcome::Lost));
        assert_eq!(state.player_stats.health, 0);
        assert!(state.game_over);
    }

    #[test]
    fn actions_outside_battle_are_rejected() {
        let mut state = GameState::default();
        let mut rolls = ScriptedRolls::default();
        assert_eq!(attack(&mut state), Err(Rejection::NotInBattle));
        assert_eq!(use_potion(&mut state), Err(Rejection::NotInBattle));
        assert_eq!(flee(&mut state, &mut rolls), Err(Rejection::NotInBattle));
        assert_eq!(counter_attack(&mut state), Err(Rejection::NotInBattle));
    }
}
