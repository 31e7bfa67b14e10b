//! Experience, leveling and scoring.
use crate::constants::{
    EXP_PER_LEVEL, LEVEL_BONUS_ATTACK, LEVEL_BONUS_DEFENSE, LEVEL_BONUS_MAX_HEALTH,
    SCORE_PER_LEVEL,
};
use crate::state::PlayerStats;

/// Experience needed to leave `level`.
#[must_use]
pub const fn exp_to_next(level: u32) -> u32 {
    level.saturating_mul(EXP_PER_LEVEL)
}

/// Credit experience and resolve every level-up it pays for.
///
/// Returns the levels reached, in order; empty when no threshold was crossed.
pub fn grant_experience(stats: &mut PlayerStats, amount: u32) -> Vec<u32> {
    stats.experience = stats.experience.saturating_add(amount);
    let mut reached = Vec::new();
    while stats.experience >= exp_to_next(stats.level) {
        stats.experience -= exp_to_next(stats.level);
        stats.level += 1;
        stats.max_health += LEVEL_BONUS_MAX_HEALTH;
        stats.health = stats.max_health;
        stats.attack += LEVEL_BONUS_ATTACK;
        stats.defense += LEVEL_BONUS_DEFENSE;
        reached.push(stats.level);
        log::info!("level up -> {}", stats.level);
    }
    reached
}

#[must_use]
pub fn level_up_lines(level: u32) -> [String; 2] {
    [
        format!("🎉 升级了！当前等级：{level}"),
        format!(
            "💪 生命上限 +{LEVEL_BONUS_MAX_HEALTH}，攻击 +{LEVEL_BONUS_ATTACK}，防御 +{LEVEL_BONUS_DEFENSE}"
        ),
    ]
}

#[must_use]
pub const fn score(stats: &PlayerStats) -> u32 {
    stats
        .gold
        .saturating_add(stats.level.saturating_mul(SCORE_PER_LEVEL))
}
