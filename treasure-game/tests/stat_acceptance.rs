use std::collections::HashMap;

use treasure_game::battle::{self, BattleOutcome};
use treasure_game::{
    EventEntry, GameState, PlayerStats, RandomSource, SeededRng, catalog, grant_experience,
    select_weighted,
};

const SAMPLE_SIZE: u32 = 20_000;
const TOLERANCE: f64 = 0.015;

fn assert_converges(table: &[EventEntry], seed: u64) {
    let mut rng = SeededRng::from_user_seed(seed);
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for _ in 0..SAMPLE_SIZE {
        let event = select_weighted(table, rng.unit()).expect("table has weight");
        *counts.entry(event.id.as_str()).or_default() += 1;
    }
    let total_weight: u32 = table.iter().map(|entry| entry.weight).sum();
    for entry in table {
        let expected = f64::from(entry.weight) / f64::from(total_weight);
        let observed =
            f64::from(counts.get(entry.id.as_str()).copied().unwrap_or(0)) / f64::from(SAMPLE_SIZE);
        assert!(
            (observed - expected).abs() <= TOLERANCE,
            "{} drifted: observed {observed:.4}, expected {expected:.4}",
            entry.id
        );
    }
}

#[test]
fn temple_events_follow_weights() {
    assert_converges(&catalog().events.temple, 7);
}

#[test]
fn common_events_follow_weights() {
    assert_converges(&catalog().events.common, 11);
}

#[test]
fn flee_succeeds_sixty_percent_of_the_time() {
    const TRIALS: u32 = 1_000;
    let guard = catalog().enemies.find("temple_guard").cloned().unwrap();
    let mut rng = SeededRng::from_user_seed(2024);
    let mut escaped = 0_u32;
    for _ in 0..TRIALS {
        let mut state = GameState::default();
        battle::start(&mut state, &guard).unwrap();
        let turn = battle::flee(&mut state, &mut rng).unwrap();
        if turn.outcome == Some(BattleOutcome::Fled) {
            escaped += 1;
            assert!(!state.in_battle());
        } else {
            assert!(state.in_battle());
        }
    }
    let rate = f64::from(escaped) / f64::from(TRIALS);
    // Three standard deviations of a 1000-trial binomial at p = 0.6.
    assert!((rate - 0.6).abs() <= 0.047, "flee rate drifted: {rate:.3}");
    assert_eq!(rng.draws(), u64::from(TRIALS));
}

#[test]
fn three_thresholds_at_once_give_three_levels() {
    let mut stats = PlayerStats::default();
    let before = stats.clone();
    let reached = grant_experience(&mut stats, 100 + 200 + 300);
    assert_eq!(reached, vec![2, 3, 4]);
    assert_eq!(stats.experience, 0);
    assert_eq!(stats.max_health - before.max_health, 60);
    assert_eq!(stats.attack - before.attack, 9);
    assert_eq!(stats.defense - before.defense, 6);
    assert_eq!(stats.health, stats.max_health);
}

#[test]
fn battle_damage_keeps_health_in_bounds() {
    let guard = catalog().enemies.find("temple_guard").cloned().unwrap();
    let mut rng = SeededRng::from_user_seed(99);
    for _ in 0..200 {
        let mut state = GameState::default();
        battle::start(&mut state, &guard).unwrap();
        while state.in_battle() && !state.game_over {
            let turn = if rng.chance(0.5) {
                battle::attack(&mut state).unwrap()
            } else {
                battle::flee(&mut state, &mut rng).unwrap()
            };
            if turn.outcome.is_none() {
                battle::counter_attack(&mut state).unwrap();
            }
            let stats = &state.player_stats;
            assert!(stats.health <= stats.max_health);
            if let Some(session) = &state.battle {
                assert!(session.enemy.health <= session.enemy.max_health);
            }
        }
    }
}
