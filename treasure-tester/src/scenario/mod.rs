use anyhow::{Result, ensure};
use treasure_game::constants::RANDOM_EVENT_CAP;
use treasure_game::{GameState, Location, OfferCategory, PlayerStats, exp_to_next};

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

const SCENARIOS: [(&str, &str); 4] = [
    ("smoke", "Random button presses; every invariant must hold"),
    (
        "treasure-hunt",
        "Registered player gears up and hunts for the treasure",
    ),
    (
        "event-caps",
        "Drain every reachable random-event counter to its cap",
    ),
    (
        "leveling",
        "Gear up and fight until a level-up; stats must match the level curve",
    ),
];

/// Registered scenario keys and their descriptions.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

/// Every registered scenario key, in listing order.
#[must_use]
pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|(key, _)| (*key).to_string()).collect()
}

#[must_use]
pub fn find_scenario(name: &str) -> Option<TestScenario> {
    let scenario = match name.to_lowercase().as_str() {
        "smoke" => TestScenario::simulation(
            "Smoke",
            SimulationPlan::new(GameplayStrategy::Reckless)
                .with_max_steps(120)
                .with_expectation(played_expectation),
        ),
        "treasure-hunt" => TestScenario::simulation(
            "Treasure Hunt",
            SimulationPlan::new(GameplayStrategy::Grinder)
                .with_max_steps(600)
                .with_player("测试员")
                .with_expectation(played_expectation)
                .with_expectation(story_expectation)
                .with_expectation(profile_expectation),
        ),
        "event-caps" => TestScenario::simulation(
            "Event Caps",
            SimulationPlan::new(GameplayStrategy::EventHunter)
                .with_max_steps(80)
                .with_expectation(event_cap_expectation),
        ),
        "leveling" => TestScenario::simulation(
            "Leveling",
            SimulationPlan::new(GameplayStrategy::Grinder)
                .with_max_steps(600)
                .with_expectation(played_expectation)
                .with_expectation(leveled_expectation)
                .with_expectation(level_curve_expectation),
        ),
        _ => return None,
    };
    Some(scenario)
}

fn played_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.steps > 0, "no step was played");
    Ok(())
}

fn story_expectation(summary: &SimulationSummary) -> Result<()> {
    let decoded = summary
        .metrics
        .decision_log
        .iter()
        .any(|entry| entry.intent == "decodeScript" && entry.rejection.is_none());
    ensure!(decoded, "the script was never decoded");
    Ok(())
}

fn profile_expectation(summary: &SimulationSummary) -> Result<()> {
    let Some(profile) = &summary.profile else {
        anyhow::bail!("player profile was not selected");
    };
    if summary.treasure_found() {
        ensure!(
            profile.games_completed == 1,
            "completion not recorded: {} games",
            profile.games_completed
        );
        ensure!(
            profile.best_score == summary.final_state.score(),
            "best score {} != final score {}",
            profile.best_score,
            summary.final_state.score()
        );
        ensure!(summary.completed_games == 1, "history entry missing");
    } else {
        ensure!(profile.games_completed == 0, "phantom completion recorded");
        ensure!(summary.completed_games == 0, "phantom history entry");
    }
    Ok(())
}

fn event_cap_expectation(summary: &SimulationSummary) -> Result<()> {
    let counters = &summary.final_state.location_visit_counters;
    for location in [Location::Library, Location::River, Location::Store] {
        ensure!(
            counters.used(location) == RANDOM_EVENT_CAP,
            "{location} ran {} of {RANDOM_EVENT_CAP} events",
            counters.used(location)
        );
    }
    ensure!(
        counters.used(Location::Temple) == 0,
        "events fired in the locked temple"
    );
    ensure!(
        summary.metrics.events_triggered == 3 * u32::from(RANDOM_EVENT_CAP),
        "triggered {} events",
        summary.metrics.events_triggered
    );
    Ok(())
}

fn leveled_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.max_level > 1,
        "never left level 1 ({} battles won)",
        summary.metrics.battles_won
    );
    Ok(())
}

fn level_curve_expectation(summary: &SimulationSummary) -> Result<()> {
    if let Some(peak) = &summary.metrics.peak_state {
        check_level_curve(peak)?;
    }
    check_level_curve(&summary.final_state)
}

/// Stats must equal the starting line plus level bonuses plus bought gear.
fn check_level_curve(state: &GameState) -> Result<()> {
    let base = PlayerStats::default();
    let stats = &state.player_stats;
    let gained = stats.level - 1;
    let gear = |category: OfferCategory| -> u32 {
        state
            .shop_offers
            .iter()
            .filter(|offer| offer.bought && offer.category == category)
            .map(|offer| offer.bonus)
            .sum()
    };
    ensure!(
        stats.max_health == base.max_health + 20 * gained,
        "max health {} at level {}",
        stats.max_health,
        stats.level
    );
    ensure!(
        stats.attack == base.attack + 3 * gained + gear(OfferCategory::Weapon),
        "attack {} at level {}",
        stats.attack,
        stats.level
    );
    ensure!(
        stats.defense == base.defense + 2 * gained + gear(OfferCategory::Armor),
        "defense {} at level {}",
        stats.defense,
        stats.level
    );
    ensure!(
        stats.experience < exp_to_next(stats.level),
        "{} experience left unconverted at level {}",
        stats.experience,
        stats.level
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for key in all_scenario_keys() {
            assert!(find_scenario(&key).is_some(), "{key} missing");
        }
        assert!(find_scenario("SMOKE").is_some());
        assert!(find_scenario("vehicle-system").is_none());
    }

    #[test]
    fn level_curve_counts_bought_gear() {
        let mut state = GameState::default();
        state.player_stats.level = 2;
        state.player_stats.max_health += 20;
        state.player_stats.attack += 3 + 5;
        state.player_stats.defense += 2;
        for offer in &mut state.shop_offers {
            offer.bought = offer.id == "sword1";
        }
        assert!(check_level_curve(&state).is_ok());

        state.player_stats.attack -= 5;
        assert!(check_level_curve(&state).is_err());
    }
}
