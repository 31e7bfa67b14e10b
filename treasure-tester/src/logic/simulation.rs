use chrono::{DateTime, Utc};
use std::time::Duration;

use treasure_game::constants::RANDOM_EVENT_CAP;
use treasure_game::{
    Clock, DispatchOutcome, GameState, Intent, Location, ManualClock, MemoryGateway,
    PersistenceGateway, SeededRng, StateStore, UserProfile,
};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy, PolicyDecision};

const VICTORY_MARK: &str = "✅ 战斗胜利";
const ESCAPE_MARK: &str = "🏃 你逃离了战斗";

/// Configuration for a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub max_steps: usize,
    /// Register and select this profile before the first move.
    pub player: Option<String>,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_steps: 300,
            player: None,
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_player(mut self, name: impl Into<String>) -> Self {
        self.player = Some(name.into());
        self
    }
}

/// Snapshot of one dispatched intent.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub step: usize,
    pub location: Location,
    pub intent: String,
    pub policy_name: String,
    pub rationale: Option<String>,
    /// `None` when the intent completed, otherwise the rejection text.
    pub rejection: Option<String>,
}

/// Tallies gathered over a run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub steps: usize,
    pub rejections: usize,
    pub battles_won: u32,
    pub escapes: u32,
    pub defeats: u32,
    pub events_triggered: u32,
    pub max_level: u32,
    /// Snapshot taken when `max_level` was first reached. A later defeat does not clear it.
    pub peak_state: Option<GameState>,
    pub narrative_time: Duration,
    pub decision_log: Vec<DecisionRecord>,
}

/// Everything a scenario expectation may inspect after a run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub final_state: GameState,
    pub metrics: RunMetrics,
    pub violations: Vec<String>,
    pub profile: Option<UserProfile>,
    pub completed_games: usize,
}

impl SimulationSummary {
    #[must_use]
    pub fn treasure_found(&self) -> bool {
        self.final_state.treasure_found
    }
}

/// Drives a [`StateStore`] with a [`PlayerPolicy`] until the treasure is claimed
/// or the step budget runs out.
pub struct SimulationSession<G = MemoryGateway, C = ManualClock>
where
    G: PersistenceGateway,
    C: Clock,
{
    store: StateStore<G, SeededRng, C>,
    config: SimulationConfig,
    metrics: RunMetrics,
    violations: Vec<String>,
}

impl SimulationSession {
    /// In-memory saves on a virtual clock.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_backends(config, MemoryGateway::new(), ManualClock::default())
    }
}

impl<G, C> SimulationSession<G, C>
where
    G: PersistenceGateway,
    C: Clock,
{
    #[must_use]
    pub fn with_backends(config: SimulationConfig, gateway: G, clock: C) -> Self {
        let mut store = StateStore::new(gateway, SeededRng::from_user_seed(config.seed), clock);
        let mut violations = Vec::new();
        if let Some(name) = &config.player {
            let selected = store
                .register_user(name)
                .and_then(|profile| store.select_user(profile.id));
            if let Err(err) = selected {
                violations.push(format!("could not select player {name}: {err}"));
            }
        }
        Self {
            store,
            config,
            metrics: RunMetrics::default(),
            violations,
        }
    }

    #[must_use]
    pub fn store(&self) -> &StateStore<G, SeededRng, C> {
        &self.store
    }

    /// Play until done and hand back the summary.
    pub fn run(mut self) -> SimulationSummary {
        let started = self.store.clock().now();
        let mut policy = self.config.strategy.create_policy(self.config.seed);
        for step in 1..=self.config.max_steps {
            if self.store.state().treasure_found {
                break;
            }
            if !self.advance(step, policy.as_mut()) {
                break;
            }
        }
        self.finish(started)
    }

    /// Dispatch one policy decision. Returns `false` when nothing is enabled.
    pub fn advance(&mut self, step: usize, policy: &mut dyn PlayerPolicy) -> bool {
        let options: Vec<_> = self
            .store
            .available_actions()
            .into_iter()
            .filter(|entry| entry.enabled)
            .collect();
        if options.is_empty() {
            self.violations.push(format!("step {step}: no enabled action"));
            return false;
        }

        let PolicyDecision { intent, rationale } = policy.pick(self.store.state(), &options);
        let location = self.store.state().current_location;
        let was_in_battle = self.store.state().in_battle();
        let logs_before = self.store.state().logs.len();
        let level_before = self.store.state().player_stats.level;

        let outcome = self.store.dispatch(intent.clone());
        self.metrics.steps = step;
        let rejection = match outcome {
            DispatchOutcome::Completed => None,
            DispatchOutcome::Rejected(reason) => {
                self.metrics.rejections += 1;
                Some(reason.to_string())
            }
            DispatchOutcome::Suspended { .. } => {
                self.violations
                    .push(format!("step {step}: dispatch returned while suspended"));
                None
            }
        };
        log::debug!("step {step}: {intent} at {location} -> {rejection:?}");

        let state = self.store.state();
        let reset = state.logs.len() <= logs_before && logs_before > 1 && state.logs.len() == 1;
        if reset && was_in_battle {
            self.metrics.defeats += 1;
        } else {
            for line in &state.logs[logs_before.min(state.logs.len())..] {
                if line.contains(VICTORY_MARK) {
                    self.metrics.battles_won += 1;
                } else if line.contains(ESCAPE_MARK) {
                    self.metrics.escapes += 1;
                }
            }
            if intent == Intent::TriggerRandomEvent && rejection.is_none() {
                self.metrics.events_triggered += 1;
            }
            if state.player_stats.level < level_before && !reset {
                self.violations
                    .push(format!("step {step}: level dropped below {level_before}"));
            }
        }
        if state.player_stats.level > self.metrics.max_level {
            self.metrics.max_level = state.player_stats.level;
            self.metrics.peak_state = Some(state.clone());
        }

        self.violations
            .extend(check_invariants(state).into_iter().map(|v| format!("step {step}: {v}")));

        self.metrics.decision_log.push(DecisionRecord {
            step,
            location,
            intent: intent.name().to_string(),
            policy_name: policy.name().to_string(),
            rationale,
            rejection,
        });
        true
    }

    fn finish(self, started: DateTime<Utc>) -> SimulationSummary {
        let mut metrics = self.metrics;
        metrics.narrative_time = (self.store.clock().now() - started)
            .to_std()
            .unwrap_or_default();
        let profile = self.store.roster().current_user().cloned();
        SimulationSummary {
            seed: self.config.seed,
            strategy: self.config.strategy,
            final_state: self.store.state().clone(),
            completed_games: self.store.recent_games().len(),
            metrics,
            violations: self.violations,
            profile,
        }
    }
}

/// Assertion hook run after a simulation completes.
pub type SimulationExpectation = fn(&SimulationSummary) -> anyhow::Result<()>;

/// Strategy, budget and expectations for one scenario.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_steps: usize,
    pub player: Option<&'static str>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_steps: 300,
            player: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub const fn with_player(mut self, name: &'static str) -> Self {
        self.player = Some(name);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: SimulationExpectation) -> Self {
        self.expectations.push(expectation);
        self
    }

    /// Session configuration for one seeded run of this plan.
    #[must_use]
    pub fn config(&self, seed: u64) -> SimulationConfig {
        let config = SimulationConfig::new(self.strategy, seed).with_max_steps(self.max_steps);
        match self.player {
            Some(name) => config.with_player(name),
            None => config,
        }
    }
}

/// State properties that must hold after every dispatch.
#[must_use]
pub fn check_invariants(state: &GameState) -> Vec<String> {
    let mut violations = Vec::new();
    let stats = &state.player_stats;
    if stats.health > stats.max_health {
        violations.push(format!(
            "health {} above max {}",
            stats.health, stats.max_health
        ));
    }
    if stats.level < 1 {
        violations.push("level below 1".to_string());
    }
    for location in Location::ALL {
        let used = state.location_visit_counters.used(location);
        if used > RANDOM_EVENT_CAP {
            violations.push(format!("{location} ran {used} random events"));
        }
    }
    let mut names = state.inventory.items().to_vec();
    names.sort();
    names.dedup();
    if names.len() != state.inventory.len() {
        violations.push("inventory holds duplicates".to_string());
    }
    if let Some(session) = &state.battle
        && session.enemy.health > session.enemy.max_health
    {
        violations.push(format!("{} health above max", session.enemy.name));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_hunter_drains_reachable_caps() {
        let summary = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::EventHunter, 5).with_max_steps(80),
        )
        .run();
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        for location in [Location::Library, Location::River, Location::Store] {
            assert_eq!(
                summary.final_state.location_visit_counters.used(location),
                RANDOM_EVENT_CAP
            );
        }
        assert_eq!(summary.metrics.events_triggered, 15);
    }

    #[test]
    fn explorer_reaches_the_river_deterministically() {
        let summary = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::Explorer, 3).with_max_steps(6),
        )
        .run();
        assert!(summary.final_state.clue_found);
        assert!(summary.final_state.decoded);
        assert_eq!(summary.metrics.rejections, 0);
        assert!(summary.metrics.narrative_time >= Duration::from_millis(2_500));
    }

    #[test]
    fn peak_state_tracks_the_highest_level() {
        let summary = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::Explorer, 3).with_max_steps(4),
        )
        .run();
        assert_eq!(summary.metrics.max_level, 1);
        let peak = summary.metrics.peak_state.expect("first step captured");
        assert_eq!(peak.player_stats.level, 1);
    }

    #[test]
    fn named_player_is_selected() {
        let session = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::Reckless, 1).with_player("测试员"),
        );
        assert_eq!(
            session.store().roster().current_user().map(|u| u.name.as_str()),
            Some("测试员")
        );
    }

    #[test]
    fn invariants_flag_overflowing_health() {
        let mut state = GameState::default();
        state.player_stats.health = state.player_stats.max_health + 1;
        assert_eq!(check_invariants(&state).len(), 1);
    }
}
