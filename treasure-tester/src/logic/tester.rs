use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use treasure_game::{FileGateway, ManualClock, MemoryGateway, SystemClock};

use crate::logic::simulation::{
    SimulationConfig, SimulationPlan, SimulationSession, SimulationSummary,
};
use crate::scenario::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub treasures_found: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Where runs keep their saves and how narrative delays pass.
#[derive(Debug, Clone, Default)]
pub struct RunBackend {
    /// Write saves under this directory instead of memory.
    pub save_dir: Option<PathBuf>,
    /// Sleep through narrative delays on the wall clock.
    pub realtime: bool,
}

impl RunBackend {
    fn run(&self, label: &str, config: SimulationConfig) -> Result<SimulationSummary> {
        let Some(dir) = &self.save_dir else {
            return Ok(if self.realtime {
                SimulationSession::with_backends(config, MemoryGateway::new(), SystemClock).run()
            } else {
                SimulationSession::new(config).run()
            });
        };

        // Each run starts from an empty slot directory of its own.
        let root = dir.join(format!("{}-seed-{}", slug(label), config.seed));
        if root.exists() {
            fs::remove_dir_all(&root)
                .with_context(|| format!("failed to clear {}", root.display()))?;
        }
        let gateway = FileGateway::open(&root)
            .with_context(|| format!("failed to open save dir {}", root.display()))?;
        Ok(if self.realtime {
            SimulationSession::with_backends(config, gateway, SystemClock).run()
        } else {
            SimulationSession::with_backends(config, gateway, ManualClock::default()).run()
        })
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect()
}

pub struct LogicTester {
    verbose: bool,
    backend: RunBackend,
}

impl LogicTester {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            backend: RunBackend::default(),
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: RunBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut treasures = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let summary = match self
                .backend
                .run(&scenario.name, scenario.plan.config(iteration_seed))
            {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1));
                    continue;
                }
            };
            if summary.treasure_found() {
                treasures += 1;
            }

            if let Some(err) = evaluate_expectations(&scenario.plan, &summary) {
                let context = summarize_decision_path(&summary);
                let stats = &summary.final_state.player_stats;
                failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, steps {}, location {}): {} | {} | final HP {}/{} Lv {} Gold {}",
                    i + 1,
                    summary.strategy,
                    summary.seed,
                    summary.metrics.steps,
                    summary.final_state.current_location,
                    err,
                    context,
                    stats.health,
                    stats.max_health,
                    stats.level,
                    stats.gold
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                    println!("     ↳ Seed {} | Decisions: {}", summary.seed, context);
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) steps:{} level:{} treasure:{}",
                        i + 1,
                        iterations,
                        summary.metrics.steps,
                        summary.final_state.player_stats.level,
                        summary.treasure_found()
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            treasures_found: treasures,
            failures,
            average_duration,
            performance_data,
        }
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    if let Some(first) = summary.violations.first() {
        return Some(format!(
            "{} invariant violation(s), first: {first}",
            summary.violations.len()
        ));
    }
    for expectation in &plan.expectations {
        if let Err(err) = expectation(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_decision_path(summary: &SimulationSummary) -> String {
    if summary.metrics.decision_log.is_empty() {
        return "no decisions recorded".to_string();
    }

    summary
        .metrics
        .decision_log
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            let rationale = entry
                .rationale
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("-");
            let outcome = entry.rejection.as_deref().unwrap_or("ok");
            format!(
                "step {} ({}): {} [{}] {} reason {}",
                entry.step, entry.location, entry.intent, entry.policy_name, outcome, rationale
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
