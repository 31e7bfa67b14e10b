mod logic;
mod scenario;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::{LogicTester, RunBackend};
use scenario::{all_scenario_keys, find_scenario, list_scenarios};

#[derive(Debug, Parser)]
#[command(name = "treasure-tester", version = "0.1.0")]
#[command(about = "Automated logic testing for the treasure hunt engine - scripted full-game runs")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep saves as JSON files under this directory instead of in memory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Wait out narrative delays on the wall clock
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = parse_seeds(&args.seeds)?;

    let all_results = run_logic_scenarios(&args, &scenarios, &seeds);

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut out = open_output(args.output.as_deref())?;
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:25} - {description}")?;
    }
    out.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Treasure Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Replace `all` with every registered key, dropping repeats.
fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for name in split_csv(scenarios_arg) {
        let names = if name == "all" { all_scenario_keys() } else { vec![name] };
        for name in names {
            if !expanded.contains(&name) {
                expanded.push(name);
            }
        }
    }
    expanded
}

fn parse_seeds(seeds_arg: &str) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in split_csv(seeds_arg) {
        let Ok(seed) = token.parse::<u64>() else {
            bail!("invalid seed '{token}'");
        };
        seeds.push(seed);
    }
    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
) -> Vec<logic::ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(args.verbose).with_backend(RunBackend {
        save_dir: args.save_dir.clone(),
        realtime: args.realtime,
    });

    let mut results = Vec::new();
    for name in scenarios {
        let Some(scenario) = find_scenario(name) else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            continue;
        };
        results.extend(tester.run_scenario(&scenario, seeds, args.iterations));
    }
    results
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut out = open_output(args.output.as_deref())?;
    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut out, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut out, results)?,
        _ if results.is_empty() => writeln!(out, "No logic scenarios executed.")?,
        _ => logic::reports::generate_console_report(&mut out, results, start_time.elapsed())?,
    }

    writeln!(out)?;
    writeln!(out, "🏁 Total time: {:?}", start_time.elapsed())?;
    out.flush()?;
    Ok(())
}

/// Buffered stdout, or the `--output` file when one is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(stdout())),
    };
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            save_dir: None,
            realtime: false,
        }
    }

    fn temp_file(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("treasure-tester-{label}-{}", std::process::id()))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("all,smoke");
        assert_eq!(expanded[0], "smoke");
        assert!(expanded.contains(&"event-caps".to_string()));
        assert_eq!(expanded.len(), all_scenario_keys().len());
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("leveling, smoke,leveling");
        assert_eq!(expanded, vec!["leveling".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn parse_seeds_rejects_garbage() {
        assert_eq!(parse_seeds("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_seeds("1,abc").is_err());
        assert!(parse_seeds(" , ").is_err());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_file("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("[]"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("treasure-hunt"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let results = run_logic_scenarios(&base_args(), &["nope".to_string()], &[1]);
        assert!(results.is_empty());
    }
}
