mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use olympus_game::Settings;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use logic::{SimulationSummary, run_simulation};
use scenarios::{expand_scenarios, find_scenario, list_scenarios};
use util::{parse_start_date, resolve_seeds, split_csv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "olympus-tester", version)]
#[command(about = "Scripted multi-day simulations for the Olympus progression engine")]
struct Args {
    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "steady")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of days to simulate per run
    #[arg(long, default_value_t = 56)]
    days: u32,

    /// First simulated day (YYYY-MM-DD)
    #[arg(long, default_value = "2026-01-05")]
    start_date: String,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Upgrade a persisted settings document to the current schema and exit
    #[arg(long, value_name = "PATH")]
    migrate: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }
    if let Some(path) = args.migrate.as_deref() {
        return migrate_settings(path, args.output.clone());
    }

    announce_banner();

    let start_time = Instant::now();
    let start = parse_start_date(&args.start_date)?;
    let seeds = resolve_seeds(&split_csv(&args.seeds))?;
    let results = run_scenarios(&args, &expand_scenarios(&args.scenarios), &seeds, start);

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed()) {
        std::process::exit(1);
    }
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:15} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn migrate_settings(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut settings = Settings::from_json(&raw)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    settings.normalize(Utc::now());
    let mut output_target = OutputTarget::new(output)?;
    writeln!(output_target.writer(), "{}", settings.to_json()?)?;
    output_target.flush_inner()?;
    Ok(())
}

fn announce_banner() {
    println!("{}", "⚔️  Olympus Progression Tester".bright_cyan().bold());
    println!("{}", "==============================".cyan());
}

fn run_scenarios(
    args: &Args,
    scenario_keys: &[String],
    seeds: &[u64],
    start: chrono::NaiveDate,
) -> Vec<SimulationSummary> {
    let mut results = Vec::new();
    for key in scenario_keys {
        let Some(scenario) = find_scenario(key) else {
            eprintln!("⚠️  Unknown scenario: {}", key.yellow());
            continue;
        };
        for &seed in seeds {
            if args.verbose {
                println!(
                    "🧪 Running scenario: {} (seed {seed}, {} days)",
                    scenario.name.bright_white(),
                    args.days
                );
            }
            let run_start = Instant::now();
            let summary = run_simulation(&scenario, seed, start, args.days);
            log::info!(
                "{key} seed {seed} finished in {:?} with {} violations",
                run_start.elapsed(),
                summary.violations.len()
            );
            results.push(summary);
        }
    }
    results
}

fn write_reports(args: &Args, results: &[SimulationSummary], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => logic::reports::generate_json_report(&mut output_target, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Olympus Simulation Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
