//! Startline - countdown latch starting-line experiments
//!
//! CLI entry point for running race protocols against delay scenarios.

use std::io::IsTerminal;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use startline::cli::{Cli, Command, OutputFormat};
use startline::config::Config;
use startline::protocol::ProtocolKind;
use startline::scenario::{MatrixPlan, RoundOutcome, Scenario, ScenarioReport, run_matrix};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_thread_names(true)
        .init();

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            protocols,
            scenarios,
            runners,
            delay,
            judge_delay,
            runner_delay,
            rounds,
            format,
        } => {
            let config = Config {
                runners: runners.unwrap_or(config.runners),
                delay_ms: delay.unwrap_or(config.delay_ms),
                rounds: rounds.unwrap_or(config.rounds),
                protocols: if protocols.is_empty() { config.protocols } else { protocols },
                ..config
            };
            config.validate().context("Invalid run settings")?;

            let scenarios = if judge_delay.is_some() || runner_delay.is_some() {
                vec![Scenario::new(
                    "custom",
                    judge_delay.unwrap_or(0),
                    runner_delay.unwrap_or(0),
                )]
            } else if scenarios.is_empty() {
                Scenario::standard_set(config.delay_ms)
            } else {
                scenarios.iter().map(|kind| kind.scenario(config.delay_ms)).collect()
            };

            cmd_run(&config, scenarios, format)
        }
        Command::Protocols => {
            cmd_protocols();
            Ok(())
        }
    }
}

fn cmd_run(config: &Config, scenarios: Vec<Scenario>, format: OutputFormat) -> Result<()> {
    let plan = MatrixPlan {
        runners: config.runners,
        rounds: config.rounds,
        protocols: config.protocols.clone(),
        scenarios,
    };
    info!(
        runners = plan.runners,
        rounds = plan.rounds,
        protocols = plan.protocols.len(),
        scenarios = plan.scenarios.len(),
        "cmd_run: starting"
    );

    let reports = run_matrix(&plan);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports).context("Failed to serialize reports")?;
            println!("{}", json);
        }
        OutputFormat::Text => print_reports(&reports),
    }
    Ok(())
}

fn print_reports(reports: &[ScenarioReport]) {
    let mut previous: Option<ProtocolKind> = None;
    for report in reports {
        if previous.is_some_and(|p| p != report.protocol) {
            println!();
        }
        previous = Some(report.protocol);

        println!(
            "Running {} using amount of runners: {}, judge delay: {} (ms), runner delay: {} (ms) [{}]",
            report.protocol_name.bold(),
            report.runners,
            report.scenario.judge_delay_ms,
            report.scenario.runner_delay_ms,
            report.scenario.name.dimmed()
        );

        for (round, outcome) in report.rounds.iter().enumerate() {
            let prefix = if report.rounds.len() > 1 {
                format!("\t[{}] ", round + 1)
            } else {
                "\t".to_string()
            };
            match outcome {
                RoundOutcome::Completed { missed: 0 } => {
                    println!("{}Amount of runners (threads) that missed their start: {}", prefix, "0".green());
                }
                RoundOutcome::Completed { missed } => {
                    println!(
                        "{}Amount of runners (threads) that missed their start: {}",
                        prefix,
                        missed.to_string().red()
                    );
                }
                RoundOutcome::Aborted => {
                    println!(
                        "{}{}",
                        prefix,
                        "Race failure. A participant was interrupted before the race completed.".red()
                    );
                }
                RoundOutcome::Skipped => {
                    println!("{}{}", prefix, "Skipped: this judge aborted an earlier race.".yellow());
                }
            }
        }

        if report.rounds.len() > 1
            && let Some(mean) = report.summary.mean_missed
        {
            println!(
                "\tmissed min/mean/max: {}/{:.1}/{} over {} completed race(s)",
                report.summary.min_missed.unwrap_or(0),
                mean,
                report.summary.max_missed.unwrap_or(0),
                report.summary.completed
            );
        }
    }
}

fn cmd_protocols() {
    for kind in ProtocolKind::ALL {
        println!("{:<16} {}", kind.to_string().cyan(), kind.description());
    }
}
