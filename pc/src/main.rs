//! pcal - prompt strategy calibration CLI

use std::fs;
use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use promptcal::cli::{Cli, Command, get_log_path};
use promptcal::config::Config;
use promptcal::llm::create_client;
use promptcal::runner::write_report;
use promptcal::{CalibrationRunner, MappingStore, Parameters, RunOptions, ServerCalibrationReport, Strategy};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir).context("Failed to create log directory")?;
    }

    // CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("promptcal loaded config: {} servers", config.servers.len());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Calibrate {
            server,
            all,
            dry_run,
            report,
        } => {
            debug!(?server, all, dry_run, ?report, "main: matched Calibrate command");
            cmd_calibrate(&config, server.as_deref(), dry_run, report.as_deref()).await
        }
        Command::Servers => {
            debug!("main: matched Servers command");
            cmd_servers(&config)
        }
        Command::Strategies => {
            debug!("main: matched Strategies command");
            cmd_strategies()
        }
        Command::Show { server } => {
            debug!(?server, "main: matched Show command");
            cmd_show(&config, server.as_deref())
        }
        Command::Prompt { server, tool, params } => {
            debug!(%server, %tool, "main: matched Prompt command");
            cmd_prompt(&config, &server, &tool, params.as_deref())
        }
    }
}

/// Calibrate one server (or all when `server` is None)
async fn cmd_calibrate(config: &Config, server: Option<&str>, dry_run: bool, report: Option<&Path>) -> Result<()> {
    debug!(?server, dry_run, "cmd_calibrate: called");
    if let Some(name) = server {
        config.server(name)?;
    }
    config.validate()?;

    let llm = create_client(&config.llm)?;
    let runner = CalibrationRunner::new(config.clone(), llm);
    let options = RunOptions { dry_run };

    let calibrated = match server {
        Some(name) => {
            println!("Calibrating {} ...", name.cyan());
            let result = runner.run_server(name, &options).await?;
            print_report(&result);
            if let Some(path) = report {
                write_report(path, &result)?;
            }
            1
        }
        None => {
            println!("Calibrating {} servers ...", config.servers.len());
            let results = runner.run_all(&options).await?;
            for result in &results {
                print_report(result);
            }
            let skipped = config.servers.len() - results.len();
            if skipped > 0 {
                println!(
                    "{} {} server(s) could not be calibrated, see {}",
                    "!".yellow(),
                    skipped,
                    get_log_path().display()
                );
            }
            if let Some(path) = report {
                write_report(path, &results)?;
            }
            results.len()
        }
    };

    println!("{}", save_summary(dry_run, calibrated, runner.store().path()));
    Ok(())
}

fn save_summary(dry_run: bool, calibrated: usize, mapping_path: &Path) -> String {
    if dry_run {
        "Dry run: mapping not saved".dimmed().to_string()
    } else if calibrated == 0 {
        "No server calibrated: mapping not saved".yellow().to_string()
    } else {
        format!("Mapping saved to {}", mapping_path.display())
    }
}

fn print_report(report: &ServerCalibrationReport) {
    println!(
        "\n{} {} ({} of {} tools mapped)",
        "Server".bold(),
        report.server_name.cyan(),
        report.mapping.len(),
        report.tool_count
    );

    for outcome in &report.outcomes {
        let marks: Vec<String> = outcome
            .results
            .iter()
            .map(|r| {
                if r.success {
                    format!("{} {}ms", "✓".green(), r.duration_millis)
                } else {
                    format!("{}", "✗".red())
                }
            })
            .collect();

        let best = if outcome.all_failed {
            format!("{} (all failed)", outcome.best_strategy).red().to_string()
        } else {
            outcome.best_strategy.to_string().green().to_string()
        };

        println!(
            "  {:<32} {:<28} {:>3}%  {}",
            outcome.tool_name,
            best,
            outcome.success_rate,
            marks.join("  ").dimmed()
        );
    }

    if !report.strategy_distribution.is_empty() {
        let dist: Vec<String> = report
            .strategy_distribution
            .iter()
            .map(|(s, n)| format!("{}={}", s, n))
            .collect();
        println!("  {} {}", "Distribution:".dimmed(), dist.join(", "));
    }
}

/// List configured servers
fn cmd_servers(config: &Config) -> Result<()> {
    debug!("cmd_servers: called");
    if config.servers.is_empty() {
        println!("No servers configured");
        return Ok(());
    }

    for (name, server) in &config.servers {
        let catalog = match &server.tools {
            Some(tools) => format!("{} static tools", tools.len()),
            None => "tools discovered".to_string(),
        };
        println!(
            "{}  {} {}  {}",
            name.cyan(),
            server.command,
            server.args.join(" "),
            format!("({})", catalog).dimmed()
        );
    }
    Ok(())
}

/// List strategies in registration order
fn cmd_strategies() -> Result<()> {
    debug!("cmd_strategies: called");
    for (i, strategy) in Strategy::ALL.iter().enumerate() {
        let marker = if *strategy == Strategy::FALLBACK {
            " (fallback)".yellow().to_string()
        } else {
            String::new()
        };
        println!("{}. {}{}  {}", i + 1, strategy.name().green(), marker, strategy.summary().dimmed());
    }
    Ok(())
}

/// Print the saved mapping
fn cmd_show(config: &Config, server: Option<&str>) -> Result<()> {
    debug!(?server, "cmd_show: called");
    let store = MappingStore::new(config.storage.mapping_path.clone());
    let mappings = store.load();

    let selected: Vec<_> = mappings
        .iter()
        .filter(|(name, _)| server.is_none_or(|s| s == name.as_str()))
        .collect();

    if selected.is_empty() {
        match server {
            Some(s) => println!("No calibration saved for {}", s),
            None => println!("No calibrations saved in {}", store.path().display()),
        }
        return Ok(());
    }

    for (name, mapping) in selected {
        println!("{} {}", name.cyan(), format!("(calibrated {})", mapping.last_calibrated).dimmed());
        for (tool, strategy) in &mapping.tools {
            println!("  {:<32} {}", tool, strategy.green());
        }
    }
    Ok(())
}

/// Render a tool instruction with its calibrated strategy
fn cmd_prompt(config: &Config, server: &str, tool: &str, params: Option<&str>) -> Result<()> {
    debug!(%server, %tool, "cmd_prompt: called");
    let parameters = parse_params(params)?;

    let store = MappingStore::new(config.storage.mapping_path.clone());
    let calibrated = store.load().get(server).and_then(|m| m.strategy(tool));
    let strategy = calibrated.unwrap_or(Strategy::FALLBACK);

    let origin = if calibrated.is_some() { "calibrated" } else { "fallback" };
    println!("{}", format!("# strategy: {} ({})", strategy, origin).dimmed());
    println!("{}", strategy.render(tool, &parameters));
    Ok(())
}

fn parse_params(params: Option<&str>) -> Result<Parameters> {
    match params {
        None => Ok(Parameters::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw).context("Invalid --params JSON")? {
            Value::Object(map) => Ok(map),
            other => Err(eyre::eyre!("--params must be a JSON object, got {}", other)),
        },
    }
}
