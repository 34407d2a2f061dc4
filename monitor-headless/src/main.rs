use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use fds_monitor_core::{
    device_traces, group_levels, ElevationChoice, Monitor, MonitorConfig, MonitorError,
    MonitorInputs, RunSnapshot,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Progress report for a running FDS job
#[derive(Parser, Debug)]
#[command(name = "fds-monitor")]
#[command(about = "Summarise the progress and devices of an FDS run", long_about = None)]
struct Args {
    /// Heat release rate table (`CHID_hrr.csv`)
    #[arg(long)]
    hrr: Option<PathBuf>,

    /// Control state table (`CHID_ctrl.csv`)
    #[arg(long)]
    ctrl: Option<PathBuf>,

    /// Device readings table (`CHID_devc.csv`)
    #[arg(long)]
    devc: Option<PathBuf>,

    /// Solver log (`CHID.out`)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Number of elevation levels (default: silhouette-selected)
    #[arg(short, long)]
    levels: Option<usize>,

    /// Seed for the k-means initialisation
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full snapshot as JSON instead of a report
    #[arg(long)]
    json: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Config(#[source] serde_json::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut config = args
        .config
        .as_deref()
        .map(load_config)
        .transpose()?
        .unwrap_or_default();
    if let Some(k) = args.levels {
        config.elevation_groups = Some(k);
    }
    if let Some(seed) = args.seed {
        config.kmeans.seed = seed;
    }
    debug!(?config, "resolved config");

    let inputs = MonitorInputs {
        hrr: read_optional(args.hrr.as_deref())?,
        ctrl: read_optional(args.ctrl.as_deref())?,
        devc: read_optional(args.devc.as_deref())?,
        log: read_optional(args.out.as_deref())?,
    };

    let snapshot = Monitor::from_config(&config).run(&inputs, &config)?;
    if args.json {
        let encoded = serde_json::to_string_pretty(&*snapshot).map_err(CliError::Encode)?;
        println!("{encoded}");
    } else {
        print_report(&snapshot);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<MonitorConfig, CliError> {
    serde_json::from_str(&read(path)?).map_err(CliError::Config)
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: Option<&Path>) -> Result<Option<String>, CliError> {
    path.map(read).transpose()
}

fn elevation_line(choice: &ElevationChoice) -> String {
    let default = choice
        .default_k
        .map_or_else(|| "none".to_string(), |k| k.to_string());
    format!(
        "Elevation levels: {} (default {}, max {})",
        choice.k, default, choice.max_k
    )
}

fn print_report(snapshot: &RunSnapshot) {
    println!("=== FDS Run Monitor ===\n");

    let progress = &snapshot.progress;
    if let Some(summary) = progress.summary() {
        println!("{summary}");
    } else {
        println!(
            "Start {} s, current {} s, end {} s",
            progress.start, progress.current, progress.end
        );
    }
    if !progress.is_ordered() {
        println!("Warning: current time lies outside the run bounds");
    }

    if let Some(last) = snapshot.timesteps.last() {
        println!("\nTimesteps logged: {}", snapshot.timesteps.len());
        println!("Latest step size: {:.3e} s at {:.2} s", last.size, last.time);
    }

    if let Some(choice) = &snapshot.elevation {
        println!("\n{}", elevation_line(choice));
    }

    if !snapshot.groups.is_empty() {
        println!("\n=== Device Groups ===");
        for group in &snapshot.groups {
            println!("\n{} ({} devices)", group.title(), group.ids.len());
            for part in group_levels(group, &snapshot.devices) {
                let label = part
                    .level
                    .map_or_else(|| "all".to_string(), |l| format!("level {}", l + 1));
                let traces = device_traces(&snapshot.devc, &part.ids);
                let latest: Vec<String> = part
                    .ids
                    .iter()
                    .filter_map(|id| traces.iter().rev().find(|t| t.id == *id))
                    .map(|t| format!("{}={:.1}", t.id, t.value))
                    .collect();
                if latest.is_empty() {
                    println!("  {label:>8}: {}", part.ids.join(", "));
                } else {
                    println!("  {label:>8}: {}", latest.join(", "));
                }
            }
        }
    }

    if !snapshot.activations.is_empty() {
        println!("\n=== CTRL Timeline ===");
        println!("  # | Time(s) | CTRL");
        println!("----|---------|-----------------");
        for event in &snapshot.activations {
            println!("{:3} | {:7.1} | {}", event.sequence, event.time, event.ctrl);
        }
    }

    let notices = snapshot.notices();
    if !notices.is_empty() {
        println!();
        for notice in notices {
            println!("{notice}");
        }
    }
}
