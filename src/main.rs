use anyhow::{Context, Result};
use clap::Parser;
use rusty_logic::components::LogicOutput;
use rusty_logic::{Circuit, CircuitSnapshot, ComponentFactory, LogicValue, SimConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rusty_logic",
    about = "Load a circuit snapshot, run it for a number of rounds and print its probes"
)]
struct Cli {
    /// Circuit snapshot (JSON).
    snapshot: PathBuf,

    /// Number of rounds to evaluate.
    #[arg(short, long, default_value_t = 10)]
    rounds: usize,

    /// Engine settings (JSON); overrides the settings stored in the snapshot.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for random components.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the circuit back out after the last round.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log engine activity at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let snapshot_path = cli.snapshot.to_string_lossy();
    let snapshot = CircuitSnapshot::from_json_file(&snapshot_path)
        .with_context(|| format!("failed to load {}", snapshot_path))?;

    let mut config = match &cli.config {
        Some(path) => SimConfig::from_json_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => snapshot.config.clone().unwrap_or_default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let (mut circuit, report) = ComponentFactory::new().build(&snapshot, config);
    for skipped in report.skipped.iter() {
        eprintln!("skipped component #{} ({}): {}", skipped.index, skipped.kind, skipped.error);
    }
    for skipped in report.skipped_wires.iter() {
        eprintln!("skipped wire #{}: {}", skipped.index, skipped.error);
    }
    for skipped in report.skipped_pending.iter() {
        eprintln!("dropped pending delivery #{}: {}", skipped.index, skipped.error);
    }
    info!(
        "loaded {} components from {}",
        circuit.component_count(),
        snapshot_path
    );

    let probes = probe_names(&circuit);
    if !probes.is_empty() {
        println!("{:>8}  {}", "round", probes.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(" "));
    }

    for _ in 0..cli.rounds {
        let round = circuit.step();
        let levels: Vec<String> = probes
            .iter()
            .map(|(id, name)| {
                let level = circuit
                    .component_as::<LogicOutput>(*id)
                    .map(LogicOutput::last)
                    .unwrap_or(LogicValue::Unknown);
                format!("{:>width$}", level.to_char(), width = name.len())
            })
            .collect();
        print!("{:>8}  {}", round.time.ticks(), levels.join(" "));
        if let Some(warning) = &round.warning {
            print!("  ! {}", warning);
        }
        println!();
        for rejected in round.rejected.iter() {
            eprintln!("rejected event: {}", rejected);
        }
    }

    if let Some(path) = &cli.save {
        circuit
            .snapshot()
            .save_to_file(&path.to_string_lossy())
            .with_context(|| format!("failed to save {}", path.display()))?;
        println!("saved circuit to {}", path.display());
    }

    Ok(())
}

/// Output probes in creation order, named by label where one is set.
fn probe_names(circuit: &Circuit) -> Vec<(rusty_logic::ComponentId, String)> {
    circuit
        .component_ids()
        .into_iter()
        .filter(|id| circuit.component_as::<LogicOutput>(*id).is_some())
        .map(|id| {
            let name = circuit
                .entry(id)
                .and_then(|entry| entry.label().map(str::to_string))
                .unwrap_or_else(|| format!("#{}", circuit.entry(id).map(|e| e.serial()).unwrap_or(0)));
            (id, name)
        })
        .collect()
}
