use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use pn_core::PoreId;
use pn_net::{Network, NetworkBuilder};
use pn_percolation::{
    InvasionPercolation, OrdinaryPercolation, PercolationCurve, PressurePoints, Spacing,
    StopCondition, apply_trapping,
};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "pn-cli")]
#[command(about = "Porenet CLI - Pore-network percolation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a network description file
    Validate {
        /// Path to the network YAML file
        network_path: PathBuf,
    },
    /// Run an ordinary percolation pressure sweep (drainage curve)
    Drainage {
        /// Path to the network YAML file
        network_path: PathBuf,
        /// Number of sampled pressure points
        #[arg(long, default_value_t = 25)]
        points: usize,
        /// Spacing of sampled pressure points
        #[arg(long, value_enum, default_value = "linear")]
        spacing: SpacingArg,
        /// Report residual trapping at the final pressure (needs outlets)
        #[arg(long)]
        trapping: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run invasion percolation
    Invade {
        /// Path to the network YAML file
        network_path: PathBuf,
        /// Stop after this many invaded pores (default: run to completion)
        #[arg(long)]
        stop_after: Option<usize>,
        /// Apply the trapping post-process (needs outlets)
        #[arg(long)]
        trapping: bool,
        /// Output CSV file path for the intrusion curve (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the full invasion report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SpacingArg {
    Linear,
    Log,
}

impl From<SpacingArg> for Spacing {
    fn from(arg: SpacingArg) -> Self {
        match arg {
            SpacingArg::Linear => Spacing::Linear,
            SpacingArg::Log => Spacing::Log,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse network file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid network: {0}")]
    Network(#[from] pn_core::CoreError),

    #[error("{0}")]
    Percolation(#[from] pn_percolation::PercolationError),

    #[error("{0}")]
    Input(String),
}

type CliResult<T> = Result<T, CliError>;

/// On-disk network description. The core owns no file format; this schema
/// belongs to the CLI.
#[derive(Debug, Deserialize)]
struct NetworkFile {
    /// Pore count; optional when `coords` is given.
    #[serde(default)]
    pores: Option<u32>,
    /// Pore centroids; optional.
    #[serde(default)]
    coords: Option<Vec<[f64; 3]>>,
    /// Throat endpoint pairs.
    conns: Vec<[u32; 2]>,
    /// Capillary entry pressure per throat.
    entry_pressures: Vec<f64>,
    #[serde(default)]
    inlets: Vec<u32>,
    #[serde(default)]
    outlets: Vec<u32>,
    #[serde(default)]
    pore_volumes: Option<Vec<f64>>,
    #[serde(default)]
    throat_volumes: Option<Vec<f64>>,
}

impl NetworkFile {
    fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    fn pore_count(&self) -> CliResult<u32> {
        match (self.pores, &self.coords) {
            (Some(n), _) => Ok(n),
            (None, Some(coords)) => Ok(coords.len() as u32),
            (None, None) => Err(CliError::Input(
                "network file needs either `pores` or `coords`".into(),
            )),
        }
    }

    fn build(&self) -> CliResult<Network> {
        let mut builder = NetworkBuilder::new();
        builder.add_pores(self.pore_count()?);
        for &[a, b] in &self.conns {
            builder.add_throat(PoreId::from_index(a), PoreId::from_index(b));
        }
        if let Some(coords) = &self.coords {
            builder.set_coords(coords.clone());
        }
        Ok(builder.build()?)
    }

    fn inlet_ids(&self) -> Vec<PoreId> {
        self.inlets.iter().map(|&i| PoreId::from_index(i)).collect()
    }

    fn outlet_ids(&self) -> Vec<PoreId> {
        self.outlets.iter().map(|&i| PoreId::from_index(i)).collect()
    }
}

fn main() -> CliResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { network_path } => cmd_validate(&network_path),
        Commands::Drainage {
            network_path,
            points,
            spacing,
            trapping,
            output,
        } => cmd_drainage(&network_path, points, spacing, trapping, output.as_deref()),
        Commands::Invade {
            network_path,
            stop_after,
            trapping,
            output,
            json,
        } => cmd_invade(
            &network_path,
            stop_after,
            trapping,
            output.as_deref(),
            json.as_deref(),
        ),
    }
}

fn cmd_validate(network_path: &Path) -> CliResult<()> {
    println!("Validating network: {}", network_path.display());
    let file = NetworkFile::load(network_path)?;
    let net = file.build()?;
    println!(
        "✓ Network is valid ({} pores, {} throats, {} inlets, {} outlets)",
        net.pore_count(),
        net.throat_count(),
        file.inlets.len(),
        file.outlets.len()
    );
    Ok(())
}

fn cmd_drainage(
    network_path: &Path,
    points: usize,
    spacing: SpacingArg,
    trapping: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let file = NetworkFile::load(network_path)?;
    let net = file.build()?;

    let mut alg = OrdinaryPercolation::new(&net, &file.entry_pressures)?;
    alg.set_inlets(&file.inlet_ids())?;
    if let (Some(pore), Some(throat)) = (&file.pore_volumes, &file.throat_volumes) {
        alg.set_volumes(pore.clone(), throat.clone())?;
    }

    let started = Instant::now();
    let curve = alg.run(&PressurePoints::Sampled {
        count: points,
        spacing: spacing.into(),
    })?;
    eprintln!(
        "✓ Drainage sweep completed: {} points in {:.3}s",
        curve.len(),
        started.elapsed().as_secs_f64()
    );

    write_curve_csv(&curve, output)?;

    if trapping {
        let outlets = file.outlet_ids();
        let top = curve
            .points()
            .last()
            .map(|p| p.pressure)
            .unwrap_or_default();
        let (pore_trapped, throat_trapped) = alg.trapped_at(top, &outlets)?;
        eprintln!(
            "  Residual at {:.4}: {} trapped pores, {} trapped throats",
            top,
            pore_trapped.iter().filter(|&&b| b).count(),
            throat_trapped.iter().filter(|&&b| b).count()
        );
    }

    Ok(())
}

fn cmd_invade(
    network_path: &Path,
    stop_after: Option<usize>,
    trapping: bool,
    output: Option<&Path>,
    json: Option<&Path>,
) -> CliResult<()> {
    let file = NetworkFile::load(network_path)?;
    let net = file.build()?;

    let mut alg = InvasionPercolation::new(&net, &file.entry_pressures)?;
    alg.set_inlets(&file.inlet_ids())?;
    if let (Some(pore), Some(throat)) = (&file.pore_volumes, &file.throat_volumes) {
        alg.set_volumes(pore.clone(), throat.clone())?;
    }

    let stop = match stop_after {
        Some(n) => StopCondition::InvadedPores(n),
        None => StopCondition::Complete,
    };
    let started = Instant::now();
    alg.run(stop)?;
    eprintln!(
        "✓ Invasion completed: {} of {} pores invaded in {:.3}s",
        alg.invaded_pore_count(),
        net.pore_count(),
        started.elapsed().as_secs_f64()
    );

    let curve = alg.intrusion_curve()?;
    write_curve_csv(&curve, output)?;

    let mut report = alg.report()?;
    if trapping {
        let outcome = apply_trapping(&alg, &file.outlet_ids())?;
        eprintln!(
            "  Trapping: {} trapped pores, {} trapped throats",
            outcome.trapped_pore_count(),
            outcome.trapped_throat_count()
        );
        report = report.with_trapping(&outcome);
    }

    if let Some(json_path) = json {
        fs::write(json_path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("  Report written to {}", json_path.display());
    }

    Ok(())
}

fn write_curve_csv(curve: &PercolationCurve, output: Option<&Path>) -> CliResult<()> {
    let mut csv = String::from("pressure,saturation\n");
    for point in curve.points() {
        csv.push_str(&format!("{},{}\n", point.pressure, point.saturation));
    }
    match output {
        Some(path) => {
            fs::write(path, csv)?;
            eprintln!("  Curve written to {}", path.display());
        }
        None => {
            io::stdout().write_all(csv.as_bytes())?;
        }
    }
    Ok(())
}
