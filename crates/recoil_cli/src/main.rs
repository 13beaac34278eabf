//! Recoil CLI
//!
//! Runs a spring headlessly against a manual frame clock and prints what an
//! observer would have seen.

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod config;
mod simulate;

use config::{RecoilConfig, CONFIG_FILE};
use simulate::{simulate, SimulateOptions};

#[derive(Parser, Debug)]
#[command(name = "recoil", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Animate a value from one position to another and print the trajectory
    Simulate(SimulateArgs),
    /// Write a default recoil.toml
    Init {
        /// File or directory to write to
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Starting position
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    from: f64,
    /// Target position
    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    to: f64,
    /// Config file (defaults to ./recoil.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Interval between frames in milliseconds
    #[arg(long)]
    frame_ms: Option<f64>,
    /// Give up after this many frames
    #[arg(long)]
    max_frames: Option<usize>,
    #[arg(long)]
    stiffness: Option<f64>,
    #[arg(long)]
    damping: Option<f64>,
    #[arg(long)]
    mass: Option<f64>,
    #[arg(long)]
    precision: Option<f64>,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

impl SimulateArgs {
    /// Resolve file settings and apply flag overrides on top
    fn options(&self) -> Result<SimulateOptions> {
        let file = match &self.config {
            Some(path) => RecoilConfig::load(path)?,
            None if PathBuf::from(CONFIG_FILE).exists() => {
                RecoilConfig::load(&PathBuf::from(CONFIG_FILE))?
            }
            None => RecoilConfig::default(),
        };
        Ok(self.merge(file))
    }

    fn merge(&self, file: RecoilConfig) -> SimulateOptions {
        let mut spring = file.spring;
        if let Some(stiffness) = self.stiffness {
            spring.stiffness = stiffness;
        }
        if let Some(damping) = self.damping {
            spring.damping = damping;
        }
        if let Some(mass) = self.mass {
            spring.mass = mass;
        }
        if let Some(precision) = self.precision {
            spring.precision = precision;
        }

        SimulateOptions {
            from: self.from,
            to: self.to,
            spring,
            frame_ms: self.frame_ms.unwrap_or(file.simulation.frame_ms),
            max_frames: self.max_frames.unwrap_or(file.simulation.max_frames),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate(args) => run_simulate(&args),
        Command::Init { path } => RecoilConfig::write_default(&path),
    }
}

fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let options = args.options()?;
    if !(options.frame_ms.is_finite() && options.frame_ms > 0.0) {
        anyhow::bail!("--frame-ms must be positive, got {}", options.frame_ms);
    }
    tracing::info!(
        "Simulating {} -> {} with {:?} (damping ratio {:.2})",
        options.from,
        options.to,
        options.spring,
        options.spring.damping / options.spring.critical_damping()
    );

    let trajectory = simulate(&options)?;

    match args.format {
        Format::Text => print!("{trajectory}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&trajectory)?),
    }

    if !trajectory.settled {
        anyhow::bail!(
            "Spring did not come to rest within {} frames",
            options.max_frames
        );
    }
    Ok(())
}
