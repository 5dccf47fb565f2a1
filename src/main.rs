use anyhow::Result;
use clap::Parser;
use ising_binning::lattice::{square_lattice::SquareLattice, Lattice};
use ising_binning::monte_carlo::single_spin_flip::{self, CampaignSettings};
use ising_binning::random;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run one Metropolis measurement campaign on a periodic square Ising lattice.
#[derive(Parser, Debug)]
#[command(name = "ising-binning", version)]
struct Cli {
    /// Linear size of the lattice
    #[arg(long, default_value_t = 32)]
    size: usize,
    /// Temperature in units of the coupling
    #[arg(short, long, default_value_t = 1.0)]
    temperature: f64,
    /// Number of binning levels, 2^levels measurements are taken
    #[arg(short, long, default_value_t = 12)]
    levels: usize,
    /// Metropolis steps before the first measurement
    #[arg(long, default_value_t = 1_000_000)]
    warmup_steps: u64,
    /// Metropolis steps between two measurements
    #[arg(long, default_value_t = 1_000)]
    steps_between: u64,
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut rng = random::random_source(cli.seed);
    let lattice = SquareLattice::new_random(cli.size, cli.temperature, &mut rng)?;
    info!("{}", lattice.describe());

    let settings = CampaignSettings::new(cli.warmup_steps, cli.steps_between, cli.levels);
    let (_, result) = single_spin_flip::measurement_campaign(lattice, &settings, &mut rng)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    print!("{}", result.to_result_line());
    Ok(())
}
