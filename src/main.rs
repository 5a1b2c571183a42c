use clap::{Parser, ValueEnum};
use lifeband::cluster::RunConfig;
use lifeband::grid::InitPattern;
use std::path::PathBuf;
use std::process;

/// Distributed Game of Life over row-band partitioning
#[derive(Parser)]
#[command(name = "lifeband", version)]
struct Cli {
    /// Grid height and width (the grid is square)
    #[arg(value_parser = clap::value_parser!(i64).range(10..=40_000))]
    grid_size: i64,

    /// Number of generations to simulate
    #[arg(value_parser = clap::value_parser!(i64).range(1..=1_000_000))]
    total_iterations: i64,

    /// Gather and emit output every N generations (0 disables)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..=1_000_000))]
    output_step: i64,

    /// Render the gathered grid to the terminal at each output step
    #[arg(long)]
    console: bool,

    /// Write a grayscale JPEG at each output step
    #[arg(long)]
    images: bool,

    /// Directory for image output
    #[arg(long, default_value = "output_images")]
    image_dir: PathBuf,

    /// Print run timings to stderr
    #[arg(long)]
    timing: bool,

    /// Initial pattern
    #[arg(long, value_enum, default_value_t = PatternArg::Random)]
    pattern: PatternArg,

    /// Live-cell probability for the random pattern
    #[arg(long, default_value_t = 0.3)]
    density: f32,

    /// RNG seed for the random pattern (entropy-seeded when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Halt early when snapshot comparison finds a repeating configuration
    #[arg(long)]
    detect_cycles: bool,

    /// Repeats that stabilized at or below this generation are not
    /// persisted as images
    #[arg(long, default_value_t = 100)]
    min_cycle_generation: i64,

    /// Write the final grid as a '1'/'0' text dump to this file
    #[arg(long)]
    dump_final: Option<PathBuf>,

    /// Worker rank count (one thread per rank)
    #[cfg(not(feature = "distributed"))]
    #[arg(long, default_value_t = 3)]
    workers: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    /// Each cell alive with probability --density
    Random,
    /// Every third row alive
    Stripes,
    /// A fixed glider-like seed near the top-left corner
    Spacecraft,
}

impl Cli {
    fn to_config(&self) -> Result<RunConfig, String> {
        let size = self.grid_size as usize;

        if self.console && self.grid_size > 100 {
            eprintln!("Warning: console output for a {size}x{size} grid will be very large");
        }
        if self.images && self.output_step > 0 && self.total_iterations / self.output_step > 10 {
            return Err(format!(
                "these settings would write {} images, the maximum is 10",
                self.total_iterations / self.output_step
            ));
        }

        let pattern = match self.pattern {
            PatternArg::Random => InitPattern::Random,
            PatternArg::Stripes => InitPattern::Stripes(3),
            PatternArg::Spacecraft => InitPattern::Spacecraft {
                offset_y: size / 4,
                offset_x: size / 4,
            },
        };

        Ok(RunConfig {
            height: size,
            width: size,
            total_iterations: self.total_iterations as u32,
            pattern,
            density: self.density,
            seed: self.seed,
            output_step: self.output_step as u32,
            console: self.console,
            images: self.images,
            image_dir: self.image_dir.clone(),
            detect_cycles: self.detect_cycles,
            min_cycle_generation: self.min_cycle_generation.max(0) as u32,
            timing: self.timing,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.to_config().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    run(&cli, config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
}

#[cfg(feature = "distributed")]
fn run(cli: &Cli, config: RunConfig) -> lifeband::error::Result<()> {
    use lifeband::cluster::comm::GridTransport;
    use lifeband::cluster::comm_mpi::MpiTransport;
    use lifeband::cluster::protocol::WireSchema;
    use lifeband::cluster::{coordinator, worker};
    use lifeband::error::LifebandError;

    let universe = mpi::initialize()
        .ok_or_else(|| LifebandError::Topology("MPI initialization failed".into()))?;
    let transport = MpiTransport::new(&universe, WireSchema::new())?;

    if transport.rank() == 0 {
        let outcome = coordinator::run(&transport, &config)?;
        finish(cli, &outcome)?;
    } else {
        worker::run(&transport)?;
    }
    Ok(())
}

#[cfg(not(feature = "distributed"))]
fn run(cli: &Cli, config: RunConfig) -> lifeband::error::Result<()> {
    let outcome = lifeband::cluster::run_threaded(&config, cli.workers)?;
    finish(cli, &outcome)?;
    Ok(())
}

fn finish(cli: &Cli, outcome: &lifeband::cluster::RunOutcome) -> lifeband::error::Result<()> {
    if let Some(path) = &cli.dump_final {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        lifeband::output::write_text(&outcome.grid, &mut writer)?;
    }
    report(outcome);
    Ok(())
}

fn report(outcome: &lifeband::cluster::RunOutcome) {
    match outcome.cycle {
        Some(report) => println!(
            "Stable after {} generations (grid at generation {} repeated generation {}), {} cells alive.",
            outcome.generations,
            report.second_generation,
            report.first_generation,
            outcome.grid.count_alive(),
        ),
        None => println!(
            "Done: {} generations, {} cells alive.",
            outcome.generations,
            outcome.grid.count_alive(),
        ),
    }
}
