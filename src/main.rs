use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rflow::app_logic;
use rflow::matrix::MatrixParams;
use rflow::reducer::compute_matrix;
use rflow::timeseries::{read_history, Format, ParseConfig};

#[derive(Parser)]
#[command(
    name = "rflow",
    version,
    about = "Streaming rainflow cycle counting for fatigue assessment",
    after_help = "Logging follows RUST_LOG when set; otherwise -v and -vv raise the level."
)]
struct Cli {
    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every load case of a YAML or TOML configuration
    Run {
        #[arg(short, long)]
        config: String,
    },
    /// Stream the cycles of one history to stdout as CSV
    Cycles {
        #[command(flatten)]
        input: Input,
    },
    /// Print the rainflow matrix of one history as JSON
    Matrix {
        #[command(flatten)]
        input: Input,
        /// Number of amplitude bins
        #[arg(long)]
        amp_bins: usize,
        /// Number of mean value bins
        #[arg(long)]
        mean_bins: usize,
        /// Lower edge of the first mean bin
        #[arg(long, allow_negative_numbers = true)]
        mean_min: f64,
        /// Lower edge of the first amplitude bin
        #[arg(long, default_value_t = 0.0)]
        amp_min: f64,
        #[arg(long)]
        mean_bin_size: f64,
        #[arg(long)]
        amp_bin_size: f64,
    },
}

#[derive(clap::Args)]
struct Input {
    /// Load history file
    file: PathBuf,
    #[arg(long, value_enum, default_value = "lines")]
    format: Format,
    /// Zero-based CSV column holding the samples
    #[arg(long, default_value_t = 0)]
    column: usize,
    /// Leading records to skip
    #[arg(long, default_value_t = 0)]
    header: usize,
}

impl Input {
    fn open(&self) -> Result<rflow::timeseries::History> {
        let parse = ParseConfig {
            header: self.header,
            ..ParseConfig::default()
        };
        read_history(&self.file, self.format, self.column, &parse)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config } => {
            let reports = app_logic::run(&config)?;
            serde_json::to_writer_pretty(io::stdout().lock(), &reports)?;
            println!();
        }
        Commands::Cycles { input } => {
            let history = input.open()?;
            app_logic::write_cycles(history, BufWriter::new(io::stdout().lock()))?;
        }
        Commands::Matrix {
            input,
            amp_bins,
            mean_bins,
            mean_min,
            amp_min,
            mean_bin_size,
            amp_bin_size,
        } => {
            let params = MatrixParams {
                amp_bin_count: amp_bins,
                mean_bin_count: mean_bins,
                mean_min,
                amp_min,
                mean_bin_size,
                amp_bin_size,
            };
            // reject bad bins before the file is even opened
            params.validate()?;
            let matrix = compute_matrix(input.open()?, &params)?;
            app_logic::write_matrix(&params, &matrix, io::stdout().lock())?;
        }
    }
    Ok(())
}
