//! Sensorseal CLI - Command-line interface for anchoring and verifying reading batches.

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod output;

use commands::{balance, gen, init, open, root, run, seal, verify};
use sensorseal_ledger::ThresholdConfig;

#[derive(Parser)]
#[command(name = "sensorseal")]
#[command(about = "Batch, seal, pin and anchor sensor readings on a ledger")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run readings through root, seal, pin and commit, batch by batch
    Run {
        /// Run request or readings array (or stdin if not provided)
        input: Option<String>,
        /// Readings per batch (overrides the request)
        #[arg(long)]
        chunk_size: Option<i64>,
        /// Device account, base58 (overrides the request)
        #[arg(long)]
        device_ref: Option<String>,
        /// Checkpoint account, base58 (overrides the request)
        #[arg(long)]
        checkpoint_ref: Option<String>,
        /// Exit with error code if any batch failed
        #[arg(long)]
        strict: bool,
    },
    /// Compute per-batch Merkle roots without touching the network
    Root {
        /// Run request or readings array (or stdin if not provided)
        input: Option<String>,
        /// Readings per batch (overrides the request)
        #[arg(long)]
        chunk_size: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate deterministic synthetic readings
    Gen {
        /// Number of readings
        #[arg(long)]
        count: u32,
        /// Device id stamped on every reading
        #[arg(long)]
        device_id: Option<String>,
        /// First timestamp, unix seconds or RFC3339 (default: now)
        #[arg(long)]
        start_ts: Option<String>,
        /// RNG seed (default: random)
        #[arg(long)]
        seed: Option<u64>,
        /// Write to FILE instead of stdout
        #[arg(long)]
        output: Option<String>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },
    /// Encrypt a JSON document into an envelope
    Seal {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
    },
    /// Decrypt an envelope back to its JSON document
    Open {
        /// Envelope file (or stdin if not provided)
        input: Option<String>,
    },
    /// Check a commit transaction against a batch of readings
    Verify {
        /// Readings for the batch (or stdin; ignored with --fetch)
        input: Option<String>,
        /// Commit transaction signature, base58
        #[arg(long)]
        signature: String,
        /// Read the batch from the store via the commit memo instead
        #[arg(long)]
        fetch: bool,
        /// Exit with error code unless the roots match
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Derive a device's program accounts, optionally registering them
    Init {
        /// Authority to derive for, base58 (default: the signer)
        #[arg(long)]
        authority: Option<String>,
        /// Highest acceptable CO2, ppm
        #[arg(long, default_value_t = 1000)]
        max_co2_ppm: u32,
        /// Lowest acceptable temperature, centi-degrees C
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        t_min_c_x100: i32,
        /// Highest acceptable temperature, centi-degrees C
        #[arg(long, default_value_t = 3700, allow_negative_numbers = true)]
        t_max_c_x100: i32,
        /// Highest acceptable relative humidity, centi-percent
        #[arg(long, default_value_t = 8500)]
        rh_max_x100: u32,
        /// Send the registration transaction as the signer
        #[arg(long)]
        submit: bool,
    },
    /// Show an account balance (default: the signer)
    Balance {
        /// Account, base58
        account: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,sensorseal=info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            chunk_size,
            device_ref,
            checkpoint_ref,
            strict,
        } => run::run(input, chunk_size, device_ref, checkpoint_ref, strict).await,
        Commands::Root {
            input,
            chunk_size,
            json,
        } => root::run(input, chunk_size, json),
        Commands::Gen {
            count,
            device_id,
            start_ts,
            seed,
            output,
            force,
        } => gen::run(count, device_id, start_ts, seed, output, force),
        Commands::Seal { input } => seal::run(input),
        Commands::Open { input } => open::run(input),
        Commands::Verify {
            input,
            signature,
            fetch,
            strict,
            json,
        } => verify::run(input, signature, fetch, strict, json).await,
        Commands::Init {
            authority,
            max_co2_ppm,
            t_min_c_x100,
            t_max_c_x100,
            rh_max_x100,
            submit,
        } => {
            let cfg = ThresholdConfig {
                max_co2_ppm,
                t_min_c_x100,
                t_max_c_x100,
                rh_max_x100,
            };
            init::run(authority, cfg, submit).await
        }
        Commands::Balance { account } => balance::run(account).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
