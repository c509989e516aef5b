mod commands;

use clap::{Parser, Subcommand};
use rafflepool_core::RaffleError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rafflepool")]
#[command(about = "Periodically settled prize pool, driven against a mock randomness coordinator")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single round: enter participants, settle, show the outcome
    Simulate {
        /// Number of participants entering the round
        #[arg(short, long, default_value_t = 3)]
        participants: u64,

        /// Tickets bought by each participant
        #[arg(short, long, default_value_t = 1)]
        tickets: u64,

        /// Entry fee in satoshis
        #[arg(short, long, default_value_t = 10_000)]
        entry_fee: u64,

        /// Seed for the mock coordinator (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Settle consecutive rounds with a keeper-style trigger loop
    Run {
        /// Number of rounds to settle
        #[arg(short, long, default_value_t = 3)]
        rounds: u32,

        /// Participants entering each round
        #[arg(short, long, default_value_t = 3)]
        participants: u64,

        /// Entry fee in satoshis
        #[arg(short, long, default_value_t = 10_000)]
        entry_fee: u64,

        /// Settlement interval in seconds
        #[arg(short, long, default_value_t = 2)]
        interval: u64,

        /// Seed for the mock coordinator (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "rafflepool={},rafflepool_core={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match cli.command {
        Commands::Simulate {
            participants,
            tickets,
            entry_fee,
            seed,
            json,
        } => commands::simulate(participants, tickets, entry_fee, seed, json).await,
        Commands::Run {
            rounds,
            participants,
            entry_fee,
            interval,
            seed,
        } => commands::run_rounds(rounds, participants, entry_fee, interval, seed).await,
    };

    if let Err(e) = result {
        match e {
            RaffleError::UpkeepNotNeeded(reason) => {
                eprintln!("Error: settlement is not ready: {}", reason);
            }
            RaffleError::InsufficientEntryFee { need, paid } => {
                eprintln!("Error: entry fee too low");
                eprintln!("Need: {} sats, Paid: {} sats", need, paid);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
