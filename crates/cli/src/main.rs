mod commands;
mod config;
mod logging;

use anyhow::Result;
use bills_core::application::RecordStore;
use bills_core::domain::BillingPeriod;
use bills_core::ports::BillRepository;
use clap::{Parser, Subcommand};
use commands::NewBill;
use config::{AppConfig, Backend};
use json_file_adapter::JsonFileRepository;
use remote_adapter::RemoteJsonRepository;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Record and look up customers' water bills
#[derive(Parser, Debug)]
#[command(name = "water-bills", version)]
#[command(about = "Records water bills per customer and looks them up by phone number or by month")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = config::CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a bill entry for a customer, creating the customer if needed
    Add {
        /// Phone number identifying the customer
        #[arg(short, long)]
        phone: String,

        /// Customer name; replaces the stored name
        #[arg(short, long)]
        name: String,

        /// Billing address; replaces the stored address
        #[arg(short, long)]
        address: String,

        /// Amount paid
        #[arg(long)]
        amount: f64,

        /// Units consumed
        #[arg(long)]
        units: Option<f64>,

        /// ISO 8601 timestamp of the bill; defaults to now
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Show a customer's details and bill history
    Show {
        #[arg(short, long)]
        phone: String,
    },

    /// List every bill recorded in a month
    Month {
        /// Month to list, e.g. "2024-03" or "March 2024"
        #[arg(long)]
        period: Option<BillingPeriod>,

        /// Month number or name, used with --year
        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_store(cfg: &AppConfig) -> Result<RecordStore> {
    // Select the storage backend once, at startup
    let repository: Box<dyn BillRepository> = match cfg.backend {
        Backend::Local => {
            debug!(data_dir = %cfg.local.data_dir.display(), "using local storage");
            Box::new(JsonFileRepository::new(&cfg.local)?)
        }
        Backend::Remote => {
            debug!(owner = %cfg.remote.owner, repo = %cfg.remote.repo, "using remote storage");
            Box::new(RemoteJsonRepository::connect(&cfg.remote)?)
        }
    };
    Ok(RecordStore::new(repository))
}

fn run(cli: Cli) -> Result<()> {
    let cfg = config::load(cli.config.as_deref())?;
    let store = open_store(&cfg)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Add {
            phone,
            name,
            address,
            amount,
            units,
            timestamp,
        } => commands::add_bill(
            &store,
            NewBill {
                phone,
                name,
                address,
                amount,
                units,
                timestamp,
            },
            &mut out,
        ),
        Command::Show { phone } => commands::show_history(&store, &phone, &mut out).map(|_| ()),
        Command::Month {
            period,
            month,
            year,
            json,
        } => {
            let period = commands::resolve_period(period, month.as_deref(), year)?;
            commands::list_month(&store, period, json, &mut out)
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
