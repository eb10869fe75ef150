//! FxPaper CLI: drive the paper broker from the shell.
//!
//! Commands:
//! - `place`: validate and queue an order
//! - `bar`: deliver one OHLC bar
//! - `replay`: deliver every bar of a CSV file in order
//! - `cancel` / `close`: drop a pending order or close an open trade
//! - `snapshot` / `reset`: inspect or wipe the ledger
//!
//! Results go to stdout as pretty JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fxpaper_core::domain::{OrderId, OrderRequest, PriceBar};
use fxpaper_core::{PaperBroker, PaperConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fxpaper", about = "FxPaper CLI: bar-driven FX paper broker")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overriding the config's `ledger_path`.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and queue an order.
    Place {
        #[arg(long)]
        instrument: String,

        /// buy or sell.
        #[arg(long)]
        side: String,

        /// Order size in units.
        #[arg(long, conflicts_with = "lots", required_unless_present = "lots")]
        units: Option<u64>,

        /// Order size in lots of the instrument's `lot_size`.
        #[arg(long)]
        lots: Option<u64>,

        /// market or limit.
        #[arg(long, default_value = "market")]
        entry_type: String,

        /// Limit price (required for limit orders).
        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        stop_loss: Option<f64>,

        #[arg(long)]
        take_profit: Option<f64>,
    },
    /// Deliver one bar.
    Bar {
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        open: f64,
        #[arg(long)]
        high: f64,
        #[arg(long)]
        low: f64,
        #[arg(long)]
        close: f64,
    },
    /// Deliver every bar in a CSV file (header: instrument,open,high,low,close).
    Replay {
        #[arg(long)]
        bars: PathBuf,
    },
    /// Cancel a pending order.
    Cancel {
        #[arg(long)]
        order_id: String,
    },
    /// Close the open trade created by an order.
    Close {
        #[arg(long)]
        order_id: String,
        #[arg(long)]
        price: f64,
    },
    /// Print the account state with realized and unrealized PnL.
    Snapshot,
    /// Wipe the ledger back to the initial cash.
    Reset,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.ledger)?;
    let broker = PaperBroker::open(config).context("failed to open paper broker")?;

    match cli.command {
        Commands::Place {
            instrument,
            side,
            units,
            lots,
            entry_type,
            price,
            stop_loss,
            take_profit,
        } => {
            let units = resolve_units(&broker, &instrument, units, lots)?;
            let request = OrderRequest {
                instrument,
                side,
                units,
                entry_type,
                price,
                stop_loss,
                take_profit,
            };
            print_json(&broker.place_order(request)?)
        }
        Commands::Bar {
            instrument,
            open,
            high,
            low,
            close,
        } => print_json(&broker.on_bar(&instrument, open, high, low, close)?),
        Commands::Replay { bars } => print_json(&replay(&broker, &bars)?),
        Commands::Cancel { order_id } => {
            print_json(&broker.cancel_order(&OrderId::new(order_id))?)
        }
        Commands::Close { order_id, price } => {
            print_json(&broker.close_trade(&OrderId::new(order_id), price)?)
        }
        Commands::Snapshot => {
            let state = broker.snapshot();
            let unrealized = state.unrealized_pnl(&state.last_prices);
            print_json(&serde_json::json!({
                "realized_pnl": state.realized_pnl(),
                "unrealized_pnl": unrealized,
                "account": state,
            }))
        }
        Commands::Reset => {
            broker.reset()?;
            print_json(&broker.snapshot())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, ledger: Option<PathBuf>) -> Result<PaperConfig> {
    let mut config = match path {
        Some(path) => PaperConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PaperConfig::default(),
    };
    if let Some(ledger) = ledger {
        config.ledger_path = ledger;
    }
    Ok(config)
}

fn resolve_units(
    broker: &PaperBroker,
    instrument: &str,
    units: Option<u64>,
    lots: Option<u64>,
) -> Result<i64> {
    let units = match (units, lots) {
        (Some(units), _) => units,
        (None, Some(lots)) => broker
            .config()
            .instruments
            .resolve(instrument)
            .lots_to_units(lots),
        (None, None) => bail!("one of --units or --lots is required"),
    };
    i64::try_from(units).with_context(|| format!("order size {units} is too large"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct BarRow {
    instrument: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

fn read_bars(path: &Path) -> Result<Vec<PriceBar>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open bars csv {}", path.display()))?;
    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            let row: BarRow = row.with_context(|| format!("bad bar on row {}", i + 1))?;
            Ok(PriceBar::new(row.instrument, row.open, row.high, row.low, row.close))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    bars: usize,
    fills: usize,
    closed: usize,
    cash: f64,
    equity: f64,
}

fn replay(broker: &PaperBroker, path: &Path) -> Result<ReplaySummary> {
    let bars = read_bars(path)?;
    let mut summary = ReplaySummary {
        bars: 0,
        fills: 0,
        closed: 0,
        cash: broker.snapshot().cash,
        equity: broker.snapshot().equity,
    };
    for (i, bar) in bars.iter().enumerate() {
        let report = broker
            .apply_bar(bar)
            .with_context(|| format!("bar {} ({}) failed", i + 1, bar.instrument))?;
        summary.bars += 1;
        summary.fills += report.fills.len();
        summary.closed += report.closed.len();
        summary.cash = report.cash;
        summary.equity = report.equity;
    }
    Ok(summary)
}
