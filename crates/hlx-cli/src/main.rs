//! hlx - Hyperliquid exchange client CLI.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use hlx_cli::{AppConfig, Application};
use hlx_core::{Cloid, OrderRequest, OrderSide, Price, Size, TimeInForce};
use hlx_telemetry::Metrics;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;

const HOUR_MS: u64 = 3_600_000;

/// Hyperliquid exchange client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HLX_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Print the exchange's JSON untouched instead of normalizing it
    #[arg(long, global = true)]
    raw: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    metrics: bool,

    /// Debug-level logs for the client crates (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mid prices for every market
    Mids,
    /// Order book snapshot
    Book { symbol: String },
    /// Open orders of an account (default: configured vault or account)
    OpenOrders {
        #[arg(long)]
        user: Option<String>,
    },
    /// Candles for the last N hours
    Candles {
        symbol: String,
        interval: String,
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
    /// Funding history for the last N hours
    Funding {
        symbol: String,
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
    /// Place a limit order
    Place {
        symbol: String,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
        #[arg(long, default_value = "gtc")]
        tif: TimeInForce,
        #[arg(long)]
        cloid: Option<Cloid>,
        #[arg(long)]
        reduce_only: bool,
    },
    /// Cancel an order by exchange id
    Cancel { symbol: String, oid: u64 },
    /// Cancel an order by client order id
    CancelCloid { symbol: String, cloid: Cloid },
    /// Cancel every open order, optionally for one symbol
    CancelAll { symbol: Option<String> },
    /// Set leverage for a perp market (cross unless --isolated)
    Leverage {
        symbol: String,
        leverage: u32,
        #[arg(long)]
        isolated: bool,
    },
    /// Cancel all orders N seconds from now unless refreshed
    ScheduleCancel {
        #[arg(long)]
        in_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    hlx_telemetry::init_logging(args.verbose)?;

    let config = AppConfig::load(args.config.clone())?;
    info!(network = %config.network, "Configuration loaded");

    let app = Application::new(config)?;
    let output = run(&app, args.command, args.raw).await;

    if args.metrics {
        eprintln!("{}", Metrics::render()?);
    }

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

async fn run(app: &Application, command: Command, raw: bool) -> Result<Value> {
    let now = app.session().now_ms();
    let info = app.info();

    let value = match command {
        Command::Mids => info.all_mids(raw).await?.to_json()?,
        Command::Book { symbol } => info.l2_book(&symbol, raw).await?.to_json()?,
        Command::OpenOrders { user } => info
            .user_open_orders(user.as_deref(), raw)
            .await?
            .to_json()?,
        Command::Candles {
            symbol,
            interval,
            hours,
        } => info
            .candle_snapshot(&symbol, &interval, hours_before(now, hours)?, now, raw)
            .await?
            .to_json()?,
        Command::Funding { symbol, hours } => info
            .perpetuals()
            .funding_history(&symbol, hours_before(now, hours)?, Some(now), raw)
            .await?
            .to_json()?,

        Command::Place {
            symbol,
            side,
            size,
            price,
            tif,
            cloid,
            reduce_only,
        } => {
            let mut order =
                OrderRequest::limit(symbol, side, Size::new(size), Price::new(price), tif)
                    .reduce_only(reduce_only);
            if let Some(cloid) = cloid {
                order = order.with_cloid(cloid);
            }
            let outcome = app.exchange().await?.place_order(&order).await?;
            serde_json::to_value(outcome)?
        }
        Command::Cancel { symbol, oid } => {
            app.exchange().await?.cancel_order(&symbol, oid).await?;
            json!({"status": "ok", "oid": oid})
        }
        Command::CancelCloid { symbol, cloid } => {
            app.exchange()
                .await?
                .cancel_order_by_cloid(&symbol, &cloid)
                .await?;
            json!({"status": "ok", "cloid": cloid.to_wire()})
        }
        Command::CancelAll { symbol } => {
            let cancelled = app
                .exchange()
                .await?
                .cancel_all_orders(symbol.as_deref())
                .await?;
            json!({"status": "ok", "cancelled": cancelled})
        }
        Command::Leverage {
            symbol,
            leverage,
            isolated,
        } => {
            app.exchange()
                .await?
                .update_leverage(&symbol, leverage, !isolated)
                .await?;
            json!({"status": "ok", "symbol": symbol, "leverage": leverage, "cross": !isolated})
        }
        Command::ScheduleCancel { in_secs } => {
            let time = secs_after(now, in_secs)?;
            app.exchange().await?.schedule_cancel(time).await?;
            json!({"status": "ok", "time": time})
        }
    };
    Ok(value)
}

/// Start of a window reaching `hours` back from `now`.
fn hours_before(now: u64, hours: u64) -> Result<u64> {
    hours
        .checked_mul(HOUR_MS)
        .map(|span| now.saturating_sub(span))
        .ok_or_else(|| anyhow!("--hours {hours} is out of range"))
}

/// `now` plus `secs` seconds, in milliseconds.
fn secs_after(now: u64, secs: u64) -> Result<u64> {
    secs.checked_mul(1000)
        .and_then(|ms| now.checked_add(ms))
        .ok_or_else(|| anyhow!("--in-secs {secs} is out of range"))
}
