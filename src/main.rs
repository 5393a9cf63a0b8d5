//! Elliott-Wave Signal Bot
//!
//! Detects impulse waves in price history, filters them with RSI and MACD,
//! and trades fresh signals with risk-based position sizing.

mod analysis;
mod api;
mod bot;
mod error;
mod models;
mod trading;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BarSize, Broker, CsvHistory, MarketData, PaperBroker};
use crate::bot::{dispatch_order, AutoTrader, BotConfig};
use crate::models::{DecisionReason, OrderStatus, TradeDecision, TradeRecord, TradeSide};
use crate::trading::{TradingConfig, WaveScanner};

/// Elliott-Wave signal bot CLI.
#[derive(Parser)]
#[command(name = "wavebot")]
#[command(about = "Trade Elliott impulse waves filtered by RSI and MACD", long_about = None)]
struct Cli {
    /// Directory holding <SYMBOL>.csv price histories
    #[arg(short, long, env = "WAVEBOT_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Comma-separated symbols to evaluate
    #[arg(long, env = "WAVEBOT_SYMBOLS", value_delimiter = ',', default_value = "AAPL")]
    symbols: Vec<String>,

    /// Fraction of balance risked per trade
    #[arg(long, env = "WAVEBOT_RISK", default_value = "0.01")]
    risk: Decimal,

    /// Polling interval in seconds
    #[arg(short, long, env = "WAVEBOT_INTERVAL", default_value = "300")]
    interval: u64,

    /// History window in days
    #[arg(long, default_value = "30")]
    history_days: i64,

    /// Bar size of the history (e.g. "1 hour", "15m", "1d")
    #[arg(long, default_value = "1 hour")]
    bar_size: BarSize,

    /// Turning-point window half-width
    #[arg(long, default_value = "5")]
    order: usize,

    /// RSI period
    #[arg(long, default_value = "14")]
    rsi_period: usize,

    /// RSI level above which entries are rejected
    #[arg(long, default_value = "70")]
    rsi_overbought: f64,

    /// MACD fast EMA period
    #[arg(long, default_value = "12")]
    macd_fast: usize,

    /// MACD slow EMA period
    #[arg(long, default_value = "26")]
    macd_slow: usize,

    /// MACD signal EMA period
    #[arg(long, default_value = "9")]
    macd_signal: usize,

    /// Paper account cash balance
    #[arg(long, env = "WAVEBOT_CASH", default_value = "100000")]
    cash: Decimal,

    /// Most recent order attempts kept in the trade log
    #[arg(long, default_value = "1000")]
    trade_log_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one symbol and report waves, signals and historical exits
    Scan {
        /// Symbol to scan (defaults to the first configured symbol)
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Submit a manual order to the paper broker
    Order {
        #[arg(short, long)]
        symbol: String,

        /// buy or sell
        #[arg(long)]
        side: TradeSide,

        #[arg(short, long)]
        quantity: u64,
    },

    /// Start the auto-trade loop (Ctrl+C to stop)
    Run,

    /// Show current configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn bot_config(&self) -> Result<BotConfig> {
        let config = BotConfig {
            symbols: self.symbols.iter().map(|s| s.trim().to_uppercase()).collect(),
            poll_interval_secs: self.interval,
            history_days: self.history_days,
            bar_size: self.bar_size,
            trade_log_capacity: self.trade_log_capacity,
            trading: TradingConfig {
                risk_fraction: self.risk,
                turning_point_order: self.order,
                rsi_period: self.rsi_period,
                rsi_overbought: self.rsi_overbought,
                macd_fast: self.macd_fast,
                macd_slow: self.macd_slow,
                macd_signal: self.macd_signal,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.bot_config()?;

    match &cli.command {
        Commands::Scan { symbol } => {
            let symbol = match symbol {
                Some(s) => s.to_uppercase(),
                None => config.symbols[0].clone(),
            };
            scan(&cli, &config, &symbol).await?;
        }

        Commands::Order {
            symbol,
            side,
            quantity,
        } => {
            let symbol = symbol.to_uppercase();
            let decision = TradeDecision {
                reference_price: last_close(&cli, &config, &symbol).await,
                symbol,
                direction: *side,
                quantity: *quantity,
                reason: DecisionReason::Manual,
            };

            let broker = PaperBroker::new(cli.cash);
            broker.connect().await.context("connect broker")?;
            let record = dispatch_order(&broker, decision).await;
            broker.disconnect().await.context("disconnect broker")?;

            print_trade_log(std::slice::from_ref(&record));
            if let OrderStatus::Failed { error } = &record.status {
                anyhow::bail!("order failed: {}", error);
            }
        }

        Commands::Run => {
            info!(
                symbols = ?config.symbols,
                interval = config.poll_interval_secs,
                data_dir = %cli.data_dir.display(),
                "Starting wave bot (paper broker)"
            );

            let history: Arc<dyn MarketData> = Arc::new(CsvHistory::new(&cli.data_dir));
            let broker: Arc<dyn Broker> = Arc::new(PaperBroker::new(cli.cash));
            let trader = AutoTrader::new(config.clone(), history, broker)?;

            println!("Bot running. Press Ctrl+C to stop.");
            trader.run_until_ctrl_c().await?;

            print_trade_log(&trader.trade_log().await);

            println!("\n=== Symbol States ===");
            let mut states: Vec<_> = trader.snapshot().await.into_iter().collect();
            states.sort_by(|a, b| a.0.cmp(&b.0));
            for (symbol, state) in states {
                println!(
                    "  {:<8} {:<10} qty={:<6} signal_active={}",
                    symbol,
                    state.phase(),
                    state.position_qty,
                    state.last_signal_active
                );
            }
        }

        Commands::Config { json: true } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Config { json: false } => {
            let t = &config.trading;

            println!("\n=== Bot Configuration ===\n");
            println!("  Symbols:              {}", config.symbols.join(", "));
            println!("  Poll Interval:        {}s", config.poll_interval_secs);
            println!(
                "  History:              {} days of {} bars",
                config.history_days, config.bar_size
            );
            println!("  Trade Log Capacity:   {}", config.trade_log_capacity);
            println!("  Data Directory:       {}", cli.data_dir.display());
            println!("  Paper Cash:           ${}", cli.cash);

            println!("\n=== Trading Configuration ===\n");
            println!("Wave Detection:");
            println!("  Turning Point Order:  {}", t.turning_point_order);

            println!("\nSignal Filter:");
            println!("  RSI Period:           {}", t.rsi_period);
            println!("  RSI Overbought:       {}", t.rsi_overbought);
            println!(
                "  MACD:                 {}/{}/{}",
                t.macd_fast, t.macd_slow, t.macd_signal
            );

            println!("\nPosition Sizing:");
            println!("  Risk per Trade:       {}%", t.risk_fraction * Decimal::from(100));
        }
    }

    Ok(())
}

/// One-shot analysis report. Never places orders.
async fn scan(cli: &Cli, config: &BotConfig, symbol: &str) -> Result<()> {
    let history = CsvHistory::new(&cli.data_dir);
    let series = history
        .fetch_history(symbol, &config.history_request())
        .await
        .context("fetch history")?;

    let scanner = WaveScanner::new(config.trading.clone());
    let analysis = scanner.analyze(symbol, &series);

    println!("\n=== {} ({} bars) ===", symbol, series.len());

    println!("\n--- Turning Points ({}) ---", analysis.turning_points.len());
    for point in &analysis.turning_points {
        let time = series
            .timestamp_at(point.index)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {:<6} {:>5}  {:<16} {:>10.4}",
            point.kind.as_str(),
            point.index,
            time,
            point.price
        );
    }

    println!("\n--- Impulse Waves ({}) ---", analysis.impulses.len());
    for wave in &analysis.impulses {
        println!("  {}", wave);
    }

    println!("\n--- Corrective Waves ({}) ---", analysis.correctives.len());
    for wave in &analysis.correctives {
        println!("  {}", wave);
    }

    println!("\n--- Signals ---");
    if analysis.signals.is_empty() {
        println!("  none");
    }
    for signal in &analysis.signals {
        let verdict = match &signal.reject_reason {
            Some(reason) => format!("rejected ({})", reason),
            None => "accepted".to_string(),
        };
        println!(
            "  entry {:.4} @ {:>5}  stop {:.4}  target {:.4}  {}",
            signal.levels.entry,
            signal.levels.entry_index,
            signal.levels.stop,
            signal.levels.target,
            verdict
        );
    }

    println!("\n--- Historical Exits (report only) ---");
    let outcomes = scanner.replay(&analysis, &series);
    if outcomes.is_empty() {
        println!("  none");
    }
    for outcome in &outcomes {
        println!(
            "  entry {:.4} -> {:?} at {:.4}",
            outcome.signal.levels.entry, outcome.exit.reason, outcome.exit.price
        );
    }

    match analysis.actionable_signal() {
        Some(signal) => println!(
            "\nActionable: BUY {} at {:.4} (stop {:.4}, target {:.4})",
            symbol, signal.levels.entry, signal.levels.stop, signal.levels.target
        ),
        None => println!("\nActionable: none"),
    }

    Ok(())
}

/// Latest close from the CSV history, or zero when there is none.
async fn last_close(cli: &Cli, config: &BotConfig, symbol: &str) -> Decimal {
    let history = CsvHistory::new(&cli.data_dir);
    match history.fetch_history(symbol, &config.history_request()).await {
        Ok(series) => series
            .last()
            .and_then(|bar| Decimal::try_from(bar.price).ok())
            .unwrap_or(Decimal::ZERO),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "No reference price for manual order");
            Decimal::ZERO
        }
    }
}

fn print_trade_log(log: &[TradeRecord]) {
    println!("\n=== Trade Log ({}) ===", log.len());
    for record in log {
        let status = if record.is_accepted() { "OK" } else { "FAILED" };
        println!(
            "  {}  {:<6} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            status,
            record.decision
        );
    }
}
