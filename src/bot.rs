//! Auto-trade loop: periodic evaluation of every configured symbol.
//!
//! Handles:
//! - Fetching history and running the wave scanner per symbol
//! - Querying balance and position from the broker
//! - Advancing the per-symbol state machine and dispatching its decisions
//! - Recording every dispatch attempt in a bounded trade log
//! - Cooperative shutdown, releasing the broker session on exit

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::api::{BarSize, Broker, HistoryRequest, MarketData};
use crate::error::DataError;
use crate::models::{OrderStatus, SymbolState, TradeDecision, TradeRecord};
use crate::trading::{TickInput, TradingConfig, TradingStateMachine, WaveScanner};

/// Longest uninterrupted sleep between shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_secs(1);

pub const DEFAULT_TRADE_LOG_CAPACITY: usize = 1000;

fn default_trade_log_capacity() -> usize {
    DEFAULT_TRADE_LOG_CAPACITY
}

/// Bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Symbols evaluated on every tick
    pub symbols: Vec<String>,

    /// Time between ticks (seconds)
    pub poll_interval_secs: u64,

    /// History window fetched per tick (days)
    pub history_days: i64,

    /// Bar granularity of the history
    pub bar_size: BarSize,

    /// Most recent dispatch attempts kept in the trade log
    #[serde(default = "default_trade_log_capacity")]
    pub trade_log_capacity: usize,

    /// Trading configuration
    pub trading: TradingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["AAPL".to_string()],
            poll_interval_secs: 300,
            history_days: 30,
            bar_size: BarSize::Hours(1),
            trade_log_capacity: DEFAULT_TRADE_LOG_CAPACITY,
            trading: TradingConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.symbols.is_empty(), "at least one symbol is required");
        ensure!(
            self.symbols.iter().all(|s| !s.trim().is_empty()),
            "symbols must not be blank"
        );
        ensure!(self.poll_interval_secs > 0, "poll interval must be positive");
        ensure!(self.history_days > 0, "history window must be positive");
        ensure!(self.trade_log_capacity > 0, "trade log capacity must be positive");
        self.trading.validate()
    }

    pub fn history_request(&self) -> HistoryRequest {
        HistoryRequest::days(self.history_days, self.bar_size)
    }
}

/// Owns one auto-trade loop and the state it shares with observers.
pub struct AutoTrader {
    config: BotConfig,
    market_data: Arc<dyn MarketData>,
    broker: Arc<dyn Broker>,

    // Shared with the loop task; the task is the only writer
    states: Arc<RwLock<HashMap<String, SymbolState>>>,
    trade_log: Arc<RwLock<VecDeque<TradeRecord>>>,

    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutoTrader {
    pub fn new(
        config: BotConfig,
        market_data: Arc<dyn MarketData>,
        broker: Arc<dyn Broker>,
    ) -> Result<Self> {
        config.validate().context("invalid bot configuration")?;

        Ok(Self {
            config,
            market_data,
            broker,
            states: Arc::new(RwLock::new(HashMap::new())),
            trade_log: Arc::new(RwLock::new(VecDeque::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        })
    }

    /// Start the loop. Starting a running trader is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().await;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Auto-trade already running");
            return Ok(());
        }

        // A previous loop that died without stop() still holds its handle
        if let Some(stale) = handle.take() {
            if let Err(e) = stale.await {
                error!(error = %e, "Previous auto-trade task failed");
            }
        }

        {
            let mut states = self.states.write().await;
            states.clear();
            for symbol in &self.config.symbols {
                states.insert(symbol.to_uppercase(), SymbolState::new());
            }
        }
        self.shutdown.store(false, Ordering::SeqCst);

        let worker = TradeLoop {
            config: self.config.clone(),
            scanner: WaveScanner::new(self.config.trading.clone()),
            machine: TradingStateMachine::new(&self.config.trading),
            market_data: self.market_data.clone(),
            broker: self.broker.clone(),
            states: self.states.clone(),
            trade_log: self.trade_log.clone(),
            shutdown: self.shutdown.clone(),
        };
        let running = RunningGuard(self.running.clone());
        *handle = Some(tokio::spawn(async move {
            let _running = running;
            worker.run().await;
        }));

        Ok(())
    }

    /// Request shutdown and wait for the loop to release the broker.
    pub async fn stop(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);

        let task = self.handle.lock().await.take();
        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    // The loop never reached its own disconnect
                    if let Err(err) = self.broker.disconnect().await {
                        warn!(error = %err, "Broker disconnect failed");
                    }
                    return Err(e).context("auto-trade task failed");
                }
                info!("Auto-trade stopped");
            }
            None => debug!("Auto-trade not running"),
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Copy of the per-symbol states.
    pub async fn snapshot(&self) -> HashMap<String, SymbolState> {
        self.states.read().await.clone()
    }

    /// Copy of the retained trade log, oldest first.
    pub async fn trade_log(&self) -> Vec<TradeRecord> {
        self.trade_log.read().await.iter().cloned().collect()
    }

    /// Run until Ctrl+C, then stop cleanly.
    pub async fn run_until_ctrl_c(&self) -> Result<()> {
        self.start().await?;
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
        info!("Shutdown signal received");
        self.stop().await
    }
}

/// Clears the running flag when the loop task ends, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Submit a decision and record the attempt.
pub async fn dispatch_order(broker: &dyn Broker, decision: TradeDecision) -> TradeRecord {
    let status = match broker
        .submit_order(&decision.symbol, decision.direction, decision.quantity)
        .await
    {
        Ok(handle) => {
            info!(order_id = %handle.order_id, decision = %decision, "Order submitted");
            OrderStatus::Accepted {
                order_id: handle.order_id,
            }
        }
        Err(e) => {
            error!(decision = %decision, error = %e, "Order failed");
            OrderStatus::Failed { error: e.to_string() }
        }
    };
    TradeRecord::new(decision, status)
}

/// State moved into the spawned loop task.
struct TradeLoop {
    config: BotConfig,
    scanner: WaveScanner,
    machine: TradingStateMachine,
    market_data: Arc<dyn MarketData>,
    broker: Arc<dyn Broker>,
    states: Arc<RwLock<HashMap<String, SymbolState>>>,
    trade_log: Arc<RwLock<VecDeque<TradeRecord>>>,
    shutdown: Arc<AtomicBool>,
}

impl TradeLoop {
    async fn run(self) {
        info!(
            symbols = ?self.config.symbols,
            poll_interval = self.config.poll_interval_secs,
            "Starting auto-trade loop"
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            if !self.broker.is_connected() {
                if let Err(e) = self.broker.connect().await {
                    warn!(error = %e, "Broker connection failed, retrying next tick");
                }
            }
            if self.broker.is_connected() {
                self.tick().await;
            }
            self.wait_for_next_tick().await;
        }

        if let Err(e) = self.broker.disconnect().await {
            warn!(error = %e, "Broker disconnect failed");
        }
        info!("Auto-trade loop exited");
    }

    /// Evaluate every symbol once. Failures are per symbol.
    async fn tick(&self) {
        debug!("Auto-trade tick");

        for symbol in &self.config.symbols {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let symbol = symbol.to_uppercase();
            if let Err(e) = self.evaluate_symbol(&symbol).await {
                error!(symbol = %symbol, "Symbol evaluation failed: {:#}", e);
            }
        }
    }

    async fn evaluate_symbol(&self, symbol: &str) -> Result<()> {
        let request = self.config.history_request();
        let series = match self.market_data.fetch_history(symbol, &request).await {
            Ok(series) => series,
            Err(DataError::Unavailable { reason, .. }) => {
                warn!(symbol = %symbol, reason = %reason, "No price data this tick");
                return Ok(());
            }
            Err(e) => return Err(e).context("fetch history"),
        };
        if series.is_empty() {
            debug!(symbol = %symbol, "Empty price history, no signal this tick");
            return Ok(());
        }

        let analysis = self.scanner.analyze(symbol, &series);
        let signal = analysis.actionable_signal();

        let balance = self.broker.account_balance().await.context("query balance")?;
        let position = self.broker.position(symbol).await.context("query position")?;

        let (decision, previous) = {
            let mut states = self.states.write().await;
            let state = states.entry(symbol.to_string()).or_default();
            let previous = state.clone();
            let tick = TickInput {
                signal,
                series: &series,
                broker_position: position,
                balance: balance.cash,
            };
            (self.machine.evaluate(symbol, state, tick), previous)
        };

        if let Some(decision) = decision {
            if !self.dispatch(decision).await {
                // Retry from the same state next tick
                self.states.write().await.insert(symbol.to_string(), previous);
            }
        }

        Ok(())
    }

    /// Submit a decision and log the attempt. Returns whether the broker accepted it.
    async fn dispatch(&self, decision: TradeDecision) -> bool {
        let record = dispatch_order(self.broker.as_ref(), decision).await;
        let accepted = record.is_accepted();

        let mut log = self.trade_log.write().await;
        log.push_back(record);
        while log.len() > self.config.trade_log_capacity {
            log.pop_front();
        }
        accepted
    }

    /// Sleep for the poll interval in short steps so shutdown is seen promptly.
    async fn wait_for_next_tick(&self) {
        let deadline = Instant::now() + Duration::from_secs(self.config.poll_interval_secs);
        while !self.shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(SHUTDOWN_POLL.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InMemoryHistory, PaperBroker};
    use crate::models::{DecisionReason, PriceSeries, TradeSide};
    use crate::test_support::accepted_impulse_series;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    /// History source whose first fetch panics.
    struct CrashOnceHistory {
        inner: InMemoryHistory,
        crashed: AtomicBool,
    }

    #[async_trait]
    impl MarketData for CrashOnceHistory {
        async fn fetch_history(
            &self,
            symbol: &str,
            request: &HistoryRequest,
        ) -> Result<PriceSeries, DataError> {
            if !self.crashed.swap(true, Ordering::SeqCst) {
                panic!("history backend crashed");
            }
            self.inner.fetch_history(symbol, request).await
        }
    }

    fn config(interval: u64) -> BotConfig {
        BotConfig {
            symbols: vec!["AAPL".to_string()],
            poll_interval_secs: interval,
            ..Default::default()
        }
    }

    fn trader(config: BotConfig, broker: Arc<PaperBroker>) -> AutoTrader {
        let history = Arc::new(InMemoryHistory::with_series("AAPL", accepted_impulse_series()));
        AutoTrader::new(config, history, broker).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(BotConfig::default().validate().is_ok());

        let mut config = BotConfig::default();
        config.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.trade_log_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.trading.turning_point_order = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_capacity_defaults_when_absent() {
        let json = serde_json::to_value(BotConfig::default()).unwrap();
        let mut object = json.as_object().unwrap().clone();
        object.remove("trade_log_capacity");

        let config: BotConfig = serde_json::from_value(object.into()).unwrap();
        assert_eq!(config.trade_log_capacity, DEFAULT_TRADE_LOG_CAPACITY);
    }

    #[tokio::test]
    async fn test_dispatch_order_records_manual_orders() {
        let broker = PaperBroker::new(dec!(100000));
        broker.connect().await.unwrap();
        let decision = TradeDecision {
            symbol: "AAPL".to_string(),
            direction: TradeSide::Buy,
            quantity: 5,
            reference_price: dec!(187.5),
            reason: DecisionReason::Manual,
        };

        let record = dispatch_order(&broker, decision.clone()).await;
        assert!(record.is_accepted());
        assert_eq!(record.decision, decision);
        assert_eq!(broker.position("AAPL").await.unwrap(), Some(5));

        broker.set_reject_orders(true);
        let record = dispatch_order(&broker, decision).await;
        assert!(matches!(record.status, OrderStatus::Failed { .. }));
        assert_eq!(broker.position("AAPL").await.unwrap(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let trader = trader(config(300), broker.clone());

        trader.start().await.unwrap();
        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;

        assert!(trader.is_running());
        assert_eq!(broker.connect_count(), 1);
        assert_eq!(trader.trade_log().await.len(), 1);

        trader.stop().await.unwrap();
        assert!(!trader.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_prompt_and_releases_broker() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let trader = trader(config(300), broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_secs(42)).await;
        assert!(broker.is_connected());

        let requested = Instant::now();
        trader.stop().await.unwrap();
        assert!(requested.elapsed() <= Duration::from_secs(1));
        assert!(!broker.is_connected());
        assert_eq!(broker.disconnect_count(), 1);

        // Stopping again does nothing
        trader.stop().await.unwrap();
        assert_eq!(broker.disconnect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enters_once_then_exits_at_target() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let trader = trader(config(1), broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(4500)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 2, "{:?}", log);

        let buy = &log[0].decision;
        assert_eq!(buy.direction, TradeSide::Buy);
        assert_eq!(buy.reason, DecisionReason::Entry);
        assert_eq!(buy.quantity, 142);

        let sell = &log[1].decision;
        assert_eq!(sell.direction, TradeSide::Sell);
        assert_eq!(sell.reason, DecisionReason::Target);
        assert_eq!(sell.quantity, 142);
        assert_eq!(sell.reference_price, dec!(30));
        assert!(log.iter().all(|r| r.is_accepted()));

        let states = trader.snapshot().await;
        let aapl = &states["AAPL"];
        assert!(aapl.last_signal_active);
        assert!(!aapl.position_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_order_leaves_state_untouched() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        broker.set_reject_orders(true);
        let trader = trader(config(1), broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;

        let log = trader.trade_log().await;
        assert!(!log.is_empty());
        assert!(log.iter().all(|r| !r.is_accepted()));
        let states = trader.snapshot().await;
        assert!(!states["AAPL"].last_signal_active);
        assert!(!states["AAPL"].position_open);
        assert!(states["AAPL"].plan.is_none());

        // Entry is retried once the broker accepts orders again
        broker.set_reject_orders(false);
        sleep(Duration::from_secs(1)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert!(log
            .iter()
            .any(|r| r.is_accepted() && r.decision.direction == TradeSide::Buy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_loop() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        broker.set_offline(true);
        let config = BotConfig {
            symbols: vec!["MISSING".to_string(), "AAPL".to_string()],
            poll_interval_secs: 1,
            ..Default::default()
        };
        let trader = trader(config, broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        assert!(trader.is_running());
        assert!(trader.trade_log().await.is_empty());

        broker.set_offline(false);
        sleep(Duration::from_secs(2)).await;
        assert!(trader.is_running());
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log[0].decision.symbol, "AAPL");
        assert_eq!(log[0].decision.direction, TradeSide::Buy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broker_outage_mid_session_skips_symbol() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let history = Arc::new(InMemoryHistory::new());
        let trader = AutoTrader::new(config(1), history.clone(), broker.clone()).unwrap();

        // First tick connects, then finds no data
        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(broker.is_connected());

        broker.set_offline(true);
        history.set("AAPL", accepted_impulse_series()).await;
        sleep(Duration::from_millis(2500)).await;

        assert!(trader.is_running());
        assert!(broker.is_connected());
        assert!(trader.trade_log().await.is_empty());
        let states = trader.snapshot().await;
        let aapl = &states["AAPL"];
        assert!(!aapl.last_signal_active);
        assert!(!aapl.position_open);
        assert_eq!(aapl.position_qty, 0);
        assert!(aapl.plan.is_none());

        broker.set_offline(false);
        sleep(Duration::from_secs(1)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 1, "{:?}", log);
        assert_eq!(log[0].decision.direction, TradeSide::Buy);
        assert!(log[0].is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outside_position_is_exited_not_doubled() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        broker.connect().await.unwrap();
        broker.set_position("AAPL", 50).await;
        let trader = trader(config(300), broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 1, "{:?}", log);
        assert_eq!(log[0].decision.direction, TradeSide::Sell);
        assert_eq!(log[0].decision.quantity, 50);
        assert_eq!(log[0].decision.reason, DecisionReason::Target);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trade_log_keeps_most_recent_records() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        broker.set_reject_orders(true);
        let config = BotConfig {
            trade_log_capacity: 3,
            ..config(1)
        };
        let trader = trader(config, broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(5500)).await;
        let before = trader.trade_log().await;
        assert_eq!(before.len(), 3);

        // One more rejected retry pushes the oldest record out
        sleep(Duration::from_secs(1)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|r| r.id != before[0].id));
        assert_eq!(log[0].id, before[1].id);
        assert_eq!(log[1].id, before[2].id);
        assert!(log
            .iter()
            .all(|r| !r.is_accepted() && r.decision.direction == TradeSide::Buy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_loop_can_be_restarted() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let history = Arc::new(CrashOnceHistory {
            inner: InMemoryHistory::with_series("AAPL", accepted_impulse_series()),
            crashed: AtomicBool::new(false),
        });
        let trader = AutoTrader::new(config(300), history, broker.clone()).unwrap();

        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(!trader.is_running());

        // The panic surfaces on stop, which still releases the broker
        assert!(trader.stop().await.is_err());
        assert!(!broker.is_connected());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(trader.is_running());
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].decision.direction, TradeSide::Buy);
        assert!(log[0].is_accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_unobserved_panic() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let history = Arc::new(CrashOnceHistory {
            inner: InMemoryHistory::with_series("AAPL", accepted_impulse_series()),
            crashed: AtomicBool::new(false),
        });
        let trader = AutoTrader::new(config(300), history, broker.clone()).unwrap();

        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(!trader.is_running());

        // No stop() in between
        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(trader.is_running());
        assert_eq!(trader.trade_log().await.len(), 1);
        trader.stop().await.unwrap();
        assert!(!broker.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_starts_from_fresh_state() {
        let broker = Arc::new(PaperBroker::new(dec!(100000)));
        let trader = trader(config(300), broker.clone());

        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        trader.stop().await.unwrap();
        assert!(trader.snapshot().await["AAPL"].plan.is_some());

        // The plan is gone after a restart, so the open position exits on the current wave's levels
        trader.start().await.unwrap();
        sleep(Duration::from_millis(10)).await;
        trader.stop().await.unwrap();

        let log = trader.trade_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].decision.direction, TradeSide::Sell);
        assert_eq!(log[1].decision.reason, DecisionReason::Target);
        assert_eq!(broker.connect_count(), 2);
    }
}
