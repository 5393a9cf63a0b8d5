//! Simulated broker for dry runs: immediate fills, fixed cash, in-memory positions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::BrokerError;
use crate::models::TradeSide;

use super::{AccountBalance, Broker, OrderHandle};

/// Paper trading broker.
///
/// Cash is a fixed figure; fills never move it. Positions are signed share
/// counts per symbol.
#[derive(Debug)]
pub struct PaperBroker {
    cash: Decimal,
    positions: RwLock<HashMap<String, i64>>,
    connected: AtomicBool,
    offline: AtomicBool,
    reject_orders: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl PaperBroker {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            positions: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            reject_orders: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    fn check_session(&self) -> Result<(), BrokerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BrokerError::Connectivity("paper broker offline".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BrokerError::NotConnected);
        }
        Ok(())
    }
}

#[cfg(test)]
impl PaperBroker {
    /// Simulate losing the connection: every call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject every submitted order.
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Overwrite a position, e.g. one opened outside the bot.
    pub async fn set_position(&self, symbol: &str, quantity: i64) {
        let mut positions = self.positions.write().await;
        if quantity == 0 {
            positions.remove(&symbol.to_uppercase());
        } else {
            positions.insert(symbol.to_uppercase(), quantity);
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BrokerError::Connectivity("paper broker offline".to_string()));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.connects.fetch_add(1, Ordering::SeqCst);
            info!(cash = %self.cash, "Paper broker connected");
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            info!("Paper broker disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_balance(&self) -> Result<AccountBalance, BrokerError> {
        self.check_session()?;
        Ok(AccountBalance {
            cash: self.cash,
            buying_power: self.cash,
        })
    }

    async fn position(&self, symbol: &str) -> Result<Option<i64>, BrokerError> {
        self.check_session()?;
        Ok(self
            .positions
            .read()
            .await
            .get(&symbol.to_uppercase())
            .copied()
            .filter(|q| *q != 0))
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: u64,
    ) -> Result<OrderHandle, BrokerError> {
        self.check_session()?;

        let rejected = |reason: &str| BrokerError::OrderRejected {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(rejected("rejected by paper broker"));
        }
        if quantity == 0 {
            return Err(rejected("quantity must be positive"));
        }
        let signed = i64::try_from(quantity).map_err(|_| rejected("quantity too large"))?;

        let key = symbol.to_uppercase();
        let mut positions = self.positions.write().await;
        let held = positions.get(&key).copied().unwrap_or(0);
        let next = match side {
            TradeSide::Buy => held + signed,
            TradeSide::Sell => held - signed,
        };
        if next == 0 {
            positions.remove(&key);
        } else {
            positions.insert(key, next);
        }
        drop(positions);

        let handle = OrderHandle {
            order_id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            submitted_at: Utc::now(),
        };
        debug!(
            order_id = %handle.order_id,
            symbol = %symbol,
            side = %side.as_str(),
            quantity = quantity,
            position = next,
            "Paper order filled"
        );
        Ok(handle)
    }
}
