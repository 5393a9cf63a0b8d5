//! Errors raised by the market-data and broker collaborators.

use thiserror::Error;

/// Failure to obtain a price history.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data for '{symbol}': {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("failed to read price data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed price data for '{symbol}' at row {row}: {reason}")]
    Parse {
        symbol: String,
        row: usize,
        reason: String,
    },
}

/// Failure talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unreachable: {0}")]
    Connectivity(String),

    #[error("order for {symbol} rejected: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("broker session not connected")]
    NotConnected,
}
