//! Price histories read from `<dir>/<SYMBOL>.csv` files.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::DataError;
use crate::models::{PriceBar, PriceSeries};

use super::{HistoryRequest, MarketData};

/// Columns we read; any other columns (open, high, low, volume) are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    close: f64,
}

/// Reads one CSV file per symbol from a directory.
#[derive(Debug, Clone)]
pub struct CsvHistory {
    dir: PathBuf,
}

impl CsvHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }
}

/// RFC 3339 or integer unix seconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_series(symbol: &str, content: &str) -> Result<PriceSeries, DataError> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut bars: Vec<PriceBar> = Vec::new();

    for (i, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let row_no = i + 2;
        let parse_err = |reason: String| DataError::Parse {
            symbol: symbol.to_string(),
            row: row_no,
            reason,
        };

        let row = result.map_err(|e| parse_err(e.to_string()))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .ok_or_else(|| parse_err(format!("bad timestamp '{}'", row.timestamp)))?;
        if !row.close.is_finite() {
            return Err(parse_err(format!("bad close {}", row.close)));
        }
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(parse_err(format!(
                    "timestamp {} not after {}",
                    timestamp, prev.timestamp
                )));
            }
        }
        bars.push(PriceBar::new(timestamp, row.close));
    }

    PriceSeries::new(bars).map_err(|e| DataError::Parse {
        symbol: symbol.to_string(),
        row: 0,
        reason: e.to_string(),
    })
}

#[async_trait]
impl MarketData for CsvHistory {
    async fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::Unavailable {
                    symbol: symbol.to_string(),
                    reason: format!("{} not found", path.display()),
                });
            }
            Err(e) => return Err(DataError::Io(e)),
        };

        let series = parse_series(symbol, &content)?.tail_within(request.duration);
        debug!(
            symbol = %symbol,
            bars = series.len(),
            bar_size = %request.bar_size,
            path = %path.display(),
            "Loaded price history"
        );
        Ok(series)
    }
}
