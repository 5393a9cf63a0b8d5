//! In-memory price histories used by the loop tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DataError;
use crate::models::PriceSeries;

use super::{HistoryRequest, MarketData};

/// Serves preloaded series, trimmed to the requested duration.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    series: RwLock<HashMap<String, PriceSeries>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(symbol: &str, series: PriceSeries) -> Self {
        let mut map = HashMap::new();
        map.insert(symbol.to_uppercase(), series);
        Self {
            series: RwLock::new(map),
        }
    }

    /// Replace the history served for `symbol`.
    pub async fn set(&self, symbol: &str, series: PriceSeries) {
        self.series.write().await.insert(symbol.to_uppercase(), series);
    }

    pub async fn remove(&self, symbol: &str) {
        self.series.write().await.remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl MarketData for InMemoryHistory {
    async fn fetch_history(
        &self,
        symbol: &str,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, DataError> {
        let series = self.series.read().await;
        series
            .get(&symbol.to_uppercase())
            .map(|s| s.tail_within(request.duration))
            .ok_or_else(|| DataError::Unavailable {
                symbol: symbol.to_string(),
                reason: "no series loaded".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BarSize;
    use crate::test_support::t0;

    #[tokio::test]
    async fn test_serves_and_trims() {
        let history = InMemoryHistory::new();
        history
            .set("aapl", PriceSeries::from_prices(t0(), &[1.0, 2.0, 3.0, 4.0]))
            .await;

        let request = HistoryRequest {
            duration: chrono::Duration::hours(2),
            bar_size: BarSize::Hours(1),
        };
        let series = history.fetch_history("AAPL", &request).await.unwrap();
        assert_eq!(series.prices(), vec![2.0, 3.0, 4.0]);

        history.remove("AAPL").await;
        assert!(matches!(
            history.fetch_history("AAPL", &request).await,
            Err(DataError::Unavailable { .. })
        ));
    }
}
