//! Effective list price for a retailer-year.

use launch_core::PriceOracle;
use launch_econ::implied_list_price;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::warn;

/// Resolves list prices for one computation.
///
/// The category's market price is asked of the oracle at most once per
/// resolver, so a failing lookup is not retried for every cell. A lookup
/// still running after `budget` counts as no data.
pub struct PriceResolver<'a> {
    oracle: &'a dyn PriceOracle,
    category: &'a str,
    budget: Duration,
    market: OnceCell<Option<f64>>,
}

impl<'a> PriceResolver<'a> {
    pub fn new(oracle: &'a dyn PriceOracle, category: &'a str, budget: Duration) -> Self {
        Self {
            oracle,
            category,
            budget,
            market: OnceCell::new(),
        }
    }

    async fn market_price(&self) -> Option<f64> {
        *self
            .market
            .get_or_init(|| async {
                let lookup = self.oracle.average_price(self.category);
                let price = match tokio::time::timeout(self.budget, lookup).await {
                    Ok(price) => price,
                    Err(_) => {
                        warn!(
                            category = self.category,
                            budget = ?self.budget,
                            "market price lookup timed out"
                        );
                        None
                    }
                };
                if price.is_none() {
                    warn!(category = self.category, "no market price, projecting at zero price");
                }
                price
            })
            .await
    }

    /// A user price is used unchanged; otherwise the market price is backed
    /// out through the retailer's markup for the year. No market data gives 0.
    pub async fn resolve(&self, user_price: Option<f64>, retailer_markup: f64) -> f64 {
        if let Some(price) = user_price {
            return price;
        }
        match self.market_price().await {
            Some(market) => implied_list_price(market, retailer_markup),
            None => 0.0,
        }
    }
}
