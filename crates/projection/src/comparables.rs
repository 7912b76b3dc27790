//! Comparable selection within tolerance bands.

use launch_core::{
    ComparableQuery, ComparableRecord, GatewayError, HistoricalData, RetailerId, Window,
};

/// Tolerance bands applied around a cell's margin and price.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    /// Absolute half-width around the contribution margin.
    pub margin: f64,
    /// Fractional half-width around the list price.
    pub price: f64,
}

/// Query for records of the same retailer and year whose margin and price
/// fall inside the bands, for the given brand and category.
pub fn comparable_query(
    retailer_id: RetailerId,
    year: u32,
    brand: &str,
    category: &str,
    margin: f64,
    price: f64,
    tolerance: Tolerance,
) -> ComparableQuery {
    ComparableQuery {
        retailer_id,
        year,
        margin: Window::absolute(margin, tolerance.margin),
        price: Window::fractional(price, tolerance.price),
        brand: brand.to_string(),
        category: category.to_string(),
    }
}

/// Matching records; an empty result is a valid outcome.
pub async fn select_comparables(
    history: &dyn HistoricalData,
    query: &ComparableQuery,
) -> Result<Vec<ComparableRecord>, GatewayError> {
    history.find_comparables(query).await
}
