#![deny(warnings)]

//! Core domain models and invariants for launch projections.
//!
//! This crate defines the serializable types shared by the projection engine,
//! the historical store and the price oracle, validation helpers for launch
//! parameters, and the two collaborator ports the engine is written against.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Longest horizon accepted for a single projection, in years.
pub const MAX_HORIZON_YEARS: u32 = 100;

/// Store identifier of a retailer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RetailerId(pub i64);

/// A retailer known to the historical store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Retailer {
    pub id: RetailerId,
    pub name: String,
}

/// How contribution margin is obtained for every projected cell.
///
/// Selected once per request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PricingMode {
    /// The caller states the contribution margin directly.
    UserSuppliedMargin { contribution_margin: f64 },
    /// Margin is `(price - variable_cost) / price` for the resolved list price.
    DerivedFromCost { variable_cost: f64 },
}

impl PricingMode {
    /// Contribution margin for a resolved list price.
    ///
    /// A zero list price yields a zero margin in cost-derived mode.
    pub fn contribution_margin(&self, list_price: f64) -> f64 {
        match *self {
            PricingMode::UserSuppliedMargin {
                contribution_margin,
            } => contribution_margin,
            PricingMode::DerivedFromCost { variable_cost } => {
                if list_price == 0.0 {
                    0.0
                } else {
                    (list_price - variable_cost) / list_price
                }
            }
        }
    }
}

/// One row of the caller's retailer table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetailerSelection {
    pub name: String,
    pub enabled: bool,
    /// Caller-supplied list price, static across the horizon.
    #[serde(default)]
    pub list_price: Option<f64>,
}

/// Everything a single projection needs from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchParameters {
    pub product_category: String,
    pub product_brand: String,
    pub pricing: PricingMode,
    /// Retailer table in caller order; grid rows follow this order.
    pub retailers: Vec<RetailerSelection>,
    /// Horizon in years (>= 1).
    pub num_years: u32,
    /// Desired discount rate, e.g. 0.1 for 10%.
    pub desired_irr: f64,
    pub initial_investment: f64,
    /// Symmetric absolute band around the contribution margin.
    pub margin_range: f64,
    /// Symmetric fractional band around the list price.
    pub price_range: f64,
}

impl LaunchParameters {
    /// Names of enabled retailers, in caller order.
    pub fn enabled_retailers(&self) -> Vec<&str> {
        self.retailers
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Caller-supplied list price for an enabled retailer, if any.
    pub fn user_price(&self, name: &str) -> Option<f64> {
        self.retailers
            .iter()
            .find(|r| r.enabled && r.name == name)
            .and_then(|r| r.list_price)
    }
}

/// Retailer terms for one year of the horizon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetailerYearAgreement {
    pub retailer_id: RetailerId,
    pub year: u32,
    /// Markup fraction applied over list price to get the retail price.
    pub retailer_markup: f64,
    pub display_costs: Decimal,
    pub priority_shelving_costs: Decimal,
    pub preferred_vendor_costs: Decimal,
}

impl RetailerYearAgreement {
    /// Sum of the three fixed-cost components.
    pub fn fixed_costs(&self) -> Decimal {
        self.display_costs + self.priority_shelving_costs + self.preferred_vendor_costs
    }
}

/// Historical (retailer, product, year) observation used as a comparable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparableRecord {
    pub retailer_id: RetailerId,
    pub product_id: i64,
    pub year: u32,
    pub volume_sold: i64,
    pub list_price: f64,
    pub contribution_margin: f64,
}

/// Closed interval `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub low: f64,
    pub high: f64,
}

impl Window {
    /// `[center - half_width, center + half_width]`.
    pub fn absolute(center: f64, half_width: f64) -> Self {
        Self {
            low: center - half_width,
            high: center + half_width,
        }
    }

    /// `[center * (1 - frac), center * (1 + frac)]`.
    pub fn fractional(center: f64, frac: f64) -> Self {
        Self {
            low: center * (1.0 - frac),
            high: center * (1.0 + frac),
        }
    }

    /// Inclusive containment.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Filter describing which historical records count as comparables.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparableQuery {
    pub retailer_id: RetailerId,
    pub year: u32,
    pub margin: Window,
    pub price: Window,
    pub brand: String,
    pub category: String,
}

impl ComparableQuery {
    /// Whether a record satisfies every filter except brand/category, which
    /// live on the product rather than on the record.
    pub fn admits(&self, record: &ComparableRecord) -> bool {
        record.retailer_id == self.retailer_id
            && record.year == self.year
            && self.margin.contains(record.contribution_margin)
            && self.price.contains(record.list_price)
    }
}

/// Validation errors for launch parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required text field is blank.
    #[error("{0} must not be blank")]
    Blank(&'static str),
    /// Horizon outside [1, MAX_HORIZON_YEARS].
    #[error("horizon of {0} years is outside [1, 100]")]
    HorizonOutOfRange(u32),
    /// Numeric field must be finite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// Numeric field must be non-negative.
    #[error("{0} must not be negative")]
    Negative(&'static str),
    /// Discount rate at or below -100%.
    #[error("desired discount rate must be greater than -1")]
    DiscountRateTooLow,
    /// User list price must be strictly positive.
    #[error("list price for retailer {0} must be > 0")]
    NonPositivePrice(String),
    /// The same retailer appears twice in the table.
    #[error("retailer {0} is listed more than once")]
    DuplicateRetailer(String),
    /// Nothing to project.
    #[error("at least one retailer must be enabled")]
    NoEnabledRetailers,
}

fn finite(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite(field))
    }
}

fn non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if finite(value, field)? < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

/// Validate a pricing mode.
pub fn validate_pricing(mode: &PricingMode) -> Result<(), ValidationError> {
    match *mode {
        PricingMode::UserSuppliedMargin {
            contribution_margin,
        } => finite(contribution_margin, "contribution margin").map(|_| ()),
        PricingMode::DerivedFromCost { variable_cost } => {
            non_negative(variable_cost, "variable cost")
        }
    }
}

/// Validate the retailer table: unique names and sane user prices.
pub fn validate_retailers(retailers: &[RetailerSelection]) -> Result<(), ValidationError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for r in retailers {
        let name = r.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Blank("retailer name"));
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateRetailer(name.to_string()));
        }
        if let Some(price) = r.list_price {
            if !price.is_finite() || price <= 0.0 {
                return Err(ValidationError::NonPositivePrice(name.to_string()));
            }
        }
    }
    if !retailers.iter().any(|r| r.enabled) {
        return Err(ValidationError::NoEnabledRetailers);
    }
    Ok(())
}

/// Validate launch parameters, including the retailer table.
pub fn validate_parameters(p: &LaunchParameters) -> Result<(), ValidationError> {
    if p.product_category.trim().is_empty() {
        return Err(ValidationError::Blank("product category"));
    }
    if p.product_brand.trim().is_empty() {
        return Err(ValidationError::Blank("product brand"));
    }
    if !(1..=MAX_HORIZON_YEARS).contains(&p.num_years) {
        return Err(ValidationError::HorizonOutOfRange(p.num_years));
    }
    if finite(p.desired_irr, "desired discount rate")? <= -1.0 {
        return Err(ValidationError::DiscountRateTooLow);
    }
    non_negative(p.initial_investment, "initial investment")?;
    non_negative(p.margin_range, "margin tolerance")?;
    non_negative(p.price_range, "price tolerance")?;
    validate_pricing(&p.pricing)?;
    validate_retailers(&p.retailers)
}

/// Failures reported by the historical data store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// The store could not be reached.
    #[error("historical store unavailable: {0}")]
    Unavailable(String),
    /// A query failed or returned undecodable rows.
    #[error("historical query failed: {0}")]
    Query(String),
    /// No agreement for a retailer-year in the horizon.
    #[error("no retailer agreement for retailer {retailer_id} in year {year}")]
    MissingAgreement { retailer_id: i64, year: u32 },
    /// More than one agreement for the same retailer-year.
    #[error("{count} retailer agreements for retailer {retailer_id} in year {year}")]
    DuplicateAgreement {
        retailer_id: i64,
        year: u32,
        count: usize,
    },
}

/// Read-only access to retailers, comparables and retailer-year agreements.
#[async_trait]
pub trait HistoricalData: Send + Sync {
    /// Retailers whose names are in `names`. Unknown names are simply absent.
    async fn find_retailers(&self, names: &[&str]) -> Result<Vec<Retailer>, GatewayError>;

    /// Records admitted by `query` whose product matches its brand and category.
    async fn find_comparables(
        &self,
        query: &ComparableQuery,
    ) -> Result<Vec<ComparableRecord>, GatewayError>;

    /// The single agreement for `(retailer, year)`.
    async fn find_agreement(
        &self,
        retailer: RetailerId,
        year: u32,
    ) -> Result<RetailerYearAgreement, GatewayError>;
}

/// Market price lookup by product category.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Average observed retail price, or `None` when no data is available.
    async fn average_price(&self, category: &str) -> Option<f64>;
}
