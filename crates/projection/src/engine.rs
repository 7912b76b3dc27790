//! The projection engine: one report per invocation.

use crate::aggregate::{CellProjection, Rollup};
use crate::comparables::{comparable_query, select_comparables, Tolerance};
use crate::error::ProjectionError;
use crate::grid::Grid;
use crate::layout::{SectionOffsets, SheetLayoutBuilder};
use crate::price::PriceResolver;
use crate::writer::GridWriter;
use futures::future::try_join_all;
use launch_core::{validate_parameters, HistoricalData, LaunchParameters, PriceOracle, Retailer};
use launch_econ::{cashflow_series, evaluate, FinancialSummary};
use std::time::Duration;
use tracing::{debug, info};

/// Engine settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on a whole computation, oracle polling included.
    pub request_timeout: Duration,
    /// Upper bound on the market price lookup; past it the price is 0.
    pub price_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(90),
            price_timeout: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// Time granted to the price lookup. Capped at three quarters of the
    /// request timeout so a stalled oracle leaves room for the rest of the
    /// report.
    pub fn price_budget(&self) -> Duration {
        self.price_timeout.min(self.request_timeout.mul_f64(0.75))
    }
}

/// Result of one computation.
#[derive(Clone, Debug)]
pub struct Projection {
    pub grid: Grid,
    pub offsets: SectionOffsets,
    /// Retailers in grid row order.
    pub retailers: Vec<Retailer>,
    pub rollup: Rollup,
    /// `[-initial_investment, net_1, ..., net_n]`.
    pub cashflows: Vec<f64>,
    pub summary: FinancialSummary,
}

pub struct ProjectionEngine<'a> {
    history: &'a dyn HistoricalData,
    oracle: &'a dyn PriceOracle,
    config: EngineConfig,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(history: &'a dyn HistoricalData, oracle: &'a dyn PriceOracle) -> Self {
        Self {
            history,
            oracle,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate, project every (retailer, year) cell and evaluate the
    /// resulting cash flows. Nothing partial is returned on failure.
    pub async fn compute(&self, params: &LaunchParameters) -> Result<Projection, ProjectionError> {
        validate_parameters(params)?;
        let limit = self.config.request_timeout;
        tokio::time::timeout(limit, self.run(params))
            .await
            .map_err(|_| ProjectionError::Timeout(limit))?
    }

    /// Enabled retailers in request order; any name the store lacks fails
    /// the whole request.
    async fn resolve_retailers(
        &self,
        params: &LaunchParameters,
    ) -> Result<Vec<Retailer>, ProjectionError> {
        let names = params.enabled_retailers();
        let found = self.history.find_retailers(&names).await?;
        let mut ordered = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match found.iter().find(|r| r.name == name) {
                Some(r) => ordered.push(r.clone()),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ProjectionError::UnknownRetailers(missing));
        }
        Ok(ordered)
    }

    async fn run(&self, params: &LaunchParameters) -> Result<Projection, ProjectionError> {
        let retailers = self.resolve_retailers(params).await?;
        let num_years = params.num_years as usize;
        info!(
            category = %params.product_category,
            brand = %params.product_brand,
            retailers = retailers.len(),
            years = num_years,
            "computing launch projection"
        );
        let (mut grid, offsets) = SheetLayoutBuilder::new(&retailers, num_years).build();

        let prices = PriceResolver::new(
            self.oracle,
            &params.product_category,
            self.config.price_budget(),
        );
        let tolerance = Tolerance {
            margin: params.margin_range,
            price: params.price_range,
        };
        let mut pending = Vec::with_capacity(retailers.len() * num_years);
        for year_index in 0..num_years {
            for (retailer_index, retailer) in retailers.iter().enumerate() {
                pending.push(self.project_cell(
                    params,
                    &prices,
                    tolerance,
                    retailer_index,
                    retailer,
                    year_index,
                ));
            }
        }
        let cells = try_join_all(pending).await?;

        let rollup = Rollup::reduce(&cells, retailers.len(), num_years);
        let cashflows = cashflow_series(params.initial_investment, &rollup.net_revenue_by_year());
        let summary = evaluate(&cashflows, params.desired_irr)?;

        let mut writer = GridWriter::new(&mut grid, offsets, retailers.len(), num_years);
        writer.write_cells(&cells)?;
        writer.write_totals(&rollup)?;
        writer.write_decision(&summary)?;

        info!(
            npv = summary.npv,
            irr = summary.irr,
            recommendation = ?summary.recommendation,
            "projection complete"
        );
        Ok(Projection {
            grid,
            offsets,
            retailers,
            rollup,
            cashflows,
            summary,
        })
    }

    async fn project_cell(
        &self,
        params: &LaunchParameters,
        prices: &PriceResolver<'_>,
        tolerance: Tolerance,
        retailer_index: usize,
        retailer: &Retailer,
        year_index: usize,
    ) -> Result<CellProjection, ProjectionError> {
        let year = year_index as u32 + 1;
        let agreement = self.history.find_agreement(retailer.id, year).await?;
        let list_price = prices
            .resolve(params.user_price(&retailer.name), agreement.retailer_markup)
            .await;
        let margin = params.pricing.contribution_margin(list_price);
        let query = comparable_query(
            retailer.id,
            year,
            &params.product_brand,
            &params.product_category,
            margin,
            list_price,
            tolerance,
        );
        let comparables = select_comparables(self.history, &query).await?;
        debug!(
            retailer = %retailer.name,
            year,
            list_price,
            margin,
            comparables = comparables.len(),
            "projected cell"
        );
        Ok(CellProjection::compute(
            retailer_index,
            year_index,
            list_price,
            margin,
            &agreement,
            &comparables,
        ))
    }
}
