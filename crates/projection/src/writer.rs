//! Positional writes of projection results into the laid-out grid.

use crate::aggregate::{CellProjection, MetricTotals, Rollup};
use crate::error::ProjectionError;
use crate::grid::Grid;
use crate::layout::{total_column, year_column, SectionOffsets};
use launch_econ::FinancialSummary;

/// Additive sections and the metric each one shows.
fn additive_sections(offsets: &SectionOffsets) -> [(usize, fn(&MetricTotals) -> f64); 5] {
    [
        (offsets.volume, |m: &MetricTotals| m.volume),
        (offsets.retailer_sales, |m: &MetricTotals| m.retailer_sales_revenue),
        (offsets.manufacturer_sales, |m: &MetricTotals| m.manufacturer_sales_revenue),
        (offsets.manufacturer_gross, |m: &MetricTotals| m.manufacturer_gross_revenue),
        (offsets.fixed_costs, |m: &MetricTotals| m.fixed_costs),
    ]
}

pub struct GridWriter<'g> {
    grid: &'g mut Grid,
    offsets: SectionOffsets,
    num_retailers: usize,
    num_years: usize,
}

impl<'g> GridWriter<'g> {
    pub fn new(
        grid: &'g mut Grid,
        offsets: SectionOffsets,
        num_retailers: usize,
        num_years: usize,
    ) -> Self {
        Self {
            grid,
            offsets,
            num_retailers,
            num_years,
        }
    }

    /// Per-retailer, per-year values.
    pub fn write_cells(&mut self, cells: &[CellProjection]) -> Result<(), ProjectionError> {
        for cell in cells {
            let col = year_column(cell.year_index);
            let r = cell.retailer_index;
            self.grid
                .set(self.offsets.retailer_price + r, col, cell.retailer_price)?;
            for (offset, metric) in additive_sections(&self.offsets) {
                self.grid.set(offset + r, col, metric(&cell.metrics))?;
            }
        }
        Ok(())
    }

    /// TOTAL rows, the totals column and the net revenue row.
    pub fn write_totals(&mut self, rollup: &Rollup) -> Result<(), ProjectionError> {
        let total_col = total_column(self.num_years);
        let total_row = self.num_retailers;
        for (offset, metric) in additive_sections(&self.offsets) {
            for (y, totals) in rollup.per_year.iter().enumerate() {
                self.grid
                    .set(offset + total_row, year_column(y), metric(totals))?;
            }
            for (r, totals) in rollup.per_retailer.iter().enumerate() {
                self.grid.set(offset + r, total_col, metric(totals))?;
            }
            self.grid
                .set(offset + total_row, total_col, metric(&rollup.grand))?;
        }
        for (y, net) in rollup.net_revenue_by_year().into_iter().enumerate() {
            self.grid.set(self.offsets.net_revenue, year_column(y), net)?;
        }
        self.grid
            .set(self.offsets.net_revenue, total_col, rollup.net_revenue)
    }

    /// NPV, IRR and the recommendation text, in the first data column.
    pub fn write_decision(&mut self, summary: &FinancialSummary) -> Result<(), ProjectionError> {
        let col = year_column(0);
        self.grid.set(self.offsets.npv_row(), col, summary.npv)?;
        self.grid.set(self.offsets.irr_row(), col, summary.irr)?;
        self.grid.set(
            self.offsets.recommendation_row(),
            col,
            summary.recommendation.message(),
        )
    }
}
