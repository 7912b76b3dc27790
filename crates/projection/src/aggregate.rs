//! Per-cell projections and their reduction into retailer, year and grand totals.

use launch_core::{ComparableRecord, RetailerYearAgreement};
use launch_econ::{mean, money_to_f64, retailer_price};
use std::ops::AddAssign;

/// Projection for one (retailer, year) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct CellProjection {
    pub retailer_index: usize,
    pub year_index: usize,
    pub list_price: f64,
    pub contribution_margin: f64,
    pub comparables: usize,
    pub retailer_price: f64,
    pub metrics: MetricTotals,
}

impl CellProjection {
    /// Derive the cell metrics from its resolved price, margin, agreement and
    /// comparables. Without comparables volume and every revenue are zero,
    /// while retailer price and fixed costs are still populated.
    pub fn compute(
        retailer_index: usize,
        year_index: usize,
        list_price: f64,
        contribution_margin: f64,
        agreement: &RetailerYearAgreement,
        comparables: &[ComparableRecord],
    ) -> Self {
        let volumes: Vec<f64> = comparables.iter().map(|c| c.volume_sold as f64).collect();
        let volume = mean(&volumes);
        let price = retailer_price(list_price, agreement.retailer_markup);
        let manufacturer_sales_revenue = volume * list_price;
        let metrics = MetricTotals {
            volume,
            retailer_sales_revenue: volume * price,
            manufacturer_sales_revenue,
            manufacturer_gross_revenue: manufacturer_sales_revenue * contribution_margin,
            fixed_costs: money_to_f64(agreement.fixed_costs()),
        };
        Self {
            retailer_index,
            year_index,
            list_price,
            contribution_margin,
            comparables: comparables.len(),
            retailer_price: price,
            metrics,
        }
    }
}

/// The additive metrics of a projection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricTotals {
    pub volume: f64,
    pub retailer_sales_revenue: f64,
    pub manufacturer_sales_revenue: f64,
    pub manufacturer_gross_revenue: f64,
    pub fixed_costs: f64,
}

impl MetricTotals {
    /// Gross revenue net of fixed costs.
    pub fn net_revenue(&self) -> f64 {
        self.manufacturer_gross_revenue - self.fixed_costs
    }
}

impl AddAssign<&MetricTotals> for MetricTotals {
    fn add_assign(&mut self, rhs: &MetricTotals) {
        self.volume += rhs.volume;
        self.retailer_sales_revenue += rhs.retailer_sales_revenue;
        self.manufacturer_sales_revenue += rhs.manufacturer_sales_revenue;
        self.manufacturer_gross_revenue += rhs.manufacturer_gross_revenue;
        self.fixed_costs += rhs.fixed_costs;
    }
}

/// Totals across the horizon per retailer, across retailers per year, and
/// overall.
#[derive(Clone, Debug, PartialEq)]
pub struct Rollup {
    pub per_retailer: Vec<MetricTotals>,
    pub per_year: Vec<MetricTotals>,
    pub grand: MetricTotals,
    /// Sum of the per-year net revenues.
    pub net_revenue: f64,
}

impl Rollup {
    /// Single reduction pass over independently computed cells.
    pub fn reduce(cells: &[CellProjection], num_retailers: usize, num_years: usize) -> Self {
        let mut per_retailer = vec![MetricTotals::default(); num_retailers];
        let mut per_year = vec![MetricTotals::default(); num_years];
        for cell in cells {
            if let Some(t) = per_retailer.get_mut(cell.retailer_index) {
                *t += &cell.metrics;
            }
            if let Some(t) = per_year.get_mut(cell.year_index) {
                *t += &cell.metrics;
            }
        }
        let mut grand = MetricTotals::default();
        let mut net_revenue = 0.0;
        for year in &per_year {
            grand += year;
            net_revenue += year.net_revenue();
        }
        Self {
            per_retailer,
            per_year,
            grand,
            net_revenue,
        }
    }

    /// Net revenue of each year, in horizon order.
    pub fn net_revenue_by_year(&self) -> Vec<f64> {
        self.per_year.iter().map(MetricTotals::net_revenue).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_core::RetailerId;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn agreement(markup: f64, fixed_cents: i64) -> RetailerYearAgreement {
        RetailerYearAgreement {
            retailer_id: RetailerId(1),
            year: 1,
            retailer_markup: markup,
            display_costs: Decimal::new(fixed_cents, 2),
            priority_shelving_costs: Decimal::ZERO,
            preferred_vendor_costs: Decimal::ZERO,
        }
    }

    fn comparable(volume: i64) -> ComparableRecord {
        ComparableRecord {
            retailer_id: RetailerId(1),
            product_id: 1,
            year: 1,
            volume_sold: volume,
            list_price: 10.0,
            contribution_margin: 0.3,
        }
    }

    #[test]
    fn cell_metrics_follow_formulas() {
        let cell = CellProjection::compute(
            0,
            0,
            10.0,
            0.25,
            &agreement(0.5, 20_000),
            &[comparable(100), comparable(300)],
        );
        assert_eq!(cell.comparables, 2);
        assert_eq!(cell.metrics.volume, 200.0);
        assert_eq!(cell.retailer_price, 15.0);
        assert_eq!(cell.metrics.retailer_sales_revenue, 3000.0);
        assert_eq!(cell.metrics.manufacturer_sales_revenue, 2000.0);
        assert_eq!(cell.metrics.manufacturer_gross_revenue, 500.0);
        assert_eq!(cell.metrics.fixed_costs, 200.0);
        assert_eq!(cell.metrics.net_revenue(), 300.0);
    }

    #[test]
    fn no_comparables_keeps_price_and_fixed_costs() {
        let cell = CellProjection::compute(0, 0, 8.0, 0.4, &agreement(0.25, 5_000), &[]);
        assert_eq!(cell.metrics.volume, 0.0);
        assert_eq!(cell.metrics.retailer_sales_revenue, 0.0);
        assert_eq!(cell.metrics.manufacturer_gross_revenue, 0.0);
        assert_eq!(cell.retailer_price, 10.0);
        assert_eq!(cell.metrics.fixed_costs, 50.0);
    }

    #[test]
    fn reduce_splits_by_retailer_and_year() {
        let a = agreement(0.0, 1_000);
        let cells = vec![
            CellProjection::compute(0, 0, 1.0, 1.0, &a, &[comparable(10)]),
            CellProjection::compute(1, 0, 1.0, 1.0, &a, &[comparable(20)]),
            CellProjection::compute(0, 1, 1.0, 1.0, &a, &[comparable(30)]),
            CellProjection::compute(1, 1, 1.0, 1.0, &a, &[]),
        ];
        let r = Rollup::reduce(&cells, 2, 2);
        assert_eq!(r.per_retailer[0].volume, 40.0);
        assert_eq!(r.per_retailer[1].volume, 20.0);
        assert_eq!(r.per_year[0].volume, 30.0);
        assert_eq!(r.per_year[1].volume, 30.0);
        assert_eq!(r.grand.volume, 60.0);
        assert_eq!(r.grand.fixed_costs, 40.0);
        assert_eq!(r.net_revenue_by_year(), vec![10.0, 10.0]);
        assert_eq!(r.net_revenue, 20.0);
    }

    proptest! {
        #[test]
        fn retailer_and_year_totals_agree(vols in proptest::collection::vec(0i64..50_000, 1..24),
                                          retailers in 1usize..4) {
            let a = agreement(0.1, 12_345);
            let years = vols.len().div_ceil(retailers);
            let cells: Vec<_> = vols.iter().enumerate().map(|(k, v)| {
                CellProjection::compute(k % retailers, k / retailers, 9.5, 0.3, &a, &[comparable(*v)])
            }).collect();
            let r = Rollup::reduce(&cells, retailers, years);
            let by_retailer: f64 = r.per_retailer.iter().map(|t| t.volume).sum();
            let by_year: f64 = r.per_year.iter().map(|t| t.volume).sum();
            prop_assert!((by_retailer - r.grand.volume).abs() < 1e-6);
            prop_assert!((by_year - r.grand.volume).abs() < 1e-6);
            let nets: f64 = r.net_revenue_by_year().iter().sum();
            prop_assert!((nets - r.net_revenue).abs() < 1e-6);
        }
    }
}
