#![deny(warnings)]

//! Financial models: pricing and time-value helpers for launch projections.
//!
//! This module provides validated utilities for:
//! - Backing an implied list price out of an observed retail price
//! - Retail price under a retailer markup
//! - Net present value and internal rate of return of a yearly series
//! - The accept/reject recommendation derived from NPV and IRR

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// IRR reported when the series has no real root.
///
/// Very negative so that `irr < desired_rate` always holds.
pub const IRR_NOT_FOUND: f64 = -1.0e9;

const NEWTON_MAX_ITERATIONS: usize = 100;
const NEWTON_GUESS: f64 = 0.1;
const RATE_FLOOR: f64 = -1.0 + 1e-9;
const RATE_CEILING: f64 = 100.0;
const BISECTION_ITERATIONS: usize = 200;

/// Errors produced by financial helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Discount rate must be finite and > -1.
    #[error("invalid discount rate: {0}")]
    InvalidRate(f64),
    /// A cash-flow series needs at least the year-0 entry.
    #[error("empty cash-flow series")]
    EmptySeries,
}

/// Convert a money amount to floating point for projection arithmetic.
pub fn money_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// List price implied by an observed retail price under a markup.
///
/// Applying `markup` to the result reproduces `retail_price`.
///
/// Example:
/// assert_eq!(implied_list_price(12.0, 0.2), 10.0);
pub fn implied_list_price(retail_price: f64, markup: f64) -> f64 {
    retail_price / (1.0 + markup)
}

/// Price the retailer charges end consumers.
pub fn retailer_price(list_price: f64, markup: f64) -> f64 {
    list_price * (1.0 + markup)
}

/// Arithmetic mean, or 0 for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// `[-initial_investment, net_1, ..., net_n]`.
pub fn cashflow_series(initial_investment: f64, net_revenues: &[f64]) -> Vec<f64> {
    let mut flows = Vec::with_capacity(net_revenues.len() + 1);
    flows.push(-initial_investment);
    flows.extend_from_slice(net_revenues);
    flows
}

fn npv_unchecked(rate: f64, cashflows: &[f64]) -> f64 {
    let base = 1.0 + rate;
    cashflows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / base.powi(t as i32))
        .sum()
}

fn npv_derivative(rate: f64, cashflows: &[f64]) -> f64 {
    let base = 1.0 + rate;
    cashflows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / base.powi(t as i32 + 1))
        .sum()
}

/// Net present value with the year-0 entry undiscounted.
///
/// Example:
/// let v = npv(0.1, &[-100.0, 110.0]).unwrap();
/// assert!(v.abs() < 1e-9);
pub fn npv(rate: f64, cashflows: &[f64]) -> Result<f64, EconError> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(EconError::InvalidRate(rate));
    }
    if cashflows.is_empty() {
        return Err(EconError::EmptySeries);
    }
    Ok(npv_unchecked(rate, cashflows))
}

fn tolerance(cashflows: &[f64]) -> f64 {
    let scale = cashflows.iter().fold(1.0_f64, |m, cf| m.max(cf.abs()));
    scale * 1e-10
}

fn newton_irr(cashflows: &[f64]) -> Option<f64> {
    let tol = tolerance(cashflows);
    let mut rate = NEWTON_GUESS;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let value = npv_unchecked(rate, cashflows);
        if value.abs() < tol {
            return Some(rate);
        }
        let slope = npv_derivative(rate, cashflows);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let next = (rate - value / slope).clamp(RATE_FLOOR, RATE_CEILING);
        if (next - rate).abs() < 1e-14 {
            return (npv_unchecked(next, cashflows).abs() < tol).then_some(next);
        }
        rate = next;
    }
    None
}

fn scan_points() -> impl Iterator<Item = f64> {
    // -1 + 1e-9, ..., -0.999 approach the pole at -100%
    let near_pole = (3..=9).rev().map(|k| -1.0 + 10f64.powi(-k));
    let fine = (-99..=1000).map(|i| i as f64 / 100.0);
    let coarse = (11..=100).map(|i| i as f64);
    near_pole.chain(fine).chain(coarse)
}

fn bisect(cashflows: &[f64], mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = npv_unchecked(lo, cashflows);
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv_unchecked(mid, cashflows);
        if f_mid == 0.0 {
            return mid;
        }
        if (f_mid < 0.0) == (f_lo < 0.0) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Root closest to zero among the sign changes on a fixed rate grid.
fn bracketed_irr(cashflows: &[f64]) -> Option<f64> {
    let mut roots = Vec::new();
    let mut prev: Option<(f64, f64)> = None;
    for r in scan_points() {
        let v = npv_unchecked(r, cashflows);
        if !v.is_finite() {
            prev = None;
            continue;
        }
        if v == 0.0 {
            roots.push(r);
        } else if let Some((pr, pv)) = prev {
            if pv != 0.0 && (pv < 0.0) != (v < 0.0) {
                roots.push(bisect(cashflows, pr, r));
            }
        }
        prev = Some((r, v));
    }
    roots
        .into_iter()
        .min_by(|a, b| a.abs().total_cmp(&b.abs()))
}

/// Internal rate of return: the rate at which NPV is zero.
///
/// Returns `None` for degenerate series (fewer than two entries, non-finite
/// entries, or no sign change) and when no root can be located.
pub fn irr(cashflows: &[f64]) -> Option<f64> {
    if cashflows.len() < 2 || cashflows.iter().any(|cf| !cf.is_finite()) {
        return None;
    }
    let has_inflow = cashflows.iter().any(|&cf| cf > 0.0);
    let has_outflow = cashflows.iter().any(|&cf| cf < 0.0);
    if !(has_inflow && has_outflow) {
        return None;
    }
    newton_irr(cashflows).or_else(|| {
        debug!("newton IRR did not converge, scanning for a bracket");
        bracketed_irr(cashflows)
    })
}

/// IRR, or [`IRR_NOT_FOUND`] when there is no real root.
pub fn irr_or_sentinel(cashflows: &[f64]) -> f64 {
    irr(cashflows).unwrap_or(IRR_NOT_FOUND)
}

/// Accept/reject outcome of a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// NPV is negative.
    NotViable,
    /// NPV is non-negative but IRR is below the desired rate.
    BelowDesiredReturn,
    /// NPV is non-negative and IRR meets the desired rate.
    Accept,
}

impl Recommendation {
    /// Text written into the recommendation cell.
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::NotViable => "Project is not Financially Viable. Reject.",
            Recommendation::BelowDesiredReturn => {
                "Project is Financially Viable, but does not meet desired IRR. Reject."
            }
            Recommendation::Accept => "Project is Financially Viable. Accept.",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Recommendation in precedence order: NPV first, then IRR.
pub fn recommend(npv: f64, irr: f64, desired_irr: f64) -> Recommendation {
    if npv < 0.0 {
        Recommendation::NotViable
    } else if irr < desired_irr {
        Recommendation::BelowDesiredReturn
    } else {
        Recommendation::Accept
    }
}

/// NPV, IRR and the resulting recommendation for one cash-flow series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub npv: f64,
    pub irr: f64,
    pub recommendation: Recommendation,
}

/// Evaluate a cash-flow series at the desired discount rate.
pub fn evaluate(cashflows: &[f64], desired_irr: f64) -> Result<FinancialSummary, EconError> {
    let npv = npv(desired_irr, cashflows)?;
    let irr = irr_or_sentinel(cashflows);
    Ok(FinancialSummary {
        npv,
        irr,
        recommendation: recommend(npv, irr, desired_irr),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn implied_price_inverts_markup() {
        assert!(close(implied_list_price(12.0, 0.2), 10.0));
        assert!(close(retailer_price(implied_list_price(7.5, 0.35), 0.35), 7.5));
        assert_eq!(implied_list_price(0.0, 0.3), 0.0);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert!(close(mean(&[1.0, 2.0, 6.0]), 3.0));
    }

    #[test]
    fn series_prefixes_investment() {
        assert_eq!(
            cashflow_series(1000.0, &[10.0, 20.0]),
            vec![-1000.0, 10.0, 20.0]
        );
    }

    #[test]
    fn npv_basic() {
        assert!(close(npv(0.1, &[-100.0, 110.0]).unwrap(), 0.0));
        assert!(close(npv(0.0, &[-5.0, 2.0, 2.0]).unwrap(), -1.0));
        // year 0 undiscounted
        assert!(close(npv(0.5, &[-1000.0]).unwrap(), -1000.0));
    }

    #[test]
    fn npv_rejects_bad_input() {
        assert_eq!(npv(-1.0, &[1.0]), Err(EconError::InvalidRate(-1.0)));
        assert!(npv(f64::NAN, &[1.0]).is_err());
        assert_eq!(npv(0.1, &[]), Err(EconError::EmptySeries));
    }

    #[test]
    fn irr_simple_series() {
        let r = irr(&[-100.0, 110.0]).unwrap();
        assert!(close(r, 0.1));
        let flows = [-1000.0, 300.0, 400.0, 500.0];
        let r = irr(&flows).unwrap();
        assert!(npv(r, &flows).unwrap().abs() < 1e-6);
    }

    #[test]
    fn irr_negative_rate() {
        let flows = [-1000.0, 400.0, 400.0];
        let r = irr(&flows).unwrap();
        assert!(r < 0.0);
        assert!(npv(r, &flows).unwrap().abs() < 1e-6);
    }

    #[test]
    fn irr_below_minus_99_percent_is_found() {
        let flows = [-1000.0, 5.0];
        let r = irr(&flows).unwrap();
        assert!((r + 0.995).abs() < 1e-9, "{r}");
        assert!(npv(r, &flows).unwrap().abs() < 1e-6);
        assert_ne!(irr_or_sentinel(&flows), IRR_NOT_FOUND);
        let r = irr(&[-1000.0, 0.01, 0.01]).unwrap();
        assert!(r > -1.0 && r < -0.99, "{r}");
    }

    #[test]
    fn irr_degenerate_series_use_sentinel() {
        assert_eq!(irr(&[0.0, 0.0, 0.0]), None);
        assert_eq!(irr(&[-10.0, -5.0, -1.0]), None);
        assert_eq!(irr(&[10.0, 5.0]), None);
        assert_eq!(irr(&[-10.0]), None);
        assert_eq!(irr_or_sentinel(&[-1000.0, -50.0, -50.0]), IRR_NOT_FOUND);
    }

    #[test]
    fn recommendation_precedence() {
        assert_eq!(recommend(-1.0, 5.0, 0.1), Recommendation::NotViable);
        assert_eq!(recommend(0.0, 0.05, 0.1), Recommendation::BelowDesiredReturn);
        assert_eq!(recommend(10.0, IRR_NOT_FOUND, 0.1), Recommendation::BelowDesiredReturn);
        assert_eq!(recommend(10.0, 0.1, 0.1), Recommendation::Accept);
        assert_eq!(
            Recommendation::NotViable.to_string(),
            "Project is not Financially Viable. Reject."
        );
    }

    #[test]
    fn evaluate_all_fixed_costs_rejects() {
        let flows = cashflow_series(1000.0, &[-300.0, -300.0]);
        let s = evaluate(&flows, 0.1).unwrap();
        assert!(s.npv < 0.0);
        assert_eq!(s.irr, IRR_NOT_FOUND);
        assert_eq!(s.recommendation, Recommendation::NotViable);
    }

    #[test]
    fn evaluate_profitable_accepts() {
        let flows = cashflow_series(1000.0, &[600.0, 600.0]);
        let s = evaluate(&flows, 0.05).unwrap();
        assert!(s.npv > 0.0);
        assert!(s.irr > 0.05);
        assert_eq!(s.recommendation, Recommendation::Accept);
    }

    #[test]
    fn money_conversion() {
        assert!(close(money_to_f64(Decimal::new(12_345, 2)), 123.45));
    }

    proptest! {
        #[test]
        fn npv_decreasing_in_rate(inv in 1.0f64..1e6,
                                  flows in proptest::collection::vec(0.0f64..1e5, 1..10),
                                  r in 0.0f64..0.5,
                                  dr in 0.001f64..0.5) {
            let series = cashflow_series(inv, &flows);
            let a = npv(r, &series).unwrap();
            let b = npv(r + dr, &series).unwrap();
            prop_assert!(b <= a + 1e-9);
        }

        #[test]
        fn irr_zeroes_npv(inv in 100.0f64..1e5, flows in proptest::collection::vec(1.0f64..1e5, 1..8)) {
            let series = cashflow_series(inv, &flows);
            if let Some(r) = irr(&series) {
                let v = npv(r, &series).unwrap();
                prop_assert!(v.abs() <= 1e-6 * inv.max(1.0));
            }
        }

        #[test]
        fn negative_npv_always_rejects(npv_v in -1e9f64..-1e-9, irr_v in -1.0f64..10.0, d in -0.5f64..1.0) {
            prop_assert_eq!(recommend(npv_v, irr_v, d), Recommendation::NotViable);
        }
    }
}
