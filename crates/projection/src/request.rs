//! Inbound request document.
//!
//! The retailer table arrives either as spreadsheet rows
//! (`[name, enabled, price]`, `[name, price]`) or as a list of objects.
//! A blank price cell (`""` or `null`) means "derive from the market".

use crate::error::ProjectionError;
use launch_core::{LaunchParameters, PricingMode, RetailerSelection};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub struct LaunchRequest {
    pub product_category: String,
    pub product_brand: String,
    pub pricing: PricingMode,
    pub retailers: Vec<Value>,
    pub num_years: u32,
    pub desired_irr: f64,
    #[serde(alias = "inital_investment")]
    pub initial_investment: f64,
    pub relevant_contribution_margin_range: f64,
    pub relevant_list_price_range: f64,
}

fn malformed(index: usize, what: &str) -> ProjectionError {
    ProjectionError::MalformedRequest(format!("retailer row {index}: {what}"))
}

fn name_cell(index: usize, cell: &Value) -> Result<String, ProjectionError> {
    cell.as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(index, "name must be a string"))
}

fn price_cell(index: usize, cell: &Value) -> Result<Option<f64>, ProjectionError> {
    match cell {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(index, "list price is not representable")),
        _ => Err(malformed(index, "list price must be a number or blank")),
    }
}

fn retailer_row(index: usize, row: &Value) -> Result<RetailerSelection, ProjectionError> {
    match row {
        Value::Array(cells) => match cells.as_slice() {
            [name, enabled, price] => Ok(RetailerSelection {
                name: name_cell(index, name)?,
                enabled: enabled
                    .as_bool()
                    .ok_or_else(|| malformed(index, "enabled flag must be a boolean"))?,
                list_price: price_cell(index, price)?,
            }),
            [name, price] => Ok(RetailerSelection {
                name: name_cell(index, name)?,
                enabled: true,
                list_price: price_cell(index, price)?,
            }),
            _ => Err(malformed(index, "expected 2 or 3 cells")),
        },
        Value::Object(_) => serde_json::from_value(row.clone())
            .map_err(|e| malformed(index, &e.to_string())),
        _ => Err(malformed(index, "expected an array or an object")),
    }
}

impl LaunchRequest {
    /// Normalize the document into launch parameters. Values are not
    /// validated here.
    pub fn into_parameters(self) -> Result<LaunchParameters, ProjectionError> {
        let retailers = self
            .retailers
            .iter()
            .enumerate()
            .map(|(i, row)| retailer_row(i, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LaunchParameters {
            product_category: self.product_category,
            product_brand: self.product_brand,
            pricing: self.pricing,
            retailers,
            num_years: self.num_years,
            desired_irr: self.desired_irr,
            initial_investment: self.initial_investment,
            margin_range: self.relevant_contribution_margin_range,
            price_range: self.relevant_list_price_range,
        })
    }
}

/// Decode a JSON request document into launch parameters.
pub fn decode_request(json: &str) -> Result<LaunchParameters, ProjectionError> {
    if json.trim().is_empty() {
        return Err(ProjectionError::MalformedRequest("empty request".into()));
    }
    let request: LaunchRequest = serde_json::from_str(json)
        .map_err(|e| ProjectionError::MalformedRequest(e.to_string()))?;
    request.into_parameters()
}
