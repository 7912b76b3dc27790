#![deny(warnings)]

//! Launch projection engine.
//!
//! Given launch parameters, the engine resolves a list price per retailer
//! per year, selects comparable historical records within tolerance bands,
//! projects volume, revenue and fixed costs per cell, rolls cells up into
//! per-retailer, per-year and grand totals, and evaluates the resulting cash
//! flows (NPV, IRR, recommendation). Results are written positionally into a
//! labeled sheet built by [`SheetLayoutBuilder`].

pub mod aggregate;
pub mod comparables;
pub mod engine;
pub mod error;
pub mod grid;
pub mod layout;
pub mod price;
pub mod request;
pub mod writer;

pub use aggregate::{CellProjection, MetricTotals, Rollup};
pub use engine::{EngineConfig, Projection, ProjectionEngine};
pub use error::{ErrorBody, ErrorKind, ProjectionError};
pub use grid::{Cell, Grid};
pub use layout::{total_column, year_column, SectionOffsets, SheetLayoutBuilder};
pub use request::{decode_request, LaunchRequest};
