//! Labeled sheet template with the row offset of every metric section.
//!
//! The engine only ever sees [`SectionOffsets`]; labels are placed here.

use crate::grid::{Cell, Grid};
use launch_core::Retailer;
use std::collections::HashMap;

/// First data row of each metric section.
///
/// Sections with retailer rows have one row per retailer starting at the
/// offset, followed by a TOTAL row (except retailer price). Net revenue is a
/// single row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionOffsets {
    pub volume: usize,
    pub retailer_price: usize,
    pub retailer_sales: usize,
    pub manufacturer_sales: usize,
    pub manufacturer_gross: usize,
    pub fixed_costs: usize,
    pub net_revenue: usize,
}

impl SectionOffsets {
    pub fn npv_row(&self) -> usize {
        self.net_revenue + 3
    }

    pub fn irr_row(&self) -> usize {
        self.net_revenue + 4
    }

    pub fn recommendation_row(&self) -> usize {
        self.net_revenue + 5
    }
}

/// Column holding year `year_index` (0-based).
pub fn year_column(year_index: usize) -> usize {
    year_index + 1
}

/// Column holding per-entity totals.
pub fn total_column(num_years: usize) -> usize {
    num_years + 1
}

/// Builds the empty, labeled projection sheet.
#[derive(Clone, Debug)]
pub struct SheetLayoutBuilder<'a> {
    retailers: &'a [Retailer],
    num_years: usize,
}

struct Cursor {
    labels: Vec<(usize, String)>,
    row: usize,
}

impl Cursor {
    fn label(&mut self, text: impl Into<String>) {
        self.labels.push((self.row, text.into()));
        self.row += 1;
    }

    /// Header, optional retailer rows and TOTAL row, then one blank row.
    /// Returns the section offset.
    fn section(&mut self, title: &str, retailers: Option<&[Retailer]>, total: bool) -> usize {
        self.label(title);
        let offset = match retailers {
            Some(list) => {
                let first = self.row;
                for r in list {
                    self.label(r.name.clone());
                }
                if total {
                    self.label("TOTAL");
                }
                first
            }
            None => self.row - 1,
        };
        self.row += 1;
        offset
    }
}

impl<'a> SheetLayoutBuilder<'a> {
    pub fn new(retailers: &'a [Retailer], num_years: usize) -> Self {
        Self {
            retailers,
            num_years,
        }
    }

    /// Empty grid with labels in column 0 and the year header row.
    pub fn build(&self) -> (Grid, SectionOffsets) {
        let retailers = Some(self.retailers);
        let mut cur = Cursor {
            labels: Vec::new(),
            row: 2,
        };
        let offsets = SectionOffsets {
            volume: cur.section("Volume (SKUs Sold)", retailers, true),
            retailer_price: cur.section("Retailer's Price", retailers, false),
            retailer_sales: cur.section("Retailer's Sales Revenue", retailers, true),
            manufacturer_sales: cur.section("Manufacturer's Sales Revenue", retailers, true),
            manufacturer_gross: cur.section("Manufacturer's Gross Revenue", retailers, true),
            fixed_costs: cur.section("Fixed Costs", retailers, true),
            net_revenue: cur.section("Net Revenue", None, false),
        };
        cur.label("DECISION OUTPUT");
        cur.label("NPV Analysis");
        cur.label("IRR Analysis");
        cur.label("Recommendation");

        let width = self.num_years + 2;
        let mut header = Vec::with_capacity(width);
        header.push(Cell::from("Launch Year:"));
        header.extend((0..self.num_years).map(|y| Cell::from(format!("Year {}", y + 1))));
        header.push(Cell::from("Total"));
        let mut labels: HashMap<usize, String> = cur.labels.into_iter().collect();
        let body = (1..cur.row).map(|row| {
            let mut line = Vec::with_capacity(width);
            line.push(labels.remove(&row).map_or(Cell::Empty, Cell::from));
            line.resize(width, Cell::Empty);
            line
        });
        let grid = Grid::from_rows(std::iter::once(header).chain(body).collect());
        (grid, offsets)
    }
}
