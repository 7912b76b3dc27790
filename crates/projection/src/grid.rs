//! Output sheet: a rectangular grid of text/number cells.

use crate::error::ProjectionError;
use serde::{Serialize, Serializer};

/// One spreadsheet cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cell {
    /// Serialized as an empty string, like a blank spreadsheet cell.
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// Row-major sheet with a fixed number of columns.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    /// Blank grid of `height` rows by `width` columns.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            rows: vec![vec![Cell::Empty; width]; height],
        }
    }

    /// Grid over prebuilt rows of equal width.
    pub(crate) fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Numeric value at `(row, col)`, if that cell holds a number.
    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        match self.get(row, col) {
            Some(Cell::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Text at `(row, col)`, if that cell holds text.
    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        match self.get(row, col) {
            Some(Cell::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set(
        &mut self,
        row: usize,
        col: usize,
        cell: impl Into<Cell>,
    ) -> Result<(), ProjectionError> {
        let slot = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(ProjectionError::Layout { row, col })?;
        *slot = cell.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_like_a_sheet() {
        let mut g = Grid::new(2, 2);
        g.set(0, 0, "Year 1").unwrap();
        g.set(1, 1, 2.5).unwrap();
        assert_eq!(
            serde_json::to_string(&g).unwrap(),
            r#"[["Year 1",""],["",2.5]]"#
        );
    }

    #[test]
    fn out_of_bounds_is_a_layout_error() {
        let mut g = Grid::new(1, 3);
        assert_eq!(g.width(), 3);
        assert!(matches!(
            g.set(1, 0, 1.0),
            Err(ProjectionError::Layout { row: 1, col: 0 })
        ));
        assert!(g.set(0, 3, 1.0).is_err());
        assert_eq!(g.number(0, 0), None);
        assert_eq!(g.get(5, 5), None);
    }
}
