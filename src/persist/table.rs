// src/persist/table.rs
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::error::{LineageError, LineageResult};

/// Rendering of a missing cell in written tables
pub const MISSING_SENTINEL: &str = "--";

/// One table cell. `Missing` is distinct from an empty `Text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => f.write_str(MISSING_SENTINEL),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) if x.is_nan() => f.write_str(MISSING_SENTINEL),
            Cell::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(value.into())
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(value.into())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Missing, Into::into)
    }
}

/// Rectangular table: named columns and ordered rows of equal width
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the column count
    pub fn push_row<I, C>(&mut self, cells: I) -> LineageResult<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        let row: Vec<Cell> = cells.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(LineageError::InvalidInput(format!(
                "Row {} has {} cells, table has {} columns",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    /// Builder-style bulk append
    pub fn with_rows<I, R, C>(mut self, rows: I) -> LineageResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        for row in rows {
            self.push_row(row)?;
        }
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_rows() {
        let mut table = Table::new(["rsid", "chrom"]);
        table.push_row(["rs1", "1"]).unwrap();

        let err = table.push_row(["rs2"]).unwrap_err();
        assert!(matches!(err, LineageError::InvalidInput(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_differs_from_empty() {
        assert_eq!(Cell::from(None::<i64>).to_string(), "--");
        assert_eq!(Cell::from("").to_string(), "");
        assert!(Cell::from(None::<&str>).is_missing());
        assert!(!Cell::from("").is_missing());
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(Cell::from(3).to_string(), "3");
        assert_eq!(Cell::from(2.0).to_string(), "2.0");
        assert_eq!(Cell::from(0.25).to_string(), "0.25");
        assert_eq!(Cell::from(f64::NAN).to_string(), "--");
        assert_eq!(Cell::from(true).to_string(), "True");
    }
}
