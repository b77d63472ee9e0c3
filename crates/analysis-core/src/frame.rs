use std::collections::HashMap;

use serde::Serialize;

use crate::{AnalysisError, Bar};

/// One derived value per bar; `None` marks a value that is not computable yet.
pub type Series = Vec<Option<f64>>;

/// A named indicator column aligned with the frame's bars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Series,
}

/// Date-ordered bars plus the indicator columns derived from them.
///
/// Columns are append-only: each has exactly one value per bar and, once
/// inserted, can neither be replaced nor removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesFrame {
    bars: Vec<Bar>,
    columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TimeSeriesFrame {
    /// Build a frame over `bars`, which must be non-empty with strictly ascending dates.
    pub fn new(bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::EmptySeries);
        }

        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AnalysisError::InvalidData(format!(
                "bar dates must be strictly ascending ({} followed by {})",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self {
            bars,
            columns: Vec::new(),
            index: HashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_bar(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last_bar(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.index.get(name).map(|&i| self.columns[i].values.as_slice())
    }

    /// Value of column `name` at bar `idx`. `None` when the column is missing,
    /// the index is out of range, or the value is undefined.
    pub fn value(&self, name: &str, idx: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.get(idx).copied().flatten())
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Append a new column. Fails on a length mismatch or if `name` is taken.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Series) -> Result<(), AnalysisError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(AnalysisError::InvalidData(format!(
                "column '{}' has {} values for {} bars",
                name,
                values.len(),
                self.bars.len()
            )));
        }
        if self.index.contains_key(&name) {
            return Err(AnalysisError::InvalidData(format!("column '{}' already exists", name)));
        }

        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Index of the first of the last `n` bars
    pub fn tail_start(&self, n: usize) -> usize {
        self.bars.len().saturating_sub(n)
    }
}
