//! Boundary and result types for the serving pipeline

use crate::contract::FeatureRecord;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One raw inbound row: field name to JSON value. Columns beyond the
/// feature contract are allowed and passed through to batch output.
pub type RawRecord = Map<String, Value>;

/// A parsed table of raw rows plus its column set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    /// Build a table from rows, deriving the column set as the union of
    /// the rows' keys.
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        let mut columns = BTreeSet::new();
        for row in &rows {
            for key in row.keys() {
                columns.insert(key.clone());
            }
        }
        Self {
            columns: columns.into_iter().collect(),
            rows,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A validated batch split into accepted records (tagged with their
/// original row index) and per-row rejects.
#[derive(Debug)]
pub struct BatchValidation {
    pub accepted: Vec<(usize, FeatureRecord)>,
    pub rejected: Vec<RowError>,
}

/// A rejected batch row and the reason it was excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub row_index: usize,
    pub error: FeatureError,
}

/// Canonical single-record prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PricePrediction {
    /// Predicted price in USD.
    pub price: f32,
    /// Logical name of the model that produced the prediction.
    pub model: String,
    pub generated_at: i64,
}

/// One batch row's prediction, tagged with its original row index so the
/// caller never has to reconcile positions against rejects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowPrediction {
    pub row_index: usize,
    pub price: f32,
}

/// Outcome of a batch prediction: predictions for the surviving rows, in
/// input order, plus the rows that were excluded during validation.
#[derive(Debug)]
pub struct BatchOutcome {
    pub model: String,
    pub predictions: Vec<RowPrediction>,
    pub rejected: Vec<RowError>,
}

impl BatchOutcome {
    /// Render a flat row-oriented table: each surviving input row with its
    /// passthrough columns retained verbatim plus a `predicted_price`
    /// column.
    pub fn to_rows(&self, table: &RawTable) -> Vec<RawRecord> {
        self.predictions
            .iter()
            .filter_map(|prediction| {
                let mut row = table.rows.get(prediction.row_index)?.clone();
                row.insert(
                    "predicted_price".to_string(),
                    Value::from(f64::from(prediction.price)),
                );
                Some(row)
            })
            .collect()
    }
}
