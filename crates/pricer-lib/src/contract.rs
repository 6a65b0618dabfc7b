//! The fixed feature contract the models were fitted against
//!
//! Nine attributes in a fixed order: carat, cut, color, clarity, depth,
//! table, x, y, z. The order matches the fitted preprocessing artifact;
//! reordering silently corrupts predictions, so every consumer goes through
//! [`FEATURE_COLUMNS`].

use crate::error::FeatureError;
use crate::models::{BatchValidation, RawRecord, RawTable, RowError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Ordered feature columns shared by the preprocessor and every model.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "carat", "cut", "color", "clarity", "depth", "table", "x", "y", "z",
];

/// Valid carat weight range.
pub const CARAT_RANGE: (f64, f64) = (0.1, 10.0);

/// Valid depth percentage range.
pub const DEPTH_RANGE: (f64, f64) = (43.0, 79.0);

/// Valid table percentage range.
pub const TABLE_RANGE: (f64, f64) = (43.0, 95.0);

/// Cut quality grades, ordinal worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cut {
    Fair,
    Good,
    #[serde(rename = "Very Good")]
    VeryGood,
    Premium,
    Ideal,
}

impl Cut {
    pub const ALL: [Cut; 5] = [Cut::Fair, Cut::Good, Cut::VeryGood, Cut::Premium, Cut::Ideal];

    pub fn as_str(self) -> &'static str {
        match self {
            Cut::Fair => "Fair",
            Cut::Good => "Good",
            Cut::VeryGood => "Very Good",
            Cut::Premium => "Premium",
            Cut::Ideal => "Ideal",
        }
    }

    /// Ordinal code used by the fitted encoders.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Cut> {
        Cut::ALL.get(code as usize).copied()
    }

    pub fn parse(label: &str) -> Option<Cut> {
        Cut::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color grades, ordinal worst (J) to best (D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    J,
    I,
    H,
    G,
    F,
    E,
    D,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::J,
        Color::I,
        Color::H,
        Color::G,
        Color::F,
        Color::E,
        Color::D,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::J => "J",
            Color::I => "I",
            Color::H => "H",
            Color::G => "G",
            Color::F => "F",
            Color::E => "E",
            Color::D => "D",
        }
    }

    /// Ordinal code used by the fitted encoders.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Color> {
        Color::ALL.get(code as usize).copied()
    }

    pub fn parse(label: &str) -> Option<Color> {
        Color::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clarity grades, ordinal worst (I1) to best (IF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clarity {
    I1,
    SI2,
    SI1,
    VS2,
    VS1,
    VVS2,
    VVS1,
    IF,
}

impl Clarity {
    pub const ALL: [Clarity; 8] = [
        Clarity::I1,
        Clarity::SI2,
        Clarity::SI1,
        Clarity::VS2,
        Clarity::VS1,
        Clarity::VVS2,
        Clarity::VVS1,
        Clarity::IF,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Clarity::I1 => "I1",
            Clarity::SI2 => "SI2",
            Clarity::SI1 => "SI1",
            Clarity::VS2 => "VS2",
            Clarity::VS1 => "VS1",
            Clarity::VVS2 => "VVS2",
            Clarity::VVS1 => "VVS1",
            Clarity::IF => "IF",
        }
    }

    /// Ordinal code used by the fitted encoders.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Clarity> {
        Clarity::ALL.get(code as usize).copied()
    }

    pub fn parse(label: &str) -> Option<Clarity> {
        Clarity::ALL.iter().copied().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Clarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diamond's attributes, validated against the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub carat: f32,
    pub cut: Cut,
    pub color: Color,
    pub clarity: Clarity,
    pub depth: f32,
    pub table: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Validate one raw record against the contract.
///
/// Checks presence of all nine fields, numeric range conformance, and
/// categorical membership, naming the offending field on failure. Numeric
/// fields accept JSON numbers or numeric strings, matching how uploaded
/// tabular data arrives.
pub fn validate(raw: &RawRecord) -> Result<FeatureRecord, FeatureError> {
    Ok(FeatureRecord {
        carat: numeric_field(raw, "carat", CARAT_RANGE.0, CARAT_RANGE.1)?,
        cut: cut_field(raw)?,
        color: color_field(raw)?,
        clarity: clarity_field(raw)?,
        depth: numeric_field(raw, "depth", DEPTH_RANGE.0, DEPTH_RANGE.1)?,
        table: numeric_field(raw, "table", TABLE_RANGE.0, TABLE_RANGE.1)?,
        x: numeric_field(raw, "x", 0.0, f64::INFINITY)?,
        y: numeric_field(raw, "y", 0.0, f64::INFINITY)?,
        z: numeric_field(raw, "z", 0.0, f64::INFINITY)?,
    })
}

/// Validate a whole table.
///
/// A required column absent from the table header is a wholesale rejection,
/// raised before any row-level work. Otherwise rows validate independently:
/// one bad row never aborts the batch, it is excluded and reported with its
/// index.
pub fn validate_batch(table: &RawTable) -> Result<BatchValidation, FeatureError> {
    for field in FEATURE_COLUMNS {
        if !table.has_column(field) {
            return Err(FeatureError::MissingField { field });
        }
    }

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for (index, row) in table.rows.iter().enumerate() {
        match validate(row) {
            Ok(record) => accepted.push((index, record)),
            Err(error) => rejected.push(RowError {
                row_index: index,
                error,
            }),
        }
    }

    Ok(BatchValidation { accepted, rejected })
}

fn present<'a>(raw: &'a RawRecord, field: &'static str) -> Result<&'a Value, FeatureError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(FeatureError::MissingField { field }),
        Some(value) => Ok(value),
    }
}

fn numeric_field(
    raw: &RawRecord,
    field: &'static str,
    min: f64,
    max: f64,
) -> Result<f32, FeatureError> {
    let value = present(raw, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(v) = parsed else {
        return Err(FeatureError::InvalidNumber {
            field,
            value: display_value(value),
        });
    };
    if !(v >= min && v <= max) {
        return Err(FeatureError::OutOfRange {
            field,
            value: v,
            min,
            max,
        });
    }
    Ok(v as f32)
}

fn category_field<T>(
    raw: &RawRecord,
    field: &'static str,
    expected: &[&str],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, FeatureError> {
    let unknown = |value: String| FeatureError::UnknownCategory {
        field,
        value,
        expected: joined(expected),
    };
    match present(raw, field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            parse(trimmed).ok_or_else(|| unknown(trimmed.to_string()))
        }
        other => Err(unknown(display_value(other))),
    }
}

fn cut_field(raw: &RawRecord) -> Result<Cut, FeatureError> {
    category_field(raw, "cut", &Cut::ALL.map(Cut::as_str), Cut::parse)
}

fn color_field(raw: &RawRecord) -> Result<Color, FeatureError> {
    category_field(raw, "color", &Color::ALL.map(Color::as_str), Color::parse)
}

fn clarity_field(raw: &RawRecord) -> Result<Clarity, FeatureError> {
    category_field(
        raw,
        "clarity",
        &Clarity::ALL.map(Clarity::as_str),
        Clarity::parse,
    )
}

fn joined(labels: &[&str]) -> String {
    labels.join(", ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_record() -> RawRecord {
        let value = json!({
            "carat": 0.7,
            "cut": "Ideal",
            "color": "G",
            "clarity": "VS2",
            "depth": 61.5,
            "table": 57.0,
            "x": 5.7,
            "y": 5.7,
            "z": 3.5
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_category_round_trip() {
        for cut in Cut::ALL {
            assert_eq!(Cut::parse(cut.as_str()), Some(cut));
            assert_eq!(Cut::from_code(cut.code()), Some(cut));
        }
        for color in Color::ALL {
            assert_eq!(Color::parse(color.as_str()), Some(color));
            assert_eq!(Color::from_code(color.code()), Some(color));
        }
        for clarity in Clarity::ALL {
            assert_eq!(Clarity::parse(clarity.as_str()), Some(clarity));
            assert_eq!(Clarity::from_code(clarity.code()), Some(clarity));
        }
    }

    #[test]
    fn test_ordinal_codes_match_fitted_encoding() {
        assert_eq!(Cut::Fair.code(), 0);
        assert_eq!(Cut::Ideal.code(), 4);
        assert_eq!(Color::J.code(), 0);
        assert_eq!(Color::D.code(), 6);
        assert_eq!(Clarity::I1.code(), 0);
        assert_eq!(Clarity::IF.code(), 7);
    }

    #[test]
    fn test_validate_accepts_reference_record() {
        let record = validate(&raw_record()).unwrap();
        assert_eq!(record.cut, Cut::Ideal);
        assert_eq!(record.color, Color::G);
        assert_eq!(record.clarity, Clarity::VS2);
        assert!((record.carat - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_accepts_numeric_strings() {
        let mut raw = raw_record();
        raw.insert("carat".to_string(), json!("0.7"));
        let record = validate(&raw).unwrap();
        assert!((record.carat - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_field_named() {
        let mut raw = raw_record();
        raw.remove("depth");
        match validate(&raw) {
            Err(FeatureError::MissingField { field }) => assert_eq!(field, "depth"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_named() {
        let mut raw = raw_record();
        raw.insert("carat".to_string(), json!(11.0));
        match validate(&raw) {
            Err(FeatureError::OutOfRange { field, .. }) => assert_eq!(field, "carat"),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut raw = raw_record();
        raw.insert("z".to_string(), json!(-1.0));
        assert!(matches!(
            validate(&raw),
            Err(FeatureError::OutOfRange { field: "z", .. })
        ));
    }

    #[test]
    fn test_unknown_category_named() {
        let mut raw = raw_record();
        raw.insert("cut".to_string(), json!("Shiny"));
        match validate(&raw) {
            Err(FeatureError::UnknownCategory { field, value, .. }) => {
                assert_eq!(field, "cut");
                assert_eq!(value, "Shiny");
            }
            other => panic!("expected UnknownCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_cannot_pass_validation() {
        let mut raw = raw_record();
        raw.insert("depth".to_string(), json!("NaN"));
        assert!(matches!(
            validate(&raw),
            Err(FeatureError::OutOfRange { field: "depth", .. })
        ));
    }

    #[test]
    fn test_batch_missing_column_rejected_wholesale() {
        let mut without_table = raw_record();
        without_table.remove("table");
        let table = RawTable::from_rows(vec![without_table.clone(), without_table]);
        match validate_batch(&table) {
            Err(FeatureError::MissingField { field }) => assert_eq!(field, "table"),
            other => panic!("expected wholesale MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_bad_row_excluded_not_fatal() {
        let good = raw_record();
        let mut bad = raw_record();
        bad.insert("cut".to_string(), json!("Shiny"));
        let table = RawTable::from_rows(vec![good.clone(), bad, good]);

        let validation = validate_batch(&table).unwrap();
        assert_eq!(validation.accepted.len(), 2);
        assert_eq!(validation.accepted[0].0, 0);
        assert_eq!(validation.accepted[1].0, 2);
        assert_eq!(validation.rejected.len(), 1);
        assert_eq!(validation.rejected[0].row_index, 1);
        assert!(matches!(
            validation.rejected[0].error,
            FeatureError::UnknownCategory { field: "cut", .. }
        ));
    }
}
