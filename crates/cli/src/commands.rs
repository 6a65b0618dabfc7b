//! CLI command implementations

use crate::output::{format_usd, print_success, print_table, print_warning, OutputFormat};
use anyhow::{Context, Result};
use pricer_lib::{InferencePipeline, RawRecord, RawTable};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tabled::Tabled;

/// Row for the models table
#[derive(Tabled, serde::Serialize)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Format")]
    format: &'static str,
    #[tabled(rename = "Artifact")]
    artifact: String,
}

/// List registered models whose artifacts are present
pub fn list_models(pipeline: &InferencePipeline, format: OutputFormat) -> Result<()> {
    let rows: Vec<ModelRow> = pipeline
        .registry()
        .list()
        .into_iter()
        .map(|descriptor| ModelRow {
            name: descriptor.logical_name.clone(),
            format: descriptor.artifact_format.as_str(),
            artifact: descriptor.artifact_path.display().to_string(),
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}

/// Attributes of the diamond being priced
pub struct DiamondArgs {
    pub carat: f64,
    pub cut: String,
    pub color: String,
    pub clarity: String,
    pub depth: f64,
    pub table: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DiamondArgs {
    fn to_record(&self) -> RawRecord {
        let value = json!({
            "carat": self.carat,
            "cut": self.cut,
            "color": self.color,
            "clarity": self.clarity,
            "depth": self.depth,
            "table": self.table,
            "x": self.x,
            "y": self.y,
            "z": self.z
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }
}

/// Predict one diamond's price from command-line attributes
pub fn predict(
    pipeline: &InferencePipeline,
    model: &str,
    diamond: &DiamondArgs,
    format: OutputFormat,
) -> Result<()> {
    let prediction = pipeline.predict_one(&diamond.to_record(), model)?;

    match format {
        OutputFormat::Table => {
            print_success(&format!(
                "Predicted price ({}): {}",
                prediction.model,
                format_usd(prediction.price)
            ));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }
    Ok(())
}

/// Predict prices for a JSON file of rows
pub fn batch(
    pipeline: &InferencePipeline,
    model: &str,
    input: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file {}", input.display()))?;
    let rows: Vec<RawRecord> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of records", input.display()))?;
    let table = RawTable::from_rows(rows);

    let outcome = pipeline.predict_batch(&table, model)?;

    for reject in &outcome.rejected {
        print_warning(&format!("row {}: {}", reject.row_index, reject.error));
    }

    let result_rows = outcome.to_rows(&table);
    let rendered = serde_json::to_string_pretty(&result_rows)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            print_success(&format!(
                "{} predictions written to {} ({} rows rejected)",
                outcome.predictions.len(),
                path.display(),
                outcome.rejected.len()
            ));
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_lib::backend::{GradientBoostedTrees, RegressionTree, TreeNode};
    use pricer_lib::preprocess::PreprocessorArtifact;
    use pricer_lib::ServingOptions;
    use tempfile::TempDir;

    fn fixture_pipeline(dir: &TempDir) -> InferencePipeline {
        fs::write(
            dir.path().join("preprocessor.json"),
            serde_json::to_string(&PreprocessorArtifact::contract_default()).unwrap(),
        )
        .unwrap();

        let boosted = GradientBoostedTrees {
            base_score: 2000.0,
            learning_rate: 1.0,
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 1.0,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: 500.0 },
                    TreeNode::Leaf { value: 3000.0 },
                ],
            }],
        };
        fs::write(
            dir.path().join("gradient_boosting.json"),
            serde_json::to_vec(&boosted).unwrap(),
        )
        .unwrap();

        InferencePipeline::new(ServingOptions {
            models_dir: dir.path().to_path_buf(),
            preprocessor_path: dir.path().join("preprocessor.json"),
            ..Default::default()
        })
        .unwrap()
    }

    fn diamond() -> DiamondArgs {
        DiamondArgs {
            carat: 0.7,
            cut: "Ideal".to_string(),
            color: "G".to_string(),
            clarity: "VS2".to_string(),
            depth: 61.5,
            table: 57.0,
            x: 5.7,
            y: 5.7,
            z: 3.5,
        }
    }

    #[test]
    fn test_predict_command_succeeds() {
        let dir = TempDir::new().unwrap();
        let pipeline = fixture_pipeline(&dir);
        predict(
            &pipeline,
            "Gradient Boosting (JSON)",
            &diamond(),
            OutputFormat::Json,
        )
        .unwrap();
    }

    #[test]
    fn test_predict_command_surfaces_unknown_model() {
        let dir = TempDir::new().unwrap();
        let pipeline = fixture_pipeline(&dir);
        let error = predict(&pipeline, "CatBoost", &diamond(), OutputFormat::Table)
            .unwrap_err()
            .to_string();
        assert!(error.contains("CatBoost"));
    }

    #[test]
    fn test_batch_command_round_trip() {
        let dir = TempDir::new().unwrap();
        let pipeline = fixture_pipeline(&dir);

        let input = dir.path().join("rows.json");
        fs::write(
            &input,
            serde_json::to_string(&vec![diamond().to_record(), diamond().to_record()]).unwrap(),
        )
        .unwrap();
        let output = dir.path().join("out.json");

        batch(
            &pipeline,
            "Gradient Boosting (JSON)",
            &input,
            Some(&output),
        )
        .unwrap();

        let written: Vec<RawRecord> =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].contains_key("predicted_price"));
    }

    #[test]
    fn test_batch_command_rejects_malformed_input() {
        let dir = TempDir::new().unwrap();
        let pipeline = fixture_pipeline(&dir);

        let input = dir.path().join("rows.json");
        fs::write(&input, "{}").unwrap();

        let error = batch(&pipeline, "Gradient Boosting (JSON)", &input, None)
            .unwrap_err()
            .to_string();
        assert!(error.contains("JSON array"));
    }
}
