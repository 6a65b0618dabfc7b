//! Diamond Price CLI
//!
//! A command-line tool for listing registered models and running single or
//! batch price predictions against the local artifact directory.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::DiamondArgs;
use pricer_lib::{InferencePipeline, NormalizerConfig, ServingOptions};
use std::path::PathBuf;

/// Diamond Price CLI
#[derive(Parser)]
#[command(name = "dpc")]
#[command(author, version, about = "CLI for the diamond price serving pipeline", long_about = None)]
pub struct Cli {
    /// Models directory (can also be set via DPC_MODELS_DIR env var)
    #[arg(long, env = "DPC_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Preprocessing artifact file name under the models directory
    #[arg(long, default_value = "preprocessor.json")]
    pub preprocessor_file: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered models whose artifacts are present
    Models,

    /// Predict one diamond's price
    Predict {
        /// Logical model name, as shown by `dpc models`
        #[arg(long)]
        model: String,

        /// Carat weight
        #[arg(long)]
        carat: f64,

        /// Cut grade (Fair, Good, Very Good, Premium, Ideal)
        #[arg(long)]
        cut: String,

        /// Color grade (D through J)
        #[arg(long)]
        color: String,

        /// Clarity grade (I1 through IF)
        #[arg(long)]
        clarity: String,

        /// Depth percentage
        #[arg(long)]
        depth: f64,

        /// Table percentage
        #[arg(long)]
        table: f64,

        /// Length in mm
        #[arg(long)]
        x: f64,

        /// Width in mm
        #[arg(long)]
        y: f64,

        /// Height in mm
        #[arg(long)]
        z: f64,
    },

    /// Predict prices for a JSON file of rows
    Batch {
        /// Logical model name, as shown by `dpc models`
        #[arg(long)]
        model: String,

        /// Input file: a JSON array of records
        #[arg(long)]
        input: PathBuf,

        /// Output file for the result rows (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        output::print_error(&format!("{:#}", error));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = ServingOptions {
        preprocessor_path: cli.models_dir.join(&cli.preprocessor_file),
        models_dir: cli.models_dir,
        max_batch_rows: 10_000,
        normalizer: NormalizerConfig::default(),
    };
    let pipeline = InferencePipeline::new(options)?;

    match cli.command {
        Commands::Models => commands::list_models(&pipeline, cli.format),
        Commands::Predict {
            model,
            carat,
            cut,
            color,
            clarity,
            depth,
            table,
            x,
            y,
            z,
        } => {
            let diamond = DiamondArgs {
                carat,
                cut,
                color,
                clarity,
                depth,
                table,
                x,
                y,
                z,
            };
            commands::predict(&pipeline, &model, &diamond, cli.format)
        }
        Commands::Batch {
            model,
            input,
            output,
        } => commands::batch(&pipeline, &model, &input, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_predict_args_parse() {
        let cli = Cli::parse_from([
            "dpc", "predict", "--model", "Gradient Boosting", "--carat", "0.7", "--cut", "Ideal",
            "--color", "G", "--clarity", "VS2", "--depth", "61.5", "--table", "57.0", "--x",
            "5.7", "--y", "5.7", "--z", "3.5",
        ]);
        match cli.command {
            Commands::Predict { model, carat, .. } => {
                assert_eq!(model, "Gradient Boosting");
                assert!((carat - 0.7).abs() < f64::EPSILON);
            }
            _ => panic!("expected predict subcommand"),
        }
    }

    #[test]
    fn test_models_dir_default() {
        let cli = Cli::parse_from(["dpc", "models"]);
        assert_eq!(cli.models_dir, PathBuf::from("models"));
    }
}
