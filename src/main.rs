/// Интерактивный оценщик стоимости участков

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ppzfa_estimator::prompt::{PromptError, Prompter};
use ppzfa_estimator::{EstimatorConfig, EstimatorError, ValuePredictor};

/// Real Estate Value Predictor
#[derive(Parser)]
#[command(name = "ppzfa-estimator")]
#[command(author, version, about = "Estimate PPZFA and total value of a lot", long_about = None)]
struct Cli {
    /// CSV dataset with historical transactions
    #[arg(long, env = "PPZFA_DATA")]
    data: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Number of trees in the forest
    #[arg(long)]
    trees: Option<usize>,

    /// Random seed for the forest
    #[arg(long)]
    seed: Option<u64>,

    /// Print prediction results as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> Result<EstimatorConfig> {
        let mut config = match &self.config {
            Some(path) => EstimatorConfig::load(path)?,
            None => EstimatorConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(trees) = self.trees {
            config.forest.n_estimators = trees;
        }
        if let Some(seed) = self.seed {
            config.forest.random_state = seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    println!("Loading and training the model...");
    let mut predictor = ValuePredictor::from_config(&config);
    if let Err(e) = predictor.train_from_path(&config.data_path) {
        eprintln!("\nError: {}", e);
        eprintln!("Please ensure the dataset file is available and try again.");
        return Err(e).context("training failed");
    }
    println!("\nModel is ready for predictions!");

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    loop {
        let input = match prompter.read_input() {
            Ok(input) => input,
            Err(PromptError::Input(e)) => {
                eprintln!("\nError: {}", e);
                continue;
            }
            Err(PromptError::Closed) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };

        match predictor.predict(&input) {
            Ok(result) if cli.json => println!("{}", serde_json::to_string_pretty(&result)?),
            Ok(result) => prompter.show_result(&result)?,
            Err(e @ EstimatorError::InputValidation(_)) => eprintln!("\nError: {}", e),
            Err(e) => return Err(e).context("prediction failed"),
        }

        match prompter.ask_continue() {
            Ok(true) => continue,
            Ok(false) | Err(PromptError::Closed) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }

    println!("\nThank you for using the Real Estate Value Predictor!");
    Ok(())
}
