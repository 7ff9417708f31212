//! cropsim CLI
//!
//! Fits the yield model on the historical dataset and simulates a scenario.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cropsim_core::Scenario;
use cropsim_service::{ServiceConfig, Session};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cropsim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Crop yield simulator with economic analysis", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV (overrides config and CROPSIM_DATASET)
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the model and report held-out metrics
    Train {
        /// Print the dataset summary as well
        #[arg(long)]
        summary: bool,
    },

    /// Simulate one scenario; unset inputs default from the dataset
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a JSON inference request
    Predict {
        /// Request object keyed by dataset column names
        request: String,
    },
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    soil: Option<String>,

    #[arg(long)]
    crop: Option<String>,

    #[arg(long)]
    weather: Option<String>,

    /// Rainfall in mm
    #[arg(long)]
    rainfall: Option<f64>,

    /// Temperature in °C
    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    days_to_harvest: Option<f64>,

    /// Skip fertilizer
    #[arg(long)]
    no_fertilizer: bool,

    /// Skip irrigation
    #[arg(long)]
    no_irrigation: bool,
}

impl ScenarioArgs {
    fn apply(self, mut scenario: Scenario) -> Scenario {
        if let Some(v) = self.region {
            scenario.region = v;
        }
        if let Some(v) = self.soil {
            scenario.soil_type = v;
        }
        if let Some(v) = self.crop {
            scenario.crop = v;
        }
        if let Some(v) = self.weather {
            scenario.weather_condition = v;
        }
        if let Some(v) = self.rainfall {
            scenario.rainfall_mm = v;
        }
        if let Some(v) = self.temperature {
            scenario.temperature_celsius = v;
        }
        if let Some(v) = self.days_to_harvest {
            scenario.days_to_harvest = v;
        }
        scenario.fertilizer_used = !self.no_fertilizer;
        scenario.irrigation_used = !self.no_irrigation;
        scenario
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(path) = cli.dataset {
        config.dataset.path = path;
    }

    init_logging(if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    });

    info!("cropsim v{}", cropsim_service::VERSION);

    let session = Session::start(&config).context("Failed to start session")?;

    match cli.command {
        Command::Train { summary } => {
            let metrics = session.metrics();
            println!("Train rows:  {}", metrics.train_samples);
            println!("Test rows:   {}", metrics.test_samples);
            println!("MAE:         {:.4}", metrics.mean_absolute_error);
            println!("R²:          {:.4}", metrics.r_squared);
            if let Some(model) = session.service().snapshot() {
                println!("Model hash:  {}", model.forest.hash_hex()?);
            }
            if summary {
                println!("{}", serde_json::to_string_pretty(&session.summary())?);
            }
        }
        Command::Simulate { scenario, json } => {
            let scenario = scenario.apply(session.default_scenario());
            let report = session
                .simulate(scenario)
                .context("Simulation failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Predict { request } => {
            let value: serde_json::Value =
                serde_json::from_str(&request).context("Request is not valid JSON")?;
            let response = session.service().infer_value(value);
            println!("{}", serde_json::to_string(&response)?);
            if matches!(response, cropsim_service::InferenceResponse::Error { .. }) {
                bail!("inference failed");
            }
        }
    }

    Ok(())
}

/// Initialize logging; `RUST_LOG` takes precedence over the configured level
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
