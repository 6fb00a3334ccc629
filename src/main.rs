use clap::{Parser, ValueEnum};
use spoteval::{evaluate, EvalConfig, EvalInputs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spoteval")]
#[command(
    about = "Scene-text spotting evaluation: precision/recall/F-measure and 1-NED",
    long_about = None
)]
struct Cli {
    /// Ground truth: zip archive (or directory) of per-image JSON files
    #[arg(long)]
    gt: Option<PathBuf>,

    /// Prediction results JSON file
    #[arg(long)]
    pred: Option<PathBuf>,

    /// IoU thresholds (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "0.5")]
    threshold: Vec<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// Best F-measure and best 1-NED lines
    Text,
    /// Structured report
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let inputs = EvalInputs::from_args(cli.gt, cli.pred)?;
    let config = EvalConfig::with_thresholds(cli.threshold);

    let report = evaluate(&inputs, config)?;

    match cli.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
