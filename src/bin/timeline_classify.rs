//! Classify-only run over artifacts a previous scrape left in OUTPUT_DIR
//! Run: cargo run --bin timeline-classify -- --channel <channel>

use ai_sports::settings::{init_tracing, ClassifyArgs, OutputArgs};
use ai_sports::stages::{ensure_complete, run_classify};
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use timeline_classifier::EventOutcome;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "timeline-classify", about = "Attribute relay entries to a side")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    classify: ClassifyArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let report = run_classify(&cli.classify, &cli.output.store(), &cli.output.log_dir).await?;

    for outcome in &report.outcomes {
        if let EventOutcome::Failed { index, attempts, reason } = outcome {
            warn!("#{index}: gave up after {attempts} attempts ({reason})");
        }
    }
    info!("{}/{} events classified", report.classified(), report.candidates);

    ensure_complete(&report)
}
