//! Export a channel's realtime artifact as fine-tuning chat lines (JSONL, appended)
//! Run: cargo run --bin train-export -- --channel <channel> --out train_data.jsonl

use ai_sports::settings::{init_tracing, OutputArgs};
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use logger::{now_iso, EventLogger, TrainingExportEvent};
use std::path::PathBuf;
use timeline_classifier::training::append_training_file;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "train-export", about = "Append fine-tuning lines for a scraped match")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[arg(long, env = "TRAIN_DATA_PATH", default_value = "train_data.jsonl")]
    out: PathBuf,
}

fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let record = cli.output.store().load_match()?;
    let lines = append_training_file(&record, &cli.out)?;

    info!("Training data saved: {} lines → {}", lines, cli.out.display());

    let _ = EventLogger::new(&cli.output.log_dir).log(&TrainingExportEvent {
        ts:      now_iso(),
        event:   "TRAINING_EXPORT",
        channel: cli.output.channel.clone(),
        lines,
        path:    cli.out.display().to_string(),
    });
    Ok(())
}
