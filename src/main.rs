/// AiSports — Match Pipeline
///
/// What it does:
///   1. Renders the lineup + relay pages of one match (headless Chrome)
///   2. Writes <channel>_player.json, <channel>_realtime.json, <channel>_highlight.json
///   3. Attributes unresolved relay entries to a side via few-shot completion
///   4. Rewrites the realtime + highlight artifacts
///
/// Run:
///   cargo run --bin match-pipeline -- --match-id 2024041951048615703 --channel 978

use ai_sports::settings::{init_tracing, ClassifyArgs, OutputArgs, ScrapeArgs};
use ai_sports::stages::{ensure_complete, run_classify, run_scrape};
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "match-pipeline", about = "Scrape a match relay and classify its timeline")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    scrape: ScrapeArgs,
    #[command(flatten)]
    classify: ClassifyArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    info!("=== Match pipeline: match {} → channel {} ===", cli.scrape.match_id, cli.output.channel);

    let scraped = run_scrape(&cli.scrape, &cli.output).await?;
    info!(
        "Scraped {} players, {} relay entries",
        scraped.roster.len(),
        scraped.record.timeline.len()
    );

    let report = run_classify(&cli.classify, &cli.output.store(), &cli.output.log_dir).await?;
    ensure_complete(&report)
}
