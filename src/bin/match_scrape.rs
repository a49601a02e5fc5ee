//! Scrape-only run: lineup + relay → roster / realtime / highlight artifacts
//! Run: cargo run --bin match-scrape -- --match-id <id> --channel <channel>

use ai_sports::settings::{init_tracing, OutputArgs, ScrapeArgs};
use ai_sports::stages::run_scrape;
use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "match-scrape", about = "Scrape a match relay into JSON artifacts")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    scrape: ScrapeArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let scraped = run_scrape(&cli.scrape, &cli.output).await?;

    let highlights = scraped.record.highlights();
    info!(
        "{} vs {}: {} players, {} relay entries, {} highlights",
        scraped.record.home_team.name,
        scraped.record.away_team.name,
        scraped.roster.len(),
        scraped.record.timeline.len(),
        highlights.timeline.len()
    );
    Ok(())
}
