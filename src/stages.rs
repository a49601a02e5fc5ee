use anyhow::{Context, Result};
use match_model::ArtifactStore;
use match_scraper::{MatchScraper, ScrapedMatch};
use std::path::Path;
use timeline_classifier::{default_examples, ClassificationReport, Classifier, OpenAiClient};
use tracing::info;

use crate::settings::{ClassifyArgs, OutputArgs, ScrapeArgs};

/// Scrape one match and write roster, realtime and highlight artifacts.
pub async fn run_scrape(scrape: &ScrapeArgs, output: &OutputArgs) -> Result<ScrapedMatch> {
    let scraper = MatchScraper::new(scrape.scraper_config(), &output.log_dir);
    let scraped = scraper
        .scrape(&scrape.match_id, &output.channel)
        .await
        .with_context(|| format!("scrape of match {} failed", scrape.match_id))?;

    scraped.persist(&output.store())?;
    Ok(scraped)
}

/// Load artifacts for the channel, classify pending events and rewrite them.
pub async fn run_classify(
    classify: &ClassifyArgs,
    store: &ArtifactStore,
    log_dir: &Path,
) -> Result<ClassificationReport> {
    let mut record = store.load_match()?;
    let roster = store.load_roster()?;

    info!(
        "Classifying {} vs {} ({} events, {} known players)",
        record.home_team.name,
        record.away_team.name,
        record.timeline.len(),
        roster.len()
    );

    info!("Prompt style: {:?}", classify.prompt_style());
    let client = OpenAiClient::new(classify.openai_config())?;
    let classifier = Classifier::new(
        client,
        default_examples(),
        classify.classifier_config(store.channel()),
        log_dir,
    )
    .await?;

    let report = classifier.classify_record(&mut record, &roster).await;
    store.save_match(&record)?;
    Ok(report)
}

/// Non-zero exit for runs that left events unclassified; artifacts are already written.
pub fn ensure_complete(report: &ClassificationReport) -> Result<()> {
    if report.failed() > 0 {
        anyhow::bail!(
            "{} of {} events could not be classified",
            report.failed(),
            report.candidates
        );
    }
    Ok(())
}
