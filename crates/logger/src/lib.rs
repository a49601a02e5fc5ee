/// AiSports — Logger
/// JSONL audit stream, one file per UTC day

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct TimelineScrapedEvent {
    pub ts:         String,
    pub event:      &'static str,   // "TIMELINE_SCRAPED"
    pub match_id:   String,
    pub channel:    String,
    pub home:       String,
    pub away:       String,
    pub players:    usize,
    pub events:     usize,
    pub highlights: usize,
}

#[derive(Serialize, Debug)]
pub struct ClassifyAttemptEvent {
    pub ts:       String,
    pub event:    &'static str,     // "CLASSIFY_ATTEMPT"
    pub channel:  String,
    pub index:    usize,
    pub attempt:  u32,
    pub input:    String,
    pub accepted: bool,
    pub reason:   Option<String>,   // rejection / transport error
}

#[derive(Serialize, Debug)]
pub struct ClassifySummaryEvent {
    pub ts:         String,
    pub event:      &'static str,   // "CLASSIFY_SUMMARY"
    pub channel:    String,
    pub candidates: usize,
    pub classified: usize,
    pub failed:     usize,
}

#[derive(Serialize, Debug)]
pub struct TrainingExportEvent {
    pub ts:      String,
    pub event:   &'static str,      // "TRAINING_EXPORT"
    pub channel: String,
    pub lines:   usize,
    pub path:    String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_event() {
        let dir = std::env::temp_dir().join(format!("ai_sports_logger_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let logger = EventLogger::new(&dir);

        for failed in 0..2 {
            logger
                .log(&ClassifySummaryEvent {
                    ts:         now_iso(),
                    event:      "CLASSIFY_SUMMARY",
                    channel:    "978".into(),
                    candidates: 3,
                    classified: 3 - failed,
                    failed,
                })
                .unwrap();
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let raw = fs::read_to_string(logger.log_dir().join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let last: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(last["event"], "CLASSIFY_SUMMARY");
        assert_eq!(last["failed"], 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
