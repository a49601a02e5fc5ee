use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{MatchRecord, Roster};

/// On-disk artifact triple for one channel:
///   `<channel>_player.json`, `<channel>_realtime.json`, `<channel>_highlight.json`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir:     PathBuf,
    channel: String,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            dir:     dir.into(),
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn roster_path(&self) -> PathBuf {
        self.dir.join(format!("{}_player.json", self.channel))
    }

    pub fn realtime_path(&self) -> PathBuf {
        self.dir.join(format!("{}_realtime.json", self.channel))
    }

    pub fn highlight_path(&self) -> PathBuf {
        self.dir.join(format!("{}_highlight.json", self.channel))
    }

    pub fn save_roster(&self, roster: &Roster) -> Result<()> {
        write_json(&self.roster_path(), roster)
    }

    /// Writes the full record, then the highlight view recomputed from it.
    pub fn save_match(&self, record: &MatchRecord) -> Result<()> {
        write_json(&self.realtime_path(), record)?;
        write_json(&self.highlight_path(), &record.highlights())
    }

    pub fn load_roster(&self) -> Result<Roster> {
        read_json(&self.roster_path())
    }

    pub fn load_match(&self) -> Result<MatchRecord> {
        read_json(&self.realtime_path())
    }

    pub fn load_highlights(&self) -> Result<MatchRecord> {
        read_json(&self.highlight_path())
    }
}

/// Pretty-printed UTF-8 JSON; written to a sibling temp file and renamed into place.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create artifact dir {}", parent.display()))?;
    }

    let body = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;

    info!("Artifact saved: {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
