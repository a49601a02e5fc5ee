//! Fine-tuning data export: one chat transcript per relay line.

use anyhow::{Context, Result};
use match_model::MatchRecord;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::prompt::ANALYST_SYSTEM_PROMPT;
use crate::reply::CompletionReply;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role:    &'static str,
    pub content: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrainingLine {
    pub messages: Vec<ChatMessage>,
}

pub fn training_lines(record: &MatchRecord) -> Result<Vec<TrainingLine>> {
    record
        .timeline
        .iter()
        .map(|event| {
            let answer = serde_json::to_string(&CompletionReply::from_event(event))?;
            Ok(TrainingLine {
                messages: vec![
                    ChatMessage { role: "system", content: ANALYST_SYSTEM_PROMPT.to_string() },
                    ChatMessage { role: "user", content: event.prompt_input() },
                    ChatMessage { role: "assistant", content: answer },
                ],
            })
        })
        .collect()
}

/// Appends the record's lines to a JSONL file; returns how many were written.
pub fn append_training_file(record: &MatchRecord, path: &Path) -> Result<usize> {
    let lines = training_lines(record)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;

    for line in &lines {
        writeln!(f, "{}", serde_json::to_string(line)?)?;
    }
    Ok(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_model::{Category, Side, TeamInfo, TimelineEvent};

    fn record() -> MatchRecord {
        let mut goal = TimelineEvent::from_feed("87'", "골! 올리 왓킨스의 골로 아스톤 빌라, 0-2까지 점수차를 벌립니다.", Category::Goal);
        goal.side = Some(Side::Away);
        MatchRecord {
            home_team: TeamInfo::default(),
            away_team: TeamInfo::default(),
            timeline:  vec![goal, TimelineEvent::from_feed("", "경기가 종료되었습니다.", Category::MatchEnd)],
        }
    }

    #[test]
    fn builds_system_user_assistant_triplets() {
        let lines = training_lines(&record()).unwrap();
        assert_eq!(lines.len(), 2);

        let first = &lines[0].messages;
        assert_eq!(first[0].role, "system");
        assert_eq!(first[1].content, "[87']골! 올리 왓킨스의 골로 아스톤 빌라, 0-2까지 점수차를 벌립니다.");

        let answer: serde_json::Value = serde_json::from_str(&first[2].content).unwrap();
        assert_eq!(answer["team"], "away");
        assert_eq!(answer["time"], "87'");
        assert_eq!(answer["category"], "goal");

        let end: serde_json::Value = serde_json::from_str(&lines[1].messages[2].content).unwrap();
        assert_eq!(end["category"], "match-end");
    }

    #[test]
    fn appends_to_existing_file() {
        let path = std::env::temp_dir()
            .join(format!("timeline_training_{}", std::process::id()))
            .join("train_data.jsonl");
        let _ = fs::remove_file(&path);

        assert_eq!(append_training_file(&record(), &path).unwrap(), 2);
        assert_eq!(append_training_file(&record(), &path).unwrap(), 2);

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 4);
        let line: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(line["messages"][2]["role"], "assistant");

        let _ = fs::remove_file(&path);
    }
}
