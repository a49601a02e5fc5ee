//! Completion reply contract and acceptance rule.

use match_model::{parse_minute, Category, Side, TimelineEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON object the completion service is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub player_in: Option<String>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub player_out: Option<String>,
    /// Written by the training export; ignored when accepting a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CompletionReply {
    /// The answer a perfect reply would give for an already classified event.
    pub fn from_event(event: &TimelineEvent) -> Self {
        Self {
            team: Some(event.side.unwrap_or(Side::None).as_str().to_string()),
            time: (!event.time.is_empty()).then(|| event.time.clone()),
            desc: Some(event.desc.clone()),
            name: event.name.clone(),
            player_in: event.player_in.clone(),
            player_out: event.player_out.clone(),
            category: Some(event.category.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("reply contains no JSON object")]
    NotJson,
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("reply clock '{0}' is not a positive minute")]
    NonPositiveMinute(String),
    #[error("reply team '{0}' is not home, away or none")]
    UnknownTeam(String),
    #[error("substitution reply lacks in/out players")]
    MissingSubstitutionPlayers,
}

/// Parses the first `{` .. last `}` span, so prose or code fences around the object are tolerated.
pub fn parse_reply(raw: &str) -> Result<CompletionReply, Rejection> {
    let start = raw.find('{').ok_or(Rejection::NotJson)?;
    let end = raw.rfind('}').ok_or(Rejection::NotJson)?;
    if end < start {
        return Err(Rejection::NotJson);
    }

    serde_json::from_str(&raw[start..=end]).map_err(|e| Rejection::InvalidJson(e.to_string()))
}

/// Fields an accepted reply writes back into the event.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub side:    Side,
    /// `(in, out)`, only for substitutions.
    pub players: Option<(String, String)>,
}

impl Resolution {
    pub fn apply(self, event: &mut TimelineEvent) {
        event.side = Some(self.side);
        if let Some((player_in, player_out)) = self.players {
            event.player_in = Some(player_in);
            event.player_out = Some(player_out);
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a reply against the event it answers. Nothing is written on rejection.
///
/// The minute check only applies when the event's own clock carries a minute;
/// `HT` and blank clocks have nothing to confirm.
pub fn accept(event: &TimelineEvent, reply: &CompletionReply) -> Result<Resolution, Rejection> {
    if event.clock_minute().is_some() {
        let clock = reply.time.as_deref().unwrap_or("none");
        match parse_minute(clock) {
            Some(minute) if minute > 0 => {}
            _ => return Err(Rejection::NonPositiveMinute(clock.to_string())),
        }
    }

    let team = reply.team.as_deref().unwrap_or("none");
    let side = Side::parse(team).ok_or_else(|| Rejection::UnknownTeam(team.to_string()))?;

    let players = match event.category {
        Category::Substitution => match (non_empty(&reply.player_in), non_empty(&reply.player_out)) {
            (Some(player_in), Some(player_out)) => Some((player_in, player_out)),
            _ => return Err(Rejection::MissingSubstitutionPlayers),
        },
        _ => None,
    };

    Ok(Resolution { side, players })
}
