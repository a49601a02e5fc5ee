/// AiSports — Match Model
///
/// Types shared by both pipeline stages:
///   scraper → TimelineEvent list (chronological) → classifier → JSON artifacts
///
/// Category is a closed enum; the only string matching lives in `from_feed`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

mod store;

pub use store::ArtifactStore;

// ── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    None,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
            Side::None => "none",
        }
    }

    pub fn parse(raw: &str) -> Option<Side> {
        match raw.trim() {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            "none" => Some(Side::None),
            _ => None,
        }
    }
}

/// Unclassified side goes on the wire as `""`.
fn serialize_side<S: Serializer>(side: &Option<Side>, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(side.map(Side::as_str).unwrap_or(""))
}

fn deserialize_side<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Side>, D::Error> {
    let raw = String::deserialize(de)?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Side::parse(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown side '{raw}'")))
}

// ── Category ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Goal,
    OwnGoal,
    Assist,
    Substitution,
    Caution,
    SendOff,
    HalfEnd,
    MatchEnd,
    None,
}

/// Clock label the relay feed uses for half time.
pub const HALF_TIME_CLOCK: &str = "HT";

impl Category {
    /// Wire label, same as the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Goal => "goal",
            Category::OwnGoal => "own-goal",
            Category::Assist => "assist",
            Category::Substitution => "substitution",
            Category::Caution => "caution",
            Category::SendOff => "send-off",
            Category::HalfEnd => "half-end",
            Category::MatchEnd => "match-end",
            Category::None => "none",
        }
    }

    /// Maps the feed's status label (Korean vocabulary) plus clock text to a category.
    /// `status` is `None` when the entry carries no status badge at all.
    pub fn from_feed(status: Option<&str>, clock: &str) -> Category {
        let label = status.map(str::trim).unwrap_or("");
        let clock = clock.trim();

        match label {
            "골" => Category::Goal,
            "자책골" => Category::OwnGoal,
            "도움" => Category::Assist,
            "교체" => Category::Substitution,
            "경고" => Category::Caution,
            l if l.contains("퇴장") => Category::SendOff,
            _ if clock == HALF_TIME_CLOCK => Category::HalfEnd,
            _ if clock.is_empty() => Category::MatchEnd,
            _ => Category::None,
        }
    }

    /// Subset kept in the highlight record.
    pub fn is_highlight(self) -> bool {
        match self {
            Category::Goal
            | Category::OwnGoal
            | Category::Substitution
            | Category::Caution
            | Category::SendOff
            | Category::HalfEnd => true,
            Category::Assist | Category::MatchEnd | Category::None => false,
        }
    }

    /// Categories whose description names the involved player in emphasized text.
    pub fn names_player(self) -> bool {
        matches!(self, Category::Goal | Category::OwnGoal | Category::Substitution)
    }
}

// ── TimelineEvent ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time:     String,
    pub desc:     String,
    #[serde(
        default,
        serialize_with = "serialize_side",
        deserialize_with = "deserialize_side"
    )]
    pub side:     Option<Side>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:     Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub player_in:  Option<String>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub player_out: Option<String>,
}

impl TimelineEvent {
    /// Builds an event the way the relay feed hands it over: entries with a
    /// clock get the `none` placeholder side, blank-clock entries stay empty.
    pub fn from_feed(time: &str, desc: &str, category: Category) -> Self {
        let time = time.trim().to_string();
        let side = if time.is_empty() { None } else { Some(Side::None) };
        let (player_in, player_out) = if category == Category::Substitution {
            (Some(String::new()), Some(String::new()))
        } else {
            (None, None)
        };

        Self {
            time,
            desc: desc.trim().to_string(),
            side,
            category,
            name: None,
            player_in,
            player_out,
        }
    }

    pub fn needs_classification(&self) -> bool {
        self.category == Category::Substitution
            || matches!(self.side, None | Some(Side::None))
    }

    /// `[<clock>]<description>`, the text used for similarity lookup and prompting.
    pub fn prompt_input(&self) -> String {
        format!("[{}]{}", self.time, self.desc)
    }

    /// Minute count of the event's own clock; `None` for `HT`, blank or unparsable clocks.
    pub fn clock_minute(&self) -> Option<u32> {
        parse_minute(&self.time).filter(|m| *m > 0)
    }
}

/// Parses a match-clock label into a minute count.
///
/// `87'` → 87, `+7'` → 7, `45+2'` → 47, `none`/empty → 0.
/// Anything else (e.g. `HT`) is not a minute and yields `None`.
pub fn parse_minute(raw: &str) -> Option<u32> {
    let cleaned = raw.trim().trim_end_matches('\'').trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
        return Some(0);
    }

    let mut total: u32 = 0;
    for (i, part) in cleaned.split('+').enumerate() {
        let part = part.trim();
        if part.is_empty() {
            // leading '+' of a stoppage-time label
            if i == 0 {
                continue;
            }
            return None;
        }
        total = total.checked_add(part.parse::<u32>().ok()?)?;
    }
    Some(total)
}

/// The relay feed lists entries latest-first; downstream consumers expect
/// chronological order. Applying this twice restores feed order.
pub fn chronological(mut feed: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    feed.reverse();
    feed
}

// ── Match record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home_team: TeamInfo,
    pub away_team: TeamInfo,
    pub timeline:  Vec<TimelineEvent>,
}

/// Filtered view of a `MatchRecord`; same shape on disk.
pub type HighlightRecord = MatchRecord;

impl MatchRecord {
    /// Highlight view: same teams, timeline filtered to highlight categories.
    pub fn highlights(&self) -> HighlightRecord {
        MatchRecord {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            timeline:  self
                .timeline
                .iter()
                .filter(|e| e.category.is_highlight())
                .cloned()
                .collect(),
        }
    }

    pub fn team_name(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team.name,
            Side::Away => &self.away_team.name,
            Side::None => "",
        }
    }
}

// ── Roster ───────────────────────────────────────────────────────────────────

/// Player name → side. Built once per match, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    players: BTreeMap<String, Side>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later assignments win, as with a plain map insert.
    pub fn insert(&mut self, name: &str, side: Side) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.players.insert(name.to_string(), side);
    }

    pub fn side_of(&self, name: &str) -> Option<Side> {
        self.players.get(name.trim()).copied()
    }

    pub fn players_on(&self, side: Side) -> Vec<&str> {
        self.players
            .iter()
            .filter(|(_, s)| **s == side)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
