use match_model::{MatchRecord, Roster, Side};

use crate::examples::LabeledExample;

const INSTRUCTION: &str = "Using the team information above, find the example of the most similar type \
and answer for the input in exactly the same JSON shape: \"team\" (home, away or none), \"time\", \"desc\", \
and for substitutions \"in\" and \"out\". Reply with the JSON object only.";

/// System message of the fine-tuned chat path; the training export uses it verbatim.
pub const ANALYST_SYSTEM_PROMPT: &str =
    "You are a skilled football relay analyst. Convert each relay summary line into a JSON object.";

/// What one completion request carries, per backend style.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// Few-shot text for the plain completions endpoint.
    Text(String),
    /// Match context as the system message, the relay line as the user message.
    Chat { system: String, user: String },
}

/// Team names and known player names, rendered once per match.
#[derive(Debug, Clone)]
pub struct PromptContext {
    home_block: String,
    away_block: String,
}

impl PromptContext {
    pub fn new(record: &MatchRecord, roster: &Roster) -> Self {
        Self {
            home_block: team_block(record, roster, Side::Home),
            away_block: team_block(record, roster, Side::Away),
        }
    }
}

fn team_block(record: &MatchRecord, roster: &Roster, side: Side) -> String {
    let players = roster
        .players_on(side)
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{label} team: {name}\n{label} players: [{players}]",
        label = side.as_str(),
        name = record.team_name(side),
    )
}

pub fn build_prompt(ctx: &PromptContext, example: &LabeledExample, input: &str) -> String {
    format!(
        "{home}\n-----\n{away}\n-----\n{INSTRUCTION}\n\n\
         Input: {ex_in}\nOutput: {ex_out}\n\n\
         Input: {input}\nOutput:",
        home = ctx.home_block,
        away = ctx.away_block,
        ex_in = example.input,
        ex_out = example.output,
    )
}

/// Chat request for a model fine-tuned on the training export; no demonstration needed.
pub fn build_chat_prompt(ctx: &PromptContext, input: &str) -> Prompt {
    Prompt::Chat {
        system: format!(
            "{ANALYST_SYSTEM_PROMPT}\n\n{home}\n-----\n{away}",
            home = ctx.home_block,
            away = ctx.away_block,
        ),
        user:   input.to_string(),
    }
}
