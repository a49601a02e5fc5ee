/// AiSports — Timeline Classifier
///
/// Resolves `side` (and `in`/`out` for substitutions) for relay entries the
/// scraper could not attribute:
///   1. nearest labeled example by embedding similarity (k=1), once per event
///   2. few-shot completion prompt with both rosters
///   3. reply parsed + validated, written back only when accepted
///
/// `PromptStyle::Chat` skips 1–2 and sends the rosters as the system message
/// to a chat model fine-tuned on the training export.
///
/// Per event: Unclassified → Pending(attempt) → Classified | Failed.
/// Attempts are bounded by `RetryPolicy`; a failed event stays exactly as scraped.

use logger::{now_iso, ClassifyAttemptEvent, ClassifySummaryEvent, EventLogger};
use match_model::{MatchRecord, Roster, TimelineEvent};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub mod ai;
pub mod examples;
pub mod prompt;
pub mod reply;
pub mod retry;
pub mod training;

pub use ai::{CompletionModel, EmbeddingModel, OpenAiClient, OpenAiConfig};
pub use examples::{default_examples, ExampleSelector, LabeledExample};
pub use prompt::{build_chat_prompt, build_prompt, Prompt, PromptContext};
pub use reply::{accept, parse_reply, CompletionReply, Rejection, Resolution};
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
enum AttemptError {
    #[error("service call failed: {0:#}")]
    Service(anyhow::Error),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Classified { index: usize, attempts: u32 },
    Failed { index: usize, attempts: u32, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationReport {
    pub candidates: usize,
    pub outcomes:   Vec<EventOutcome>,
}

impl ClassificationReport {
    pub fn classified(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EventOutcome::Classified { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.classified()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptStyle {
    /// Nearest labeled example + few-shot text prompt.
    #[default]
    FewShot,
    /// Match context as system message, relay line as user message.
    Chat,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub retry:   RetryPolicy,
    pub style:   PromptStyle,
    /// Channel id the audit lines are tagged with.
    pub channel: String,
}

pub struct Classifier<M> {
    model:    M,
    /// Only built for `PromptStyle::FewShot`.
    selector: Option<ExampleSelector>,
    config:   ClassifierConfig,
    logger:   EventLogger,
}

impl<M: CompletionModel + EmbeddingModel> Classifier<M> {
    /// Embeds the example set up front for the few-shot style; fails if the
    /// embedding service does.
    pub async fn new(
        model: M,
        examples: Vec<LabeledExample>,
        config: ClassifierConfig,
        log_dir: impl Into<std::path::PathBuf>,
    ) -> anyhow::Result<Self> {
        let selector = match config.style {
            PromptStyle::FewShot => {
                let selector = ExampleSelector::from_examples(examples, &model).await?;
                debug!("Example selector ready ({} examples)", selector.len());
                Some(selector)
            }
            PromptStyle::Chat => None,
        };

        Ok(Self {
            model,
            selector,
            config,
            logger: EventLogger::new(log_dir),
        })
    }

    /// Classifies every candidate in `record.timeline`, one at a time, in place.
    pub async fn classify_record(&self, record: &mut MatchRecord, roster: &Roster) -> ClassificationReport {
        let ctx = PromptContext::new(record, roster);
        let mut report = ClassificationReport::default();

        for index in 0..record.timeline.len() {
            if !record.timeline[index].needs_classification() {
                continue;
            }
            report.candidates += 1;

            match self.resolve(&ctx, index, &record.timeline[index]).await {
                Ok((resolution, attempts)) => {
                    resolution.apply(&mut record.timeline[index]);
                    report.outcomes.push(EventOutcome::Classified { index, attempts });
                }
                Err((reason, attempts)) => {
                    warn!(
                        "Event #{} [{}] left unclassified after {} attempts: {}",
                        index, record.timeline[index].time, attempts, reason
                    );
                    report.outcomes.push(EventOutcome::Failed { index, attempts, reason });
                }
            }
        }

        info!(
            candidates = report.candidates,
            classified = report.classified(),
            failed = report.failed(),
            "Timeline classification finished"
        );

        let _ = self.logger.log(&ClassifySummaryEvent {
            ts:         now_iso(),
            event:      "CLASSIFY_SUMMARY",
            channel:    self.config.channel.clone(),
            candidates: report.candidates,
            classified: report.classified(),
            failed:     report.failed(),
        });

        report
    }

    /// `Err` carries the last reason and the completion attempts spent; a prompt
    /// that could not be built spends none.
    async fn resolve(
        &self,
        ctx: &PromptContext,
        index: usize,
        event: &TimelineEvent,
    ) -> Result<(Resolution, u32), (String, u32)> {
        let input = event.prompt_input();
        let policy = self.config.retry;

        let prompt = match self.prompt_for(ctx, index, &input).await {
            Ok(prompt) => prompt,
            Err(reason) => return Err((reason, 0)),
        };

        let mut last_reason = String::new();

        for attempt in 1..=policy.attempts() {
            let result = self.attempt(event, &prompt).await;

            let _ = self.logger.log(&ClassifyAttemptEvent {
                ts:       now_iso(),
                event:    "CLASSIFY_ATTEMPT",
                channel:  self.config.channel.clone(),
                index,
                attempt,
                input:    input.clone(),
                accepted: result.is_ok(),
                reason:   result.as_ref().err().map(|e| e.to_string()),
            });

            match result {
                Ok(resolution) => {
                    debug!("Event #{} {} → {:?}", index, input, resolution.side);
                    return Ok((resolution, attempt));
                }
                Err(e) => {
                    last_reason = e.to_string();
                    if attempt < policy.attempts() {
                        let backoff = policy.delay_after(attempt);
                        debug!(
                            "Event #{} attempt {} rejected ({}), retrying in {:?}",
                            index, attempt, last_reason, backoff
                        );
                        sleep(backoff).await;
                    }
                }
            }
        }

        Err((last_reason, policy.attempts()))
    }

    /// The prompt is identical for every attempt on one event, so the similarity
    /// lookup runs once, with its own bounded retry.
    async fn prompt_for(&self, ctx: &PromptContext, index: usize, input: &str) -> Result<Prompt, String> {
        let Some(selector) = &self.selector else {
            return Ok(build_chat_prompt(ctx, input));
        };

        let policy = self.config.retry;
        let mut last_reason = String::new();

        for lookup in 1..=policy.attempts() {
            match selector.select(input, &self.model).await {
                Ok(example) => return Ok(Prompt::Text(build_prompt(ctx, example, input))),
                Err(e) => {
                    last_reason = AttemptError::Service(e).to_string();
                    if lookup < policy.attempts() {
                        let backoff = policy.delay_after(lookup);
                        debug!(
                            "Event #{} similarity lookup {} failed ({}), retrying in {:?}",
                            index, lookup, last_reason, backoff
                        );
                        sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_reason)
    }

    async fn attempt(&self, event: &TimelineEvent, prompt: &Prompt) -> Result<Resolution, AttemptError> {
        let raw = self
            .model
            .complete(prompt)
            .await
            .map_err(AttemptError::Service)?;

        let reply = parse_reply(&raw)?;
        Ok(accept(event, &reply)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::ai::{CompletionModel, EmbeddingModel};
    use crate::prompt::Prompt;
    use anyhow::{anyhow, bail, Result};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KEYWORDS: [&str; 8] = ["골", "교체", "경고", "도움", "프리킥", "종료", "코너킥", "슛"];

    /// Bag-of-keywords embedding; enough to make similarity lookups deterministic.
    pub struct KeywordEmbedder;

    pub fn keyword_vector(text: &str) -> Vec<f32> {
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect();
        v.push(0.1);
        v
    }

    impl EmbeddingModel for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
    }

    /// Replays canned completions in order; `Err` entries simulate transport failures.
    /// Embeddings come from `KeywordEmbedder`, with an optional outage.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub prompts: Mutex<Vec<Prompt>>,
        embed_calls:  AtomicUsize,
        embed_outage: AtomicUsize,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
                embed_calls:  AtomicUsize::new(0),
                embed_outage: AtomicUsize::new(0),
            }
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        /// Few-shot prompt texts sent so far.
        pub fn text_prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .map(|p| match p {
                    Prompt::Text(text) => text.clone(),
                    other => panic!("expected a text prompt, got {other:?}"),
                })
                .collect()
        }

        pub fn embed_calls(&self) -> usize {
            self.embed_calls.load(Ordering::SeqCst)
        }

        /// The next `calls` embedding requests fail.
        pub fn fail_next_embeds(&self, calls: usize) {
            self.embed_outage.store(calls, Ordering::SeqCst);
        }
    }

    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &Prompt) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(anyhow!(e)),
                None => Err(anyhow!("script exhausted")),
            }
        }
    }

    impl EmbeddingModel for ScriptedModel {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            let outage = self.embed_outage.load(Ordering::SeqCst);
            if outage > 0 {
                self.embed_outage.store(outage - 1, Ordering::SeqCst);
                bail!("embedding service unavailable");
            }
            KeywordEmbedder.embed(texts).await
        }
    }
}
