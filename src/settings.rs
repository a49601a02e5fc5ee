//! Every option can come from the command line or the environment (`.env` is
//! loaded first by each binary). Stages receive plain config structs built here.

use clap::Args;
use match_model::ArtifactStore;
use match_scraper::ScraperConfig;
use std::path::PathBuf;
use std::time::Duration;
use timeline_classifier::{ClassifierConfig, OpenAiConfig, PromptStyle, RetryPolicy};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Channel id the artifact files are keyed by.
    #[arg(long, env = "CHANNEL_ID")]
    pub channel: String,

    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// JSONL audit log directory.
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

impl OutputArgs {
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.output_dir, &self.channel)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    #[arg(long, env = "MATCH_ID")]
    pub match_id: String,

    #[arg(long, env = "SCRAPE_BASE_URL", default_value = "https://m.sports.naver.com/game")]
    pub base_url: String,

    #[arg(long, env = "SCRAPE_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    #[arg(long, env = "SCRAPE_SETTLE_MS", default_value_t = 1000)]
    pub settle_ms: u64,

    /// Show the browser window.
    #[arg(long, env = "SCRAPE_HEADFUL")]
    pub headful: bool,
}

impl ScrapeArgs {
    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            base_url:     self.base_url.clone(),
            page_timeout: Duration::from_secs(self.timeout_secs),
            click_settle: Duration::from_millis(self.settle_ms),
            headless:     !self.headful,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub api_base_url: String,

    #[arg(long, env = "COMPLETION_MODEL", default_value = "gpt-3.5-turbo-instruct")]
    pub completion_model: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Chat model fine-tuned on the training export; when set, it replaces the
    /// few-shot completion path.
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    #[arg(long, env = "CLASSIFY_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    #[arg(long, env = "CLASSIFY_BASE_DELAY_MS", default_value_t = 500)]
    pub base_delay_ms: u64,
}

impl ClassifyArgs {
    pub fn openai_config(&self) -> OpenAiConfig {
        let defaults = OpenAiConfig::default();
        OpenAiConfig {
            api_key:          self.api_key.clone(),
            base_url:         self.api_base_url.clone(),
            completion_model: self.completion_model.clone(),
            chat_model:       self.chat_model.clone().unwrap_or(defaults.chat_model.clone()),
            embedding_model:  self.embedding_model.clone(),
            ..defaults
        }
    }

    pub fn prompt_style(&self) -> PromptStyle {
        match self.chat_model {
            Some(_) => PromptStyle::Chat,
            None => PromptStyle::FewShot,
        }
    }

    pub fn classifier_config(&self, channel: &str) -> ClassifierConfig {
        ClassifierConfig {
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay:   Duration::from_millis(self.base_delay_ms),
                ..RetryPolicy::default()
            },
            style:   self.prompt_style(),
            channel: channel.to_string(),
        }
    }
}

pub fn init_tracing() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();
}
