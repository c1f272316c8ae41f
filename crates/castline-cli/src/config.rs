//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use castline_adapters::{FrequencySummarizer, HtmlExtractor, HttpFeedPoller, synthesizer_by_name};
use castline_pipeline::{Collaborators, FeedSource};
use serde::Deserialize;

/// Global configuration for castline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub feeds: Vec<FeedConfig>,
    pub output: OutputConfig,
    pub workers: WorkersConfig,
    pub summary: SummaryConfig,
    pub tts: TtsConfig,
    pub http: HttpConfig,
    pub schedule: ScheduleConfig,
}

/// One `[[feeds]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(deserialize_with = "deserialize_required_env_var")]
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub state_file: PathBuf,
    pub transcripts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            state_file: PathBuf::from("state.json"),
            transcripts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default: 4,
            max: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub max_sentences: usize,
    /// 0 = unlimited
    pub max_items_per_feed: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_sentences: 5,
            max_items_per_feed: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub engine: String,
    pub language: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: "gtts".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub user_agent: Option<String>,
    /// Seconds
    pub feed_timeout: u64,
    pub extract_timeout: u64,
    pub synthesize_timeout: u64,
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            feed_timeout: 20,
            extract_timeout: 30,
            synthesize_timeout: 120,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub every_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { every_minutes: 60 }
    }
}

/// Command-line settings that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub workers: Option<usize>,
    pub output: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Like [`deserialize_env_var`], but an unset variable is an error
fn deserialize_required_env_var<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {s} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./castline.toml (current directory)
    /// 2. ~/.config/castline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("castline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "castline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn feed_sources(&self) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .map(|f| FeedSource {
                url: f.url.clone(),
                name: f.name.clone().filter(|n| !n.trim().is_empty()),
            })
            .collect()
    }

    /// Worker count after applying an override, clamped to `1..=max`.
    pub fn effective_workers(&self, requested: Option<usize>) -> usize {
        let max = self.workers.max.max(1);
        requested.unwrap_or(self.workers.default).clamp(1, max)
    }

    /// Runtime configuration for the pipeline crate.
    pub fn to_runtime(&self, overrides: &Overrides) -> castline_pipeline::Config {
        castline_pipeline::Config {
            feeds: self.feed_sources(),
            output_dir: overrides
                .output
                .clone()
                .unwrap_or_else(|| self.output.dir.clone()),
            state_file: self.state_file(overrides),
            workers: self.effective_workers(overrides.workers),
            max_sentences: self.summary.max_sentences,
            max_items_per_feed: Some(self.summary.max_items_per_feed).filter(|&n| n > 0),
            transcripts: self.output.transcripts,
            feed_timeout: Duration::from_secs(self.http.feed_timeout),
            extract_timeout: Duration::from_secs(self.http.extract_timeout),
            synthesize_timeout: Duration::from_secs(self.http.synthesize_timeout),
        }
    }

    pub fn state_file(&self, overrides: &Overrides) -> PathBuf {
        overrides
            .state_file
            .clone()
            .unwrap_or_else(|| self.output.state_file.clone())
    }

    /// Concrete collaborators sharing one HTTP client.
    pub fn collaborators(&self) -> Result<Collaborators> {
        let client = match &self.http.user_agent {
            Some(ua) => castline_core::http::build_client(ua)
                .with_context(|| format!("Failed to build HTTP client for user agent {ua:?}"))?,
            None => castline_core::http_client().clone(),
        };
        let retries = self.http.max_retries;

        Ok(Collaborators {
            poller: Arc::new(HttpFeedPoller::new(client.clone(), retries)),
            extractor: Arc::new(HtmlExtractor::new(client.clone(), retries)),
            summarizer: Arc::new(FrequencySummarizer),
            synthesizer: synthesizer_by_name(&self.tts.engine, client, &self.tts.language, retries),
        })
    }
}
