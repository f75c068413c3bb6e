use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::enrich::MessageEnricher;
use crate::intent::IntentClassifier;
use crate::sentiment::{HostedModel, LexiconModel, SentimentClassifier, SentimentModel, DEFAULT_MODEL};

pub const DEFAULT_SAMPLE_DATA: &str = "sample_data/messages.csv";
pub const INFERENCE_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Inference endpoint serving `model` when no explicit URL is configured.
pub fn model_url(model: &str) -> String {
    format!("{INFERENCE_API_BASE}/{model}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    Lexicon,
    Hosted,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(Backend::Lexicon),
            "hosted" => Ok(Backend::Hosted),
            other => bail!("unknown sentiment backend '{other}' (expected lexicon or hosted)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sample_data: PathBuf,
    pub backend: Backend,
    pub api_url: String,
    pub api_token: Option<String>,
    pub model: String,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_data: PathBuf::from(DEFAULT_SAMPLE_DATA),
            backend: Backend::Lexicon,
            api_url: model_url(DEFAULT_MODEL),
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
            concurrency: 4,
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let backend = match lookup("SENTIMENT_BACKEND") {
            Some(value) => value.parse::<Backend>().context("invalid SENTIMENT_BACKEND")?,
            None => defaults.backend,
        };
        let concurrency = match lookup("SENTIMENT_CONCURRENCY") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .context("SENTIMENT_CONCURRENCY must be a positive integer")?
                .max(1),
            None => defaults.concurrency,
        };
        let timeout = match lookup("SENTIMENT_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(
                value
                    .trim()
                    .parse::<u64>()
                    .context("SENTIMENT_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            None => defaults.timeout,
        };

        let model = lookup("SENTIMENT_MODEL").unwrap_or(defaults.model);
        let api_url = lookup("SENTIMENT_API_URL").unwrap_or_else(|| model_url(&model));

        Ok(Self {
            sample_data: lookup("SHADOW_WORK_SAMPLE_DATA")
                .map(PathBuf::from)
                .unwrap_or(defaults.sample_data),
            backend,
            api_url,
            api_token: lookup("SENTIMENT_API_TOKEN").filter(|t| !t.is_empty()),
            model,
            concurrency,
            timeout,
        })
    }

    pub fn sentiment_model(&self) -> anyhow::Result<Arc<dyn SentimentModel>> {
        let model: Arc<dyn SentimentModel> = match self.backend {
            Backend::Lexicon => Arc::new(LexiconModel),
            Backend::Hosted => {
                let token = self
                    .api_token
                    .clone()
                    .context("SENTIMENT_API_TOKEN must be set for the hosted backend")?;
                Arc::new(HostedModel::new(&self.api_url, token, &self.model))
            }
        };
        Ok(model)
    }

    /// Build the enrichment pipeline once for the life of the process.
    pub fn build_enricher(&self) -> anyhow::Result<MessageEnricher> {
        let sentiment = SentimentClassifier::new(self.sentiment_model()?, self.timeout);
        let intent = IntentClassifier::new().context("failed to compile intent rules")?;
        Ok(MessageEnricher::new(sentiment, intent, self.concurrency))
    }
}
