use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::Sentiment;

pub const MAX_INPUT_CHARS: usize = 512;
pub const DEFAULT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";

#[derive(Debug, thiserror::Error)]
pub enum SentimentError {
    #[error("sentiment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sentiment endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("sentiment endpoint returned no predictions")]
    EmptyResponse,
}

/// Native model output, before canonicalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn predict(&self, text: &str) -> Result<Prediction, SentimentError>;

    fn name(&self) -> &str;
}

pub struct SentimentClassifier {
    model: Arc<dyn SentimentModel>,
    timeout: Duration,
}

impl SentimentClassifier {
    pub fn new(model: Arc<dyn SentimentModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn analyze(&self, text: &str) -> Sentiment {
        if text.is_empty() {
            return Sentiment::neutral();
        }

        let input = truncate_chars(text, MAX_INPUT_CHARS);
        match tokio::time::timeout(self.timeout, self.model.predict(input)).await {
            Ok(Ok(prediction)) => canonicalize(prediction),
            Ok(Err(err)) => {
                warn!(model = self.model.name(), error = %err, "sentiment inference failed, using neutral");
                Sentiment::neutral()
            }
            Err(_) => {
                warn!(
                    model = self.model.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "sentiment inference timed out, using neutral"
                );
                Sentiment::neutral()
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn canonicalize(prediction: Prediction) -> Sentiment {
    let label = match prediction.label.as_str() {
        "POSITIVE" => "positive".to_string(),
        "NEGATIVE" => "negative".to_string(),
        other => other.to_lowercase(),
    };
    let score = if prediction.score.is_nan() {
        0.0
    } else {
        prediction.score
    };
    Sentiment { label, score }
}

/// Offline keyword model. Deterministic, so it doubles as the default backend.
pub struct LexiconModel;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "love", "amazing", "wonderful", "happy", "fantastic",
    "awesome", "best", "thanks", "thank", "appreciate", "well", "done", "proud", "nice",
    "glad", "helpful", "perfect", "sure", "welcome",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "horrible", "worst", "sad", "angry", "disappointed",
    "poor", "late", "broken", "missed", "wrong", "problem", "issue", "stuck", "fail",
    "failed", "annoying", "forgot",
];

const POSITIVE_GLYPHS: &[&str] = &["💪", "😊", "👍", "🙏", "🙂", "🎉", "❤"];

impl LexiconModel {
    fn count_hits(text: &str) -> (usize, usize) {
        let lowered = text.to_lowercase();
        let mut positive = POSITIVE_GLYPHS.iter().filter(|g| lowered.contains(**g)).count();
        let mut negative = 0;
        for word in lowered.split(|c: char| !c.is_alphanumeric() && c != '\'') {
            if POSITIVE_WORDS.contains(&word) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&word) {
                negative += 1;
            }
        }
        (positive, negative)
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    async fn predict(&self, text: &str) -> Result<Prediction, SentimentError> {
        let (positive, negative) = Self::count_hits(text);
        let total = positive + negative;
        if total == 0 {
            return Ok(Prediction {
                label: "NEUTRAL".to_string(),
                score: 0.0,
            });
        }

        let ratio = positive as f64 / total as f64;
        let prediction = if ratio >= 0.5 {
            Prediction {
                label: "POSITIVE".to_string(),
                score: ratio,
            }
        } else {
            Prediction {
                label: "NEGATIVE".to_string(),
                score: 1.0 - ratio,
            }
        };
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Text-classification model served over HTTP (Hugging Face inference style).
pub struct HostedModel {
    client: Client,
    url: String,
    token: String,
    model: String,
}

impl HostedModel {
    pub fn new(url: impl Into<String>, token: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token: token.into(),
            model: model.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HostedResponse {
    Nested(Vec<Vec<Prediction>>),
    Flat(Vec<Prediction>),
}

impl HostedResponse {
    fn best(self) -> Option<Prediction> {
        let predictions = match self {
            HostedResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            HostedResponse::Flat(predictions) => predictions,
        };
        predictions
            .into_iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[async_trait]
impl SentimentModel for HostedModel {
    async fn predict(&self, text: &str) -> Result<Prediction, SentimentError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(SentimentError::Status {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let body: HostedResponse = res.json().await?;
        let best = body.best().ok_or(SentimentError::EmptyResponse)?;
        debug!(model = %self.model, label = %best.label, score = best.score, "hosted prediction");
        Ok(best)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Returns the same prediction for every input and records how often it ran.
pub struct FixedModel {
    prediction: Prediction,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedModel {
    pub fn new(label: &str, score: f64) -> Self {
        Self {
            prediction: Prediction {
                label: label.to_string(),
                score,
            },
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentModel for FixedModel {
    async fn predict(&self, _text: &str) -> Result<Prediction, SentimentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.prediction.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
