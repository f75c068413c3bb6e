use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info};

use crate::intent::IntentClassifier;
use crate::models::{scalar_to_string, AnalysisReport, EnrichedMessage, RawMessage};
use crate::scoring;
use crate::sentiment::SentimentClassifier;
use crate::text;

pub const UNKNOWN_SENDER: &str = "unknown";

pub struct MessageEnricher {
    sentiment: SentimentClassifier,
    intent: IntentClassifier,
    concurrency: usize,
}

impl MessageEnricher {
    pub fn new(sentiment: SentimentClassifier, intent: IntentClassifier, concurrency: usize) -> Self {
        Self {
            sentiment,
            intent,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn enrich(&self, raw: &RawMessage) -> EnrichedMessage {
        let text = text::normalize(raw.text.as_deref());
        let sentiment = self.sentiment.analyze(&text).await;
        let intent = self.intent.predict(&text);

        EnrichedMessage {
            message_id: raw.message_id.clone(),
            sender: raw
                .sender
                .clone()
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            timestamp: raw.timestamp.as_ref().and_then(coerce_timestamp),
            text,
            sentiment,
            intent,
        }
    }

    /// Enrich every message, running up to `concurrency` sentiment calls at
    /// once. Output order matches input order.
    pub async fn enrich_batch(&self, messages: &[RawMessage]) -> Vec<EnrichedMessage> {
        debug!(
            messages = messages.len(),
            concurrency = self.concurrency,
            model = self.sentiment.model_name(),
            "enriching batch"
        );
        let pending: Vec<_> = messages.iter().map(|raw| self.enrich(raw)).collect();
        stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub async fn analyze(&self, messages: &[RawMessage]) -> AnalysisReport {
        let processed_messages = self.enrich_batch(messages).await;
        let scores = scoring::compute_scores(&processed_messages);
        info!(
            messages = processed_messages.len(),
            senders = scores.per_user.len(),
            "batch analyzed"
        );
        AnalysisReport {
            processed_messages,
            scores,
        }
    }
}

fn coerce_timestamp(value: &Value) -> Option<String> {
    scalar_to_string(value)
}
