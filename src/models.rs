use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub message_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// Textual form of a scalar JSON value. Null and structured values have none.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    Reminder,
    Encouragement,
    Coordination,
    TaskUpdate,
    Neutral,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Reminder,
        Intent::Encouragement,
        Intent::Coordination,
        Intent::TaskUpdate,
        Intent::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Reminder => "reminder",
            Intent::Encouragement => "encouragement",
            Intent::Coordination => "coordination",
            Intent::TaskUpdate => "task-update",
            Intent::Neutral => "neutral",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            Intent::Reminder => 2.0,
            Intent::Encouragement => 1.5,
            Intent::Coordination => 2.5,
            Intent::TaskUpdate => 1.0,
            Intent::Neutral => 0.0,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

impl Sentiment {
    pub fn neutral() -> Self {
        Self {
            label: "neutral".to_string(),
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMessage {
    pub message_id: Option<Value>,
    pub sender: String,
    pub text: String,
    pub timestamp: Option<String>,
    pub sentiment: Sentiment,
    pub intent: Intent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SenderAggregate {
    pub raw: f64,
    pub score: f64,
    pub messages: usize,
    pub counts: BTreeMap<Intent, usize>,
    pub intent_score: f64,
    pub sentiment_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user: String,
    #[serde(flatten)]
    pub aggregate: SenderAggregate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scores {
    pub per_user: BTreeMap<String, SenderAggregate>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub processed_messages: Vec<EnrichedMessage>,
    pub scores: Scores,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_message_tolerates_missing_and_extra_fields() {
        let raw: RawMessage =
            serde_json::from_value(json!({"text": "hi", "channel": "general"})).unwrap();
        assert_eq!(raw.text.as_deref(), Some("hi"));
        assert!(raw.sender.is_none());
        assert!(raw.message_id.is_none());
        assert!(raw.timestamp.is_none());
    }

    #[test]
    fn raw_message_stringifies_scalar_sender() {
        let raw: RawMessage =
            serde_json::from_value(json!({"sender": 42, "text": null})).unwrap();
        assert_eq!(raw.sender.as_deref(), Some("42"));
        assert!(raw.text.is_none());
    }

    #[test]
    fn intent_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(Intent::TaskUpdate).unwrap(),
            json!("task-update")
        );
        for intent in Intent::ALL {
            assert_eq!(serde_json::to_value(intent).unwrap(), json!(intent.as_str()));
        }
    }

    #[test]
    fn leaderboard_entry_flattens_aggregate_with_user_key() {
        let entry = LeaderboardEntry {
            user: "alice".to_string(),
            aggregate: SenderAggregate {
                messages: 1,
                ..SenderAggregate::default()
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["user"], json!("alice"));
        assert_eq!(value["messages"], json!(1));
        assert!(value.get("aggregate").is_none());
    }
}
