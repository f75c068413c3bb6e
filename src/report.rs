use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::Utc;

use crate::models::{AnalysisReport, EnrichedMessage, Intent};

#[derive(Debug, Clone, PartialEq)]
pub struct IntentSummary {
    pub intent: Intent,
    pub count: usize,
    pub avg_confidence: f64,
}

/// Batch-wide intent mix, most frequent first.
pub fn summarize_by_intent(messages: &[EnrichedMessage]) -> Vec<IntentSummary> {
    let mut map: BTreeMap<Intent, (usize, f64)> = BTreeMap::new();

    for message in messages {
        let entry = map.entry(message.intent).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += message.sentiment.score;
    }

    let mut summaries: Vec<IntentSummary> = map
        .into_iter()
        .map(|(intent, (count, total_confidence))| IntentSummary {
            intent,
            count,
            avg_confidence: if count == 0 {
                0.0
            } else {
                total_confidence / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

pub fn build_report(source: &str, analysis: &AnalysisReport) -> String {
    let summaries = summarize_by_intent(&analysis.processed_messages);
    let leaderboard = &analysis.scores.leaderboard;

    let mut output = String::new();

    let _ = writeln!(output, "# Shadow Work Report");
    let _ = writeln!(
        output,
        "Generated for {} at {} ({} messages)",
        source,
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
        analysis.processed_messages.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if leaderboard.is_empty() {
        let _ = writeln!(output, "No messages in this batch.");
    } else {
        for (rank, entry) in leaderboard.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} score {:.2} across {} messages",
                rank + 1,
                entry.user,
                entry.aggregate.score,
                entry.aggregate.messages
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Intent Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No messages in this batch.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} messages (avg sentiment confidence {:.2})",
                summary.intent, summary.count, summary.avg_confidence
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Per-Sender Breakdown");

    for (sender, aggregate) in analysis.scores.per_user.iter() {
        let counts = aggregate
            .counts
            .iter()
            .map(|(intent, count)| format!("{intent} {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            output,
            "- {}: intent {:.2}, sentiment {:.2}, raw {:.4} ({})",
            sender, aggregate.intent_score, aggregate.sentiment_score, aggregate.raw, counts
        );
    }

    let mut recent: Vec<&EnrichedMessage> = analysis
        .processed_messages
        .iter()
        .filter(|m| m.timestamp.is_some())
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Messages");

    if recent.is_empty() {
        let _ = writeln!(output, "No timestamped messages in this batch.");
    } else {
        for message in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) at {}: {}",
                message.sender,
                message.intent,
                message.sentiment.label,
                message.timestamp.as_deref().unwrap_or_default(),
                message.text
            );
        }
    }

    output
}
