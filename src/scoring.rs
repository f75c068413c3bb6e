use std::collections::{BTreeMap, HashMap};

use crate::models::{EnrichedMessage, LeaderboardEntry, Scores, SenderAggregate};

pub const PARTICIPATION_WEIGHT: f64 = 0.1;

pub fn sentiment_weight(label: &str) -> f64 {
    match label {
        "positive" => 1.2,
        "negative" => -0.5,
        _ => 0.0,
    }
}

/// Fold a batch of enriched messages into per-sender scores and a leaderboard.
///
/// `score` is `raw` scaled so the best sender lands on 100. It is not clamped:
/// a sender with negative `raw` gets a negative score whenever someone else in
/// the batch is positive.
pub fn compute_scores(messages: &[EnrichedMessage]) -> Scores {
    // first-seen order doubles as the leaderboard tie-break
    let mut order: Vec<String> = Vec::new();
    let mut senders: HashMap<String, SenderAggregate> = HashMap::new();

    for message in messages {
        let entry = senders.entry(message.sender.clone()).or_insert_with(|| {
            order.push(message.sender.clone());
            SenderAggregate::default()
        });

        entry.messages += 1;
        *entry.counts.entry(message.intent).or_insert(0) += 1;
        entry.intent_score += message.intent.weight();
        entry.sentiment_score +=
            sentiment_weight(&message.sentiment.label) * message.sentiment.score;
    }

    let mut max_raw = 0.0_f64;
    for aggregate in senders.values_mut() {
        aggregate.raw = raw_score(aggregate);
        if aggregate.raw > max_raw {
            max_raw = aggregate.raw;
        }
    }

    for aggregate in senders.values_mut() {
        aggregate.score = if max_raw > 0.0 {
            round2(aggregate.raw / max_raw * 100.0)
        } else {
            0.0
        };
        aggregate.intent_score = round2(aggregate.intent_score);
        aggregate.sentiment_score = round2(aggregate.sentiment_score);
    }

    let mut leaderboard: Vec<LeaderboardEntry> = order
        .iter()
        .filter_map(|sender| {
            senders.get(sender).map(|aggregate| LeaderboardEntry {
                user: sender.clone(),
                aggregate: aggregate.clone(),
            })
        })
        .collect();
    leaderboard.sort_by(|a, b| {
        b.aggregate
            .score
            .partial_cmp(&a.aggregate.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let per_user: BTreeMap<String, SenderAggregate> = senders.into_iter().collect();
    Scores {
        per_user,
        leaderboard,
    }
}

fn raw_score(aggregate: &SenderAggregate) -> f64 {
    aggregate.intent_score
        + aggregate.sentiment_score
        + (aggregate.messages as f64).ln_1p() * PARTICIPATION_WEIGHT
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intent, Sentiment};

    fn message(sender: &str, intent: Intent, label: &str, confidence: f64) -> EnrichedMessage {
        EnrichedMessage {
            message_id: None,
            sender: sender.to_string(),
            text: "text".to_string(),
            timestamp: None,
            sentiment: Sentiment {
                label: label.to_string(),
                score: confidence,
            },
            intent,
        }
    }

    #[test]
    fn weights_follow_tables() {
        assert_eq!(Intent::Coordination.weight(), 2.5);
        assert_eq!(Intent::Neutral.weight(), 0.0);
        assert_eq!(sentiment_weight("positive"), 1.2);
        assert_eq!(sentiment_weight("negative"), -0.5);
        assert_eq!(sentiment_weight("neutral"), 0.0);
        assert_eq!(sentiment_weight("mixed"), 0.0);
    }

    #[test]
    fn empty_batch_yields_nothing() {
        let scores = compute_scores(&[]);
        assert!(scores.per_user.is_empty());
        assert!(scores.leaderboard.is_empty());
    }

    #[test]
    fn counts_sum_to_messages() {
        let messages = vec![
            message("avery", Intent::Reminder, "positive", 0.8),
            message("avery", Intent::Reminder, "neutral", 0.0),
            message("avery", Intent::TaskUpdate, "negative", 0.6),
            message("jules", Intent::Neutral, "neutral", 0.0),
        ];
        let scores = compute_scores(&messages);

        for aggregate in scores.per_user.values() {
            assert_eq!(aggregate.counts.values().sum::<usize>(), aggregate.messages);
        }
        let avery = &scores.per_user["avery"];
        assert_eq!(avery.counts[&Intent::Reminder], 2);
        assert_eq!(avery.counts[&Intent::TaskUpdate], 1);
        assert!(!avery.counts.contains_key(&Intent::Neutral));
        assert_eq!(avery.intent_score, 5.0);
        assert_eq!(avery.sentiment_score, round2(1.2 * 0.8 - 0.5 * 0.6));
    }

    #[test]
    fn single_positive_sender_scores_full_marks() {
        let scores = compute_scores(&[message("kiara", Intent::Neutral, "neutral", 0.0)]);
        // participation alone keeps raw above zero
        assert_eq!(scores.per_user["kiara"].score, 100.0);
    }

    #[test]
    fn non_positive_batch_scores_zero() {
        let messages = vec![
            message("a", Intent::Neutral, "negative", 0.99),
            message("b", Intent::Neutral, "negative", 0.9),
        ];
        let scores = compute_scores(&messages);
        for aggregate in scores.per_user.values() {
            assert!(aggregate.raw < 0.0);
            assert_eq!(aggregate.score, 0.0);
        }
    }

    #[test]
    fn negative_raw_is_not_clamped() {
        let messages = vec![
            message("helper", Intent::Coordination, "positive", 1.0),
            message("grump", Intent::Neutral, "negative", 1.0),
        ];
        let scores = compute_scores(&messages);
        assert_eq!(scores.per_user["helper"].score, 100.0);
        assert!(scores.per_user["grump"].score < 0.0);
    }

    #[test]
    fn leaderboard_is_sorted_with_stable_ties() {
        let messages = vec![
            message("zoe", Intent::TaskUpdate, "neutral", 0.0),
            message("amir", Intent::Coordination, "positive", 0.9),
            message("lee", Intent::TaskUpdate, "neutral", 0.0),
        ];
        let scores = compute_scores(&messages);
        let users: Vec<&str> = scores.leaderboard.iter().map(|e| e.user.as_str()).collect();

        assert_eq!(scores.leaderboard.len(), scores.per_user.len());
        assert_eq!(users, vec!["amir", "zoe", "lee"]);
        assert!(scores
            .leaderboard
            .windows(2)
            .all(|w| w[0].aggregate.score >= w[1].aggregate.score));
    }
}
