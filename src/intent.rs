use regex::Regex;

use crate::models::Intent;

const RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Reminder,
        &[
            r"\bremind\b",
            r"\breminder\b",
            r"\bdon't forget\b",
            r"\bsubmit\b",
            r"\bdeadline\b",
        ],
    ),
    (
        Intent::Encouragement,
        &[
            r"\bwell done\b",
            r"\bappreciate\b",
            r"\bthank(s| you)\b",
            r"\bdon't worry\b",
            r"\bproud of\b",
            r"\bkeep it up\b",
        ],
    ),
    (
        Intent::Coordination,
        &[
            r"\bschedule\b",
            r"\bsync\b",
            r"\bmeeting\b",
            r"\bassign\b",
            r"\bdistribut(e|ion)\b",
            r"\bconnect\b",
        ],
    ),
    (
        Intent::TaskUpdate,
        &[
            r"\bupdated\b",
            r"\bcheck the updated\b",
            r"\buploaded\b",
            r"\bsubmitted\b",
            r"\bfix(ed)?\b",
        ],
    ),
];

const SUPPORTIVE_GLYPHS: &[&str] = &["💪", "😊", "👍", "🙏", "🙂"];

const COMMITMENT_PATTERN: &str = r"\b(i will handle|i'll handle|i can handle|i will take)\b";

struct IntentRule {
    intent: Intent,
    patterns: Vec<Regex>,
}

pub struct IntentClassifier {
    rules: Vec<IntentRule>,
    commitment: Regex,
}

impl IntentClassifier {
    pub fn new() -> anyhow::Result<Self> {
        let mut rules = Vec::with_capacity(RULES.len());
        for (intent, patterns) in RULES {
            let patterns = patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(IntentRule {
                intent: *intent,
                patterns,
            });
        }

        Ok(Self {
            rules,
            commitment: Regex::new(COMMITMENT_PATTERN)?,
        })
    }

    /// First matching rule in priority order wins.
    pub fn predict(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();

        for rule in &self.rules {
            if rule.patterns.iter().any(|p| p.is_match(&lowered)) {
                return rule.intent;
            }
        }

        if SUPPORTIVE_GLYPHS.iter().any(|g| lowered.contains(*g)) {
            return Intent::Encouragement;
        }
        if self.commitment.is_match(&lowered) {
            return Intent::Coordination;
        }
        Intent::Neutral
    }
}
