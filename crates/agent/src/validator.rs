//! Question admission heuristic.
//!
//! A soft, advisory filter: it can accept off-topic text and reject
//! legitimate questions. A question is rejected outright when it contains a
//! blocked keyword; otherwise it is admitted when its length is in range and
//! it shows at least one sign of being a Spanish, health-related request.

use std::collections::HashSet;

use aymara_config::AdmissionConfig;

/// Decides whether a free-text question may be sent to the model.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    min_len: usize,
    max_len: usize,
    blocked_keywords: Vec<String>,
    interrogatives: HashSet<String>,
    request_verbs: HashSet<String>,
    domain_terms: HashSet<String>,
    language_markers: Vec<char>,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::from(&AdmissionConfig::default())
    }
}

impl From<&AdmissionConfig> for QueryValidator {
    fn from(config: &AdmissionConfig) -> Self {
        let lowered = |list: &[String]| -> HashSet<String> {
            list.iter().map(|w| w.trim().to_lowercase()).collect()
        };

        Self {
            min_len: config.min_len,
            max_len: config.max_len,
            blocked_keywords: config
                .blocked_keywords
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            interrogatives: lowered(&config.interrogatives),
            request_verbs: lowered(&config.request_verbs),
            domain_terms: lowered(&config.domain_terms),
            language_markers: config.language_markers.to_lowercase().chars().collect(),
        }
    }
}

impl QueryValidator {
    pub fn is_admissible(&self, question: &str) -> bool {
        let lowered = question.to_lowercase();

        if self.blocked_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return false;
        }

        let len = question.chars().count();
        if len < self.min_len || len >= self.max_len {
            return false;
        }

        let has_marker = lowered.chars().any(|c| self.language_markers.contains(&c));
        let has_question_mark = question.contains('?');

        has_marker
            || has_question_mark
            || words(&lowered).any(|w| {
                self.interrogatives.contains(w)
                    || self.request_verbs.contains(w)
                    || self.domain_terms.contains(w)
            })
    }
}

/// Whole words of the text, split on anything that is not a letter or digit.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}
