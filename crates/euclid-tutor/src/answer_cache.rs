//! Short-lived cache of generated answers, keyed by the normalised question
//! with a fuzzy fallback over recently asked questions.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use euclid_common::cache::TtlCache;
use euclid_common::models::VisualizationPayload;
use regex::Regex;

use crate::checker::cached_regex;

pub const ANSWER_TTL: Duration = Duration::from_secs(600);
const RECENT_KEY: &str = "tutor:recent";
const RECENT_CAPACITY: usize = 50;
const MIN_SIMILARITY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    pub solution: String,
    pub visualization: Option<VisualizationPayload>,
}

#[derive(Clone)]
struct RecentEntry {
    tokens: HashSet<String>,
    answer: CachedAnswer,
}

pub struct AnswerCache {
    answers: TtlCache<CachedAnswer>,
    recent: TtlCache<Vec<RecentEntry>>,
    ttl: Duration,
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new(ANSWER_TTL)
    }
}

impl AnswerCache {
    pub fn new(ttl: Duration) -> Self {
        Self { answers: TtlCache::new(), recent: TtlCache::new(), ttl }
    }

    pub fn get(&self, question: &str) -> Option<CachedAnswer> {
        let normalized = normalize_question(question);
        if let Some(hit) = self.answers.get(&exact_key(&normalized)) {
            return Some(hit);
        }

        let tokens = tokenize(&normalized);
        let recent = self.recent.get(RECENT_KEY).unwrap_or_default();
        let mut best: Option<(&RecentEntry, f64)> = None;
        for entry in &recent {
            let score = jaccard(&tokens, &entry.tokens);
            if best.map_or(score > 0.0, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best.filter(|(_, score)| *score >= MIN_SIMILARITY)
            .map(|(entry, _)| entry.answer.clone())
    }

    pub fn store(&self, question: &str, answer: CachedAnswer) {
        let normalized = normalize_question(question);
        self.answers.set(exact_key(&normalized), answer.clone(), Some(self.ttl));

        let mut recent = self.recent.get(RECENT_KEY).unwrap_or_default();
        recent.push(RecentEntry { tokens: tokenize(&normalized), answer });
        if recent.len() > RECENT_CAPACITY {
            recent.drain(..recent.len() - RECENT_CAPACITY);
        }
        self.recent.set(RECENT_KEY, recent, Some(self.ttl));
    }

    pub fn clear(&self) {
        self.answers.clear();
        self.recent.clear();
    }
}

fn exact_key(normalized: &str) -> String {
    format!("tutor:{normalized}")
}

/// Lowercase, replace anything but ASCII letters, digits and whitespace with a
/// space, and collapse runs of whitespace.
pub fn normalize_question(question: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let lower = question.trim().to_lowercase();
    let cleaned = cached_regex(&NON_WORD, r"[^a-z0-9\s]").replace_all(&lower, " ");
    cached_regex(&SPACES, r"\s+").replace_all(&cleaned, " ").into_owned()
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.intersection(b).count() as f64 / a.union(b).count() as f64
}
