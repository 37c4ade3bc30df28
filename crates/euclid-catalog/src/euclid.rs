//! Entries from Euclid's Elements.

use serde::{Deserialize, Serialize};

use euclid_common::models::EuclidEntryResponse;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuclidEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub reference: String,
    pub book: u32,
    pub entry_type: String,
    pub number: u32,
    pub original_text: String,
    pub modern_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EuclidFile {
    #[serde(default)]
    pub entries: Vec<EuclidEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct EuclidQuery<'a> {
    pub query: Option<&'a str>,
    pub book: Option<u32>,
    pub entry_type: Option<&'a str>,
    pub limit: usize,
}

pub struct EuclidLibrary {
    entries: Vec<EuclidEntryResponse>,
}

impl EuclidLibrary {
    pub fn new(file: EuclidFile) -> Self {
        let mut entries: Vec<EuclidEntryResponse> = file
            .entries
            .into_iter()
            .map(|e| EuclidEntryResponse {
                id: e.id.unwrap_or_else(|| entry_id(&e.reference)),
                reference: e.reference,
                book: e.book,
                entry_type: e.entry_type,
                number: e.number,
                original_text: e.original_text,
                modern_text: e.modern_text,
            })
            .collect();
        entries.sort_by(|a, b| (a.book, a.number).cmp(&(b.book, b.number)));
        Self { entries }
    }

    pub fn get_by_reference(&self, reference: &str) -> Option<&EuclidEntryResponse> {
        self.entries.iter().find(|e| e.reference.eq_ignore_ascii_case(reference))
    }

    /// Case-insensitive text search over the original and modern text,
    /// ordered by `(book, number)`.
    pub fn search(&self, q: &EuclidQuery<'_>) -> Vec<&EuclidEntryResponse> {
        let needle = q.query.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        self.entries
            .iter()
            .filter(|e| {
                needle.as_deref().map_or(true, |n| {
                    e.original_text.to_lowercase().contains(n)
                        || e.modern_text.as_deref().is_some_and(|m| m.to_lowercase().contains(n))
                })
            })
            .filter(|e| q.book.map_or(true, |b| e.book == b))
            .filter(|e| q.entry_type.map_or(true, |t| e.entry_type == t))
            .take(q.limit)
            .collect()
    }

    /// A book's entries grouped by type, then numbered.
    pub fn list_by_book(&self, book: u32) -> Vec<&EuclidEntryResponse> {
        let mut rows: Vec<&EuclidEntryResponse> = self.entries.iter().filter(|e| e.book == book).collect();
        rows.sort_by(|a, b| a.entry_type.cmp(&b.entry_type).then(a.number.cmp(&b.number)));
        rows
    }
}

/// Stable id derived from the reference: `I.47` → `euclid-i-47`.
fn entry_id(reference: &str) -> String {
    let slug: String = reference
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("euclid-{slug}")
}
