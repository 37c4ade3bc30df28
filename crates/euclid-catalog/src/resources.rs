//! Learning resources.

use serde::{Deserialize, Serialize};

use euclid_common::models::ResourceResponse;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub resource_type: String,
    pub difficulty: Option<String>,
    pub url: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

impl From<&Resource> for ResourceResponse {
    fn from(r: &Resource) -> Self {
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            author: r.author.clone(),
            resource_type: r.resource_type.clone(),
            difficulty: r.difficulty.clone(),
            url: r.url.clone(),
            isbn: r.isbn.clone(),
            description: r.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceFile {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceQuery<'a> {
    pub query: Option<&'a str>,
    pub resource_type: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub limit: usize,
}

pub struct ResourceLibrary {
    resources: Vec<Resource>,
}

impl ResourceLibrary {
    pub fn new(file: ResourceFile) -> Self {
        let mut resources = file.resources;
        resources.sort_by(|a, b| a.title.cmp(&b.title));
        Self { resources }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Title, description or author contains the query; ordered by title.
    pub fn search(&self, q: &ResourceQuery<'_>) -> Vec<&Resource> {
        let needle = q.query.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        let contains = |field: Option<&str>, n: &str| field.is_some_and(|f| f.to_lowercase().contains(n));
        self.resources
            .iter()
            .filter(|r| {
                needle.as_deref().map_or(true, |n| {
                    contains(Some(r.title.as_str()), n) || contains(r.description.as_deref(), n) || contains(r.author.as_deref(), n)
                })
            })
            .filter(|r| q.resource_type.map_or(true, |t| r.resource_type == t))
            .filter(|r| q.difficulty.map_or(true, |d| r.difficulty.as_deref() == Some(d)))
            .take(q.limit)
            .collect()
    }

    pub fn for_concept(&self, slug: &str) -> Vec<&Resource> {
        self.resources.iter().filter(|r| r.concepts.iter().any(|c| c == slug)).collect()
    }
}
