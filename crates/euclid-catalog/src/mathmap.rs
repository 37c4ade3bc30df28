//! Math map: categories of topics, each with starter prompts.

use serde::{Deserialize, Serialize};

use euclid_common::models::{PromptCollectionCategory, PromptCollectionTopic, PromptCollectionsResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTopic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub prompts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapCategory {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub topics: Vec<MapTopic>,
}

/// The whole map as stored. Unknown top-level keys are kept so the
/// endpoint returns the file unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathMapData {
    #[serde(default)]
    pub categories: Vec<MapCategory>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub color: String,
    pub topic_count: usize,
}

/// A topic together with the category it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicWithCategory {
    #[serde(flatten)]
    pub topic: MapTopic,
    pub category_id: String,
    pub category_name: String,
    pub category_color: String,
}

impl TopicWithCategory {
    fn new(topic: &MapTopic, category: &MapCategory) -> Self {
        Self {
            topic: topic.clone(),
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            category_color: category.color.clone(),
        }
    }
}

pub struct MathMap {
    data: MathMapData,
}

impl MathMap {
    pub fn new(data: MathMapData) -> Self {
        Self { data }
    }

    pub fn full_map(&self) -> &MathMapData {
        &self.data
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        self.data
            .categories
            .iter()
            .map(|c| CategorySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                color: c.color.clone(),
                topic_count: c.topics.len(),
            })
            .collect()
    }

    pub fn category(&self, id: &str) -> Option<&MapCategory> {
        self.data.categories.iter().find(|c| c.id == id)
    }

    pub fn topic(&self, id: &str) -> Option<TopicWithCategory> {
        self.data.categories.iter().find_map(|category| {
            category
                .topics
                .iter()
                .find(|t| t.id == id)
                .map(|topic| TopicWithCategory::new(topic, category))
        })
    }

    /// Topics whose name or any prompt contains `query`, case-insensitively.
    /// Each topic appears at most once.
    pub fn search(&self, query: &str) -> Vec<TopicWithCategory> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut results = Vec::new();
        for category in &self.data.categories {
            for topic in &category.topics {
                let hit = topic.name.to_lowercase().contains(&needle)
                    || topic.prompts.iter().any(|p| p.to_lowercase().contains(&needle));
                if hit {
                    results.push(TopicWithCategory::new(topic, category));
                }
            }
        }
        results
    }

    /// Prompt library grouped by category, optionally for a single category.
    pub fn prompt_collections(&self, category_id: Option<&str>) -> PromptCollectionsResponse {
        let categories: Vec<PromptCollectionCategory> = self
            .data
            .categories
            .iter()
            .filter(|c| category_id.map_or(true, |id| c.id == id))
            .map(|c| {
                let topics: Vec<PromptCollectionTopic> = c
                    .topics
                    .iter()
                    .filter(|t| !t.prompts.is_empty())
                    .map(|t| PromptCollectionTopic {
                        topic_id: t.id.clone(),
                        topic_name: t.name.clone(),
                        icon: t.icon.clone(),
                        prompts: t.prompts.clone(),
                    })
                    .collect();
                PromptCollectionCategory {
                    category_id: c.id.clone(),
                    category_name: c.name.clone(),
                    color: c.color.clone(),
                    topic_count: topics.len(),
                    prompt_count: topics.iter().map(|t| t.prompts.len()).sum(),
                    topics,
                }
            })
            .collect();

        PromptCollectionsResponse {
            total_topics: categories.iter().map(|c| c.topic_count).sum(),
            total_prompts: categories.iter().map(|c| c.prompt_count).sum(),
            categories,
        }
    }

    /// Every prompt in map order.
    pub fn all_prompts(&self) -> impl Iterator<Item = &str> {
        self.data
            .categories
            .iter()
            .flat_map(|c| c.topics.iter())
            .flat_map(|t| t.prompts.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> MathMap {
        MathMap::new(
            serde_json::from_str(
                r##"{
                "title": "Test map",
                "categories": [
                    {"id": "algebra", "name": "Algebra", "color": "#00f", "topics": [
                        {"id": "linear", "name": "Linear Equations", "icon": "📏", "prompts": ["Solve 2x = 4", "What is slope?"]},
                        {"id": "empty", "name": "Empty", "icon": "", "prompts": []}
                    ]},
                    {"id": "geometry", "name": "Geometry", "color": "#0f0", "topics": [
                        {"id": "circles", "name": "Circles", "icon": "⭕", "prompts": ["What is the slope of a tangent?"]}
                    ]}
                ]
            }"##,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_search_by_name_and_prompt() {
        let results = map().search("SLOPE");
        let ids: Vec<&str> = results.iter().map(|r| r.topic.id.as_str()).collect();
        assert_eq!(ids, vec!["linear", "circles"]);
        assert_eq!(results[1].category_color, "#0f0");
        assert!(map().search("  ").is_empty());
    }

    #[test]
    fn test_topic_carries_category() {
        let topic = map().topic("circles").unwrap();
        assert_eq!(topic.category_id, "geometry");
        let json = serde_json::to_value(&topic).unwrap();
        assert_eq!(json["name"], "Circles");
        assert_eq!(json["category_name"], "Geometry");
    }

    #[test]
    fn test_full_map_keeps_extra_keys() {
        let json = serde_json::to_value(map().full_map()).unwrap();
        assert_eq!(json["title"], "Test map");
    }

    #[test]
    fn test_prompt_collections_counts_and_filter() {
        let all = map().prompt_collections(None);
        assert_eq!(all.total_topics, 2);
        assert_eq!(all.total_prompts, 3);
        assert_eq!(all.categories[0].topic_count, 1);

        let geometry = map().prompt_collections(Some("geometry"));
        assert_eq!(geometry.categories.len(), 1);
        assert_eq!(geometry.categories[0].category_id, "geometry");
        assert!(map().prompt_collections(Some("nope")).categories.is_empty());
    }
}
