//! Canned chat lessons.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use euclid_common::models::{VisualizationPayload, VisualizationType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicVisualization {
    pub viz_id: String,
    pub viz_type: VisualizationType,
    pub title: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub response_text: String,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    pub visualization: Option<TopicVisualization>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicFile {
    #[serde(default)]
    pub topics: Vec<Topic>,
}

pub struct TopicCatalog {
    topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn new(file: TopicFile) -> Self {
        let mut topics = file.topics;
        for topic in &mut topics {
            for keyword in &mut topic.keywords {
                *keyword = keyword.to_lowercase();
            }
        }
        Self { topics }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// The topic whose longest keyword occurs in `message`. Ties go to the
    /// topic listed first.
    pub fn match_topic(&self, message: &str) -> Option<&Topic> {
        let text = message.to_lowercase();
        let mut best: Option<(&Topic, usize)> = None;
        for topic in &self.topics {
            for keyword in &topic.keywords {
                if keyword.is_empty() || !text.contains(keyword.as_str()) {
                    continue;
                }
                if best.map_or(true, |(_, len)| keyword.len() > len) {
                    best = Some((topic, keyword.len()));
                }
            }
        }
        best.map(|(topic, _)| topic)
    }

    /// The raw catalog visualization of `topic`, before any figure is built.
    pub fn build_visualization(&self, topic: &Topic) -> Option<VisualizationPayload> {
        topic.visualization.as_ref().map(|viz| VisualizationPayload {
            viz_id: viz.viz_id.clone(),
            viz_type: viz.viz_type,
            title: viz.title.clone(),
            data: viz.data.clone(),
        })
    }
}
