//! euclid-catalog — Read-only lesson content.
//!
//! Everything here is loaded once from the JSON seed files in the data
//! directory and queried in memory:
//!
//! - `topics`: canned chat lessons matched by keyword
//! - `visualizations`: catalog diagrams (Plotly figures, SVG urls, Manim scenes)
//! - `mathmap`: the topic map and prompt collections built from it
//! - `concepts`: the prerequisite graph behind the mind map
//! - `euclid`: searchable entries from the Elements
//! - `resources`: books, videos and sites linked to concepts

pub mod concepts;
pub mod euclid;
pub mod mathmap;
pub mod resources;
pub mod topics;
pub mod visualizations;

use std::path::Path;

use euclid_common::Result;
use serde::de::DeserializeOwned;

pub use concepts::ConceptGraph;
pub use euclid::EuclidLibrary;
pub use mathmap::MathMap;
pub use resources::ResourceLibrary;
pub use topics::TopicCatalog;

const DEMO_TOPICS: &str = include_str!("../../../data/demo_topics.json");
const MATH_MAP: &str = include_str!("../../../data/math_map.json");
const SEED_CONCEPTS: &str = include_str!("../../../data/seed_concepts.json");
const SEED_EUCLID: &str = include_str!("../../../data/seed_euclid.json");
const SEED_RESOURCES: &str = include_str!("../../../data/seed_resources.json");

pub struct Catalog {
    pub topics: TopicCatalog,
    pub mathmap: MathMap,
    pub concepts: ConceptGraph,
    pub euclid: EuclidLibrary,
    pub resources: ResourceLibrary,
}

impl Catalog {
    /// Load the catalog from `dir`. Files missing from `dir` fall back to the
    /// copies compiled into the binary; files that exist but do not parse are
    /// an error.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            topics: TopicCatalog::new(read_or(dir, "demo_topics.json", DEMO_TOPICS)?),
            mathmap: MathMap::new(read_or(dir, "math_map.json", MATH_MAP)?),
            concepts: ConceptGraph::new(read_or(dir, "seed_concepts.json", SEED_CONCEPTS)?),
            euclid: EuclidLibrary::new(read_or(dir, "seed_euclid.json", SEED_EUCLID)?),
            resources: ResourceLibrary::new(read_or(dir, "seed_resources.json", SEED_RESOURCES)?),
        })
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            topics: TopicCatalog::new(serde_json::from_str(DEMO_TOPICS)?),
            mathmap: MathMap::new(serde_json::from_str(MATH_MAP)?),
            concepts: ConceptGraph::new(serde_json::from_str(SEED_CONCEPTS)?),
            euclid: EuclidLibrary::new(serde_json::from_str(SEED_EUCLID)?),
            resources: ResourceLibrary::new(serde_json::from_str(SEED_RESOURCES)?),
        })
    }
}

fn read_or<T: DeserializeOwned>(dir: &Path, name: &str, embedded: &str) -> Result<T> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            tracing::debug!(path = %path.display(), "Loading catalog file");
            Ok(serde_json::from_str(&text)?)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(file = name, "Catalog file missing, using built-in copy");
            Ok(serde_json::from_str(embedded)?)
        }
        Err(e) => Err(e.into()),
    }
}
