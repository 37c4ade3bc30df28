//! Concept prerequisite graph.
//!
//! The seed file only lists prerequisites; the reverse "leads to" edges are
//! derived on load. Mind maps are built by walking both directions from a
//! target concept and returned as force-graph nodes and links.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use euclid_common::models::{ConceptResponse, LinkRelation, MindMapLink, MindMapNode, MindMapResponse};

pub const DEFAULT_DEPTH: u32 = 3;
pub const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub level: i32,
    pub category: Option<String>,
    pub euclid_ref: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Concept {
    fn to_node(&self, is_target: bool) -> MindMapNode {
        MindMapNode {
            id: self.slug.clone(),
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            level: self.level,
            category: self.category.clone().unwrap_or_else(|| "general".to_string()),
            euclid_ref: self.euclid_ref.clone(),
            is_target,
        }
    }
}

impl From<&Concept> for ConceptResponse {
    fn from(c: &Concept) -> Self {
        Self {
            id: c.slug.clone(),
            slug: c.slug.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            level: c.level,
            category: c.category.clone(),
            euclid_ref: c.euclid_ref.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptFile {
    #[serde(default)]
    pub concepts: Vec<Concept>,
}

pub struct ConceptGraph {
    concepts: Vec<Concept>,
    by_slug: HashMap<String, usize>,
    /// Index of each concept's dependants, in seed order.
    leads_to: Vec<Vec<usize>>,
    /// Prerequisites resolved to indices; unknown slugs are dropped.
    prerequisites: Vec<Vec<usize>>,
}

impl ConceptGraph {
    pub fn new(file: ConceptFile) -> Self {
        let concepts = file.concepts;
        let by_slug: HashMap<String, usize> =
            concepts.iter().enumerate().map(|(i, c)| (c.slug.clone(), i)).collect();

        let mut prerequisites = vec![Vec::new(); concepts.len()];
        let mut leads_to = vec![Vec::new(); concepts.len()];
        for (i, concept) in concepts.iter().enumerate() {
            for slug in &concept.prerequisites {
                match by_slug.get(slug) {
                    Some(&p) if p != i && !prerequisites[i].contains(&p) => {
                        prerequisites[i].push(p);
                        leads_to[p].push(i);
                    }
                    Some(_) => {}
                    None => tracing::warn!(concept = %concept.slug, prerequisite = %slug, "Unknown prerequisite"),
                }
            }
        }
        Self { concepts, by_slug, leads_to, prerequisites }
    }

    pub fn get(&self, slug: &str) -> Option<&Concept> {
        self.by_slug.get(slug).map(|&i| &self.concepts[i])
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Concepts ordered by `(level, name)`, optionally restricted to one category.
    pub fn list_concepts(&self, category: Option<&str>, limit: usize) -> Vec<&Concept> {
        let mut rows: Vec<&Concept> = self
            .concepts
            .iter()
            .filter(|c| category.map_or(true, |cat| c.category.as_deref() == Some(cat)))
            .collect();
        rows.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        rows.truncate(limit);
        rows
    }

    /// Graph centred on `slug`, or `None` for an unknown concept.
    pub fn build_mind_map(&self, slug: &str, depth: u32, include_leads_to: bool) -> Option<MindMapResponse> {
        let &target = self.by_slug.get(slug)?;
        let mut walk = Walk::default();
        walk.visit(target, &self.concepts[target], true);

        self.walk_prerequisites(target, depth, &mut walk);
        if include_leads_to {
            self.walk_leads_to(target, depth, &mut walk);
        }

        Some(MindMapResponse { target: slug.to_string(), nodes: walk.nodes, links: walk.links })
    }

    fn walk_prerequisites(&self, idx: usize, depth: u32, walk: &mut Walk) {
        if depth == 0 {
            return;
        }
        for &p in &self.prerequisites[idx] {
            walk.link(&self.concepts[p].slug, &self.concepts[idx].slug, LinkRelation::Prerequisite);
            if walk.visit(p, &self.concepts[p], false) {
                self.walk_prerequisites(p, depth - 1, walk);
            }
        }
    }

    fn walk_leads_to(&self, idx: usize, depth: u32, walk: &mut Walk) {
        if depth == 0 {
            return;
        }
        for &n in &self.leads_to[idx] {
            walk.link(&self.concepts[idx].slug, &self.concepts[n].slug, LinkRelation::LeadsTo);
            if walk.visit(n, &self.concepts[n], false) {
                self.walk_leads_to(n, depth - 1, walk);
            }
        }
    }
}

#[derive(Default)]
struct Walk {
    visited: HashSet<usize>,
    nodes: Vec<MindMapNode>,
    edges: HashSet<(String, String)>,
    links: Vec<MindMapLink>,
}

impl Walk {
    /// Adds the node on first sight; returns whether it was new.
    fn visit(&mut self, idx: usize, concept: &Concept, is_target: bool) -> bool {
        if !self.visited.insert(idx) {
            return false;
        }
        self.nodes.push(concept.to_node(is_target));
        true
    }

    fn link(&mut self, source: &str, target: &str, relation: LinkRelation) {
        if self.edges.insert((source.to_string(), target.to_string())) {
            self.links.push(MindMapLink {
                source: source.to_string(),
                target: target.to_string(),
                relation,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> ConceptGraph {
        let file: ConceptFile = serde_json::from_str(
            r#"{"concepts": [
                {"slug": "a", "name": "Alpha", "level": 0, "category": "geometry"},
                {"slug": "b", "name": "Beta", "level": 1, "category": "geometry", "prerequisites": ["a"]},
                {"slug": "c", "name": "Gamma", "level": 2, "prerequisites": ["b", "a", "ghost"]},
                {"slug": "d", "name": "Delta", "level": 3, "category": "algebra", "prerequisites": ["c"]}
            ]}"#,
        )
        .unwrap();
        ConceptGraph::new(file)
    }

    #[test]
    fn test_mind_map_both_directions() {
        let map = graph().build_mind_map("c", DEFAULT_DEPTH, true).unwrap();
        let ids: Vec<&str> = map.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a", "d"]);
        assert!(map.nodes[0].is_target);
        assert_eq!(map.nodes[0].category, "general");

        let links: Vec<(&str, &str, LinkRelation)> =
            map.links.iter().map(|l| (l.source.as_str(), l.target.as_str(), l.relation)).collect();
        assert_eq!(
            links,
            vec![
                ("b", "c", LinkRelation::Prerequisite),
                ("a", "b", LinkRelation::Prerequisite),
                ("a", "c", LinkRelation::Prerequisite),
                ("c", "d", LinkRelation::LeadsTo),
            ]
        );
    }

    #[test]
    fn test_depth_limits_walk() {
        let map = graph().build_mind_map("d", 1, false).unwrap();
        let ids: Vec<&str> = map.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
        assert_eq!(map.links.len(), 1);

        let alone = graph().build_mind_map("d", 0, true).unwrap();
        assert_eq!(alone.nodes.len(), 1);
        assert!(alone.links.is_empty());
    }

    #[test]
    fn test_unknown_slug() {
        assert!(graph().build_mind_map("nope", DEFAULT_DEPTH, true).is_none());
    }

    #[test]
    fn test_list_concepts_order_and_filter() {
        let graph = graph();
        let geometry: Vec<&str> =
            graph.list_concepts(Some("geometry"), DEFAULT_LIST_LIMIT).iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(geometry, vec!["a", "b"]);
        assert_eq!(graph.list_concepts(None, 2).len(), 2);
    }
}
