//! In-memory code graph: entities keyed by id plus an append-only edge list.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

use crate::config::{Entity, EntityKind, Relationship, RelationshipKind};

/// Owns every entity (by id) and the ordered sequence of relationships.
///
/// `outgoing` / `incoming` hold positions into `relationships` and are rebuilt
/// incrementally on every insertion. They are caches, never the source of truth.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    entities: BTreeMap<String, Entity>,
    relationships: Vec<Relationship>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Mutation ---

    /// Insert an entity, replacing any entity with the same id.
    ///
    /// Returns the replaced entity so callers can record identifier collisions.
    pub fn add_entity(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id.clone(), entity)
    }

    /// Append a relationship. Endpoints are not validated: dangling targets are expected.
    pub fn add_relationship(&mut self, rel: Relationship) {
        let pos = self.relationships.len();
        self.outgoing
            .entry(rel.source_id.clone())
            .or_default()
            .push(pos);
        self.incoming
            .entry(rel.target_id.clone())
            .or_default()
            .push(pos);
        self.relationships.push(rel);
    }

    // --- Queries ---

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn has_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Relationships whose source is `id`, in discovery order.
    pub fn outgoing(&self, id: &str) -> Vec<&Relationship> {
        self.collect_positions(self.outgoing.get(id))
    }

    /// Relationships whose target is `id`, in discovery order.
    pub fn incoming(&self, id: &str) -> Vec<&Relationship> {
        self.collect_positions(self.incoming.get(id))
    }

    fn collect_positions(&self, positions: Option<&Vec<usize>>) -> Vec<&Relationship> {
        positions
            .map(|ps| ps.iter().map(|&p| &self.relationships[p]).collect())
            .unwrap_or_default()
    }

    /// All entities, ordered by id.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.kind == kind)
    }

    pub fn entities_in_file<'a>(&'a self, file_path: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities.values().filter(move |e| e.file_path == file_path)
    }

    /// All relationships in discovery order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationships_of_kind(
        &self,
        kind: RelationshipKind,
    ) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.kind == kind)
    }

    /// Whether the relationship's target names an entity outside the graph.
    pub fn is_dangling(&self, rel: &Relationship) -> bool {
        !self.entities.contains_key(&rel.target_id)
    }

    // --- Counts ---

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn count_entities(&self, kind: EntityKind) -> usize {
        self.entities_of_kind(kind).count()
    }

    pub fn count_relationships(&self, kind: RelationshipKind) -> usize {
        self.relationships_of_kind(kind).count()
    }

    /// Project the edges of `kind` onto a petgraph `DiGraph`, one node per id.
    ///
    /// Duplicate edges collapse into one. With `internal_only`, edges whose
    /// endpoints are not known entities are left out.
    pub fn to_digraph(
        &self,
        kind: RelationshipKind,
        internal_only: bool,
    ) -> (DiGraph<String, RelationshipKind>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        fn ensure_node(
            graph: &mut DiGraph<String, RelationshipKind>,
            index: &mut HashMap<String, NodeIndex>,
            id: &str,
        ) -> NodeIndex {
            if let Some(&idx) = index.get(id) {
                idx
            } else {
                let idx = graph.add_node(id.to_string());
                index.insert(id.to_string(), idx);
                idx
            }
        }

        for rel in self.relationships_of_kind(kind) {
            if rel.target_id.is_empty() {
                continue;
            }
            if internal_only && (!self.has_entity(&rel.source_id) || !self.has_entity(&rel.target_id))
            {
                continue;
            }
            let from = ensure_node(&mut graph, &mut index, &rel.source_id);
            let to = ensure_node(&mut graph, &mut index, &rel.target_id);
            if graph.find_edge(from, to).is_none() {
                graph.add_edge(from, to, kind);
            }
        }
        (graph, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(parent: &str, name: &str) -> Entity {
        Entity::nested(parent, name, EntityKind::Function, "app.py", 1)
    }

    #[test]
    fn add_entity_and_query() {
        let mut g = CodeGraph::new();
        g.add_entity(Entity::module("app", "app.py"));
        g.add_entity(function("app", "helper"));
        assert_eq!(g.entity_count(), 2);
        assert!(g.has_entity("app.helper"));
        assert_eq!(g.get_entity("app.helper").unwrap().name, "helper");
        assert!(g.get_entity("app.missing").is_none());
    }

    #[test]
    fn re_adding_entity_overwrites_without_growing() {
        let mut g = CodeGraph::new();
        assert!(g.add_entity(function("app", "helper")).is_none());
        let mut updated = function("app", "helper");
        updated.line_number = 42;
        let previous = g.add_entity(updated);
        assert_eq!(previous.map(|e| e.line_number), Some(1));
        assert_eq!(g.entity_count(), 1);
        assert_eq!(g.get_entity("app.helper").unwrap().line_number, 42);
    }

    #[test]
    fn adjacency_indexes_track_insertions() {
        let mut g = CodeGraph::new();
        g.add_relationship(Relationship::new("a.f", "a.g", RelationshipKind::Calls));
        g.add_relationship(Relationship::new("a.f", "a.h", RelationshipKind::Calls));
        g.add_relationship(Relationship::new("a.k", "a.g", RelationshipKind::Calls));

        let out: Vec<_> = g.outgoing("a.f").iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(out, vec!["a.g", "a.h"]);

        let inc: Vec<_> = g.incoming("a.g").iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(inc, vec!["a.f", "a.k"]);
    }

    #[test]
    fn unknown_ids_have_no_edges() {
        let g = CodeGraph::new();
        assert!(g.outgoing("nope").is_empty());
        assert!(g.incoming("nope").is_empty());
    }

    #[test]
    fn dangling_targets_are_accepted() {
        let mut g = CodeGraph::new();
        g.add_entity(Entity::module("main", "main.py"));
        g.add_relationship(Relationship::new("main", "requests", RelationshipKind::Imports));
        assert_eq!(g.relationship_count(), 1);
        assert!(g.is_dangling(&g.relationships()[0]));
        assert_eq!(g.incoming("requests").len(), 1);
    }

    #[test]
    fn duplicate_edges_are_kept_in_order() {
        let mut g = CodeGraph::new();
        g.add_relationship(Relationship::new("a.f", "a.g", RelationshipKind::Calls));
        g.add_relationship(Relationship::new("a.f", "a.g", RelationshipKind::Calls));
        assert_eq!(g.count_relationships(RelationshipKind::Calls), 2);
        assert_eq!(g.outgoing("a.f").len(), 2);
    }

    #[test]
    fn digraph_projection_collapses_duplicates() {
        let mut g = CodeGraph::new();
        g.add_entity(Entity::module("a", "a.py"));
        g.add_entity(Entity::module("b", "b.py"));
        g.add_relationship(Relationship::new("a", "b", RelationshipKind::Imports));
        g.add_relationship(Relationship::new("a", "b", RelationshipKind::Imports));
        g.add_relationship(Relationship::new("a", "os", RelationshipKind::Imports));

        let (all, _) = g.to_digraph(RelationshipKind::Imports, false);
        assert_eq!(all.node_count(), 3);
        assert_eq!(all.edge_count(), 2);

        let (internal, index) = g.to_digraph(RelationshipKind::Imports, true);
        assert_eq!(internal.edge_count(), 1);
        assert!(!index.contains_key("os"));
    }
}
