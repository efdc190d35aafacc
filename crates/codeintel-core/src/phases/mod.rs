//! Scan phases, run in order by [`crate::pipeline`].
//!
//! The two graph-building passes extract each file independently into a
//! [`FileBatch`]; batches are then applied to the [`CodeGraph`] one at a time,
//! in file order, by the caller that owns the graph.

use crate::config::{Entity, Relationship, RelationshipKind, ResolutionStats, ScanDiagnostics};
use crate::graph::code_graph::CodeGraph;

pub mod definitions;
pub mod discovery;
pub mod imports;
pub mod parsing;
pub mod relationships;

/// One pending write to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWrite {
    Entity(Entity),
    Relationship(Relationship),
}

/// Everything one file contributes to a pass, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    pub writes: Vec<GraphWrite>,
    pub stats: ResolutionStats,
}

impl FileBatch {
    pub fn entity(&mut self, entity: Entity) {
        self.writes.push(GraphWrite::Entity(entity));
    }

    pub fn relationship(&mut self, rel: Relationship) {
        self.writes.push(GraphWrite::Relationship(rel));
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.writes.iter().filter_map(|w| match w {
            GraphWrite::Entity(e) => Some(e),
            GraphWrite::Relationship(_) => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.writes.iter().filter_map(|w| match w {
            GraphWrite::Relationship(r) => Some(r),
            GraphWrite::Entity(_) => None,
        })
    }
}

/// Apply batches in order. This is the only place scan passes mutate the graph.
///
/// A redefined method (`@property` then `@x.setter`) replaces its entity but
/// keeps a single `defines` edge from its type.
pub fn apply_batches(
    graph: &mut CodeGraph,
    batches: Vec<FileBatch>,
    diagnostics: &mut ScanDiagnostics,
) {
    for batch in batches {
        diagnostics.resolution.merge(&batch.stats);
        for write in batch.writes {
            match write {
                GraphWrite::Entity(entity) => {
                    let id = entity.id.clone();
                    if graph.add_entity(entity).is_some() {
                        diagnostics.identifier_collisions.push(id);
                    }
                }
                GraphWrite::Relationship(rel) => {
                    if rel.kind == RelationshipKind::Defines
                        && graph.outgoing(&rel.source_id).contains(&&rel)
                    {
                        continue;
                    }
                    graph.add_relationship(rel);
                }
            }
        }
    }
}
