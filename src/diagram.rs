use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::catalog::{load_catalog, CatalogError, CatalogRecord};
use crate::graph::PatternGraph;
use crate::pattern::{self, PatternError};

/// Edge label in the containment diagram. Edges point from the more specific
/// query to the more general one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The source query's results are contained within the target's.
    IsA,
    /// A match of the source query implies the target sub-feature is present.
    Has,
}

/// Display metadata carried per merged catalog record, so aliased spellings
/// keep their own name and source tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub key: String,
    pub name: String,
    pub source: String,
}

/// One vertex of the containment diagram. `matched` is filled in by the
/// external matcher with the target-structure nodes this query matched at.
#[derive(Debug, Clone)]
pub struct DiagramNode {
    pub key: String,
    pub name: String,
    pub query: PatternGraph,
    pub display: Vec<DisplayInfo>,
    pub matched: HashSet<NodeIndex>,
}

/// A catalog record that could not join the diagram. The build goes on
/// without it.
#[derive(Debug)]
pub struct CatalogEntryError {
    pub key: String,
    pub error: PatternError,
}

impl fmt::Display for CatalogEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catalog entry '{}': {}", self.key, self.error)
    }
}

impl std::error::Error for CatalogEntryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A transitively reduced DAG of named reference queries, ordered by declared
/// containment.
#[derive(Debug, Default)]
pub struct Diagram {
    graph: DiGraph<DiagramNode, Relation>,
    index: HashMap<String, NodeIndex>,
    skipped: Vec<CatalogEntryError>,
}

impl Diagram {
    /// Builds the diagram from catalog records, optionally keeping only the
    /// given source tags.
    ///
    /// Aliased records are merged into their canonical record, records whose
    /// pattern fails to parse are skipped and reported in [`skipped`], and
    /// `isa`/`has` edges to keys that did not survive are dropped. The edge
    /// set is transitively reduced.
    ///
    /// [`skipped`]: Diagram::skipped
    pub fn build(records: Vec<CatalogRecord>, source_filter: Option<&[&str]>) -> Diagram {
        let records: Vec<CatalogRecord> = records
            .into_iter()
            .filter(|r| source_filter.map_or(true, |srcs| srcs.contains(&r.source.as_str())))
            .collect();

        // alias key -> canonical key
        let mut canonical_of: HashMap<String, String> = HashMap::new();
        for record in &records {
            for alias in &record.aliases {
                canonical_of.insert(alias.clone(), record.key.clone());
            }
        }

        let mut diagram = Diagram::default();

        for record in &records {
            if canonical_of.contains_key(&record.key) {
                continue;
            }
            let query = match pattern::parse(&record.query) {
                Ok(q) => q,
                Err(error) => {
                    tracing::warn!(key = %record.key, %error, "skipping unparseable catalog entry");
                    diagram.skipped.push(CatalogEntryError {
                        key: record.key.clone(),
                        error,
                    });
                    continue;
                }
            };
            let idx = diagram.graph.add_node(DiagramNode {
                key: record.key.clone(),
                name: record.name.clone(),
                query,
                display: vec![DisplayInfo {
                    key: record.key.clone(),
                    name: record.name.clone(),
                    source: record.source.clone(),
                }],
                matched: HashSet::new(),
            });
            diagram.index.insert(record.key.clone(), idx);
        }

        // Fold alias records into their canonical vertex and make their keys
        // resolve to it.
        for record in &records {
            let Some(canonical) = canonical_of.get(&record.key) else {
                continue;
            };
            let Some(&idx) = diagram.index.get(canonical) else {
                continue;
            };
            diagram.graph[idx].display.push(DisplayInfo {
                key: record.key.clone(),
                name: record.name.clone(),
                source: record.source.clone(),
            });
            diagram.index.insert(record.key.clone(), idx);
        }

        for record in &records {
            if canonical_of.contains_key(&record.key) {
                continue;
            }
            let Some(&from) = diagram.index.get(&record.key) else {
                continue;
            };
            let targets = record
                .isa
                .iter()
                .map(|k| (k, Relation::IsA))
                .chain(record.has.iter().map(|k| (k, Relation::Has)));
            for (target, relation) in targets {
                match diagram.index.get(target) {
                    Some(&to) if to != from => {
                        diagram.graph.add_edge(from, to, relation);
                    }
                    _ => {
                        tracing::debug!(
                            key = %record.key,
                            %target,
                            "dropping relation to absent catalog key"
                        );
                    }
                }
            }
        }

        diagram.reduce();
        diagram
    }

    /// Loads a catalog file and builds its diagram.
    pub fn from_catalog(
        path: impl AsRef<Path>,
        source_filter: Option<&[&str]>,
    ) -> Result<Diagram, CatalogError> {
        let records = load_catalog(path)?;
        Ok(Diagram::build(records, source_filter))
    }

    /// Removes every edge implied by a longer directed path. Idempotent.
    fn reduce(&mut self) {
        let mut keep = Vec::new();
        for edge in self.graph.edge_indices() {
            let (u, v) = match self.graph.edge_endpoints(edge) {
                Some(ends) => ends,
                None => continue,
            };
            let redundant = self
                .graph
                .neighbors_directed(u, Direction::Outgoing)
                .filter(|&w| w != v)
                .any(|w| has_path_connecting(&self.graph, w, v, None));
            if !redundant {
                keep.push((u, v, self.graph[edge]));
            }
        }
        self.graph.clear_edges();
        for (u, v, relation) in keep {
            self.graph.add_edge(u, v, relation);
        }
    }

    /// Vertices in matching order: every query before the more general
    /// queries it points at, so a matcher can prune generalizations whose
    /// specializations already failed. Falls back to insertion order if the
    /// catalog declared a relation cycle.
    pub fn matching_order(&self) -> Vec<NodeIndex> {
        match toposort(&self.graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                tracing::warn!(
                    key = %self.graph[cycle.node_id()].key,
                    "containment relations form a cycle; matching order is arbitrary"
                );
                self.graph.node_indices().collect()
            }
        }
    }

    pub fn node(&self, key: &str) -> Option<&DiagramNode> {
        self.index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, key: &str) -> Option<&mut DiagramNode> {
        self.index.get(key).map(|&idx| &mut self.graph[idx])
    }

    pub fn relation(&self, from: &str, to: &str) -> Option<Relation> {
        let (&a, &b) = (self.index.get(from)?, self.index.get(to)?);
        self.graph
            .find_edge(a, b)
            .map(|e| self.graph[e])
    }

    /// Keys of the diagram's vertices, alias keys included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Records that failed to parse during the build.
    pub fn skipped(&self) -> &[CatalogEntryError] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn graph(&self) -> &DiGraph<DiagramNode, Relation> {
        &self.graph
    }
}
