pub mod catalog;
pub mod diagram;
pub mod element;
pub mod graph;
pub mod logic;
pub mod pattern;
pub mod query;

pub use catalog::{load_catalog, CatalogError, CatalogRecord};
pub use diagram::{CatalogEntryError, Diagram, DiagramNode, DisplayInfo, Relation};
pub use graph::PatternGraph;
pub use logic::{
    generate_truthtable, query_equivalent, query_is_subset_of, querymatch, querymatch_with_limit,
    LogicError, MatchCache, NeverMatches, SubstructOracle, TruthTable, DEFAULT_MAX_VOCAB,
};
pub use pattern::{parse, PatternError};
pub use query::{Literal, PropKey, PropValue, PropertyMap, QueryExpr};
