mod error;
mod normalize;
mod truthtable;

pub use error::LogicError;
pub use normalize::{
    resolve_disjoint_not, resolve_recursive, MatchCache, NeverMatches, SubstructOracle,
};
pub use truthtable::{
    generate_truthtable, query_equivalent, query_is_subset_of, querymatch, querymatch_with_limit,
    CompiledQuery, TruthTable, DEFAULT_MAX_VOCAB,
};
