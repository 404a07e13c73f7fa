use std::collections::HashMap;

use crate::pattern::{self, PatternError};
use crate::query::{Literal, PropKey, PropValue, PropertyMap, QueryExpr};

/// The external substructure matcher, consumed as a black box.
///
/// `matches_anchored(query, target)` answers whether the pattern `query`,
/// anchored at its first atom, matches the pattern `target` treated as a
/// structure. Implementations must be deterministic and side-effect-free.
pub trait SubstructOracle {
    fn matches_anchored(&self, query: &str, target: &str) -> bool;
}

/// Oracle that never matches. Suitable when neither query under comparison
/// contains recursive literals.
pub struct NeverMatches;

impl SubstructOracle for NeverMatches {
    fn matches_anchored(&self, _query: &str, _target: &str) -> bool {
        false
    }
}

/// Memo for oracle calls: this pattern text → other pattern text → result.
///
/// Append-only; the oracle is deterministic, so repeated insertions for the
/// same key pair agree.
pub type MatchCache = HashMap<String, HashMap<String, bool>>;

/// Rewrites `not(L)` into `or(not(L), <other literals sharing L's key>)`
/// wherever the other query's property map knows alternatives for the key.
///
/// A freshly introduced literal absent from the other query would otherwise be
/// treated as always-false during shared-vocabulary enumeration; the rewrite
/// makes the enumerable alternatives explicit. Only the other query's map is
/// consulted — this is a one-level heuristic, not a decision procedure.
/// Returns a new tree; the input is never mutated. Idempotent.
pub fn resolve_disjoint_not(expr: &QueryExpr, other: &PropertyMap) -> QueryExpr {
    match expr {
        QueryExpr::Not(inner) => match inner.as_ref() {
            QueryExpr::Literal(lit) => {
                let alternatives: Vec<QueryExpr> = other
                    .literals(lit.key)
                    .filter(|l| *l != lit)
                    .cloned()
                    .map(QueryExpr::Literal)
                    .collect();
                if alternatives.is_empty() {
                    expr.clone()
                } else {
                    let mut parts = vec![expr.clone()];
                    parts.extend(alternatives);
                    dedup_or(parts)
                }
            }
            _ => QueryExpr::not(resolve_disjoint_not(inner, other)),
        },
        QueryExpr::And(parts) => QueryExpr::And(
            parts
                .iter()
                .map(|p| resolve_disjoint_not(p, other))
                .collect(),
        ),
        QueryExpr::Or(parts) => dedup_or(
            parts
                .iter()
                .map(|p| resolve_disjoint_not(p, other))
                .collect(),
        ),
        leaf => leaf.clone(),
    }
}

/// Flattens one level of `Or` nesting and drops duplicate children, keeping
/// first-occurrence order. Deduplication is what makes `resolve_disjoint_not`
/// idempotent.
fn dedup_or(parts: Vec<QueryExpr>) -> QueryExpr {
    let mut flattened: Vec<QueryExpr> = Vec::with_capacity(parts.len());
    for p in parts {
        match p {
            QueryExpr::Or(inner) => {
                for q in inner {
                    if !flattened.contains(&q) {
                        flattened.push(q);
                    }
                }
            }
            other => {
                if !flattened.contains(&other) {
                    flattened.push(other);
                }
            }
        }
    }
    if flattened.len() == 1 {
        flattened.pop().unwrap()
    } else {
        QueryExpr::Or(flattened)
    }
}

/// Expands each recursive literal `$(...)` into a conjunction of the literal
/// itself, its sub-pattern's anchor-atom tree, and every recursive literal
/// from the other query whose pattern is a superset match of this one
/// according to the oracle.
///
/// The anchor tree is always added unconditionally. An `And` whose first two
/// children are a recursive literal followed by that literal's own anchor
/// tree is recognized as already expanded and returned unchanged, making the
/// pass idempotent. Returns a new tree; the input is never mutated.
pub fn resolve_recursive(
    expr: &QueryExpr,
    other: &PropertyMap,
    oracle: &dyn SubstructOracle,
    mut cache: Option<&mut MatchCache>,
) -> Result<QueryExpr, PatternError> {
    match expr {
        QueryExpr::Literal(lit) if lit.key == PropKey::Recursive => {
            expand_recursive(lit, other, oracle, cache)
        }
        QueryExpr::And(parts) => {
            if is_expanded(parts)? {
                return Ok(expr.clone());
            }
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                out.push(resolve_recursive(p, other, oracle, cache.as_deref_mut())?);
            }
            Ok(QueryExpr::And(out))
        }
        QueryExpr::Or(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                out.push(resolve_recursive(p, other, oracle, cache.as_deref_mut())?);
            }
            Ok(QueryExpr::Or(out))
        }
        QueryExpr::Not(inner) => Ok(QueryExpr::not(resolve_recursive(
            inner, other, oracle, cache,
        )?)),
        leaf => Ok(leaf.clone()),
    }
}

fn pattern_text(lit: &Literal) -> Option<&str> {
    match &lit.value {
        Some(PropValue::Text(t)) => Some(t),
        _ => None,
    }
}

/// The query tree of a sub-pattern's first atom.
fn anchor_tree(text: &str) -> Result<QueryExpr, PatternError> {
    let graph = pattern::parse(text)?;
    let idx = graph.anchor().ok_or(PatternError::EmptyInput)?;
    Ok(graph.atom(idx).clone())
}

fn is_expanded(parts: &[QueryExpr]) -> Result<bool, PatternError> {
    let [QueryExpr::Literal(lit), anchor, ..] = parts else {
        return Ok(false);
    };
    if lit.key != PropKey::Recursive {
        return Ok(false);
    }
    let Some(text) = pattern_text(lit) else {
        return Ok(false);
    };
    Ok(anchor_tree(text)? == *anchor)
}

fn expand_recursive(
    lit: &Literal,
    other: &PropertyMap,
    oracle: &dyn SubstructOracle,
    mut cache: Option<&mut MatchCache>,
) -> Result<QueryExpr, PatternError> {
    let Some(text) = pattern_text(lit) else {
        return Ok(QueryExpr::Literal(lit.clone()));
    };
    let text = text.to_string();
    let mut parts = vec![QueryExpr::Literal(lit.clone()), anchor_tree(&text)?];

    for candidate in other.literals(PropKey::Recursive) {
        let Some(cand_text) = pattern_text(candidate) else {
            continue;
        };
        if cand_text == text {
            continue;
        }
        if cached_match(oracle, cache.as_deref_mut(), &text, cand_text) {
            parts.push(QueryExpr::Literal(candidate.clone()));
        }
    }

    Ok(QueryExpr::And(parts))
}

/// Asks the oracle whether `candidate` is a superset match of `this`,
/// consulting the cache first when one is supplied.
fn cached_match(
    oracle: &dyn SubstructOracle,
    cache: Option<&mut MatchCache>,
    this: &str,
    candidate: &str,
) -> bool {
    match cache {
        Some(c) => {
            if let Some(&hit) = c.get(this).and_then(|m| m.get(candidate)) {
                return hit;
            }
            let hit = oracle.matches_anchored(candidate, this);
            c.entry(this.to_string())
                .or_default()
                .insert(candidate.to_string(), hit);
            hit
        }
        None => oracle.matches_anchored(candidate, this),
    }
}
