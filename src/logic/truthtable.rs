use std::collections::BTreeSet;

use crate::query::{optimize, Literal, PropertyMap, QueryExpr};

use super::error::LogicError;
use super::normalize::{resolve_disjoint_not, resolve_recursive, MatchCache, SubstructOracle};

/// Largest vocabulary `querymatch` will enumerate by default. Enumeration
/// cost is `2^n`, so comparisons above this size degrade to a conservative
/// "not determined" result instead of running.
pub const DEFAULT_MAX_VOCAB: usize = 14;

/// A query compiled against a fixed vocabulary: variables are indices into
/// the vocabulary's canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledQuery {
    True,
    /// A literal that fell outside the vocabulary; cannot occur for tables
    /// built by [`generate_truthtable`].
    False,
    Var(usize),
    And(Vec<CompiledQuery>),
    Or(Vec<CompiledQuery>),
    Not(Box<CompiledQuery>),
}

impl CompiledQuery {
    fn eval(&self, bits: &[bool]) -> bool {
        match self {
            CompiledQuery::True => true,
            CompiledQuery::False => false,
            CompiledQuery::Var(i) => bits[*i],
            CompiledQuery::And(parts) => parts.iter().all(|p| p.eval(bits)),
            CompiledQuery::Or(parts) => parts.iter().any(|p| p.eval(bits)),
            CompiledQuery::Not(inner) => !inner.eval(bits),
        }
    }
}

/// A boolean function over a fixed, ordered property vocabulary.
///
/// Not a materialized table: rows are generated on the fly during
/// [`querymatch`] enumeration. Two tables are only comparable if they came
/// from the same [`generate_truthtable`] call.
#[derive(Debug, Clone)]
pub struct TruthTable {
    vocab: Vec<Literal>,
    expr: CompiledQuery,
}

impl TruthTable {
    pub fn vocab(&self) -> &[Literal] {
        &self.vocab
    }

    pub fn eval(&self, bits: &[bool]) -> bool {
        self.expr.eval(bits)
    }
}

fn compile(expr: &QueryExpr, vocab: &[Literal]) -> CompiledQuery {
    match expr {
        QueryExpr::Any => CompiledQuery::True,
        QueryExpr::Literal(lit) => match vocab.binary_search(lit) {
            Ok(i) => CompiledQuery::Var(i),
            Err(_) => CompiledQuery::False,
        },
        QueryExpr::And(parts) => {
            CompiledQuery::And(parts.iter().map(|p| compile(p, vocab)).collect())
        }
        QueryExpr::Or(parts) => {
            CompiledQuery::Or(parts.iter().map(|p| compile(p, vocab)).collect())
        }
        QueryExpr::Not(inner) => CompiledQuery::Not(Box::new(compile(inner, vocab))),
    }
}

/// Normalizes two queries against each other and compiles both over one
/// shared vocabulary, sorted by (key, value) for determinism.
pub fn generate_truthtable(
    a: &QueryExpr,
    b: &QueryExpr,
    oracle: &dyn SubstructOracle,
    mut cache: Option<&mut MatchCache>,
) -> Result<(TruthTable, TruthTable), LogicError> {
    let a = optimize(a);
    let b = optimize(b);

    let map_a = PropertyMap::of(&a);
    let map_b = PropertyMap::of(&b);
    let a = resolve_disjoint_not(&a, &map_b);
    let b = resolve_disjoint_not(&b, &map_a);

    let map_a = PropertyMap::of(&a);
    let map_b = PropertyMap::of(&b);
    let a = resolve_recursive(&a, &map_b, oracle, cache.as_deref_mut())?;
    let b = resolve_recursive(&b, &map_a, oracle, cache.as_deref_mut())?;

    let mut union: BTreeSet<Literal> = PropertyMap::of(&a).all_literals().cloned().collect();
    union.extend(PropertyMap::of(&b).all_literals().cloned());
    let vocab: Vec<Literal> = union.into_iter().collect();

    let expr_a = compile(&a, &vocab);
    let expr_b = compile(&b, &vocab);

    Ok((
        TruthTable {
            vocab: vocab.clone(),
            expr: expr_a,
        },
        TruthTable {
            vocab,
            expr: expr_b,
        },
    ))
}

/// Enumerates every assignment over the shared vocabulary and tests whether
/// `a` is a subset of `b` (`exact == false`) or equivalent to it
/// (`exact == true`), with the default vocabulary-size ceiling.
pub fn querymatch(a: &TruthTable, b: &TruthTable, exact: bool) -> Result<bool, LogicError> {
    querymatch_with_limit(a, b, exact, DEFAULT_MAX_VOCAB)
}

/// [`querymatch`] with an explicit vocabulary-size ceiling. Above the
/// ceiling the comparison is not run: it logs a notice and returns
/// `Ok(false)` so callers can choose to skip or decompose.
pub fn querymatch_with_limit(
    a: &TruthTable,
    b: &TruthTable,
    exact: bool,
    max_vocab: usize,
) -> Result<bool, LogicError> {
    if a.vocab != b.vocab {
        return Err(LogicError::VocabularyMismatch);
    }
    let n = a.vocab.len();
    if n > max_vocab {
        tracing::warn!(
            vocab_size = n,
            limit = max_vocab,
            "truth-table vocabulary too large to enumerate; comparison not determined"
        );
        return Ok(false);
    }

    let mut bits = vec![false; n];
    for assignment in 0u64..(1u64 << n) {
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = assignment >> i & 1 == 1;
        }
        let va = a.eval(&bits);
        let vb = b.eval(&bits);
        if va && !vb {
            return Ok(false);
        }
        if exact && vb && !va {
            return Ok(false);
        }
    }
    Ok(true)
}

/// True when the two queries match exactly the same property assignments.
pub fn query_equivalent(
    a: &QueryExpr,
    b: &QueryExpr,
    oracle: &dyn SubstructOracle,
    cache: Option<&mut MatchCache>,
) -> Result<bool, LogicError> {
    let (ta, tb) = generate_truthtable(a, b, oracle, cache)?;
    querymatch(&ta, &tb, true)
}

/// True when every assignment satisfying `a` also satisfies `b`.
pub fn query_is_subset_of(
    a: &QueryExpr,
    b: &QueryExpr,
    oracle: &dyn SubstructOracle,
    cache: Option<&mut MatchCache>,
) -> Result<bool, LogicError> {
    let (ta, tb) = generate_truthtable(a, b, oracle, cache)?;
    querymatch(&ta, &tb, false)
}
