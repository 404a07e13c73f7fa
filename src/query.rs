use std::collections::{BTreeMap, BTreeSet};

/// Property vocabulary for query literals.
///
/// Atom properties come first, bond properties last. The derived `Ord` is the
/// canonical sort order used when building a shared truth-table vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropKey {
    /// Element symbol (e.g. "C", "Cl").
    Symbol,
    /// Atomic number from a `#n` primitive; carries no aromaticity constraint.
    AtomicNum,
    /// Aromaticity flag (`a`, lowercase symbols).
    Aromatic,
    /// Formal charge (`+n` / `-n`).
    Charge,
    /// Isotope mass number.
    Isotope,
    /// Heavy-atom degree (`D`).
    Degree,
    /// Degree plus implicit hydrogen count (`X`).
    Connectivity,
    /// Total attached hydrogens (`H`).
    TotalHCount,
    /// Implicit hydrogen count (`h`).
    ImplicitHCount,
    /// Member of at least one ring (`R` bare).
    InRing,
    /// Number of rings containing the atom (`Rn`).
    RingMembership,
    /// Size of the smallest ring containing the atom (`rn`).
    SmallestRingSize,
    /// Number of ring bonds on the atom (`x`).
    RingBondCount,
    /// Total valence (`v`).
    Valence,
    /// Tetrahedral chirality marker (`@` / `@@`), consumed downstream by the
    /// stereochemistry collaborator.
    Chirality,
    /// Atom map class (`:n`).
    AtomMap,
    /// Recursive sub-pattern (`$(...)`); the value holds the raw pattern text,
    /// parsed lazily.
    Recursive,
    /// Bond order 1, 2 or 3.
    BondOrder,
    /// Aromatic bond (`:`).
    BondAromatic,
    /// Ring bond (`@`).
    BondRing,
    /// Directional bond (`/` or `\`).
    BondDirection,
}

/// Parameter carried by a literal, when its key takes one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropValue {
    Int(i32),
    Text(String),
}

/// A named atomic predicate: key plus optional parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    pub key: PropKey,
    pub value: Option<PropValue>,
}

impl Literal {
    pub fn flag(key: PropKey) -> Self {
        Self { key, value: None }
    }

    pub fn int(key: PropKey, n: i32) -> Self {
        Self {
            key,
            value: Some(PropValue::Int(n)),
        }
    }

    pub fn text(key: PropKey, s: impl Into<String>) -> Self {
        Self {
            key,
            value: Some(PropValue::Text(s.into())),
        }
    }
}

/// Boolean query tree over literals.
///
/// Trees are immutable value types: every rewrite in the normalizer returns a
/// freshly constructed tree. `And`/`Or` keep child order for reproducible
/// output even though it is semantically irrelevant; `Not` has exactly one
/// child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryExpr {
    /// Matches everything (wildcard `*`, any-bond `~`).
    Any,
    Literal(Literal),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
    Not(Box<QueryExpr>),
}

impl QueryExpr {
    pub fn lit(literal: Literal) -> Self {
        QueryExpr::Literal(literal)
    }

    pub fn not(inner: QueryExpr) -> Self {
        QueryExpr::Not(Box::new(inner))
    }
}

/// The distinct literal instances appearing anywhere in a tree, grouped by key.
///
/// Built by a single traversal. Used by the normalizer to test whether the
/// sibling query's vocabulary can falsify a given literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: BTreeMap<PropKey, BTreeSet<Literal>>,
}

impl PropertyMap {
    pub fn of(expr: &QueryExpr) -> Self {
        let mut map = Self::default();
        map.collect(expr);
        map
    }

    fn collect(&mut self, expr: &QueryExpr) {
        match expr {
            QueryExpr::Any => {}
            QueryExpr::Literal(lit) => {
                self.entries.entry(lit.key).or_default().insert(lit.clone());
            }
            QueryExpr::And(parts) | QueryExpr::Or(parts) => {
                for p in parts {
                    self.collect(p);
                }
            }
            QueryExpr::Not(inner) => self.collect(inner),
        }
    }

    /// Distinct literals recorded for `key`, in canonical order.
    pub fn literals(&self, key: PropKey) -> impl Iterator<Item = &Literal> {
        self.entries.get(&key).into_iter().flatten()
    }

    /// All distinct literals across every key, in canonical order.
    pub fn all_literals(&self) -> impl Iterator<Item = &Literal> {
        self.entries.values().flatten()
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flattens nested `And`/`Or` nodes into their parent and collapses
/// single-child operator nodes. No other semantic change.
pub fn optimize(expr: &QueryExpr) -> QueryExpr {
    match expr {
        QueryExpr::And(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                match optimize(p) {
                    QueryExpr::And(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            if out.len() == 1 {
                out.pop().unwrap()
            } else {
                QueryExpr::And(out)
            }
        }
        QueryExpr::Or(parts) => {
            let mut out = Vec::with_capacity(parts.len());
            for p in parts {
                match optimize(p) {
                    QueryExpr::Or(inner) => out.extend(inner),
                    other => out.push(other),
                }
            }
            if out.len() == 1 {
                out.pop().unwrap()
            } else {
                QueryExpr::Or(out)
            }
        }
        QueryExpr::Not(inner) => QueryExpr::not(optimize(inner)),
        leaf => leaf.clone(),
    }
}
