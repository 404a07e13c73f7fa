mod error;
mod parser;

pub use error::PatternError;
pub use parser::parse;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PatternGraph;
    use crate::query::{Literal, PropKey, PropertyMap, QueryExpr};

    fn sym(s: &str) -> QueryExpr {
        QueryExpr::lit(Literal::text(PropKey::Symbol, s))
    }

    fn arom() -> QueryExpr {
        QueryExpr::lit(Literal::flag(PropKey::Aromatic))
    }

    fn aliphatic(s: &str) -> QueryExpr {
        QueryExpr::And(vec![sym(s), QueryExpr::not(arom())])
    }

    fn aromatic(s: &str) -> QueryExpr {
        QueryExpr::And(vec![sym(s), arom()])
    }

    fn order(n: i32) -> QueryExpr {
        QueryExpr::lit(Literal::int(PropKey::BondOrder, n))
    }

    /// Edge set as (low, high) node-index pairs, for order-insensitive
    /// comparison.
    fn edge_set(g: &PatternGraph) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = g
            .bonds()
            .map(|e| {
                let (a, b) = g.bond_endpoints(e).unwrap();
                let (a, b) = (a.index(), b.index());
                (a.min(b), a.max(b))
            })
            .collect();
        edges.sort();
        edges
    }

    fn group_indices(g: &PatternGraph) -> Vec<Vec<usize>> {
        g.groups()
            .iter()
            .map(|grp| grp.iter().map(|n| n.index()).collect())
            .collect()
    }

    fn anchor_expr(g: &PatternGraph) -> &QueryExpr {
        g.atom(g.anchor().unwrap())
    }

    // ---- chains and rings ----

    #[test]
    fn linear_chain() {
        let g = parse("CCCCC").unwrap();
        assert_eq!(g.atom_count(), 5);
        assert_eq!(g.bond_count(), 4);
        assert_eq!(edge_set(&g), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
        for idx in g.atoms() {
            assert_eq!(*g.atom(idx), aliphatic("C"));
        }
    }

    #[test]
    fn six_ring_closes_back_to_first_atom() {
        let g = parse("C1CCCCC1").unwrap();
        assert_eq!(g.atom_count(), 6);
        assert_eq!(g.bond_count(), 6);
        assert_eq!(
            edge_set(&g),
            vec![(0, 1), (0, 5), (1, 2), (2, 3), (3, 4), (4, 5)]
        );
    }

    #[test]
    fn percent_ring_labels_are_equivalent_to_digits() {
        let a = parse("C1CCCCC1").unwrap();
        let b = parse("C%10CCCCC%10").unwrap();
        assert_eq!(edge_set(&a), edge_set(&b));
        assert_eq!(a.atom_count(), b.atom_count());
    }

    #[test]
    fn ring_labels_are_reusable_after_closing() {
        let g = parse("C1CC1C1CC1").unwrap();
        assert_eq!(g.atom_count(), 6);
        assert_eq!(g.bond_count(), 7);
    }

    #[test]
    fn ring_bond_may_be_declared_at_either_end() {
        let open = parse("C=1CCCCC1").unwrap();
        let close = parse("C1CCCCC=1").unwrap();
        for g in [&open, &close] {
            let e = g.bond_between(0.into(), 5.into()).unwrap();
            assert_eq!(*g.bond(e), order(2));
        }
    }

    #[test]
    fn closing_side_wins_when_both_ends_declare() {
        let g = parse("C=1CCCCC#1").unwrap();
        let e = g.bond_between(0.into(), 5.into()).unwrap();
        assert_eq!(*g.bond(e), order(3));
    }

    #[test]
    fn branches_return_to_the_branch_point() {
        let g = parse("CC(C)C").unwrap();
        assert_eq!(g.atom_count(), 4);
        assert_eq!(edge_set(&g), vec![(0, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn nested_branches() {
        let g = parse("CC(C(C)C)C").unwrap();
        assert_eq!(g.atom_count(), 6);
        assert_eq!(edge_set(&g), vec![(0, 1), (1, 2), (1, 5), (2, 3), (2, 4)]);
    }

    // ---- bonds ----

    #[test]
    fn unwritten_bond_is_single_or_aromatic() {
        let g = parse("CC").unwrap();
        let e = g.bond_between(0.into(), 1.into()).unwrap();
        assert_eq!(
            *g.bond(e),
            QueryExpr::Or(vec![
                order(1),
                QueryExpr::lit(Literal::flag(PropKey::BondAromatic)),
            ])
        );
    }

    #[test]
    fn explicit_bond_symbols() {
        let cases = [
            ("C-C", order(1)),
            ("C=C", order(2)),
            ("C#C", order(3)),
            ("C:C", QueryExpr::lit(Literal::flag(PropKey::BondAromatic))),
            ("C~C", QueryExpr::Any),
            ("C@C", QueryExpr::lit(Literal::flag(PropKey::BondRing))),
            (
                "C/C",
                QueryExpr::lit(Literal::text(PropKey::BondDirection, "up")),
            ),
            (
                "C\\C",
                QueryExpr::lit(Literal::text(PropKey::BondDirection, "down")),
            ),
        ];
        for (input, want) in cases {
            let g = parse(input).unwrap();
            let e = g.bond_between(0.into(), 1.into()).unwrap();
            assert_eq!(*g.bond(e), want, "{input}");
        }
    }

    #[test]
    fn bond_expressions_use_the_bracket_precedence_ladder() {
        let g = parse("C!=C").unwrap();
        let e = g.bond_between(0.into(), 1.into()).unwrap();
        assert_eq!(*g.bond(e), QueryExpr::not(order(2)));

        let g = parse("C-,=C").unwrap();
        let e = g.bond_between(0.into(), 1.into()).unwrap();
        assert_eq!(*g.bond(e), QueryExpr::Or(vec![order(1), order(2)]));

        let g = parse("C-;!@C").unwrap();
        let e = g.bond_between(0.into(), 1.into()).unwrap();
        assert_eq!(
            *g.bond(e),
            QueryExpr::And(vec![
                order(1),
                QueryExpr::not(QueryExpr::lit(Literal::flag(PropKey::BondRing))),
            ])
        );
    }

    // ---- bare atoms ----

    #[test]
    fn bare_atom_shorthands() {
        assert_eq!(*anchor_expr(&parse("*").unwrap()), QueryExpr::Any);
        assert_eq!(*anchor_expr(&parse("a").unwrap()), arom());
        assert_eq!(*anchor_expr(&parse("A").unwrap()), QueryExpr::not(arom()));
        assert_eq!(*anchor_expr(&parse("c").unwrap()), aromatic("C"));
        assert_eq!(*anchor_expr(&parse("N").unwrap()), aliphatic("N"));
    }

    #[test]
    fn two_letter_elements_prefer_the_longer_reading() {
        let g = parse("ClBr").unwrap();
        assert_eq!(g.atom_count(), 2);
        assert_eq!(*g.atom(0.into()), aliphatic("Cl"));
        assert_eq!(*g.atom(1.into()), aliphatic("Br"));

        // "Sc" is scandium, not sulfur followed by aromatic carbon.
        let g = parse("Sc").unwrap();
        assert_eq!(g.atom_count(), 1);
        assert_eq!(*g.atom(0.into()), aliphatic("Sc"));
    }

    // ---- bracket atoms ----

    #[test]
    fn bracket_precedence_semicolon_binds_loosest() {
        let g = parse("[C,N;H1]").unwrap();
        let expr = anchor_expr(&g);
        assert_eq!(
            *expr,
            QueryExpr::And(vec![
                QueryExpr::Or(vec![aliphatic("C"), aliphatic("N")]),
                QueryExpr::lit(Literal::int(PropKey::TotalHCount, 1)),
            ])
        );
        assert_eq!(PropertyMap::of(expr).key_count(), 3);
    }

    #[test]
    fn juxtaposition_and_ampersand_both_mean_and() {
        assert_eq!(
            anchor_expr(&parse("[c,n&H1]").unwrap()),
            anchor_expr(&parse("[c,nH1]").unwrap()),
        );
        assert_eq!(
            *anchor_expr(&parse("[c,n&H1]").unwrap()),
            QueryExpr::Or(vec![
                aromatic("C"),
                QueryExpr::And(vec![
                    sym("N"),
                    arom(),
                    QueryExpr::lit(Literal::int(PropKey::TotalHCount, 1)),
                ]),
            ])
        );
    }

    #[test]
    fn negation_binds_tightest() {
        assert_eq!(
            *anchor_expr(&parse("[!C]").unwrap()),
            QueryExpr::not(aliphatic("C"))
        );
        assert_eq!(
            *anchor_expr(&parse("[!CH1]").unwrap()),
            QueryExpr::And(vec![
                QueryExpr::not(aliphatic("C")),
                QueryExpr::lit(Literal::int(PropKey::TotalHCount, 1)),
            ])
        );
    }

    #[test]
    fn bracket_primitives() {
        let cases = [
            ("[#6]", QueryExpr::lit(Literal::int(PropKey::AtomicNum, 6))),
            ("[D2]", QueryExpr::lit(Literal::int(PropKey::Degree, 2))),
            ("[X3]", QueryExpr::lit(Literal::int(PropKey::Connectivity, 3))),
            ("[v4]", QueryExpr::lit(Literal::int(PropKey::Valence, 4))),
            ("[h2]", QueryExpr::lit(Literal::int(PropKey::ImplicitHCount, 2))),
            ("[x2]", QueryExpr::lit(Literal::int(PropKey::RingBondCount, 2))),
            ("[R]", QueryExpr::lit(Literal::flag(PropKey::InRing))),
            ("[R0]", QueryExpr::not(QueryExpr::lit(Literal::flag(PropKey::InRing)))),
            ("[R2]", QueryExpr::lit(Literal::int(PropKey::RingMembership, 2))),
            ("[r5]", QueryExpr::lit(Literal::int(PropKey::SmallestRingSize, 5))),
            ("[+]", QueryExpr::lit(Literal::int(PropKey::Charge, 1))),
            ("[-2]", QueryExpr::lit(Literal::int(PropKey::Charge, -2))),
            ("[@]", QueryExpr::lit(Literal::text(PropKey::Chirality, "@"))),
            ("[@@]", QueryExpr::lit(Literal::text(PropKey::Chirality, "@@"))),
            ("[*]", QueryExpr::Any),
        ];
        for (input, want) in cases {
            let g = parse(input).unwrap();
            assert_eq!(*anchor_expr(&g), want, "{input}");
        }
    }

    #[test]
    fn counted_primitives_default_to_one() {
        assert_eq!(
            *anchor_expr(&parse("[D]").unwrap()),
            QueryExpr::lit(Literal::int(PropKey::Degree, 1))
        );
        assert_eq!(
            *anchor_expr(&parse("[CH]").unwrap()),
            QueryExpr::And(vec![
                sym("C"),
                QueryExpr::not(arom()),
                QueryExpr::lit(Literal::int(PropKey::TotalHCount, 1)),
            ])
        );
    }

    #[test]
    fn bare_hydrogen_in_brackets_is_the_element() {
        assert_eq!(*anchor_expr(&parse("[H]").unwrap()), aliphatic("H"));
        // After an element symbol it counts attached hydrogens instead.
        assert_eq!(
            *anchor_expr(&parse("[NH2]").unwrap()),
            QueryExpr::And(vec![
                sym("N"),
                QueryExpr::not(arom()),
                QueryExpr::lit(Literal::int(PropKey::TotalHCount, 2)),
            ])
        );
    }

    #[test]
    fn isotope_charge_and_map_combine() {
        assert_eq!(
            *anchor_expr(&parse("[13CH3:2]").unwrap()),
            QueryExpr::And(vec![
                QueryExpr::lit(Literal::int(PropKey::Isotope, 13)),
                sym("C"),
                QueryExpr::not(arom()),
                QueryExpr::lit(Literal::int(PropKey::TotalHCount, 3)),
                QueryExpr::lit(Literal::int(PropKey::AtomMap, 2)),
            ])
        );
    }

    #[test]
    fn atomic_number_must_name_a_real_element() {
        assert!(matches!(
            parse("[#0]"),
            Err(PatternError::InvalidAtomicNum { .. })
        ));
        assert!(matches!(
            parse("[#119]"),
            Err(PatternError::InvalidAtomicNum { .. })
        ));
        assert!(parse("[#118]").is_ok());
    }

    #[test]
    fn two_letter_aromatic_elements_in_brackets() {
        assert_eq!(*anchor_expr(&parse("[se]").unwrap()), aromatic("Se"));
        assert_eq!(*anchor_expr(&parse("[te]").unwrap()), aromatic("Te"));
    }

    // ---- recursive sub-patterns ----

    #[test]
    fn recursive_literal_stores_raw_text() {
        assert_eq!(
            *anchor_expr(&parse("[$(CN)]").unwrap()),
            QueryExpr::lit(Literal::text(PropKey::Recursive, "CN"))
        );
        // Nested parentheses stay balanced inside the captured text.
        assert_eq!(
            *anchor_expr(&parse("[$(CC(=O)N)]").unwrap()),
            QueryExpr::lit(Literal::text(PropKey::Recursive, "CC(=O)N"))
        );
    }

    #[test]
    fn unterminated_recursive_is_an_error() {
        assert!(matches!(
            parse("[$(CN]"),
            Err(PatternError::UnclosedRecursive { .. })
        ));
        assert!(parse("[$CN]").is_err());
    }

    // ---- components and connectivity groups ----

    #[test]
    fn dot_separates_components() {
        let g = parse("CC.CC").unwrap();
        assert_eq!(g.atom_count(), 4);
        assert_eq!(g.bond_count(), 2);
        assert_eq!(g.component_count(), 2);
        assert_eq!(g.component_of(1.into()), 0);
        assert_eq!(g.component_of(2.into()), 1);
        assert!(g.groups().is_empty());
    }

    #[test]
    fn group_collects_component_anchors() {
        let g = parse("(C.CC.CCC)").unwrap();
        assert_eq!(g.component_count(), 3);
        assert_eq!(group_indices(&g), vec![vec![0, 1, 3]]);
    }

    #[test]
    fn multiple_groups_and_loose_components() {
        let g = parse("(C.C.C).(C.C).C.(C)").unwrap();
        assert_eq!(g.atom_count(), 7);
        assert_eq!(g.component_count(), 7);
        assert_eq!(group_indices(&g), vec![vec![0, 1, 2], vec![3, 4], vec![6]]);
    }

    #[test]
    fn ungrouped_patterns_have_no_groups() {
        assert!(parse("CCO").unwrap().groups().is_empty());
        assert!(parse("C.C").unwrap().groups().is_empty());
    }

    // ---- rejected inputs ----

    #[test]
    fn rejected_inputs() {
        let cases: &[(&str, fn(&PatternError) -> bool)] = &[
            ("", |e| matches!(e, PatternError::EmptyInput)),
            ("   ", |e| matches!(e, PatternError::EmptyInput)),
            ("CC(", |e| matches!(e, PatternError::UnmatchedParen { .. })),
            ("CC)", |e| matches!(e, PatternError::UnmatchedParen { .. })),
            ("C()C", |e| matches!(e, PatternError::EmptyBranch { .. })),
            ("()", |e| matches!(e, PatternError::EmptyBranch { .. })),
            ("C1CC", |e| matches!(e, PatternError::UnclosedRing { .. })),
            ("1CCC1", |e| {
                matches!(e, PatternError::RingClosureBeforeAtom { .. })
            }),
            ("C(1C)C1C", |e| {
                matches!(e, PatternError::RingClosureBeforeAtom { .. })
            }),
            ("(CC)CC", |e| {
                matches!(e, PatternError::MalformedComponent { .. })
            }),
            ("C..C", |e| {
                matches!(e, PatternError::MalformedComponent { .. })
            }),
            (".C", |e| matches!(e, PatternError::MalformedComponent { .. })),
            ("CCC.", |e| {
                matches!(e, PatternError::MalformedComponent { .. })
            }),
            ("C(.C)C", |e| {
                matches!(e, PatternError::MalformedComponent { .. })
            }),
            ("[C", |e| matches!(e, PatternError::UnclosedBracket { .. })),
            ("C=", |e| matches!(e, PatternError::InvalidPattern { .. })),
            ("C=)", |e| matches!(e, PatternError::UnmatchedParen { .. })),
            ("C(C=)C", |e| matches!(e, PatternError::InvalidPattern { .. })),
            ("C=.C", |e| {
                matches!(e, PatternError::MalformedComponent { .. })
            }),
            ("=C", |e| matches!(e, PatternError::UnexpectedChar { .. })),
            ("Xq", |e| matches!(e, PatternError::UnexpectedChar { .. })),
        ];
        for (input, check) in cases {
            let err = parse(input).expect_err(input);
            assert!(check(&err), "{input}: unexpected error {err:?}");
        }
    }

    #[test]
    fn whitespace_around_the_pattern_is_ignored() {
        let g = parse("  CCO \n").unwrap();
        assert_eq!(g.atom_count(), 3);
    }
}
