use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::element;
use crate::graph::PatternGraph;
use crate::query::{Literal, PropKey, QueryExpr};

use super::error::PatternError;

/// The implicit bond between two atoms written with no bond symbol.
pub(crate) fn default_bond() -> QueryExpr {
    QueryExpr::Or(vec![
        QueryExpr::lit(Literal::int(PropKey::BondOrder, 1)),
        QueryExpr::lit(Literal::flag(PropKey::BondAromatic)),
    ])
}

enum Frame {
    Branch {
        return_atom: NodeIndex,
        saved_bond: Option<QueryExpr>,
        atoms_at_open: usize,
        pos: usize,
    },
    Group {
        start_component: usize,
        pos: usize,
    },
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, ch: char) -> Result<(), PatternError> {
        match self.peek() {
            Some(c) if c == ch => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(PatternError::UnexpectedChar { pos: self.pos, ch: c }),
            None => Err(PatternError::InvalidPattern {
                pos: self.pos,
                msg: format!("expected '{ch}', got end of input"),
            }),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.pos < self.chars.len() && self.chars[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos > start {
            let s: String = self.chars[start..self.pos].iter().collect();
            s.parse().ok()
        } else {
            None
        }
    }

    fn parse_pattern(&mut self) -> Result<PatternGraph, PatternError> {
        let mut graph = PatternGraph::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut groups: Vec<Vec<NodeIndex>> = Vec::new();
        let mut current: Option<NodeIndex> = None;
        let mut pending_bond: Option<QueryExpr> = None;
        let mut ring_map: HashMap<u16, (NodeIndex, Option<QueryExpr>)> = HashMap::new();
        // True once the current fragment contains an atom or a closed group,
        // i.e. a `.` separator would be legal here.
        let mut separator_ok = false;

        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];

            match ch {
                '[' => {
                    let expr = self.parse_bracket_atom()?;
                    Self::attach_atom(&mut graph, &mut current, &mut pending_bond, expr);
                    separator_ok = true;
                }
                '(' => {
                    self.pos += 1;
                    match current {
                        Some(cur) => stack.push(Frame::Branch {
                            return_atom: cur,
                            saved_bond: pending_bond.take(),
                            atoms_at_open: graph.atom_count(),
                            pos: self.pos - 1,
                        }),
                        None => {
                            if pending_bond.is_some() {
                                return Err(PatternError::InvalidPattern {
                                    pos: self.pos - 1,
                                    msg: "bond before connectivity group".into(),
                                });
                            }
                            stack.push(Frame::Group {
                                start_component: graph.component_count(),
                                pos: self.pos - 1,
                            });
                        }
                    }
                    continue;
                }
                ')' => {
                    self.pos += 1;
                    match stack.pop() {
                        Some(Frame::Branch {
                            return_atom,
                            saved_bond,
                            atoms_at_open,
                            pos,
                        }) => {
                            if graph.atom_count() == atoms_at_open {
                                return Err(PatternError::EmptyBranch { pos });
                            }
                            if pending_bond.is_some() {
                                return Err(PatternError::InvalidPattern {
                                    pos: self.pos - 1,
                                    msg: "dangling bond before ')'".into(),
                                });
                            }
                            current = Some(return_atom);
                            pending_bond = saved_bond;
                        }
                        Some(Frame::Group {
                            start_component,
                            pos,
                        }) => {
                            let end_component = graph.component_count();
                            if end_component == start_component {
                                return Err(PatternError::EmptyBranch { pos });
                            }
                            if let Some(next) = self.peek() {
                                if next != '.' && next != ')' {
                                    return Err(PatternError::MalformedComponent {
                                        pos: self.pos,
                                    });
                                }
                            }
                            if stack.is_empty() {
                                groups.push(
                                    graph.component_anchors()[start_component..end_component]
                                        .to_vec(),
                                );
                            }
                            current = None;
                            pending_bond = None;
                            separator_ok = true;
                        }
                        None => return Err(PatternError::UnmatchedParen { pos: self.pos - 1 }),
                    }
                    continue;
                }
                '.' => {
                    if matches!(stack.last(), Some(Frame::Branch { .. })) {
                        return Err(PatternError::MalformedComponent { pos: self.pos });
                    }
                    if !separator_ok || pending_bond.is_some() {
                        return Err(PatternError::MalformedComponent { pos: self.pos });
                    }
                    self.pos += 1;
                    separator_ok = false;
                    current = None;
                    continue;
                }
                '0'..='9' | '%' => {
                    if let Some(Frame::Branch { atoms_at_open, .. }) = stack.last() {
                        if graph.atom_count() == *atoms_at_open {
                            return Err(PatternError::RingClosureBeforeAtom { pos: self.pos });
                        }
                    }
                    let label_pos = self.pos;
                    let label = self.parse_ring_label()?;
                    let Some(cur) = current else {
                        return Err(PatternError::RingClosureBeforeAtom { pos: label_pos });
                    };
                    match ring_map.remove(&label) {
                        Some((other, open_bond)) => {
                            // Either side may declare the ring bond; the
                            // closing side wins when both do.
                            let bond = pending_bond
                                .take()
                                .or(open_bond)
                                .unwrap_or_else(default_bond);
                            graph.add_bond(cur, other, bond);
                        }
                        None => {
                            ring_map.insert(label, (cur, pending_bond.take()));
                        }
                    }
                    continue;
                }
                '-' | '=' | '#' | '~' | ':' | '/' | '\\' | '@' | '!' => {
                    if current.is_none() {
                        return Err(PatternError::UnexpectedChar { pos: self.pos, ch });
                    }
                    if pending_bond.is_some() {
                        return Err(PatternError::InvalidPattern {
                            pos: self.pos,
                            msg: "consecutive bond expressions".into(),
                        });
                    }
                    pending_bond = Some(self.parse_bond_expr()?);
                    continue;
                }
                _ => {
                    let expr = self.parse_bare_atom()?;
                    Self::attach_atom(&mut graph, &mut current, &mut pending_bond, expr);
                    separator_ok = true;
                }
            }
        }

        if let Some(frame) = stack.last() {
            let pos = match frame {
                Frame::Branch { pos, .. } | Frame::Group { pos, .. } => *pos,
            };
            return Err(PatternError::UnmatchedParen { pos });
        }
        if pending_bond.is_some() {
            return Err(PatternError::InvalidPattern {
                pos: self.pos,
                msg: "dangling bond at end of input".into(),
            });
        }
        if !separator_ok {
            return Err(PatternError::MalformedComponent { pos: self.pos });
        }
        if let Some((&label, _)) = ring_map.iter().next() {
            return Err(PatternError::UnclosedRing { label });
        }

        graph.set_groups(groups);
        Ok(graph)
    }

    fn attach_atom(
        graph: &mut PatternGraph,
        current: &mut Option<NodeIndex>,
        pending_bond: &mut Option<QueryExpr>,
        expr: QueryExpr,
    ) {
        let component = match *current {
            Some(cur) => graph.component_of(cur),
            None => graph.component_count(),
        };
        let idx = graph.add_atom(expr, component);
        if let Some(prev) = *current {
            let bond = pending_bond.take().unwrap_or_else(default_bond);
            graph.add_bond(prev, idx, bond);
        }
        *current = Some(idx);
    }

    fn parse_ring_label(&mut self) -> Result<u16, PatternError> {
        let start = self.pos;
        if self.chars[self.pos] == '%' {
            self.pos += 1;
            if self.pos + 1 < self.chars.len()
                && self.chars[self.pos].is_ascii_digit()
                && self.chars[self.pos + 1].is_ascii_digit()
            {
                let d1 = self.chars[self.pos].to_digit(10).unwrap() as u16;
                let d2 = self.chars[self.pos + 1].to_digit(10).unwrap() as u16;
                self.pos += 2;
                Ok(d1 * 10 + d2)
            } else {
                Err(PatternError::InvalidPattern {
                    pos: start,
                    msg: "expected two digits after %".into(),
                })
            }
        } else {
            let d = self.chars[self.pos].to_digit(10).unwrap() as u16;
            self.pos += 1;
            Ok(d)
        }
    }

    // ---- bond expressions ----
    //
    // Bond expressions follow the same precedence ladder as bracket atoms:
    // `!` binds tightest, then `&`/juxtaposition, then `,`, then `;`.

    fn is_bond_primitive(ch: char) -> bool {
        matches!(ch, '-' | '=' | '#' | '~' | ':' | '/' | '\\' | '@')
    }

    fn parse_bond_expr(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = vec![self.parse_bond_comma()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_bond_comma()?);
        }
        Ok(flatten_and(parts))
    }

    fn parse_bond_comma(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = vec![self.parse_bond_and()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_bond_and()?);
        }
        Ok(flatten_or(parts))
    }

    fn parse_bond_and(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = vec![self.parse_bond_not()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.pos += 1;
                    parts.push(self.parse_bond_not()?);
                }
                Some(ch) if Self::is_bond_primitive(ch) || ch == '!' => {
                    parts.push(self.parse_bond_not()?);
                }
                _ => break,
            }
        }
        Ok(flatten_and(parts))
    }

    fn parse_bond_not(&mut self) -> Result<QueryExpr, PatternError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            Ok(QueryExpr::not(self.parse_bond_primitive()?))
        } else {
            self.parse_bond_primitive()
        }
    }

    fn parse_bond_primitive(&mut self) -> Result<QueryExpr, PatternError> {
        let Some(ch) = self.peek() else {
            return Err(PatternError::InvalidPattern {
                pos: self.pos,
                msg: "expected bond primitive".into(),
            });
        };
        self.pos += 1;
        match ch {
            '-' => Ok(QueryExpr::lit(Literal::int(PropKey::BondOrder, 1))),
            '=' => Ok(QueryExpr::lit(Literal::int(PropKey::BondOrder, 2))),
            '#' => Ok(QueryExpr::lit(Literal::int(PropKey::BondOrder, 3))),
            ':' => Ok(QueryExpr::lit(Literal::flag(PropKey::BondAromatic))),
            '~' => Ok(QueryExpr::Any),
            '@' => Ok(QueryExpr::lit(Literal::flag(PropKey::BondRing))),
            '/' => Ok(QueryExpr::lit(Literal::text(PropKey::BondDirection, "up"))),
            '\\' => Ok(QueryExpr::lit(Literal::text(PropKey::BondDirection, "down"))),
            _ => Err(PatternError::UnexpectedChar { pos: self.pos - 1, ch }),
        }
    }

    // ---- atoms ----

    fn element_expr(symbol: &str, aromatic: Option<bool>) -> QueryExpr {
        let sym = QueryExpr::lit(Literal::text(PropKey::Symbol, symbol));
        match aromatic {
            Some(true) => QueryExpr::And(vec![
                sym,
                QueryExpr::lit(Literal::flag(PropKey::Aromatic)),
            ]),
            Some(false) => QueryExpr::And(vec![
                sym,
                QueryExpr::not(QueryExpr::lit(Literal::flag(PropKey::Aromatic))),
            ]),
            None => sym,
        }
    }

    fn parse_bare_atom(&mut self) -> Result<QueryExpr, PatternError> {
        let start = self.pos;
        let ch = self.chars[self.pos];

        if ch == '*' {
            self.pos += 1;
            return Ok(QueryExpr::Any);
        }
        if ch == 'a' {
            self.pos += 1;
            return Ok(QueryExpr::lit(Literal::flag(PropKey::Aromatic)));
        }
        if ch == 'A' {
            let two_letter = self
                .chars
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_lowercase());
            if !two_letter {
                self.pos += 1;
                return Ok(QueryExpr::not(QueryExpr::lit(Literal::flag(
                    PropKey::Aromatic,
                ))));
            }
        }
        if let Some(canonical) = element::aromatic_symbol(&ch.to_string()) {
            // Bare lowercase aromatic subset: c, n, o, s, p.
            if ch != 's' || !self.chars.get(self.pos + 1).is_some_and(|&c| c == 'e') {
                self.pos += 1;
                return Ok(Self::element_expr(canonical, Some(true)));
            }
        }

        self.parse_element_symbol()
            .map(|sym| Self::element_expr(sym, Some(false)))
            .map_err(|_| PatternError::UnexpectedChar { pos: start, ch })
    }

    /// Reads a one- or two-letter uppercase element symbol, preferring the
    /// two-letter reading when it names a real element.
    fn parse_element_symbol(&mut self) -> Result<&'static str, PatternError> {
        let start = self.pos;
        let ch = self.chars[self.pos];

        if ch.is_ascii_uppercase() {
            self.pos += 1;
            if let Some(&next) = self.chars.get(self.pos) {
                if next.is_ascii_lowercase() {
                    let two: String = [ch, next].iter().collect();
                    if let Some(num) = element::atomic_num(&two) {
                        self.pos += 1;
                        return Ok(element::symbol(num).unwrap());
                    }
                }
            }
            let one = ch.to_string();
            if let Some(num) = element::atomic_num(&one) {
                return Ok(element::symbol(num).unwrap());
            }
            self.pos = start;
        }

        Err(PatternError::UnexpectedChar { pos: start, ch })
    }

    fn parse_bracket_atom(&mut self) -> Result<QueryExpr, PatternError> {
        let bracket_start = self.pos;
        self.expect('[')?;

        let expr = self.parse_semicolon_expr()?;

        if self.peek() != Some(']') {
            return Err(PatternError::UnclosedBracket { pos: bracket_start });
        }
        self.pos += 1;

        Ok(expr)
    }

    fn parse_semicolon_expr(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = vec![self.parse_comma_expr()?];
        while self.peek() == Some(';') {
            self.pos += 1;
            parts.push(self.parse_comma_expr()?);
        }
        Ok(flatten_and(parts))
    }

    fn parse_comma_expr(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = vec![self.parse_high_and_expr()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            parts.push(self.parse_high_and_expr()?);
        }
        Ok(flatten_or(parts))
    }

    fn parse_high_and_expr(&mut self) -> Result<QueryExpr, PatternError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(']') | Some(',') | Some(';') => break,
                Some('&') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => parts.push(self.parse_not_expr()?),
            }
        }
        if parts.is_empty() {
            Ok(QueryExpr::Any)
        } else {
            Ok(flatten_and(parts))
        }
    }

    fn parse_not_expr(&mut self) -> Result<QueryExpr, PatternError> {
        if self.peek() == Some('!') {
            self.pos += 1;
            Ok(QueryExpr::not(self.parse_primitive()?))
        } else {
            self.parse_primitive()
        }
    }

    fn parse_primitive(&mut self) -> Result<QueryExpr, PatternError> {
        let Some(ch) = self.peek() else {
            return Err(PatternError::InvalidPattern {
                pos: self.pos,
                msg: "expected atom primitive".into(),
            });
        };

        match ch {
            '*' => {
                self.pos += 1;
                Ok(QueryExpr::Any)
            }
            'a' => {
                if self.chars.get(self.pos + 1) == Some(&'s') {
                    self.parse_bracket_element()
                } else {
                    self.pos += 1;
                    Ok(QueryExpr::lit(Literal::flag(PropKey::Aromatic)))
                }
            }
            'A' => {
                if self
                    .chars
                    .get(self.pos + 1)
                    .is_some_and(|c| c.is_ascii_lowercase())
                {
                    self.parse_bracket_element()
                } else {
                    self.pos += 1;
                    Ok(QueryExpr::not(QueryExpr::lit(Literal::flag(
                        PropKey::Aromatic,
                    ))))
                }
            }
            '#' => {
                self.pos += 1;
                let num = self
                    .parse_number()
                    .ok_or(PatternError::InvalidAtomicNum { pos: self.pos })?;
                if num == 0 || num > 118 {
                    return Err(PatternError::InvalidAtomicNum { pos: self.pos });
                }
                Ok(QueryExpr::lit(Literal::int(PropKey::AtomicNum, num as i32)))
            }
            'D' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(PropKey::Degree, n as i32)))
            }
            'v' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(PropKey::Valence, n as i32)))
            }
            'X' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(PropKey::Connectivity, n as i32)))
            }
            'H' => {
                if self.is_hydrogen_element_context() {
                    self.parse_bracket_element()
                } else {
                    self.pos += 1;
                    let n = self.parse_number().unwrap_or(1);
                    Ok(QueryExpr::lit(Literal::int(PropKey::TotalHCount, n as i32)))
                }
            }
            'h' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(
                    PropKey::ImplicitHCount,
                    n as i32,
                )))
            }
            'R' => {
                self.pos += 1;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    let n = self.parse_number().unwrap();
                    if n == 0 {
                        Ok(QueryExpr::not(QueryExpr::lit(Literal::flag(
                            PropKey::InRing,
                        ))))
                    } else {
                        Ok(QueryExpr::lit(Literal::int(
                            PropKey::RingMembership,
                            n as i32,
                        )))
                    }
                } else {
                    Ok(QueryExpr::lit(Literal::flag(PropKey::InRing)))
                }
            }
            'r' => {
                self.pos += 1;
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    let n = self.parse_number().unwrap();
                    Ok(QueryExpr::lit(Literal::int(
                        PropKey::SmallestRingSize,
                        n as i32,
                    )))
                } else {
                    Ok(QueryExpr::lit(Literal::flag(PropKey::InRing)))
                }
            }
            'x' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(
                    PropKey::RingBondCount,
                    n as i32,
                )))
            }
            '@' => {
                self.pos += 1;
                if self.peek() == Some('@') {
                    self.pos += 1;
                    Ok(QueryExpr::lit(Literal::text(PropKey::Chirality, "@@")))
                } else {
                    Ok(QueryExpr::lit(Literal::text(PropKey::Chirality, "@")))
                }
            }
            '+' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(PropKey::Charge, n as i32)))
            }
            '-' => {
                self.pos += 1;
                let n = self.parse_number().unwrap_or(1);
                Ok(QueryExpr::lit(Literal::int(PropKey::Charge, -(n as i32))))
            }
            ':' => {
                self.pos += 1;
                let n = self
                    .parse_number()
                    .ok_or_else(|| PatternError::InvalidPattern {
                        pos: self.pos,
                        msg: "expected atom map number after ':'".into(),
                    })?;
                Ok(QueryExpr::lit(Literal::int(PropKey::AtomMap, n as i32)))
            }
            '$' => {
                self.pos += 1;
                if self.peek() != Some('(') {
                    return Err(PatternError::UnclosedRecursive { pos: self.pos });
                }
                self.pos += 1;
                let inner = self.extract_balanced_parens()?;
                Ok(QueryExpr::lit(Literal::text(PropKey::Recursive, inner)))
            }
            _ if ch.is_ascii_uppercase() || ch.is_ascii_lowercase() => {
                self.parse_bracket_element()
            }
            _ if ch.is_ascii_digit() => {
                let n = self.parse_number().unwrap();
                Ok(QueryExpr::lit(Literal::int(PropKey::Isotope, n as i32)))
            }
            _ => Err(PatternError::UnexpectedChar { pos: self.pos, ch }),
        }
    }

    /// `[H]` with nothing before the `H` means element hydrogen rather than an
    /// attached-hydrogen count.
    fn is_hydrogen_element_context(&self) -> bool {
        if self.peek() != Some('H') {
            return false;
        }
        if self.chars.get(self.pos + 1) != Some(&']') {
            return false;
        }
        let mut start = self.pos;
        while start > 0 && self.chars[start - 1] != '[' {
            start -= 1;
        }
        start == self.pos
    }

    fn parse_bracket_element(&mut self) -> Result<QueryExpr, PatternError> {
        let start = self.pos;
        let ch = self.chars[self.pos];

        if ch.is_ascii_lowercase() {
            let two: String = self.chars[self.pos..]
                .iter()
                .take(2)
                .collect();
            if two.len() == 2 {
                if let Some(canonical) = element::aromatic_symbol(&two) {
                    self.pos += 2;
                    return Ok(Self::element_expr(canonical, Some(true)));
                }
            }
            if let Some(canonical) = element::aromatic_symbol(&ch.to_string()) {
                self.pos += 1;
                return Ok(Self::element_expr(canonical, Some(true)));
            }
            return Err(PatternError::UnexpectedChar { pos: start, ch });
        }

        self.parse_element_symbol()
            .map(|sym| Self::element_expr(sym, Some(false)))
    }

    /// Captures the raw text between an already-consumed `(` and its matching
    /// `)`. The text is stored verbatim and parsed lazily when the recursive
    /// literal is resolved.
    fn extract_balanced_parens(&mut self) -> Result<String, PatternError> {
        let start = self.pos;
        let mut depth = 1usize;

        while self.pos < self.chars.len() {
            match self.chars[self.pos] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        if inner.is_empty() {
                            return Err(PatternError::InvalidPattern {
                                pos: start,
                                msg: "empty recursive sub-pattern".into(),
                            });
                        }
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(PatternError::UnclosedRecursive { pos: start })
    }
}

fn flatten_and(mut parts: Vec<QueryExpr>) -> QueryExpr {
    let mut flattened = Vec::new();
    for p in parts.drain(..) {
        match p {
            QueryExpr::And(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    if flattened.len() == 1 {
        flattened.pop().unwrap()
    } else {
        QueryExpr::And(flattened)
    }
}

fn flatten_or(mut parts: Vec<QueryExpr>) -> QueryExpr {
    let mut flattened = Vec::new();
    for p in parts.drain(..) {
        match p {
            QueryExpr::Or(inner) => flattened.extend(inner),
            other => flattened.push(other),
        }
    }
    if flattened.len() == 1 {
        flattened.pop().unwrap()
    } else {
        QueryExpr::Or(flattened)
    }
}

/// Parses a pattern string into its query graph.
pub fn parse(input: &str) -> Result<PatternGraph, PatternError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PatternError::EmptyInput);
    }
    let mut parser = Parser::new(trimmed);
    parser.parse_pattern()
}
