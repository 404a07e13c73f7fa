use std::fmt;

/// Errors produced when parsing a pattern string.
///
/// Every variant is fatal to the current parse; no partial graph is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The input string was empty.
    EmptyInput,
    /// An unexpected character was encountered at the given position.
    UnexpectedChar { pos: usize, ch: char },
    /// A bracket atom `[` was opened but never closed with `]`.
    UnclosedBracket { pos: usize },
    /// A ring-closure label was opened but never closed by end of input.
    UnclosedRing { label: u16 },
    /// A parenthesis was opened without a matching close, or vice versa.
    UnmatchedParen { pos: usize },
    /// A branch `(` was immediately followed by `)`.
    EmptyBranch { pos: usize },
    /// A ring-closure digit appeared before any atom it could bond to.
    RingClosureBeforeAtom { pos: usize },
    /// A malformed component separator: consecutive dots, a leading or
    /// trailing dot, or a connectivity group not followed by one.
    MalformedComponent { pos: usize },
    /// An `#n` atomic number specifier was missing or out of range.
    InvalidAtomicNum { pos: usize },
    /// A recursive sub-pattern `$( ... )` was opened but never closed.
    UnclosedRecursive { pos: usize },
    /// A catch-all for other malformed patterns.
    InvalidPattern { pos: usize, msg: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "empty pattern string"),
            Self::UnexpectedChar { pos, ch } => {
                write!(f, "unexpected character '{ch}' at position {pos}")
            }
            Self::UnclosedBracket { pos } => {
                write!(f, "unclosed bracket starting at position {pos}")
            }
            Self::UnclosedRing { label } => write!(f, "unclosed ring closure {label}"),
            Self::UnmatchedParen { pos } => {
                write!(f, "unmatched parenthesis at position {pos}")
            }
            Self::EmptyBranch { pos } => write!(f, "empty branch at position {pos}"),
            Self::RingClosureBeforeAtom { pos } => {
                write!(f, "ring closure before any atom at position {pos}")
            }
            Self::MalformedComponent { pos } => {
                write!(f, "malformed component separator at position {pos}")
            }
            Self::InvalidAtomicNum { pos } => {
                write!(f, "invalid atomic number at position {pos}")
            }
            Self::UnclosedRecursive { pos } => {
                write!(f, "unclosed recursive sub-pattern at position {pos}")
            }
            Self::InvalidPattern { pos, msg } => {
                write!(f, "malformed pattern at position {pos}: {msg}")
            }
        }
    }
}

impl std::error::Error for PatternError {}
