use crate::domain::charset::CharSet;

/// Upper bound marker for `*`, `+` and `{n,}`.
pub const UNBOUNDED: u32 = u32::MAX;

/// Parsed pattern. Built once per pattern string and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Regexp {
    NullSeq,
    StartAnchor,
    EndAnchor,
    WordBoundary,
    NonWordBoundary,
    /// `.`: any character except a line terminator.
    Any,
    Char(char),
    /// 1-based capture group index.
    Backreference(usize),
    CharSet(CharSet),
    Alter(Vec<Regexp>),
    Sequence(Vec<Regexp>),
    /// Capture group with its 1-based index. Quantifier expansion may copy a
    /// group; copies keep the index.
    Capture(usize, Box<Regexp>),
    Complement(Box<Regexp>),
    LookAhead(Box<Regexp>),
    NegativeLookAhead(Box<Regexp>),
    Repetition {
        node: Box<Regexp>,
        min: u32,
        max: u32,
    },
    NonGreedyRepetition {
        node: Box<Regexp>,
        min: u32,
        max: u32,
    },
}

impl Regexp {
    /// Sequence of `nodes`, collapsing empty and singleton sequences.
    #[must_use]
    pub fn sequence(nodes: Vec<Regexp>) -> Regexp {
        let mut nodes: Vec<Regexp> = nodes
            .into_iter()
            .filter(|n| *n != Regexp::NullSeq)
            .collect();
        match nodes.len() {
            0 => Regexp::NullSeq,
            1 => nodes.remove(0),
            _ => Regexp::Sequence(nodes),
        }
    }

    /// Alternation of `nodes`, collapsing empty and singleton alternations.
    /// Empty branches stay: `a|` also matches the empty string.
    #[must_use]
    pub fn alter(mut nodes: Vec<Regexp>) -> Regexp {
        match nodes.len() {
            0 => Regexp::NullSeq,
            1 => nodes.remove(0),
            _ => Regexp::Alter(nodes),
        }
    }

    /// Character set a single-character node accepts, if it is one.
    ///
    /// `\s` parses to an alternation of characters, so alternations made of
    /// single-character branches count too.
    #[must_use]
    pub fn as_charset(&self) -> Option<CharSet> {
        match self {
            Regexp::Char(c) => Some(CharSet::empty().with_char(*c)),
            Regexp::CharSet(set) => Some(set.clone()),
            Regexp::Complement(inner) => inner.as_charset().map(|set| set.complement()),
            Regexp::Alter(branches) => branches.iter().try_fold(CharSet::empty(), |acc, b| {
                b.as_charset().map(|set| acc.with_set(&set))
            }),
            _ => None,
        }
    }

    /// Highest capture index in the tree, 0 when there are no groups.
    #[must_use]
    pub fn max_capture(&self) -> usize {
        match self {
            Regexp::Capture(index, inner) => (*index).max(inner.max_capture()),
            Regexp::Alter(nodes) | Regexp::Sequence(nodes) => {
                nodes.iter().map(Regexp::max_capture).max().unwrap_or(0)
            }
            Regexp::Complement(inner)
            | Regexp::LookAhead(inner)
            | Regexp::NegativeLookAhead(inner) => inner.max_capture(),
            Regexp::Repetition { node, .. } | Regexp::NonGreedyRepetition { node, .. } => {
                node.max_capture()
            }
            _ => 0,
        }
    }
}
