use std::sync::LazyLock;

use super::ast::{Regexp, UNBOUNDED};
use crate::domain::charset::{CharSet, DIGITS};

/// Pattern that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern at {position}: {message}")]
pub struct PatternError {
    pub position: usize,
    pub message: String,
}

const SPECIAL_CHARACTERS: &str = "^$\\.*+?()[]{}|";

static WORD: LazyLock<CharSet> = LazyLock::new(|| {
    CharSet::from_range('a', 'z')
        .with_range('A', 'Z')
        .with_set(&DIGITS)
        .with_char('_')
});

fn space() -> Regexp {
    Regexp::alter(
        [' ', '\t', '\n', '\u{0B}', '\u{0C}', '\r']
            .into_iter()
            .map(Regexp::Char)
            .collect(),
    )
}

/// Parse an ECMA-style pattern into a [`Regexp`].
///
/// Quantifiers are normalised so every repetition has minimum 0: `a{2,4}`
/// becomes `a a a{0,2}`.
///
/// # Errors
/// Returns [`PatternError`] for unbalanced groups, dangling quantifiers,
/// malformed braces or classes, and trailing input.
pub fn parse(pattern: &str) -> Result<Regexp, PatternError> {
    let mut parser = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
        groups: 0,
    };
    let node = parser.disjunction()?;
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected input"));
    }
    Ok(node)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    groups: usize,
}

struct Quantifier {
    min: u32,
    max: u32,
    greedy: bool,
}

impl Parser {
    fn error(&self, message: &str) -> PatternError {
        PatternError {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), PatternError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    // -- grammar ----------------------------------------------------------

    fn disjunction(&mut self) -> Result<Regexp, PatternError> {
        let mut branches = vec![self.alternative()?];
        while self.eat('|') {
            branches.push(self.alternative()?);
        }
        Ok(Regexp::alter(branches))
    }

    fn alternative(&mut self) -> Result<Regexp, PatternError> {
        let mut terms = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            terms.push(self.term()?);
        }
        Ok(Regexp::sequence(terms))
    }

    fn term(&mut self) -> Result<Regexp, PatternError> {
        if let Some(assertion) = self.assertion()? {
            return Ok(assertion);
        }
        let atom = self.atom()?;
        match self.quantifier()? {
            Some(q) => Ok(expand(atom, &q)),
            None => Ok(atom),
        }
    }

    fn assertion(&mut self) -> Result<Option<Regexp>, PatternError> {
        if self.eat('^') {
            return Ok(Some(Regexp::StartAnchor));
        }
        if self.eat('$') {
            return Ok(Some(Regexp::EndAnchor));
        }
        if self.starts_with("\\b") {
            self.pos += 2;
            return Ok(Some(Regexp::WordBoundary));
        }
        if self.starts_with("\\B") {
            self.pos += 2;
            return Ok(Some(Regexp::NonWordBoundary));
        }
        if self.starts_with("(?=") || self.starts_with("(?!") {
            let negative = self.peek_at(2) == Some('!');
            self.pos += 3;
            let inner = Box::new(self.disjunction()?);
            self.expect(')')?;
            return Ok(Some(if negative {
                Regexp::NegativeLookAhead(inner)
            } else {
                Regexp::LookAhead(inner)
            }));
        }
        Ok(None)
    }

    fn quantifier(&mut self) -> Result<Option<Quantifier>, PatternError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, UNBOUNDED)
            }
            Some('+') => {
                self.pos += 1;
                (1, UNBOUNDED)
            }
            Some('?') => {
                self.pos += 1;
                (0, 1)
            }
            Some('{') => {
                self.pos += 1;
                let min = self.decimal()?;
                let max = if self.eat(',') {
                    if self.peek() == Some('}') {
                        UNBOUNDED
                    } else {
                        self.decimal()?
                    }
                } else {
                    min
                };
                self.expect('}')?;
                if max < min {
                    return Err(self.error("quantifier range out of order"));
                }
                (min, max)
            }
            _ => return Ok(None),
        };
        let greedy = !self.eat('?');
        Ok(Some(Quantifier { min, max, greedy }))
    }

    fn decimal(&mut self) -> Result<u32, PatternError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected digits"));
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse()
            .map_err(|_| self.error("quantifier bound too large"))
    }

    fn atom(&mut self) -> Result<Regexp, PatternError> {
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of pattern"));
        };
        match c {
            '.' => {
                self.pos += 1;
                Ok(Regexp::Any)
            }
            '[' => self.class(),
            '(' => {
                self.pos += 1;
                if self.starts_with("?:") {
                    self.pos += 2;
                    let inner = self.disjunction()?;
                    self.expect(')')?;
                    return Ok(inner);
                }
                self.groups += 1;
                let index = self.groups;
                let inner = self.disjunction()?;
                self.expect(')')?;
                Ok(Regexp::Capture(index, Box::new(inner)))
            }
            '\\' => self.escape(),
            c if SPECIAL_CHARACTERS.contains(c) => Err(self.error(&format!("unexpected '{c}'"))),
            c => {
                self.pos += 1;
                Ok(Regexp::Char(c))
            }
        }
    }

    /// Escape outside a character class.
    fn escape(&mut self) -> Result<Regexp, PatternError> {
        if let Some(class) = self.class_escape() {
            return Ok(class);
        }
        if let Some(c) = self.char_escape() {
            return Ok(Regexp::Char(c));
        }
        // decimal escape
        if self.starts_with("\\0") {
            self.pos += 2;
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[start..self.pos].iter().collect();
            let code = if digits.is_empty() {
                0
            } else {
                digits
                    .parse::<u32>()
                    .map_err(|_| self.error("escape value too large"))?
            };
            let c = char::from_u32(code).ok_or_else(|| self.error("invalid escape value"))?;
            return Ok(Regexp::Char(c));
        }
        if let Some(d) = self.peek_at(1).and_then(|c| c.to_digit(10)) {
            self.pos += 2;
            return Ok(Regexp::Backreference(d as usize));
        }
        self.pos += 1;
        let c = self
            .peek()
            .ok_or_else(|| self.error("dangling escape"))?;
        self.pos += 1;
        Ok(Regexp::Char(c))
    }

    /// `\d \D \w \W \s \S`.
    fn class_escape(&mut self) -> Option<Regexp> {
        if self.peek() != Some('\\') {
            return None;
        }
        let node = match self.peek_at(1)? {
            'd' => Regexp::CharSet(DIGITS.clone()),
            'D' => Regexp::Complement(Box::new(Regexp::CharSet(DIGITS.clone()))),
            'w' => Regexp::CharSet(WORD.clone()),
            'W' => Regexp::Complement(Box::new(Regexp::CharSet(WORD.clone()))),
            's' => space(),
            'S' => Regexp::Complement(Box::new(space())),
            _ => return None,
        };
        self.pos += 2;
        Some(node)
    }

    /// `\f \n \r \t \v \cX \xHH \uHHHH`. A malformed form is left for the
    /// literal-escape fallback.
    fn char_escape(&mut self) -> Option<char> {
        if self.peek() != Some('\\') {
            return None;
        }
        let (c, consumed) = match self.peek_at(1)? {
            'f' => ('\u{0C}', 2),
            'n' => ('\n', 2),
            'r' => ('\r', 2),
            't' => ('\t', 2),
            'v' => ('\u{0B}', 2),
            'c' => {
                let letter = self.peek_at(2).filter(char::is_ascii_alphabetic)?;
                let code = letter.to_ascii_lowercase() as u32 - 'a' as u32 + 1;
                (char::from_u32(code)?, 3)
            }
            'x' => (self.hex(2, 2)?, 4),
            'u' => (self.hex(2, 4)?, 6),
            _ => return None,
        };
        self.pos += consumed;
        Some(c)
    }

    fn hex(&self, offset: usize, len: usize) -> Option<char> {
        let mut value = 0u32;
        for i in 0..len {
            value = (value << 4) | self.peek_at(offset + i)?.to_digit(16)?;
        }
        char::from_u32(value)
    }

    // -- character classes ------------------------------------------------

    fn class(&mut self) -> Result<Regexp, PatternError> {
        self.expect('[')?;
        let negated = self.eat('^');
        let mut set = CharSet::empty();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated character class")),
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.class_ranges(&mut set)?,
            }
        }
        let node = Regexp::CharSet(set);
        Ok(if negated {
            Regexp::Complement(Box::new(node))
        } else {
            node
        })
    }

    fn class_ranges(&mut self, set: &mut CharSet) -> Result<(), PatternError> {
        let start = self.class_atom()?;
        let is_range = self.peek() == Some('-') && self.peek_at(1).is_some_and(|c| c != ']');
        if !is_range {
            match start {
                ClassAtom::Char(c) => set.add_char(c),
                ClassAtom::Set(s) => set.union(&s),
            }
            return Ok(());
        }
        self.pos += 1;
        let end = self.class_atom()?;
        match (start, end) {
            (ClassAtom::Char(from), ClassAtom::Char(to)) => {
                if to < from {
                    return Err(self.error("character class range out of order"));
                }
                set.add_range(from as u32, to as u32);
            }
            // [a-\d] is 'a', '-' and digits
            (ClassAtom::Char(c), ClassAtom::Set(s)) => {
                set.add_char(c);
                set.add_char('-');
                set.union(&s);
            }
            (ClassAtom::Set(s), ClassAtom::Char(c)) => {
                set.union(&s);
                set.add_char('-');
                set.add_char(c);
            }
            (ClassAtom::Set(a), ClassAtom::Set(b)) => {
                set.union(&a);
                set.add_char('-');
                set.union(&b);
            }
        }
        Ok(())
    }

    fn class_atom(&mut self) -> Result<ClassAtom, PatternError> {
        let Some(c) = self.peek() else {
            return Err(self.error("unterminated character class"));
        };
        if c != '\\' {
            self.pos += 1;
            return Ok(ClassAtom::Char(c));
        }
        if let Some(node) = self.class_escape() {
            let set = node
                .as_charset()
                .ok_or_else(|| self.error("unsupported class escape"))?;
            return Ok(ClassAtom::Set(set));
        }
        if let Some(c) = self.char_escape() {
            return Ok(ClassAtom::Char(c));
        }
        if self.starts_with("\\b") {
            self.pos += 2;
            return Ok(ClassAtom::Char('\u{08}'));
        }
        self.pos += 1;
        let c = self
            .peek()
            .ok_or_else(|| self.error("dangling escape"))?;
        self.pos += 1;
        Ok(ClassAtom::Char(c))
    }
}

enum ClassAtom {
    Char(char),
    Set(CharSet),
}

fn expand(atom: Regexp, q: &Quantifier) -> Regexp {
    let max = if q.max == UNBOUNDED {
        UNBOUNDED
    } else {
        q.max - q.min
    };
    let repetition = || {
        let node = Box::new(atom.clone());
        if q.greedy {
            Regexp::Repetition { node, min: 0, max }
        } else {
            Regexp::NonGreedyRepetition { node, min: 0, max }
        }
    };
    if q.min == 0 {
        return repetition();
    }
    let mut nodes: Vec<Regexp> = std::iter::repeat_n(atom.clone(), q.min as usize).collect();
    if max != 0 {
        nodes.push(repetition());
    }
    Regexp::sequence(nodes)
}
