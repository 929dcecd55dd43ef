use super::ast::{Regexp, UNBOUNDED};
use crate::domain::charset::CharSet;

type Captures = Vec<Option<(usize, usize)>>;

/// Whether `regexp` matches the whole of `input`.
///
/// Runs in constant native stack: backtrack points live on a heap stack, so
/// input length is bounded by memory only.
#[must_use]
pub fn is_match(regexp: &Regexp, input: &str) -> bool {
    let chars: Vec<char> = input.chars().collect();
    let compiled = Compiler::compile(regexp);
    let mut captures: Captures = vec![None; compiled.groups];
    let matcher = Matcher {
        input: &chars,
        compiled: &compiled,
    };
    matcher.run(0, 0, &mut captures, true)
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Program
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum CharMatcher {
    Char(char),
    Any,
    Set(CharSet),
    NotSet(CharSet),
}

impl CharMatcher {
    fn accepts(&self, c: char) -> bool {
        match self {
            CharMatcher::Char(expected) => c == *expected,
            CharMatcher::Any => !is_line_terminator(c),
            CharMatcher::Set(set) => set.contains_char(c),
            CharMatcher::NotSet(set) => !set.contains_char(c),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Assertion {
    Start,
    End,
    WordBoundary,
    NonWordBoundary,
}

#[derive(Debug)]
enum Inst {
    One(CharMatcher),
    /// Greedy `*` over a single character; backtracks one character at a time.
    Many(CharMatcher),
    Assert(Assertion),
    Backreference(usize),
    /// Continue at `.0`, retry at `.1` on backtrack.
    Split(usize, usize),
    Jump(usize),
    OpenGroup(usize),
    CloseGroup(usize),
    LoopEnter(usize),
    /// Fails when the loop body consumed nothing since `LoopEnter`.
    LoopCheck(usize),
    LookAhead {
        program: usize,
        negate: bool,
    },
    Fail,
    Match,
}

struct Compiled {
    /// Index 0 is the pattern itself; the rest are lookahead bodies.
    programs: Vec<Vec<Inst>>,
    groups: usize,
    loops: usize,
}

struct Compiler {
    programs: Vec<Vec<Inst>>,
    loops: usize,
}

/// Whether every match of `node` consumes at least one character.
fn always_consumes(node: &Regexp) -> bool {
    match node {
        Regexp::Any | Regexp::Char(_) | Regexp::CharSet(_) | Regexp::Complement(_) => true,
        Regexp::Sequence(nodes) => nodes.iter().any(always_consumes),
        Regexp::Alter(branches) => !branches.is_empty() && branches.iter().all(always_consumes),
        Regexp::Capture(_, inner) => always_consumes(inner),
        Regexp::Repetition { node, min, .. } | Regexp::NonGreedyRepetition { node, min, .. } => {
            *min > 0 && always_consumes(node)
        }
        _ => false,
    }
}

fn char_matcher(node: &Regexp) -> Option<CharMatcher> {
    match node {
        Regexp::Any => Some(CharMatcher::Any),
        Regexp::Char(c) => Some(CharMatcher::Char(*c)),
        Regexp::CharSet(set) => Some(CharMatcher::Set(set.clone())),
        Regexp::Complement(inner) => inner.as_charset().map(CharMatcher::NotSet),
        _ => node.as_charset().map(CharMatcher::Set),
    }
}

fn split(greedy: bool, body: usize, exit: usize) -> Inst {
    if greedy {
        Inst::Split(body, exit)
    } else {
        Inst::Split(exit, body)
    }
}

impl Compiler {
    fn compile(regexp: &Regexp) -> Compiled {
        let mut compiler = Compiler {
            programs: vec![Vec::new()],
            loops: 0,
        };
        compiler.emit_program(0, regexp);
        Compiled {
            programs: compiler.programs,
            groups: regexp.max_capture() + 1,
            loops: compiler.loops,
        }
    }

    fn emit_program(&mut self, index: usize, node: &Regexp) {
        let mut out = Vec::new();
        self.emit(&mut out, node);
        out.push(Inst::Match);
        self.programs[index] = out;
    }

    fn emit(&mut self, out: &mut Vec<Inst>, node: &Regexp) {
        match node {
            Regexp::NullSeq => {}
            Regexp::StartAnchor => out.push(Inst::Assert(Assertion::Start)),
            Regexp::EndAnchor => out.push(Inst::Assert(Assertion::End)),
            Regexp::WordBoundary => out.push(Inst::Assert(Assertion::WordBoundary)),
            Regexp::NonWordBoundary => out.push(Inst::Assert(Assertion::NonWordBoundary)),
            Regexp::Any | Regexp::Char(_) | Regexp::CharSet(_) | Regexp::Complement(_) => {
                out.push(char_matcher(node).map_or(Inst::Fail, Inst::One));
            }
            Regexp::Backreference(index) => out.push(Inst::Backreference(*index)),
            Regexp::Alter(branches) => self.emit_alter(out, branches),
            Regexp::Sequence(nodes) => {
                for n in nodes {
                    self.emit(out, n);
                }
            }
            Regexp::Capture(index, inner) => {
                out.push(Inst::OpenGroup(*index));
                self.emit(out, inner);
                out.push(Inst::CloseGroup(*index));
            }
            Regexp::LookAhead(inner) => self.emit_lookahead(out, inner, false),
            Regexp::NegativeLookAhead(inner) => self.emit_lookahead(out, inner, true),
            Regexp::Repetition { node, min, max } => {
                self.emit_repetition(out, node, (*min, *max), true);
            }
            Regexp::NonGreedyRepetition { node, min, max } => {
                self.emit_repetition(out, node, (*min, *max), false);
            }
        }
    }

    fn emit_alter(&mut self, out: &mut Vec<Inst>, branches: &[Regexp]) {
        let mut exits = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            let last = i + 1 == branches.len();
            let at = out.len();
            if !last {
                out.push(Inst::Fail);
            }
            self.emit(out, branch);
            if !last {
                exits.push(out.len());
                out.push(Inst::Fail);
                out[at] = Inst::Split(at + 1, out.len());
            }
        }
        let end = out.len();
        for exit in exits {
            out[exit] = Inst::Jump(end);
        }
    }

    fn emit_lookahead(&mut self, out: &mut Vec<Inst>, inner: &Regexp, negate: bool) {
        let program = self.programs.len();
        self.programs.push(Vec::new());
        self.emit_program(program, inner);
        out.push(Inst::LookAhead { program, negate });
    }

    fn emit_repetition(
        &mut self,
        out: &mut Vec<Inst>,
        node: &Regexp,
        bounds: (u32, u32),
        greedy: bool,
    ) {
        let (min, max) = bounds;
        for _ in 0..min {
            self.emit(out, node);
        }
        if max != UNBOUNDED {
            let mut optional = Vec::new();
            for _ in min..max {
                optional.push(out.len());
                out.push(Inst::Fail);
                self.emit(out, node);
            }
            let end = out.len();
            for at in optional {
                out[at] = split(greedy, at + 1, end);
            }
            return;
        }
        if greedy && let Some(matcher) = char_matcher(node) {
            out.push(Inst::Many(matcher));
            return;
        }

        // A unit that consumed nothing would repeat forever.
        let guard = (!always_consumes(node)).then(|| {
            self.loops += 1;
            self.loops - 1
        });
        let head = out.len();
        out.push(Inst::Fail);
        if let Some(slot) = guard {
            out.push(Inst::LoopEnter(slot));
        }
        self.emit(out, node);
        if let Some(slot) = guard {
            out.push(Inst::LoopCheck(slot));
        }
        out.push(Inst::Jump(head));
        out[head] = split(greedy, head + 1, out.len());
    }
}

// ---------------------------------------------------------------------------
// Backtracking
// ---------------------------------------------------------------------------

enum Frame {
    Resume { pc: usize, pos: usize },
    /// Retry `pc` at every position from `pos` down to `floor`.
    Retreat { pc: usize, floor: usize, pos: usize },
    RestoreCapture(usize, Option<(usize, usize)>),
    RestoreOpen(usize, usize),
    RestoreLoop(usize, usize),
}

struct Backtrack<'c> {
    caps: &'c mut Captures,
    open: Vec<usize>,
    loops: Vec<usize>,
    stack: Vec<Frame>,
}

fn set_capture(state: &mut Backtrack<'_>, index: usize, value: Option<(usize, usize)>) {
    state
        .stack
        .push(Frame::RestoreCapture(index, state.caps[index]));
    state.caps[index] = value;
}

struct Matcher<'a> {
    input: &'a [char],
    compiled: &'a Compiled,
}

impl Matcher<'_> {
    /// Run program `program` from `start`. `whole` requires the match to end
    /// at the end of input; lookahead bodies may end anywhere.
    fn run(&self, program: usize, start: usize, caps: &mut Captures, whole: bool) -> bool {
        let insts = &self.compiled.programs[program];
        let mut state = Backtrack {
            caps,
            open: vec![0; self.compiled.groups],
            loops: vec![0; self.compiled.loops],
            stack: vec![Frame::Resume { pc: 0, pos: start }],
        };
        while let Some(frame) = state.stack.pop() {
            let (pc, pos) = match frame {
                Frame::Resume { pc, pos } => (pc, pos),
                Frame::Retreat { pc, floor, pos } => {
                    if pos > floor {
                        state.stack.push(Frame::Retreat {
                            pc,
                            floor,
                            pos: pos - 1,
                        });
                    }
                    (pc, pos)
                }
                Frame::RestoreCapture(index, value) => {
                    state.caps[index] = value;
                    continue;
                }
                Frame::RestoreOpen(index, value) => {
                    state.open[index] = value;
                    continue;
                }
                Frame::RestoreLoop(index, value) => {
                    state.loops[index] = value;
                    continue;
                }
            };
            if self.step(insts, &mut state, pc, pos, whole) {
                return true;
            }
        }
        false
    }

    /// Follow one thread until it matches or fails, pushing its backtrack
    /// points and undo records.
    fn step(
        &self,
        insts: &[Inst],
        state: &mut Backtrack<'_>,
        mut pc: usize,
        mut pos: usize,
        whole: bool,
    ) -> bool {
        loop {
            let next = match &insts[pc] {
                Inst::Split(first, second) => {
                    state.stack.push(Frame::Resume { pc: *second, pos });
                    pc = *first;
                    continue;
                }
                Inst::Jump(to) => {
                    pc = *to;
                    continue;
                }
                Inst::Fail => return false,
                Inst::Match => return !whole || pos == self.input.len(),
                inst => self.advance(inst, state, pc, pos),
            };
            let Some(next) = next else {
                return false;
            };
            pos = next;
            pc += 1;
        }
    }

    /// Position after a straight-line instruction, `None` when it fails.
    fn advance(
        &self,
        inst: &Inst,
        state: &mut Backtrack<'_>,
        pc: usize,
        pos: usize,
    ) -> Option<usize> {
        match inst {
            Inst::One(matcher) => self
                .input
                .get(pos)
                .is_some_and(|c| matcher.accepts(*c))
                .then_some(pos + 1),
            Inst::Many(matcher) => {
                let mut end = pos;
                while self.input.get(end).is_some_and(|c| matcher.accepts(*c)) {
                    end += 1;
                }
                if end > pos {
                    state.stack.push(Frame::Retreat {
                        pc: pc + 1,
                        floor: pos,
                        pos: end - 1,
                    });
                }
                Some(end)
            }
            Inst::Assert(assertion) => self.holds(*assertion, pos).then_some(pos),
            Inst::Backreference(index) => self.backreference(state, *index, pos),
            Inst::OpenGroup(index) => {
                state.stack.push(Frame::RestoreOpen(*index, state.open[*index]));
                state.open[*index] = pos;
                Some(pos)
            }
            Inst::CloseGroup(index) => {
                set_capture(state, *index, Some((state.open[*index], pos)));
                Some(pos)
            }
            Inst::LoopEnter(slot) => {
                state.stack.push(Frame::RestoreLoop(*slot, state.loops[*slot]));
                state.loops[*slot] = pos;
                Some(pos)
            }
            Inst::LoopCheck(slot) => (state.loops[*slot] != pos).then_some(pos),
            Inst::LookAhead { program, negate } => {
                self.look_ahead(state, *program, *negate, pos).then_some(pos)
            }
            Inst::Split(..) | Inst::Jump(_) | Inst::Fail | Inst::Match => None,
        }
    }

    /// An unset group matches the empty string.
    fn backreference(&self, state: &Backtrack<'_>, index: usize, pos: usize) -> Option<usize> {
        let Some((start, end)) = state.caps.get(index).copied().flatten() else {
            return Some(pos);
        };
        let len = end - start;
        let fits =
            pos + len <= self.input.len() && self.input[start..end] == self.input[pos..pos + len];
        fits.then_some(pos + len)
    }

    /// Positive lookaheads keep the groups their body captured.
    fn look_ahead(
        &self,
        state: &mut Backtrack<'_>,
        program: usize,
        negate: bool,
        pos: usize,
    ) -> bool {
        let mut scratch = state.caps.clone();
        let found = self.run(program, pos, &mut scratch, false);
        if found && !negate {
            for (index, value) in scratch.into_iter().enumerate() {
                if state.caps[index] != value {
                    set_capture(state, index, value);
                }
            }
        }
        found != negate
    }

    fn holds(&self, assertion: Assertion, pos: usize) -> bool {
        match assertion {
            Assertion::Start => pos == 0,
            Assertion::End => pos == self.input.len(),
            Assertion::WordBoundary => self.at_boundary(pos),
            Assertion::NonWordBoundary => !self.at_boundary(pos),
        }
    }

    fn at_boundary(&self, pos: usize) -> bool {
        let before = pos > 0 && self.input.get(pos - 1).is_some_and(|c| is_word_char(*c));
        let after = self.input.get(pos).is_some_and(|c| is_word_char(*c));
        before != after
    }
}
