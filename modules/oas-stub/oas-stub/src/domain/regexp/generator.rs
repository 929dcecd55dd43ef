use rand::Rng;

use super::ast::{Regexp, UNBOUNDED};
use crate::domain::charset::{CharSet, PRINTABLE};

/// Upper bound used for `*`, `+` and `{n,}`.
pub const UNBOUNDED_REPETITION_CAP: u32 = 16;

const SURROGATE_RETRIES: usize = 8;

/// Produce a string matching `regexp`.
///
/// Alternations always take their first branch. Repetitions stop early with
/// probability 1/2 after each unit once their minimum is met.
pub fn generate<R: Rng + ?Sized>(regexp: &Regexp, rng: &mut R) -> String {
    let mut generator = Generator {
        rng,
        captures: vec![None; regexp.max_capture() + 1],
    };
    let mut out = String::new();
    generator.emit(regexp, &mut out);
    out
}

struct Generator<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
    captures: Vec<Option<String>>,
}

impl<R: Rng + ?Sized> Generator<'_, R> {
    fn emit(&mut self, node: &Regexp, out: &mut String) {
        match node {
            Regexp::NullSeq
            | Regexp::StartAnchor
            | Regexp::EndAnchor
            | Regexp::WordBoundary
            | Regexp::NonWordBoundary
            | Regexp::LookAhead(_)
            | Regexp::NegativeLookAhead(_) => {}
            Regexp::Any => self.emit_from_set(&PRINTABLE, out),
            Regexp::Char(c) => out.push(*c),
            Regexp::CharSet(set) => self.emit_from_set(set, out),
            Regexp::Complement(inner) => {
                let set = inner
                    .as_charset()
                    .map_or_else(|| PRINTABLE.clone(), |s| s.complement());
                self.emit_from_set(&set, out);
            }
            Regexp::Alter(branches) => {
                if let Some(first) = branches.first() {
                    self.emit(first, out);
                }
            }
            Regexp::Sequence(nodes) => {
                for n in nodes {
                    self.emit(n, out);
                }
            }
            Regexp::Capture(index, inner) => {
                let mut captured = String::new();
                self.emit(inner, &mut captured);
                out.push_str(&captured);
                if let Some(slot) = self.captures.get_mut(*index) {
                    *slot = Some(captured);
                }
            }
            Regexp::Backreference(index) => {
                if let Some(Some(captured)) = self.captures.get(*index) {
                    out.push_str(captured);
                }
            }
            Regexp::Repetition { node, min, max }
            | Regexp::NonGreedyRepetition { node, min, max } => {
                self.emit_repetition(node, *min, *max, out);
            }
        }
    }

    fn emit_repetition(&mut self, node: &Regexp, min: u32, max: u32, out: &mut String) {
        let max = if max == UNBOUNDED {
            min.saturating_add(UNBOUNDED_REPETITION_CAP)
        } else {
            max
        };
        let count = self.rng.random_range(min..=max);
        for i in 0..count {
            self.emit(node, out);
            if i + 1 >= min && self.rng.random_bool(0.5) {
                break;
            }
        }
    }

    /// Pick a range uniformly, then a code point in it.
    fn emit_from_set(&mut self, set: &CharSet, out: &mut String) {
        let ranges = set.ranges();
        if ranges.is_empty() {
            return;
        }
        for _ in 0..SURROGATE_RETRIES {
            let (lo, hi) = ranges[self.rng.random_range(0..ranges.len())];
            if let Some(c) = char::from_u32(self.rng.random_range(lo..=hi)) {
                out.push(c);
                return;
            }
        }
        if let Some(c) = ranges.iter().find_map(|&(lo, _)| char::from_u32(lo)) {
            out.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::regexp::parse;

    fn sample(pattern: &str, seed: u64) -> String {
        let node = parse(pattern).unwrap();
        generate(&node, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn fixed_shape_pattern() {
        for seed in 0..20 {
            let s = sample("\\d{3}-\\d{4}", seed);
            assert_eq!(s.len(), 8);
            assert!(s[..3].chars().all(|c| c.is_ascii_digit()));
            assert_eq!(&s[3..4], "-");
        }
    }

    #[test]
    fn alternation_takes_first_branch() {
        for seed in 0..10 {
            assert_eq!(sample("cat|dog", seed), "cat");
        }
    }

    #[test]
    fn backreference_repeats_capture() {
        for seed in 0..10 {
            let s = sample("([a-c]{2})-\\1", seed);
            let (left, right) = s.split_once('-').unwrap();
            assert_eq!(left, right);
            assert_eq!(left.len(), 2);
        }
    }

    #[test]
    fn unbounded_repetition_is_capped() {
        for seed in 0..50 {
            let s = sample("x+", seed);
            assert!(!s.is_empty());
            assert!(s.len() <= 1 + UNBOUNDED_REPETITION_CAP as usize);
        }
    }

    #[test]
    fn anchors_emit_nothing() {
        assert_eq!(sample("^ab$", 1), "ab");
    }

    #[test]
    fn negated_class_avoids_members() {
        for seed in 0..30 {
            let s = sample("[^a-z]", seed);
            let c = s.chars().next().unwrap();
            assert!(!c.is_ascii_lowercase());
        }
    }
}
