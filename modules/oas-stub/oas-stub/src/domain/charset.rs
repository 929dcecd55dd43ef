use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const MAX_CODE_POINT: u32 = 0x10FFFF;
const SMALL_CHARS: u32 = 128;

/// Set of Unicode code points.
///
/// ASCII lives in a lookup table; everything above it is a sorted map of
/// `lower -> upper` ranges. Ranges in the map never overlap or touch.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CharSet {
    small: [bool; SMALL_CHARS as usize],
    large: BTreeMap<u32, u32>,
}

pub static ASCII: LazyLock<CharSet> = LazyLock::new(|| CharSet::from_code_points(0, 127));
pub static LETTER: LazyLock<CharSet> =
    LazyLock::new(|| CharSet::from_range('a', 'z').with_range('A', 'Z'));
pub static DIGITS: LazyLock<CharSet> = LazyLock::new(|| CharSet::from_range('0', '9'));
pub static PRINTABLE: LazyLock<CharSet> = LazyLock::new(|| CharSet::from_code_points(32, 126));
pub static SYMBOLS: LazyLock<CharSet> = LazyLock::new(|| {
    let mut set = CharSet::from_code_points(33, 47);
    set.add_range(58, 64);
    set.add_range(91, 96);
    set.add_range(123, 126);
    set
});

impl Default for CharSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl CharSet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            small: [false; SMALL_CHARS as usize],
            large: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_range(from: char, to: char) -> Self {
        Self::from_code_points(from as u32, to as u32)
    }

    #[must_use]
    pub fn from_code_points(from: u32, to: u32) -> Self {
        let mut set = Self::empty();
        set.add_range(from, to);
        set
    }

    #[must_use]
    pub fn from_chars(chars: &str) -> Self {
        let mut set = Self::empty();
        for c in chars.chars() {
            set.add_char(c);
        }
        set
    }

    #[must_use]
    pub fn with_range(mut self, from: char, to: char) -> Self {
        self.add_range(from as u32, to as u32);
        self
    }

    #[must_use]
    pub fn with_char(mut self, c: char) -> Self {
        self.add_char(c);
        self
    }

    #[must_use]
    pub fn with_set(mut self, other: &CharSet) -> Self {
        self.union(other);
        self
    }

    pub fn add_char(&mut self, c: char) {
        self.add_range(c as u32, c as u32);
    }

    /// Add `[from, to]`, merging with any range it overlaps or touches.
    /// An inverted range is ignored.
    pub fn add_range(&mut self, from: u32, to: u32) {
        if to < from || from > MAX_CODE_POINT {
            return;
        }
        let to = to.min(MAX_CODE_POINT);
        let mut from = from;
        if from < SMALL_CHARS {
            for i in from..=to.min(SMALL_CHARS - 1) {
                self.small[i as usize] = true;
            }
            if to < SMALL_CHARS {
                return;
            }
            from = SMALL_CHARS;
        }

        let mut lower = from;
        let mut upper = to;
        if let Some((&k, &v)) = self.large.range(..=lower).next_back()
            && v.saturating_add(1) >= lower
        {
            lower = k;
            upper = upper.max(v);
        }
        while let Some((&k, &v)) = self.large.range(lower..).next() {
            if k > upper.saturating_add(1) {
                break;
            }
            self.large.remove(&k);
            upper = upper.max(v);
        }
        self.large.insert(lower, upper);
    }

    pub fn union(&mut self, other: &CharSet) {
        for (i, present) in other.small.iter().enumerate() {
            if *present {
                self.small[i] = true;
            }
        }
        for (&k, &v) in &other.large {
            self.add_range(k, v);
        }
    }

    /// Every code point in `[0, MAX_CODE_POINT]` not in this set.
    #[must_use]
    pub fn complement(&self) -> CharSet {
        let mut out = CharSet::empty();
        for (i, present) in self.small.iter().enumerate() {
            out.small[i] = !present;
        }
        let mut next = SMALL_CHARS;
        for (&k, &v) in &self.large {
            if k > next {
                out.large.insert(next, k - 1);
            }
            next = v + 1;
        }
        if next <= MAX_CODE_POINT {
            out.large.insert(next, MAX_CODE_POINT);
        }
        out
    }

    #[must_use]
    pub fn contains(&self, code_point: u32) -> bool {
        if code_point < SMALL_CHARS {
            return self.small[code_point as usize];
        }
        self.large
            .range(..=code_point)
            .next_back()
            .is_some_and(|(_, &upper)| upper >= code_point)
    }

    #[must_use]
    pub fn contains_char(&self, c: char) -> bool {
        self.contains(c as u32)
    }

    /// Number of code points in the set.
    #[must_use]
    pub fn count(&self) -> u32 {
        let small = self.small.iter().filter(|b| **b).count() as u32;
        let large: u32 = self.large.iter().map(|(k, v)| v - k + 1).sum();
        small + large
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Inclusive ranges: contiguous ASCII runs first, then the large ranges.
    #[must_use]
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut start: Option<u32> = None;
        for i in 0..SMALL_CHARS {
            match (self.small[i as usize], start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    out.push((s, i - 1));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            out.push((s, SMALL_CHARS - 1));
        }
        out.extend(self.large.iter().map(|(&k, &v)| (k, v)));
        out
    }
}

impl std::fmt::Debug for CharSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CharSet[")?;
        for (lo, hi) in self.ranges() {
            if lo == hi {
                write!(f, "{lo:#x}")?;
            } else {
                write!(f, "{lo:#x}-{hi:#x}")?;
            }
            write!(f, " ")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_complement_is_identity() {
        let mut set = CharSet::empty();
        set.add_range(0x100, 0x1FF);
        set.add_range(0x3000, 0x30FF);
        assert_eq!(set.complement().complement(), set);

        let ascii_and_large = CharSet::from_range('a', 'f').with_range('\u{4e00}', '\u{4eff}');
        assert_eq!(ascii_and_large.complement().complement(), ascii_and_large);
    }

    #[test]
    fn adjacent_ranges_merge() {
        let mut set = CharSet::empty();
        set.add_range(200, 300);
        set.add_range(400, 500);
        set.add_range(301, 399);
        assert_eq!(set.ranges(), vec![(200, 500)]);

        set.add_range(150, 210);
        set.add_range(490, 600);
        assert_eq!(set.ranges(), vec![(150, 600)]);
    }

    #[test]
    fn range_spanning_ascii_boundary_splits() {
        let set = CharSet::from_code_points(120, 130);
        assert_eq!(set.ranges(), vec![(120, 127), (128, 130)]);
        assert_eq!(set.count(), 11);
        assert!(set.contains(127));
        assert!(set.contains(128));
        assert!(!set.contains(131));
    }

    #[test]
    fn complement_covers_full_code_space() {
        let digits = DIGITS.clone();
        let non_digits = digits.complement();
        assert!(!non_digits.contains_char('5'));
        assert!(non_digits.contains_char('a'));
        assert!(non_digits.contains(MAX_CODE_POINT));
        assert_eq!(digits.count() + non_digits.count(), MAX_CODE_POINT + 1);
    }

    #[test]
    fn inverted_range_is_ignored() {
        let mut set = CharSet::empty();
        set.add_range(10, 5);
        assert!(set.is_empty());
    }

    #[test]
    fn constants_have_expected_sizes() {
        assert_eq!(DIGITS.count(), 10);
        assert_eq!(LETTER.count(), 52);
        assert_eq!(PRINTABLE.count(), 95);
        assert_eq!(ASCII.count(), 128);
        assert_eq!(SYMBOLS.count(), 32);
        assert!(CharSet::from_chars("xyz").contains_char('y'));
    }
}
