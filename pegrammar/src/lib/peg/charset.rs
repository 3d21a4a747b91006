// Copyright (c) 2018 King's College London
// created by the Software Development Team <http://soft-dev.org/>
//
// The Universal Permissive License (UPL), Version 1.0
//
// Subject to the condition set forth below, permission is hereby granted to any person obtaining a
// copy of this software, associated documentation and/or data (collectively the "Software"), free
// of charge and under any and all copyright rights in the Software, and any and all patent rights
// owned or freely licensable by each licensor hereunder covering either (i) the unmodified
// Software as contributed to or provided by such licensor, or (ii) the Larger Works (as defined
// below), to deal in both
//
// (a) the Software, and
// (b) any piece of software and/or hardware listed in the lrgrwrks.txt file
// if one is included with the Software (each a "Larger Work" to which the Software is contributed
// by such licensors),
//
// without restriction, including without limitation the rights to copy, create derivative works
// of, display, perform, and distribute the Software and make, use, sell, offer for sale, import,
// export, have made, and have sold the Software and the Larger Work(s), and to sublicense the
// foregoing rights on either these or other terms.
//
// This license is subject to the following condition: The above copyright notice and either this
// complete permission notice or at a minimum a reference to the UPL must be included in all copies
// or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! A set of Unicode scalar values, used as the payload of character-class terminals. The set is
//! stored as sorted, coalesced, inclusive ranges; negation is a flag rather than a materialised
//! complement, so `[^a-z]` stays small.

use std::fmt;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CharSet {
    negated: bool,
    ranges: Vec<(char, char)>
}

impl CharSet {
    /// Create a `CharSet` containing exactly the given characters.
    pub fn new<I: IntoIterator<Item = char>>(chars: I) -> CharSet {
        CharSet::from_ranges(chars.into_iter().map(|c| (c, c)))
    }

    /// Create a `CharSet` from inclusive ranges. Empty ranges (where the lower bound exceeds the
    /// upper) are dropped; overlapping and adjacent ranges are coalesced.
    pub fn from_ranges<I: IntoIterator<Item = (char, char)>>(ranges: I) -> CharSet {
        let mut rngs = ranges
            .into_iter()
            .filter(|&(lo, hi)| lo <= hi)
            .collect::<Vec<_>>();
        rngs.sort();
        let mut coalesced: Vec<(char, char)> = Vec::with_capacity(rngs.len());
        for (lo, hi) in rngs {
            match coalesced.last_mut() {
                Some(last) if lo as u32 <= last.1 as u32 + 1 => {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                }
                _ => coalesced.push((lo, hi))
            }
        }
        CharSet {
            negated: false,
            ranges: coalesced
        }
    }

    /// Flip this set's negation flag.
    pub fn negated(mut self) -> CharSet {
        self.negated = !self.negated;
        self
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Does the set contain no characters at all? A negated empty set contains every character,
    /// so `is_empty` is only true for the positive empty set.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && !self.negated
    }

    /// Is `c` a member of this set?
    pub fn contains(&self, c: char) -> bool {
        let hit = self
            .ranges
            .binary_search_by(|&(lo, hi)| {
                if c < lo {
                    ::std::cmp::Ordering::Greater
                } else if c > hi {
                    ::std::cmp::Ordering::Less
                } else {
                    ::std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        hit != self.negated
    }
}

impl fmt::Display for CharSet {
    /// The canonical `[...]` rendering, parseable by the grammar notation parser.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = String::new();
        s.push('[');
        if self.negated {
            s.push('^');
        }
        for &(lo, hi) in &self.ranges {
            push_escaped(&mut s, lo, "]^-[");
            if hi != lo {
                s.push('-');
                push_escaped(&mut s, hi, "]^-[");
            }
        }
        s.push(']');
        write!(f, "{}", s)
    }
}

/// Append `c` to `s`, backslash-escaping it if it is a control character, a backslash, or one of
/// the context-dependent `specials`.
pub(crate) fn push_escaped(s: &mut String, c: char, specials: &str) {
    match c {
        '\n' => s.push_str("\\n"),
        '\r' => s.push_str("\\r"),
        '\t' => s.push_str("\\t"),
        '\\' => s.push_str("\\\\"),
        c if specials.contains(c) => {
            s.push('\\');
            s.push(c);
        }
        c if (c as u32) < 0x20 || c as u32 == 0x7f => {
            s.push_str(&format!("\\u{:04x}", c as u32));
        }
        c => s.push(c)
    }
}

#[cfg(test)]
mod test {
    use super::CharSet;

    #[test]
    fn test_contains() {
        let cs = CharSet::from_ranges(vec![('a', 'z'), ('0', '9')]);
        assert!(cs.contains('a'));
        assert!(cs.contains('m'));
        assert!(cs.contains('z'));
        assert!(cs.contains('5'));
        assert!(!cs.contains('A'));
        assert!(!cs.contains(' '));
    }

    #[test]
    fn test_negated() {
        let cs = CharSet::new(vec!['x']).negated();
        assert!(!cs.contains('x'));
        assert!(cs.contains('y'));
        assert!(cs.is_negated());
        assert!(!cs.is_empty());
    }

    #[test]
    fn test_coalesce() {
        let cs = CharSet::from_ranges(vec![('a', 'c'), ('d', 'f'), ('e', 'k'), ('z', 'a')]);
        assert_eq!(format!("{}", cs), "[a-k]");
        let cs = CharSet::new(vec!['b', 'a', 'c', 'x']);
        assert_eq!(format!("{}", cs), "[a-cx]");
    }

    #[test]
    fn test_display_escapes() {
        let cs = CharSet::from_ranges(vec![('\t', '\t'), (']', ']'), ('-', '-')]);
        assert_eq!(format!("{}", cs), "[\\t\\-\\]]");
        let cs = CharSet::new(vec!['^']).negated();
        assert_eq!(format!("{}", cs), "[^\\^]");
    }

    #[test]
    fn test_empty() {
        let cs = CharSet::new(vec![]);
        assert!(cs.is_empty());
        assert!(!cs.contains('a'));
        assert_eq!(format!("{}", cs), "[]");
    }
}
