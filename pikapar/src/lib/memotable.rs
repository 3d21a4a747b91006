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

//! The memo table and the match model. The table maps (clause, start position) keys to the best
//! match known for that key; per clause it also keeps an ordered index of positions with a match
//! and of positions which were queried but had none, which is what the error-reporting queries
//! walk after a parse. A parse never fails: a missing match for the start rule over the whole
//! input is data, surfaced through [`syntax_errors`](struct.MemoTable.html#method.syntax_errors).

use std::cmp;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use fnv::FnvHashMap;
use num_traits::{AsPrimitive, PrimInt, Unsigned};

use pegrammar::peg::clause::ClauseKind;
use pegrammar::peg::grammar::PegGrammar;
use pegrammar::CIdx;

use parser;

/// The unique key of a memo entry: which clause matched (or failed to match) at which byte
/// position. Keys order by position first, so a clause's entries walk the input left to right.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemoKey<StorageT> {
    pub start: usize,
    pub clause: CIdx<StorageT>
}

/// One match of one clause at one position. Matches are immutable and shared: a child match
/// stored in the memo table can appear under any number of parent matches.
#[derive(Clone, Debug)]
pub struct Match<StorageT> {
    key: MemoKey<StorageT>,
    len: usize,
    first_matching_sub_idx: usize,
    sub: Vec<Rc<Match<StorageT>>>
}

impl<StorageT: 'static + Hash + PrimInt + Unsigned> Match<StorageT>
where
    usize: AsPrimitive<StorageT>
{
    pub(crate) fn new(
        key: MemoKey<StorageT>,
        len: usize,
        first_matching_sub_idx: usize,
        sub: Vec<Rc<Match<StorageT>>>
    ) -> Match<StorageT> {
        Match {
            key,
            len,
            first_matching_sub_idx,
            sub
        }
    }

    pub(crate) fn terminal(key: MemoKey<StorageT>, len: usize) -> Match<StorageT> {
        Match::new(key, len, 0, Vec::new())
    }

    /// The synthesised match returned when a zero-width clause is looked up at a position where
    /// nothing was memoised. It has no sub-matches.
    pub(crate) fn zero_width(key: MemoKey<StorageT>) -> Match<StorageT> {
        Match::new(key, 0, 0, Vec::new())
    }

    pub fn key(&self) -> MemoKey<StorageT> {
        self.key
    }

    /// The number of bytes of input this match consumed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn start(&self) -> usize {
        self.key.start
    }

    pub fn end(&self) -> usize {
        self.key.start + self.len
    }

    /// Which sub-clause matched; only meaningful for `First` and `Longest` clauses (`0`
    /// otherwise).
    pub fn first_matching_sub_idx(&self) -> usize {
        self.first_matching_sub_idx
    }

    pub fn sub_matches(&self) -> &[Rc<Match<StorageT>>] {
        &self.sub
    }

    /// The input slice this match covers.
    pub fn text<'i>(&self, input: &'i str) -> &'i str {
        &input[self.start()..self.end()]
    }

    /// Is `self` a better match than `other` for the same key? Longer wins; between equal
    /// lengths, an earlier ordered-choice alternative wins.
    pub fn is_better_than(&self, other: &Match<StorageT>) -> bool {
        self.len > other.len
            || (self.len == other.len && self.first_matching_sub_idx < other.first_matching_sub_idx)
    }

    /// The sub-matches paired with their AST node labels, in input order. `First`/`Longest`
    /// report their single taken branch; `OneOrMore`'s right-recursive spine is flattened into
    /// one element per repetition; lookaheads other than `FollowedBy` and terminals have none.
    pub fn labelled_sub_matches<'g>(
        &self,
        grm: &'g PegGrammar<StorageT>
    ) -> Vec<(Option<&'g str>, Rc<Match<StorageT>>)> {
        let clause = grm.clause(self.key.clause);
        match *clause.kind() {
            ClauseKind::Seq => self
                .sub
                .iter()
                .enumerate()
                .map(|(i, m)| (clause.sub_label(i), Rc::clone(m)))
                .collect(),
            ClauseKind::First | ClauseKind::Longest => {
                if self.sub.is_empty() {
                    // A synthesised zero-width match.
                    Vec::new()
                } else {
                    vec![(
                        clause.sub_label(self.first_matching_sub_idx),
                        Rc::clone(&self.sub[0])
                    )]
                }
            }
            ClauseKind::OneOrMore => {
                let mut out = Vec::new();
                let mut cur = self;
                loop {
                    if cur.sub.is_empty() {
                        break;
                    }
                    out.push((clause.sub_label(0), Rc::clone(&cur.sub[0])));
                    if cur.sub.len() == 2 {
                        cur = &*cur.sub[1];
                    } else {
                        break;
                    }
                }
                out
            }
            ClauseKind::FollowedBy => {
                if self.sub.is_empty() {
                    Vec::new()
                } else {
                    vec![(clause.sub_label(0), Rc::clone(&self.sub[0]))]
                }
            }
            ClauseKind::NotFollowedBy | ClauseKind::Term(_) => Vec::new(),
            ClauseKind::RuleRef(_) => unreachable!()
        }
    }
}

impl<StorageT> fmt::Display for Match<StorageT>
where
    StorageT: fmt::Display
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Match(clause {} at {}, len {})",
            self.key.clause, self.key.start, self.len
        )
    }
}

/// What did inserting a match into the table do?
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoUpdate {
    /// There was no previous entry for the key.
    pub inserted: bool,
    /// A previous entry was replaced by a strictly better match.
    pub improved: bool
}

impl MemoUpdate {
    pub fn changed(&self) -> bool {
        self.inserted || self.improved
    }
}

/// An error returned when a query names a rule the grammar does not define.
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownRuleError {
    pub name: String
}

impl fmt::Display for UnknownRuleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown rule '{}'", self.name)
    }
}

#[derive(Debug)]
pub struct MemoTable<'a, StorageT: 'a> {
    grm: &'a PegGrammar<StorageT>,
    input: &'a str,
    memo: FnvHashMap<MemoKey<StorageT>, Rc<Match<StorageT>>>,
    /// Per clause: the positions at which the clause has a memoised match.
    match_poss: Vec<BTreeSet<usize>>,
    /// Per clause: the positions at which the clause was queried but had no match.
    nonmatch_poss: Vec<BTreeSet<usize>>
}

impl<'a, StorageT: 'static + Hash + PrimInt + Unsigned> MemoTable<'a, StorageT>
where
    usize: AsPrimitive<StorageT>
{
    pub fn new(grm: &'a PegGrammar<StorageT>, input: &'a str) -> MemoTable<'a, StorageT> {
        let nclauses = usize::from(grm.clauses_len());
        MemoTable {
            grm,
            input,
            memo: FnvHashMap::default(),
            match_poss: vec![BTreeSet::new(); nclauses],
            nonmatch_poss: vec![BTreeSet::new(); nclauses]
        }
    }

    pub fn grammar(&self) -> &'a PegGrammar<StorageT> {
        self.grm
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    /// A side-effect-free point lookup of the memoised best match for `key`.
    pub fn get_match(&self, key: MemoKey<StorageT>) -> Option<Rc<Match<StorageT>>> {
        self.memo.get(&key).map(Rc::clone)
    }

    /// The best match for `key`, as seen by the clause `requesting` while it evaluates its own
    /// match. Terminals and lookaheads are computed on demand straight from the input rather
    /// than memoised; a zero-width clause with no memoised match synthesises an empty one. A
    /// lookup which comes up empty is recorded as a non-match position, except when a clause
    /// probes its own key (which `OneOrMore` does one position past its last repetition on
    /// every match).
    pub fn look_up_best_match(
        &mut self,
        key: MemoKey<StorageT>,
        requesting: MemoKey<StorageT>
    ) -> Option<Rc<Match<StorageT>>> {
        if let Some(m) = self.memo.get(&key) {
            return Some(Rc::clone(m));
        }
        let grm = self.grm;
        let clause = grm.clause(key.clause);
        let res = if let ClauseKind::Term(ref term) = *clause.kind() {
            parser::match_terminal(key, term, self.input).map(Rc::new)
        } else if clause.is_lookahead() {
            parser::try_match(self, key).map(Rc::new)
        } else if clause.can_match_zero_chars() {
            Some(Rc::new(Match::zero_width(key)))
        } else {
            None
        };
        if res.is_none() && requesting.clause != key.clause {
            self.nonmatch_poss[usize::from(key.clause)].insert(key.start);
        }
        res
    }

    /// Insert `m` unless the table already holds something at least as good for its key. The
    /// sequence of entries stored for any one key is strictly monotone: each replacement either
    /// lengthens the match or moves it to an earlier ordered-choice alternative.
    pub fn insert_best_match(&mut self, m: Match<StorageT>) -> MemoUpdate {
        self.insert_best_match_rc(Rc::new(m))
    }

    pub(crate) fn insert_best_match_rc(&mut self, m: Rc<Match<StorageT>>) -> MemoUpdate {
        let key = m.key();
        let update = match self.memo.entry(key) {
            Entry::Occupied(mut e) => {
                if m.is_better_than(e.get()) {
                    e.insert(m);
                    MemoUpdate {
                        inserted: false,
                        improved: true
                    }
                } else {
                    MemoUpdate {
                        inserted: false,
                        improved: false
                    }
                }
            }
            Entry::Vacant(e) => {
                e.insert(m);
                MemoUpdate {
                    inserted: true,
                    improved: false
                }
            }
        };
        if update.inserted {
            self.match_poss[usize::from(key.clause)].insert(key.start);
            // A failed query earlier in the fixpoint may have recorded this position as a
            // non-match; the match supersedes it.
            self.nonmatch_poss[usize::from(key.clause)].remove(&key.start);
        }
        update
    }

    /// The greedy left-to-right tiling of the input with matches of `rule`: repeatedly take the
    /// match starting at the lowest position at or after the cursor, then move the cursor past
    /// it (zero-width matches advance the cursor by one so the walk always makes progress).
    pub fn non_overlapping_matches(
        &self,
        rule: &str
    ) -> Result<Vec<Rc<Match<StorageT>>>, UnknownRuleError> {
        Ok(self.non_overlapping_matches_for_clause(self.rule_clause(rule)?))
    }

    pub fn non_overlapping_matches_for_clause(
        &self,
        cidx: CIdx<StorageT>
    ) -> Vec<Rc<Match<StorageT>>> {
        let poss = &self.match_poss[usize::from(cidx)];
        let mut out = Vec::new();
        let mut cursor = 0;
        loop {
            let pos = match poss.range(cursor..).next() {
                Some(&pos) => pos,
                None => break
            };
            let m = self
                .get_match(MemoKey {
                    start: pos,
                    clause: cidx
                })
                .unwrap();
            cursor = pos + cmp::max(1, m.len());
            out.push(m);
        }
        out
    }

    /// All memoised matches of `rule` as an ordered map from start position to best match,
    /// supporting ceiling/floor walks for error recovery.
    pub fn navigable_matches(
        &self,
        rule: &str
    ) -> Result<BTreeMap<usize, Rc<Match<StorageT>>>, UnknownRuleError> {
        let cidx = self.rule_clause(rule)?;
        let mut out = BTreeMap::new();
        for &pos in &self.match_poss[usize::from(cidx)] {
            out.insert(
                pos,
                self.get_match(MemoKey {
                    start: pos,
                    clause: cidx
                })
                .unwrap()
            );
        }
        Ok(out)
    }

    /// The positions at which `rule`'s clause was queried during parsing but did not match.
    /// Positions the parse never reached are neither matches nor non-matches.
    pub fn non_match_positions(&self, rule: &str) -> Result<Vec<usize>, UnknownRuleError> {
        let cidx = self.rule_clause(rule)?;
        Ok(self.nonmatch_poss[usize::from(cidx)]
            .iter()
            .cloned()
            .collect())
    }

    /// The spans of input covered by none of the named rules' non-overlapping matches, as an
    /// ordered map from span start to (span end, span text). An empty map means the rules
    /// between them tile the whole input.
    pub fn syntax_errors(
        &self,
        rules: &[&str]
    ) -> Result<BTreeMap<usize, (usize, &'a str)>, UnknownRuleError> {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for rule in rules {
            for m in self.non_overlapping_matches(rule)? {
                if !m.is_empty() {
                    spans.push((m.start(), m.end()));
                }
            }
        }
        spans.sort();
        let mut out = BTreeMap::new();
        let mut cursor = 0;
        for (start, end) in spans {
            if start > cursor {
                out.insert(cursor, (start, &self.input[cursor..start]));
            }
            cursor = cmp::max(cursor, end);
        }
        if cursor < self.input.len() {
            out.insert(cursor, (self.input.len(), &self.input[cursor..]));
        }
        Ok(out)
    }

    fn rule_clause(&self, rule: &str) -> Result<CIdx<StorageT>, UnknownRuleError> {
        match self.grm.rule_idx(rule) {
            Some(ridx) => Ok(self.grm.rule_clause(ridx)),
            None => Err(UnknownRuleError {
                name: rule.to_string()
            })
        }
    }
}
