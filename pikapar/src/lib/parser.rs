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

//! The parser driver. The input is walked right to left; at each position the terminal clauses
//! are seeded into a worklist and matches propagate up through the seed-parent links until the
//! position reaches a fixpoint, at which point every clause's best match at this position and
//! everything to the right of it is final. Left-recursive clause graphs need no special
//! treatment: each insertion that lengthens a match reschedules its seed parents, so a
//! left-recursive match grows until it stops improving.
//!
//! Parsing never fails: the result is always a complete memo table, and the absence of a start
//! rule match over the whole input is answered by the table's query surface.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Instant;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use pegrammar::peg::clause::{ClauseKind, TermKind};
use pegrammar::peg::grammar::PegGrammar;
use pegrammar::CIdx;

use memotable::{Match, MemoKey, MemoTable};

/// Returned by [`parse_finish_by`](fn.parse_finish_by.html) when the deadline passed before the
/// input was fully processed.
#[derive(Debug, Eq, PartialEq)]
pub struct ParseInterruptedError {
    /// The input position the parse had worked down to when it was interrupted.
    pub off: usize
}

impl fmt::Display for ParseInterruptedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Parse interrupted at offset {}", self.off)
    }
}

/// Parse `input` with the compiled grammar `grm`, returning the filled-in memo table.
pub fn parse<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &'a PegGrammar<StorageT>,
    input: &'a str
) -> MemoTable<'a, StorageT>
where
    usize: AsPrimitive<StorageT>
{
    match do_parse(grm, input, None) {
        Ok(memo) => memo,
        Err(_) => unreachable!()
    }
}

/// As [`parse`](fn.parse.html), but cooperatively giving up if `finish_by` passes. The deadline
/// is checked between input positions, so the overrun is bounded by one position's fixpoint.
pub fn parse_finish_by<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &'a PegGrammar<StorageT>,
    input: &'a str,
    finish_by: Instant
) -> Result<MemoTable<'a, StorageT>, ParseInterruptedError>
where
    usize: AsPrimitive<StorageT>
{
    do_parse(grm, input, Some(finish_by))
}

fn do_parse<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &'a PegGrammar<StorageT>,
    input: &'a str,
    finish_by: Option<Instant>
) -> Result<MemoTable<'a, StorageT>, ParseInterruptedError>
where
    usize: AsPrimitive<StorageT>
{
    let mut memo = MemoTable::new(grm, input);
    let terminals = grm
        .iter_clause_idxs()
        .filter(|&cidx| {
            let clause = grm.clause(cidx);
            // `Nothing` would match everywhere to no purpose; zero-width lookups synthesise its
            // matches on demand instead.
            clause.is_terminal() && !clause.is_nothing()
        })
        .collect::<Vec<_>>();
    // The worklist pops the lowest clause index first. Clause indices are in reverse
    // topological order, so within a position sub-clauses are evaluated before the clauses
    // that query them.
    let mut queue = BinaryHeap::new();
    let mut scheduled = Vob::from_elem(usize::from(grm.clauses_len()), false);
    let poss = input.char_indices().map(|(i, _)| i).collect::<Vec<_>>();
    for &pos in poss.iter().rev() {
        if let Some(fb) = finish_by {
            if Instant::now() >= fb {
                return Err(ParseInterruptedError { off: pos });
            }
        }
        match grm.lex_clause() {
            Some(lex) => {
                if let Some(m) = match_top_down(grm, input, lex, pos) {
                    seed_match_tree(&mut memo, &Rc::new(m), &mut queue, &mut scheduled);
                }
            }
            None => {
                for &t in &terminals {
                    schedule(&mut queue, &mut scheduled, t);
                }
            }
        }
        while let Some(Reverse(cidx)) = queue.pop() {
            scheduled.set(usize::from(cidx), false);
            let key = MemoKey {
                start: pos,
                clause: cidx
            };
            if let Some(m) = try_match(&mut memo, key) {
                if memo.insert_best_match(m).changed() {
                    for &sp in grm.clause(cidx).seed_parent_clauses() {
                        schedule(&mut queue, &mut scheduled, sp);
                    }
                }
            }
        }
    }
    Ok(memo)
}

fn schedule<StorageT: 'static + PrimInt + Unsigned>(
    queue: &mut BinaryHeap<Reverse<CIdx<StorageT>>>,
    scheduled: &mut Vob,
    cidx: CIdx<StorageT>
) {
    let i = usize::from(cidx);
    if !scheduled[i] {
        scheduled.set(i, true);
        queue.push(Reverse(cidx));
    }
}

/// One bottom-up matching step: evaluate `key`'s clause at `key.start`, looking its sub-clauses
/// up in the memo table. Everything to the right of `key.start` is already final, which is what
/// lets `Seq` and `OneOrMore` consult later positions without recursing.
pub(crate) fn try_match<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    memo: &mut MemoTable<'a, StorageT>,
    key: MemoKey<StorageT>
) -> Option<Match<StorageT>>
where
    usize: AsPrimitive<StorageT>
{
    let grm = memo.grammar();
    let clause = grm.clause(key.clause);
    match *clause.kind() {
        ClauseKind::Term(ref term) => match_terminal(key, term, memo.input()),
        ClauseKind::Seq => {
            let mut sub = Vec::with_capacity(clause.sub_clauses().len());
            let mut pos = key.start;
            for &s in clause.sub_clauses() {
                let m = memo.look_up_best_match(
                    MemoKey {
                        start: pos,
                        clause: s
                    },
                    key
                )?;
                pos += m.len();
                sub.push(m);
            }
            Some(Match::new(key, pos - key.start, 0, sub))
        }
        ClauseKind::First => {
            for (i, &s) in clause.sub_clauses().iter().enumerate() {
                if let Some(m) = memo.look_up_best_match(
                    MemoKey {
                        start: key.start,
                        clause: s
                    },
                    key
                ) {
                    let len = m.len();
                    return Some(Match::new(key, len, i, vec![m]));
                }
            }
            None
        }
        ClauseKind::Longest => {
            let mut best: Option<(usize, Rc<Match<StorageT>>)> = None;
            for (i, &s) in clause.sub_clauses().iter().enumerate() {
                if let Some(m) = memo.look_up_best_match(
                    MemoKey {
                        start: key.start,
                        clause: s
                    },
                    key
                ) {
                    let better = match best {
                        Some((_, ref b)) => m.len() > b.len(),
                        None => true
                    };
                    if better {
                        best = Some((i, m));
                    }
                }
            }
            best.map(|(i, m)| {
                let len = m.len();
                Match::new(key, len, i, vec![m])
            })
        }
        ClauseKind::OneOrMore => {
            let s = clause.sub_clauses()[0];
            let head = memo.look_up_best_match(
                MemoKey {
                    start: key.start,
                    clause: s
                },
                key
            )?;
            if head.len() > 0 {
                // Try to extend with a match of this same clause directly after the head: the
                // right-recursive spine keeps the table linear in the repetition count.
                let tail_key = MemoKey {
                    start: key.start + head.len(),
                    clause: key.clause
                };
                if let Some(tail) = memo.look_up_best_match(tail_key, key) {
                    let len = head.len() + tail.len();
                    return Some(Match::new(key, len, 0, vec![head, tail]));
                }
            }
            let len = head.len();
            Some(Match::new(key, len, 0, vec![head]))
        }
        ClauseKind::FollowedBy => {
            let s = clause.sub_clauses()[0];
            memo.look_up_best_match(
                MemoKey {
                    start: key.start,
                    clause: s
                },
                key
            )
            .map(|m| Match::new(key, 0, 0, vec![m]))
        }
        ClauseKind::NotFollowedBy => {
            let s = clause.sub_clauses()[0];
            match memo.look_up_best_match(
                MemoKey {
                    start: key.start,
                    clause: s
                },
                key
            ) {
                Some(_) => None,
                None => Some(Match::new(key, 0, 0, Vec::new()))
            }
        }
        ClauseKind::RuleRef(_) => unreachable!()
    }
}

/// Match a terminal directly against the input.
pub(crate) fn match_terminal<StorageT: 'static + Hash + PrimInt + Unsigned>(
    key: MemoKey<StorageT>,
    term: &TermKind,
    input: &str
) -> Option<Match<StorageT>>
where
    usize: AsPrimitive<StorageT>
{
    match *term {
        TermKind::Nothing => Some(Match::terminal(key, 0)),
        TermKind::AnyChar => input[key.start..]
            .chars()
            .next()
            .map(|c| Match::terminal(key, c.len_utf8())),
        TermKind::Literal(ref s) => {
            if input[key.start..].starts_with(s.as_str()) {
                Some(Match::terminal(key, s.len()))
            } else {
                None
            }
        }
        TermKind::CharSet(ref cs) => input[key.start..].chars().next().and_then(|c| {
            if cs.contains(c) {
                Some(Match::terminal(key, c.len_utf8()))
            } else {
                None
            }
        })
    }
}

// Match the lex clause by direct recursive descent, consulting the input rather than the memo
// table. The grammar compiler has already checked that the lex sub-graph is acyclic.
fn match_top_down<StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &PegGrammar<StorageT>,
    input: &str,
    cidx: CIdx<StorageT>,
    pos: usize
) -> Option<Match<StorageT>>
where
    usize: AsPrimitive<StorageT>
{
    let clause = grm.clause(cidx);
    let key = MemoKey { start: pos, clause: cidx };
    match *clause.kind() {
        ClauseKind::Term(ref term) => match_terminal(key, term, input),
        ClauseKind::Seq => {
            let mut sub = Vec::with_capacity(clause.sub_clauses().len());
            let mut p = pos;
            for &s in clause.sub_clauses() {
                let m = match_top_down(grm, input, s, p)?;
                p += m.len();
                sub.push(Rc::new(m));
            }
            Some(Match::new(key, p - pos, 0, sub))
        }
        ClauseKind::First => {
            for (i, &s) in clause.sub_clauses().iter().enumerate() {
                if let Some(m) = match_top_down(grm, input, s, pos) {
                    let len = m.len();
                    return Some(Match::new(key, len, i, vec![Rc::new(m)]));
                }
            }
            None
        }
        ClauseKind::Longest => {
            let mut best: Option<(usize, Match<StorageT>)> = None;
            for (i, &s) in clause.sub_clauses().iter().enumerate() {
                if let Some(m) = match_top_down(grm, input, s, pos) {
                    let better = match best {
                        Some((_, ref b)) => m.len() > b.len(),
                        None => true
                    };
                    if better {
                        best = Some((i, m));
                    }
                }
            }
            best.map(|(i, m)| {
                let len = m.len();
                Match::new(key, len, i, vec![Rc::new(m)])
            })
        }
        ClauseKind::OneOrMore => {
            let head = match_top_down(grm, input, clause.sub_clauses()[0], pos)?;
            if head.len() > 0 {
                if let Some(tail) = match_top_down(grm, input, cidx, pos + head.len()) {
                    let len = head.len() + tail.len();
                    return Some(Match::new(key, len, 0, vec![Rc::new(head), Rc::new(tail)]));
                }
            }
            let len = head.len();
            Some(Match::new(key, len, 0, vec![Rc::new(head)]))
        }
        ClauseKind::FollowedBy => match_top_down(grm, input, clause.sub_clauses()[0], pos)
            .map(|m| Match::new(key, 0, 0, vec![Rc::new(m)])),
        ClauseKind::NotFollowedBy => {
            match match_top_down(grm, input, clause.sub_clauses()[0], pos) {
                Some(_) => None,
                None => Some(Match::new(key, 0, 0, Vec::new()))
            }
        }
        ClauseKind::RuleRef(_) => unreachable!()
    }
}

// Insert every non-terminal match of a top-down lex match tree into the memo table, scheduling
// seed parents as usual. Terminal matches stay out of the table: lookups recompute them from
// the input on demand.
fn seed_match_tree<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    memo: &mut MemoTable<'a, StorageT>,
    m: &Rc<Match<StorageT>>,
    queue: &mut BinaryHeap<Reverse<CIdx<StorageT>>>,
    scheduled: &mut Vob
) where
    usize: AsPrimitive<StorageT>
{
    for sub in m.sub_matches() {
        seed_match_tree(memo, sub, queue, scheduled);
    }
    let grm = memo.grammar();
    let clause = grm.clause(m.key().clause);
    if !clause.is_terminal() {
        if memo.insert_best_match_rc(Rc::clone(m)).changed() {
            for &sp in clause.seed_parent_clauses() {
                schedule(queue, scheduled, sp);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;
    use std::time::Instant;

    use pegrammar::{peg_to_grammar, peg_to_grammar_with_lex};

    use super::{parse, parse_finish_by};
    use memotable::MemoKey;

    #[test]
    fn test_one_or_more_right_recursive_chain() {
        let grm = peg_to_grammar("S <- 'a'+;").unwrap();
        let memo = parse(&grm, "aaaa");
        let matches = memo.non_overlapping_matches("S").unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.start(), 0);
        assert_eq!(m.len(), 4);
        // The match is stored as a right-recursive (head, tail) spine of depth 4.
        let mut depth = 1;
        let mut cur = Rc::clone(m);
        while cur.sub_matches().len() == 2 {
            let tail = Rc::clone(&cur.sub_matches()[1]);
            assert_eq!(tail.key().clause, m.key().clause);
            cur = tail;
            depth += 1;
        }
        assert_eq!(depth, 4);
    }

    #[test]
    fn test_left_assoc_precedence_parse() {
        let grm = peg_to_grammar("E[0,L] <- E '+' E; E[1] <- [0-9];").unwrap();
        let memo = parse(&grm, "1+2+3");
        let matches = memo.non_overlapping_matches("E").unwrap();
        assert_eq!(matches.len(), 1);
        let outer = &matches[0];
        assert_eq!(outer.start(), 0);
        assert_eq!(outer.len(), 5);
        // The outer E[0] reads as ((1+2)+3): its recursive branch's left operand is the nested
        // E[0] match over "1+2".
        let longest = &outer.sub_matches()[0];
        let seq = &longest.sub_matches()[0];
        let left = &seq.sub_matches()[0];
        assert_eq!(left.key().clause, outer.key().clause);
        assert_eq!(left.start(), 0);
        assert_eq!(left.len(), 3);
        assert_eq!(left.text(memo.input()), "1+2");
    }

    #[test]
    fn test_statement_tiling_no_errors() {
        let grm =
            peg_to_grammar("Program <- Statement+; Statement <- [a-z]+ '=' [0-9]+ ';';").unwrap();
        let input = "x=1;y=2;";
        let memo = parse(&grm, input);
        let stmts = memo.non_overlapping_matches("Statement").unwrap();
        assert_eq!(
            stmts.iter().map(|m| (m.start(), m.len())).collect::<Vec<_>>(),
            vec![(0, 4), (4, 4)]
        );
        // The non-overlapping matches tile the input exactly.
        let tiled = stmts.iter().map(|m| m.text(input)).collect::<String>();
        assert_eq!(tiled, input);
        let errors = memo.syntax_errors(&["Program", "Statement"]).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_syntax_error_span() {
        let grm =
            peg_to_grammar("Program <- Statement+; Statement <- [a-z]+ '=' [0-9]+ ';';").unwrap();
        let input = "x=1;@@@;y=2;";
        let memo = parse(&grm, input);
        let stmts = memo.non_overlapping_matches("Statement").unwrap();
        assert_eq!(
            stmts.iter().map(|m| (m.start(), m.len())).collect::<Vec<_>>(),
            vec![(0, 4), (8, 4)]
        );
        let errors = memo.syntax_errors(&["Program", "Statement"]).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[&4], (8, "@@@;"));
    }

    #[test]
    fn test_right_recursion_without_left_recursion() {
        let grm = peg_to_grammar("A <- 'a' A / 'a';").unwrap();
        let memo = parse(&grm, "aaa");
        let matches = memo.non_overlapping_matches("A").unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.start(), 0);
        assert_eq!(m.len(), 3);
        // The recursive ordered-choice alternative was taken at the top.
        assert_eq!(m.first_matching_sub_idx(), 0);
    }

    #[test]
    fn test_single_level_left_recursion() {
        let grm = peg_to_grammar("A[0,L] <- A 'a' / 'a';").unwrap();
        let memo = parse(&grm, "aaaa");
        let matches = memo.non_overlapping_matches("A").unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.len(), 4);
        // The spine leans left: each nested A match is one 'a' shorter.
        let mut lens = Vec::new();
        let mut cur = Rc::clone(m);
        loop {
            lens.push(cur.len());
            if cur.first_matching_sub_idx() == 1 {
                break;
            }
            let seq = Rc::clone(&cur.sub_matches()[0]);
            cur = Rc::clone(&seq.sub_matches()[0]);
        }
        assert_eq!(lens, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_parse_determinism() {
        let src = "S <- (Item ' ')+; Item <- [a-z]+ / [0-9]+;";
        let grm = peg_to_grammar(src).unwrap();
        let input = "ab 12 c ";
        let memo1 = parse(&grm, input);
        let memo2 = parse(&grm, input);
        for rule in &["S", "Item"] {
            let n1 = memo1.navigable_matches(rule).unwrap();
            let n2 = memo2.navigable_matches(rule).unwrap();
            assert_eq!(n1.len(), n2.len());
            for (pos, m1) in &n1 {
                let m2 = &n2[pos];
                assert_eq!(m1.len(), m2.len());
                assert_eq!(m1.first_matching_sub_idx(), m2.first_matching_sub_idx());
            }
        }
    }

    #[test]
    fn test_lookahead_gates_sequence() {
        let grm = peg_to_grammar("S <- &'ab' . . / !'a' .;").unwrap();
        let memo = parse(&grm, "abxa");
        let navigable = memo.navigable_matches("S").unwrap();
        // At 0, the positive lookahead sees "ab" and the first alternative consumes two
        // characters; at 2, only the negated alternative applies; at 3 there is an 'a' with no
        // 'b' after it, so neither alternative does.
        assert_eq!(navigable[&0].len(), 2);
        assert_eq!(navigable[&0].first_matching_sub_idx(), 0);
        assert_eq!(navigable[&2].len(), 1);
        assert_eq!(navigable[&2].first_matching_sub_idx(), 1);
        assert!(!navigable.contains_key(&3));
    }

    #[test]
    fn test_non_match_positions() {
        let grm = peg_to_grammar("S <- 'x' T; T <- 'ab';").unwrap();
        let memo = parse(&grm, "xq");
        assert_eq!(memo.non_match_positions("T").unwrap(), vec![1]);
        assert_eq!(memo.non_match_positions("S").unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_empty_input() {
        let grm = peg_to_grammar("S <- 'a'*;").unwrap();
        let memo = parse(&grm, "");
        assert!(memo.non_overlapping_matches("S").unwrap().is_empty());
        assert!(memo.syntax_errors(&["S"]).unwrap().is_empty());
    }

    #[test]
    fn test_multibyte_input() {
        let grm = peg_to_grammar("S <- Word+; Word <- [a-zλ-ω]+ ' '?;").unwrap();
        let input = "αβ λμ ab";
        // α and β are outside the class; the parse must still walk char boundaries cleanly.
        let memo = parse(&grm, input);
        let errors = memo.syntax_errors(&["S"]).unwrap();
        assert_eq!(errors.len(), 1);
        let (&start, &(end, text)) = errors.iter().next().unwrap();
        assert_eq!(start, 0);
        assert_eq!(text, "αβ ");
        assert_eq!(end, "αβ ".len());
    }

    #[test]
    fn test_lex_mode_equivalence() {
        let src = "Prog <- Tok+; Tok <- Word / Num / Sp; Word <- [a-z]+; Num <- [0-9]+; Sp <- ' ';";
        let input = "ab 12 xy";
        let grm1 = peg_to_grammar(src).unwrap();
        let memo1 = parse(&grm1, input);
        let grm2 = peg_to_grammar_with_lex(src, "Tok").unwrap();
        let memo2 = parse(&grm2, input);
        for rule in &["Prog", "Tok", "Word", "Num"] {
            let m1 = memo1
                .non_overlapping_matches(rule)
                .unwrap()
                .iter()
                .map(|m| (m.start(), m.len()))
                .collect::<Vec<_>>();
            let m2 = memo2
                .non_overlapping_matches(rule)
                .unwrap()
                .iter()
                .map(|m| (m.start(), m.len()))
                .collect::<Vec<_>>();
            assert_eq!(m1, m2);
        }
        assert_eq!(
            memo2.non_overlapping_matches("Prog").unwrap()[0].len(),
            input.len()
        );
    }

    #[test]
    fn test_lex_mode_skips_terminal_memoisation() {
        let src = "Prog <- Tok+; Tok <- Word / Sp; Word <- [a-z]+; Sp <- ' ';";
        let grm = peg_to_grammar_with_lex(src, "Tok").unwrap();
        let memo = parse(&grm, "ab c");
        // Non-terminal lex-tree matches are memoised...
        assert!(!memo.non_overlapping_matches("Word").unwrap().is_empty());
        // ...but terminal clauses never enter the table.
        for cidx in memo.grammar().iter_clause_idxs() {
            if memo.grammar().clause(cidx).is_terminal() {
                for pos in 0..5 {
                    assert!(memo
                        .get_match(MemoKey {
                            start: pos,
                            clause: cidx
                        })
                        .is_none());
                }
            }
        }
    }

    #[test]
    fn test_parse_finish_by() {
        let grm = peg_to_grammar("S <- 'a'+;").unwrap();
        assert!(parse_finish_by(&grm, "aaaa", Instant::now()).is_err());
        let memo = match parse_finish_by(&grm, "aaaa", Instant::now() + ::std::time::Duration::from_secs(3600)) {
            Ok(memo) => memo,
            Err(_) => panic!()
        };
        assert_eq!(memo.non_overlapping_matches("S").unwrap()[0].len(), 4);
    }

    #[test]
    fn test_zero_width_synthesis_reaches_queries() {
        // 'b'? never matches bottom-up here, but the sequence still sees it as a zero-width
        // match when it queries the memo table.
        let grm = peg_to_grammar("S <- 'a' 'b'? 'c';").unwrap();
        let memo = parse(&grm, "ac");
        let matches = memo.non_overlapping_matches("S").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].len(), 2);
        let memo = parse(&grm, "abc");
        assert_eq!(memo.non_overlapping_matches("S").unwrap()[0].len(), 3);
    }

    #[test]
    fn test_better_match_replaces_submatch_snapshots() {
        // Monotone improvement: the stored match for a key only ever lengthens (or moves to an
        // earlier alternative), and parents are rebuilt against the improved children.
        let grm = peg_to_grammar("S <- A 'x' / A; A <- 'a' A / 'a';").unwrap();
        let memo = parse(&grm, "aaax");
        let m = &memo.non_overlapping_matches("S").unwrap()[0];
        assert_eq!(m.len(), 4);
        assert_eq!(m.first_matching_sub_idx(), 0);
    }
}
