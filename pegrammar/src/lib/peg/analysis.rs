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

//! Static analyses over the frozen clause graph: the zero-width property and the seed-parent
//! back-links which drive the parser's bottom-up activation.

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use idxnewtype::CIdx;
use peg::clause::{Clause, ClauseKind, TermKind};

/// Compute `can_match_zero` for every clause. Since rule recursion makes the clause graph
/// potentially cyclic, this iterates to a fixpoint: the property starts out false everywhere and
/// is only ever switched on, so the loop terminates.
pub(crate) fn set_can_match_zero<StorageT: 'static + PrimInt + Unsigned>(
    clauses: &mut Vec<Clause<StorageT>>
) where
    usize: AsPrimitive<StorageT>
{
    loop {
        let mut changed = false;
        for i in 0..clauses.len() {
            let new = {
                let clause = &clauses[i];
                let sub_zero =
                    |s: &CIdx<StorageT>| clauses[usize::from(*s)].can_match_zero_chars();
                match clause.kind() {
                    &ClauseKind::Term(TermKind::Nothing) => true,
                    &ClauseKind::Term(TermKind::Literal(ref s)) => s.is_empty(),
                    &ClauseKind::Term(TermKind::AnyChar)
                    | &ClauseKind::Term(TermKind::CharSet(_)) => false,
                    &ClauseKind::FollowedBy | &ClauseKind::NotFollowedBy => true,
                    &ClauseKind::Seq => clause.sub_clauses().iter().all(sub_zero),
                    &ClauseKind::First | &ClauseKind::Longest => {
                        clause.sub_clauses().iter().any(sub_zero)
                    }
                    &ClauseKind::OneOrMore => sub_zero(&clause.sub_clauses()[0]),
                    &ClauseKind::RuleRef(_) => unreachable!()
                }
            };
            if new != clauses[i].can_match_zero {
                clauses[i].can_match_zero = new;
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

/// Link every clause to its seed parents. A parent must be re-evaluated at a position when one of
/// its seed children newly matches there: for `Seq` the seed children are the leading children up
/// to and including the first that cannot match zero width (a match of any later child cannot be
/// the first thing that makes the sequence matchable); every other kind treats all of its
/// children as seeds. Requires `can_match_zero` to have been computed.
pub(crate) fn link_seed_parents<StorageT: 'static + PrimInt + Unsigned>(
    clauses: &mut Vec<Clause<StorageT>>
) where
    usize: AsPrimitive<StorageT>
{
    for i in 0..clauses.len() {
        let parent = CIdx::new(i);
        let subs = clauses[i].sub_clauses().to_vec();
        let seq = match *clauses[i].kind() {
            ClauseKind::Seq => true,
            _ => false
        };
        for s in subs {
            let zero = clauses[usize::from(s)].can_match_zero_chars();
            {
                let seed_parents = &mut clauses[usize::from(s)].seed_parents;
                if !seed_parents.contains(&parent) {
                    seed_parents.push(parent);
                }
            }
            if seq && !zero {
                break;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use peg::ast::{Clause, GrammarAST, Rule};
    use peg::grammar::PegGrammar;

    fn mk_rule(name: &str, clause: Clause) -> Rule {
        Rule {
            name: name.to_string(),
            precedence: None,
            assoc: None,
            clause
        }
    }

    fn zero_of(grm: &PegGrammar<u32>, rule: &str) -> bool {
        let ridx = grm.rule_idx(rule).unwrap();
        grm.clause(grm.rule_clause(ridx)).can_match_zero_chars()
    }

    #[test]
    fn test_can_match_zero() {
        let mut ast = GrammarAST::new();
        ast.add_rule(mk_rule(
            "S",
            Clause::Seq(vec![
                Clause::Optional(Box::new(Clause::Literal("a".to_string()))),
                Clause::ZeroOrMore(Box::new(Clause::Literal("b".to_string()))),
            ])
        ));
        ast.add_rule(mk_rule("T", Clause::OneOrMore(Box::new(Clause::Literal("c".to_string())))));
        ast.add_rule(mk_rule("U", Clause::NotFollowedBy(Box::new(Clause::AnyChar))));
        ast.add_rule(mk_rule(
            "V",
            Clause::Seq(vec![
                Clause::RuleRef("S".to_string()),
                Clause::RuleRef("T".to_string()),
            ])
        ));
        let grm = PegGrammar::new(&ast, None).unwrap();
        assert!(zero_of(&grm, "S"));
        assert!(!zero_of(&grm, "T"));
        assert!(zero_of(&grm, "U"));
        assert!(!zero_of(&grm, "V"));
    }

    #[test]
    fn test_can_match_zero_recursive() {
        // A right-recursive rule whose base case is zero-width.
        let mut ast = GrammarAST::new();
        ast.add_rule(mk_rule(
            "A",
            Clause::First(vec![
                Clause::Seq(vec![
                    Clause::Literal("a".to_string()),
                    Clause::RuleRef("A".to_string()),
                ]),
                Clause::Nothing,
            ])
        ));
        let grm = PegGrammar::new(&ast, None).unwrap();
        assert!(zero_of(&grm, "A"));
    }

    #[test]
    fn test_seed_parents_seq_prefix() {
        // In `S <- 'a'? 'b' 'c'`, both the optional 'a' and the following 'b' can be the first
        // child to unlock a match of S, but 'c' cannot.
        let mut ast = GrammarAST::new();
        ast.add_rule(mk_rule(
            "S",
            Clause::Seq(vec![
                Clause::Optional(Box::new(Clause::Literal("a".to_string()))),
                Clause::Literal("b".to_string()),
                Clause::Literal("c".to_string()),
            ])
        ));
        let grm = PegGrammar::new(&ast, None).unwrap();
        let root = grm.rule_clause(grm.rule_idx("S").unwrap());
        let sub = grm.clause(root).sub_clauses().to_vec();
        assert!(grm.clause(sub[0]).seed_parent_clauses().contains(&root));
        assert!(grm.clause(sub[1]).seed_parent_clauses().contains(&root));
        assert!(!grm.clause(sub[2]).seed_parent_clauses().contains(&root));
    }

    #[test]
    fn test_seed_parents_choice() {
        let mut ast = GrammarAST::new();
        ast.add_rule(mk_rule(
            "S",
            Clause::First(vec![
                Clause::Literal("a".to_string()),
                Clause::Literal("b".to_string()),
            ])
        ));
        let grm = PegGrammar::new(&ast, None).unwrap();
        let root = grm.rule_clause(grm.rule_idx("S").unwrap());
        for &s in grm.clause(root).sub_clauses() {
            assert!(grm.clause(s).seed_parent_clauses().contains(&root));
        }
    }
}
