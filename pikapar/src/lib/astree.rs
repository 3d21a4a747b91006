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

//! Building ASTs out of match trees. Only labelled positions become AST nodes: an unlabelled
//! match is transparent, splicing its own labelled descendants into its parent's children. This
//! keeps the AST a design artefact of the grammar author rather than a mirror of the clause
//! graph's plumbing.

use std::hash::Hash;

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use pegrammar::peg::grammar::PegGrammar;

use memotable::{Match, MemoTable, UnknownRuleError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ASTNode {
    label: String,
    start: usize,
    len: usize,
    children: Vec<ASTNode>
}

impl ASTNode {
    /// Build the AST for `m`, whose root node is named `label`.
    pub fn from_match<StorageT: 'static + Hash + PrimInt + Unsigned>(
        grm: &PegGrammar<StorageT>,
        m: &Match<StorageT>,
        label: &str
    ) -> ASTNode
    where
        usize: AsPrimitive<StorageT>
    {
        let mut children = Vec::new();
        collect_labelled(grm, m, &mut children);
        ASTNode {
            label: label.to_string(),
            start: m.start(),
            len: m.len(),
            children
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn children(&self) -> &[ASTNode] {
        &self.children
    }

    pub fn text<'i>(&self, input: &'i str) -> &'i str {
        &input[self.start..self.start + self.len]
    }

    /// Pretty-print the AST, one node per line, children indented below their parent; leaves
    /// show the input they matched.
    pub fn pp(&self, input: &str) -> String {
        let mut s = String::new();
        self.pp_rec(input, 0, &mut s);
        s
    }

    fn pp_rec(&self, input: &str, depth: usize, s: &mut String) {
        for _ in 0..depth {
            s.push(' ');
        }
        s.push_str(&self.label);
        if self.children.is_empty() {
            s.push(' ');
            s.push_str(self.text(input));
        }
        s.push('\n');
        for child in &self.children {
            child.pp_rec(input, depth + 1, s);
        }
    }
}

fn collect_labelled<StorageT: 'static + Hash + PrimInt + Unsigned>(
    grm: &PegGrammar<StorageT>,
    m: &Match<StorageT>,
    out: &mut Vec<ASTNode>
) where
    usize: AsPrimitive<StorageT>
{
    for (label, sub) in m.labelled_sub_matches(grm) {
        match label {
            Some(l) => out.push(ASTNode::from_match(grm, &sub, l)),
            None => collect_labelled(grm, &sub, out)
        }
    }
}

/// Build one AST per non-overlapping match of `rule`. The root nodes are named by the rule's
/// AST node label, falling back to the rule's name.
pub fn asts<'a, StorageT: 'static + Hash + PrimInt + Unsigned>(
    memo: &MemoTable<'a, StorageT>,
    rule: &str
) -> Result<Vec<ASTNode>, UnknownRuleError>
where
    usize: AsPrimitive<StorageT>
{
    let grm = memo.grammar();
    let ridx = match grm.rule_idx(rule) {
        Some(ridx) => ridx,
        None => {
            return Err(UnknownRuleError {
                name: rule.to_string()
            })
        }
    };
    let label = match grm.rule_ast_label(ridx) {
        Some(l) => l,
        None => grm.rule_name(ridx)
    };
    Ok(memo
        .non_overlapping_matches_for_clause(grm.rule_clause(ridx))
        .iter()
        .map(|m| ASTNode::from_match(grm, m, label))
        .collect())
}

#[cfg(test)]
mod test {
    use pegrammar::peg_to_grammar;

    use super::asts;
    use parser::parse;

    #[test]
    fn test_labelled_ast() {
        let grm =
            peg_to_grammar("Expr <- add:(lhs:Num '+' rhs:Num) / Num; Num <- [0-9]+;").unwrap();
        let input = "1+2";
        let memo = parse(&grm, input);
        let asts = asts(&memo, "Expr").unwrap();
        assert_eq!(asts.len(), 1);
        let root = &asts[0];
        assert_eq!(root.label(), "Expr");
        assert_eq!(root.children().len(), 1);
        let add = &root.children()[0];
        assert_eq!(add.label(), "add");
        assert_eq!(add.text(input), "1+2");
        let kids = add.children();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].label(), "lhs");
        assert_eq!(kids[0].text(input), "1");
        assert_eq!(kids[1].label(), "rhs");
        assert_eq!(kids[1].text(input), "2");
        assert_eq!(root.pp(input), "Expr\n add\n  lhs 1\n  rhs 2\n");
    }

    #[test]
    fn test_rule_ast_label_names_root() {
        let grm = peg_to_grammar("Num <- num:[0-9]+;").unwrap();
        let memo = parse(&grm, "42");
        let asts = asts(&memo, "Num").unwrap();
        assert_eq!(asts.len(), 1);
        assert_eq!(asts[0].label(), "num");
        assert_eq!(asts[0].text("42"), "42");
    }

    #[test]
    fn test_one_or_more_flattens_in_ast() {
        let grm = peg_to_grammar("List <- (item:[a-z] ',')+;").unwrap();
        let input = "a,b,c,";
        let memo = parse(&grm, input);
        let asts = asts(&memo, "List").unwrap();
        assert_eq!(asts.len(), 1);
        let labels: Vec<&str> = asts[0].children().iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["item", "item", "item"]);
        let texts: Vec<&str> = asts[0].children().iter().map(|c| c.text(input)).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_rule() {
        let grm = peg_to_grammar("S <- 'a';").unwrap();
        let memo = parse(&grm, "a");
        assert!(asts(&memo, "T").is_err());
    }
}
