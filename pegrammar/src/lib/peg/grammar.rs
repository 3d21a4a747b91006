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

//! The grammar compiler. `PegGrammar::new` turns a [`GrammarAST`](../ast/struct.GrammarAST.html)
//! into a frozen, interned clause graph ready for parsing:
//!
//!   1. the AST is validated and rules are grouped by name;
//!   2. names with several precedence levels are rewritten into a layered, non-left-recursive
//!      form (each level failing over to the next tighter one);
//!   3. the rule trees are lowered into an arena, desugaring `x?` and `x*`, lifting AST node
//!      labels into their parents, and interning structurally equal sub-clauses by their
//!      canonical string form;
//!   4. by-name rule references are resolved to arena indices, rejecting unknown names and
//!      delegation cycles;
//!   5. the arena is rebuilt in depth-first post-order from the rule roots, which drops
//!      unreachable clauses and gives every clause a lower index than the clauses that use it
//!      (up to rule-recursion back-edges);
//!   6. the zero-width property and the seed-parent back-links are computed.
//!
//! The result is immutable and can be shared between any number of parses.

use std::collections::HashMap;

use indexmap::IndexMap;
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use vob::Vob;

use idxnewtype::{CIdx, RIdx};
use peg::analysis;
use peg::ast::{self, Assoc, GrammarAST, GrammarValidationError, GrammarValidationErrorKind};
use peg::clause::{self, Clause, ClauseKind, TermKind};

#[derive(Debug)]
struct RuleInfo<StorageT> {
    name: String,
    clause: CIdx<StorageT>,
    ast_label: Option<String>
}

/// A compiled PEG. All clause and rule accessors index in O(1); the structure is immutable after
/// construction.
#[derive(Debug)]
pub struct PegGrammar<StorageT = u32> {
    clauses: Vec<Clause<StorageT>>,
    rules: Vec<RuleInfo<StorageT>>,
    /// Rewritten (precedence-suffixed) rule name -> rule, in declaration order.
    rule_map: IndexMap<String, RIdx<StorageT>>,
    /// Bare group name -> the group's lowest precedence level.
    bare_map: HashMap<String, RIdx<StorageT>>,
    lex: Option<CIdx<StorageT>>
}

impl PegGrammar<u32> {
    /// Compile `ast` with the default `u32` clause storage. If `lex_rule` is given, the named
    /// rule's clause graph is matched top-down during parsing (see the parser crate) and must be
    /// acyclic.
    pub fn new(ast: &GrammarAST, lex_rule: Option<&str>) -> Result<PegGrammar<u32>, GrammarValidationError> {
        PegGrammar::new_with_storaget(ast, lex_rule)
    }
}

impl<StorageT: 'static + PrimInt + Unsigned> PegGrammar<StorageT>
where
    usize: AsPrimitive<StorageT>
{
    /// As [`new`](struct.PegGrammar.html#method.new), but with a user-defined `StorageT`.
    pub fn new_with_storaget(
        ast: &GrammarAST,
        lex_rule: Option<&str>
    ) -> Result<PegGrammar<StorageT>, GrammarValidationError> {
        ast.validate()?;

        // Group the rules by name, preserving declaration order.
        let mut groups: IndexMap<String, Vec<ast::Rule>> = IndexMap::new();
        for rule in &ast.rules {
            groups
                .entry(rule.name.clone())
                .or_insert_with(Vec::new)
                .push(rule.clone());
        }

        // Rewrite each name with two or more precedence levels into a layered form, renaming
        // the levels to `name[prec]`. `bare_lowest` maps each group name to the name of its
        // lowest level, which is what bare references resolve to.
        let mut rewritten = Vec::with_capacity(ast.rules.len());
        let mut bare_lowest = HashMap::new();
        for (name, mut rules) in groups {
            if rules.len() == 1 {
                bare_lowest.insert(name.clone(), name.clone());
                rewritten.push(rules.pop().unwrap());
                continue;
            }
            rules.sort_by_key(|r| r.precedence.unwrap_or(0));
            let n = rules.len();
            let level_names = rules
                .iter()
                .map(|r| format!("{}[{}]", name, r.precedence.unwrap_or(0)))
                .collect::<Vec<_>>();
            for i in 0..n {
                let curr = &level_names[i];
                let next = &level_names[(i + 1) % n];
                let mut rule = rules[i].clone();
                rule.name = curr.clone();
                let nrefs = count_self_refs(&rule.clause, &name);
                if nrefs > 0 {
                    if rule.assoc == Some(Assoc::Left) && nrefs >= 2 {
                        // Duplicate the level so that both the left-recursive and the
                        // non-left-recursive reading are available; the longer match wins.
                        // Interning re-shares everything the retargeting below leaves equal.
                        let dup = rule.clause.clone();
                        rule.clause = ast::Clause::Longest(vec![rule.clause.clone(), dup]);
                    }
                    let target = match rule.assoc {
                        Some(Assoc::Left) => Some(0),
                        Some(Assoc::Right) => Some(nrefs - 1),
                        None => None
                    };
                    let mut seen = 0;
                    retarget_self_refs(&mut rule.clause, &name, curr, next, target, &mut seen);
                }
                if i != n - 1 {
                    // Every level except the tightest-binding one fails over to the next level.
                    let inner = rule.clause;
                    rule.clause =
                        ast::Clause::First(vec![inner, ast::Clause::RuleRef(next.clone())]);
                }
                rewritten.push(rule);
            }
            bare_lowest.insert(name, level_names.into_iter().next().unwrap());
        }

        // Lower the rewritten rule trees into the arena, interning as we go.
        let mut builder = Builder {
            clauses: Vec::new(),
            intern: HashMap::new()
        };
        let mut rules = Vec::with_capacity(rewritten.len());
        for rule in &rewritten {
            let (ast_label, cidx) = builder.lower_labelled(&rule.clause);
            rules.push(RuleInfo {
                name: rule.name.clone(),
                clause: cidx,
                ast_label
            });
        }
        let mut clauses = builder.clauses;

        let rule_by_name = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect::<HashMap<_, _>>();

        // Resolve rule roots which are themselves references (alias rules).
        for i in 0..rules.len() {
            let (cidx, label) = resolve_ref(rules[i].clause, &clauses, &rules, &rule_by_name, &bare_lowest)?;
            rules[i].clause = cidx;
            if rules[i].ast_label.is_none() {
                rules[i].ast_label = label;
            }
        }

        // Resolve every reference sub-clause, inheriting the referenced rule's AST node label
        // into unlabelled reference sites.
        for i in 0..clauses.len() {
            for j in 0..clauses[i].sub_clauses().len() {
                let s = clauses[i].sub_clauses()[j];
                let is_ref = match *clauses[usize::from(s)].kind() {
                    ClauseKind::RuleRef(_) => true,
                    _ => false
                };
                if is_ref {
                    let (cidx, label) = resolve_ref(s, &clauses, &rules, &rule_by_name, &bare_lowest)?;
                    clauses[i].sub[j] = cidx;
                    if clauses[i].sub_labels[j].is_none() {
                        clauses[i].sub_labels[j] = label;
                    }
                }
            }
        }

        // Rebuild the arena in depth-first post-order from the rule roots: reference husks and
        // unreachable interned clauses disappear, and sub-clause indices are remapped so that
        // children sort below parents.
        let mut order = Vec::with_capacity(clauses.len());
        let mut visited = Vob::from_elem(clauses.len(), false);
        for rule in &rules {
            postorder(usize::from(rule.clause), &clauses, &mut visited, &mut order);
        }
        let mut remap = vec![::std::usize::MAX; clauses.len()];
        for (newi, &oldi) in order.iter().enumerate() {
            remap[oldi] = newi;
        }
        let mut new_clauses: Vec<Clause<StorageT>> = Vec::with_capacity(order.len());
        for &oldi in &order {
            let mut cl = clauses[oldi].clone();
            cl.sub = cl
                .sub
                .iter()
                .map(|&s| CIdx::new(remap[usize::from(s)]))
                .collect();
            new_clauses.push(cl);
        }
        let mut clauses = new_clauses;
        for rule in &mut rules {
            rule.clause = CIdx::new(remap[usize::from(rule.clause)]);
        }

        analysis::set_can_match_zero(&mut clauses);
        analysis::link_seed_parents(&mut clauses);

        let mut rule_map = IndexMap::new();
        let mut bare_map = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            let ridx = RIdx::new(i);
            clauses[usize::from(rule.clause)].rule_names.push(rule.name.clone());
            let old = rule_map.insert(rule.name.clone(), ridx);
            // The precedence rewrite cannot produce duplicate names from a validated AST.
            debug_assert!(old.is_none());
        }
        for (bare, lowest) in &bare_lowest {
            bare_map.insert(bare.clone(), rule_map[lowest]);
        }

        let lex = match lex_rule {
            Some(name) => {
                let ridx = match rule_map.get(name).or_else(|| bare_map.get(name)) {
                    Some(&ridx) => ridx,
                    None => {
                        return Err(GrammarValidationError {
                            kind: GrammarValidationErrorKind::UnknownLexRule(name.to_string())
                        })
                    }
                };
                let cidx = rules[usize::from(ridx)].clause;
                if !subgraph_acyclic(usize::from(cidx), &clauses) {
                    return Err(GrammarValidationError {
                        kind: GrammarValidationErrorKind::CyclicRuleRef(name.to_string())
                    });
                }
                Some(cidx)
            }
            None => None
        };

        Ok(PegGrammar {
            clauses,
            rules,
            rule_map,
            bare_map,
            lex
        })
    }

    /// How many rules does this grammar have? Precedence levels count individually.
    pub fn rules_len(&self) -> RIdx<StorageT> {
        RIdx::new(self.rules.len())
    }

    /// How many clauses does the compiled clause graph have?
    pub fn clauses_len(&self) -> CIdx<StorageT> {
        CIdx::new(self.clauses.len())
    }

    pub fn clause(&self, cidx: CIdx<StorageT>) -> &Clause<StorageT> {
        &self.clauses[usize::from(cidx)]
    }

    /// Return the index of the rule named `name`, if it exists. A bare group name resolves to
    /// the group's lowest precedence level.
    pub fn rule_idx(&self, name: &str) -> Option<RIdx<StorageT>> {
        self.rule_map
            .get(name)
            .or_else(|| self.bare_map.get(name))
            .cloned()
    }

    pub fn rule_name(&self, ridx: RIdx<StorageT>) -> &str {
        &self.rules[usize::from(ridx)].name
    }

    /// The root clause of rule `ridx`.
    pub fn rule_clause(&self, ridx: RIdx<StorageT>) -> CIdx<StorageT> {
        self.rules[usize::from(ridx)].clause
    }

    /// The AST node label attached to rule `ridx`'s root, if any.
    pub fn rule_ast_label(&self, ridx: RIdx<StorageT>) -> Option<&str> {
        match self.rules[usize::from(ridx)].ast_label {
            Some(ref l) => Some(l),
            None => None
        }
    }

    /// The rule parsing starts from: the lowest precedence level of the first rule name defined
    /// in the grammar.
    pub fn start_rule_idx(&self) -> RIdx<StorageT> {
        self.rule_idx(self.rules[0].name.split('[').next().unwrap())
            .unwrap()
    }

    /// The clause matched top-down during parsing, if the grammar declared a lex rule.
    pub fn lex_clause(&self) -> Option<CIdx<StorageT>> {
        self.lex
    }

    pub fn iter_rule_idxs(&self) -> impl Iterator<Item = RIdx<StorageT>> {
        (0..self.rules.len()).map(RIdx::new)
    }

    pub fn iter_clause_idxs(&self) -> impl Iterator<Item = CIdx<StorageT>> {
        (0..self.clauses.len()).map(CIdx::new)
    }
}

// Count bare references to `name` in `c`. References which have already been retargeted to a
// suffixed level name do not count.
fn count_self_refs(c: &ast::Clause, name: &str) -> usize {
    match *c {
        ast::Clause::Seq(ref subs) | ast::Clause::First(ref subs) | ast::Clause::Longest(ref subs) => {
            subs.iter().map(|s| count_self_refs(s, name)).sum()
        }
        ast::Clause::OneOrMore(ref sub)
        | ast::Clause::ZeroOrMore(ref sub)
        | ast::Clause::Optional(ref sub)
        | ast::Clause::FollowedBy(ref sub)
        | ast::Clause::NotFollowedBy(ref sub)
        | ast::Clause::Label(_, ref sub) => count_self_refs(sub, name),
        ast::Clause::RuleRef(ref n) => (n == name) as usize,
        _ => 0
    }
}

// Retarget the `seen`th..nth bare self-references in `c`: the reference at position `target` (if
// any) keeps binding at the current precedence level `curr`, every other one moves to the
// next-higher level `next`.
fn retarget_self_refs(
    c: &mut ast::Clause,
    name: &str,
    curr: &str,
    next: &str,
    target: Option<usize>,
    seen: &mut usize
) {
    match *c {
        ast::Clause::Seq(ref mut subs)
        | ast::Clause::First(ref mut subs)
        | ast::Clause::Longest(ref mut subs) => {
            for sub in subs.iter_mut() {
                retarget_self_refs(sub, name, curr, next, target, seen);
            }
        }
        ast::Clause::OneOrMore(ref mut sub)
        | ast::Clause::ZeroOrMore(ref mut sub)
        | ast::Clause::Optional(ref mut sub)
        | ast::Clause::FollowedBy(ref mut sub)
        | ast::Clause::NotFollowedBy(ref mut sub)
        | ast::Clause::Label(_, ref mut sub) => {
            retarget_self_refs(sub, name, curr, next, target, seen);
        }
        ast::Clause::RuleRef(ref mut n) => {
            if n.as_str() == name {
                *n = if Some(*seen) == target {
                    curr.to_string()
                } else {
                    next.to_string()
                };
                *seen += 1;
            }
        }
        _ => ()
    }
}

struct Builder<StorageT> {
    clauses: Vec<Clause<StorageT>>,
    intern: HashMap<String, CIdx<StorageT>>
}

impl<StorageT: 'static + PrimInt + Unsigned> Builder<StorageT>
where
    usize: AsPrimitive<StorageT>
{
    fn intern_clause(
        &mut self,
        kind: ClauseKind,
        sub: Vec<CIdx<StorageT>>,
        sub_labels: Vec<Option<String>>
    ) -> CIdx<StorageT> {
        let repr = clause::render(&self.clauses, &kind, &sub, &sub_labels);
        if let Some(&cidx) = self.intern.get(&repr) {
            return cidx;
        }
        let cidx = CIdx::new(self.clauses.len());
        self.clauses.push(Clause::new(kind, sub, sub_labels, repr.clone()));
        self.intern.insert(repr, cidx);
        cidx
    }

    fn nothing(&mut self) -> CIdx<StorageT> {
        self.intern_clause(ClauseKind::Term(TermKind::Nothing), vec![], vec![])
    }

    // Lower a clause which sits in a label-bearing position, peeling `Label` wrappers off into
    // the returned label (the outermost wins).
    fn lower_labelled(&mut self, c: &ast::Clause) -> (Option<String>, CIdx<StorageT>) {
        let mut label = None;
        let mut c = c;
        while let ast::Clause::Label(ref l, ref inner) = *c {
            if label.is_none() {
                label = Some(l.clone());
            }
            c = &**inner;
        }
        (label, self.lower(c))
    }

    fn lower(&mut self, c: &ast::Clause) -> CIdx<StorageT> {
        match *c {
            ast::Clause::Seq(ref subs) => self.lower_many(ClauseKind::Seq, subs),
            ast::Clause::First(ref subs) => self.lower_many(ClauseKind::First, subs),
            ast::Clause::Longest(ref subs) => self.lower_many(ClauseKind::Longest, subs),
            ast::Clause::OneOrMore(ref sub) => {
                let (label, cidx) = self.lower_labelled(sub);
                self.intern_clause(ClauseKind::OneOrMore, vec![cidx], vec![label])
            }
            ast::Clause::ZeroOrMore(ref sub) => {
                // x* is (x+ / ()).
                let (label, cidx) = self.lower_labelled(sub);
                let one = self.intern_clause(ClauseKind::OneOrMore, vec![cidx], vec![label]);
                let nothing = self.nothing();
                self.intern_clause(ClauseKind::First, vec![one, nothing], vec![None, None])
            }
            ast::Clause::Optional(ref sub) => {
                // x? is (x / ()).
                let (label, cidx) = self.lower_labelled(sub);
                let nothing = self.nothing();
                self.intern_clause(ClauseKind::First, vec![cidx, nothing], vec![label, None])
            }
            ast::Clause::FollowedBy(ref sub) => {
                let (label, cidx) = self.lower_labelled(sub);
                self.intern_clause(ClauseKind::FollowedBy, vec![cidx], vec![label])
            }
            ast::Clause::NotFollowedBy(ref sub) => {
                let (label, cidx) = self.lower_labelled(sub);
                self.intern_clause(ClauseKind::NotFollowedBy, vec![cidx], vec![label])
            }
            ast::Clause::Literal(ref s) => {
                self.intern_clause(ClauseKind::Term(TermKind::Literal(s.clone())), vec![], vec![])
            }
            ast::Clause::CharSet(ref cs) => {
                self.intern_clause(ClauseKind::Term(TermKind::CharSet(cs.clone())), vec![], vec![])
            }
            ast::Clause::AnyChar => {
                self.intern_clause(ClauseKind::Term(TermKind::AnyChar), vec![], vec![])
            }
            ast::Clause::Nothing => self.nothing(),
            ast::Clause::RuleRef(ref n) => {
                self.intern_clause(ClauseKind::RuleRef(n.clone()), vec![], vec![])
            }
            ast::Clause::Label(_, _) => {
                let (_, cidx) = self.lower_labelled(c);
                cidx
            }
        }
    }

    fn lower_many(&mut self, kind: ClauseKind, subs: &[ast::Clause]) -> CIdx<StorageT> {
        let mut cidxs = Vec::with_capacity(subs.len());
        let mut labels = Vec::with_capacity(subs.len());
        for sub in subs {
            let (label, cidx) = self.lower_labelled(sub);
            labels.push(label);
            cidxs.push(cidx);
        }
        self.intern_clause(kind, cidxs, labels)
    }
}

// Follow a chain of by-name references starting at `start` until a non-reference clause is
// reached, returning it together with the first AST node label encountered along the chain.
fn resolve_ref<StorageT: 'static + PrimInt + Unsigned>(
    start: CIdx<StorageT>,
    clauses: &[Clause<StorageT>],
    rules: &[RuleInfo<StorageT>],
    rule_by_name: &HashMap<String, usize>,
    bare_lowest: &HashMap<String, String>
) -> Result<(CIdx<StorageT>, Option<String>), GrammarValidationError>
where
    usize: AsPrimitive<StorageT>
{
    let mut cur = start;
    let mut label = None;
    let mut seen: Vec<String> = Vec::new();
    loop {
        let name = match *clauses[usize::from(cur)].kind() {
            ClauseKind::RuleRef(ref n) => n.clone(),
            _ => return Ok((cur, label))
        };
        let full = if rule_by_name.contains_key(&name) {
            name
        } else {
            match bare_lowest.get(&name) {
                Some(full) => full.clone(),
                None => {
                    return Err(GrammarValidationError {
                        kind: GrammarValidationErrorKind::UnknownRuleRef(name)
                    })
                }
            }
        };
        if seen.contains(&full) {
            return Err(GrammarValidationError {
                kind: GrammarValidationErrorKind::CyclicRuleRef(full)
            });
        }
        seen.push(full.clone());
        let rule = &rules[rule_by_name[&full]];
        if label.is_none() {
            label = rule.ast_label.clone();
        }
        cur = rule.clause;
    }
}

fn postorder<StorageT: 'static + PrimInt + Unsigned>(
    i: usize,
    clauses: &[Clause<StorageT>],
    visited: &mut Vob,
    order: &mut Vec<usize>
) where
    usize: AsPrimitive<StorageT>
{
    if visited[i] {
        return;
    }
    visited.set(i, true);
    for j in 0..clauses[i].sub_clauses().len() {
        let s = usize::from(clauses[i].sub_clauses()[j]);
        postorder(s, clauses, visited, order);
    }
    order.push(i);
}

// Is the clause graph reachable from `start` free of cycles? Used for the lex clause, which is
// matched by recursive descent and hence must not recurse into itself.
fn subgraph_acyclic<StorageT: 'static + PrimInt + Unsigned>(
    start: usize,
    clauses: &[Clause<StorageT>]
) -> bool
where
    usize: AsPrimitive<StorageT>
{
    fn rec<StorageT: 'static + PrimInt + Unsigned>(
        i: usize,
        clauses: &[Clause<StorageT>],
        visited: &mut Vob,
        stack: &mut Vob
    ) -> bool
    where
        usize: AsPrimitive<StorageT>
    {
        if stack[i] {
            return false;
        }
        if visited[i] {
            return true;
        }
        visited.set(i, true);
        stack.set(i, true);
        for j in 0..clauses[i].sub_clauses().len() {
            let s = usize::from(clauses[i].sub_clauses()[j]);
            if !rec(s, clauses, visited, stack) {
                return false;
            }
        }
        stack.set(i, false);
        true
    }

    let mut visited = Vob::from_elem(clauses.len(), false);
    let mut stack = Vob::from_elem(clauses.len(), false);
    rec(start, clauses, &mut visited, &mut stack)
}
