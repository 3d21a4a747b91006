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

//! The abstract representation of a PEG as handed to us by the user (whether via the notation
//! parser or constructed programmatically). Clauses at this level are plain owned trees: rules
//! refer to each other by name (`Clause::RuleRef`) and nothing is shared. Compilation into the
//! interned clause graph happens in the `grammar` module.

use std::collections::HashSet;
use std::fmt;

use peg::charset::CharSet;

/// Operator associativity for precedence-annotated rules. A rule with no associativity treats
/// every self-reference as binding at the next-higher precedence level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Assoc {
    Left,
    Right
}

/// A clause tree. `Seq` matches its children one after another; `First` is PEG ordered choice;
/// `Longest` matches whichever child consumes the most input (ties go to the earlier child);
/// `Label` attaches an AST node label to its child and is otherwise transparent to matching.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Clause {
    Seq(Vec<Clause>),
    First(Vec<Clause>),
    Longest(Vec<Clause>),
    OneOrMore(Box<Clause>),
    ZeroOrMore(Box<Clause>),
    Optional(Box<Clause>),
    FollowedBy(Box<Clause>),
    NotFollowedBy(Box<Clause>),
    Literal(String),
    CharSet(CharSet),
    AnyChar,
    Nothing,
    RuleRef(String),
    Label(String, Box<Clause>)
}

impl Clause {
    /// The clause below any number of `Label` wrappers.
    pub fn unlabelled(&self) -> &Clause {
        let mut c = self;
        while let Clause::Label(_, ref inner) = *c {
            c = &**inner;
        }
        c
    }
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub name: String,
    /// Higher precedence binds tighter. Several rules may share one name, in which case each
    /// defines one precedence level; an unannotated rule sits at level 0.
    pub precedence: Option<u32>,
    pub assoc: Option<Assoc>,
    pub clause: Clause
}

/// An ordered collection of rules. The first rule added is the start rule.
#[derive(Clone, Debug, Default)]
pub struct GrammarAST {
    pub rules: Vec<Rule>
}

impl GrammarAST {
    pub fn new() -> GrammarAST {
        GrammarAST { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Perform basic validation on the grammar: every rule must have a name, labels must be
    /// non-empty, no rule may consist solely of a reference to itself, and no two rules may
    /// share a (name, precedence) pair.
    pub fn validate(&self) -> Result<(), GrammarValidationError> {
        if self.rules.is_empty() {
            return Err(GrammarValidationError {
                kind: GrammarValidationErrorKind::EmptyGrammar
            });
        }
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.name.is_empty() {
                return Err(GrammarValidationError {
                    kind: GrammarValidationErrorKind::UnnamedRule
                });
            }
            if !seen.insert((rule.name.clone(), rule.precedence.unwrap_or(0))) {
                return Err(GrammarValidationError {
                    kind: GrammarValidationErrorKind::DuplicatePrecedenceLevel(
                        rule.name.clone(),
                        rule.precedence.unwrap_or(0)
                    )
                });
            }
            if let Clause::RuleRef(ref n) = *rule.clause.unlabelled() {
                if *n == rule.name {
                    return Err(GrammarValidationError {
                        kind: GrammarValidationErrorKind::SelfOnlyRule(rule.name.clone())
                    });
                }
            }
            validate_clause(&rule.name, &rule.clause)?;
        }
        Ok(())
    }
}

fn validate_clause(rule_name: &str, clause: &Clause) -> Result<(), GrammarValidationError> {
    match *clause {
        Clause::Seq(ref subs) | Clause::First(ref subs) | Clause::Longest(ref subs) => {
            for sub in subs {
                validate_clause(rule_name, sub)?;
            }
            Ok(())
        }
        Clause::OneOrMore(ref sub)
        | Clause::ZeroOrMore(ref sub)
        | Clause::Optional(ref sub)
        | Clause::FollowedBy(ref sub)
        | Clause::NotFollowedBy(ref sub) => validate_clause(rule_name, sub),
        Clause::Label(ref lbl, ref sub) => {
            if lbl.is_empty() {
                return Err(GrammarValidationError {
                    kind: GrammarValidationErrorKind::MissingASTLabel(rule_name.to_string())
                });
            }
            validate_clause(rule_name, sub)
        }
        Clause::Literal(_)
        | Clause::CharSet(_)
        | Clause::AnyChar
        | Clause::Nothing
        | Clause::RuleRef(_) => Ok(())
    }
}

/// The various different possible grammar errors. These cover both the structural checks made by
/// [`GrammarAST::validate`](struct.GrammarAST.html#method.validate) and the resolution errors
/// detected while compiling the grammar.
#[derive(Debug, Eq, PartialEq)]
pub enum GrammarValidationErrorKind {
    EmptyGrammar,
    UnnamedRule,
    MissingASTLabel(String),
    SelfOnlyRule(String),
    DuplicatePrecedenceLevel(String, u32),
    CyclicRuleRef(String),
    UnknownRuleRef(String),
    UnknownLexRule(String)
}

#[derive(Debug, Eq, PartialEq)]
pub struct GrammarValidationError {
    pub kind: GrammarValidationErrorKind
}

impl fmt::Display for GrammarValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            GrammarValidationErrorKind::EmptyGrammar => write!(f, "Grammar does not define any rules"),
            GrammarValidationErrorKind::UnnamedRule => write!(f, "Rule has an empty name"),
            GrammarValidationErrorKind::MissingASTLabel(ref n) => {
                write!(f, "Empty AST node label in rule '{}'", n)
            }
            GrammarValidationErrorKind::SelfOnlyRule(ref n) => {
                write!(f, "Rule '{}' is only a reference to itself", n)
            }
            GrammarValidationErrorKind::DuplicatePrecedenceLevel(ref n, p) => {
                write!(f, "Duplicate precedence level {} for rule '{}'", p, n)
            }
            GrammarValidationErrorKind::CyclicRuleRef(ref n) => {
                write!(f, "Cyclic chain of rule references involving '{}'", n)
            }
            GrammarValidationErrorKind::UnknownRuleRef(ref n) => {
                write!(f, "Reference to unknown rule '{}'", n)
            }
            GrammarValidationErrorKind::UnknownLexRule(ref n) => {
                write!(f, "Unknown lex rule '{}'", n)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Clause, GrammarAST, GrammarValidationErrorKind, Rule};

    fn rule(name: &str, clause: Clause) -> Rule {
        Rule {
            name: name.to_string(),
            precedence: None,
            assoc: None,
            clause
        }
    }

    #[test]
    fn test_empty_grammar() {
        let ast = GrammarAST::new();
        match ast.validate() {
            Err(e) => assert_eq!(e.kind, GrammarValidationErrorKind::EmptyGrammar),
            Ok(_) => panic!()
        }
    }

    #[test]
    fn test_unnamed_rule() {
        let mut ast = GrammarAST::new();
        ast.add_rule(rule("", Clause::AnyChar));
        match ast.validate() {
            Err(e) => assert_eq!(e.kind, GrammarValidationErrorKind::UnnamedRule),
            Ok(_) => panic!()
        }
    }

    #[test]
    fn test_self_only_rule() {
        let mut ast = GrammarAST::new();
        ast.add_rule(rule(
            "A",
            Clause::Label("x".to_string(), Box::new(Clause::RuleRef("A".to_string())))
        ));
        match ast.validate() {
            Err(e) => assert_eq!(e.kind, GrammarValidationErrorKind::SelfOnlyRule("A".to_string())),
            Ok(_) => panic!()
        }
    }

    #[test]
    fn test_duplicate_precedence() {
        let mut ast = GrammarAST::new();
        ast.add_rule(rule("A", Clause::AnyChar));
        ast.add_rule(rule("A", Clause::Nothing));
        match ast.validate() {
            Err(e) => assert_eq!(
                e.kind,
                GrammarValidationErrorKind::DuplicatePrecedenceLevel("A".to_string(), 0)
            ),
            Ok(_) => panic!()
        }
    }

    #[test]
    fn test_empty_label() {
        let mut ast = GrammarAST::new();
        ast.add_rule(rule(
            "A",
            Clause::Seq(vec![
                Clause::Label("".to_string(), Box::new(Clause::AnyChar)),
                Clause::AnyChar,
            ])
        ));
        match ast.validate() {
            Err(e) => assert_eq!(
                e.kind,
                GrammarValidationErrorKind::MissingASTLabel("A".to_string())
            ),
            Ok(_) => panic!()
        }
    }

    #[test]
    fn test_valid() {
        let mut ast = GrammarAST::new();
        ast.add_rule(rule(
            "A",
            Clause::Seq(vec![
                Clause::Literal("a".to_string()),
                Clause::RuleRef("B".to_string()),
            ])
        ));
        ast.add_rule(rule("B", Clause::Literal("b".to_string())));
        assert!(ast.validate().is_ok());
    }
}
