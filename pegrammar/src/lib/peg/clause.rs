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

//! Compiled clauses. After compilation, clauses live in a flat arena owned by the grammar and
//! refer to each other by `CIdx`: structurally equal sub-expressions are interned to a single
//! arena slot, turning the rule trees into a shared graph. `ZeroOrMore` and `Optional` do not
//! survive compilation (they are lowered to ordered choices against `Nothing`), and `RuleRef`
//! placeholders only exist between lowering and rule resolution.

use std::fmt;

use num_traits::{PrimInt, Unsigned};

use idxnewtype::CIdx;
use peg::charset::{push_escaped, CharSet};

/// A terminal's payload. Terminals are matched directly against the input and have no
/// sub-clauses.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TermKind {
    /// Always matches, consuming nothing.
    Nothing,
    /// Matches any single character.
    AnyChar,
    Literal(String),
    CharSet(CharSet)
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClauseKind {
    Term(TermKind),
    Seq,
    First,
    Longest,
    OneOrMore,
    FollowedBy,
    NotFollowedBy,
    /// A by-name reference to another rule. Only present between lowering and resolution; a
    /// compiled grammar contains none of these.
    RuleRef(String)
}

/// A node in the compiled clause graph.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Clause<StorageT> {
    pub(crate) kind: ClauseKind,
    pub(crate) sub: Vec<CIdx<StorageT>>,
    /// AST node labels for each sub-clause position; parallel to `sub`.
    pub(crate) sub_labels: Vec<Option<String>>,
    /// Can this clause succeed without consuming any input? Computed once, after resolution.
    pub(crate) can_match_zero: bool,
    /// The clauses that must be re-evaluated at a position when this clause newly matches there.
    pub(crate) seed_parents: Vec<CIdx<StorageT>>,
    /// The names of the rules this clause is the root of (a clause can be the root of several
    /// rules once interning has merged their definitions).
    pub(crate) rule_names: Vec<String>,
    /// The canonical string form; two clauses are interned together iff these are equal.
    pub(crate) repr: String
}

impl<StorageT> Clause<StorageT> {
    pub(crate) fn new(kind: ClauseKind, sub: Vec<CIdx<StorageT>>, sub_labels: Vec<Option<String>>, repr: String) -> Clause<StorageT> {
        Clause {
            kind,
            sub,
            sub_labels,
            can_match_zero: false,
            seed_parents: Vec::new(),
            rule_names: Vec::new(),
            repr
        }
    }

    pub fn kind(&self) -> &ClauseKind {
        &self.kind
    }

    pub fn sub_clauses(&self) -> &[CIdx<StorageT>] {
        &self.sub
    }

    /// The AST node label attached to sub-clause `i`, if any.
    pub fn sub_label(&self, i: usize) -> Option<&str> {
        match self.sub_labels.get(i) {
            Some(&Some(ref l)) => Some(l),
            _ => None
        }
    }

    pub fn can_match_zero_chars(&self) -> bool {
        self.can_match_zero
    }

    pub fn seed_parent_clauses(&self) -> &[CIdx<StorageT>] {
        &self.seed_parents
    }

    pub fn rule_names(&self) -> &[String] {
        &self.rule_names
    }

    /// The canonical string form of this clause.
    pub fn repr(&self) -> &str {
        &self.repr
    }

    pub fn is_terminal(&self) -> bool {
        match self.kind {
            ClauseKind::Term(_) => true,
            _ => false
        }
    }

    pub fn is_nothing(&self) -> bool {
        match self.kind {
            ClauseKind::Term(TermKind::Nothing) => true,
            _ => false
        }
    }

    pub fn is_lookahead(&self) -> bool {
        match self.kind {
            ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => true,
            _ => false
        }
    }
}

impl<StorageT> fmt::Display for Clause<StorageT> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

// Binding tightness, used to decide where the canonical form needs parentheses. Atoms bind
// tightest; `Longest` loosest.
const PREC_ATOM: u8 = 5;
const PREC_POSTFIX: u8 = 4;
const PREC_PREFIX: u8 = 3;
const PREC_SEQ: u8 = 2;
const PREC_FIRST: u8 = 1;
const PREC_LONGEST: u8 = 0;

pub(crate) fn kind_prec(kind: &ClauseKind) -> u8 {
    match *kind {
        ClauseKind::Term(_) | ClauseKind::RuleRef(_) => PREC_ATOM,
        ClauseKind::OneOrMore => PREC_POSTFIX,
        ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => PREC_PREFIX,
        ClauseKind::Seq => PREC_SEQ,
        ClauseKind::First => PREC_FIRST,
        ClauseKind::Longest => PREC_LONGEST
    }
}

// Render one sub-clause position, parenthesising when the child binds more loosely than the
// context requires and prefixing its AST node label, if any.
fn render_sub<StorageT: PrimInt + Unsigned>(
    arena: &[Clause<StorageT>],
    sub: CIdx<StorageT>,
    label: Option<&str>,
    min_prec: u8
) -> String {
    let child = &arena[usize::from(sub)];
    let child_prec = kind_prec(&child.kind);
    match label {
        Some(l) => {
            let inner = if child_prec < PREC_POSTFIX {
                format!("({})", child.repr)
            } else {
                child.repr.clone()
            };
            if PREC_PREFIX < min_prec {
                format!("({}:{})", l, inner)
            } else {
                format!("{}:{}", l, inner)
            }
        }
        None => {
            if child_prec < min_prec {
                format!("({})", child.repr)
            } else {
                child.repr.clone()
            }
        }
    }
}

/// Build the canonical string form for a clause whose sub-clauses are already in `arena`.
pub(crate) fn render<StorageT: PrimInt + Unsigned>(
    arena: &[Clause<StorageT>],
    kind: &ClauseKind,
    sub: &[CIdx<StorageT>],
    sub_labels: &[Option<String>]
) -> String {
    let label = |i: usize| match sub_labels.get(i) {
        Some(&Some(ref l)) => Some(l.as_str()),
        _ => None
    };
    match *kind {
        ClauseKind::Term(TermKind::Nothing) => "()".to_string(),
        ClauseKind::Term(TermKind::AnyChar) => ".".to_string(),
        ClauseKind::Term(TermKind::Literal(ref s)) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for c in s.chars() {
                push_escaped(&mut out, c, "'");
            }
            out.push('\'');
            out
        }
        ClauseKind::Term(TermKind::CharSet(ref cs)) => format!("{}", cs),
        ClauseKind::RuleRef(ref n) => n.clone(),
        ClauseKind::Seq => sub
            .iter()
            .enumerate()
            .map(|(i, &s)| render_sub(arena, s, label(i), PREC_PREFIX))
            .collect::<Vec<_>>()
            .join(" "),
        ClauseKind::First => sub
            .iter()
            .enumerate()
            .map(|(i, &s)| render_sub(arena, s, label(i), PREC_SEQ))
            .collect::<Vec<_>>()
            .join(" / "),
        ClauseKind::Longest => sub
            .iter()
            .enumerate()
            .map(|(i, &s)| render_sub(arena, s, label(i), PREC_FIRST))
            .collect::<Vec<_>>()
            .join(" | "),
        ClauseKind::OneOrMore => format!("{}+", render_sub(arena, sub[0], label(0), PREC_ATOM)),
        ClauseKind::FollowedBy => format!("&{}", render_sub(arena, sub[0], label(0), PREC_POSTFIX)),
        ClauseKind::NotFollowedBy => format!("!{}", render_sub(arena, sub[0], label(0), PREC_POSTFIX))
    }
}
