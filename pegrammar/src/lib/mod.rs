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

//! A library for manipulating Parsing Expression Grammars (PEGs) and compiling them into the
//! clause graph consumed by a bottom-up memoising parser. PEG terminology is used loosely by
//! different tools, so this library sticks to the following guidelines:
//!
//!   * A *grammar* is an ordered sequence of *rules*; the first rule is the start rule.
//!   * A *rule* maps a name (and, optionally, a precedence level and associativity) to a
//!     *clause*.
//!   * A *clause* is a parsing expression: a terminal, a sequence, an ordered or longest-match
//!     choice, a repetition, a lookahead, or a reference to another rule.
//!
//! Rules are written either programmatically (see [`peg::ast`](peg/ast/index.html)) or in the
//! textual notation understood by [`peg::parser`](peg/parser/index.html):
//!
//! ```text
//! Expr[0,L] <- Expr '+' Expr ;
//! Expr[1]   <- [0-9]+ ;
//! ```
//!
//! Compilation ([`peg::grammar::PegGrammar`](peg/grammar/struct.PegGrammar.html)) rewrites
//! precedence levels into a layered form, interns structurally equal clauses and resolves rule
//! references, yielding an immutable clause graph. cfgrammar-style guarantees hold for the
//! result:
//!
//!   * Clauses are numbered from `0` to `clauses_len() - 1` (inclusive), children below parents
//!     up to rule-recursion back-edges.
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * The `StorageT` type used to store clause and rule indices can be infallibly converted
//!     into `usize` (see [`CIdx`](struct.CIdx.html) and friends for more details).

extern crate indexmap;
#[macro_use]
extern crate lazy_static;
extern crate num_traits;
extern crate regex;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;
extern crate vob;

mod idxnewtype;
pub mod peg;

/// A type specifically for clause indices; also one for rule indices.
pub use idxnewtype::{CIdx, RIdx};

use std::fmt;

use peg::ast::GrammarValidationError;
use peg::grammar::PegGrammar;
use peg::parser::{parse_peg, PegParserError};

#[derive(Debug)]
pub enum PegError {
    PegParserError(PegParserError),
    GrammarValidationError(GrammarValidationError)
}

impl From<PegParserError> for PegError {
    fn from(err: PegParserError) -> PegError {
        PegError::PegParserError(err)
    }
}

impl From<GrammarValidationError> for PegError {
    fn from(err: GrammarValidationError) -> PegError {
        PegError::GrammarValidationError(err)
    }
}

impl fmt::Display for PegError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PegError::PegParserError(ref e) => e.fmt(f),
            PegError::GrammarValidationError(ref e) => e.fmt(f)
        }
    }
}

/// Parse the textual PEG in `s` and compile it into a grammar.
pub fn peg_to_grammar(s: &str) -> Result<PegGrammar<u32>, PegError> {
    let ast = parse_peg(s)?;
    Ok(PegGrammar::new(&ast, None)?)
}

/// As [`peg_to_grammar`](fn.peg_to_grammar.html), additionally declaring the rule named
/// `lex_rule` as the grammar's lex rule.
pub fn peg_to_grammar_with_lex(s: &str, lex_rule: &str) -> Result<PegGrammar<u32>, PegError> {
    let ast = parse_peg(s)?;
    Ok(PegGrammar::new(&ast, Some(lex_rule))?)
}

#[cfg(test)]
mod test {
    use super::peg_to_grammar;

    #[test]
    fn test_peg_to_grammar() {
        let grm = peg_to_grammar("S <- 'a' S / 'a';").unwrap();
        assert!(grm.rule_idx("S").is_some());
        assert!(grm.rule_idx("T").is_none());
    }

    #[test]
    fn test_round_trip_canonical_form() {
        // Rendering every rule's canonical clause form and re-parsing it must reproduce an
        // equivalent grammar (up to interning and desugaring).
        let src = "S <- (Item (',' Item)*)? ;\n\
                   Item <- name:[a-z]+ &'=' '=' val:[0-9]+ / !'#' . ;";
        let grm1 = peg_to_grammar(src).unwrap();
        let mut src2 = String::new();
        for ridx in grm1.iter_rule_idxs() {
            src2.push_str(&format!(
                "{} <- {} ;\n",
                grm1.rule_name(ridx),
                grm1.clause(grm1.rule_clause(ridx)).repr()
            ));
        }
        let grm2 = peg_to_grammar(&src2).unwrap();
        for (r1, r2) in grm1.iter_rule_idxs().zip(grm2.iter_rule_idxs()) {
            assert_eq!(grm1.rule_name(r1), grm2.rule_name(r2));
            assert_eq!(
                grm1.clause(grm1.rule_clause(r1)).repr(),
                grm2.clause(grm2.rule_clause(r2)).repr()
            );
        }
        assert_eq!(
            usize::from(grm1.clauses_len()),
            usize::from(grm2.clauses_len())
        );
    }
}
