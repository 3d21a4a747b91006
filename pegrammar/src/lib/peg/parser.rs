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

//! A parser for the textual PEG notation:
//!
//! ```text
//! RuleName[prec[,assoc]] <- [Label:]Clause ;
//! ```
//!
//! where juxtaposition is sequencing, `/` is ordered choice, `|` is longest-match choice,
//! postfix `+`/`*`/`?` are the usual repetitions, prefix `&`/`!` are the lookaheads, `[...]` is a
//! character class (`-` ranges, leading `^` negation), `'...'`/`"..."` are literals, `.` matches
//! any character, `()` matches nothing, an identifier references a rule and `Label:` attaches an
//! AST node label. `#` starts a comment running to the end of the line. `prec` is a non-negative
//! integer (higher binds tighter); `assoc` is `L` or `R`.

use regex::Regex;
use std::fmt;

use peg::ast::{Assoc, Clause, GrammarAST, Rule};
use peg::charset::CharSet;

/// The various different possible notation parser errors.
#[derive(Debug, Eq, PartialEq)]
pub enum PegParserErrorKind {
    IllegalName,
    IllegalPrecedence,
    MissingArrow,
    MissingSemicolon,
    MissingCloseParen,
    UnterminatedLiteral,
    UnterminatedCharClass,
    IllegalEscape,
    EmptyClause,
    PrematureEnd
}

/// Any error from the notation parser returns an instance of this struct.
#[derive(Debug, Eq, PartialEq)]
pub struct PegParserError {
    pub kind: PegParserErrorKind,
    pub off: usize
}

impl fmt::Display for PegParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self.kind {
            PegParserErrorKind::IllegalName => "Illegal rule name",
            PegParserErrorKind::IllegalPrecedence => "Illegal precedence annotation",
            PegParserErrorKind::MissingArrow => "Missing '<-'",
            PegParserErrorKind::MissingSemicolon => "Missing ';'",
            PegParserErrorKind::MissingCloseParen => "Missing ')'",
            PegParserErrorKind::UnterminatedLiteral => "Unterminated literal",
            PegParserErrorKind::UnterminatedCharClass => "Unterminated character class",
            PegParserErrorKind::IllegalEscape => "Illegal escape sequence",
            PegParserErrorKind::EmptyClause => "Expected a clause",
            PegParserErrorKind::PrematureEnd => "File ends prematurely"
        };
        write!(f, "{} at offset {}", s, self.off)
    }
}

type PegResult<T> = Result<T, PegParserError>;

lazy_static! {
    static ref RE_NAME: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").unwrap();
}

/// Parse the translation of `src` into a `GrammarAST`. The result is unvalidated: pass it to
/// [`GrammarAST::validate`](../ast/struct.GrammarAST.html#method.validate) or straight to
/// [`PegGrammar::new`](../grammar/struct.PegGrammar.html#method.new).
pub fn parse_peg(src: &str) -> PegResult<GrammarAST> {
    PegParser { src }.parse()
}

struct PegParser<'a> {
    src: &'a str
}

impl<'a> PegParser<'a> {
    fn parse(&self) -> PegResult<GrammarAST> {
        let mut ast = GrammarAST::new();
        let mut i = self.skip_ws(0);
        while i < self.src.len() {
            let (j, rule) = self.parse_rule(i)?;
            ast.add_rule(rule);
            i = self.skip_ws(j);
        }
        Ok(ast)
    }

    fn parse_rule(&self, i: usize) -> PegResult<(usize, Rule)> {
        let (i, name) = self.parse_name(i)?;
        let (i, precedence, assoc) = self.parse_annotation(i)?;
        let i = self.skip_ws(i);
        let i = self.expect(i, "<-", PegParserErrorKind::MissingArrow)?;
        let i = self.skip_ws(i);
        let (i, clause) = self.parse_alt(i)?;
        let i = self.skip_ws(i);
        let i = self.expect(i, ";", PegParserErrorKind::MissingSemicolon)?;
        Ok((
            i,
            Rule {
                name,
                precedence,
                assoc,
                clause
            }
        ))
    }

    fn parse_name(&self, i: usize) -> PegResult<(usize, String)> {
        match RE_NAME.find(&self.src[i..]) {
            Some(m) => Ok((i + m.end(), m.as_str().to_string())),
            None => Err(self.err(PegParserErrorKind::IllegalName, i))
        }
    }

    // The optional `[prec[,assoc]]` annotation. It must follow the rule name without intervening
    // whitespace, which is also what keeps it distinct from a character class in clause position.
    fn parse_annotation(&self, i: usize) -> PegResult<(usize, Option<u32>, Option<Assoc>)> {
        if self.peek(i) != Some('[') {
            return Ok((i, None, None));
        }
        let mut j = i + 1;
        let digits = j;
        while let Some(c) = self.peek(j) {
            if c.is_ascii_digit() {
                j += 1;
            } else {
                break;
            }
        }
        if j == digits {
            return Err(self.err(PegParserErrorKind::IllegalPrecedence, i));
        }
        let prec = self.src[digits..j]
            .parse::<u32>()
            .map_err(|_| self.err(PegParserErrorKind::IllegalPrecedence, digits))?;
        let mut assoc = None;
        if self.peek(j) == Some(',') {
            j += 1;
            assoc = match self.peek(j) {
                Some('L') => Some(Assoc::Left),
                Some('R') => Some(Assoc::Right),
                _ => return Err(self.err(PegParserErrorKind::IllegalPrecedence, j))
            };
            j += 1;
        }
        if self.peek(j) != Some(']') {
            return Err(self.err(PegParserErrorKind::IllegalPrecedence, j));
        }
        Ok((j + 1, Some(prec), assoc))
    }

    // alt: first ('|' first)*
    fn parse_alt(&self, i: usize) -> PegResult<(usize, Clause)> {
        let (mut i, first) = self.parse_first(i)?;
        let mut subs = vec![first];
        loop {
            let j = self.skip_ws(i);
            if self.peek(j) != Some('|') {
                break;
            }
            let j = self.skip_ws(j + 1);
            let (j, c) = self.parse_first(j)?;
            subs.push(c);
            i = j;
        }
        if subs.len() == 1 {
            Ok((i, subs.pop().unwrap()))
        } else {
            Ok((i, Clause::Longest(subs)))
        }
    }

    // first: seq ('/' seq)*
    fn parse_first(&self, i: usize) -> PegResult<(usize, Clause)> {
        let (mut i, first) = self.parse_seq(i)?;
        let mut subs = vec![first];
        loop {
            let j = self.skip_ws(i);
            if self.peek(j) != Some('/') {
                break;
            }
            let j = self.skip_ws(j + 1);
            let (j, c) = self.parse_seq(j)?;
            subs.push(c);
            i = j;
        }
        if subs.len() == 1 {
            Ok((i, subs.pop().unwrap()))
        } else {
            Ok((i, Clause::First(subs)))
        }
    }

    // seq: labelled+, by juxtaposition
    fn parse_seq(&self, i: usize) -> PegResult<(usize, Clause)> {
        let (mut i, first) = self.parse_labelled(i)?;
        let mut subs = vec![first];
        loop {
            let j = self.skip_ws(i);
            if !self.starts_clause(j) || self.at_rule_start(j) {
                break;
            }
            let (j, c) = self.parse_labelled(j)?;
            subs.push(c);
            i = j;
        }
        if subs.len() == 1 {
            Ok((i, subs.pop().unwrap()))
        } else {
            Ok((i, Clause::Seq(subs)))
        }
    }

    fn starts_clause(&self, i: usize) -> bool {
        match self.peek(i) {
            Some('\'') | Some('"') | Some('(') | Some('[') | Some('.') | Some('&') | Some('!') => {
                true
            }
            Some(c) => c == '_' || c.is_ascii_alphabetic(),
            None => false
        }
    }

    // Is `i` the start of the next rule definition? Needed because a sequence and the following
    // rule's head are only separated by the upcoming `<-`.
    fn at_rule_start(&self, i: usize) -> bool {
        let m = match RE_NAME.find(&self.src[i..]) {
            Some(m) => m,
            None => return false
        };
        let mut j = i + m.end();
        if self.peek(j) == Some('[') {
            let mut k = j + 1;
            loop {
                match self.peek(k) {
                    Some(']') => {
                        j = k + 1;
                        break;
                    }
                    Some(c) if c.is_ascii_digit() || c == ',' || c == 'L' || c == 'R' => k += 1,
                    _ => return false
                }
            }
        }
        let j = self.skip_ws(j);
        self.src[j..].starts_with("<-")
    }

    // labelled: (name ':')? prefix
    fn parse_labelled(&self, i: usize) -> PegResult<(usize, Clause)> {
        if let Some(m) = RE_NAME.find(&self.src[i..]) {
            let j = self.skip_ws(i + m.end());
            if self.peek(j) == Some(':') {
                let k = self.skip_ws(j + 1);
                let (k, c) = self.parse_prefix(k)?;
                return Ok((k, Clause::Label(m.as_str().to_string(), Box::new(c))));
            }
        }
        self.parse_prefix(i)
    }

    // prefix: ('&' | '!') prefix | suffix
    fn parse_prefix(&self, i: usize) -> PegResult<(usize, Clause)> {
        match self.peek(i) {
            Some('&') => {
                let (j, c) = self.parse_prefix(self.skip_ws(i + 1))?;
                Ok((j, Clause::FollowedBy(Box::new(c))))
            }
            Some('!') => {
                let (j, c) = self.parse_prefix(self.skip_ws(i + 1))?;
                Ok((j, Clause::NotFollowedBy(Box::new(c))))
            }
            _ => self.parse_suffix(i)
        }
    }

    // suffix: primary ('+' | '*' | '?')*
    fn parse_suffix(&self, i: usize) -> PegResult<(usize, Clause)> {
        let (mut i, mut c) = self.parse_primary(i)?;
        loop {
            match self.peek(i) {
                Some('+') => c = Clause::OneOrMore(Box::new(c)),
                Some('*') => c = Clause::ZeroOrMore(Box::new(c)),
                Some('?') => c = Clause::Optional(Box::new(c)),
                _ => break
            }
            i += 1;
        }
        Ok((i, c))
    }

    fn parse_primary(&self, i: usize) -> PegResult<(usize, Clause)> {
        match self.peek(i) {
            Some('(') => {
                let j = self.skip_ws(i + 1);
                if self.peek(j) == Some(')') {
                    return Ok((j + 1, Clause::Nothing));
                }
                let (j, c) = self.parse_alt(j)?;
                let j = self.skip_ws(j);
                let j = self.expect(j, ")", PegParserErrorKind::MissingCloseParen)?;
                Ok((j, c))
            }
            Some(q @ '\'') | Some(q @ '"') => self.parse_literal(i, q),
            Some('[') => self.parse_char_class(i),
            Some('.') => Ok((i + 1, Clause::AnyChar)),
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {
                let (j, name) = self.parse_name(i)?;
                Ok((j, Clause::RuleRef(name)))
            }
            Some(_) => Err(self.err(PegParserErrorKind::EmptyClause, i)),
            None => Err(self.err(PegParserErrorKind::PrematureEnd, i))
        }
    }

    fn parse_literal(&self, i: usize, quote: char) -> PegResult<(usize, Clause)> {
        let mut s = String::new();
        let mut j = i + 1;
        loop {
            match self.peek(j) {
                Some(c) if c == quote => return Ok((j + 1, Clause::Literal(s))),
                Some('\\') => {
                    let (k, c) = self.parse_escape(j + 1)?;
                    s.push(c);
                    j = k;
                }
                Some(c) => {
                    s.push(c);
                    j += c.len_utf8();
                }
                None => return Err(self.err(PegParserErrorKind::UnterminatedLiteral, i))
            }
        }
    }

    fn parse_char_class(&self, i: usize) -> PegResult<(usize, Clause)> {
        let mut j = i + 1;
        let negated = if self.peek(j) == Some('^') {
            j += 1;
            true
        } else {
            false
        };
        let mut ranges = Vec::new();
        loop {
            match self.peek(j) {
                Some(']') => {
                    let mut cs = CharSet::from_ranges(ranges);
                    if negated {
                        cs = cs.negated();
                    }
                    return Ok((j + 1, Clause::CharSet(cs)));
                }
                Some(_) => {
                    let (k, lo) = self.parse_class_char(j)?;
                    if self.peek(k) == Some('-') && self.peek(k + 1) != Some(']') {
                        let (k2, hi) = self.parse_class_char(k + 1)?;
                        ranges.push((lo, hi));
                        j = k2;
                    } else {
                        ranges.push((lo, lo));
                        j = k;
                    }
                }
                None => return Err(self.err(PegParserErrorKind::UnterminatedCharClass, i))
            }
        }
    }

    fn parse_class_char(&self, i: usize) -> PegResult<(usize, char)> {
        match self.peek(i) {
            Some('\\') => self.parse_escape(i + 1),
            Some(c) => Ok((i + c.len_utf8(), c)),
            None => Err(self.err(PegParserErrorKind::UnterminatedCharClass, i))
        }
    }

    // `i` points just past a backslash.
    fn parse_escape(&self, i: usize) -> PegResult<(usize, char)> {
        match self.peek(i) {
            Some('n') => Ok((i + 1, '\n')),
            Some('r') => Ok((i + 1, '\r')),
            Some('t') => Ok((i + 1, '\t')),
            Some('\\') => Ok((i + 1, '\\')),
            Some('\'') => Ok((i + 1, '\'')),
            Some('"') => Ok((i + 1, '"')),
            Some(']') => Ok((i + 1, ']')),
            Some('[') => Ok((i + 1, '[')),
            Some('^') => Ok((i + 1, '^')),
            Some('-') => Ok((i + 1, '-')),
            Some('u') => {
                if i + 5 > self.src.len() || !self.src.is_char_boundary(i + 5) {
                    return Err(self.err(PegParserErrorKind::IllegalEscape, i));
                }
                let v = u32::from_str_radix(&self.src[i + 1..i + 5], 16)
                    .map_err(|_| self.err(PegParserErrorKind::IllegalEscape, i))?;
                match ::std::char::from_u32(v) {
                    Some(c) => Ok((i + 5, c)),
                    None => Err(self.err(PegParserErrorKind::IllegalEscape, i))
                }
            }
            _ => Err(self.err(PegParserErrorKind::IllegalEscape, i))
        }
    }

    fn skip_ws(&self, mut i: usize) -> usize {
        while i < self.src.len() {
            let c = match self.peek(i) {
                Some(c) => c,
                None => break
            };
            if c.is_whitespace() {
                i += c.len_utf8();
            } else if c == '#' {
                while let Some(c) = self.peek(i) {
                    i += c.len_utf8();
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
        i
    }

    fn peek(&self, i: usize) -> Option<char> {
        if i >= self.src.len() {
            None
        } else {
            self.src[i..].chars().next()
        }
    }

    fn expect(&self, i: usize, s: &str, kind: PegParserErrorKind) -> PegResult<usize> {
        if self.src[i..].starts_with(s) {
            Ok(i + s.len())
        } else {
            Err(self.err(kind, i))
        }
    }

    fn err(&self, kind: PegParserErrorKind, off: usize) -> PegParserError {
        PegParserError { kind, off }
    }
}

#[cfg(test)]
mod test {
    use super::{parse_peg, PegParserErrorKind};
    use peg::ast::{Assoc, Clause};

    fn kind_of(src: &str) -> PegParserErrorKind {
        match parse_peg(src) {
            Err(e) => e.kind,
            Ok(_) => panic!("parsed unexpectedly: {}", src)
        }
    }

    #[test]
    fn test_basic_rule() {
        let ast = parse_peg("S <- 'a' T / 'b'; T <- [0-9]+;").unwrap();
        assert_eq!(ast.rules.len(), 2);
        assert_eq!(ast.rules[0].name, "S");
        match ast.rules[0].clause {
            Clause::First(ref subs) => {
                assert_eq!(subs.len(), 2);
                match subs[0] {
                    Clause::Seq(ref ss) => assert_eq!(ss.len(), 2),
                    _ => panic!()
                }
            }
            _ => panic!()
        }
        match ast.rules[1].clause {
            Clause::OneOrMore(ref sub) => match **sub {
                Clause::CharSet(ref cs) => assert!(cs.contains('5')),
                _ => panic!()
            },
            _ => panic!()
        }
    }

    #[test]
    fn test_precedence_annotation() {
        let ast = parse_peg("E[0,L] <- E '+' E; E[1] <- [0-9]; F[2,R] <- 'x';").unwrap();
        assert_eq!(ast.rules[0].precedence, Some(0));
        assert_eq!(ast.rules[0].assoc, Some(Assoc::Left));
        assert_eq!(ast.rules[1].precedence, Some(1));
        assert_eq!(ast.rules[1].assoc, None);
        assert_eq!(ast.rules[2].assoc, Some(Assoc::Right));
    }

    #[test]
    fn test_rule_boundary_lookahead() {
        // The sequence in S must stop before the head of T, not swallow it as a reference.
        let ast = parse_peg("S <- A B; T <- 'c';\nA <- 'a'; B <- 'b';").unwrap();
        assert_eq!(ast.rules.len(), 4);
        match ast.rules[0].clause {
            Clause::Seq(ref subs) => assert_eq!(subs.len(), 2),
            _ => panic!()
        }
    }

    #[test]
    fn test_labels() {
        let ast = parse_peg("S <- sum:(lhs:'a' '+' rhs:'b');").unwrap();
        match ast.rules[0].clause {
            Clause::Label(ref l, ref inner) => {
                assert_eq!(l, "sum");
                match **inner {
                    Clause::Seq(ref subs) => match subs[0] {
                        Clause::Label(ref l2, _) => assert_eq!(l2, "lhs"),
                        _ => panic!()
                    },
                    _ => panic!()
                }
            }
            _ => panic!()
        }
    }

    #[test]
    fn test_lookaheads_and_suffixes() {
        let ast = parse_peg("S <- &'a' !'b' 'c'* 'd'? ();").unwrap();
        match ast.rules[0].clause {
            Clause::Seq(ref subs) => {
                assert_eq!(subs.len(), 5);
                match subs[0] {
                    Clause::FollowedBy(_) => (),
                    _ => panic!()
                }
                match subs[1] {
                    Clause::NotFollowedBy(_) => (),
                    _ => panic!()
                }
                match subs[2] {
                    Clause::ZeroOrMore(_) => (),
                    _ => panic!()
                }
                match subs[3] {
                    Clause::Optional(_) => (),
                    _ => panic!()
                }
                match subs[4] {
                    Clause::Nothing => (),
                    _ => panic!()
                }
            }
            _ => panic!()
        }
    }

    #[test]
    fn test_longest_choice() {
        let ast = parse_peg("S <- 'a' / 'b' | 'c';").unwrap();
        match ast.rules[0].clause {
            Clause::Longest(ref subs) => {
                assert_eq!(subs.len(), 2);
                match subs[0] {
                    Clause::First(_) => (),
                    _ => panic!()
                }
            }
            _ => panic!()
        }
    }

    #[test]
    fn test_char_class_escapes() {
        let ast = parse_peg("S <- [^a-z\\]\\-\\u0041];").unwrap();
        match ast.rules[0].clause {
            Clause::CharSet(ref cs) => {
                assert!(cs.is_negated());
                assert!(!cs.contains('m'));
                assert!(!cs.contains(']'));
                assert!(!cs.contains('-'));
                assert!(!cs.contains('A'));
                assert!(cs.contains('B'));
            }
            _ => panic!()
        }
    }

    #[test]
    fn test_literal_escapes() {
        let ast = parse_peg(r#"S <- 'a\n\t\'\\' "b\"";"#).unwrap();
        match ast.rules[0].clause {
            Clause::Seq(ref subs) => {
                match subs[0] {
                    Clause::Literal(ref s) => assert_eq!(s, "a\n\t'\\"),
                    _ => panic!()
                }
                match subs[1] {
                    Clause::Literal(ref s) => assert_eq!(s, "b\""),
                    _ => panic!()
                }
            }
            _ => panic!()
        }
    }

    #[test]
    fn test_comments() {
        let ast = parse_peg("# leading comment\nS <- 'a'; # trailing\n# end\n").unwrap();
        assert_eq!(ast.rules.len(), 1);
    }

    #[test]
    fn test_errors() {
        assert_eq!(kind_of("S 'a';"), PegParserErrorKind::MissingArrow);
        assert_eq!(kind_of("S <- 'a'"), PegParserErrorKind::MissingSemicolon);
        assert_eq!(kind_of("S <- 'a"), PegParserErrorKind::UnterminatedLiteral);
        assert_eq!(kind_of("S <- [a-z;"), PegParserErrorKind::UnterminatedCharClass);
        assert_eq!(kind_of("S <- 'a\\q';"), PegParserErrorKind::IllegalEscape);
        assert_eq!(kind_of("S <- ('a';"), PegParserErrorKind::MissingCloseParen);
        assert_eq!(kind_of("S[x] <- 'a';"), PegParserErrorKind::IllegalPrecedence);
        assert_eq!(kind_of("S <- ;"), PegParserErrorKind::EmptyClause);
        assert_eq!(kind_of("S <- "), PegParserErrorKind::PrematureEnd);
        assert_eq!(kind_of("%foo"), PegParserErrorKind::IllegalName);
    }

    #[test]
    fn test_error_offset() {
        match parse_peg("S <- 'a'") {
            Err(e) => assert_eq!(e.off, 8),
            Ok(_) => panic!()
        }
    }
}
