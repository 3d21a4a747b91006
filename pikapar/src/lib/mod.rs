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

//! A pika parser: the bottom-up, right-to-left dual of packrat parsing. Given a grammar
//! compiled by the `pegrammar` crate and an input string, [`parse`](parser/fn.parse.html)
//! returns a [`MemoTable`](memotable/struct.MemoTable.html) holding the best match of every
//! clause at every position it reached — parsing itself never fails. Because the whole match
//! universe is retained, error reporting and recovery are memo table queries: enumerate a
//! rule's non-overlapping matches, walk its matches by position, or compute the input spans no
//! rule covers. Left-recursive grammars work directly (the grammar compiler's precedence
//! rewrite plus bottom-up match growth), and grammars may nominate a lex rule to be matched
//! top-down, keeping purely lexical terminals out of the table.

extern crate fnv;
extern crate num_traits;
extern crate pegrammar;
extern crate vob;

pub mod astree;
pub mod memotable;
pub mod parser;

pub use astree::{asts, ASTNode};
pub use memotable::{Match, MemoKey, MemoTable, MemoUpdate, UnknownRuleError};
pub use parser::{parse, parse_finish_by, ParseInterruptedError};
