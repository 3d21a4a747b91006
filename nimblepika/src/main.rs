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

extern crate getopts;
extern crate pegrammar;
extern crate pikapar;

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process;

use getopts::Options;

use pegrammar::peg::grammar::PegGrammar;
use pegrammar::{peg_to_grammar, peg_to_grammar_with_lex, PegError};
use pikapar::{asts, parse};

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = match path.file_name() {
        Some(m) => m.to_str().unwrap(),
        None => "nimblepika"
    };
    if !msg.is_empty() {
        eprintln!("{}", msg);
    }
    eprintln!(
        "Usage: {} [-h] [-l <lex-rule>] [-r <start-rule>] <grammar.peg> <input file>",
        leaf
    );
    process::exit(1);
}

fn read_file(path: &str) -> String {
    let mut f = match File::open(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Can't open file {}: {}", path, e);
            process::exit(1);
        }
    };
    let mut s = String::new();
    f.read_to_string(&mut s).unwrap();
    s
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optopt("l", "lex-rule", "Match the named rule top-down as a lexer", "RULE")
        .optopt("r", "start-rule", "Report matches and errors for the named rule", "RULE")
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str())
    };

    if matches.opt_present("h") || matches.free.len() != 2 {
        usage(prog, "");
    }

    let grm_src = read_file(&matches.free[0]);
    let input = read_file(&matches.free[1]);

    let res = match matches.opt_str("l") {
        Some(ref lex_rule) => peg_to_grammar_with_lex(&grm_src, lex_rule),
        None => peg_to_grammar(&grm_src)
    };
    let grm: PegGrammar<u32> = match res {
        Ok(grm) => grm,
        Err(PegError::PegParserError(e)) => {
            eprintln!("{}: {}", &matches.free[0], e);
            process::exit(1);
        }
        Err(PegError::GrammarValidationError(e)) => {
            eprintln!("{}: {}", &matches.free[0], e);
            process::exit(1);
        }
    };

    let start_rule = match matches.opt_str("r") {
        Some(r) => r,
        None => grm.rule_name(grm.start_rule_idx()).to_string()
    };

    let memo = parse(&grm, &input);
    let asts = match asts(&memo, &start_rule) {
        Ok(asts) => asts,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    for ast in &asts {
        print!("{}", ast.pp(&input));
    }

    let errors = memo.syntax_errors(&[start_rule.as_str()]).unwrap();
    if !errors.is_empty() {
        for (start, &(end, text)) in &errors {
            eprintln!("Syntax error at {}..{}: {:?}", start, end, text);
        }
        process::exit(1);
    }
}
