//! Parsing
//!
//! This module is responsible for turning the source code from its string form into an AST.
//! The main interface is [parse] which takes a string and produces an [ast::Module] together
//! with any diagnostics.
//!
//! Internally, parsing works in two phases:
//! - the [lexer] scans the source text and turns it into a stream of tokens
//! - the [parser] builds the AST from these tokens, recovering at statement
//!   boundaries so one run reports as many problems as possible
//!
//! The lexer relies on the [chumsky] crate.

use chumsky::error::SimpleReason;
use chumsky::{prelude::*, Stream};

use crate::ast;
use crate::common::Span;
use crate::diagnostics::Diagnostic;

mod lexer;
mod parser;

pub use lexer::Token;

/// Parse one module's source code into an AST
///
/// Always produces a module, even for broken input. Statements that could not
/// be parsed are dropped and reported through the returned diagnostics.
pub fn parse(name: &str, source: &str) -> (ast::Module, Vec<Diagnostic>) {
    let eoi = Span::marker(source.len());

    let chars = source
        .char_indices()
        .map(|(i, c)| (c, Span::new(i, i + c.len_utf8())));

    let (tokens, lex_errs) = lexer::lex().parse_recovery(Stream::from_iter(eoi, chars));

    let mut diagnostics: Vec<Diagnostic> = lex_errs.into_iter().map(build_lex_error).collect();

    let tokens = tokens.unwrap_or_default();
    let (body, parse_diagnostics) = parser::parse_tokens(&tokens, eoi);
    diagnostics.extend(parse_diagnostics);

    (
        ast::Module {
            name: name.to_string(),
            body,
        },
        diagnostics,
    )
}

/// Turn a chumsky lexer error into our diagnostic type
fn build_lex_error(err: Simple<char, Span>) -> Diagnostic {
    match err.reason() {
        SimpleReason::Custom(_) => Diagnostic::UnterminatedString { span: err.span() },
        _ => match err.found() {
            Some(c) => Diagnostic::IllegalCharacter {
                character: *c,
                span: err.span(),
            },
            None => Diagnostic::UnexpectedToken {
                token: String::from("end of file"),
                expected: None,
                span: err.span(),
            },
        },
    }
}
