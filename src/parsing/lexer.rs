use std::fmt;

use chumsky::prelude::*;

use crate::common::{Span, Spanned};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    FStr(Vec<Fragment>),
    Ident(String),

    KwClass,
    KwInterface,
    KwEnum,
    KwData,
    KwAbstract,
    KwFinal,
    KwStatic,
    KwDef,
    KwExtends,
    KwImplements,
    KwFrom,
    KwImport,
    KwReturn,
    KwRaise,
    KwPass,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwIn,
    KwAnd,
    KwOr,
    KwNot,
    True,
    False,
    None,

    Assign,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Arrow,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Comma,
    Colon,
    Semicolon,
    Dot,
}

/// One piece of an f-string: literal text or an embedded expression,
/// kept as raw tokens until the parser gets to it
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Lit(String),
    Expr(Vec<Spanned<Token>>),
}

pub fn lex() -> impl Parser<char, Vec<Spanned<Token>>, Error = Simple<char, Span>> {
    let token = recursive(|token| {
        let float = text::int(10)
            .then(just('.').ignore_then(text::digits(10)))
            .map(|(whole, frac): (String, String)| format!("{whole}.{frac}"))
            .from_str()
            .unwrapped()
            .map(Token::Float);

        let integer = text::int(10).from_str().unwrapped().map(Token::Int);

        let escape = just('\\').ignore_then(choice((
            just('\\'),
            just('"'),
            just('\''),
            just('n').to('\n'),
            just('t').to('\t'),
        )));

        // String literals come in both quote styles
        let quoted = |quote: char| {
            just(quote)
                .ignore_then(
                    filter(move |c: &char| *c != quote && *c != '\\' && *c != '\n')
                        .or(escape.clone())
                        .repeated()
                        .collect::<String>(),
                )
                .then(just(quote).or_not())
                .validate(|(content, closed), span, emit| {
                    if closed.is_none() {
                        emit(Simple::custom(span, "unterminated string literal"));
                    }
                    Token::Str(content)
                })
        };

        let string = quoted('"').or(quoted('\''));

        // Tokens of an embedded expression, everything up to the closing brace
        let fragment_token = token
            .clone()
            .map_with_span(|tok, span| (tok, span))
            .try_map(|(tok, span), _| {
                if tok == Token::RBrace {
                    Err(Simple::custom(span, "end of embedded expression"))
                } else {
                    Ok((tok, span))
                }
            });

        let fragment = choice((
            just('{')
                .ignore_then(fragment_token.padded().repeated())
                .then_ignore(just('}'))
                .map(Fragment::Expr),
            filter(|c: &char| !matches!(c, '"' | '\\' | '\n' | '{' | '}'))
                .or(escape)
                .repeated()
                .at_least(1)
                .collect::<String>()
                .map(Fragment::Lit),
        ));

        let fstring = just('f')
            .ignore_then(just('"'))
            .ignore_then(fragment.repeated())
            .then(just('"').or_not())
            .validate(|(fragments, closed), span, emit| {
                if closed.is_none() {
                    emit(Simple::custom(span, "unterminated string literal"));
                }
                Token::FStr(fragments)
            });

        let symbol = choice((
            just("==").to(Token::Equals),
            just("!=").to(Token::NotEquals),
            just("<=").to(Token::LessEq),
            just(">=").to(Token::GreaterEq),
            just("+=").to(Token::PlusAssign),
            just("-=").to(Token::MinusAssign),
            just("*=").to(Token::StarAssign),
            just("/=").to(Token::SlashAssign),
            just("->").to(Token::Arrow),
            one_of("=<>+-*/%(){}[],:;.").map(|symb: char| match symb {
                '=' => Token::Assign,
                '<' => Token::Less,
                '>' => Token::Greater,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '%' => Token::Percent,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                ',' => Token::Comma,
                ':' => Token::Colon,
                ';' => Token::Semicolon,
                '.' => Token::Dot,
                _ => unreachable!(),
            }),
        ));

        let kw_or_ident = text::ident().map(|ident: String| match ident.as_str() {
            "class" => Token::KwClass,
            "interface" => Token::KwInterface,
            "enum" => Token::KwEnum,
            "data" => Token::KwData,
            "abstract" => Token::KwAbstract,
            "final" => Token::KwFinal,
            "static" => Token::KwStatic,
            "def" => Token::KwDef,
            "extends" => Token::KwExtends,
            "implements" => Token::KwImplements,
            "from" => Token::KwFrom,
            "import" => Token::KwImport,
            "return" => Token::KwReturn,
            "raise" => Token::KwRaise,
            "pass" => Token::KwPass,
            "if" => Token::KwIf,
            "else" => Token::KwElse,
            "while" => Token::KwWhile,
            "for" => Token::KwFor,
            "in" => Token::KwIn,
            "and" => Token::KwAnd,
            "or" => Token::KwOr,
            "not" => Token::KwNot,
            "True" => Token::True,
            "False" => Token::False,
            "None" => Token::None,
            _ => Token::Ident(ident),
        });

        fstring
            .or(string)
            .or(float)
            .or(integer)
            .or(symbol)
            .or(kw_or_ident)
    });

    let comment = just('#')
        .then(take_until(just('\n').ignored().or(end())))
        .padded();

    token
        .map_with_span(|tok, span| (tok, span))
        .padded_by(comment.repeated())
        .padded()
        .recover_with(skip_then_retry_until([]))
        .repeated()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{i}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::FStr(_) => write!(f, "f-string"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::KwClass => write!(f, "class"),
            Token::KwInterface => write!(f, "interface"),
            Token::KwEnum => write!(f, "enum"),
            Token::KwData => write!(f, "data"),
            Token::KwAbstract => write!(f, "abstract"),
            Token::KwFinal => write!(f, "final"),
            Token::KwStatic => write!(f, "static"),
            Token::KwDef => write!(f, "def"),
            Token::KwExtends => write!(f, "extends"),
            Token::KwImplements => write!(f, "implements"),
            Token::KwFrom => write!(f, "from"),
            Token::KwImport => write!(f, "import"),
            Token::KwReturn => write!(f, "return"),
            Token::KwRaise => write!(f, "raise"),
            Token::KwPass => write!(f, "pass"),
            Token::KwIf => write!(f, "if"),
            Token::KwElse => write!(f, "else"),
            Token::KwWhile => write!(f, "while"),
            Token::KwFor => write!(f, "for"),
            Token::KwIn => write!(f, "in"),
            Token::KwAnd => write!(f, "and"),
            Token::KwOr => write!(f, "or"),
            Token::KwNot => write!(f, "not"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::None => write!(f, "None"),
            Token::Assign => write!(f, "="),
            Token::Equals => write!(f, "=="),
            Token::NotEquals => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEq => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::StarAssign => write!(f, "*="),
            Token::SlashAssign => write!(f, "/="),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
        }
    }
}
