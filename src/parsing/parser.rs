use super::lexer::{Fragment, Token};
use crate::ast::{
    AssignOp, BinaryOperation, ClassDecl, EnumDecl, EnumVariant, Expression, ExpressionKind,
    FStringPart, FunctionDecl, Import, InterfaceDecl, Param, Statement, StatementKind, TypeParam,
    UnaryOperation,
};
use crate::common::{Span, Spanned, TypeRef};
use crate::diagnostics::Diagnostic;

/// Parse a token stream into the body of a module
///
/// Parsing never bails out on the first problem. A failed statement is
/// reported, the parser skips ahead to the next statement boundary and
/// continues, so one run surfaces as many syntax errors as possible.
pub fn parse_tokens(tokens: &[Spanned<Token>], eoi: Span) -> (Vec<Statement>, Vec<Diagnostic>) {
    let mut parser = TokenParser::new(tokens, eoi);
    let body = parser.module_body();
    (body, parser.diagnostics)
}

struct TokenParser<'a> {
    tokens: &'a [Spanned<Token>],
    pos: usize,
    eoi: Span,
    diagnostics: Vec<Diagnostic>,
}

/// Modifier keywords in front of a declaration
#[derive(Default)]
struct Modifiers {
    is_abstract: bool,
    is_final: bool,
    is_static: bool,
    is_data: bool,
}

impl<'a> TokenParser<'a> {
    fn new(tokens: &'a [Spanned<Token>], eoi: Span) -> Self {
        Self {
            tokens,
            pos: 0,
            eoi,
            diagnostics: Vec::new(),
        }
    }

    fn module_body(&mut self) -> Vec<Statement> {
        let mut body = Vec::new();
        while self.pos < self.tokens.len() {
            let start = self.pos;
            match self.statement() {
                Some(stmt) => body.push(stmt),
                None => {
                    if self.pos == start {
                        self.pos += 1;
                    }
                    self.synchronize();
                }
            }
        }
        body
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(tok, _)| tok)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| *span)
            .unwrap_or(self.eoi)
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| *span)
            .unwrap_or(self.eoi)
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, name: &str) -> Option<Span> {
        match self.tokens.get(self.pos) {
            Some((tok, span)) if tok == expected => {
                let span = *span;
                self.pos += 1;
                Some(span)
            }
            _ => {
                self.unexpected(name);
                None
            }
        }
    }

    fn ident(&mut self, what: &str) -> Option<Spanned<String>> {
        match self.tokens.get(self.pos) {
            Some((Token::Ident(name), span)) => {
                let result = (name.clone(), *span);
                self.pos += 1;
                Some(result)
            }
            _ => {
                self.unexpected(what);
                None
            }
        }
    }

    fn unexpected(&mut self, expected: &str) {
        let (token, span) = match self.tokens.get(self.pos) {
            Some((tok, span)) => (tok.to_string(), *span),
            None => (String::from("end of file"), self.eoi),
        };

        self.diagnostics.push(Diagnostic::UnexpectedToken {
            token,
            expected: Some(format!("Expected {expected}")),
            span,
        });
    }

    /// Skip ahead to the next statement boundary after a failed parse
    fn synchronize(&mut self) {
        while let Some(tok) = self.peek() {
            match tok {
                Token::Semicolon => {
                    self.pos += 1;
                    return;
                }
                Token::RBrace
                | Token::KwClass
                | Token::KwInterface
                | Token::KwEnum
                | Token::KwDef
                | Token::KwImport
                | Token::KwFrom
                | Token::KwIf
                | Token::KwWhile
                | Token::KwFor
                | Token::KwReturn
                | Token::KwRaise
                | Token::KwPass => return,
                _ => self.pos += 1,
            }
        }
    }

    fn statement(&mut self) -> Option<Statement> {
        let start = self.current_span();

        match self.peek()? {
            Token::KwImport | Token::KwFrom => self.import(start),
            Token::KwInterface => self.interface_decl(start),
            Token::KwEnum => self.enum_decl(start),
            Token::KwAbstract | Token::KwFinal | Token::KwStatic | Token::KwData => {
                let modifiers = self.modifiers();
                self.modified_statement(modifiers, start)
            }
            Token::KwClass => self.class_decl(Modifiers::default(), start),
            Token::KwDef => self.function_decl(Modifiers::default(), start),
            Token::KwReturn => {
                self.pos += 1;
                let value = if self.check(&Token::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect(&Token::Semicolon, ";")?;
                Some(Statement {
                    kind: StatementKind::Return(value),
                    span: start.join(self.prev_span()),
                })
            }
            Token::KwRaise => {
                self.pos += 1;
                let value = self.expression()?;
                self.expect(&Token::Semicolon, ";")?;
                Some(Statement {
                    kind: StatementKind::Raise(value),
                    span: start.join(self.prev_span()),
                })
            }
            Token::KwPass => {
                self.pos += 1;
                self.expect(&Token::Semicolon, ";")?;
                Some(Statement {
                    kind: StatementKind::Pass,
                    span: start.join(self.prev_span()),
                })
            }
            Token::KwIf => self.if_statement(start),
            Token::KwWhile => {
                self.pos += 1;
                let condition = self.expression()?;
                let body = self.block()?;
                Some(Statement {
                    kind: StatementKind::While { condition, body },
                    span: start.join(self.prev_span()),
                })
            }
            Token::KwFor => {
                self.pos += 1;
                let (var, var_span) = self.ident("a loop variable")?;
                self.expect(&Token::KwIn, "in")?;
                let iterable = self.expression()?;
                let body = self.block()?;
                Some(Statement {
                    kind: StatementKind::For {
                        var,
                        var_span,
                        iterable,
                        body,
                    },
                    span: start.join(self.prev_span()),
                })
            }
            Token::Ident(_) if self.peek_second() == Some(&Token::Colon) => {
                self.var_decl(false, start)
            }
            _ => self.expr_statement(start),
        }
    }

    fn modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek() {
                Some(Token::KwAbstract) => modifiers.is_abstract = true,
                Some(Token::KwFinal) => modifiers.is_final = true,
                Some(Token::KwStatic) => modifiers.is_static = true,
                Some(Token::KwData) => modifiers.is_data = true,
                _ => return modifiers,
            }
            self.pos += 1;
        }
    }

    fn modified_statement(&mut self, modifiers: Modifiers, start: Span) -> Option<Statement> {
        match self.peek() {
            Some(Token::KwClass) => self.class_decl(modifiers, start),
            Some(Token::KwDef) => self.function_decl(modifiers, start),
            Some(Token::Ident(_)) if modifiers.is_final => self.var_decl(true, start),
            _ => {
                self.unexpected("a declaration after the modifiers");
                None
            }
        }
    }

    fn import(&mut self, start: Span) -> Option<Statement> {
        let import = if self.eat(&Token::KwFrom) {
            let module = self.ident("a module name")?;
            self.expect(&Token::KwImport, "import")?;

            let mut names = vec![self.ident("an imported name")?];
            while self.eat(&Token::Comma) {
                names.push(self.ident("an imported name")?);
            }

            Import { module, names }
        } else {
            self.expect(&Token::KwImport, "import")?;
            let module = self.ident("a module name")?;
            Import {
                module,
                names: Vec::new(),
            }
        };

        self.expect(&Token::Semicolon, ";")?;
        Some(Statement {
            kind: StatementKind::Import(import),
            span: start.join(self.prev_span()),
        })
    }

    fn type_params(&mut self) -> Option<Vec<TypeParam>> {
        if !self.eat(&Token::Less) {
            return Some(Vec::new());
        }

        let mut params = Vec::new();
        loop {
            let (name, span) = self.ident("a type parameter")?;
            let bound = if self.eat(&Token::KwExtends) {
                Some(self.ident("a bound")?)
            } else {
                None
            };
            params.push(TypeParam { name, span, bound });

            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Greater, ">")?;

        Some(params)
    }

    fn class_decl(&mut self, modifiers: Modifiers, start: Span) -> Option<Statement> {
        self.expect(&Token::KwClass, "class")?;
        let (name, name_span) = self.ident("a class name")?;
        let type_params = self.type_params()?;

        let superclass = if self.eat(&Token::KwExtends) {
            Some(self.ident("a superclass")?)
        } else {
            None
        };

        let mut interfaces = Vec::new();
        if self.eat(&Token::KwImplements) {
            interfaces.push(self.ident("an interface")?);
            while self.eat(&Token::Comma) {
                interfaces.push(self.ident("an interface")?);
            }
        }

        if modifiers.is_abstract && modifiers.is_final {
            self.diagnostics.push(Diagnostic::AbstractAndFinal {
                class: name.clone(),
                span: name_span,
            });
        }

        // Paren-form data class: the field list doubles as the record
        // layout, terminated by `;` or followed by a brace body of methods
        let paren_form = modifiers.is_data && self.check(&Token::LParen);
        let mut members = Vec::new();
        if paren_form {
            members = self.data_fields()?;
        }

        if !(paren_form && self.eat(&Token::Semicolon)) {
            self.expect(&Token::LBrace, "{")?;
            while !self.check(&Token::RBrace) && self.pos < self.tokens.len() {
                let member_start = self.pos;
                match self.member() {
                    Some(member) => members.push(member),
                    None => {
                        if self.pos == member_start {
                            self.pos += 1;
                        }
                        self.synchronize();
                    }
                }
            }
            self.expect(&Token::RBrace, "}")?;
        }

        Some(Statement {
            kind: StatementKind::Class(ClassDecl {
                name,
                name_span,
                type_params,
                superclass,
                interfaces,
                is_abstract: modifiers.is_abstract,
                is_final: modifiers.is_final,
                is_data: modifiers.is_data,
                members,
            }),
            span: start.join(self.prev_span()),
        })
    }

    /// The field list of a paren-form data class, `(x: int, y: str)`
    fn data_fields(&mut self) -> Option<Vec<Statement>> {
        self.expect(&Token::LParen, "(")?;

        let mut fields = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let field_start = self.current_span();
                let (name, name_span) = self.ident("a field name")?;
                self.expect(&Token::Colon, ":")?;
                let annotation = self.type_ref()?;

                fields.push(Statement {
                    kind: StatementKind::VarDecl {
                        name,
                        name_span,
                        annotation: Some(annotation),
                        value: None,
                        is_final: false,
                    },
                    span: field_start.join(self.prev_span()),
                });

                if !self.eat(&Token::Comma) || self.check(&Token::RParen) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, ")")?;

        Some(fields)
    }

    /// A class member: a field or a method
    fn member(&mut self) -> Option<Statement> {
        let start = self.current_span();

        match self.peek()? {
            Token::KwAbstract | Token::KwFinal | Token::KwStatic => {
                let modifiers = self.modifiers();
                match self.peek() {
                    Some(Token::KwDef) => self.function_decl(modifiers, start),
                    Some(Token::Ident(_)) if modifiers.is_final => self.var_decl(true, start),
                    _ => {
                        self.unexpected("a field or method after the modifiers");
                        None
                    }
                }
            }
            Token::KwDef => self.function_decl(Modifiers::default(), start),
            Token::Ident(_) => self.var_decl(false, start),
            _ => {
                self.unexpected("a field or method");
                None
            }
        }
    }

    fn interface_decl(&mut self, start: Span) -> Option<Statement> {
        self.expect(&Token::KwInterface, "interface")?;
        let (name, name_span) = self.ident("an interface name")?;
        let type_params = self.type_params()?;

        let mut extends = Vec::new();
        if self.eat(&Token::KwExtends) {
            extends.push(self.ident("an interface")?);
            while self.eat(&Token::Comma) {
                extends.push(self.ident("an interface")?);
            }
        }

        self.expect(&Token::LBrace, "{")?;
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace) && self.pos < self.tokens.len() {
            let member_start = self.pos;
            match self.signature() {
                Some(sig) => methods.push(sig),
                None => {
                    if self.pos == member_start {
                        self.pos += 1;
                    }
                    self.synchronize();
                }
            }
        }
        self.expect(&Token::RBrace, "}")?;

        Some(Statement {
            kind: StatementKind::Interface(InterfaceDecl {
                name,
                name_span,
                type_params,
                extends,
                methods,
            }),
            span: start.join(self.prev_span()),
        })
    }

    /// A bodiless method signature, as allowed in interfaces
    fn signature(&mut self) -> Option<FunctionDecl> {
        self.expect(&Token::KwDef, "def")?;
        let (name, name_span) = self.ident("a method name")?;
        let params = self.params()?;
        let return_type = if self.eat(&Token::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon, ";")?;

        Some(FunctionDecl {
            name,
            name_span,
            params,
            return_type,
            body: Vec::new(),
            is_static: false,
            is_abstract: false,
            is_final: false,
            has_body: false,
        })
    }

    fn enum_decl(&mut self, start: Span) -> Option<Statement> {
        self.expect(&Token::KwEnum, "enum")?;
        let (name, name_span) = self.ident("an enum name")?;

        self.expect(&Token::LBrace, "{")?;

        // Comma-separated member list, with an optional trailing comma
        let mut variants = Vec::new();
        while matches!(self.peek(), Some(Token::Ident(_))) {
            match self.enum_variant(&name) {
                Some(variant) => variants.push(variant),
                None => {
                    self.synchronize();
                    break;
                }
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        // A semicolon after the member list opens the method section
        let mut methods = Vec::new();
        if self.eat(&Token::Semicolon) {
            while !self.check(&Token::RBrace) && self.pos < self.tokens.len() {
                let member_start = self.pos;
                let modifier_start = self.current_span();
                let modifiers = self.modifiers();

                match self.function_decl(modifiers, modifier_start) {
                    Some(Statement {
                        kind: StatementKind::Function(decl),
                        ..
                    }) => methods.push(decl),
                    _ => {
                        if self.pos == member_start {
                            self.pos += 1;
                        }
                        self.synchronize();
                    }
                }
            }
        }
        self.expect(&Token::RBrace, "}")?;

        Some(Statement {
            kind: StatementKind::Enum(EnumDecl {
                name,
                name_span,
                variants,
                methods,
            }),
            span: start.join(self.prev_span()),
        })
    }

    fn enum_variant(&mut self, enum_name: &str) -> Option<EnumVariant> {
        let (name, span) = self.ident("a variant name")?;

        if name == enum_name {
            self.diagnostics.push(Diagnostic::EnumConstructorName {
                variant: name.clone(),
                span,
            });
        }

        let mut values = Vec::new();
        if self.eat(&Token::LParen) {
            if !self.check(&Token::RParen) {
                values.push(self.expression()?);
                while self.eat(&Token::Comma) {
                    values.push(self.expression()?);
                }
            }
            self.expect(&Token::RParen, ")")?;
        }

        Some(EnumVariant { name, span, values })
    }

    fn function_decl(&mut self, modifiers: Modifiers, start: Span) -> Option<Statement> {
        self.expect(&Token::KwDef, "def")?;
        let (name, name_span) = self.ident("a function name")?;
        let params = self.params()?;
        let return_type = if self.eat(&Token::Arrow) {
            Some(self.type_ref()?)
        } else {
            None
        };

        let (body, has_body) = if self.eat(&Token::Semicolon) {
            (Vec::new(), false)
        } else {
            (self.block()?, true)
        };

        Some(Statement {
            kind: StatementKind::Function(FunctionDecl {
                name,
                name_span,
                params,
                return_type,
                body,
                is_static: modifiers.is_static,
                is_abstract: modifiers.is_abstract,
                is_final: modifiers.is_final,
                has_body,
            }),
            span: start.join(self.prev_span()),
        })
    }

    fn params(&mut self) -> Option<Vec<Param>> {
        self.expect(&Token::LParen, "(")?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let (name, span) = self.ident("a parameter name")?;
                let annotation = if self.eat(&Token::Colon) {
                    Some(self.type_ref()?)
                } else {
                    None
                };
                let default = if self.eat(&Token::Assign) {
                    Some(self.expression()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    span,
                    annotation,
                    default,
                });

                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, ")")?;

        Some(params)
    }

    fn var_decl(&mut self, is_final: bool, start: Span) -> Option<Statement> {
        let (name, name_span) = self.ident("a variable name")?;
        let annotation = if self.eat(&Token::Colon) {
            Some(self.type_ref()?)
        } else {
            None
        };
        let value = if self.eat(&Token::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon, ";")?;

        Some(Statement {
            kind: StatementKind::VarDecl {
                name,
                name_span,
                annotation,
                value,
                is_final,
            },
            span: start.join(self.prev_span()),
        })
    }

    fn if_statement(&mut self, start: Span) -> Option<Statement> {
        self.expect(&Token::KwIf, "if")?;
        let condition = self.expression()?;
        let then_body = self.block()?;

        let else_body = if self.eat(&Token::KwElse) {
            if self.check(&Token::KwIf) {
                vec![self.statement()?]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };

        Some(Statement {
            kind: StatementKind::If {
                condition,
                then_body,
                else_body,
            },
            span: start.join(self.prev_span()),
        })
    }

    fn expr_statement(&mut self, start: Span) -> Option<Statement> {
        let expr = self.expression()?;

        let op = match self.peek() {
            Some(Token::Assign) => Some(AssignOp::Assign),
            Some(Token::PlusAssign) => Some(AssignOp::AddAssign),
            Some(Token::MinusAssign) => Some(AssignOp::SubAssign),
            Some(Token::StarAssign) => Some(AssignOp::MulAssign),
            Some(Token::SlashAssign) => Some(AssignOp::DivAssign),
            _ => None,
        };

        let kind = match op {
            Some(op) => {
                self.pos += 1;
                let value = self.expression()?;
                StatementKind::Assign {
                    target: expr,
                    op,
                    value,
                }
            }
            None => StatementKind::Expr(expr),
        };

        self.expect(&Token::Semicolon, ";")?;
        Some(Statement {
            kind,
            span: start.join(self.prev_span()),
        })
    }

    fn block(&mut self) -> Option<Vec<Statement>> {
        self.expect(&Token::LBrace, "{")?;

        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) && self.pos < self.tokens.len() {
            let start = self.pos;
            match self.statement() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    if self.pos == start {
                        self.pos += 1;
                    }
                    self.synchronize();
                }
            }
        }
        self.expect(&Token::RBrace, "}")?;

        Some(stmts)
    }

    fn type_ref(&mut self) -> Option<TypeRef> {
        if let Some((Token::None, span)) = self.tokens.get(self.pos) {
            let typ = TypeRef::simple("None", *span);
            self.pos += 1;
            return Some(typ);
        }

        let (mut name, mut span) = self.ident("a type name")?;
        while self.eat(&Token::Dot) {
            let (part, part_span) = self.ident("a type name")?;
            name.push('.');
            name.push_str(&part);
            span = span.join(part_span);
        }

        let mut args = Vec::new();
        if self.eat(&Token::LBracket) {
            loop {
                args.push(self.type_ref()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            let close = self.expect(&Token::RBracket, "]")?;
            span = span.join(close);
        }

        Some(TypeRef { name, args, span })
    }

    fn expression(&mut self) -> Option<Expression> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Option<Expression> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::KwOr) {
            let rhs = self.and_expr()?;
            lhs = binary(BinaryOperation::Or, lhs, rhs);
        }
        Some(lhs)
    }

    fn and_expr(&mut self) -> Option<Expression> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::KwAnd) {
            let rhs = self.not_expr()?;
            lhs = binary(BinaryOperation::And, lhs, rhs);
        }
        Some(lhs)
    }

    fn not_expr(&mut self) -> Option<Expression> {
        let start = self.current_span();
        if self.eat(&Token::KwNot) {
            let operand = self.not_expr()?;
            let span = start.join(operand.span);
            return Some(Expression {
                kind: ExpressionKind::Unary {
                    op: UnaryOperation::Not,
                    operand: Box::new(operand),
                },
                span,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Option<Expression> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equals) => BinaryOperation::Equals,
                Some(Token::NotEquals) => BinaryOperation::NotEquals,
                Some(Token::Less) => BinaryOperation::Less,
                Some(Token::LessEq) => BinaryOperation::LessEq,
                Some(Token::Greater) => BinaryOperation::Greater,
                Some(Token::GreaterEq) => BinaryOperation::GreaterEq,
                Some(Token::KwIn) => BinaryOperation::In,
                _ => return Some(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn additive(&mut self) -> Option<Expression> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperation::Add,
                Some(Token::Minus) => BinaryOperation::Sub,
                _ => return Some(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Option<Expression> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperation::Mul,
                Some(Token::Slash) => BinaryOperation::Div,
                Some(Token::Percent) => BinaryOperation::Mod,
                _ => return Some(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Option<Expression> {
        let start = self.current_span();
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            let span = start.join(operand.span);
            return Some(Expression {
                kind: ExpressionKind::Unary {
                    op: UnaryOperation::Neg,
                    operand: Box::new(operand),
                },
                span,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Option<Expression> {
        let mut expr = self.primary()?;

        loop {
            if self.eat(&Token::Dot) {
                let (name, name_span) = self.ident("an attribute name")?;
                let span = expr.span.join(name_span);
                expr = Expression {
                    kind: ExpressionKind::Attribute {
                        object: Box::new(expr),
                        name,
                        name_span,
                    },
                    span,
                };
            } else if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    args.push(self.expression()?);
                    while self.eat(&Token::Comma) {
                        args.push(self.expression()?);
                    }
                }
                let close = self.expect(&Token::RParen, ")")?;
                let span = expr.span.join(close);
                expr = Expression {
                    kind: ExpressionKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                let close = self.expect(&Token::RBracket, "]")?;
                let span = expr.span.join(close);
                expr = Expression {
                    kind: ExpressionKind::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                };
            } else {
                return Some(expr);
            }
        }
    }

    fn primary(&mut self) -> Option<Expression> {
        let (tok, span) = self.tokens.get(self.pos).cloned().unzip();
        let span = span.unwrap_or(self.eoi);

        let kind = match tok {
            Some(Token::Int(i)) => {
                self.pos += 1;
                ExpressionKind::Int(i)
            }
            Some(Token::Float(x)) => {
                self.pos += 1;
                ExpressionKind::Float(x)
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                ExpressionKind::Str(s)
            }
            Some(Token::FStr(fragments)) => {
                self.pos += 1;
                let mut parts = Vec::new();
                for fragment in fragments {
                    match fragment {
                        Fragment::Lit(text) => parts.push(FStringPart::Literal(text)),
                        Fragment::Expr(tokens) => {
                            let expr = self.embedded_expression(&tokens, span)?;
                            parts.push(FStringPart::Expr(expr));
                        }
                    }
                }
                ExpressionKind::FString(parts)
            }
            Some(Token::True) => {
                self.pos += 1;
                ExpressionKind::Bool(true)
            }
            Some(Token::False) => {
                self.pos += 1;
                ExpressionKind::Bool(false)
            }
            Some(Token::None) => {
                self.pos += 1;
                ExpressionKind::None
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                ExpressionKind::Var(name)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(&Token::RParen, ")")?;
                return Some(inner);
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let mut items = Vec::new();
                if !self.check(&Token::RBracket) {
                    items.push(self.expression()?);
                    while self.eat(&Token::Comma) {
                        items.push(self.expression()?);
                    }
                }
                let close = self.expect(&Token::RBracket, "]")?;
                return Some(Expression {
                    kind: ExpressionKind::List(items),
                    span: span.join(close),
                });
            }
            _ => {
                self.unexpected("an expression");
                return None;
            }
        };

        Some(Expression {
            kind,
            span: span.join(self.prev_span()),
        })
    }

    /// Parse the tokens of one f-string hole as a single expression
    fn embedded_expression(
        &mut self,
        tokens: &[Spanned<Token>],
        fallback: Span,
    ) -> Option<Expression> {
        let eoi = tokens
            .last()
            .map(|(_, span)| Span::marker(span.end))
            .unwrap_or(fallback);

        let mut inner = TokenParser::new(tokens, eoi);
        let expr = inner.expression();
        if expr.is_some() && inner.pos < inner.tokens.len() {
            inner.unexpected("the end of the embedded expression");
        }
        self.diagnostics.append(&mut inner.diagnostics);

        expr
    }
}

fn binary(op: BinaryOperation, lhs: Expression, rhs: Expression) -> Expression {
    let span = lhs.span.join(rhs.span);
    Expression {
        kind: ExpressionKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    }
}
