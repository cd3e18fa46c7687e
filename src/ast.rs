//! The abstract syntax tree
//!
//! The parser produces one [Module] per source file. Statements and
//! expressions keep the spans they were parsed from so that later stages can
//! attach diagnostics to the right place in the source text.

use crate::common::{Span, Spanned, TypeRef};

pub type Ident = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Import(Import),
    Interface(InterfaceDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),

    VarDecl {
        name: Ident,
        name_span: Span,
        annotation: Option<TypeRef>,
        value: Option<Expression>,
        is_final: bool,
    },

    Assign {
        target: Expression,
        op: AssignOp,
        value: Expression,
    },

    Expr(Expression),
    Return(Option<Expression>),
    Raise(Expression),
    Pass,

    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },

    While {
        condition: Expression,
        body: Vec<Statement>,
    },

    For {
        var: Ident,
        var_span: Span,
        iterable: Expression,
        body: Vec<Statement>,
    },
}

/// An import of a sibling module
///
/// `names` is empty for a whole-module import (`import geometry;`) and
/// non-empty for a selective one (`from geometry import Circle, Square;`).
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: Spanned<Ident>,
    pub names: Vec<Spanned<Ident>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Ident,
    pub name_span: Span,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<Spanned<Ident>>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Ident,
    pub name_span: Span,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<Spanned<Ident>>,
    pub interfaces: Vec<Spanned<Ident>>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_data: bool,
    pub members: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Ident,
    pub name_span: Span,
    pub variants: Vec<EnumVariant>,
    pub methods: Vec<FunctionDecl>,
}

/// A single enum variant, with optional associated values (`EARTH(5.97, 6371)`)
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: Ident,
    pub span: Span,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: Vec<Statement>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,

    /// False for bodiless signatures, as in interfaces and abstract methods
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub span: Span,
    pub annotation: Option<TypeRef>,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Ident,
    pub span: Span,
    pub bound: Option<Spanned<Ident>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    FString(Vec<FStringPart>),
    Var(Ident),

    Attribute {
        object: Box<Expression>,
        name: Ident,
        name_span: Span,
    },

    Subscript {
        object: Box<Expression>,
        index: Box<Expression>,
    },

    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },

    Unary {
        op: UnaryOperation,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOperation,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },

    List(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Literal(String),
    Expr(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperation {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperation {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

use ptree::{print_tree, Style, TreeItem};
use std::borrow::Cow;
use std::{fmt, io};

impl Module {
    pub fn pretty_print(&self) -> io::Result<()> {
        for stmt in &self.body {
            print_tree(&TreeNode::Stmt(stmt.clone()))?;
        }
        Ok(())
    }
}

impl fmt::Display for UnaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperation::Neg => write!(f, "-"),
            UnaryOperation::Not => write!(f, "not"),
        }
    }
}

impl fmt::Display for BinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperation::Add => write!(f, "+"),
            BinaryOperation::Sub => write!(f, "-"),
            BinaryOperation::Mul => write!(f, "*"),
            BinaryOperation::Div => write!(f, "/"),
            BinaryOperation::Mod => write!(f, "%"),
            BinaryOperation::Equals => write!(f, "=="),
            BinaryOperation::NotEquals => write!(f, "!="),
            BinaryOperation::Less => write!(f, "<"),
            BinaryOperation::LessEq => write!(f, "<="),
            BinaryOperation::Greater => write!(f, ">"),
            BinaryOperation::GreaterEq => write!(f, ">="),
            BinaryOperation::And => write!(f, "and"),
            BinaryOperation::Or => write!(f, "or"),
            BinaryOperation::In => write!(f, "in"),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::AddAssign => write!(f, "+="),
            AssignOp::SubAssign => write!(f, "-="),
            AssignOp::MulAssign => write!(f, "*="),
            AssignOp::DivAssign => write!(f, "/="),
        }
    }
}

/// A uniform node type so that statements and expressions can be printed as
/// one tree
#[derive(Debug, Clone)]
pub enum TreeNode {
    Stmt(Statement),
    Expr(Expression),
}

impl TreeItem for TreeNode {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        let label = match self {
            TreeNode::Stmt(stmt) => match &stmt.kind {
                StatementKind::Import(import) => format!("IMPORT {}", import.module.0),
                StatementKind::Interface(decl) => format!("INTERFACE {}", decl.name),
                StatementKind::Class(decl) if decl.is_data => format!("DATA CLASS {}", decl.name),
                StatementKind::Class(decl) => format!("CLASS {}", decl.name),
                StatementKind::Enum(decl) => format!("ENUM {}", decl.name),
                StatementKind::Function(decl) => format!("DEF {}", signature(decl)),
                StatementKind::VarDecl { name, is_final, .. } => {
                    if *is_final {
                        format!("FINAL {name}")
                    } else {
                        format!("VAR {name}")
                    }
                }
                StatementKind::Assign { op, .. } => format!("ASSIGN {op}"),
                StatementKind::Expr(_) => String::from("EXPR"),
                StatementKind::Return(_) => String::from("RETURN"),
                StatementKind::Raise(_) => String::from("RAISE"),
                StatementKind::Pass => String::from("PASS"),
                StatementKind::If { .. } => String::from("IF"),
                StatementKind::While { .. } => String::from("WHILE"),
                StatementKind::For { var, .. } => format!("FOR {var}"),
            },
            TreeNode::Expr(expr) => match &expr.kind {
                ExpressionKind::Int(i) => i.to_string(),
                ExpressionKind::Float(x) => x.to_string(),
                ExpressionKind::Str(s) => format!("{s:?}"),
                ExpressionKind::Bool(b) => b.to_string(),
                ExpressionKind::None => String::from("None"),
                ExpressionKind::FString(_) => String::from("F-STRING"),
                ExpressionKind::Var(x) => x.clone(),
                ExpressionKind::Attribute { name, .. } => format!(".{name}"),
                ExpressionKind::Subscript { .. } => String::from("SUBSCRIPT"),
                ExpressionKind::Call { .. } => String::from("CALL"),
                ExpressionKind::Unary { op, .. } => op.to_string(),
                ExpressionKind::Binary { op, .. } => op.to_string(),
                ExpressionKind::List(_) => String::from("LIST"),
            },
        };

        write!(f, "{}", style.paint(label))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let children = match self {
            TreeNode::Stmt(stmt) => match &stmt.kind {
                StatementKind::Import(_) | StatementKind::Pass => vec![],
                StatementKind::Interface(decl) => {
                    decl.methods.iter().cloned().map(function_node).collect()
                }
                StatementKind::Class(decl) => {
                    decl.members.iter().cloned().map(TreeNode::Stmt).collect()
                }
                StatementKind::Enum(decl) => {
                    decl.methods.iter().cloned().map(function_node).collect()
                }
                StatementKind::Function(decl) => {
                    decl.body.iter().cloned().map(TreeNode::Stmt).collect()
                }
                StatementKind::VarDecl { value, .. } => {
                    value.iter().cloned().map(TreeNode::Expr).collect()
                }
                StatementKind::Assign { target, value, .. } => {
                    vec![TreeNode::Expr(target.clone()), TreeNode::Expr(value.clone())]
                }
                StatementKind::Expr(expr) | StatementKind::Raise(expr) => {
                    vec![TreeNode::Expr(expr.clone())]
                }
                StatementKind::Return(value) => {
                    value.iter().cloned().map(TreeNode::Expr).collect()
                }
                StatementKind::If {
                    condition,
                    then_body,
                    else_body,
                } => std::iter::once(TreeNode::Expr(condition.clone()))
                    .chain(then_body.iter().cloned().map(TreeNode::Stmt))
                    .chain(else_body.iter().cloned().map(TreeNode::Stmt))
                    .collect(),
                StatementKind::While { condition, body } => {
                    std::iter::once(TreeNode::Expr(condition.clone()))
                        .chain(body.iter().cloned().map(TreeNode::Stmt))
                        .collect()
                }
                StatementKind::For { iterable, body, .. } => {
                    std::iter::once(TreeNode::Expr(iterable.clone()))
                        .chain(body.iter().cloned().map(TreeNode::Stmt))
                        .collect()
                }
            },
            TreeNode::Expr(expr) => match &expr.kind {
                ExpressionKind::Int(_)
                | ExpressionKind::Float(_)
                | ExpressionKind::Str(_)
                | ExpressionKind::Bool(_)
                | ExpressionKind::None
                | ExpressionKind::Var(_) => vec![],
                ExpressionKind::FString(parts) => parts
                    .iter()
                    .filter_map(|part| match part {
                        FStringPart::Literal(_) => None,
                        FStringPart::Expr(expr) => Some(TreeNode::Expr(expr.clone())),
                    })
                    .collect(),
                ExpressionKind::Attribute { object, .. } => {
                    vec![TreeNode::Expr(object.as_ref().clone())]
                }
                ExpressionKind::Subscript { object, index } => vec![
                    TreeNode::Expr(object.as_ref().clone()),
                    TreeNode::Expr(index.as_ref().clone()),
                ],
                ExpressionKind::Call { callee, args } => {
                    std::iter::once(TreeNode::Expr(callee.as_ref().clone()))
                        .chain(args.iter().cloned().map(TreeNode::Expr))
                        .collect()
                }
                ExpressionKind::Unary { operand, .. } => {
                    vec![TreeNode::Expr(operand.as_ref().clone())]
                }
                ExpressionKind::Binary { lhs, rhs, .. } => vec![
                    TreeNode::Expr(lhs.as_ref().clone()),
                    TreeNode::Expr(rhs.as_ref().clone()),
                ],
                ExpressionKind::List(items) => {
                    items.iter().cloned().map(TreeNode::Expr).collect()
                }
            },
        };

        Cow::from(children)
    }
}

fn function_node(decl: FunctionDecl) -> TreeNode {
    let span = decl.name_span;
    TreeNode::Stmt(Statement {
        kind: StatementKind::Function(decl),
        span,
    })
}

fn signature(decl: &FunctionDecl) -> String {
    let mut sig = decl.name.clone();
    sig.push('(');
    for (i, param) in decl.params.iter().enumerate() {
        sig.push_str(&param.name);
        if let Some(annotation) = &param.annotation {
            sig.push_str(": ");
            sig.push_str(&annotation.to_string());
        }

        if i != decl.params.len() - 1 {
            sig.push_str(", ");
        }
    }
    sig.push(')');

    if let Some(ret) = &decl.return_type {
        sig.push_str(" -> ");
        sig.push_str(&ret.to_string());
    }

    sig
}
