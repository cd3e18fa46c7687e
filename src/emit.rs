//! Python emission
//!
//! The emitter turns a checked module back into Python 3 source text. It
//! works purely from the AST, in declaration order, so its output is
//! deterministic for a given input.
//!
//! Most constructs lower to their obvious Python counterpart. The ones that
//! do not:
//! - interfaces become `typing.Protocol` classes with abstract methods
//! - abstract classes extend `abc.ABC` and their abstract methods raise
//!   `NotImplementedError`
//! - final classes and methods are guarded at runtime with
//!   `__init_subclass__` in addition to the `typing.final` decorator
//! - overloaded functions become one dispatcher that picks an implementation
//!   by argument count and `isinstance` checks
//!
//! Imports from `typing`, `abc`, `enum` and `dataclasses` are only emitted
//! when the module actually needs them.

use std::collections::BTreeSet;
use std::fmt::Write;

use tracing::debug;

use crate::ast::{
    self, AssignOp, ClassDecl, EnumDecl, Expression, ExpressionKind, FStringPart, FunctionDecl,
    InterfaceDecl, Statement, StatementKind, UnaryOperation,
};
use crate::binding::SymbolTable;
use crate::common::TypeRef;

const HEADER: &str = "# Generated by cayenne. Do not edit.";

/// Emit Python source for a module
pub fn emit(module: &ast::Module, table: &SymbolTable) -> String {
    debug!("emitting module {}", module.name);

    let mut emitter = Emitter {
        table,
        out: String::new(),
        indent: 0,
        typevars_emitted: BTreeSet::new(),
    };

    let body = emitter.emit_body(module);

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    let prelude = collect_imports(module);
    if !prelude.is_empty() {
        out.push('\n');
        out.push_str(&prelude);
    }

    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(&body);
    }

    out
}

/// Which names each runtime module has to provide
fn collect_imports(module: &ast::Module) -> String {
    let mut abc: BTreeSet<&str> = BTreeSet::new();
    let mut dataclasses: BTreeSet<&str> = BTreeSet::new();
    let mut enums: BTreeSet<&str> = BTreeSet::new();
    let mut typing: BTreeSet<&str> = BTreeSet::new();

    fn scan(
        body: &[Statement],
        abc: &mut BTreeSet<&str>,
        dataclasses: &mut BTreeSet<&str>,
        enums: &mut BTreeSet<&str>,
        typing: &mut BTreeSet<&str>,
    ) {
        for stmt in body {
            match &stmt.kind {
                StatementKind::Interface(decl) => {
                    typing.insert("Protocol");
                    abc.insert("abstractmethod");
                    if !decl.type_params.is_empty() {
                        typing.insert("Generic");
                        typing.insert("TypeVar");
                    }
                }
                StatementKind::Class(decl) => {
                    if decl.is_abstract {
                        abc.insert("ABC");
                    }
                    if decl.is_data {
                        dataclasses.insert("dataclass");
                    }
                    if decl.is_final {
                        typing.insert("final");
                    }
                    if !decl.type_params.is_empty() {
                        typing.insert("Generic");
                        typing.insert("TypeVar");
                    }
                    for member in &decl.members {
                        match &member.kind {
                            StatementKind::Function(method) => {
                                if method.is_abstract {
                                    abc.insert("abstractmethod");
                                }
                                if method.is_final {
                                    typing.insert("final");
                                }
                            }
                            StatementKind::VarDecl { is_final: true, .. } => {
                                typing.insert("Final");
                            }
                            _ => {}
                        }
                    }
                }
                StatementKind::Enum(decl) => {
                    enums.insert("Enum");
                    if decl.variants.iter().all(|v| v.values.is_empty()) {
                        enums.insert("auto");
                    }
                }
                StatementKind::VarDecl { is_final: true, .. } => {
                    typing.insert("Final");
                }
                _ => {}
            }
        }
    }

    scan(
        &module.body,
        &mut abc,
        &mut dataclasses,
        &mut enums,
        &mut typing,
    );

    let mut out = String::new();
    for (module_name, names) in [
        ("abc", &abc),
        ("dataclasses", &dataclasses),
        ("enum", &enums),
        ("typing", &typing),
    ] {
        if !names.is_empty() {
            let names: Vec<&str> = names.iter().copied().collect();
            let _ = writeln!(out, "from {module_name} import {}", names.join(", "));
        }
    }
    out
}

struct Emitter<'a> {
    table: &'a SymbolTable,
    out: String,
    indent: usize,
    typevars_emitted: BTreeSet<String>,
}

impl Emitter<'_> {
    fn emit_body(&mut self, module: &ast::Module) -> String {
        let groups = overload_groups(&module.body);
        let mut handled: BTreeSet<String> = BTreeSet::new();

        for stmt in &module.body {
            if let StatementKind::Function(decl) = &stmt.kind {
                if handled.contains(&decl.name) {
                    continue;
                }
                handled.insert(decl.name.clone());

                let group = &groups[&decl.name];
                if group.len() == 1 {
                    self.function(decl, None);
                } else {
                    self.overloaded(group, None);
                }
                continue;
            }

            self.statement(stmt);
        }

        std::mem::take(&mut self.out)
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        if !self.out.ends_with("\n\n") && !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        match &stmt.kind {
            StatementKind::Import(import) => {
                let (module, _) = &import.module;
                if import.names.is_empty() {
                    self.line(&format!("import {module}"));
                } else {
                    let names: Vec<&str> = import
                        .names
                        .iter()
                        .map(|(name, _)| name.as_str())
                        .collect();
                    self.line(&format!("from {module} import {}", names.join(", ")));
                }
            }

            StatementKind::Interface(decl) => self.interface(decl),
            StatementKind::Class(decl) => self.class(decl),
            StatementKind::Enum(decl) => self.enumeration(decl),
            StatementKind::Function(decl) => self.function(decl, None),

            StatementKind::VarDecl {
                name,
                annotation,
                value,
                is_final,
                ..
            } => {
                let annotation = match (annotation, is_final) {
                    (Some(t), true) => format!(": Final[{t}]"),
                    (Some(t), false) => format!(": {t}"),
                    (None, true) => String::from(": Final"),
                    (None, false) => String::new(),
                };
                match value {
                    Some(value) => {
                        let value = self.expression(value);
                        self.line(&format!("{name}{annotation} = {value}"));
                    }
                    None => self.line(&format!("{name}{annotation}")),
                }
            }

            StatementKind::Assign { target, op, value } => {
                let target = self.expression(target);
                let value = self.expression(value);
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::AddAssign => "+=",
                    AssignOp::SubAssign => "-=",
                    AssignOp::MulAssign => "*=",
                    AssignOp::DivAssign => "/=",
                };
                self.line(&format!("{target} {op} {value}"));
            }

            StatementKind::Expr(expr) => {
                let expr = self.expression(expr);
                self.line(&expr);
            }

            StatementKind::Return(value) => match value {
                Some(value) => {
                    let value = self.expression(value);
                    self.line(&format!("return {value}"));
                }
                None => self.line("return"),
            },

            StatementKind::Raise(value) => {
                let value = self.expression(value);
                self.line(&format!("raise {value}"));
            }

            StatementKind::Pass => self.line("pass"),

            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => self.if_chain("if", condition, then_body, else_body),

            StatementKind::While { condition, body } => {
                let condition = self.expression(condition);
                self.line(&format!("while {condition}:"));
                self.block(body);
            }

            StatementKind::For {
                var,
                iterable,
                body,
                ..
            } => {
                let iterable = self.expression(iterable);
                self.line(&format!("for {var} in {iterable}:"));
                self.block(body);
            }
        }
    }

    fn if_chain(
        &mut self,
        keyword: &str,
        condition: &Expression,
        then_body: &[Statement],
        else_body: &[Statement],
    ) {
        let condition = self.expression(condition);
        self.line(&format!("{keyword} {condition}:"));
        self.block(then_body);

        // A lone if in the else branch folds into elif
        match else_body {
            [] => {}
            [Statement {
                kind:
                    StatementKind::If {
                        condition,
                        then_body,
                        else_body,
                    },
                ..
            }] => self.if_chain("elif", condition, then_body, else_body),
            _ => {
                self.line("else:");
                self.block(else_body);
            }
        }
    }

    fn block(&mut self, body: &[Statement]) {
        self.indent += 1;
        if body.is_empty() {
            self.line("pass");
        } else {
            for stmt in body {
                self.statement(stmt);
            }
        }
        self.indent -= 1;
    }

    fn typevars(&mut self, type_params: &[ast::TypeParam]) {
        for tp in type_params {
            if self.typevars_emitted.contains(&tp.name) {
                continue;
            }
            self.typevars_emitted.insert(tp.name.clone());

            match &tp.bound {
                Some((bound, _)) => {
                    self.line(&format!("{0} = TypeVar('{0}', bound={bound})", tp.name))
                }
                None => self.line(&format!("{0} = TypeVar('{0}')", tp.name)),
            }
        }
    }

    fn interface(&mut self, decl: &InterfaceDecl) {
        self.blank();
        self.typevars(&decl.type_params);

        let mut bases: Vec<String> = decl
            .extends
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        bases.push(String::from("Protocol"));
        if !decl.type_params.is_empty() {
            let params: Vec<&str> = decl.type_params.iter().map(|tp| tp.name.as_str()).collect();
            bases.push(format!("Generic[{}]", params.join(", ")));
        }

        self.line(&format!("class {}({}):", decl.name, bases.join(", ")));

        self.indent += 1;
        if decl.methods.is_empty() {
            self.line("pass");
        }
        for method in &decl.methods {
            self.line("@abstractmethod");
            let signature = self.signature(method, true);
            self.line(&signature);
            self.indent += 1;
            self.line("...");
            self.indent -= 1;
        }
        self.indent -= 1;
        self.blank();
    }

    fn class(&mut self, decl: &ClassDecl) {
        self.blank();
        self.typevars(&decl.type_params);

        if decl.is_final {
            self.line("@final");
        }
        if decl.is_data {
            self.line("@dataclass");
        }

        let mut bases: Vec<String> = Vec::new();
        if let Some((superclass, _)) = &decl.superclass {
            bases.push(superclass.clone());
        }
        bases.extend(decl.interfaces.iter().map(|(name, _)| name.clone()));
        if decl.is_abstract {
            bases.push(String::from("ABC"));
        }
        if !decl.type_params.is_empty() {
            let params: Vec<&str> = decl.type_params.iter().map(|tp| tp.name.as_str()).collect();
            bases.push(format!("Generic[{}]", params.join(", ")));
        }

        if bases.is_empty() {
            self.line(&format!("class {}:", decl.name));
        } else {
            self.line(&format!("class {}({}):", decl.name, bases.join(", ")));
        }

        self.indent += 1;

        let final_methods: Vec<&str> = decl
            .members
            .iter()
            .filter_map(|member| match &member.kind {
                StatementKind::Function(m) if m.is_final => Some(m.name.as_str()),
                _ => None,
            })
            .collect();

        let mut empty = true;

        for member in &decl.members {
            if let StatementKind::VarDecl { .. } = &member.kind {
                self.statement(member);
                empty = false;
            }
        }

        let groups = overload_groups(&decl.members);
        let mut handled: BTreeSet<String> = BTreeSet::new();
        for member in &decl.members {
            let StatementKind::Function(method) = &member.kind else {
                continue;
            };
            if handled.contains(&method.name) {
                continue;
            }
            handled.insert(method.name.clone());
            empty = false;

            let group = &groups[&method.name];
            if group.len() == 1 {
                self.function(method, Some(decl.name.as_str()));
            } else {
                self.overloaded(group, Some(decl.name.as_str()));
            }
        }

        if decl.is_final {
            self.blank();
            self.line("def __init_subclass__(cls, **kwargs):");
            self.indent += 1;
            self.line(&format!(
                "raise TypeError(\"class {} is final and cannot be extended\")",
                decl.name
            ));
            self.indent -= 1;
            empty = false;
        } else if !final_methods.is_empty() {
            let names: Vec<String> = final_methods
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect();
            self.blank();
            self.line("def __init_subclass__(cls, **kwargs):");
            self.indent += 1;
            self.line("super().__init_subclass__(**kwargs)");
            self.line(&format!("for name in ({},):", names.join(", ")));
            self.indent += 1;
            self.line("if name in cls.__dict__:");
            self.indent += 1;
            self.line(&format!(
                "raise TypeError(f\"method {{name}} of {} is final and cannot be overridden\")",
                decl.name
            ));
            self.indent -= 2;
            self.indent -= 1;
            empty = false;
        }

        if empty {
            self.line("pass");
        }

        self.indent -= 1;
        self.blank();
    }

    fn enumeration(&mut self, decl: &EnumDecl) {
        self.blank();
        self.line(&format!("class {}(Enum):", decl.name));
        self.indent += 1;

        if decl.variants.is_empty() && decl.methods.is_empty() {
            self.line("pass");
        }

        for variant in &decl.variants {
            if variant.values.is_empty() {
                self.line(&format!("{} = auto()", variant.name));
            } else {
                let values: Vec<String> = variant
                    .values
                    .iter()
                    .map(|value| self.expression(value))
                    .collect();
                self.line(&format!("{} = (", variant.name));
                self.indent += 1;
                for value in &values {
                    self.line(&format!("{value},"));
                }
                self.indent -= 1;
                self.line(")");
            }
        }

        for method in &decl.methods {
            self.function(method, Some(decl.name.as_str()));
        }

        self.indent -= 1;
        self.blank();
    }

    /// Emit a single function or method. `owner` is the name of the
    /// enclosing class or enum, if any; a method named after its owner is
    /// the constructor and becomes `__init__`.
    fn function(&mut self, decl: &FunctionDecl, owner: Option<&str>) {
        self.blank();

        let in_class = owner.is_some();
        if in_class && decl.is_static {
            self.line("@staticmethod");
        }
        if decl.is_final {
            self.line("@final");
        }
        if decl.is_abstract {
            self.line("@abstractmethod");
        }

        let signature = self.signature_named(decl, in_class, &python_name(decl, owner));
        self.line(&signature);

        self.indent += 1;
        if !decl.has_body {
            self.line("raise NotImplementedError");
        } else if decl.body.is_empty() {
            self.line("pass");
        } else {
            for stmt in &decl.body {
                self.statement(stmt);
            }
        }
        self.indent -= 1;
    }

    fn signature(&mut self, decl: &FunctionDecl, in_class: bool) -> String {
        self.signature_named(decl, in_class, &decl.name.clone())
    }

    fn signature_named(&mut self, decl: &FunctionDecl, in_class: bool, name: &str) -> String {
        let mut params: Vec<String> = Vec::new();

        // Instance methods get their self parameter whether or not the
        // source spelled it out
        if in_class && !decl.is_static && decl.params.first().map(|p| p.name.as_str()) != Some("self")
        {
            params.push(String::from("self"));
        }

        for param in &decl.params {
            let mut text = param.name.clone();
            if let Some(annotation) = &param.annotation {
                let _ = write!(text, ": {annotation}");
            }
            if let Some(default) = &param.default {
                let default = self.expression(default);
                let _ = write!(text, " = {default}");
            }
            params.push(text);
        }

        let ret = match (&decl.return_type, name == "__init__") {
            (_, true) => String::from(" -> None"),
            (Some(t), false) => format!(" -> {t}"),
            (None, false) => String::new(),
        };

        format!("def {name}({}){ret}:", params.join(", "))
    }

    /// Emit an overload group: the implementations under mangled names plus
    /// one dispatcher that picks by argument count and runtime type
    fn overloaded(&mut self, group: &[&FunctionDecl], owner: Option<&str>) {
        let in_class = owner.is_some();
        let name = &group[0].name;
        let all_static = group.iter().all(|decl| decl.is_static);

        for (i, decl) in group.iter().enumerate() {
            let mut mangled = (*decl).clone();
            mangled.name = format!("_{name}_{i}");
            self.function(&mangled, owner);
        }

        self.blank();
        if in_class && all_static {
            self.line("@staticmethod");
            self.line(&format!("def {name}(*args):"));
        } else if in_class {
            self.line(&format!("def {name}(self, *args):"));
        } else {
            self.line(&format!("def {name}(*args):"));
        }

        self.indent += 1;
        for (i, decl) in group.iter().enumerate() {
            let condition = self.dispatch_condition(decl, in_class);
            let target = if in_class && all_static {
                format!("{}._{name}_{i}(*args)", owner.unwrap_or_default())
            } else if in_class {
                format!("self._{name}_{i}(*args)")
            } else {
                format!("_{name}_{i}(*args)")
            };
            self.line(&format!("if {condition}:"));
            self.indent += 1;
            self.line(&format!("return {target}"));
            self.indent -= 1;
        }
        self.line(&format!(
            "raise TypeError(\"no overload of {name} matches\")"
        ));
        self.indent -= 1;
    }

    fn dispatch_condition(&self, decl: &FunctionDecl, in_class: bool) -> String {
        let params: Vec<&ast::Param> = decl
            .params
            .iter()
            .filter(|p| !(in_class && p.name == "self"))
            .collect();

        let required = params.iter().filter(|p| p.default.is_none()).count();
        let total = params.len();

        let mut parts = if required == total {
            vec![format!("len(args) == {total}")]
        } else {
            vec![format!("{required} <= len(args) <= {total}")]
        };

        for (i, param) in params.iter().enumerate().take(required) {
            if let Some(annotation) = &param.annotation {
                if let Some(runtime_type) = self.runtime_type(annotation) {
                    parts.push(format!("isinstance(args[{i}], {runtime_type})"));
                }
            }
        }

        parts.join(" and ")
    }

    /// The name a type can be checked against with isinstance, if any.
    /// Interfaces and type parameters have no runtime counterpart.
    fn runtime_type(&self, annotation: &TypeRef) -> Option<String> {
        let name = annotation.name.as_str();
        let concrete = matches!(
            name,
            "int" | "float" | "str" | "bool" | "list" | "dict" | "set" | "tuple"
        ) || self.table.classes.contains_key(name)
            || self.table.enums.contains_key(name);

        concrete.then(|| name.to_string())
    }

    fn expression(&mut self, expr: &Expression) -> String {
        self.expression_prec(expr, 0)
    }

    fn expression_prec(&mut self, expr: &Expression, parent: u8) -> String {
        let (text, prec) = match &expr.kind {
            ExpressionKind::Int(i) => (i.to_string(), 9),
            ExpressionKind::Float(x) => (float_literal(*x), 9),
            ExpressionKind::Str(s) => (format!("\"{}\"", escape_str(s)), 9),
            ExpressionKind::Bool(true) => (String::from("True"), 9),
            ExpressionKind::Bool(false) => (String::from("False"), 9),
            ExpressionKind::None => (String::from("None"), 9),
            ExpressionKind::Var(name) => (name.clone(), 9),

            ExpressionKind::FString(parts) => {
                let mut text = String::from("f\"");
                for part in parts {
                    match part {
                        FStringPart::Literal(lit) => text.push_str(&escape_str(lit)),
                        FStringPart::Expr(inner) => {
                            let inner = self.expression(inner);
                            let _ = write!(text, "{{{inner}}}");
                        }
                    }
                }
                text.push('"');
                (text, 9)
            }

            ExpressionKind::Attribute { object, name, .. } => {
                let object = self.expression_prec(object, 8);
                (format!("{object}.{name}"), 8)
            }

            ExpressionKind::Subscript { object, index } => {
                let object = self.expression_prec(object, 8);
                let index = self.expression(index);
                (format!("{object}[{index}]"), 8)
            }

            ExpressionKind::Call { callee, args } => {
                let args: Vec<String> = args.iter().map(|arg| self.expression(arg)).collect();
                let args = args.join(", ");

                // A bare super(...) call forwards to the parent constructor
                let text = match &callee.kind {
                    ExpressionKind::Var(name) if name == "super" => {
                        format!("super().__init__({args})")
                    }
                    _ => {
                        let callee = self.expression_prec(callee, 8);
                        format!("{callee}({args})")
                    }
                };
                (text, 8)
            }

            ExpressionKind::Unary { op, operand } => match op {
                UnaryOperation::Neg => {
                    let operand = self.expression_prec(operand, 7);
                    (format!("-{operand}"), 7)
                }
                UnaryOperation::Not => {
                    let operand = self.expression_prec(operand, 3);
                    (format!("not {operand}"), 3)
                }
            },

            ExpressionKind::Binary { op, lhs, rhs } => {
                let prec = binary_prec(*op);
                let lhs = self.expression_prec(lhs, prec);
                let rhs = self.expression_prec(rhs, prec + 1);
                (format!("{lhs} {op} {rhs}"), prec)
            }

            ExpressionKind::List(items) => {
                let items: Vec<String> = items.iter().map(|item| self.expression(item)).collect();
                (format!("[{}]", items.join(", ")), 9)
            }
        };

        if prec < parent {
            format!("({text})")
        } else {
            text
        }
    }
}

fn python_name(decl: &FunctionDecl, owner: Option<&str>) -> String {
    if owner == Some(decl.name.as_str()) {
        String::from("__init__")
    } else {
        decl.name.clone()
    }
}

fn binary_prec(op: ast::BinaryOperation) -> u8 {
    use ast::BinaryOperation::*;
    match op {
        Or => 1,
        And => 2,
        Equals | NotEquals | Less | LessEq | Greater | GreaterEq | In => 4,
        Add | Sub => 5,
        Mul | Div | Mod => 6,
    }
}

/// Group function declarations by name, preserving declaration order
fn overload_groups(body: &[Statement]) -> std::collections::HashMap<String, Vec<&FunctionDecl>> {
    let mut groups: std::collections::HashMap<String, Vec<&FunctionDecl>> =
        std::collections::HashMap::new();
    for stmt in body {
        if let StatementKind::Function(decl) = &stmt.kind {
            groups.entry(decl.name.clone()).or_default().push(decl);
        }
    }
    groups
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep whole floats recognizable as floats in the output
fn float_literal(x: f64) -> String {
    let text = x.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{bind, SymbolCache};
    use crate::parsing::parse;

    fn emit_source(source: &str) -> String {
        let (module, diagnostics) = parse("main", source);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        let (table, diagnostics) = bind(&module, &SymbolCache::new());
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        emit(&module, &table)
    }

    #[test]
    fn header_is_present() {
        let out = emit_source("x = 1;");
        assert!(out.starts_with("# Generated by cayenne. Do not edit.\n"));
    }

    #[test]
    fn constructor_becomes_init() {
        let out = emit_source(
            r#"
class Animal {
    name: str;

    def Animal(name: str) {
        self.name = name;
    }
}
            "#,
        );

        assert!(out.contains("def __init__(self, name: str) -> None:"));
        assert!(out.contains("self.name = name"));
    }

    #[test]
    fn super_call_is_rewritten() {
        let out = emit_source(
            r#"
class Animal {
    def Animal(name: str) { pass; }
}

class Dog extends Animal {
    def Dog(name: str) {
        super(name);
    }
}
            "#,
        );

        assert!(out.contains("super().__init__(name)"));
        assert!(out.contains("class Dog(Animal):"));
    }

    #[test]
    fn interface_becomes_protocol() {
        let out = emit_source(
            r#"
interface Shape {
    def area() -> float;
}
            "#,
        );

        assert!(out.contains("from typing import Protocol"));
        assert!(out.contains("from abc import abstractmethod"));
        assert!(out.contains("class Shape(Protocol):"));
        assert!(out.contains("@abstractmethod"));
        assert!(out.contains("def area(self) -> float:"));
        assert!(out.contains("..."));
    }

    #[test]
    fn abstract_class_extends_abc() {
        let out = emit_source(
            r#"
abstract class Animal {
    abstract def speak() -> str;
}
            "#,
        );

        assert!(out.contains("from abc import ABC, abstractmethod"));
        assert!(out.contains("class Animal(ABC):"));
        assert!(out.contains("raise NotImplementedError"));
    }

    #[test]
    fn final_class_is_guarded() {
        let out = emit_source("final class Config { }");

        assert!(out.contains("@final"));
        assert!(out.contains("def __init_subclass__(cls, **kwargs):"));
        assert!(out.contains("raise TypeError(\"class Config is final and cannot be extended\")"));
    }

    #[test]
    fn final_method_is_guarded() {
        let out = emit_source(
            r#"
class Base {
    final def id() -> int {
        return 1;
    }
}
            "#,
        );

        assert!(out.contains("@final"));
        assert!(out.contains("super().__init_subclass__(**kwargs)"));
        assert!(out.contains("for name in (\"id\",):"));
        assert!(out.contains("if name in cls.__dict__:"));
    }

    #[test]
    fn generic_class_gets_typevar() {
        let out = emit_source("class Box<T> { def Box(value: T) { pass; } }");

        assert!(out.contains("T = TypeVar('T')"));
        assert!(out.contains("class Box(Generic[T]):"));
        assert!(out.contains("from typing import Generic, TypeVar"));
    }

    #[test]
    fn bounded_typevar() {
        let out = emit_source(
            r#"
interface Comparable {
    def compare(other) -> int;
}

class Sorted<T extends Comparable> { }
            "#,
        );

        assert!(out.contains("T = TypeVar('T', bound=Comparable)"));
    }

    #[test]
    fn plain_enum_uses_auto() {
        let out = emit_source("enum Color { RED, GREEN, BLUE }");

        assert!(out.contains("from enum import Enum, auto"));
        assert!(out.contains("class Color(Enum):"));
        assert!(out.contains("RED = auto()"));
    }

    #[test]
    fn valued_enum_uses_tuples() {
        let out = emit_source("enum Planet { EARTH(5.97, 6371.0) }");

        assert!(out.contains("EARTH = ("));
        assert!(out.contains("5.97,"));
        assert!(out.contains("6371.0,"));
        assert!(!out.contains("auto()"));
    }

    #[test]
    fn enum_methods_are_instance_methods() {
        let out = emit_source(
            r#"
enum Planet {
    EARTH(5.97, 6371.0);

    def Planet(mass: float, radius: float) {
        self.mass = mass;
        self.radius = radius;
    }

    def describe() -> str {
        return f"{self.name}";
    }
}
            "#,
        );

        assert!(out.contains("def __init__(self, mass: float, radius: float) -> None:"));
        assert!(out.contains("def describe(self) -> str:"));
        assert!(!out.contains("def Planet("));
        assert!(!out.contains("def describe() ->"));
    }

    #[test]
    fn data_class_lowering() {
        let out = emit_source("data class Point(x: int, y: int);");

        assert!(out.contains("from dataclasses import dataclass"));
        assert!(out.contains("@dataclass"));
        assert!(out.contains("class Point:"));
        assert!(out.contains("x: int"));
        assert!(out.contains("y: int"));
    }

    #[test]
    fn static_method() {
        let out = emit_source(
            r#"
class MathUtil {
    static def square(x: int) -> int {
        return x * x;
    }
}
            "#,
        );

        assert!(out.contains("@staticmethod"));
        assert!(out.contains("def square(x: int) -> int:"));
    }

    #[test]
    fn fstring_lowering() {
        let out = emit_source(r#"def greet(name: str) -> str { return f"Hello, {name}!"; }"#);
        assert!(out.contains("return f\"Hello, {name}!\""));
    }

    #[test]
    fn final_variable_gets_final_annotation() {
        let out = emit_source("final limit: int = 10;");

        assert!(out.contains("from typing import Final"));
        assert!(out.contains("limit: Final[int] = 10"));
    }

    #[test]
    fn elif_folding() {
        let out = emit_source(
            r#"
def f(x: int) {
    if x < 0 {
        pass;
    } else if x == 0 {
        pass;
    } else {
        pass;
    }
}
            "#,
        );

        assert!(out.contains("elif x == 0:"));
    }

    #[test]
    fn overload_dispatcher() {
        let out = emit_source(
            r#"
def f(x: int) -> int { return x; }
def f(x: str) -> str { return x; }
            "#,
        );

        assert!(out.contains("def _f_0(x: int) -> int:"));
        assert!(out.contains("def _f_1(x: str) -> str:"));
        assert!(out.contains("def f(*args):"));
        assert!(out.contains("if len(args) == 1 and isinstance(args[0], int):"));
        assert!(out.contains("return _f_0(*args)"));
        assert!(out.contains("raise TypeError(\"no overload of f matches\")"));
    }

    #[test]
    fn precedence_parentheses() {
        let out = emit_source("x = (1 + 2) * 3;");
        assert!(out.contains("x = (1 + 2) * 3"));
    }

    #[test]
    fn module_imports_pass_through() {
        let src = "from geometry import Circle;\nimport util;";
        let (module, diagnostics) = parse("main", src);
        assert!(diagnostics.is_empty());

        // Resolution failures do not stop emission
        let (table, _) = bind(&module, &SymbolCache::new());
        let out = emit(&module, &table);

        assert!(out.contains("from geometry import Circle"));
        assert!(out.contains("import util"));
    }
}
