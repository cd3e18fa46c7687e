//! Type checking
//!
//! The checker walks a module's AST against its [SymbolTable] and reports
//! everything it finds as diagnostics. It never mutates the AST and it never
//! stops at the first problem.
//!
//! The language is a gradually typed one: an expression whose type cannot be
//! determined statically is treated as compatible with everything, and checks
//! that would need its type are skipped rather than guessed. Annotations are
//! taken at face value.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{self, ExpressionKind, StatementKind};
use crate::binding::{MethodSymbol, ParamSymbol, SymbolTable};
use crate::builtin;
use crate::common::{Span, TypeRef};
use crate::diagnostics::Diagnostic;

/// Check a bound module, returning everything found
pub fn check(module: &ast::Module, table: &SymbolTable) -> Vec<Diagnostic> {
    if table.poisoned {
        debug!("skipping checks for poisoned module {}", module.name);
        return Vec::new();
    }

    let mut checker = Checker {
        table,
        diagnostics: Vec::new(),
        scopes: Vec::new(),
        type_params: Vec::new(),
        current_class: None,
        current_method: None,
        in_static: false,
        in_constructor: false,
    };

    checker.check_module(module);
    checker.diagnostics
}

/// What the checker statically knows about an expression
#[derive(Debug, Clone, PartialEq)]
enum Ty {
    /// An instance of a named type
    Named(String),

    /// A reference to a type itself, e.g. a class used as a constructor
    /// or an enum used to access its variants
    Meta(String),

    Unknown,
}

impl Ty {
    fn from_annotation(annotation: &TypeRef) -> Self {
        Ty::Named(annotation.name.clone())
    }
}

struct VarInfo {
    ty: Ty,
    is_final: bool,
}

struct Checker<'a> {
    table: &'a SymbolTable,
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<HashMap<String, VarInfo>>,
    type_params: Vec<String>,
    current_class: Option<String>,
    current_method: Option<String>,
    in_static: bool,
    in_constructor: bool,
}

impl Checker<'_> {
    fn check_module(&mut self, module: &ast::Module) {
        self.scopes.push(HashMap::new());

        // Module-level names are visible to every function in the module,
        // regardless of declaration order
        for stmt in &module.body {
            match &stmt.kind {
                StatementKind::VarDecl { name, is_final, .. } => {
                    self.declare(name, Ty::Unknown, *is_final);
                }
                StatementKind::Assign { target, .. } => {
                    if let ExpressionKind::Var(name) = &target.kind {
                        if self.lookup(name).is_none() {
                            self.declare(name, Ty::Unknown, false);
                        }
                    }
                }
                _ => {}
            }
        }

        for stmt in &module.body {
            self.check_statement(stmt);
        }

        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: Ty, is_final: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), VarInfo { ty, is_final });
        }
    }

    fn lookup(&self, name: &str) -> Option<&VarInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn check_statement(&mut self, stmt: &ast::Statement) {
        match &stmt.kind {
            StatementKind::Import(_) | StatementKind::Pass => {}

            StatementKind::Interface(decl) => {
                for method in &decl.methods {
                    for param in &method.params {
                        if let Some(annotation) = &param.annotation {
                            self.check_annotation(annotation);
                        }
                    }
                    if let Some(ret) = &method.return_type {
                        self.check_annotation(ret);
                    }
                }
            }

            StatementKind::Class(decl) => self.check_class(decl),
            StatementKind::Enum(decl) => self.check_enum(decl),
            StatementKind::Function(decl) => self.check_function(decl, None),

            StatementKind::VarDecl {
                name,
                name_span,
                annotation,
                value,
                is_final,
            } => {
                if let Some(annotation) = annotation {
                    self.check_annotation(annotation);
                }

                let inferred = value.as_ref().map(|value| self.check_expression(value));

                let ty = match (annotation, inferred) {
                    (Some(annotation), _) => Ty::from_annotation(annotation),
                    (None, Some(ty @ Ty::Named(_))) => ty,
                    (None, _) => {
                        self.diagnostics.push(Diagnostic::CannotInferType {
                            name: name.clone(),
                            span: *name_span,
                        });
                        Ty::Unknown
                    }
                };

                self.declare(name, ty, *is_final);
            }

            StatementKind::Assign { target, op, value } => {
                let value_ty = self.check_expression(value);
                self.check_assign_target(target, *op, value_ty);
            }

            StatementKind::Expr(expr) | StatementKind::Raise(expr) => {
                self.check_expression(expr);
            }

            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.check_expression(value);
                }
            }

            StatementKind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.check_expression(condition);
                self.check_block(then_body);
                self.check_block(else_body);
            }

            StatementKind::While { condition, body } => {
                self.check_expression(condition);
                self.check_block(body);
            }

            StatementKind::For {
                var,
                iterable,
                body,
                ..
            } => {
                self.check_expression(iterable);
                self.scopes.push(HashMap::new());
                self.declare(var, Ty::Unknown, false);
                for stmt in body {
                    self.check_statement(stmt);
                }
                self.scopes.pop();
            }
        }
    }

    fn check_block(&mut self, body: &[ast::Statement]) {
        self.scopes.push(HashMap::new());
        for stmt in body {
            self.check_statement(stmt);
        }
        self.scopes.pop();
    }

    fn check_assign_target(&mut self, target: &ast::Expression, op: ast::AssignOp, value_ty: Ty) {
        match &target.kind {
            ExpressionKind::Var(name) => {
                if let Some(info) = self.lookup(name) {
                    if info.is_final {
                        self.diagnostics.push(Diagnostic::FinalReassignment {
                            name: name.clone(),
                            span: target.span,
                        });
                    } else if op == ast::AssignOp::Assign {
                        self.declare(name, value_ty, false);
                    }
                } else {
                    // First assignment doubles as a declaration, so like any
                    // other unannotated binding it must have an inferable
                    // type. Literals, typed calls and constructor calls do;
                    // anything else needs an annotated declaration.
                    match value_ty {
                        Ty::Named(_) => self.declare(name, value_ty, false),
                        _ => {
                            self.diagnostics.push(Diagnostic::CannotInferType {
                                name: name.clone(),
                                span: target.span,
                            });
                            self.declare(name, Ty::Unknown, false);
                        }
                    }
                }
            }

            ExpressionKind::Attribute {
                object,
                name,
                name_span,
            } => {
                let object_ty = self.check_expression(object);

                if let Ty::Named(class) = &object_ty {
                    if self.table.classes.contains_key(class) {
                        match self.table.resolve_field(class, name) {
                            Some(field) => {
                                if field.is_final && !self.in_constructor {
                                    self.diagnostics.push(Diagnostic::FinalReassignment {
                                        name: name.clone(),
                                        span: *name_span,
                                    });
                                }
                            }
                            None => self.diagnostics.push(Diagnostic::UnresolvedName {
                                name: name.clone(),
                                span: *name_span,
                            }),
                        }
                    }
                }
            }

            ExpressionKind::Subscript { object, index } => {
                self.check_expression(object);
                self.check_expression(index);
            }

            _ => {
                self.check_expression(target);
            }
        }
    }

    fn check_class(&mut self, decl: &ast::ClassDecl) {
        let previous_class = self.current_class.replace(decl.name.clone());
        let previous_params = std::mem::replace(
            &mut self.type_params,
            decl.type_params.iter().map(|tp| tp.name.clone()).collect(),
        );

        for tp in &decl.type_params {
            if let Some((bound, bound_span)) = &tp.bound {
                if !self.table.has_type(bound) && !builtin::is_builtin_type(bound) {
                    self.diagnostics.push(Diagnostic::UnresolvedName {
                        name: bound.clone(),
                        span: *bound_span,
                    });
                }
            }
        }

        if let Some((superclass, superclass_span)) = &decl.superclass {
            if let Some(symbol) = self.table.classes.get(superclass) {
                if symbol.is_final {
                    self.diagnostics.push(Diagnostic::FinalClassExtended {
                        class: superclass.clone(),
                        span: *superclass_span,
                    });
                }
            }
        }

        self.check_overrides(decl);
        if !decl.is_abstract {
            self.check_contracts(decl);
        }

        for member in &decl.members {
            match &member.kind {
                StatementKind::VarDecl {
                    annotation, value, ..
                } => {
                    if let Some(annotation) = annotation {
                        self.check_annotation(annotation);
                    }
                    if let Some(value) = value {
                        self.check_expression(value);
                    }
                }
                StatementKind::Function(method) => {
                    self.check_function(method, Some(&decl.name));
                }
                _ => {}
            }
        }

        self.type_params = previous_params;
        self.current_class = previous_class;
    }

    fn check_enum(&mut self, decl: &ast::EnumDecl) {
        for variant in &decl.variants {
            for value in &variant.values {
                self.check_expression(value);
            }
        }

        let previous_class = self.current_class.replace(decl.name.clone());
        for method in &decl.methods {
            self.check_function(method, Some(&decl.name));
        }
        self.current_class = previous_class;
    }

    /// Flag methods that override a final method somewhere up the chain
    fn check_overrides(&mut self, decl: &ast::ClassDecl) {
        for member in &decl.members {
            let StatementKind::Function(method) = &member.kind else {
                continue;
            };
            if method.name == decl.name {
                continue;
            }

            let mut current = decl.superclass.as_ref().map(|(name, _)| name.clone());
            while let Some(sup_name) = current {
                let Some(sup) = self.table.classes.get(&sup_name) else {
                    break;
                };
                if let Some(overloads) = sup.methods.get(&method.name) {
                    if overloads.iter().any(|m| m.is_final) {
                        self.diagnostics.push(Diagnostic::FinalMethodOverridden {
                            method: method.name.clone(),
                            class: sup_name,
                            span: method.name_span,
                        });
                    }
                    break;
                }
                current = sup.superclass.clone();
            }
        }
    }

    /// A concrete class has to provide a body for every interface method and
    /// every abstract method it inherits
    fn check_contracts(&mut self, decl: &ast::ClassDecl) {
        for interface in self.table.interfaces_of(&decl.name) {
            for overloads in interface.methods.values() {
                for required in overloads {
                    self.check_one_contract(decl, required, &interface.name);
                }
            }
        }

        let mut current = decl.superclass.as_ref().map(|(name, _)| name.clone());
        while let Some(sup_name) = current {
            let Some(sup) = self.table.classes.get(&sup_name) else {
                break;
            };
            for overloads in sup.methods.values() {
                for required in overloads.iter().filter(|m| m.is_abstract) {
                    self.check_one_contract(decl, required, &sup_name);
                }
            }
            current = sup.superclass.clone();
        }
    }

    fn check_one_contract(&mut self, decl: &ast::ClassDecl, required: &MethodSymbol, origin: &str) {
        let implementation = self
            .table
            .resolve_methods(&decl.name, &required.name)
            .and_then(|overloads| {
                overloads.iter().find(|m| {
                    m.params.len() == required.params.len() && m.has_body && !m.is_abstract
                })
            });

        match implementation {
            None => self.diagnostics.push(Diagnostic::UnimplementedContract {
                class: decl.name.clone(),
                method: required.name.clone(),
                origin: origin.to_string(),
                span: decl.name_span,
                origin_span: required.span,
            }),
            Some(found) => {
                if found.return_type != required.return_type {
                    self.diagnostics.push(Diagnostic::ReturnTypeMismatch {
                        method: required.name.clone(),
                        origin: origin.to_string(),
                        expected: display_type(&required.return_type),
                        found: display_type(&found.return_type),
                        span: found.span,
                        origin_span: required.span,
                    });
                }
            }
        }
    }

    fn check_function(&mut self, decl: &ast::FunctionDecl, class: Option<&str>) {
        self.scopes.push(HashMap::new());

        let previous_method = self.current_method.replace(decl.name.clone());
        let previous_static = self.in_static;
        let previous_constructor = self.in_constructor;
        self.in_static = decl.is_static && class.is_some();
        self.in_constructor = class == Some(decl.name.as_str());

        for param in &decl.params {
            // An explicit self parameter is typed below like an implicit one
            if class.is_some() && param.name == "self" {
                continue;
            }

            if let Some(annotation) = &param.annotation {
                self.check_annotation(annotation);
            }
            if let Some(default) = &param.default {
                self.check_expression(default);
            }

            let ty = param
                .annotation
                .as_ref()
                .map(Ty::from_annotation)
                .unwrap_or(Ty::Unknown);
            self.declare(&param.name, ty, false);
        }

        if let Some(ret) = &decl.return_type {
            self.check_annotation(ret);
        }

        if let Some(class) = class {
            if !self.in_static {
                self.declare("self", Ty::Named(class.to_string()), false);
            }
        }

        for stmt in &decl.body {
            self.check_statement(stmt);
        }

        self.in_constructor = previous_constructor;
        self.in_static = previous_static;
        self.current_method = previous_method;
        self.scopes.pop();
    }

    fn check_annotation(&mut self, annotation: &TypeRef) {
        let base = annotation.name.split('.').next().unwrap_or_default();

        let known = builtin::is_builtin_type(&annotation.name)
            || self.table.has_type(&annotation.name)
            || self.type_params.iter().any(|tp| tp == &annotation.name)
            || self.table.modules.iter().any(|m| m == base);

        if !known {
            self.diagnostics.push(Diagnostic::UnknownAnnotatedType {
                name: annotation.name.clone(),
                span: annotation.span,
            });
        }

        for arg in &annotation.args {
            self.check_annotation(arg);
        }
    }

    fn check_expression(&mut self, expr: &ast::Expression) -> Ty {
        match &expr.kind {
            ExpressionKind::Int(_) => Ty::Named(String::from("int")),
            ExpressionKind::Float(_) => Ty::Named(String::from("float")),
            ExpressionKind::Str(_) => Ty::Named(String::from("str")),
            ExpressionKind::Bool(_) => Ty::Named(String::from("bool")),
            ExpressionKind::None => Ty::Named(String::from("None")),

            ExpressionKind::FString(parts) => {
                for part in parts {
                    if let ast::FStringPart::Expr(inner) = part {
                        self.check_expression(inner);
                    }
                }
                Ty::Named(String::from("str"))
            }

            ExpressionKind::Var(name) => self.resolve_var(name, expr.span),

            ExpressionKind::Attribute {
                object,
                name,
                name_span,
            } => {
                let object_ty = self.check_expression(object);
                self.attribute_type(object_ty, name, *name_span)
            }

            ExpressionKind::Subscript { object, index } => {
                let object_ty = self.check_expression(object);
                self.check_expression(index);

                // A subscripted class is still the class, e.g. Stack[int]()
                match object_ty {
                    Ty::Meta(name) => Ty::Meta(name),
                    _ => Ty::Unknown,
                }
            }

            ExpressionKind::Call { callee, args } => self.check_call(callee, args, expr.span),

            ExpressionKind::Unary { operand, .. } => {
                self.check_expression(operand);
                Ty::Unknown
            }

            ExpressionKind::Binary { op, lhs, rhs } => {
                self.check_expression(lhs);
                self.check_expression(rhs);
                match op {
                    ast::BinaryOperation::Equals
                    | ast::BinaryOperation::NotEquals
                    | ast::BinaryOperation::Less
                    | ast::BinaryOperation::LessEq
                    | ast::BinaryOperation::Greater
                    | ast::BinaryOperation::GreaterEq
                    | ast::BinaryOperation::And
                    | ast::BinaryOperation::Or
                    | ast::BinaryOperation::In => Ty::Named(String::from("bool")),
                    _ => Ty::Unknown,
                }
            }

            ExpressionKind::List(items) => {
                for item in items {
                    self.check_expression(item);
                }
                Ty::Named(String::from("list"))
            }
        }
    }

    fn resolve_var(&mut self, name: &str, span: Span) -> Ty {
        if name == "self" && self.in_static {
            self.diagnostics.push(Diagnostic::SelfInStaticMethod {
                method: self.current_method.clone().unwrap_or_default(),
                span,
            });
            return Ty::Unknown;
        }

        if let Some(info) = self.lookup(name) {
            return info.ty.clone();
        }

        if self.table.classes.contains_key(name)
            || self.table.interfaces.contains_key(name)
            || self.table.enums.contains_key(name)
        {
            return Ty::Meta(name.to_string());
        }

        if self.table.functions.contains_key(name)
            || self.table.modules.iter().any(|m| m == name)
            || self.type_params.iter().any(|tp| tp == name)
            || builtin::is_builtin(name)
        {
            return Ty::Unknown;
        }

        self.diagnostics.push(Diagnostic::UnresolvedName {
            name: name.to_string(),
            span,
        });
        Ty::Unknown
    }

    fn attribute_type(&mut self, object_ty: Ty, name: &str, name_span: Span) -> Ty {
        match object_ty {
            Ty::Meta(type_name) => {
                if let Some(symbol) = self.table.enums.get(&type_name) {
                    if symbol.variants.iter().any(|v| v == name) {
                        return Ty::Named(type_name);
                    }
                    if symbol.methods.contains_key(name) {
                        return Ty::Unknown;
                    }
                    self.diagnostics.push(Diagnostic::UnresolvedName {
                        name: name.to_string(),
                        span: name_span,
                    });
                    return Ty::Unknown;
                }

                if self.table.classes.contains_key(&type_name) {
                    if self.table.resolve_methods(&type_name, name).is_none() {
                        self.diagnostics.push(Diagnostic::UnresolvedName {
                            name: name.to_string(),
                            span: name_span,
                        });
                    }
                }
                Ty::Unknown
            }

            Ty::Named(type_name) => {
                if self.table.classes.contains_key(&type_name) {
                    if let Some(field) = self.table.resolve_field(&type_name, name) {
                        return field
                            .annotation
                            .as_ref()
                            .map(Ty::from_annotation)
                            .unwrap_or(Ty::Unknown);
                    }
                    if self.table.resolve_methods(&type_name, name).is_some() {
                        return Ty::Unknown;
                    }
                    self.diagnostics.push(Diagnostic::UnresolvedName {
                        name: name.to_string(),
                        span: name_span,
                    });
                    return Ty::Unknown;
                }

                if let Some(symbol) = self.table.enums.get(&type_name) {
                    // Fields set by the enum constructor read back as
                    // ordinary attributes
                    let constructor_field = symbol
                        .methods
                        .get(&type_name)
                        .and_then(|overloads| overloads.first())
                        .is_some_and(|ctor| ctor.params.iter().any(|p| p.name == *name));

                    if name == "value"
                        || name == "name"
                        || constructor_field
                        || symbol.methods.contains_key(name)
                    {
                        return Ty::Unknown;
                    }
                    self.diagnostics.push(Diagnostic::UnresolvedName {
                        name: name.to_string(),
                        span: name_span,
                    });
                }
                Ty::Unknown
            }

            Ty::Unknown => Ty::Unknown,
        }
    }

    fn check_call(&mut self, callee: &ast::Expression, args: &[ast::Expression], span: Span) -> Ty {
        let arg_tys: Vec<Ty> = args.iter().map(|arg| self.check_expression(arg)).collect();

        match &callee.kind {
            ExpressionKind::Var(name) => {
                if self.lookup(name).is_some() {
                    // A callable value, nothing to resolve statically
                    return Ty::Unknown;
                }

                if self.table.classes.contains_key(name) {
                    return self.constructor_call(name, args, &arg_tys, span);
                }

                if let Some(overloads) = self.table.functions.get(name) {
                    let candidates: Vec<Candidate> = overloads
                        .iter()
                        .map(|f| Candidate {
                            params: &f.params,
                            return_type: f.return_type.as_ref(),
                        })
                        .collect();
                    return self.resolve_overload(name, &candidates, &arg_tys, span);
                }

                if self.table.enums.contains_key(name)
                    || self.table.modules.iter().any(|m| m == name)
                    || builtin::is_builtin(name)
                {
                    return Ty::Unknown;
                }

                self.diagnostics.push(Diagnostic::UnresolvedName {
                    name: name.clone(),
                    span: callee.span,
                });
                Ty::Unknown
            }

            ExpressionKind::Attribute {
                object,
                name,
                name_span,
            } => {
                let object_ty = self.check_expression(object);
                self.method_call(object_ty, name, *name_span, &arg_tys, span)
            }

            ExpressionKind::Subscript { object, index } => {
                let object_ty = self.check_expression(object);
                self.check_expression(index);

                if let Ty::Meta(name) = object_ty {
                    if self.table.classes.contains_key(&name) {
                        return self.constructor_call(&name, args, &arg_tys, span);
                    }
                }
                Ty::Unknown
            }

            _ => {
                self.check_expression(callee);
                Ty::Unknown
            }
        }
    }

    fn method_call(
        &mut self,
        object_ty: Ty,
        name: &str,
        name_span: Span,
        arg_tys: &[Ty],
        span: Span,
    ) -> Ty {
        let type_name = match &object_ty {
            Ty::Named(type_name) | Ty::Meta(type_name) => type_name.clone(),
            Ty::Unknown => return Ty::Unknown,
        };

        if self.table.classes.contains_key(&type_name) {
            match self.table.resolve_methods(&type_name, name) {
                Some(overloads) => {
                    let candidates: Vec<Candidate> = overloads
                        .iter()
                        .map(|m| Candidate {
                            params: &m.params,
                            return_type: m.return_type.as_ref(),
                        })
                        .collect();
                    return self.resolve_overload(name, &candidates, arg_tys, span);
                }
                None => {
                    self.diagnostics.push(Diagnostic::UnresolvedName {
                        name: name.to_string(),
                        span: name_span,
                    });
                    return Ty::Unknown;
                }
            }
        }

        if let Some(symbol) = self.table.enums.get(&type_name) {
            if let Some(overloads) = symbol.methods.get(name) {
                let candidates: Vec<Candidate> = overloads
                    .iter()
                    .map(|m| Candidate {
                        params: &m.params,
                        return_type: m.return_type.as_ref(),
                    })
                    .collect();
                return self.resolve_overload(name, &candidates, arg_tys, span);
            }
            if matches!(object_ty, Ty::Meta(_)) || name == "value" || name == "name" {
                return Ty::Unknown;
            }
            self.diagnostics.push(Diagnostic::UnresolvedName {
                name: name.to_string(),
                span: name_span,
            });
        }

        Ty::Unknown
    }

    fn constructor_call(
        &mut self,
        class: &str,
        args: &[ast::Expression],
        arg_tys: &[Ty],
        span: Span,
    ) -> Ty {
        let symbol = &self.table.classes[class];

        // Data classes take their fields as constructor arguments
        let data_params: Vec<ParamSymbol>;
        let params: &[ParamSymbol] = if let Some(ctor) = self.table.resolve_constructor(class) {
            &ctor.params
        } else if symbol.is_data {
            data_params = symbol
                .fields
                .iter()
                .map(|f| ParamSymbol {
                    name: f.name.clone(),
                    annotation: f.annotation.clone(),
                    has_default: false,
                })
                .collect();
            &data_params
        } else {
            &[]
        };

        let candidates = [Candidate {
            params,
            return_type: None,
        }];
        self.resolve_overload(class, &candidates, arg_tys, span);

        self.check_bounds(class, params, args, arg_tys);

        Ty::Named(class.to_string())
    }

    /// Check bounded type parameters against statically known argument types
    fn check_bounds(
        &mut self,
        class: &str,
        params: &[ParamSymbol],
        args: &[ast::Expression],
        arg_tys: &[Ty],
    ) {
        let symbol = &self.table.classes[class];

        for tp in &symbol.type_params {
            let Some(bound) = &tp.bound else { continue };

            for (i, param) in params.iter().enumerate() {
                let uses_param = param
                    .annotation
                    .as_ref()
                    .is_some_and(|annotation| annotation.name == tp.name);
                if !uses_param {
                    continue;
                }

                let (Some(Ty::Named(found)), Some(arg)) = (arg_tys.get(i), args.get(i)) else {
                    continue;
                };

                if found != bound && !self.table.is_subtype(found, bound) {
                    self.diagnostics.push(Diagnostic::GenericBoundNotSatisfied {
                        param: tp.name.clone(),
                        bound: bound.clone(),
                        found: found.clone(),
                        span: arg.span,
                    });
                }
            }
        }
    }

    /// Pick the overload the arguments fit best
    ///
    /// An argument of unknown type is compatible with every parameter, an
    /// exact type match beats a subtype match. When several overloads fit
    /// equally well the call is ambiguous.
    fn resolve_overload(
        &mut self,
        name: &str,
        candidates: &[Candidate],
        arg_tys: &[Ty],
        span: Span,
    ) -> Ty {
        let mut scored: Vec<(u32, &Candidate)> = candidates
            .iter()
            .filter_map(|c| self.match_score(c.params, arg_tys).map(|score| (score, c)))
            .collect();

        if scored.is_empty() {
            let signatures: Vec<String> = candidates
                .iter()
                .map(|c| display_signature(name, c.params))
                .collect();
            self.diagnostics.push(Diagnostic::NoMatchingOverload {
                name: name.to_string(),
                candidates: Some(format!("Candidates: {}", signatures.join(", "))),
                span,
            });
            return Ty::Unknown;
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        let best = scored[0].0;
        if scored.len() > 1 && scored[1].0 == best {
            self.diagnostics.push(Diagnostic::AmbiguousCall {
                name: name.to_string(),
                span,
            });
            return Ty::Unknown;
        }

        scored[0]
            .1
            .return_type
            .map(|ret| Ty::Named(ret.name.clone()))
            .unwrap_or(Ty::Unknown)
    }

    fn known_type(&self, name: &str) -> bool {
        builtin::is_builtin_type(name) || self.table.has_type(name)
    }

    fn match_score(&self, params: &[ParamSymbol], arg_tys: &[Ty]) -> Option<u32> {
        let required = params.iter().filter(|p| !p.has_default).count();
        if arg_tys.len() < required || arg_tys.len() > params.len() {
            return None;
        }

        let mut score = 0;
        for (arg, param) in arg_tys.iter().zip(params.iter()) {
            match (arg, &param.annotation) {
                (_, None) => score += 1,
                (Ty::Unknown | Ty::Meta(_), _) => score += 1,
                // Type parameters and unknown annotations accept anything;
                // bound violations are reported separately
                (_, Some(annotation)) if !self.known_type(&annotation.name) => score += 1,
                (Ty::Named(t), Some(annotation)) if *t == annotation.name => score += 3,
                (Ty::Named(t), Some(annotation)) if self.table.is_subtype(t, &annotation.name) => {
                    score += 2
                }
                _ => return None,
            }
        }
        Some(score)
    }
}

/// One callable signature under overload resolution
struct Candidate<'a> {
    params: &'a [ParamSymbol],
    return_type: Option<&'a TypeRef>,
}

fn display_type(typ: &Option<TypeRef>) -> String {
    typ.as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| String::from("None"))
}

fn display_signature(name: &str, params: &[ParamSymbol]) -> String {
    let params: Vec<String> = params
        .iter()
        .map(|p| {
            p.annotation
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| String::from("?"))
        })
        .collect();
    format!("{name}({})", params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{bind, SymbolCache};
    use crate::parsing::parse;

    fn check_source(source: &str) -> Vec<Diagnostic> {
        let (module, diagnostics) = parse("main", source);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        let (table, bind_diagnostics) = bind(&module, &SymbolCache::new());
        assert!(
            bind_diagnostics.is_empty(),
            "unexpected: {bind_diagnostics:?}"
        );
        check(&module, &table)
    }

    fn assert_clean(source: &str) {
        let diagnostics = check_source(source);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    }

    #[test]
    fn satisfied_contract() {
        assert_clean(
            r#"
interface Shape {
    def area() -> float;
}

class Circle implements Shape {
    radius: float;

    def area() -> float {
        return 3.14 * self.radius * self.radius;
    }
}
            "#,
        );
    }

    #[test]
    fn missing_contract_method() {
        let diagnostics = check_source(
            r#"
interface Shape {
    def area() -> float;
}

class Circle implements Shape {
    radius: float;
}
            "#,
        );

        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnimplementedContract { class, method, .. }
                if class == "Circle" && method == "area"
        )));
    }

    #[test]
    fn contract_return_type_must_match() {
        let diagnostics = check_source(
            r#"
interface Shape {
    def area() -> float;
}

class Circle implements Shape {
    def area() -> int {
        return 3;
    }
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ReturnTypeMismatch { .. })));
    }

    #[test]
    fn abstract_class_skips_contracts() {
        assert_clean(
            r#"
interface Shape {
    def area() -> float;
}

abstract class Base implements Shape { }
            "#,
        );
    }

    #[test]
    fn inherited_abstract_method_must_be_implemented() {
        let diagnostics = check_source(
            r#"
abstract class Animal {
    abstract def speak() -> str;
}

class Dog extends Animal { }
            "#,
        );

        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnimplementedContract { method, origin, .. }
                if method == "speak" && origin == "Animal"
        )));
    }

    #[test]
    fn final_class_cannot_be_extended() {
        let diagnostics = check_source(
            r#"
final class Sealed { }
class Sub extends Sealed { }
            "#,
        );

        let overrides: Vec<_> = diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::FinalClassExtended { .. }))
            .collect();
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn final_method_cannot_be_overridden() {
        let diagnostics = check_source(
            r#"
class Base {
    final def id() -> int {
        return 1;
    }
}

class Sub extends Base {
    def id() -> int {
        return 2;
    }
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FinalMethodOverridden { class, .. } if class == "Base")));
    }

    #[test]
    fn final_variable_cannot_be_reassigned() {
        let diagnostics = check_source(
            r#"
final limit = 10;
limit = 11;
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FinalReassignment { name, .. } if name == "limit")));
    }

    #[test]
    fn overload_picks_exact_match() {
        assert_clean(
            r#"
class Animal { }
class Dog extends Animal { }

def handle(a: Animal) { pass; }
def handle(d: Dog) { pass; }

d: Dog = Dog();
handle(d);
            "#,
        );
    }

    #[test]
    fn no_matching_overload() {
        let diagnostics = check_source(
            r#"
def f(x: int) { pass; }
def f(x: str) { pass; }

f(True, False);
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NoMatchingOverload { .. })));
    }

    #[test]
    fn unknown_argument_is_ambiguous() {
        let diagnostics = check_source(
            r#"
def f(x: int) { pass; }
def f(x: str) { pass; }

def g(anything) {
    f(anything);
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::AmbiguousCall { .. })));
    }

    #[test]
    fn final_without_inferable_type() {
        let diagnostics = check_source(
            r#"
def mystery() { pass; }
final x = mystery();
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CannotInferType { name, .. } if name == "x")));
    }

    #[test]
    fn assignment_from_untyped_call_needs_annotation() {
        let diagnostics = check_source(
            r#"
def mystery() { pass; }
x = mystery();
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CannotInferType { name, .. } if name == "x")));
    }

    #[test]
    fn assignment_from_literal_infers() {
        assert_clean(
            r#"
x = 1;
y = "two";
x = 3;
print(f"{x} {y}");
            "#,
        );
    }

    #[test]
    fn inference_from_constructor() {
        assert_clean(
            r#"
class Point {
    x: int;
    y: int;

    def Point(x: int, y: int) {
        self.x = x;
        self.y = y;
    }
}

final origin = Point(0, 0);
print(origin.x);
            "#,
        );
    }

    #[test]
    fn generic_bound_enforced() {
        let diagnostics = check_source(
            r#"
interface Comparable {
    def compare(other) -> int;
}

class Sorted<T extends Comparable> {
    def Sorted(first: T) { pass; }
}

class Plain { }

p: Plain = Plain();
s = Sorted(p);
            "#,
        );

        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::GenericBoundNotSatisfied { param, bound, .. }
                if param == "T" && bound == "Comparable"
        )));
    }

    #[test]
    fn unbounded_generic_accepts_everything() {
        assert_clean(
            r#"
class Box<T> {
    def Box(value: T) { pass; }
}

a = Box(1);
b = Box("two");
            "#,
        );
    }

    #[test]
    fn self_in_static_method() {
        let diagnostics = check_source(
            r#"
class Counter {
    static def make() {
        return self;
    }
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::SelfInStaticMethod { method, .. } if method == "make")));
    }

    #[test]
    fn unknown_annotation_is_a_warning() {
        let diagnostics = check_source("x: Widget = make_widget();");

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownAnnotatedType { name, .. } if name == "Widget")));
        assert!(diagnostics
            .iter()
            .all(|d| d.is_error() == !matches!(d, Diagnostic::UnknownAnnotatedType { .. })));
    }

    #[test]
    fn unresolved_variable() {
        let diagnostics = check_source("print(nothing_here);");

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvedName { name, .. } if name == "nothing_here")));
    }

    #[test]
    fn data_class_constructor_uses_fields() {
        let diagnostics = check_source(
            r#"
data class Point {
    x: int;
    y: int;
}

p = Point(1, 2);
q = Point(1);
            "#,
        );

        let mismatches: Vec<_> = diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::NoMatchingOverload { .. }))
            .collect();
        assert_eq!(mismatches.len(), 1);
    }

    #[test]
    fn enum_variants_resolve() {
        assert_clean(
            r#"
enum Color {
    RED,
    GREEN,
}

c = Color.RED;
print(c.name);
            "#,
        );
    }

    #[test]
    fn enum_constructor_fields_resolve() {
        assert_clean(
            r#"
enum Planet {
    EARTH(5.97, 6371.0);

    def Planet(mass: float, radius: float) {
        self.mass = mass;
        self.radius = radius;
    }

    def describe() -> str {
        return f"{self.name}: {self.radius}";
    }
}

p: Planet = Planet.EARTH;
print(p.describe());
            "#,
        );
    }
}
