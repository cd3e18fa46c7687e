//! Symbol binding
//!
//! This module builds a [SymbolTable] for a parsed module. Binding runs in two
//! passes: the first declares every top-level name and the members of each
//! class, the second resolves superclass and interface references and walks
//! the inheritance hierarchy to detect cycles.
//!
//! Imported names are resolved against the [SymbolCache] of previously bound
//! modules and copied into the importing module's table, so later stages never
//! have to reach across module boundaries.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{self, StatementKind};
use crate::common::{Span, TypeRef};
use crate::diagnostics::Diagnostic;

/// Symbol tables of already compiled modules, keyed by module name
#[derive(Debug, Default)]
pub struct SymbolCache {
    tables: HashMap<String, SymbolTable>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: SymbolTable) {
        self.tables.insert(table.module.clone(), table);
    }

    pub fn get(&self, module: &str) -> Option<&SymbolTable> {
        self.tables.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.tables.contains_key(module)
    }
}

/// Everything the later stages need to know about a module's declarations
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub module: String,
    pub classes: HashMap<String, ClassSymbol>,
    pub interfaces: HashMap<String, InterfaceSymbol>,
    pub enums: HashMap<String, EnumSymbol>,
    pub functions: HashMap<String, Vec<FunctionSymbol>>,

    /// Names of modules imported wholesale (`import geometry;`)
    pub modules: Vec<String>,

    /// Set when the inheritance hierarchy contains a cycle. A poisoned table
    /// is not checked further and nothing is emitted for its module.
    pub poisoned: bool,
}

#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub span: Span,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_data: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub type_params: Vec<TypeParamSymbol>,
    pub constructor: Option<MethodSymbol>,
    pub methods: HashMap<String, Vec<MethodSymbol>>,

    /// Declared fields, in declaration order
    pub fields: Vec<FieldSymbol>,
}

impl ClassSymbol {
    pub fn field(&self, name: &str) -> Option<&FieldSymbol> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub name: String,
    pub span: Span,
    pub extends: Vec<String>,
    pub type_params: Vec<TypeParamSymbol>,
    pub methods: HashMap<String, Vec<MethodSymbol>>,
}

#[derive(Debug, Clone)]
pub struct EnumSymbol {
    pub name: String,
    pub span: Span,
    pub variants: Vec<String>,

    /// True when the variants carry associated values
    pub valued: bool,

    pub methods: HashMap<String, Vec<MethodSymbol>>,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    pub span: Span,
    pub params: Vec<ParamSymbol>,
    pub return_type: Option<TypeRef>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub has_body: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub span: Span,
    pub params: Vec<ParamSymbol>,
    pub return_type: Option<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct ParamSymbol {
    pub name: String,
    pub annotation: Option<TypeRef>,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct FieldSymbol {
    pub name: String,
    pub span: Span,
    pub annotation: Option<TypeRef>,
    pub is_final: bool,
}

impl SymbolTable {
    /// Whether a top-level type of this name exists
    pub fn has_type(&self, name: &str) -> bool {
        self.classes.contains_key(name)
            || self.interfaces.contains_key(name)
            || self.enums.contains_key(name)
    }

    /// Find overloads of a method, walking up the superclass chain
    pub fn resolve_methods(&self, class: &str, method: &str) -> Option<&Vec<MethodSymbol>> {
        let mut current = self.classes.get(class);
        while let Some(symbol) = current {
            if let Some(overloads) = symbol.methods.get(method) {
                return Some(overloads);
            }
            current = symbol
                .superclass
                .as_deref()
                .and_then(|sup| self.classes.get(sup));
        }
        None
    }

    /// Find the constructor a class would use, its own or an inherited one
    pub fn resolve_constructor(&self, class: &str) -> Option<&MethodSymbol> {
        let mut current = self.classes.get(class);
        while let Some(symbol) = current {
            if let Some(ctor) = &symbol.constructor {
                return Some(ctor);
            }
            current = symbol
                .superclass
                .as_deref()
                .and_then(|sup| self.classes.get(sup));
        }
        None
    }

    /// Find a field, walking up the superclass chain
    pub fn resolve_field(&self, class: &str, field: &str) -> Option<&FieldSymbol> {
        let mut current = self.classes.get(class);
        while let Some(symbol) = current {
            if let Some(found) = symbol.field(field) {
                return Some(found);
            }
            current = symbol
                .superclass
                .as_deref()
                .and_then(|sup| self.classes.get(sup));
        }
        None
    }

    /// Whether `sub` is `sup` or transitively extends or implements it
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }

        if let Some(class) = self.classes.get(sub) {
            if let Some(parent) = &class.superclass {
                if self.is_subtype(parent, sup) {
                    return true;
                }
            }
            return class.interfaces.iter().any(|i| self.is_subtype(i, sup));
        }

        if let Some(interface) = self.interfaces.get(sub) {
            return interface.extends.iter().any(|i| self.is_subtype(i, sup));
        }

        false
    }

    /// All interfaces a class has to satisfy, including inherited ones
    pub fn interfaces_of(&self, class: &str) -> Vec<&InterfaceSymbol> {
        let mut result = Vec::new();
        let mut stack: Vec<&str> = Vec::new();

        let mut current = self.classes.get(class);
        while let Some(symbol) = current {
            stack.extend(symbol.interfaces.iter().map(String::as_str));
            current = symbol
                .superclass
                .as_deref()
                .and_then(|sup| self.classes.get(sup));
        }

        while let Some(name) = stack.pop() {
            if let Some(interface) = self.interfaces.get(name) {
                if result.iter().any(|i: &&InterfaceSymbol| i.name == interface.name) {
                    continue;
                }
                stack.extend(interface.extends.iter().map(String::as_str));
                result.push(interface);
            }
        }

        result
    }
}

/// Build the symbol table for a module
pub fn bind(module: &ast::Module, cache: &SymbolCache) -> (SymbolTable, Vec<Diagnostic>) {
    debug!("binding module {}", module.name);

    let mut binder = Binder {
        table: SymbolTable {
            module: module.name.clone(),
            ..SymbolTable::default()
        },
        declared: HashMap::new(),
        imported: std::collections::HashSet::new(),
        diagnostics: Vec::new(),
        cache,
    };

    binder.declare_all(module);
    binder.resolve_bases();
    binder.detect_cycles();

    (binder.table, binder.diagnostics)
}

struct Binder<'a> {
    table: SymbolTable,
    declared: HashMap<String, Span>,
    imported: std::collections::HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    cache: &'a SymbolCache,
}

impl Binder<'_> {
    fn declare_all(&mut self, module: &ast::Module) {
        for stmt in &module.body {
            match &stmt.kind {
                StatementKind::Import(import) => self.declare_import(import),
                StatementKind::Interface(decl) => self.declare_interface(decl),
                StatementKind::Class(decl) => self.declare_class(decl),
                StatementKind::Enum(decl) => self.declare_enum(decl),
                StatementKind::Function(decl) => self.declare_function(decl),
                _ => {}
            }
        }
    }

    /// Copy the symbols an import refers to into this module's table
    fn declare_import(&mut self, import: &ast::Import) {
        let (module, module_span) = &import.module;

        let Some(source) = self.cache.get(module) else {
            self.diagnostics.push(Diagnostic::UnresolvedImport {
                module: module.clone(),
                span: *module_span,
            });
            return;
        };

        if import.names.is_empty() {
            self.table.modules.push(module.clone());
            return;
        }

        for (name, name_span) in &import.names {
            self.imported.insert(name.clone());
            if let Some(class) = source.classes.get(name) {
                self.table.classes.insert(name.clone(), class.clone());
            } else if let Some(interface) = source.interfaces.get(name) {
                self.table
                    .interfaces
                    .insert(name.clone(), interface.clone());
            } else if let Some(decl) = source.enums.get(name) {
                self.table.enums.insert(name.clone(), decl.clone());
            } else if let Some(overloads) = source.functions.get(name) {
                self.table.functions.insert(name.clone(), overloads.clone());
            } else {
                self.diagnostics.push(Diagnostic::UnresolvedName {
                    name: name.clone(),
                    span: *name_span,
                });
            }
        }
    }

    fn check_unique(&mut self, name: &str, span: Span) -> bool {
        if let Some(first_span) = self.declared.get(name) {
            self.diagnostics.push(Diagnostic::DuplicateDefinition {
                name: name.to_string(),
                span,
                first_span: *first_span,
            });
            false
        } else {
            self.declared.insert(name.to_string(), span);
            true
        }
    }

    fn declare_class(&mut self, decl: &ast::ClassDecl) {
        if !self.check_unique(&decl.name, decl.name_span) {
            return;
        }

        let mut symbol = ClassSymbol {
            name: decl.name.clone(),
            span: decl.name_span,
            is_abstract: decl.is_abstract,
            is_final: decl.is_final,
            is_data: decl.is_data,
            superclass: decl.superclass.as_ref().map(|(name, _)| name.clone()),
            interfaces: decl
                .interfaces
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
            type_params: decl
                .type_params
                .iter()
                .map(|tp| TypeParamSymbol {
                    name: tp.name.clone(),
                    bound: tp.bound.as_ref().map(|(name, _)| name.clone()),
                })
                .collect(),
            constructor: None,
            methods: HashMap::new(),
            fields: Vec::new(),
        };

        let mut field_spans: HashMap<String, Span> = HashMap::new();

        for member in &decl.members {
            match &member.kind {
                StatementKind::VarDecl {
                    name,
                    name_span,
                    annotation,
                    is_final,
                    ..
                } => {
                    if let Some(first_span) = field_spans.get(name) {
                        self.diagnostics.push(Diagnostic::DuplicateDefinition {
                            name: name.clone(),
                            span: *name_span,
                            first_span: *first_span,
                        });
                        continue;
                    }
                    field_spans.insert(name.clone(), *name_span);
                    symbol.fields.push(FieldSymbol {
                        name: name.clone(),
                        span: *name_span,
                        annotation: annotation.clone(),
                        is_final: *is_final,
                    });
                }
                StatementKind::Function(method) => {
                    let method_symbol = self.method_symbol(method);

                    if method.name == decl.name {
                        if symbol.constructor.is_some() {
                            self.diagnostics.push(Diagnostic::MultipleConstructors {
                                class: decl.name.clone(),
                                span: method.name_span,
                            });
                        } else {
                            symbol.constructor = Some(method_symbol);
                        }
                        continue;
                    }

                    let overloads = symbol.methods.entry(method.name.clone()).or_default();
                    check_overload(&mut self.diagnostics, overloads, &method_symbol);
                    overloads.push(method_symbol);
                }
                _ => {}
            }
        }

        self.table.classes.insert(decl.name.clone(), symbol);
    }

    fn declare_interface(&mut self, decl: &ast::InterfaceDecl) {
        if !self.check_unique(&decl.name, decl.name_span) {
            return;
        }

        let mut methods: HashMap<String, Vec<MethodSymbol>> = HashMap::new();
        for method in &decl.methods {
            let symbol = self.method_symbol(method);
            let overloads = methods.entry(method.name.clone()).or_default();
            check_overload(&mut self.diagnostics, overloads, &symbol);
            overloads.push(symbol);
        }

        self.table.interfaces.insert(
            decl.name.clone(),
            InterfaceSymbol {
                name: decl.name.clone(),
                span: decl.name_span,
                extends: decl.extends.iter().map(|(name, _)| name.clone()).collect(),
                type_params: decl
                    .type_params
                    .iter()
                    .map(|tp| TypeParamSymbol {
                        name: tp.name.clone(),
                        bound: tp.bound.as_ref().map(|(name, _)| name.clone()),
                    })
                    .collect(),
                methods,
            },
        );
    }

    fn declare_enum(&mut self, decl: &ast::EnumDecl) {
        if !self.check_unique(&decl.name, decl.name_span) {
            return;
        }

        let mut variant_spans: HashMap<String, Span> = HashMap::new();
        let mut variants = Vec::new();
        for variant in &decl.variants {
            if let Some(first_span) = variant_spans.get(&variant.name) {
                self.diagnostics.push(Diagnostic::DuplicateDefinition {
                    name: variant.name.clone(),
                    span: variant.span,
                    first_span: *first_span,
                });
                continue;
            }
            variant_spans.insert(variant.name.clone(), variant.span);
            variants.push(variant.name.clone());
        }

        let valued = decl.variants.iter().any(|v| !v.values.is_empty());

        let mut methods: HashMap<String, Vec<MethodSymbol>> = HashMap::new();
        for method in &decl.methods {
            let symbol = self.method_symbol(method);
            let overloads = methods.entry(method.name.clone()).or_default();
            check_overload(&mut self.diagnostics, overloads, &symbol);
            overloads.push(symbol);
        }

        self.table.enums.insert(
            decl.name.clone(),
            EnumSymbol {
                name: decl.name.clone(),
                span: decl.name_span,
                variants,
                valued,
                methods,
            },
        );
    }

    fn declare_function(&mut self, decl: &ast::FunctionDecl) {
        let symbol = FunctionSymbol {
            name: decl.name.clone(),
            span: decl.name_span,
            params: decl.params.iter().map(param_symbol).collect(),
            return_type: decl.return_type.clone(),
        };

        let overloads = self.table.functions.entry(decl.name.clone()).or_default();
        if let Some(first) = overloads
            .iter()
            .find(|other| same_signature(&other.params, &symbol.params))
        {
            self.diagnostics.push(Diagnostic::DuplicateOverload {
                name: decl.name.clone(),
                span: decl.name_span,
                first_span: first.span,
            });
        }
        overloads.push(symbol);
    }

    /// Build a method symbol, normalizing away an explicit `self` parameter
    fn method_symbol(&mut self, method: &ast::FunctionDecl) -> MethodSymbol {
        let mut params = method.params.as_slice();
        if let Some(first) = params.first() {
            if first.name == "self" {
                if method.is_static {
                    self.diagnostics.push(Diagnostic::StaticSelfParam {
                        method: method.name.clone(),
                        span: first.span,
                    });
                }
                params = &params[1..];
            }
        }

        MethodSymbol {
            name: method.name.clone(),
            span: method.name_span,
            params: params.iter().map(param_symbol).collect(),
            return_type: method.return_type.clone(),
            is_static: method.is_static,
            is_abstract: method.is_abstract,
            is_final: method.is_final,
            has_body: method.has_body,
        }
    }

    /// Check that every extends/implements clause names something sensible
    fn resolve_bases(&mut self) {
        let mut diagnostics = Vec::new();

        for class in self.table.classes.values() {
            // Imported symbols were already validated in their home module
            if self.imported.contains(&class.name) {
                continue;
            }

            if let Some(sup) = &class.superclass {
                if self.table.interfaces.contains_key(sup) {
                    diagnostics.push(Diagnostic::InvalidBase {
                        name: sup.clone(),
                        help: format!("{sup} is an interface, use implements instead"),
                        span: class.span,
                    });
                } else if self.table.enums.contains_key(sup) {
                    diagnostics.push(Diagnostic::InvalidBase {
                        name: sup.clone(),
                        help: String::from("enums cannot be extended"),
                        span: class.span,
                    });
                } else if !self.table.classes.contains_key(sup) {
                    diagnostics.push(Diagnostic::UnresolvedName {
                        name: sup.clone(),
                        span: class.span,
                    });
                }
            }

            for interface in &class.interfaces {
                if self.table.interfaces.contains_key(interface) {
                    continue;
                }
                if self.table.classes.contains_key(interface)
                    || self.table.enums.contains_key(interface)
                {
                    diagnostics.push(Diagnostic::InvalidBase {
                        name: interface.clone(),
                        help: format!("{interface} is not an interface"),
                        span: class.span,
                    });
                } else {
                    diagnostics.push(Diagnostic::UnresolvedName {
                        name: interface.clone(),
                        span: class.span,
                    });
                }
            }
        }

        for interface in self.table.interfaces.values() {
            if self.imported.contains(&interface.name) {
                continue;
            }

            for base in &interface.extends {
                if self.table.interfaces.contains_key(base) {
                    continue;
                }
                if self.table.has_type(base) {
                    diagnostics.push(Diagnostic::InvalidBase {
                        name: base.clone(),
                        help: String::from("interfaces can only extend interfaces"),
                        span: interface.span,
                    });
                } else {
                    diagnostics.push(Diagnostic::UnresolvedName {
                        name: base.clone(),
                        span: interface.span,
                    });
                }
            }
        }

        self.diagnostics.extend(diagnostics);
    }

    /// Walk superclass and extends edges looking for cycles
    fn detect_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let names: Vec<String> = self
            .table
            .classes
            .keys()
            .chain(self.table.interfaces.keys())
            .cloned()
            .collect();

        let mut marks: HashMap<String, Mark> = names
            .iter()
            .map(|name| (name.clone(), Mark::Unvisited))
            .collect();

        fn visit(
            table: &SymbolTable,
            marks: &mut HashMap<String, Mark>,
            diagnostics: &mut Vec<Diagnostic>,
            name: &str,
        ) -> bool {
            match marks.get(name) {
                Some(Mark::Done) | None => return false,
                Some(Mark::InProgress) => return true,
                Some(Mark::Unvisited) => {}
            }

            marks.insert(name.to_string(), Mark::InProgress);

            let (bases, span): (Vec<String>, Span) = if let Some(class) = table.classes.get(name) {
                (class.superclass.iter().cloned().collect(), class.span)
            } else if let Some(interface) = table.interfaces.get(name) {
                (interface.extends.clone(), interface.span)
            } else {
                (Vec::new(), Span::default())
            };

            let mut cyclic = false;
            for base in &bases {
                if visit(table, marks, diagnostics, base) {
                    cyclic = true;
                }
            }

            if cyclic {
                diagnostics.push(Diagnostic::CyclicHierarchy {
                    name: name.to_string(),
                    span,
                });
            }

            marks.insert(name.to_string(), Mark::Done);
            cyclic
        }

        let mut diagnostics = Vec::new();
        for name in &names {
            visit(&self.table, &mut marks, &mut diagnostics, name);
        }

        if !diagnostics.is_empty() {
            self.table.poisoned = true;
            self.diagnostics.extend(diagnostics);
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeParamSymbol {
    pub name: String,
    pub bound: Option<String>,
}

fn param_symbol(param: &ast::Param) -> ParamSymbol {
    ParamSymbol {
        name: param.name.clone(),
        annotation: param.annotation.clone(),
        has_default: param.default.is_some(),
    }
}

fn same_signature(a: &[ParamSymbol], b: &[ParamSymbol]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.annotation == y.annotation)
}

fn check_overload(
    diagnostics: &mut Vec<Diagnostic>,
    overloads: &[MethodSymbol],
    new: &MethodSymbol,
) {
    if let Some(first) = overloads
        .iter()
        .find(|other| same_signature(&other.params, &new.params))
    {
        diagnostics.push(Diagnostic::DuplicateOverload {
            name: new.name.clone(),
            span: new.span,
            first_span: first.span,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;

    fn bind_source(source: &str) -> (SymbolTable, Vec<Diagnostic>) {
        let (module, diagnostics) = parse("main", source);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        bind(&module, &SymbolCache::new())
    }

    #[test]
    fn classes_and_methods() {
        let (table, diagnostics) = bind_source(
            r#"
class Animal {
    name: str;

    def Animal(name: str) {
        self.name = name;
    }

    def speak() -> str {
        return "...";
    }
}
            "#,
        );

        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        let animal = &table.classes["Animal"];
        assert!(animal.constructor.is_some());
        assert_eq!(animal.methods["speak"].len(), 1);
        assert!(animal.field("name").is_some());
    }

    #[test]
    fn self_is_stripped_from_params() {
        let (table, _) = bind_source(
            r#"
class A {
    def f(self, x: int) { pass; }
    def g(x: int) { pass; }
}
            "#,
        );

        let a = &table.classes["A"];
        assert_eq!(a.methods["f"][0].params.len(), 1);
        assert_eq!(a.methods["g"][0].params.len(), 1);
    }

    #[test]
    fn multiple_constructors_rejected() {
        let (_, diagnostics) = bind_source(
            r#"
class A {
    def A() { pass; }
    def A(x: int) { pass; }
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::MultipleConstructors { .. })));
    }

    #[test]
    fn duplicate_overload_rejected() {
        let (_, diagnostics) = bind_source(
            r#"
def f(x: int) { pass; }
def f(y: int) { pass; }
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::DuplicateOverload { .. })));
    }

    #[test]
    fn distinct_overloads_allowed() {
        let (table, diagnostics) = bind_source(
            r#"
def f(x: int) { pass; }
def f(x: str) { pass; }
def f(x: int, y: int) { pass; }
            "#,
        );

        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        assert_eq!(table.functions["f"].len(), 3);
    }

    #[test]
    fn hierarchy_cycle_poisons_table() {
        let (table, diagnostics) = bind_source(
            r#"
class A extends B { }
class B extends A { }
            "#,
        );

        assert!(table.poisoned);
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::CyclicHierarchy { .. })));
    }

    #[test]
    fn extending_an_interface_is_invalid() {
        let (_, diagnostics) = bind_source(
            r#"
interface I { }
class A extends I { }
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::InvalidBase { .. })));
    }

    #[test]
    fn static_self_param_rejected() {
        let (_, diagnostics) = bind_source(
            r#"
class A {
    static def f(self) { pass; }
}
            "#,
        );

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::StaticSelfParam { .. })));
    }

    #[test]
    fn imported_symbols_are_copied() {
        let (helper, _) = bind_source("class Point { x: int; y: int; }");
        let mut cache = SymbolCache::new();
        cache.insert(SymbolTable {
            module: String::from("geometry"),
            ..helper
        });

        let (module, _) = parse("main", "from geometry import Point;");
        let (table, diagnostics) = bind(&module, &cache);

        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
        assert!(table.classes.contains_key("Point"));
    }

    #[test]
    fn unresolved_import_reported() {
        let (module, _) = parse("main", "import nowhere;");
        let (_, diagnostics) = bind(&module, &SymbolCache::new());

        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnresolvedImport { .. })));
    }
}
