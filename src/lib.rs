//! A compiler front end for cayenne, a statically typed superset of Python.
//!
//! The pipeline runs in stages: [`parsing::parse`] turns source text into an
//! AST, [`binding::bind`] collects each module's declarations into a symbol
//! table, [`check::check`] reports type and contract violations, and
//! [`emit::emit`] prints the module back out as plain Python 3. The
//! [`compile`] module drives all of this over a single file or a directory
//! of modules.

pub mod ast;
pub mod binding;
pub mod builtin;
pub mod check;
pub mod common;
pub mod compile;
pub mod diagnostics;
pub mod emit;
pub mod parsing;
pub mod resolve;

pub use binding::{bind, SymbolCache, SymbolTable};
pub use check::check;
pub use common::{Span, Spanned, TypeRef};
pub use compile::{compile_directory, compile_file, compile_source, CompileError, CompiledModule};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use emit::emit;
pub use parsing::parse;
pub use resolve::{resolve, ResolveError, ResolvedModule, EXTENSION};
