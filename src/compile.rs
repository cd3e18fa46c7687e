//! Compilation driver
//!
//! Runs the whole pipeline over a single source string, a file, or a
//! directory of modules. Modules are compiled in the dependency-first order
//! the resolver produces, each one binding against the symbol tables of the
//! modules before it. A module with errors still contributes its (partial)
//! symbol table, but no Python output is produced for it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;
use tracing::debug;

use crate::binding::{bind, SymbolCache};
use crate::check::check;
use crate::diagnostics::Diagnostic;
use crate::emit::emit;
use crate::parsing::parse;
use crate::resolve::{resolve, ResolveError, EXTENSION};

/// One module's trip through the pipeline
#[derive(Debug)]
pub struct CompiledModule {
    pub name: String,
    pub path: PathBuf,
    pub source: String,
    /// Generated Python, absent when the module has errors
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledModule {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum CompileError {
    #[error("`{}` is not a source file path", path.display())]
    #[diagnostic(help("expected a path ending in `.{EXTENSION}`"))]
    InvalidPath { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),
}

/// Compile a single module from an in-memory string. Imports resolve against
/// nothing, so any import is reported unresolved.
pub fn compile_source(name: &str, source: &str) -> (Option<String>, Vec<Diagnostic>) {
    let (module, mut diagnostics) = parse(name, source);
    let (table, bind_diagnostics) = bind(&module, &SymbolCache::new());
    diagnostics.extend(bind_diagnostics);
    diagnostics.extend(check(&module, &table));

    if diagnostics.iter().any(Diagnostic::is_error) {
        (None, diagnostics)
    } else {
        (Some(emit(&module, &table)), diagnostics)
    }
}

/// Compile the program whose entry module is at `path`. Sibling modules are
/// looked up next to it.
pub fn compile_file(path: &Path) -> Result<Vec<CompiledModule>, CompileError> {
    let entry = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| CompileError::InvalidPath {
            path: path.to_path_buf(),
        })?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    compile_directory(root, entry)
}

/// Compile the program rooted at `root` with entry module `entry`, in
/// dependency-first order. The entry module is always last.
pub fn compile_directory(root: &Path, entry: &str) -> Result<Vec<CompiledModule>, CompileError> {
    let resolved = resolve(root, entry)?;

    let mut cache = SymbolCache::new();
    let mut compiled = Vec::with_capacity(resolved.len());

    for module in resolved {
        debug!("compiling module {}", module.name);

        let mut diagnostics = module.diagnostics;

        // An import that is part of a cycle is already reported by the
        // resolver; the binder would otherwise report it a second time as
        // unresolved, since the cycle keeps it out of the cache
        let cyclic: HashSet<String> = diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::CyclicImport { module, .. } => Some(module.clone()),
                _ => None,
            })
            .collect();

        let (table, bind_diagnostics) = bind(&module.module, &cache);
        diagnostics.extend(bind_diagnostics.into_iter().filter(|d| {
            !matches!(d, Diagnostic::UnresolvedImport { module, .. } if cyclic.contains(module))
        }));

        diagnostics.extend(check(&module.module, &table));

        let output = if diagnostics.iter().any(Diagnostic::is_error) {
            None
        } else {
            Some(emit(&module.module, &table))
        };

        cache.insert(table);
        compiled.push(CompiledModule {
            name: module.name,
            path: module.path,
            source: module.source,
            output,
            diagnostics,
        });
    }

    Ok(compiled)
}
