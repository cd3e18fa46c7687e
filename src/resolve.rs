//! Module resolution
//!
//! A program is a directory of `.cay` files. Each file is one module, named
//! after its stem, and imports refer to sibling modules by that name. The
//! resolver walks the import graph from the entry module and returns the
//! parsed modules in dependency-first order, so each module is compiled
//! after everything it imports.
//!
//! Import cycles are reported on the back edge and the walk does not recurse
//! into them. A missing module file is left for the binder to report, which
//! also covers imports that never name a file at all.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;
use tracing::debug;

use crate::ast::{self, StatementKind};
use crate::diagnostics::Diagnostic;
use crate::parsing::parse;

/// File extension for source files
pub const EXTENSION: &str = "cay";

/// A parsed module together with everything the front end reported about it
#[derive(Debug)]
pub struct ResolvedModule {
    pub name: String,
    pub path: PathBuf,
    pub module: ast::Module,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolveError {
    #[error("cannot read `{}`", path.display())]
    #[diagnostic(help("expected a `.{EXTENSION}` file"))]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// Resolve the import graph rooted at `entry` (a module name, without
/// extension) inside `root`. The returned list is in dependency-first
/// order and always ends with the entry module.
pub fn resolve(root: &Path, entry: &str) -> Result<Vec<ResolvedModule>, ResolveError> {
    let mut resolver = Resolver {
        root,
        order: Vec::new(),
        marks: HashMap::new(),
    };

    let path = resolver.module_path(entry);
    let source = fs::read_to_string(&path).map_err(|source| ResolveError::Unreadable {
        path: path.clone(),
        source,
    })?;

    resolver.visit(entry.to_string(), path, source);
    Ok(resolver.order)
}

struct Resolver<'a> {
    root: &'a Path,
    order: Vec<ResolvedModule>,
    marks: HashMap<String, Mark>,
}

impl Resolver<'_> {
    fn module_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{EXTENSION}"))
    }

    fn visit(&mut self, name: String, path: PathBuf, source: String) {
        debug!("resolving module {name}");
        self.marks.insert(name.clone(), Mark::InProgress);

        let (module, mut diagnostics) = parse(&name, &source);

        for stmt in &module.body {
            let StatementKind::Import(import) = &stmt.kind else {
                continue;
            };
            let (target, span) = &import.module;

            match self.marks.get(target) {
                Some(Mark::Done) => continue,
                Some(Mark::InProgress) => {
                    diagnostics.push(Diagnostic::CyclicImport {
                        module: target.clone(),
                        span: *span,
                    });
                    continue;
                }
                None => {}
            }

            let target_path = self.module_path(target);
            match fs::read_to_string(&target_path) {
                // The binder reports the unresolved import once the module
                // turns out to be missing from the cache
                Err(_) => continue,
                Ok(target_source) => self.visit(target.clone(), target_path, target_source),
            }
        }

        self.marks.insert(name.clone(), Mark::Done);
        self.order.push(ResolvedModule {
            name,
            path,
            module,
            source,
            diagnostics,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use std::fs;

    fn write_module(dir: &Path, name: &str, source: &str) {
        fs::write(dir.join(format!("{name}.{EXTENSION}")), source).unwrap();
    }

    #[test]
    fn dependencies_come_first() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "main", "from geometry import Circle;\nx = 1;");
        write_module(dir.path(), "geometry", "class Circle { }");

        let order = resolve(dir.path(), "main").unwrap();
        let names: Vec<&str> = order.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["geometry", "main"]);
    }

    #[test]
    fn shared_dependency_is_visited_once() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "main", "import a;\nimport b;");
        write_module(dir.path(), "a", "import shared;");
        write_module(dir.path(), "b", "import shared;");
        write_module(dir.path(), "shared", "x = 1;");

        let order = resolve(dir.path(), "main").unwrap();
        let names: Vec<&str> = order.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["shared", "a", "b", "main"]);
    }

    #[test]
    fn cyclic_import_is_reported_on_the_back_edge() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "main", "import other;");
        write_module(dir.path(), "other", "import main;");

        let order = resolve(dir.path(), "main").unwrap();
        let other = order.iter().find(|m| m.name == "other").unwrap();
        assert!(other
            .diagnostics
            .iter()
            .any(|d| d.kind() == DiagnosticKind::CyclicImport));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve(dir.path(), "main").is_err());
    }

    #[test]
    fn missing_import_is_left_to_the_binder() {
        let dir = tempfile::tempdir().unwrap();
        write_module(dir.path(), "main", "import nowhere;");

        let order = resolve(dir.path(), "main").unwrap();
        assert_eq!(order.len(), 1);
        assert!(order[0].diagnostics.is_empty());
    }
}
