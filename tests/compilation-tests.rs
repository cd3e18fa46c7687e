use std::fs;
use std::path::Path;

use cayenne::{compile_directory, compile_file, DiagnosticKind, EXTENSION};

fn write_module(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(format!("{name}.{EXTENSION}")), source).unwrap();
}

#[test]
fn single_file_program() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "main", "print(\"hi\");");

    let compiled = compile_file(&dir.path().join("main.cay")).unwrap();
    assert_eq!(compiled.len(), 1);
    assert!(compiled[0].output.is_some());
}

#[test]
fn diamond_imports_compile_once() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "shared",
        r#"
class Logger {
    def log(message: str) {
        print(message);
    }
}
        "#,
    );
    write_module(
        dir.path(),
        "left",
        r#"
from shared import Logger;

def from_left() -> Logger {
    return Logger();
}
        "#,
    );
    write_module(
        dir.path(),
        "right",
        r#"
from shared import Logger;

def from_right() -> Logger {
    return Logger();
}
        "#,
    );
    write_module(
        dir.path(),
        "main",
        r#"
from left import from_left;
from right import from_right;

from_left().log("left");
from_right().log("right");
        "#,
    );

    let compiled = compile_directory(dir.path(), "main").unwrap();
    let names: Vec<&str> = compiled.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["shared", "left", "right", "main"]);

    for module in &compiled {
        assert!(
            !module.has_errors(),
            "{}: {:#?}",
            module.name,
            module.diagnostics
        );
        assert!(module.output.is_some());
    }
}

#[test]
fn imported_class_participates_in_checking() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "geometry", "final class Circle { }");
    write_module(
        dir.path(),
        "main",
        r#"
from geometry import Circle;

class Oval extends Circle { }
        "#,
    );

    let compiled = compile_directory(dir.path(), "main").unwrap();
    let main = compiled.iter().find(|m| m.name == "main").unwrap();

    let kinds: Vec<DiagnosticKind> = main.diagnostics.iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, [DiagnosticKind::Override]);
    assert!(main.output.is_none());
}

#[test]
fn import_cycle_is_reported_once_per_edge() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a", "import b;");
    write_module(dir.path(), "b", "import a;");

    let compiled = compile_directory(dir.path(), "a").unwrap();
    let b = compiled.iter().find(|m| m.name == "b").unwrap();

    let kinds: Vec<DiagnosticKind> = b.diagnostics.iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, [DiagnosticKind::CyclicImport]);
}

#[test]
fn unresolved_import_names_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "geometry", "class Circle { }");
    write_module(dir.path(), "main", "from geometry import Square;");

    let compiled = compile_directory(dir.path(), "main").unwrap();
    let main = compiled.iter().find(|m| m.name == "main").unwrap();

    assert!(main
        .diagnostics
        .iter()
        .any(|d| d.kind() == DiagnosticKind::UnresolvedName));
}

#[test]
fn whole_module_import_allows_qualified_use() {
    let dir = tempfile::tempdir().unwrap();
    write_module(
        dir.path(),
        "util",
        r#"
def double(x: int) -> int {
    return x * 2;
}
        "#,
    );
    write_module(dir.path(), "main", "import util;\nprint(util.double(21));");

    let compiled = compile_directory(dir.path(), "main").unwrap();
    for module in &compiled {
        assert!(
            !module.has_errors(),
            "{}: {:#?}",
            module.name,
            module.diagnostics
        );
    }
}
