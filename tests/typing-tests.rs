mod common;
use common::{diagnostics_of, error_kinds};

use cayenne::DiagnosticKind;

#[test]
fn clean_programs_have_no_diagnostics() {
    for source in [
        include_str!("testfiles/minimal.cay"),
        include_str!("testfiles/shapes.cay"),
        include_str!("testfiles/animals.cay"),
        include_str!("testfiles/stack.cay"),
        include_str!("testfiles/records.cay"),
    ] {
        let diagnostics = diagnostics_of(source);
        assert!(diagnostics.is_empty(), "unexpected: {diagnostics:#?}");
    }
}

#[test]
fn missing_contract_method() {
    let kinds = error_kinds(
        r#"
interface Shape {
    def area() -> float;
}

class Blob implements Shape { }
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Contract]);
}

#[test]
fn contract_return_type_mismatch() {
    let kinds = error_kinds(
        r#"
interface Shape {
    def area() -> float;
}

class Blob implements Shape {
    def area() -> int {
        return 0;
    }
}
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Contract]);
}

#[test]
fn final_class_cannot_be_extended() {
    let kinds = error_kinds(
        r#"
final class Config { }

class Derived extends Config { }
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Override]);
}

#[test]
fn final_method_cannot_be_overridden() {
    let kinds = error_kinds(
        r#"
class Base {
    final def id() -> int {
        return 1;
    }
}

class Derived extends Base {
    def id() -> int {
        return 2;
    }
}
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Override]);
}

#[test]
fn final_variable_cannot_be_reassigned() {
    let kinds = error_kinds(
        r#"
final limit: int = 10;
limit = 11;
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Override]);
}

#[test]
fn overloads_resolve_statically() {
    let kinds = error_kinds(
        r#"
def f(x: int) -> int {
    return x;
}

def f(x: str, y: str) -> str {
    return x;
}

f(1, 2, 3);
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Overload]);
}

#[test]
fn hierarchy_cycle_is_fatal_but_contained() {
    let kinds = error_kinds(
        r#"
class A extends B { }
class B extends A { }
        "#,
    );
    assert!(kinds.iter().all(|k| *k == DiagnosticKind::CyclicHierarchy));
    assert!(!kinds.is_empty());
}

#[test]
fn generic_bound_is_enforced() {
    let kinds = error_kinds(
        r#"
interface Comparable {
    def compare(other) -> int;
}

class Version implements Comparable {
    def compare(other) -> int {
        return 0;
    }
}

class Sorted<T extends Comparable> {
    def Sorted(first: T) {
        pass;
    }
}

ok: Sorted = Sorted(Version());
bad: Sorted = Sorted(42);
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::GenericBound]);
}

#[test]
fn cannot_infer_unannotated_final() {
    let kinds = error_kinds("final mystery;");
    assert_eq!(kinds, [DiagnosticKind::Inference]);
}

#[test]
fn unknown_annotation_is_only_a_warning() {
    let diagnostics = diagnostics_of("def f(x: Mystery) { pass; }");
    assert!(diagnostics.iter().all(|d| !d.is_error()));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn self_in_static_method() {
    let kinds = error_kinds(
        r#"
class Util {
    static def helper() -> int {
        return self.x;
    }
}
        "#,
    );
    assert_eq!(kinds, [DiagnosticKind::Contract]);
}
