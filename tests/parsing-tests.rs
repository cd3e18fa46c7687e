use cayenne::ast::StatementKind;
use cayenne::parse;

fn parse_clean(source: &str) -> Vec<StatementKind> {
    let (module, diagnostics) = parse("main", source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {diagnostics:#?}"
    );
    module.body.into_iter().map(|stmt| stmt.kind).collect()
}

#[test]
fn minimal() {
    let body = parse_clean(include_str!("testfiles/minimal.cay"));
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0], StatementKind::Expr(_)));
}

#[test]
fn shapes() {
    let body = parse_clean(include_str!("testfiles/shapes.cay"));

    let StatementKind::Interface(interface) = &body[0] else {
        panic!("expected an interface, got {:?}", body[0]);
    };
    assert_eq!(interface.name, "Shape");
    assert_eq!(interface.methods.len(), 2);
    assert!(interface.methods.iter().all(|m| !m.has_body));

    let StatementKind::Class(class) = &body[1] else {
        panic!("expected a class, got {:?}", body[1]);
    };
    assert_eq!(class.name, "Rectangle");
    assert_eq!(class.interfaces.len(), 1);
    assert_eq!(class.interfaces[0].0, "Shape");
}

#[test]
fn animals() {
    let body = parse_clean(include_str!("testfiles/animals.cay"));

    let StatementKind::Class(animal) = &body[0] else {
        panic!("expected a class, got {:?}", body[0]);
    };
    assert!(animal.is_abstract);

    let methods: Vec<_> = animal
        .members
        .iter()
        .filter_map(|m| match &m.kind {
            StatementKind::Function(f) => Some(f),
            _ => None,
        })
        .collect();
    assert!(methods.iter().any(|m| m.is_abstract && !m.has_body));
    assert!(methods.iter().any(|m| m.is_final));
}

#[test]
fn stack_is_generic() {
    let body = parse_clean(include_str!("testfiles/stack.cay"));

    let StatementKind::Class(stack) = &body[0] else {
        panic!("expected a class, got {:?}", body[0]);
    };
    assert_eq!(stack.type_params.len(), 1);
    assert_eq!(stack.type_params[0].name, "T");
    assert!(stack.type_params[0].bound.is_none());
}

#[test]
fn recovery_keeps_later_declarations() {
    let (module, diagnostics) = parse(
        "main",
        r#"
def broken( {
}

class Fine { }
        "#,
    );

    assert!(!diagnostics.is_empty());
    assert!(module.body.iter().any(
        |stmt| matches!(&stmt.kind, StatementKind::Class(class) if class.name == "Fine")
    ));
}
