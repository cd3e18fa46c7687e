#![allow(dead_code)]

use cayenne::{compile_source, Diagnostic, DiagnosticKind};

/// Run the full pipeline over one module and return its Python output.
/// Panics on any diagnostic, so a broken source fails the test loudly.
pub fn run_pipeline(source: &str) -> String {
    let (output, diagnostics) = compile_source("main", source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {diagnostics:#?}"
    );
    match output {
        Some(output) => output,
        None => panic!("no output produced"),
    }
}

pub fn diagnostics_of(source: &str) -> Vec<Diagnostic> {
    compile_source("main", source).1
}

pub fn error_kinds(source: &str) -> Vec<DiagnosticKind> {
    diagnostics_of(source)
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.kind())
        .collect()
}
