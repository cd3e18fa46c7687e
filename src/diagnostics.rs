//! Diagnostics
//!
//! Every stage of the pipeline reports problems as values of the [Diagnostic]
//! enum instead of aborting, so one compilation run can surface as many
//! independent problems as possible.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::common::Span;

/// How bad a diagnostic is
///
/// Only errors suppress code emission and affect the process exit code.
/// Warnings are reported but otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Coarse classification of diagnostics by the stage and rule that produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    UnresolvedName,
    CyclicHierarchy,
    CyclicImport,
    Contract,
    Override,
    Overload,
    Inference,
    GenericBound,
}

#[derive(Debug, Clone, Error, MietteDiagnostic)]
pub enum Diagnostic {
    #[error("Illegal character: {character:?}")]
    IllegalCharacter {
        character: char,

        #[label("here")]
        span: Span,
    },

    #[error("String literal is never terminated")]
    #[diagnostic(help("Add a closing quote before the end of the line"))]
    UnterminatedString {
        #[label("starts here")]
        span: Span,
    },

    #[error("Encountered unexpected input: {token}")]
    UnexpectedToken {
        token: String,

        #[help]
        expected: Option<String>,

        #[label("here")]
        span: Span,
    },

    #[error("Unresolved name: {name}")]
    UnresolvedName {
        name: String,

        #[label("not found in this scope")]
        span: Span,
    },

    #[error("Cannot resolve imported module: {module}")]
    #[diagnostic(help("Expected to find {module}.cay next to the importing file"))]
    UnresolvedImport {
        module: String,

        #[label("imported here")]
        span: Span,
    },

    #[error("{name} is part of a cyclic inheritance hierarchy")]
    CyclicHierarchy {
        name: String,

        #[label("declared here")]
        span: Span,
    },

    #[error("Module {module} is part of an import cycle")]
    CyclicImport {
        module: String,

        #[label("imported here")]
        span: Span,
    },

    #[error("Class {class} does not implement {method} from {origin}")]
    UnimplementedContract {
        class: String,
        method: String,
        origin: String,

        #[label("class declared here")]
        span: Span,

        #[label("required by this declaration")]
        origin_span: Span,
    },

    #[error("Method {method} does not match the return type declared by {origin}")]
    ReturnTypeMismatch {
        method: String,
        origin: String,
        expected: String,
        found: String,

        #[label("returns {found}")]
        span: Span,

        #[label("declared to return {expected}")]
        origin_span: Span,
    },

    #[error("Cannot extend final class {class}")]
    FinalClassExtended {
        class: String,

        #[label("extended here")]
        span: Span,
    },

    #[error("Cannot override final method {method} of {class}")]
    FinalMethodOverridden {
        method: String,
        class: String,

        #[label("overridden here")]
        span: Span,
    },

    #[error("Cannot reassign final variable {name}")]
    FinalReassignment {
        name: String,

        #[label("reassigned here")]
        span: Span,
    },

    #[error("Duplicate definition of {name}")]
    DuplicateDefinition {
        name: String,

        #[label("redefined here")]
        span: Span,

        #[label("first defined here")]
        first_span: Span,
    },

    #[error("Duplicate overload of {name} with the same parameter types")]
    DuplicateOverload {
        name: String,

        #[label("redefined here")]
        span: Span,

        #[label("first defined here")]
        first_span: Span,
    },

    #[error("Class {class} declares more than one constructor")]
    #[diagnostic(help("Merge the constructors or give the extra one a different name"))]
    MultipleConstructors {
        class: String,

        #[label("extra constructor")]
        span: Span,
    },

    #[error("No overload of {name} accepts these arguments")]
    NoMatchingOverload {
        name: String,

        #[help]
        candidates: Option<String>,

        #[label("called here")]
        span: Span,
    },

    #[error("Call to {name} is ambiguous")]
    #[diagnostic(help("Annotate the arguments so a single overload matches"))]
    AmbiguousCall {
        name: String,

        #[label("called here")]
        span: Span,
    },

    #[error("Cannot infer a type for {name}")]
    #[diagnostic(help("Add an explicit type annotation"))]
    CannotInferType {
        name: String,

        #[label("declared here")]
        span: Span,
    },

    #[error("Type {found} does not satisfy the bound {bound} of type parameter {param}")]
    GenericBoundNotSatisfied {
        param: String,
        bound: String,
        found: String,

        #[label("here")]
        span: Span,
    },

    #[error("Class {class} cannot be both abstract and final")]
    AbstractAndFinal {
        class: String,

        #[label("declared here")]
        span: Span,
    },

    #[error("Static method {method} cannot use self")]
    SelfInStaticMethod {
        method: String,

        #[label("here")]
        span: Span,
    },

    #[error("Static method {method} cannot declare a self parameter")]
    StaticSelfParam {
        method: String,

        #[label("here")]
        span: Span,
    },

    #[error("Enum variant {variant} clashes with the enum name")]
    EnumConstructorName {
        variant: String,

        #[label("here")]
        span: Span,
    },

    #[error("Cannot use {name} as a base here")]
    #[diagnostic(help("{help}"))]
    InvalidBase {
        name: String,
        help: String,

        #[label("here")]
        span: Span,
    },

    #[error("Unknown type in annotation: {name}")]
    #[diagnostic(severity(warning))]
    UnknownAnnotatedType {
        name: String,

        #[label("here")]
        span: Span,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnknownAnnotatedType { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        use Diagnostic::*;
        match self {
            IllegalCharacter { .. } | UnterminatedString { .. } => DiagnosticKind::Lexical,
            UnexpectedToken { .. }
            | AbstractAndFinal { .. }
            | EnumConstructorName { .. }
            | MultipleConstructors { .. } => DiagnosticKind::Syntax,
            UnresolvedName { .. }
            | UnresolvedImport { .. }
            | DuplicateDefinition { .. }
            | InvalidBase { .. }
            | UnknownAnnotatedType { .. } => DiagnosticKind::UnresolvedName,
            CyclicHierarchy { .. } => DiagnosticKind::CyclicHierarchy,
            CyclicImport { .. } => DiagnosticKind::CyclicImport,
            UnimplementedContract { .. }
            | ReturnTypeMismatch { .. }
            | SelfInStaticMethod { .. }
            | StaticSelfParam { .. } => DiagnosticKind::Contract,
            FinalClassExtended { .. } | FinalMethodOverridden { .. } | FinalReassignment { .. } => {
                DiagnosticKind::Override
            }
            NoMatchingOverload { .. } | AmbiguousCall { .. } | DuplicateOverload { .. } => {
                DiagnosticKind::Overload
            }
            CannotInferType { .. } => DiagnosticKind::Inference,
            GenericBoundNotSatisfied { .. } => DiagnosticKind::GenericBound,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

