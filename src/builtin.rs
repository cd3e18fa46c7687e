//! Builtin names of the target runtime
//!
//! Names listed here resolve without a declaration. They correspond to the
//! Python builtins that source programs are allowed to lean on, so the
//! checker neither reports them as unresolved nor second-guesses their calls.

/// Builtin functions and values that are always in scope
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "print",
    "input",
    "len",
    "range",
    "abs",
    "min",
    "max",
    "sum",
    "sorted",
    "reversed",
    "enumerate",
    "zip",
    "isinstance",
    "super",
];

/// Builtin type names usable in annotations and casts
pub const BUILTIN_TYPES: &[&str] = &[
    "int",
    "float",
    "str",
    "bool",
    "None",
    "list",
    "dict",
    "set",
    "tuple",
    "object",
];

/// Builtin exception types usable with `raise`
pub const BUILTIN_EXCEPTIONS: &[&str] = &[
    "Exception",
    "ValueError",
    "TypeError",
    "KeyError",
    "IndexError",
    "RuntimeError",
    "NotImplementedError",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_FUNCTIONS.contains(&name)
        || BUILTIN_TYPES.contains(&name)
        || BUILTIN_EXCEPTIONS.contains(&name)
}

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(&name) || BUILTIN_EXCEPTIONS.contains(&name)
}
