use std::fmt;

use crate::common::Span;

/// A reference to a type, as written in an annotation
///
/// This is either a plain name (`int`, `Animal`) or a generic instantiation
/// with ordered type arguments (`Stack[int]`, `Pair[str, Animal]`).
/// Equality ignores spans: two references are equal iff they have the same
/// base name and pairwise-equal arguments.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub span: Span,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            span,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

impl Eq for TypeRef {}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some((first, rest)) = self.args.split_first() {
            write!(f, "[{first}")?;
            for arg in rest {
                write!(f, ", {arg}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
