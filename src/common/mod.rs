//! Common types
//!
//! Small types used throughout the crate.

mod span;
mod typ;

pub use span::Span;
pub use typ::TypeRef;

/// A value together with the span it was parsed from
pub type Spanned<T> = (T, Span);
