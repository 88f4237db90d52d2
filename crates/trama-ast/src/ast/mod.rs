//! Program tree
//!
//! A typed, owned, mutable tree for a class-based object-oriented source
//! language: top-level, member, local and anonymous classes, methods,
//! constructors and initializers. The node set also contains the lowered
//! forms the translator produces (direct function calls, nil checks,
//! scoped locks, sequence construction).

mod decl;
mod expression;
mod statement;
mod visitor;

pub use decl::*;
pub use expression::*;
pub use statement::*;
pub use visitor::*;
