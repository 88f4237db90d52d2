//! Trama program tree
//!
//! This crate provides:
//! - Binding handles (`TypeId`, `MethodId`, `VarId`, `NodeId`, `BodyKey`)
//! - The program tree and its `Visitor`/`VisitorMut` traversal contract
//! - The `BindingProvider` interface and a provider derived from a tree
//! - `AstBuilder` for constructing trees programmatically

pub mod ast;
pub mod bindings;
pub mod builder;
pub mod ids;

// Re-export main types
pub use bindings::{
    BindingProvider, BindingsError, MethodBinding, TypeBinding, UnitBindings, VariableBinding,
    VariableKind,
};
pub use builder::AstBuilder;
pub use ids::{BodyKey, MethodId, NodeId, Owner, TypeId, VarId};
