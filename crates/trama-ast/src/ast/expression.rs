//! Expression nodes
//!
//! Every expression carries a [`NodeId`] so analyses can attach per-site
//! metadata in side tables instead of inside the tree.

use super::{TypeDecl, TypeRef};
use crate::ids::{MethodId, NodeId, TypeId, VarId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    And,
    Or,
}

/// Method invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    /// None for an unqualified call (implicit `this`, enclosing instance, or static)
    pub receiver: Option<Box<Expr>>,
    pub method: MethodId,
    pub args: Vec<Expr>,
    /// Arguments from the last declared parameter onwards are variadic elements
    #[serde(default)]
    pub varargs: bool,
}

/// Instance creation, optionally declaring an anonymous class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    /// Instantiated type (the anonymous type itself when `anonymous` is set)
    pub ty: TypeId,
    pub args: Vec<Expr>,
    /// Enclosing instance: explicit (`outer.new Inner()`) or synthesized by translation
    #[serde(default)]
    pub outer: Option<Box<Expr>>,
    /// Captured values, one per captured variable of `ty` (filled by translation)
    #[serde(default)]
    pub capture_args: Vec<Expr>,
    #[serde(default)]
    pub anonymous: Option<Box<TypeDecl>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),

    /// Current instance
    This,

    /// `Outer.this`
    QualifiedThis(TypeId),

    /// Unqualified variable reference: local, parameter or field
    Name(VarId),

    FieldAccess {
        receiver: Box<Expr>,
        field: VarId,
    },

    Call(CallExpr),

    /// `super.m(...)`
    SuperCall {
        method: MethodId,
        args: Vec<Expr>,
        #[serde(default)]
        varargs: bool,
    },

    New(NewExpr),

    /// Method used as a first-class value
    MethodRef {
        receiver: Option<Box<Expr>>,
        method: MethodId,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Direct call of a functionized method; the receiver, if any, is the first argument
    FunctionCall {
        function: MethodId,
        args: Vec<Expr>,
    },

    /// Fails with a null-dereference error if the operand is null
    NilCheck(Box<Expr>),

    /// Fixed-size sequence construction
    ArrayInit {
        element: TypeRef,
        elements: Vec<Expr>,
    },

    /// Metaclass object of a type
    ClassObject(TypeId),
}
