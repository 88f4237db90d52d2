//! Statement nodes

use super::{Expr, TypeDecl, TypeRef};
use crate::ids::{TypeId, VarId};
use serde::{Deserialize, Serialize};

/// Braced statement list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

impl From<Vec<Stmt>> for Block {
    fn from(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

/// Local variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub var: VarId,
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_weak: bool,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression evaluated for its effect
    Expr(Expr),

    Local(LocalDecl),

    Return(Option<Expr>),

    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },

    While {
        cond: Expr,
        body: Block,
    },

    Block(Block),

    Throw(Expr),

    /// Source-level `synchronized (lock) { ... }`
    Synchronized {
        lock: Expr,
        body: Block,
    },

    /// Local class declaration
    LocalType(Box<TypeDecl>),

    /// Explicit `super(...)` at the start of a constructor
    SuperConstructor {
        args: Vec<Expr>,
    },

    /// Scoped lock: acquired on entry, released on every exit from `body`
    Locked {
        lock: Expr,
        body: Block,
    },

    /// Force one-time static initialization of a type
    InitializeType(TypeId),
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return(value)
    }
}
