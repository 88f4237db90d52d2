//! Programmatic tree construction
//!
//! Hands out fresh handles and builds expression nodes with unique [`NodeId`]s.

use crate::ast::*;
use crate::ids::{MethodId, NodeId, TypeId, VarId};

/// Allocates handles and constructs nodes
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_type: u32,
    next_method: u32,
    next_var: u32,
    next_node: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_id(&mut self) -> TypeId {
        self.next_type += 1;
        TypeId(self.next_type)
    }

    pub fn method_id(&mut self) -> MethodId {
        self.next_method += 1;
        MethodId(self.next_method)
    }

    pub fn var_id(&mut self) -> VarId {
        self.next_var += 1;
        VarId(self.next_var)
    }

    pub fn node_id(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    pub fn unit(&self, name: &str, types: Vec<TypeDecl>) -> CompilationUnit {
        CompilationUnit {
            name: name.to_string(),
            types,
            functions: Vec::new(),
        }
    }

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr::new(self.node_id(), kind)
    }

    // Literals

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Str(value.to_string())))
    }

    pub fn null(&mut self) -> Expr {
        self.expr(ExprKind::Literal(Literal::Null))
    }

    // References

    pub fn this(&mut self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn qualified_this(&mut self, ty: TypeId) -> Expr {
        self.expr(ExprKind::QualifiedThis(ty))
    }

    pub fn name(&mut self, var: VarId) -> Expr {
        self.expr(ExprKind::Name(var))
    }

    pub fn field(&mut self, receiver: Expr, field: VarId) -> Expr {
        self.expr(ExprKind::FieldAccess {
            receiver: receiver.boxed(),
            field,
        })
    }

    pub fn class_object(&mut self, ty: TypeId) -> Expr {
        self.expr(ExprKind::ClassObject(ty))
    }

    // Calls

    pub fn call(&mut self, receiver: Option<Expr>, method: MethodId, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(CallExpr {
            receiver: receiver.map(Box::new),
            method,
            args,
            varargs: false,
        }))
    }

    /// Call passing trailing arguments to a variadic parameter
    pub fn call_varargs(&mut self, receiver: Option<Expr>, method: MethodId, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(CallExpr {
            receiver: receiver.map(Box::new),
            method,
            args,
            varargs: true,
        }))
    }

    pub fn super_call(&mut self, method: MethodId, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::SuperCall {
            method,
            args,
            varargs: false,
        })
    }

    pub fn method_ref(&mut self, receiver: Option<Expr>, method: MethodId) -> Expr {
        self.expr(ExprKind::MethodRef {
            receiver: receiver.map(Box::new),
            method,
        })
    }

    // Creation

    pub fn new_object(&mut self, ty: TypeId, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::New(NewExpr {
            ty,
            args,
            outer: None,
            capture_args: Vec::new(),
            anonymous: None,
        }))
    }

    pub fn new_anonymous(&mut self, decl: TypeDecl, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::New(NewExpr {
            ty: decl.id,
            args,
            outer: None,
            capture_args: Vec::new(),
            anonymous: Some(Box::new(decl)),
        }))
    }

    // Operators

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: operand.boxed(),
        })
    }

    pub fn post_inc(&mut self, operand: Expr) -> Expr {
        self.unary(UnaryOp::PostIncrement, operand)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: lhs.boxed(),
            rhs: rhs.boxed(),
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Expr {
        self.expr(ExprKind::Assign {
            target: target.boxed(),
            value: value.boxed(),
        })
    }

    // Statements

    pub fn local(&mut self, var: VarId, name: &str, ty: TypeRef, init: Option<Expr>) -> Stmt {
        Stmt::Local(LocalDecl {
            var,
            name: name.to_string(),
            ty,
            is_final: false,
            is_weak: false,
            init,
        })
    }
}
