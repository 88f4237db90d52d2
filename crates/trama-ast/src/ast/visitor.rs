//! Tree traversal
//!
//! [`Visitor`] walks the tree read-only for fact gathering; [`VisitorMut`] walks
//! it mutably for rewriting. Every visit method defaults to the matching walk
//! function, so implementors override only the nodes they care about and call
//! the walk function to keep descending.
//!
//! # Example
//!
//! ```rust
//! use trama_ast::ast::*;
//!
//! struct CountThis {
//!     count: usize,
//! }
//!
//! impl Visitor for CountThis {
//!     fn visit_expr(&mut self, expr: &Expr) {
//!         if matches!(expr.kind, ExprKind::This) {
//!             self.count += 1;
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```

use super::*;
use crate::ids::BodyKey;

pub trait Visitor: Sized {
    /// Called before the statements and expressions of an executable body are walked
    fn enter_body(&mut self, _body: BodyKey) {}

    /// Called after an executable body has been walked
    fn exit_body(&mut self, _body: BodyKey) {}

    fn visit_unit(&mut self, unit: &CompilationUnit) {
        walk_unit(self, unit);
    }

    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        walk_type_decl(self, decl);
    }

    fn visit_field_decl(&mut self, field: &FieldDecl) {
        walk_field_decl(self, field);
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) {
        walk_method_decl(self, method);
    }

    fn visit_initializer(&mut self, init: &Initializer) {
        walk_block(self, &init.body);
    }

    fn visit_function_decl(&mut self, func: &FunctionDecl) {
        let body = BodyKey::Method(func.method);
        self.enter_body(body);
        walk_block(self, &func.body);
        self.exit_body(body);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

// ============================================================================
// Walk Functions - Default Traversal Implementations
// ============================================================================

pub fn walk_unit<V: Visitor>(visitor: &mut V, unit: &CompilationUnit) {
    for ty in &unit.types {
        visitor.visit_type_decl(ty);
    }
    for func in &unit.functions {
        visitor.visit_function_decl(func);
    }
}

pub fn walk_type_decl<V: Visitor>(visitor: &mut V, decl: &TypeDecl) {
    if let Some(outer) = &decl.super_outer {
        visitor.visit_expr(outer);
    }
    for arg in &decl.super_capture_args {
        visitor.visit_expr(arg);
    }
    for field in &decl.fields {
        let body = BodyKey::Initializer {
            ty: decl.id,
            is_static: field.modifiers.is_static,
        };
        visitor.enter_body(body);
        visitor.visit_field_decl(field);
        visitor.exit_body(body);
    }
    for init in &decl.initializers {
        let body = BodyKey::Initializer {
            ty: decl.id,
            is_static: init.is_static,
        };
        visitor.enter_body(body);
        visitor.visit_initializer(init);
        visitor.exit_body(body);
    }
    for method in &decl.methods {
        let body = BodyKey::Method(method.id);
        visitor.enter_body(body);
        visitor.visit_method_decl(method);
        visitor.exit_body(body);
    }
    for member in &decl.member_types {
        visitor.visit_type_decl(member);
    }
}

pub fn walk_field_decl<V: Visitor>(visitor: &mut V, field: &FieldDecl) {
    if let Some(init) = &field.initializer {
        visitor.visit_expr(init);
    }
}

pub fn walk_method_decl<V: Visitor>(visitor: &mut V, method: &MethodDecl) {
    if let Some(body) = &method.body {
        visitor.visit_block(body);
    }
}

pub fn walk_block<V: Visitor>(visitor: &mut V, block: &Block) {
    for stmt in &block.stmts {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) => visitor.visit_expr(expr),
        Stmt::Local(local) => {
            if let Some(init) = &local.init {
                visitor.visit_expr(init);
            }
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_block(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_block(else_branch);
            }
        }
        Stmt::While { cond, body } => {
            visitor.visit_expr(cond);
            visitor.visit_block(body);
        }
        Stmt::Block(block) => visitor.visit_block(block),
        Stmt::Synchronized { lock, body } | Stmt::Locked { lock, body } => {
            visitor.visit_expr(lock);
            visitor.visit_block(body);
        }
        Stmt::LocalType(decl) => visitor.visit_type_decl(decl),
        Stmt::SuperConstructor { args } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Stmt::InitializeType(_) => {}
    }
}

pub fn walk_expr<V: Visitor>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::This
        | ExprKind::QualifiedThis(_)
        | ExprKind::Name(_)
        | ExprKind::ClassObject(_) => {}
        ExprKind::FieldAccess { receiver, .. } => visitor.visit_expr(receiver),
        ExprKind::Call(call) => {
            if let Some(receiver) = &call.receiver {
                visitor.visit_expr(receiver);
            }
            for arg in &call.args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::SuperCall { args, .. }
        | ExprKind::FunctionCall { args, .. }
        | ExprKind::ArrayInit { elements: args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::New(new) => {
            if let Some(outer) = &new.outer {
                visitor.visit_expr(outer);
            }
            for arg in &new.args {
                visitor.visit_expr(arg);
            }
            for arg in &new.capture_args {
                visitor.visit_expr(arg);
            }
            if let Some(decl) = &new.anonymous {
                visitor.visit_type_decl(decl);
            }
        }
        ExprKind::MethodRef { receiver, .. } => {
            if let Some(receiver) = receiver {
                visitor.visit_expr(receiver);
            }
        }
        ExprKind::Unary { operand, .. } | ExprKind::NilCheck(operand) => visitor.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr(lhs);
            visitor.visit_expr(rhs);
        }
        ExprKind::Assign { target, value } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
    }
}

// ============================================================================
// Mutable traversal
// ============================================================================

pub trait VisitorMut: Sized {
    fn visit_unit_mut(&mut self, unit: &mut CompilationUnit) {
        walk_unit_mut(self, unit);
    }

    fn visit_type_decl_mut(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);
    }

    fn visit_method_decl_mut(&mut self, method: &mut MethodDecl) {
        if let Some(body) = &mut method.body {
            self.visit_block_mut(body);
        }
    }

    fn visit_function_decl_mut(&mut self, func: &mut FunctionDecl) {
        self.visit_block_mut(&mut func.body);
    }

    fn visit_block_mut(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_unit_mut<V: VisitorMut>(visitor: &mut V, unit: &mut CompilationUnit) {
    for ty in &mut unit.types {
        visitor.visit_type_decl_mut(ty);
    }
    for func in &mut unit.functions {
        visitor.visit_function_decl_mut(func);
    }
}

pub fn walk_type_decl_mut<V: VisitorMut>(visitor: &mut V, decl: &mut TypeDecl) {
    if let Some(outer) = &mut decl.super_outer {
        visitor.visit_expr_mut(outer);
    }
    for arg in &mut decl.super_capture_args {
        visitor.visit_expr_mut(arg);
    }
    for field in &mut decl.fields {
        if let Some(init) = &mut field.initializer {
            visitor.visit_expr_mut(init);
        }
    }
    for init in &mut decl.initializers {
        visitor.visit_block_mut(&mut init.body);
    }
    for method in &mut decl.methods {
        visitor.visit_method_decl_mut(method);
    }
    for member in &mut decl.member_types {
        visitor.visit_type_decl_mut(member);
    }
}

pub fn walk_block_mut<V: VisitorMut>(visitor: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        visitor.visit_stmt_mut(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitorMut>(visitor: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) => visitor.visit_expr_mut(expr),
        Stmt::Local(local) => {
            if let Some(init) = &mut local.init {
                visitor.visit_expr_mut(init);
            }
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr_mut(cond);
            visitor.visit_block_mut(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_block_mut(else_branch);
            }
        }
        Stmt::While { cond, body } => {
            visitor.visit_expr_mut(cond);
            visitor.visit_block_mut(body);
        }
        Stmt::Block(block) => visitor.visit_block_mut(block),
        Stmt::Synchronized { lock, body } | Stmt::Locked { lock, body } => {
            visitor.visit_expr_mut(lock);
            visitor.visit_block_mut(body);
        }
        Stmt::LocalType(decl) => visitor.visit_type_decl_mut(decl),
        Stmt::SuperConstructor { args } => {
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
        Stmt::InitializeType(_) => {}
    }
}

pub fn walk_expr_mut<V: VisitorMut>(visitor: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Literal(_)
        | ExprKind::This
        | ExprKind::QualifiedThis(_)
        | ExprKind::Name(_)
        | ExprKind::ClassObject(_) => {}
        ExprKind::FieldAccess { receiver, .. } => visitor.visit_expr_mut(receiver),
        ExprKind::Call(call) => {
            if let Some(receiver) = &mut call.receiver {
                visitor.visit_expr_mut(receiver);
            }
            for arg in &mut call.args {
                visitor.visit_expr_mut(arg);
            }
        }
        ExprKind::SuperCall { args, .. }
        | ExprKind::FunctionCall { args, .. }
        | ExprKind::ArrayInit { elements: args, .. } => {
            for arg in args {
                visitor.visit_expr_mut(arg);
            }
        }
        ExprKind::New(new) => {
            if let Some(outer) = &mut new.outer {
                visitor.visit_expr_mut(outer);
            }
            for arg in &mut new.args {
                visitor.visit_expr_mut(arg);
            }
            for arg in &mut new.capture_args {
                visitor.visit_expr_mut(arg);
            }
            if let Some(decl) = &mut new.anonymous {
                visitor.visit_type_decl_mut(decl);
            }
        }
        ExprKind::MethodRef { receiver, .. } => {
            if let Some(receiver) = receiver {
                visitor.visit_expr_mut(receiver);
            }
        }
        ExprKind::Unary { operand, .. } | ExprKind::NilCheck(operand) => {
            visitor.visit_expr_mut(operand)
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            visitor.visit_expr_mut(lhs);
            visitor.visit_expr_mut(rhs);
        }
        ExprKind::Assign { target, value } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(value);
        }
    }
}
