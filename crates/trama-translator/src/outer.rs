//! Access path materialization
//!
//! Rewrites every reference with a recorded [`AccessPath`] into explicit
//! field loads on the receiver chain, fills in the synthesized outer and
//! capture arguments of construction sites, and gives every remaining
//! unqualified instance member access an explicit `this` receiver. Types
//! gain declarations for their synthesized link and snapshot fields.

use crate::captures::{AccessPath, CaptureArg, CaptureTable, PathHop};
use crate::context::AnalysisContext;
use trama_ast::ast::*;
use trama_ast::{MethodId, NodeId, VarId, VariableKind};

pub struct OuterRewriter<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    captures: &'a CaptureTable,
    rewritten: usize,
}

impl<'a, 'p> OuterRewriter<'a, 'p> {
    pub fn new(ctx: &'a mut AnalysisContext<'p>, captures: &'a CaptureTable) -> Self {
        Self {
            ctx,
            captures,
            rewritten: 0,
        }
    }

    /// Rewrite `unit` in place, returning the number of paths applied
    pub fn rewrite(mut self, unit: &mut CompilationUnit) -> usize {
        self.visit_unit_mut(unit);
        tracing::debug!(paths = self.rewritten, "materialized access paths");
        self.rewritten
    }

    /// Expression evaluating `path` from the current receiver; the outermost
    /// node takes `id`
    fn materialize(&mut self, path: &AccessPath, id: NodeId) -> Expr {
        let mut expr = None;
        for hop in &path.hops {
            let kind = match *hop {
                PathHop::OuterParameter { param, .. } => ExprKind::Name(param),
                PathHop::Outer { field, .. }
                | PathHop::Capture { field, .. }
                | PathHop::Member { field, .. } => {
                    let receiver = match expr.take() {
                        Some(receiver) => receiver,
                        None => self.ctx.expr(ExprKind::This),
                    };
                    ExprKind::FieldAccess {
                        receiver: Box::new(receiver),
                        field,
                    }
                }
            };
            expr = Some(self.ctx.expr(kind));
        }
        let mut expr = match expr {
            Some(expr) => expr,
            None => self.ctx.expr(ExprKind::This),
        };
        expr.id = id;
        self.rewritten += 1;
        expr
    }

    fn receiver(&mut self, node: NodeId) -> Expr {
        let captures = self.captures;
        let id = self.ctx.fresh_node();
        match captures.path(node) {
            Some(path) => self.materialize(path, id),
            None => Expr::new(id, ExprKind::This),
        }
    }

    fn capture_args(&mut self, args: &[CaptureArg]) -> Vec<Expr> {
        args.iter()
            .map(|arg| {
                let id = self.ctx.fresh_node();
                if arg.path.is_empty() {
                    Expr::new(id, ExprKind::Name(arg.variable))
                } else {
                    self.materialize(&arg.path, id)
                }
            })
            .collect()
    }

    fn is_instance_method(&self, method: MethodId) -> bool {
        let provider = self.ctx.provider();
        provider.method_binding(method).is_some()
            && !provider.is_static_method(method)
            && !provider.is_constructor(method)
    }

    fn is_instance_field(&self, var: VarId) -> bool {
        self.ctx
            .provider()
            .variable_binding(var)
            .is_some_and(|b| b.kind == VariableKind::Field && !b.is_static)
    }
}

impl VisitorMut for OuterRewriter<'_, '_> {
    fn visit_type_decl_mut(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);

        let captures = self.captures;
        if let Some(record) = captures.record(decl.id) {
            let synthesized = record
                .outer_field
                .iter()
                .chain(record.captures.iter().map(|c| &c.field));
            for field in synthesized {
                if decl.fields.iter().all(|f| f.var != field.var) {
                    let mut synthesized =
                        FieldDecl::new(field.var, field.name.clone(), field.ty.clone())
                            .with_modifiers(Modifiers::private().with_final());
                    synthesized.is_weak = field.is_weak;
                    decl.fields.push(synthesized);
                }
            }
        }
        if decl.super_outer.is_none() {
            if let Some(path) = captures.super_outer(decl.id) {
                let id = self.ctx.fresh_node();
                decl.super_outer = Some(self.materialize(path, id));
            }
        }
        if decl.super_capture_args.is_empty() {
            decl.super_capture_args = self.capture_args(captures.super_captures(decl.id));
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);

        let captures = self.captures;
        let id = expr.id;
        match &mut expr.kind {
            ExprKind::Name(var) => {
                if let Some(path) = captures.path(id) {
                    *expr = self.materialize(path, id);
                } else if self.is_instance_field(*var) {
                    let field = *var;
                    let this = self.ctx.expr(ExprKind::This);
                    expr.kind = ExprKind::FieldAccess {
                        receiver: Box::new(this),
                        field,
                    };
                }
            }
            ExprKind::QualifiedThis(_) => {
                *expr = match captures.path(id) {
                    Some(path) => self.materialize(path, id),
                    None => Expr::new(id, ExprKind::This),
                };
            }
            ExprKind::Call(call) if call.receiver.is_none() => {
                if self.is_instance_method(call.method) {
                    call.receiver = Some(Box::new(self.receiver(id)));
                }
            }
            ExprKind::MethodRef { receiver, method } if receiver.is_none() => {
                if self.is_instance_method(*method) {
                    *receiver = Some(Box::new(self.receiver(id)));
                }
            }
            ExprKind::New(new) => {
                if new.outer.is_none() {
                    if let Some(path) = captures.creation_outer(id) {
                        let outer_id = self.ctx.fresh_node();
                        new.outer = Some(Box::new(self.materialize(path, outer_id)));
                    }
                }
                if new.capture_args.is_empty() {
                    new.capture_args = self.capture_args(captures.creation_captures(id));
                }
            }
            _ => {}
        }
    }
}
