//! Nil-check insertion
//!
//! Direct calls skip the dispatch mechanism that would otherwise tolerate a
//! null receiver, so every dereference whose receiver is not provably non-null
//! gets an explicit [`ExprKind::NilCheck`]. Receivers known to be non-null:
//! `this`, function receiver parameters, the enclosing-instance link, fresh
//! objects, string literals, class objects and anything already checked.

use crate::context::AnalysisContext;
use rustc_hash::FxHashSet;
use trama_ast::ast::*;
use trama_ast::{MethodId, VarId};

pub struct NilChecker<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    /// Functions whose first argument is a receiver
    instance_functions: FxHashSet<MethodId>,
    non_null: FxHashSet<VarId>,
    inserted: usize,
}

impl<'a, 'p> NilChecker<'a, 'p> {
    pub fn new(
        ctx: &'a mut AnalysisContext<'p>,
        instance_functions: FxHashSet<MethodId>,
        non_null: FxHashSet<VarId>,
    ) -> Self {
        Self {
            ctx,
            instance_functions,
            non_null,
            inserted: 0,
        }
    }

    /// Insert checks across `unit`, returning how many were added
    pub fn run(mut self, unit: &mut CompilationUnit) -> usize {
        self.visit_unit_mut(unit);
        tracing::debug!(inserted = self.inserted, "inserted nil checks");
        self.inserted
    }

    fn is_non_null(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::This
            | ExprKind::QualifiedThis(_)
            | ExprKind::New(_)
            | ExprKind::NilCheck(_)
            | ExprKind::ClassObject(_)
            | ExprKind::ArrayInit { .. }
            | ExprKind::Literal(Literal::Str(_)) => true,
            ExprKind::Name(var) => self.non_null.contains(var),
            ExprKind::FieldAccess { receiver, field } => {
                self.non_null.contains(field) && self.is_non_null(receiver)
            }
            _ => false,
        }
    }

    fn guard(&mut self, expr: &mut Expr) {
        if self.is_non_null(expr) {
            return;
        }
        let id = self.ctx.fresh_node();
        let operand = std::mem::replace(expr, Expr::new(id, ExprKind::Literal(Literal::Null)));
        expr.kind = ExprKind::NilCheck(Box::new(operand));
        self.inserted += 1;
    }
}

impl VisitorMut for NilChecker<'_, '_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
        if let Stmt::Locked { lock, .. } = stmt {
            self.guard(lock);
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
        match &mut expr.kind {
            ExprKind::FieldAccess { receiver, .. } => self.guard(receiver),
            ExprKind::Call(CallExpr {
                receiver: Some(receiver),
                ..
            })
            | ExprKind::MethodRef {
                receiver: Some(receiver),
                ..
            } => self.guard(receiver),
            ExprKind::FunctionCall { function, args } => {
                if self.instance_functions.contains(&*function) {
                    if let Some(receiver) = args.first_mut() {
                        self.guard(receiver);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TranslatorOptions;
    use trama_ast::{AstBuilder, UnitBindings};

    #[test]
    fn test_only_unknown_receivers_are_checked() {
        let mut b = AstBuilder::new();
        let ty = b.type_id();
        let (m, other) = (b.method_id(), b.method_id());
        let (param, field) = (b.var_id(), b.var_id());
        let unknown = b.name(param);
        let on_param = b.call(Some(unknown), other, vec![]);
        let this = b.this();
        let on_this = b.field(this, field);
        let unit_body = Block::new(vec![Stmt::Expr(on_param), Stmt::Expr(on_this)]);
        let mut unit = b.unit(
            "Test",
            vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
                .field(FieldDecl::new(field, "f", TypeRef::int()))
                .method(
                    MethodDecl::new(m, "run", TypeRef::Void)
                        .param(Param::new(param, "other", TypeRef::Class(ty)))
                        .with_body(unit_body),
                )
                .method(MethodDecl::new(other, "other", TypeRef::Void).with_body(Block::default()))],
        );
        let bindings = UnitBindings::collect(&unit).unwrap();
        let mut ctx = AnalysisContext::new(&bindings, TranslatorOptions::default(), &unit);

        let inserted =
            NilChecker::new(&mut ctx, FxHashSet::default(), FxHashSet::default()).run(&mut unit);
        assert_eq!(inserted, 1);

        let body = unit.types[0].methods[0].body.as_ref().unwrap();
        let Stmt::Expr(Expr {
            kind: ExprKind::Call(call),
            ..
        }) = &body.stmts[0]
        else {
            panic!("expected call");
        };
        assert!(matches!(
            call.receiver.as_deref().map(|r| &r.kind),
            Some(ExprKind::NilCheck(_))
        ));
    }
}
