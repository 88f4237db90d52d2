//! Call-site rewriting
//!
//! Calls of functionized methods become direct [`ExprKind::FunctionCall`]s
//! with the receiver moved to the first argument. Variadic calls have their
//! trailing arguments packed into a single sequence first, whether or not the
//! callee is functionized.

use super::FunctionTable;
use crate::context::AnalysisContext;
use tracing::trace;
use trama_ast::ast::*;
use trama_ast::MethodId;

pub struct CallRewriter<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    table: &'a FunctionTable,
    pub(super) direct_calls: usize,
    pub(super) varargs_packs: usize,
}

impl<'a, 'p> CallRewriter<'a, 'p> {
    pub fn new(ctx: &'a mut AnalysisContext<'p>, table: &'a FunctionTable) -> Self {
        Self {
            ctx,
            table,
            direct_calls: 0,
            varargs_packs: 0,
        }
    }

    /// Replace the variadic tail of `args` with one sequence of the element type
    fn pack(&mut self, method: MethodId, args: &mut Vec<Expr>) {
        let provider = self.ctx.provider();
        if !provider.is_varargs(method) {
            return;
        }
        let Some(binding) = provider.method_binding(method) else {
            return;
        };
        let fixed = binding.param_types.len().saturating_sub(1);
        if args.len() < fixed {
            return;
        }
        let element = binding
            .param_types
            .last()
            .and_then(TypeRef::element)
            .cloned()
            .unwrap_or_else(|| TypeRef::named("Object"));
        let elements = args.split_off(fixed);
        let packed = self.ctx.expr(ExprKind::ArrayInit { element, elements });
        args.push(packed);
        self.varargs_packs += 1;
    }
}

impl VisitorMut for CallRewriter<'_, '_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);

        let table = self.table;
        let replacement = match &mut expr.kind {
            ExprKind::Call(call) => {
                if call.varargs {
                    self.pack(call.method, &mut call.args);
                    call.varargs = false;
                }
                match table.get(call.method) {
                    Some(record) => {
                        let mut args = Vec::with_capacity(call.args.len() + 1);
                        if record.receiver.is_some() {
                            let receiver = match call.receiver.take() {
                                Some(receiver) => *receiver,
                                None => self.ctx.expr(ExprKind::This),
                            };
                            args.push(receiver);
                        }
                        args.append(&mut call.args);
                        Some(ExprKind::FunctionCall {
                            function: call.method,
                            args,
                        })
                    }
                    None => None,
                }
            }
            ExprKind::SuperCall {
                method,
                args,
                varargs,
            } => {
                if *varargs {
                    self.pack(*method, args);
                    *varargs = false;
                }
                match table.get(*method) {
                    Some(record) => {
                        let mut call_args = Vec::with_capacity(args.len() + 1);
                        if record.receiver.is_some() {
                            call_args.push(self.ctx.expr(ExprKind::This));
                        }
                        call_args.append(args);
                        Some(ExprKind::FunctionCall {
                            function: *method,
                            args: call_args,
                        })
                    }
                    None => None,
                }
            }
            _ => None,
        };

        if let Some(kind) = replacement {
            trace!(node = %expr.id, "direct call");
            expr.kind = kind;
            self.direct_calls += 1;
        }
    }
}
