//! Per-unit analysis context
//!
//! An [`AnalysisContext`] is created for one compilation unit and threaded
//! through every pass. It owns the fresh-id allocators and the options for the
//! run; dropping it is the whole teardown.

use crate::error::{TranslateError, TranslateResult};
use crate::options::TranslatorOptions;
use rustc_hash::FxHashSet;
use trama_ast::ast::*;
use trama_ast::{
    BindingProvider, MethodBinding, MethodId, NodeId, TypeBinding, TypeId, VarId, VariableBinding,
};

pub struct AnalysisContext<'p> {
    provider: &'p dyn BindingProvider,
    options: TranslatorOptions,
    next_var: u32,
    next_node: u32,
}

impl<'p> AnalysisContext<'p> {
    /// Create a context for `unit`, allocating fresh ids above every id it uses
    pub fn new(
        provider: &'p dyn BindingProvider,
        options: TranslatorOptions,
        unit: &CompilationUnit,
    ) -> Self {
        let mut watermark = IdWatermark::default();
        watermark.visit_unit(unit);
        Self {
            provider,
            options,
            next_var: watermark.max_var,
            next_node: watermark.max_node,
        }
    }

    pub fn provider(&self) -> &'p dyn BindingProvider {
        self.provider
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    pub fn fresh_var(&mut self) -> VarId {
        self.next_var += 1;
        VarId(self.next_var)
    }

    pub fn fresh_node(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    /// Build an expression with a fresh node id
    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr::new(self.fresh_node(), kind)
    }

    pub fn type_binding(&self, ty: TypeId) -> TranslateResult<&'p TypeBinding> {
        self.provider
            .type_binding(ty)
            .ok_or_else(|| TranslateError::unresolved(ty))
    }

    pub fn method_binding(&self, method: MethodId) -> TranslateResult<&'p MethodBinding> {
        self.provider
            .method_binding(method)
            .ok_or_else(|| TranslateError::unresolved(method))
    }

    pub fn variable_binding(&self, var: VarId) -> TranslateResult<&'p VariableBinding> {
        self.provider
            .variable_binding(var)
            .ok_or_else(|| TranslateError::unresolved(var))
    }

    /// Name for diagnostics; falls back to the handle when unbound
    pub fn type_name(&self, ty: TypeId) -> String {
        self.provider
            .type_name(ty)
            .map(str::to_string)
            .unwrap_or_else(|| ty.to_string())
    }

    /// Whether `ty` is `ancestor` or has it in its supertype closure
    pub fn is_subtype(&self, ty: TypeId, ancestor: TypeId) -> bool {
        if ty == ancestor {
            return true;
        }
        let mut seen = FxHashSet::default();
        let mut stack = self.provider.supertypes(ty);
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.provider.supertypes(current));
            }
        }
        false
    }
}

/// Highest variable and node ids present in a unit
#[derive(Default)]
struct IdWatermark {
    max_var: u32,
    max_node: u32,
}

impl IdWatermark {
    fn var(&mut self, var: VarId) {
        self.max_var = self.max_var.max(var.as_u32());
    }
}

impl Visitor for IdWatermark {
    fn visit_field_decl(&mut self, field: &FieldDecl) {
        self.var(field.var);
        walk_field_decl(self, field);
    }

    fn visit_method_decl(&mut self, method: &MethodDecl) {
        for param in &method.params {
            self.var(param.var);
        }
        walk_method_decl(self, method);
    }

    fn visit_function_decl(&mut self, func: &FunctionDecl) {
        for param in &func.params {
            self.var(param.var);
        }
        walk_block(self, &func.body);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local(local) = stmt {
            self.var(local.var);
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.max_node = self.max_node.max(expr.id.as_u32());
        match &expr.kind {
            ExprKind::Name(var) | ExprKind::FieldAccess { field: var, .. } => self.var(*var),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trama_ast::{AstBuilder, UnitBindings};

    #[test]
    fn test_fresh_ids_do_not_collide() {
        let mut b = AstBuilder::new();
        let (ty, m, v) = (b.type_id(), b.method_id(), b.var_id());
        let read = b.name(v);
        let unit = b.unit(
            "Test",
            vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
                .field(FieldDecl::new(v, "i", TypeRef::int()))
                .method(
                    MethodDecl::new(m, "get", TypeRef::int())
                        .with_body(Block::new(vec![Stmt::ret(Some(read.clone()))])),
                )],
        );
        let bindings = UnitBindings::collect(&unit).unwrap();
        let mut ctx = AnalysisContext::new(&bindings, TranslatorOptions::default(), &unit);

        assert!(ctx.fresh_var() > v);
        assert!(ctx.fresh_node() > read.id);
    }

    #[test]
    fn test_unbound_lookup_is_fatal() {
        let unit = CompilationUnit::new("Empty");
        let bindings = UnitBindings::collect(&unit).unwrap();
        let ctx = AnalysisContext::new(&bindings, TranslatorOptions::default(), &unit);
        assert_eq!(
            ctx.type_binding(TypeId(9)).unwrap_err(),
            TranslateError::UnresolvedBinding {
                binding: "type#9".to_string()
            }
        );
    }
}
