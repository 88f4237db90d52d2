//! Method functionization
//!
//! Every function-eligible method becomes a global function taking its
//! receiver as an explicit first parameter. The pass runs in four steps:
//!
//! 1. Plan: name each function and allocate its receiver parameter
//! 2. Rewrite call sites to direct calls (packing variadic arguments)
//! 3. Extract bodies into functions, leaving forwarding wrappers where
//!    dispatch is still required
//! 4. Lower synchronization and insert nil checks over the whole unit

mod calls;
mod nil_check;
pub mod sync;

pub use calls::CallRewriter;
pub use nil_check::NilChecker;
pub use sync::{exit_paths, ExitKind, ExitPath, LockEvent, SyncLowering};

use crate::captures::CaptureTable;
use crate::context::AnalysisContext;
use crate::eligibility::EligibilityTable;
use crate::error::{TranslateError, TranslateResult};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use trama_ast::ast::*;
use trama_ast::{MethodId, TypeId, VarId};

/// Generated function for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub method: MethodId,
    pub declaring_type: TypeId,
    /// Mangled global name
    pub name: String,
    /// Receiver first (absent for static methods), then declared parameters
    pub params: Vec<FunctionParam>,
    pub receiver: Option<VarId>,
    pub return_type: TypeRef,
    /// A dispatch-form method forwarding to the function is kept
    pub has_wrapper: bool,
    /// Function entry forces static initialization of the declaring type
    pub initializes_type: bool,
    /// Body runs under a scoped lock
    pub synchronized: bool,
    /// Last parameter receives a packed sequence
    pub varargs: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionTable {
    records: Vec<FunctionRecord>,
    #[serde(skip)]
    index: FxHashMap<MethodId, usize>,
}

impl FunctionTable {
    pub fn get(&self, method: MethodId) -> Option<&FunctionRecord> {
        self.index.get(&method).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, method: MethodId) -> bool {
        self.index.contains_key(&method)
    }

    /// Records in planning (declaration) order
    pub fn records(&self) -> &[FunctionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, method: MethodId) -> usize {
        self.index.get(&method).copied().unwrap_or(usize::MAX)
    }

    fn insert(&mut self, record: FunctionRecord) {
        self.index.insert(record.method, self.records.len());
        self.records.push(record);
    }
}

/// Counters reported by functionization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionizeStats {
    pub functions: usize,
    pub wrappers: usize,
    pub removed_methods: usize,
    pub direct_calls: usize,
    pub nil_checks: usize,
    pub locks: usize,
    pub varargs_packs: usize,
}

pub struct Functionizer<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    eligibility: &'a EligibilityTable,
    captures: &'a CaptureTable,
}

impl<'a, 'p> Functionizer<'a, 'p> {
    pub fn new(
        ctx: &'a mut AnalysisContext<'p>,
        eligibility: &'a EligibilityTable,
        captures: &'a CaptureTable,
    ) -> Self {
        Self {
            ctx,
            eligibility,
            captures,
        }
    }

    pub fn run(
        mut self,
        unit: &mut CompilationUnit,
    ) -> TranslateResult<(FunctionTable, FunctionizeStats)> {
        let table = self.plan(unit)?;
        let mut stats = FunctionizeStats::default();

        let mut calls = CallRewriter::new(&mut *self.ctx, &table);
        calls.visit_unit_mut(unit);
        stats.direct_calls = calls.direct_calls;
        stats.varargs_packs = calls.varargs_packs;

        let mut extractor = Extractor {
            ctx: &mut *self.ctx,
            table: &table,
            functions: Vec::new(),
            removed: 0,
            locks: 0,
        };
        extractor.visit_unit_mut(unit);
        let mut functions = extractor.functions;
        functions.sort_by_key(|f| table.position(f.method));
        stats.functions = functions.len();
        stats.removed_methods = extractor.removed;
        stats.wrappers = table.records().iter().filter(|r| r.has_wrapper).count();
        stats.locks = extractor.locks;
        unit.functions.extend(functions);

        stats.locks += SyncLowering::default().lower(unit);

        let mut non_null: FxHashSet<VarId> =
            table.records().iter().filter_map(|r| r.receiver).collect();
        non_null.extend(self.captures.outer_links());
        let instance_functions: FxHashSet<MethodId> = table
            .records()
            .iter()
            .filter(|r| r.receiver.is_some())
            .map(|r| r.method)
            .collect();
        stats.nil_checks = NilChecker::new(&mut *self.ctx, instance_functions, non_null).run(unit);

        debug!(
            functions = stats.functions,
            wrappers = stats.wrappers,
            removed = stats.removed_methods,
            direct_calls = stats.direct_calls,
            nil_checks = stats.nil_checks,
            "functionization complete"
        );
        Ok((table, stats))
    }

    fn plan(&mut self, unit: &CompilationUnit) -> TranslateResult<FunctionTable> {
        let mut planner = Planner {
            ctx: &*self.ctx,
            eligibility: self.eligibility,
            table: FunctionTable::default(),
            used_names: FxHashSet::default(),
            receivers: Vec::new(),
            error: None,
        };
        planner.visit_unit(unit);
        let Planner {
            mut table,
            receivers,
            error,
            ..
        } = planner;
        if let Some(err) = error {
            return Err(err);
        }
        for (idx, param_name) in receivers {
            let var = self.ctx.fresh_var();
            let record = &mut table.records[idx];
            record.receiver = Some(var);
            record.params.insert(
                0,
                FunctionParam {
                    var,
                    name: param_name,
                    ty: TypeRef::Class(record.declaring_type),
                },
            );
        }
        Ok(table)
    }
}

/// Assigns names and signatures to eligible methods
struct Planner<'a, 'p> {
    ctx: &'a AnalysisContext<'p>,
    eligibility: &'a EligibilityTable,
    table: FunctionTable,
    used_names: FxHashSet<String>,
    /// Records needing a receiver parameter, with its name
    receivers: Vec<(usize, String)>,
    error: Option<TranslateError>,
}

impl Planner<'_, '_> {
    fn plan_method(&mut self, decl: &TypeDecl, method: &MethodDecl) -> TranslateResult<()> {
        let (ctx, table) = (self.ctx, self.eligibility);
        let Some(eligibility) = table.get(method.id) else {
            return Ok(());
        };
        if !eligibility.function_eligible {
            return Ok(());
        }
        let binding = ctx.method_binding(method.id)?;
        let type_name = &ctx.type_binding(decl.id)?.qualified_name;

        let same_named: Vec<MethodId> = decl
            .methods
            .iter()
            .filter(|m| !m.is_constructor && m.name == method.name)
            .map(|m| m.id)
            .collect();
        let mut name = format!("{}_{}", type_name, method.name);
        if same_named.len() > 1 {
            let ordinal = same_named
                .iter()
                .position(|&m| m == method.id)
                .map_or(1, |i| i + 1);
            name = format!("{}_{}", name, ordinal);
        }
        if self.used_names.contains(&name) {
            let mut n = 1;
            while self.used_names.contains(&format!("{}_{}", name, n)) {
                n += 1;
            }
            name = format!("{}_{}", name, n);
        }
        self.used_names.insert(name.clone());

        let is_static = binding.modifiers.is_static;
        let params = method
            .params
            .iter()
            .map(|p| FunctionParam {
                var: p.var,
                name: p.name.clone(),
                ty: p.ty.clone(),
            })
            .collect();

        if !is_static {
            let mut receiver_name = "self".to_string();
            let mut n = 1;
            while method.params.iter().any(|p| p.name == receiver_name) {
                receiver_name = format!("self${}", n);
                n += 1;
            }
            self.receivers.push((self.table.len(), receiver_name));
        }

        trace!(method = %method.name, function = %name, "planned function");
        self.table.insert(FunctionRecord {
            method: method.id,
            declaring_type: decl.id,
            name,
            params,
            receiver: None,
            return_type: method.return_type.clone(),
            has_wrapper: eligibility.dispatch_required,
            initializes_type: is_static && ctx.provider().has_static_initializer(decl.id),
            synchronized: method.modifiers.is_synchronized,
            varargs: method.varargs,
        });
        Ok(())
    }
}

impl Visitor for Planner<'_, '_> {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        for method in &decl.methods {
            if let Err(err) = self.plan_method(decl, method) {
                if self.error.is_none() {
                    self.error = Some(err);
                }
                return;
            }
        }
        walk_type_decl(self, decl);
    }
}

/// Moves function bodies out of their types
struct Extractor<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    table: &'a FunctionTable,
    functions: Vec<FunctionDecl>,
    removed: usize,
    locks: usize,
}

impl Extractor<'_, '_> {
    fn build_function(&mut self, record: &FunctionRecord, body: Block) -> FunctionDecl {
        let mut body = body;
        if let Some(receiver) = record.receiver {
            ReceiverSubstitution { receiver }.visit_block_mut(&mut body);
        }
        if record.synchronized {
            let lock = match record.receiver {
                Some(receiver) => self.ctx.expr(ExprKind::Name(receiver)),
                None => self.ctx.expr(ExprKind::ClassObject(record.declaring_type)),
            };
            body = Block::new(vec![Stmt::Locked { lock, body }]);
            self.locks += 1;
        }
        if record.initializes_type {
            body.stmts.insert(0, Stmt::InitializeType(record.declaring_type));
        }
        FunctionDecl {
            method: record.method,
            declaring_type: record.declaring_type,
            name: record.name.clone(),
            params: record.params.clone(),
            return_type: record.return_type.clone(),
            body,
        }
    }

    /// Body of the dispatch-form method: forward every argument
    fn wrapper_body(&mut self, record: &FunctionRecord, method: &MethodDecl) -> Block {
        let mut args = Vec::with_capacity(method.params.len() + 1);
        if record.receiver.is_some() {
            args.push(self.ctx.expr(ExprKind::This));
        }
        for param in &method.params {
            args.push(self.ctx.expr(ExprKind::Name(param.var)));
        }
        let call = self.ctx.expr(ExprKind::FunctionCall {
            function: record.method,
            args,
        });
        let stmt = if record.return_type == TypeRef::Void {
            Stmt::Expr(call)
        } else {
            Stmt::Return(Some(call))
        };
        Block::new(vec![stmt])
    }
}

impl VisitorMut for Extractor<'_, '_> {
    fn visit_type_decl_mut(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);

        let table = self.table;
        let mut kept = Vec::with_capacity(decl.methods.len());
        for mut method in std::mem::take(&mut decl.methods) {
            let Some(record) = table.get(method.id) else {
                kept.push(method);
                continue;
            };
            let body = method.body.take().unwrap_or_default();
            let function = self.build_function(record, body);
            self.functions.push(function);

            if record.has_wrapper {
                method.body = Some(self.wrapper_body(record, &method));
                method.modifiers.is_synchronized = false;
                kept.push(method);
            } else {
                self.removed += 1;
            }
        }
        decl.methods = kept;
    }
}

/// Replaces `this` with the receiver parameter, leaving nested type bodies alone
struct ReceiverSubstitution {
    receiver: VarId,
}

impl VisitorMut for ReceiverSubstitution {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if !matches!(stmt, Stmt::LocalType(_)) {
            walk_stmt_mut(self, stmt);
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::This => expr.kind = ExprKind::Name(self.receiver),
            ExprKind::New(new) => {
                if let Some(outer) = &mut new.outer {
                    self.visit_expr_mut(outer);
                }
                for arg in new.args.iter_mut().chain(new.capture_args.iter_mut()) {
                    self.visit_expr_mut(arg);
                }
            }
            _ => walk_expr_mut(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::CallGraph;
    use crate::captures::CaptureAnalyzer;
    use crate::eligibility::EligibilityAnalyzer;
    use crate::options::TranslatorOptions;
    use crate::scope::ScopeTree;
    use trama_ast::{AstBuilder, UnitBindings};

    fn functionize(unit: &mut CompilationUnit) -> (FunctionTable, FunctionizeStats) {
        let bindings = UnitBindings::collect(unit).unwrap();
        let mut ctx = AnalysisContext::new(&bindings, TranslatorOptions::default(), unit);
        let scopes = ScopeTree::build(unit, &bindings);
        let captures = CaptureAnalyzer::new(&mut ctx, &scopes).analyze(unit).unwrap();
        let calls = CallGraph::collect(unit, &ctx).unwrap();
        let eligibility = EligibilityAnalyzer::new(&ctx, &calls).analyze(unit).unwrap();
        Functionizer::new(&mut ctx, &eligibility, &captures)
            .run(unit)
            .unwrap()
    }

    fn private(id: MethodId, name: &str) -> MethodDecl {
        MethodDecl::new(id, name, TypeRef::Void)
            .with_modifiers(Modifiers::private())
            .with_body(Block::default())
    }

    #[test]
    fn test_same_named_methods_get_ordinals() {
        let mut b = AstBuilder::new();
        let ty = b.type_id();
        let (m1, m2, v) = (b.method_id(), b.method_id(), b.var_id());
        let mut unit = b.unit(
            "Test",
            vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
                .method(private(m1, "log"))
                .method(private(m2, "log").param(Param::new(v, "self", TypeRef::int())))],
        );
        let (table, stats) = functionize(&mut unit);

        assert_eq!(table.get(m1).unwrap().name, "Test_log_1");
        let second = table.get(m2).unwrap();
        assert_eq!(second.name, "Test_log_2");
        assert_eq!(second.params[0].name, "self$1");
        assert_eq!(second.params[1].name, "self");
        assert_eq!(stats.removed_methods, 2);
        assert!(unit.types[0].methods.is_empty());
        assert_eq!(unit.functions.len(), 2);
    }

    #[test]
    fn test_static_function_initializes_its_type() {
        let mut b = AstBuilder::new();
        let ty = b.type_id();
        let (m, counter) = (b.method_id(), b.var_id());
        let one = b.int(1);
        let mut unit = b.unit(
            "Test",
            vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
                .field(
                    FieldDecl::new(counter, "counter", TypeRef::int())
                        .with_modifiers(Modifiers::default().with_static())
                        .with_initializer(one),
                )
                .method(
                    private(m, "reset").with_modifiers(
                        Modifiers::private().with_static().with_synchronized(),
                    ),
                )],
        );
        let (table, stats) = functionize(&mut unit);

        let record = table.get(m).unwrap();
        assert!(record.receiver.is_none());
        assert!(record.initializes_type);
        assert_eq!(stats.locks, 1);

        let body = &unit.function(m).unwrap().body;
        assert_eq!(body.stmts[0], Stmt::InitializeType(ty));
        let Stmt::Locked { lock, .. } = &body.stmts[1] else {
            panic!("expected a locked region");
        };
        assert_eq!(lock.kind, ExprKind::ClassObject(ty));
    }

    #[test]
    fn test_receiver_replaces_this() {
        let mut b = AstBuilder::new();
        let ty = b.type_id();
        let (m, field) = (b.method_id(), b.var_id());
        let read = b.name(field);
        let mut unit = b.unit(
            "Test",
            vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
                .field(FieldDecl::new(field, "count", TypeRef::int()))
                .method(
                    MethodDecl::new(m, "count", TypeRef::int())
                        .with_modifiers(Modifiers::private())
                        .with_body(Block::new(vec![Stmt::ret(Some(read))])),
                )],
        );
        // Outer rewriting is what turns the bare field read into `this.count`
        let bindings = UnitBindings::collect(&unit).unwrap();
        let mut ctx = AnalysisContext::new(&bindings, TranslatorOptions::default(), &unit);
        let scopes = ScopeTree::build(&unit, &bindings);
        let captures = CaptureAnalyzer::new(&mut ctx, &scopes).analyze(&unit).unwrap();
        let calls = CallGraph::collect(&unit, &ctx).unwrap();
        let eligibility = EligibilityAnalyzer::new(&ctx, &calls).analyze(&unit).unwrap();
        crate::outer::OuterRewriter::new(&mut ctx, &captures).rewrite(&mut unit);
        let (table, _) = Functionizer::new(&mut ctx, &eligibility, &captures)
            .run(&mut unit)
            .unwrap();

        let receiver = table.get(m).unwrap().receiver.unwrap();
        let Stmt::Return(Some(value)) = &unit.function(m).unwrap().body.stmts[0] else {
            panic!("expected return");
        };
        let ExprKind::FieldAccess { receiver: on, .. } = &value.kind else {
            panic!("expected field access");
        };
        assert_eq!(on.kind, ExprKind::Name(receiver));
    }
}
