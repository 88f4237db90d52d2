//! Call sites and first-class method references
//!
//! Recorded once over the untransformed unit. Eligibility reads it to find
//! methods whose identity escapes or whose body needs `super` dispatch, and
//! it is published with the output.

use crate::context::AnalysisContext;
use crate::error::{TranslateError, TranslateResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use trama_ast::ast::*;
use trama_ast::{BodyKey, MethodId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Call through an explicit receiver expression
    Virtual,
    /// Unqualified instance call (receiver is `this` or an enclosing instance)
    Implicit,
    /// `super.m(...)`
    Super,
    /// Call of a static method
    Static,
    /// Method used as a value
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub node: NodeId,
    pub caller: BodyKey,
    pub callee: MethodId,
    pub kind: CallKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CallGraph {
    sites: Vec<CallSite>,
    #[serde(skip)]
    by_callee: FxHashMap<MethodId, Vec<usize>>,
}

impl CallGraph {
    pub fn collect(unit: &CompilationUnit, ctx: &AnalysisContext<'_>) -> TranslateResult<Self> {
        let mut collector = CallCollector {
            ctx,
            graph: CallGraph::default(),
            bodies: Vec::new(),
            error: None,
        };
        collector.visit_unit(unit);
        if let Some(err) = collector.error {
            return Err(err);
        }
        let graph = collector.graph;
        tracing::debug!(
            sites = graph.sites.len(),
            callees = graph.by_callee.len(),
            "collected call graph"
        );
        Ok(graph)
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn sites_for(&self, callee: MethodId) -> impl Iterator<Item = &CallSite> {
        self.by_callee
            .get(&callee)
            .into_iter()
            .flatten()
            .map(|&idx| &self.sites[idx])
    }

    /// Whether `method` is used as a value anywhere in the unit
    pub fn is_referenced(&self, method: MethodId) -> bool {
        self.sites_for(method)
            .any(|site| site.kind == CallKind::Reference)
    }

    /// Sites recorded directly in `body`, in tree order
    pub fn sites_in(&self, body: BodyKey) -> impl Iterator<Item = &CallSite> {
        self.sites.iter().filter(move |site| site.caller == body)
    }

    fn add(&mut self, site: CallSite) {
        self.by_callee
            .entry(site.callee)
            .or_default()
            .push(self.sites.len());
        self.sites.push(site);
    }
}

struct CallCollector<'a, 'p> {
    ctx: &'a AnalysisContext<'p>,
    graph: CallGraph,
    bodies: Vec<BodyKey>,
    error: Option<TranslateError>,
}

impl CallCollector<'_, '_> {
    fn record(&mut self, node: NodeId, callee: MethodId, kind: CallKind) {
        let Some(&caller) = self.bodies.last() else {
            return;
        };
        let kind = match kind {
            CallKind::Virtual | CallKind::Implicit => match self.ctx.method_binding(callee) {
                Ok(binding) if binding.modifiers.is_static => CallKind::Static,
                Ok(_) => kind,
                Err(err) => {
                    if self.error.is_none() {
                        self.error = Some(err);
                    }
                    return;
                }
            },
            _ => kind,
        };
        self.graph.add(CallSite {
            node,
            caller,
            callee,
            kind,
        });
    }
}

impl Visitor for CallCollector<'_, '_> {
    fn enter_body(&mut self, body: BodyKey) {
        self.bodies.push(body);
    }

    fn exit_body(&mut self, _body: BodyKey) {
        self.bodies.pop();
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call(call) => {
                let kind = if call.receiver.is_some() {
                    CallKind::Virtual
                } else {
                    CallKind::Implicit
                };
                self.record(expr.id, call.method, kind);
            }
            ExprKind::SuperCall { method, .. } => self.record(expr.id, *method, CallKind::Super),
            ExprKind::MethodRef { method, .. } => {
                self.record(expr.id, *method, CallKind::Reference)
            }
            ExprKind::FunctionCall { function, .. } => {
                self.record(expr.id, *function, CallKind::Static)
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}
