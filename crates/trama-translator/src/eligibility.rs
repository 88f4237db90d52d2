//! Functionization eligibility
//!
//! Classifies every declared method. A method is *function-eligible* when a
//! direct call can replace dispatch at every call site in the unit, and
//! *dispatch-required* when its dispatch form must stay observable. The two
//! are independent: an eligible method that is also dispatch-required keeps a
//! forwarding wrapper.

use crate::callgraph::{CallGraph, CallKind};
use crate::context::AnalysisContext;
use crate::error::TranslateResult;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use trama_ast::ast::*;
use trama_ast::{BodyKey, MethodId};

/// Why a method keeps its dispatch form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchReason {
    /// Overrides a supertype method
    Overrides,
    /// Overridden in a subtype, directly or through the override chain
    Overridden,
    /// Visible outside the declaring type
    NonPrivate,
    /// Used as a first-class value
    Referenced,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub method: MethodId,
    pub function_eligible: bool,
    pub dispatch_required: bool,
    pub reasons: Vec<DispatchReason>,
}

impl EligibilityRecord {
    /// Functionized, with a forwarding method left behind
    pub fn keeps_wrapper(&self) -> bool {
        self.function_eligible && self.dispatch_required
    }

    /// Functionized and dropped from its type
    pub fn is_removed(&self) -> bool {
        self.function_eligible && !self.dispatch_required
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EligibilityTable {
    records: Vec<EligibilityRecord>,
    #[serde(skip)]
    index: FxHashMap<MethodId, usize>,
}

impl EligibilityTable {
    pub fn get(&self, method: MethodId) -> Option<&EligibilityRecord> {
        self.index.get(&method).map(|&idx| &self.records[idx])
    }

    pub fn records(&self) -> &[EligibilityRecord] {
        &self.records
    }

    pub fn is_function_eligible(&self, method: MethodId) -> bool {
        self.get(method).is_some_and(|r| r.function_eligible)
    }

    /// Eligible methods in declaration order
    pub fn eligible(&self) -> impl Iterator<Item = &EligibilityRecord> {
        self.records.iter().filter(|r| r.function_eligible)
    }

    fn insert(&mut self, record: EligibilityRecord) {
        self.index.insert(record.method, self.records.len());
        self.records.push(record);
    }
}

pub struct EligibilityAnalyzer<'a, 'p> {
    ctx: &'a AnalysisContext<'p>,
    calls: &'a CallGraph,
}

impl<'a, 'p> EligibilityAnalyzer<'a, 'p> {
    pub fn new(ctx: &'a AnalysisContext<'p>, calls: &'a CallGraph) -> Self {
        Self { ctx, calls }
    }

    pub fn analyze(&self, unit: &CompilationUnit) -> TranslateResult<EligibilityTable> {
        let mut declared = DeclaredMethods::default();
        declared.visit_unit(unit);

        let polymorphic = self.override_closure(&declared.methods);
        let functionize_final = self.ctx.options().functionize_final_methods;
        let provider = self.ctx.provider();

        let mut table = EligibilityTable::default();
        for &method in &declared.methods {
            let binding = self.ctx.method_binding(method)?;
            let is_private = provider.is_private(method);
            let is_constructor = provider.is_constructor(method);
            let in_chain = polymorphic.contains(&method);

            let mut reasons = Vec::new();
            if is_constructor {
                reasons.push(DispatchReason::Constructor);
            }
            if !provider.overrides(method).is_empty() {
                reasons.push(DispatchReason::Overrides);
            }
            if !provider.overridden_by(method).is_empty()
                || (in_chain && provider.overrides(method).is_empty())
            {
                reasons.push(DispatchReason::Overridden);
            }
            if !is_private {
                reasons.push(DispatchReason::NonPrivate);
            }
            if self.calls.is_referenced(method) {
                reasons.push(DispatchReason::Referenced);
            }

            let cannot_be_overridden =
                provider.is_final(method) || provider.is_static_method(method);
            let function_eligible = binding.has_body
                && !is_constructor
                && !binding.modifiers.is_abstract
                && !in_chain
                && (is_private || (functionize_final && cannot_be_overridden));

            let record = EligibilityRecord {
                method,
                function_eligible,
                dispatch_required: !reasons.is_empty(),
                reasons,
            };
            trace!(
                method = %binding.name,
                eligible = record.function_eligible,
                dispatch = record.dispatch_required,
                "eligibility"
            );
            table.insert(record);
        }
        self.exclude_super_dispatch(&mut table);

        debug!(
            methods = table.records.len(),
            eligible = table.eligible().count(),
            wrappers = table.records.iter().filter(|r| r.keeps_wrapper()).count(),
            "eligibility analysis complete"
        );
        Ok(table)
    }

    /// Methods whose own body calls `super.m()` on a method that is not
    /// function-eligible keep their method form. Repeats until no further
    /// method drops out.
    fn exclude_super_dispatch(&self, table: &mut EligibilityTable) {
        loop {
            let blocked: Vec<usize> = table
                .records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.function_eligible)
                .filter(|(_, r)| {
                    self.calls
                        .sites_in(BodyKey::Method(r.method))
                        .any(|site| {
                            site.kind == CallKind::Super
                                && !table.is_function_eligible(site.callee)
                        })
                })
                .map(|(idx, _)| idx)
                .collect();
            if blocked.is_empty() {
                return;
            }
            for idx in blocked {
                trace!(method = %table.records[idx].method, "super dispatch keeps method form");
                table.records[idx].function_eligible = false;
            }
        }
    }

    /// Methods in an override chain, following the relation in both
    /// directions so a one-sided provider answer still marks both ends
    fn override_closure(&self, methods: &[MethodId]) -> FxHashSet<MethodId> {
        let provider = self.ctx.provider();
        let mut chain = FxHashSet::default();
        let mut worklist: Vec<MethodId> = methods
            .iter()
            .copied()
            .filter(|&m| !provider.overrides(m).is_empty() || !provider.overridden_by(m).is_empty())
            .collect();

        while let Some(method) = worklist.pop() {
            if !chain.insert(method) {
                continue;
            }
            for &related in provider
                .overrides(method)
                .iter()
                .chain(provider.overridden_by(method))
            {
                if !chain.contains(&related) {
                    worklist.push(related);
                }
            }
        }
        chain
    }
}

/// Declared methods of every type, in tree order
#[derive(Default)]
struct DeclaredMethods {
    methods: Vec<MethodId>,
}

impl Visitor for DeclaredMethods {
    fn visit_method_decl(&mut self, method: &MethodDecl) {
        self.methods.push(method.id);
        walk_method_decl(self, method);
    }
}
