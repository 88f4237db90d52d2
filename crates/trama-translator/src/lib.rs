//! Trama Translator - scope/capture resolution and method functionization
//!
//! This crate rewrites a bound compilation unit so that nested and local types
//! reach enclosing state through explicit links, and so that methods whose
//! call sites can bypass dispatch become global functions.

pub mod callgraph;
pub mod captures;
pub mod context;
pub mod eligibility;
pub mod error;
pub mod functionize;
pub mod options;
pub mod outer;
pub mod scope;

pub use callgraph::{CallGraph, CallKind, CallSite};
pub use captures::{
    AccessPath, CaptureAnalyzer, CaptureArg, CaptureRecord, CaptureTable, CapturedVariable,
    PathHop, SyntheticField,
};
pub use context::AnalysisContext;
pub use eligibility::{DispatchReason, EligibilityAnalyzer, EligibilityRecord, EligibilityTable};
pub use error::{TranslateError, TranslateResult};
pub use functionize::{FunctionRecord, FunctionTable, Functionizer, FunctionizeStats};
pub use options::TranslatorOptions;
pub use outer::OuterRewriter;
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};

use serde::Serialize;
use tracing::{debug, info_span};
use trama_ast::ast::CompilationUnit;
use trama_ast::{BindingProvider, UnitBindings};

/// Counters describing one translated unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub scopes: usize,
    pub captured_variables: usize,
    pub outer_references: usize,
    pub outer_params: usize,
    pub access_paths: usize,
    pub call_sites: usize,
    pub functions: usize,
    pub wrappers: usize,
    pub removed_methods: usize,
    pub direct_calls: usize,
    pub nil_checks: usize,
    pub locks: usize,
    pub varargs_packs: usize,
}

/// Everything produced for one unit
#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutput {
    /// Rewritten tree
    pub unit: CompilationUnit,
    pub captures: CaptureTable,
    pub call_graph: CallGraph,
    pub eligibility: EligibilityTable,
    pub functions: FunctionTable,
    pub stats: TranslationStats,
}

/// Main translator entry point
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    options: TranslatorOptions,
}

impl Translator {
    pub fn new(options: TranslatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translate `unit` using facts from `provider`
    ///
    /// Analyses run over the untransformed tree; rewriting starts only once
    /// all of them have succeeded, so an error leaves nothing half-translated.
    pub fn translate(
        &self,
        unit: CompilationUnit,
        provider: &dyn BindingProvider,
    ) -> TranslateResult<TranslationOutput> {
        let span = info_span!("translate", unit = %unit.name);
        let _guard = span.enter();

        let mut unit = unit;
        let mut ctx = AnalysisContext::new(provider, self.options, &unit);

        let scopes = ScopeTree::build(&unit, provider);
        let captures = CaptureAnalyzer::new(&mut ctx, &scopes).analyze(&unit)?;
        let call_graph = CallGraph::collect(&unit, &ctx)?;
        let eligibility = EligibilityAnalyzer::new(&ctx, &call_graph).analyze(&unit)?;

        let access_paths = OuterRewriter::new(&mut ctx, &captures).rewrite(&mut unit);
        let (functions, functionized) =
            Functionizer::new(&mut ctx, &eligibility, &captures).run(&mut unit)?;

        let stats = TranslationStats {
            scopes: scopes.len(),
            captured_variables: captures.captured_variable_count(),
            outer_references: captures.outer_reference_count(),
            outer_params: captures.outer_param_count(),
            access_paths,
            call_sites: call_graph.sites().len(),
            functions: functionized.functions,
            wrappers: functionized.wrappers,
            removed_methods: functionized.removed_methods,
            direct_calls: functionized.direct_calls,
            nil_checks: functionized.nil_checks,
            locks: functionized.locks,
            varargs_packs: functionized.varargs_packs,
        };
        debug!(?stats, "translation complete");

        Ok(TranslationOutput {
            unit,
            captures,
            call_graph,
            eligibility,
            functions,
            stats,
        })
    }

    /// Translate a unit whose bindings are derived from the tree itself
    pub fn translate_unit(&self, unit: CompilationUnit) -> TranslateResult<TranslationOutput> {
        let bindings = UnitBindings::collect(&unit)?;
        self.translate(unit, &bindings)
    }
}
