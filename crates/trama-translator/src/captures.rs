//! Scope and capture resolution
//!
//! For every nested, local and anonymous type this pass decides whether it
//! links to an enclosing instance and which enclosing locals it snapshots. For
//! every reference that reaches outside the current body (outer fields, outer
//! or inherited methods, qualified `this`, captured locals) it records the
//! [`AccessPath`] from the reference site.
//!
//! Instance creation and superclass construction depend on what the created
//! type captures, which is only known once every reference has been seen, so
//! those sites are resolved in a fixpoint loop after the main walk.

use crate::context::AnalysisContext;
use crate::error::{TranslateError, TranslateResult};
use crate::scope::{ScopeId, ScopeKind, ScopeTree};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use trama_ast::ast::*;
use trama_ast::{BodyKey, MethodId, NodeId, Owner, TypeId, VarId, VariableKind};

/// Field or parameter synthesized by the translator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticField {
    pub var: VarId,
    pub name: String,
    pub ty: TypeRef,
    /// Stores a non-owning reference
    #[serde(default)]
    pub is_weak: bool,
}

/// A captured local and the field holding its snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedVariable {
    pub variable: VarId,
    pub field: SyntheticField,
}

/// Capture metadata of one nested, local or anonymous type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub ty: TypeId,
    /// The enclosing instance is stored in `outer_field`
    pub needs_outer_reference: bool,
    /// Constructors take the enclosing instance as `outer_param`
    pub needs_outer_param: bool,
    pub outer_field: Option<SyntheticField>,
    pub outer_param: Option<SyntheticField>,
    /// Captured locals in first-reference order
    pub captures: Vec<CapturedVariable>,
}

impl CaptureRecord {
    fn new(ty: TypeId) -> Self {
        Self {
            ty,
            needs_outer_reference: false,
            needs_outer_param: false,
            outer_field: None,
            outer_param: None,
            captures: Vec::new(),
        }
    }

    pub fn captured_variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.captures.iter().map(|c| c.variable)
    }

    /// Field holding the snapshot of `variable`
    pub fn inner_field(&self, variable: VarId) -> Option<&SyntheticField> {
        self.captures
            .iter()
            .find(|c| c.variable == variable)
            .map(|c| &c.field)
    }

    pub fn is_captured(&self, variable: VarId) -> bool {
        self.inner_field(variable).is_some()
    }

    fn synthesized_names(&self) -> Vec<String> {
        self.outer_field
            .iter()
            .chain(self.outer_param.iter())
            .chain(self.captures.iter().map(|c| &c.field))
            .map(|f| f.name.clone())
            .collect()
    }
}

/// One step from a reference site towards the binding it names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathHop {
    /// Load the stored enclosing instance of `from`
    Outer {
        field: VarId,
        from: TypeId,
        to: TypeId,
    },
    /// Use the enclosing instance passed to the constructor of `from`
    OuterParameter {
        param: VarId,
        from: TypeId,
        to: TypeId,
    },
    /// Load the snapshot of `variable` held by `owner`
    Capture {
        field: VarId,
        owner: TypeId,
        variable: VarId,
    },
    /// Load a declared instance field
    Member { field: VarId, declaring: TypeId },
}

impl PathHop {
    /// Type of the instance this hop arrives at, or declaring type of a member
    pub fn target(&self) -> Option<TypeId> {
        match self {
            PathHop::Outer { to, .. } | PathHop::OuterParameter { to, .. } => Some(*to),
            PathHop::Member { declaring, .. } => Some(*declaring),
            PathHop::Capture { .. } => None,
        }
    }

    pub fn is_outer_parameter(&self) -> bool {
        matches!(self, PathHop::OuterParameter { .. })
    }
}

/// Ordered hops from a reference site; empty means the current receiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPath {
    pub hops: Vec<PathHop>,
}

impl AccessPath {
    pub fn new(hops: Vec<PathHop>) -> Self {
        Self { hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Type reached by the first hop
    pub fn first_target(&self) -> Option<TypeId> {
        self.hops.first().and_then(PathHop::target)
    }
}

/// Value supplied for a captured variable at a construction site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArg {
    pub variable: VarId,
    /// Empty when the variable is declared in the constructing body
    pub path: AccessPath,
}

/// Published output of capture analysis
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureTable {
    records: Vec<CaptureRecord>,
    #[serde(skip)]
    index: FxHashMap<TypeId, usize>,
    paths: BTreeMap<NodeId, AccessPath>,
    creation_outer: BTreeMap<NodeId, AccessPath>,
    creation_captures: BTreeMap<NodeId, Vec<CaptureArg>>,
    super_outer: BTreeMap<TypeId, AccessPath>,
    super_captures: BTreeMap<TypeId, Vec<CaptureArg>>,
}

impl CaptureTable {
    pub fn record(&self, ty: TypeId) -> Option<&CaptureRecord> {
        self.index.get(&ty).map(|&idx| &self.records[idx])
    }

    /// Records of all non-top-level types, in tree order
    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    /// Access path of a reference node (names, calls, method refs, qualified `this`)
    pub fn path(&self, node: NodeId) -> Option<&AccessPath> {
        self.paths.get(&node)
    }

    pub fn paths(&self) -> impl Iterator<Item = (NodeId, &AccessPath)> {
        self.paths.iter().map(|(node, path)| (*node, path))
    }

    /// Path to the enclosing instance passed at a creation site
    pub fn creation_outer(&self, node: NodeId) -> Option<&AccessPath> {
        self.creation_outer.get(&node)
    }

    /// Captured values passed at a creation site, in capture order
    pub fn creation_captures(&self, node: NodeId) -> &[CaptureArg] {
        self.creation_captures
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Path to the enclosing instance `ty` passes to its superclass constructor
    pub fn super_outer(&self, ty: TypeId) -> Option<&AccessPath> {
        self.super_outer.get(&ty)
    }

    pub fn super_captures(&self, ty: TypeId) -> &[CaptureArg] {
        self.super_captures
            .get(&ty)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Synthesized outer fields and parameters (never null once constructed)
    pub fn outer_links(&self) -> FxHashSet<VarId> {
        self.records
            .iter()
            .flat_map(|r| r.outer_field.iter().chain(r.outer_param.iter()))
            .map(|f| f.var)
            .collect()
    }

    pub fn captured_variable_count(&self) -> usize {
        self.records.iter().map(|r| r.captures.len()).sum()
    }

    pub fn outer_reference_count(&self) -> usize {
        self.records.iter().filter(|r| r.needs_outer_reference).count()
    }

    pub fn outer_param_count(&self) -> usize {
        self.records.iter().filter(|r| r.needs_outer_param).count()
    }

    fn fingerprint(&self) -> (usize, usize, usize) {
        (
            self.captured_variable_count(),
            self.outer_reference_count(),
            self.outer_param_count(),
        )
    }

    fn insert_record(&mut self, record: CaptureRecord) {
        self.index.insert(record.ty, self.records.len());
        self.records.push(record);
    }

    fn record_mut(&mut self, ty: TypeId) -> Option<&mut CaptureRecord> {
        self.index.get(&ty).map(|&idx| &mut self.records[idx])
    }
}

#[derive(Debug, Clone, Copy)]
enum PendingSite {
    Creation {
        node: NodeId,
        ty: TypeId,
        site: ScopeId,
        explicit_outer: bool,
    },
    SuperConstruction {
        ty: TypeId,
    },
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Exactly(TypeId),
    SubtypeOf(TypeId),
}

impl Target {
    fn ty(self) -> TypeId {
        match self {
            Target::Exactly(ty) | Target::SubtypeOf(ty) => ty,
        }
    }
}

/// Computes capture records and access paths for one unit
pub struct CaptureAnalyzer<'a, 'p> {
    ctx: &'a mut AnalysisContext<'p>,
    scopes: &'a ScopeTree,
    table: CaptureTable,
    /// Body scopes being walked (None when the body has no scope)
    bodies: Vec<Option<ScopeId>>,
    pending: Vec<PendingSite>,
    error: Option<TranslateError>,
}

impl<'a, 'p> CaptureAnalyzer<'a, 'p> {
    pub fn new(ctx: &'a mut AnalysisContext<'p>, scopes: &'a ScopeTree) -> Self {
        Self {
            ctx,
            scopes,
            table: CaptureTable::default(),
            bodies: Vec::new(),
            pending: Vec::new(),
            error: None,
        }
    }

    pub fn analyze(mut self, unit: &CompilationUnit) -> TranslateResult<CaptureTable> {
        self.seed_records()?;

        self.visit_unit(unit);
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        self.resolve_pending()?;

        for record in &self.table.records {
            trace!(
                ty = %self.ctx.type_name(record.ty),
                outer_reference = record.needs_outer_reference,
                outer_param = record.needs_outer_param,
                captures = record.captures.len(),
                "capture record"
            );
        }
        debug!(
            records = self.table.records.len(),
            paths = self.table.paths.len(),
            captured = self.table.captured_variable_count(),
            outer_references = self.table.outer_reference_count(),
            "capture analysis complete"
        );
        Ok(self.table)
    }

    /// One record per non-top-level type; inner member types of classes
    /// always receive their enclosing instance
    fn seed_records(&mut self) -> TranslateResult<()> {
        let scopes = self.scopes;
        for scope in scopes.iter() {
            let Some(ty) = scope.declared_type else {
                continue;
            };
            if scope.kind == ScopeKind::TopLevelType {
                continue;
            }
            self.table.insert_record(CaptureRecord::new(ty));
            if scope.kind == ScopeKind::MemberType && !scope.is_static {
                self.ensure_outer_param(ty)?;
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: TranslateError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    // ------------------------------------------------------------------------
    // Scope navigation
    // ------------------------------------------------------------------------

    fn declared(&self, scope: ScopeId) -> TranslateResult<TypeId> {
        self.scopes
            .get(scope)
            .declared_type
            .ok_or_else(|| TranslateError::InconsistentNesting {
                ty: format!("scope {}", scope.0),
                message: "expected a type scope".to_string(),
            })
    }

    /// Type scope one level out from `ty_scope`, and whether an instance of
    /// it is available there
    fn outer_level(&self, ty_scope: ScopeId) -> Option<(ScopeId, bool)> {
        let scope = self.scopes.get(ty_scope);
        let parent_id = scope.parent?;
        let parent = self.scopes.get(parent_id);
        if parent.is_type() {
            Some((parent_id, !scope.is_static))
        } else {
            let outer = self.scopes.enclosing_type_scope(parent_id)?;
            Some((outer, !parent.is_static))
        }
    }

    fn unreachable(&self, site: ScopeId, target: TypeId) -> TranslateError {
        let site = self
            .scopes
            .get(site)
            .body
            .map(|body| body.to_string())
            .unwrap_or_else(|| format!("scope {}", site.0));
        TranslateError::UnreachableInstance {
            site,
            target: self.ctx.type_name(target),
        }
    }

    fn matches(&self, ty: TypeId, target: Target) -> bool {
        match target {
            Target::Exactly(expected) => ty == expected,
            Target::SubtypeOf(ancestor) => self.ctx.is_subtype(ty, ancestor),
        }
    }

    // ------------------------------------------------------------------------
    // Synthesized members
    // ------------------------------------------------------------------------

    /// `base`, or `base$n` if the type already declares or synthesized that name
    fn unique_name(&self, ty: TypeId, base: &str) -> TranslateResult<String> {
        let provider = self.ctx.provider();
        let binding = self.ctx.type_binding(ty)?;
        let mut taken: FxHashSet<String> = binding
            .fields
            .iter()
            .filter_map(|field| provider.variable_binding(*field))
            .map(|field| field.name.clone())
            .collect();
        if let Some(record) = self.table.record(ty) {
            taken.extend(record.synthesized_names());
        }
        if !taken.contains(base) {
            return Ok(base.to_string());
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}${}", base, n);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn record_mut(&mut self, ty: TypeId) -> TranslateResult<&mut CaptureRecord> {
        let name = self.ctx.type_name(ty);
        self.table
            .record_mut(ty)
            .ok_or(TranslateError::InconsistentNesting {
                ty: name,
                message: "top-level type has no enclosing scope".to_string(),
            })
    }

    /// Type whose instance encloses instances of `ty`
    fn enclosing_instance_type(&self, ty: TypeId) -> TranslateResult<TypeId> {
        let ty_scope = self.scopes.type_scope(ty)?;
        let (outer, _) = self
            .outer_level(ty_scope)
            .ok_or_else(|| TranslateError::InconsistentNesting {
                ty: self.ctx.type_name(ty),
                message: "no enclosing type".to_string(),
            })?;
        self.declared(outer)
    }

    fn ensure_outer_param(&mut self, ty: TypeId) -> TranslateResult<VarId> {
        if let Some(param) = self.table.record(ty).and_then(|r| r.outer_param.as_ref()) {
            return Ok(param.var);
        }
        let outer = self.enclosing_instance_type(ty)?;
        let name = self.unique_name(ty, "outer$")?;
        let var = self.ctx.fresh_var();
        let record = self.record_mut(ty)?;
        record.needs_outer_param = true;
        record.outer_param = Some(SyntheticField {
            var,
            name,
            ty: TypeRef::Class(outer),
            is_weak: false,
        });
        Ok(var)
    }

    fn ensure_outer_field(&mut self, ty: TypeId) -> TranslateResult<VarId> {
        if let Some(field) = self.table.record(ty).and_then(|r| r.outer_field.as_ref()) {
            return Ok(field.var);
        }
        // The stored link is initialized from the constructor parameter
        self.ensure_outer_param(ty)?;
        let outer = self.enclosing_instance_type(ty)?;
        let depth = self.scopes.type_depth(self.scopes.type_scope(ty)?);
        let name = self.unique_name(ty, &format!("this${}", depth.saturating_sub(1)))?;
        let var = self.ctx.fresh_var();
        let record = self.record_mut(ty)?;
        record.needs_outer_reference = true;
        record.outer_field = Some(SyntheticField {
            var,
            name,
            ty: TypeRef::Class(outer),
            is_weak: false,
        });
        Ok(var)
    }

    fn ensure_capture(&mut self, ty: TypeId, variable: VarId) -> TranslateResult<VarId> {
        if let Some(field) = self.table.record(ty).and_then(|r| r.inner_field(variable)) {
            return Ok(field.var);
        }
        let binding = self.ctx.variable_binding(variable)?;
        let name = self.unique_name(ty, &format!("val${}", binding.name))?;
        let var = self.ctx.fresh_var();
        let record = self.record_mut(ty)?;
        record.captures.push(CapturedVariable {
            variable,
            field: SyntheticField {
                var,
                name,
                ty: binding.ty.clone(),
                is_weak: binding.is_weak,
            },
        });
        Ok(var)
    }

    /// Hop out of `from`, reading the stored link unless the site is in the
    /// initializing context of `from` itself
    fn outer_hop(&mut self, from: TypeId, to: TypeId, use_param: bool) -> TranslateResult<PathHop> {
        if use_param {
            let param = self.ensure_outer_param(from)?;
            Ok(PathHop::OuterParameter { param, from, to })
        } else {
            let field = self.ensure_outer_field(from)?;
            Ok(PathHop::Outer { field, from, to })
        }
    }

    // ------------------------------------------------------------------------
    // Path computation
    // ------------------------------------------------------------------------

    /// Path from body `site` to the innermost enclosing instance matching
    /// `target`. With `skip_self` the site's own instance is not considered.
    fn instance_path(
        &mut self,
        site: ScopeId,
        target: Target,
        skip_self: bool,
    ) -> TranslateResult<AccessPath> {
        let site_scope = self.scopes.get(site);
        if site_scope.is_static {
            return Err(self.unreachable(site, target.ty()));
        }
        let initializing = site_scope.is_initializing();
        let mut ty_scope = self
            .scopes
            .enclosing_type_scope(site)
            .ok_or_else(|| self.unreachable(site, target.ty()))?;

        let mut hops = Vec::new();
        loop {
            let ty = self.declared(ty_scope)?;
            let first = hops.is_empty();
            if !(first && skip_self) && self.matches(ty, target) {
                return Ok(AccessPath::new(hops));
            }
            let (next, has_instance) = match self.outer_level(ty_scope) {
                Some(level) => level,
                None => return Err(self.unreachable(site, target.ty())),
            };
            if !has_instance {
                return Err(self.unreachable(site, target.ty()));
            }
            let to = self.declared(next)?;
            hops.push(self.outer_hop(ty, to, first && initializing)?);
            ty_scope = next;
        }
    }

    /// Path from body `site` to the local `variable` declared in body `declaring`
    fn local_path(
        &mut self,
        variable: VarId,
        declaring: ScopeId,
        site: ScopeId,
    ) -> TranslateResult<AccessPath> {
        let initializing = self.scopes.get(site).is_initializing();
        let mut ty_scope = self.scopes.enclosing_type_scope(site).ok_or_else(|| {
            TranslateError::InconsistentNesting {
                ty: variable.to_string(),
                message: "reference outside of any type".to_string(),
            }
        })?;

        let mut hops = Vec::new();
        loop {
            let ty = self.declared(ty_scope)?;
            let parent = self.scopes.get(ty_scope).parent;
            if parent == Some(declaring) {
                let field = self.ensure_capture(ty, variable)?;
                hops.push(PathHop::Capture {
                    field,
                    owner: ty,
                    variable,
                });
                return Ok(AccessPath::new(hops));
            }
            let (next, has_instance) =
                self.outer_level(ty_scope)
                    .ok_or_else(|| TranslateError::InconsistentNesting {
                        ty: self.ctx.type_name(ty),
                        message: format!("{} is not declared in an enclosing body", variable),
                    })?;
            if !has_instance {
                return Err(self.unreachable(site, ty));
            }
            let to = self.declared(next)?;
            let first = hops.is_empty();
            hops.push(self.outer_hop(ty, to, first && initializing)?);
            ty_scope = next;
        }
    }

    fn record_path(&mut self, node: NodeId, path: AccessPath) {
        if !path.is_empty() {
            self.table.paths.insert(node, path);
        }
    }

    fn resolve_variable(&mut self, node: NodeId, variable: VarId, site: ScopeId) -> TranslateResult<()> {
        let binding = self.ctx.variable_binding(variable)?;
        match binding.kind {
            VariableKind::Field => {
                if binding.is_static {
                    return Ok(());
                }
                let Owner::Type(declaring) = binding.owner else {
                    return Err(TranslateError::InconsistentNesting {
                        ty: variable.to_string(),
                        message: "field owned by a body".to_string(),
                    });
                };
                let mut path = self.instance_path(site, Target::SubtypeOf(declaring), false)?;
                if !path.is_empty() {
                    path.hops.push(PathHop::Member {
                        field: variable,
                        declaring,
                    });
                }
                self.record_path(node, path);
            }
            VariableKind::Parameter | VariableKind::Local => {
                let declaring = self.scopes.declaring_scope(binding.owner)?;
                if declaring != site {
                    let path = self.local_path(variable, declaring, site)?;
                    self.record_path(node, path);
                }
            }
        }
        Ok(())
    }

    fn resolve_method(&mut self, node: NodeId, method: MethodId, site: ScopeId) -> TranslateResult<()> {
        let binding = self.ctx.method_binding(method)?;
        let provider = self.ctx.provider();
        if provider.is_static_method(method) || provider.is_constructor(method) {
            return Ok(());
        }
        let path = self.instance_path(site, Target::SubtypeOf(binding.declaring_type), false)?;
        self.record_path(node, path);
        Ok(())
    }

    fn resolve_reference(&mut self, expr: &Expr, site: ScopeId) -> TranslateResult<()> {
        match &expr.kind {
            ExprKind::Name(var) => self.resolve_variable(expr.id, *var, site),
            ExprKind::QualifiedThis(ty) => {
                let path = self.instance_path(site, Target::Exactly(*ty), false)?;
                self.record_path(expr.id, path);
                Ok(())
            }
            ExprKind::Call(call) if call.receiver.is_none() => {
                self.resolve_method(expr.id, call.method, site)
            }
            ExprKind::MethodRef {
                receiver: None,
                method,
            } => self.resolve_method(expr.id, *method, site),
            ExprKind::New(new) => {
                self.pending.push(PendingSite::Creation {
                    node: expr.id,
                    ty: new.ty,
                    site,
                    explicit_outer: new.outer.is_some(),
                });
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Construction sites
    // ------------------------------------------------------------------------

    fn resolve_pending(&mut self) -> TranslateResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let mut iterations = 0;
        loop {
            iterations += 1;
            let before = self.table.fingerprint();
            for site in &pending {
                match *site {
                    PendingSite::Creation {
                        node,
                        ty,
                        site,
                        explicit_outer,
                    } => self.resolve_creation(node, ty, site, explicit_outer)?,
                    PendingSite::SuperConstruction { ty } => self.resolve_super(ty)?,
                }
            }
            if self.table.fingerprint() == before {
                break;
            }
        }
        trace!(iterations, sites = pending.len(), "construction sites resolved");
        Ok(())
    }

    fn capture_args(&mut self, variables: Vec<VarId>, site: ScopeId) -> TranslateResult<Vec<CaptureArg>> {
        let mut args = Vec::with_capacity(variables.len());
        for variable in variables {
            let owner = self.ctx.variable_binding(variable)?.owner;
            let declaring = self.scopes.declaring_scope(owner)?;
            let path = if declaring == site {
                AccessPath::default()
            } else {
                self.local_path(variable, declaring, site)?
            };
            args.push(CaptureArg { variable, path });
        }
        Ok(args)
    }

    fn resolve_creation(
        &mut self,
        node: NodeId,
        ty: TypeId,
        site: ScopeId,
        explicit_outer: bool,
    ) -> TranslateResult<()> {
        let Some(record) = self.table.record(ty) else {
            return Ok(());
        };
        let needs_outer = record.needs_outer_param && !explicit_outer;
        let captured: Vec<VarId> = record.captured_variables().collect();

        if needs_outer {
            let outer = self.enclosing_instance_type(ty)?;
            let path = self.instance_path(site, Target::SubtypeOf(outer), false)?;
            self.table.creation_outer.insert(node, path);
        }
        if !captured.is_empty() {
            let args = self.capture_args(captured, site)?;
            self.table.creation_captures.insert(node, args);
        }
        Ok(())
    }

    fn resolve_super(&mut self, ty: TypeId) -> TranslateResult<()> {
        let Some(superclass) = self.ctx.type_binding(ty)?.superclass else {
            return Ok(());
        };
        let Some(record) = self.table.record(superclass) else {
            return Ok(());
        };
        let needs_outer = record.needs_outer_param;
        let captured: Vec<VarId> = record.captured_variables().collect();
        let init = self.scopes.body_scope(BodyKey::instance_init(ty))?;

        if needs_outer {
            let ty_scope = self.scopes.type_scope(ty)?;
            let has_context = self
                .outer_level(ty_scope)
                .is_some_and(|(_, has_instance)| has_instance);
            if has_context {
                let outer = self.enclosing_instance_type(superclass)?;
                let path = self.instance_path(init, Target::SubtypeOf(outer), true)?;
                self.table.super_outer.insert(ty, path);
            } else {
                debug!(
                    ty = %self.ctx.type_name(ty),
                    superclass = %self.ctx.type_name(superclass),
                    "no enclosing instance for superclass construction"
                );
            }
        }
        if !captured.is_empty() {
            let args = self.capture_args(captured, init)?;
            self.table.super_captures.insert(ty, args);
        }
        Ok(())
    }
}

impl Visitor for CaptureAnalyzer<'_, '_> {
    fn enter_body(&mut self, body: BodyKey) {
        match self.scopes.body_scope(body) {
            Ok(scope) => self.bodies.push(Some(scope)),
            Err(err) => {
                self.fail(err);
                self.bodies.push(None);
            }
        }
    }

    fn exit_body(&mut self, _body: BodyKey) {
        self.bodies.pop();
    }

    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        if decl.superclass.is_some() {
            self.pending
                .push(PendingSite::SuperConstruction { ty: decl.id });
        }
        walk_type_decl(self, decl);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if self.error.is_some() {
            return;
        }
        if let Some(Some(site)) = self.bodies.last().copied() {
            if let Err(err) = self.resolve_reference(expr, site) {
                self.fail(err);
                return;
            }
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_targets() {
        let outer = PathHop::Outer {
            field: VarId(10),
            from: TypeId(2),
            to: TypeId(1),
        };
        let capture = PathHop::Capture {
            field: VarId(11),
            owner: TypeId(2),
            variable: VarId(3),
        };
        assert_eq!(outer.target(), Some(TypeId(1)));
        assert_eq!(capture.target(), None);
        assert_eq!(AccessPath::new(vec![outer, capture]).first_target(), Some(TypeId(1)));
        assert!(AccessPath::default().is_empty());
    }

    #[test]
    fn test_record_lookup() {
        let mut record = CaptureRecord::new(TypeId(2));
        record.captures.push(CapturedVariable {
            variable: VarId(3),
            field: SyntheticField {
                var: VarId(20),
                name: "val$i".to_string(),
                ty: TypeRef::int(),
                is_weak: false,
            },
        });
        assert!(record.is_captured(VarId(3)));
        assert_eq!(record.inner_field(VarId(3)).unwrap().name, "val$i");
        assert_eq!(record.synthesized_names(), vec!["val$i".to_string()]);
    }
}
