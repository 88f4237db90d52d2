//! Binding provider
//!
//! The translator consumes semantic facts through [`BindingProvider`]: for every
//! handle, where it is declared, its modifiers, and the precomputed override
//! relation. All lookups are pure; a provider is immutable once built and may be
//! shared read-only between translation units.
//!
//! [`UnitBindings`] is a complete provider derived from a tree alone. It stands
//! in for the upstream semantic analyzer in tests and in the CLI.

use crate::ast::*;
use crate::ids::{BodyKey, MethodId, Owner, TypeId, VarId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Facts about a declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBinding {
    pub id: TypeId,
    /// Simple source name (empty for anonymous types)
    pub name: String,
    /// Flattened name, unique in the unit (`Test_Inner`, `Test_1`)
    pub qualified_name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    /// Syntactic parent: a type for members, a body for local/anonymous types
    pub enclosing: Option<Owner>,
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub has_static_initializer: bool,
    /// Declared methods in declaration order
    pub methods: Vec<MethodId>,
    /// Declared fields in declaration order
    pub fields: Vec<VarId>,
}

/// Facts about a method or constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBinding {
    pub id: MethodId,
    pub name: String,
    pub declaring_type: TypeId,
    pub modifiers: Modifiers,
    pub param_types: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub varargs: bool,
    pub is_constructor: bool,
    pub has_body: bool,
    /// Methods this one overrides (transitively up the supertype closure)
    pub overrides: Vec<MethodId>,
    /// Methods overriding this one
    pub overridden_by: Vec<MethodId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    Field,
    Parameter,
    Local,
}

/// Facts about a field, parameter or local
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub id: VarId,
    pub name: String,
    pub kind: VariableKind,
    pub owner: Owner,
    pub ty: TypeRef,
    pub is_static: bool,
    pub is_final: bool,
    /// Non-owning reference; snapshots of it are non-owning too
    #[serde(default)]
    pub is_weak: bool,
}

/// Read-only semantic facts supplied by the front end
pub trait BindingProvider {
    fn type_binding(&self, ty: TypeId) -> Option<&TypeBinding>;

    fn method_binding(&self, method: MethodId) -> Option<&MethodBinding>;

    fn variable_binding(&self, var: VarId) -> Option<&VariableBinding>;

    /// Declaring type or body of a variable
    fn variable_owner(&self, var: VarId) -> Option<Owner> {
        self.variable_binding(var).map(|b| b.owner)
    }

    /// Declaring type of a method
    fn method_owner(&self, method: MethodId) -> Option<TypeId> {
        self.method_binding(method).map(|b| b.declaring_type)
    }

    /// Direct supertypes: superclass first, then interfaces in declaration order
    fn supertypes(&self, ty: TypeId) -> Vec<TypeId> {
        self.type_binding(ty)
            .map(|b| b.superclass.iter().chain(b.interfaces.iter()).copied().collect())
            .unwrap_or_default()
    }

    fn is_private(&self, method: MethodId) -> bool {
        self.method_binding(method)
            .is_some_and(|b| b.modifiers.is_private())
    }

    fn overrides(&self, method: MethodId) -> &[MethodId] {
        self.method_binding(method)
            .map(|b| b.overrides.as_slice())
            .unwrap_or(&[])
    }

    fn overridden_by(&self, method: MethodId) -> &[MethodId] {
        self.method_binding(method)
            .map(|b| b.overridden_by.as_slice())
            .unwrap_or(&[])
    }

    fn is_static_method(&self, method: MethodId) -> bool {
        self.method_binding(method)
            .is_some_and(|b| b.modifiers.is_static)
    }

    fn is_static_variable(&self, var: VarId) -> bool {
        self.variable_binding(var).is_some_and(|b| b.is_static)
    }

    fn has_static_initializer(&self, ty: TypeId) -> bool {
        self.type_binding(ty)
            .is_some_and(|b| b.has_static_initializer)
    }

    /// Flattened type name
    fn type_name(&self, ty: TypeId) -> Option<&str> {
        self.type_binding(ty).map(|b| b.qualified_name.as_str())
    }

    fn type_kind(&self, ty: TypeId) -> Option<TypeKind> {
        self.type_binding(ty).map(|b| b.kind)
    }

    /// Type lexically enclosing `ty`, through a body for local and anonymous types
    fn enclosing_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_binding(ty)?.enclosing? {
            Owner::Type(outer) => Some(outer),
            Owner::Body(BodyKey::Initializer { ty: outer, .. }) => Some(outer),
            Owner::Body(BodyKey::Method(method)) => self.method_owner(method),
        }
    }

    /// Final method, or any method of a final type
    fn is_final(&self, method: MethodId) -> bool {
        self.method_binding(method).is_some_and(|b| {
            b.modifiers.is_final
                || self
                    .type_binding(b.declaring_type)
                    .is_some_and(|t| t.modifiers.is_final)
        })
    }

    fn is_varargs(&self, method: MethodId) -> bool {
        self.method_binding(method).is_some_and(|b| b.varargs)
    }

    fn is_constructor(&self, method: MethodId) -> bool {
        self.method_binding(method).is_some_and(|b| b.is_constructor)
    }

    /// Declared methods of `ty` in declaration order
    fn declared_methods(&self, ty: TypeId) -> &[MethodId] {
        self.type_binding(ty)
            .map(|b| b.methods.as_slice())
            .unwrap_or(&[])
    }
}

/// Errors raised while deriving bindings from a tree
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindingsError {
    #[error("duplicate type id {0}")]
    DuplicateType(TypeId),

    #[error("duplicate method id {0}")]
    DuplicateMethod(MethodId),

    #[error("duplicate variable id {0}")]
    DuplicateVariable(VarId),

    #[error("{what} declared outside of any {expected}")]
    Misplaced {
        what: String,
        expected: &'static str,
    },
}

/// Binding provider built by walking a compilation unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitBindings {
    types: FxHashMap<TypeId, TypeBinding>,
    methods: FxHashMap<MethodId, MethodBinding>,
    variables: FxHashMap<VarId, VariableBinding>,
}

impl UnitBindings {
    /// Derive bindings for every declaration in `unit`
    pub fn collect(unit: &CompilationUnit) -> Result<Self, BindingsError> {
        let mut collector = Collector {
            bindings: UnitBindings::default(),
            frames: Vec::new(),
            anonymous_counters: FxHashMap::default(),
            error: None,
        };
        collector.visit_unit(unit);
        if let Some(err) = collector.error {
            return Err(err);
        }
        let mut bindings = collector.bindings;
        bindings.compute_overrides();
        Ok(bindings)
    }

    /// Transitive supertype closure of `ty`, excluding `ty` itself, in BFS order
    fn supertype_closure(&self, ty: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = self.supertypes(ty);
        let mut i = 0;
        while i < queue.len() {
            let current = queue[i];
            i += 1;
            if current == ty || !seen.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(self.supertypes(current));
        }
        order
    }

    fn compute_overrides(&mut self) {
        let mut edges: Vec<(MethodId, MethodId)> = Vec::new();

        let mut method_ids: Vec<MethodId> = self.methods.keys().copied().collect();
        method_ids.sort();

        for id in method_ids {
            let method = &self.methods[&id];
            if !is_overridable(method) {
                continue;
            }
            for sup in self.supertype_closure(method.declaring_type) {
                let Some(sup_binding) = self.types.get(&sup) else {
                    continue;
                };
                for candidate in &sup_binding.methods {
                    let other = &self.methods[candidate];
                    if is_overridable(other)
                        && other.name == method.name
                        && other.param_types == method.param_types
                    {
                        edges.push((id, *candidate));
                    }
                }
            }
        }

        for (sub, sup) in edges {
            if let Some(m) = self.methods.get_mut(&sub) {
                m.overrides.push(sup);
            }
            if let Some(m) = self.methods.get_mut(&sup) {
                m.overridden_by.push(sub);
            }
        }
    }
}

fn is_overridable(method: &MethodBinding) -> bool {
    !method.is_constructor && !method.modifiers.is_static && !method.modifiers.is_private()
}

impl BindingProvider for UnitBindings {
    fn type_binding(&self, ty: TypeId) -> Option<&TypeBinding> {
        self.types.get(&ty)
    }

    fn method_binding(&self, method: MethodId) -> Option<&MethodBinding> {
        self.methods.get(&method)
    }

    fn variable_binding(&self, var: VarId) -> Option<&VariableBinding> {
        self.variables.get(&var)
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Type(TypeId),
    Body(BodyKey),
}

struct Collector {
    bindings: UnitBindings,
    frames: Vec<Frame>,
    /// Per top-level type counter for naming anonymous classes
    anonymous_counters: FxHashMap<TypeId, u32>,
    error: Option<BindingsError>,
}

impl Collector {
    fn fail(&mut self, err: BindingsError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn current_body(&self) -> Option<BodyKey> {
        match self.frames.last() {
            Some(Frame::Body(body)) => Some(*body),
            _ => None,
        }
    }

    fn innermost_type(&self) -> Option<TypeId> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Type(ty) => Some(*ty),
            Frame::Body(_) => None,
        })
    }

    fn outermost_type(&self) -> Option<TypeId> {
        self.frames.iter().find_map(|f| match f {
            Frame::Type(ty) => Some(*ty),
            Frame::Body(_) => None,
        })
    }

    fn qualified_name(&mut self, decl: &TypeDecl) -> String {
        let outer = self
            .innermost_type()
            .and_then(|ty| self.bindings.types.get(&ty))
            .map(|b| b.qualified_name.clone());
        match (decl.kind, outer) {
            (TypeKind::Anonymous, Some(outer)) if decl.name.is_empty() => {
                let top = self.outermost_type().unwrap_or(decl.id);
                let counter = self.anonymous_counters.entry(top).or_insert(0);
                *counter += 1;
                format!("{}_{}", outer, counter)
            }
            (_, Some(outer)) => format!("{}_{}", outer, decl.name),
            (_, None) => decl.name.clone(),
        }
    }

    fn define_variable(&mut self, binding: VariableBinding) {
        if self.bindings.variables.contains_key(&binding.id) {
            self.fail(BindingsError::DuplicateVariable(binding.id));
            return;
        }
        self.bindings.variables.insert(binding.id, binding);
    }

    fn define_method(&mut self, ty: TypeId, method: &MethodDecl) {
        if self.bindings.methods.contains_key(&method.id) {
            self.fail(BindingsError::DuplicateMethod(method.id));
            return;
        }
        self.bindings.methods.insert(
            method.id,
            MethodBinding {
                id: method.id,
                name: method.name.clone(),
                declaring_type: ty,
                modifiers: method.modifiers,
                param_types: method.params.iter().map(|p| p.ty.clone()).collect(),
                return_type: method.return_type.clone(),
                varargs: method.varargs,
                is_constructor: method.is_constructor,
                has_body: method.body.is_some(),
                overrides: Vec::new(),
                overridden_by: Vec::new(),
            },
        );
    }

    fn with_body(&mut self, body: BodyKey, f: impl FnOnce(&mut Self)) {
        self.frames.push(Frame::Body(body));
        f(self);
        self.frames.pop();
    }
}

impl Visitor for Collector {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        if self.bindings.types.contains_key(&decl.id) {
            self.fail(BindingsError::DuplicateType(decl.id));
            return;
        }

        let enclosing = match self.frames.last() {
            Some(Frame::Type(ty)) => Some(Owner::Type(*ty)),
            Some(Frame::Body(body)) => Some(Owner::Body(*body)),
            None => None,
        };
        let misplaced = match decl.kind {
            TypeKind::TopLevel => enclosing.is_some(),
            TypeKind::Member => !matches!(enclosing, Some(Owner::Type(_))),
            TypeKind::Local | TypeKind::Anonymous => !matches!(enclosing, Some(Owner::Body(_))),
        };
        if misplaced {
            self.fail(BindingsError::Misplaced {
                what: format!("{:?} type '{}'", decl.kind, decl.name),
                expected: match decl.kind {
                    TypeKind::TopLevel => "unit",
                    TypeKind::Member => "type",
                    _ => "body",
                },
            });
            return;
        }

        let qualified_name = self.qualified_name(decl);
        let mut modifiers = decl.modifiers;
        // Types nested in interfaces and nested interfaces are implicitly static
        let in_interface = matches!(enclosing, Some(Owner::Type(outer))
            if self.bindings.types.get(&outer).is_some_and(|b| b.modifiers.is_interface));
        if decl.kind == TypeKind::Member && (in_interface || modifiers.is_interface) {
            modifiers.is_static = true;
        }

        self.bindings.types.insert(
            decl.id,
            TypeBinding {
                id: decl.id,
                name: decl.name.clone(),
                qualified_name,
                kind: decl.kind,
                modifiers,
                enclosing,
                superclass: decl.superclass,
                interfaces: decl.interfaces.clone(),
                has_static_initializer: decl.has_static_initializer(),
                methods: decl.methods.iter().map(|m| m.id).collect(),
                fields: decl.fields.iter().map(|f| f.var).collect(),
            },
        );

        self.frames.push(Frame::Type(decl.id));

        for field in &decl.fields {
            self.define_variable(VariableBinding {
                id: field.var,
                name: field.name.clone(),
                kind: VariableKind::Field,
                owner: Owner::Type(decl.id),
                ty: field.ty.clone(),
                is_static: field.modifiers.is_static,
                is_final: field.modifiers.is_final,
                is_weak: field.is_weak,
            });
            if let Some(init) = &field.initializer {
                let body = BodyKey::Initializer {
                    ty: decl.id,
                    is_static: field.modifiers.is_static,
                };
                self.with_body(body, |this| this.visit_expr(init));
            }
        }

        for init in &decl.initializers {
            let body = BodyKey::Initializer {
                ty: decl.id,
                is_static: init.is_static,
            };
            self.with_body(body, |this| this.visit_block(&init.body));
        }

        for method in &decl.methods {
            self.define_method(decl.id, method);
            self.with_body(BodyKey::Method(method.id), |this| {
                for param in &method.params {
                    this.define_variable(VariableBinding {
                        id: param.var,
                        name: param.name.clone(),
                        kind: VariableKind::Parameter,
                        owner: Owner::Body(BodyKey::Method(method.id)),
                        ty: param.ty.clone(),
                        is_static: false,
                        is_final: param.is_final,
                        is_weak: param.is_weak,
                    });
                }
                if let Some(body) = &method.body {
                    this.visit_block(body);
                }
            });
        }

        for member in &decl.member_types {
            self.visit_type_decl(member);
        }

        self.frames.pop();
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Local(local) = stmt {
            match self.current_body() {
                Some(body) => self.define_variable(VariableBinding {
                    id: local.var,
                    name: local.name.clone(),
                    kind: VariableKind::Local,
                    owner: Owner::Body(body),
                    ty: local.ty.clone(),
                    is_static: false,
                    is_final: local.is_final,
                    is_weak: local.is_weak,
                }),
                None => self.fail(BindingsError::Misplaced {
                    what: format!("local '{}'", local.name),
                    expected: "body",
                }),
            }
        }
        walk_stmt(self, stmt);
    }
}
