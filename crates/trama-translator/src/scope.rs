//! Lexical scope tree
//!
//! An arena of [`Scope`] records built in one traversal of the unit. Types and
//! executable bodies each get a scope; a body's parent is the type declaring
//! it, and a local or anonymous type's parent is the body declaring it. Every
//! type gets its instance and static initializer scopes up front, whether or
//! not it declares initializers, because implicit initialization code (super
//! constructor arguments, capture setup) lives there.

use crate::error::{TranslateError, TranslateResult};
use rustc_hash::FxHashMap;
use trama_ast::ast::*;
use trama_ast::{BindingProvider, BodyKey, Owner, TypeId};

/// Index of a scope in its [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    TopLevelType,
    MemberType,
    LocalType,
    AnonymousType,
    MethodBody,
    ConstructorBody,
    InitializerBody,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Declared type (None for bodies)
    pub declared_type: Option<TypeId>,
    /// Body key (None for types)
    pub body: Option<BodyKey>,
    /// Static member type, or body without a receiver
    pub is_static: bool,
}

impl Scope {
    pub fn is_type(&self) -> bool {
        self.declared_type.is_some()
    }

    pub fn is_body(&self) -> bool {
        self.body.is_some()
    }

    /// Constructor bodies and instance initializers: code that runs while the
    /// instance is being built
    pub fn is_initializing(&self) -> bool {
        match self.kind {
            ScopeKind::ConstructorBody => true,
            ScopeKind::InitializerBody => !self.is_static,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    roots: Vec<ScopeId>,
    type_scopes: FxHashMap<TypeId, ScopeId>,
    body_scopes: FxHashMap<BodyKey, ScopeId>,
}

impl ScopeTree {
    /// Build the tree for `unit`
    ///
    /// Staticness comes from the provider when it knows the declaration (it
    /// normalizes implicit modifiers), otherwise from the tree.
    pub fn build(unit: &CompilationUnit, provider: &dyn BindingProvider) -> Self {
        let mut builder = ScopeBuilder {
            tree: ScopeTree::default(),
            provider,
            types: Vec::new(),
            stack: Vec::new(),
        };
        builder.visit_unit(unit);
        let tree = builder.tree;
        tracing::debug!(
            scopes = tree.len(),
            types = tree.type_scopes.len(),
            bodies = tree.body_scopes.len(),
            "built scope tree"
        );
        tree
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn roots(&self) -> &[ScopeId] {
        &self.roots
    }

    /// Scopes in creation (pre-order) order
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn type_scope(&self, ty: TypeId) -> TranslateResult<ScopeId> {
        self.type_scopes
            .get(&ty)
            .copied()
            .ok_or_else(|| TranslateError::UnknownScope {
                owner: ty.to_string(),
            })
    }

    pub fn body_scope(&self, body: BodyKey) -> TranslateResult<ScopeId> {
        self.body_scopes
            .get(&body)
            .copied()
            .ok_or_else(|| TranslateError::UnknownScope {
                owner: body.to_string(),
            })
    }

    /// Scope declaring whatever the provider reports as owner
    pub fn declaring_scope(&self, owner: Owner) -> TranslateResult<ScopeId> {
        match owner {
            Owner::Type(ty) => self.type_scope(ty),
            Owner::Body(body) => self.body_scope(body),
        }
    }

    /// Nearest type scope at or above `id`
    pub fn enclosing_type_scope(&self, id: ScopeId) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.get(scope_id);
            if scope.is_type() {
                return Some(scope_id);
            }
            current = scope.parent;
        }
        None
    }

    /// Type owning a body scope, or the type a type scope declares
    pub fn type_of(&self, id: ScopeId) -> Option<TypeId> {
        self.enclosing_type_scope(id)
            .and_then(|scope| self.get(scope).declared_type)
    }

    /// Number of type scopes strictly above `id`
    pub fn type_depth(&self, id: ScopeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).parent;
        while let Some(scope_id) = current {
            let scope = self.get(scope_id);
            if scope.is_type() {
                depth += 1;
            }
            current = scope.parent;
        }
        depth
    }

    fn push(&mut self, mut scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        scope.id = id;
        match scope.parent {
            Some(parent) => self.scopes[parent.0 as usize].children.push(id),
            None => self.roots.push(id),
        }
        if let Some(ty) = scope.declared_type {
            self.type_scopes.insert(ty, id);
        }
        if let Some(body) = scope.body {
            self.body_scopes.insert(body, id);
        }
        self.scopes.push(scope);
        id
    }
}

struct ScopeBuilder<'a> {
    tree: ScopeTree,
    provider: &'a dyn BindingProvider,
    /// Types being walked, innermost last
    types: Vec<TypeId>,
    /// Body scopes being walked within the innermost type
    stack: Vec<ScopeId>,
}

impl ScopeBuilder<'_> {
    fn body(&mut self, parent: ScopeId, body: BodyKey, kind: ScopeKind, is_static: bool) {
        self.tree.push(Scope {
            id: ScopeId(0),
            kind,
            parent: Some(parent),
            children: Vec::new(),
            declared_type: None,
            body: Some(body),
            is_static,
        });
    }
}

impl Visitor for ScopeBuilder<'_> {
    fn enter_body(&mut self, body: BodyKey) {
        if let Some(&scope) = self.tree.body_scopes.get(&body) {
            self.stack.push(scope);
        }
    }

    fn exit_body(&mut self, body: BodyKey) {
        if self.tree.body_scopes.contains_key(&body) {
            self.stack.pop();
        }
    }

    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        let kind = match decl.kind {
            TypeKind::TopLevel => ScopeKind::TopLevelType,
            TypeKind::Member => ScopeKind::MemberType,
            TypeKind::Local => ScopeKind::LocalType,
            TypeKind::Anonymous => ScopeKind::AnonymousType,
        };
        let parent = match decl.kind {
            TypeKind::TopLevel => None,
            TypeKind::Member => self
                .types
                .last()
                .and_then(|ty| self.tree.type_scopes.get(ty))
                .copied(),
            TypeKind::Local | TypeKind::Anonymous => self.stack.last().copied(),
        };
        let modifiers = self
            .provider
            .type_binding(decl.id)
            .map(|b| b.modifiers)
            .unwrap_or(decl.modifiers);

        let scope = self.tree.push(Scope {
            id: ScopeId(0),
            kind,
            parent,
            children: Vec::new(),
            declared_type: Some(decl.id),
            body: None,
            is_static: decl.kind == TypeKind::Member && modifiers.is_static,
        });

        self.body(
            scope,
            BodyKey::instance_init(decl.id),
            ScopeKind::InitializerBody,
            false,
        );
        self.body(
            scope,
            BodyKey::static_init(decl.id),
            ScopeKind::InitializerBody,
            true,
        );
        for method in &decl.methods {
            let kind = if method.is_constructor {
                ScopeKind::ConstructorBody
            } else {
                ScopeKind::MethodBody
            };
            let is_static = self
                .provider
                .method_binding(method.id)
                .map(|b| b.modifiers.is_static)
                .unwrap_or(method.modifiers.is_static);
            self.body(scope, BodyKey::Method(method.id), kind, is_static);
        }

        // Member types are nested under this type, never under a body
        let saved = std::mem::take(&mut self.stack);
        self.types.push(decl.id);
        walk_type_decl(self, decl);
        self.types.pop();
        self.stack = saved;
    }
}
