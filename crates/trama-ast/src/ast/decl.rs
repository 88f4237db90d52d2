//! Declaration nodes
//!
//! Compilation units, types, members and the global functions produced by
//! functionization.

use super::{Block, Expr};
use crate::ids::{MethodId, TypeId, VarId};
use serde::{Deserialize, Serialize};

/// One translation job: a set of top-level types plus generated functions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Unit name (usually the source file stem)
    pub name: String,

    /// Top-level type declarations, in source order
    pub types: Vec<TypeDecl>,

    /// Global functions generated by functionization (empty before translation)
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

impl CompilationUnit {
    /// Create an empty unit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Find a function generated for `method`
    pub fn function(&self, method: MethodId) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.method == method)
    }
}

/// Syntactic category of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Declared at unit level
    TopLevel,
    /// Declared as a member of another type
    Member,
    /// Declared as a statement inside a body
    Local,
    /// Declared by an instance creation expression with a body
    Anonymous,
}

/// Visibility modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Accessible only inside the declaring top-level type
    Private,
    /// Accessible inside the package (no modifier)
    #[default]
    Package,
    /// Accessible to subclasses and the package
    Protected,
    /// Accessible from anywhere
    Public,
}

/// Member and type modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_synchronized: bool,
    /// Only meaningful on types
    pub is_interface: bool,
}

impl Modifiers {
    pub fn private() -> Self {
        Self {
            visibility: Visibility::Private,
            ..Self::default()
        }
    }

    pub fn public() -> Self {
        Self {
            visibility: Visibility::Public,
            ..Self::default()
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_synchronized(mut self) -> Self {
        self.is_synchronized = true;
        self
    }

    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}

/// Static type reference in declarations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Void,
    /// Primitive value type (`int`, `boolean`, ...)
    Primitive(String),
    /// Type declared in this unit
    Class(TypeId),
    /// Type declared outside this unit (`String`, `Object`, ...)
    Named(String),
    /// Fixed-size sequence of elements
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn int() -> Self {
        TypeRef::Primitive("int".to_string())
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    /// Element type if this is an array
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

/// Class, interface, local or anonymous class declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: TypeId,
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub superclass: Option<TypeId>,
    #[serde(default)]
    pub interfaces: Vec<TypeId>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub initializers: Vec<Initializer>,
    #[serde(default)]
    pub member_types: Vec<TypeDecl>,

    /// Enclosing instance passed to the superclass constructor (filled by translation)
    #[serde(default)]
    pub super_outer: Option<Expr>,

    /// Captured values passed to the superclass constructor (filled by translation)
    #[serde(default)]
    pub super_capture_args: Vec<Expr>,
}

impl TypeDecl {
    pub fn new(id: TypeId, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            modifiers: Modifiers::default(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializers: Vec::new(),
            member_types: Vec::new(),
            super_outer: None,
            super_capture_args: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn extends(mut self, superclass: TypeId) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn initializer(mut self, init: Initializer) -> Self {
        self.initializers.push(init);
        self
    }

    pub fn member(mut self, ty: TypeDecl) -> Self {
        self.member_types.push(ty);
        self
    }

    /// Look up a declared method
    pub fn find_method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.id == id)
    }

    /// Whether any static field initializer or static initializer block exists
    pub fn has_static_initializer(&self) -> bool {
        self.initializers.iter().any(|init| init.is_static)
            || self
                .fields
                .iter()
                .any(|f| f.modifiers.is_static && f.initializer.is_some())
    }
}

/// Field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub var: VarId,
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub initializer: Option<Expr>,
    /// Holds a non-owning reference
    #[serde(default)]
    pub is_weak: bool,
}

impl FieldDecl {
    pub fn new(var: VarId, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            var,
            name: name.into(),
            ty,
            modifiers: Modifiers::default(),
            initializer: None,
            is_weak: false,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_initializer(mut self, init: Expr) -> Self {
        self.initializer = Some(init);
        self
    }

    pub fn with_weak(mut self) -> Self {
        self.is_weak = true;
        self
    }
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub var: VarId,
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub is_final: bool,
    /// Annotated as a non-owning reference
    #[serde(default)]
    pub is_weak: bool,
}

impl Param {
    pub fn new(var: VarId, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            var,
            name: name.into(),
            ty,
            is_final: false,
            is_weak: false,
        }
    }

    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_weak(mut self) -> Self {
        self.is_weak = true;
        self
    }
}

/// Method or constructor declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub id: MethodId,
    pub name: String,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: TypeRef,

    /// Last parameter is variadic; its declared type is the array type
    #[serde(default)]
    pub varargs: bool,

    #[serde(default)]
    pub is_constructor: bool,

    /// None for abstract and interface methods
    #[serde(default)]
    pub body: Option<Block>,
}

impl MethodDecl {
    pub fn new(id: MethodId, name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            id,
            name: name.into(),
            modifiers: Modifiers::default(),
            params: Vec::new(),
            return_type,
            varargs: false,
            is_constructor: false,
            body: None,
        }
    }

    pub fn constructor(id: MethodId, name: impl Into<String>) -> Self {
        Self {
            is_constructor: true,
            ..Self::new(id, name, TypeRef::Void)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn variadic(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }
}

/// Initializer block (`{ ... }` or `static { ... }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Block,
}

/// Parameter of a generated global function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub var: VarId,
    pub name: String,
    pub ty: TypeRef,
}

/// Global function produced from a method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Method this function implements
    pub method: MethodId,
    /// Type that declared the method
    pub declaring_type: TypeId,
    /// Mangled global name
    pub name: String,
    /// Receiver first (absent for static methods), then declared parameters
    pub params: Vec<FunctionParam>,
    pub return_type: TypeRef,
    pub body: Block,
}
