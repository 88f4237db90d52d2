//! Hand-built units shared by the integration tests
#![allow(dead_code)]

use rustc_hash::FxHashSet;
use trama_ast::ast::*;
use trama_ast::{AstBuilder, MethodId, NodeId, TypeId, VarId};

/// `class Test { int i; class Inner { void test() { i++; } } }`
pub struct InnerIncrement {
    pub unit: CompilationUnit,
    pub test: TypeId,
    pub inner: TypeId,
    pub field: VarId,
    /// The `i` operand of the increment
    pub read: NodeId,
}

pub fn inner_increment() -> InnerIncrement {
    inner_increment_with(|inner, _| inner)
}

/// [`inner_increment`] with extra declarations on `Inner`
pub fn inner_increment_with(
    inner_extra: impl FnOnce(TypeDecl, &mut AstBuilder) -> TypeDecl,
) -> InnerIncrement {
    let mut b = AstBuilder::new();
    let (test, inner) = (b.type_id(), b.type_id());
    let (field, method) = (b.var_id(), b.method_id());
    let read = b.name(field);
    let read_id = read.id;
    let increment = b.post_inc(read);
    let inner_decl = TypeDecl::new(inner, "Inner", TypeKind::Member).method(
        MethodDecl::new(method, "test", TypeRef::Void)
            .with_body(Block::new(vec![Stmt::Expr(increment)])),
    );
    let inner_decl = inner_extra(inner_decl, &mut b);

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .field(FieldDecl::new(field, "i", TypeRef::int()))
            .member(inner_decl)],
    );
    InnerIncrement {
        unit,
        test,
        inner,
        field,
        read: read_id,
    }
}

/// ```text
/// class Test {
///     void test(final int i) {
///         Runnable r = new Runnable() { public void run() { int j = i + 1; } };
///     }
/// }
/// ```
pub struct AnonymousCapture {
    pub unit: CompilationUnit,
    pub anonymous: TypeId,
    pub param: VarId,
    /// The `i` operand of `i + 1`
    pub read: NodeId,
    /// The `new Runnable() { ... }` expression
    pub creation: NodeId,
}

pub fn anonymous_capture() -> AnonymousCapture {
    anonymous_capture_with(|param| param, |anonymous, _| anonymous)
}

/// [`anonymous_capture`] with the parameter `i` and the anonymous type adjusted
pub fn anonymous_capture_with(
    param_of: impl FnOnce(Param) -> Param,
    anonymous_extra: impl FnOnce(TypeDecl, &mut AstBuilder) -> TypeDecl,
) -> AnonymousCapture {
    let mut b = AstBuilder::new();
    let (test, runnable, anonymous) = (b.type_id(), b.type_id(), b.type_id());
    let (run_decl, test_method, run_impl) = (b.method_id(), b.method_id(), b.method_id());
    let (param, r, j) = (b.var_id(), b.var_id(), b.var_id());

    let read = b.name(param);
    let read_id = read.id;
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    let body = Block::new(vec![b.local(j, "j", TypeRef::int(), Some(sum))]);

    let anonymous_decl = TypeDecl::new(anonymous, "", TypeKind::Anonymous)
        .implements(runnable)
        .method(
            MethodDecl::new(run_impl, "run", TypeRef::Void)
                .with_modifiers(Modifiers::public())
                .with_body(body),
        );
    let anonymous_decl = anonymous_extra(anonymous_decl, &mut b);
    let creation = b.new_anonymous(anonymous_decl, vec![]);
    let creation_id = creation.id;
    let local = b.local(r, "r", TypeRef::Class(runnable), Some(creation));

    let unit = b.unit(
        "Test",
        vec![
            TypeDecl::new(runnable, "Runnable", TypeKind::TopLevel)
                .with_modifiers(Modifiers {
                    is_interface: true,
                    ..Modifiers::public()
                })
                .method(
                    MethodDecl::new(run_decl, "run", TypeRef::Void)
                        .with_modifiers(Modifiers::public().with_abstract()),
                ),
            TypeDecl::new(test, "Test", TypeKind::TopLevel).method(
                MethodDecl::new(test_method, "test", TypeRef::Void)
                    .param(param_of(Param::new(param, "i", TypeRef::int()).with_final()))
                    .with_body(Block::new(vec![local])),
            ),
        ],
    );
    AnonymousCapture {
        unit,
        anonymous,
        param,
        read: read_id,
        creation: creation_id,
    }
}

/// ```text
/// class Test {
///     private String str() { return "str"; }
///     public String test() { return str(); }
/// }
/// ```
pub struct PrivateCall {
    pub unit: CompilationUnit,
    pub test: TypeId,
    pub str_method: MethodId,
    pub caller: MethodId,
    pub call: NodeId,
}

pub fn private_call() -> PrivateCall {
    let mut b = AstBuilder::new();
    let test = b.type_id();
    let (str_method, caller) = (b.method_id(), b.method_id());
    let text = b.string("str");
    let call = b.call(None, str_method, vec![]);
    let call_id = call.id;

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .method(
                MethodDecl::new(str_method, "str", TypeRef::named("String"))
                    .with_modifiers(Modifiers::private())
                    .with_body(Block::new(vec![Stmt::ret(Some(text))])),
            )
            .method(
                MethodDecl::new(caller, "test", TypeRef::named("String"))
                    .with_modifiers(Modifiers::public())
                    .with_body(Block::new(vec![Stmt::ret(Some(call))])),
            )],
    );
    PrivateCall {
        unit,
        test,
        str_method,
        caller,
        call: call_id,
    }
}

/// ```text
/// class Test {
///     static { }
///     private static String str(String msg, Class cls) { return msg; }
/// }
/// ```
pub struct StaticWithInitializer {
    pub unit: CompilationUnit,
    pub test: TypeId,
    pub str_method: MethodId,
}

pub fn static_with_initializer() -> StaticWithInitializer {
    let mut b = AstBuilder::new();
    let test = b.type_id();
    let str_method = b.method_id();
    let (msg, cls) = (b.var_id(), b.var_id());
    let value = b.name(msg);

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .initializer(Initializer {
                is_static: true,
                body: Block::default(),
            })
            .method(
                MethodDecl::new(str_method, "str", TypeRef::named("String"))
                    .with_modifiers(Modifiers::private().with_static())
                    .param(Param::new(msg, "msg", TypeRef::named("String")))
                    .param(Param::new(cls, "cls", TypeRef::named("Class")))
                    .with_body(Block::new(vec![Stmt::ret(Some(value))])),
            )],
    );
    StaticWithInitializer {
        unit,
        test,
        str_method,
    }
}

/// ```text
/// class Test {
///     int i;
///     void m() {
///         class A { int get() { return i; } }
///         class B extends A { }
///         new B();
///     }
/// }
/// ```
pub struct LocalInheritance {
    pub unit: CompilationUnit,
    pub test: TypeId,
    pub a: TypeId,
    pub b: TypeId,
    pub creation: NodeId,
}

pub fn local_inheritance() -> LocalInheritance {
    let mut b = AstBuilder::new();
    let (test, a, sub) = (b.type_id(), b.type_id(), b.type_id());
    let (m, get) = (b.method_id(), b.method_id());
    let field = b.var_id();
    let read = b.name(field);
    let creation = b.new_object(sub, vec![]);
    let creation_id = creation.id;

    let class_a = TypeDecl::new(a, "A", TypeKind::Local).method(
        MethodDecl::new(get, "get", TypeRef::int()).with_body(Block::new(vec![Stmt::ret(Some(read))])),
    );
    let class_b = TypeDecl::new(sub, "B", TypeKind::Local).extends(a);

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .field(FieldDecl::new(field, "i", TypeRef::int()))
            .method(MethodDecl::new(m, "m", TypeRef::Void).with_body(Block::new(vec![
                Stmt::LocalType(Box::new(class_a)),
                Stmt::LocalType(Box::new(class_b)),
                Stmt::Expr(creation),
            ])))],
    );
    LocalInheritance {
        unit,
        test,
        a,
        b: sub,
        creation: creation_id,
    }
}

/// ```text
/// class Test {
///     class Base { void run() { } }
///     class Middle extends Base {
///         class Deep { void go() { run(); } }
///     }
/// }
/// ```
pub struct InheritedMember {
    pub unit: CompilationUnit,
    pub base: TypeId,
    pub middle: TypeId,
    pub deep: TypeId,
    pub call: NodeId,
}

pub fn inherited_member() -> InheritedMember {
    let mut b = AstBuilder::new();
    let (test, base, middle, deep) = (b.type_id(), b.type_id(), b.type_id(), b.type_id());
    let (run, go) = (b.method_id(), b.method_id());
    let call = b.call(None, run, vec![]);
    let call_id = call.id;

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .member(
                TypeDecl::new(base, "Base", TypeKind::Member)
                    .method(MethodDecl::new(run, "run", TypeRef::Void).with_body(Block::default())),
            )
            .member(
                TypeDecl::new(middle, "Middle", TypeKind::Member)
                    .extends(base)
                    .member(
                        TypeDecl::new(deep, "Deep", TypeKind::Member).method(
                            MethodDecl::new(go, "go", TypeRef::Void)
                                .with_body(Block::new(vec![Stmt::Expr(call)])),
                        ),
                    ),
            )],
    );
    InheritedMember {
        unit,
        base,
        middle,
        deep,
        call: call_id,
    }
}

/// ```text
/// class Test {
///     int i;
///     static void m(final int x) {
///         class L { int get() { return x; } }
///         class M { int f() { return new L().get(); } }
///     }
/// }
/// ```
pub struct StaticLocals {
    pub unit: CompilationUnit,
    pub l: TypeId,
    pub m: TypeId,
    pub x: VarId,
}

pub fn static_locals() -> StaticLocals {
    let mut b = AstBuilder::new();
    let (test, l, m_ty) = (b.type_id(), b.type_id(), b.type_id());
    let (m, get, f) = (b.method_id(), b.method_id(), b.method_id());
    let (field, x) = (b.var_id(), b.var_id());

    let read = b.name(x);
    let created = b.new_object(l, vec![]);
    let call = b.call(Some(created), get, vec![]);

    let class_l = TypeDecl::new(l, "L", TypeKind::Local).method(
        MethodDecl::new(get, "get", TypeRef::int()).with_body(Block::new(vec![Stmt::ret(Some(read))])),
    );
    let class_m = TypeDecl::new(m_ty, "M", TypeKind::Local).method(
        MethodDecl::new(f, "f", TypeRef::int()).with_body(Block::new(vec![Stmt::ret(Some(call))])),
    );

    let unit = b.unit(
        "Test",
        vec![TypeDecl::new(test, "Test", TypeKind::TopLevel)
            .field(FieldDecl::new(field, "i", TypeRef::int()))
            .method(
                MethodDecl::new(m, "m", TypeRef::Void)
                    .with_modifiers(Modifiers::default().with_static())
                    .param(Param::new(x, "x", TypeRef::int()))
                    .with_body(Block::new(vec![
                        Stmt::LocalType(Box::new(class_l)),
                        Stmt::LocalType(Box::new(class_m)),
                    ])),
            )],
    );
    StaticLocals {
        unit,
        l,
        m: m_ty,
        x,
    }
}

/// Methods still declared on some type of `unit`
pub fn declared_methods(unit: &CompilationUnit) -> FxHashSet<MethodId> {
    #[derive(Default)]
    struct Collect(FxHashSet<MethodId>);

    impl Visitor for Collect {
        fn visit_method_decl(&mut self, method: &MethodDecl) {
            self.0.insert(method.id);
            walk_method_decl(self, method);
        }
    }

    let mut collect = Collect::default();
    collect.visit_unit(unit);
    collect.0
}

/// Declared method `id` in `unit`, searching member types
pub fn method(unit: &CompilationUnit, id: MethodId) -> &MethodDecl {
    fn search(decl: &TypeDecl, id: MethodId) -> Option<&MethodDecl> {
        decl.find_method(id)
            .or_else(|| decl.member_types.iter().find_map(|member| search(member, id)))
    }
    unit.types
        .iter()
        .find_map(|decl| search(decl, id))
        .expect("method is not declared")
}

/// Value of the leading `return` in `block`
pub fn returned(block: &Block) -> &Expr {
    match block.stmts.first() {
        Some(Stmt::Return(Some(value))) => value,
        other => panic!("expected return, got {:?}", other),
    }
}

/// Every `Locked` region anywhere in `block`
pub fn locked_regions(block: &Block) -> usize {
    #[derive(Default)]
    struct Count(usize);

    impl Visitor for Count {
        fn visit_stmt(&mut self, stmt: &Stmt) {
            if matches!(stmt, Stmt::Locked { .. }) {
                self.0 += 1;
            }
            walk_stmt(self, stmt);
        }
    }

    let mut count = Count::default();
    count.visit_block(block);
    count.0
}
