//! JSON exchange format of compilation units

use trama_ast::ast::*;
use trama_ast::{BindingProvider, MethodId, TypeId, UnitBindings, VarId};

const UNIT: &str = r#"{
    "name": "Test",
    "types": [{
        "id": 1,
        "name": "Test",
        "kind": "TopLevel",
        "fields": [{ "var": 1, "name": "i", "ty": { "Primitive": "int" } }],
        "methods": [{
            "id": 1,
            "name": "get",
            "modifiers": { "visibility": "Private" },
            "return_type": { "Primitive": "int" },
            "body": { "stmts": [{ "Return": { "id": 1, "kind": { "Name": 1 } } }] }
        }],
        "member_types": [{
            "id": 2,
            "name": "Inner",
            "kind": "Member",
            "modifiers": { "is_static": true }
        }]
    }]
}"#;

#[test]
fn test_minimal_unit_decodes_with_defaults() {
    let unit: CompilationUnit = serde_json::from_str(UNIT).unwrap();

    assert!(unit.functions.is_empty());
    let test = &unit.types[0];
    assert_eq!(test.superclass, None);
    assert!(test.initializers.is_empty());
    assert!(test.super_capture_args.is_empty());

    let get = &test.methods[0];
    assert!(get.modifiers.is_private());
    assert!(!get.is_constructor);
    assert!(!get.varargs);
    assert!(get.params.is_empty());
}

#[test]
fn test_decoded_unit_binds() {
    let unit: CompilationUnit = serde_json::from_str(UNIT).unwrap();
    let bindings = UnitBindings::collect(&unit).unwrap();

    assert_eq!(bindings.type_name(TypeId(2)), Some("Test_Inner"));
    assert_eq!(bindings.enclosing_type(TypeId(2)), Some(TypeId(1)));
    assert!(bindings.is_private(MethodId(1)));
    assert_eq!(
        bindings.variable_binding(VarId(1)).map(|v| v.name.as_str()),
        Some("i")
    );
}

#[test]
fn test_encoding_is_stable() {
    let unit: CompilationUnit = serde_json::from_str(UNIT).unwrap();
    let encoded = serde_json::to_string(&unit).unwrap();
    let decoded: CompilationUnit = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, unit);
    assert_eq!(serde_json::to_string(&decoded).unwrap(), encoded);
}
