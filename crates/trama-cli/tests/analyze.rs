//! Integration tests for `trama analyze`

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trama_ast::ast::*;
use trama_ast::AstBuilder;
use trama_cli::commands::analyze::{load_options, render, AnalyzeArgs, Emit, DEFAULT_CONFIG};

/// `class Test { private void helper() {} public final void run() { helper(); } }`
fn sample_unit() -> CompilationUnit {
    let mut b = AstBuilder::new();
    let ty = b.type_id();
    let (helper, run) = (b.method_id(), b.method_id());
    let call = b.call(None, helper, vec![]);
    b.unit(
        "Test",
        vec![TypeDecl::new(ty, "Test", TypeKind::TopLevel)
            .method(
                MethodDecl::new(helper, "helper", TypeRef::Void)
                    .with_modifiers(Modifiers::private())
                    .with_body(Block::default()),
            )
            .method(
                MethodDecl::new(run, "run", TypeRef::Void)
                    .with_modifiers(Modifiers::public().with_final())
                    .with_body(Block::new(vec![Stmt::Expr(call)])),
            )],
    )
}

fn write_unit(dir: &Path) -> PathBuf {
    let path = dir.join("unit.json");
    fs::write(&path, serde_json::to_string(&sample_unit()).unwrap()).unwrap();
    path
}

fn args(unit: PathBuf, emit: Emit) -> AnalyzeArgs {
    AnalyzeArgs {
        unit,
        config: None,
        functionize_final_methods: false,
        emit,
    }
}

#[test]
fn test_records_list_functions() {
    let dir = TempDir::new().unwrap();
    let unit = write_unit(dir.path());

    let rendered = render(&args(unit, Emit::Records)).unwrap();
    let output: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    let functions = output["functions"]["records"].as_array().unwrap();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0]["name"], "Test_helper");
    assert_eq!(output["stats"]["direct_calls"], 1);
}

#[test]
fn test_flag_enables_final_methods() {
    let dir = TempDir::new().unwrap();
    let unit = write_unit(dir.path());
    let mut args = args(unit, Emit::Stats);
    args.functionize_final_methods = true;

    let stats: serde_json::Value = serde_json::from_str(&render(&args).unwrap()).unwrap();
    assert_eq!(stats["functions"], 2);
    assert_eq!(stats["wrappers"], 1);
}

#[test]
fn test_config_beside_unit_is_used() {
    let dir = TempDir::new().unwrap();
    let unit = write_unit(dir.path());
    fs::write(
        dir.path().join(DEFAULT_CONFIG),
        "[translator]\nfunctionize_final_methods = true\n",
    )
    .unwrap();

    let options = load_options(&args(unit, Emit::Tree)).unwrap();
    assert!(options.functionize_final_methods);
}

#[test]
fn test_tree_output_decodes_as_unit() {
    let dir = TempDir::new().unwrap();
    let unit = write_unit(dir.path());

    let rendered = render(&args(unit, Emit::Tree)).unwrap();
    let tree: CompilationUnit = serde_json::from_str(&rendered).unwrap();
    assert_eq!(tree.functions.len(), 1);
    assert_eq!(tree.types[0].methods.len(), 1);
}

#[test]
fn test_malformed_unit_is_reported() {
    let dir = TempDir::new().unwrap();
    let unit = dir.path().join("broken.json");
    fs::write(&unit, "{ not json").unwrap();

    let err = render(&args(unit, Emit::Records)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse unit file"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let unit = write_unit(dir.path());
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[translator]\nfunctionize_final_methods = \"yes\"\n").unwrap();

    let mut args = args(unit, Emit::Records);
    args.config = Some(config);
    let err = render(&args).unwrap_err();
    assert!(err.to_string().contains("Invalid config"));
}
