//! `trama analyze`: translate one serialized unit and print the result.

use anyhow::Context;
use clap::ValueEnum;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use trama_ast::ast::CompilationUnit;
use trama_translator::{
    CallGraph, CaptureTable, EligibilityTable, FunctionTable, TranslationOutput, TranslationStats,
    Translator, TranslatorOptions,
};

/// Config file picked up next to the unit when `--config` is absent
pub const DEFAULT_CONFIG: &str = "trama.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Emit {
    /// Capture, call graph, eligibility and function records
    #[default]
    Records,
    /// The rewritten unit
    Tree,
    /// Translation counters
    Stats,
}

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub unit: PathBuf,
    pub config: Option<PathBuf>,
    pub functionize_final_methods: bool,
    pub emit: Emit,
}

#[derive(Serialize)]
struct Records<'a> {
    captures: &'a CaptureTable,
    call_graph: &'a CallGraph,
    eligibility: &'a EligibilityTable,
    functions: &'a FunctionTable,
    stats: &'a TranslationStats,
}

pub fn execute(args: AnalyzeArgs) -> anyhow::Result<()> {
    let rendered = render(&args)?;
    println!("{}", rendered);
    Ok(())
}

/// Run the translation and serialize the requested view as pretty JSON
pub fn render(args: &AnalyzeArgs) -> anyhow::Result<String> {
    let options = load_options(args)?;
    let unit = load_unit(&args.unit)?;
    let name = unit.name.clone();

    let output = Translator::new(options)
        .translate_unit(unit)
        .with_context(|| format!("Failed to translate unit '{}'", name))?;
    tracing::info!(unit = %name, functions = output.stats.functions, "translated");

    emit(&output, args.emit)
}

fn emit(output: &TranslationOutput, emit: Emit) -> anyhow::Result<String> {
    let json = match emit {
        Emit::Records => serde_json::to_string_pretty(&Records {
            captures: &output.captures,
            call_graph: &output.call_graph,
            eligibility: &output.eligibility,
            functions: &output.functions,
            stats: &output.stats,
        }),
        Emit::Tree => serde_json::to_string_pretty(&output.unit),
        Emit::Stats => serde_json::to_string_pretty(&output.stats),
    };
    json.context("Failed to serialize output")
}

pub fn load_unit(path: &Path) -> anyhow::Result<CompilationUnit> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read unit file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse unit file: {}", path.display()))
}

/// Options from `--config` (or a `trama.toml` beside the unit), with the
/// command-line switch taking precedence
pub fn load_options(args: &AnalyzeArgs) -> anyhow::Result<TranslatorOptions> {
    let config = match &args.config {
        Some(path) => Some(path.clone()),
        None => args
            .unit
            .parent()
            .map(|dir| dir.join(DEFAULT_CONFIG))
            .filter(|path| path.is_file()),
    };

    let mut options = match config {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            TranslatorOptions::from_toml_str(&content)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => TranslatorOptions::default(),
    };
    if args.functionize_final_methods {
        options = options.with_functionize_final_methods(true);
    }
    tracing::debug!(?options, "translator options");
    Ok(options)
}
