//! Conformance runner: every `*.json` case in a directory names a schema, an
//! expression and the expected outcome (type, error kind or JSON Schema).
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use udm_schema::ast::Expr;
use udm_schema::diff::diff_json;
use udm_schema::export::RenderedDocument;
use udm_schema::import::SchemaKind;
use udm_schema::{
    FunctionRegistry, ParsedSchema, SchemaFormat, build_type_environment, generate_schema, infer_expression_type,
};

#[derive(Parser, Debug)]
struct Settings {
    /// directory holding the case files
    #[arg(long, default_value = "conformance")]
    dir: PathBuf,

    /// only run cases whose name matches this regex
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Case {
    name: String,
    schema: CaseSchema,
    expression: Expr,
    expected: Expected,
    /// Skip the case; the text says why.
    #[serde(default)]
    known_issue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaseSchema {
    format: SchemaKind,
    document: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Expected {
    /// Display form of the inferred type.
    #[serde(default, rename = "type")]
    type_text: Option<String>,
    /// Error kind, e.g. `TypeMismatch`.
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    json_schema: Option<Value>,
}

enum Outcome {
    Pass,
    Skip(String),
    Fail(String),
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    match run(&settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> anyhow::Result<bool> {
    let filter = settings.filter.as_deref().map(Regex::new).transpose()?;
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&settings.dir)
        .with_context(|| format!("failed to list {}", settings.dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let (mut passed, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for path in &paths {
        let case = load_case(path)?;
        if filter.as_ref().is_some_and(|re| !re.is_match(&case.name)) {
            continue;
        }
        match run_case(&case) {
            Outcome::Pass => {
                passed += 1;
                println!("{} {}", "✓".green(), case.name);
            }
            Outcome::Skip(reason) => {
                skipped += 1;
                println!("{} {} ({reason})", "⚠".yellow(), case.name);
            }
            Outcome::Fail(reason) => {
                failed += 1;
                println!("{} {}: {reason}", "✗".red(), case.name);
            }
        }
    }
    println!("\n{passed} passed, {failed} failed, {skipped} skipped");
    Ok(failed == 0)
}

fn load_case(path: &Path) -> anyhow::Result<Case> {
    let source = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize(de).map_err(|error| {
        anyhow::anyhow!("{}: invalid case at {}: {}", path.display(), error.path(), error.inner())
    })
}

fn run_case(case: &Case) -> Outcome {
    if let Some(reason) = &case.known_issue {
        return Outcome::Skip(reason.clone());
    }
    let env = match ParsedSchema::from_json_value(case.schema.format, &case.schema.document)
        .and_then(|schema| build_type_environment(&schema))
    {
        Ok(env) => env,
        Err(error) => return Outcome::Fail(format!("schema import failed: {error}")),
    };
    let inferred = infer_expression_type(&case.expression, &env, FunctionRegistry::standard());

    let expected = &case.expected;
    let ty = match (inferred, &expected.error) {
        (Err(error), Some(kind)) if error.kind() == kind => return Outcome::Pass,
        (Err(error), _) => return Outcome::Fail(format!("{} {error}", error.kind())),
        (Ok(ty), Some(kind)) => return Outcome::Fail(format!("expected {kind}, inferred {ty}")),
        (Ok(ty), None) => ty,
    };
    if let Some(text) = &expected.type_text {
        if ty.to_string() != *text {
            return Outcome::Fail(format!("expected type {text}, inferred {ty}"));
        }
    }
    if let Some(schema) = &expected.json_schema {
        let rendered = match generate_schema(&ty, SchemaFormat::JsonSchema) {
            Ok(rendered) => rendered,
            Err(error) => return Outcome::Fail(error.to_string()),
        };
        let RenderedDocument::Json(actual) = &rendered.document else {
            return Outcome::Fail("JSON Schema export produced XML".into());
        };
        let differences = diff_json(schema, actual);
        if let Some(first) = differences.first() {
            return Outcome::Fail(format!("{} schema difference(s), first: {first}", differences.len()));
        }
    }
    Outcome::Pass
}
