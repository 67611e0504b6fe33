//! Host CLI: schema → environment → inferred output type → schema
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use crate::ast::Expr;
use crate::diff::diff_documents;
use crate::env::TypeEnvironment;
use crate::error::TypeInferenceError;
use crate::export::{ExportOptions, RenderedDocument, SchemaFormat, generate_schema_with, xsd};
use crate::import::{ParsedSchema, SchemaKind, build_type_environment};
use crate::infer::infer_expression_type;
use crate::path_de;
use crate::registry::FunctionRegistry;
use crate::types::UdmType;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// type-check UDM transformations against an input schema and derive the output schema
#[derive(Parser, Debug)]
#[command(name = "udm-schema")]
pub struct CommandLineInterface {
    /// debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// infer one transformation and print its output schema
    Analyze(AnalyzeOut),
    /// type-check one or more transformations
    Check(CheckOut),
    /// print the type environment built from a schema
    Types(TypesOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// input schema document (JSON form)
    #[arg(long, short)]
    schema: PathBuf,

    /// schema notation; guessed from the file extension if omitted
    #[arg(long, value_enum)]
    schema_format: Option<SchemaKind>,
}

#[derive(clap::Parser, Debug)]
struct AnalyzeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// transformation AST document (JSON)
    #[arg(long, short)]
    transform: PathBuf,

    /// output schema notation
    #[arg(long, short, value_enum, default_value_t = SchemaFormat::JsonSchema)]
    format: SchemaFormat,

    /// top-level element name for XSD output
    #[arg(long, default_value = xsd::DEFAULT_ROOT_NAME)]
    root_name: String,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// fail unless the generated schema matches this one
    #[arg(long)]
    expected: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// One or more transformation documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    transform: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load_environment(&self) -> anyhow::Result<TypeEnvironment<'static>> {
        let kind = self.schema_format.unwrap_or_else(|| SchemaKind::from_path(&self.schema));
        let path = self.schema.display();
        let source = fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file {path}"))?;
        let parsed = ParsedSchema::from_json_str(kind, &source)
            .with_context(|| format!("failed to load {kind:?} schema {path}"))?;
        let env = build_type_environment(&parsed)
            .with_context(|| format!("failed to import schema {path}"))?;
        Ok(env)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Log to stderr. `RUST_LOG` wins over `--verbose`.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let default_level = if self.verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("failed to initialize tracing")
    }

    /// `Ok(false)` means a type error or schema mismatch was reported.
    pub fn run(&self) -> anyhow::Result<bool> {
        let registry = FunctionRegistry::standard();
        match &self.cmd {
            Command::Analyze(target) => {
                // 1) import
                let env = target.schema_settings.load_environment()?;
                let expr = load_transform(&target.transform)?;

                // 2) infer
                let ty = match infer_expression_type(&expr, &env, registry) {
                    Ok(ty) => ty,
                    Err(error) => {
                        eprintln!("{}", format_type_error(&target.transform, &error).red());
                        return Ok(false);
                    }
                };
                debug!(transform = %target.transform.display(), %ty, "inferred");

                // 3) generate
                let options = ExportOptions { root_name: target.root_name.clone() };
                let rendered = generate_schema_with(&ty, target.format, &options)?;
                for warning in &rendered.warnings {
                    eprintln!("{} {warning}", "warning:".yellow());
                }
                write_output(target.out.as_deref(), &rendered.to_text())?;

                // 4) compare
                if let Some(expected_path) = target.expected.as_ref() {
                    let expected = load_expected(expected_path, target.format)?;
                    let differences = diff_documents(&expected, &rendered.document);
                    if !differences.is_empty() {
                        let header = format!("Schema mismatch against {}", expected_path.display());
                        eprintln!("{}", header.red());
                        for difference in &differences {
                            eprintln!("  {difference}");
                        }
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Command::Check(target) => {
                let env = target.schema_settings.load_environment()?;
                let transform_paths = resolve_file_path_patterns(&target.transform)?;
                let outcomes: Vec<(PathBuf, anyhow::Result<Result<UdmType, TypeInferenceError>>)> = transform_paths
                    .into_par_iter()
                    .map(|path| {
                        let outcome = load_transform(&path).map(|expr| infer_expression_type(&expr, &env, registry));
                        (path, outcome)
                    })
                    .collect();
                let mut all_ok = true;
                for (path, outcome) in outcomes {
                    match outcome? {
                        Ok(ty) => println!("{} {}: {ty}", "ok".green(), path.display()),
                        Err(error) => {
                            all_ok = false;
                            eprintln!("{}", format_type_error(&path, &error).red());
                        }
                    }
                }
                Ok(all_ok)
            }
            Command::Types(target) => {
                let env = target.schema_settings.load_environment()?;
                let mut bindings: Vec<(&str, &UdmType)> = env.bindings().collect();
                bindings.sort_by_key(|(path, _)| *path);
                for (path, ty) in bindings {
                    println!("{path}: {ty}");
                }
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_transform(path: &Path) -> anyhow::Result<Expr> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read transformation file {}", path.display()))?;
    let expr = path_de::from_slice_with_path(&bytes)
        .with_context(|| format!("failed to parse transformation file {}", path.display()))?;
    Ok(expr)
}

fn load_expected(path: &Path, format: SchemaFormat) -> anyhow::Result<RenderedDocument> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read expected schema {}", path.display()))?;
    match format {
        SchemaFormat::JsonSchema => {
            let value = path_de::from_str_with_path(&source)
                .with_context(|| format!("failed to parse expected schema {}", path.display()))?;
            Ok(RenderedDocument::Json(value))
        }
        SchemaFormat::Xsd => Ok(RenderedDocument::Xml(source)),
    }
}

fn write_output(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// `Type Error at <file>:<line>:<col>: <message>`; the file defaults to the
/// transformation being checked.
fn format_type_error(transform: &Path, error: &TypeInferenceError) -> String {
    let location = error.location();
    let file = location
        .and_then(|loc| loc.file.clone())
        .unwrap_or_else(|| transform.display().to_string());
    match location {
        Some(loc) => format!("Type Error at {file}:{}:{}: {error}", loc.line, loc.column),
        None => format!("Type Error in {file}: {error}"),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceLocation;

    #[test]
    fn type_errors_name_the_transform() {
        let error = TypeInferenceError::UnknownPath {
            path: "input.missing".into(),
            location: Some(SourceLocation::new(5, 12)),
        };
        assert_eq!(
            format_type_error(Path::new("t.json"), &error),
            "Type Error at t.json:5:12: unknown path 'input.missing'"
        );
        let error = TypeInferenceError::UnknownFunction {
            name: "nope".into(),
            location: Some(SourceLocation::new(1, 1).in_file("order.udm")),
        };
        assert!(format_type_error(Path::new("t.json"), &error).starts_with("Type Error at order.udm:1:1:"));
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn parses_analyze_flags() {
        let cli = CommandLineInterface::try_parse_from([
            "udm-schema", "analyze", "--schema", "order.xsd.json", "--transform", "t.json", "--format", "xsd",
        ])
        .unwrap();
        let Command::Analyze(target) = &cli.cmd else { panic!("expected analyze") };
        assert_eq!(target.format, SchemaFormat::Xsd);
        assert_eq!(target.root_name, "root");
        assert!(target.schema_settings.schema_format.is_none());
        assert!(
            CommandLineInterface::try_parse_from([
                "udm-schema", "analyze", "--schema", "s.json", "--transform", "t.json", "--no-op",
            ])
            .is_err()
        );
    }
}
