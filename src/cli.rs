//! Minimal CLI: check JSON documents against a schema definition file,
//! or debug-print the tree for one type expression.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::engine::{Schema, SchemaDef, SchemaOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against a compact string-based type grammar
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate input documents against a schema definition file
    Check(CheckArgs),
    /// parse one type expression and print its tree
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// schema definition file: JSON map of field name → type expression
    #[arg(long, short)]
    schema: PathBuf,

    /// one or more inputs; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// reject input keys not declared in the schema
    #[arg(long)]
    strict: bool,

    /// pass undeclared input keys through into the output
    #[arg(long)]
    allow_unknown: bool,

    /// coerce types (numeric strings, "true"/"false") before checking
    #[arg(long)]
    loose: bool,

    /// use the tree interpreter instead of precompiled validators
    #[arg(long)]
    no_optimize: bool,

    /// print the accepted (possibly coerced) data for passing documents
    #[arg(long)]
    print_data: bool,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// type expression, e.g. "when role === admin *? number(1,10) : any?"
    expr: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Check(args) => run_check(args),
            Command::Parse(args) => run_parse(args),
        }
    }
}

fn run_check(args: &CheckArgs) -> Result<()> {
    let def = load_schema_def(&args.schema)?;
    let options = SchemaOptions {
        strict: args.strict,
        allow_unknown: args.allow_unknown,
        loose: args.loose,
        skip_optimization: args.no_optimize,
    };
    let schema = Schema::compile(&def, options)
        .with_context(|| format!("invalid schema definition in {}", args.schema.display()))?;

    let mut failed = 0usize;
    for path in resolve_file_path_patterns(&args.input)? {
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&source)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;

        let report = schema.validate(&value);
        if report.success {
            println!("{} {}", "✓".green(), path.display());
            if args.print_data {
                if let Some(data) = &report.data {
                    println!("{}", serde_json::to_string_pretty(data)?);
                }
            }
        } else {
            failed += 1;
            println!("{} {}", "✗".red(), path.display());
            for error in &report.errors {
                println!("  {}", error.to_string().yellow());
            }
        }
    }

    if failed > 0 {
        Err(anyhow!("{failed} document(s) failed validation"))
    } else {
        Ok(())
    }
}

fn run_parse(args: &ParseArgs) -> Result<()> {
    match crate::parse::parse(&args.expr) {
        Ok(node) => {
            println!("{node:#?}");
            Ok(())
        }
        Err(err) => {
            // Point at the offending position in the expression itself.
            eprintln!("{}", args.expr);
            eprintln!("{}^", " ".repeat(err.position));
            Err(anyhow!(err))
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Deserialize the schema definition with JSON-path context in errors.
fn load_schema_def(path: &PathBuf) -> Result<SchemaDef> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&source);
    serde_path_to_error::deserialize::<_, SchemaDef>(de).map_err(|err| {
        let json_path = err.path().to_string();
        anyhow!(
            "bad schema definition {} at JSON path {json_path}: {}",
            path.display(),
            err.into_inner()
        )
    })
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
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
                // Explicit glob matching nothing is an error, not a no-op.
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
