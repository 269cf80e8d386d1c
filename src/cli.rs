//! Minimal CLI: check documents against a schema class, or explain the
//! validator compiled for a type expression.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::catalog::Catalog;
use crate::compile::compile;
use crate::prefilter::Prefilter;
use crate::schema::Model;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against type-validated classes declared in a schema document
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log attachment and compilation at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode each document as an instance of a class and report failures
    Check(CheckOut),
    /// print the validator compiled for each type expression
    Explain(ExplainOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema document declaring enums, aliases and classes
    #[arg(long, short)]
    schema: PathBuf,

    /// class every document is decoded as
    #[arg(long, short)]
    class: String,
}

#[derive(clap::Parser, Debug)]
struct ExplainOut {
    /// schema document providing user enums, aliases and classes
    #[arg(long, short)]
    schema: Option<PathBuf>,

    /// type expressions, e.g. 'Dict[str, Optional[float]]'
    #[arg(required = true)]
    types: Vec<String>,
}

/// One document pulled from the inputs, labelled by where it came from.
struct Document {
    label: String,
    value: serde_json::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(Document)) -> Result<()> {
        let source_paths =
            expand_inputs(&self.input).context("failed to resolve input file paths")?;
        let prefilter = self
            .jq_expr
            .as_deref()
            .map(Prefilter::compile)
            .transpose()
            .context("invalid jq expression")?;
        for source_path in source_paths {
            let (label, source) = read_source(&source_path)?;
            let documents: Vec<(String, serde_json::Value)> = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| {
                        let label = format!("{label}:{}", i + 1);
                        let value = serde_json::from_str(line)
                            .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                        Ok((label, value))
                    })
                    .collect::<Result<_>>()?
            } else {
                let value = serde_json::from_str(&source)
                    .with_context(|| format!("failed to parse JSON source file ({label})"))?;
                vec![(label, value)]
            };

            for (label, value) in documents {
                let value = self.select(&label, value)?;
                match prefilter.as_ref() {
                    None => apply(Document { label, value }),
                    Some(prefilter) => {
                        let outputs = prefilter
                            .apply(&value)
                            .with_context(|| format!("failed to apply jq expression ({label})"))?;
                        for (i, value) in outputs.into_iter().enumerate() {
                            apply(Document { label: format!("{label}#{i}"), value });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn select(&self, label: &str, value: serde_json::Value) -> Result<serde_json::Value> {
        let Some(pointer) = self.json_pointer.as_ref() else {
            return Ok(value);
        };
        value
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {label}"))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns whether every document passed.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let model = Model::load_path(&target.schema)
                    .with_context(|| format!("failed to load schema {}", target.schema.display()))?;
                model.class(&target.class)?;

                let (mut passed, mut failed) = (0usize, 0usize);
                target.input_settings.load_process(|doc| {
                    match model.instantiate(&target.class, &doc.value) {
                        Ok(instance) => {
                            passed += 1;
                            let shown = instance.to_string();
                            println!("{} {} {}", "ok".green().bold(), doc.label, shown.dimmed());
                        }
                        Err(error) => {
                            failed += 1;
                            println!("{} {} {}", "FAIL".red().bold(), doc.label, error);
                        }
                    }
                })?;

                let summary = format!("{passed} passed, {failed} failed");
                if failed == 0 {
                    eprintln!("{}", summary.green());
                } else {
                    eprintln!("{}", summary.red());
                }
                Ok(failed == 0)
            }
            Command::Explain(target) => {
                let catalog = match target.schema.as_ref() {
                    Some(path) => {
                        Model::load_path(path)
                            .with_context(|| format!("failed to load schema {}", path.display()))?
                            .catalog
                    }
                    None => Catalog::new(),
                };
                for src in &target.types {
                    let ty = catalog
                        .parse(src)
                        .with_context(|| format!("invalid type expression `{src}`"))?;
                    match compile(&ty) {
                        Some(validator) => println!("{} {validator}", format!("{ty}:").bold()),
                        None => println!("{} {}", format!("{ty}:").bold(), "no validator".yellow()),
                    }
                }
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> Result<(String, String)> {
    if path.as_os_str() == "-" {
        let source = std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?;
        return Ok(("<stdin>".to_string(), source));
    }
    let label = path.to_string_lossy().to_string();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file ({label})"))?;
    Ok((label, source))
}

/// Literal paths and `-` pass through; a glob pattern must match at least
/// one file.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[', '{']) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let matches = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern {pattern}"))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read a match of {pattern}"))?;
        if matches.is_empty() {
            bail!("glob pattern matched no files: {pattern}");
        }
        out.extend(matches);
    }
    Ok(out)
}
