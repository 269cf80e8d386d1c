//! End-to-end scenarios against the library: a schema document, a list of
//! instance documents, and whether each must be accepted.
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use type_validate::{compile, define, field, Catalog, ClassDef, EnumDef, Model, Value};

const SCHEMA: &str = r#"{
    "enums": { "Answer": { "YES": 1, "NO": 2, "MAYBE": 3 } },
    "aliases": { "Scores": "Dict[str, Optional[float]]" },
    "classes": {
        "X": {
            "frozen": true,
            "fields": {
                "a": "Optional[int]",
                "b": "Sequence[float]",
                "c": { "type": "str", "default": "hi" }
            }
        },
        "EnumHaver": { "fields": { "a": "Answer" } },
        "Report": {
            "fields": {
                "scores": "Scores",
                "pair": "Tuple[int, str]",
                "tags": { "type": "FrozenSet[str]", "default": { "$frozenset": [] } },
                "either": { "type": "Union[int, List[X]]", "default": 0 }
            }
        }
    }
}"#;

const SCENARIOS: &str = r#"[
    { "class": "X", "expect": true,  "doc": { "a": 1, "b": [2.2], "c": "hi" } },
    { "class": "X", "expect": true,  "doc": { "a": null, "b": [2.2], "c": "hi" } },
    { "class": "X", "expect": false, "doc": { "a": 1, "b": [2], "c": "hi" } },
    { "class": "X", "expect": false, "doc": { "a": 1, "b": [2], "c": 4 } },
    { "class": "X", "expect": true,  "doc": { "a": 1, "b": { "$tuple": [] } } },
    { "class": "EnumHaver", "expect": true,  "doc": { "a": { "$enum": "Answer.YES" } } },
    { "class": "EnumHaver", "expect": true,  "doc": { "a": { "$enum": "Answer.MAYBE" } } },
    { "class": "EnumHaver", "expect": false, "doc": { "a": 1 } },
    { "class": "Report", "expect": true,  "doc": { "scores": { "x": 1.5, "y": null }, "pair": { "$tuple": [1, "a"] } } },
    { "class": "Report", "expect": false, "doc": { "scores": { "x": 1 }, "pair": { "$tuple": [1, "a"] } } },
    { "class": "Report", "expect": false, "doc": { "scores": {}, "pair": { "$tuple": [1, "a", 2] } } },
    { "class": "Report", "expect": false, "doc": { "scores": {}, "pair": [1, "a"] } },
    { "class": "Report", "expect": true,  "doc": { "scores": {}, "pair": { "$tuple": [1, "a"] },
                                                   "either": [{ "$class": "X", "a": null, "b": [] }] } },
    { "class": "Report", "expect": false, "doc": { "scores": {}, "pair": { "$tuple": [1, "a"] }, "either": "no" } },
    { "class": "Report", "expect": false, "doc": { "scores": {}, "pair": { "$tuple": [1, "a"] },
                                                   "tags": { "$set": ["a"] } } }
]"#;

#[derive(Debug, Deserialize)]
struct Scenario {
    class: String,
    expect: bool,
    doc: serde_json::Value,
}

fn run_schema_scenarios() -> Result<usize> {
    let model = Model::load_str(SCHEMA).context("loading schema")?;
    let scenarios: Vec<Scenario> = {
        let de = &mut serde_json::Deserializer::from_str(SCENARIOS);
        serde_path_to_error::deserialize(de).context("loading scenarios")?
    };

    let mut mismatches = 0;
    for (i, scenario) in scenarios.iter().enumerate() {
        let result = model.instantiate(&scenario.class, &scenario.doc);
        let label = format!("#{i} {} {}", scenario.class, scenario.doc);
        match (&result, scenario.expect) {
            (Ok(_), true) | (Err(_), false) => {
                let detail = result.as_ref().err().map(|e| e.to_string()).unwrap_or_default();
                eprintln!("{} {label} {}", "✅".green(), detail.dimmed());
            }
            (Ok(instance), false) => {
                mismatches += 1;
                eprintln!("{} {label} accepted as {instance}", "❌".red());
            }
            (Err(error), true) => {
                mismatches += 1;
                eprintln!("{} {label} rejected: {error}", "❌".red());
            }
        }
    }
    Ok(mismatches)
}

/// The same class built in code, with the rendered validators checked.
fn run_builder_scenarios() -> Result<usize> {
    let catalog = Catalog::new().with_enum(EnumDef::new("Answer", [("YES", 1), ("NO", 2)]));
    let def = ClassDef::new("X")
        .field("a", catalog.parse("Optional[int]")?, field())
        .field("b", catalog.parse("Sequence[float]")?, field())
        .field("c", catalog.parse("str")?, field().with_default("hi"));
    let x = define(def)?;

    let expected = [
        ("a", "optional(instance_of(int))"),
        ("b", "deep_iterable(instance_of(float), instance_of(collections.abc.Sequence))"),
        ("c", "instance_of(str)"),
    ];
    let mut mismatches = 0;
    for (name, rendered) in expected {
        let actual = x.field(name).and_then(|f| f.validator()).map(ToString::to_string);
        if actual.as_deref() != Some(rendered) {
            mismatches += 1;
            eprintln!("{} X.{name}: expected {rendered}, got {actual:?}", "❌".red());
        }
    }

    for src in ["Callable[[int], str]", "Optional[Callable[[], int]]"] {
        if let Some(v) = compile(&catalog.parse(src)?) {
            mismatches += 1;
            eprintln!("{} {src} should have no validator, got {v}", "❌".red());
        }
    }

    if x.call([Value::Int(1), Value::list([Value::Int(2)])]).is_ok() {
        mismatches += 1;
        eprintln!("{} X(1, [2]) was accepted", "❌".red());
    }
    Ok(mismatches)
}

fn main() -> ExitCode {
    let outcome = run_schema_scenarios().and_then(|a| Ok(a + run_builder_scenarios()?));
    match outcome {
        Ok(0) => {
            eprintln!("{}", "all scenarios passed".green());
            ExitCode::SUCCESS
        }
        Ok(n) => {
            eprintln!("{}", format!("{n} scenario(s) failed").red());
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red());
            ExitCode::FAILURE
        }
    }
}
