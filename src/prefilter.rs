//! jq pre-filter applied to each input document before it is decoded.

use anyhow::{anyhow, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Filter, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// A jq program compiled once and run against every document.
pub struct Prefilter {
    filter: Filter<Native<Val>>,
}

impl Prefilter {
    pub fn compile(filter_src: &str) -> Result<Self> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let program = load::File { code: filter_src, path: () };

        let modules = loader.load(&arena, program).map_err(format_parse_errors)?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(format_undefined_errors)?;
        Ok(Self { filter })
    }

    /// Every output of the program becomes one document.
    pub fn apply(&self, input: &Value) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        let outputs = self
            .filter
            .run((Ctx::new([], &inputs), Val::from(input.clone())))
            .map(|item| item.map(Value::from).map_err(|e| anyhow!("jq runtime error: {e:?}")))
            .collect::<Result<Vec<_>>>();
        outputs
    }
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("parse error: {err:?} in `{}`", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn format_undefined_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter().map(move |(name, undef)| {
                format!("undefined `{name}`: {undef:?} in `{}`", file.code)
            })
        })
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn each_output_is_a_document() {
        let prefilter = Prefilter::compile(".items[]").unwrap();
        let docs = prefilter.apply(&json!({"items": [{"a": 1}, {"a": null}]})).unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!({"a": null})]);
        // compiled once, reusable
        assert_eq!(prefilter.apply(&json!({"items": []})).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn values_keep_their_kind() {
        let prefilter = Prefilter::compile("{t: {\"$tuple\": [.x, .y]}}").unwrap();
        let docs = prefilter.apply(&json!({"x": 1, "y": "s"})).unwrap();
        assert_eq!(docs, vec![json!({"t": {"$tuple": [1, "s"]}})]);
    }

    #[test]
    fn bad_filters_are_errors() {
        assert!(Prefilter::compile(".[").is_err());
        assert!(Prefilter::compile("no_such_fn").is_err());
        let prefilter = Prefilter::compile("error(\"boom\")").unwrap();
        assert!(prefilter.apply(&json!(null)).is_err());
    }
}
