use std::fmt;

use super::{FieldContext, Validator};
use crate::error::ValidationError;
use crate::value::Value;

/// Accepts a value if any alternative accepts it. Alternatives are tried in
/// order and the first acceptance wins; the order only decides how failures
/// are reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction {
    alternatives: Vec<Validator>,
}

impl Disjunction {
    pub fn new(alternatives: Vec<Validator>) -> Self {
        Self { alternatives }
    }

    pub fn alternatives(&self) -> &[Validator] {
        &self.alternatives
    }

    pub fn validate(&self, ctx: &FieldContext<'_>, value: &Value) -> Result<(), ValidationError> {
        let mut failures = Vec::new();
        for alternative in &self.alternatives {
            match alternative.validate(ctx, value) {
                Ok(()) => return Ok(()),
                Err(failure) => failures.push(failure),
            }
        }
        match failures.len() {
            0 => Err(ValidationError::EmptyDisjunction { field: ctx.path().to_string() }),
            1 => Err(failures.remove(0)),
            _ => Err(ValidationError::NoAlternativeMatched {
                field: ctx.path().to_string(),
                failures,
            }),
        }
    }
}

impl fmt::Display for Disjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("or_(")?;
        super::write_list(f, &self.alternatives)?;
        f.write_str(")")
    }
}
