//! Validator combinators.
//!
//! A `Validator` is an immutable tree. Leaves check one property of a value
//! (runtime type, membership, regex, length, or a user callback); inner nodes
//! combine children (`and`, `optional`, disjunction, tuple positions,
//! element-wise and key/value-wise delegation). Trees compare structurally
//! and render as the combinator expression that built them.
pub mod disjunction;
pub mod tuple;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ValidationError;
use crate::types::RuntimeType;
use crate::value::Value;

pub use disjunction::Disjunction;
pub use tuple::TupleValidator;

// ————————————————————————————————————————————————————————————————————————————
// FIELD CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// Which field (or element of a field) a validator is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext<'a> {
    class: &'a str,
    path: Cow<'a, str>,
}

impl<'a> FieldContext<'a> {
    pub fn new(class: &'a str, field: &'a str) -> Self {
        Self { class, path: Cow::Borrowed(field) }
    }

    pub fn class(&self) -> &str {
        self.class
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Context for position `index` of a sequence or tuple.
    pub fn item(&self, index: usize) -> FieldContext<'a> {
        FieldContext { class: self.class, path: Cow::Owned(format!("{}[{index}]", self.path)) }
    }

    /// Context for the entry under `key` of a mapping.
    pub fn key(&self, key: &Value) -> FieldContext<'a> {
        FieldContext { class: self.class, path: Cow::Owned(format!("{}[{key}]", self.path)) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATOR TREE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    InstanceOf(RuntimeType),
    /// Accepts `None`, otherwise delegates.
    Optional(Box<Validator>),
    /// All children must accept, checked in order.
    And(Vec<Validator>),
    Or(Disjunction),
    Tuple(TupleValidator),
    DeepIterable {
        member: Box<Validator>,
        iterable: Box<Validator>,
    },
    /// An absent key or value validator leaves that side unchecked.
    DeepMapping {
        key: Option<Box<Validator>>,
        value: Option<Box<Validator>>,
        mapping: Box<Validator>,
    },
    In(Vec<Value>),
    MatchesRe(Pattern),
    MinLen(usize),
    MaxLen(usize),
    Custom(Custom),
}

pub fn instance_of(ty: RuntimeType) -> Validator {
    Validator::InstanceOf(ty)
}

pub fn optional(inner: Validator) -> Validator {
    Validator::Optional(Box::new(inner))
}

/// Conjunction of `validators`; a single validator stands for itself and
/// nested conjunctions are flattened. `None` if there is nothing to combine.
pub fn and(validators: impl IntoIterator<Item = Validator>) -> Option<Validator> {
    let mut flat = Vec::new();
    for validator in validators {
        match validator {
            Validator::And(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(Validator::And(flat)),
    }
}

/// Short-circuit disjunction over `alternatives`, in order.
pub fn or(alternatives: impl IntoIterator<Item = Validator>) -> Validator {
    Validator::Or(Disjunction::new(alternatives.into_iter().collect()))
}

pub fn tuple_of(positions: impl IntoIterator<Item = Validator>) -> Validator {
    Validator::Tuple(TupleValidator::new(positions.into_iter().map(Some).collect()))
}

pub fn deep_iterable(member: Validator, iterable: Validator) -> Validator {
    Validator::DeepIterable { member: Box::new(member), iterable: Box::new(iterable) }
}

pub fn deep_mapping(key: Validator, value: Validator, mapping: Validator) -> Validator {
    Validator::DeepMapping {
        key: Some(Box::new(key)),
        value: Some(Box::new(value)),
        mapping: Box::new(mapping),
    }
}

pub fn in_(options: impl IntoIterator<Item = Value>) -> Validator {
    Validator::In(options.into_iter().collect())
}

/// Full-match regex check on string values.
pub fn matches_re(pattern: &str) -> Result<Validator, regex::Error> {
    Ok(Validator::MatchesRe(Pattern::new(pattern)?))
}

pub fn min_len(bound: usize) -> Validator {
    Validator::MinLen(bound)
}

pub fn max_len(bound: usize) -> Validator {
    Validator::MaxLen(bound)
}

/// A named user callback; the `Err` string becomes the failure message.
pub fn custom<F>(name: impl Into<String>, check: F) -> Validator
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
{
    Validator::Custom(Custom { name: name.into(), check: Arc::new(check) })
}

impl Validator {
    pub fn validate(&self, ctx: &FieldContext<'_>, value: &Value) -> Result<(), ValidationError> {
        match self {
            Self::InstanceOf(ty) => {
                if value.is_instance(ty) {
                    Ok(())
                } else {
                    Err(ValidationError::Type {
                        field: ctx.path().to_string(),
                        expected: ty.to_string(),
                        actual: value.type_name(),
                        got: value.to_string(),
                    })
                }
            }
            Self::Optional(inner) => match value {
                Value::None => Ok(()),
                _ => inner.validate(ctx, value),
            },
            Self::And(validators) => validators.iter().try_for_each(|v| v.validate(ctx, value)),
            Self::Or(disjunction) => disjunction.validate(ctx, value),
            Self::Tuple(tuple) => tuple.validate(ctx, value),
            Self::DeepIterable { member, iterable } => {
                iterable.validate(ctx, value)?;
                for (i, element) in value.elements().unwrap_or_default().iter().enumerate() {
                    member.validate(&ctx.item(i), element)?;
                }
                Ok(())
            }
            Self::DeepMapping { key, value: value_validator, mapping } => {
                mapping.validate(ctx, value)?;
                for (k, v) in value.entries().unwrap_or_default() {
                    let entry_ctx = ctx.key(k);
                    if let Some(key) = key {
                        key.validate(&entry_ctx, k)?;
                    }
                    if let Some(value_validator) = value_validator {
                        value_validator.validate(&entry_ctx, v)?;
                    }
                }
                Ok(())
            }
            Self::In(options) => {
                if options.contains(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotIn {
                        field: ctx.path().to_string(),
                        options: Value::List(options.clone()).to_string(),
                        got: value.to_string(),
                    })
                }
            }
            Self::MatchesRe(pattern) => match value {
                Value::Str(s) if pattern.full_match(s) => Ok(()),
                Value::Str(_) => Err(ValidationError::PatternMismatch {
                    field: ctx.path().to_string(),
                    pattern: pattern.as_str().to_string(),
                    got: value.to_string(),
                }),
                _ => Err(ValidationError::Type {
                    field: ctx.path().to_string(),
                    expected: RuntimeType::Str.to_string(),
                    actual: value.type_name(),
                    got: value.to_string(),
                }),
            },
            Self::MinLen(bound) => check_len(ctx, value, "at least", *bound, |len| len >= *bound),
            Self::MaxLen(bound) => check_len(ctx, value, "at most", *bound, |len| len <= *bound),
            Self::Custom(custom) => (custom.check)(value).map_err(|message| {
                ValidationError::Custom {
                    field: ctx.path().to_string(),
                    validator: custom.name.clone(),
                    message,
                }
            }),
        }
    }
}

fn check_len(
    ctx: &FieldContext<'_>,
    value: &Value,
    relation: &'static str,
    bound: usize,
    ok: impl Fn(usize) -> bool,
) -> Result<(), ValidationError> {
    let Some(actual) = value.len() else {
        return Err(ValidationError::Type {
            field: ctx.path().to_string(),
            expected: "a sized value".to_string(),
            actual: value.type_name(),
            got: value.to_string(),
        });
    };
    if ok(actual) {
        Ok(())
    } else {
        Err(ValidationError::Length { field: ctx.path().to_string(), relation, bound, actual })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LEAF PAYLOADS
// ————————————————————————————————————————————————————————————————————————————

/// A compiled regex, anchored at both ends.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self { source: source.to_string(), anchored })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn full_match(&self, s: &str) -> bool {
        self.anchored.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

type CheckFn = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

#[derive(Clone)]
pub struct Custom {
    name: String,
    check: Arc<CheckFn>,
}

impl Custom {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Two callbacks are the same validator only if they share the closure.
impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.check, &other.check)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

pub(crate) fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_slot(f: &mut fmt::Formatter<'_>, slot: &Option<Box<Validator>>) -> fmt::Result {
    match slot {
        Some(v) => write!(f, "{v}"),
        None => f.write_str("any"),
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstanceOf(ty) => write!(f, "instance_of({ty})"),
            Self::Optional(inner) => write!(f, "optional({inner})"),
            Self::And(vs) => {
                f.write_str("and_(")?;
                write_list(f, vs)?;
                f.write_str(")")
            }
            Self::Or(disjunction) => write!(f, "{disjunction}"),
            Self::Tuple(tuple) => write!(f, "{tuple}"),
            Self::DeepIterable { member, iterable } => {
                write!(f, "deep_iterable({member}, {iterable})")
            }
            Self::DeepMapping { key, value, mapping } => {
                f.write_str("deep_mapping(")?;
                write_slot(f, key)?;
                f.write_str(", ")?;
                write_slot(f, value)?;
                write!(f, ", {mapping})")
            }
            Self::In(options) => {
                f.write_str("in_([")?;
                write_list(f, options)?;
                f.write_str("])")
            }
            Self::MatchesRe(pattern) => write!(f, "matches_re({:?})", pattern.as_str()),
            Self::MinLen(bound) => write!(f, "min_len({bound})"),
            Self::MaxLen(bound) => write!(f, "max_len({bound})"),
            Self::Custom(custom) => write!(f, "custom({})", custom.name),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn check(v: &Validator, value: &Value) -> Result<(), ValidationError> {
        v.validate(&FieldContext::new("X", "a"), value)
    }

    #[test]
    fn instance_of_reports_expected_and_actual() {
        let err = check(&instance_of(RuntimeType::Int), &Value::float(5.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Type {
                field: "a".into(),
                expected: "int".into(),
                actual: "float".into(),
                got: "5.0".into(),
            }
        );
        assert_eq!(err.to_string(), "'a' must be int (got 5.0 that is a float).");
    }

    #[test]
    fn optional_accepts_none_and_delegates() {
        let v = optional(instance_of(RuntimeType::Int));
        assert!(check(&v, &Value::None).is_ok());
        assert!(check(&v, &Value::Int(5)).is_ok());
        assert!(check(&v, &Value::float(5.0)).is_err());
    }

    #[test]
    fn and_flattens_and_collapses() {
        let a = instance_of(RuntimeType::Int);
        let b = min_len(1);
        assert_eq!(and([a.clone()]), Some(a.clone()));
        assert_eq!(and(Vec::new()), None);
        let ab = and([a.clone(), b.clone()]).unwrap();
        let abc = and([ab, max_len(3)]).unwrap();
        assert_eq!(abc, Validator::And(vec![a, b, max_len(3)]));
    }

    #[test]
    fn deep_iterable_checks_container_first_then_elements() {
        let v = deep_iterable(instance_of(RuntimeType::Float), instance_of(RuntimeType::Sequence));
        assert!(check(&v, &Value::list([Value::float(2.2)])).is_ok());
        assert!(check(&v, &Value::list([])).is_ok());

        let err = check(&v, &Value::list([Value::float(1.0), Value::Int(2)])).unwrap_err();
        assert_eq!(err.field(), "a[1]");

        let err = check(&v, &Value::Int(3)).unwrap_err();
        assert_eq!(err.field(), "a");
    }

    #[test]
    fn deep_mapping_checks_keys_and_values() {
        let v = deep_mapping(
            instance_of(RuntimeType::Int),
            optional(instance_of(RuntimeType::Float)),
            instance_of(RuntimeType::Dict),
        );
        let ok = Value::dict([(Value::Int(1), Value::float(2.2)), (Value::Int(2), Value::None)]);
        assert!(check(&v, &ok).is_ok());

        let bad_value = Value::dict([(Value::Int(1), Value::str("x"))]);
        assert_eq!(check(&v, &bad_value).unwrap_err().field(), "a[1]");

        let bad_key = Value::dict([(Value::str("k"), Value::float(1.0))]);
        assert!(matches!(
            check(&v, &bad_key),
            Err(ValidationError::Type { expected, .. }) if expected == "int"
        ));
    }

    #[test]
    fn membership_regex_and_length() {
        let v = in_([Value::str("a"), Value::str("b")]);
        assert!(check(&v, &Value::str("a")).is_ok());
        assert!(matches!(check(&v, &Value::str("c")), Err(ValidationError::NotIn { .. })));

        let re = matches_re("h.*").unwrap();
        assert!(check(&re, &Value::str("hi")).is_ok());
        assert!(matches!(
            check(&re, &Value::str("oh hi")),
            Err(ValidationError::PatternMismatch { .. })
        ));
        assert!(matches!(check(&re, &Value::Int(1)), Err(ValidationError::Type { .. })));
        assert!(matches_re("(").is_err());

        assert!(check(&min_len(2), &Value::str("ab")).is_ok());
        assert!(check(&max_len(1), &Value::list([Value::None, Value::None])).is_err());
        assert!(matches!(check(&min_len(1), &Value::Int(1)), Err(ValidationError::Type { .. })));
    }

    #[test]
    fn custom_validators_compare_by_identity() {
        let positive = custom("positive", |v| match v {
            Value::Int(i) if *i > 0 => Ok(()),
            _ => Err("must be positive".to_string()),
        });
        assert_eq!(positive, positive.clone());
        let other = custom("positive", |_| Ok(()));
        assert_ne!(positive, other);

        let err = check(&positive, &Value::Int(-1)).unwrap_err();
        assert_eq!(err.to_string(), "'a' rejected by positive: must be positive");
    }

    #[test]
    fn display_renders_combinator_expression() {
        let v = deep_mapping(
            instance_of(RuntimeType::Int),
            optional(instance_of(RuntimeType::Float)),
            instance_of(RuntimeType::Dict),
        );
        assert_eq!(
            v.to_string(),
            "deep_mapping(instance_of(int), optional(instance_of(float)), instance_of(dict))"
        );
    }
}
