use std::fmt;

use super::{FieldContext, Validator};
use crate::error::ValidationError;
use crate::types::RuntimeType;
use crate::value::Value;

/// Checks a fixed-length tuple position by position. A `None` position is
/// left unchecked.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleValidator {
    positions: Vec<Option<Validator>>,
}

impl TupleValidator {
    pub fn new(positions: Vec<Option<Validator>>) -> Self {
        Self { positions }
    }

    pub fn arity(&self) -> usize {
        self.positions.len()
    }

    pub fn validate(&self, ctx: &FieldContext<'_>, value: &Value) -> Result<(), ValidationError> {
        let Value::Tuple(items) = value else {
            return Err(ValidationError::Type {
                field: ctx.path().to_string(),
                expected: RuntimeType::Tuple.to_string(),
                actual: value.type_name(),
                got: value.to_string(),
            });
        };
        if items.len() != self.positions.len() {
            return Err(ValidationError::TupleLength {
                field: ctx.path().to_string(),
                expected: self.positions.len(),
                actual: items.len(),
                got: value.to_string(),
            });
        }
        for (i, (item, position)) in items.iter().zip(&self.positions).enumerate() {
            if let Some(validator) = position {
                validator.validate(&ctx.item(i), item)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TupleValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tuple_of(")?;
        for (i, position) in self.positions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match position {
                Some(v) => write!(f, "{v}")?,
                None => f.write_str("any")?,
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{instance_of, optional, tuple_of};

    fn pair() -> Validator {
        tuple_of([instance_of(RuntimeType::Float), optional(instance_of(RuntimeType::Int))])
    }

    fn check(value: &Value) -> Result<(), ValidationError> {
        pair().validate(&FieldContext::new("X", "t"), value)
    }

    #[test]
    fn accepts_matching_positions() {
        assert!(check(&Value::tuple([Value::float(1.0), Value::None])).is_ok());
        assert!(check(&Value::tuple([Value::float(1.0), Value::Int(2)])).is_ok());
    }

    #[test]
    fn first_failing_position_is_reported() {
        let err = check(&Value::tuple([Value::str("x"), Value::None])).unwrap_err();
        assert_eq!(err.field(), "t[0]");
        let err = check(&Value::tuple([Value::float(1.0), Value::str("y")])).unwrap_err();
        assert_eq!(err.field(), "t[1]");
    }

    #[test]
    fn rejects_non_tuples_and_wrong_lengths() {
        let err = check(&Value::list([Value::float(1.0), Value::None])).unwrap_err();
        assert!(matches!(err, ValidationError::Type { ref expected, .. } if expected == "tuple"));

        let err = check(&Value::tuple([Value::float(1.0)])).unwrap_err();
        assert!(matches!(err, ValidationError::TupleLength { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn unchecked_positions_accept_anything() {
        let positions = vec![None, Some(instance_of(RuntimeType::Int))];
        let v = Validator::Tuple(TupleValidator::new(positions));
        let ctx = FieldContext::new("X", "t");
        assert!(v.validate(&ctx, &Value::tuple([Value::str("anything"), Value::Int(1)])).is_ok());
        assert_eq!(v.to_string(), "tuple_of(any, instance_of(int))");
    }
}
