//! Annotation-to-validator compiler.

use tracing::trace;

use crate::classify::{classify, Shape};
use crate::types::TypeExpr;
use crate::validators::{self, TupleValidator, Validator};

/// Derives the runtime validator for `ty`, or `None` when the annotation
/// carries no checkable runtime meaning.
///
/// An `Optional` or `Union` with an unsupported alternative yields no
/// validator at all. Unsupported element, key, value or position types
/// leave only that slot unchecked.
pub fn compile(ty: &TypeExpr) -> Option<Validator> {
    let validator = match classify(ty) {
        Shape::Alias(target) => return compile(target),
        Shape::Optional(inner) => validators::optional(compile(inner)?),
        Shape::Union(alternatives) => {
            let mut compiled = alternatives.iter().map(compile).collect::<Option<Vec<_>>>()?;
            if compiled.len() == 1 {
                compiled.remove(0)
            } else {
                validators::or(compiled)
            }
        }
        Shape::Sequence { container, element } => {
            let outer = validators::instance_of(container);
            match element.and_then(compile) {
                Some(member) => validators::deep_iterable(member, outer),
                None => outer,
            }
        }
        Shape::Tuple(positions) => {
            Validator::Tuple(TupleValidator::new(positions.iter().map(compile).collect()))
        }
        Shape::Mapping { container, entry } => {
            let outer = validators::instance_of(container);
            match entry.map(|(k, v)| (compile(k), compile(v))) {
                None | Some((None, None)) => outer,
                Some((key, value)) => Validator::DeepMapping {
                    key: key.map(Box::new),
                    value: value.map(Box::new),
                    mapping: Box::new(outer),
                },
            }
        }
        Shape::Plain(runtime) => validators::instance_of(runtime.clone()),
        Shape::Unsupported => {
            trace!(%ty, "no validator for unsupported annotation");
            return None;
        }
    };
    trace!(%ty, %validator, "compiled annotation");
    Some(validator)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::types::RuntimeType;
    use crate::validators::{
        deep_iterable, deep_mapping, instance_of, optional, or, tuple_of, FieldContext,
    };
    use crate::value::{EnumDef, Value};

    fn i(ty: RuntimeType) -> Validator {
        instance_of(ty)
    }

    fn derive(src: &str) -> Option<Validator> {
        let ty = Catalog::new().parse(src).expect("type expression parses");
        compile(&ty)
    }

    fn accepts(src: &str, value: Value) -> bool {
        let v = derive(src).expect("annotation yields a validator");
        v.validate(&FieldContext::new("X", "f"), &value).is_ok()
    }

    #[test]
    fn derived_trees_match_hand_built_ones() {
        use RuntimeType as T;
        let cases: Vec<(&str, Validator)> = vec![
            ("float", i(T::Float)),
            ("str", i(T::Str)),
            ("list", i(T::List)),
            ("Union[int, float, str]", or([i(T::Int), i(T::Float), i(T::Str)])),
            ("Optional[int]", optional(i(T::Int))),
            ("Optional[str]", optional(i(T::Str))),
            ("Tuple[Optional[int], ...]", deep_iterable(optional(i(T::Int)), i(T::Tuple))),
            ("Tuple[float, Optional[int]]", tuple_of([i(T::Float), optional(i(T::Int))])),
            ("Sequence[int]", deep_iterable(i(T::Int), i(T::Sequence))),
            ("Sequence[Optional[int]]", deep_iterable(optional(i(T::Int)), i(T::Sequence))),
            ("Dict[int, float]", deep_mapping(i(T::Int), i(T::Float), i(T::Dict))),
            (
                "Dict[int, Optional[float]]",
                deep_mapping(i(T::Int), optional(i(T::Float)), i(T::Dict)),
            ),
            ("List", i(T::List)),
            ("Mapping", i(T::Mapping)),
            ("Deque[bytes]", deep_iterable(i(T::Bytes), i(T::Deque))),
            ("Union[int, None, str]", or([i(T::Int), i(T::NoneType), i(T::Str)])),
        ];
        for (src, expected) in cases {
            assert_eq!(derive(src), Some(expected), "{src}");
        }
    }

    #[test]
    fn optional_int() {
        assert!(accepts("Optional[int]", Value::None));
        assert!(accepts("Optional[int]", Value::Int(5)));
        assert!(!accepts("Optional[int]", Value::float(5.0)));
    }

    #[test]
    fn unions_try_alternatives_in_order() {
        assert!(accepts("Union[int, float, str]", Value::str("x")));
        let v = derive("Union[int, float]").unwrap();
        let err = v.validate(&FieldContext::new("X", "f"), &Value::None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ValidationError::NoAlternativeMatched { ref failures, .. }
                if failures.len() == 2
        ));
    }

    #[test]
    fn fixed_tuples() {
        let src = "Tuple[float, Optional[int]]";
        assert!(accepts(src, Value::tuple([Value::float(1.0), Value::None])));
        assert!(accepts(src, Value::tuple([Value::float(1.0), Value::Int(2)])));
        assert!(!accepts(src, Value::tuple([Value::str("x"), Value::None])));
        assert!(!accepts(src, Value::list([Value::float(1.0), Value::None])));
        assert!(!accepts(src, Value::tuple([Value::float(1.0)])));
    }

    #[test]
    fn mappings() {
        let src = "Dict[int, Optional[float]]";
        let entries = [(Value::Int(1), Value::float(2.2)), (Value::Int(2), Value::None)];
        assert!(accepts(src, Value::dict(entries)));
        assert!(!accepts(src, Value::dict([(Value::Int(1), Value::str("x"))])));
        assert!(accepts(src, Value::OrderedDict(vec![(Value::Int(1), Value::None)])));
        assert!(!accepts("Dict[str, int]", Value::ChainMap(vec![])));
        let chain = Value::ChainMap(vec![vec![(Value::str("a"), Value::Int(1))]]);
        assert!(accepts("Mapping[str, int]", chain));
    }

    #[test]
    fn containers_check_kind_and_every_element() {
        assert!(accepts("Sequence[float]", Value::list([Value::float(2.2)])));
        assert!(!accepts("Sequence[float]", Value::list([Value::Int(2)])));
        assert!(accepts("Sequence[str]", Value::str("abc")));
        assert!(!accepts("List[int]", Value::tuple([Value::Int(1)])));
        assert!(accepts("AbstractSet[int]", Value::FrozenSet(vec![Value::Int(1)])));
        assert!(!accepts("MutableSet[int]", Value::FrozenSet(vec![Value::Int(1)])));
        assert!(accepts("Collection[str]", Value::dict([(Value::str("k"), Value::Int(1))])));
        assert!(accepts("FrozenSet[int]", Value::FrozenSet(vec![])));
    }

    #[test]
    fn aliases_compile_to_their_target() {
        let catalog = Catalog::new().with_alias("UserId", TypeExpr::Plain(RuntimeType::Int));
        let ty = catalog.parse("List[UserId]").unwrap();
        assert_eq!(compile(&ty), derive("List[int]"));
    }

    #[test]
    fn enums_accept_members_only() {
        let answer = EnumDef::new("Answer", [("YES", 1), ("NO", 2), ("MAYBE", 3)]);
        let catalog = Catalog::new().with_enum(answer.clone());
        let v = compile(&catalog.parse("Answer").unwrap()).unwrap();
        let ctx = FieldContext::new("EnumHaver", "a");
        for member in answer.members() {
            assert!(v.validate(&ctx, &member).is_ok());
        }
        assert!(v.validate(&ctx, &Value::Int(1)).is_err());
        assert!(v.validate(&ctx, &Value::str("YES")).is_err());
    }

    #[test]
    fn unsupported_annotations() {
        assert_eq!(derive("Callable[[int], str]"), None);
        assert_eq!(derive("Any"), None);
        assert_eq!(derive("Optional[Callable[..., int]]"), None);
        assert_eq!(derive("Union[int, Any]"), None);
        // the container is still checked
        assert_eq!(derive("List[Any]"), Some(i(RuntimeType::List)));
        assert_eq!(
            derive("Tuple[Any, int]"),
            Some(Validator::Tuple(TupleValidator::new(vec![None, Some(i(RuntimeType::Int))])))
        );
        assert_eq!(
            derive("Dict[str, Any]"),
            Some(Validator::DeepMapping {
                key: Some(Box::new(i(RuntimeType::Str))),
                value: None,
                mapping: Box::new(i(RuntimeType::Dict)),
            })
        );
    }
}
