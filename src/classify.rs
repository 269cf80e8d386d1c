//! Type-expression classifier: one closed `Shape` per supported annotation
//! form. Dispatch order matters; the first matching rule wins.

use crate::types::{Origin, RuntimeType, TypeExpr};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape<'a> {
    /// A named alias; classify its target instead.
    Alias(&'a TypeExpr),
    /// `Union[T, None]`.
    Optional(&'a TypeExpr),
    Union(&'a [TypeExpr]),
    /// Homogeneous container; `element` is `None` for a bare origin.
    Sequence {
        container: RuntimeType,
        element: Option<&'a TypeExpr>,
    },
    /// Fixed-arity tuple, one type per position.
    Tuple(&'a [TypeExpr]),
    Mapping {
        container: RuntimeType,
        entry: Option<(&'a TypeExpr, &'a TypeExpr)>,
    },
    Plain(&'a RuntimeType),
    Unsupported,
}

pub fn classify(ty: &TypeExpr) -> Shape<'_> {
    match ty {
        TypeExpr::Alias { target, .. } => Shape::Alias(target),
        TypeExpr::Generic { origin, args } => classify_generic(*origin, args),
        TypeExpr::Plain(runtime) => Shape::Plain(runtime),
        TypeExpr::Any | TypeExpr::Ellipsis => Shape::Unsupported,
    }
}

fn classify_generic(origin: Origin, args: &[TypeExpr]) -> Shape<'_> {
    if origin == Origin::Union {
        return match args {
            [] => Shape::Unsupported,
            [inner, TypeExpr::Plain(RuntimeType::NoneType)] => Shape::Optional(inner),
            _ => Shape::Union(args),
        };
    }

    if let Some(container) = origin.sequence_container() {
        let is_tuple = origin == Origin::Tuple;
        return match args {
            [] => Shape::Sequence { container, element: None },
            // Tuple[T, ...] is an unknown-length homogeneous tuple
            [element, TypeExpr::Ellipsis] if is_tuple => {
                Shape::Sequence { container, element: Some(element) }
            }
            positions if is_tuple && !positions.contains(&TypeExpr::Ellipsis) => {
                Shape::Tuple(positions)
            }
            [element] if !is_tuple => Shape::Sequence { container, element: Some(element) },
            _ => Shape::Unsupported,
        };
    }

    if let Some(container) = origin.mapping_container() {
        return match args {
            [] => Shape::Mapping { container, entry: None },
            [key, value] => Shape::Mapping { container, entry: Some((key, value)) },
            _ => Shape::Unsupported,
        };
    }

    // Callable signatures carry no runtime check.
    Shape::Unsupported
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
