//! Type expressions: the annotation object graph the compiler inspects.
//!
//! A `TypeExpr` is either a plain runtime type (`int`, `collections.abc.Sequence`,
//! a user class, an enum), a parameterized generic (`origin` + `args`), a named
//! alias, or one of the two reserved markers (`Any`, the variadic `...`).
//! The absence type is the plain runtime type `NoneType`.

use std::fmt;

// ————————————————————————————————————————————————————————————————————————————
// RUNTIME TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A concrete or abstract runtime type a value can be an instance of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Tuple,
    Set,
    FrozenSet,
    Deque,
    Dict,
    OrderedDict,
    DefaultDict,
    ChainMap,
    // abstract collection types
    Sequence,
    MutableSequence,
    AbstractSet,
    MutableSet,
    Collection,
    Mapping,
    MutableMapping,
    /// A user class, matched by name against the instance's class hierarchy.
    Class(String),
    /// A user enumeration; only its members are instances.
    Enum(String),
}

impl RuntimeType {
    pub fn name(&self) -> &str {
        match self {
            Self::NoneType => "NoneType",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
            Self::Deque => "collections.deque",
            Self::Dict => "dict",
            Self::OrderedDict => "collections.OrderedDict",
            Self::DefaultDict => "collections.defaultdict",
            Self::ChainMap => "collections.ChainMap",
            Self::Sequence => "collections.abc.Sequence",
            Self::MutableSequence => "collections.abc.MutableSequence",
            Self::AbstractSet => "collections.abc.Set",
            Self::MutableSet => "collections.abc.MutableSet",
            Self::Collection => "collections.abc.Collection",
            Self::Mapping => "collections.abc.Mapping",
            Self::MutableMapping => "collections.abc.MutableMapping",
            Self::Class(name) | Self::Enum(name) => name,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERIC ORIGINS
// ————————————————————————————————————————————————————————————————————————————

/// The generic kind a parameterized type expression is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Union,
    List,
    Set,
    FrozenSet,
    Tuple,
    Deque,
    Sequence,
    MutableSequence,
    AbstractSet,
    MutableSet,
    Collection,
    Dict,
    Mapping,
    MutableMapping,
    DefaultDict,
    ChainMap,
    OrderedDict,
    Callable,
}

impl Origin {
    /// Concrete container kind for the homogeneous sequence-like origins.
    pub fn sequence_container(self) -> Option<RuntimeType> {
        let ty = match self {
            Self::List => RuntimeType::List,
            Self::Set => RuntimeType::Set,
            Self::FrozenSet => RuntimeType::FrozenSet,
            Self::Tuple => RuntimeType::Tuple,
            Self::Deque => RuntimeType::Deque,
            Self::Sequence => RuntimeType::Sequence,
            Self::MutableSequence => RuntimeType::MutableSequence,
            Self::AbstractSet => RuntimeType::AbstractSet,
            Self::MutableSet => RuntimeType::MutableSet,
            Self::Collection => RuntimeType::Collection,
            _ => return None,
        };
        Some(ty)
    }

    /// Concrete container kind for the mapping-like origins.
    pub fn mapping_container(self) -> Option<RuntimeType> {
        let ty = match self {
            Self::Dict => RuntimeType::Dict,
            Self::Mapping => RuntimeType::Mapping,
            Self::MutableMapping => RuntimeType::MutableMapping,
            Self::DefaultDict => RuntimeType::DefaultDict,
            Self::ChainMap => RuntimeType::ChainMap,
            Self::OrderedDict => RuntimeType::OrderedDict,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Union => "Union",
            Self::List => "List",
            Self::Set => "Set",
            Self::FrozenSet => "FrozenSet",
            Self::Tuple => "Tuple",
            Self::Deque => "Deque",
            Self::Sequence => "Sequence",
            Self::MutableSequence => "MutableSequence",
            Self::AbstractSet => "AbstractSet",
            Self::MutableSet => "MutableSet",
            Self::Collection => "Collection",
            Self::Dict => "Dict",
            Self::Mapping => "Mapping",
            Self::MutableMapping => "MutableMapping",
            Self::DefaultDict => "DefaultDict",
            Self::ChainMap => "ChainMap",
            Self::OrderedDict => "OrderedDict",
            Self::Callable => "Callable",
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Plain(RuntimeType),
    Generic { origin: Origin, args: Vec<TypeExpr> },
    /// A named indirection to another type with identical runtime semantics.
    Alias { name: String, target: Box<TypeExpr> },
    Any,
    /// The variadic marker, only meaningful as `Tuple[T, ...]` or `Callable[..., R]`.
    Ellipsis,
}

impl TypeExpr {
    pub fn none() -> Self {
        Self::Plain(RuntimeType::NoneType)
    }

    pub fn generic(origin: Origin, args: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Generic { origin, args: args.into_iter().collect() }
    }

    pub fn alias(name: impl Into<String>, target: TypeExpr) -> Self {
        Self::Alias { name: name.into(), target: Box::new(target) }
    }

    /// Builds a union the way the annotation system does: nested unions are
    /// flattened, repeated alternatives dropped, and a single remaining
    /// alternative stands for itself.
    pub fn union(first: TypeExpr, rest: impl IntoIterator<Item = TypeExpr>) -> Self {
        let mut alternatives: Vec<TypeExpr> = Vec::new();
        for alternative in std::iter::once(first).chain(rest) {
            match alternative {
                TypeExpr::Generic { origin: Origin::Union, args } => {
                    for arg in args {
                        push_unique(&mut alternatives, arg);
                    }
                }
                other => push_unique(&mut alternatives, other),
            }
        }
        if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Self::Generic { origin: Origin::Union, args: alternatives }
        }
    }

    /// `Optional[T]` is `Union[T, None]`.
    pub fn optional(inner: TypeExpr) -> Self {
        Self::union(inner, [Self::none()])
    }

    /// Follows alias indirections down to the first non-alias expression.
    pub fn dealias(&self) -> &TypeExpr {
        let mut current = self;
        while let TypeExpr::Alias { target, .. } = current {
            current = target;
        }
        current
    }
}

fn push_unique(alternatives: &mut Vec<TypeExpr>, candidate: TypeExpr) {
    if !alternatives.contains(&candidate) {
        alternatives.push(candidate);
    }
}

impl From<RuntimeType> for TypeExpr {
    fn from(ty: RuntimeType) -> Self {
        Self::Plain(ty)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(RuntimeType::NoneType) => f.write_str("None"),
            Self::Plain(ty) => write!(f, "{ty}"),
            Self::Any => f.write_str("Any"),
            Self::Ellipsis => f.write_str("..."),
            Self::Alias { name, .. } => f.write_str(name),
            Self::Generic { origin: Origin::Union, args }
                if args.len() == 2 && args[1] == Self::none() =>
            {
                write!(f, "Optional[{}]", args[0])
            }
            Self::Generic { origin, args } if args.is_empty() => f.write_str(origin.name()),
            Self::Generic { origin, args } => {
                write!(f, "{}[", origin.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> TypeExpr {
        TypeExpr::Plain(RuntimeType::Int)
    }

    fn float() -> TypeExpr {
        TypeExpr::Plain(RuntimeType::Float)
    }

    #[test]
    fn union_flattens_and_dedups() {
        let inner = TypeExpr::union(int(), [float()]);
        let outer = TypeExpr::union(inner, [int(), TypeExpr::none()]);
        assert_eq!(
            outer,
            TypeExpr::generic(Origin::Union, [int(), float(), TypeExpr::none()])
        );
    }

    #[test]
    fn single_alternative_union_collapses() {
        assert_eq!(TypeExpr::union(int(), [int()]), int());
    }

    #[test]
    fn optional_is_union_with_none() {
        let ty = TypeExpr::optional(int());
        assert_eq!(ty, TypeExpr::generic(Origin::Union, [int(), TypeExpr::none()]));
        assert_eq!(ty.to_string(), "Optional[int]");
    }

    #[test]
    fn dealias_follows_chains() {
        let inner = TypeExpr::alias("UserId", int());
        let outer = TypeExpr::alias("AdminId", inner);
        assert_eq!(outer.dealias(), &int());
        assert_eq!(outer.to_string(), "AdminId");
    }

    #[test]
    fn display_nested_generics() {
        let ty = TypeExpr::generic(Origin::Dict, [int(), TypeExpr::optional(float())]);
        assert_eq!(ty.to_string(), "Dict[int, Optional[float]]");
        let tuple = TypeExpr::generic(Origin::Tuple, [int(), TypeExpr::Ellipsis]);
        assert_eq!(tuple.to_string(), "Tuple[int, ...]");
    }
}
