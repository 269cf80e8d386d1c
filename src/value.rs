//! Runtime values: what a field validator is handed at construction or
//! mutation time.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::class::Instance;
use crate::types::RuntimeType;

/// Key/value pairs of a mapping, in insertion order.
pub type Entries = Vec<(Value, Value)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Deque(Vec<Value>),
    Dict(Entries),
    OrderedDict(Entries),
    DefaultDict(Entries),
    /// Layered mappings; earlier layers shadow later ones.
    ChainMap(Vec<Entries>),
    Enum(EnumMember),
    Object(Instance),
}

/// One member of a user enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub enum_name: String,
    pub name: String,
    pub value: Box<Value>,
}

/// A user enumeration: an ordered set of named members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    members: IndexMap<String, Value>,
}

impl EnumDef {
    pub fn new<I, K, V>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<Value> {
        let value = self.members.get(name)?;
        Some(Value::Enum(EnumMember {
            enum_name: self.name.clone(),
            name: name.to_string(),
            value: Box::new(value.clone()),
        }))
    }

    pub fn members(&self) -> impl Iterator<Item = Value> + '_ {
        self.members.keys().filter_map(|name| self.member(name))
    }
}

impl Value {
    pub fn float(f: f64) -> Self {
        Self::Float(OrderedFloat(f))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn dict(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Dict(entries.into_iter().collect())
    }

    /// Name of this value's runtime type, as reported in failures.
    pub fn type_name(&self) -> String {
        let name = match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Deque(_) => "collections.deque",
            Self::Dict(_) => "dict",
            Self::OrderedDict(_) => "collections.OrderedDict",
            Self::DefaultDict(_) => "collections.defaultdict",
            Self::ChainMap(_) => "collections.ChainMap",
            Self::Enum(member) => return member.enum_name.clone(),
            Self::Object(instance) => return instance.class().name().to_string(),
        };
        name.to_string()
    }

    /// Runtime instance check, including the subtype relations of the
    /// builtin types: `bool` is an `int`, `OrderedDict` is a `dict`, `str` is
    /// a `Sequence`, and so on.
    pub fn is_instance(&self, ty: &RuntimeType) -> bool {
        use RuntimeType as T;
        match ty {
            T::NoneType => matches!(self, Self::None),
            T::Bool => matches!(self, Self::Bool(_)),
            T::Int => matches!(self, Self::Int(_) | Self::Bool(_)),
            T::Float => matches!(self, Self::Float(_)),
            T::Str => matches!(self, Self::Str(_)),
            T::Bytes => matches!(self, Self::Bytes(_)),
            T::List => matches!(self, Self::List(_)),
            T::Tuple => matches!(self, Self::Tuple(_)),
            T::Set => matches!(self, Self::Set(_)),
            T::FrozenSet => matches!(self, Self::FrozenSet(_)),
            T::Deque => matches!(self, Self::Deque(_)),
            T::Dict => matches!(self, Self::Dict(_) | Self::OrderedDict(_) | Self::DefaultDict(_)),
            T::OrderedDict => matches!(self, Self::OrderedDict(_)),
            T::DefaultDict => matches!(self, Self::DefaultDict(_)),
            T::ChainMap => matches!(self, Self::ChainMap(_)),
            T::Sequence => matches!(
                self,
                Self::List(_) | Self::Tuple(_) | Self::Deque(_) | Self::Str(_) | Self::Bytes(_)
            ),
            T::MutableSequence => matches!(self, Self::List(_) | Self::Deque(_)),
            T::AbstractSet => matches!(self, Self::Set(_) | Self::FrozenSet(_)),
            T::MutableSet => matches!(self, Self::Set(_)),
            T::Collection => self.elements().is_some(),
            T::Mapping | T::MutableMapping => self.entries().is_some(),
            T::Class(name) => match self {
                Self::Object(instance) => instance.class().is_subclass_of(name),
                _ => false,
            },
            T::Enum(name) => match self {
                Self::Enum(member) => &member.enum_name == name,
                _ => false,
            },
        }
    }

    /// What iterating this value yields, or `None` if it is not iterable.
    /// Mappings iterate their keys and strings their characters.
    pub fn elements(&self) -> Option<Vec<Cow<'_, Value>>> {
        let out = match self {
            Self::List(xs)
            | Self::Tuple(xs)
            | Self::Set(xs)
            | Self::FrozenSet(xs)
            | Self::Deque(xs) => xs.iter().map(Cow::Borrowed).collect(),
            Self::Str(s) => s.chars().map(|c| Cow::Owned(Value::Str(c.to_string()))).collect(),
            Self::Bytes(bs) => bs.iter().map(|b| Cow::Owned(Value::Int(i64::from(*b)))).collect(),
            Self::Dict(_) | Self::OrderedDict(_) | Self::DefaultDict(_) | Self::ChainMap(_) => {
                self.entries()?.into_iter().map(|(k, _)| Cow::Borrowed(k)).collect()
            }
            _ => return None,
        };
        Some(out)
    }

    /// Key/value pairs if this value is a mapping. A `ChainMap` yields each
    /// key once, with the value from the first layer that holds it.
    pub fn entries(&self) -> Option<Vec<(&Value, &Value)>> {
        match self {
            Self::Dict(es) | Self::OrderedDict(es) | Self::DefaultDict(es) => {
                Some(es.iter().map(|(k, v)| (k, v)).collect())
            }
            Self::ChainMap(layers) => {
                let mut out: Vec<(&Value, &Value)> = Vec::new();
                for (k, v) in layers.iter().flatten() {
                    if !out.iter().any(|(seen, _)| *seen == k) {
                        out.push((k, v));
                    }
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// `len()` of sized values.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(s.chars().count()),
            Self::Bytes(bs) => Some(bs.len()),
            Self::List(xs)
            | Self::Tuple(xs)
            | Self::Set(xs)
            | Self::FrozenSet(xs)
            | Self::Deque(xs) => Some(xs.len()),
            _ => self.entries().map(|es| es.len()),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Self::Object(instance)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REPR
// ————————————————————————————————————————————————————————————————————————————

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_entries(f: &mut fmt::Formatter<'_>, entries: &[(Value, Value)]) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}: {v}")?;
    }
    f.write_str("}")
}

/// Python-flavoured repr, used in failure messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.0.is_finite() && x.0.fract() == 0.0 => write!(f, "{:.1}", x.0),
            Self::Float(x) => write!(f, "{}", x.0),
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Self::Bytes(bs) => write!(f, "b'{}'", bs.escape_ascii()),
            Self::List(xs) => {
                f.write_str("[")?;
                write_seq(f, xs)?;
                f.write_str("]")
            }
            Self::Tuple(xs) if xs.len() == 1 => write!(f, "({},)", xs[0]),
            Self::Tuple(xs) => {
                f.write_str("(")?;
                write_seq(f, xs)?;
                f.write_str(")")
            }
            Self::Set(xs) if xs.is_empty() => f.write_str("set()"),
            Self::Set(xs) => {
                f.write_str("{")?;
                write_seq(f, xs)?;
                f.write_str("}")
            }
            Self::FrozenSet(xs) => {
                f.write_str("frozenset({")?;
                write_seq(f, xs)?;
                f.write_str("})")
            }
            Self::Deque(xs) => {
                f.write_str("deque([")?;
                write_seq(f, xs)?;
                f.write_str("])")
            }
            Self::Dict(es) => write_entries(f, es),
            Self::OrderedDict(es) => {
                f.write_str("OrderedDict(")?;
                write_entries(f, es)?;
                f.write_str(")")
            }
            Self::DefaultDict(es) => {
                f.write_str("defaultdict(None, ")?;
                write_entries(f, es)?;
                f.write_str(")")
            }
            Self::ChainMap(layers) => {
                f.write_str("ChainMap(")?;
                for (i, layer) in layers.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_entries(f, layer)?;
                }
                f.write_str(")")
            }
            Self::Enum(member) => {
                write!(f, "<{}.{}: {}>", member.enum_name, member.name, member.value)
            }
            Self::Object(instance) => write!(f, "{instance}"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_is_int_but_int_is_not_float() {
        assert!(Value::Bool(true).is_instance(&RuntimeType::Int));
        assert!(!Value::Int(5).is_instance(&RuntimeType::Float));
        assert!(!Value::float(5.0).is_instance(&RuntimeType::Int));
    }

    #[test]
    fn abstract_collection_membership() {
        let s = Value::str("abc");
        assert!(s.is_instance(&RuntimeType::Sequence));
        assert!(s.is_instance(&RuntimeType::Collection));
        assert!(!s.is_instance(&RuntimeType::MutableSequence));

        let frozen = Value::FrozenSet(vec![Value::Int(1)]);
        assert!(frozen.is_instance(&RuntimeType::AbstractSet));
        assert!(!frozen.is_instance(&RuntimeType::MutableSet));

        let ordered = Value::OrderedDict(vec![]);
        assert!(ordered.is_instance(&RuntimeType::Dict));
        let chain = Value::ChainMap(vec![]);
        assert!(chain.is_instance(&RuntimeType::Mapping));
        assert!(!chain.is_instance(&RuntimeType::Dict));
    }

    #[test]
    fn enum_members_are_distinct_from_raw_values() {
        let answer = EnumDef::new("Answer", [("YES", 1), ("NO", 2)]);
        let yes = answer.member("YES").unwrap();
        assert!(yes.is_instance(&RuntimeType::Enum("Answer".into())));
        assert!(!Value::Int(1).is_instance(&RuntimeType::Enum("Answer".into())));
        assert_ne!(yes, Value::Int(1));
        assert_eq!(answer.members().count(), 2);
        assert_eq!(yes.to_string(), "<Answer.YES: 1>");
    }

    #[test]
    fn chain_map_first_layer_wins() {
        let chain = Value::ChainMap(vec![
            vec![(Value::str("a"), Value::Int(1))],
            vec![(Value::str("a"), Value::Int(2)), (Value::str("b"), Value::Int(3))],
        ]);
        let entries = chain.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, &Value::Int(1));
        assert_eq!(chain.len(), Some(2));
    }

    #[test]
    fn repr_is_python_flavoured() {
        assert_eq!(Value::float(2.0).to_string(), "2.0");
        assert_eq!(Value::tuple([Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::Set(vec![]).to_string(), "set()");
        assert_eq!(Value::str("hi").to_string(), "'hi'");
    }
}
