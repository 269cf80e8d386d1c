//! JSON decoding of runtime values.
//!
//! Plain JSON maps onto `None`, `bool`, `int`, `float`, `str`, `list` and
//! string-keyed `dict`. Everything else is spelled as a tagged object:
//!
//! | JSON                              | value                     |
//! |-----------------------------------|---------------------------|
//! | `{"$tuple": [..]}`                | tuple                     |
//! | `{"$set": [..]}`                  | set                       |
//! | `{"$frozenset": [..]}`            | frozenset                 |
//! | `{"$deque": [..]}`                | deque                     |
//! | `{"$dict": [[k, v], ..]}`         | dict with arbitrary keys  |
//! | `{"$ordereddict": [[k, v], ..]}`  | OrderedDict               |
//! | `{"$defaultdict": [[k, v], ..]}`  | defaultdict               |
//! | `{"$chainmap": [[[k, v], ..], ..]}` | ChainMap                |
//! | `{"$bytes": "text"}`              | bytes                     |
//! | `{"$enum": "Answer.YES"}`         | enum member               |
//! | `{"$class": "X", ..fields}`       | instance of class `X`     |

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::class::{Class, Instance};
use crate::error::InstanceError;
use crate::value::{Entries, Value};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("number {0} does not fit in a signed 64-bit int or a float")]
    IntegerRange(String),

    #[error("tag '{tag}' expects {expected}")]
    BadTag { tag: String, expected: &'static str },

    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    #[error("unknown enum member '{0}'")]
    UnknownMember(String),

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("instance of {class} must be a JSON object, got {got}")]
    NotAnObject { class: String, got: String },

    #[error(transparent)]
    Instance(#[from] InstanceError),
}

/// Decodes JSON into values, resolving enums and classes by name.
pub struct Decoder<'a> {
    catalog: &'a Catalog,
    classes: &'a IndexMap<String, Arc<Class>>,
}

impl<'a> Decoder<'a> {
    pub fn new(catalog: &'a Catalog, classes: &'a IndexMap<String, Arc<Class>>) -> Self {
        Self { catalog, classes }
    }

    pub fn decode(&self, json: &Json) -> Result<Value, DecodeError> {
        let value = match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => number(n)?,
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(xs) => Value::List(self.decode_all(xs)?),
            Json::Object(map) => return self.decode_object(map),
        };
        Ok(value)
    }

    /// Decodes a JSON object of field values into an instance of `class`.
    pub fn instantiate(&self, class: &Arc<Class>, json: &Json) -> Result<Instance, DecodeError> {
        let Json::Object(map) = json else {
            return Err(DecodeError::NotAnObject {
                class: class.name().to_string(),
                got: kind(json).into(),
            });
        };
        let mut args = Vec::with_capacity(map.len());
        for (name, value) in map {
            if name == "$class" {
                continue;
            }
            args.push((name.clone(), self.decode(value)?));
        }
        Ok(class.construct(args)?)
    }

    fn decode_all(&self, xs: &[Json]) -> Result<Vec<Value>, DecodeError> {
        xs.iter().map(|x| self.decode(x)).collect()
    }

    fn decode_object(&self, map: &Map<String, Json>) -> Result<Value, DecodeError> {
        if let Some(class_name) = map.get("$class") {
            let name = class_name
                .as_str()
                .ok_or(DecodeError::BadTag { tag: "$class".into(), expected: "a class name" })?;
            let class = self
                .classes
                .get(name)
                .ok_or_else(|| DecodeError::UnknownClass(name.to_string()))?;
            return Ok(Value::Object(self.instantiate(class, &Json::Object(map.clone()))?));
        }

        let tagged = map.keys().any(|k| k.starts_with('$'));
        if !tagged {
            let entries = map
                .iter()
                .map(|(k, v)| Ok((Value::Str(k.clone()), self.decode(v)?)))
                .collect::<Result<Entries, DecodeError>>()?;
            return Ok(Value::Dict(entries));
        }
        let mut iter = map.iter();
        let (Some((tag, body)), None) = (iter.next(), iter.next()) else {
            return Err(DecodeError::BadTag {
                tag: "$".into(),
                expected: "to be the only key of its object",
            });
        };

        let value = match tag.as_str() {
            "$tuple" => Value::Tuple(self.decode_all(array(tag, body)?)?),
            "$set" => Value::Set(self.decode_all(array(tag, body)?)?),
            "$frozenset" => Value::FrozenSet(self.decode_all(array(tag, body)?)?),
            "$deque" => Value::Deque(self.decode_all(array(tag, body)?)?),
            "$dict" => Value::Dict(self.entries(tag, body)?),
            "$ordereddict" => Value::OrderedDict(self.entries(tag, body)?),
            "$defaultdict" => Value::DefaultDict(self.entries(tag, body)?),
            "$chainmap" => Value::ChainMap(
                array(tag, body)?
                    .iter()
                    .map(|layer| self.entries(tag, layer))
                    .collect::<Result<_, _>>()?,
            ),
            "$bytes" => {
                let text = body
                    .as_str()
                    .ok_or(DecodeError::BadTag { tag: tag.clone(), expected: "a string" })?;
                Value::Bytes(text.as_bytes().to_vec())
            }
            "$enum" => self.member(tag, body)?,
            _ => return Err(DecodeError::UnknownTag(tag.clone())),
        };
        Ok(value)
    }

    fn entries(&self, tag: &str, body: &Json) -> Result<Entries, DecodeError> {
        array(tag, body)?
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([k, v]) => Ok((self.decode(k)?, self.decode(v)?)),
                _ => Err(DecodeError::BadTag {
                    tag: tag.to_string(),
                    expected: "[key, value] pairs",
                }),
            })
            .collect()
    }

    fn member(&self, tag: &str, body: &Json) -> Result<Value, DecodeError> {
        let path = body
            .as_str()
            .ok_or(DecodeError::BadTag { tag: tag.to_string(), expected: "\"Enum.MEMBER\"" })?;
        let (enum_name, member) = path
            .rsplit_once('.')
            .ok_or(DecodeError::BadTag { tag: tag.to_string(), expected: "\"Enum.MEMBER\"" })?;
        self.catalog
            .enum_def(enum_name)
            .and_then(|def| def.member(member))
            .ok_or_else(|| DecodeError::UnknownMember(path.to_string()))
    }
}

/// Integer literals stay integers; one that does not fit in an `i64` is an
/// error rather than a float.
fn number(n: &serde_json::Number) -> Result<Value, DecodeError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    let literal = n.to_string();
    if !literal.contains(['.', 'e', 'E']) {
        return Err(DecodeError::IntegerRange(literal));
    }
    n.as_f64().map(Value::float).ok_or(DecodeError::IntegerRange(literal))
}

fn array<'j>(tag: &str, body: &'j Json) -> Result<&'j [Json], DecodeError> {
    body.as_array()
        .map(Vec::as_slice)
        .ok_or(DecodeError::BadTag { tag: tag.to_string(), expected: "an array" })
}

fn kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
