//! A small textual DSL for type expressions, in the notation of Python's
//! `typing` module: `Dict[int, Optional[float]]`, `Tuple[str, ...]`,
//! `Callable[[int], str]`. User enums, classes and aliases come from a
//! `Catalog`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::types::{Origin, RuntimeType, TypeExpr};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character {ch:?} at offset {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("expected {expected} at offset {pos}, found '{found}'")]
    Unexpected {
        pos: usize,
        expected: &'static str,
        found: String,
    },

    #[error("unexpected end of type expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown type name '{name}' at offset {pos}")]
    UnknownName { pos: usize, name: String },

    #[error("'{name}' is not generic and cannot be parameterized")]
    NotGeneric { name: String },

    #[error("'{name}' cannot be used without type arguments")]
    Bare { name: String },

    #[error("'{name}' takes {expected} type arguments, got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("'...' at offset {pos} is only allowed as Tuple[T, ...] or Callable[..., R]")]
    MisplacedEllipsis { pos: usize },
}

// ————————————————————————————————————————————————————————————————————————————
// TOKENS
// ————————————————————————————————————————————————————————————————————————————

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:(\.\.\.)|([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)|([\[\],])|(\S))")
        .expect("token regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Name(&'a str),
    Ellipsis,
    Open,
    Close,
    Comma,
}

impl Tok<'_> {
    fn text(&self) -> &str {
        match self {
            Tok::Name(name) => name,
            Tok::Ellipsis => "...",
            Tok::Open => "[",
            Tok::Close => "]",
            Tok::Comma => ",",
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<(Tok<'_>, usize)>, ParseError> {
    let mut out = Vec::new();
    for caps in TOKEN.captures_iter(src) {
        if let Some(m) = caps.get(1) {
            out.push((Tok::Ellipsis, m.start()));
        } else if let Some(m) = caps.get(2) {
            out.push((Tok::Name(m.as_str()), m.start()));
        } else if let Some(m) = caps.get(3) {
            let tok = match m.as_str() {
                "[" => Tok::Open,
                "]" => Tok::Close,
                _ => Tok::Comma,
            };
            out.push((tok, m.start()));
        } else if let Some(m) = caps.get(4) {
            let ch = m.as_str().chars().next().unwrap_or_default();
            return Err(ParseError::UnexpectedChar { pos: m.start(), ch });
        }
    }
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

enum Named {
    Plain(RuntimeType),
    /// A builtin usable both bare (`list`) and subscripted (`list[int]`).
    PlainOrOrigin(RuntimeType, Origin),
    Origin(Origin),
    Optional,
    Union,
    Any,
    User(TypeExpr),
}

fn builtin(name: &str) -> Option<Named> {
    use Named::{Origin as G, PlainOrOrigin as B, Plain as P};
    use RuntimeType as T;
    let name = name.strip_prefix("typing.").unwrap_or(name);
    let named = match name {
        "None" | "NoneType" => P(T::NoneType),
        "bool" => P(T::Bool),
        "int" => P(T::Int),
        "float" => P(T::Float),
        "str" => P(T::Str),
        "bytes" => P(T::Bytes),
        "list" => B(T::List, Origin::List),
        "tuple" => B(T::Tuple, Origin::Tuple),
        "set" => B(T::Set, Origin::Set),
        "frozenset" => B(T::FrozenSet, Origin::FrozenSet),
        "dict" => B(T::Dict, Origin::Dict),
        "collections.deque" => B(T::Deque, Origin::Deque),
        "collections.OrderedDict" => B(T::OrderedDict, Origin::OrderedDict),
        "collections.defaultdict" => B(T::DefaultDict, Origin::DefaultDict),
        "collections.ChainMap" => B(T::ChainMap, Origin::ChainMap),
        "collections.abc.Sequence" => B(T::Sequence, Origin::Sequence),
        "collections.abc.MutableSequence" => B(T::MutableSequence, Origin::MutableSequence),
        "collections.abc.Set" => B(T::AbstractSet, Origin::AbstractSet),
        "collections.abc.MutableSet" => B(T::MutableSet, Origin::MutableSet),
        "collections.abc.Collection" => B(T::Collection, Origin::Collection),
        "collections.abc.Mapping" => B(T::Mapping, Origin::Mapping),
        "collections.abc.MutableMapping" => B(T::MutableMapping, Origin::MutableMapping),
        "List" => G(Origin::List),
        "Set" => G(Origin::Set),
        "FrozenSet" => G(Origin::FrozenSet),
        "Tuple" => G(Origin::Tuple),
        "Deque" => G(Origin::Deque),
        "Sequence" => G(Origin::Sequence),
        "MutableSequence" => G(Origin::MutableSequence),
        "AbstractSet" => G(Origin::AbstractSet),
        "MutableSet" => G(Origin::MutableSet),
        "Collection" => G(Origin::Collection),
        "Dict" => G(Origin::Dict),
        "Mapping" => G(Origin::Mapping),
        "MutableMapping" => G(Origin::MutableMapping),
        "DefaultDict" => G(Origin::DefaultDict),
        "ChainMap" => G(Origin::ChainMap),
        "OrderedDict" => G(Origin::OrderedDict),
        "Callable" => G(Origin::Callable),
        "Optional" => Named::Optional,
        "Union" => Named::Union,
        "Any" => Named::Any,
        _ => return None,
    };
    Some(named)
}

/// Whether `name` is reserved by the DSL and cannot name a user type.
pub fn is_builtin(name: &str) -> bool {
    builtin(name).is_some()
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

/// One subscript argument; lists only occur as Callable parameter lists.
enum Arg {
    Type(TypeExpr),
    Ellipsis,
    List(Vec<TypeExpr>),
}

struct Parser<'s, 'c> {
    tokens: Vec<(Tok<'s>, usize)>,
    at: usize,
    catalog: &'c Catalog,
}

pub fn parse(src: &str, catalog: &Catalog) -> Result<TypeExpr, ParseError> {
    let mut parser = Parser { tokens: tokenize(src)?, at: 0, catalog };
    let ty = parser.expr()?;
    if let Some((tok, pos)) = parser.peek() {
        return Err(ParseError::Unexpected {
            pos,
            expected: "end of input",
            found: tok.text().to_string(),
        });
    }
    Ok(ty)
}

impl<'s> Parser<'s, '_> {
    fn peek(&self) -> Option<(Tok<'s>, usize)> {
        self.tokens.get(self.at).copied()
    }

    fn next(&mut self, expected: &'static str) -> Result<(Tok<'s>, usize), ParseError> {
        let token = self.peek().ok_or(ParseError::UnexpectedEnd { expected })?;
        self.at += 1;
        Ok(token)
    }

    fn expr(&mut self) -> Result<TypeExpr, ParseError> {
        match self.arg()? {
            (Arg::Type(ty), _) => Ok(ty),
            (Arg::Ellipsis, pos) => Err(ParseError::MisplacedEllipsis { pos }),
            (Arg::List(_), pos) => {
                Err(ParseError::Unexpected { pos, expected: "a type", found: "[".into() })
            }
        }
    }

    fn arg(&mut self) -> Result<(Arg, usize), ParseError> {
        let (tok, pos) = self.next("a type")?;
        let arg = match tok {
            Tok::Ellipsis => Arg::Ellipsis,
            Tok::Open => Arg::List(self.list()?),
            Tok::Name(name) => Arg::Type(self.named(name, pos)?),
            other => {
                return Err(ParseError::Unexpected {
                    pos,
                    expected: "a type",
                    found: other.text().to_string(),
                });
            }
        };
        Ok((arg, pos))
    }

    /// Comma-separated types up to and including the closing `]`; may be empty.
    fn list(&mut self) -> Result<Vec<TypeExpr>, ParseError> {
        let mut out = Vec::new();
        if matches!(self.peek(), Some((Tok::Close, _))) {
            self.at += 1;
            return Ok(out);
        }
        loop {
            out.push(self.expr()?);
            match self.next("',' or ']'")? {
                (Tok::Comma, _) => continue,
                (Tok::Close, _) => return Ok(out),
                (tok, pos) => {
                    return Err(ParseError::Unexpected {
                        pos,
                        expected: "',' or ']'",
                        found: tok.text().to_string(),
                    });
                }
            }
        }
    }

    fn subscript(&mut self) -> Result<Vec<(Arg, usize)>, ParseError> {
        let mut out = Vec::new();
        loop {
            out.push(self.arg()?);
            match self.next("',' or ']'")? {
                (Tok::Comma, _) => continue,
                (Tok::Close, _) => return Ok(out),
                (tok, pos) => {
                    return Err(ParseError::Unexpected {
                        pos,
                        expected: "',' or ']'",
                        found: tok.text().to_string(),
                    });
                }
            }
        }
    }

    fn named(&mut self, name: &str, pos: usize) -> Result<TypeExpr, ParseError> {
        let named = match builtin(name) {
            Some(named) => named,
            None => match self.catalog.resolve(name) {
                Some(ty) => Named::User(ty),
                None => return Err(ParseError::UnknownName { pos, name: name.to_string() }),
            },
        };

        if !matches!(self.peek(), Some((Tok::Open, _))) {
            return match named {
                Named::Plain(ty) | Named::PlainOrOrigin(ty, _) => Ok(TypeExpr::Plain(ty)),
                Named::Origin(origin) => Ok(TypeExpr::generic(origin, [])),
                Named::Any => Ok(TypeExpr::Any),
                Named::User(ty) => Ok(ty),
                Named::Optional | Named::Union => Err(ParseError::Bare { name: name.to_string() }),
            };
        }
        self.at += 1;
        let args = self.subscript()?;

        match named {
            Named::Plain(_) | Named::Any | Named::User(_) => {
                Err(ParseError::NotGeneric { name: name.to_string() })
            }
            Named::Optional => match types_only(args)?.as_slice() {
                [inner] => Ok(TypeExpr::optional(inner.clone())),
                other => Err(arity(name, "1", other.len())),
            },
            Named::Union => {
                let mut alternatives = types_only(args)?.into_iter();
                let first = alternatives.next().ok_or_else(|| arity(name, "at least 1", 0))?;
                Ok(TypeExpr::union(first, alternatives))
            }
            Named::Origin(origin) | Named::PlainOrOrigin(_, origin) => generic(name, origin, args),
        }
    }
}

fn arity(name: &str, expected: &'static str, got: usize) -> ParseError {
    ParseError::Arity { name: name.to_string(), expected, got }
}

fn types_only(args: Vec<(Arg, usize)>) -> Result<Vec<TypeExpr>, ParseError> {
    args.into_iter()
        .map(|(arg, pos)| match arg {
            Arg::Type(ty) => Ok(ty),
            Arg::Ellipsis => Err(ParseError::MisplacedEllipsis { pos }),
            Arg::List(_) => {
                Err(ParseError::Unexpected { pos, expected: "a type", found: "[".into() })
            }
        })
        .collect()
}

fn generic(
    name: &str,
    origin: Origin,
    mut args: Vec<(Arg, usize)>,
) -> Result<TypeExpr, ParseError> {
    match origin {
        Origin::Tuple => {
            // only the Tuple[T, ...] form may carry the variadic marker
            if args.len() == 2 && matches!(args[1].0, Arg::Ellipsis) {
                args.pop();
                let element = types_only(args)?;
                let homogeneous = element.into_iter().chain([TypeExpr::Ellipsis]);
                return Ok(TypeExpr::generic(origin, homogeneous));
            }
            Ok(TypeExpr::generic(origin, types_only(args)?))
        }
        Origin::Callable => {
            let [params, ret]: [(Arg, usize); 2] =
                args.try_into().map_err(|args: Vec<_>| arity(name, "2", args.len()))?;
            let ret = types_only(vec![ret])?;
            let params = match params {
                (Arg::List(params), _) => params,
                (Arg::Ellipsis, _) => vec![TypeExpr::Ellipsis],
                (Arg::Type(_), pos) => {
                    return Err(ParseError::Unexpected {
                        pos,
                        expected: "a parameter list or '...'",
                        found: "a type".into(),
                    });
                }
            };
            Ok(TypeExpr::generic(origin, params.into_iter().chain(ret)))
        }
        _ => {
            let args = types_only(args)?;
            let expected = if origin.mapping_container().is_some() { 2 } else { 1 };
            if args.len() != expected {
                return Err(arity(name, if expected == 2 { "2" } else { "1" }, args.len()));
            }
            Ok(TypeExpr::generic(origin, args))
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EnumDef;

    fn p(src: &str) -> Result<TypeExpr, ParseError> {
        Catalog::new().parse(src)
    }

    fn int() -> TypeExpr {
        TypeExpr::Plain(RuntimeType::Int)
    }

    fn float() -> TypeExpr {
        TypeExpr::Plain(RuntimeType::Float)
    }

    #[test]
    fn plain_and_generic_names() {
        assert_eq!(p("int"), Ok(int()));
        assert_eq!(p("  typing.List[ int ]"), Ok(TypeExpr::generic(Origin::List, [int()])));
        assert_eq!(p("list"), Ok(TypeExpr::Plain(RuntimeType::List)));
        assert_eq!(p("list[int]"), Ok(TypeExpr::generic(Origin::List, [int()])));
        assert_eq!(p("Dict"), Ok(TypeExpr::generic(Origin::Dict, [])));
        assert_eq!(
            p("collections.abc.Sequence"),
            Ok(TypeExpr::Plain(RuntimeType::Sequence))
        );
    }

    #[test]
    fn optional_and_union_normalize() {
        assert_eq!(p("Optional[int]"), Ok(TypeExpr::optional(int())));
        assert_eq!(p("Union[int, None]"), p("Optional[int]"));
        assert_eq!(p("Union[int]"), Ok(int()));
        assert_eq!(
            p("Optional[Union[int, float]]"),
            Ok(TypeExpr::generic(Origin::Union, [int(), float(), TypeExpr::none()]))
        );
    }

    #[test]
    fn tuples_and_ellipsis() {
        assert_eq!(
            p("Tuple[int, ...]"),
            Ok(TypeExpr::generic(Origin::Tuple, [int(), TypeExpr::Ellipsis]))
        );
        assert_eq!(p("Tuple[int, float]"), Ok(TypeExpr::generic(Origin::Tuple, [int(), float()])));
        assert_eq!(p("Tuple[..., int]"), Err(ParseError::MisplacedEllipsis { pos: 6 }));
        assert_eq!(p("List[...]"), Err(ParseError::MisplacedEllipsis { pos: 5 }));
        assert_eq!(p("..."), Err(ParseError::MisplacedEllipsis { pos: 0 }));
    }

    #[test]
    fn callables() {
        assert_eq!(
            p("Callable[[int, str], float]"),
            Ok(TypeExpr::generic(
                Origin::Callable,
                [int(), TypeExpr::Plain(RuntimeType::Str), float()]
            ))
        );
        assert_eq!(
            p("Callable[..., None]"),
            Ok(TypeExpr::generic(Origin::Callable, [TypeExpr::Ellipsis, TypeExpr::none()]))
        );
        assert_eq!(
            p("Callable[[], int]"),
            Ok(TypeExpr::generic(Origin::Callable, [int()]))
        );
        assert!(matches!(p("Callable[int]"), Err(ParseError::Arity { .. })));
    }

    #[test]
    fn arity_and_name_errors() {
        assert!(matches!(p("List[int, str]"), Err(ParseError::Arity { got: 2, .. })));
        assert!(matches!(p("Dict[int]"), Err(ParseError::Arity { got: 1, .. })));
        assert!(matches!(p("Optional[int, str]"), Err(ParseError::Arity { .. })));
        assert_eq!(p("int[str]"), Err(ParseError::NotGeneric { name: "int".into() }));
        assert_eq!(p("Optional"), Err(ParseError::Bare { name: "Optional".into() }));
        assert_eq!(p("Widget"), Err(ParseError::UnknownName { pos: 0, name: "Widget".into() }));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(p("List[int"), Err(ParseError::UnexpectedEnd { expected: "',' or ']'" }));
        assert_eq!(
            p("int]"),
            Err(ParseError::Unexpected { pos: 3, expected: "end of input", found: "]".into() })
        );
        assert_eq!(p("List[int?]"), Err(ParseError::UnexpectedChar { pos: 8, ch: '?' }));
        assert_eq!(p(""), Err(ParseError::UnexpectedEnd { expected: "a type" }));
    }

    #[test]
    fn user_names_come_from_the_catalog() {
        let catalog = Catalog::new()
            .with_enum(EnumDef::new("Answer", [("YES", 1)]))
            .with_class("Point")
            .with_alias("UserId", int());
        assert_eq!(
            catalog.parse("Dict[UserId, Answer]"),
            Ok(TypeExpr::generic(
                Origin::Dict,
                [
                    TypeExpr::alias("UserId", int()),
                    TypeExpr::Plain(RuntimeType::Enum("Answer".into())),
                ]
            ))
        );
        assert_eq!(
            catalog.parse("Point"),
            Ok(TypeExpr::Plain(RuntimeType::Class("Point".into())))
        );
        assert!(matches!(catalog.parse("Point[int]"), Err(ParseError::NotGeneric { .. })));
        assert!(is_builtin("Optional") && !is_builtin("Point"));
    }
}
