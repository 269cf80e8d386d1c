//! Names the type DSL can refer to beyond the builtins: user enums, user
//! classes, and aliases.

use indexmap::{IndexMap, IndexSet};

use crate::parse::{self, ParseError};
use crate::types::{RuntimeType, TypeExpr};
use crate::value::EnumDef;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    enums: IndexMap<String, EnumDef>,
    aliases: IndexMap<String, TypeExpr>,
    classes: IndexSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.add_enum(def);
        self
    }

    pub fn with_alias(mut self, name: impl Into<String>, target: TypeExpr) -> Self {
        self.add_alias(name, target);
        self
    }

    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.add_class(name);
        self
    }

    pub fn add_enum(&mut self, def: EnumDef) {
        self.enums.insert(def.name().to_string(), def);
    }

    /// Registers `name` as an alias of `target`. Targets are resolved when
    /// parsed, so an alias can only refer to names registered before it.
    pub fn add_alias(&mut self, name: impl Into<String>, target: TypeExpr) {
        self.aliases.insert(name.into(), target);
    }

    pub fn add_class(&mut self, name: impl Into<String>) {
        self.classes.insert(name.into());
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// The type expression a user-defined name stands for.
    pub fn resolve(&self, name: &str) -> Option<TypeExpr> {
        if let Some(target) = self.aliases.get(name) {
            return Some(TypeExpr::alias(name, target.clone()));
        }
        if self.enums.contains_key(name) {
            return Some(TypeExpr::Plain(RuntimeType::Enum(name.to_string())));
        }
        if self.classes.contains(name) {
            return Some(TypeExpr::Plain(RuntimeType::Class(name.to_string())));
        }
        None
    }

    pub fn parse(&self, src: &str) -> Result<TypeExpr, ParseError> {
        parse::parse(src, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_shadow_other_names() {
        let catalog = Catalog::new()
            .with_class("Point")
            .with_alias("Point", TypeExpr::Plain(RuntimeType::Tuple));
        assert_eq!(
            catalog.resolve("Point"),
            Some(TypeExpr::alias("Point", TypeExpr::Plain(RuntimeType::Tuple)))
        );
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let catalog = Catalog::new().with_enum(EnumDef::new("Answer", [("YES", 1)]));
        assert!(catalog.resolve("Answer").is_some());
        assert!(catalog.enum_def("Answer").is_some());
        assert_eq!(catalog.resolve("Question"), None);
    }
}
