//! Schema documents: enums, aliases and classes declared in JSON, built into
//! type-validated classes.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::attach::define;
use crate::catalog::Catalog;
use crate::class::{field, Class, ClassDef, Instance};
use crate::codec::{DecodeError, Decoder};
use crate::error::AttachError;
use crate::parse::{self, ParseError};
use crate::validators::{self, Validator};
use crate::value::{EnumDef, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub enums: IndexMap<String, IndexMap<String, serde_json::Value>>,
    #[serde(default)]
    pub aliases: IndexMap<String, String>,
    #[serde(default)]
    pub classes: IndexMap<String, ClassDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDoc {
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDoc>,
}

/// A field is either just its type expression or a full declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDoc {
    Short(String),
    Full(FullFieldDoc),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FullFieldDoc {
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub validators: Vec<ValidatorDoc>,
    #[serde(default = "default_true")]
    pub placeholder: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorDoc {
    In(Vec<serde_json::Value>),
    MatchesRe(String),
    MinLen(serde_json::Number),
    MaxLen(serde_json::Number),
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("reading {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid schema document: {0}")]
    Syntax(#[from] crate::path_de::PathError),

    #[error("'{0}' is a builtin type name and cannot be redefined")]
    Reserved(String),

    #[error("'{0}' is declared more than once")]
    Duplicate(String),

    #[error("{owner}: {source}")]
    Parse { owner: String, source: ParseError },

    #[error("{class}: base '{base}' is not a class defined earlier in the document")]
    UnknownBase { class: String, base: String },

    #[error("{owner}: bad pattern: {source}")]
    Regex { owner: String, source: regex::Error },

    #[error("{owner}: {source}")]
    Decode { owner: String, source: DecodeError },

    #[error("{class}: {source}")]
    Attach { class: String, source: AttachError },

    #[error("{owner}: length bound must be a non-negative integer, got {got}")]
    Bound { owner: String, got: String },

    #[error("{class}.{field}: placeholder-less declaration needs a type")]
    MissingType { class: String, field: String },

    #[error("unknown class '{0}'")]
    UnknownClass(String),
}

/// The catalog of user names together with every finalized class.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub catalog: Catalog,
    pub classes: IndexMap<String, Arc<Class>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Model {
    pub fn load_str(src: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = crate::path_de::from_str_with_path(src)?;
        Self::build(&doc)
    }

    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|source| SchemaError::Io { path: path.display().to_string(), source })?;
        let doc: SchemaDocument = crate::path_de::from_slice_with_path(&bytes)?;
        Self::build(&doc)
    }

    /// Enums first, then every class name so fields can refer to classes
    /// declared later, then aliases in order, then the classes themselves.
    pub fn build(doc: &SchemaDocument) -> Result<Self, SchemaError> {
        let mut model = Model::default();
        let names = doc.enums.keys().chain(doc.aliases.keys()).chain(doc.classes.keys());
        let mut seen = std::collections::HashSet::new();
        for name in names {
            if parse::is_builtin(name) {
                return Err(SchemaError::Reserved(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        for (name, members) in &doc.enums {
            let decoder = model.decoder();
            let members = members
                .iter()
                .map(|(member, value)| {
                    let value = decoder
                        .decode(value)
                        .map_err(|source| SchemaError::Decode {
                            owner: format!("{name}.{member}"),
                            source,
                        })?;
                    Ok((member.clone(), value))
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            model.catalog.add_enum(EnumDef::new(name.clone(), members));
        }
        for name in doc.classes.keys() {
            model.catalog.add_class(name.clone());
        }
        for (name, target) in &doc.aliases {
            let target = model
                .catalog
                .parse(target)
                .map_err(|source| SchemaError::Parse { owner: name.clone(), source })?;
            model.catalog.add_alias(name.clone(), target);
        }
        for (name, class) in &doc.classes {
            let def = model.class_def(name, class)?;
            let class =
                define(def).map_err(|source| SchemaError::Attach { class: name.clone(), source })?;
            debug!(class = %name, "defined class from schema");
            model.classes.insert(name.clone(), class);
        }
        Ok(model)
    }

    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.catalog, &self.classes)
    }

    pub fn class(&self, name: &str) -> Result<&Arc<Class>, SchemaError> {
        self.classes.get(name).ok_or_else(|| SchemaError::UnknownClass(name.to_string()))
    }

    /// Decodes a JSON object of field values as an instance of `class`.
    pub fn instantiate(
        &self,
        class: &str,
        json: &serde_json::Value,
    ) -> Result<Instance, SchemaError> {
        let class = self.class(class)?;
        self.decoder()
            .instantiate(class, json)
            .map_err(|source| SchemaError::Decode { owner: class.name().to_string(), source })
    }

    fn class_def(&self, name: &str, doc: &ClassDoc) -> Result<ClassDef, SchemaError> {
        let mut def = ClassDef::new(name).frozen(doc.frozen);
        for base in &doc.bases {
            let base_class = self
                .classes
                .get(base)
                .ok_or_else(|| SchemaError::UnknownBase {
                    class: name.to_string(),
                    base: base.clone(),
                })?;
            def = def.base(Arc::clone(base_class));
        }

        for (field_name, field_doc) in &doc.fields {
            let owner = format!("{name}.{field_name}");
            let parse = |src: &str| {
                self.catalog
                    .parse(src)
                    .map_err(|source| SchemaError::Parse { owner: owner.clone(), source })
            };
            def = match field_doc {
                FieldDoc::Short(ty) => def.field(field_name, parse(ty.as_str())?, field()),
                FieldDoc::Full(full) => {
                    let ty = full.ty.as_deref().map(parse).transpose()?;
                    let default = full
                        .default
                        .as_ref()
                        .map(|json| self.decoder().decode(json))
                        .transpose()
                        .map_err(|source| SchemaError::Decode { owner: owner.clone(), source })?;

                    if !full.placeholder {
                        match (ty, default) {
                            (ty, Some(value)) => def.constant(field_name, ty, value),
                            (Some(ty), None) => def.annotation(field_name, ty),
                            (None, None) => {
                                return Err(SchemaError::MissingType {
                                    class: name.to_string(),
                                    field: field_name.clone(),
                                });
                            }
                        }
                    } else {
                        let mut placeholder = field();
                        for validator in &full.validators {
                            let validator = self.validator(&owner, validator)?;
                            placeholder = placeholder.with_validator(validator);
                        }
                        if let Some(value) = default {
                            placeholder = placeholder.with_default(value);
                        }
                        match ty {
                            Some(ty) => def.field(field_name, ty, placeholder),
                            None => def.untyped_field(field_name, placeholder),
                        }
                    }
                }
            };
        }
        Ok(def)
    }

    fn validator(&self, owner: &str, doc: &ValidatorDoc) -> Result<Validator, SchemaError> {
        let validator = match doc {
            ValidatorDoc::In(options) => {
                let decoder = self.decoder();
                let options = options
                    .iter()
                    .map(|o| decoder.decode(o))
                    .collect::<Result<Vec<Value>, _>>()
                    .map_err(|source| SchemaError::Decode { owner: owner.to_string(), source })?;
                validators::in_(options)
            }
            ValidatorDoc::MatchesRe(pattern) => validators::matches_re(pattern)
                .map_err(|source| SchemaError::Regex { owner: owner.to_string(), source })?,
            ValidatorDoc::MinLen(bound) => validators::min_len(length_bound(owner, bound)?),
            ValidatorDoc::MaxLen(bound) => validators::max_len(length_bound(owner, bound)?),
        };
        Ok(validator)
    }
}

fn length_bound(owner: &str, bound: &serde_json::Number) -> Result<usize, SchemaError> {
    bound
        .as_u64()
        .and_then(|b| usize::try_from(b).ok())
        .ok_or_else(|| SchemaError::Bound { owner: owner.to_string(), got: bound.to_string() })
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
