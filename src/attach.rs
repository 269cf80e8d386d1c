//! Attachment: derive a validator from each annotated field of a class under
//! preparation and merge it into the field's placeholder.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::class::{field, Class, ClassDef, Instance};
use crate::compile::compile;
use crate::error::{AttachError, ConfigurationError, EnvironmentError};
use crate::types::{RuntimeType, TypeExpr};
use crate::validators::{self, Validator};
use crate::value::Value;

/// Whatever a caller hands to `type_validate`. Only a definition that has
/// not been finalized is accepted.
#[derive(Debug, Clone)]
pub enum Target {
    Definition(ClassDef),
    Class(Arc<Class>),
    Value(Value),
}

impl From<ClassDef> for Target {
    fn from(def: ClassDef) -> Self {
        Self::Definition(def)
    }
}

impl From<Arc<Class>> for Target {
    fn from(class: Arc<Class>) -> Self {
        Self::Class(class)
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Instance> for Target {
    fn from(instance: Instance) -> Self {
        Self::Value(Value::Object(instance))
    }
}

/// Attaches a type-derived validator to every field that has both an
/// annotation and a placeholder, and hands the definition back.
///
/// Must run before finalization: a finalized class no longer has writable
/// placeholders.
pub fn type_validate(target: impl Into<Target>) -> Result<ClassDef, AttachError> {
    let mut def = match target.into() {
        Target::Definition(def) => def,
        Target::Class(class) => {
            let class = class.name().to_string();
            return Err(ConfigurationError::AlreadyFinalized { class }.into());
        }
        Target::Value(value) => {
            return Err(ConfigurationError::NotAClass { got: value.type_name() }.into());
        }
    };
    check_environment()?;
    attach(&mut def);
    Ok(def)
}

/// `type_validate` followed by finalization.
pub fn define(target: impl Into<Target>) -> Result<Arc<Class>, AttachError> {
    Ok(type_validate(target)?.finalize())
}

impl ClassDef {
    /// Builder form of `type_validate` for code that already holds a
    /// definition.
    pub fn type_validated(self) -> Result<Self, AttachError> {
        type_validate(self)
    }
}

fn attach(def: &mut ClassDef) {
    let class = def.name().to_string();
    for (name, decl) in def.declarations_mut() {
        let Some((annotation, placeholder)) = decl.annotated_placeholder_mut() else {
            continue;
        };
        let Some(derived) = compile(annotation) else {
            debug!(%class, field = name, %annotation, "annotation has no runtime validator");
            continue;
        };
        debug!(%class, field = name, validator = %derived, "attaching type validator");
        let merged = merge(placeholder.take_validator(), derived);
        placeholder.set_validator(Some(merged));
    }
}

/// Declared validators keep their order; the derived one runs last.
fn merge(existing: Option<Validator>, derived: Validator) -> Validator {
    let mut chain = match existing {
        None => Vec::new(),
        Some(Validator::And(declared)) => declared,
        Some(declared) => vec![declared],
    };
    chain.push(derived);
    match chain.len() {
        1 => chain.remove(0),
        _ => Validator::And(chain),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENVIRONMENT CHECK
// ————————————————————————————————————————————————————————————————————————————

static ENVIRONMENT: Lazy<Result<(), EnvironmentError>> = Lazy::new(check_placeholders);

fn check_environment() -> Result<(), EnvironmentError> {
    ENVIRONMENT.clone()
}

/// Declares a throwaway class and checks that its placeholder is seen as
/// one and that its validator slot round-trips.
fn check_placeholders() -> Result<(), EnvironmentError> {
    let mut def =
        ClassDef::new("_EnvCheck").field("blah", TypeExpr::Plain(RuntimeType::Int), field());
    let (_, placeholder) = def
        .declarations_mut()
        .find_map(|(_, decl)| decl.annotated_placeholder_mut())
        .ok_or_else(|| {
            EnvironmentError::PlaceholderCheck("declared field is not a placeholder".into())
        })?;
    if placeholder.validator().is_some() {
        let message = "fresh placeholder already has a validator";
        return Err(EnvironmentError::PlaceholderCheck(message.into()));
    }
    let marker = validators::instance_of(RuntimeType::Int);
    placeholder.set_validator(Some(marker.clone()));
    if placeholder.validator() != Some(&marker) {
        return Err(EnvironmentError::PlaceholderCheck("validator slot does not round-trip".into()));
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
