//! Class model: definitions under preparation, finalized classes, and the
//! instances whose construction and mutation run field validators.
//!
//! A `ClassDef` is the class body before finalization. Each declared name
//! may carry an annotation and a value; a `FieldPlaceholder` value marks it
//! as a field. `ClassDef::finalize` turns placeholders into immutable
//! `Field`s, after which no validator can be attached.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::InstanceError;
use crate::types::TypeExpr;
use crate::validators::{self, FieldContext, Validator};
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// PREPARATION
// ————————————————————————————————————————————————————————————————————————————

/// A field declaration that has not been finalized yet. Its validator slot
/// stays writable until `ClassDef::finalize` consumes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPlaceholder {
    validator: Option<Validator>,
    default: Option<Value>,
}

/// Declares a field.
pub fn field() -> FieldPlaceholder {
    FieldPlaceholder { validator: None, default: None }
}

impl FieldPlaceholder {
    /// Adds `validator` after any validator already declared.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validators::and(self.validator.take().into_iter().chain([validator]));
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn set_validator(&mut self, validator: Option<Validator>) {
        self.validator = validator;
    }

    pub fn take_validator(&mut self) -> Option<Validator> {
        self.validator.take()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// What a name in the class body is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Placeholder(FieldPlaceholder),
    /// A plain class attribute; never a field.
    Constant(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    annotation: Option<TypeExpr>,
    binding: Option<Binding>,
}

impl Declaration {
    pub fn annotation(&self) -> Option<&TypeExpr> {
        self.annotation.as_ref()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn placeholder(&self) -> Option<&FieldPlaceholder> {
        match &self.binding {
            Some(Binding::Placeholder(placeholder)) => Some(placeholder),
            _ => None,
        }
    }

    /// The annotation together with the writable placeholder, when the
    /// declaration has both.
    pub fn annotated_placeholder_mut(&mut self) -> Option<(&TypeExpr, &mut FieldPlaceholder)> {
        match (&self.annotation, &mut self.binding) {
            (Some(annotation), Some(Binding::Placeholder(placeholder))) => {
                Some((annotation, placeholder))
            }
            _ => None,
        }
    }
}

/// A class body under preparation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    name: String,
    bases: Vec<Arc<Class>>,
    frozen: bool,
    body: IndexMap<String, Declaration>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bases: Vec::new(), frozen: false, body: IndexMap::new() }
    }

    pub fn base(mut self, base: Arc<Class>) -> Self {
        self.bases.push(base);
        self
    }

    pub fn frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    /// `name: ty = field()`
    pub fn field(
        self,
        name: impl Into<String>,
        ty: TypeExpr,
        placeholder: FieldPlaceholder,
    ) -> Self {
        self.declare(name, Some(ty), Some(Binding::Placeholder(placeholder)))
    }

    /// `name = field()`, with no annotation.
    pub fn untyped_field(self, name: impl Into<String>, placeholder: FieldPlaceholder) -> Self {
        self.declare(name, None, Some(Binding::Placeholder(placeholder)))
    }

    /// `name: ty = value`, a class attribute rather than a field.
    pub fn constant(
        self,
        name: impl Into<String>,
        ty: Option<TypeExpr>,
        value: impl Into<Value>,
    ) -> Self {
        self.declare(name, ty, Some(Binding::Constant(value.into())))
    }

    /// `name: ty`, an annotation with no binding.
    pub fn annotation(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.declare(name, Some(ty), None)
    }

    fn declare(
        mut self,
        name: impl Into<String>,
        annotation: Option<TypeExpr>,
        binding: Option<Binding>,
    ) -> Self {
        self.body.insert(name.into(), Declaration { annotation, binding });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.body.get(name)
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&str, &Declaration)> {
        self.body.iter().map(|(name, decl)| (name.as_str(), decl))
    }

    pub fn declarations_mut(&mut self) -> impl Iterator<Item = (&str, &mut Declaration)> {
        self.body.iter_mut().map(|(name, decl)| (name.as_str(), decl))
    }

    /// Freezes the definition into a class. Inherited fields come first, in
    /// base order, unless the body declares a field of the same name.
    pub fn finalize(self) -> Arc<Class> {
        let mut mro = vec![self.name.clone()];
        for base in &self.bases {
            for name in &base.mro {
                if !mro.contains(name) {
                    mro.push(name.clone());
                }
            }
        }

        let mut fields: IndexMap<String, Field> = IndexMap::new();
        for base in &self.bases {
            for inherited in &base.fields {
                let redeclared = self
                    .body
                    .get(&inherited.name)
                    .is_some_and(|decl| decl.placeholder().is_some());
                if !redeclared && !fields.contains_key(&inherited.name) {
                    fields.insert(inherited.name.clone(), inherited.clone());
                }
            }
        }

        let mut constants = IndexMap::new();
        for (name, decl) in self.body {
            match decl.binding {
                Some(Binding::Placeholder(placeholder)) => {
                    let field = Field {
                        name: name.clone(),
                        annotation: decl.annotation,
                        validator: placeholder.validator,
                        default: placeholder.default,
                    };
                    fields.insert(name, field);
                }
                Some(Binding::Constant(value)) => {
                    constants.insert(name, value);
                }
                None => {}
            }
        }

        debug!(class = %self.name, fields = fields.len(), "finalized class");
        Arc::new(Class {
            name: self.name,
            mro,
            frozen: self.frozen,
            fields: fields.into_values().collect(),
            constants,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FINALIZED CLASSES
// ————————————————————————————————————————————————————————————————————————————

/// An immutable field of a finalized class.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    annotation: Option<TypeExpr>,
    validator: Option<Validator>,
    default: Option<Value>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(&self) -> Option<&TypeExpr> {
        self.annotation.as_ref()
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn check(&self, class: &str, value: &Value) -> Result<(), InstanceError> {
        if let Some(validator) = &self.validator {
            validator.validate(&FieldContext::new(class, &self.name), value)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct Class {
    name: String,
    /// This class followed by its ancestors.
    mro: Vec<String>,
    frozen: bool,
    fields: Vec<Field>,
    constants: IndexMap<String, Value>,
}

impl Class {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.mro.iter().any(|n| n == name)
    }

    /// Builds an instance from keyword arguments. Missing fields take their
    /// default; every field validator runs in declaration order.
    pub fn construct<I, K>(self: &Arc<Self>, args: I) -> Result<Instance, InstanceError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut args: IndexMap<String, Value> =
            args.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if let Some(unknown) = args.keys().find(|k| self.field(k).is_none()) {
            return Err(InstanceError::UnknownField {
                class: self.name.clone(),
                field: unknown.clone(),
            });
        }

        let mut attrs = IndexMap::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match args.shift_remove(&field.name) {
                Some(value) => value,
                None => field.default.clone().ok_or_else(|| InstanceError::MissingField {
                    class: self.name.clone(),
                    field: field.name.clone(),
                })?,
            };
            attrs.insert(field.name.clone(), value);
        }
        for field in &self.fields {
            field.check(&self.name, &attrs[&field.name])?;
        }
        Ok(Instance { class: Arc::clone(self), attrs })
    }

    /// Builds an instance from positional arguments, in field order.
    pub fn call(
        self: &Arc<Self>,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Instance, InstanceError> {
        let args: Vec<Value> = args.into_iter().collect();
        if args.len() > self.fields.len() {
            return Err(InstanceError::TooManyArguments {
                class: self.name.clone(),
                expected: self.fields.len(),
                got: args.len(),
            });
        }
        let named: Vec<(String, Value)> =
            self.fields.iter().map(|f| f.name.clone()).zip(args).collect();
        self.construct(named)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INSTANCES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct Instance {
    class: Arc<Class>,
    attrs: IndexMap<String, Value>,
}

impl Instance {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Assigns a field, running its validator first. The instance is left
    /// untouched if validation fails.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), InstanceError> {
        let Some(field) = self.class.field(name) else {
            return Err(InstanceError::UnknownField {
                class: self.class.name.clone(),
                field: name.to_string(),
            });
        };
        if self.class.frozen {
            return Err(InstanceError::Frozen {
                class: self.class.name.clone(),
                field: name.to_string(),
            });
        }
        field.check(&self.class.name, &value)?;
        self.attrs.insert(name.to_string(), value);
        Ok(())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.class.name == other.class.name && self.attrs == other.attrs
    }
}

impl Eq for Instance {}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.class.name)?;
        for (i, (name, value)) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuntimeType;
    use crate::validators::{instance_of, min_len};

    fn point() -> Arc<Class> {
        ClassDef::new("Point")
            .field(
                "x",
                TypeExpr::Plain(RuntimeType::Int),
                field().with_validator(instance_of(RuntimeType::Int)),
            )
            .field("y", TypeExpr::Plain(RuntimeType::Int), field().with_default(0))
            .constant("ORIGIN", None, "origin")
            .annotation("label", TypeExpr::Plain(RuntimeType::Str))
            .finalize()
    }

    #[test]
    fn finalize_keeps_only_placeholders_as_fields() {
        let class = point();
        let names: Vec<_> = class.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(class.constant("ORIGIN"), Some(&Value::str("origin")));
        assert!(class.field("label").is_none());
    }

    #[test]
    fn construct_uses_defaults_and_validators() {
        let class = point();
        let p = class.construct([("x", Value::Int(3))]).unwrap();
        assert_eq!(p.get("y"), Some(&Value::Int(0)));
        assert_eq!(p.to_string(), "Point(x=3, y=0)");

        assert!(matches!(
            class.construct([("x", Value::str("3"))]),
            Err(InstanceError::Invalid(_))
        ));
        assert!(matches!(
            class.construct(Vec::<(String, Value)>::new()),
            Err(InstanceError::MissingField { .. })
        ));
        assert!(matches!(
            class.construct([("x", Value::Int(1)), ("z", Value::Int(2))]),
            Err(InstanceError::UnknownField { .. })
        ));
    }

    #[test]
    fn positional_call() {
        let class = point();
        assert!(class.call([Value::Int(1), Value::Int(2)]).is_ok());
        assert!(matches!(
            class.call([Value::Int(1), Value::Int(2), Value::Int(3)]),
            Err(InstanceError::TooManyArguments { expected: 2, got: 3, .. })
        ));
    }

    #[test]
    fn set_revalidates_and_respects_frozen() {
        let class = point();
        let mut p = class.call([Value::Int(1)]).unwrap();
        assert!(p.set("x", Value::Int(5)).is_ok());
        assert!(p.set("x", Value::str("five")).is_err());
        assert_eq!(p.get("x"), Some(&Value::Int(5)));

        let frozen = ClassDef::new("Frozen").frozen(true).untyped_field("a", field()).finalize();
        let mut f = frozen.call([Value::None]).unwrap();
        assert!(matches!(f.set("a", Value::Int(1)), Err(InstanceError::Frozen { .. })));
    }

    #[test]
    fn fresh_placeholders_are_empty() {
        let placeholder = field();
        assert_eq!(placeholder.validator(), None);
        assert_eq!(placeholder.default(), None);
        assert_eq!(placeholder, <FieldPlaceholder as Default>::default());
    }

    #[test]
    fn only_a_redeclared_field_replaces_an_inherited_one() {
        let base = point();
        let sub = ClassDef::new("Labelled")
            .base(Arc::clone(&base))
            .constant("x", None, 10)
            .annotation("y", TypeExpr::Plain(RuntimeType::Str))
            .finalize();
        let names: Vec<_> = sub.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(sub.field("x"), base.field("x"));
        assert_eq!(sub.constant("x"), Some(&Value::Int(10)));

        let replaced = ClassDef::new("Shadow")
            .base(Arc::clone(&base))
            .field("x", TypeExpr::Plain(RuntimeType::Str), field())
            .finalize();
        assert_eq!(replaced.fields().len(), 2);
        assert_eq!(replaced.field("x").and_then(Field::validator), None);
        assert!(replaced.call([Value::str("any")]).is_ok());
    }

    #[test]
    fn with_validator_accumulates_by_and() {
        let placeholder =
            field().with_validator(instance_of(RuntimeType::Str)).with_validator(min_len(1));
        assert_eq!(
            placeholder.validator(),
            Some(&Validator::And(vec![instance_of(RuntimeType::Str), min_len(1)]))
        );
    }

    #[test]
    fn subclasses_inherit_fields_and_pass_instance_checks() {
        let base = point();
        let sub = ClassDef::new("Point3")
            .base(Arc::clone(&base))
            .field("z", TypeExpr::Plain(RuntimeType::Int), field().with_default(0))
            .finalize();
        let names: Vec<_> = sub.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["x", "y", "z"]);

        let p = sub.call([Value::Int(1)]).unwrap();
        let value = Value::Object(p);
        assert!(value.is_instance(&RuntimeType::Class("Point".into())));
        assert!(value.is_instance(&RuntimeType::Class("Point3".into())));
        assert!(!value.is_instance(&RuntimeType::Class("Other".into())));
    }
}
