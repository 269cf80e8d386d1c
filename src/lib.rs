//! Derives runtime validators from field type annotations and attaches them
//! to class definitions before they are finalized.
//!
//! ```
//! use type_validate::{define, field, ClassDef, Catalog, Value};
//!
//! let catalog = Catalog::new();
//! let def = ClassDef::new("X")
//!     .field("a", catalog.parse("Optional[int]").unwrap(), field())
//!     .field("b", catalog.parse("Sequence[float]").unwrap(), field());
//! let x = define(def).unwrap();
//!
//! assert!(x.call([Value::None, Value::list([Value::float(2.2)])]).is_ok());
//! assert!(x.call([Value::None, Value::list([Value::Int(2)])]).is_err());
//! ```
pub mod attach;
pub mod catalog;
pub mod class;
pub mod classify;
pub mod cli;
pub mod codec;
pub mod compile;
pub mod error;
pub mod parse;
pub mod path_de;
pub mod prefilter;
pub mod schema;
pub mod types;
pub mod validators;
pub mod value;

pub use attach::{define, type_validate};
pub use catalog::Catalog;
pub use class::{field, Class, ClassDef, Instance};
pub use classify::{classify, Shape};
pub use compile::compile;
pub use error::{AttachError, ConfigurationError, EnvironmentError, InstanceError, ValidationError};
pub use schema::Model;
pub use types::{Origin, RuntimeType, TypeExpr};
pub use validators::Validator;
pub use value::{EnumDef, Value};
