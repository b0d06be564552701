//! Series schema subsystem
//!
//! Holds the type model for point values and the series registry that
//! recovery consults while replaying insert operations.

mod errors;
mod registry;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use registry::{SchemaProvider, SchemaRegistry};
pub use types::{DataType, FieldValue};
