//! The typed attribute model.
//!
//! In-memory representation of SCIM resources: [`ScimObject`] (one resource
//! instance), [`ScimAttribute`] (descriptor plus values), and [`ScimValue`]
//! (primitive or complex). Constructors enforce the data-model invariants so
//! that an object that exists is an object that validates.

pub mod attribute;
pub mod meta;
pub mod object;
pub mod value;

pub use attribute::{ScimAttribute, plural_element};
pub use meta::Meta;
pub use object::ScimObject;
pub use value::{ComplexValue, ScimValue};
