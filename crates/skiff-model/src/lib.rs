//! Data model shared by the skiff engine and its service implementations.
//!
//! Documents mirror the wire shape of the container-scheduling API (camelCase JSON).
//! Fields the engine does not interpret are kept in `extra` maps so that templates and
//! service responses survive a round trip untouched.

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod definition;
pub use definition::*;

mod job;
pub use job::*;

mod request;
pub use request::*;
