//! Domain model shared by every sealbox crate: the entities of the
//! hierarchical namespace, the wire DTOs, the request context and the
//! closed error taxonomy.

pub mod context;
pub mod error;
pub mod types;
pub mod validate;

pub use context::RequestContext;
pub use error::{Error, Result};
pub use types::*;
