//! API handlers, one module per resource.

pub mod login;
pub mod namespaces;
pub mod policies;
pub mod secrets;
pub mod users;
