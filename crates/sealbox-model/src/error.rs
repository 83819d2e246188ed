//! The closed error set of the service.
//!
//! Everything that crosses a module boundary collapses into one of
//! these variants. Crypto, codec and reconstruction failures all
//! surface as [`Error::Internal`]; authentication and authorization
//! failures collapse to [`Error::Unauthorized`] with no per-cause
//! detail.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("input validation error")]
    InputValidation,

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad configuration: {0}")]
    BadConfig(String),

    #[error("internal error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, Error>;
