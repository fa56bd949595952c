//! S3 wire model for the davgate gateway.
//!
//! This crate defines the protocol-level vocabulary shared by the HTTP layer
//! and the translation backend:
//!
//! - [`S3Operation`]: the set of S3 operations the gateway serves.
//! - [`error::S3Error`] / [`error::S3ErrorCode`]: domain errors with their
//!   wire codes and HTTP status mapping.
//! - [`types`]: bucket/object/listing entities as they appear in responses.
//! - [`input`] / [`output`]: typed parameters and results for each operation.
//!
//! The model is deliberately small: the gateway speaks the classic
//! 2006-03-01 S3 dialect (bucket CRUD, object CRUD, list v1/v2, multi-delete)
//! and nothing else.

// S3Error is used pervasively as Result<T, S3Error>; boxing it everywhere
// would add indirection on the hot path for negligible benefit.
#![allow(clippy::result_large_err)]

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;
