//! S3 RestXml handling for the davgate gateway.
//!
//! Serialization ([`serialize`]) turns typed outputs into S3-compatible XML
//! documents in the `http://s3.amazonaws.com/doc/2006-03-01/` namespace using
//! `quick-xml` writer events. Deserialization ([`deserialize`]) parses the
//! one XML request body the gateway accepts: the `<Delete>` document of a
//! multi-object delete.

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::parse_delete_request;
pub use error::XmlError;
pub use serialize::{error_document, to_xml, S3Serialize};
