//! Data model for manifold.
//!
//! This crate defines the shapes every other layer agrees on: the Value model
//! (`serde_json::Value` plus [`ValueKind`] and the resource-shape test),
//! breadcrumb paths locating a node inside a decoded tree ([`Breadcrumb`]),
//! the identity tuple used for duplicate detection ([`ObjectIdentity`]),
//! provenance annotations ([`ProvenanceKeys`], [`Provenance`]) and container
//! image references ([`ImageName`]). Nothing here performs I/O.

pub mod identity;
pub mod image;
pub mod path;
pub mod provenance;
pub mod value;

pub use identity::{metadata_str, ObjectIdentity};
pub use image::{ImageName, DEFAULT_REGISTRY};
pub use path::{Breadcrumb, Segment};
pub use provenance::{Provenance, ProvenanceKeys, DEFAULT_FILE_KEY, DEFAULT_PATH_KEY};
pub use value::{is_resource, ValueKind};

/// Re-exported so downstream crates name one Value type.
pub use serde_json::{Map, Value};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid image reference '{reference}': {reason}")]
    InvalidImage { reference: String, reason: String },
}
