//! Image reference resolution for manifold.
//!
//! A [`Resolver`] turns an [`ImageName`] into a (possibly pinned) [`ImageName`].
//! Two variants exist: [`IdentityResolver`], which returns references
//! unchanged, and [`RegistryResolver`], which pins tags to manifest digests via
//! a [`RegistryClient`]. Any resolver can be wrapped in a [`PolicyResolver`] to
//! decide whether a failure is ignored, logged, or reported.

pub mod registry;
pub mod resolver;

pub use registry::{HttpRegistryClient, RegistryClient, RegistryConfig};
pub use resolver::{
    build_resolver, FailureAction, IdentityResolver, PolicyResolver, RegistryResolver,
    ResolverKind,
};

use manifold_schema::{ImageName, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid image reference: {0}")]
    Image(#[from] SchemaError),
    #[error("registry HTTP error: {0}")]
    Http(String),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("registry authentication failed: {0}")]
    Auth(String),
    #[error("registry returned no digest for {0}")]
    MissingDigest(String),
    #[error("resolver config error: {0}")]
    Config(String),
}

/// Resolves or validates an image reference.
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;

    fn resolve(&self, image: &ImageName) -> Result<ImageName, ResolveError>;

    /// Parse `reference`, resolve it and render the result. A reference the
    /// resolver leaves unchanged is returned exactly as written.
    fn resolve_reference(&self, reference: &str) -> Result<String, ResolveError> {
        let image = ImageName::parse(reference)?;
        let resolved = self.resolve(&image)?;
        if resolved == image {
            Ok(reference.to_owned())
        } else {
            Ok(resolved.to_string())
        }
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn resolve(&self, image: &ImageName) -> Result<ImageName, ResolveError> {
        (**self).resolve(image)
    }

    fn resolve_reference(&self, reference: &str) -> Result<String, ResolveError> {
        (**self).resolve_reference(reference)
    }
}
