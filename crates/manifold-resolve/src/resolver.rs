use crate::registry::{HttpRegistryClient, RegistryClient, RegistryConfig};
use crate::{ResolveError, Resolver};
use manifold_schema::ImageName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Which resolver backs image resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Leave references untouched.
    #[default]
    #[serde(alias = "noop")]
    None,
    /// Pin tags to digests by asking the image registry.
    Registry,
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "noop" => Ok(Self::None),
            "registry" => Ok(Self::Registry),
            other => Err(format!(
                "unknown resolver '{other}', expected 'none' or 'registry'"
            )),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Registry => f.write_str("registry"),
        }
    }
}

/// What happens when a resolver fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureAction {
    /// Keep the original reference silently.
    #[default]
    Ignore,
    /// Log the failure and keep the original reference.
    Warn,
    /// Propagate the failure, aborting the surrounding read.
    Report,
}

impl FromStr for FailureAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "report" | "error" => Ok(Self::Report),
            other => Err(format!(
                "unknown resolver failure action '{other}', expected 'ignore', 'warn' or 'report'"
            )),
        }
    }
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str("ignore"),
            Self::Warn => f.write_str("warn"),
            Self::Report => f.write_str("report"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl Resolver for IdentityResolver {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn resolve(&self, image: &ImageName) -> Result<ImageName, ResolveError> {
        Ok(image.clone())
    }

    /// Never parses, so any string passes through.
    fn resolve_reference(&self, reference: &str) -> Result<String, ResolveError> {
        Ok(reference.to_owned())
    }
}

/// Pins image tags to the manifest digest the registry reports.
pub struct RegistryResolver<C> {
    client: C,
}

impl<C: RegistryClient> RegistryResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: RegistryClient> Resolver for RegistryResolver<C> {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn resolve(&self, image: &ImageName) -> Result<ImageName, ResolveError> {
        if image.is_pinned() {
            return Ok(image.clone());
        }
        let digest = self.client.lookup(
            image.registry_host(),
            &image.remote_repository(),
            image.tag_or_default(),
        )?;
        debug!("resolved {image} to {digest}");
        Ok(image.pinned(digest))
    }
}

/// Applies a [`FailureAction`] to whatever the inner resolver returns.
pub struct PolicyResolver<R> {
    inner: R,
    action: FailureAction,
}

impl<R: Resolver> PolicyResolver<R> {
    pub fn new(inner: R, action: FailureAction) -> Self {
        Self { inner, action }
    }

    pub fn action(&self) -> FailureAction {
        self.action
    }

    fn absorb(&self, reference: &str, err: ResolveError) -> Result<(), ResolveError> {
        match self.action {
            FailureAction::Ignore => {
                debug!("ignoring resolver failure for {reference}: {err}");
                Ok(())
            }
            FailureAction::Warn => {
                warn!("failed to resolve image {reference}: {err}");
                Ok(())
            }
            FailureAction::Report => Err(err),
        }
    }
}

impl<R: Resolver> Resolver for PolicyResolver<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn resolve(&self, image: &ImageName) -> Result<ImageName, ResolveError> {
        match self.inner.resolve(image) {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                self.absorb(&image.to_string(), e)?;
                Ok(image.clone())
            }
        }
    }

    /// Unparseable references are failures too and go through the policy.
    fn resolve_reference(&self, reference: &str) -> Result<String, ResolveError> {
        match self.inner.resolve_reference(reference) {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                self.absorb(reference, e)?;
                Ok(reference.to_owned())
            }
        }
    }
}

/// Build the resolver selected by `kind`, wrapped in the `action` policy.
pub fn build_resolver(
    kind: ResolverKind,
    action: FailureAction,
    registry: &RegistryConfig,
) -> Box<dyn Resolver> {
    match kind {
        ResolverKind::None => Box::new(PolicyResolver::new(IdentityResolver, action)),
        ResolverKind::Registry => Box::new(PolicyResolver::new(
            RegistryResolver::new(HttpRegistryClient::new(registry.clone())),
            action,
        )),
    }
}
