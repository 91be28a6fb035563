//! Container image references as they appear in pod specs.

use crate::SchemaError;
use std::fmt;

/// Registry host used when a reference names none.
pub const DEFAULT_REGISTRY: &str = "registry-1.docker.io";

const DEFAULT_TAG: &str = "latest";
const MAX_TAG_LEN: usize = 128;

/// A parsed image reference: `[host/]repository[:tag][@digest]`.
///
/// The registry and repository keep the spelling they were written with, so an
/// unresolved reference renders back unchanged. [`ImageName::registry_host`] and
/// [`ImageName::remote_repository`] give the defaulted forms a registry expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageName {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageName {
    pub fn parse(reference: &str) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidImage {
            reference: reference.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("reference is empty"));
        }

        let (name, digest) = match trimmed.split_once('@') {
            Some((name, digest)) => {
                validate_digest(digest).map_err(invalid)?;
                (name, Some(digest.to_owned()))
            }
            None => (trimmed, None),
        };

        let (name, tag) = match name.rfind(':') {
            Some(i) if !name[i + 1..].contains('/') => (&name[..i], Some(&name[i + 1..])),
            _ => (name, None),
        };
        if let Some(tag) = tag {
            validate_tag(tag).map_err(invalid)?;
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => (Some(first), rest),
            _ => (None, name),
        };
        validate_repository(repository).map_err(invalid)?;

        Ok(Self {
            registry: registry.map(str::to_owned),
            repository: repository.to_owned(),
            tag: tag.map(str::to_owned),
            digest,
        })
    }

    pub fn registry_host(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// Repository path as the registry API expects it. Official Docker Hub
    /// images live under `library/`.
    pub fn remote_repository(&self) -> String {
        let docker_hub = self.registry.is_none()
            || self.registry.as_deref() == Some(DEFAULT_REGISTRY)
            || self.registry.as_deref() == Some("docker.io");
        if docker_hub && !self.repository.contains('/') {
            format!("library/{}", self.repository)
        } else {
            self.repository.clone()
        }
    }

    pub fn tag_or_default(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    pub fn is_pinned(&self) -> bool {
        self.digest.is_some()
    }

    /// Return a copy pinned to `digest`. The tag is dropped; the digest
    /// replaces it.
    #[must_use]
    pub fn pinned(&self, digest: impl Into<String>) -> Self {
        Self {
            tag: None,
            digest: Some(digest.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{registry}/")?;
        }
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ImageName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_repository(repository: &str) -> Result<(), &'static str> {
    if repository.is_empty() {
        return Err("repository is empty");
    }
    if repository.split('/').any(str::is_empty) {
        return Err("repository has an empty path component");
    }
    let allowed = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-' | '/')
    };
    if !repository.chars().all(allowed) {
        return Err("repository must be lowercase alphanumerics separated by '.', '_', '-' or '/'");
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), &'static str> {
    if tag.is_empty() {
        return Err("tag is empty");
    }
    if tag.len() > MAX_TAG_LEN {
        return Err("tag is longer than 128 characters");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("tag contains invalid characters");
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), &'static str> {
    let Some((algorithm, hex)) = digest.split_once(':') else {
        return Err("digest must be '<algorithm>:<hex>'");
    };
    if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("digest algorithm is invalid");
    }
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("digest value must be hexadecimal");
    }
    Ok(())
}
