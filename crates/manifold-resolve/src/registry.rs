use crate::ResolveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest media types accepted when asking for a digest. Index types come
/// first so multi-arch images resolve to the index digest.
const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.oci.image.manifest.v1+json, \
application/vnd.docker.distribution.manifest.v2+json";

const DIGEST_HEADER: &str = "docker-content-digest";

/// Looks up the digest a registry currently serves for `repository:reference`.
pub trait RegistryClient: Send + Sync {
    fn lookup(&self, host: &str, repository: &str, reference: &str)
        -> Result<String, ResolveError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry hosts spoken to over plain HTTP.
    pub insecure_hosts: Vec<String>,
    /// Bearer token sent on the first request to every registry.
    pub auth_token: Option<String>,
}

impl RegistryConfig {
    #[must_use]
    pub fn with_insecure_host(mut self, host: &str) -> Self {
        self.insecure_hosts.push(host.to_owned());
        self
    }
}

/// Blocking client for the OCI distribution API.
///
/// Issues `HEAD /v2/<repository>/manifests/<reference>` and reads the
/// `Docker-Content-Digest` header. A `401` carrying a `Bearer` challenge is
/// answered once with an anonymous pull token from the advertised realm.
pub struct HttpRegistryClient {
    config: RegistryConfig,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl HttpRegistryClient {
    pub fn new(config: RegistryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    fn api_host(host: &str) -> &str {
        if host == "docker.io" || host == "index.docker.io" {
            manifold_schema::DEFAULT_REGISTRY
        } else {
            host
        }
    }

    fn scheme(&self, host: &str) -> &'static str {
        if self.config.insecure_hosts.iter().any(|h| h == host) {
            "http"
        } else {
            "https"
        }
    }

    fn manifest_url(&self, host: &str, repository: &str, reference: &str) -> String {
        let host = Self::api_host(host);
        format!(
            "{}://{host}/v2/{repository}/manifests/{reference}",
            self.scheme(host)
        )
    }

    fn head(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<ureq::http::Response<ureq::Body>, ResolveError> {
        let mut req = self.agent.head(url).header("Accept", MANIFEST_ACCEPT);
        if let Some(token) = token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        req.call().map_err(|e| ResolveError::Http(format!("HEAD {url}: {e}")))
    }

    fn fetch_token(&self, challenge: &str, repository: &str) -> Result<String, ResolveError> {
        let params = parse_bearer_challenge(challenge).ok_or_else(|| {
            ResolveError::Auth(format!("unsupported authentication challenge: {challenge}"))
        })?;
        let realm = params
            .get("realm")
            .ok_or_else(|| ResolveError::Auth(format!("challenge has no realm: {challenge}")))?;
        let scope = params
            .get("scope")
            .cloned()
            .unwrap_or_else(|| format!("repository:{repository}:pull"));

        tracing::debug!("GET {realm} (scope {scope})");
        let mut req = self.agent.get(realm.as_str()).query("scope", &scope);
        if let Some(service) = params.get("service") {
            req = req.query("service", service);
        }
        let mut resp = req
            .call()
            .map_err(|e| ResolveError::Auth(format!("token request to {realm}: {e}")))?;
        let code = resp.status().as_u16();
        if code >= 400 {
            return Err(ResolveError::Auth(format!("HTTP {code} from {realm}")));
        }
        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| ResolveError::Auth(e.to_string()))?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ResolveError::Auth(format!("invalid token response: {e}")))?;
        parsed
            .token
            .or(parsed.access_token)
            .ok_or_else(|| ResolveError::Auth(format!("token response from {realm} has no token")))
    }
}

impl RegistryClient for HttpRegistryClient {
    fn lookup(
        &self,
        host: &str,
        repository: &str,
        reference: &str,
    ) -> Result<String, ResolveError> {
        let url = self.manifest_url(host, repository, reference);
        tracing::debug!("HEAD {url}");

        let mut resp = self.head(&url, self.config.auth_token.as_deref())?;
        if resp.status().as_u16() == 401 {
            let challenge = header_value(&resp, "www-authenticate").ok_or_else(|| {
                ResolveError::Auth(format!("HTTP 401 without challenge for {url}"))
            })?;
            let token = self.fetch_token(&challenge, repository)?;
            resp = self.head(&url, Some(&token))?;
        }

        match resp.status().as_u16() {
            200 => header_value(&resp, DIGEST_HEADER)
                .ok_or_else(|| ResolveError::MissingDigest(format!("{repository}:{reference}"))),
            401 | 403 => Err(ResolveError::Auth(format!(
                "access denied to {repository} on {host}"
            ))),
            404 => Err(ResolveError::NotFound(format!(
                "{repository}:{reference} on {host}"
            ))),
            code => Err(ResolveError::Http(format!("HTTP {code} for HEAD {url}"))),
        }
    }
}

fn header_value<B>(resp: &ureq::http::Response<B>, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Parse `Bearer realm="...",service="...",scope="..."` into its parameters.
fn parse_bearer_challenge(challenge: &str) -> Option<BTreeMap<String, String>> {
    let (scheme, rest) = challenge.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut params = BTreeMap::new();
    let mut rest = rest.trim();
    while !rest.is_empty() {
        let (key, after_key) = rest.split_once('=')?;
        let after_key = after_key.trim_start();
        let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
            let end = quoted.find('"')?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            match after_key.find(',') {
                Some(end) => (&after_key[..end], &after_key[end..]),
                None => (after_key, ""),
            }
        };
        params.insert(key.trim().to_ascii_lowercase(), value.to_owned());
        rest = remainder.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    Some(params)
}
