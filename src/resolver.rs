//! Per-namespace resolution: decide whether a dotted name belongs to this
//! namespace and, if so, which remote artifact backs it.
//!
//! Packages (directories) take precedence over flat files. Resolving
//! `example.a.b.c` probes `<base>/example/a/b/c/__init__.py` first and
//! `<base>/example/a/b/c.py` second, so given both `a/__init__.py` and a
//! sibling `a.py`, the package form always wins and the flat file is
//! ignored. A name with neither candidate is a namespace-only package and
//! loads with empty source.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{FsError, ImportError};
use crate::fs::RemoteFs;
use crate::url::{module_url, sanitize_url};

/// An artifact chosen for one resolution attempt, source already fetched.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub full_name: String,
    pub url: String,
    pub source: String,
}

/// Resolves dotted names under one registered namespace.
pub struct NamespaceResolver {
    namespace: String,
    base_url: String,
    headers: HashMap<String, String>,
    extra: HashMap<String, String>,
    extension: String,
    driver: Arc<dyn RemoteFs>,
}

/// Owned snapshot of a resolver's binding, usable outside the registry lock.
#[derive(Debug, Clone)]
pub struct ResolverHandle {
    pub namespace: String,
    pub base_url: String,
    pub package_hash: Option<String>,
}

impl NamespaceResolver {
    pub(crate) fn new(
        namespace: String,
        base_url: String,
        headers: HashMap<String, String>,
        extra: HashMap<String, String>,
        extension: String,
        driver: Arc<dyn RemoteFs>,
    ) -> Self {
        Self {
            namespace,
            base_url,
            headers,
            extra,
            extension,
            driver,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn extra(&self) -> &HashMap<String, String> {
        &self.extra
    }

    /// The content hash advertised for this namespace via the `X-hash`
    /// header, matched case-insensitively. Not verified here; exposed for
    /// callers who validate artifact provenance themselves.
    pub fn package_hash(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("x-hash"))
            .map(|(_, value)| value.as_str())
    }

    pub fn handle(&self) -> ResolverHandle {
        ResolverHandle {
            namespace: self.namespace.clone(),
            base_url: self.base_url.clone(),
            package_hash: self.package_hash().map(str::to_string),
        }
    }

    /// Replace this binding's location and options, keeping its position in
    /// the search chain.
    pub(crate) fn rebind(
        &mut self,
        base_url: String,
        headers: HashMap<String, String>,
        extra: HashMap<String, String>,
        driver: Arc<dyn RemoteFs>,
    ) {
        self.base_url = base_url;
        self.headers = headers;
        self.extra = extra;
        self.driver = driver;
    }

    fn namespace_url(&self) -> String {
        module_url(&self.base_url, &self.namespace)
    }

    /// The namespace's file listing. A recursive listing alone may omit
    /// entries at the top level, so it is unioned with a shallow listing of
    /// the base directory. Refetched per resolution; never cached.
    fn package_files(&self) -> Result<HashSet<String>, FsError> {
        let url = self.namespace_url();
        let mut files: HashSet<String> = self.driver.list_recursive(&url)?.into_iter().collect();
        files.extend(self.driver.list(&url)?);
        Ok(files)
    }

    /// Claim or defer. `None` means the leading segment is not this
    /// namespace and the search chain should try the next resolver; it is
    /// not a failure.
    pub(crate) fn resolve(&self, full_name: &str) -> Option<Result<ResolvedArtifact, ImportError>> {
        let leading = full_name.split('.').next().unwrap_or(full_name);
        if leading != self.namespace {
            debug!(
                "{full_name} is not under the {} namespace, moving on to the next resolver",
                self.namespace
            );
            return None;
        }
        Some(self.claim(full_name))
    }

    fn claim(&self, full_name: &str) -> Result<ResolvedArtifact, ImportError> {
        let path = module_url(&self.base_url, full_name);
        let init_url = sanitize_url(&format!("{path}/__init__.{}", self.extension));
        let flat_url = sanitize_url(&format!("{path}.{}", self.extension));

        let files = self
            .package_files()
            .map_err(|err| ImportError::ModuleNotFound {
                name: full_name.to_string(),
                url: Some(self.namespace_url()),
                reason: format!("listing failed: {err}"),
            })?;

        let (url, source) = if files.contains(&init_url) {
            info!("loading module {full_name} from {init_url}");
            let source = self.fetch(full_name, &init_url)?;
            (init_url, source)
        } else if files.contains(&flat_url) {
            info!("loading module {full_name} from {flat_url}");
            let source = self.fetch(full_name, &flat_url)?;
            (flat_url, source)
        } else {
            // A directory without an __init__ loads as an empty package.
            debug!("no artifact for {full_name}, treating {path} as a bare package");
            (path, String::new())
        };

        Ok(ResolvedArtifact {
            full_name: full_name.to_string(),
            url,
            source,
        })
    }

    fn fetch(&self, full_name: &str, url: &str) -> Result<String, ImportError> {
        let bytes = self.driver.read(url).map_err(|err| {
            error!("file request failed for {url}: {err}");
            ImportError::ModuleNotFound {
                name: full_name.to_string(),
                url: Some(url.to_string()),
                reason: err.to_string(),
            }
        })?;
        String::from_utf8(bytes).map_err(|err| ImportError::ModuleNotFound {
            name: full_name.to_string(),
            url: Some(url.to_string()),
            reason: format!("source is not valid utf-8: {err}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn resolver(store: &MemoryFs, namespace: &str, base_url: &str) -> NamespaceResolver {
        NamespaceResolver::new(
            namespace.to_string(),
            base_url.to_string(),
            HashMap::new(),
            HashMap::new(),
            "py".to_string(),
            Arc::new(store.clone()),
        )
    }

    #[test]
    fn defers_on_foreign_leading_segment() {
        let store = MemoryFs::new();
        let resolver = resolver(&store, "pkgx", "mem://h");
        assert!(resolver.resolve("other.mod").is_none());
    }

    #[test]
    fn package_form_shadows_flat_form() {
        let store = MemoryFs::new();
        store.insert("mem://h/ns/pkg/__init__.py", "value = 1");
        store.insert("mem://h/ns/pkg.py", "value = 2");
        let resolver = resolver(&store, "ns", "mem://h");

        let artifact = resolver.resolve("ns.pkg").unwrap().unwrap();
        assert_eq!(artifact.url, "mem://h/ns/pkg/__init__.py");
        assert_eq!(artifact.source, "value = 1");
    }

    #[test]
    fn flat_form_used_when_no_package() {
        let store = MemoryFs::new();
        store.insert("mem://h/ns/sub.py", "greet = \"hi\"");
        let resolver = resolver(&store, "ns", "mem://h");

        let artifact = resolver.resolve("ns.sub").unwrap().unwrap();
        assert_eq!(artifact.url, "mem://h/ns/sub.py");
        assert_eq!(artifact.source, "greet = \"hi\"");
    }

    #[test]
    fn missing_artifact_is_a_bare_package() {
        let store = MemoryFs::new();
        store.insert("mem://h/ns/real.py", "x = 1");
        let resolver = resolver(&store, "ns", "mem://h");

        let artifact = resolver.resolve("ns.empty").unwrap().unwrap();
        assert_eq!(artifact.url, "mem://h/ns/empty");
        assert!(artifact.source.is_empty());
    }

    #[test]
    fn hash_header_is_case_insensitive() {
        let store = MemoryFs::new();
        let mut headers = HashMap::new();
        headers.insert("X-Hash".to_string(), "abc123".to_string());
        let resolver = NamespaceResolver::new(
            "ns".to_string(),
            "mem://h".to_string(),
            headers,
            HashMap::new(),
            "py".to_string(),
            Arc::new(store),
        );
        assert_eq!(resolver.package_hash(), Some("abc123"));
    }
}
