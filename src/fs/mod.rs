//! Remote filesystem capability: existence checks, listings, and byte-level
//! reads over a URL, with the concrete driver selected by URL scheme.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::FsError;

mod http;
mod local;
mod memory;

pub use http::HttpFs;
pub use local::FileFs;
pub use memory::MemoryFs;

/// Access to objects behind a URL scheme.
///
/// `list` is shallow; `list_recursive` descends. Both return absolute URLs
/// in the same form the caller queried with, so listing entries can be
/// compared against candidate artifact URLs directly.
pub trait RemoteFs: Send + Sync {
    fn exists(&self, url: &str) -> Result<bool, FsError>;
    fn list(&self, url: &str) -> Result<Vec<String>, FsError>;
    fn list_recursive(&self, url: &str) -> Result<Vec<String>, FsError>;
    fn read(&self, url: &str) -> Result<Vec<u8>, FsError>;
}

/// Per-namespace options handed to a driver factory: request headers and
/// free-form driver settings.
#[derive(Debug, Clone, Default)]
pub struct FsOptions {
    pub headers: HashMap<String, String>,
    pub extra: HashMap<String, String>,
}

/// Builds a driver for one namespace from that namespace's options.
pub type DriverFactory = Arc<dyn Fn(&FsOptions) -> Arc<dyn RemoteFs> + Send + Sync>;

/// Scheme-keyed table of driver factories.
///
/// `http`, `https`, and `file` are wired up by default. Callers add their
/// own schemes with [`DriverSet::insert`], or bind an already-constructed
/// driver (an in-memory store, say) with [`DriverSet::insert_instance`].
pub struct DriverSet {
    factories: HashMap<String, DriverFactory>,
}

impl DriverSet {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn insert(&mut self, scheme: &str, factory: DriverFactory) {
        self.factories.insert(scheme.to_string(), factory);
    }

    /// Bind one driver instance to a scheme, ignoring per-namespace options.
    pub fn insert_instance(&mut self, scheme: &str, driver: Arc<dyn RemoteFs>) {
        self.insert(scheme, Arc::new(move |_| Arc::clone(&driver)));
    }

    pub(crate) fn driver_for(
        &self,
        url: &str,
        options: &FsOptions,
    ) -> Result<Arc<dyn RemoteFs>, FsError> {
        let scheme = scheme_of(url);
        let factory = self
            .factories
            .get(scheme)
            .ok_or_else(|| FsError::UnsupportedScheme(scheme.to_string()))?;
        Ok(factory(options))
    }
}

impl Default for DriverSet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.insert(
            "http",
            Arc::new(|options: &FsOptions| Arc::new(HttpFs::new(options)) as Arc<dyn RemoteFs>),
        );
        set.insert(
            "https",
            Arc::new(|options: &FsOptions| Arc::new(HttpFs::new(options)) as Arc<dyn RemoteFs>),
        );
        set.insert(
            "file",
            Arc::new(|_: &FsOptions| Arc::new(FileFs) as Arc<dyn RemoteFs>),
        );
        set
    }
}

/// The scheme of a URL; URLs without a `://` separator are treated as local
/// file paths.
pub(crate) fn scheme_of(url: &str) -> &str {
    url.split_once("://").map_or("file", |(scheme, _)| scheme)
}
