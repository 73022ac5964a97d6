//! The registry: ordered search chain of namespace resolvers plus the
//! process-wide module cache, with the full load lifecycle in between.
//!
//! Lookups walk the chain front to back; the newest registration sits at
//! the front and is consulted first. The first resolver that claims a name
//! owns the attempt. Records enter the cache `Pending` before their body
//! runs, which is what lets circular imports observe the in-progress
//! module instead of recursing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::engine::{ImportHost, ModuleEngine};
use crate::error::{EngineError, ImportError};
use crate::fs::{DriverSet, FsOptions};
use crate::module::{AttrMap, FailureKind, ModuleRecord, ModuleState};
use crate::resolver::{NamespaceResolver, ResolvedArtifact, ResolverHandle};
use crate::url::sanitize_url;

/// Options for one `register` call.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Rebind an already-registered namespace and invalidate its cached
    /// modules instead of treating the call as a no-op.
    pub reload: bool,
    /// Request headers handed to the namespace's driver.
    pub headers: HashMap<String, String>,
    /// Free-form driver options.
    pub extra: HashMap<String, String>,
    /// Check that the namespace exists at its base URL before registering;
    /// an unreachable namespace aborts registration.
    pub verify_reachable: bool,
}

/// Search chain and module cache with an explicit lifecycle: construct one
/// per process (or per test), tear it down with [`Registry::reset`].
pub struct Registry {
    engine: Arc<dyn ModuleEngine>,
    drivers: DriverSet,
    chain: Vec<NamespaceResolver>,
    modules: HashMap<String, ModuleRecord>,
}

impl Registry {
    pub fn new(engine: impl ModuleEngine + 'static) -> Self {
        Self::with_drivers(engine, DriverSet::default())
    }

    pub fn with_drivers(engine: impl ModuleEngine + 'static, drivers: DriverSet) -> Self {
        Self {
            engine: Arc::new(engine),
            drivers,
            chain: Vec::new(),
            modules: HashMap::new(),
        }
    }

    pub fn drivers_mut(&mut self) -> &mut DriverSet {
        &mut self.drivers
    }

    /// Register namespaces against a base URL and return the resolver for
    /// the last one.
    ///
    /// A namespace that is already bound is left untouched unless
    /// `options.reload` is set, in which case its base URL and headers are
    /// replaced and every cached module under it is invalidated, so the
    /// next access re-resolves and re-executes.
    pub fn register(
        &mut self,
        namespaces: &[&str],
        base_url: &str,
        options: RegisterOptions,
    ) -> Result<&NamespaceResolver, ImportError> {
        let (last, rest) = namespaces.split_last().ok_or(ImportError::EmptyRegistration)?;
        for namespace in rest {
            self.register_one(namespace, base_url, &options)?;
        }
        self.register_one(last, base_url, &options)?;
        self.chain
            .iter()
            .find(|resolver| resolver.namespace() == *last)
            .ok_or(ImportError::EmptyRegistration)
    }

    fn register_one(
        &mut self,
        namespace: &str,
        base_url: &str,
        options: &RegisterOptions,
    ) -> Result<(), ImportError> {
        let fs_options = FsOptions {
            headers: options.headers.clone(),
            extra: options.extra.clone(),
        };

        if options.verify_reachable {
            let url = sanitize_url(&format!("{base_url}/{namespace}"));
            let reachable = self
                .drivers
                .driver_for(&url, &fs_options)
                .and_then(|driver| driver.exists(&url));
            match reachable {
                Ok(true) => info!("namespace {namespace} at {url} is reachable"),
                Ok(false) | Err(_) => {
                    return Err(ImportError::NamespaceUnreachable {
                        namespace: namespace.to_string(),
                        url,
                    });
                }
            }
        }

        if let Some(position) = self
            .chain
            .iter()
            .position(|resolver| resolver.namespace() == namespace)
        {
            if !options.reload {
                warn!("namespace {namespace} already registered, pass reload to rebind it");
                return Ok(());
            }
            debug!("rebinding namespace {namespace} to {base_url}");
            let driver = self
                .drivers
                .driver_for(base_url, &fs_options)
                .map_err(|err| ImportError::ModuleNotFound {
                    name: namespace.to_string(),
                    url: Some(base_url.to_string()),
                    reason: err.to_string(),
                })?;
            self.chain[position].rebind(
                base_url.to_string(),
                options.headers.clone(),
                options.extra.clone(),
                driver,
            );
            let prefix = format!("{namespace}.");
            self.modules
                .retain(|name, _| name != namespace && !name.starts_with(&prefix));
            return Ok(());
        }

        let driver = self
            .drivers
            .driver_for(base_url, &fs_options)
            .map_err(|err| ImportError::ModuleNotFound {
                name: namespace.to_string(),
                url: Some(base_url.to_string()),
                reason: err.to_string(),
            })?;
        let resolver = NamespaceResolver::new(
            namespace.to_string(),
            base_url.to_string(),
            options.headers.clone(),
            options.extra.clone(),
            self.engine.extension().to_string(),
            driver,
        );
        // Newest registration takes highest priority in the search chain.
        self.chain.insert(0, resolver);
        Ok(())
    }

    /// Resolve, fetch, compile, and execute `full_name`, or return it from
    /// the cache.
    pub fn import(&mut self, full_name: &str) -> Result<&ModuleRecord, ImportError> {
        self.load(full_name)?;
        self.modules
            .get(full_name)
            .ok_or_else(|| ImportError::ModuleNotFound {
                name: full_name.to_string(),
                url: None,
                reason: "module record missing after load".to_string(),
            })
    }

    /// The cached record for a name, if any, in whatever state it is in.
    pub fn module(&self, full_name: &str) -> Option<&ModuleRecord> {
        self.modules.get(full_name)
    }

    /// The registered resolver for a namespace, if any.
    pub fn resolver(&self, namespace: &str) -> Option<&NamespaceResolver> {
        self.chain
            .iter()
            .find(|resolver| resolver.namespace() == namespace)
    }

    /// Drop every binding and cached module.
    pub fn reset(&mut self) {
        self.chain.clear();
        self.modules.clear();
    }

    fn load(&mut self, full_name: &str) -> Result<(), ImportError> {
        if let Some(record) = self.modules.get(full_name) {
            return match record.state() {
                // Pending and Executing records are what circular imports
                // see; returning them breaks the cycle.
                ModuleState::Ready | ModuleState::Pending | ModuleState::Executing => Ok(()),
                ModuleState::Failed(kind) => {
                    let recorded = EngineError::Recorded(
                        record.failure().unwrap_or("failure not recorded").to_string(),
                    );
                    Err(match kind {
                        FailureKind::Compile => ImportError::ModuleLoadError {
                            name: full_name.to_string(),
                            url: record.url().to_string(),
                            source: recorded,
                        },
                        FailureKind::Execute => ImportError::ModuleExecutionError {
                            name: full_name.to_string(),
                            url: record.url().to_string(),
                            source: recorded,
                        },
                    })
                }
            };
        }

        let artifact = self.resolve(full_name)?;
        self.run(artifact)
    }

    fn resolve(&self, full_name: &str) -> Result<ResolvedArtifact, ImportError> {
        debug!("searching module {full_name}");
        for resolver in &self.chain {
            if let Some(claimed) = resolver.resolve(full_name) {
                return claimed;
            }
        }
        Err(ImportError::ModuleNotFound {
            name: full_name.to_string(),
            url: None,
            reason: "no registered namespace claims this name".to_string(),
        })
    }

    fn run(&mut self, artifact: ResolvedArtifact) -> Result<(), ImportError> {
        let ResolvedArtifact {
            full_name,
            url,
            source,
        } = artifact;

        // The record must be cached before the body executes so a module
        // that imports itself through a cycle finds it here.
        self.modules.insert(
            full_name.clone(),
            ModuleRecord::new(full_name.clone(), url.clone(), source.clone()),
        );

        let engine = Arc::clone(&self.engine);
        let unit = match engine.compile(&source, &url) {
            Ok(unit) => unit,
            Err(err) => {
                if let Some(record) = self.modules.get_mut(&full_name) {
                    record.fail(FailureKind::Compile, err.to_string(), AttrMap::new());
                }
                return Err(ImportError::ModuleLoadError {
                    name: full_name,
                    url,
                    source: err,
                });
            }
        };

        if let Some(record) = self.modules.get_mut(&full_name) {
            record.begin_execution();
        }

        let mut attributes = AttrMap::new();
        let outcome = engine.execute(&unit, &mut attributes, self);

        let Some(record) = self.modules.get_mut(&full_name) else {
            return Err(ImportError::ModuleNotFound {
                name: full_name,
                url: Some(url),
                reason: "module record evicted while executing".to_string(),
            });
        };
        match outcome {
            Ok(()) => {
                record.finish(attributes);
                info!("module {full_name} loaded from {url}");
                Ok(())
            }
            Err(err) => {
                record.fail(FailureKind::Execute, err.to_string(), attributes);
                Err(ImportError::ModuleExecutionError {
                    name: full_name,
                    url,
                    source: err,
                })
            }
        }
    }
}

impl ImportHost for Registry {
    fn import_module(&mut self, full_name: &str) -> Result<(), ImportError> {
        self.load(full_name)
    }
}

/// A registry behind a single import lock.
///
/// One lock serializes every load in the process, which trivially gives the
/// at-most-one in-flight load per name that concurrent callers need.
/// Imports triggered by an executing module body re-enter the registry
/// directly inside the held lock rather than re-locking.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(engine: impl ModuleEngine + 'static) -> Self {
        Self::from_registry(Registry::new(engine))
    }

    pub fn from_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn register(
        &self,
        namespaces: &[&str],
        base_url: &str,
        options: RegisterOptions,
    ) -> Result<ResolverHandle, ImportError> {
        let mut registry = self.inner.lock();
        registry
            .register(namespaces, base_url, options)
            .map(NamespaceResolver::handle)
    }

    pub fn import(&self, full_name: &str) -> Result<ModuleRecord, ImportError> {
        let mut registry = self.inner.lock();
        registry.import(full_name).map(Clone::clone)
    }

    pub fn module(&self, full_name: &str) -> Option<ModuleRecord> {
        self.inner.lock().module(full_name).cloned()
    }

    /// Run a closure against the locked registry, for operations the
    /// wrapper does not expose directly.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
