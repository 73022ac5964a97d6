//! Import modules (or packages) from a remote location.
//!
//! A dot-separated module name is matched against a chain of registered
//! namespaces; the owning resolver maps it to a concrete remote artifact
//! (package `__init__` file or flat file, package form winning), fetches
//! the source through a URL-scheme driver, and executes it into a
//! process-wide module cache. Records enter the cache before their body
//! runs, so circular imports terminate.
//!
//! ```
//! use std::sync::Arc;
//! use remote_import::{MemoryFs, RegisterOptions, Registry, ScriptEngine, Value};
//!
//! let store = MemoryFs::new();
//! store.insert("mem://pkgs/demo/__init__.py", "value = 42");
//!
//! let mut registry = Registry::new(ScriptEngine);
//! registry.drivers_mut().insert_instance("mem", Arc::new(store));
//! registry.register(&["demo"], "mem://pkgs", RegisterOptions::default())?;
//!
//! let module = registry.import("demo")?;
//! assert_eq!(module.attribute("value"), Some(&Value::Int(42)));
//! # Ok::<(), remote_import::ImportError>(())
//! ```
//!
//! HTTP and HTTPS namespaces work the same way with their base URL; `http`,
//! `https`, and `file` drivers are registered by default and others plug in
//! per scheme through [`DriverSet`].

pub mod engine;
pub mod error;
pub mod fs;
pub mod module;
pub mod registry;
pub mod resolver;
pub mod url;

pub use engine::{CompiledUnit, ImportHost, ModuleEngine, ScriptEngine};
pub use error::{EngineError, FsError, ImportError};
pub use fs::{DriverSet, FileFs, FsOptions, HttpFs, MemoryFs, RemoteFs};
pub use module::{AttrMap, FailureKind, ModuleRecord, ModuleState, Value};
pub use registry::{RegisterOptions, Registry, SharedRegistry};
pub use resolver::{NamespaceResolver, ResolvedArtifact, ResolverHandle};
pub use url::{sanitize_identifier, sanitize_url};
