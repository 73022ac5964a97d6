use thiserror::Error;

/// Failures surfaced by the import machinery.
///
/// A resolver that simply does not own a name is not an error; it defers by
/// returning no match and the search chain moves on. Everything below is
/// terminal for the resolution attempt that produced it.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No resolver claimed the name, or a claiming resolver failed to fetch
    /// its artifact. `url` is set when a resolver got far enough to name one.
    #[error("module `{name}` not found: {reason}")]
    ModuleNotFound {
        name: String,
        url: Option<String>,
        reason: String,
    },

    /// Fetched source failed to compile. Never retried.
    #[error("module `{name}` failed to compile ({url}): {source}")]
    ModuleLoadError {
        name: String,
        url: String,
        source: EngineError,
    },

    /// Source compiled but raised while executing. Never retried; the
    /// partially populated record stays in the cache.
    #[error("module `{name}` raised during execution ({url}): {source}")]
    ModuleExecutionError {
        name: String,
        url: String,
        source: EngineError,
    },

    /// The reachability check requested at registration time failed.
    /// No binding is created.
    #[error("namespace `{namespace}` not reachable at {url}")]
    NamespaceUnreachable { namespace: String, url: String },

    #[error("register called with an empty namespace list")]
    EmptyRegistration,
}

/// Failures from a remote filesystem driver.
#[derive(Debug, Clone, Error)]
pub enum FsError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("no driver registered for scheme `{0}`")]
    UnsupportedScheme(String),
}

/// Failures from the execution engine, both compile- and run-time.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("line {line}: unrecognized statement `{text}`")]
    Syntax { line: usize, text: String },

    #[error("line {line}: malformed literal `{text}`")]
    Literal { line: usize, text: String },

    #[error("line {line}: {message}")]
    Raised { line: usize, message: String },

    #[error("import of `{name}` failed: {reason}")]
    Import { name: String, reason: String },

    /// A failure recorded on a cached module, re-raised on later access.
    #[error("{0}")]
    Recorded(String),
}
