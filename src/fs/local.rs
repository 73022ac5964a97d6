//! `file://` driver over the local filesystem. Useful as the tail of a
//! search chain when callers want a local fallback behind the remote ones.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::FsError;
use crate::fs::RemoteFs;

pub struct FileFs;

const SCHEME_PREFIX: &str = "file://";

fn path_of(url: &str) -> &Path {
    Path::new(url.strip_prefix(SCHEME_PREFIX).unwrap_or(url))
}

/// Render a path back in the same form the caller queried with, so listing
/// entries stay comparable to candidate URLs.
fn render(url: &str, path: &Path) -> String {
    if url.starts_with(SCHEME_PREFIX) {
        format!("{SCHEME_PREFIX}{}", path.display())
    } else {
        path.display().to_string()
    }
}

fn transport(url: &str, err: &std::io::Error) -> FsError {
    FsError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

impl RemoteFs for FileFs {
    fn exists(&self, url: &str) -> Result<bool, FsError> {
        Ok(path_of(url).exists())
    }

    fn list(&self, url: &str) -> Result<Vec<String>, FsError> {
        let dir = path_of(url);
        let mut entries = Vec::new();
        let reader = std::fs::read_dir(dir).map_err(|err| transport(url, &err))?;
        for entry in reader {
            let entry = entry.map_err(|err| transport(url, &err))?;
            entries.push(render(url, &entry.path()));
        }
        entries.sort();
        Ok(entries)
    }

    fn list_recursive(&self, url: &str) -> Result<Vec<String>, FsError> {
        let mut paths = Vec::new();
        walk(path_of(url), &mut paths).map_err(|err| transport(url, &err))?;
        let mut entries: Vec<String> = paths.iter().map(|path| render(url, path)).collect();
        entries.sort();
        Ok(entries)
    }

    fn read(&self, url: &str) -> Result<Vec<u8>, FsError> {
        std::fs::read(path_of(url)).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                FsError::NotFound(url.to_string())
            } else {
                transport(url, &err)
            }
        })
    }
}
