//! In-memory object store, mainly for tests and demos. Clones share the
//! same table, so a store can be populated on one handle and resolved
//! against through another.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::FsError;
use crate::fs::RemoteFs;

#[derive(Clone, Default)]
pub struct MemoryFs {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.objects.write().insert(url.to_string(), body.into());
    }

    pub fn remove(&self, url: &str) {
        self.objects.write().remove(url);
    }
}

impl RemoteFs for MemoryFs {
    fn exists(&self, url: &str) -> Result<bool, FsError> {
        let prefix = format!("{url}/");
        let objects = self.objects.read();
        Ok(objects.contains_key(url) || objects.keys().any(|key| key.starts_with(&prefix)))
    }

    fn list(&self, url: &str) -> Result<Vec<String>, FsError> {
        let prefix = format!("{url}/");
        let objects = self.objects.read();
        let mut entries = Vec::new();
        for key in objects.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                // A deeper key surfaces as its first-level directory.
                Some((dir, _)) => format!("{prefix}{dir}"),
                None => key.clone(),
            };
            if entries.last() != Some(&entry) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn list_recursive(&self, url: &str) -> Result<Vec<String>, FsError> {
        let prefix = format!("{url}/");
        let objects = self.objects.read();
        Ok(objects
            .keys()
            .filter(|key| key.as_str() == url || key.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn read(&self, url: &str) -> Result<Vec<u8>, FsError> {
        self.objects
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| FsError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryFs {
        let fs = MemoryFs::new();
        fs.insert("mem://h/ns/__init__.py", "a = 1");
        fs.insert("mem://h/ns/sub.py", "b = 2");
        fs.insert("mem://h/ns/d/deep.py", "c = 3");
        fs
    }

    #[test]
    fn exists_covers_files_and_directories() {
        let fs = store();
        assert!(fs.exists("mem://h/ns/sub.py").unwrap());
        assert!(fs.exists("mem://h/ns").unwrap());
        assert!(!fs.exists("mem://h/other").unwrap());
    }

    #[test]
    fn shallow_list_surfaces_directories_once() {
        let fs = store();
        let entries = fs.list("mem://h/ns").unwrap();
        assert_eq!(
            entries,
            vec![
                "mem://h/ns/__init__.py".to_string(),
                "mem://h/ns/d".to_string(),
                "mem://h/ns/sub.py".to_string(),
            ]
        );
    }

    #[test]
    fn recursive_list_returns_all_files() {
        let fs = store();
        let entries = fs.list_recursive("mem://h/ns").unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&"mem://h/ns/d/deep.py".to_string()));
    }

    #[test]
    fn read_missing_is_not_found() {
        let fs = store();
        assert!(matches!(
            fs.read("mem://h/ns/missing.py"),
            Err(FsError::NotFound(_))
        ));
    }
}
