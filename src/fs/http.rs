//! HTTP/HTTPS driver backed by `ureq`.
//!
//! HTTP has no native listing operation, so `list` fetches the directory
//! index page and scrapes anchor hrefs, the same approach generic
//! HTTP-filesystem layers take. Servers that do not emit index pages can
//! still serve reads; resolution against them then relies on the package
//! form never being listed, so callers typically front such hosts with a
//! driver that knows the layout.

use std::collections::HashSet;
use std::io::Read;

use crate::error::FsError;
use crate::fs::{FsOptions, RemoteFs};

pub struct HttpFs {
    agent: ureq::Agent,
    headers: Vec<(String, String)>,
}

impl HttpFs {
    pub fn new(options: &FsOptions) -> Self {
        Self {
            agent: ureq::agent(),
            headers: options
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let mut request = self.agent.request(method, url);
        for (key, value) in &self.headers {
            request = request.set(key, value);
        }
        request
    }

    fn fetch_index(&self, url: &str) -> Result<String, FsError> {
        match self.request("GET", url).call() {
            Ok(response) => response.into_string().map_err(|err| FsError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }),
            Err(ureq::Error::Status(404, _)) => Err(FsError::NotFound(url.to_string())),
            Err(err) => Err(FsError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn list_page(&self, url: &str) -> Result<Vec<String>, FsError> {
        let page = self.fetch_index(url)?;
        Ok(scrape_links(url, &page))
    }
}

impl RemoteFs for HttpFs {
    fn exists(&self, url: &str) -> Result<bool, FsError> {
        match self.request("HEAD", url).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(_, _)) => Ok(false),
            Err(err) => Err(FsError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn list(&self, url: &str) -> Result<Vec<String>, FsError> {
        self.list_page(url)
    }

    fn list_recursive(&self, url: &str) -> Result<Vec<String>, FsError> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![normalize_dir(url)];
        while let Some(dir) = pending.pop() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            for entry in self.list_page(&dir)? {
                if entry.ends_with('/') {
                    pending.push(entry);
                } else {
                    files.push(entry);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, url: &str) -> Result<Vec<u8>, FsError> {
        match self.request("GET", url).call() {
            Ok(response) => {
                let mut body = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut body)
                    .map_err(|err| FsError::Transport {
                        url: url.to_string(),
                        reason: err.to_string(),
                    })?;
                Ok(body)
            }
            Err(ureq::Error::Status(404, _)) => Err(FsError::NotFound(url.to_string())),
            Err(err) => Err(FsError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

fn normalize_dir(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// `scheme://host` of a URL, without any path.
fn origin_of(url: &str) -> Option<&str> {
    let after_scheme = url.find("://")? + 3;
    match url[after_scheme..].find('/') {
        Some(slash) => Some(&url[..after_scheme + slash]),
        None => Some(url),
    }
}

/// Pull anchor targets out of a directory index page and resolve them
/// against the page URL. Navigation links (parents, queries, fragments,
/// other protocols) are dropped.
fn scrape_links(url: &str, page: &str) -> Vec<String> {
    let base = normalize_dir(url);
    let mut entries = Vec::new();
    let mut rest = page;
    while let Some(start) = rest.find("href=") {
        rest = &rest[start + 5..];
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        rest = &rest[1..];
        let Some(end) = rest.find(quote) else {
            break;
        };
        let href = &rest[..end];
        rest = &rest[end + 1..];

        if href.is_empty()
            || href.starts_with('?')
            || href.starts_with('#')
            || href.starts_with("..")
            || href.contains(':') && !href.starts_with("http")
        {
            continue;
        }
        let resolved = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(stripped) = href.strip_prefix('/') {
            match origin_of(&base) {
                Some(origin) => format!("{origin}/{stripped}"),
                None => continue,
            }
        } else {
            format!("{base}{href}")
        };
        // Only entries under the listed directory count as its children.
        if resolved != base && resolved.starts_with(&base) {
            entries.push(resolved);
        }
    }
    entries
}
