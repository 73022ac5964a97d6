//! URL construction rules for mapping dotted module names onto remote paths.
//!
//! The rules here decide which remote object a name resolves to, so they are
//! deliberately exact: a dotted name becomes a slash-joined path, the path is
//! appended to the namespace base URL, and repeated separators collapse
//! without disturbing a scheme's `://`.

/// Collapse repeated path separators.
///
/// Every run of slashes preceded by a non-colon character collapses to a
/// single slash; a run right after a colon (the scheme separator) or at the
/// start of the string keeps at most two. `http://host//a//b.py` becomes
/// `http://host/a/b.py`, while `host//a///b` with no scheme collapses fully.
pub fn sanitize_url(url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    let mut out = String::with_capacity(url.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        if c != ':' && i + 2 < chars.len() && chars[i + 1] == '/' && chars[i + 2] == '/' {
            out.push('/');
            i += 2;
            while i < chars.len() && chars[i] == '/' {
                i += 1;
            }
            continue;
        }
        i += 1;
    }
    out
}

/// Rewrite a name segment into an identifier-safe token: non-word characters
/// become underscores and a leading digit gains an underscore prefix.
///
/// Applied when deriving URLs from dotted names, never when matching
/// namespace names.
pub fn sanitize_identifier(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().is_some_and(char::is_numeric) {
        out.insert(0, '_');
    }
    out
}

/// Build the URL backing a dotted name under a base URL.
pub(crate) fn module_url(base_url: &str, full_name: &str) -> String {
    let path = full_name
        .split('.')
        .map(sanitize_identifier)
        .collect::<Vec<_>>()
        .join("/");
    sanitize_url(&format!("{base_url}/{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_doubled_separators_after_host() {
        assert_eq!(
            sanitize_url("http://host//a//b.py"),
            "http://host/a/b.py"
        );
    }

    #[test]
    fn preserves_scheme_separator() {
        assert_eq!(sanitize_url("https://host/a/b"), "https://host/a/b");
    }

    #[test]
    fn collapses_runs_longer_than_two() {
        assert_eq!(sanitize_url("http://host///a////b"), "http://host/a/b");
    }

    #[test]
    fn schemeless_path_collapses_all_repeats() {
        assert_eq!(sanitize_url("host//a///b"), "host/a/b");
    }

    #[test]
    fn single_separators_untouched() {
        assert_eq!(sanitize_url("/tmp/pkg/mod.py"), "/tmp/pkg/mod.py");
    }

    #[test]
    fn run_after_scheme_separator_keeps_two() {
        assert_eq!(sanitize_url("http:///host/a"), "http://host/a");
    }

    #[test]
    fn identifier_replaces_non_word_characters() {
        assert_eq!(sanitize_identifier("my-pkg"), "my_pkg");
        assert_eq!(sanitize_identifier("a.b"), "a_b");
    }

    #[test]
    fn identifier_prefixes_leading_digit() {
        assert_eq!(sanitize_identifier("9lives"), "_9lives");
    }

    #[test]
    fn joins_dotted_name_under_base() {
        assert_eq!(
            module_url("http://host/pkgs/", "a.b.c"),
            "http://host/pkgs/a/b/c"
        );
    }
}
