//! Path & slug codec.
//!
//! A *pattern* is a glob with at most one wildcard segment (`*` or `**`).
//! A *slug* is the pattern's base directory stripped from a matching file
//! path, its extension dropped, and its `/` separators rewritten to `--`.

use regex::Regex;

use crate::error::{QueryEngineError, Result};

/// The portion of `pattern` before its first wildcard, e.g. `"content/herbs"`
/// for `"content/herbs/*.md"`.
pub fn base_dir(pattern: &str) -> &str {
    match pattern.find('*') {
        Some(idx) => {
            let prefix = &pattern[..idx];
            prefix.trim_end_matches('/')
        }
        None => {
            // no wildcard: the base dir is the pattern's parent directory
            match pattern.rfind('/') {
                Some(idx) => &pattern[..idx],
                None => "",
            }
        }
    }
}

fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) if !path[idx + 1..].contains('/') => &path[..idx],
        _ => path,
    }
}

/// Converts a file path matching `pattern` into its slug.
pub fn slug_from_path(pattern: &str, file_path: &str) -> Result<String> {
    let base = base_dir(pattern);
    let relative = if base.is_empty() {
        file_path
    } else {
        file_path
            .strip_prefix(base)
            .map(|rest| rest.trim_start_matches('/'))
            .ok_or_else(|| {
                QueryEngineError::Config(format!(
                    "path {file_path} does not fall under base directory {base} of pattern {pattern}"
                ))
            })?
    };
    let without_ext = strip_extension(relative);
    Ok(without_ext.replace('/', "--"))
}

/// Builds the regex that recognizes slugs conforming to `pattern`.
/// `*` becomes `[\w-]+`; `**` becomes `([\w-]+(--)?)*`.
fn pattern_regex(pattern: &str) -> Regex {
    let base = base_dir(pattern);
    let tail = pattern
        .strip_prefix(base)
        .unwrap_or(pattern)
        .trim_start_matches('/');
    let tail_no_ext = strip_extension(tail);

    let mut out = String::from("^");
    let mut chars = tail_no_ext.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                out.push_str(r"([\w-]+(--)?)*");
            } else {
                out.push_str(r"[\w-]+");
            }
        } else if "\\.+?()|[]{}^$".contains(c) {
            out.push('\\');
            out.push(c);
        } else if c == '/' {
            out.push_str("--");
        } else {
            out.push(c);
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("$^").expect("empty regex always compiles"))
}

/// Inverse of [`slug_from_path`]: given a set of slugs known to conform to
/// `pattern`, reconstructs their file paths. When `pattern` has no wildcard
/// (single-file-many-records source), every slug maps back onto the one
/// fixed path named by `pattern` — unless more than one distinct slug was
/// supplied, in which case the mapping is ambiguous and an empty list is
/// returned (the builder's error case for an ambiguous fixed-pattern source).
pub fn paths_from_slugs(pattern: &str, slugs: &[String]) -> Vec<String> {
    if !pattern.contains('*') {
        let distinct: std::collections::HashSet<&String> = slugs.iter().collect();
        if distinct.len() > 1 {
            return Vec::new();
        }
        return vec![pattern.to_string(); slugs.len().min(1)];
    }

    let base = base_dir(pattern);
    let regex = pattern_regex(pattern);
    let ext = pattern.rsplit('.').next().filter(|e| *e != pattern);

    slugs
        .iter()
        .filter(|slug| regex.is_match(slug))
        .map(|slug| {
            let relative = slug.replace("--", "/");
            let with_ext = match ext {
                Some(ext) if pattern.ends_with(ext) && pattern.contains('.') => {
                    format!("{relative}.{ext}")
                }
                _ => relative,
            };
            if base.is_empty() {
                with_ext
            } else {
                format!("{base}/{with_ext}")
            }
        })
        .collect()
}

/// Membership test: does `path` fall within the set of files `pattern` names?
pub fn pattern_test(pattern: &str, path: &str) -> bool {
    let Ok(slug) = slug_from_path(pattern, path) else {
        return false;
    };
    pattern_regex(pattern).is_match(&slug)
}
