//! Pattern-scoped file matching.
//!
//! A single regular expression selects files by full path. The walk is
//! rooted at the directory named by the pattern's literal prefix: everything
//! before the first regex metacharacter, cut back to its last separator.
//!
//! Patterns written with `/` are treated as Unix-style, where a backslash is
//! always a regex escape. Patterns without `/` are Windows-style, where `\`
//! (or an escaped `\\`) separates components.

use std::path::PathBuf;

use regex::Regex;
use walkdir::WalkDir;

use super::action::StepError;

const META: &[char] = &['*', '+', '?', '[', ']', '(', ')', '{', '}', '|', '^', '$'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Sep,
    Char(char),
}

/// Split the pattern into literal characters and separators, stopping at
/// the first metacharacter.
fn literal_prefix(pattern: &str, windows_style: bool) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' => units.push(Unit::Sep),
            '\\' if windows_style => {
                if chars.peek() == Some(&'\\') {
                    chars.next();
                }
                units.push(Unit::Sep);
            }
            '\\' => match chars.next() {
                Some(next) if !next.is_ascii_alphanumeric() => units.push(Unit::Char(next)),
                // \d, \w, ... or a trailing backslash
                _ => return units,
            },
            c if META.contains(&c) => return units,
            c => units.push(Unit::Char(c)),
        }
    }
    units
}

/// Directory to walk for `pattern`.
///
/// `C:\Drivers\.*\.sys` walks `C:\Drivers`; `*.log` walks the current
/// directory.
pub fn search_root(pattern: &str) -> PathBuf {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    let windows_style = !pattern.contains('/');
    let sep = if windows_style { '\\' } else { '/' };

    let units = literal_prefix(pattern, windows_style);

    let Some(last_sep) = units.iter().rposition(|u| *u == Unit::Sep) else {
        return PathBuf::from(".");
    };

    let mut root: String = units[..last_sep]
        .iter()
        .map(|u| match u {
            Unit::Sep => sep,
            Unit::Char(c) => *c,
        })
        .collect();

    while root.ends_with(sep) {
        root.pop();
    }

    if root.is_empty() {
        return PathBuf::from(sep.to_string());
    }
    if root.len() == 2 && root.ends_with(':') {
        root.push(sep);
    }
    PathBuf::from(root)
}

/// Every path under the inferred search root whose full path string
/// matches `pattern`. A missing root yields no matches.
pub fn match_paths(pattern: &str) -> Result<Vec<PathBuf>, StepError> {
    if pattern.is_empty() {
        return Err(StepError::Validation("path_regex is required".to_string()));
    }
    let re = Regex::new(pattern)
        .map_err(|e| StepError::Validation(format!("compile regex: {e}")))?;

    let root = search_root(pattern);
    if !root.exists() {
        tracing::debug!(pattern, root = %root.display(), "search root missing, no matches");
        return Ok(Vec::new());
    }
    let relative = root.as_os_str() == ".";

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root) {
        let entry = entry.map_err(|e| {
            StepError::Execution(format!("walk {}: {e}", root.display()))
        })?;
        let path = entry.path();
        let path = if relative && entry.depth() > 0 {
            path.strip_prefix(".").unwrap_or(path)
        } else {
            path
        };
        if re.is_match(&path.to_string_lossy()) {
            matches.push(path.to_path_buf());
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_search_root_windows_pattern() {
        assert_eq!(search_root(r"C:\Drivers\.*\.sys"), Path::new(r"C:\Drivers"));
        assert_eq!(search_root(r"C:\\Drivers\\.*\.sys"), Path::new(r"C:\Drivers"));
        assert_eq!(search_root(r"C:\.*\.log"), Path::new(r"C:\"));
    }

    #[test]
    fn test_search_root_without_literal_prefix_is_current_dir() {
        assert_eq!(search_root("*.log"), Path::new("."));
        assert_eq!(search_root(r".*\.log"), Path::new("."));
        assert_eq!(search_root("^.*"), Path::new("."));
    }

    #[test]
    fn test_search_root_unix_pattern() {
        assert_eq!(search_root("/var/log/.*\\.log"), Path::new("/var/log"));
        assert_eq!(search_root("/var/log/app\\.log"), Path::new("/var/log"));
        assert_eq!(search_root("/tmp/\\.hidden/x.*"), Path::new("/tmp/.hidden"));
        assert_eq!(search_root("/.*"), Path::new("/"));
        assert_eq!(search_root("/var/lo[g]/x"), Path::new("/var"));
    }

    #[test]
    fn test_match_paths_walks_from_root() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.log"), "a").unwrap();
        std::fs::write(dir.path().join("sub/b.log"), "b").unwrap();
        std::fs::write(dir.path().join("c.txt"), "c").unwrap();

        let base = regex::escape(&dir.path().to_string_lossy());
        let mut found = match_paths(&format!(r"{base}/.*\.log$")).unwrap();
        found.sort();
        assert_eq!(found, vec![dir.path().join("a.log"), dir.path().join("sub/b.log")]);
    }

    #[test]
    fn test_match_paths_missing_root_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let base = regex::escape(&dir.path().join("nope").to_string_lossy());
        assert!(match_paths(&format!(r"{base}/.*")).unwrap().is_empty());
    }

    #[test]
    fn test_match_paths_rejects_bad_input() {
        assert_eq!(
            match_paths(""),
            Err(StepError::Validation("path_regex is required".to_string()))
        );
        let err = match_paths("/tmp/(unclosed").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("compile regex:"));
    }
}
