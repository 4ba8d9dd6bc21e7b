use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::pattern::Pattern;

/// The ignore rules in force for one directory.
///
/// Rules are classified at load time so the hot lookup path can binary-search
/// plain names and extensions and only falls back to compiled glob patterns
/// for entries that carry metacharacters. Sets are chained through `parent`
/// up to the process-wide root set; a candidate is ignored if any set in the
/// chain matches it.
#[derive(Debug, Default)]
pub struct IgnoreSet {
    parent: Option<Arc<IgnoreSet>>,

    /// Directory this set was built for and its path relative to the walk
    /// root, used to anchor slash patterns.
    dirname: String,
    abs_path: String,

    /// Bare extensions from `*.ext` patterns, sorted.
    extensions: Vec<String>,
    /// Literal file names, sorted.
    names: Vec<String>,
    /// Literal names anchored to this directory (pattern began with `/`), sorted.
    slash_names: Vec<String>,
    /// Glob patterns matched against the bare filename.
    regexes: Vec<String>,
    patterns: Vec<Pattern>,
    /// Glob patterns matched against the path relative to this directory.
    slash_regexes: Vec<String>,
    slash_patterns: Vec<Pattern>,
}

/// Glob metacharacters recognized in ignore patterns.
fn has_glob_metachars(pattern: &str) -> bool {
    pattern.bytes().any(|b| matches!(b, b'!' | b'*' | b'?' | b'[' | b']'))
}

fn sorted_insert(list: &mut Vec<String>, value: String) {
    let idx = match list.binary_search(&value) {
        Ok(idx) | Err(idx) => idx,
    };
    list.insert(idx, value);
}

fn sorted_contains(list: &[String], value: &str) -> bool {
    list.binary_search_by(|probe| probe.as_str().cmp(value)).is_ok()
}

impl IgnoreSet {
    /// Create the set for a directory below `parent`. An empty parent that
    /// itself has a parent is skipped, so long chains of pattern-less
    /// directories collapse to a single hop.
    pub fn new(parent: Option<Arc<IgnoreSet>>, dirname: &str) -> IgnoreSet {
        let abs_path = match parent.as_deref() {
            Some(p) if !p.abs_path.is_empty() => format!("{}/{}", p.abs_path, dirname),
            _ if dirname == "." => String::new(),
            _ => dirname.to_string(),
        };

        let parent = match parent {
            Some(p) if p.is_empty() && p.parent.is_some() => p.parent.clone(),
            other => other,
        };

        IgnoreSet {
            parent,
            dirname: dirname.to_string(),
            abs_path,
            ..IgnoreSet::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
            && self.names.is_empty()
            && self.slash_names.is_empty()
            && self.regexes.is_empty()
            && self.slash_regexes.is_empty()
    }

    pub fn parent(&self) -> Option<&Arc<IgnoreSet>> {
        self.parent.as_ref()
    }

    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    /// Classify one raw ignore pattern and store it in the right list.
    pub fn add_pattern(&mut self, raw: &str) {
        // A leading "./" becomes an anchored pattern.
        let pattern = if raw.starts_with("./") { &raw[1..] } else { raw };
        let pattern = pattern.trim_end();
        if pattern.is_empty() {
            log::debug!("empty ignore pattern, nothing to add");
            return;
        }

        if has_glob_metachars(pattern) {
            if let Some(ext) = pattern.strip_prefix("*.") {
                if !ext.is_empty() && !has_glob_metachars(ext) {
                    sorted_insert(&mut self.extensions, ext.to_string());
                    return;
                }
            }
            if let Some(rest) = pattern.strip_prefix('/') {
                sorted_insert(&mut self.slash_regexes, rest.to_string());
            } else {
                sorted_insert(&mut self.regexes, pattern.to_string());
            }
        } else if let Some(rest) = pattern.strip_prefix('/') {
            sorted_insert(&mut self.slash_names, rest.to_string());
        } else {
            sorted_insert(&mut self.names, pattern.to_string());
        }
    }

    /// Load a git/hg/ag-style ignore file: one pattern per line, `#` starts a
    /// comment. A missing or unreadable file is skipped silently.
    pub fn load_ignore_file(&mut self, path: &Path) {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => {
                log::debug!("skipping ignore file {}: not readable", path.display());
                return;
            }
        };
        log::debug!("loading ignore file {}", path.display());

        for line in data.split(|&b| b == b'\n') {
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            self.add_pattern(&String::from_utf8_lossy(line));
        }
    }

    /// Load the `svn:ignore` property from `<svn_dir>/dir-prop-base`.
    pub fn load_svn_ignore(&mut self, svn_dir: &Path) {
        let prop_base = svn_dir.join("dir-prop-base");
        let data = match fs::read(&prop_base) {
            Ok(data) => data,
            Err(_) => {
                log::debug!("skipping svn ignore file {}", prop_base.display());
                return;
            }
        };

        match parse_svn_ignore_property(&data) {
            Some(patterns) => {
                for pattern in patterns {
                    self.add_pattern(&pattern);
                }
            }
            None => {
                log::debug!("unable to parse svn ignore file {}", prop_base.display());
            }
        }
    }

    /// Compile the glob lists. Call once, after all patterns for the
    /// directory have been merged.
    pub fn build_patterns(&mut self) {
        self.patterns = self.regexes.iter().map(|p| Pattern::glob(p)).collect();
        self.slash_patterns = self.slash_regexes.iter().map(|p| Pattern::glob(p)).collect();
    }

    /// Whether this single set ignores `filename` found in directory `path`
    /// (relative to the walk root). Callers walk the parent chain themselves.
    pub fn path_ignore_search(
        &self,
        path: &str,
        filename: &str,
        ackmate_dir_pattern: Option<&Pattern>,
    ) -> bool {
        if sorted_contains(&self.names, filename) {
            log::debug!("{} ignored: name matches static pattern", filename);
            return true;
        }

        let path = path.strip_prefix('.').unwrap_or(path);
        let combined = format!("{}/{}", path, filename);

        if let Some(rest) = combined.strip_prefix(&self.abs_path) {
            let slash_filename = rest.strip_prefix('/').unwrap_or(rest);

            if sorted_contains(&self.names, slash_filename)
                || sorted_contains(&self.slash_names, slash_filename)
            {
                log::debug!("{} ignored: path matches static pattern", combined);
                return true;
            }

            for (i, pattern) in self.slash_patterns.iter().enumerate() {
                if pattern.full_match(slash_filename.as_bytes()) {
                    log::debug!(
                        "{} ignored: matches anchored glob {}",
                        slash_filename,
                        self.slash_regexes[i]
                    );
                    return true;
                }
            }
        }

        for (i, pattern) in self.patterns.iter().enumerate() {
            if pattern.full_match(filename.as_bytes()) {
                log::debug!("{} ignored: matches glob {}", filename, self.regexes[i]);
                return true;
            }
        }

        match ackmate_dir_pattern {
            Some(pattern) => pattern.has_partial_match(combined.as_bytes()),
            None => false,
        }
    }
}

/// Whether any set in the chain rooted at `ig` ignores the entry. `path_start`
/// is the entry's directory relative to the walk root.
pub fn is_ignored(
    ig: &IgnoreSet,
    path_start: &str,
    filename: &str,
    is_dir: bool,
    ackmate_dir_pattern: Option<&Pattern>,
) -> bool {
    let extension = filename
        .rfind('.')
        .map(|idx| &filename[idx + 1..])
        .filter(|ext| !ext.is_empty());

    let mut current = Some(ig);
    while let Some(set) = current {
        if let Some(ext) = extension {
            if sorted_contains(&set.extensions, ext) {
                log::debug!("{} ignored: extension {} is ignored", filename, ext);
                return true;
            }
        }

        if set.path_ignore_search(path_start, filename, ackmate_dir_pattern) {
            return true;
        }

        // Patterns written with a trailing slash match directories only.
        if is_dir {
            let dir_name = format!("{}/", filename);
            if set.path_ignore_search(path_start, &dir_name, ackmate_dir_pattern) {
                return true;
            }
        }

        current = set.parent.as_deref();
    }

    log::debug!("{} not ignored", filename);
    false
}

/// Extract the `svn:ignore` property value from a `dir-prop-base` buffer.
///
/// The format is a sequence of `K <keylen>\n<key>\nV <vallen>\n<value>\n`
/// records terminated by `END`. Returns the property's non-empty lines, or
/// `None` if the property is absent or the buffer is malformed.
fn parse_svn_ignore_property(data: &[u8]) -> Option<Vec<String>> {
    fn read_len(data: &[u8], pos: usize) -> Option<(usize, usize)> {
        let newline = data[pos..].iter().position(|&b| b == b'\n')? + pos;
        let len = std::str::from_utf8(&data[pos..newline]).ok()?.parse().ok()?;
        Some((len, newline + 1))
    }

    let mut pos = 0;
    while data[pos..].starts_with(b"K ") {
        let (key_len, next) = read_len(data, pos + 2)?;
        let key = data.get(next..next + key_len)?;
        pos = next + key_len;
        if !data[pos..].starts_with(b"\n") {
            return None;
        }
        pos += 1;

        if !data[pos..].starts_with(b"V ") {
            return None;
        }
        let (val_len, next) = read_len(data, pos + 2)?;
        let value = data.get(next..next + val_len)?;
        pos = next + val_len;

        if key == b"svn:ignore" {
            return Some(
                value
                    .split(|&b| b == b'\n')
                    .filter(|line| !line.is_empty())
                    .map(|line| String::from_utf8_lossy(line).into_owned())
                    .collect(),
            );
        }

        if data[pos..].starts_with(b"\n") {
            pos += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn compiled(patterns: &[&str]) -> IgnoreSet {
        let mut ig = IgnoreSet::new(None, "");
        for p in patterns {
            ig.add_pattern(p);
        }
        ig.build_patterns();
        ig
    }

    #[test]
    fn classification_by_shape() {
        let ig = compiled(&["*.png", "core", "/build", "/out*", "cache-?", "*.min.*"]);
        assert_eq!(ig.extensions, vec!["png"]);
        assert_eq!(ig.names, vec!["core"]);
        assert_eq!(ig.slash_names, vec!["build"]);
        assert_eq!(ig.slash_regexes, vec!["out*"]);
        assert_eq!(ig.regexes, vec!["*.min.*", "cache-?"]);
    }

    #[test]
    fn lists_stay_sorted() {
        let ig = compiled(&["zebra", "alpha", "mango", "alpha"]);
        let mut sorted = ig.names.clone();
        sorted.sort();
        assert_eq!(ig.names, sorted);
        assert_eq!(ig.names.len(), 4);
    }

    #[test]
    fn trailing_whitespace_and_empty_patterns() {
        let ig = compiled(&["foo   ", "", "   "]);
        assert_eq!(ig.names, vec!["foo"]);
    }

    #[test]
    fn leading_dot_slash_anchors() {
        let ig = compiled(&["./vendor"]);
        assert_eq!(ig.slash_names, vec!["vendor"]);
    }

    #[test]
    fn name_match_ignores_everywhere() {
        let ig = compiled(&["core"]);
        assert!(is_ignored(&ig, "", "core", false, None));
        assert!(is_ignored(&ig, "deep/nested", "core", false, None));
        assert!(!is_ignored(&ig, "", "score", false, None));
    }

    #[test]
    fn extension_fast_path() {
        let ig = compiled(&["*.png"]);
        assert!(is_ignored(&ig, "", "logo.png", false, None));
        assert!(!is_ignored(&ig, "", "logo.png.txt", false, None));
        assert!(!is_ignored(&ig, "", "png", false, None));
    }

    #[test]
    fn anchored_name_only_matches_at_root() {
        let ig = compiled(&["/build"]);
        assert!(is_ignored(&ig, "", "build", false, None));
        assert!(!is_ignored(&ig, "src", "build", false, None));
    }

    #[test]
    fn anchored_glob_matches_relative_path() {
        let ig = compiled(&["/target/*"]);
        assert!(ig.path_ignore_search("target", "debug", None));
        assert!(!ig.path_ignore_search("src", "debug", None));
    }

    #[test]
    fn trailing_slash_pattern_matches_directories_only() {
        let ig = compiled(&["logs/"]);
        assert!(is_ignored(&ig, "", "logs", true, None));
        assert!(!is_ignored(&ig, "", "logs", false, None));
    }

    #[test]
    fn parent_chain_is_consulted() {
        let root = Arc::new(compiled(&["*.o"]));
        let mut child = IgnoreSet::new(Some(root), "sub");
        child.add_pattern("local");
        child.build_patterns();

        assert!(is_ignored(&child, "sub", "lib.o", false, None));
        assert!(is_ignored(&child, "sub", "local", false, None));
        assert!(!is_ignored(&child, "sub", "main.c", false, None));
    }

    #[test]
    fn empty_parent_is_compressed_away() {
        let root = Arc::new(compiled(&["*.o"]));
        let empty = Arc::new({
            let mut ig = IgnoreSet::new(Some(Arc::clone(&root)), "mid");
            ig.build_patterns();
            ig
        });
        let child = IgnoreSet::new(Some(Arc::clone(&empty)), "leaf");

        let parent = child.parent().expect("child keeps a parent");
        assert!(Arc::ptr_eq(parent, &root));
        // A non-empty parent is linked directly.
        let sibling = IgnoreSet::new(Some(Arc::clone(&root)), "other");
        assert!(Arc::ptr_eq(sibling.parent().unwrap(), &root));
    }

    #[test]
    fn abs_path_follows_directory_chain() {
        let root = Arc::new(compiled(&["keepme"]));
        let a = Arc::new(IgnoreSet::new(Some(root), "a"));
        let b = IgnoreSet::new(Some(a), "b");
        assert_eq!(b.dirname(), "b");
        assert_eq!(b.abs_path, "a/b");
    }

    #[test]
    fn abs_path_for_dot_root_is_empty() {
        let ig = IgnoreSet::new(None, ".");
        assert_eq!(ig.abs_path, "");
    }

    #[test]
    fn malformed_glob_is_inert() {
        let ig = compiled(&["bad[glob"]);
        assert!(!is_ignored(&ig, "", "bad[glob", false, None));
        assert!(!is_ignored(&ig, "", "anything", false, None));
    }

    #[test]
    fn load_ignore_file_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "*.png").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "build").unwrap();

        let mut ig = IgnoreSet::new(None, "");
        ig.load_ignore_file(&path);
        ig.build_patterns();

        assert_eq!(ig.extensions, vec!["png"]);
        assert_eq!(ig.names, vec!["build"]);
    }

    #[test]
    fn svn_property_parsing() {
        let data = b"K 10\nsvn:ignore\nV 11\n*.obj\ntemp\n\nEND\n";
        let patterns = parse_svn_ignore_property(data).unwrap();
        assert_eq!(patterns, vec!["*.obj", "temp"]);
    }

    #[test]
    fn svn_property_skips_other_keys() {
        let data = b"K 8\nsvn:eol\nV 2\nLF\nK 10\nsvn:ignore\nV 5\n*.bak\nEND\n";
        let patterns = parse_svn_ignore_property(data).unwrap();
        assert_eq!(patterns, vec!["*.bak"]);
    }

    #[test]
    fn svn_property_malformed_is_none() {
        assert_eq!(parse_svn_ignore_property(b"garbage"), None);
        assert_eq!(parse_svn_ignore_property(b"K 99\nshort"), None);
    }
}
