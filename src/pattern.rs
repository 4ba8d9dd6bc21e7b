use anyhow::{anyhow, Result};
use regex::bytes::{Regex, RegexBuilder};

/// A compiled search or ignore pattern.
///
/// Wraps the regex engine behind the small surface the search pipeline needs:
/// offset-returning partial matches over byte buffers, whole-string matches
/// for anchored glob patterns, and a "matches nothing" state used as the
/// silent fallback for unparseable ignore globs.
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Option<Regex>,
}

impl Pattern {
    /// Compile a user-supplied regex. Errors are fatal and carry the error
    /// category and the byte offset of the offending token.
    pub fn compile(pattern: &str, ignore_case: bool) -> Result<Pattern> {
        if let Err(err) = regex_syntax::ast::parse::Parser::new().parse(pattern) {
            return Err(anyhow!(
                "bad regex: {} at byte offset {}\n\
                 If you meant to search for a literal string, run sift with -Q",
                err.kind(),
                err.span().start.offset,
            ));
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .multi_line(true)
            .build()
            .map_err(|err| {
                anyhow!(
                    "bad regex: {}\n\
                     If you meant to search for a literal string, run sift with -Q",
                    err
                )
            })?;
        Ok(Pattern { re: Some(re) })
    }

    /// Compile a literal query by escaping regex metacharacters first.
    pub fn literal(query: &str, ignore_case: bool) -> Result<Pattern> {
        Pattern::compile(&regex::escape(query), ignore_case)
    }

    /// Compile a shell-style glob into an anchored pattern. A malformed glob
    /// degrades to a pattern that matches nothing so that one bad line in an
    /// ignore file never aborts the walk.
    pub fn glob(pattern: &str) -> Pattern {
        let compiled = globset::GlobBuilder::new(pattern)
            .build()
            .ok()
            .and_then(|glob| Regex::new(glob.regex()).ok());
        if compiled.is_none() {
            log::debug!("could not compile ignore glob {:?}; treating as non-matching", pattern);
        }
        Pattern { re: compiled }
    }

    /// A pattern that matches nothing.
    pub fn empty() -> Pattern {
        Pattern { re: None }
    }

    /// Find the leftmost match at or after `start`. Returns absolute byte
    /// offsets into `buf`.
    pub fn partial_match(&self, buf: &[u8], start: usize) -> Option<(usize, usize)> {
        let re = self.re.as_ref()?;
        re.find_at(buf, start).map(|m| (m.start(), m.end()))
    }

    /// Whether the pattern matches `haystack` in its entirety. Only
    /// meaningful for patterns compiled anchored (globs are).
    pub fn full_match(&self, haystack: &[u8]) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    /// Whether the pattern matches anywhere in `haystack`.
    pub fn has_partial_match(&self, haystack: &[u8]) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    /// Match `haystack` and report whether capture group `group`
    /// participated in the match. `None` if the pattern did not match.
    pub fn full_match_group(&self, haystack: &[u8], group: usize) -> Option<bool> {
        let caps = self.re.as_ref()?.captures(haystack)?;
        Some(caps.get(group).is_some())
    }
}
