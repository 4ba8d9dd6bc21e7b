use std::io::IsTerminal;
use std::path::PathBuf;
use std::thread;

use anyhow::Result;

use crate::cli::Opts;
use crate::filesystem;
use crate::pattern::Pattern;
use crate::regex_helper::pattern_has_uppercase_char;

pub const DEFAULT_MAX_SEARCH_DEPTH: i32 = 25;

/// Meta-pattern recognizing ignore-rule carriers during a directory scan.
/// Group 1 fires for `.git` itself, which is handled specially
/// (`.git/info/exclude` is loaded instead of the directory).
const VCS_IGNORE_PATTERN: &str = r"^(?:\.agignore|\.gitignore|\.hgignore|\.svn|(\.git))$";
const AGIGNORE_ONLY_PATTERN: &str = r"^(?:\.agignore)$";

/// Filename suffixes that are almost certainly binary; skipped by name
/// before the file is ever opened, unless binary searching was requested.
const BINARY_EXTENSION_PATTERN: &str = r"(?i)\.(?:bmp|png|jpg|jpeg|jp2|gif|ico|tiff|tga|pdf|psd|docx|xlsx|pptx|zip|gz|tgz|bz2|wav|ppm|pgm|mp3|mp4|o|a|dll|lib|jar)$";

/// As above, minus the compressed containers, for when -z asks us to look
/// inside them.
const BINARY_EXTENSION_PATTERN_NO_ZIP: &str = r"(?i)\.(?:bmp|png|jpg|jpeg|jp2|gif|ico|tiff|tga|pdf|psd|docx|xlsx|pptx|wav|ppm|pgm|mp3|mp4|o|a|dll|lib|jar)$";

/// How file paths are attached to printed matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathPrint {
    /// As a heading above each file's block of results.
    Top,
    /// On every result line.
    EachLine,
    /// Not at all.
    Nothing,
}

/// Configuration options for *sift*, resolved from the command line.
pub struct Config {
    /// The raw query string.
    pub query: String,

    /// The compiled search pattern.
    pub pattern: Pattern,

    /// Whether the query was taken as a literal string rather than a regex.
    pub literal: bool,

    /// Whether matches may cross line boundaries.
    pub multiline: bool,

    /// Select lines *not* matching the pattern.
    pub invert_match: bool,

    /// Stop searching a file after this many matches. Zero means unlimited.
    pub max_matches_per_file: usize,

    /// Maximum recursion depth; -1 for unlimited.
    pub max_search_depth: i32,

    /// Whether the user chose the depth explicitly (affects the log level of
    /// the depth-limit message).
    pub depth_set_by_user: bool,

    /// Whether to descend into subdirectories at all.
    pub recurse_dirs: bool,

    /// Whether to follow symlinks.
    pub follow_symlinks: bool,

    /// Whether to refuse to cross device boundaries.
    pub one_dev: bool,

    /// Whether to search hidden files and directories.
    pub search_hidden_files: bool,

    /// Whether to search files that look binary.
    pub search_binary_files: bool,

    /// Whether to search the contents of compressed files.
    pub search_zip_files: bool,

    /// Whether input arrives on stdin rather than from a filesystem walk.
    pub search_stream: bool,

    /// Whether to admit every file regardless of ignore rules.
    pub search_all_files: bool,

    /// An extra ignore file merged into every directory's rules.
    pub path_to_agignore: Option<PathBuf>,

    /// Command-line ignore patterns, loaded into the root IgnoreSet.
    pub ignore_patterns: Vec<String>,

    /// Matches directory entries that carry ignore rules.
    pub vcs_ignore_pattern: Pattern,

    /// If set, only files whose basename matches are searched.
    pub file_search_pattern: Option<Pattern>,

    /// If set, print paths matching `file_search_pattern` instead of
    /// searching their contents.
    pub match_files: bool,

    /// Filenames matching this are skipped as binary without being opened.
    pub binary_ignore_pattern: Option<Pattern>,

    /// AckMate directory filter, consulted during ignore checks.
    pub ackmate_dir_pattern: Option<Pattern>,

    /// Where to print file paths.
    pub print_path: PathPrint,

    /// Print only file names, not match contents (-l/-L).
    pub print_filename_only: bool,

    /// Print per-file match counts (-c).
    pub print_count: bool,

    /// Print 1-based line numbers.
    pub print_line_numbers: bool,

    /// Print a blank line between results from different files.
    pub print_break: bool,

    /// Lines of leading and trailing context around each match.
    pub before: usize,
    pub after: usize,

    /// Truncate printed lines after this many characters. Zero means never.
    pub width: usize,

    /// Byte terminating a printed path (newline, or NUL for xargs -0).
    pub path_sep: u8,

    /// Whether to colorize output, and the raw SGR code strings to use.
    pub color: bool,
    pub color_match: String,
    pub color_path: String,
    pub color_line_number: String,

    /// Output format switches.
    pub ackmate: bool,
    pub vimgrep: bool,
    pub only_matching: bool,

    /// In stream mode, echo non-matching lines unchanged.
    pub passthrough: bool,

    /// Print the column of the first match on each line.
    pub column: bool,

    /// Print search statistics after the run.
    pub stats: bool,

    /// Worker thread count.
    pub threads: usize,

    /// Inode stdout is redirected to, to avoid searching our own output.
    pub stdout_inode: Option<u64>,

    /// Root paths to search.
    pub paths: Vec<PathBuf>,
}

impl Config {
    pub fn from_opts(opts: Opts) -> Result<Config> {
        let query = opts.pattern.clone().unwrap_or_default();
        let match_files = opts.match_files.is_some();

        let search_hidden_files = opts.hidden || opts.unrestricted;
        let search_binary_files = opts.search_binary || opts.unrestricted;
        let search_all_files = opts.all_types || opts.unrestricted;

        let case_insensitive = if opts.ignore_case {
            true
        } else if opts.case_sensitive {
            false
        } else if opts.fixed_strings {
            // Smart case for literals looks at the query text itself.
            !query.chars().any(char::is_uppercase)
        } else {
            !pattern_has_uppercase_char(&query)
        };

        let pattern = if match_files {
            Pattern::empty()
        } else if opts.fixed_strings && !opts.word_regexp {
            Pattern::literal(&query, case_insensitive)?
        } else {
            let source = if opts.fixed_strings {
                regex::escape(&query)
            } else {
                query.clone()
            };
            let source = if opts.word_regexp {
                format!(r"\b(?:{})\b", source)
            } else {
                source
            };
            Pattern::compile(&source, case_insensitive)?
        };

        let file_search_pattern = match (&opts.match_files, &opts.file_search_regex) {
            (Some(p), _) | (None, Some(p)) => Some(Pattern::compile(p, case_insensitive)?),
            (None, None) => None,
        };

        let ackmate_dir_pattern = opts
            .ackmate_dir_filter
            .as_deref()
            .map(|p| Pattern::compile(p, false))
            .transpose()?;

        let vcs_ignore_pattern = if opts.skip_vcs_ignores {
            Pattern::compile(AGIGNORE_ONLY_PATTERN, false)?
        } else {
            Pattern::compile(VCS_IGNORE_PATTERN, false)?
        };

        let binary_ignore_pattern = if search_binary_files {
            None
        } else if opts.search_zip {
            Some(Pattern::compile(BINARY_EXTENSION_PATTERN_NO_ZIP, false)?)
        } else {
            Some(Pattern::compile(BINARY_EXTENSION_PATTERN, false)?)
        };

        let mut paths = opts.paths.clone();
        let search_stream =
            paths.is_empty() && !match_files && !std::io::stdin().is_terminal();
        if paths.is_empty() {
            paths.push(PathBuf::from("."));
        }

        // Demote the path heading when the target is one explicit file: the
        // user already knows which file the matches come from.
        let single_file_target = paths.len() == 1 && paths[0].is_file();
        let mut print_path = if opts.nofilename || opts.vimgrep || single_file_target || search_stream {
            PathPrint::Nothing
        } else if opts.noheading {
            PathPrint::EachLine
        } else {
            PathPrint::Top
        };
        if opts.ackmate {
            print_path = PathPrint::Top;
        }

        let mut print_line_numbers = !opts.nonumbers;
        if opts.only_matching && print_path == PathPrint::Nothing && single_file_target {
            print_line_numbers = false;
        }

        let print_filename_only =
            opts.files_with_matches || opts.files_without_matches || opts.count;
        let invert_match = opts.invert_match || opts.files_without_matches;

        let color = if opts.nocolor {
            false
        } else {
            opts.color || std::io::stdout().is_terminal()
        };

        let threads = match opts.threads {
            Some(n) if n > 0 => n,
            _ => thread::available_parallelism().map_or(1, |n| n.get()),
        };

        Ok(Config {
            query,
            pattern,
            literal: opts.fixed_strings,
            multiline: !opts.nomultiline,
            invert_match,
            max_matches_per_file: opts.max_count,
            max_search_depth: opts.depth,
            depth_set_by_user: opts.depth != DEFAULT_MAX_SEARCH_DEPTH,
            recurse_dirs: !opts.norecurse,
            follow_symlinks: opts.follow,
            one_dev: opts.one_device,
            search_hidden_files,
            search_binary_files,
            search_zip_files: opts.search_zip,
            search_stream,
            search_all_files,
            path_to_agignore: opts.path_to_ignore.clone(),
            ignore_patterns: opts.ignore_patterns.clone(),
            vcs_ignore_pattern,
            file_search_pattern,
            match_files,
            binary_ignore_pattern,
            ackmate_dir_pattern,
            print_path,
            print_filename_only,
            print_count: opts.count,
            print_line_numbers,
            print_break: !opts.nobreak,
            before: opts.before.or(opts.context).unwrap_or(0),
            after: opts.after.or(opts.context).unwrap_or(0),
            width: opts.width.unwrap_or(0),
            path_sep: if opts.null_separator { b'\0' } else { b'\n' },
            color,
            color_match: sgr_sequence(opts.color_match.as_deref().unwrap_or("30;43")),
            color_path: sgr_sequence(opts.color_path.as_deref().unwrap_or("1;32")),
            color_line_number: sgr_sequence(opts.color_line_number.as_deref().unwrap_or("1;33")),
            ackmate: opts.ackmate,
            vimgrep: opts.vimgrep,
            only_matching: opts.only_matching,
            passthrough: opts.passthrough,
            column: opts.column,
            stats: opts.stats,
            threads,
            stdout_inode: filesystem::stdout_inode(),
            paths,
        })
    }

    /// Whether context separators ("--") apply.
    pub fn context_enabled(&self) -> bool {
        self.before > 0 || self.after > 0
    }
}

fn sgr_sequence(codes: &str) -> String {
    format!("\x1b[{}m", codes)
}
