use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "sift",
    version,
    about = "Recursively search the filesystem for a regex pattern",
    after_long_help = "Bugs can be reported on GitHub: https://github.com/sift-grep/sift/issues",
    max_term_width = 98,
    args_override_self = true
)]
pub struct Opts {
    /// The search pattern, a regular expression
    #[arg(value_name = "PATTERN", required_unless_present = "match_files")]
    pub pattern: Option<String>,

    /// Directories or files to search (default: current directory)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Match case-insensitively
    #[arg(long, short = 'i', overrides_with_all = ["case_sensitive", "smart_case"])]
    pub ignore_case: bool,

    /// Match case-sensitively
    #[arg(long, short = 's', overrides_with_all = ["ignore_case", "smart_case"])]
    pub case_sensitive: bool,

    /// Case-insensitive unless the pattern contains uppercase characters (default)
    #[arg(long, short = 'S', overrides_with_all = ["ignore_case", "case_sensitive"])]
    pub smart_case: bool,

    /// Treat the pattern as a literal string, not a regex
    #[arg(long, short = 'Q', alias = "literal")]
    pub fixed_strings: bool,

    /// Only match whole words
    #[arg(long, short = 'w')]
    pub word_regexp: bool,

    /// Do not match regexes across newlines
    #[arg(long)]
    pub nomultiline: bool,

    /// Select lines that do not match the pattern
    #[arg(long, short = 'v')]
    pub invert_match: bool,

    /// Skip the rest of a file after NUM matches (0 = unlimited)
    #[arg(long = "max-count", short = 'm', value_name = "NUM", default_value_t = 0)]
    pub max_count: usize,

    /// Search up to NUM directories deep (-1 for unlimited)
    #[arg(long, value_name = "NUM", default_value_t = 25, allow_hyphen_values = true)]
    pub depth: i32,

    /// Do not recurse into subdirectories
    #[arg(long = "norecurse", short = 'n')]
    pub norecurse: bool,

    /// Follow symlinks
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Do not cross filesystem boundaries
    #[arg(long = "one-device")]
    pub one_device: bool,

    /// Search hidden files and directories
    #[arg(long)]
    pub hidden: bool,

    /// Search binary files for matches
    #[arg(long = "search-binary")]
    pub search_binary: bool,

    /// Search all files; does not include hidden files or binaries
    #[arg(long = "all-types", short = 'a')]
    pub all_types: bool,

    /// Search all files: alias for --all-types --hidden --search-binary
    #[arg(long, short = 'u')]
    pub unrestricted: bool,

    /// Ignore VCS ignore files (.gitignore, .hgignore) but not .agignore
    #[arg(long = "skip-vcs-ignores", short = 'U')]
    pub skip_vcs_ignores: bool,

    /// Use FILE as an additional ignore file in every directory
    #[arg(long = "path-to-ignore", short = 'p', value_name = "FILE")]
    pub path_to_ignore: Option<PathBuf>,

    /// Ignore files/directories matching PATTERN (may be repeated)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Limit the search to filenames matching PATTERN
    #[arg(long = "file-search-regex", short = 'G', value_name = "PATTERN")]
    pub file_search_regex: Option<String>,

    /// Print filenames matching PATTERN instead of searching their contents
    #[arg(short = 'g', value_name = "PATTERN")]
    pub match_files: Option<String>,

    /// Only print the names of files containing matches
    #[arg(long = "files-with-matches", short = 'l')]
    pub files_with_matches: bool,

    /// Only print the names of files that do not contain matches
    #[arg(long = "files-without-matches", short = 'L')]
    pub files_without_matches: bool,

    /// Only print the number of matches in each file
    #[arg(long, short = 'c')]
    pub count: bool,

    /// Print results in AckMate-parseable format
    #[arg(long)]
    pub ackmate: bool,

    /// Skip directories matching PATTERN when in AckMate mode
    #[arg(long = "ackmate-dir-filter", value_name = "PATTERN", hide_short_help = true)]
    pub ackmate_dir_filter: Option<String>,

    /// Print results like vim's :vimgrep /pattern/g would
    #[arg(long)]
    pub vimgrep: bool,

    /// Print only the matching parts of lines
    #[arg(long = "only-matching", short = 'o')]
    pub only_matching: bool,

    /// When searching a stream, print all lines even if they do not match
    #[arg(long)]
    pub passthrough: bool,

    /// Print column numbers in results
    #[arg(long)]
    pub column: bool,

    /// Print NUM lines after each match
    #[arg(
        long,
        short = 'A',
        value_name = "NUM",
        num_args = 0..=1,
        default_missing_value = "2"
    )]
    pub after: Option<usize>,

    /// Print NUM lines before each match
    #[arg(
        long,
        short = 'B',
        value_name = "NUM",
        num_args = 0..=1,
        default_missing_value = "2"
    )]
    pub before: Option<usize>,

    /// Print NUM lines before and after each match
    #[arg(
        long,
        short = 'C',
        value_name = "NUM",
        num_args = 0..=1,
        default_missing_value = "2"
    )]
    pub context: Option<usize>,

    /// Truncate match lines after NUM characters
    #[arg(long, short = 'W', value_name = "NUM")]
    pub width: Option<usize>,

    /// Search contents of compressed files
    #[arg(long = "search-zip", short = 'z')]
    pub search_zip: bool,

    /// Separate filenames with null (for 'xargs -0')
    #[arg(long = "null", short = '0')]
    pub null_separator: bool,

    /// Force color output even when not on a TTY
    #[arg(long, overrides_with = "nocolor")]
    pub color: bool,

    /// Disable color output
    #[arg(long, overrides_with = "color")]
    pub nocolor: bool,

    /// Color codes for result match numbers (default: 30;43)
    #[arg(long = "color-match", value_name = "SGR", hide_short_help = true)]
    pub color_match: Option<String>,

    /// Color codes for path names (default: 1;32)
    #[arg(long = "color-path", value_name = "SGR", hide_short_help = true)]
    pub color_path: Option<String>,

    /// Color codes for line numbers (default: 1;33)
    #[arg(long = "color-line-number", value_name = "SGR", hide_short_help = true)]
    pub color_line_number: Option<String>,

    /// Do not print line numbers
    #[arg(long = "nonumbers")]
    pub nonumbers: bool,

    /// Do not print a newline between results from different files
    #[arg(long = "nobreak")]
    pub nobreak: bool,

    /// Print the filename on each result line instead of as a heading
    #[arg(long = "noheading")]
    pub noheading: bool,

    /// Do not print file names at all
    #[arg(long = "nofilename", hide_short_help = true)]
    pub nofilename: bool,

    /// Print stats (files scanned, time taken, etc.)
    #[arg(long)]
    pub stats: bool,

    /// Number of search threads (default: number of logical CPUs)
    #[arg(long, short = 'j', value_name = "NUM", hide_short_help = true)]
    pub threads: Option<usize>,

    /// Enable debug-level log output
    #[arg(long, hide_short_help = true)]
    pub debug: bool,
}
