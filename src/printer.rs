use std::collections::VecDeque;
use std::io::{self, BufWriter, Write};
use std::ops::Range;
use std::sync::Mutex;

use memchr::memchr;

use crate::config::{Config, PathPrint};
use crate::exit_codes::ExitCode;
use crate::filesystem::normalize_path;
use crate::searcher::Match;

const COLOR_RESET: &[u8] = b"\x1b[m\x1b[K";
const TRUNCATE_MARKER: &[u8] = b" [...]";

/// Serialized match output.
///
/// Workers hand completed per-file results to the printer; the internal lock
/// is held for the whole of a file's output so results from different files
/// never interleave.
pub struct Printer {
    inner: Mutex<State>,
}

struct State {
    out: Box<dyn Write + Send>,
    first_file_match: bool,
}

impl Printer {
    pub fn new(out: Box<dyn Write + Send>) -> Printer {
        Printer {
            inner: Mutex::new(State {
                out,
                first_file_match: true,
            }),
        }
    }

    pub fn stdout() -> Printer {
        Printer::new(Box::new(BufWriter::new(io::stdout())))
    }

    /// Print one file's matches: heading, context window, highlighting.
    pub fn print_file_matches(
        &self,
        config: &Config,
        path: &str,
        buf: &[u8],
        matches: &[Match],
        stream_line: Option<u64>,
    ) {
        let mut state = self.inner.lock().unwrap();
        let result = print_file_matches_impl(&mut state, config, path, buf, matches, stream_line);
        check_output(result);
    }

    /// Print only the path (for -l, -g and friends), terminated by the path
    /// separator byte.
    pub fn print_path_only(&self, config: &Config, path: &str) {
        let mut state = self.inner.lock().unwrap();
        let result = print_path(&mut state.out, config, path, config.path_sep);
        check_output(result);
    }

    /// Print `path:count` (for -c).
    pub fn print_path_count(&self, config: &Config, path: &str, count: u64) {
        let mut state = self.inner.lock().unwrap();
        let result = print_path_count_impl(&mut state.out, config, path, count);
        check_output(result);
    }

    /// Announce a matching binary file without spilling its contents.
    pub fn print_binary_file_matches(&self, config: &Config, path: &str) {
        let mut state = self.inner.lock().unwrap();
        let result = (|| {
            print_file_separator(&mut state, config)?;
            writeln!(state.out, "Binary file {} matches.", normalize_path(path))
        })();
        check_output(result);
    }

    /// Echo a raw line (stream passthrough).
    pub fn write_raw(&self, bytes: &[u8]) {
        let mut state = self.inner.lock().unwrap();
        let result = state.out.write_all(bytes);
        check_output(result);
    }

    pub fn flush(&self) {
        let mut state = self.inner.lock().unwrap();
        let result = state.out.flush();
        check_output(result);
    }
}

/// A failed write means the consumer went away (e.g. `head` closed the
/// pipe); exit quietly.
fn check_output(result: io::Result<()>) {
    if let Err(err) = result {
        if err.kind() != io::ErrorKind::BrokenPipe {
            print_error!("error writing output: {}", err);
            ExitCode::Error.exit();
        }
        ExitCode::Success.exit();
    }
}

fn print_file_separator(state: &mut State, config: &Config) -> io::Result<()> {
    if !state.first_file_match && config.print_break {
        state.out.write_all(b"\n")?;
    }
    state.first_file_match = false;
    Ok(())
}

fn print_path(out: &mut dyn Write, config: &Config, path: &str, sep: u8) -> io::Result<()> {
    if config.print_path == PathPrint::Nothing && !config.vimgrep {
        return Ok(());
    }
    let path = normalize_path(path);

    if config.ackmate {
        write!(out, ":{}", path)?;
    } else if config.color {
        write!(out, "{}{}", config.color_path, path)?;
        out.write_all(COLOR_RESET)?;
    } else {
        write!(out, "{}", path)?;
    }
    out.write_all(&[sep])
}

fn print_path_count_impl(
    out: &mut dyn Write,
    config: &Config,
    path: &str,
    count: u64,
) -> io::Result<()> {
    if !path.is_empty() {
        print_path(out, config, path, b':')?;
    }
    if config.color {
        write!(out, "{}{}", config.color_line_number, count)?;
        out.write_all(COLOR_RESET)?;
    } else {
        write!(out, "{}", count)?;
    }
    out.write_all(&[config.path_sep])
}

fn print_line_number(
    out: &mut dyn Write,
    config: &Config,
    line: u64,
    sep: u8,
) -> io::Result<()> {
    if !config.print_line_numbers {
        return Ok(());
    }
    if config.color {
        write!(out, "{}{}", config.color_line_number, line)?;
        out.write_all(COLOR_RESET)?;
    } else {
        write!(out, "{}", line)?;
    }
    out.write_all(&[sep])
}

fn print_column_number(
    out: &mut dyn Write,
    m: &Match,
    line_start: usize,
    sep: u8,
) -> io::Result<()> {
    let column = if line_start <= m.start {
        m.start - line_start + 1
    } else {
        0
    };
    write!(out, "{}", column)?;
    out.write_all(&[sep])
}

fn print_file_matches_impl(
    state: &mut State,
    config: &Config,
    path: &str,
    buf: &[u8],
    matches: &[Match],
    stream_line: Option<u64>,
) -> io::Result<()> {
    if matches.is_empty() {
        return Ok(());
    }

    print_file_separator(state, config)?;
    let out = &mut state.out;
    if config.print_path == PathPrint::Top {
        print_path(out, config, path, config.path_sep)?;
    }

    let context_sep = if config.ackmate || config.vimgrep { b':' } else { b'-' };

    let mut line_number = stream_line.unwrap_or(1);
    let mut line_start = 0usize;
    // Ring of the most recent lines, for before-context replay.
    let mut prev_lines: VecDeque<(u64, Range<usize>)> = VecDeque::new();
    let mut lines_since_last_match = config.before + config.after + 2;
    let mut printed_any_match = false;
    // Matches fully emitted so far (ackmate and vimgrep group by end line).
    let mut printed_upto = 0usize;
    // First match that may still be relevant to the current or later lines.
    let mut first_live = 0usize;

    loop {
        let line_end = memchr(b'\n', &buf[line_start..])
            .map(|i| line_start + i)
            .unwrap_or(buf.len());

        while first_live < matches.len()
            && !matches[first_live].on_line(line_start, line_end)
            && matches[first_live].end <= line_start
        {
            first_live += 1;
        }
        let mut last_live = first_live;
        while last_live < matches.len() && matches[last_live].on_line(line_start, line_end) {
            last_live += 1;
        }
        let line_matches = &matches[first_live..last_live];

        if !line_matches.is_empty() {
            if config.context_enabled()
                && printed_any_match
                && lines_since_last_match > config.before + config.after + 1
            {
                out.write_all(b"--\n")?;
            }

            // Replay buffered lines not already printed as trailing context.
            if config.before > 0 {
                let unprinted = lines_since_last_match.saturating_sub(config.after);
                let count = config.before.min(unprinted).min(prev_lines.len());
                let skip = prev_lines.len() - count;
                for (number, range) in prev_lines.iter().skip(skip) {
                    print_context_line(out, config, path, *number, &buf[range.clone()], context_sep)?;
                }
            }

            if config.ackmate {
                let group_end = matches[printed_upto..]
                    .iter()
                    .position(|m| m.end > line_end)
                    .map(|i| printed_upto + i)
                    .unwrap_or(matches.len());
                print_ackmate_line(
                    out,
                    config,
                    line_number,
                    &buf[line_start..line_end],
                    line_start,
                    &matches[printed_upto..group_end],
                )?;
                printed_upto = group_end;
            } else if config.vimgrep {
                let group_end = matches[printed_upto..]
                    .iter()
                    .position(|m| m.end > line_end)
                    .map(|i| printed_upto + i)
                    .unwrap_or(matches.len());
                for m in &matches[printed_upto..group_end] {
                    print_vimgrep_line(
                        out,
                        config,
                        path,
                        line_number,
                        &buf[line_start..line_end],
                        line_start,
                        m,
                    )?;
                }
                printed_upto = group_end;
            } else {
                print_default_line(
                    out,
                    config,
                    path,
                    line_number,
                    line_start,
                    line_end,
                    buf,
                    line_matches,
                )?;
            }

            printed_any_match = true;
            lines_since_last_match = 0;
        } else {
            lines_since_last_match += 1;
            if lines_since_last_match <= config.after {
                print_context_line(
                    out,
                    config,
                    path,
                    line_number,
                    &buf[line_start..line_end],
                    context_sep,
                )?;
            } else if first_live >= matches.len() {
                // Nothing left to print.
                break;
            }
        }

        if config.before > 0 {
            prev_lines.push_back((line_number, line_start..line_end));
            if prev_lines.len() > config.before {
                prev_lines.pop_front();
            }
        }

        if line_end >= buf.len() {
            break;
        }
        line_start = line_end + 1;
        line_number += 1;
        if line_start >= buf.len() {
            break;
        }
    }

    Ok(())
}

fn print_context_line(
    out: &mut dyn Write,
    config: &Config,
    path: &str,
    line_number: u64,
    line: &[u8],
    sep: u8,
) -> io::Result<()> {
    if config.print_path == PathPrint::EachLine {
        print_path(out, config, path, b':')?;
    }
    print_line_number(out, config, line_number, sep)?;
    out.write_all(line)?;
    out.write_all(b"\n")
}

/// `<line>;<start> <len>[,<start> <len>...]:<text>` with offsets relative to
/// the line start, clamped at zero for matches that began earlier.
fn print_ackmate_line(
    out: &mut dyn Write,
    config: &Config,
    line_number: u64,
    line: &[u8],
    line_start: usize,
    group: &[Match],
) -> io::Result<()> {
    print_line_number(out, config, line_number, b';')?;
    for (i, m) in group.iter().enumerate() {
        let start = m.start.saturating_sub(line_start);
        write!(out, "{} {}", start, m.end - m.start)?;
        if i + 1 == group.len() {
            out.write_all(b":")?;
        } else {
            out.write_all(b",")?;
        }
    }
    write_width_limited(out, config, line)?;
    out.write_all(b"\n")
}

fn print_vimgrep_line(
    out: &mut dyn Write,
    config: &Config,
    path: &str,
    line_number: u64,
    line: &[u8],
    line_start: usize,
    m: &Match,
) -> io::Result<()> {
    let column = m.start.saturating_sub(line_start) + 1;
    write!(out, "{}:{}:{}:", normalize_path(path), line_number, column)?;
    write_width_limited(out, config, line)?;
    out.write_all(b"\n")
}

fn write_width_limited(out: &mut dyn Write, config: &Config, line: &[u8]) -> io::Result<()> {
    if config.width > 0 && line.len() > config.width {
        out.write_all(&line[..config.width])
    } else {
        out.write_all(line)
    }
}

#[allow(clippy::too_many_arguments)]
fn print_default_line(
    out: &mut dyn Write,
    config: &Config,
    path: &str,
    line_number: u64,
    line_start: usize,
    line_end: usize,
    buf: &[u8],
    line_matches: &[Match],
) -> io::Result<()> {
    let line_header = |out: &mut dyn Write, m: &Match| -> io::Result<()> {
        if config.print_path == PathPrint::EachLine && !config.search_stream {
            print_path(out, config, path, b':')?;
        }
        print_line_number(out, config, line_number, b':')?;
        if config.column {
            print_column_number(out, m, line_start, b':')?;
        }
        Ok(())
    };

    // Clip every match to this line's extent.
    let spans: Vec<Range<usize>> = line_matches
        .iter()
        .map(|m| m.start.max(line_start)..m.end.min(line_end).max(m.start.max(line_start)))
        .collect();

    if config.only_matching {
        for (span, m) in spans.iter().zip(line_matches) {
            line_header(out, m)?;
            if config.color {
                write!(out, "{}", config.color_match)?;
            }
            out.write_all(&buf[span.clone()])?;
            if config.color {
                out.write_all(COLOR_RESET)?;
            }
            out.write_all(b"\n")?;
        }
        return Ok(());
    }

    line_header(out, &line_matches[0])?;

    let limit = if config.width > 0 {
        line_end.min(line_start + config.width)
    } else {
        line_end
    };

    let mut pos = line_start;
    for span in &spans {
        if pos >= limit {
            break;
        }
        let plain_end = span.start.min(limit);
        if plain_end > pos {
            out.write_all(&buf[pos..plain_end])?;
            pos = plain_end;
        }
        if span.start >= limit {
            break;
        }
        if config.color {
            write!(out, "{}", config.color_match)?;
        }
        let span_end = span.end.min(limit);
        out.write_all(&buf[span.start..span_end])?;
        if config.color {
            out.write_all(COLOR_RESET)?;
        }
        pos = span_end.max(pos);
    }
    if pos < limit {
        out.write_all(&buf[pos..limit])?;
    }
    if limit < line_end {
        out.write_all(TRUNCATE_MARKER)?;
    }
    out.write_all(b"\n")
}
