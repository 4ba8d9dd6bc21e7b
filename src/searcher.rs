use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Result};
use memchr::memchr;

use crate::context::SearchContext;
use crate::filesystem;
use crate::stats::Stats;

/// Files smaller than this are read into a stack buffer.
const STACK_BUFFER_SIZE: usize = 24 * 1024;
/// Files at least this large are memory-mapped instead of read.
const MMAP_THRESHOLD: u64 = 512 * 1024;

/// A half-open byte interval `[start, end)` into the searched buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    /// Does the match fall on the line `[line_start, line_end)`? Zero-width
    /// matches belong to the line whose span contains their position.
    pub fn on_line(&self, line_start: usize, line_end: usize) -> bool {
        if self.start == self.end {
            self.start >= line_start && self.start <= line_end
        } else {
            self.start <= line_end && self.end > line_start
        }
    }
}

/// Open, classify and search one file, dispatching matches to the printer.
pub fn search_file(ctx: &SearchContext, stats: &mut Stats, path: &Path) {
    let path_str = path.to_string_lossy();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            log::error!("Skipping {}: error opening file: {}", path_str, err);
            return;
        }
    };
    let md = match file.metadata() {
        Ok(md) => md,
        Err(err) => {
            log::error!("Skipping {}: error reading metadata: {}", path_str, err);
            return;
        }
    };

    if let Some(out_inode) = ctx.config.stdout_inode {
        if filesystem::dev_ino(&md).1 == out_inode {
            log::debug!("Skipping {}: stdout is redirected to it", path_str);
            return;
        }
    }

    if filesystem::is_pipe(&md.file_type()) {
        log::debug!("{} is a named pipe, stream searching", path_str);
        search_stream(ctx, stats, BufReader::new(file), &path_str);
        return;
    }

    let len = md.len();
    if len == 0 {
        log::debug!("Skipping {}: file is empty", path_str);
        return;
    }

    if len < STACK_BUFFER_SIZE as u64 {
        let mut stack_buf = [0u8; STACK_BUFFER_SIZE];
        match read_full(file, &mut stack_buf[..len as usize]) {
            Ok(n) => search_loaded(ctx, stats, &stack_buf[..n], &path_str),
            Err(err) => log::error!("Skipping {}: read error: {}", path_str, err),
        }
    } else if len < MMAP_THRESHOLD {
        let mut data = Vec::with_capacity(len as usize);
        let mut file = file;
        match file.read_to_end(&mut data) {
            Ok(_) => search_loaded(ctx, stats, &data, &path_str),
            Err(err) => log::error!("Skipping {}: read error: {}", path_str, err),
        }
    } else {
        let mmap = match unsafe { memmap2::Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(err) => {
                log::error!("Skipping {}: mmap failed: {}", path_str, err);
                return;
            }
        };
        #[cfg(unix)]
        let _ = mmap.advise(memmap2::Advice::Sequential);
        search_loaded(ctx, stats, &mmap, &path_str);
    }
}

fn read_full(mut file: File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Route a fully loaded buffer through compression sniffing, then search it.
fn search_loaded(ctx: &SearchContext, stats: &mut Stats, buf: &[u8], path: &str) {
    if ctx.config.search_zip_files {
        if let Some(kind) = CompressionKind::sniff(buf) {
            match decompress(kind, buf) {
                Ok(data) => search_buf(ctx, stats, &data, path, None),
                Err(err) => log::error!("Cannot decompress {}: {}", path, err),
            }
            return;
        }
    }
    search_buf(ctx, stats, buf, path, None);
}

/// Search one buffer and print the result. This is the tail of every search
/// path: walked files, decompressed buffers, and single stream lines.
pub fn search_buf(
    ctx: &SearchContext,
    stats: &mut Stats,
    buf: &[u8],
    path: &str,
    stream_line: Option<u64>,
) {
    let config = &ctx.config;

    let binary = if config.search_stream || config.search_binary_files {
        false
    } else {
        is_binary(buf)
    };

    let mut matches = find_matches(ctx, buf, path);
    if config.invert_match {
        matches = invert_matches(buf, &matches);
    }

    stats.record_file(buf.len() as u64, matches.len() as u64);

    if !matches.is_empty() {
        ctx.found_match();
        if config.print_filename_only {
            // -L composes filename-only printing with inverted matching; a
            // file without matches inverts to exactly one whole-buffer match,
            // so anything above one match means the file did match.
            if !config.invert_match || matches.len() < 2 {
                if config.print_count {
                    ctx.printer.print_path_count(config, path, matches.len() as u64);
                } else {
                    ctx.printer.print_path_only(config, path);
                }
            }
        } else if binary {
            ctx.printer.print_binary_file_matches(config, path);
        } else {
            ctx.printer.print_file_matches(config, path, buf, &matches, stream_line);
        }
    } else if config.search_stream && config.passthrough {
        ctx.printer.write_raw(buf);
    } else {
        log::debug!("No match in {}", path);
    }
}

/// Read one line at a time, searching each with an externally supplied line
/// number.
pub fn search_stream<R: BufRead>(ctx: &SearchContext, stats: &mut Stats, mut reader: R, path: &str) {
    let mut line = Vec::new();
    let mut line_number = 0u64;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                line_number += 1;
                search_buf(ctx, stats, &line, path, Some(line_number));
            }
            Err(err) => {
                log::error!("Error reading {}: {}", path, err);
                break;
            }
        }
    }
}

/// Run the pattern over the buffer, line by line or across the whole buffer
/// in multiline mode. Matches are absolute buffer offsets, non-overlapping
/// and sorted; zero-width matches advance the cursor by one byte.
fn find_matches(ctx: &SearchContext, buf: &[u8], path: &str) -> Vec<Match> {
    let config = &ctx.config;
    let mut matches = Vec::new();

    // `.` matches everything; skip the engine.
    if !config.literal && config.query == "." {
        matches.push(Match { start: 0, end: buf.len() });
        return matches;
    }

    let cap = config.max_matches_per_file;

    if config.multiline {
        let mut offset = 0;
        while offset < buf.len() {
            let Some((start, end)) = config.pattern.partial_match(buf, offset) else {
                break;
            };
            matches.push(Match { start, end });
            offset = end;
            if start == end {
                offset += 1;
            }
            if cap > 0 && matches.len() >= cap {
                log::error!("Too many matches in {}. Skipping the rest of this file.", path);
                break;
            }
        }
    } else {
        let mut line_start = 0;
        'file: while line_start < buf.len() {
            let line_end = memchr(b'\n', &buf[line_start..])
                .map(|i| line_start + i)
                .unwrap_or(buf.len());
            let line = &buf[line_start..line_end];

            let mut line_offset = 0;
            while line_offset < line.len() {
                let Some((start, end)) = config.pattern.partial_match(line, line_offset) else {
                    break;
                };
                matches.push(Match {
                    start: line_start + start,
                    end: line_start + end,
                });
                line_offset = end;
                if start == end {
                    line_offset += 1;
                }
                if cap > 0 && matches.len() >= cap {
                    log::error!("Too many matches in {}. Skipping the rest of this file.", path);
                    break 'file;
                }
            }
            line_start = line_end + 1;
        }
    }

    matches
}

/// Replace the match set with its line-level complement: every line not
/// touched by a match becomes part of a match, with runs of consecutive
/// unmatched lines merged into a single interval.
pub fn invert_matches(buf: &[u8], matches: &[Match]) -> Vec<Match> {
    if buf.is_empty() {
        return Vec::new();
    }
    if matches.is_empty() {
        return vec![Match { start: 0, end: buf.len() }];
    }

    let mut inverted = Vec::new();
    let mut run_start = None;
    let mut last_line_end = 0;
    let mut mi = 0;
    let mut line_start = 0;

    while line_start < buf.len() {
        let line_end = memchr(b'\n', &buf[line_start..])
            .map(|i| line_start + i)
            .unwrap_or(buf.len());

        while mi < matches.len()
            && matches[mi].end <= line_start
            && !(matches[mi].start == matches[mi].end && matches[mi].start >= line_start)
        {
            mi += 1;
        }
        let line_matched = mi < matches.len() && matches[mi].on_line(line_start, line_end);

        if line_matched {
            if let Some(start) = run_start.take() {
                inverted.push(Match { start, end: last_line_end });
            }
        } else if run_start.is_none() {
            run_start = Some(line_start);
        }

        last_line_end = line_end;
        line_start = line_end + 1;
    }

    if let Some(start) = run_start {
        inverted.push(Match { start, end: last_line_end });
    }
    inverted
}

/// Content-based binary detection over the first 512 bytes.
pub fn is_binary(buf: &[u8]) -> bool {
    if buf.is_empty() {
        return false;
    }
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        // UTF-8 BOM. This isn't binary.
        return false;
    }
    if buf.starts_with(b"%PDF-") {
        return true;
    }

    let total = buf.len().min(512);
    if memchr(0x00, &buf[..total]).is_some() {
        return true;
    }

    let mut suspicious = 0usize;
    let mut i = 0;
    while i < total {
        let b = buf[i];
        if b >= 0x80 {
            if (0xC0..0xE0).contains(&b) {
                if i + 1 >= total {
                    break;
                }
                i += 2;
                if (0x80..0xC0).contains(&buf[i - 1]) {
                    continue;
                }
                suspicious += 1;
                continue;
            }
            if (0xE0..0xF0).contains(&b) {
                if i + 2 >= total {
                    break;
                }
                i += 3;
                if (0x80..0xC0).contains(&buf[i - 2]) && (0x80..0xC0).contains(&buf[i - 1]) {
                    continue;
                }
                suspicious += 1;
                continue;
            }
            suspicious += 1;
        } else if b < 0x20 && !matches!(b, 0x08 | 0x09 | 0x0A | 0x0C | 0x0D) {
            suspicious += 1;
        }
        i += 1;
    }

    suspicious * 10 > total
}

/// Compressed container formats recognized by their magic numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionKind {
    Gzip,
    Bzip2,
    Xz,
    Zip,
}

impl CompressionKind {
    pub fn sniff(buf: &[u8]) -> Option<CompressionKind> {
        if buf.starts_with(&[0x1F, 0x8B]) {
            Some(CompressionKind::Gzip)
        } else if buf.starts_with(b"BZh") {
            Some(CompressionKind::Bzip2)
        } else if buf.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            Some(CompressionKind::Xz)
        } else if buf.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            Some(CompressionKind::Zip)
        } else {
            None
        }
    }
}

/// Inflate a recognized buffer. Only gzip is wired in; the other formats are
/// classified so they can be reported, not silently mis-searched.
fn decompress(kind: CompressionKind, buf: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Gzip => {
            let mut data = Vec::new();
            flate2::read::GzDecoder::new(buf)
                .read_to_end(&mut data)
                .map_err(|err| anyhow!("gzip error: {}", err))?;
            Ok(data)
        }
        other => Err(anyhow!("{:?} decompression is not supported", other)),
    }
}
