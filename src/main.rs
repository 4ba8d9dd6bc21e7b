#[macro_use]
mod error;

mod cli;
mod config;
mod context;
mod exit_codes;
mod filesystem;
mod ignore;
mod pattern;
mod pool;
mod printer;
mod regex_helper;
mod searcher;
mod stats;
mod symloop;
mod walk;

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use crate::cli::Opts;
use crate::config::Config;
use crate::context::SearchContext;
use crate::exit_codes::ExitCode;
use crate::ignore::IgnoreSet;
use crate::pool::ThreadPool;
use crate::printer::Printer;
use crate::stats::Stats;
use crate::walk::SearchDirectoryTask;

fn main() {
    let opts = Opts::parse();
    init_logging(opts.debug);

    match run(opts) {
        Ok(code) => code.exit(),
        Err(err) => {
            print_error_and_exit!("{:#}", err);
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn run(opts: Opts) -> Result<ExitCode> {
    let start = Instant::now();
    let config = Config::from_opts(opts)?;

    let mut root_ignores = IgnoreSet::new(None, "");
    for pattern in &config.ignore_patterns {
        root_ignores.add_pattern(pattern);
    }
    root_ignores.build_patterns();

    let print_stats = config.stats;
    let search_stream = config.search_stream;
    let one_dev = config.one_dev;
    let threads = config.threads;
    let paths = config.paths.clone();

    let ctx = Arc::new(SearchContext::new(
        config,
        Arc::new(root_ignores),
        Printer::stdout(),
    ));

    let mut totals = Stats::default();
    if search_stream {
        let stdin = std::io::stdin();
        searcher::search_stream(&ctx, &mut totals, stdin.lock(), "");
    } else {
        let pool = ThreadPool::new(threads);
        for path in &paths {
            log::debug!("searching path {} for {}", path.display(), ctx.config.query);

            // The device is only consulted when one_dev is set.
            let original_dev = if one_dev {
                match fs::symlink_metadata(path) {
                    Ok(md) => filesystem::dev_ino(&md).0,
                    Err(_) => {
                        log::error!(
                            "Failed to get device information for path {}. Skipping...",
                            path.display()
                        );
                        0
                    }
                }
            } else {
                0
            };

            pool.spawn(Box::new(SearchDirectoryTask::new(
                Arc::clone(&ctx),
                Arc::clone(&ctx.root_ignores),
                String::new(),
                path.to_string_lossy().into_owned(),
                path.clone(),
                0,
                original_dev,
            )));
        }

        pool.wait_quiescent();
        totals = pool.shutdown();
    }

    ctx.printer.flush();

    if print_stats {
        let elapsed = start.elapsed();
        println!(
            "{} matches\n{} files contained matches\n{} files searched\n{} bytes searched\n{:.6} seconds",
            totals.total_matches,
            totals.total_file_matches,
            totals.total_files,
            totals.total_bytes,
            elapsed.as_secs_f64()
        );
    }

    Ok(if ctx.any_match_found() {
        ExitCode::Success
    } else {
        ExitCode::NoResults
    })
}
