use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::SearchContext;
use crate::filesystem;
use crate::ignore::{self, IgnoreSet};
use crate::pool::{Spawner, Task};
use crate::searcher;
use crate::stats::Stats;
use crate::symloop::SymloopStatus;

/// Walk one directory: merge its ignore files, then dispatch a task per
/// admitted entry.
pub struct SearchDirectoryTask {
    ctx: Arc<SearchContext>,
    parent_ignores: Arc<IgnoreSet>,
    dirname: String,
    base_path: String,
    path: PathBuf,
    depth: i32,
    original_dev: u64,
}

impl SearchDirectoryTask {
    pub fn new(
        ctx: Arc<SearchContext>,
        parent_ignores: Arc<IgnoreSet>,
        dirname: String,
        base_path: String,
        path: PathBuf,
        depth: i32,
        original_dev: u64,
    ) -> SearchDirectoryTask {
        SearchDirectoryTask {
            ctx,
            parent_ignores,
            dirname,
            base_path,
            path,
            depth,
            original_dev,
        }
    }
}

impl Task for SearchDirectoryTask {
    fn run(self: Box<Self>, spawner: &Spawner, stats: &mut Stats) {
        let SearchDirectoryTask {
            ctx,
            parent_ignores,
            dirname,
            base_path,
            path,
            depth,
            original_dev,
        } = *self;
        search_dir(
            &ctx,
            spawner,
            stats,
            parent_ignores,
            &dirname,
            &base_path,
            &path,
            depth,
            original_dev,
        );
    }
}

/// Search the contents of one file.
pub struct SearchFileTask {
    ctx: Arc<SearchContext>,
    path: PathBuf,
}

impl SearchFileTask {
    pub fn new(ctx: Arc<SearchContext>, path: PathBuf) -> SearchFileTask {
        SearchFileTask { ctx, path }
    }
}

impl Task for SearchFileTask {
    fn run(self: Box<Self>, _spawner: &Spawner, stats: &mut Stats) {
        searcher::search_file(&self.ctx, stats, &self.path);
    }
}

struct Dirent {
    name: OsString,
    file_type: fs::FileType,
}

/// Read all entries of a directory; `.` and `..` are never returned.
fn scandir(path: &Path) -> std::io::Result<Vec<Dirent>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("skipping unreadable entry in {}: {}", path.display(), err);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) => entries.push(Dirent {
                name: entry.file_name(),
                file_type,
            }),
            Err(err) => {
                log::debug!("skipping {}: no file type: {}", entry.path().display(), err);
            }
        }
    }
    Ok(entries)
}

#[allow(clippy::too_many_arguments)]
pub fn search_dir(
    ctx: &Arc<SearchContext>,
    spawner: &Spawner,
    stats: &mut Stats,
    parent_ignores: Arc<IgnoreSet>,
    dirname: &str,
    base_path: &str,
    path: &Path,
    depth: i32,
    original_dev: u64,
) {
    match ctx.symloop.enter(path) {
        Ok(SymloopStatus::Entered) => {}
        Ok(SymloopStatus::Loop) => {
            log::error!("Recursive directory loop: {}", path.display());
            return;
        }
        Err(err) => {
            log::error!("Error stat()ing {}: {}", path.display(), err);
            return;
        }
    }

    let entries = match scandir(path) {
        Ok(entries) => entries,
        Err(err) if filesystem::is_not_directory_error(&err) => {
            // Not a directory; probably a file given as a root.
            searcher::search_file(ctx, stats, path);
            return;
        }
        Err(err) => {
            log::error!("Error opening directory {}: {}", path.display(), err);
            return;
        }
    };
    if entries.is_empty() {
        log::debug!("no results found in directory {}", path.display());
        return;
    }

    let ig = Arc::new(update_ignores(
        ctx,
        IgnoreSet::new(Some(parent_ignores), dirname),
        &entries,
        path,
    ));

    let path_str = path.to_string_lossy();
    let path_start = path_str
        .strip_prefix(base_path)
        .unwrap_or(&path_str)
        .trim_start_matches('/')
        .to_string();

    for entry in &entries {
        process_dirent(
            ctx,
            spawner,
            &ig,
            &path_start,
            base_path,
            path,
            entry,
            depth,
            original_dev,
        );
    }
}

/// Merge every ignore-rule carrier found in this directory into its
/// IgnoreSet, then compile the set's globs.
fn update_ignores(
    ctx: &SearchContext,
    mut ig: IgnoreSet,
    entries: &[Dirent],
    path: &Path,
) -> IgnoreSet {
    let config = &ctx.config;

    for entry in entries {
        let name = entry.name.to_string_lossy();
        match config.vcs_ignore_pattern.full_match_group(name.as_bytes(), 1) {
            // `.git` itself: load the repository's local exclude file.
            Some(true) => ig.load_ignore_file(&path.join(".git/info/exclude")),
            Some(false) if name == ".svn" => ig.load_svn_ignore(&path.join(".svn")),
            Some(false) => ig.load_ignore_file(&path.join(&entry.name)),
            None => {}
        }
    }

    if let Some(agignore) = &config.path_to_agignore {
        ig.load_ignore_file(agignore);
    }

    ig.build_patterns();
    ig
}

#[allow(clippy::too_many_arguments)]
fn process_dirent(
    ctx: &Arc<SearchContext>,
    spawner: &Spawner,
    ig: &Arc<IgnoreSet>,
    path_start: &str,
    base_path: &str,
    dir_path: &Path,
    entry: &Dirent,
    depth: i32,
    original_dev: u64,
) {
    let config = &ctx.config;
    let filename = entry.name.to_string_lossy();

    if !config.search_hidden_files && filename.starts_with('.') {
        return;
    }

    let file_type = entry.file_type;
    if file_type.is_symlink() && !config.follow_symlinks {
        log::debug!("{} ignored: it's a symlink", filename);
        return;
    }
    if filesystem::is_pipe(&file_type) {
        log::debug!("{} ignored: it's a named pipe", filename);
        return;
    }

    let full_path = dir_path.join(&entry.name);

    let is_dir = if file_type.is_dir() {
        true
    } else if file_type.is_symlink() {
        match fs::metadata(&full_path) {
            Ok(md) => md.is_dir(),
            Err(err) => {
                log::error!("Error following {}: {}", full_path.display(), err);
                return;
            }
        }
    } else {
        false
    };

    let unrestricted = config.search_all_files && config.path_to_agignore.is_none();
    if !unrestricted
        && ignore::is_ignored(
            ig,
            path_start,
            &filename,
            is_dir,
            config.ackmate_dir_pattern.as_ref(),
        )
    {
        return;
    }

    if config.one_dev {
        match fs::symlink_metadata(&full_path) {
            Ok(md) => {
                if filesystem::dev_ino(&md).0 != original_dev {
                    log::debug!(
                        "{} crosses a device boundary (probably a mount point), skipping",
                        full_path.display()
                    );
                    return;
                }
            }
            Err(_) => {
                log::error!(
                    "Failed to get device information for {}. Skipping...",
                    full_path.display()
                );
                return;
            }
        }
    }

    if !is_dir {
        if let Some(file_pattern) = &config.file_search_pattern {
            let name_bytes = filesystem::osstr_to_bytes(&entry.name);
            if !file_pattern.has_partial_match(&name_bytes) {
                log::debug!("skipping {}: no file-search-regex match", full_path.display());
                return;
            }
            if config.match_files {
                log::debug!("match_files: file-search-regex matched {}", full_path.display());
                ctx.printer
                    .print_path_only(config, &full_path.to_string_lossy());
                ctx.found_match();
                return;
            }
        }

        if let Some(binary_pattern) = &config.binary_ignore_pattern {
            if binary_pattern.has_partial_match(filename.as_bytes()) {
                log::debug!("skipping {}: binary extension", full_path.display());
                return;
            }
        }

        log::debug!("{} added to work queue", full_path.display());
        spawner.spawn(Box::new(SearchFileTask::new(Arc::clone(ctx), full_path)));
    } else if config.recurse_dirs {
        if depth < config.max_search_depth || config.max_search_depth == -1 {
            log::debug!("searching dir {}", full_path.display());
            spawner.spawn(Box::new(SearchDirectoryTask::new(
                Arc::clone(ctx),
                Arc::clone(ig),
                filename.into_owned(),
                base_path.to_string(),
                full_path,
                depth + 1,
                original_dev,
            )));
        } else if config.depth_set_by_user {
            log::debug!(
                "Skipping {}. Use the --depth option to search deeper.",
                full_path.display()
            );
        } else {
            log::warn!(
                "Skipping {}. Use the --depth option to search deeper.",
                full_path.display()
            );
        }
    }
}
