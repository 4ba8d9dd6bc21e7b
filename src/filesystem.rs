use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::io;

/// Normalize a path for display: strip a leading `./`, collapse a leading
/// `//` to `/`.
pub fn normalize_path(path: &str) -> &str {
    if path.len() < 3 {
        return path;
    }
    if let Some(stripped) = path.strip_prefix("./") {
        return stripped;
    }
    if path.starts_with("//") {
        return &path[1..];
    }
    path
}

#[cfg(unix)]
pub fn is_pipe(ft: &fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ft.is_fifo()
}

#[cfg(not(unix))]
pub fn is_pipe(_: &fs::FileType) -> bool {
    false
}

/// The `(device, inode)` pair identifying a file across hardlinks and
/// symlinks.
#[cfg(unix)]
pub fn dev_ino(md: &fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (md.dev(), md.ino())
}

#[cfg(not(unix))]
pub fn dev_ino(_: &fs::Metadata) -> (u64, u64) {
    (0, 0)
}

/// Whether a directory-read failure means "this path is actually a file".
pub fn is_not_directory_error(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::ENOTDIR)
    }
    #[cfg(not(unix))]
    {
        err.kind() == io::ErrorKind::InvalidInput
    }
}

/// The inode stdout is redirected to, if any. Files with this inode are
/// skipped so the search never reads its own output.
#[cfg(unix)]
pub fn stdout_inode() -> Option<u64> {
    use std::mem;
    use std::os::unix::io::AsRawFd;

    let fd = io::stdout().as_raw_fd();
    let mut stat: libc::stat = unsafe { mem::zeroed() };
    let rv = unsafe { libc::fstat(fd, &mut stat) };
    if rv == 0 && (stat.st_mode & libc::S_IFMT) == libc::S_IFREG {
        Some(stat.st_ino as u64)
    } else {
        None
    }
}

#[cfg(not(unix))]
pub fn stdout_inode() -> Option<u64> {
    None
}

#[cfg(unix)]
pub fn osstr_to_bytes(input: &OsStr) -> Cow<[u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(input.as_bytes())
}

#[cfg(not(unix))]
pub fn osstr_to_bytes(input: &OsStr) -> Cow<[u8]> {
    let string = input.to_string_lossy();

    match string {
        Cow::Owned(string) => Cow::Owned(string.into_bytes()),
        Cow::Borrowed(string) => Cow::Borrowed(string.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_display() {
        assert_eq!(normalize_path("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_path("//etc/hosts"), "/etc/hosts");
        assert_eq!(normalize_path("src/main.rs"), "src/main.rs");
        assert_eq!(normalize_path("./"), "./");
    }
}
