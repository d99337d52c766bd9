//! Blocking implementations

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::TreeError;

fn merge_err(path: &Utf8Path) -> impl FnOnce(io::Error) -> TreeError + '_ {
    move |source| TreeError::Merge {
        path: path.to_owned(),
        source,
    }
}

fn utf8(path: &std::path::Path) -> Result<&Utf8Path, TreeError> {
    Utf8Path::from_path(path).ok_or_else(|| TreeError::NonUtf8Path(path.to_path_buf()))
}

fn walk_failure(root: &Utf8Path, e: walkdir::Error) -> (Utf8PathBuf, io::Error) {
    let path = e
        .path()
        .and_then(Utf8Path::from_path)
        .unwrap_or(root)
        .to_owned();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    (path, source)
}

fn walk_err(root: &Utf8Path, e: walkdir::Error) -> TreeError {
    let (path, source) = walk_failure(root, e);
    TreeError::Merge { path, source }
}

/// `path` with symlinks resolved. Trailing components that do not exist yet
/// are appended to the resolved part that does.
fn resolve(path: &Utf8Path) -> io::Result<PathBuf> {
    let missing = match fs::canonicalize(path) {
        Ok(resolved) => return Ok(resolved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => e,
        Err(e) => return Err(e),
    };
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(missing);
    };
    let parent = if parent.as_str().is_empty() {
        Utf8Path::new(".")
    } else {
        parent
    };
    Ok(resolve(parent)?.join(name))
}

/// Whether `a` and `b` name the same existing file
fn is_same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Overlay the tree at `src` onto `dst`, creating `dst` if absent.
///
/// Existing files in `dst` are replaced, everything else in `dst` is left
/// alone. File modes and times are preserved, symlinks are recreated rather
/// than followed. Returns the number of files and links written.
///
/// Merging a tree onto itself writes nothing. A `dst` inside `src` is
/// rejected.
pub fn merge_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<usize, TreeError> {
    let meta = fs::symlink_metadata(src).map_err(merge_err(src))?;
    if !meta.is_dir() {
        return Err(TreeError::Merge {
            path: src.to_owned(),
            source: io::Error::new(io::ErrorKind::NotADirectory, "merge source is not a directory"),
        });
    }

    let src_real = resolve(src).map_err(merge_err(src))?;
    let dst_real = resolve(dst).map_err(merge_err(dst))?;
    if src_real == dst_real {
        debug!(src = %src, dst = %dst, "source and destination are the same tree");
        return Ok(0);
    }
    if dst_real.starts_with(&src_real) {
        return Err(TreeError::Merge {
            path: dst.to_owned(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "destination is inside the merge source"),
        });
    }

    let mut written = 0;
    // Directory modes and times are applied last, once their contents are in
    // place, so read-only source directories can still be populated.
    let mut dirs: Vec<(Utf8PathBuf, fs::Metadata)> = Vec::new();

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| walk_err(src, e))?;
        let path = utf8(entry.path())?;
        let rel = path.strip_prefix(src).unwrap_or(Utf8Path::new(""));
        let target = dst.join(rel);
        let meta = entry.metadata().map_err(|e| walk_err(src, e))?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(merge_err(&target))?;
            dirs.push((target, meta));
        } else if file_type.is_symlink() {
            copy_symlink(path, &target)?;
            written += 1;
        } else {
            copy_file(path, &target, &meta)?;
            written += 1;
        }
    }

    for (dir, meta) in dirs.iter().rev() {
        fs::set_permissions(dir, meta.permissions()).map_err(merge_err(dir))?;
        set_times_from(dir, meta)?;
    }

    debug!(src = %src, dst = %dst, files = written, "merged tree");
    Ok(written)
}

/// Copy each of `files` into `dst_dir` under its own file name.
pub fn merge_files(files: &[Utf8PathBuf], dst_dir: &Utf8Path) -> Result<usize, TreeError> {
    fs::create_dir_all(dst_dir).map_err(merge_err(dst_dir))?;

    for file in files {
        let name = file.file_name().ok_or_else(|| TreeError::Merge {
            path: file.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
        let meta = fs::metadata(file).map_err(merge_err(file))?;
        copy_file(file, &dst_dir.join(name), &meta)?;
    }

    debug!(dst = %dst_dir, files = files.len(), "merged files");
    Ok(files.len())
}

/// List the auto-generated runtime files for one platform: regular files in
/// `dir` named `z*_<platform>`, sorted by name.
pub fn runtime_fragments(dir: &Utf8Path, platform: &str) -> Result<Vec<Utf8PathBuf>, TreeError> {
    let suffix = format!("_{}", platform);
    let mut fragments = Vec::new();

    for entry in dir.read_dir_utf8().map_err(merge_err(dir))? {
        let entry = entry.map_err(merge_err(dir))?;
        let name = entry.file_name();
        if !is_runtime_fragment(name, &suffix) {
            continue;
        }
        let file_type = entry.file_type().map_err(merge_err(entry.path()))?;
        if file_type.is_file() {
            fragments.push(entry.path().to_owned());
        }
    }

    fragments.sort();
    Ok(fragments)
}

fn is_runtime_fragment(name: &str, suffix: &str) -> bool {
    name.starts_with('z') && name.ends_with(suffix)
}

/// Set atime and mtime of `root` and every entry below it to `instant`.
///
/// Failures on individual entries do not stop the walk; they are collected
/// and returned together as [`TreeError::Timestamps`]. Returns the number of
/// entries updated.
pub fn normalize_timestamps(root: &Utf8Path, instant: SystemTime) -> Result<usize, TreeError> {
    let time = FileTime::from_system_time(instant);
    let mut updated = 0;
    let mut failures = Vec::new();

    // Children first: listing a directory can bump its atime, so each
    // directory is stamped only after its contents have been read.
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                failures.push(walk_failure(root, e));
                continue;
            }
        };

        let result = if entry.path_is_symlink() {
            filetime::set_symlink_file_times(entry.path(), time, time)
        } else {
            filetime::set_file_times(entry.path(), time, time)
        };

        match result {
            Ok(()) => updated += 1,
            Err(e) => failures.push((Utf8PathBuf::from(entry.path().to_string_lossy().as_ref()), e)),
        }
    }

    if !failures.is_empty() {
        return Err(TreeError::Timestamps {
            root: root.to_owned(),
            failures,
        });
    }

    debug!(root = %root, entries = updated, "normalized timestamps");
    Ok(updated)
}

fn copy_file(src: &Utf8Path, dst: &Utf8Path, meta: &fs::Metadata) -> Result<(), TreeError> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(merge_err(parent))?;
    }
    if is_same_file(src, dst) {
        return Ok(());
    }
    // Replace rather than truncate so read-only targets can be overwritten.
    remove_existing(dst)?;
    fs::copy(src, dst).map_err(merge_err(dst))?;
    fs::set_permissions(dst, meta.permissions()).map_err(merge_err(dst))?;
    set_times_from(dst, meta)
}

fn copy_symlink(src: &Utf8Path, dst: &Utf8Path) -> Result<(), TreeError> {
    let link = fs::read_link(src).map_err(merge_err(src))?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(merge_err(parent))?;
    }
    remove_existing(dst)?;

    #[cfg(unix)]
    std::os::unix::fs::symlink(&link, dst).map_err(merge_err(dst))?;

    #[cfg(not(unix))]
    {
        let resolved = src.parent().unwrap_or(src).as_std_path().join(&link);
        fs::copy(&resolved, dst).map_err(merge_err(dst))?;
    }

    Ok(())
}

fn remove_existing(path: &Utf8Path) -> Result<(), TreeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(TreeError::Merge {
            path: path.to_owned(),
            source: io::Error::new(io::ErrorKind::IsADirectory, "cannot replace directory with file"),
        }),
        Ok(_) => fs::remove_file(path).map_err(merge_err(path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(merge_err(path)(e)),
    }
}

fn set_times_from(path: &Utf8Path, meta: &fs::Metadata) -> Result<(), TreeError> {
    let atime = FileTime::from_last_access_time(meta);
    let mtime = FileTime::from_last_modification_time(meta);
    filetime::set_file_times(path, atime, mtime).map_err(merge_err(path))
}
