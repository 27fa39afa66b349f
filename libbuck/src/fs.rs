use crate::error::BuckResult;
use crate::path::BuckPath;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// transient backups of locally modified files during a non-hard pull carry
/// this suffix and are invisible to every walk
pub const PATCH_EXT: &str = "buckpatch";

/// os-junk files that never belong in a bucket
pub fn is_junk(name: &str) -> bool {
    matches!(name, ".DS_Store" | "Thumbs.db" | "desktop.ini") || name.starts_with("._")
}

pub fn is_patch(name: &str) -> bool {
    Path::new(name).extension().is_some_and(|ext| ext == PATCH_EXT)
}

#[derive(Debug, Clone)]
pub struct WorktreeEntry {
    pub path: BuckPath,
    /// absolute local path
    pub local: PathBuf,
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

pub fn mtime(metadata: &Metadata) -> (i64, u32) {
    match metadata.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
        Some(duration) => (duration.as_secs() as i64, duration.subsec_nanos()),
        None => (0, 0),
    }
}

/// walks the working tree under `root`, skipping the config directory, junk
/// files, and patch backups; entries come back sorted by bucket path
pub fn walk_worktree(root: &Path, conf_dir: &str) -> BuckResult<Vec<WorktreeEntry>> {
    let mut entries = vec![];
    let walk = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.depth() == 1 && name == conf_dir)
    });
    for entry in walk {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_junk(&name) || is_patch(&name) {
            continue;
        }
        let metadata = entry.metadata()?;
        let (mtime_secs, mtime_nanos) = mtime(&metadata);
        entries.push(WorktreeEntry {
            path: BuckPath::from_local(root, entry.path())?,
            local: entry.path().to_path_buf(),
            size: metadata.len(),
            mtime_secs,
            mtime_nanos,
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// flat list of the (non-ignored) files under `dir`, as absolute paths; an
/// absent directory is an empty list, matching what the differ's expansion
/// step wants for plain files
pub fn walk_files(dir: &Path, conf_dir: &str) -> BuckResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut names = vec![];
    let walk = WalkDir::new(dir).follow_links(false).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.depth() == 1 && name == conf_dir)
    });
    for entry in walk {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_junk(&name) || is_patch(&name) {
            continue;
        }
        names.push(entry.path().to_path_buf());
    }
    names.sort();
    Ok(names)
}
