//! Working-tree diffs: a DAG-level comparison of the live tree against the
//! repository's cached snapshot, then a filesystem expansion of directory
//! changes into per-file leaves.

use crate::bucket::Bucket;
use crate::cid::CidVersion;
use crate::dag::TreeNode;
use crate::error::BuckResult;
use crate::fs;
use crate::path::BuckPath;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    Add,
    Modify,
    Remove,
}

impl ChangeKind {
    /// the status labels users see; padding keeps columns aligned
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Add => "new file:",
            ChangeKind::Modify => "modified:",
            ChangeKind::Remove => "deleted: ",
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Change {
    pub kind: ChangeKind,
    /// bucket-relative path
    pub path: BuckPath,
    /// absolute local path
    pub rel: PathBuf,
}

/// emits a change at the first node where the two DAGs diverge, recursing
/// only while both sides hold a directory there. Order is depth-first
/// pre-order over child names.
pub(crate) fn diff_trees(
    old: &TreeNode,
    new: &TreeNode,
    version: CidVersion,
) -> Vec<(ChangeKind, BuckPath)> {
    let mut out = vec![];
    diff_nodes(old, new, &BuckPath::root(), version, &mut out);
    out
}

fn diff_nodes(
    old: &TreeNode,
    new: &TreeNode,
    at: &BuckPath,
    version: CidVersion,
    out: &mut Vec<(ChangeKind, BuckPath)>,
) {
    let names = old
        .files
        .keys()
        .chain(old.dirs.keys())
        .chain(new.files.keys())
        .chain(new.dirs.keys())
        .collect::<BTreeSet<_>>();
    for name in names {
        let path = at.join(name);
        match (old.child(name, version), new.child(name, version)) {
            (None, Some(..)) => out.push((ChangeKind::Add, path)),
            (Some(..), None) => out.push((ChangeKind::Remove, path)),
            (Some((old_cid, _, old_dir)), Some((new_cid, _, new_dir))) => {
                if old_cid == new_cid && old_dir == new_dir {
                    continue;
                }
                if old_dir && new_dir {
                    diff_nodes(&old.dirs[name], &new.dirs[name], &path, version, out);
                } else {
                    // covers changed files and file<->directory flips
                    out.push((ChangeKind::Modify, path));
                }
            }
            (None, None) => unreachable!(),
        }
    }
}

impl Bucket {
    /// the current working-tree changes relative to the last save, expanded
    /// to file granularity for additions and modifications. `Remove` entries
    /// stay directory-level: the remote tree is authoritative for what was
    /// removed.
    pub fn diff(&self) -> BuckResult<Vec<Change>> {
        let diff = self.repo().diff(&BuckPath::root())?;
        let mut all = vec![];
        for change in diff {
            match change.kind {
                ChangeKind::Add | ChangeKind::Modify => {
                    let names = fs::walk_files(&change.rel, self.conf_dir())?;
                    if names.is_empty() {
                        all.push(change);
                    } else {
                        for name in names {
                            all.push(Change {
                                kind: change.kind,
                                path: BuckPath::from_local(self.cwd(), &name)?,
                                rel: name,
                            });
                        }
                    }
                }
                ChangeKind::Remove => all.push(change),
            }
        }
        trace!("Bucket::diff -> {} changes", all.len());
        Ok(all)
    }
}
