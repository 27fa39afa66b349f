//! The working-copy repository: a content-addressed snapshot of the working
//! tree plus the binding table tying bucket paths to remote cids.

use crate::bindings::{Binding, BindingStore};
use crate::cid::{Cid, CidVersion};
use crate::dag;
use crate::diff::{self, Change};
use crate::error::BuckResult;
use crate::fs::{self, WorktreeEntry};
use crate::path::BuckPath;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const BINDINGS_FILE: &str = "bindings";

#[derive(Debug)]
pub struct Repo {
    workdir: PathBuf,
    conf_dir: String,
    state: Mutex<RepoState>,
}

#[derive(Debug)]
struct RepoState {
    store: BindingStore,
    cid_version: CidVersion,
}

impl Repo {
    /// opens (or creates) the repository working data under
    /// `<workdir>/<conf_dir>/`
    pub fn open(workdir: &Path, conf_dir: &str) -> BuckResult<Self> {
        let buckdir = workdir.join(conf_dir);
        std::fs::create_dir_all(&buckdir)?;
        let store = BindingStore::load(buckdir.join(BINDINGS_FILE))?;
        Ok(Self {
            workdir: workdir.to_path_buf(),
            conf_dir: conf_dir.to_owned(),
            state: Mutex::new(RepoState { store, cid_version: CidVersion::default() }),
        })
    }

    pub fn set_cid_version(&self, version: CidVersion) {
        self.state.lock().cid_version = version;
    }

    pub fn cid_version(&self) -> CidVersion {
        self.state.lock().cid_version
    }

    /// hashes a local file under the current layout; does not touch the
    /// binding table
    pub fn hash_file(&self, path: &Path) -> BuckResult<Cid> {
        dag::hash_file(path, self.cid_version())
    }

    /// (local root, remote root); either side may be undefined
    pub fn root(&self) -> (Cid, Cid) {
        self.state.lock().store.root()
    }

    /// whether the binding table records exactly this local<->remote cid
    /// pair for the path. This is what lets a pull skip a file whose remote
    /// cid can never equal the local hash (encrypted buckets).
    pub fn match_path(&self, path: &BuckPath, local: Cid, remote: Cid) -> bool {
        local.is_defined()
            && remote.is_defined()
            && self
                .state
                .lock()
                .store
                .get(path)
                .is_some_and(|binding| binding.local == local && binding.remote == remote)
    }

    /// records the cid the remote reported for a path. Write-through: push
    /// and pull re-bind the root after their save, so this cannot wait for
    /// the next one.
    pub fn set_remote_path(&self, path: &BuckPath, cid: Cid) -> BuckResult<()> {
        trace!("Repo::set_remote_path({}, {})", path, cid);
        let mut state = self.state.lock();
        state.store.set_remote(path.clone(), cid);
        state.store.save()
    }

    /// rewalks the working tree, rehashes what moved, replaces the cached
    /// DAG and persists the binding table. Returns the new local root.
    pub fn save(&self) -> BuckResult<Cid> {
        let entries = fs::walk_worktree(&self.workdir, &self.conf_dir)?;
        let mut state = self.state.lock();
        let version = state.cid_version;
        let mut bindings = BTreeMap::new();
        let mut files = BTreeMap::new();
        for entry in &entries {
            let cid = cached_or_rehash(&state.store, entry, version)?;
            bindings.insert(
                entry.path.clone(),
                Binding {
                    local: cid,
                    remote: Cid::UNKNOWN,
                    size: entry.size,
                    mtime_secs: entry.mtime_secs,
                    mtime_nanos: entry.mtime_nanos,
                },
            );
            files.insert(entry.path.clone(), (cid, entry.size));
        }
        let root = dag::tree_root(&files, version);
        debug!("Repo::save -> root {} ({} files)", root, files.len());
        state.store.replace_local(bindings, root);
        state.store.save()?;
        Ok(root)
    }

    /// adds or overwrites a single file in the cached DAG (used after
    /// receiving a file) and persists
    pub fn save_file(&self, local: &Path, path: BuckPath) -> BuckResult<()> {
        trace!("Repo::save_file({} <- {})", path, local.display());
        let metadata = std::fs::metadata(local)?;
        let mut state = self.state.lock();
        let version = state.cid_version;
        let cid = dag::hash_file(local, version)?;
        let (mtime_secs, mtime_nanos) = fs::mtime(&metadata);
        state.store.set_local(path, cid, metadata.len(), mtime_secs, mtime_nanos);
        refresh_root(&mut state);
        state.store.save()
    }

    /// drops a path and everything under it from the cached DAG and persists
    pub fn remove_path(&self, path: &BuckPath) -> BuckResult<()> {
        trace!("Repo::remove_path({})", path);
        let mut state = self.state.lock();
        state.store.remove_prefix(path);
        refresh_root(&mut state);
        state.store.save()
    }

    /// DAG-level diff of the live working tree against the cached snapshot,
    /// restricted to paths under `prefix`
    pub fn diff(&self, prefix: &BuckPath) -> BuckResult<Vec<Change>> {
        let entries = fs::walk_worktree(&self.workdir, &self.conf_dir)?;
        let state = self.state.lock();
        let version = state.cid_version;
        let mut candidate = BTreeMap::new();
        for entry in entries.iter().filter(|entry| entry.path.starts_with(prefix)) {
            let cid = cached_or_rehash(&state.store, entry, version)?;
            candidate.insert(entry.path.clone(), (cid, entry.size));
        }
        let cached = state
            .store
            .local_files()
            .into_iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .collect();
        let old_tree = dag::build_tree(&cached);
        let new_tree = dag::build_tree(&candidate);
        let changes = diff::diff_trees(&old_tree, &new_tree, version)
            .into_iter()
            .map(|(kind, path)| Change { kind, rel: path.to_local(&self.workdir), path })
            .collect();
        Ok(changes)
    }
}

/// reuse the cached hash when the stat signature still matches; a file whose
/// mtime equals the binding table's own mtime is "racy" (it may have changed
/// in the same timestamp tick the table was written) and gets rehashed
fn cached_or_rehash(
    store: &BindingStore,
    entry: &WorktreeEntry,
    version: CidVersion,
) -> BuckResult<Cid> {
    if let Some(binding) = store.get(&entry.path) {
        let clean = binding.local.is_defined()
            && binding.local.version() == version
            && binding.size == entry.size
            && binding.mtime_secs == entry.mtime_secs
            && binding.mtime_nanos == entry.mtime_nanos;
        if clean && !store.is_racy(entry.mtime_secs, entry.mtime_nanos) {
            return Ok(binding.local);
        }
    }
    dag::hash_file(&entry.local, version)
}

fn refresh_root(state: &mut RepoState) {
    let files = state.store.local_files();
    let root = dag::tree_root(&files, state.cid_version);
    state.store.set_root_local(root);
}
