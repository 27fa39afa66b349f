//! A bucket service backed by a plain directory, in the spirit of a VCS
//! file transport. One store directory holds every bucket's tree plus a
//! small metadata file carrying its current root; all the remote-side
//! semantics (fast-forward checks, seed creation, listings) run locally.
//!
//! This is what the CLI talks to through `file://` endpoints; the tests use
//! it to exercise the engines against a remote with real I/O.

use crate::cid::{Cid, CidVersion};
use crate::config::{ThreadId, SEED_NAME};
use crate::dag;
use crate::error::{BuckError, BuckResult};
use crate::fs::walk_worktree;
use crate::path::BuckPath;
use crate::remote::{
    InitReply, Links, ProgressSender, PushReply, RemoteBucket, RemoteClient, RemoteItem,
    NO_LINK_MSG,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const META_DIR: &str = ".meta";

pub struct FsRemote {
    store: PathBuf,
    version: CidVersion,
    // serializes mutations so the fast-forward check is race-free within a
    // process; the root file on disk is the source of truth across runs
    write_lock: Mutex<()>,
}

impl FsRemote {
    pub fn open(store: impl Into<PathBuf>) -> BuckResult<Self> {
        let store = store.into();
        std::fs::create_dir_all(store.join(META_DIR))?;
        Ok(Self { store, version: CidVersion::default(), write_lock: Mutex::new(()) })
    }

    fn bucket_dir(&self, key: &str) -> PathBuf {
        self.store.join(key)
    }

    fn root_file(&self, key: &str) -> PathBuf {
        self.store.join(META_DIR).join(format!("{}.root", key))
    }

    fn name_file(&self, key: &str) -> PathBuf {
        self.store.join(META_DIR).join(format!("{}.name", key))
    }

    fn require_bucket(&self, key: &str) -> BuckResult<PathBuf> {
        let dir = self.bucket_dir(key);
        ensure!(dir.is_dir(), "bucket `{}` not found", key);
        Ok(dir)
    }

    fn read_root(&self, key: &str) -> BuckResult<Cid> {
        let s = std::fs::read_to_string(self.root_file(key))?;
        s.trim().parse()
    }

    fn write_root(&self, key: &str, root: Cid) -> BuckResult<()> {
        std::fs::write(self.root_file(key), root.to_string())?;
        Ok(())
    }

    /// cid + size of every file in the bucket, hashed under the store layout
    fn snapshot(&self, dir: &Path) -> BuckResult<BTreeMap<BuckPath, (Cid, u64)>> {
        let mut files = BTreeMap::new();
        for entry in walk_worktree(dir, META_DIR)? {
            let cid = dag::hash_file(&entry.local, self.version)?;
            files.insert(entry.path, (cid, entry.size));
        }
        Ok(files)
    }

    fn compute_root(&self, dir: &Path) -> BuckResult<Cid> {
        Ok(dag::tree_root(&self.snapshot(dir)?, self.version))
    }

    fn links_for(&self, key: &str) -> Links {
        Links {
            url: format!("file://{}", self.bucket_dir(key).display()),
            www: String::new(),
            ipns: String::new(),
        }
    }

    /// a DAG cid is resolvable iff some bucket currently has it as its root
    fn resolve_dag(&self, root: Cid) -> BuckResult<PathBuf> {
        for key in self.keys()? {
            if self.read_root(&key).map_or(false, |cid| cid == root) {
                return Ok(self.bucket_dir(&key));
            }
        }
        bail!("unknown dag `{}`", root)
    }

    fn keys(&self) -> BuckResult<Vec<String>> {
        let mut keys = vec![];
        for entry in std::fs::read_dir(&self.store)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() && name != META_DIR {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn item_at(
        &self,
        files: &BTreeMap<BuckPath, (Cid, u64)>,
        path: &BuckPath,
    ) -> BuckResult<RemoteItem> {
        if let Some(&(cid, size)) = files.get(path) {
            return Ok(RemoteItem {
                cid,
                name: path.file_name().to_owned(),
                path: path.clone(),
                size,
                is_dir: false,
                items: vec![],
            });
        }
        let names = files
            .keys()
            .filter_map(|p| p.strip_prefix(path))
            .filter_map(|rel| rel.components().next().map(str::to_owned))
            .collect::<BTreeSet<_>>();
        if names.is_empty() && !path.is_root() {
            bail!("list `{}`: {}", path, NO_LINK_MSG);
        }
        let items = names
            .into_iter()
            .map(|name| self.item_at(files, &path.join(name)))
            .collect::<BuckResult<Vec<_>>>()?;
        let sub = files
            .iter()
            .filter_map(|(p, &v)| p.strip_prefix(path).filter(|rel| !rel.is_root()).map(|rel| (rel, v)))
            .collect();
        let (cid, size) = dag::build_tree(&sub).digest(self.version);
        Ok(RemoteItem {
            cid,
            name: path.file_name().to_owned(),
            path: path.clone(),
            size,
            is_dir: true,
            items,
        })
    }

    fn check_fast_forward(&self, key: &str, expected: Option<Cid>) -> BuckResult<()> {
        if let Some(expected) = expected {
            let current = self.read_root(key)?;
            if expected != current {
                bail!(BuckError::NonFastForward(current));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for FsRemote {
    async fn init(
        &self,
        name: &str,
        _private: bool,
        from_cid: Option<Cid>,
    ) -> BuckResult<InitReply> {
        let _guard = self.write_lock.lock();
        let key = format!("bk{:016x}", rand::random::<u64>());
        let dir = self.bucket_dir(&key);
        std::fs::create_dir_all(&dir)?;
        if let Some(cid) = from_cid {
            let src = self.resolve_dag(cid)?;
            for entry in walk_worktree(&src, META_DIR)? {
                let dest = entry.path.to_local(&dir);
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&entry.local, dest)?;
            }
        }
        let seed: [u8; 32] = rand::random();
        std::fs::write(dir.join(SEED_NAME), seed)?;
        std::fs::write(self.name_file(&key), name)?;
        let root = self.compute_root(&dir)?;
        self.write_root(&key, root)?;
        Ok(InitReply {
            root,
            key: key.clone(),
            seed: seed.to_vec(),
            seed_cid: dag::hash_bytes(&seed, self.version),
            links: self.links_for(&key),
        })
    }

    async fn root(&self, key: &str) -> BuckResult<Cid> {
        self.require_bucket(key)?;
        self.read_root(key)
    }

    async fn links(&self, key: &str) -> BuckResult<Links> {
        self.require_bucket(key)?;
        Ok(self.links_for(key))
    }

    async fn list(&self, thread: &ThreadId) -> BuckResult<Vec<RemoteBucket>> {
        let mut buckets = vec![];
        for key in self.keys()? {
            let name = std::fs::read_to_string(self.name_file(&key)).unwrap_or_default();
            buckets.push(RemoteBucket { key, name, thread: thread.clone() });
        }
        Ok(buckets)
    }

    async fn list_path(&self, key: &str, path: &BuckPath) -> BuckResult<RemoteItem> {
        let dir = self.require_bucket(key)?;
        let files = self.snapshot(&dir)?;
        self.item_at(&files, path)
    }

    async fn list_ipfs_path(&self, root: Cid, path: &BuckPath) -> BuckResult<RemoteItem> {
        let dir = self.resolve_dag(root)?;
        let files = self.snapshot(&dir)?;
        self.item_at(&files, path)
    }

    async fn pull_path(
        &self,
        key: &str,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()> {
        let dir = self.require_bucket(key)?;
        let local = path.to_local(&dir);
        ensure!(local.is_file(), "pull `{}`: {}", path, NO_LINK_MSG);
        stream_file(&local, writer, progress).await
    }

    async fn pull_ipfs_path(
        &self,
        root: Cid,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()> {
        let dir = self.resolve_dag(root)?;
        let local = path.to_local(&dir);
        ensure!(local.is_file(), "pull `{}`: {}", path, NO_LINK_MSG);
        stream_file(&local, writer, progress).await
    }

    async fn push_path(
        &self,
        key: &str,
        path: &BuckPath,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        progress: Option<ProgressSender>,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<PushReply> {
        let dir = self.require_bucket(key)?;
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes).await?;
        if let Some(progress) = progress {
            let _ = progress.send(bytes.len() as u64);
        }
        let _guard = self.write_lock.lock();
        self.check_fast_forward(key, fast_forward_root)?;
        let local = path.to_local(&dir);
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&local, &bytes)?;
        let added = dag::hash_bytes(&bytes, self.version);
        let root = self.compute_root(&dir)?;
        self.write_root(key, root)?;
        Ok(PushReply { added, root })
    }

    async fn remove_path(
        &self,
        key: &str,
        path: &BuckPath,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<Cid> {
        let dir = self.require_bucket(key)?;
        let _guard = self.write_lock.lock();
        self.check_fast_forward(key, fast_forward_root)?;
        let local = path.to_local(&dir);
        if !local.exists() {
            bail!("remove `{}`: {}", path, NO_LINK_MSG);
        }
        if local.is_dir() {
            std::fs::remove_dir_all(&local)?;
        } else {
            std::fs::remove_file(&local)?;
        }
        let root = self.compute_root(&dir)?;
        self.write_root(key, root)?;
        Ok(root)
    }

    async fn remove(&self, key: &str) -> BuckResult<()> {
        let dir = self.require_bucket(key)?;
        std::fs::remove_dir_all(dir)?;
        let _ = std::fs::remove_file(self.root_file(key));
        let _ = std::fs::remove_file(self.name_file(key));
        Ok(())
    }
}

async fn stream_file(
    local: &Path,
    writer: &mut (dyn AsyncWrite + Send + Unpin),
    progress: Option<ProgressSender>,
) -> BuckResult<()> {
    let mut file = tokio::fs::File::open(local).await?;
    let mut buf = vec![0; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
        if let Some(progress) = &progress {
            let _ = progress.send(total);
        }
    }
    Ok(())
}
