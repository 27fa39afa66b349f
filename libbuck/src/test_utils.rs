//! Test fixtures: an in-memory remote implementing the full client surface
//! (including fast-forward enforcement and a ciphered mode whose reported
//! cids never match local hashes) plus temp-dir bucket scaffolding.

use crate::bucket::Bucket;
use crate::buckets::{BucketInfo, Buckets};
use crate::cid::{Cid, CidVersion};
use crate::config::{BuckConfig, ConfigSpec, ThreadId, SEED_NAME};
use crate::dag;
use crate::error::{BuckError, BuckResult};
use crate::options::NewOptions;
use crate::path::BuckPath;
use crate::remote::{
    InitReply, Links, ProgressSender, PushReply, RemoteBucket, RemoteClient, RemoteItem,
    NO_LINK_MSG,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub struct MemRemote {
    version: CidVersion,
    /// pretend the server stores ciphertext: reported cids are salted so
    /// they can never equal a local plaintext hash
    scramble: bool,
    pulls: AtomicUsize,
    state: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    buckets: HashMap<String, MemBucket>,
    dags: HashMap<Cid, BTreeMap<BuckPath, Vec<u8>>>,
    next_key: u32,
}

struct MemBucket {
    name: String,
    files: BTreeMap<BuckPath, Vec<u8>>,
    root: Cid,
}

impl MemRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            version: CidVersion::V1,
            scramble: false,
            pulls: AtomicUsize::new(0),
            state: Default::default(),
        })
    }

    pub fn new_private() -> Arc<Self> {
        Arc::new(Self {
            version: CidVersion::V1,
            scramble: true,
            pulls: AtomicUsize::new(0),
            state: Default::default(),
        })
    }

    pub fn with_version(version: CidVersion) -> Arc<Self> {
        Arc::new(Self {
            version,
            scramble: false,
            pulls: AtomicUsize::new(0),
            state: Default::default(),
        })
    }

    /// number of file bodies served so far; skip-on-match tests watch this
    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// registers a DAG reachable through the ipfs-path surface and returns
    /// its root cid
    pub fn import_dag(&self, files: BTreeMap<BuckPath, Vec<u8>>) -> Cid {
        let root = self.dir_cid(&files, &BuckPath::root()).0;
        self.state.lock().dags.insert(root, files);
        root
    }

    /// the cid the remote reports for a file body
    pub fn file_cid(&self, bytes: &[u8]) -> Cid {
        if self.scramble {
            let mut salted = bytes.to_vec();
            salted.extend_from_slice(b"\0cipher");
            dag::hash_bytes(&salted, self.version)
        } else {
            dag::hash_bytes(bytes, self.version)
        }
    }

    pub fn bucket_root(&self, key: &str) -> Cid {
        self.state.lock().buckets[key].root
    }

    fn compute_root(&self, files: &BTreeMap<BuckPath, Vec<u8>>) -> Cid {
        self.dir_cid(files, &BuckPath::root()).0
    }

    fn dir_cid(&self, files: &BTreeMap<BuckPath, Vec<u8>>, path: &BuckPath) -> (Cid, u64) {
        let sub = files
            .iter()
            .filter_map(|(p, bytes)| {
                p.strip_prefix(path)
                    .filter(|rel| !rel.is_root())
                    .map(|rel| (rel, (self.file_cid(bytes), bytes.len() as u64)))
            })
            .collect();
        dag::build_tree(&sub).digest(self.version)
    }

    fn item_at(&self, files: &BTreeMap<BuckPath, Vec<u8>>, path: &BuckPath) -> BuckResult<RemoteItem> {
        if let Some(bytes) = files.get(path) {
            return Ok(RemoteItem {
                cid: self.file_cid(bytes),
                name: path.file_name().to_owned(),
                path: path.clone(),
                size: bytes.len() as u64,
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
        let (cid, size) = self.dir_cid(files, path);
        Ok(RemoteItem {
            cid,
            name: path.file_name().to_owned(),
            path: path.clone(),
            size,
            is_dir: true,
            items,
        })
    }

    fn send_progress(progress: Option<ProgressSender>, total: u64) {
        if let Some(progress) = progress {
            let _ = progress.send(total / 2);
            let _ = progress.send(total);
        }
    }
}

#[async_trait]
impl RemoteClient for MemRemote {
    async fn init(
        &self,
        name: &str,
        _private: bool,
        from_cid: Option<Cid>,
    ) -> BuckResult<InitReply> {
        let mut state = self.state.lock();
        let key = format!("bucket{}", state.next_key);
        state.next_key += 1;
        let seed: [u8; 32] = rand::random();
        let mut files = BTreeMap::new();
        if let Some(cid) = from_cid {
            let dag = state
                .dags
                .get(&cid)
                .ok_or_else(|| anyhow!("unknown bootstrap dag `{}`", cid))?
                .clone();
            files.extend(dag);
        }
        files.insert(BuckPath::new(SEED_NAME), seed.to_vec());
        let root = self.compute_root(&files);
        let links = Links {
            url: format!("https://hub.example.com/bucket/{}", key),
            www: format!("https://{}.example.com", key),
            ipns: format!("/ipns/{}", root),
        };
        state.buckets.insert(
            key.clone(),
            MemBucket { name: name.to_owned(), files, root },
        );
        Ok(InitReply {
            root,
            key,
            seed: seed.to_vec(),
            seed_cid: self.file_cid(&seed),
            links,
        })
    }

    async fn root(&self, key: &str) -> BuckResult<Cid> {
        let state = self.state.lock();
        let bucket = state.buckets.get(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        Ok(bucket.root)
    }

    async fn links(&self, key: &str) -> BuckResult<Links> {
        let state = self.state.lock();
        let bucket = state.buckets.get(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        Ok(Links {
            url: format!("https://hub.example.com/bucket/{}", key),
            www: format!("https://{}.example.com", key),
            ipns: format!("/ipns/{}", bucket.root),
        })
    }

    async fn list(&self, thread: &ThreadId) -> BuckResult<Vec<RemoteBucket>> {
        let state = self.state.lock();
        Ok(state
            .buckets
            .iter()
            .map(|(key, bucket)| RemoteBucket {
                key: key.clone(),
                name: bucket.name.clone(),
                thread: thread.clone(),
            })
            .collect())
    }

    async fn list_path(&self, key: &str, path: &BuckPath) -> BuckResult<RemoteItem> {
        let state = self.state.lock();
        let bucket = state.buckets.get(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        self.item_at(&bucket.files, path)
    }

    async fn list_ipfs_path(&self, root: Cid, path: &BuckPath) -> BuckResult<RemoteItem> {
        let state = self.state.lock();
        let files =
            state.dags.get(&root).ok_or_else(|| anyhow!("unknown dag `{}`", root))?;
        self.item_at(files, path)
    }

    async fn pull_path(
        &self,
        key: &str,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()> {
        let bytes = {
            let state = self.state.lock();
            let bucket =
                state.buckets.get(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
            bucket
                .files
                .get(path)
                .ok_or_else(|| anyhow!("pull `{}`: {}", path, NO_LINK_MSG))?
                .clone()
        };
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Self::send_progress(progress, bytes.len() as u64);
        writer.write_all(&bytes).await?;
        Ok(())
    }

    async fn pull_ipfs_path(
        &self,
        root: Cid,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()> {
        let bytes = {
            let state = self.state.lock();
            let files =
                state.dags.get(&root).ok_or_else(|| anyhow!("unknown dag `{}`", root))?;
            files
                .get(path)
                .ok_or_else(|| anyhow!("pull `{}`: {}", path, NO_LINK_MSG))?
                .clone()
        };
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Self::send_progress(progress, bytes.len() as u64);
        writer.write_all(&bytes).await?;
        Ok(())
    }

    async fn push_path(
        &self,
        key: &str,
        path: &BuckPath,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        progress: Option<ProgressSender>,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<PushReply> {
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes).await?;
        Self::send_progress(progress, bytes.len() as u64);
        let mut state = self.state.lock();
        let bucket =
            state.buckets.get_mut(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        if let Some(expected) = fast_forward_root {
            if expected != bucket.root {
                bail!(BuckError::NonFastForward(bucket.root));
            }
        }
        let added = self.file_cid(&bytes);
        bucket.files.insert(path.clone(), bytes);
        bucket.root = self.compute_root(&bucket.files);
        Ok(PushReply { added, root: bucket.root })
    }

    async fn remove_path(
        &self,
        key: &str,
        path: &BuckPath,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<Cid> {
        let mut state = self.state.lock();
        let bucket =
            state.buckets.get_mut(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        if let Some(expected) = fast_forward_root {
            if expected != bucket.root {
                bail!(BuckError::NonFastForward(bucket.root));
            }
        }
        if bucket.files.remove(path).is_none() {
            bail!("remove `{}`: {}", path, NO_LINK_MSG);
        }
        bucket.root = self.compute_root(&bucket.files);
        Ok(bucket.root)
    }

    async fn remove(&self, key: &str) -> BuckResult<()> {
        let mut state = self.state.lock();
        state.buckets.remove(key).ok_or_else(|| anyhow!("bucket `{}` not found", key))?;
        Ok(())
    }
}

pub struct TestBucket {
    pub remote: Arc<MemRemote>,
    pub bucket: Bucket,
    dir: tempfile::TempDir,
}

impl TestBucket {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn test_thread() -> ThreadId {
    "testthread".parse().unwrap()
}

pub async fn init_bucket(remote: Arc<MemRemote>) -> TestBucket {
    init_bucket_with(remote, NewOptions::new().with_name("testbucket")).await
}

pub async fn init_bucket_with(remote: Arc<MemRemote>, opts: NewOptions) -> TestBucket {
    let dir = tempfile::tempdir().unwrap();
    let buckets = Buckets::new(ConfigSpec::default(), remote.clone() as Arc<dyn RemoteClient>);
    let mut conf = BuckConfig::new(ConfigSpec::default());
    conf.thread = Some(test_thread());
    let (bucket, _links) = buckets.new_local_bucket(dir.path(), conf, opts).await.unwrap();
    TestBucket { remote, bucket, dir }
}

/// a second working copy of an existing remote bucket, as a fresh machine
/// would create it
pub async fn clone_bucket(remote: Arc<MemRemote>, key: &str) -> TestBucket {
    let info = BucketInfo { thread: test_thread(), name: String::new(), key: key.to_owned() };
    init_bucket_with(remote, NewOptions::new().with_bucket(info)).await
}

pub fn write_file(dir: &Path, rel: &str, bytes: &[u8]) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

pub fn read_file(dir: &Path, rel: &str) -> Vec<u8> {
    std::fs::read(dir.join(rel)).unwrap()
}
