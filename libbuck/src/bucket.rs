use crate::cid::Cid;
use crate::config::BuckConfig;
use crate::error::BuckResult;
use crate::path::BuckPath;
use crate::remote::{with_timeout, Links, RemoteClient, GET_FILE_TIMEOUT, RPC_TIMEOUT};
use crate::repo::Repo;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// a local working copy of one remote bucket
pub struct Bucket {
    cwd: PathBuf,
    key: String,
    conf: BuckConfig,
    client: Arc<dyn RemoteClient>,
    repo: Repo,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("cwd", &self.cwd)
            .field("key", &self.key)
            .field("conf", &self.conf)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

/// the two bucket roots. They diverge whenever the remote applies
/// server-side transformations, so nothing may ever require them equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Roots {
    pub local: Cid,
    pub remote: Cid,
}

impl Bucket {
    pub(crate) fn open(
        cwd: PathBuf,
        conf: BuckConfig,
        client: Arc<dyn RemoteClient>,
    ) -> BuckResult<Self> {
        let key = conf.key.clone().ok_or_else(|| anyhow!("bucket config is missing a key"))?;
        let repo = Repo::open(&cwd, &conf.spec.dir)?;
        Ok(Self { cwd, key, conf, client, repo })
    }

    /// a repository created before any remote contact hashes with the
    /// default cid version; once a remote root is visible, future hashes
    /// must match its version or every comparison degenerates to "changed"
    pub(crate) async fn adopt_cid_version(&self) -> BuckResult<()> {
        let (_, remote) = self.repo.root();
        if !remote.is_defined() {
            let root = self.remote_root().await?;
            self.repo.set_cid_version(root.version());
        }
        Ok(())
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn conf_dir(&self) -> &str {
        &self.conf.spec.dir
    }

    pub(crate) fn seed_name(&self) -> &str {
        &self.conf.spec.seed_name
    }

    pub(crate) fn repo(&self) -> &Repo {
        &self.repo
    }

    pub(crate) fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    pub async fn roots(&self) -> BuckResult<Roots> {
        let (local, mut remote) = self.repo.root();
        if !remote.is_defined() {
            remote = self.remote_root().await?;
        }
        Ok(Roots { local, remote })
    }

    pub(crate) async fn remote_root(&self) -> BuckResult<Cid> {
        with_timeout(RPC_TIMEOUT, self.client.root(&self.key)).await
    }

    pub async fn remote_links(&self) -> BuckResult<Links> {
        with_timeout(RPC_TIMEOUT, self.client.links(&self.key)).await
    }

    /// streams a remote file's bytes into `writer`
    pub async fn cat_remote_path(
        &self,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> BuckResult<()> {
        with_timeout(GET_FILE_TIMEOUT, self.client.pull_path(&self.key, path, writer, None)).await
    }

    /// deletes the remote bucket, the seed file, and the config directory.
    /// Working-tree contents are left in place.
    pub async fn destroy(&self) -> BuckResult<()> {
        with_timeout(RPC_TIMEOUT, self.client.remove(&self.key)).await?;
        let _ = std::fs::remove_file(self.cwd.join(self.seed_name()));
        let _ = std::fs::remove_dir_all(self.cwd.join(self.conf_dir()));
        Ok(())
    }

    pub(crate) fn abs_dest(&self, dest: &Path) -> PathBuf {
        let abs = if dest.is_absolute() { dest.to_path_buf() } else { self.cwd.join(dest) };
        // resolve `.`/`..` lexically so the containment check below cannot be
        // walked out of
        let mut out = PathBuf::new();
        for component in abs.components() {
            match component {
                std::path::Component::CurDir => {}
                std::path::Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other),
            }
        }
        out
    }

    pub(crate) fn contains_path(&self, dest: &Path) -> bool {
        self.abs_dest(dest).starts_with(&self.cwd)
    }
}
