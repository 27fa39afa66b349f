//! The remote bucket service surface. Everything network-shaped lives
//! behind this trait; engines only ever hold it as a shared trait object.

use crate::cid::Cid;
use crate::config::ThreadId;
use crate::error::{BuckGenericError, BuckResult};
use crate::path::BuckPath;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

pub mod fs;

/// plain RPC calls
pub const RPC_TIMEOUT: Duration = Duration::from_secs(60);
/// single-file transfer deadlines
pub const GET_FILE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);
pub const ADD_FILE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

/// cumulative byte counts reported by streaming transfers
pub type ProgressSender = mpsc::UnboundedSender<u64>;

#[derive(Debug, Clone)]
pub struct RemoteItem {
    pub cid: Cid,
    pub name: String,
    pub path: BuckPath,
    pub size: u64,
    pub is_dir: bool,
    pub items: Vec<RemoteItem>,
}

#[derive(Debug, Clone, Default)]
pub struct Links {
    pub url: String,
    pub www: String,
    pub ipns: String,
}

#[derive(Debug, Clone)]
pub struct RemoteBucket {
    pub key: String,
    pub name: String,
    pub thread: ThreadId,
}

#[derive(Debug)]
pub struct InitReply {
    pub root: Cid,
    pub key: String,
    /// random blob diversifying otherwise identical initial DAGs; written to
    /// the working tree as the seed file
    pub seed: Vec<u8>,
    pub seed_cid: Cid,
    pub links: Links,
}

#[derive(Debug, Clone, Copy)]
pub struct PushReply {
    /// cid of the object the remote now holds for the pushed path
    pub added: Cid,
    /// the new bucket root
    pub root: Cid,
}

/// the error message servers use for removing a path that is already gone;
/// callers treat it as success
pub const NO_LINK_MSG: &str = "no link by that name";

pub fn is_no_link_err(err: &BuckGenericError) -> bool {
    err.to_string().ends_with(NO_LINK_MSG)
}

/// every remote call runs under a deadline
pub(crate) async fn with_timeout<T>(
    duration: Duration,
    fut: impl std::future::Future<Output = BuckResult<T>>,
) -> BuckResult<T> {
    tokio::time::timeout(duration, fut).await.map_err(|_| anyhow!("remote operation timed out"))?
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// creates a bucket, optionally bootstrapped from an existing DAG
    async fn init(&self, name: &str, private: bool, from_cid: Option<Cid>)
        -> BuckResult<InitReply>;

    /// current remote root
    async fn root(&self, key: &str) -> BuckResult<Cid>;

    /// web-facing addresses
    async fn links(&self, key: &str) -> BuckResult<Links>;

    /// enumerates buckets in a thread
    async fn list(&self, thread: &ThreadId) -> BuckResult<Vec<RemoteBucket>>;

    /// recursive item tree at a bucket path
    async fn list_path(&self, key: &str, path: &BuckPath) -> BuckResult<RemoteItem>;

    /// item tree of a DAG outside any bucket
    async fn list_ipfs_path(&self, root: Cid, path: &BuckPath) -> BuckResult<RemoteItem>;

    async fn pull_path(
        &self,
        key: &str,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()>;

    async fn pull_ipfs_path(
        &self,
        root: Cid,
        path: &BuckPath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        progress: Option<ProgressSender>,
    ) -> BuckResult<()>;

    /// uploads a file. With `fast_forward_root` set the server rejects the
    /// write with [`BuckError::NonFastForward`](crate::error::BuckError) if
    /// its root no longer matches.
    async fn push_path(
        &self,
        key: &str,
        path: &BuckPath,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        progress: Option<ProgressSender>,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<PushReply>;

    /// removes a path, returning the new root; same fast-forward discipline
    async fn remove_path(
        &self,
        key: &str,
        path: &BuckPath,
        fast_forward_root: Option<Cid>,
    ) -> BuckResult<Cid>;

    /// deletes the bucket
    async fn remove(&self, key: &str) -> BuckResult<()>;
}
