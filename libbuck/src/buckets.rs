//! Bucket lifecycle: creating or adopting a local working copy and
//! enumerating remote buckets.

use crate::bucket::Bucket;
use crate::config::{BuckConfig, ConfigSpec, ThreadId};
use crate::error::{BuckError, BuckResult, BuckResultExt};
use crate::options::{NewOptions, PathOptions};
use crate::path::BuckPath;
use crate::remote::{with_timeout, Links, RemoteClient, RPC_TIMEOUT};
use std::path::Path;
use std::sync::Arc;

pub struct Buckets {
    spec: ConfigSpec,
    client: Arc<dyn RemoteClient>,
}

#[derive(Debug, Clone)]
pub struct BucketInfo {
    pub thread: ThreadId,
    pub name: String,
    pub key: String,
}

impl Buckets {
    pub fn new(spec: ConfigSpec, client: Arc<dyn RemoteClient>) -> Self {
        Self { spec, client }
    }

    pub fn spec(&self) -> &ConfigSpec {
        &self.spec
    }

    /// initializes a bucket in `cwd`: either a fresh remote bucket (with an
    /// optional bootstrap DAG) or a mirror of an existing one. Writes the
    /// config file and the seed blob, and leaves the repository bound to
    /// the remote root.
    pub async fn new_local_bucket(
        &self,
        cwd: &Path,
        mut conf: BuckConfig,
        opts: NewOptions,
    ) -> BuckResult<(Bucket, Links)> {
        let conf_file = self.spec.file_path(cwd);
        ensure!(!conf_file.exists(), BuckError::AlreadyInitialized(cwd.to_path_buf()));

        if let Some(info) = &opts.from_bucket {
            conf.key = Some(info.key.clone());
            conf.thread = Some(info.thread.clone());
        }
        conf.validate()?;

        // a key at this point means we are adopting an existing bucket
        let mut init_reply = None;
        let links = if let Some(key) = conf.key.clone() {
            with_timeout(RPC_TIMEOUT, self.client.links(&key)).await?
        } else {
            let reply = with_timeout(
                RPC_TIMEOUT,
                self.client.init(&opts.name, opts.private, opts.from_cid),
            )
            .await?;
            conf.key = Some(reply.key.clone());
            let links = reply.links.clone();
            init_reply = Some(reply);
            links
        };
        conf.save(cwd)?;

        let bucket = Bucket::open(cwd.to_path_buf(), conf, Arc::clone(&self.client))?;
        match init_reply {
            Some(reply) => {
                bucket.repo().set_cid_version(reply.root.version());
                let seed_path = cwd.join(bucket.seed_name());
                let seed_bucket_path = BuckPath::new(bucket.seed_name());
                std::fs::write(&seed_path, &reply.seed)?;
                bucket.repo().save_file(&seed_path, seed_bucket_path.clone())?;
                bucket.repo().set_remote_path(&seed_bucket_path, reply.seed_cid)?;
                bucket.repo().set_remote_path(&BuckPath::root(), reply.root)?;
                if opts.from_cid.is_some() {
                    // materialize the bootstrapped DAG
                    self.initial_pull(&bucket, opts.events.clone()).await?;
                }
            }
            None => {
                bucket.adopt_cid_version().await?;
                self.initial_pull(&bucket, opts.events.clone()).await?;
            }
        }
        info!("initialized bucket `{}` in {}", bucket.key(), cwd.display());
        Ok((bucket, links))
    }

    async fn initial_pull(
        &self,
        bucket: &Bucket,
        events: Option<crate::event::EventSender>,
    ) -> BuckResult<()> {
        let mut opts = PathOptions::new().with_hard(true);
        if let Some(events) = events {
            opts = opts.with_events(events);
        }
        match bucket.pull_remote_path(opts).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_up_to_date() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// loads the bucket whose config governs `cwd`
    pub async fn get_local_bucket(&self, cwd: &Path) -> BuckResult<Bucket> {
        let conf = BuckConfig::load(self.spec.clone(), cwd)?;
        self.open_local_bucket(conf).await
    }

    /// like [`Buckets::get_local_bucket`] but for a config the caller has
    /// already resolved (e.g. with flag overrides applied on top)
    pub async fn open_local_bucket(&self, conf: BuckConfig) -> BuckResult<Bucket> {
        let Some(root) = conf.root.clone() else { bail!(BuckError::NotABucket) };
        conf.validate()?;
        ensure!(conf.key.is_some(), BuckError::NotABucket);
        let bucket = Bucket::open(root, conf, Arc::clone(&self.client))?;
        bucket.adopt_cid_version().await?;
        Ok(bucket)
    }

    /// enumerates the buckets reachable through the given threads
    pub async fn remote_buckets(&self, threads: &[ThreadId]) -> BuckResult<Vec<BucketInfo>> {
        let mut list = vec![];
        for thread in threads {
            let buckets = with_timeout(RPC_TIMEOUT, self.client.list(thread)).await?;
            for bucket in buckets {
                let name =
                    if bucket.name.is_empty() { "unnamed".to_owned() } else { bucket.name };
                list.push(BucketInfo { thread: bucket.thread, name, key: bucket.key });
            }
        }
        Ok(list)
    }
}
