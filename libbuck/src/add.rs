//! The merge engine: imports an arbitrary remote DAG into the working tree,
//! consulting a caller-supplied policy wherever local and remote collide.

use crate::bucket::Bucket;
use crate::cid::Cid;
use crate::error::{BuckError, BuckResult};
use crate::event::{emit, events_or_drain, forward_progress, EventSender, PathEvent, PathEventKind};
use crate::options::{AddOptions, MergeStrategy, SelectMergeFunc};
use crate::path::BuckPath;
use crate::pull::{Object, MAX_TRANSFERS};
use crate::remote::{with_timeout, GET_FILE_TIMEOUT, RPC_TIMEOUT};
use futures::future::BoxFuture;
use futures::prelude::*;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

impl Bucket {
    /// merges the DAG rooted at `cid` into the working tree at `dest`
    /// (which must be inside the bucket). Without a merge policy every
    /// remote node is taken unconditionally.
    pub async fn add_remote_cid(
        &self,
        cid: Cid,
        dest: &Path,
        options: AddOptions,
    ) -> BuckResult<()> {
        let events = events_or_drain(options.events);
        let dest = self.abs_dest(dest);
        ensure!(self.contains_path(&dest), BuckError::DestinationOutsideBucket(dest.clone()));
        self.merge_ipfs_path(cid, &dest, options.merge, &events).await
    }

    async fn merge_ipfs_path(
        &self,
        base: Cid,
        dest: &Path,
        merge: Option<SelectMergeFunc>,
        events: &EventSender,
    ) -> BuckResult<()> {
        let (replaced, to_add) =
            self.list_merge_path(base, BuckPath::root(), dest, merge.as_ref()).await?;

        // folders the policy gave up wholesale
        for dir in &replaced {
            std::fs::remove_dir_all(dir)?;
        }

        if to_add.is_empty() {
            return Ok(());
        }
        debug!("Bucket::merge_ipfs_path: {} files from {}", to_add.len(), base);
        let base_path = BuckPath::new(base.to_string());
        emit(events, PathEvent::new(PathEventKind::PathStart, base_path.clone()));
        let bound = to_add.len().min(MAX_TRANSFERS);
        stream::iter(to_add.into_iter().map(|object| {
            let events = events.clone();
            async move {
                match std::fs::remove_file(&object.name) {
                    Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                        return Err(err.into());
                    }
                    _ => {}
                }
                self.get_ipfs_file(base, &object, &events).await
            }
        }))
        .buffer_unordered(bound)
        .try_collect::<Vec<_>>()
        .await?;
        emit(events, PathEvent::new(PathEventKind::PathComplete, base_path));
        Ok(())
    }

    /// walks the remote DAG and the local tree in lockstep. Returns the
    /// local folders to wipe and the files to fetch; a `Replace`d folder
    /// recurses with no policy so everything under it is taken.
    fn list_merge_path<'a>(
        &'a self,
        base: Cid,
        rel: BuckPath,
        dest: &'a Path,
        merge: Option<&'a SelectMergeFunc>,
    ) -> BoxFuture<'a, BuckResult<(Vec<PathBuf>, Vec<Object>)>> {
        async move {
            let item = with_timeout(RPC_TIMEOUT, self.client().list_ipfs_path(base, &rel)).await?;
            let local = rel.to_local(dest);
            if item.is_dir {
                let mut merge = merge;
                let mut replaced = vec![];
                let mut to_add = vec![];
                if local.exists() {
                    if let Some(select) = merge {
                        let strategy =
                            select(&format!("Merge strategy for {}", local.display()), true)?;
                        match strategy {
                            MergeStrategy::Skip => return Ok((vec![], vec![])),
                            MergeStrategy::Merge => {}
                            MergeStrategy::Replace => {
                                replaced.push(local);
                                merge = None;
                            }
                        }
                    }
                }
                for child in &item.items {
                    let (nested_replaced, nested_add) =
                        self.list_merge_path(base, rel.join(&child.name), dest, merge).await?;
                    replaced.extend(nested_replaced);
                    to_add.extend(nested_add);
                }
                Ok((replaced, to_add))
            } else {
                if let Some(select) = merge {
                    if local.exists() {
                        match select(&format!("Overwrite {}", local.display()), false)? {
                            MergeStrategy::Skip => return Ok((vec![], vec![])),
                            MergeStrategy::Merge => bail!(BuckError::CannotMergeFiles(rel)),
                            MergeStrategy::Replace => {}
                        }
                    }
                }
                let object = Object { path: rel, name: local, cid: item.cid, size: item.size };
                Ok((vec![], vec![object]))
            }
        }
        .boxed()
    }

    async fn get_ipfs_file(
        &self,
        base: Cid,
        object: &Object,
        events: &EventSender,
    ) -> BuckResult<()> {
        if let Some(parent) = object.name.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = tokio::fs::File::create(&object.name).await?;
        emit(
            events,
            PathEvent {
                path: object.path.clone(),
                cid: object.cid,
                kind: PathEventKind::FileStart,
                size: object.size,
                progress: 0,
            },
        );
        let (progress, forward) =
            forward_progress(events, object.path.clone(), object.cid, object.size);
        let res = with_timeout(
            GET_FILE_TIMEOUT,
            self.client().pull_ipfs_path(base, &object.path, &mut file, Some(progress)),
        )
        .await;
        let _ = forward.await;
        res?;
        file.flush().await?;
        emit(
            events,
            PathEvent {
                path: object.path.clone(),
                cid: object.cid,
                kind: PathEventKind::FileComplete,
                size: object.size,
                progress: object.size,
            },
        );
        Ok(())
    }
}
