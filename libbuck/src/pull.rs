//! The pull engine: makes the working tree match the remote, preserving
//! local edits through the patch-rename dance unless pulling hard.

use crate::bucket::{Bucket, Roots};
use crate::cid::Cid;
use crate::diff::{Change, ChangeKind};
use crate::error::{BuckError, BuckResult};
use crate::event::{emit, events_or_drain, forward_progress, EventSender, PathEvent, PathEventKind};
use crate::fs::{self, PATCH_EXT};
use crate::options::PathOptions;
use crate::path::BuckPath;
use crate::remote::{with_timeout, RemoteItem, GET_FILE_TIMEOUT, RPC_TIMEOUT};
use futures::prelude::*;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// transfer fan-out bound per engine invocation
pub(crate) const MAX_TRANSFERS: usize = 8;

/// a pending transfer
#[derive(Debug, Clone)]
pub(crate) struct Object {
    /// remote-side path (bucket- or DAG-relative)
    pub(crate) path: BuckPath,
    /// absolute local destination
    pub(crate) name: PathBuf,
    pub(crate) cid: Cid,
    pub(crate) size: u64,
}

pub(crate) fn patch_path(rel: &Path) -> PathBuf {
    let mut name = rel.as_os_str().to_owned();
    name.push(".");
    name.push(PATCH_EXT);
    PathBuf::from(name)
}

impl Bucket {
    /// pulls the remote bucket into the working tree. Without `hard`, local
    /// modifications and additions survive; with it they are discarded
    /// (after the confirm callback, when one is present).
    pub async fn pull_remote_path(&self, options: PathOptions) -> BuckResult<Roots> {
        let events = events_or_drain(options.events.clone());

        let diff = self.diff()?;
        if options.hard && !diff.is_empty() {
            if let Some(confirm) = &options.confirm {
                if !confirm(&diff) {
                    bail!(BuckError::Aborted);
                }
            }
        }

        // move local modifications and additions aside unless pulling hard
        if !options.hard {
            for change in &diff {
                if matches!(change.kind, ChangeKind::Add | ChangeKind::Modify) {
                    std::fs::rename(&change.rel, patch_path(&change.rel))?;
                }
            }
        }

        let count = self.get_path(&BuckPath::root(), &diff, options.force, &events).await?;
        if count == 0 {
            bail!(BuckError::UpToDate);
        }

        // snapshot what the remote gave us before local edits come back
        self.repo().save()?;
        let remote_root = self.remote_root().await?;
        self.repo().set_remote_path(&BuckPath::root(), remote_root)?;

        // re-apply local changes
        if !options.hard {
            for change in &diff {
                match change.kind {
                    ChangeKind::Add | ChangeKind::Modify => {
                        std::fs::rename(patch_path(&change.rel), &change.rel)?;
                    }
                    ChangeKind::Remove => {
                        // already handled by get_path if the remote dropped
                        // the path too
                        let _ = std::fs::remove_file(&change.rel);
                    }
                }
            }
        }
        self.roots().await
    }

    /// syncs the remote tree under `pth` into the working tree and returns
    /// the number of operations (downloads + removals) performed
    async fn get_path(
        &self,
        pth: &BuckPath,
        diff: &[Change],
        force: bool,
        events: &EventSender,
    ) -> BuckResult<usize> {
        let (all, missing) = self.list_path_objects(pth, force).await?;

        // local files the remote no longer has
        let mut rm: Vec<PathBuf> = vec![];
        for name in fs::walk_files(self.cwd(), self.conf_dir())? {
            if !all.iter().any(|o| o.name == name) {
                rm.push(name);
            }
        }
        // locally deleted paths the remote also dropped still need their
        // patch leftovers cleared
        for change in diff {
            if !all.iter().any(|o| o.path == change.path) {
                rm.push(change.rel.clone());
            }
        }

        let count = missing.len() + rm.len();
        if count == 0 {
            return Ok(0);
        }
        debug!("Bucket::get_path: {} downloads, {} removals", missing.len(), rm.len());

        emit(events, PathEvent::new(PathEventKind::PathStart, pth.clone()));
        if !missing.is_empty() {
            let bound = missing.len().min(MAX_TRANSFERS);
            stream::iter(missing.into_iter().map(|object| {
                let events = events.clone();
                async move {
                    self.get_file(&object, &events).await?;
                    self.repo().set_remote_path(&object.path, object.cid)
                }
            }))
            .buffer_unordered(bound)
            .try_collect::<Vec<_>>()
            .await?;
        }
        for name in &rm {
            // the file may have been moved to a patch backup already
            if name.is_dir() {
                let _ = std::fs::remove_dir_all(name);
            } else {
                let _ = std::fs::remove_file(name);
            }
            emit(
                events,
                PathEvent::new(PathEventKind::FileRemoved, BuckPath::from_local(self.cwd(), name)?),
            );
        }
        emit(events, PathEvent::new(PathEventKind::PathComplete, pth.clone()));
        Ok(count)
    }

    /// enumerates the remote tree under `pth`: every file, and the subset
    /// that actually needs downloading. A file is skipped when its local
    /// bytes already hash to the remote cid, or when the binding table
    /// knows the pair corresponds (encrypted buckets); `force` downloads
    /// everything.
    async fn list_path_objects(
        &self,
        pth: &BuckPath,
        force: bool,
    ) -> BuckResult<(Vec<Object>, Vec<Object>)> {
        let item = with_timeout(RPC_TIMEOUT, self.client().list_path(self.key(), pth)).await?;
        let mut all = vec![];
        let mut missing = vec![];
        self.collect_objects(&item, force, &mut all, &mut missing);
        Ok((all, missing))
    }

    fn collect_objects(
        &self,
        item: &RemoteItem,
        force: bool,
        all: &mut Vec<Object>,
        missing: &mut Vec<Object>,
    ) {
        if item.is_dir {
            for child in &item.items {
                self.collect_objects(child, force, all, missing);
            }
            return;
        }
        let object = Object {
            path: item.path.clone(),
            name: item.path.to_local(self.cwd()),
            cid: item.cid,
            size: item.size,
        };
        all.push(object.clone());
        if !force {
            let local = self.repo().hash_file(&object.name).unwrap_or(Cid::UNKNOWN);
            if local.is_defined() && local == object.cid {
                return;
            }
            if self.repo().match_path(&object.path, local, object.cid) {
                return;
            }
        }
        missing.push(object);
    }

    pub(crate) async fn get_file(&self, object: &Object, events: &EventSender) -> BuckResult<()> {
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
            self.client().pull_path(self.key(), &object.path, &mut file, Some(progress)),
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
