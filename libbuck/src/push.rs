//! The push engine: uploads the working-tree diff, threading the expected
//! remote root through every mutation so concurrent pushers race on a
//! fast-forward token instead of clobbering each other.

use crate::bucket::{Bucket, Roots};
use crate::cid::Cid;
use crate::diff::{Change, ChangeKind};
use crate::error::{BuckError, BuckResult};
use crate::event::{emit, events_or_drain, forward_progress, EventSender, PathEvent, PathEventKind};
use crate::fs;
use crate::options::PathOptions;
use crate::path::BuckPath;
use crate::remote::{is_no_link_err, with_timeout, PushReply, ADD_FILE_TIMEOUT, RPC_TIMEOUT};

impl Bucket {
    /// pushes local changes to the remote. `force` pushes every file and
    /// drops the fast-forward guard; otherwise a stale remote root surfaces
    /// as [`BuckError::NonFastForward`] and nothing further is attempted.
    pub async fn push_local_path(&self, options: PathOptions) -> BuckResult<Roots> {
        let events = events_or_drain(options.events.clone());

        let mut diff = self.diff()?;
        if options.force {
            // re-enumerate every file as an addition, keeping the diff's own
            // entries (in particular its removals)
            for name in fs::walk_files(self.cwd(), self.conf_dir())? {
                let path = BuckPath::from_local(self.cwd(), &name)?;
                if !diff.iter().any(|change| change.path == path) {
                    diff.push(Change { kind: ChangeKind::Add, path, rel: name });
                }
            }
        }
        if diff.is_empty() {
            bail!(BuckError::UpToDate);
        }
        if let Some(confirm) = &options.confirm {
            if !confirm(&diff) {
                bail!(BuckError::Aborted);
            }
        }

        let roots = self.roots().await?;
        let mut xroot = roots.remote;

        emit(&events, PathEvent::new(PathEventKind::PathStart, BuckPath::root()));
        let mut rm = vec![];
        for change in &diff {
            match change.kind {
                ChangeKind::Add | ChangeKind::Modify => {
                    let reply = self.add_file(change, xroot, options.force, &events).await?;
                    xroot = reply.root;
                    self.repo().set_remote_path(&change.path, reply.added)?;
                }
                ChangeKind::Remove => rm.push(change),
            }
        }
        emit(&events, PathEvent::new(PathEventKind::PathComplete, BuckPath::root()));

        // removals run under the tree shape the uploads just produced
        for change in rm {
            xroot = self.rm_file(change, xroot, options.force, &events).await?;
            self.repo().remove_path(&change.path)?;
        }

        self.repo().save()?;
        let remote_root = self.remote_root().await?;
        self.repo().set_remote_path(&BuckPath::root(), remote_root)?;
        self.roots().await
    }

    async fn add_file(
        &self,
        change: &Change,
        xroot: Cid,
        force: bool,
        events: &EventSender,
    ) -> BuckResult<PushReply> {
        let mut file = tokio::fs::File::open(&change.rel).await?;
        let size = file.metadata().await?.len();
        emit(
            events,
            PathEvent {
                path: change.path.clone(),
                cid: Cid::UNKNOWN,
                kind: PathEventKind::FileStart,
                size,
                progress: 0,
            },
        );
        let (progress, forward) = forward_progress(events, change.path.clone(), Cid::UNKNOWN, size);
        let fast_forward = (!force).then_some(xroot);
        let res = with_timeout(
            ADD_FILE_TIMEOUT,
            self.client().push_path(
                self.key(),
                &change.path,
                &mut file,
                Some(progress),
                fast_forward,
            ),
        )
        .await;
        let _ = forward.await;
        let reply = res?;
        emit(
            events,
            PathEvent {
                path: change.path.clone(),
                cid: reply.added,
                kind: PathEventKind::FileComplete,
                size,
                progress: size,
            },
        );
        Ok(reply)
    }

    async fn rm_file(
        &self,
        change: &Change,
        xroot: Cid,
        force: bool,
        events: &EventSender,
    ) -> BuckResult<Cid> {
        let fast_forward = (!force).then_some(xroot);
        let root = match with_timeout(
            RPC_TIMEOUT,
            self.client().remove_path(self.key(), &change.path, fast_forward),
        )
        .await
        {
            Ok(root) => root,
            // the remote already lacks the path; keep the last known root
            Err(err) if is_no_link_err(&err) => xroot,
            Err(err) => return Err(err),
        };
        emit(events, PathEvent::new(PathEventKind::FileRemoved, change.path.clone()));
        Ok(root)
    }
}

#[cfg(test)]
mod tests;
