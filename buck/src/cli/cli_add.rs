use crate::util;
use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::cid::Cid;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;
use libbuck::options::{AddOptions, MergeStrategy};
use std::path::PathBuf;

#[derive(Args)]
pub struct BuckAddCliOpts {
    /// root cid of the UnixFS DAG to merge
    cid: String,
    /// destination inside the bucket
    dest: PathBuf,
    /// overwrite files and merge folders without prompting
    #[arg(short, long)]
    yes: bool,
}

pub(crate) async fn exec(opts: BuckAddCliOpts, bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let cid: Cid = opts.cid.parse()?;
    let (events, printer) = util::event_printer();
    let mut add_opts = AddOptions::new().with_events(events);
    add_opts = if opts.yes {
        add_opts.with_merge(|_, is_dir| {
            Ok(if is_dir { MergeStrategy::Merge } else { MergeStrategy::Replace })
        })
    } else {
        add_opts.with_merge(util::select_merge)
    };
    let res = bucket.add_remote_cid(cid, &opts.dest, add_opts).await;
    let _ = printer.await;
    res
}
