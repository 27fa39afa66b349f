use crate::util;
use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;
use libbuck::options::PathOptions;

#[derive(Args)]
pub struct BuckPullCliOpts {
    /// pull all remote files, changed or not
    #[arg(short, long)]
    force: bool,
    /// discard local changes
    #[arg(long)]
    hard: bool,
    /// skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

pub(crate) async fn exec(opts: BuckPullCliOpts, bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let (events, printer) = util::event_printer();
    let mut path_opts = PathOptions::new()
        .with_force(opts.force)
        .with_hard(opts.hard)
        .with_events(events);
    if !opts.yes {
        path_opts = path_opts.with_confirm(util::confirm);
    }
    let res = bucket.pull_remote_path(path_opts).await;
    let _ = printer.await;
    let roots = res?;
    println!("{}", roots.remote);
    Ok(())
}
