use crate::util;
use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::cid::Cid;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;
use libbuck::options::NewOptions;
use std::path::Path;

#[derive(Args)]
pub struct BuckInitCliOpts {
    /// bucket name
    #[arg(short, long)]
    name: Option<String>,
    /// obfuscate files and folders with encryption
    #[arg(short, long)]
    private: bool,
    /// bootstrap the bucket with a UnixFS DAG
    #[arg(long)]
    cid: Option<String>,
    /// initialize from an existing remote bucket
    #[arg(short, long)]
    existing: bool,
}

pub(crate) async fn exec(
    opts: BuckInitCliOpts,
    bucks: &Buckets,
    cwd: &Path,
    conf: BuckConfig,
) -> BuckResult<()> {
    ensure!(
        !(opts.existing && opts.cid.is_some()),
        "only one of --cid and --existing can be used at the same time"
    );
    let mut new_opts = NewOptions::new().with_private(opts.private);
    if let Some(name) = &opts.name {
        new_opts = new_opts.with_name(name.clone());
    }
    if let Some(cid) = &opts.cid {
        new_opts = new_opts.with_cid(cid.parse::<Cid>()?);
    }
    if opts.existing {
        let thread = conf
            .thread
            .clone()
            .ok_or_else(|| anyhow!("a thread is required to list existing buckets"))?;
        let list = bucks.remote_buckets(&[thread]).await?;
        let selected = match &opts.name {
            Some(name) => list
                .into_iter()
                .find(|info| &info.name == name)
                .ok_or_else(|| anyhow!("no remote bucket named `{}`", name))?,
            None => {
                ensure!(
                    list.len() == 1,
                    "{} remote buckets found; pick one with --name",
                    list.len()
                );
                list.into_iter().next().unwrap()
            }
        };
        new_opts = new_opts.with_bucket(selected);
    }

    let (events, printer) = util::event_printer();
    let res = bucks.new_local_bucket(cwd, conf, new_opts.with_events(events)).await;
    let _ = printer.await;
    let (bucket, links) = res?;
    util::print_links(&links);
    println!("Initialized bucket `{}` in {}", bucket.key(), bucket.cwd().display());
    Ok(())
}
