mod cli_add;
mod cli_cat;
mod cli_destroy;
mod cli_init;
mod cli_links;
mod cli_ls;
mod cli_pull;
mod cli_push;
mod cli_root;
mod cli_status;

use clap::{Parser, Subcommand};
use cli_add::BuckAddCliOpts;
use cli_cat::BuckCatCliOpts;
use cli_destroy::BuckDestroyCliOpts;
use cli_init::BuckInitCliOpts;
use cli_ls::BuckLsCliOpts;
use cli_pull::BuckPullCliOpts;
use cli_push::BuckPushCliOpts;
use libbuck::buckets::Buckets;
use libbuck::config::{BuckConfig, ConfigSpec};
use libbuck::error::{BuckResult, BuckResultExt};
use libbuck::remote::fs::FsRemote;
use libbuck::remote::RemoteClient;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "buck", about = "Sync a local directory with a remote bucket", version)]
pub struct BuckCliOpts {
    /// working directory to operate in
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,
    /// remote endpoint; only file:// stores are supported, e.g.
    /// file:///srv/buckets (falls back to $BUCK_API)
    #[arg(long, global = true)]
    api: Option<String>,
    /// bucket key override
    #[arg(long, global = true)]
    key: Option<String>,
    /// thread id override
    #[arg(long, global = true)]
    thread: Option<String>,
    /// org scope override
    #[arg(long, global = true)]
    org: Option<String>,
    #[command(subcommand)]
    subcmd: BuckSubCmd,
}

#[derive(Subcommand)]
enum BuckSubCmd {
    /// Initialize a new or existing bucket
    Init(BuckInitCliOpts),
    /// Show bucket object changes
    #[command(alias = "st")]
    Status,
    /// Show bucket root CIDs
    Root,
    /// List top-level or nested bucket objects
    Ls(BuckLsCliOpts),
    /// Show links to where this bucket can be accessed
    Links,
    /// Push bucket object changes
    Push(BuckPushCliOpts),
    /// Pull bucket object changes
    Pull(BuckPullCliOpts),
    /// Merge a UnixFS DAG into the bucket
    Add(BuckAddCliOpts),
    /// Write a remote object to stdout
    Cat(BuckCatCliOpts),
    /// Destroy the bucket and all objects
    Destroy(BuckDestroyCliOpts),
}

#[tokio::main]
pub async fn run<T: Into<OsString> + Clone>(args: impl IntoIterator<Item = T>) -> BuckResult<()> {
    let opts = BuckCliOpts::parse_from(args);
    let client = connect(opts.api.as_deref())?;
    let bucks = Buckets::new(ConfigSpec::default(), client);

    let cwd = opts.path.canonicalize().map_err(|err| {
        anyhow!("cannot resolve working directory `{}`: {}", opts.path.display(), err)
    })?;
    let mut conf = BuckConfig::load(bucks.spec().clone(), &cwd)?;
    if let Some(key) = opts.key {
        conf.key = Some(key);
    }
    if let Some(thread) = opts.thread.as_deref() {
        conf.thread = Some(thread.parse()?);
    }
    if let Some(org) = opts.org {
        conf.org = Some(org);
    }

    let res = match opts.subcmd {
        BuckSubCmd::Init(init) => cli_init::exec(init, &bucks, &cwd, conf).await,
        BuckSubCmd::Status => cli_status::exec(&bucks, conf).await,
        BuckSubCmd::Root => cli_root::exec(&bucks, conf).await,
        BuckSubCmd::Ls(ls) => cli_ls::exec(ls, &bucks, conf).await,
        BuckSubCmd::Links => cli_links::exec(&bucks, conf).await,
        BuckSubCmd::Push(push) => cli_push::exec(push, &bucks, conf).await,
        BuckSubCmd::Pull(pull) => cli_pull::exec(pull, &bucks, conf).await,
        BuckSubCmd::Add(add) => cli_add::exec(add, &bucks, conf).await,
        BuckSubCmd::Cat(cat) => cli_cat::exec(cat, &bucks, conf).await,
        BuckSubCmd::Destroy(destroy) => cli_destroy::exec(destroy, &bucks, conf).await,
    };
    match res {
        Err(err) if err.is_up_to_date() => {
            println!("Everything up-to-date");
            Ok(())
        }
        Err(err) if err.is_non_fast_forward() => {
            eprintln!("hint: the remote bucket has changed, run `buck pull` first");
            Err(err)
        }
        other => other,
    }
}

fn connect(api: Option<&str>) -> BuckResult<Arc<dyn RemoteClient>> {
    let api = match api {
        Some(api) => api.to_owned(),
        None => std::env::var("BUCK_API")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("no API endpoint configured; pass --api or set BUCK_API"))?,
    };
    match api.strip_prefix("file://") {
        Some(store) if !store.is_empty() => Ok(Arc::new(FsRemote::open(store)?)),
        _ => bail!("unsupported API endpoint `{}` (only file:// stores are supported)", api),
    }
}
