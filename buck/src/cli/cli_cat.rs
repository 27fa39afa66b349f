use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;
use libbuck::path::BuckPath;

#[derive(Args)]
pub struct BuckCatCliOpts {
    /// bucket path to read
    #[arg(value_name = "PATH")]
    remote_path: String,
}

pub(crate) async fn exec(opts: BuckCatCliOpts, bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let mut stdout = tokio::io::stdout();
    bucket.cat_remote_path(&BuckPath::new(&opts.remote_path), &mut stdout).await
}
