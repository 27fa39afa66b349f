use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;
use libbuck::path::BuckPath;

#[derive(Args)]
pub struct BuckLsCliOpts {
    /// bucket path to list; defaults to the root
    #[arg(value_name = "PATH")]
    remote_path: Option<String>,
}

pub(crate) async fn exec(opts: BuckLsCliOpts, bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let path = BuckPath::new(opts.remote_path.as_deref().unwrap_or(""));
    let items = bucket.list_remote_path(&path).await?;
    if items.is_empty() {
        println!("None found");
        return Ok(());
    }
    for item in items {
        let marker = if item.is_dir { "/" } else { "" };
        println!("{:>12}  {:#}  {}{}", item.size, item.cid, item.path, marker);
    }
    Ok(())
}
