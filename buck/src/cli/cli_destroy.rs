use crate::util;
use clap::Args;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::{BuckError, BuckResult};

#[derive(Args)]
pub struct BuckDestroyCliOpts {
    /// skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

pub(crate) async fn exec(opts: BuckDestroyCliOpts, bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    if !opts.yes
        && !util::confirm_msg("This will destroy the remote bucket and all its objects. Are you sure?")
    {
        bail!(BuckError::Aborted);
    }
    bucket.destroy().await?;
    println!("Destroyed bucket `{}`", bucket.key());
    Ok(())
}
