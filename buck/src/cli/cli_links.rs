use crate::util;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;

pub(crate) async fn exec(bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let links = bucket.remote_links().await?;
    util::print_links(&links);
    Ok(())
}
