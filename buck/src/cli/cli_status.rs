use crate::util;
use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;

pub(crate) async fn exec(bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let diff = bucket.diff()?;
    if diff.is_empty() {
        println!("Everything up-to-date");
        return Ok(());
    }
    util::print_diff(&diff);
    Ok(())
}
