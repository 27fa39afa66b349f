use libbuck::buckets::Buckets;
use libbuck::config::BuckConfig;
use libbuck::error::BuckResult;

pub(crate) async fn exec(bucks: &Buckets, conf: BuckConfig) -> BuckResult<()> {
    let bucket = bucks.open_local_bucket(conf).await?;
    let roots = bucket.roots().await?;
    // the two differ for encrypted buckets
    println!("local:  {}", roots.local);
    println!("remote: {}", roots.remote);
    Ok(())
}
