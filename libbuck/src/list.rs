use crate::bucket::Bucket;
use crate::cid::Cid;
use crate::error::BuckResult;
use crate::path::BuckPath;
use crate::remote::{with_timeout, RemoteItem, RPC_TIMEOUT};
use serde::Serialize;

/// json-friendly view of a remote listing node
#[derive(Debug, Clone, Serialize)]
pub struct BucketItem {
    pub cid: Cid,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    pub size: u64,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<BucketItem>,
}

impl From<&RemoteItem> for BucketItem {
    fn from(item: &RemoteItem) -> Self {
        Self {
            cid: item.cid,
            name: item.name.clone(),
            path: item.path.to_string(),
            size: item.size,
            is_dir: item.is_dir,
            items: item.items.iter().map(BucketItem::from).collect(),
        }
    }
}

impl Bucket {
    /// lists the remote bucket at `path`: a directory's children, or the
    /// single file itself
    pub async fn list_remote_path(&self, path: &BuckPath) -> BuckResult<Vec<BucketItem>> {
        let item =
            with_timeout(RPC_TIMEOUT, self.client().list_path(self.key(), path)).await?;
        if !item.items.is_empty() {
            Ok(item.items.iter().map(BucketItem::from).collect())
        } else if !item.is_dir {
            Ok(vec![BucketItem::from(&item)])
        } else {
            Ok(vec![])
        }
    }
}
