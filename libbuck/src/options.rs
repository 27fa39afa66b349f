use crate::buckets::BucketInfo;
use crate::cid::Cid;
use crate::diff::Change;
use crate::error::BuckResult;
use crate::event::EventSender;

/// asked before a sync mutates anything; returning false aborts the
/// operation with [`BuckError::Aborted`](crate::error::BuckError)
pub type ConfirmFunc = Box<dyn Fn(&[Change]) -> bool + Send + Sync>;

/// asked per colliding path during a merge-from-cid; the string is a human
/// description of the collision, the bool whether it is a directory
pub type SelectMergeFunc = Box<dyn Fn(&str, bool) -> BuckResult<MergeStrategy> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// leave the local node alone
    Skip,
    /// recurse into the directory, overwriting overlaps; invalid for files
    Merge,
    /// take the remote subtree wholesale
    Replace,
}

/// options for push and pull
#[derive(Default)]
pub struct PathOptions {
    pub(crate) confirm: Option<ConfirmFunc>,
    pub(crate) force: bool,
    pub(crate) hard: bool,
    pub(crate) events: Option<EventSender>,
}

impl PathOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(mut self, confirm: impl Fn(&[Change]) -> bool + Send + Sync + 'static) -> Self {
        self.confirm = Some(Box::new(confirm));
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_hard(mut self, hard: bool) -> Self {
        self.hard = hard;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }
}

/// options for merging a remote DAG into the bucket
#[derive(Default)]
pub struct AddOptions {
    pub(crate) merge: Option<SelectMergeFunc>,
    pub(crate) events: Option<EventSender>,
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge(
        mut self,
        merge: impl Fn(&str, bool) -> BuckResult<MergeStrategy> + Send + Sync + 'static,
    ) -> Self {
        self.merge = Some(Box::new(merge));
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }
}

/// options for creating a bucket
#[derive(Default)]
pub struct NewOptions {
    pub(crate) name: String,
    pub(crate) private: bool,
    pub(crate) from_cid: Option<Cid>,
    pub(crate) from_bucket: Option<BucketInfo>,
    pub(crate) events: Option<EventSender>,
}

impl NewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// ask the remote to encrypt bucket contents
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// bootstrap the new bucket from an existing DAG
    pub fn with_cid(mut self, cid: Cid) -> Self {
        self.from_cid = Some(cid);
        self
    }

    /// mirror an existing remote bucket (e.g. one created on another
    /// machine)
    pub fn with_bucket(mut self, info: BucketInfo) -> Self {
        self.from_bucket = Some(info);
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }
}
