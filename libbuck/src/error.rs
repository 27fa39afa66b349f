use crate::cid::Cid;
use crate::path::BuckPath;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

pub type BuckResult<T> = Result<T, BuckGenericError>;
pub type BuckGenericError = anyhow::Error;

// anyhow carries most errors; this enum exists for the cases callers need to
// match on (sentinels and preconditions), recovered by downcasting
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum BuckError {
    /// the working directory (and none of its parents) holds a bucket config
    NotABucket,
    AlreadyInitialized(PathBuf),
    /// a bucket key was supplied without a thread to scope it
    ThreadRequired,
    InvalidThread(String),
    UpToDate,
    Aborted,
    /// the remote root moved since we last read it; the held root is the
    /// remote's current one when the server reported it
    NonFastForward(Cid),
    CannotMergeFiles(BuckPath),
    DestinationOutsideBucket(PathBuf),
}

pub trait BuckErrorExt {
    fn try_into_buck_error(self) -> BuckResult<BuckError>;
    fn try_into_non_fast_forward_err(self) -> BuckResult<Cid>;
}

impl BuckErrorExt for BuckGenericError {
    fn try_into_buck_error(self) -> BuckResult<BuckError> {
        self.downcast::<BuckError>()
    }

    /// tries to convert a generic error into the specific error, returning
    /// the original error on failure
    fn try_into_non_fast_forward_err(self) -> BuckResult<Cid> {
        match self.try_into_buck_error()? {
            BuckError::NonFastForward(root) => Ok(root),
            err => Err(anyhow!(err)),
        }
    }
}

pub trait BuckResultExt {
    fn is_up_to_date(&self) -> bool;
    fn is_aborted(&self) -> bool;
    fn is_non_fast_forward(&self) -> bool;
}

macro_rules! error_ext_is_method {
    ($method:ident) => {
        fn $method(&self) -> bool {
            match self {
                Ok(..) => false,
                Err(err) => err.$method(),
            }
        }
    };
}

impl<T> BuckResultExt for BuckResult<T> {
    error_ext_is_method!(is_up_to_date);

    error_ext_is_method!(is_aborted);

    error_ext_is_method!(is_non_fast_forward);
}

impl BuckResultExt for BuckGenericError {
    fn is_up_to_date(&self) -> bool {
        matches!(self.downcast_ref::<BuckError>(), Some(BuckError::UpToDate))
    }

    fn is_aborted(&self) -> bool {
        matches!(self.downcast_ref::<BuckError>(), Some(BuckError::Aborted))
    }

    fn is_non_fast_forward(&self) -> bool {
        matches!(self.downcast_ref::<BuckError>(), Some(BuckError::NonFastForward(..)))
    }
}

impl std::error::Error for BuckError {
}

impl Display for BuckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuckError::NotABucket =>
                write!(f, "not a bucket (or any of the parent directories)"),
            BuckError::AlreadyInitialized(cwd) =>
                write!(f, "bucket `{}` is already initialized", cwd.display()),
            BuckError::ThreadRequired => write!(f, "a thread is required when using a key"),
            BuckError::InvalidThread(s) => write!(f, "invalid thread id `{}`", s),
            BuckError::UpToDate => write!(f, "everything up-to-date"),
            BuckError::Aborted => write!(f, "operation aborted by caller"),
            BuckError::NonFastForward(..) =>
                write!(f, "the remote bucket root has changed (non-fast-forward update)"),
            BuckError::CannotMergeFiles(path) => write!(f, "cannot merge files: `{}`", path),
            BuckError::DestinationOutsideBucket(dest) =>
                write!(f, "destination `{}` is not in the bucket path", dest.display()),
        }
    }
}
