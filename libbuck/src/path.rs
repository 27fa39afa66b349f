use std::fmt::{self, Debug, Display, Formatter};
use std::path::{Path, PathBuf};

use crate::error::BuckResult;

/// a normalized, `/`-separated, bucket-relative utf-8 path. The empty path
/// is the bucket root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BuckPath(String);

impl BuckPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// normalizes separators and strips the `.`/`./`/trailing-slash noise
    /// callers tend to hand us
    pub fn new(s: impl AsRef<str>) -> Self {
        let mut out = String::with_capacity(s.as_ref().len());
        for component in s.as_ref().split('/') {
            if component.is_empty() || component == "." {
                continue;
            }
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(component);
        }
        Self(out)
    }

    /// the bucket-relative path of `target` under `base`
    pub fn from_local(base: &Path, target: &Path) -> BuckResult<Self> {
        let rel = target
            .strip_prefix(base)
            .map_err(|_| anyhow!("`{}` is not under `{}`", target.display(), base.display()))?;
        let s = rel
            .to_str()
            .ok_or_else(|| anyhow!("non-utf8 path `{}`", rel.display()))?;
        Ok(Self::new(s))
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        if self.is_root() {
            Self::new(name)
        } else {
            Self::new(format!("{}/{}", self.0, name.as_ref()))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
            None => Some(Self::root()),
        }
    }

    /// final path component; empty for the root
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// component-boundary prefix test; the root is a prefix of everything
    pub fn starts_with(&self, prefix: &BuckPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(&prefix.0) {
            Some("") => true,
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }

    pub fn strip_prefix(&self, prefix: &BuckPath) -> Option<Self> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        match self.0.strip_prefix(&prefix.0) {
            Some("") => Some(Self::root()),
            Some(rest) if rest.starts_with('/') => Some(Self(rest[1..].to_owned())),
            _ => None,
        }
    }

    /// the absolute local path of this bucket path under `base`
    pub fn to_local(&self, base: &Path) -> PathBuf {
        let mut out = base.to_path_buf();
        for component in self.components() {
            out.push(component);
        }
        out
    }
}

impl From<&str> for BuckPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for BuckPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for BuckPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() { write!(f, "/") } else { write!(f, "{}", self.0) }
    }
}

impl Debug for BuckPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
