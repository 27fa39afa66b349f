//! Bucket configuration: the yaml file that marks a directory as a bucket,
//! environment overrides, and upward discovery from the working directory.

use crate::error::{BuckError, BuckGenericError, BuckResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONF_DIR: &str = ".buck";
pub const CONF_NAME: &str = "config";
pub const SEED_NAME: &str = ".buckseed";
pub const ENV_PREFIX: &str = "BUCK";

/// database scope for a set of buckets; an opaque validated token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ThreadId {
    type Err = BuckGenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // multibase base32 tokens: lowercase letters and digits 2-7
        let valid = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_lowercase() || (b'2'..=b'7').contains(&b));
        if !valid {
            return Err(anyhow!(BuckError::InvalidThread(s.to_owned())));
        }
        Ok(Self(s.to_owned()))
    }
}

impl Display for ThreadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// the fixed naming scheme of a bucket installation: where config lives,
/// what the seed file is called, which env vars override
#[derive(Debug, Clone)]
pub struct ConfigSpec {
    pub dir: String,
    pub name: String,
    pub env_prefix: String,
    pub seed_name: String,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            dir: CONF_DIR.to_owned(),
            name: CONF_NAME.to_owned(),
            env_prefix: ENV_PREFIX.to_owned(),
            seed_name: SEED_NAME.to_owned(),
        }
    }
}

impl ConfigSpec {
    pub fn file_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dir).join(format!("{}.yml", self.name))
    }
}

// only these three keys are persisted
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    thread: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    org: String,
}

#[derive(Debug, Clone)]
pub struct BuckConfig {
    pub spec: ConfigSpec,
    pub key: Option<String>,
    pub thread: Option<ThreadId>,
    pub org: Option<String>,
    /// directory holding the config dir, when one was discovered
    pub root: Option<PathBuf>,
}

impl BuckConfig {
    pub fn new(spec: ConfigSpec) -> Self {
        Self { spec, key: None, thread: None, org: None, root: None }
    }

    /// loads config for `cwd`: file values from the nearest config file up
    /// the directory tree, then environment overrides
    /// (`<PREFIX>_KEY`/`_THREAD`/`_ORG`). Flag values are applied by the
    /// caller on top, giving flags > env > file.
    pub fn load(spec: ConfigSpec, cwd: &Path) -> BuckResult<Self> {
        let mut config = Self::new(spec);
        if let Some(root) = find_root(&config.spec, cwd) {
            let file = std::fs::read_to_string(config.spec.file_path(&root))?;
            let parsed: ConfFile = serde_yaml::from_str(&file)?;
            if !parsed.key.is_empty() {
                config.key = Some(parsed.key);
            }
            if !parsed.thread.is_empty() {
                config.thread = Some(parsed.thread.parse()?);
            }
            if !parsed.org.is_empty() {
                config.org = Some(parsed.org);
            }
            config.root = Some(root);
        }
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> BuckResult<()> {
        if let Some(key) = env_var(&self.spec.env_prefix, "KEY") {
            self.key = Some(key);
        }
        if let Some(thread) = env_var(&self.spec.env_prefix, "THREAD") {
            self.thread = Some(thread.parse()?);
        }
        if let Some(org) = env_var(&self.spec.env_prefix, "ORG") {
            self.org = Some(org);
        }
        Ok(())
    }

    /// a key without a thread cannot be resolved remotely
    pub fn validate(&self) -> BuckResult<()> {
        if self.key.is_some() && self.thread.is_none() {
            bail!(BuckError::ThreadRequired);
        }
        Ok(())
    }

    /// writes the config file under `root`, creating the config dir
    pub fn save(&self, root: &Path) -> BuckResult<()> {
        std::fs::create_dir_all(root.join(&self.spec.dir))?;
        let file = ConfFile {
            key: self.key.clone().unwrap_or_default(),
            thread: self.thread.as_ref().map(|t| t.to_string()).unwrap_or_default(),
            org: self.org.clone().unwrap_or_default(),
        };
        std::fs::write(self.spec.file_path(root), serde_yaml::to_string(&file)?)?;
        Ok(())
    }
}

fn env_var(prefix: &str, name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", prefix, name)).ok().filter(|v| !v.is_empty())
}

/// walks up from `cwd` looking for the config file, like a VCS looks for its
/// repository directory
fn find_root(spec: &ConfigSpec, cwd: &Path) -> Option<PathBuf> {
    let mut dir = cwd;
    loop {
        if spec.file_path(dir).exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

#[cfg(test)]
mod tests;
