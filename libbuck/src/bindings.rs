//! The durable path -> cid binding table backing a repository.
//!
//! Bindings remember two things per bucket path: what the file hashed to
//! locally at the last save, and what cid the remote reported for it at the
//! last push or pull. The two differ whenever the remote transforms content
//! (encrypted buckets), which is exactly why both sides are kept.

use crate::cid::{Cid, CidVersion, DIGEST_SIZE};
use crate::error::BuckResult;
use crate::io::{ReadExt, WriteExt};
use crate::path::BuckPath;
use crate::serialize::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::prelude::*;
use std::path::PathBuf;

const BINDINGS_SIG: &[u8; 4] = b"BKBS";
const BINDINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub local: Cid,
    pub remote: Cid,
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

impl Default for Binding {
    fn default() -> Self {
        Self { local: Cid::UNKNOWN, remote: Cid::UNKNOWN, size: 0, mtime_secs: 0, mtime_nanos: 0 }
    }
}

/// a keyed map persisted as a single checksummed file, in the spirit of a
/// git index: magic, format version, entry table, digest trailer
#[derive(Debug)]
pub struct BindingStore {
    path: PathBuf,
    entries: BTreeMap<BuckPath, Binding>,
    /// mtime of the backing file when it was last read or written; feeds the
    /// racy-entry check
    mtime: Option<(i64, u32)>,
}

impl BindingStore {
    /// a missing file is an empty store; a torn or corrupt one is an error
    pub fn load(path: PathBuf) -> BuckResult<Self> {
        if !path.exists() {
            return Ok(Self { path, entries: Default::default(), mtime: None });
        }
        let bytes = std::fs::read(&path)?;
        ensure!(bytes.len() >= DIGEST_SIZE, "binding store `{}` is truncated", path.display());
        let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_SIZE);
        let digest: [u8; DIGEST_SIZE] = Sha256::digest(body).into();
        ensure!(
            digest[..] == *trailer,
            "binding store `{}` is corrupt (checksum mismatch)",
            path.display()
        );
        let entries = BTreeMap::deserialize_unbuffered(body)?;
        let mtime = std::fs::metadata(&path).ok().map(|md| crate::fs::mtime(&md));
        Ok(Self { path, entries, mtime })
    }

    /// atomic flush: everything is staged into a sibling file first so a
    /// crash can only ever lose this invocation's updates
    pub fn save(&mut self) -> BuckResult<()> {
        let mut body = self.entries.serialize_to_vec()?;
        let digest: [u8; DIGEST_SIZE] = Sha256::digest(&body).into();
        body.extend_from_slice(&digest);
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &body)?;
        std::fs::rename(&tmp, &self.path)?;
        self.mtime = std::fs::metadata(&self.path).ok().map(|md| crate::fs::mtime(&md));
        Ok(())
    }

    /// a working-tree mtime equal to the store's own mtime may predate the
    /// last write by less than the filesystem timestamp granularity, so its
    /// cached hash cannot be trusted
    pub fn is_racy(&self, mtime_secs: i64, mtime_nanos: u32) -> bool {
        self.mtime == Some((mtime_secs, mtime_nanos))
    }

    pub fn get(&self, path: &BuckPath) -> Option<Binding> {
        self.entries.get(path).copied()
    }

    pub fn set_local(
        &mut self,
        path: BuckPath,
        cid: Cid,
        size: u64,
        mtime_secs: i64,
        mtime_nanos: u32,
    ) {
        let binding = self.entries.entry(path).or_default();
        binding.local = cid;
        binding.size = size;
        binding.mtime_secs = mtime_secs;
        binding.mtime_nanos = mtime_nanos;
    }

    pub fn set_remote(&mut self, path: BuckPath, cid: Cid) {
        self.entries.entry(path).or_default().remote = cid;
    }

    pub(crate) fn set_root_local(&mut self, root: Cid) {
        self.entries.entry(BuckPath::root()).or_default().local = root;
    }

    /// drops the path and everything under it
    pub fn remove_prefix(&mut self, prefix: &BuckPath) {
        self.entries.retain(|path, _| path != prefix && !path.starts_with(prefix));
    }

    /// the bindings of the empty path are the bucket roots
    pub fn root(&self) -> (Cid, Cid) {
        match self.get(&BuckPath::root()) {
            Some(binding) => (binding.local, binding.remote),
            None => (Cid::UNKNOWN, Cid::UNKNOWN),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BuckPath, &Binding)> {
        self.entries.iter()
    }

    /// the cached file DAG from the last save: non-root entries with a known
    /// local cid
    pub(crate) fn local_files(&self) -> BTreeMap<BuckPath, (Cid, u64)> {
        self.entries
            .iter()
            .filter(|(path, binding)| !path.is_root() && binding.local.is_defined())
            .map(|(path, binding)| (path.clone(), (binding.local, binding.size)))
            .collect()
    }

    /// replaces the cached local DAG wholesale, keeping the remote side of
    /// surviving bindings
    pub(crate) fn replace_local(&mut self, files: BTreeMap<BuckPath, Binding>, root: Cid) {
        let mut next = files;
        for (path, binding) in next.iter_mut() {
            if let Some(old) = self.entries.get(path) {
                binding.remote = old.remote;
            }
        }
        let (_, remote_root) = self.root();
        let mut root_binding = Binding { local: root, remote: remote_root, ..Default::default() };
        if let Some(old) = self.entries.get(&BuckPath::root()) {
            root_binding.remote = old.remote;
        }
        next.insert(BuckPath::root(), root_binding);
        self.entries = next;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn write_cid(writer: &mut dyn Write, cid: Cid) -> BuckResult<()> {
    writer.write_u8(cid.version().number() as u8)?;
    writer.write_all(cid.digest())?;
    Ok(())
}

fn read_cid(reader: &mut impl BufRead) -> BuckResult<Cid> {
    let version = CidVersion::from_number(reader.read_u8()? as u64)?;
    Ok(Cid::new(version, reader.read_array()?))
}

impl Serialize for BTreeMap<BuckPath, Binding> {
    fn serialize(&self, writer: &mut dyn Write) -> BuckResult<()> {
        writer.write_all(BINDINGS_SIG)?;
        writer.write_u32(BINDINGS_VERSION)?;
        writer.write_u32(self.len() as u32)?;
        for (path, binding) in self {
            writer.write_u16(path.as_str().len() as u16)?;
            writer.write_all(path.as_str().as_bytes())?;
            write_cid(writer, binding.local)?;
            write_cid(writer, binding.remote)?;
            writer.write_u64(binding.size)?;
            writer.write_i64(binding.mtime_secs)?;
            writer.write_u32(binding.mtime_nanos)?;
        }
        Ok(())
    }
}

impl Deserialize for BTreeMap<BuckPath, Binding> {
    fn deserialize(reader: &mut impl BufRead) -> BuckResult<Self> {
        let sig = reader.read_array::<4>()?;
        ensure!(&sig == BINDINGS_SIG, "invalid binding store signature");
        let version = reader.read_u32()?;
        ensure!(version == BINDINGS_VERSION, "unsupported binding store version `{}`", version);
        let count = reader.read_u32()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let len = reader.read_u16()? as usize;
            let path = String::from_utf8(reader.read_vec(len)?)?;
            let local = read_cid(reader)?;
            let remote = read_cid(reader)?;
            let size = reader.read_u64()?;
            let mtime_secs = reader.read_i64()?;
            let mtime_nanos = reader.read_u32()?;
            entries.insert(
                BuckPath::new(path),
                Binding { local, remote, size, mtime_secs, mtime_nanos },
            );
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests;
