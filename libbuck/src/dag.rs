//! Balanced UnixFS-style DAG layout: files are split into fixed-size chunks
//! whose hashes are wrapped in a file node, directories are sorted link
//! lists. The resulting cids are a pure function of (bytes, layout, cid
//! version), which is what lets the engines skip files whose local hash
//! matches the remote's.

use crate::cid::{Cid, CidVersion};
use crate::error::BuckResult;
use crate::io::WriteExt;
use crate::path::BuckPath;
use crate::serialize::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

pub const CHUNK_SIZE: usize = 256 * 1024;

const TAG_CHUNK: &[u8] = b"chunk";
const TAG_FILE: &[u8] = b"file";
const TAG_DIR: &[u8] = b"dir";

// git-style framing: `<tag> <len>\0<payload>`
fn hash_framed(tag: &[u8], payload: &[u8], version: CidVersion) -> Cid {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(b" ");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(payload);
    Cid::new(version, hasher.finalize().into())
}

struct FileNode {
    links: Vec<(Cid, u64)>,
}

impl Serialize for FileNode {
    fn serialize(&self, writer: &mut dyn Write) -> BuckResult<()> {
        for (cid, size) in &self.links {
            let bytes = cid.to_bytes();
            writer.write_u8(bytes.len() as u8)?;
            writer.write_all(&bytes)?;
            writer.write_u64(*size)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cid: Cid,
    pub size: u64,
    pub is_dir: bool,
}

struct DirNode<'a> {
    entries: &'a [DirEntry],
}

impl Serialize for DirNode<'_> {
    fn serialize(&self, writer: &mut dyn Write) -> BuckResult<()> {
        for entry in self.entries {
            writer.write_u16(entry.name.len() as u16)?;
            writer.write_all(entry.name.as_bytes())?;
            writer.write_u8(entry.is_dir as u8)?;
            let bytes = entry.cid.to_bytes();
            writer.write_u8(bytes.len() as u8)?;
            writer.write_all(&bytes)?;
            writer.write_u64(entry.size)?;
        }
        Ok(())
    }
}

pub fn hash_bytes(bytes: &[u8], version: CidVersion) -> Cid {
    let mut chunks = bytes.chunks(CHUNK_SIZE);
    let first = chunks.next().unwrap_or_default();
    let mut links = vec![(hash_framed(TAG_CHUNK, first, version), first.len() as u64)];
    links.extend(chunks.map(|c| (hash_framed(TAG_CHUNK, c, version), c.len() as u64)));
    wrap_links(links, version)
}

pub fn hash_reader(reader: &mut impl Read, version: CidVersion) -> BuckResult<Cid> {
    let mut links = vec![];
    let mut buf = vec![0; CHUNK_SIZE];
    loop {
        let mut filled = 0;
        while filled < CHUNK_SIZE {
            let n = reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 && !links.is_empty() {
            break;
        }
        links.push((hash_framed(TAG_CHUNK, &buf[..filled], version), filled as u64));
        if filled < CHUNK_SIZE {
            break;
        }
    }
    Ok(wrap_links(links, version))
}

/// hashes a file on disk; a file no larger than one chunk hashes to its
/// chunk cid, anything bigger gets a file node over the chunk links
pub fn hash_file(path: &Path, version: CidVersion) -> BuckResult<Cid> {
    let file = File::open(path)?;
    hash_reader(&mut BufReader::new(file), version)
}

fn wrap_links(links: Vec<(Cid, u64)>, version: CidVersion) -> Cid {
    if links.len() == 1 {
        return links[0].0;
    }
    let node = FileNode { links };
    let payload = node.serialize_to_vec().expect("writing a node into a Vec cannot fail");
    hash_framed(TAG_FILE, &payload, version)
}

pub fn hash_dir(entries: &[DirEntry], version: CidVersion) -> Cid {
    debug_assert!(entries.windows(2).all(|w| w[0].name < w[1].name));
    let payload =
        DirNode { entries }.serialize_to_vec().expect("writing a node into a Vec cannot fail");
    hash_framed(TAG_DIR, &payload, version)
}

/// nested directory structure built from a flat (path -> file cid) map;
/// knows how to hash any of its subtrees
#[derive(Debug, Default)]
pub(crate) struct TreeNode {
    pub(crate) files: BTreeMap<String, (Cid, u64)>,
    pub(crate) dirs: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    pub(crate) fn insert(&mut self, path: &BuckPath, cid: Cid, size: u64) {
        let mut node = self;
        let components = path.components().collect::<Vec<_>>();
        let Some((name, parents)) = components.split_last() else { return };
        for component in parents {
            node = node.dirs.entry((*component).to_owned()).or_default();
        }
        node.files.insert((*name).to_owned(), (cid, size));
    }

    pub(crate) fn child(&self, name: &str, version: CidVersion) -> Option<(Cid, u64, bool)> {
        if let Some(node) = self.dirs.get(name) {
            let (cid, size) = node.digest(version);
            return Some((cid, size, true));
        }
        self.files.get(name).map(|&(cid, size)| (cid, size, false))
    }

    /// (cid, cumulative size) of this directory node
    pub(crate) fn digest(&self, version: CidVersion) -> (Cid, u64) {
        let mut entries = Vec::with_capacity(self.files.len() + self.dirs.len());
        for (name, node) in &self.dirs {
            let (cid, size) = node.digest(version);
            entries.push(DirEntry { name: name.clone(), cid, size, is_dir: true });
        }
        for (name, &(cid, size)) in &self.files {
            entries.push(DirEntry { name: name.clone(), cid, size, is_dir: false });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let size = entries.iter().map(|e| e.size).sum();
        (hash_dir(&entries, version), size)
    }
}

/// root cid of the directory DAG spanned by a flat file map
pub(crate) fn tree_root(files: &BTreeMap<BuckPath, (Cid, u64)>, version: CidVersion) -> Cid {
    build_tree(files).digest(version).0
}

pub(crate) fn build_tree(files: &BTreeMap<BuckPath, (Cid, u64)>) -> TreeNode {
    let mut root = TreeNode::default();
    for (path, &(cid, size)) in files {
        root.insert(path, cid, size);
    }
    root
}
