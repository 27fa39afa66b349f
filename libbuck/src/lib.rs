//! Local working copies for remote content-addressed buckets.
//!
//! A bucket is a versioned subtree living in a remote object store as a
//! UnixFS-style merkle DAG. This crate keeps a local snapshot of that DAG,
//! diffs it against the working directory, and drives push/pull/merge
//! against the remote while holding the fast-forward line on the remote
//! root.

#![deny(rust_2018_idioms)]

#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

#[cfg(test)]
pub mod test_utils;

mod add;
mod fs;
mod io;
mod pull;
mod push;
mod serialize;

pub mod bindings;
pub mod bucket;
pub mod buckets;
pub mod cid;
pub mod config;
pub mod dag;
pub mod diff;
pub mod error;
pub mod event;
pub mod list;
pub mod options;
pub mod path;
pub mod remote;
pub mod repo;
