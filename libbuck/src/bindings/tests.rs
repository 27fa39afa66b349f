use super::*;
use crate::dag;

fn cid_of(bytes: &[u8]) -> Cid {
    dag::hash_bytes(bytes, CidVersion::V1)
}

fn store_in(dir: &std::path::Path) -> BindingStore {
    BindingStore::load(dir.join("bindings")).unwrap()
}

#[test]
fn test_missing_file_is_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(dir.path());
    assert!(store.is_empty());
    assert_eq!(store.root(), (Cid::UNKNOWN, Cid::UNKNOWN));
}

#[test]
fn test_set_get_and_persist() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.set_local(BuckPath::new("a/b.txt"), cid_of(b"b"), 1, 12, 34);
    store.set_remote(BuckPath::new("a/b.txt"), cid_of(b"remote"));
    store.set_remote(BuckPath::root(), cid_of(b"root"));
    store.save().unwrap();

    let reloaded = store_in(dir.path());
    assert_eq!(reloaded.len(), 2);
    let binding = reloaded.get(&BuckPath::new("a/b.txt")).unwrap();
    assert_eq!(binding.local, cid_of(b"b"));
    assert_eq!(binding.remote, cid_of(b"remote"));
    assert_eq!((binding.size, binding.mtime_secs, binding.mtime_nanos), (1, 12, 34));
    assert_eq!(reloaded.root(), (Cid::UNKNOWN, cid_of(b"root")));
}

#[test]
fn test_remove_prefix_is_recursive() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    for path in ["a/x", "a/b/y", "ab/z", "c"] {
        store.set_local(BuckPath::new(path), cid_of(path.as_bytes()), 0, 0, 0);
    }
    store.remove_prefix(&BuckPath::new("a"));
    assert!(store.get(&BuckPath::new("a/x")).is_none());
    assert!(store.get(&BuckPath::new("a/b/y")).is_none());
    // not under the `a` component
    assert!(store.get(&BuckPath::new("ab/z")).is_some());
    assert!(store.get(&BuckPath::new("c")).is_some());
}

#[test]
fn test_replace_local_keeps_remote_sides() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.set_local(BuckPath::new("keep"), cid_of(b"old"), 0, 0, 0);
    store.set_remote(BuckPath::new("keep"), cid_of(b"keep-remote"));
    store.set_local(BuckPath::new("drop"), cid_of(b"drop"), 0, 0, 0);
    store.set_remote(BuckPath::root(), cid_of(b"remote-root"));

    let next = [(BuckPath::new("keep"), Binding { local: cid_of(b"new"), ..Default::default() })]
        .into_iter()
        .collect();
    store.replace_local(next, cid_of(b"local-root"));

    let keep = store.get(&BuckPath::new("keep")).unwrap();
    assert_eq!(keep.local, cid_of(b"new"));
    assert_eq!(keep.remote, cid_of(b"keep-remote"));
    assert!(store.get(&BuckPath::new("drop")).is_none());
    assert_eq!(store.root(), (cid_of(b"local-root"), cid_of(b"remote-root")));
}

#[test]
fn test_corruption_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    store.set_local(BuckPath::new("a"), cid_of(b"a"), 0, 0, 0);
    store.save().unwrap();

    let path = dir.path().join("bindings");
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();
    assert!(BindingStore::load(path).is_err());
}

#[test]
fn test_iteration_is_path_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(dir.path());
    for path in ["b", "a/z", "a"] {
        store.set_local(BuckPath::new(path), cid_of(path.as_bytes()), 0, 0, 0);
    }
    let paths = store.iter().map(|(path, _)| path.as_str().to_owned()).collect::<Vec<_>>();
    assert_eq!(paths, ["a", "a/z", "b"]);
}
