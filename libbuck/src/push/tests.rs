use super::*;
use crate::config::SEED_NAME;
use crate::error::{BuckErrorExt, BuckResultExt};
use crate::event::{channel, EventReceiver};
use crate::remote::RemoteClient;
use crate::test_utils::{clone_bucket, init_bucket, read_file, write_file, MemRemote};

fn drain(mut rx: EventReceiver) -> Vec<PathEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_push_single_file() {
    let remote = MemRemote::new();
    let test = init_bucket(remote.clone()).await;
    write_file(test.path(), "hello.txt", b"hi\n");

    let roots = test.bucket.push_local_path(PathOptions::new()).await.unwrap();
    assert_eq!(roots.remote, remote.bucket_root(test.bucket.key()));
    // remote root covers exactly the seed and the pushed file
    let item = remote
        .list_path(test.bucket.key(), &BuckPath::root())
        .await
        .unwrap();
    let mut names = item.items.iter().map(|i| i.name.clone()).collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, [SEED_NAME, "hello.txt"]);
    assert!(test.bucket.diff().unwrap().is_empty());
}

#[tokio::test]
async fn test_push_twice_is_up_to_date() {
    let remote = MemRemote::new();
    let test = init_bucket(remote).await;
    write_file(test.path(), "hello.txt", b"hi\n");
    test.bucket.push_local_path(PathOptions::new()).await.unwrap();
    let res = test.bucket.push_local_path(PathOptions::new()).await;
    assert!(res.is_up_to_date());
}

#[tokio::test]
async fn test_push_propagates_removals_after_uploads() {
    let remote = MemRemote::new();
    let test = init_bucket(remote.clone()).await;
    write_file(test.path(), "stays.txt", b"stays");
    write_file(test.path(), "goes.txt", b"goes");
    test.bucket.push_local_path(PathOptions::new()).await.unwrap();

    std::fs::remove_file(test.path().join("goes.txt")).unwrap();
    write_file(test.path(), "stays.txt", b"stays v2");
    test.bucket.push_local_path(PathOptions::new()).await.unwrap();

    let item = remote.list_path(test.bucket.key(), &BuckPath::root()).await.unwrap();
    let names = item.items.iter().map(|i| i.name.clone()).collect::<Vec<_>>();
    assert!(!names.contains(&"goes.txt".to_owned()));
    assert!(test.bucket.diff().unwrap().is_empty());
    // removing an already-removed path on a later push is tolerated
}

#[tokio::test]
async fn test_push_race_loses_with_non_fast_forward() {
    let remote = MemRemote::new();
    let alice = init_bucket(remote.clone()).await;
    let bob = clone_bucket(remote.clone(), alice.bucket.key()).await;

    write_file(alice.path(), "alice.txt", b"a");
    alice.bucket.push_local_path(PathOptions::new()).await.unwrap();

    write_file(bob.path(), "bob.txt", b"b");
    let res = bob.bucket.push_local_path(PathOptions::new()).await;
    assert!(res.is_non_fast_forward());
    let current = res.unwrap_err().try_into_non_fast_forward_err().unwrap();
    assert_eq!(current, remote.bucket_root(bob.bucket.key()));

    // bob's working copy is untouched: his addition is still pending and the
    // remote does not have it
    let diff = bob.bucket.diff().unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].path, BuckPath::new("bob.txt"));
    let item = remote.list_path(bob.bucket.key(), &BuckPath::root()).await.unwrap();
    assert!(!item.items.iter().any(|i| i.name == "bob.txt"));

    // pull-then-push converges with both additions present
    bob.bucket.pull_remote_path(PathOptions::new()).await.unwrap();
    assert_eq!(read_file(bob.path(), "alice.txt"), b"a");
    assert_eq!(read_file(bob.path(), "bob.txt"), b"b");
    bob.bucket.push_local_path(PathOptions::new()).await.unwrap();
    let item = remote.list_path(bob.bucket.key(), &BuckPath::root()).await.unwrap();
    assert!(item.items.iter().any(|i| i.name == "bob.txt"));
    assert!(item.items.iter().any(|i| i.name == "alice.txt"));
}

#[tokio::test]
async fn test_force_push_skips_the_fast_forward_guard() {
    let remote = MemRemote::new();
    let alice = init_bucket(remote.clone()).await;
    let bob = clone_bucket(remote.clone(), alice.bucket.key()).await;

    write_file(alice.path(), "alice.txt", b"a");
    alice.bucket.push_local_path(PathOptions::new()).await.unwrap();

    write_file(bob.path(), "bob.txt", b"b");
    bob.bucket.push_local_path(PathOptions::new().with_force(true)).await.unwrap();
    let item = remote.list_path(bob.bucket.key(), &BuckPath::root()).await.unwrap();
    assert!(item.items.iter().any(|i| i.name == "bob.txt"));
}

#[tokio::test]
async fn test_push_confirm_denial_aborts() {
    let remote = MemRemote::new();
    let test = init_bucket(remote.clone()).await;
    write_file(test.path(), "hello.txt", b"hi\n");
    let root_before = remote.bucket_root(test.bucket.key());

    let res = test
        .bucket
        .push_local_path(PathOptions::new().with_confirm(|_| false))
        .await;
    assert!(res.is_aborted());
    assert_eq!(remote.bucket_root(test.bucket.key()), root_before);
}

#[tokio::test]
async fn test_confirm_sees_the_full_change_set() {
    let remote = MemRemote::new();
    let test = init_bucket(remote).await;
    write_file(test.path(), "a.txt", b"a");
    write_file(test.path(), "sub/b.txt", b"b");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let res = test
        .bucket
        .push_local_path(PathOptions::new().with_confirm(move |changes| {
            let _ = tx.send(changes.len());
            false
        }))
        .await;
    assert!(res.is_aborted());
    assert_eq!(rx.try_recv().unwrap(), 2);
}

#[tokio::test]
async fn test_push_event_ordering_removals_trail_the_path() {
    let remote = MemRemote::new();
    let test = init_bucket(remote).await;
    write_file(test.path(), "up.txt", b"up");
    write_file(test.path(), "down.txt", b"down");
    test.bucket.push_local_path(PathOptions::new()).await.unwrap();

    std::fs::remove_file(test.path().join("down.txt")).unwrap();
    write_file(test.path(), "up.txt", b"up v2");
    let (tx, rx) = channel();
    test.bucket.push_local_path(PathOptions::new().with_events(tx)).await.unwrap();
    let events = drain(rx);

    let kinds = events.iter().map(|event| event.kind).collect::<Vec<_>>();
    let complete_at =
        kinds.iter().position(|&k| k == PathEventKind::PathComplete).unwrap();
    // uploads happen inside the path markers, removals after
    assert_eq!(kinds[0], PathEventKind::PathStart);
    for event in &events[1..complete_at] {
        assert!(matches!(
            event.kind,
            PathEventKind::FileStart | PathEventKind::FileProgress | PathEventKind::FileComplete
        ));
        assert_eq!(event.path, BuckPath::new("up.txt"));
        assert!(event.progress <= event.size);
    }
    assert!(events[complete_at + 1..]
        .iter()
        .all(|event| event.kind == PathEventKind::FileRemoved));
    assert_eq!(events.last().unwrap().path, BuckPath::new("down.txt"));
}

#[tokio::test]
async fn test_force_push_reuploads_every_file() {
    let remote = MemRemote::new();
    let test = init_bucket(remote.clone()).await;
    write_file(test.path(), "a.txt", b"a");
    test.bucket.push_local_path(PathOptions::new()).await.unwrap();
    let root = remote.bucket_root(test.bucket.key());

    // nothing changed, but force still pushes (and the root stays put since
    // the bytes are identical)
    let roots = test.bucket.push_local_path(PathOptions::new().with_force(true)).await.unwrap();
    assert_eq!(roots.remote, root);
}
