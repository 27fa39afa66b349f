use assert_cmd::Command;
use pretty_assertions::assert_eq;
use std::path::Path;

fn buck(dir: &Path, store: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("buck").unwrap();
    cmd.current_dir(dir)
        .env("BUCK_API", format!("file://{}", store.display()))
        .env("BUCK_THREAD", "clitestthread")
        .args(args);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_init_push_status_cat_round_trip() {
    let store = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let out = stdout_of(&mut buck(dir.path(), store.path(), &["init", "--name", "cli-bucket"]));
    assert!(out.contains("Initialized bucket"), "unexpected init output: {}", out);
    assert!(dir.path().join(".buck/config.yml").exists());

    std::fs::write(dir.path().join("hello.txt"), "hi\n").unwrap();
    let out = stdout_of(&mut buck(dir.path(), store.path(), &["status"]));
    assert!(out.contains("new file:"), "unexpected status output: {}", out);

    let out = stdout_of(&mut buck(dir.path(), store.path(), &["push", "--yes"]));
    assert!(out.contains("+ hello.txt"), "unexpected push output: {}", out);

    let out = stdout_of(&mut buck(dir.path(), store.path(), &["status"]));
    assert!(out.contains("Everything up-to-date"), "unexpected status output: {}", out);

    let out = stdout_of(&mut buck(dir.path(), store.path(), &["cat", "hello.txt"]));
    assert_eq!(out, "hi\n");

    let out = stdout_of(&mut buck(dir.path(), store.path(), &["ls"]));
    assert!(out.contains("hello.txt"), "unexpected ls output: {}", out);
}

#[test]
fn test_push_without_changes_is_a_clean_no_op() {
    let store = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    stdout_of(&mut buck(dir.path(), store.path(), &["init", "--name", "idle"]));
    let out = stdout_of(&mut buck(dir.path(), store.path(), &["push", "--yes"]));
    assert!(out.contains("Everything up-to-date"), "unexpected push output: {}", out);
}

#[test]
fn test_commands_outside_a_bucket_fail() {
    let store = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = buck(dir.path(), store.path(), &["status"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a bucket"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_second_copy_pulls_the_first_copys_push() {
    let store = tempfile::tempdir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    stdout_of(&mut buck(a.path(), store.path(), &["init", "--name", "shared"]));
    std::fs::write(a.path().join("shared.txt"), "from a\n").unwrap();
    stdout_of(&mut buck(a.path(), store.path(), &["push", "--yes"]));

    stdout_of(&mut buck(b.path(), store.path(), &["init", "--existing", "--name", "shared"]));
    assert_eq!(std::fs::read(b.path().join("shared.txt")).unwrap(), b"from a\n");
}
