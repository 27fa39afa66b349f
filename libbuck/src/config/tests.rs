use super::*;
use crate::error::BuckErrorExt;

#[test]
fn test_thread_id_validation() {
    assert!("bafkqtestthread2".parse::<ThreadId>().is_ok());
    for bad in ["", "Upper", "with space", "dash-ed", "digit19"] {
        let err = bad.parse::<ThreadId>().unwrap_err();
        assert!(matches!(
            err.try_into_buck_error().unwrap(),
            BuckError::InvalidThread(..)
        ));
    }
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuckConfig::new(ConfigSpec::default());
    config.key = Some("bucketkey".to_owned());
    config.thread = Some("threadid".parse().unwrap());
    config.org = Some("my-org".to_owned());
    config.save(dir.path()).unwrap();

    let loaded = BuckConfig::load(ConfigSpec::default(), dir.path()).unwrap();
    assert_eq!(loaded.key.as_deref(), Some("bucketkey"));
    assert_eq!(loaded.thread, config.thread);
    assert_eq!(loaded.org.as_deref(), Some("my-org"));
    assert_eq!(loaded.root.as_deref(), Some(dir.path()));
}

#[test]
fn test_discovery_walks_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuckConfig::new(ConfigSpec::default());
    config.key = Some("k".to_owned());
    config.save(dir.path()).unwrap();

    let nested = dir.path().join("a/b/c");
    std::fs::create_dir_all(&nested).unwrap();
    let loaded = BuckConfig::load(ConfigSpec::default(), &nested).unwrap();
    assert_eq!(loaded.root.as_deref(), Some(dir.path()));

    let elsewhere = tempfile::tempdir().unwrap();
    let loaded = BuckConfig::load(ConfigSpec::default(), elsewhere.path()).unwrap();
    assert!(loaded.root.is_none());
}

#[test]
fn test_env_overrides_file_values() {
    // a dedicated prefix keeps this test from racing others over the
    // process environment
    let spec = ConfigSpec { env_prefix: "BUCKENVTEST".to_owned(), ..ConfigSpec::default() };
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuckConfig::new(spec.clone());
    config.key = Some("filekey".to_owned());
    config.thread = Some("filethread".parse().unwrap());
    config.save(dir.path()).unwrap();

    std::env::set_var("BUCKENVTEST_KEY", "envkey");
    std::env::set_var("BUCKENVTEST_THREAD", "envthread");
    let loaded = BuckConfig::load(spec.clone(), dir.path());
    std::env::remove_var("BUCKENVTEST_KEY");
    std::env::remove_var("BUCKENVTEST_THREAD");

    let loaded = loaded.unwrap();
    assert_eq!(loaded.key.as_deref(), Some("envkey"));
    assert_eq!(loaded.thread, Some("envthread".parse().unwrap()));
}

#[test]
fn test_validate_requires_a_thread_with_a_key() {
    let mut config = BuckConfig::new(ConfigSpec::default());
    config.key = Some("k".to_owned());
    let err = config.validate().unwrap_err();
    assert_eq!(err.try_into_buck_error().unwrap(), BuckError::ThreadRequired);

    config.thread = Some("t".parse().unwrap());
    config.validate().unwrap();

    // a bare thread (or nothing at all) is fine
    config.key = None;
    config.validate().unwrap();
}

#[test]
fn test_empty_env_values_are_ignored() {
    let spec = ConfigSpec { env_prefix: "BUCKEMPTYTEST".to_owned(), ..ConfigSpec::default() };
    let dir = tempfile::tempdir().unwrap();
    let mut config = BuckConfig::new(spec.clone());
    config.key = Some("filekey".to_owned());
    config.thread = Some("filethread".parse().unwrap());
    config.save(dir.path()).unwrap();

    std::env::set_var("BUCKEMPTYTEST_KEY", "");
    let loaded = BuckConfig::load(spec, dir.path());
    std::env::remove_var("BUCKEMPTYTEST_KEY");
    assert_eq!(loaded.unwrap().key.as_deref(), Some("filekey"));
}
