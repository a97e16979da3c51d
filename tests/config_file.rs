//! Loading configuration files from disk.
use payuppal::config::Config;

#[test]
fn load_partial_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        "[game]\nstart_money = 3000\n\n[storage]\ndata_dir = \"/var/lib/payuppal\"\n",
    )
    .unwrap();

    let config = tokio_test::block_on(Config::load(path.to_str().unwrap())).unwrap();
    assert_eq!(config.game.start_money, 3000);
    assert_eq!(config.game.jail_turns, 3);
    assert_eq!(
        config.storage.sessions_dir(),
        std::path::PathBuf::from("/var/lib/payuppal/sessions")
    );
    assert_eq!(config.logging.level, "info");
}

#[test]
fn invalid_rules_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[game]\nmin_players = 4\nmax_players = 3\n").unwrap();
    assert!(tokio_test::block_on(Config::load(path.to_str().unwrap())).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nope.toml");
    assert!(tokio_test::block_on(Config::load(path.to_str().unwrap())).is_err());
}
