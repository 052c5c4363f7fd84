use super::{load_settings_from, prepare_audio_dir, Settings};

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_root(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("shopper_{label}_{suffix}"))
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let settings = load_settings_from(Path::new("/definitely/not/here.toml"), no_env);
    assert_eq!(settings, Settings::default());
}

#[test]
fn file_values_override_defaults() {
    let root = temp_root("file");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join("shopper.toml");
    fs::write(
        &path,
        "server_url = \"http://shop.local:9000\"\naudio_dir = \"/tmp/voice\"\nplayer_command = \"mpv --really-quiet\"\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path, no_env);

    assert_eq!(settings.server_url, "http://shop.local:9000");
    assert_eq!(settings.audio_dir, PathBuf::from("/tmp/voice"));
    assert_eq!(settings.player_command.as_deref(), Some("mpv --really-quiet"));
    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn app_prefixed_env_wins_over_legacy_name_and_file() {
    let root = temp_root("env");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join("shopper.toml");
    fs::write(&path, "server_url = \"http://from-file\"\n").expect("write settings");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SHOPPER_SERVER_URL", "http://legacy"),
        ("APP__SERVER_URL", "http://app"),
        ("APP__PLAYER_COMMAND", "  "),
    ]);

    let settings = load_settings_from(&path, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.server_url, "http://app");
    assert_eq!(settings.player_command, None);
    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn malformed_file_is_ignored() {
    let root = temp_root("bad");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join("shopper.toml");
    fs::write(&path, "server_url = [1, 2").expect("write settings");

    assert_eq!(load_settings_from(&path, no_env), Settings::default());
    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn prepares_nested_audio_dir() {
    let root = temp_root("audio");
    let dir = root.join("data").join("audio");

    prepare_audio_dir(&dir).expect("prepare audio dir");
    assert!(dir.is_dir());

    fs::remove_dir_all(root).expect("cleanup");
}
