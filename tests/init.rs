use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_kenning"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "kenning init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".kenning.toml");
    assert!(config_path.exists(), ".kenning.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[knowledge]"));
    assert!(content.contains("[history]"));
    assert!(content.contains("[output]"));

    let config = kenning_core::KenningConfig::from_toml(&content).unwrap();
    assert_eq!(config.knowledge.half_life_days, 500.0);
    assert_eq!(config.output.top, 5);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".kenning.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_kenning"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".kenning.toml")).unwrap();
    assert_eq!(content, "# existing");
}
