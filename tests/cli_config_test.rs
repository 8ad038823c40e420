use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn patternkit(dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_patternkit"));
    command.current_dir(dir).env_remove("PK_PATTERNS__DIR");
    command
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = patternkit(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    // Check that config file was created
    let config_path = temp_dir.path().join(".patternkit/settings.toml");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[hot_reload]"));

    // A second init without --force refuses to overwrite
    let output = patternkit(temp_dir.path()).arg("init").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".patternkit");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        "version = 2\n[hot_reload]\ndebounce_ms = 750\n",
    )
    .unwrap();

    let output = patternkit(temp_dir.path())
        .arg("config")
        .output()
        .expect("Failed to run config command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("debounce_ms = 750"));
}

#[test]
fn test_check_and_search_commands() {
    let temp_dir = TempDir::new().unwrap();
    let patterns = temp_dir.path().join("patterns");
    fs::create_dir_all(&patterns).unwrap();
    fs::write(
        patterns.join("funnel.yaml"),
        "name: funnel\ncategory: analytics\ndescription: Conversion funnel analysis\n",
    )
    .unwrap();

    let output = patternkit(temp_dir.path())
        .args(["--dir", "patterns", "search", "funnel", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results[0]["name"], "funnel");

    let output = patternkit(temp_dir.path())
        .args(["--dir", "patterns", "check"])
        .output()
        .unwrap();
    assert!(output.status.success());

    fs::write(patterns.join("broken.yaml"), "description: no name\n").unwrap();
    let output = patternkit(temp_dir.path())
        .args(["--dir", "patterns", "check"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("FAIL  broken.yaml [missing_name]"));
}

#[test]
fn test_status_command_reports_static_view() {
    let temp_dir = TempDir::new().unwrap();
    let patterns = temp_dir.path().join("patterns");
    fs::create_dir_all(&patterns).unwrap();
    fs::write(
        patterns.join("funnel.yaml"),
        "name: funnel\ncategory: analytics\n",
    )
    .unwrap();

    let output = patternkit(temp_dir.path())
        .args(["--dir", "patterns", "status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["patterns"], 1);
    assert!(status["debounce_ms"].as_u64().is_some());
    // Nothing is watched by this command
    assert!(status.get("active").is_none());
    assert!(status.get("watched_directories").is_none());
}
