use std::path::PathBuf;

use dvorak::config::Config;

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key("c"));
    // Embedded languages are still available
    assert!(config.languages.contains_key("python"));
    assert!(config.languages.contains_key("cpp"));

    assert_eq!(config.problems_dir, PathBuf::from("/srv/dvorak/problems"));
    assert_eq!(config.docker_binary(), PathBuf::from("/usr/bin/docker"));
    assert_eq!(config.sandbox.grace_period, 3);
    assert_eq!(config.sandbox.limits.cpus, 0.5);
    assert_eq!(config.sandbox.limits.memory_limit, 256);
    assert_eq!(config.sandbox.limits.max_processes, 64);
    assert_eq!(config.judge.compile_timeout, 30);
    assert_eq!(config.judge.diagnostics.compile_tail, 500);
    assert_eq!(config.judge.diagnostics.runtime_tail, 1000);
    assert_eq!(config.queue.redis_url, "redis://redis:6379/2");
    assert_eq!(config.queue.result_ttl, 300);

    let c = config.get_language("c").unwrap();
    assert_eq!(
        c.compile_command().unwrap(),
        vec!["gcc", "-std=c11", "-O2", "-o", "main", "main.c"]
    );
    assert_eq!(c.run_command(), vec!["./main"]);
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    let test = config.get_language("test").unwrap();
    assert!(!test.is_compiled());
    assert_eq!(test.run_command(), vec!["./test", "main.test"]);
}

#[test]
fn test_load_invalid_empty_name() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_name.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_empty_image() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_image.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_run_command.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let path = format!("{FIXTURES_PATH}/configs/does_not_exist.toml");
    assert!(Config::from_file(&path).is_err());
}
