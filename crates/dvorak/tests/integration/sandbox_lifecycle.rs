use std::time::Duration;

use dvorak::sandbox::{Sandbox, SandboxError, SandboxRuntime};
use dvorak::types::SandboxFile;

use super::{docker_runtime, fixture_source, test_config};

#[tokio::test]
#[ignore = "requires docker"]
async fn test_create_start_destroy() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let mut sandbox = Sandbox::create(runtime.clone(), "dvorak-py:latest")
        .await
        .expect("Failed to create sandbox");

    sandbox.start().await.expect("Failed to start sandbox");
    assert!(sandbox.is_active());

    let id = sandbox.id().clone();
    sandbox.destroy().await;
    assert!(!sandbox.is_active());

    // Removing an already-gone sandbox succeeds
    runtime.remove(&id).await.expect("Second remove failed");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_create_from_missing_image_fails() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let result = Sandbox::create(runtime, "dvorak-no-such-image:never").await;
    assert!(matches!(result, Err(SandboxError::CreateFailed { .. })));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_populate_and_execute_with_stdin() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let mut sandbox = Sandbox::create(runtime, "dvorak-py:latest")
        .await
        .expect("Failed to create sandbox");
    sandbox.start().await.expect("Failed to start sandbox");

    let source = SandboxFile::new("Main.py", fixture_source("echo.py"));
    sandbox
        .populate(&[source], &config.sandbox.work_dir)
        .await
        .expect("Failed to stage source");

    let command = vec!["python3".to_string(), "Main.py".to_string()];
    let output = sandbox
        .execute(
            &command,
            &config.sandbox.work_dir,
            Some(config.sandbox.user.as_str()),
            Some(b"hello\n"),
            Duration::from_secs(5),
            config.sandbox.grace_period(),
        )
        .await
        .expect("Execution failed");

    assert!(output.is_success());
    assert_eq!(output.stdout, "hello\n");
    assert!(!output.timed_out);

    sandbox.destroy().await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_in_sandbox_timeout() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let mut sandbox = Sandbox::create(runtime, "dvorak-py:latest")
        .await
        .expect("Failed to create sandbox");
    sandbox.start().await.expect("Failed to start sandbox");

    let command = vec!["sleep".to_string(), "30".to_string()];
    let output = sandbox
        .execute(
            &command,
            &config.sandbox.work_dir,
            Some(config.sandbox.user.as_str()),
            None,
            Duration::from_secs(1),
            config.sandbox.grace_period(),
        )
        .await
        .expect("Execution failed");

    assert!(output.timed_out);
    sandbox.destroy().await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_network_is_disabled() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let mut sandbox = Sandbox::create(runtime, "dvorak-py:latest")
        .await
        .expect("Failed to create sandbox");
    sandbox.start().await.expect("Failed to start sandbox");

    let source = SandboxFile::new("Main.py", fixture_source("network.py"));
    sandbox
        .populate(&[source], &config.sandbox.work_dir)
        .await
        .expect("Failed to stage source");

    let command = vec!["python3".to_string(), "Main.py".to_string()];
    let output = sandbox
        .execute(
            &command,
            &config.sandbox.work_dir,
            Some(config.sandbox.user.as_str()),
            None,
            Duration::from_secs(5),
            config.sandbox.grace_period(),
        )
        .await
        .expect("Execution failed");

    assert_eq!(output.stdout.trim(), "offline");
    sandbox.destroy().await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_dropped_guard_removes_container() {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let sandbox = Sandbox::create(runtime.clone(), "dvorak-py:latest")
        .await
        .expect("Failed to create sandbox");
    let id = sandbox.id().clone();
    drop(sandbox);

    // Give the scheduled removal time to finish, then check it is gone
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(runtime.start(&id).await.is_err());
}
