use std::sync::Arc;

use dvorak::verdict::Verdict;

use super::mock::{ScriptedRuntime, Step, argv, stdin};
use super::{echo, judge_with, prints, submission};

#[tokio::test]
async fn test_python_echo_is_accepted() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("echo", "python", "print(input())"))
        .await;

    assert_eq!(verdict, Verdict::Accepted);
    assert_eq!(runtime.created().len(), 1);
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_source_staged_under_canonical_name() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    judge
        .judge(&submission("echo", "python", "print(input())"))
        .await;

    let staged = runtime.staged();
    assert_eq!(staged.len(), 1);
    let (file, dest) = &staged[0];
    assert_eq!(file.name, "Main.py");
    assert_eq!(file.contents, b"print(input())");
    assert_eq!(dest, "/work");
}

#[tokio::test]
async fn test_run_command_shape() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    judge
        .judge(&submission("echo", "python", "print(input())"))
        .await;

    let runs = runtime.runs();
    assert_eq!(runs.len(), 1);
    // 2000 ms default time limit, floored to whole seconds
    assert_eq!(
        runs[0].command,
        vec!["timeout", "-k", "1s", "2s", "python3", "Main.py"]
    );
    assert_eq!(runs[0].working_dir, "/work");
    assert_eq!(runs[0].user.as_deref(), Some("runner"));
    // Input is piped byte for byte
    assert_eq!(runs[0].stdin.as_deref(), Some(&b"5\n"[..]));
}

#[tokio::test]
async fn test_cpp_compiles_then_runs() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("echo", "cpp", "int main() {}"))
        .await;
    assert_eq!(verdict, Verdict::Accepted);

    let execs = runtime.execs();
    assert_eq!(execs.len(), 2);
    assert_eq!(
        execs[0].command,
        vec![
            "timeout",
            "-k",
            "1s",
            "20s",
            "g++",
            "-std=c++17",
            "-O2",
            "-s",
            "-o",
            "main",
            "Main.cpp"
        ]
    );
    assert!(execs[0].stdin.is_none());
    assert_eq!(argv(&execs[1]), ["./main"]);
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_compile_error() {
    let runtime = Arc::new(ScriptedRuntime::new(|request| {
        if argv(request)[0] == "g++" {
            Step::exit(1, "Main.cpp:1:13: error: expected ';' before '}' token")
        } else {
            Step::ok("")
        }
    }));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("echo", "cpp", "int main() { return 0 }"))
        .await;

    match verdict {
        Verdict::CompileError { msg } => {
            assert!(!msg.is_empty());
            assert!(msg.contains("expected ';'"));
        }
        other => panic!("expected CE, got {other:?}"),
    }
    // No test case runs after a compile error
    assert!(runtime.runs().is_empty());
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_silent_compile_failure_still_has_diagnostic() {
    let runtime = Arc::new(ScriptedRuntime::new(|_| Step::exit(1, "")));
    let judge = judge_with(&runtime);

    match judge.judge(&submission("echo", "cpp", "")).await {
        Verdict::CompileError { msg } => assert!(!msg.is_empty()),
        other => panic!("expected CE, got {other:?}"),
    }
}

#[tokio::test]
async fn test_compile_diagnostic_keeps_tail() {
    let long = format!("{}\nfinal error line", "warning: noise\n".repeat(500));
    let runtime = Arc::new(ScriptedRuntime::new(move |_| Step::exit(1, long.clone())));
    let judge = judge_with(&runtime);

    match judge.judge(&submission("echo", "cpp", "")).await {
        Verdict::CompileError { msg } => {
            assert_eq!(msg.chars().count(), 1500);
            assert!(msg.ends_with("final error line"));
        }
        other => panic!("expected CE, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_answer() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("4\n")));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("echo", "python", "print(4)"))
        .await;

    assert_eq!(
        verdict,
        Verdict::WrongAnswer {
            case: 1,
            got: "4\n".to_string(),
            exp: "5\n".to_string(),
        }
    );
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_wrong_answer_previews_are_bounded() {
    let runtime = Arc::new(ScriptedRuntime::new(|_| Step::ok("y".repeat(5000))));
    let judge = judge_with(&runtime);

    match judge.judge(&submission("echo", "python", "")).await {
        Verdict::WrongAnswer { got, exp, .. } => {
            assert_eq!(got.chars().count(), 200);
            assert_eq!(exp, "5\n");
        }
        other => panic!("expected WA, got {other:?}"),
    }
}

#[tokio::test]
async fn test_runtime_error_stops_at_failing_case() {
    let runtime = Arc::new(ScriptedRuntime::new(|request| {
        let input = stdin(request);
        if input == "2\n" {
            Step::exit(1, "Traceback (most recent call last):\nValueError")
        } else {
            Step::ok(input)
        }
    }));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("three-cases", "python", "..."))
        .await;

    match verdict {
        Verdict::RuntimeError {
            case,
            msg,
            timed_out,
        } => {
            assert_eq!(case, Some(2));
            assert!(msg.contains("ValueError"));
            assert!(!timed_out);
        }
        other => panic!("expected RE, got {other:?}"),
    }

    // Case 3 never runs
    let inputs: Vec<String> = runtime.runs().iter().map(stdin).collect();
    assert_eq!(inputs, vec!["1\n", "2\n"]);
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_wrong_answer_stops_at_failing_case() {
    let runtime = Arc::new(ScriptedRuntime::new(|request| {
        let input = stdin(request);
        if input == "1\n" { Step::ok("1\n") } else { Step::ok("0\n") }
    }));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("three-cases", "python", "..."))
        .await;

    assert_eq!(verdict.code(), "WA");
    assert_eq!(verdict.case(), Some(2));
    assert_eq!(runtime.runs().len(), 2);
}

#[tokio::test]
async fn test_cases_run_in_declared_order() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("three-cases", "python", "..."))
        .await;

    assert_eq!(verdict, Verdict::Accepted);
    let inputs: Vec<String> = runtime.runs().iter().map(stdin).collect();
    assert_eq!(inputs, vec!["1\n", "2\n", "3\n"]);
}

#[tokio::test]
async fn test_unsupported_language() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("echo", "java", "class Main {}"))
        .await;

    assert_eq!(verdict, Verdict::unsupported_language("java"));
    assert!(runtime.created().is_empty());
    assert!(runtime.execs().is_empty());
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let runtime = Arc::new(ScriptedRuntime::new(|_| Step::timed_out()));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("loop", "python", "while True: pass"))
        .await;

    assert_eq!(
        verdict,
        Verdict::RuntimeError {
            case: Some(1),
            msg: "time limit exceeded".to_string(),
            timed_out: true,
        }
    );
    // 1500 ms floors to one second
    assert_eq!(runtime.runs()[0].command[3], "1s");
    runtime.assert_destroyed_once();
}

#[tokio::test(start_paused = true)]
async fn test_hung_sandbox_hits_outer_deadline() {
    let runtime = Arc::new(ScriptedRuntime::new(|_| Step::Hang));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("loop", "python", "while True: pass"))
        .await;

    match verdict {
        Verdict::RuntimeError {
            case, timed_out, ..
        } => {
            assert_eq!(case, Some(1));
            assert!(timed_out);
        }
        other => panic!("expected RE, got {other:?}"),
    }
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_empty_test_list_is_accepted() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("anything")));
    let judge = judge_with(&runtime);

    let verdict = judge.judge(&submission("empty", "python", "")).await;

    assert_eq!(verdict, Verdict::Accepted);
    assert!(runtime.runs().is_empty());
    runtime.assert_destroyed_once();
}

#[tokio::test]
async fn test_strict_rejects_trailing_whitespace() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("5\n ")));
    let judge = judge_with(&runtime);

    let verdict = judge.judge(&submission("echo", "python", "")).await;
    assert_eq!(verdict.code(), "WA");
}

#[tokio::test]
async fn test_lenient_ignores_surrounding_whitespace() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("  5\n\n")));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("lenient-echo", "python", ""))
        .await;
    assert_eq!(verdict, Verdict::Accepted);
}

#[tokio::test]
async fn test_lenient_still_rejects_inner_differences() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("5 6\n")));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("lenient-echo", "python", ""))
        .await;
    assert_eq!(verdict.code(), "WA");
}

#[tokio::test]
async fn test_strict_empty_expected_output() {
    let runtime = Arc::new(ScriptedRuntime::new(prints("")));
    let judge = judge_with(&runtime);
    assert_eq!(
        judge.judge(&submission("silent", "python", "")).await,
        Verdict::Accepted
    );

    let runtime = Arc::new(ScriptedRuntime::new(prints("\n")));
    let judge = judge_with(&runtime);
    assert_eq!(
        judge.judge(&submission("silent", "python", "")).await.code(),
        "WA"
    );
}

#[tokio::test]
async fn test_missing_problem_creates_no_sandbox() {
    let runtime = Arc::new(ScriptedRuntime::new(echo));
    let judge = judge_with(&runtime);

    let verdict = judge
        .judge(&submission("does-not-exist", "python", ""))
        .await;

    assert_eq!(verdict.code(), "RE");
    assert_eq!(verdict.case(), None);
    assert!(runtime.created().is_empty());
}
