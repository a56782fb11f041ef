//! End-to-end verdict scenarios, one per classifier outcome

use arbiter::VerdictStatus;

use super::test_judge;

#[tokio::test]
#[ignore = "requires root"]
async fn python_hello_world_is_accepted() {
    let judge = test_judge();
    let verdict = judge
        .execute_code("python", r#"print("Hello World")"#, "", "Hello World")
        .await;

    assert_eq!(verdict.status, VerdictStatus::Accepted, "{verdict:?}");
    assert!(verdict.is_accepted());
    assert_eq!(verdict.stdout.trim_end(), "Hello World");
    assert_eq!(verdict.exit_code, Some(0));
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_sum_with_input_is_accepted() {
    let judge = test_judge();
    let code = "a,b=map(int,input().split())\nprint(a+b)";
    let verdict = judge.execute_code("python", code, "3 7", "10").await;

    assert_eq!(verdict.status, VerdictStatus::Accepted, "{verdict:?}");
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_short_input_is_runtime_error_or_needs_input() {
    let judge = test_judge();
    let code = "a,b=map(int,input().split())\nprint(a+b)";
    let verdict = judge.execute_code("python", code, "2", "5").await;

    // A bare "2" makes the unpack raise; python reports ValueError (RE),
    // while an empty stdin would raise EOFError (NEEDS_INPUT)
    assert!(
        matches!(
            verdict.status,
            VerdictStatus::RuntimeError | VerdictStatus::NeedsInput
        ),
        "{verdict:?}"
    );
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_infinite_loop_is_tle() {
    let judge = test_judge();
    let verdict = judge
        .execute_code("python", "while True: pass", "", "")
        .await;

    assert_eq!(verdict.status, VerdictStatus::TimeLimitExceeded, "{verdict:?}");
    assert!(
        verdict.time >= 2.0,
        "observed time {} below the CPU limit",
        verdict.time
    );
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_wrong_output_is_wa() {
    let judge = test_judge();
    let verdict = judge.execute_code("python", "print(5)", "", "10").await;

    assert_eq!(verdict.status, VerdictStatus::WrongAnswer, "{verdict:?}");
    assert!(!verdict.is_accepted());
    assert_eq!(verdict.stdout.trim_end(), "5");
}

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_syntax_error_is_ce() {
    let judge = test_judge();
    let verdict = judge
        .execute_code("cpp", "int main(){ retrn 0; }", "", "")
        .await;

    assert_eq!(verdict.status, VerdictStatus::CompileError, "{verdict:?}");
    let diagnostics = verdict.message.expect("CE carries compiler diagnostics");
    assert!(diagnostics.contains("error"), "{diagnostics}");
    // No run phase happened
    assert!(verdict.stdout.is_empty());
}

#[tokio::test]
#[ignore = "requires root"]
async fn cpp_compile_and_run_is_accepted() {
    let judge = test_judge();
    let code = r#"
#include <iostream>
int main() {
    int a, b;
    std::cin >> a >> b;
    std::cout << a + b << std::endl;
    return 0;
}
"#;
    let verdict = judge.execute_code("cpp", code, "3 7", "10").await;
    assert_eq!(verdict.status, VerdictStatus::Accepted, "{verdict:?}");
}

#[tokio::test]
#[ignore = "requires root"]
async fn python_stderr_is_captured_on_re() {
    let judge = test_judge();
    let verdict = judge.execute_code("python", "print(1/0)", "", "").await;

    assert_eq!(verdict.status, VerdictStatus::RuntimeError, "{verdict:?}");
    assert!(verdict.stderr.contains("ZeroDivisionError"), "{verdict:?}");
}

#[tokio::test]
#[ignore = "requires root"]
async fn empty_expected_reports_stdout_verbatim() {
    let judge = test_judge();
    let verdict = judge
        .execute_code("python", "print('observed output')", "", "")
        .await;

    assert_eq!(verdict.status, VerdictStatus::Ok, "{verdict:?}");
    assert_eq!(verdict.stdout.trim_end(), "observed output");
}
