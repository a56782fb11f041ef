//! Box lifecycle across real executions: every path gives its box back

use arbiter::{BoxPool, Judge, VerdictStatus};

use super::{test_config, test_judge};

#[tokio::test]
#[ignore = "requires root"]
async fn boxes_are_released_after_each_verdict_kind() {
    let judge = test_judge();
    let total = judge.pool().stats().total;

    let runs: [(&str, &str, &str, &str); 4] = [
        ("python", "print('ok')", "", "ok"),     // AC
        ("python", "print(5)", "", "10"),        // WA
        ("python", "print(1/0)", "", ""),        // RE
        ("cpp", "int main(){ retrn 0; }", "", ""), // CE
    ];
    for (language, code, input, expected) in runs {
        let _ = judge.execute_code(language, code, input, expected).await;
        let stats = judge.pool().stats();
        assert_eq!(stats.in_use, 0, "box leaked after {language} run");
        assert_eq!(stats.free, total);
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn tiny_pool_serializes_concurrent_tests() {
    // Pool of two boxes, six concurrent tests: back-pressure, not failure
    let config = test_config();
    let judge = Judge::with_pool(config, BoxPool::new(910, 911));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..6 {
        let judge = judge.clone();
        tasks.spawn(async move {
            judge
                .execute_code("python", &format!("print({i})"), "", &i.to_string())
                .await
        });
    }

    while let Some(result) = tasks.join_next().await {
        let verdict = result.unwrap();
        assert_eq!(verdict.status, VerdictStatus::Accepted, "{verdict:?}");
    }

    let stats = judge.pool().stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.free, 2);
}

#[tokio::test]
#[ignore = "requires root"]
async fn run_counts_accumulate_across_tests() {
    let judge = test_judge();
    let _ = judge.execute_code("python", "print('a')", "", "a").await;
    let _ = judge.execute_code("python", "print('b')", "", "zzz").await;

    let counts = judge.run_counts();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.passed, 1);
    assert_eq!(counts.failed, 1);
}
