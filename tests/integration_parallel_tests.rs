//! # Parallel Backends Integration Tests / 并行后端集成测试
//!
//! With `--parallel-backends`, backends run side by side while the tests of
//! one backend still run strictly one after another.
//!
//! 启用 `--parallel-backends` 时，后端并行运行，而同一后端的测试仍然严格依次运行。

#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use common::Fixture;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::fs;

/// Writes a runner that logs `start`/`end` around a short sleep.
fn write_slow_runner(fx: &Fixture) -> String {
    let script = fx.path().join("slow_runner.sh");
    let body = format!(
        r#"echo "start $WGPU_BACKEND $2" >> "{log}"
sleep 0.2
echo "end $WGPU_BACKEND $2" >> "{log}"
case "$2" in
  *fail*) exit 1 ;;
esac
"#,
        log = fx.log_path().display()
    );
    fs::write(&script, body).unwrap();
    format!("sh {}", script.display())
}

/// Groups the log by backend, keeping order.
fn per_backend(lines: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut lanes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in lines {
        let mut parts = line.splitn(3, ' ');
        let (Some(event), Some(backend), Some(test)) = (parts.next(), parts.next(), parts.next())
        else {
            panic!("malformed log line: {line}");
        };
        lanes
            .entry(backend.to_string())
            .or_default()
            .push(format!("{event} {test}"));
    }
    lanes
}

#[test]
fn test_lanes_keep_order_and_never_overlap() {
    let fx = Fixture::new();
    let runner = write_slow_runner(&fx);
    fx.write_manifest("test.lst", "t1\nt2\nt3.fail\n");
    fx.write_config(
        "manifest = \"test.lst\"\nbackends = [\"dx12\", \"vulkan\", \"gl\"]",
        &runner,
    );

    fx.run_cmd()
        .arg("--parallel-backends")
        .arg("--jobs")
        .arg("3")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Passed: 6"))
        .stdout(predicate::str::contains("Failed: 3"))
        .stdout(predicate::str::contains("(9/9)"));

    let lanes = per_backend(&fx.invocations());
    assert_eq!(lanes.len(), 3);
    for (backend, events) in lanes {
        assert_eq!(
            events,
            vec![
                "start t1", "end t1", "start t2", "end t2", "start t3.fail", "end t3.fail"
            ],
            "lane {backend} overlapped or reordered"
        );
    }
}

#[test]
fn test_parallel_flag_in_config() {
    let fx = Fixture::new();
    let runner = write_slow_runner(&fx);
    fx.write_manifest("test.lst", "only\n");
    fx.write_config(
        "manifest = \"test.lst\"\nbackends = [\"dx12\", \"vulkan\"]\nparallel_backends = true\njobs = 2",
        &runner,
    );

    fx.run_cmd()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Passed: 2"));

    assert_eq!(fx.invocations().len(), 4);
}

#[test]
fn test_zero_jobs_in_config_is_rejected() {
    let fx = Fixture::new();
    let runner = write_slow_runner(&fx);
    fx.write_manifest("test.lst", "only\n");
    fx.write_config(
        "manifest = \"test.lst\"\nbackends = [\"dx12\"]\nparallel_backends = true\njobs = 0",
        &runner,
    );

    fx.run_cmd()
        .assert()
        .code(4)
        .stderr(predicate::str::contains("jobs must be greater than zero"));
}
