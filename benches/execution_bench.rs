use criterion::{Criterion, criterion_group, criterion_main};
use cts_matrix::config::parse_config;
use cts_matrix::core::aggregator::ResultAggregator;
use cts_matrix::core::execution::{Invoker, ProcessInvoker};
use cts_matrix::core::manifest::ManifestReader;
use cts_matrix::core::planner::expand;
use cts_matrix::models::{
    Backend, CapturedOutput, InvocationResult, Outcome, TestId, WorkItem,
};
use std::hint::black_box;
use std::io::Cursor;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn manifest_text(entries: usize) -> String {
    let mut text = String::from("// generated manifest\n\n");
    for i in 0..entries {
        if i % 50 == 0 {
            text.push_str("// group\n");
        }
        text.push_str(&format!("webgpu:api,operation,case_{i},*\n"));
    }
    text
}

fn bench_parse_and_expand(c: &mut Criterion) {
    let text = manifest_text(10_000);

    c.bench_function("parse_manifest_10k", |b| {
        b.iter(|| {
            let tests: Vec<TestId> = ManifestReader::new("bench.lst", Cursor::new(text.as_bytes()))
                .collect::<Result<_, _>>()
                .unwrap();
            black_box(tests)
        });
    });

    let tests: Vec<TestId> = ManifestReader::new("bench.lst", Cursor::new(text.as_bytes()))
        .collect::<Result<_, _>>()
        .unwrap();
    c.bench_function("expand_5_backends_10k", |b| {
        b.iter(|| black_box(expand(&Backend::ALL, &tests)));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let results: Vec<InvocationResult> = (0..10_000)
        .map(|i| InvocationResult {
            item: WorkItem {
                index: i + 1,
                backend: Backend::Vulkan,
                test: TestId::new(format!("case_{i}")),
            },
            outcome: if i % 7 == 0 { Outcome::Failed } else { Outcome::Passed },
            exit_code: Some(if i % 7 == 0 { 1 } else { 0 }),
            output: CapturedOutput::default(),
            duration: Duration::from_millis(5),
        })
        .collect();

    c.bench_function("aggregate_10k", |b| {
        b.iter(|| {
            let mut aggregator = ResultAggregator::new(results.len());
            for result in results.iter().cloned() {
                aggregator.record(result);
            }
            black_box(aggregator.finish())
        });
    });
}

fn bench_invoke(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let config = parse_config(
        "manifest = \"bench.lst\"\n\n[runner]\ncommand = \"echo bench\"\nverbosity_flag = \"\"\n",
    )
    .unwrap();
    let invoker = ProcessInvoker::from_config(&config).unwrap();
    let item = WorkItem {
        index: 1,
        backend: Backend::Vulkan,
        test: TestId::from("bench_test"),
    };
    let cancel = CancellationToken::new();

    c.bench_function("invoke_echo", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(invoker.invoke(&item, &cancel).await);
        });
    });
}

criterion_group!(benches, bench_parse_and_expand, bench_aggregate, bench_invoke);
criterion_main!(benches);
