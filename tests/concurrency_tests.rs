//! # Concurrency Tests using Loom
//!
//! Models the parallel-lane handoff: each backend lane pushes its results, in
//! order, onto a shared queue while a single consumer drains the queue into
//! a `ResultAggregator`. The real run loop uses a tokio channel, which loom
//! cannot drive, so the queue here is a loom mutex with the same
//! many-producers/one-consumer shape.

#[cfg(test)]
mod tests {
    use cts_matrix::core::aggregator::ResultAggregator;
    use cts_matrix::models::{
        Backend, CapturedOutput, InvocationResult, Outcome, TestId, WorkItem,
    };
    use loom::sync::{Arc, Mutex};
    use loom::thread;
    use std::collections::VecDeque;
    use std::time::Duration;

    const ITEMS_PER_LANE: usize = 2;

    fn result(index: usize, backend: Backend, outcome: Outcome) -> InvocationResult {
        InvocationResult {
            item: WorkItem {
                index,
                backend,
                test: TestId::new(format!("t{index}")),
            },
            outcome,
            exit_code: Some(if outcome.is_passed() { 0 } else { 1 }),
            output: CapturedOutput::default(),
            duration: Duration::ZERO,
        }
    }

    /// Two lanes feed one aggregator while it is draining. In every
    /// interleaving the aggregator records each result exactly once, its
    /// counts add up, and each lane's results keep their lane order.
    #[test]
    fn test_aggregator_consumes_lane_results_in_lane_order() {
        const STACK_SIZE: usize = 8 * 1024 * 1024; // 8 MB

        let builder = std::thread::Builder::new()
            .name("loom-test-thread".into())
            .stack_size(STACK_SIZE);

        let handle = builder
            .spawn(|| {
                let mut model = loom::model::Builder::new();
                model.preemption_bound = Some(3);
                model.check(|| {
                    let queue = Arc::new(Mutex::new(VecDeque::<InvocationResult>::new()));
                    let lanes = [(Backend::Dx12, 0), (Backend::Vulkan, ITEMS_PER_LANE)];

                    let producers: Vec<_> = lanes
                        .into_iter()
                        .map(|(backend, offset)| {
                            let queue = queue.clone();
                            thread::spawn(move || {
                                for i in 1..=ITEMS_PER_LANE {
                                    let outcome = if backend == Backend::Vulkan && i == 1 {
                                        Outcome::Failed
                                    } else {
                                        Outcome::Passed
                                    };
                                    queue
                                        .lock()
                                        .unwrap()
                                        .push_back(result(offset + i, backend, outcome));
                                }
                            })
                        })
                        .collect();

                    let planned = lanes.len() * ITEMS_PER_LANE;
                    let mut aggregator = ResultAggregator::new(planned);
                    while aggregator.counts().total() < planned {
                        let next = queue.lock().unwrap().pop_front();
                        match next {
                            Some(result) => aggregator.record(result),
                            None => thread::yield_now(),
                        }
                    }

                    for producer in producers {
                        producer.join().unwrap();
                    }

                    let summary = aggregator.finish();
                    assert_eq!(summary.passed(), 3);
                    assert_eq!(summary.failed(), 1);
                    assert_eq!(summary.processed(), planned);
                    assert_eq!(summary.failures.len(), 1);
                    assert_eq!(summary.failures[0].backend, Backend::Vulkan);

                    for backend in [Backend::Dx12, Backend::Vulkan] {
                        let order: Vec<usize> = summary
                            .records
                            .iter()
                            .filter(|r| r.backend == backend)
                            .map(|r| r.index)
                            .collect();
                        assert_eq!(order.len(), ITEMS_PER_LANE);
                        assert!(order.windows(2).all(|w| w[0] < w[1]), "{backend} reordered");
                    }
                });
            })
            .unwrap();

        handle.join().unwrap();
    }
}
