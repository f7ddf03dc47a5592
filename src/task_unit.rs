//! The task unit: take an id, wait, then sum and report a payload.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::TaskError;
use crate::ids::IdSource;
use crate::mini_rt;
use crate::payload::PayloadSource;
use crate::report::{Report, Sink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// `thread::sleep` on the scheduler thread; starves every other task.
    Blocking,
    /// `mini_rt::sleep`; other tasks run while this one waits.
    Yielding,
}

/// Collaborators shared by every task unit of a run.
///
/// Only touched between suspension points, so plain `RefCell`s are enough.
pub struct Bench {
    ids: RefCell<IdSource>,
    payloads: RefCell<Box<dyn PayloadSource>>,
    sink: Rc<dyn Sink>,
    tick: Duration,
}

impl Bench {
    pub fn new(
        ids: IdSource,
        payloads: Box<dyn PayloadSource>,
        sink: Rc<dyn Sink>,
        tick: Duration,
    ) -> Self {
        Self {
            ids: RefCell::new(ids),
            payloads: RefCell::new(payloads),
            sink,
            tick,
        }
    }

    pub fn ticks(&self, n: u32) -> Duration {
        self.tick * n
    }

    pub fn emit(&self, line: &str) {
        self.sink.emit(line);
    }

    pub fn issued(&self) -> u32 {
        self.ids.borrow().issued()
    }
}

pub async fn run(bench: Rc<Bench>, wait: Duration, mode: WaitMode) -> Result<Report, TaskError> {
    // The id is taken before waiting so it reflects scheduling order.
    let id = bench.ids.borrow_mut().next_id()?;
    debug!("unit #{id}: {mode:?} wait of {wait:?}");

    match mode {
        WaitMode::Blocking => thread::sleep(wait),
        WaitMode::Yielding => mini_rt::sleep(wait).await,
    }

    let payload = bench.payloads.borrow_mut().payload()?;
    let sum = payload.iter().sum();
    let report = Report { id, payload, sum };
    bench.emit(&report.to_string());
    Ok(report)
}

pub async fn yielding_add(bench: Rc<Bench>, ticks: u32) -> Result<Report, TaskError> {
    let wait = bench.ticks(ticks);
    run(bench, wait, WaitMode::Yielding).await
}

pub async fn blocking_add(bench: Rc<Bench>, ticks: u32) -> Result<Report, TaskError> {
    let wait = bench.ticks(ticks);
    run(bench, wait, WaitMode::Blocking).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PayloadError;
    use crate::mini_rt::{spawn, Runtime};
    use crate::payload::FixedPayload;
    use crate::report::MemorySink;

    fn bench(bound: u32, payloads: Vec<Vec<u32>>) -> (Rc<Bench>, Rc<MemorySink>) {
        let sink = Rc::new(MemorySink::default());
        let bench = Bench::new(
            IdSource::new(bound),
            Box::new(FixedPayload::new(payloads)),
            sink.clone(),
            Duration::from_millis(1),
        );
        (Rc::new(bench), sink)
    }

    #[test]
    fn sum_matches_payload_and_is_reported() {
        let (bench, sink) = bench(10, vec![vec![3, 4]]);
        let mut rt = Runtime::new();

        let report = rt
            .block_on(yielding_add(bench, 2))
            .expect("runtime stalled")
            .expect("unit failed");

        assert_eq!(report.sum, report.payload.iter().sum::<u32>());
        assert_eq!(report.sum, 7);
        assert_eq!(sink.lines(), vec!["#1: sum([3, 4]) = 7".to_string()]);
    }

    #[test]
    fn exhausted_ids_fail_without_report() {
        let (bench, sink) = bench(2, vec![vec![1, 1]]);
        let mut rt = Runtime::new();

        let first = rt.block_on(blocking_add(bench.clone(), 0)).expect("runtime stalled");
        assert!(first.is_ok());
        let second = rt.block_on(blocking_add(bench, 0)).expect("runtime stalled");
        assert_eq!(
            second,
            Err(TaskError::ExhaustedIdentifierSource { bound: 2 })
        );
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn payload_failure_propagates() {
        let (bench, sink) = bench(10, Vec::new());
        let mut rt = Runtime::new();

        let result = rt.block_on(yielding_add(bench, 1)).expect("runtime stalled");
        assert_eq!(result, Err(TaskError::Payload(PayloadError::Empty)));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn id_is_taken_before_the_wait() {
        let (bench, sink) = bench(10, vec![vec![0, 1]]);
        let mut rt = Runtime::new();

        rt.block_on(async {
            let slow = spawn(yielding_add(bench.clone(), 30));
            let fast = spawn(yielding_add(bench.clone(), 5));
            let (slow, fast) = futures::join!(slow, fast);
            assert_eq!(slow.expect("slow unit").id, 1);
            assert_eq!(fast.expect("fast unit").id, 2);
        })
        .expect("runtime stalled");

        // The slow unit got the first id but reports last.
        let lines = sink.lines();
        assert!(lines[0].starts_with("#2:"));
        assert!(lines[1].starts_with("#1:"));
    }
}
