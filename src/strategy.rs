//! The three scheduling strategies and the driver that times them.

use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::{try_join_all, LocalBoxFuture};
use futures::FutureExt;
use log::{debug, error, info};

use crate::error::{StrategyError, TaskError};
use crate::mini_rt::{spawn, Runtime};
use crate::report::Report;
use crate::task_unit::{blocking_add, yielding_add, Bench, WaitMode};

type Unit = LocalBoxFuture<'static, Result<Report, TaskError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every unit blocks; the group takes the sum of the waits.
    AllBlocking,
    /// One blocking unit spawned between two yielding ones.
    Mixed,
    /// Every unit yields; the group takes the longest wait.
    AllYielding,
}

impl Strategy {
    /// Order in which the driver runs them.
    pub const ALL: [Strategy; 3] = [Strategy::AllBlocking, Strategy::Mixed, Strategy::AllYielding];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::AllBlocking => "all_blocking",
            Strategy::Mixed => "mixed",
            Strategy::AllYielding => "all_yielding",
        }
    }

    pub fn modes(self) -> [WaitMode; 3] {
        use WaitMode::{Blocking, Yielding};
        match self {
            Strategy::AllBlocking => [Blocking, Blocking, Blocking],
            Strategy::Mixed => [Yielding, Blocking, Yielding],
            Strategy::AllYielding => [Yielding, Yielding, Yielding],
        }
    }

    fn units(self, bench: &Rc<Bench>, durations: [u32; 3]) -> [Unit; 3] {
        let modes = self.modes();
        std::array::from_fn(|i| match modes[i] {
            WaitMode::Blocking => blocking_add(bench.clone(), durations[i]).boxed_local(),
            WaitMode::Yielding => yielding_add(bench.clone(), durations[i]).boxed_local(),
        })
    }

    /// Run the group to completion, failing fast on the first unit error.
    pub async fn run(self, bench: Rc<Bench>, durations: [u32; 3]) -> Result<Vec<Report>, TaskError> {
        let [a, b, c] = self.units(&bench, durations);
        match self {
            // Gathered inside the calling task.
            Strategy::AllBlocking | Strategy::AllYielding => {
                let (a, b, c) = crate::gather!(a, b, c)?;
                Ok(vec![a, b, c])
            }
            // Each unit is its own task; the handles are joined afterwards.
            Strategy::Mixed => {
                let mut handles = vec![spawn(a), spawn(b), spawn(c)];
                let result = try_join_all(handles.iter_mut()).await;
                if result.is_err() {
                    let unfinished = handles.iter().filter(|h| !h.is_finished()).count();
                    debug!("{}: dropping {unfinished} unfinished unit(s)", self.name());
                }
                result
            }
        }
    }
}

/// Outcome of one timed strategy run.
#[derive(Debug)]
pub struct Timing {
    pub strategy: Strategy,
    pub elapsed: Duration,
    pub outcome: Result<Vec<Report>, StrategyError>,
}

/// Run `strategy` on a fresh runtime, bracketed by START/END lines.
pub fn run_strategy(strategy: Strategy, bench: &Rc<Bench>, durations: [u32; 3]) -> Timing {
    let name = strategy.name();
    bench.emit(&format!("START {name}"));
    info!("running {name} with waits {durations:?}");

    let start = Instant::now();
    let mut rt = Runtime::new();
    let outcome = rt
        .block_on(strategy.run(bench.clone(), durations))
        .map_err(StrategyError::from)
        .and_then(|result| result.map_err(StrategyError::from));
    let elapsed = start.elapsed();
    let secs = elapsed.as_secs_f64();

    match &outcome {
        Ok(_) => bench.emit(&format!("END {name} executed in {secs:.2} seconds.")),
        Err(err) => {
            error!("{name} aborted: {err}");
            bench.emit(&format!("END {name} failed after {secs:.2} seconds: {err}"));
        }
    }
    bench.emit("");

    Timing {
        strategy,
        elapsed,
        outcome,
    }
}

/// Run every strategy in order. A failed strategy does not stop the next.
pub fn run_all(bench: &Rc<Bench>, durations: [u32; 3]) -> Vec<Timing> {
    Strategy::ALL
        .into_iter()
        .map(|strategy| run_strategy(strategy, bench, durations))
        .collect()
}
