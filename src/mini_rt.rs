use std::{
    cell::{Cell, RefCell},
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap, VecDeque},
    future::Future,
    pin::{pin, Pin},
    rc::Rc,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
    thread,
    time::{Duration, Instant},
};

use futures::future::LocalBoxFuture;
use futures::task::{self as futures_task, ArcWake};
use log::{debug, trace};

use crate::error::RuntimeError;

type TaskId = u64;

/// Id reserved for the future passed to `block_on`.
const ROOT: TaskId = 0;

// === Runtime ===

/// Single-threaded cooperative executor.
///
/// Every task runs on the thread that called `block_on`. A task only gives
/// the thread back when it returns `Poll::Pending`; anything that blocks
/// inside a poll blocks every other task too.
pub struct Runtime {
    shared: Rc<Shared>,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            shared: Rc::new(Shared::new()),
        }
    }

    /// Drive `fut` and every task it spawns until `fut` completes.
    ///
    /// Spawned tasks still pending when `fut` returns are dropped.
    pub fn block_on<F: Future>(&mut self, fut: F) -> Result<F::Output, RuntimeError> {
        let _enter = Enter::new(self.shared.clone());
        let mut fut = pin!(fut);
        let root_waker = self.shared.waker(ROOT);
        let mut cx = Context::from_waker(&root_waker);
        self.shared.ready.push(ROOT);

        let result = 'run: loop {
            while let Some(id) = self.shared.ready.pop() {
                if id == ROOT {
                    if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
                        break 'run Ok(output);
                    }
                } else {
                    self.shared.run_task(id);
                }
            }

            if self.shared.fire_expired(Instant::now()) > 0 {
                continue;
            }

            match self.shared.next_deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline > now {
                        trace!("scheduler idle for {:?}", deadline - now);
                        thread::sleep(deadline - now);
                    }
                }
                None => {
                    let pending = self.shared.tasks.borrow().len();
                    break 'run Err(RuntimeError::Stalled { pending });
                }
            }
        };

        let abandoned = self.shared.shutdown();
        if abandoned > 0 {
            debug!("dropping {abandoned} unfinished task(s)");
        }
        result
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

// === Shared scheduler state ===

struct Shared {
    tasks: RefCell<HashMap<TaskId, LocalBoxFuture<'static, ()>>>,
    ready: Arc<ReadyQueue>,
    timers: RefCell<BinaryHeap<Reverse<Timer>>>,
    next_task: Cell<TaskId>,
    next_timer: Cell<u64>,
}

impl Shared {
    fn new() -> Self {
        Self {
            tasks: RefCell::new(HashMap::new()),
            ready: Arc::new(ReadyQueue::new()),
            timers: RefCell::new(BinaryHeap::new()),
            next_task: Cell::new(ROOT + 1),
            next_timer: Cell::new(0),
        }
    }

    fn waker(&self, id: TaskId) -> Waker {
        futures_task::waker(Arc::new(TaskWaker {
            id,
            ready: self.ready.clone(),
        }))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) -> TaskId {
        let id = self.next_task.get();
        self.next_task.set(id + 1);
        self.tasks.borrow_mut().insert(id, task);
        self.ready.push(id);
        trace!("spawned task {id}");
        id
    }

    fn run_task(&self, id: TaskId) {
        // The future is taken out while polled so that it can spawn freely.
        let Some(mut task) = self.tasks.borrow_mut().remove(&id) else {
            return;
        };
        let waker = self.waker(id);
        let mut cx = Context::from_waker(&waker);

        match task.as_mut().poll(&mut cx) {
            Poll::Ready(()) => trace!("task {id} finished"),
            Poll::Pending => {
                self.tasks.borrow_mut().insert(id, task);
            }
        }
    }

    fn add_timer(&self, deadline: Instant, waker: Waker) {
        let seq = self.next_timer.get();
        self.next_timer.set(seq + 1);
        self.timers.borrow_mut().push(Reverse(Timer {
            deadline,
            seq,
            waker,
        }));
    }

    /// Wake every timer whose deadline is at or before `now`.
    fn fire_expired(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        {
            let mut timers = self.timers.borrow_mut();
            while timers.peek().is_some_and(|Reverse(t)| t.deadline <= now) {
                if let Some(Reverse(timer)) = timers.pop() {
                    expired.push(timer);
                }
            }
        }
        for timer in &expired {
            timer.waker.wake_by_ref();
        }
        expired.len()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.borrow().peek().map(|Reverse(t)| t.deadline)
    }

    fn shutdown(&self) -> usize {
        let abandoned = std::mem::take(&mut *self.tasks.borrow_mut());
        self.timers.borrow_mut().clear();
        self.ready.clear();
        abandoned.len()
    }
}

// === Ready queue and wakers ===

struct ReadyQueue {
    ids: Mutex<VecDeque<TaskId>>,
}

impl ReadyQueue {
    fn new() -> Self {
        Self {
            ids: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, id: TaskId) {
        self.ids.lock().unwrap().push_back(id);
    }

    fn pop(&self) -> Option<TaskId> {
        self.ids.lock().unwrap().pop_front()
    }

    fn clear(&self) {
        self.ids.lock().unwrap().clear();
    }
}

struct TaskWaker {
    id: TaskId,
    ready: Arc<ReadyQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.id);
    }
}

// === Timers ===

/// Ordered by deadline, then by registration.
struct Timer {
    deadline: Instant,
    seq: u64,
    waker: Waker,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

// === Thread-local runtime access ===

thread_local! {
    static CURRENT: RefCell<Option<Rc<Shared>>> = const { RefCell::new(None) };
}

struct Enter {
    prev: Option<Rc<Shared>>,
}

impl Enter {
    fn new(shared: Rc<Shared>) -> Self {
        let prev = CURRENT.with(|current| current.borrow_mut().replace(shared));
        Enter { prev }
    }
}

impl Drop for Enter {
    fn drop(&mut self) {
        CURRENT.with(|current| *current.borrow_mut() = self.prev.take());
    }
}

fn with_current<R>(f: impl FnOnce(&Shared) -> R) -> R {
    CURRENT.with(|current| {
        let current = current.borrow();
        let shared = current
            .as_ref()
            .expect("mini_rt used outside of Runtime::block_on");
        f(shared)
    })
}

// === Spawning ===

/// Schedule `future` on the current runtime.
///
/// Panics when called outside `Runtime::block_on`.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let handle = JoinHandle::new();
    let state = handle.state.clone();
    let task = Box::pin(async move {
        let output = future.await;
        state.borrow_mut().complete(output);
    });
    with_current(|shared| shared.spawn(task));
    handle
}

// === JoinHandle ===

pub struct JoinHandle<T> {
    state: Rc<RefCell<JoinState<T>>>,
}

struct JoinState<T> {
    output: Option<T>,
    finished: bool,
    waiter: Option<Waker>,
}

impl<T> JoinState<T> {
    fn complete(&mut self, output: T) {
        self.output = Some(output);
        self.finished = true;
        if let Some(waiter) = self.waiter.take() {
            waiter.wake();
        }
    }
}

impl<T> JoinHandle<T> {
    fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(JoinState {
                output: None,
                finished: false,
                waiter: None,
            })),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.output.take() {
            Some(output) => Poll::Ready(output),
            None => {
                state.waiter = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

// === sleep ===

/// Yielding wait: suspends the calling task until `duration` has passed.
///
/// A zero duration still yields once.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        yield_now().await;
    } else {
        TimerFuture::new(duration).await;
    }
}

struct TimerFuture {
    wake_time: Instant,
    registered: bool,
}

impl TimerFuture {
    fn new(duration: Duration) -> Self {
        Self {
            wake_time: Instant::now() + duration,
            registered: false,
        }
    }
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.wake_time {
            return Poll::Ready(());
        }
        if !self.registered {
            let wake_time = self.wake_time;
            with_current(|shared| shared.add_timer(wake_time, cx.waker().clone()));
            self.registered = true;
        }
        Poll::Pending
    }
}

// === yield_now ===

pub async fn yield_now() {
    struct YieldNow {
        yielded: bool,
    }

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            if self.yielded {
                return Poll::Ready(());
            }
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    YieldNow { yielded: false }.await;
}

// === gather! macro ===

/// Await fallible futures concurrently inside the current task.
///
/// Resolves to `Ok` with a tuple of outputs, or to the first error as soon
/// as one future fails; the others are dropped.
#[macro_export]
macro_rules! gather {
    ($($fut:expr),+ $(,)?) => {
        ::futures::try_join!($($fut),+)
    };
}
