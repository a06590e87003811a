//! Single-worker prioritized task queue.
//!
//! Heavy correction work is funneled through one long-lived thread so at
//! most one such task runs per input session. Tasks are ordered by
//! `(priority, enqueue sequence)`: smaller priority first, FIFO within a
//! priority. Each task carries a string tag, and pending tasks can be
//! cancelled by tag prefix. A running task is never interrupted (Stage-3
//! re-checks its generation instead).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use tracing::warn;

type Job = Box<dyn FnOnce() + Send>;

struct QueuedTask {
    priority: i32,
    seq: u64,
    tag: String,
    job: Job,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    // Reversed so the std max-heap pops the smallest (priority, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

struct State {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

pub struct TaskQueue {
    shared: Arc<Shared>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("qazkey-tasks".into())
            .spawn(move || worker_loop(worker_shared))
            .expect("failed to spawn task-queue worker");

        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Enqueue a task. Smaller `priority` runs sooner; equal priorities run
    /// in submission order. Submits after shutdown are dropped silently.
    pub fn submit<F>(&self, priority: i32, tag: impl Into<String>, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        if state.shutdown {
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(QueuedTask {
            priority,
            seq,
            tag: tag.into(),
            job: Box::new(job),
        });
        drop(state);
        self.shared.wake.notify_one();
    }

    /// Remove every pending task whose tag starts with `prefix`; returns how
    /// many were dropped. The currently running task is unaffected.
    pub fn cancel(&self, prefix: &str) -> usize {
        let mut state = self.shared.state.lock().unwrap();
        let before = state.heap.len();
        state.heap.retain(|t| !t.tag.starts_with(prefix));
        before - state.heap.len()
    }

    /// Drop all pending tasks.
    pub fn clear(&self) -> usize {
        let mut state = self.shared.state.lock().unwrap();
        let dropped = state.heap.len();
        state.heap.clear();
        dropped
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().unwrap().heap.len()
    }

    /// Stop accepting tasks, let the worker drain what is already queued,
    /// and join it. Callers that want pending work discarded instead call
    /// [`TaskQueue::clear`] first.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(task) = state.heap.pop() {
                    break task;
                }
                if state.shutdown {
                    return;
                }
                state = shared.wake.wait(state).unwrap();
            }
        };

        if catch_unwind(AssertUnwindSafe(task.job)).is_err() {
            warn!(tag = %task.tag, "task panicked; worker continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn runs_submitted_task() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        queue.submit(0, "t", move || tx.send(42).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 42);
    }

    #[test]
    fn priority_then_fifo_order() {
        let queue = TaskQueue::new();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();

        // Block the worker so the rest of the submissions queue up together.
        queue.submit(0, "gate", move || {
            gate_rx.recv().unwrap();
        });
        for (priority, id) in [(5, "low-a"), (1, "high"), (5, "low-b")] {
            let tx = tx.clone();
            queue.submit(priority, id, move || tx.send(id).unwrap());
        }
        gate_tx.send(()).unwrap();

        let order: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();
        assert_eq!(order, vec!["high", "low-a", "low-b"]);
    }

    #[test]
    fn cancel_by_tag_prefix() {
        let queue = TaskQueue::new();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let ran = Arc::new(AtomicUsize::new(0));

        queue.submit(0, "gate", move || {
            gate_rx.recv().unwrap();
        });
        for tag in ["heavy:1", "heavy:2", "other:1"] {
            let ran = Arc::clone(&ran);
            queue.submit(10, tag, move || {
                ran.fetch_add(1, AtomicOrdering::SeqCst);
            });
        }
        assert_eq!(queue.cancel("heavy:"), 2);
        gate_tx.send(()).unwrap();
        queue.shutdown();
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn panic_does_not_stop_worker() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        queue.submit(0, "boom", || panic!("deliberate"));
        queue.submit(0, "after", move || tx.send(()).unwrap());
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn submit_after_shutdown_is_dropped() {
        let queue = TaskQueue::new();
        queue.shutdown();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        queue.submit(0, "late", move || {
            ran2.fetch_add(1, AtomicOrdering::SeqCst);
        });
        assert_eq!(queue.pending(), 0);
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn shutdown_drains_pending() {
        let queue = TaskQueue::new();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let ran = Arc::new(AtomicUsize::new(0));

        queue.submit(0, "gate", move || {
            gate_rx.recv().unwrap();
        });
        for i in 0..4 {
            let ran = Arc::clone(&ran);
            queue.submit(1, format!("work:{i}"), move || {
                ran.fetch_add(1, AtomicOrdering::SeqCst);
            });
        }
        gate_tx.send(()).unwrap();
        queue.shutdown();
        assert_eq!(ran.load(AtomicOrdering::SeqCst), 4);
    }
}
