use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::stats::Stats;

/// A unit of work for the search pool. Tasks may enqueue further tasks
/// through the `Spawner` they are handed.
pub trait Task: Send {
    fn run(self: Box<Self>, spawner: &Spawner, stats: &mut Stats);
}

enum Message {
    Run(Box<dyn Task>),
    Shutdown,
}

struct Shared {
    tx: Sender<Message>,
    pending: Mutex<usize>,
    quiescent: Condvar,
}

/// Cloneable handle used to enqueue tasks, from the driver or from within a
/// running task.
#[derive(Clone)]
pub struct Spawner {
    shared: Arc<Shared>,
}

impl Spawner {
    pub fn spawn(&self, task: Box<dyn Task>) {
        // The pending count must rise before the task becomes visible to a
        // worker, otherwise wait_quiescent could observe a window where the
        // queue is non-empty but the count is zero.
        *self.shared.pending.lock().unwrap() += 1;
        self.shared.tx.send(Message::Run(task)).unwrap();
    }

    fn task_done(&self) {
        let mut pending = self.shared.pending.lock().unwrap();
        *pending -= 1;
        if *pending == 0 {
            self.shared.quiescent.notify_all();
        }
    }
}

/// Fixed-width pool of OS worker threads.
///
/// Each worker owns a `Stats` instance it updates without locking; the stats
/// are handed back when the pool shuts down.
pub struct ThreadPool {
    spawner: Spawner,
    handles: Vec<JoinHandle<Stats>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> ThreadPool {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared {
            tx,
            pending: Mutex::new(0),
            quiescent: Condvar::new(),
        });
        let spawner = Spawner { shared };

        let handles = (0..threads.max(1))
            .map(|id| {
                let rx = rx.clone();
                let spawner = spawner.clone();
                thread::Builder::new()
                    .name(format!("sift-worker-{}", id))
                    .spawn(move || worker(rx, spawner))
                    .unwrap()
            })
            .collect();

        ThreadPool { spawner, handles }
    }

    pub fn spawn(&self, task: Box<dyn Task>) {
        self.spawner.spawn(task);
    }

    /// Block until the queue is empty and every worker is idle.
    pub fn wait_quiescent(&self) {
        let shared = &self.spawner.shared;
        let mut pending = shared.pending.lock().unwrap();
        while *pending > 0 {
            pending = shared.quiescent.wait(pending).unwrap();
        }
    }

    /// Stop the workers and merge their per-worker counters.
    pub fn shutdown(self) -> Stats {
        for _ in &self.handles {
            self.spawner.shared.tx.send(Message::Shutdown).unwrap();
        }

        let mut totals = Stats::default();
        for handle in self.handles {
            let stats = handle.join().unwrap();
            totals.merge(&stats);
        }
        totals
    }
}

fn worker(rx: Receiver<Message>, spawner: Spawner) -> Stats {
    let mut stats = Stats::default();
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(task) => {
                task.run(&spawner, &mut stats);
                spawner.task_done();
            }
            Message::Shutdown => break,
        }
    }
    stats
}
