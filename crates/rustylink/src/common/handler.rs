//! Single-threaded event queue
//!
//! A [`Handler`] owns one worker thread and runs the tasks posted to it one
//! at a time, in posting order. Delayed tasks are kept in a deadline-ordered
//! map on the worker and run once their deadline has passed.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// A unit of work run on a handler's worker thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    RunAt(Instant, Task),
    Shutdown,
}

struct HandlerInner {
    name: String,
    sender: Mutex<mpsc::Sender<Message>>,
    thread_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable reference to an event queue bound to one worker thread
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    /// Spawn a new worker thread and return a handler posting to it
    pub fn new(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(receiver))?;

        Ok(Self {
            inner: Arc::new(HandlerInner {
                name: name.to_string(),
                sender: Mutex::new(sender),
                thread_id: worker.thread().id(),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Name given to the worker thread
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue a task to run as soon as the tasks before it have run
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Message::Run(Box::new(task)));
    }

    /// Queue a task to run no earlier than `delay` from now
    pub fn post_delayed<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Message::RunAt(Instant::now() + delay, Box::new(task)));
    }

    /// Whether the calling thread is this handler's worker
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Stop the worker after the tasks already queued have run.
    ///
    /// Pending delayed tasks are dropped. When called from a thread other
    /// than the worker this blocks until the worker has exited.
    pub fn stop(&self) {
        self.send(Message::Shutdown);
        if self.is_current() {
            return;
        }
        let worker = self.inner.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("Handler {} worker panicked", self.inner.name);
            }
        }
    }

    fn send(&self, message: Message) {
        let sender = self.inner.sender.lock().unwrap();
        if sender.send(message).is_err() {
            warn!("Handler {} is stopped, dropping task", self.inner.name);
        }
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.inner.name)
            .finish()
    }
}

fn run_worker(receiver: mpsc::Receiver<Message>) {
    // Keyed by (deadline, sequence) so equal deadlines keep posting order
    let mut timers: BTreeMap<(Instant, u64), Task> = BTreeMap::new();
    let mut sequence: u64 = 0;

    loop {
        // Tasks already queued run before any timer that fell due meanwhile
        let message = match receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {
                let next_deadline = timers.keys().next().map(|(deadline, _)| *deadline);
                match next_deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if deadline <= now {
                            if let Some((_, task)) = timers.pop_first() {
                                task();
                            }
                            continue;
                        }
                        match receiver.recv_timeout(deadline - now) {
                            Ok(message) => message,
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    None => match receiver.recv() {
                        Ok(message) => message,
                        Err(_) => break,
                    },
                }
            }
        };

        match message {
            Message::Run(task) => task(),
            Message::RunAt(deadline, task) => {
                sequence += 1;
                timers.insert((deadline, sequence), task);
            }
            Message::Shutdown => break,
        }
    }

    if !timers.is_empty() {
        debug!("Dropping {} delayed tasks on shutdown", timers.len());
    }
}
