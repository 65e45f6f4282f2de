mod hover;
mod sink;

pub use hover::{hit_test, HoverDispatcher};
pub use sink::{EventSink, LeaveCallback, MoveCallback};

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::InitError;

/// Channel a pump uses to report that its platform resource is live.
pub type PumpReady = mpsc::Sender<Result<Box<dyn PumpWaker>, InitError>>;

/// A platform event loop that owns the OS subscription (hook, event tap or
/// input selection) for as long as `run` executes.
///
/// `run` is called on a dedicated thread. It must acquire the resource,
/// report through `ready`, then block dispatching into `sink` until woken.
/// The resource is released before `run` returns, on every path.
pub trait EventPump: Send {
    fn run(self: Box<Self>, sink: EventSink, ready: PumpReady);
}

/// Thread-safe handle that makes a running pump return.
pub trait PumpWaker: Send {
    fn wake(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Delivers pointer move/leave events for registered windows from a
/// background thread until stopped.
///
/// Lifecycle is Idle -> Running -> Stopping -> Stopped. A stopped tracker
/// cannot be restarted; ask the driver for a new one.
pub struct EventTracker {
    state: Arc<Mutex<TrackerState>>,
    pump: Option<Box<dyn EventPump>>,
    sink: EventSink,
    waker: Option<Box<dyn PumpWaker>>,
    thread: Option<JoinHandle<()>>,
}

impl EventTracker {
    pub fn new(pump: Box<dyn EventPump>, sink: EventSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState::Idle)),
            pump: Some(pump),
            sink,
            waker: None,
            thread: None,
        }
    }

    /// Spawn the pump thread and wait until its OS resource is installed.
    pub fn start(&mut self) -> Result<(), InitError> {
        {
            let mut state = lock(&self.state);
            if *state != TrackerState::Idle {
                return Err(InitError::AlreadyStarted);
            }
            *state = TrackerState::Running;
        }

        let pump = self.pump.take().ok_or(InitError::AlreadyStarted)?;
        let sink = self.sink.clone();
        let exit_state = Arc::clone(&self.state);
        let (ready_tx, ready_rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("autohide-pump".to_string())
            .spawn(move || {
                let _exit = StoppedOnExit(exit_state);
                pump.run(sink, ready_tx);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.set_state(TrackerState::Stopped);
                return Err(InitError::Setup(format!("failed to spawn pump thread: {}", e)));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(waker)) => {
                self.waker = Some(waker);
                self.thread = Some(handle);
                tracing::info!("Event tracker started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.set_state(TrackerState::Stopped);
                tracing::error!("Event tracker failed to start: {}", e);
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                self.set_state(TrackerState::Stopped);
                Err(InitError::Setup(
                    "event pump exited before becoming ready".to_string(),
                ))
            }
        }
    }

    /// Stop delivering events and release the OS resource. No-op unless running.
    pub fn stop(&mut self) {
        let was_running = {
            let mut state = lock(&self.state);
            if *state == TrackerState::Running {
                *state = TrackerState::Stopping;
                true
            } else {
                false
            }
        };

        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
        self.join();

        if was_running {
            self.set_state(TrackerState::Stopped);
            tracing::info!("Event tracker stopped");
        }
    }

    pub fn state(&self) -> TrackerState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == TrackerState::Running
    }

    fn join(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            tracing::warn!("Event tracker stopped from its own pump thread, not joining");
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Event pump thread panicked");
        }
    }

    fn set_state(&self, next: TrackerState) {
        *lock(&self.state) = next;
    }
}

impl Drop for EventTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Marks the tracker stopped when the pump thread ends, including when
/// the pump exits on its own after losing its connection.
struct StoppedOnExit(Arc<Mutex<TrackerState>>);

impl Drop for StoppedOnExit {
    fn drop(&mut self) {
        *lock(&self.0) = TrackerState::Stopped;
    }
}

fn lock(state: &Mutex<TrackerState>) -> MutexGuard<'_, TrackerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
