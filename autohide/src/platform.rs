use std::fmt::{Debug, LowerHex};
use std::hash::Hash;
use std::sync::Arc;

use crate::core::{Rect, Registry};
use crate::tracker::EventPump;

/// Read-only queries over the top-level windows of one desktop session.
/// This abstraction allows mocking in tests.
///
/// Queries never fail loudly: a window that vanished, a denied property
/// read or a dead process all collapse to `None` / `false`.
pub trait WindowProbe: Send + Sync + 'static {
    type Handle: Copy + Eq + Hash + Debug + LowerHex + Send + Sync + 'static;

    fn enumerate_top_level_windows(&self) -> Vec<Self::Handle>;
    fn is_target_window(&self, handle: Self::Handle) -> bool;
    /// Screen rectangle of the window.
    fn geometry(&self, handle: Self::Handle) -> Option<Rect>;
    /// Pointer position in screen coordinates, queried relative to `handle`'s screen.
    fn pointer_position(&self, handle: Self::Handle) -> Option<(i32, i32)>;
    fn pid_of(&self, handle: Self::Handle) -> Option<u32>;
    fn title_of(&self, handle: Self::Handle) -> Option<String>;

    /// Topmost top-level window at a screen point, for backends that can
    /// answer it. Used for hit testing and to reject occluded positions.
    fn topmost_window_at(&self, _x: i32, _y: i32) -> Option<Self::Handle> {
        None
    }

    /// Called once after discovery binds `handle` to a tracking id.
    fn on_bound(&self, _handle: Self::Handle) {}

    fn event_pump(&self, registry: Arc<Registry<Self::Handle>>) -> Box<dyn EventPump>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::error::InitError;
    use crate::tracker::{hit_test, EventSink, HoverDispatcher, PumpReady, PumpWaker};
    use autohide_ipc::TargetApp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};

    #[derive(Debug, Clone)]
    pub struct MockWindow {
        pub handle: u64,
        pub pid: u32,
        pub process: String,
        pub title: String,
        pub rect: Rect,
    }

    pub fn create_test_window(
        handle: u64,
        pid: u32,
        process: &str,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> MockWindow {
        MockWindow {
            handle,
            pid,
            process: process.to_string(),
            title: format!("window {}", handle),
            rect: Rect::new(x, y, width, height),
        }
    }

    #[derive(Default)]
    struct MockState {
        /// Front to back.
        windows: Vec<MockWindow>,
        pointer: Option<(i32, i32)>,
        samples: Vec<(i32, i32)>,
        pump_failure: Option<String>,
        bound: Vec<u64>,
    }

    /// In-memory desktop. Clones share state so a test can mutate windows
    /// while a driver or pump holds its own copy.
    #[derive(Clone)]
    pub struct MockProbe {
        target: TargetApp,
        state: Arc<Mutex<MockState>>,
        releases: Arc<AtomicUsize>,
    }

    impl MockProbe {
        pub fn new(target: TargetApp) -> Self {
            Self {
                target,
                state: Arc::new(Mutex::new(MockState::default())),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_windows(self, windows: Vec<MockWindow>) -> Self {
            self.state.lock().unwrap().windows = windows;
            self
        }

        pub fn with_pointer(self, x: i32, y: i32) -> Self {
            self.set_pointer(Some((x, y)));
            self
        }

        /// Screen positions the scripted pump replays once started.
        pub fn with_samples(self, samples: Vec<(i32, i32)>) -> Self {
            self.state.lock().unwrap().samples = samples;
            self
        }

        pub fn with_pump_failure(self, reason: &str) -> Self {
            self.state.lock().unwrap().pump_failure = Some(reason.to_string());
            self
        }

        pub fn set_pointer(&self, pointer: Option<(i32, i32)>) {
            self.state.lock().unwrap().pointer = pointer;
        }

        pub fn add_window(&self, window: MockWindow) {
            self.state.lock().unwrap().windows.push(window);
        }

        pub fn remove_window(&self, handle: u64) {
            self.state
                .lock()
                .unwrap()
                .windows
                .retain(|w| w.handle != handle);
        }

        pub fn move_window(&self, handle: u64, x: i32, y: i32) {
            let mut state = self.state.lock().unwrap();
            if let Some(w) = state.windows.iter_mut().find(|w| w.handle == handle) {
                w.rect.x = x;
                w.rect.y = y;
            }
        }

        /// Handles passed to `on_bound`, in order.
        pub fn bound(&self) -> Vec<u64> {
            self.state.lock().unwrap().bound.clone()
        }

        /// How many pumps released their resource.
        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        fn window(&self, handle: u64) -> Option<MockWindow> {
            self.state
                .lock()
                .unwrap()
                .windows
                .iter()
                .find(|w| w.handle == handle)
                .cloned()
        }
    }

    impl WindowProbe for MockProbe {
        type Handle = u64;

        fn enumerate_top_level_windows(&self) -> Vec<u64> {
            self.state
                .lock()
                .unwrap()
                .windows
                .iter()
                .map(|w| w.handle)
                .collect()
        }

        fn is_target_window(&self, handle: u64) -> bool {
            self.window(handle)
                .is_some_and(|w| self.target.matches_process(&w.process))
        }

        fn geometry(&self, handle: u64) -> Option<Rect> {
            self.window(handle).map(|w| w.rect)
        }

        fn pointer_position(&self, handle: u64) -> Option<(i32, i32)> {
            self.window(handle)?;
            self.state.lock().unwrap().pointer
        }

        fn pid_of(&self, handle: u64) -> Option<u32> {
            self.window(handle).map(|w| w.pid)
        }

        fn title_of(&self, handle: u64) -> Option<String> {
            self.window(handle).map(|w| w.title)
        }

        fn topmost_window_at(&self, x: i32, y: i32) -> Option<u64> {
            self.state
                .lock()
                .unwrap()
                .windows
                .iter()
                .find(|w| w.rect.contains(x, y))
                .map(|w| w.handle)
        }

        fn on_bound(&self, handle: u64) {
            self.state.lock().unwrap().bound.push(handle);
        }

        fn event_pump(&self, registry: Arc<Registry<u64>>) -> Box<dyn EventPump> {
            let state = self.state.lock().unwrap();
            Box::new(ScriptedPump {
                probe: self.clone(),
                registry,
                samples: state.samples.clone(),
                failure: state.pump_failure.clone(),
            })
        }
    }

    /// Replays scripted samples through the hover dispatcher, then parks
    /// until woken.
    pub struct ScriptedPump {
        probe: MockProbe,
        registry: Arc<Registry<u64>>,
        samples: Vec<(i32, i32)>,
        failure: Option<String>,
    }

    struct ReleaseGuard(Arc<AtomicUsize>);

    impl Drop for ReleaseGuard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ChannelWaker(mpsc::Sender<()>);

    impl PumpWaker for ChannelWaker {
        fn wake(&self) {
            let _ = self.0.send(());
        }
    }

    impl EventPump for ScriptedPump {
        fn run(self: Box<Self>, sink: EventSink, ready: PumpReady) {
            let ScriptedPump {
                probe,
                registry,
                samples,
                failure,
            } = *self;
            if let Some(reason) = failure {
                let _ = ready.send(Err(InitError::HookInstall(reason)));
                return;
            }

            let _release = ReleaseGuard(Arc::clone(&probe.releases));
            let (wake_tx, wake_rx) = mpsc::channel();
            if ready.send(Ok(Box::new(ChannelWaker(wake_tx)))).is_err() {
                return;
            }

            let mut hover = HoverDispatcher::new(sink);
            for (x, y) in samples {
                let hit = hit_test(&probe, registry.as_ref(), x, y);
                hover.dispatch(hit, x, y);
            }

            let _ = wake_rx.recv();
        }
    }
}
