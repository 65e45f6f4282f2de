use std::sync::Arc;

use autohide_ipc::TargetApp;
use x11rb::protocol::xproto::Window;

use super::connection::X11Connection;
use super::pump::X11Pump;
use crate::core::{Rect, Registry};
use crate::error::InitError;
use crate::platform::WindowProbe;
use crate::process::process_name;
use crate::tracker::EventPump;

#[derive(Clone)]
pub struct X11Probe {
    conn: Arc<X11Connection>,
    target: TargetApp,
}

impl X11Probe {
    pub fn open(target: TargetApp) -> Result<Self, InitError> {
        Ok(Self {
            conn: Arc::new(X11Connection::open()?),
            target,
        })
    }
}

impl WindowProbe for X11Probe {
    type Handle = Window;

    fn enumerate_top_level_windows(&self) -> Vec<Window> {
        self.conn.client_list()
    }

    fn is_target_window(&self, window: Window) -> bool {
        let by_process = self
            .conn
            .pid(window)
            .and_then(process_name)
            .is_some_and(|name| self.target.matches_process(&name));
        if by_process {
            return true;
        }

        // Remote clients and sandboxed apps often have no usable pid.
        self.conn
            .title(window)
            .is_some_and(|title| self.target.matches_title(&title))
    }

    fn geometry(&self, window: Window) -> Option<Rect> {
        self.conn.geometry(window)
    }

    fn pointer_position(&self, window: Window) -> Option<(i32, i32)> {
        self.conn.pointer(window)
    }

    fn pid_of(&self, window: Window) -> Option<u32> {
        self.conn.pid(window)
    }

    fn title_of(&self, window: Window) -> Option<String> {
        self.conn.title(window)
    }

    fn on_bound(&self, window: Window) {
        self.conn.subscribe(window);
    }

    fn event_pump(&self, registry: Arc<Registry<Window>>) -> Box<dyn EventPump> {
        Box::new(X11Pump::new(Arc::clone(&self.conn), registry))
    }
}
