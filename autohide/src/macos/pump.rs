use std::cell::RefCell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::runloop::{
    kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopSource,
};
use core_foundation_sys::mach_port::{CFMachPortInvalidate, CFMachPortRef};
use core_graphics::event::{
    CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult,
};
use core_graphics::window::CGWindowID;

use super::probe::MacProbe;
use crate::core::Registry;
use crate::error::InitError;
use crate::tracker::{EventPump, EventSink, HoverDispatcher, PumpReady, PumpWaker};

extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

/// Upper bound on one run-loop pass, so a stop request that races the
/// run-loop entry is still observed.
const RUN_SLICE: Duration = Duration::from_secs(1);

pub struct MacPump {
    probe: MacProbe,
    registry: Arc<Registry<CGWindowID>>,
}

impl MacPump {
    pub fn new(probe: MacProbe, registry: Arc<Registry<CGWindowID>>) -> Self {
        Self { probe, registry }
    }
}

struct SendRunLoop(CFRunLoop);

// CFRunLoopStop may be called from any thread.
unsafe impl Send for SendRunLoop {}

struct RunLoopWaker {
    run_loop: SendRunLoop,
    alive: Arc<AtomicBool>,
}

impl PumpWaker for RunLoopWaker {
    fn wake(&self) {
        self.alive.store(false, Ordering::Release);
        self.run_loop.0.stop();
    }
}

/// Owns the tap and its run-loop source; invalidates both when dropped.
struct MouseTap {
    tap: CGEventTap<'static>,
    source: CFRunLoopSource,
    run_loop: CFRunLoop,
}

impl Drop for MouseTap {
    fn drop(&mut self) {
        self.run_loop
            .remove_source(&self.source, unsafe { kCFRunLoopCommonModes });
        unsafe {
            CFMachPortInvalidate(self.tap.mach_port().as_concrete_TypeRef());
        }
        tracing::debug!("Mouse event tap released");
    }
}

fn create_tap(
    probe: MacProbe,
    registry: Arc<Registry<CGWindowID>>,
    sink: EventSink,
) -> Result<MouseTap, InitError> {
    let mach_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(ptr::null_mut()));
    let mach_port_for_callback = Arc::clone(&mach_port_ptr);
    let hover = RefCell::new(HoverDispatcher::new(sink));

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::MouseMoved],
        move |_proxy, event_type, event| {
            match event_type {
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    tracing::warn!("Mouse event tap disabled, re-enabling...");
                    let ptr = mach_port_for_callback.load(Ordering::Acquire);
                    if !ptr.is_null() {
                        unsafe {
                            CGEventTapEnable(ptr as CFMachPortRef, true);
                        }
                    }
                    return CallbackResult::Keep;
                }
                _ => {}
            }

            let location = event.location();
            let (x, y) = (location.x.round() as i32, location.y.round() as i32);
            let hit = probe
                .topmost_at(x, y)
                .and_then(|(window_id, bounds)| Some((registry.lookup_id(window_id)?, bounds)));
            if let Ok(mut hover) = hover.try_borrow_mut() {
                hover.dispatch(hit, x, y);
            }

            CallbackResult::Keep
        },
    )
    .map_err(|_| {
        InitError::EventTap(
            "Failed to create mouse event tap. Make sure Accessibility permission is granted."
                .to_string(),
        )
    })?;

    mach_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::Release,
    );

    tap.enable();

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|_| InitError::EventTap("Failed to create run loop source".to_string()))?;

    let run_loop = CFRunLoop::get_current();
    run_loop.add_source(&source, unsafe { kCFRunLoopCommonModes });

    Ok(MouseTap {
        tap,
        source,
        run_loop,
    })
}

impl EventPump for MacPump {
    fn run(self: Box<Self>, sink: EventSink, ready: PumpReady) {
        let MacPump { probe, registry } = *self;

        let _tap = match create_tap(probe, registry, sink) {
            Ok(tap) => tap,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        let alive = Arc::new(AtomicBool::new(true));
        let waker = RunLoopWaker {
            run_loop: SendRunLoop(CFRunLoop::get_current()),
            alive: Arc::clone(&alive),
        };
        if ready.send(Ok(Box::new(waker))).is_err() {
            return;
        }
        tracing::debug!("Mouse event tap running");

        while alive.load(Ordering::Acquire) {
            CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_SLICE, false);
        }
    }
}
