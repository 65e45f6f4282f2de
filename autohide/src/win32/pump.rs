use std::cell::RefCell;
use std::sync::Arc;

use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, MSG, MSLLHOOKSTRUCT,
    PM_NOREMOVE, WH_MOUSE_LL, WM_MOUSEMOVE, WM_QUIT, WM_USER,
};

use super::probe::{virtual_screen, Win32Probe, WindowHandle};
use crate::core::Registry;
use crate::error::InitError;
use crate::tracker::{hit_test, EventPump, EventSink, HoverDispatcher, PumpReady, PumpWaker};

/// State the hook procedure needs. Low-level hooks are called on the
/// installing thread, so it lives in that thread's local storage.
struct HookContext {
    probe: Win32Probe,
    registry: Arc<Registry<WindowHandle>>,
    hover: HoverDispatcher,
}

thread_local! {
    static HOOK_CONTEXT: RefCell<Option<HookContext>> = const { RefCell::new(None) };
}

unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 && wparam.0 as u32 == WM_MOUSEMOVE {
        let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        let (x, y) = virtual_screen().clamp(info.pt.x, info.pt.y);

        HOOK_CONTEXT.with(|cell| {
            // A callback that pumps messages can re-enter the hook.
            let Ok(mut slot) = cell.try_borrow_mut() else {
                return;
            };
            if let Some(ctx) = slot.as_mut() {
                let hit = hit_test(&ctx.probe, ctx.registry.as_ref(), x, y);
                ctx.hover.dispatch(hit, x, y);
            }
        });
    }

    CallNextHookEx(None, code, wparam, lparam)
}

pub struct Win32Pump {
    probe: Win32Probe,
    registry: Arc<Registry<WindowHandle>>,
}

impl Win32Pump {
    pub fn new(probe: Win32Probe, registry: Arc<Registry<WindowHandle>>) -> Self {
        Self { probe, registry }
    }
}

struct Win32Waker {
    thread_id: u32,
}

impl PumpWaker for Win32Waker {
    fn wake(&self) {
        if let Err(e) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            tracing::warn!("Failed to post WM_QUIT to pump thread: {}", e);
        }
    }
}

/// Unhooks and drops the hook context on every exit path.
struct HookGuard(HHOOK);

impl Drop for HookGuard {
    fn drop(&mut self) {
        if let Err(e) = unsafe { UnhookWindowsHookEx(self.0) } {
            tracing::warn!("UnhookWindowsHookEx failed: {}", e);
        }
        HOOK_CONTEXT.with(|cell| cell.borrow_mut().take());
        tracing::debug!("Mouse hook removed");
    }
}

impl EventPump for Win32Pump {
    fn run(self: Box<Self>, sink: EventSink, ready: PumpReady) {
        let Win32Pump { probe, registry } = *self;

        // Create this thread's message queue before anyone posts to it.
        let mut msg = MSG::default();
        unsafe {
            let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
        }

        HOOK_CONTEXT.with(|cell| {
            *cell.borrow_mut() = Some(HookContext {
                probe,
                registry,
                hover: HoverDispatcher::new(sink),
            })
        });

        let hook = match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) } {
            Ok(hook) => hook,
            Err(e) => {
                HOOK_CONTEXT.with(|cell| cell.borrow_mut().take());
                let _ = ready.send(Err(InitError::HookInstall(e.to_string())));
                return;
            }
        };
        let _guard = HookGuard(hook);

        let thread_id = unsafe { GetCurrentThreadId() };
        if ready.send(Ok(Box::new(Win32Waker { thread_id }))).is_err() {
            return;
        }
        tracing::debug!("Mouse hook installed on thread {}", thread_id);

        loop {
            let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            match result.0 {
                0 => break,
                -1 => {
                    tracing::error!("GetMessageW failed");
                    break;
                }
                _ => unsafe {
                    let _ = TranslateMessage(&msg);
                    let _ = DispatchMessageW(&msg);
                },
            }
        }
    }
}
