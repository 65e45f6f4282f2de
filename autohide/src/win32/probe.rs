use std::ffi::c_void;
use std::sync::Arc;

use autohide_ipc::TargetApp;
use windows::Win32::Foundation::{CloseHandle, BOOL, HWND, LPARAM, POINT, RECT, TRUE};
use windows::Win32::System::ProcessStatus::K32GetModuleFileNameExW;
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetAncestor, GetClassNameW, GetPhysicalCursorPos, GetSystemMetrics,
    GetWindowRect, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    WindowFromPhysicalPoint, GA_ROOT, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::pump::Win32Pump;
use crate::core::{Rect, Registry};
use crate::error::InitError;
use crate::platform::WindowProbe;
use crate::tracker::EventPump;

/// HWND values are stored as integers so handles can cross threads.
pub type WindowHandle = isize;

pub(super) fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle as *mut c_void)
}

#[derive(Clone)]
pub struct Win32Probe {
    target: TargetApp,
}

impl Win32Probe {
    pub fn open(target: TargetApp) -> Result<Self, InitError> {
        Ok(Self { target })
    }

    fn class_name(&self, handle: WindowHandle) -> Option<String> {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd(handle), &mut buf) };
        (len > 0).then(|| String::from_utf16_lossy(&buf[..len as usize]))
    }
}

/// Bounding rectangle of all monitors.
pub(super) fn virtual_screen() -> Rect {
    unsafe {
        Rect::new(
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN).max(0) as u32,
            GetSystemMetrics(SM_CYVIRTUALSCREEN).max(0) as u32,
        )
    }
}

/// Executable file name (e.g. "sublime_text.exe") of a process.
fn process_image_name(pid: u32) -> Option<String> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = [0u16; 260];
        let len = K32GetModuleFileNameExW(Some(handle), None, &mut buffer);
        let _ = CloseHandle(handle);

        if len == 0 {
            return None;
        }
        let path = String::from_utf16_lossy(&buffer[..len as usize]);
        path.rsplit('\\').next().map(str::to_string)
    }
}

/// "sublime_text.exe" -> "sublime_text".
fn exe_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    handles.push(hwnd.0 as WindowHandle);
    TRUE
}

impl WindowProbe for Win32Probe {
    type Handle = WindowHandle;

    fn enumerate_top_level_windows(&self) -> Vec<WindowHandle> {
        let mut handles: Vec<WindowHandle> = Vec::new();
        let result = unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut handles as *mut Vec<WindowHandle> as isize),
            )
        };
        if let Err(e) = result {
            tracing::debug!("EnumWindows failed: {}", e);
        }
        handles
    }

    fn is_target_window(&self, handle: WindowHandle) -> bool {
        let class_ok = self
            .class_name(handle)
            .is_some_and(|class| self.target.matches_class(&class));
        if !class_ok {
            return false;
        }

        self.pid_of(handle)
            .and_then(process_image_name)
            .is_some_and(|name| self.target.matches_exe_stem(exe_stem(&name)))
    }

    fn geometry(&self, handle: WindowHandle) -> Option<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd(handle), &mut rect) }.ok()?;
        Some(Rect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn pointer_position(&self, _handle: WindowHandle) -> Option<(i32, i32)> {
        let mut point = POINT::default();
        unsafe { GetPhysicalCursorPos(&mut point) }.ok()?;
        Some(virtual_screen().clamp(point.x, point.y))
    }

    fn pid_of(&self, handle: WindowHandle) -> Option<u32> {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(hwnd(handle), Some(&mut pid as *mut u32)) };
        (pid != 0).then_some(pid)
    }

    fn title_of(&self, handle: WindowHandle) -> Option<String> {
        unsafe {
            let len = GetWindowTextLengthW(hwnd(handle));
            if len <= 0 {
                return None;
            }
            let mut buf = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd(handle), &mut buf);
            (copied > 0).then(|| String::from_utf16_lossy(&buf[..copied as usize]))
        }
    }

    fn topmost_window_at(&self, x: i32, y: i32) -> Option<WindowHandle> {
        unsafe {
            let child = WindowFromPhysicalPoint(POINT { x, y });
            if child.is_invalid() {
                return None;
            }
            let root = GetAncestor(child, GA_ROOT);
            (!root.is_invalid()).then_some(root.0 as WindowHandle)
        }
    }

    fn event_pump(&self, registry: Arc<Registry<WindowHandle>>) -> Box<dyn EventPump> {
        Box::new(Win32Pump::new(self.clone(), registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exe_stem() {
        assert_eq!(exe_stem("sublime_text.exe"), "sublime_text");
        assert_eq!(exe_stem("sublime_text"), "sublime_text");
        assert_eq!(exe_stem(""), "");
    }
}
