use std::sync::Arc;

use autohide_ipc::TargetApp;
use core_foundation::{
    array::CFArray, base::TCFType, dictionary::CFDictionary, number::CFNumber, string::CFString,
};
use core_graphics::event::CGEvent;
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::window::{
    kCGNullWindowID, kCGWindowListExcludeDesktopElements, kCGWindowListOptionIncludingWindow,
    kCGWindowListOptionOnScreenOnly, CGWindowID, CGWindowListCopyWindowInfo,
    CGWindowListOption,
};

use super::pump::MacPump;
use crate::core::{Rect, Registry};
use crate::error::InitError;
use crate::platform::WindowProbe;
use crate::process::process_name;
use crate::tracker::EventPump;

/// Layer of ordinary application windows.
const NORMAL_WINDOW_LAYER: i32 = 0;

#[derive(Debug, Clone)]
struct WindowRecord {
    window_id: CGWindowID,
    pid: i32,
    layer: i32,
    name: Option<String>,
    bounds: Rect,
}

/// Window-server records, front to back.
fn copy_window_info(options: CGWindowListOption, relative_to: CGWindowID) -> Vec<WindowRecord> {
    let raw = unsafe { CGWindowListCopyWindowInfo(options, relative_to) };
    if raw.is_null() {
        tracing::debug!("CGWindowListCopyWindowInfo returned nothing");
        return Vec::new();
    }
    let window_list: CFArray = unsafe { CFArray::wrap_under_create_rule(raw) };

    let mut windows = Vec::new();
    for i in 0..window_list.len() {
        let dict_ptr = unsafe { *window_list.get_unchecked(i) };
        let dict: CFDictionary = unsafe { CFDictionary::wrap_under_get_rule(dict_ptr as *const _) };
        if let Some(record) = parse_window_record(&dict) {
            windows.push(record);
        }
    }
    windows
}

fn on_screen_windows() -> Vec<WindowRecord> {
    copy_window_info(
        kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
        kCGNullWindowID,
    )
}

fn window_record(window_id: CGWindowID) -> Option<WindowRecord> {
    copy_window_info(kCGWindowListOptionIncludingWindow, window_id)
        .into_iter()
        .find(|w| w.window_id == window_id)
}

fn parse_window_record(dict: &CFDictionary) -> Option<WindowRecord> {
    Some(WindowRecord {
        window_id: get_number(dict, "kCGWindowNumber")?.to_i64()? as CGWindowID,
        pid: get_number(dict, "kCGWindowOwnerPID")?.to_i32()?,
        layer: get_number(dict, "kCGWindowLayer")?.to_i32()?,
        name: get_string(dict, "kCGWindowName"),
        bounds: parse_bounds(dict, "kCGWindowBounds")?,
    })
}

fn get_number(dict: &CFDictionary, key: &str) -> Option<CFNumber> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        Some(CFNumber::wrap_under_get_rule(*value as *const _))
    }
}

fn get_string(dict: &CFDictionary, key: &str) -> Option<String> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        Some(CFString::wrap_under_get_rule(*value as *const _).to_string())
    }
}

fn parse_bounds(dict: &CFDictionary, key: &str) -> Option<Rect> {
    let key = CFString::new(key);
    unsafe {
        let value = dict.find(key.as_concrete_TypeRef() as *const _)?;
        let bounds = CFDictionary::wrap_under_get_rule(*value as *const _);

        let x = get_number(&bounds, "X")?.to_f64()?;
        let y = get_number(&bounds, "Y")?.to_f64()?;
        let width = get_number(&bounds, "Width")?.to_f64()?;
        let height = get_number(&bounds, "Height")?.to_f64()?;

        Some(Rect::new(
            x.round() as i32,
            y.round() as i32,
            width.max(0.0).round() as u32,
            height.max(0.0).round() as u32,
        ))
    }
}

/// Ordinary, titled application window.
fn is_candidate(record: &WindowRecord) -> bool {
    record.layer == NORMAL_WINDOW_LAYER && record.name.as_deref().is_some_and(|n| !n.is_empty())
}

#[derive(Clone)]
pub struct MacProbe {
    target: TargetApp,
}

impl MacProbe {
    pub fn open(target: TargetApp) -> Result<Self, InitError> {
        Ok(Self { target })
    }

    /// Topmost normal-layer window containing a screen point, with its bounds
    /// from the same window-server snapshot.
    pub(super) fn topmost_at(&self, x: i32, y: i32) -> Option<(CGWindowID, Rect)> {
        on_screen_windows()
            .into_iter()
            .find(|w| w.layer == NORMAL_WINDOW_LAYER && w.bounds.contains(x, y))
            .map(|w| (w.window_id, w.bounds))
    }
}

impl WindowProbe for MacProbe {
    type Handle = CGWindowID;

    fn enumerate_top_level_windows(&self) -> Vec<CGWindowID> {
        on_screen_windows().into_iter().map(|w| w.window_id).collect()
    }

    fn is_target_window(&self, window_id: CGWindowID) -> bool {
        let Some(record) = window_record(window_id) else {
            return false;
        };
        if !is_candidate(&record) {
            return false;
        }

        u32::try_from(record.pid)
            .ok()
            .and_then(process_name)
            .is_some_and(|name| self.target.matches_process(&name))
    }

    fn geometry(&self, window_id: CGWindowID) -> Option<Rect> {
        window_record(window_id).map(|w| w.bounds)
    }

    fn pointer_position(&self, _window_id: CGWindowID) -> Option<(i32, i32)> {
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState).ok()?;
        let location = CGEvent::new(source).ok()?.location();
        Some((location.x.round() as i32, location.y.round() as i32))
    }

    fn pid_of(&self, window_id: CGWindowID) -> Option<u32> {
        window_record(window_id).and_then(|w| u32::try_from(w.pid).ok())
    }

    fn title_of(&self, window_id: CGWindowID) -> Option<String> {
        window_record(window_id).and_then(|w| w.name)
    }

    fn topmost_window_at(&self, x: i32, y: i32) -> Option<CGWindowID> {
        self.topmost_at(x, y).map(|(window_id, _)| window_id)
    }

    fn event_pump(&self, registry: Arc<Registry<CGWindowID>>) -> Box<dyn EventPump> {
        Box::new(MacPump::new(self.clone(), registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(layer: i32, name: Option<&str>) -> WindowRecord {
        WindowRecord {
            window_id: 42,
            pid: 501,
            layer,
            name: name.map(str::to_string),
            bounds: Rect::new(0, 25, 1440, 875),
        }
    }

    #[test]
    fn test_titled_normal_window_is_candidate() {
        assert!(is_candidate(&record(0, Some("main.rs - Sublime Text"))));
    }

    #[test]
    fn test_other_layers_are_rejected() {
        assert!(!is_candidate(&record(25, Some("Menu"))));
        assert!(!is_candidate(&record(-1, Some("Overlay"))));
    }

    #[test]
    fn test_untitled_windows_are_rejected() {
        assert!(!is_candidate(&record(0, None)));
        assert!(!is_candidate(&record(0, Some(""))));
    }
}
