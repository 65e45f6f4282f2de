use autohide_ipc::TrackingId;

use crate::core::Registry;
use crate::platform::WindowProbe;

/// Bind the first unregistered target window to `id`.
///
/// Returns the handle now bound to `id`. If `id` is already bound, its
/// existing handle is returned and nothing is enumerated.
pub fn register_new_window<P: WindowProbe>(
    probe: &P,
    registry: &Registry<P::Handle>,
    id: TrackingId,
) -> Option<P::Handle> {
    if let Some(handle) = registry.lookup_handle(id) {
        return Some(handle);
    }

    let windows = probe.enumerate_top_level_windows();
    if windows.is_empty() {
        tracing::debug!("No top-level windows found");
        return None;
    }

    for handle in windows {
        if registry.contains_handle(handle) || !probe.is_target_window(handle) {
            continue;
        }

        if !registry.bind(handle, id) {
            // Lost a race against another discovery call.
            if registry.is_bound(id) {
                return registry.lookup_handle(id);
            }
            continue;
        }

        tracing::info!(
            "Registered window {:#x} as id={} (pid={:?}, title={:?}, {} tracked)",
            handle,
            id,
            probe.pid_of(handle),
            probe.title_of(handle),
            registry.len()
        );
        probe.on_bound(handle);
        return Some(handle);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{create_test_window, MockProbe};
    use autohide_ipc::TargetApp;

    fn probe() -> MockProbe {
        MockProbe::new(TargetApp::default()).with_windows(vec![
            create_test_window(0x10, 1, "/usr/bin/firefox", 0, 0, 800, 600),
            create_test_window(0x20, 2, "/opt/sublime_text/sublime_text", 0, 0, 800, 600),
            create_test_window(0x30, 3, "sublime_text.exe", 100, 0, 800, 600),
        ])
    }

    #[test]
    fn test_binds_first_target_window() {
        let probe = probe();
        let registry = Registry::new();

        assert_eq!(register_new_window(&probe, &registry, 1), Some(0x20));
        assert_eq!(registry.lookup_id(0x20), Some(1));
        assert_eq!(probe.bound(), vec![0x20]);
    }

    #[test]
    fn test_skips_registered_windows() {
        let probe = probe();
        let registry = Registry::new();

        assert_eq!(register_new_window(&probe, &registry, 1), Some(0x20));
        assert_eq!(register_new_window(&probe, &registry, 2), Some(0x30));
        assert_eq!(register_new_window(&probe, &registry, 3), None);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_bound(3));
    }

    #[test]
    fn test_registering_same_id_twice_is_idempotent() {
        let probe = probe();
        let registry = Registry::new();

        assert_eq!(register_new_window(&probe, &registry, 1), Some(0x20));
        assert_eq!(register_new_window(&probe, &registry, 1), Some(0x20));

        assert_eq!(registry.len(), 1);
        assert_eq!(probe.bound(), vec![0x20]);
    }

    #[test]
    fn test_no_target_windows() {
        let probe = MockProbe::new(TargetApp::new("gedit"))
            .with_windows(vec![create_test_window(0x10, 1, "firefox", 0, 0, 10, 10)]);
        let registry = Registry::new();

        assert_eq!(register_new_window(&probe, &registry, 1), None);
        assert!(registry.is_empty());
        assert!(probe.bound().is_empty());
    }

    #[test]
    fn test_picks_up_windows_opened_later() {
        let probe = MockProbe::new(TargetApp::default());
        let registry = Registry::new();

        assert_eq!(register_new_window(&probe, &registry, 1), None);

        probe.add_window(create_test_window(0x40, 4, "sublime_text", 0, 0, 10, 10));
        assert_eq!(register_new_window(&probe, &registry, 1), Some(0x40));
    }
}
