use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use autohide::{NativeDriver, TargetApp, TrackerEvent, TrackingId, WindowSummary};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// autohide - pointer tracking for editor windows
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommand {
    Version(VersionCmd),
    ListWindows(ListWindowsCmd),
    Watch(WatchCmd),
}

/// Show version information
#[derive(FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCmd {}

/// List top-level windows and mark the target application's
#[derive(FromArgs)]
#[argh(subcommand, name = "list-windows")]
struct ListWindowsCmd {
    /// print one JSON object per window
    #[argh(switch)]
    json: bool,
    /// process name to match (default: sublime_text)
    #[argh(option)]
    process_name: Option<String>,
    /// native window class to match (Windows only)
    #[argh(option)]
    window_class: Option<String>,
    /// window title suffix used when the process cannot be resolved
    #[argh(option)]
    title_suffix: Option<String>,
}

/// Track target windows and print pointer move/leave events until Ctrl-C
#[derive(FromArgs)]
#[argh(subcommand, name = "watch")]
struct WatchCmd {
    /// print one JSON event per line
    #[argh(switch)]
    json: bool,
    /// interval between window discovery passes, in milliseconds
    #[argh(option, default = "500")]
    poll_ms: u64,
    /// process name to match (default: sublime_text)
    #[argh(option)]
    process_name: Option<String>,
    /// native window class to match (Windows only)
    #[argh(option)]
    window_class: Option<String>,
    /// window title suffix used when the process cannot be resolved
    #[argh(option)]
    title_suffix: Option<String>,
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        None => {
            // No subcommand - show help (simulate --help)
            let args: Vec<&str> = vec!["autohide", "--help"];
            if let Err(e) = Cli::from_args(&args[..1], &args[1..]) {
                println!("{}", e.output);
            }
            Ok(())
        }
        Some(SubCommand::Version(_)) => {
            println!("autohide {}", VERSION);
            Ok(())
        }
        Some(SubCommand::ListWindows(cmd)) => {
            init_tracing();
            let target = target_app(cmd.process_name, cmd.window_class, cmd.title_suffix);
            list_windows(target, cmd.json)
        }
        Some(SubCommand::Watch(cmd)) => {
            init_tracing();
            let target = target_app(
                cmd.process_name.clone(),
                cmd.window_class.clone(),
                cmd.title_suffix.clone(),
            );
            watch(target, &cmd)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Start from the default target and apply command-line overrides.
fn target_app(
    process_name: Option<String>,
    window_class: Option<String>,
    title_suffix: Option<String>,
) -> TargetApp {
    let mut target = match process_name {
        Some(name) => TargetApp::new(name),
        None => TargetApp::default(),
    };
    if window_class.is_some() {
        target.window_class = window_class;
    }
    if title_suffix.is_some() {
        target.title_suffix = title_suffix;
    }
    target
}

fn list_windows(target: TargetApp, json: bool) -> Result<()> {
    let driver = NativeDriver::open(target).context("Failed to open windowing system")?;

    for w in driver.list_windows() {
        if json {
            println!("{}", serde_json::to_string(&w)?);
        } else {
            println!("{}", format_window(&w));
        }
    }
    Ok(())
}

fn format_window(w: &WindowSummary) -> String {
    let geometry = match (w.x, w.y, w.width, w.height) {
        (Some(x), Some(y), Some(width), Some(height)) => {
            format!("{}x{} @ ({},{})", width, height, x, y)
        }
        _ => "no geometry".to_string(),
    };
    let pid = w
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "{}: {} [pid={}, {}]{}",
        w.handle,
        w.title.as_deref().unwrap_or(""),
        pid,
        geometry,
        if w.is_target { " *" } else { "" }
    )
}

fn format_event(event: &TrackerEvent) -> String {
    match event {
        TrackerEvent::Move { id, x, y } => format!("move  id={} ({}, {})", id, x, y),
        TrackerEvent::Leave { id } => format!("leave id={}", id),
    }
}

fn watch(target: TargetApp, cmd: &WatchCmd) -> Result<()> {
    let driver = NativeDriver::open(target).context("Failed to open windowing system")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<TrackerEvent>();
    let move_tx = tx.clone();
    let mut tracker = driver.tracker(
        move |id, x, y| {
            let _ = move_tx.send(TrackerEvent::Move { id, x, y });
        },
        move |id| {
            let _ = tx.send(TrackerEvent::Leave { id });
        },
    );
    tracker.start().context("Failed to start event tracker")?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = rt.block_on(async {
        let mut poll = tokio::time::interval(Duration::from_millis(cmd.poll_ms.max(1)));
        let mut next_id: TrackingId = 1;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    while driver.register_new_window(next_id) {
                        tracing::info!(
                            "Tracking id={} (width={:?}, pointer={:?})",
                            next_id,
                            driver.window_width(next_id),
                            driver.window_coordinates(next_id)
                        );
                        next_id += 1;
                    }
                }
                Some(event) = rx.recv() => {
                    if cmd.json {
                        println!("{}", serde_json::to_string(&event)?);
                    } else {
                        println!("{}", format_event(&event));
                    }
                }
                signal = &mut ctrl_c => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    tracing::info!("Interrupted, stopping");
                    break;
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    });

    tracker.stop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_app_defaults() {
        assert_eq!(target_app(None, None, None), TargetApp::default());
    }

    #[test]
    fn test_target_app_overrides() {
        let target = target_app(Some("gedit".to_string()), None, Some(" - gedit".to_string()));
        assert_eq!(target.process_name, "gedit");
        assert_eq!(target.window_class, None);
        assert_eq!(target.title_suffix.as_deref(), Some(" - gedit"));
    }

    #[test]
    fn test_format_event() {
        assert_eq!(
            format_event(&TrackerEvent::Move { id: 2, x: 5, y: -1 }),
            "move  id=2 (5, -1)"
        );
        assert_eq!(format_event(&TrackerEvent::Leave { id: 2 }), "leave id=2");
    }

    #[test]
    fn test_format_window() {
        let w = WindowSummary {
            handle: "0x1a".to_string(),
            pid: Some(42),
            title: Some("main.rs - Sublime Text".to_string()),
            x: Some(10),
            y: Some(20),
            width: Some(800),
            height: Some(600),
            is_target: true,
            id: Some(1),
        };
        assert_eq!(
            format_window(&w),
            "0x1a: main.rs - Sublime Text [pid=42, 800x600 @ (10,20)] *"
        );
    }
}
