use std::process::Command;

/// Executable name of a running process, as reported by `ps`.
pub fn process_name(pid: u32) -> Option<String> {
    let output = Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "comm="])
        .output()
        .map_err(|e| tracing::debug!("Failed to run ps for pid {}: {}", pid, e))
        .ok()?;

    if !output.status.success() {
        tracing::trace!("ps found no process {}", pid);
        return None;
    }

    parse_ps_output(&String::from_utf8_lossy(&output.stdout))
}

/// Last non-empty line of `ps -o comm=` output, trimmed.
fn parse_ps_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}
