use std::{
    io::Read,
    process::{Command, Stdio},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use tracing::{instrument, trace, warn};
use wait_timeout::ChildExt;

use super::{ForegroundIdentity, FocusProbe};

const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

const VSCODE_BUNDLE_ID: &str = "com.microsoft.VSCode";
const VSCODE_NAME: &str = "Visual Studio Code";
const VSCODE_PROCESS: &str = "Electron";
const VSCODE_TITLE_SUFFIX: &str = " — Visual Studio Code";

/// Runs a command and returns its trimmed stdout. The command is killed if it takes longer than
/// `timeout`.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to spawn {command:?}"))?;

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            warn!("{command:?} timed out after {}s", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("{command:?} timed out"));
        }
    };

    let mut output = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_string(&mut output)?;
    }
    if !status.success() {
        return Err(anyhow!("{command:?} exited with {status}"));
    }
    trace!("{command:?} returned {output:?}");
    Ok(output.trim().to_string())
}

fn run_applescript(script: &str) -> Result<String> {
    run_with_timeout(Command::new("osascript").args(["-e", script]), QUERY_TIMEOUT)
}

fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extracts `HIDIdleTime` (nanoseconds) from `ioreg` output.
fn parse_hid_idle_seconds(ioreg: &str) -> Option<u64> {
    ioreg
        .lines()
        .find(|line| line.contains("\"HIDIdleTime\""))?
        .split_whitespace()
        .last()?
        .parse::<u64>()
        .ok()
        .map(|ns| ns / 1_000_000_000)
}

fn visual_studio_code_identity(name: &str, bundle_id: &str) -> ForegroundIdentity {
    if bundle_id == VSCODE_BUNDLE_ID {
        ForegroundIdentity {
            application: VSCODE_NAME.into(),
            process_name: VSCODE_PROCESS.into(),
        }
    } else {
        ForegroundIdentity {
            application: name.into(),
            process_name: name.into(),
        }
    }
}

/// Queries System Events through `osascript`. Requires accessibility permissions for window
/// titles.
pub struct MacFocusProbe {
    timeout: Duration,
}

impl MacFocusProbe {
    pub fn new() -> Self {
        Self {
            timeout: QUERY_TIMEOUT,
        }
    }
}

impl Default for MacFocusProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusProbe for MacFocusProbe {
    #[instrument(skip(self))]
    fn idle_seconds(&mut self) -> Result<u64> {
        let output = run_with_timeout(
            Command::new("ioreg").args(["-r", "-d", "1", "-c", "IOHIDSystem"]),
            self.timeout,
        )?;
        parse_hid_idle_seconds(&output).ok_or_else(|| anyhow!("HIDIdleTime is missing"))
    }

    #[instrument(skip(self))]
    fn foreground_identity(&mut self) -> Result<ForegroundIdentity> {
        let name = run_applescript(
            r#"tell application "System Events" to get name of first process whose frontmost is true"#,
        )?;
        // Bundle id is only needed for the Visual Studio Code rename.
        let bundle_id =
            run_applescript(r#"id of application (path to frontmost application as text)"#)
                .unwrap_or_default();
        Ok(visual_studio_code_identity(&name, &bundle_id))
    }

    #[instrument(skip(self))]
    fn window_title(&mut self, process_name: &str) -> Result<String> {
        let script = format!(
            r#"tell application "System Events" to tell process "{}" to get value of attribute "AXTitle" of window 1"#,
            escape_applescript(process_name)
        );
        let title = run_applescript(&script)?;
        Ok(title
            .strip_suffix(VSCODE_TITLE_SUFFIX)
            .map(str::to_string)
            .unwrap_or(title))
    }
}
