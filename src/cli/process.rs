use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::{debug, info};

use crate::config::TrackerArgs;

use super::daemon_path::to_daemon_path;

/// Terminates every process started from one of `names`, except the current process and its
/// children. Returns the number of stopped processes.
pub fn kill_previous_servers(names: &[PathBuf]) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| names.iter().any(|name| name.as_path() == *v))
            .is_some()
        {
            debug!("Stopping {pid} {:?}", process.exe());
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Executables that may be running a tracker: the daemon binary and this cli running `serve`.
pub fn tracker_executables() -> Result<Vec<PathBuf>> {
    let current = env::current_exe()?;
    Ok(vec![to_daemon_path(current.clone()), current])
}

/// Shuts down previous trackers and starts a new daemon with the given configuration.
pub fn restart_server(dir: Option<&Path>, tracker: &TrackerArgs) -> Result<()> {
    let executables = tracker_executables()?;
    let stopped = kill_previous_servers(&executables)?;
    info!("Stopped {stopped} previous trackers");

    let daemon = to_daemon_path(env::current_exe()?);
    let mut command = std::process::Command::new(&daemon);
    if let Some(dir) = dir {
        command.arg("--dir").arg(dir);
    }
    command.args(tracker.to_flags());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    println!("Spawning {daemon:?}");
    // The daemon detaches by itself, so waiting only covers the launcher.
    let status = command.spawn()?.wait()?;
    if !status.success() {
        return Err(anyhow!("Daemon exited with {status}"));
    }
    println!("Success");
    Ok(())
}
