use std::{
    env, io,
    path::{self, PathBuf},
};

use anyhow::{anyhow, Result};
use tracing::warn;

pub const APPLICATION_DIR: &str = "focus-tracker";

/// Directory for tracker state: daemon logs and, unless configured otherwise, daily summaries.
pub fn create_application_default_path() -> Result<PathBuf> {
    let path = application_default_path()?;

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Same as [create_application_default_path] without touching the file system.
pub fn application_default_path() -> Result<PathBuf> {
    Ok(application_base_path()?.join(APPLICATION_DIR))
}

fn application_base_path() -> Result<PathBuf> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))
        } else if #[cfg(target_os = "macos")] {
            env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .map_err(|_| anyhow!("Couldn't find HOME"))
        } else {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
        }
    }
}

/// Resolves `path` against the current directory. The tracker changes its working directory to
/// `/` once it starts, so user supplied paths have to be resolved before that.
pub fn absolute_path(path: PathBuf) -> PathBuf {
    match path::absolute(&path) {
        Ok(absolute) => absolute,
        Err(e) => {
            warn!("Could not resolve {path:?} {e:?}");
            path
        }
    }
}
