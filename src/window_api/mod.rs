//! Contains logic for querying focus information from different environments.
//! [GenericFocusProbe] is the main artifact of this module that abstracts
//! the operations.

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{path::Path, sync::Arc};

use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundIdentity {
    /// Name shown to the user. For example 'Visual Studio Code' or 'firefox'
    pub application: Arc<str>,
    /// Name used for looking up window titles. Differs from application for apps like Visual
    /// Studio Code which run under 'Electron'.
    pub process_name: Arc<str>,
}

/// Intended to serve as a contract the supported systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait FocusProbe {
    /// Retrieve amount of time user has been inactive in seconds
    fn idle_seconds(&mut self) -> Result<u64>;

    fn foreground_identity(&mut self) -> Result<ForegroundIdentity>;

    /// Title of the focused window of `process_name`. May be empty.
    fn window_title(&mut self, process_name: &str) -> Result<String>;
}

/// Serves as a cross-compatible FocusProbe implementation.
pub struct GenericFocusProbe {
    inner: Box<dyn FocusProbe>,
}

impl GenericFocusProbe {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "macos")] {
                use macos::MacFocusProbe;
                Ok(Self {
                    inner: Box::new(MacFocusProbe::new()),
                })
            }
            else if #[cfg(feature = "win")] {
                use win::WindowsFocusProbe;
                Ok(Self {
                    inner: Box::new(WindowsFocusProbe::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxFocusProbe;
                Ok(Self {
                    inner: Box::new(LinuxFocusProbe::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!("No focus probe is available. Build with the win or x11 feature"))
            }
        }
    }
}

impl FocusProbe for GenericFocusProbe {
    fn idle_seconds(&mut self) -> Result<u64> {
        self.inner.idle_seconds()
    }

    fn foreground_identity(&mut self) -> Result<ForegroundIdentity> {
        self.inner.foreground_identity()
    }

    fn window_title(&mut self, process_name: &str) -> Result<String> {
        self.inner.window_title(process_name)
    }
}

/// Executable name without its directory, for example `/usr/bin/nvim` becomes `nvim`.
pub fn clean_process_name(value: &str) -> String {
    Path::new(value)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::clean_process_name;

    #[test]
    fn test_clean_process_name() {
        assert_eq!(clean_process_name("/usr/bin/nvim"), "nvim");
        assert_eq!(clean_process_name("firefox"), "firefox");
    }
}
