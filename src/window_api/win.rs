use anyhow::{anyhow, Result};
use tracing::error;
use windows::{
    core::PWSTR,
    Win32::{
        Foundation::{CloseHandle, GetLastError, BOOL, HANDLE, HWND},
        System::{
            Diagnostics::Debug::{
                FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
            },
            SystemInformation::GetTickCount64,
            SystemServices::{LANG_ENGLISH, SUBLANG_ENGLISH_US},
            Threading::{
                OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
                PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
            },
        },
        UI::{
            Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO},
            WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
        },
    },
};

use super::{clean_process_name, FocusProbe, ForegroundIdentity};

fn foreground_window() -> Result<HWND> {
    let window = unsafe { GetForegroundWindow() };
    if window.is_invalid() {
        return Err(anyhow!("Failed to get foreground window"));
    }
    Ok(window)
}

fn last_error_message() -> String {
    let err = unsafe { GetLastError() };
    let mut message_buffer = [0u16; 2048];
    let size = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            None,
            err.0,
            LANG_ENGLISH | (SUBLANG_ENGLISH_US << 10),
            PWSTR::from_raw(message_buffer.as_mut_ptr()),
            2048,
            None,
        )
    };
    String::from_utf16_lossy(&message_buffer[0..size as usize])
}

#[tracing::instrument]
pub fn get_foreground_process_path() -> Result<String> {
    let window = foreground_window()?;

    let mut id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut id)) };
    if id == 0 {
        return Err(anyhow!(
            "Failed to get owner of the foreground window {}",
            last_error_message()
        ));
    }
    let process_handle = unsafe {
        OpenProcess(
            PROCESS_QUERY_INFORMATION | PROCESS_VM_READ,
            BOOL::from(false),
            id,
        )
    }
    .inspect_err(|e| error!("Failed to open process {e:?}"))?;

    let mut text: [u16; 4096] = [0; 4096];
    let process_path = unsafe { get_window_process_path(process_handle, &mut text) }
        .inspect_err(|e| error!("Failed to get window process path {e:?}"));

    unsafe { CloseHandle(process_handle) }
        .inspect_err(|e| error!("Failed to close handle {e:?}"))?;

    process_path
}

unsafe fn get_window_process_path(window_handle: HANDLE, text: &mut [u16]) -> Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            window_handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

fn get_window_title(window_handle: HWND) -> String {
    let mut text: [u16; 4096] = [0; 4096];
    let len = unsafe { GetWindowTextW(window_handle, &mut text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

pub fn get_idle_seconds() -> Result<u64> {
    let mut last: LASTINPUTINFO = LASTINPUTINFO {
        cbSize: size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let is_success = unsafe { GetLastInputInfo(&mut last) };
    if !is_success.as_bool() {
        return Err(anyhow!("Failed to retrieve user idle time"));
    }

    let tick_count = unsafe { GetTickCount64() };
    Ok(tick_count.saturating_sub(last.dwTime as u64) / 1000)
}

/// Uses the foreground window. Application is the executable name, the process name is its full
/// path.
pub struct WindowsFocusProbe {}

impl WindowsFocusProbe {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsFocusProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusProbe for WindowsFocusProbe {
    fn idle_seconds(&mut self) -> Result<u64> {
        get_idle_seconds().inspect_err(|e| error!("Failed to get idle time {e:?}"))
    }

    fn foreground_identity(&mut self) -> Result<ForegroundIdentity> {
        let path = get_foreground_process_path()
            .inspect_err(|e| error!("Failed to get active window {e:?}"))?;
        Ok(ForegroundIdentity {
            application: clean_process_name(&path).into(),
            process_name: path.into(),
        })
    }

    /// Titles belong to windows, so the title of the foreground window is returned.
    fn window_title(&mut self, _process_name: &str) -> Result<String> {
        Ok(get_window_title(foreground_window()?))
    }
}
