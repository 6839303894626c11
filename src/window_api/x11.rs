use anyhow::{anyhow, Result};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::instrument;
use xcb::{
    screensaver::{QueryInfo, QueryInfoReply},
    x::{self, Atom, Drawable, GetProperty, GrabServer, InternAtom, UngrabServer, Window, ATOM_ANY},
    Connection,
};

use super::{clean_process_name, FocusProbe, ForegroundIdentity};

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Window> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    result
        .value::<Window>()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("No active window"))
}

fn get_name(conn: &Connection, window: Window, wm_name_atom: Atom) -> Result<String> {
    let wm_name = conn.wait_for_reply(conn.send_request(&x::GetProperty {
        delete: false,
        window,
        property: wm_name_atom,
        r#type: x::ATOM_ANY,
        long_offset: 0,
        long_length: 1024,
    }))?;
    Ok(String::from_utf8_lossy(wm_name.value()).to_string())
}

/// Uses EWMH properties of the active window. Application is the executable name of the window
/// owner, the process name is its full path.
pub struct LinuxFocusProbe {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
    window_name_atom: Atom,
    pid_atom: Atom,
    system: System,
}

impl LinuxFocusProbe {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let window_name_atom = intern_atom(&connection, b"_NET_WM_NAME")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen: preferred_screen.max(0) as usize,
            active_window_atom,
            window_name_atom,
            pid_atom,
            system: System::new(),
        })
    }

    fn root(&self) -> Result<Window> {
        // Currently the application only supports 1 x11 screen.
        self.connection
            .get_setup()
            .roots()
            .nth(self.preferred_screen)
            .map(|screen| screen.root())
            .ok_or_else(|| anyhow!("Screen {} is missing", self.preferred_screen))
    }

    fn active_window(&self) -> Result<Window> {
        get_active_window(&self.connection, self.root()?, self.active_window_atom)
    }

    fn process_path(&mut self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(sysinfo::UpdateKind::OnlyIfNotSet),
        );
        self.system
            .process(pid)?
            .exe()
            .and_then(|v| v.to_str())
            .map(|v| v.to_string())
    }

    fn identity_inner(&mut self) -> Result<ForegroundIdentity> {
        let window = self.active_window()?;
        let pid = get_pid(&self.connection, window, self.pid_atom)?
            .ok_or_else(|| anyhow!("Active window has no _NET_WM_PID"))?;
        let path = self
            .process_path(pid)
            .ok_or_else(|| anyhow!("Process {pid} is gone"))?;
        Ok(ForegroundIdentity {
            application: clean_process_name(&path).into(),
            process_name: path.into(),
        })
    }
}

impl FocusProbe for LinuxFocusProbe {
    #[instrument(skip(self))]
    fn idle_seconds(&mut self) -> Result<u64> {
        let idle = self.connection.send_request(&QueryInfo {
            drawable: Drawable::Window(self.root()?),
        });
        let reply: QueryInfoReply = self.connection.wait_for_reply(idle)?;
        Ok(u64::from(reply.ms_since_user_input()) / 1000)
    }

    #[instrument(skip(self))]
    fn foreground_identity(&mut self) -> Result<ForegroundIdentity> {
        let _ = self.connection.send_request(&GrabServer {});
        let result = self.identity_inner();
        let _ = self.connection.send_request(&UngrabServer {});
        result
    }

    /// X11 titles belong to windows rather than processes, so the title of the active window is
    /// returned.
    #[instrument(skip(self))]
    fn window_title(&mut self, _process_name: &str) -> Result<String> {
        let window = self.active_window()?;
        get_name(&self.connection, window, self.window_name_atom)
    }
}
