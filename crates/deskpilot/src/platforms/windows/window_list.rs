//! Top-level window enumeration with `EnumWindows`

use crate::platforms::WindowSource;
use crate::types::{Rect, WindowHandle};
use crate::window::WindowInfo;
use crate::AutomationError;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;
use windows::core::BOOL;
use windows::Win32::Foundation::{HWND, LPARAM, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindow, IsWindowVisible,
};

unsafe extern "system" fn collect_handles(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<HWND>);
    handles.push(hwnd);
    BOOL(1)
}

fn window_text(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
    }
}

fn class_name(hwnd: HWND) -> String {
    let mut buf = [0u16; 256];
    let copied = unsafe { GetClassNameW(hwnd, &mut buf) };
    String::from_utf16_lossy(&buf[..copied.max(0) as usize])
}

fn window_rect(hwnd: HWND) -> Option<Rect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
    let r = Rect::new(
        rect.left as f64,
        rect.top as f64,
        (rect.right - rect.left) as f64,
        (rect.bottom - rect.top) as f64,
    );
    (!r.is_empty()).then_some(r)
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut _)
}

/// Window list from Win32, with process names resolved through sysinfo
pub struct WindowsWindowSource {
    system: Mutex<System>,
}

impl Default for WindowsWindowSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsWindowSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn process_name(&self, pid: u32, refresh: bool) -> String {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        let pid = Pid::from_u32(pid);
        if refresh || system.process(pid).is_none() {
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }
        system
            .process(pid)
            .map(|p| p.name().to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn describe(&self, hwnd: HWND) -> WindowInfo {
        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
        WindowInfo {
            handle: WindowHandle(hwnd.0 as isize),
            title: window_text(hwnd),
            process_id: pid,
            process_name: self.process_name(pid, false),
            class_name: class_name(hwnd),
            bounds: window_rect(hwnd),
            is_visible: unsafe { IsWindowVisible(hwnd) }.as_bool(),
        }
    }
}

impl WindowSource for WindowsWindowSource {
    fn list_top_level_windows(
        &self,
        visible_only: bool,
        include_empty_titles: bool,
    ) -> Result<Vec<WindowInfo>, AutomationError> {
        let mut handles: Vec<HWND> = Vec::new();
        unsafe {
            EnumWindows(
                Some(collect_handles),
                LPARAM(&mut handles as *mut Vec<HWND> as isize),
            )?;
        }
        debug!("EnumWindows returned {} handles", handles.len());

        Ok(handles
            .into_iter()
            .filter(|hwnd| !visible_only || unsafe { IsWindowVisible(*hwnd) }.as_bool())
            .map(|hwnd| self.describe(hwnd))
            .filter(|w| include_empty_titles || !w.title.is_empty())
            .collect())
    }

    fn window_by_handle(&self, handle: WindowHandle) -> Option<WindowInfo> {
        let hwnd = to_hwnd(handle);
        if handle.0 == 0 || !unsafe { IsWindow(Some(hwnd)) }.as_bool() {
            return None;
        }
        let mut info = self.describe(hwnd);
        // Handles get reused; refresh in case the pid is new.
        info.process_name = self.process_name(info.process_id, true);
        Some(info)
    }
}
