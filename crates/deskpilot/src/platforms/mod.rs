//! Seams to the operating system
//!
//! The core never talks to the OS directly. Each external collaborator is a
//! trait here, and a [`Platform`] bundles one implementation of each.

use crate::coords::VirtualDesktop;
use crate::element::UiElement;
use crate::input::InputEvent;
use crate::types::{Point, WindowHandle};
use crate::window::WindowInfo;
use crate::AutomationError;
use std::sync::Arc;

pub mod memory;

#[cfg(target_os = "windows")]
pub mod windows;

/// Entry points into the accessibility tree
pub trait TreeProvider: Send + Sync {
    fn desktop_root(&self) -> Result<UiElement, AutomationError>;

    /// Tree node for a top-level window. `None` if the window is gone.
    fn element_for_window(&self, handle: WindowHandle) -> Option<UiElement>;
}

/// Top-level window enumeration
pub trait WindowSource: Send + Sync {
    /// Windows in OS enumeration order, stable within one call only
    fn list_top_level_windows(
        &self,
        visible_only: bool,
        include_empty_titles: bool,
    ) -> Result<Vec<WindowInfo>, AutomationError>;

    /// Direct lookup without enumeration. `None` if the handle is no longer valid.
    fn window_by_handle(&self, handle: WindowHandle) -> Option<WindowInfo>;
}

/// Final submission of an ordered batch of input events
pub trait InputSink: Send + Sync {
    /// Submit `batch` as one injection call and report how many events were
    /// accepted. Partial acceptance is not an error.
    fn send(&self, batch: &[InputEvent]) -> Result<usize, AutomationError>;
}

/// Display geometry. Re-query per gesture, monitors can be hot-plugged.
pub trait DesktopGeometry: Send + Sync {
    fn virtual_desktop(&self) -> Result<VirtualDesktop, AutomationError>;
    fn cursor_position(&self) -> Result<Point, AutomationError>;
}

/// One implementation of every collaborator
#[derive(Clone)]
pub struct Platform {
    pub tree: Arc<dyn TreeProvider>,
    pub windows: Arc<dyn WindowSource>,
    pub input: Arc<dyn InputSink>,
    pub geometry: Arc<dyn DesktopGeometry>,
}

impl Platform {
    pub fn new(
        tree: Arc<dyn TreeProvider>,
        windows: Arc<dyn WindowSource>,
        input: Arc<dyn InputSink>,
        geometry: Arc<dyn DesktopGeometry>,
    ) -> Self {
        Self {
            tree,
            windows,
            input,
            geometry,
        }
    }

    /// Replace the input sink, keeping every other collaborator
    pub fn with_input(mut self, input: Arc<dyn InputSink>) -> Self {
        self.input = input;
        self
    }
}

/// Build the platform for the current operating system
#[cfg(target_os = "windows")]
pub fn create_platform() -> Result<Platform, AutomationError> {
    windows::create_windows_platform()
}

/// Build the platform for the current operating system
#[cfg(not(target_os = "windows"))]
pub fn create_platform() -> Result<Platform, AutomationError> {
    Err(AutomationError::UnsupportedPlatform(format!(
        "no accessibility backend for '{}'; only Windows is supported",
        std::env::consts::OS
    )))
}
