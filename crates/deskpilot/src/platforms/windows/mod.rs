//! Windows platform implementation
//!
//! UI Automation (through the uiautomation crate) for the tree, Win32 for
//! window enumeration, display geometry and `SendInput`.

pub mod geometry;
pub mod input;
pub mod tree;
pub mod window_list;

pub use geometry::WindowsGeometry;
pub use input::SendInputSink;
pub use tree::{WindowsTree, WindowsUiElement};
pub use window_list::WindowsWindowSource;

use crate::platforms::Platform;
use crate::AutomationError;
use std::sync::Arc;
use tracing::{debug, info};
use windows::core::HRESULT;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

/// COM was already initialized on this thread with a different model
const RPC_E_CHANGED_MODE: HRESULT = HRESULT(0x80010106u32 as i32);

pub(crate) fn ensure_com_initialized() -> Result<(), AutomationError> {
    let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
    if hr.is_err() && hr != RPC_E_CHANGED_MODE {
        return Err(AutomationError::PlatformError(format!(
            "Failed to initialize COM: {hr:?}"
        )));
    }
    if hr == RPC_E_CHANGED_MODE {
        debug!("COM already initialized with a different threading model");
    }
    Ok(())
}

pub fn create_windows_platform() -> Result<Platform, AutomationError> {
    ensure_com_initialized()?;
    let tree = WindowsTree::new()?;
    info!("windows platform ready");
    Ok(Platform::new(
        Arc::new(tree),
        Arc::new(WindowsWindowSource::new()),
        Arc::new(SendInputSink),
        Arc::new(WindowsGeometry),
    ))
}
