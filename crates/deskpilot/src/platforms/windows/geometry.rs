use crate::coords::VirtualDesktop;
use crate::platforms::DesktopGeometry;
use crate::types::Point;
use crate::AutomationError;
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

/// Reads the virtual screen metrics on every call; nothing is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsGeometry;

impl DesktopGeometry for WindowsGeometry {
    fn virtual_desktop(&self) -> Result<VirtualDesktop, AutomationError> {
        let (x, y, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };
        if width == 0 || height == 0 {
            return Err(AutomationError::PlatformError(
                "GetSystemMetrics returned an empty virtual screen".to_string(),
            ));
        }
        Ok(VirtualDesktop::new(x, y, width, height))
    }

    fn cursor_position(&self) -> Result<Point, AutomationError> {
        let mut pos = POINT { x: 0, y: 0 };
        unsafe { GetCursorPos(&mut pos)? };
        Ok(Point::new(pos.x as f64, pos.y as f64))
    }
}
