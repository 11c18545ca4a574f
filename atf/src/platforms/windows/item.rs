use super::adapter::{UiaAdapter, UiaHandle};
use super::{keymap, platform_error};
use crate::errors::AutomationError;
use crate::keys::{Key, MouseButton};
use crate::platforms::BackendAdapter;
use crate::search::SearchScope;
use crate::wrapper::{Bounds, ItemContext, UiItemImpl};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, trace};
use uiautomation::inputs::Mouse;
use uiautomation::types::Point;
use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

/// One UI Automation element.
#[derive(Debug, Clone)]
pub struct UiaUiItem {
    adapter: Arc<UiaAdapter>,
    handle: UiaHandle,
    context: ItemContext,
}

impl UiaUiItem {
    pub fn new(adapter: Arc<UiaAdapter>, handle: UiaHandle, context: ItemContext) -> Self {
        Self {
            adapter,
            handle,
            context,
        }
    }

    pub fn handle(&self) -> &UiaHandle {
        &self.handle
    }

    /// Keyboard input goes to the focused control.
    fn focus(&self) -> Result<(), AutomationError> {
        let element = self.handle.element();
        if !element.has_keyboard_focus().unwrap_or(false) {
            trace!(runtime_id = self.handle.runtime_id(), "setting focus");
            element
                .set_focus()
                .map_err(platform_error("Failed to set focus"))?;
        }
        Ok(())
    }

    fn target_point(&self, x_offset: i32, y_offset: i32) -> Result<Point, AutomationError> {
        if x_offset == 0 && y_offset == 0 {
            if let Ok(Some(point)) = self.handle.element().get_clickable_point() {
                return Ok(point);
            }
            debug!("clickable point unavailable, falling back to bounding rectangle");
        }
        let (x, y) = self.adapter.bounds(&self.handle)?.center();
        Ok(Point::new(x as i32 + x_offset, y as i32 + y_offset))
    }

    fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        let bounds = self.adapter.bounds(&self.handle)?;
        let (left, top) = (bounds.x as i32, bounds.y as i32);
        let (width, height) = (bounds.width as i32, bounds.height as i32);

        let monitors = xcap::Monitor::all()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to get monitors: {e}")))?;
        let mut containing = None;
        for monitor in monitors {
            let mx = monitor.x().map_err(|e| {
                AutomationError::PlatformError(format!("Failed to get monitor x: {e}"))
            })?;
            let my = monitor.y().map_err(|e| {
                AutomationError::PlatformError(format!("Failed to get monitor y: {e}"))
            })?;
            let mw = monitor.width().map_err(|e| {
                AutomationError::PlatformError(format!("Failed to get monitor width: {e}"))
            })? as i32;
            let mh = monitor.height().map_err(|e| {
                AutomationError::PlatformError(format!("Failed to get monitor height: {e}"))
            })? as i32;
            if left < mx + mw && left + width > mx && top < my + mh && top + height > my {
                containing = Some((monitor, mx, my, mw, mh));
                break;
            }
        }
        let Some((monitor, mx, my, mw, mh)) = containing else {
            return Err(AutomationError::PlatformError(
                "Element is not visible on any monitor".to_string(),
            ));
        };

        let rel_x = (left - mx).max(0) as u32;
        let rel_y = (top - my).max(0) as u32;
        // a zero sized element still yields a 1x1 image
        let rel_width = (width.min(mw - rel_x as i32)).max(1) as u32;
        let rel_height = (height.min(mh - rel_y as i32)).max(1) as u32;

        let capture = monitor
            .capture_region(rel_x, rel_y, rel_width, rel_height)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to capture region: {e}")))?;
        let (w, h) = (capture.width(), capture.height());
        let image = RgbaImage::from_raw(w, h, capture.into_raw()).ok_or_else(|| {
            AutomationError::PlatformError("captured buffer does not match its size".to_string())
        })?;
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to encode PNG: {e}")))?;
        Ok(png)
    }
}

impl UiItemImpl for UiaUiItem {
    fn object_id(&self) -> String {
        self.handle.runtime_id().to_string()
    }

    fn context(&self) -> &ItemContext {
        &self.context
    }

    fn property(&self, name: &str) -> Result<String, AutomationError> {
        self.adapter.read_property(&self.handle, name)
    }

    fn is_visible(&self) -> Result<bool, AutomationError> {
        if self.adapter.bounds(&self.handle)?.is_empty() {
            return Ok(false);
        }
        let offscreen = self
            .handle
            .element()
            .is_offscreen()
            .map_err(platform_error("Failed to read IsOffscreen"))?;
        trace!(offscreen, "element offscreen flag");
        Ok(!offscreen)
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.adapter.bounds(&self.handle)
    }

    fn click(&self, button: MouseButton, x_offset: i32, y_offset: i32) -> Result<(), AutomationError> {
        let point = self.target_point(x_offset, y_offset)?;
        let mouse = Mouse::default();
        match button {
            MouseButton::Left => mouse.click(point),
            MouseButton::Right => mouse.right_click(point),
            MouseButton::Undefined => {
                return Err(AutomationError::InvalidArgument(
                    "mouse button must be defined".to_string(),
                ))
            }
        }
        .map_err(|e| AutomationError::PlatformError(e.to_string()))
    }

    fn double_click(&self) -> Result<(), AutomationError> {
        let point = self.target_point(0, 0)?;
        Mouse::default()
            .double_click(point)
            .map_err(|e| AutomationError::PlatformError(e.to_string()))
    }

    fn hover(&self) -> Result<(), AutomationError> {
        let point = self.target_point(0, 0)?;
        unsafe { SetCursorPos(point.get_x(), point.get_y()) }
            .map_err(|e| AutomationError::PlatformError(format!("Failed to move cursor: {e}")))
    }

    fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.focus()?;
        self.handle
            .element()
            .send_text(text, 10)
            .map_err(|e| AutomationError::PlatformError(e.to_string()))
    }

    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        self.focus()?;
        keymap::press_key(key)
    }

    fn press_modified_key(&self, modifier: Key, c: char) -> Result<(), AutomationError> {
        self.focus()?;
        keymap::press_modified_key(modifier, c)
    }

    fn press_key_combo(&self, keys: &[Key]) -> Result<(), AutomationError> {
        self.focus()?;
        keymap::press_key_combo(keys)
    }

    fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        self.capture()
    }

    fn clone_box(&self) -> Box<dyn UiItemImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl SearchScope for UiaUiItem {
    type Adapter = UiaAdapter;

    fn adapter(&self) -> &UiaAdapter {
        &self.adapter
    }

    fn handle(&self) -> Option<&UiaHandle> {
        Some(&self.handle)
    }

    fn wrap_child(&self, handle: UiaHandle) -> Result<Self, AutomationError> {
        Ok(Self {
            adapter: self.adapter.clone(),
            handle,
            context: self.context.child()?,
        })
    }
}
