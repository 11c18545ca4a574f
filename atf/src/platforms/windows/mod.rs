//! In-process backend over Windows UI Automation.

mod adapter;
mod item;
mod keymap;
mod provider;

pub use adapter::{UiaAdapter, UiaHandle};
pub use item::UiaUiItem;
pub use keymap::UIA_KEYS;
pub use provider::UiaNavigationProvider;

use crate::errors::AutomationError;
use std::sync::Arc;
use tracing::debug;
use uiautomation::UIAutomation;
use windows::core::HRESULT;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

/// Class name of the desktop window.
pub const DESKTOP_CLASS_NAME: &str = "#32769";

// RPC_E_CHANGED_MODE: COM is already initialized on this thread
const COM_ALREADY_INITIALIZED: HRESULT = HRESULT(0x80010106u32 as i32);

// thread-safety
#[derive(Clone)]
pub struct ThreadSafeAutomation(pub Arc<UIAutomation>);

unsafe impl Send for ThreadSafeAutomation {}
unsafe impl Sync for ThreadSafeAutomation {}

#[derive(Clone)]
pub struct ThreadSafeElement(pub Arc<uiautomation::UIElement>);

unsafe impl Send for ThreadSafeElement {}
unsafe impl Sync for ThreadSafeElement {}

/// Initializes COM for the calling thread and creates the automation client.
pub(crate) fn create_automation() -> Result<ThreadSafeAutomation, AutomationError> {
    unsafe {
        let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
        if hr.is_err() && hr != COM_ALREADY_INITIALIZED {
            return Err(AutomationError::PlatformError(format!(
                "Failed to initialize COM in multithreaded mode: {hr}"
            )));
        }
        if hr == COM_ALREADY_INITIALIZED {
            debug!("COM already initialized in this thread");
        }
    }
    let automation =
        UIAutomation::new_direct().map_err(|e| AutomationError::PlatformError(e.to_string()))?;
    Ok(ThreadSafeAutomation(Arc::new(automation)))
}

pub(crate) fn platform_error(context: &str) -> impl Fn(uiautomation::Error) -> AutomationError + '_ {
    move |e| AutomationError::PlatformError(format!("{context}: {e}"))
}
