//! Remote backend speaking the WebDriver JSON wire protocol to WinAppDriver
//! or an Appium Windows driver.

mod adapter;
mod client;
mod item;
mod keymap;
mod provider;

pub use adapter::{locator, AppiumAdapter};
pub use client::{is_no_such_element, AppiumSession};
pub use item::AppiumUiItem;
pub use keymap::APPIUM_KEYS;
pub use provider::AppiumNavigationProvider;

/// Class name of the desktop window.
pub const DESKTOP_CLASS_NAME: &str = "#32769";
