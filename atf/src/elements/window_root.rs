use crate::errors::AutomationError;
use crate::keys::Key;
use tracing::debug;

typed_element!(
    /// Root element of an application window.
    WindowRootElement => WINDOW_ROOT
);

impl WindowRootElement {
    /// Presses Alt+F4 unless the window is already gone (no runtime id).
    pub fn close_window(&self) -> Result<bool, AutomationError> {
        debug!(window = %self.item().window_title(), "close window");
        if !self.runtime_id()?.is_empty() {
            self.press_key_combo(&[Key::Alt, Key::F4])?;
        }
        Ok(true)
    }

    /// Maximizes the window with Windows+ArrowUp, twice.
    pub fn bring_into_view(&self) -> Result<bool, AutomationError> {
        debug!(window = %self.item().window_title(), "bring into view");
        self.press_key_combo(&[Key::Windows, Key::ArrowUp])?;
        self.press_key_combo(&[Key::Windows, Key::ArrowUp])?;
        Ok(true)
    }
}
