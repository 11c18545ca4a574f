use crate::errors::AutomationError;
use crate::keys::Key;
use tracing::debug;

const TEXT_PROPERTY: &str = "Value.Value";
const IS_READ_ONLY_PROPERTY: &str = "Value.IsReadOnly";

typed_element!(
    /// Editable text field.
    TextBoxElement => TEXT_BOX
);

impl TextBoxElement {
    pub fn text(&self) -> Result<String, AutomationError> {
        self.property(TEXT_PROPERTY)
    }

    pub fn is_read_only(&self) -> Result<bool, AutomationError> {
        Ok(self.property(IS_READ_ONLY_PROPERTY)? == "True")
    }

    /// Replaces the content: select all, type `value`, then Tab out to commit.
    pub fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        debug!("set text box value");
        self.wait_for_enabled(None);
        self.select_all()?.send_keys(value)?.press_key(Key::Tab)?;
        Ok(())
    }

    pub fn select_all(&self) -> Result<&Self, AutomationError> {
        self.item().select_all()?;
        Ok(self)
    }

    pub fn move_caret_left(&self) -> Result<&Self, AutomationError> {
        self.item().move_caret_left()?;
        Ok(self)
    }

    pub fn move_caret_right(&self) -> Result<&Self, AutomationError> {
        self.item().move_caret_right()?;
        Ok(self)
    }

    pub fn move_caret_to_begin(&self) -> Result<&Self, AutomationError> {
        self.item().move_caret_to_begin()?;
        Ok(self)
    }

    pub fn move_caret_to_end(&self) -> Result<&Self, AutomationError> {
        self.item().move_caret_to_end()?;
        Ok(self)
    }

    pub fn copy_to_clipboard(&self) -> Result<bool, AutomationError> {
        self.item().copy_to_clipboard()?;
        Ok(true)
    }

    pub fn paste_from_clipboard(&self) -> Result<bool, AutomationError> {
        self.item().paste_from_clipboard()?;
        Ok(true)
    }
}
