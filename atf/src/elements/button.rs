use crate::errors::AutomationError;
use tracing::trace;

const TOGGLE_STATE_PROPERTY: &str = "Toggle.ToggleState";

typed_element!(
    /// Push or toggle button.
    ButtonElement => BUTTON
);

typed_element!(CheckBoxElement => CHECK_BOX);

typed_element!(ImageElement => IMAGE);

impl ButtonElement {
    /// `true` when a toggle button is pressed in.
    pub fn is_toggle_on(&self) -> Result<bool, AutomationError> {
        let value = self.property(TOGGLE_STATE_PROPERTY)?;
        trace!("toggle state is {value}");
        Ok(value == "1")
    }
}

impl CheckBoxElement {
    pub fn is_checked(&self) -> Result<bool, AutomationError> {
        Ok(self.property(TOGGLE_STATE_PROPERTY)? == "1")
    }
}
