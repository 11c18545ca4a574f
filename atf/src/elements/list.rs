use crate::condition::{bool_token, Condition, ConditionKey};
use crate::errors::AutomationError;

typed_element!(
    /// Read-only text.
    TextBlockElement => TEXT_BLOCK
);

typed_element!(
    /// Entry of a list box or drop-down list.
    ListBoxItemElement => LIST_BOX_ITEM
);

impl TextBlockElement {
    pub fn text(&self) -> Result<String, AutomationError> {
        self.name()
    }
}

impl ListBoxItemElement {
    pub fn is_selected(&self) -> Result<bool, AutomationError> {
        Ok(self.property(ConditionKey::IsSelected.as_str())? == bool_token(true))
    }

    /// Text of the item's own text block.
    pub fn label(&self) -> Result<String, AutomationError> {
        let text = self.find_element::<TextBlockElement>(&[Condition::parent_runtime_id(
            self.runtime_id()?,
        )])?;
        text.text()
    }
}
