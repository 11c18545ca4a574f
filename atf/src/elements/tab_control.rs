use crate::condition::Condition;
use crate::elements::TextBlockElement;
use crate::errors::AutomationError;
use tracing::debug;

typed_element!(TabControlElement => TAB_CONTROL);

typed_element!(TabItemElement => TAB_ITEM);

impl TabControlElement {
    /// Tabs directly beneath this control.
    pub fn tab_items(&self) -> Result<Vec<TabItemElement>, AutomationError> {
        debug!("get tab items");
        self.find_all_elements(&[Condition::parent_runtime_id(self.runtime_id()?)])
    }
}

impl TabItemElement {
    /// Header text, `None` when the tab has no text block.
    pub fn header_text(&self) -> Option<String> {
        self.try_find_element::<TextBlockElement>(&[])
            .and_then(|header| header.text().ok())
    }
}
