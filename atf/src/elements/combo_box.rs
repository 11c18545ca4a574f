use crate::condition::Condition;
use crate::elements::ListBoxItemElement;
use crate::errors::AutomationError;
use crate::keys::Key;
use tracing::debug;

typed_element!(
    /// Drop-down selector. Reading it opens and closes the list.
    ComboBoxElement => COMBO_BOX
);

impl ComboBoxElement {
    /// Opens the list, reads the selected entry and closes the list again.
    pub fn selected_item(&self) -> Result<ListBoxItemElement, AutomationError> {
        debug!("get selected item");
        self.open()?;
        let item = self.find_element::<ListBoxItemElement>(&[
            Condition::parent_runtime_id(self.runtime_id()?),
            Condition::is_selected(true),
        ]);
        self.item().press_key(Key::Escape)?;
        item
    }

    /// Opens the list and returns all of its entries.
    pub fn items(&self) -> Result<Vec<ListBoxItemElement>, AutomationError> {
        debug!("get items");
        self.open()?;
        let items = self.list_items();
        self.item().press_key(Key::Escape)?;
        items
    }

    /// Selects the entry at `index`.
    pub fn set_by_index(&self, index: usize) -> Result<(), AutomationError> {
        debug!(index, "select item by index");
        self.wait_for_enabled(None);
        self.open()?;
        let items = self.list_items()?;
        let item = items.get(index).ok_or_else(|| {
            AutomationError::InvalidArgument(format!(
                "index {index} out of range for {} items",
                items.len()
            ))
        })?;
        item.item().hover()?;
        item.click()
    }

    /// Selects the first entry labelled `text`.
    pub fn set_by_text(&self, text: &str) -> Result<(), AutomationError> {
        debug!(text, "select item by text");
        self.wait_for_enabled(None);
        self.open()?;
        for item in self.list_items()? {
            if item.label()? == text {
                item.item().hover()?;
                return item.click();
            }
        }
        self.item().press_key(Key::Escape)?;
        Err(AutomationError::ElementNotFound(format!(
            "combo box has no item labelled {text:?}"
        )))
    }

    fn open(&self) -> Result<(), AutomationError> {
        self.click()?;
        self.navigation().awaiting().wait_for_default_action_delay();
        Ok(())
    }

    fn list_items(&self) -> Result<Vec<ListBoxItemElement>, AutomationError> {
        self.find_all_elements(&[Condition::parent_runtime_id(self.runtime_id()?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::test_support::open_window;
    use crate::keys::KeyStroke;
    use crate::testing::{InMemoryTree, InputEvent};
    use std::sync::Arc;

    fn units() -> (Arc<crate::testing::InMemoryNavigation>, ComboBoxElement) {
        let tree = Arc::new(InMemoryTree::new());
        let window = tree.add(tree.root(), [("Name", "Units")]);
        let combo = tree.add(window, [("ClassName", "ComboBox"), ("IsEnabled", "True")]);
        for (label, selected) in [("mm", "False"), ("cm", "True"), ("m", "False")] {
            let item = tree.add(
                combo,
                [
                    ("ClassName", "ListBoxItem"),
                    ("SelectionItem.IsSelected", selected),
                    ("IsEnabled", "True"),
                ],
            );
            tree.add(item, [("ClassName", "TextBlock"), ("Name", label)]);
        }
        let (navigation, root) = open_window(tree, "Units");
        let combo = root.find_element::<ComboBoxElement>(&[]).unwrap();
        (navigation, combo)
    }

    #[test]
    fn selected_item_opens_and_closes_the_list() {
        let (navigation, combo) = units();
        navigation.tree().clear_input();

        let selected = combo.selected_item().unwrap();

        assert_eq!(selected.label().unwrap(), "cm");
        assert!(selected.is_selected().unwrap());
        let input = navigation.tree().input();
        assert!(matches!(input[1], InputEvent::Click { .. }));
        assert!(input
            .iter()
            .any(|e| matches!(e, InputEvent::Key(_, KeyStroke::Press(Key::Escape)))));
    }

    #[test]
    fn set_by_text_clicks_the_matching_entry() {
        let (navigation, combo) = units();
        navigation.tree().clear_input();

        combo.set_by_text("m").unwrap();

        let clicks = navigation
            .tree()
            .input()
            .into_iter()
            .filter(|e| matches!(e, InputEvent::Click { .. }))
            .count();
        assert_eq!(clicks, 2);
    }

    #[test]
    fn set_by_index_out_of_range() {
        let (_, combo) = units();
        let err = combo.set_by_index(7).unwrap_err();
        assert!(matches!(err, AutomationError::InvalidArgument(_)));
    }
}
