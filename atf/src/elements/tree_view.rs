use crate::condition::Condition;
use crate::elements::ButtonElement;
use crate::errors::AutomationError;
use tracing::debug;

const EXPAND_COLLAPSE_STATE_PROPERTY: &str = "ExpandCollapse.ExpandCollapseState";
const EXPANDER_AUTOMATION_ID: &str = "Expander";

typed_element!(TreeViewElement => TREE_VIEW);

typed_element!(TreeViewItemElement => TREE_VIEW_ITEM);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeViewItemState {
    Undefined,
    Collapsed,
    Expanded,
    Leaf,
}

impl TreeViewItemState {
    fn parse(value: &str) -> Self {
        match value {
            "Collapsed" => Self::Collapsed,
            "Expanded" => Self::Expanded,
            "LeafNode" => Self::Leaf,
            _ => Self::Undefined,
        }
    }
}

impl TreeViewElement {
    /// Top-level items of the tree.
    pub fn items(&self) -> Result<Vec<TreeViewItemElement>, AutomationError> {
        child_items(self)
    }
}

fn child_items(parent: &crate::element::Element) -> Result<Vec<TreeViewItemElement>, AutomationError> {
    parent.find_all_elements(&[Condition::parent_runtime_id(parent.runtime_id()?)])
}

impl TreeViewItemElement {
    pub fn state(&self) -> Result<TreeViewItemState, AutomationError> {
        Ok(TreeViewItemState::parse(
            &self.property(EXPAND_COLLAPSE_STATE_PROPERTY)?,
        ))
    }

    pub fn items(&self) -> Result<Vec<TreeViewItemElement>, AutomationError> {
        child_items(self)
    }

    /// Expands the item with its expander button and returns its children.
    /// The flag is `false` when the item was already expanded or is a leaf.
    pub fn try_expand(&self) -> Result<(Vec<TreeViewItemElement>, bool), AutomationError> {
        let state = self.state()?;
        if matches!(state, TreeViewItemState::Expanded | TreeViewItemState::Leaf) {
            return Ok((self.items()?, false));
        }
        debug!(?state, "expand tree view item");
        self.toggle_expander()?;
        Ok((self.items()?, true))
    }

    /// Collapses the item. `false` when it was collapsed already or is a leaf.
    pub fn try_collapse(&self) -> Result<bool, AutomationError> {
        let state = self.state()?;
        if matches!(state, TreeViewItemState::Collapsed | TreeViewItemState::Leaf) {
            return Ok(false);
        }
        debug!(?state, "collapse tree view item");
        self.toggle_expander()?;
        Ok(self.state()? == TreeViewItemState::Collapsed)
    }

    fn toggle_expander(&self) -> Result<(), AutomationError> {
        let expander =
            self.find_element::<ButtonElement>(&[Condition::automation_id(EXPANDER_AUTOMATION_ID)])?;
        expander.click()?;
        self.navigation().awaiting().wait_for_default_action_delay();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::test_support::open_window;
    use crate::testing::{InMemoryTree, InputEvent};
    use std::sync::Arc;

    fn explorer() -> (Arc<crate::testing::InMemoryNavigation>, TreeViewElement) {
        let tree = Arc::new(InMemoryTree::new());
        let window = tree.add(tree.root(), [("Name", "Explorer")]);
        let view = tree.add(window, [("ClassName", "TreeView")]);
        let drive = tree.add(
            view,
            [
                ("ClassName", "TreeViewItem"),
                ("Name", "C:"),
                ("ExpandCollapse.ExpandCollapseState", "Collapsed"),
            ],
        );
        tree.add(
            drive,
            [("ClassName", "Button"), ("AutomationId", "Expander"), ("IsEnabled", "True")],
        );
        tree.add(
            drive,
            [
                ("ClassName", "TreeViewItem"),
                ("Name", "Windows"),
                ("ExpandCollapse.ExpandCollapseState", "LeafNode"),
            ],
        );
        tree.add(
            view,
            [
                ("ClassName", "TreeViewItem"),
                ("Name", "D:"),
                ("ExpandCollapse.ExpandCollapseState", "Expanded"),
            ],
        );
        let (navigation, root) = open_window(tree, "Explorer");
        let view = root.find_element::<TreeViewElement>(&[]).unwrap();
        (navigation, view)
    }

    #[test]
    fn items_are_direct_children() {
        let (_, view) = explorer();
        let names: Vec<String> = view
            .items()
            .unwrap()
            .iter()
            .map(|i| i.name().unwrap())
            .collect();
        assert_eq!(names, vec!["C:", "D:"]);
    }

    #[test]
    fn collapsed_item_is_expanded_through_its_expander() {
        let (navigation, view) = explorer();
        let drive = view.items().unwrap().remove(0);
        assert_eq!(drive.state().unwrap(), TreeViewItemState::Collapsed);
        navigation.tree().clear_input();

        let (children, expanded) = drive.try_expand().unwrap();

        assert!(expanded);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].state().unwrap(), TreeViewItemState::Leaf);
        assert!(navigation
            .tree()
            .input()
            .iter()
            .any(|e| matches!(e, InputEvent::Click { .. })));
    }

    #[test]
    fn expanded_item_is_left_alone() {
        let (navigation, view) = explorer();
        let d = view.items().unwrap().remove(1);
        navigation.tree().clear_input();

        let (_, expanded) = d.try_expand().unwrap();

        assert!(!expanded);
        assert!(navigation.tree().input().is_empty());
    }
}
