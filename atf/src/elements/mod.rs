//! Typed elements of the reference host's WPF control set.
//!
//! Each type derefs to [`Element`], so everything the facade offers is
//! available on it as well.

use crate::condition::Condition;
use crate::factory::ElementRegistry;

/// Declares a typed element wrapping [`Element`](crate::element::Element).
macro_rules! typed_element {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name($crate::element::Element);

        impl $crate::element::TypedElement for $name {
            const KIND: $crate::factory::ElementKind = $crate::factory::ElementKind::$kind;

            fn from_element(element: $crate::element::Element) -> Self {
                Self(element)
            }

            fn element(&self) -> &$crate::element::Element {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::element::Element;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

mod button;
mod combo_box;
mod data_grid;
mod list;
mod tab_control;
mod text_box;
mod tree_view;
mod window_root;

pub use button::{ButtonElement, CheckBoxElement, ImageElement};
pub use combo_box::ComboBoxElement;
pub use data_grid::{DataGridCellElement, DataGridElement, DataGridRowElement};
pub use list::{ListBoxItemElement, TextBlockElement};
pub use tab_control::{TabControlElement, TabItemElement};
pub use text_box::TextBoxElement;
pub use tree_view::{TreeViewElement, TreeViewItemElement, TreeViewItemState};
pub use window_root::WindowRootElement;

/// Registry of the standard element types with their `ClassName` defaults.
///
/// [`WindowRootElement`] and the base element carry no defaults.
pub fn standard_registry() -> ElementRegistry {
    ElementRegistry::new()
        .register::<WindowRootElement>(Vec::new())
        .register::<DataGridElement>(class("DataGrid"))
        .register::<DataGridRowElement>(class("DataGridRow"))
        .register::<DataGridCellElement>(class("DataGridCell"))
        .register::<TextBlockElement>(class("TextBlock"))
        .register::<TextBoxElement>(class("TextBox"))
        .register::<TreeViewElement>(class("TreeView"))
        .register::<TreeViewItemElement>(class("TreeViewItem"))
        .register::<ButtonElement>(class("Button"))
        .register::<TabControlElement>(class("TabControl"))
        .register::<TabItemElement>(class("TabItem"))
        .register::<CheckBoxElement>(class("CheckBox"))
        .register::<ImageElement>(class("Image"))
        .register::<ComboBoxElement>(class("ComboBox"))
        .register::<ListBoxItemElement>(class("ListBoxItem"))
}

fn class(name: &str) -> Vec<Condition> {
    vec![Condition::class_name(name)]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::element::Element;
    use crate::factory::{ElementCreator, ElementKind};
    use crate::platforms::NavigationProvider;
    use crate::testing::{InMemoryNavigation, InMemoryTree};
    use std::sync::Arc;

    /// Opens the window titled `title` with the standard element types.
    pub(crate) fn open_window(
        tree: Arc<InMemoryTree>,
        title: &str,
    ) -> (Arc<InMemoryNavigation>, Element) {
        let navigation = InMemoryNavigation::new(tree, 2);
        let root = navigation.get_app_root(title).unwrap();
        let provider: Arc<dyn NavigationProvider> = navigation.clone();
        let element = Element::new(
            root,
            provider,
            Arc::new(ElementCreator::standard()),
            ElementKind::WINDOW_ROOT,
        );
        (navigation, element)
    }
}
