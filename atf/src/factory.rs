//! Element kinds, their default search conditions and how they are built.
//!
//! Factories are consulted in order. The first one with non-empty defaults
//! for a kind supplies them, and the first one with a constructor builds it.

use crate::condition::Condition;
use crate::element::{Element, TypedElement};
use crate::errors::AutomationError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Tag identifying an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKind(&'static str);

impl ElementKind {
    pub const ELEMENT: ElementKind = ElementKind("Element");
    pub const WINDOW_ROOT: ElementKind = ElementKind("WindowRootElement");
    pub const BUTTON: ElementKind = ElementKind("ButtonElement");
    pub const CHECK_BOX: ElementKind = ElementKind("CheckBoxElement");
    pub const COMBO_BOX: ElementKind = ElementKind("ComboBoxElement");
    pub const DATA_GRID: ElementKind = ElementKind("DataGridElement");
    pub const DATA_GRID_ROW: ElementKind = ElementKind("DataGridRowElement");
    pub const DATA_GRID_CELL: ElementKind = ElementKind("DataGridCellElement");
    pub const IMAGE: ElementKind = ElementKind("ImageElement");
    pub const LIST_BOX_ITEM: ElementKind = ElementKind("ListBoxItemElement");
    pub const TAB_CONTROL: ElementKind = ElementKind("TabControlElement");
    pub const TAB_ITEM: ElementKind = ElementKind("TabItemElement");
    pub const TEXT_BLOCK: ElementKind = ElementKind("TextBlockElement");
    pub const TEXT_BOX: ElementKind = ElementKind("TextBoxElement");
    pub const TREE_VIEW: ElementKind = ElementKind("TreeViewElement");
    pub const TREE_VIEW_ITEM: ElementKind = ElementKind("TreeViewItemElement");

    /// Tag for element types defined outside this crate.
    pub const fn custom(name: &'static str) -> Self {
        ElementKind(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Builds a typed element around a base element.
pub type Constructor = fn(Element) -> Box<dyn Any + Send + Sync>;

fn construct<T: TypedElement>(element: Element) -> Box<dyn Any + Send + Sync> {
    Box::new(T::from_element(element))
}

/// Constructor entry for `T`.
pub fn constructor_of<T: TypedElement>() -> Constructor {
    construct::<T>
}

pub trait ElementFactory: Send + Sync {
    /// Conditions added to every search for `kind`. Empty when the factory
    /// does not know the kind.
    fn default_search_conditions(&self, kind: ElementKind) -> Vec<Condition>;

    /// How to build `kind`, if this factory can.
    fn constructor(&self, kind: ElementKind) -> Option<Constructor>;
}

/// Table-driven factory.
#[derive(Default, Clone)]
pub struct ElementRegistry {
    defaults: HashMap<ElementKind, Vec<Condition>>,
    constructors: HashMap<ElementKind, Constructor>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` with its default search conditions.
    pub fn register<T: TypedElement>(mut self, defaults: Vec<Condition>) -> Self {
        if !defaults.is_empty() {
            self.defaults.insert(T::KIND, defaults);
        }
        self.constructors.insert(T::KIND, constructor_of::<T>());
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.constructors.keys().copied()
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("defaults", &self.defaults)
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ElementFactory for ElementRegistry {
    fn default_search_conditions(&self, kind: ElementKind) -> Vec<Condition> {
        self.defaults.get(&kind).cloned().unwrap_or_default()
    }

    fn constructor(&self, kind: ElementKind) -> Option<Constructor> {
        self.constructors.get(&kind).copied()
    }
}

/// Ordered chain of factories.
#[derive(Clone)]
pub struct ElementCreator {
    factories: Vec<Arc<dyn ElementFactory>>,
}

impl ElementCreator {
    pub fn new(factories: Vec<Arc<dyn ElementFactory>>) -> Self {
        Self { factories }
    }

    /// Chain holding only the standard element registry.
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(crate::elements::standard_registry())])
    }

    /// Builds `T` around `element`.
    ///
    /// The base [`Element`] kind is returned as is; other kinds go to the
    /// first factory that has a constructor for them.
    pub fn create<T: TypedElement>(&self, element: Element) -> Result<T, AutomationError> {
        let built: Box<dyn Any> = if T::KIND == ElementKind::ELEMENT {
            Box::new(element)
        } else {
            let constructor = self
                .constructor(T::KIND)
                .ok_or_else(|| AutomationError::FactoryResolution(T::KIND.to_string()))?;
            constructor(element)
        };
        built
            .downcast::<T>()
            .map(|typed| *typed)
            .map_err(|_| AutomationError::FactoryResolution(T::KIND.to_string()))
    }
}

impl ElementFactory for ElementCreator {
    fn default_search_conditions(&self, kind: ElementKind) -> Vec<Condition> {
        for factory in &self.factories {
            let conditions = factory.default_search_conditions(kind);
            if !conditions.is_empty() {
                trace!(%kind, ?conditions, "default search conditions");
                return conditions;
            }
        }
        Vec::new()
    }

    fn constructor(&self, kind: ElementKind) -> Option<Constructor> {
        self.factories.iter().find_map(|f| f.constructor(kind))
    }
}

impl fmt::Debug for ElementCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCreator")
            .field("factories", &self.factories.len())
            .finish()
    }
}
