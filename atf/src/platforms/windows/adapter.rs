use super::{platform_error, ThreadSafeAutomation, ThreadSafeElement};
use crate::condition::{bool_token, Condition, ConditionKey};
use crate::errors::AutomationError;
use crate::platforms::BackendAdapter;
use crate::wrapper::{Bounds, BOUNDING_RECTANGLE_PROPERTY, IS_ENABLED_PROPERTY};
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uiautomation::patterns::{
    UIExpandCollapsePattern, UIGridPattern, UISelectionItemPattern, UITogglePattern,
    UIValuePattern,
};
use uiautomation::types::{ExpandCollapseState, ToggleState, TreeScope, UIProperty};
use uiautomation::variants::Variant;
use uiautomation::UIElement;

pub const EXPAND_COLLAPSE_STATE_PROPERTY: &str = "ExpandCollapse.ExpandCollapseState";
pub const VALUE_PROPERTY: &str = "Value.Value";
pub const VALUE_IS_READ_ONLY_PROPERTY: &str = "Value.IsReadOnly";
pub const TOGGLE_STATE_PROPERTY: &str = "Toggle.ToggleState";
pub const GRID_ROW_COUNT_PROPERTY: &str = "Grid.RowCount";

/// One UI Automation element, identified by its runtime id.
#[derive(Clone)]
pub struct UiaHandle {
    element: ThreadSafeElement,
    runtime_id: String,
}

impl UiaHandle {
    pub fn new(element: UIElement) -> Result<Self, AutomationError> {
        let ids = element
            .get_runtime_id()
            .map_err(platform_error("Failed to get runtime id"))?;
        Ok(Self {
            element: ThreadSafeElement(Arc::new(element)),
            runtime_id: runtime_id_string(&ids),
        })
    }

    pub fn element(&self) -> &UIElement {
        &self.element.0
    }

    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }
}

impl PartialEq for UiaHandle {
    fn eq(&self, other: &Self) -> bool {
        self.runtime_id == other.runtime_id
    }
}

impl fmt::Debug for UiaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UiaHandle").field(&self.runtime_id).finish()
    }
}

/// Runtime ids read as their parts joined by dots, e.g. `42.65872.4`.
pub fn runtime_id_string(ids: &[i32]) -> String {
    ids.iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

pub fn expand_collapse_token(state: ExpandCollapseState) -> &'static str {
    match state {
        ExpandCollapseState::Collapsed => "Collapsed",
        ExpandCollapseState::Expanded => "Expanded",
        ExpandCollapseState::LeafNode => "LeafNode",
        _ => "",
    }
}

/// Bounding rectangle in the form shared with the remote backend.
pub fn rectangle_string(bounds: &Bounds) -> String {
    format!(
        "Left:{} Top:{} Width:{} Height:{}",
        bounds.x, bounds.y, bounds.width, bounds.height
    )
}

/// Conditions evaluated with UI Automation property conditions, and the ones
/// answered by walking the tree.
enum Lookup {
    Property(UIProperty, Variant),
    Scan(ConditionKey),
}

fn lookup(condition: &Condition) -> Result<Lookup, AutomationError> {
    let value = condition.value.as_str();
    Ok(match condition.parsed_key()? {
        ConditionKey::Name => Lookup::Property(UIProperty::Name, Variant::from(value)),
        ConditionKey::ClassName => Lookup::Property(UIProperty::ClassName, Variant::from(value)),
        ConditionKey::AutomationId => {
            Lookup::Property(UIProperty::AutomationId, Variant::from(value))
        }
        ConditionKey::HelpText => Lookup::Property(UIProperty::HelpText, Variant::from(value)),
        ConditionKey::LocalizedControlType => {
            Lookup::Property(UIProperty::LocalizedControlType, Variant::from(value))
        }
        ConditionKey::IsSelected => Lookup::Property(
            UIProperty::SelectionItemIsSelected,
            Variant::from(value == bool_token(true)),
        ),
        key @ (ConditionKey::ControlType
        | ConditionKey::RuntimeId
        | ConditionKey::ParentRuntimeId) => Lookup::Scan(key),
    })
}

/// Translates conditions into UI Automation searches over the descendants of
/// a scope, the desktop when unscoped.
#[derive(Clone)]
pub struct UiaAdapter {
    automation: ThreadSafeAutomation,
}

impl UiaAdapter {
    pub fn new(automation: ThreadSafeAutomation) -> Self {
        Self { automation }
    }

    pub fn desktop(&self) -> Result<UiaHandle, AutomationError> {
        let root = self
            .automation
            .0
            .get_root_element()
            .map_err(platform_error("Failed to get desktop root"))?;
        UiaHandle::new(root)
    }

    /// Top-level window named `title`.
    pub fn find_window(&self, title: &str) -> Result<Option<UiaHandle>, AutomationError> {
        let desktop = self.desktop()?;
        self.find_first_native(
            desktop.element(),
            TreeScope::Children,
            UIProperty::Name,
            Variant::from(title),
        )
    }

    fn scope_element(&self, scope: Option<&UiaHandle>) -> Result<UiaHandle, AutomationError> {
        match scope {
            Some(handle) => Ok(handle.clone()),
            None => self.desktop(),
        }
    }

    fn find_first_native(
        &self,
        root: &UIElement,
        tree_scope: TreeScope,
        property: UIProperty,
        value: Variant,
    ) -> Result<Option<UiaHandle>, AutomationError> {
        let condition = self
            .automation
            .0
            .create_property_condition(property, value, None)
            .map_err(platform_error("Failed to create property condition"))?;
        match root.find_first(tree_scope, &condition) {
            Ok(found) => UiaHandle::new(found).map(Some),
            Err(e) => {
                trace!("find first with {property:?} returned nothing: {e}");
                Ok(None)
            }
        }
    }

    fn find_all_native(
        &self,
        root: &UIElement,
        property: UIProperty,
        value: Variant,
    ) -> Result<Vec<UiaHandle>, AutomationError> {
        let condition = self
            .automation
            .0
            .create_property_condition(property, value, None)
            .map_err(platform_error("Failed to create property condition"))?;
        root.find_all(TreeScope::Descendants, &condition)
            .map_err(platform_error("Failed to find elements"))?
            .into_iter()
            .map(UiaHandle::new)
            .collect()
    }

    fn descendants(&self, root: &UIElement) -> Result<Vec<UiaHandle>, AutomationError> {
        let condition = self
            .automation
            .0
            .create_true_condition()
            .map_err(platform_error("Failed to create true condition"))?;
        root.find_all(TreeScope::Descendants, &condition)
            .map_err(platform_error("Failed to list descendants"))?
            .into_iter()
            .map(UiaHandle::new)
            .collect()
    }

    fn scan(
        &self,
        root: &UIElement,
        key: ConditionKey,
        value: &str,
    ) -> Result<Vec<UiaHandle>, AutomationError> {
        let mut matches = Vec::new();
        for candidate in self.descendants(root)? {
            if self.read_property(&candidate, key.as_str())? == value {
                matches.push(candidate);
            }
        }
        Ok(matches)
    }

    /// Parent in the control view; `None` at the desktop.
    pub fn parent(&self, handle: &UiaHandle) -> Result<Option<UiaHandle>, AutomationError> {
        let walker = self
            .automation
            .0
            .get_control_view_walker()
            .map_err(platform_error("Failed to get tree walker"))?;
        match walker.get_parent(handle.element()) {
            Ok(parent) => UiaHandle::new(parent).map(Some),
            Err(e) => {
                trace!("no parent for {}: {e}", handle.runtime_id());
                Ok(None)
            }
        }
    }

    pub fn bounds(&self, handle: &UiaHandle) -> Result<Bounds, AutomationError> {
        let rect = handle
            .element()
            .get_bounding_rectangle()
            .map_err(platform_error("Failed to get bounding rectangle"))?;
        Ok(Bounds {
            x: rect.get_left() as f64,
            y: rect.get_top() as f64,
            width: rect.get_width() as f64,
            height: rect.get_height() as f64,
        })
    }

    fn read_pattern_property(
        &self,
        element: &UIElement,
        property: &str,
    ) -> Result<Option<String>, AutomationError> {
        let read = match property {
            VALUE_PROPERTY => element
                .get_pattern::<UIValuePattern>()
                .and_then(|p| p.get_value()),
            VALUE_IS_READ_ONLY_PROPERTY => element
                .get_pattern::<UIValuePattern>()
                .and_then(|p| p.is_readonly())
                .map(|b| bool_token(b).to_string()),
            TOGGLE_STATE_PROPERTY => element
                .get_pattern::<UITogglePattern>()
                .and_then(|p| p.get_toggle_state())
                .map(|s| if matches!(s, ToggleState::On) { "1" } else { "0" }.to_string()),
            GRID_ROW_COUNT_PROPERTY => element
                .get_pattern::<UIGridPattern>()
                .and_then(|p| p.get_row_count())
                .map(|n| n.to_string()),
            EXPAND_COLLAPSE_STATE_PROPERTY => element
                .get_pattern::<UIExpandCollapsePattern>()
                .and_then(|p| p.get_state())
                .map(|s| expand_collapse_token(s).to_string()),
            _ => return Ok(None),
        };
        // a control without the pattern has no such property
        Ok(Some(read.unwrap_or_default()))
    }
}

impl fmt::Debug for UiaAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiaAdapter").finish_non_exhaustive()
    }
}

impl BackendAdapter for UiaAdapter {
    type Handle = UiaHandle;

    fn find_first_descendant(
        &self,
        scope: Option<&UiaHandle>,
    ) -> Result<Option<UiaHandle>, AutomationError> {
        let root = self.scope_element(scope)?;
        Ok(self.descendants(root.element())?.into_iter().next())
    }

    fn find_all_descendants(
        &self,
        scope: Option<&UiaHandle>,
    ) -> Result<Vec<UiaHandle>, AutomationError> {
        let root = self.scope_element(scope)?;
        self.descendants(root.element())
    }

    fn find_first_by(
        &self,
        scope: Option<&UiaHandle>,
        condition: &Condition,
    ) -> Result<Option<UiaHandle>, AutomationError> {
        let lookup = lookup(condition)?;
        let root = self.scope_element(scope)?;
        match lookup {
            Lookup::Property(property, value) => {
                self.find_first_native(root.element(), TreeScope::Descendants, property, value)
            }
            Lookup::Scan(key) => Ok(self
                .scan(root.element(), key, &condition.value)?
                .into_iter()
                .next()),
        }
    }

    fn find_all_by(
        &self,
        scope: Option<&UiaHandle>,
        condition: &Condition,
    ) -> Result<Vec<UiaHandle>, AutomationError> {
        let lookup = lookup(condition)?;
        let root = self.scope_element(scope)?;
        match lookup {
            Lookup::Property(property, value) => {
                self.find_all_native(root.element(), property, value)
            }
            Lookup::Scan(key) => self.scan(root.element(), key, &condition.value),
        }
    }

    fn read_property(&self, handle: &UiaHandle, property: &str) -> Result<String, AutomationError> {
        let element = handle.element();
        if let Some(value) = self.read_pattern_property(element, property)? {
            return Ok(value);
        }
        if property == IS_ENABLED_PROPERTY {
            let enabled = element
                .is_enabled()
                .map_err(platform_error("Failed to read IsEnabled"))?;
            return Ok(bool_token(enabled).to_string());
        }
        if property == BOUNDING_RECTANGLE_PROPERTY {
            return Ok(rectangle_string(&self.bounds(handle)?));
        }
        let key: ConditionKey = property.parse().map_err(|_| {
            AutomationError::InvalidArgument(format!("No keyword '{property}'"))
        })?;
        let read = match key {
            ConditionKey::Name => element.get_name(),
            ConditionKey::ClassName => element.get_classname(),
            ConditionKey::AutomationId => element.get_automation_id(),
            ConditionKey::HelpText => element.get_help_text(),
            ConditionKey::LocalizedControlType => element.get_localized_control_type(),
            ConditionKey::ControlType => element
                .get_control_type()
                .map(|control_type| format!("ControlType.{control_type:?}")),
            ConditionKey::RuntimeId => return Ok(handle.runtime_id().to_string()),
            ConditionKey::ParentRuntimeId => {
                return Ok(self
                    .parent(handle)?
                    .map(|parent| parent.runtime_id().to_string())
                    .unwrap_or_default())
            }
            ConditionKey::IsSelected => {
                return Ok(element
                    .get_pattern::<UISelectionItemPattern>()
                    .and_then(|p| p.is_selected())
                    .map(|b| bool_token(b).to_string())
                    .unwrap_or_default())
            }
        };
        read.map_err(platform_error(property))
    }
}
