use super::adapter::AppiumAdapter;
use super::keymap::{combo_text, modified_key_text, APPIUM_KEYS};
use crate::errors::AutomationError;
use crate::keys::{Key, MouseButton};
use crate::platforms::BackendAdapter;
use crate::search::SearchScope;
use crate::wrapper::{
    is_visible_rectangle, Bounds, ItemContext, UiItemImpl, BOUNDING_RECTANGLE_PROPERTY,
};
use std::sync::Arc;

/// One element of a remote session.
#[derive(Debug, Clone)]
pub struct AppiumUiItem {
    adapter: Arc<AppiumAdapter>,
    element_id: String,
    context: ItemContext,
}

impl AppiumUiItem {
    pub fn new(adapter: Arc<AppiumAdapter>, element_id: String, context: ItemContext) -> Self {
        Self {
            adapter,
            element_id,
            context,
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }
}

impl UiItemImpl for AppiumUiItem {
    fn object_id(&self) -> String {
        self.element_id.clone()
    }

    fn context(&self) -> &ItemContext {
        &self.context
    }

    fn property(&self, name: &str) -> Result<String, AutomationError> {
        self.adapter.read_property(&self.element_id, name)
    }

    fn is_visible(&self) -> Result<bool, AutomationError> {
        let rectangle = self
            .adapter
            .session()
            .attribute(&self.element_id, BOUNDING_RECTANGLE_PROPERTY)?;
        Ok(is_visible_rectangle(&rectangle))
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.adapter.session().rect(&self.element_id)
    }

    fn click(&self, button: MouseButton, x_offset: i32, y_offset: i32) -> Result<(), AutomationError> {
        let code = match button {
            MouseButton::Left => 0,
            MouseButton::Right => 2,
            MouseButton::Undefined => {
                return Err(AutomationError::InvalidArgument(
                    "mouse button must be defined".to_string(),
                ))
            }
        };
        let offset = (x_offset != 0 || y_offset != 0).then_some((x_offset, y_offset));
        let session = self.adapter.session();
        session.move_to(&self.element_id, offset)?;
        session.click(code)
    }

    fn double_click(&self) -> Result<(), AutomationError> {
        let session = self.adapter.session();
        session.move_to(&self.element_id, None)?;
        session.double_click()
    }

    fn hover(&self) -> Result<(), AutomationError> {
        self.adapter.session().move_to(&self.element_id, None)
    }

    fn send_keys(&self, text: &str) -> Result<(), AutomationError> {
        self.adapter.session().send_value(&self.element_id, text)
    }

    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        let code = APPIUM_KEYS.lookup(key)?;
        self.adapter
            .session()
            .send_value(&self.element_id, &code.to_string())
    }

    fn press_modified_key(&self, modifier: Key, c: char) -> Result<(), AutomationError> {
        let text = modified_key_text(modifier, c)?;
        self.adapter.session().send_value(&self.element_id, &text)
    }

    fn press_key_combo(&self, keys: &[Key]) -> Result<(), AutomationError> {
        let text = combo_text(keys)?;
        self.adapter.session().send_value(&self.element_id, &text)
    }

    fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        self.adapter.session().element_screenshot(&self.element_id)
    }

    fn clone_box(&self) -> Box<dyn UiItemImpl> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl SearchScope for AppiumUiItem {
    type Adapter = AppiumAdapter;

    fn adapter(&self) -> &AppiumAdapter {
        &self.adapter
    }

    fn handle(&self) -> Option<&String> {
        Some(&self.element_id)
    }

    fn wrap_child(&self, handle: String) -> Result<Self, AutomationError> {
        Ok(Self {
            adapter: self.adapter.clone(),
            element_id: handle,
            context: self.context.child()?,
        })
    }
}
